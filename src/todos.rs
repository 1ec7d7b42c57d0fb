use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::collection::{double_option, new_id, Collection, Entity};
use crate::error::{AppError, Result};

// --- Priority ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn rank(self) -> u8 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
        }
    }
}

// --- Data Types ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: String,
    pub title: String,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    pub priority: Priority,
}

impl Entity for Todo {
    const KIND: &'static str = "Todo";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTodo {
    pub title: String,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub priority: Priority,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoPatch {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<NaiveDate>>,
    pub priority: Option<Priority>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Date,
    Priority,
    Title,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}

/// How the list view is sorted and, optionally, narrowed to one calendar day.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoQuery {
    #[serde(default)]
    pub sort_by: SortKey,
    #[serde(default)]
    pub order: SortOrder,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub in_month: bool,
    pub is_today: bool,
    pub todos: Vec<Todo>,
}

/// Six weeks, Sunday first.
pub const CALENDAR_CELLS: usize = 42;

fn validate_title(title: &str) -> Result<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("Todo title cannot be empty".to_string()));
    }
    Ok(title.to_string())
}

fn compare_titles(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

// --- Store ---

/// Session-only todo list.
#[derive(Debug, Clone, Default)]
pub struct TodoStore {
    todos: Collection<Todo>,
}

impl TodoStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(&self) -> &[Todo] {
        self.todos.as_slice()
    }

    pub fn get(&self, id: &str) -> Result<&Todo> {
        self.todos.get(id)
    }

    /// Quick-add from the inline input: title only, medium priority, no due date.
    pub fn add_quick(&mut self, title: &str) -> Result<&Todo> {
        self.create(NewTodo {
            title: title.to_string(),
            due_date: None,
            priority: Priority::Medium,
        })
    }

    pub fn create(&mut self, new: NewTodo) -> Result<&Todo> {
        let todo = Todo {
            id: new_id(),
            title: validate_title(&new.title)?,
            completed: false,
            due_date: new.due_date,
            priority: new.priority,
        };
        Ok(self.todos.push(todo))
    }

    pub fn update(&mut self, id: &str, patch: TodoPatch) -> Result<&Todo> {
        let title = patch.title.as_deref().map(validate_title).transpose()?;
        self.todos.update(id, |todo| {
            if let Some(title) = title {
                todo.title = title;
            }
            if let Some(due_date) = patch.due_date {
                todo.due_date = due_date;
            }
            if let Some(priority) = patch.priority {
                todo.priority = priority;
            }
        })
    }

    pub fn toggle(&mut self, id: &str) -> Result<&Todo> {
        self.todos.update(id, |todo| todo.completed = !todo.completed)
    }

    pub fn delete(&mut self, id: &str) -> Result<Todo> {
        self.todos.remove(id)
    }

    /// The list as displayed: filtered to `query.date` if set, then sorted.
    ///
    /// When sorting by date, todos without a due date always come after dated
    /// ones (in either direction) and keep their relative order.
    pub fn view(&self, query: &TodoQuery) -> Vec<&Todo> {
        let mut todos: Vec<&Todo> = self
            .todos
            .iter()
            .filter(|todo| query.date.is_none() || todo.due_date == query.date)
            .collect();

        let order = query.order;
        todos.sort_by(|a, b| match query.sort_by {
            SortKey::Date => match (a.due_date, b.due_date) {
                (Some(x), Some(y)) => order.apply(x.cmp(&y)),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
            SortKey::Priority => order.apply(a.priority.rank().cmp(&b.priority.rank())),
            SortKey::Title => order.apply(compare_titles(&a.title, &b.title)),
        });
        todos
    }

    /// Month grid for `year`/`month`: starts on the Sunday on or before the
    /// 1st and always spans [`CALENDAR_CELLS`] days.
    pub fn calendar(&self, year: i32, month: u32, today: NaiveDate) -> Result<Vec<CalendarDay>> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| AppError::Validation(format!("Invalid month {}-{}", year, month)))?;
        let lead = u64::from(first.weekday().num_days_from_sunday());
        let start = first
            .checked_sub_days(Days::new(lead))
            .ok_or_else(|| AppError::Validation(format!("Month {}-{} out of range", year, month)))?;

        let days = start
            .iter_days()
            .take(CALENDAR_CELLS)
            .map(|date| CalendarDay {
                date,
                in_month: date.year() == year && date.month() == month,
                is_today: date == today,
                todos: self
                    .todos
                    .iter()
                    .filter(|todo| todo.due_date == Some(date))
                    .cloned()
                    .collect(),
            })
            .collect();
        Ok(days)
    }

    pub fn with_demo_data() -> Self {
        let sample = |title: &str, completed, due: (i32, u32, u32), priority| Todo {
            id: new_id(),
            title: title.to_string(),
            completed,
            due_date: NaiveDate::from_ymd_opt(due.0, due.1, due.2),
            priority,
        };
        Self {
            todos: Collection::from_vec(vec![
                sample("Define project requirements", false, (2024, 3, 15), Priority::High),
                sample("Create UI design", false, (2024, 3, 20), Priority::Medium),
                sample("Design the database", true, (2024, 3, 10), Priority::High),
            ]),
        }
    }
}

use serde::{Deserialize, Serialize};

use crate::collection::{new_id, Collection, Entity};
use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressColor {
    Coral,
    Yellow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IconType {
    Desktop,
    Table,
    Circle,
}

/// What a project card lets the user do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProjectAction {
    Open,
    Details,
    Edit,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Percent complete, always within 0..=100.
    pub progress: u8,
    pub progress_color: ProgressColor,
    pub icon_type: IconType,
    pub actions: Vec<ProjectAction>,
}

impl Entity for Project {
    const KIND: &'static str = "Project";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub progress: i64,
    pub progress_color: ProgressColor,
    pub icon_type: IconType,
    #[serde(default)]
    pub actions: Vec<ProjectAction>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub progress: Option<i64>,
    pub progress_color: Option<ProgressColor>,
    pub icon_type: Option<IconType>,
    pub actions: Option<Vec<ProjectAction>>,
}

fn clamp_progress(progress: i64) -> u8 {
    progress.clamp(0, 100) as u8
}

// Submitted actions first, then the required ones, without duplicates.
fn merge_actions(submitted: &[ProjectAction], required: &[ProjectAction]) -> Vec<ProjectAction> {
    let mut merged: Vec<ProjectAction> = Vec::with_capacity(submitted.len() + required.len());
    for action in submitted.iter().chain(required) {
        if !merged.contains(action) {
            merged.push(*action);
        }
    }
    merged
}

fn validate_title(title: &str) -> Result<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("Project title cannot be empty".to_string()));
    }
    Ok(title.to_string())
}

#[derive(Debug, Clone, Default)]
pub struct ProjectStore {
    projects: Collection<Project>,
}

impl ProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(&self) -> &[Project] {
        self.projects.as_slice()
    }

    pub fn get(&self, id: &str) -> Result<&Project> {
        self.projects.get(id)
    }

    pub fn create(&mut self, new: NewProject) -> Result<&Project> {
        let project = Project {
            id: new_id(),
            title: validate_title(&new.title)?,
            description: new.description,
            progress: clamp_progress(new.progress),
            progress_color: new.progress_color,
            icon_type: new.icon_type,
            actions: merge_actions(&new.actions, &[ProjectAction::Edit, ProjectAction::Delete]),
        };
        Ok(self.projects.push(project))
    }

    /// Edit a project. EDIT and DELETE are always allowed afterwards; OPEN and
    /// DETAILS survive the edit if the project had them before.
    pub fn update(&mut self, id: &str, patch: ProjectPatch) -> Result<&Project> {
        let title = patch.title.as_deref().map(validate_title).transpose()?;
        let previous = self.projects.get(id)?;

        let mut required = vec![ProjectAction::Edit, ProjectAction::Delete];
        for kept in [ProjectAction::Open, ProjectAction::Details] {
            if previous.actions.contains(&kept) {
                required.push(kept);
            }
        }
        let submitted = patch.actions.as_deref().unwrap_or(&[]);
        let actions = merge_actions(submitted, &required);

        self.projects.update(id, |project| {
            if let Some(title) = title {
                project.title = title;
            }
            if let Some(description) = patch.description {
                project.description = description;
            }
            if let Some(progress) = patch.progress {
                project.progress = clamp_progress(progress);
            }
            if let Some(color) = patch.progress_color {
                project.progress_color = color;
            }
            if let Some(icon) = patch.icon_type {
                project.icon_type = icon;
            }
            project.actions = actions;
        })
    }

    pub fn delete(&mut self, id: &str) -> Result<Project> {
        self.projects.remove(id)
    }

    /// The three sample projects shown on a fresh dashboard.
    pub fn with_demo_data() -> Self {
        let all = vec![
            ProjectAction::Open,
            ProjectAction::Details,
            ProjectAction::Edit,
            ProjectAction::Delete,
        ];
        let sample = |title: &str, description: &str, progress, color, icon| Project {
            id: new_id(),
            title: title.to_string(),
            description: description.to_string(),
            progress,
            progress_color: color,
            icon_type: icon,
            actions: all.clone(),
        };
        Self {
            projects: Collection::from_vec(vec![
                sample(
                    "UNIVERSITY MANAGEMENT",
                    "MATERIALS AND ASSIGNMENT",
                    65,
                    ProgressColor::Coral,
                    IconType::Desktop,
                ),
                sample(
                    "LAB ACTIVITY",
                    "RESEARCH AND MANAGEMENT",
                    40,
                    ProgressColor::Yellow,
                    IconType::Table,
                ),
                sample(
                    "DEVELOPMENT ACTIVITY",
                    "PROJECT MANAGEMENT AND LEARNING",
                    80,
                    ProgressColor::Coral,
                    IconType::Circle,
                ),
            ]),
        }
    }
}

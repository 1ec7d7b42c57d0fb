use base64::Engine;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::collection::{new_id, Collection, Entity};
use crate::error::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileItem {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub file_type: String,
    /// Human-readable size such as "2.4 MB".
    pub size: String,
    pub date: NaiveDate,
    /// Starts at 1 and only ever goes up.
    pub version: u32,
    pub shared_with: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
}

impl Entity for FileItem {
    const KIND: &'static str = "File";

    fn id(&self) -> &str {
        &self.id
    }
}

fn default_file_type() -> String {
    "Document".to_string()
}

/// File metadata entered by hand.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFile {
    pub name: String,
    #[serde(rename = "type", default = "default_file_type")]
    pub file_type: String,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub shared_with: Vec<String>,
}

/// An uploaded file; only its metadata is kept.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadFile {
    pub name: String,
    pub mime_type: String,
    /// Standard base64 of the file contents.
    pub data: String,
}

const SIZE_UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// Format a byte count in base-1024 units with at most two decimals.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let formatted = format!("{:.2}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, SIZE_UNITS[unit])
}

// "image/png" -> "PNG"
fn type_from_mime(mime: &str) -> String {
    let mime = mime.trim();
    let subtype = mime.split_once('/').map_or(mime, |(_, sub)| sub);
    if subtype.is_empty() {
        "FILE".to_string()
    } else {
        subtype.to_uppercase()
    }
}

fn file_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("File name cannot be empty".to_string()));
    }
    Ok(name.to_string())
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Session-only file metadata list.
#[derive(Debug, Clone, Default)]
pub struct FileLibrary {
    files: Collection<FileItem>,
}

impl FileLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(&self) -> &[FileItem] {
        self.files.as_slice()
    }

    pub fn get(&self, id: &str) -> Result<&FileItem> {
        self.files.get(id)
    }

    /// Case-insensitive match on name or type. An empty query matches everything.
    pub fn search(&self, query: &str) -> Vec<&FileItem> {
        let query = query.to_lowercase();
        self.files
            .iter()
            .filter(|file| {
                file.name.to_lowercase().contains(&query)
                    || file.file_type.to_lowercase().contains(&query)
            })
            .collect()
    }

    pub fn create(&mut self, new: NewFile) -> Result<&FileItem> {
        let mut shared_with: Vec<String> = Vec::new();
        for email in new.shared_with {
            let email = email.trim().to_string();
            if !email.is_empty() && !shared_with.contains(&email) {
                shared_with.push(email);
            }
        }
        let size = if new.size.trim().is_empty() {
            "0 KB".to_string()
        } else {
            new.size
        };
        let file = FileItem {
            id: new_id(),
            name: file_name(&new.name)?,
            file_type: new.file_type,
            size,
            date: today(),
            version: 1,
            shared_with,
            preview_url: None,
        };
        Ok(self.files.push(file))
    }

    pub fn upload(&mut self, upload: UploadFile) -> Result<&FileItem> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(upload.data.trim())
            .map_err(|e| AppError::Validation(format!("File data is not valid base64: {}", e)))?;
        let file = FileItem {
            id: new_id(),
            name: file_name(&upload.name)?,
            file_type: type_from_mime(&upload.mime_type),
            size: format_file_size(bytes.len() as u64),
            date: today(),
            version: 1,
            shared_with: Vec::new(),
            preview_url: None,
        };
        tracing::debug!(name = %file.name, bytes = bytes.len(), "file uploaded");
        Ok(self.files.push(file))
    }

    pub fn bump_version(&mut self, id: &str) -> Result<&FileItem> {
        self.files.update(id, |file| file.version += 1)
    }

    /// Add a collaborator. Blank or already-present addresses are ignored.
    pub fn share(&mut self, id: &str, email: &str) -> Result<&FileItem> {
        let email = email.trim().to_string();
        self.files.update(id, |file| {
            if !email.is_empty() && !file.shared_with.contains(&email) {
                file.shared_with.push(email);
            }
        })
    }

    pub fn unshare(&mut self, id: &str, email: &str) -> Result<&FileItem> {
        self.files
            .update(id, |file| file.shared_with.retain(|e| e != email))
    }

    pub fn delete(&mut self, id: &str) -> Result<FileItem> {
        self.files.remove(id)
    }

    pub fn with_demo_data() -> Self {
        let sample = |name: &str, file_type: &str, size: &str, date, version, shared: &[&str], n| FileItem {
            id: new_id(),
            name: name.to_string(),
            file_type: file_type.to_string(),
            size: size.to_string(),
            date,
            version,
            shared_with: shared.iter().map(|s| s.to_string()).collect(),
            preview_url: Some(format!("https://example.com/preview/{}", n)),
        };
        let mut files = Vec::new();
        if let Some(date) = NaiveDate::from_ymd_opt(2025, 4, 5) {
            files.push(sample(
                "project_requirements.pdf",
                "PDF",
                "2.4 MB",
                date,
                1,
                &["team@example.com"],
                1,
            ));
        }
        if let Some(date) = NaiveDate::from_ymd_opt(2025, 4, 12) {
            files.push(sample(
                "color_palette.png",
                "Image",
                "840 KB",
                date,
                2,
                &["team@example.com", "client@example.com"],
                2,
            ));
        }
        Self {
            files: Collection::from_vec(files),
        }
    }
}

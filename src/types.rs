//! Core job types: the report request, its attachments, and the analysis period.

use crate::error::ReportError;
use crate::usage::ModelTier;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

/// Name used when a job has none and the model did not detect one.
pub const PLACEHOLDER_NAME: &str = "Friend";

/// Opaque job identifier, unique within a run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(String);

impl JobId {
    pub fn new() -> Self {
        JobId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        JobId(value.to_string())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Binary material attached to a job (chart exports, scans, PDFs).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    /// Declared media type; guessed from the file name when absent.
    pub media_type: Option<String>,
    /// Shared so cloning a job for display never copies file contents.
    pub bytes: Arc<[u8]>,
}

impl Attachment {
    pub fn new(
        file_name: impl Into<String>,
        media_type: Option<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            media_type,
            bytes: bytes.into(),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, ReportError> {
        let bytes = std::fs::read(path).map_err(|e| {
            ReportError::Io(format!("Failed to read attachment {}: {}", path.display(), e))
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        let media_type = mime_guess::from_path(path)
            .first()
            .map(|mime| mime.essence_str().to_string());
        Ok(Self::new(file_name, media_type, bytes))
    }
}

/// Year-month the report's time-sensitive sections are written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisPeriod {
    pub year: i32,
    pub month: u32,
}

impl AnalysisPeriod {
    pub fn new(year: i32, month: u32) -> Result<Self, ReportError> {
        if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(ReportError::InvalidJob(format!(
                "Invalid analysis period {:04}-{:02}",
                year, month
            )));
        }
        Ok(Self { year, month })
    }

    /// Upper-cased month and year, e.g. `MARCH 2025`.
    pub fn label(&self) -> String {
        match NaiveDate::from_ymd_opt(self.year, self.month, 1) {
            Some(date) => date.format("%B %Y").to_string().to_uppercase(),
            None => self.to_string(),
        }
    }

    /// Label for an optional period; no period means "now".
    pub fn label_for(period: Option<&AnalysisPeriod>) -> String {
        period
            .map(AnalysisPeriod::label)
            .unwrap_or_else(|| "CURRENT PERIOD".to_string())
    }
}

impl FromStr for AnalysisPeriod {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            ReportError::InvalidJob(format!(
                "Analysis period must be YYYY-MM, got '{}'",
                s
            ))
        };
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.is_empty() || month.len() > 2 {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Self::new(year, month)
    }
}

impl fmt::Display for AnalysisPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// One client report request.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    /// Overwritten when the model detects the client's name.
    pub display_name: String,
    pub source_text: String,
    pub attachments: Vec<Attachment>,
    /// Steers which topics the report dwells on.
    pub concerns: String,
    pub period: Option<AnalysisPeriod>,
    pub tier: ModelTier,
}

impl Job {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            id: JobId::new(),
            display_name: display_name.into(),
            source_text: String::new(),
            attachments: Vec::new(),
            concerns: String::new(),
            period: None,
            tier: ModelTier::default(),
        }
    }

    pub fn with_source_text(mut self, text: impl Into<String>) -> Self {
        self.source_text = text.into();
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn with_concerns(mut self, concerns: impl Into<String>) -> Self {
        self.concerns = concerns.into();
        self
    }

    pub fn with_period(mut self, period: AnalysisPeriod) -> Self {
        self.period = Some(period);
        self
    }

    pub fn with_tier(mut self, tier: ModelTier) -> Self {
        self.tier = tier;
        self
    }

    /// Build a job from a single uploaded file, naming it after the file stem.
    pub fn from_attachment_path(path: &Path) -> Result<Self, ReportError> {
        let attachment = Attachment::from_path(path)?;
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().replace('_', " "))
            .unwrap_or_default();
        Ok(Job::new(name.trim()).with_attachment(attachment))
    }

    /// Name shown before any detection happens.
    pub fn initial_display_name(&self) -> String {
        let name = self.display_name.trim();
        if name.is_empty() {
            PLACEHOLDER_NAME.to_string()
        } else {
            name.to_string()
        }
    }

    pub fn validate(&self) -> Result<(), ReportError> {
        if self.source_text.trim().is_empty() && self.attachments.is_empty() {
            return Err(ReportError::InvalidJob(format!(
                "Job {} has neither source text nor attachments",
                self.id
            )));
        }
        Ok(())
    }
}

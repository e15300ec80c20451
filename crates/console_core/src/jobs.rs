//! Retrieval jobs as observed through polling, and the triage that picks which
//! ones deserve attention first.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::classify::{classify, FriendlyError};

/// Number of completed jobs listed as history below the most recent one.
pub const HISTORY_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl JobState {
    pub fn label(self) -> &'static str {
        match self {
            JobState::Pending => "Pending",
            JobState::Processing => "Processing",
            JobState::Completed => "Completed",
            JobState::Failed => "Failed",
            JobState::Cancelled => "Cancelled",
            JobState::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RetrievalJob {
    pub id: JobId,
    #[serde(rename = "empresa_ruc", default)]
    pub company_ruc: String,
    #[serde(rename = "empresa_razon_social", default)]
    pub company_name: Option<String>,
    #[serde(rename = "estado")]
    pub state: JobState,
    #[serde(rename = "periodo")]
    pub period: String,
    #[serde(rename = "modulos", default)]
    pub modules: Vec<String>,
    #[serde(rename = "formatos", default)]
    pub formats: Vec<String>,
    #[serde(rename = "progreso", default)]
    pub progress: u32,
    #[serde(rename = "mensaje_progreso", default)]
    pub progress_message: Option<String>,
    #[serde(rename = "errores", default)]
    pub error_text: Option<String>,
    #[serde(rename = "total_comprobantes", default)]
    pub result_count: u64,
    /// Stored location of the job's archive; absent until one was produced.
    #[serde(rename = "archivo_url", default)]
    pub archive_url: Option<String>,
    #[serde(rename = "excel_url", default)]
    pub spreadsheet_url: Option<String>,
    #[serde(deserialize_with = "deserialize_server_time")]
    pub created_at: DateTime<Utc>,
}

impl RetrievalJob {
    pub fn can_retry(&self) -> bool {
        self.state == JobState::Failed
    }

    pub fn can_cancel(&self) -> bool {
        matches!(self.state, JobState::Pending | JobState::Processing)
    }

    /// Classification of the failure; `None` unless the job failed.
    pub fn friendly_error(&self) -> Option<FriendlyError> {
        (self.state == JobState::Failed).then(|| classify(self.error_text.as_deref()))
    }

    /// One status line for list rendering.
    pub fn status_line(&self) -> Option<String> {
        match self.state {
            JobState::Processing => Some(match &self.progress_message {
                Some(message) => format!("{}% {}", self.progress.min(100), message),
                None => format!("{}%", self.progress.min(100)),
            }),
            JobState::Failed => self
                .friendly_error()
                .map(|err| format!("{} - {}", err.headline, err.remedy)),
            JobState::Cancelled => Some(
                self.progress_message
                    .clone()
                    .unwrap_or_else(|| "Cancelled by user".to_string()),
            ),
            JobState::Pending | JobState::Completed | JobState::Unknown => None,
        }
    }
}

/// One file generated by a completed job, as listed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JobFile {
    pub id: String,
    /// Name the server wants the file saved under.
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "modulo", default)]
    pub module: String,
    #[serde(rename = "tipo_archivo", default)]
    pub kind: String,
    #[serde(rename = "tamano_bytes", default)]
    pub size_bytes: u64,
}

/// Payload for creating a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewJob {
    #[serde(rename = "empresa_id")]
    pub company_id: String,
    #[serde(rename = "periodo")]
    pub period: String,
    #[serde(rename = "modulos")]
    pub modules: Vec<String>,
    #[serde(rename = "formatos")]
    pub formats: Vec<String>,
}

/// Server timestamps may omit the zone; such values are UTC, never local time.
pub fn parse_server_time(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(stamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(stamp.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn deserialize_server_time<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_server_time(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{raw}'")))
}

/// Jobs grouped for prominent display.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobBoard {
    pub processing: Vec<RetrievalJob>,
    pub failed: Vec<RetrievalJob>,
    pub last_completed: Option<RetrievalJob>,
    pub history: Vec<RetrievalJob>,
}

/// Every processing and failed job, the newest completed job, and up to
/// [`HISTORY_LEN`] further completed jobs; each group newest first.
pub fn triage(jobs: &[RetrievalJob]) -> JobBoard {
    let mut ordered: Vec<&RetrievalJob> = jobs.iter().collect();
    ordered.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let pick = |state: JobState| -> Vec<RetrievalJob> {
        ordered
            .iter()
            .filter(|job| job.state == state)
            .map(|job| (*job).clone())
            .collect()
    };

    let mut completed = pick(JobState::Completed).into_iter();
    let last_completed = completed.next();
    let history = completed.take(HISTORY_LEN).collect();

    JobBoard {
        processing: pick(JobState::Processing),
        failed: pick(JobState::Failed),
        last_completed,
        history,
    }
}

const MODULE_LABELS: &[(&str, &str)] = &[
    ("facturas_emitidas", "Issued invoices"),
    ("facturas_recibidas", "Received invoices"),
    ("boletas_emitidas", "Issued receipts"),
    ("boletas_recibidas", "Received receipts"),
    ("nc_boletas_emitidas", "Issued receipt credit notes"),
    ("nd_boletas_emitidas", "Issued receipt debit notes"),
    ("guias_remision_emitidas", "Issued dispatch guides"),
    ("guias_remision_recibidas", "Received dispatch guides"),
    ("guias_transportista_emitidas", "Issued carrier guides"),
    ("guias_transportista_recibidas", "Received carrier guides"),
    ("retenciones_emitidas", "Issued withholdings"),
    ("retenciones_recibidas", "Received withholdings"),
    ("percepciones_emitidas", "Issued perceptions"),
    ("percepciones_recibidas", "Received perceptions"),
];

/// Human label for a document-category tag; unknown tags are shown verbatim.
pub fn module_label(tag: &str) -> &str {
    MODULE_LABELS
        .iter()
        .find(|(key, _)| *key == tag)
        .map(|(_, label)| *label)
        .unwrap_or(tag)
}

/// `"A, B, +3 more"` style summary showing at most `max_shown` labels.
pub fn summarize_modules(modules: &[String], max_shown: usize) -> String {
    let labels: Vec<&str> = modules.iter().map(|m| module_label(m)).collect();
    if labels.len() <= max_shown {
        return labels.join(", ");
    }
    let shown = labels[..max_shown].join(", ");
    format!("{shown}, +{} more", labels.len() - max_shown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_less_timestamps_are_utc() {
        let naive = parse_server_time("2024-03-01T12:30:00").unwrap();
        let zoned = parse_server_time("2024-03-01T12:30:00Z").unwrap();
        let offset = parse_server_time("2024-03-01T07:30:00-05:00").unwrap();
        assert_eq!(naive, zoned);
        assert_eq!(offset, zoned);
        assert!(parse_server_time("2024-03-01 12:30:00.123456").is_some());
        assert!(parse_server_time("yesterday").is_none());
    }

    #[test]
    fn module_summary_truncates() {
        let modules = vec![
            "facturas_emitidas".to_string(),
            "boletas_emitidas".to_string(),
            "custom_tag".to_string(),
        ];
        assert_eq!(
            summarize_modules(&modules, 2),
            "Issued invoices, Issued receipts, +1 more"
        );
        assert_eq!(summarize_modules(&modules[2..], 2), "custom_tag");
        assert_eq!(summarize_modules(&[], 2), "");
    }
}

use chrono::{DateTime, Utc};
use console_core::DownloadRequest;

const MAX_STEM_CHARS: usize = 80;

/// Deterministic, filesystem-safe name for a downloaded file.
///
/// Job archives are `{ruc}_{period}.zip` (or `.xlsx` unless the content type or
/// the stored location says zip), single job files keep the server's name,
/// single documents are `{series}-{number}.{ext}`, bulk exports
/// `comprobantes_{date}.xlsx` and batch archives `comprobantes_{unix_millis}.zip`.
pub fn download_filename(
    request: &DownloadRequest,
    content_type: Option<&str>,
    now: DateTime<Utc>,
) -> String {
    match request {
        DownloadRequest::JobArchive {
            ruc,
            period,
            archive_url,
            ..
        } => {
            let is_zip = content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("zip"))
                || archive_url
                    .as_deref()
                    .is_some_and(|url| url.to_ascii_lowercase().ends_with(".zip"));
            let extension = if is_zip { "zip" } else { "xlsx" };
            format!("{}.{extension}", sanitize_stem(&format!("{ruc}_{period}")))
        }
        DownloadRequest::JobSpreadsheet { ruc, period, .. } => {
            format!("{}.xlsx", sanitize_stem(&format!("{ruc}_{period}_detallado")))
        }
        DownloadRequest::JobFile { name, .. } => sanitize_file_name(name),
        DownloadRequest::Batch { .. } => {
            format!("comprobantes_{}.zip", now.timestamp_millis())
        }
        DownloadRequest::Selection { .. } | DownloadRequest::Filtered { .. } => {
            format!("comprobantes_{}.xlsx", now.format("%Y-%m-%d"))
        }
        DownloadRequest::Document {
            series,
            number,
            file,
            ..
        } => format!(
            "{}.{}",
            sanitize_stem(&format!("{series}-{number}")),
            file.extension()
        ),
    }
}

/// Server-given `stem.ext`; the extension survives sanitizing when it is plain.
fn sanitize_file_name(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext))
            if !ext.is_empty()
                && ext.len() <= 8
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            format!("{}.{}", sanitize_stem(stem), ext.to_ascii_lowercase())
        }
        _ => sanitize_stem(name),
    }
}

fn sanitize_stem(input: &str) -> String {
    let cleaned: String = input
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim_matches(&['_', ' ', '.'][..]);

    // Collapse runs of underscores.
    let mut compacted = String::with_capacity(cleaned.len());
    let mut prev_underscore = false;
    for c in cleaned.chars() {
        if c == '_' && prev_underscore {
            continue;
        }
        prev_underscore = c == '_';
        compacted.push(c);
    }

    let mut stem: String = compacted.chars().take(MAX_STEM_CHARS).collect();
    if stem.is_empty() {
        stem = "download".to_string();
    }
    if is_reserved_windows_name(&stem) {
        stem.push('_');
    }
    stem
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

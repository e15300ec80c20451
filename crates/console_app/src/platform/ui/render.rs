//! Plain-text rendering of the view model.

use std::fmt::Write;

use chrono::{DateTime, Utc};
use console_core::{AppViewModel, DocumentRowView, JobFilesView, JobRowView, Level, Tone};

pub fn render_board(view: &AppViewModel, now: DateTime<Utc>) -> String {
    let mut out = String::new();
    if !view.jobs_loaded {
        out.push_str("Jobs: not loaded yet\n");
        return out;
    }
    let board = &view.board;
    if !board.has_activity() {
        out.push_str("No retrieval jobs yet\n");
        return out;
    }

    section(&mut out, "In progress", &board.processing, now);
    section(&mut out, "Failed", &board.failed, now);
    if let Some(last) = &board.last_completed {
        section(&mut out, "Last completed", std::slice::from_ref(last), now);
    }
    section(&mut out, "Recent", &board.history, now);
    out
}

fn section(out: &mut String, title: &str, rows: &[JobRowView], now: DateTime<Utc>) {
    if rows.is_empty() {
        return;
    }
    let _ = writeln!(out, "{title}:");
    for row in rows {
        let _ = writeln!(
            out,
            "  {:<10} {} {} {:<8} {:>5} docs  {:<30} {}{}",
            row.state.label(),
            row.job_id,
            row.company_ruc,
            row.period,
            row.result_count,
            row.modules,
            relative_age(row.created_at, now),
            artifacts(row)
        );
        if let Some(error) = &row.error {
            let _ = writeln!(
                out,
                "    [{}] {}: {}",
                tone_tag(error.category.tone()),
                error.headline,
                error.remedy
            );
        } else if let Some(status) = &row.status_line {
            let _ = writeln!(out, "    {status}");
        }
    }
}

fn artifacts(row: &JobRowView) -> &'static str {
    match (row.has_archive, row.has_spreadsheet) {
        (true, true) => "  [archive] [xlsx]",
        (true, false) => "  [archive]",
        (false, true) => "  [xlsx]",
        (false, false) => "",
    }
}

pub fn render_job_files(files: &JobFilesView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Files of job {}:", files.job_id);
    if files.loading {
        out.push_str("  loading...\n");
    } else if files.files.is_empty() {
        out.push_str("  no files\n");
    }
    for file in &files.files {
        let _ = writeln!(
            out,
            "  {:<12} {:<40} {:<24} {:<5} {:>8}",
            file.id, file.name, file.module, file.kind, file.size
        );
    }
    out
}

pub fn render_documents(view: &AppViewModel) -> String {
    let mut out = String::new();
    let filters = if view.active_filter_count == 0 {
        "no filters".to_string()
    } else {
        format!("{} filter(s)", view.active_filter_count)
    };
    let _ = writeln!(out, "Documents [{}] query={:?}", filters, view.query);
    if view.page_loading || view.search_pending {
        out.push_str("  loading...\n");
    }
    if view.documents.is_empty() {
        out.push_str("  no documents\n");
        return out;
    }
    for row in &view.documents {
        out.push_str(&document_line(row));
        out.push('\n');
    }
    let p = view.pagination;
    let _ = writeln!(
        out,
        "  rows {}-{} of {}  page {}/{}{}{}",
        p.first_row,
        p.last_row,
        view.total,
        p.page,
        p.total_pages.max(1),
        if p.has_prev { "  [prev]" } else { "" },
        if p.has_next { "  [next]" } else { "" },
    );
    if view.selected_count > 0 {
        let _ = writeln!(out, "  {} selected", view.selected_count);
    }
    out
}

fn document_line(row: &DocumentRowView) -> String {
    let total = match row.total {
        Some(total) => format!("{total:.2} {}", row.currency),
        None => "-".to_string(),
    };
    let files = match (row.has_xml, row.has_pdf) {
        (true, true) => "xml,pdf",
        (true, false) => "xml",
        (false, true) => "pdf",
        (false, false) => "-",
    };
    format!(
        "  {} {:<14} {:<16} {} {} {:<30} {:>14} {:<7} {}",
        if row.selected { "[x]" } else { "[ ]" },
        row.kind,
        row.reference,
        row.issued_on,
        row.counterparty,
        row.counterparty_name,
        total,
        files,
        row.id
    )
}

pub fn render_notifications(view: &AppViewModel) -> String {
    let mut out = String::new();
    for note in &view.notifications {
        let tag = match note.level {
            Level::Success => "ok",
            Level::Error => "error",
        };
        let _ = writeln!(out, "[{tag}] {}", note.text);
    }
    out
}

fn tone_tag(tone: Tone) -> &'static str {
    match tone {
        Tone::Warning => "warning",
        Tone::Info => "info",
        Tone::External => "external",
        Tone::Critical => "critical",
    }
}

/// Age of a server timestamp, e.g. `5m ago`. Timestamps are UTC instants.
pub fn relative_age(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - at).num_seconds();
    match secs {
        s if s < 60 => "just now".to_string(),
        s if s < 3_600 => format!("{}m ago", s / 60),
        s if s < 86_400 => format!("{}h ago", s / 3_600),
        s => format!("{}d ago", s / 86_400),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use console_core::{update, AppState, Msg, RetrievalJob};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn ages_are_relative_to_utc() {
        assert_eq!(relative_age(now(), now()), "just now");
        assert_eq!(
            relative_age(Utc.with_ymd_and_hms(2024, 5, 1, 11, 55, 0).unwrap(), now()),
            "5m ago"
        );
        assert_eq!(
            relative_age(Utc.with_ymd_and_hms(2024, 4, 29, 12, 0, 0).unwrap(), now()),
            "2d ago"
        );
    }

    #[test]
    fn job_files_are_listed_with_sizes() {
        let files = JobFilesView {
            job_id: console_core::JobId::new("j7"),
            loading: false,
            files: vec![console_core::JobFileRowView {
                id: "f1".into(),
                name: "facturas_emitidas.zip".into(),
                module: "Facturas emitidas".into(),
                kind: "ZIP".into(),
                size: "1.5 KB".into(),
            }],
        };
        let text = render_job_files(&files);
        assert!(text.starts_with("Files of job j7:\n"));
        assert!(text.contains("facturas_emitidas.zip"));
        assert!(text.contains("1.5 KB"));

        let empty = JobFilesView {
            files: Vec::new(),
            ..files
        };
        assert!(render_job_files(&empty).contains("no files"));
    }

    #[test]
    fn failed_job_shows_headline_and_remedy() {
        let job: RetrievalJob = serde_json::from_value(serde_json::json!({
            "id": "j1",
            "empresa_ruc": "20123456789",
            "estado": "failed",
            "periodo": "2024-04",
            "modulos": ["facturas_emitidas", "boletas_emitidas", "notas_credito"],
            "errores": "Usuario o clave incorrecta",
            "created_at": "2024-05-01T09:00:00"
        }))
        .unwrap();
        let (state, _) = update(AppState::new(), Msg::PollTick);
        let (state, _) = update(state, Msg::JobsLoaded(Ok(vec![job])));

        let text = render_board(&state.view(), now());
        assert!(text.starts_with("Failed:\n"));
        assert!(text.contains("[warning]"));
        assert!(text.contains("+1 more"));
        assert!(text.contains("3h ago"));
    }
}

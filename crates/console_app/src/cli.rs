//! Command-line interface for the retrieval console.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use console_core::{
    AppViewModel, BatchFormat, DocumentFile, FilterPatch, JobId, Msg, NewJob, SortOrder,
};
use console_logging::LogDestination;
use log::LevelFilter;

use crate::platform::app::{failure, last_notification_id, Console};
use crate::platform::config::AppConfig;
use crate::platform::ui::render::{
    render_board, render_documents, render_job_files, render_notifications,
};

/// Retrieval console - watch document retrieval jobs and browse their results.
#[derive(Parser, Debug)]
#[command(name = "retrieval-console")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// RON config file
    #[arg(long, default_value = "console.ron", global = true)]
    pub config: PathBuf,

    /// Where log output goes
    #[arg(long, value_enum, default_value_t = LogArg::File, global = true)]
    pub log: LogArg,

    /// Log file used by `--log file|both`
    #[arg(long, default_value = "console.log", global = true)]
    pub log_file: PathBuf,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the job board; with --watch keep polling.
    Jobs {
        #[arg(long)]
        watch: bool,
    },
    /// Start a retrieval job.
    Create {
        /// Company id
        #[arg(long)]
        company: String,
        /// Period, e.g. 2024-05
        #[arg(long)]
        period: String,
        /// Document category tag (repeatable)
        #[arg(long = "module", required = true)]
        modules: Vec<String>,
        /// File format to retrieve (repeatable)
        #[arg(long = "format", default_values_t = ["xml".to_string(), "pdf".to_string()])]
        formats: Vec<String>,
    },
    /// Re-run a failed job.
    Retry { job_id: String },
    /// Cancel a pending or running job.
    Cancel { job_id: String },
    /// Download the archive of a completed job.
    Archive { job_id: String },
    /// Download the detailed spreadsheet of a completed job.
    Spreadsheet { job_id: String },
    /// List the files stored for a completed job; --get downloads one by id.
    JobFiles {
        job_id: String,
        /// File id to download (repeatable)
        #[arg(long = "get")]
        files: Vec<String>,
    },
    /// List documents; filter changes are remembered for the next run.
    Docs(FilterArgs),
    /// Download documents on the current page as one archive.
    Batch {
        #[command(flatten)]
        filters: FilterArgs,
        #[command(flatten)]
        pick: PickArgs,
        #[arg(long, value_enum, default_value_t = FormatArg::All)]
        format: FormatArg,
    },
    /// Export documents on the current page to a spreadsheet.
    ExportSelection {
        #[command(flatten)]
        filters: FilterArgs,
        #[command(flatten)]
        pick: PickArgs,
    },
    /// Export every document matching the filters to a spreadsheet.
    Export(FilterArgs),
    /// Download the XML or PDF of one document on the current page.
    Document {
        id: String,
        #[arg(long, value_enum, default_value_t = FileArg::Xml)]
        file: FileArg,
        #[command(flatten)]
        filters: FilterArgs,
    },
}

#[derive(Args, Debug, Default, Clone)]
pub struct FilterArgs {
    /// Free-text search over series, number and counterparty
    #[arg(long)]
    pub search: Option<String>,
    /// Company id (`__all__` for every company)
    #[arg(long)]
    pub company: Option<String>,
    /// First period, e.g. 2024-01
    #[arg(long)]
    pub from: Option<String>,
    /// Last period
    #[arg(long)]
    pub to: Option<String>,
    /// Document type
    #[arg(long = "type")]
    pub document_type: Option<String>,
    /// emitidas or recibidas
    #[arg(long)]
    pub direction: Option<String>,
    #[arg(long)]
    pub sort: Option<String>,
    #[arg(long, value_enum)]
    pub order: Option<OrderArg>,
    #[arg(long)]
    pub page: Option<u32>,
    /// Rows per page
    #[arg(long)]
    pub limit: Option<u32>,
    /// Replace the whole query, as copied from a shared link
    #[arg(long, conflicts_with = "clear")]
    pub location: Option<String>,
    /// Drop every filter first
    #[arg(long)]
    pub clear: bool,
}

impl FilterArgs {
    fn patch(&self) -> Option<FilterPatch> {
        let patch = FilterPatch {
            search: self.search.clone(),
            company_id: self.company.clone(),
            period_from: self.from.clone(),
            period_to: self.to.clone(),
            document_type: self.document_type.clone(),
            direction: self.direction.clone(),
            sort_field: self.sort.clone(),
            sort_order: self.order.map(SortOrder::from),
            page: self.page,
            page_size: self.limit,
        };
        (patch != FilterPatch::default()).then_some(patch)
    }
}

#[derive(Args, Debug, Clone)]
pub struct PickArgs {
    /// Document ids to select (comma separated)
    #[arg(long, value_delimiter = ',', required_unless_present = "all_on_page")]
    pub ids: Vec<String>,
    /// Select every document on the page
    #[arg(long)]
    pub all_on_page: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogArg {
    Terminal,
    File,
    Both,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderArg {
    Asc,
    Desc,
}

impl From<OrderArg> for SortOrder {
    fn from(order: OrderArg) -> Self {
        match order {
            OrderArg::Asc => SortOrder::Asc,
            OrderArg::Desc => SortOrder::Desc,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatArg {
    Xml,
    Pdf,
    All,
}

impl From<FormatArg> for BatchFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Xml => BatchFormat::Xml,
            FormatArg::Pdf => BatchFormat::Pdf,
            FormatArg::All => BatchFormat::All,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileArg {
    Xml,
    Pdf,
}

impl From<FileArg> for DocumentFile {
    fn from(file: FileArg) -> Self {
        match file {
            FileArg::Xml => DocumentFile::Xml,
            FileArg::Pdf => DocumentFile::Pdf,
        }
    }
}

impl Cli {
    pub fn log_destination(&self) -> LogDestination {
        match self.log {
            LogArg::Terminal => LogDestination::Terminal,
            LogArg::File => LogDestination::File,
            LogArg::Both => LogDestination::Both,
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

/// Run a parsed command line.
pub fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load(&cli.config)?;
    let mut console = Console::new(&config).context("could not start the console engine")?;
    // Long enough for one request plus a debounced search.
    let patience = Duration::from_millis(
        config.connect_timeout_ms + config.request_timeout_ms + config.search_debounce_ms,
    );

    match cli.command {
        Commands::Jobs { watch: true } => {
            console.watch(|view| {
                print!("{}", render_board(view, Utc::now()));
                print!("{}", render_notifications(view));
                println!();
            });
            Ok(())
        }
        Commands::Jobs { watch: false } => {
            load_jobs(&mut console, patience)?;
            print!("{}", render_board(&console.view(), Utc::now()));
            Ok(())
        }
        Commands::Create {
            company,
            period,
            modules,
            formats,
        } => {
            let job = NewJob {
                company_id: company,
                period,
                modules,
                formats,
            };
            job_action(&mut console, patience, Msg::CreateJobSubmitted(job))
        }
        Commands::Retry { job_id } => {
            load_jobs(&mut console, patience)?;
            job_action(&mut console, patience, Msg::RetryClicked(JobId::new(job_id)))
        }
        Commands::Cancel { job_id } => {
            load_jobs(&mut console, patience)?;
            job_action(&mut console, patience, Msg::CancelClicked(JobId::new(job_id)))
        }
        Commands::Archive { job_id } => {
            load_jobs(&mut console, patience)?;
            transfer(
                &mut console,
                patience,
                Msg::DownloadArchiveClicked(JobId::new(job_id)),
            )
        }
        Commands::Spreadsheet { job_id } => {
            load_jobs(&mut console, patience)?;
            transfer(
                &mut console,
                patience,
                Msg::DownloadSpreadsheetClicked(JobId::new(job_id)),
            )
        }
        Commands::JobFiles { job_id, files } => {
            load_jobs(&mut console, patience)?;
            list_job_files(&mut console, patience, JobId::new(job_id))?;
            for file_id in files {
                transfer(&mut console, patience, Msg::JobFileClicked(file_id))?;
            }
            Ok(())
        }
        Commands::Docs(filters) => {
            show_page(&mut console, patience, &filters)?;
            print!("{}", render_documents(&console.view()));
            report(&console.view())
        }
        Commands::Batch {
            filters,
            pick,
            format,
        } => {
            show_page(&mut console, patience, &filters)?;
            select(&mut console, &pick);
            transfer(
                &mut console,
                patience,
                Msg::BatchDownloadClicked(format.into()),
            )
        }
        Commands::ExportSelection { filters, pick } => {
            show_page(&mut console, patience, &filters)?;
            select(&mut console, &pick);
            transfer(&mut console, patience, Msg::ExportSelectionClicked)
        }
        Commands::Export(filters) => {
            show_page(&mut console, patience, &filters)?;
            transfer(&mut console, patience, Msg::ExportFilteredClicked)
        }
        Commands::Document { id, file, filters } => {
            show_page(&mut console, patience, &filters)?;
            transfer(
                &mut console,
                patience,
                Msg::DocumentFileClicked {
                    id,
                    file: file.into(),
                },
            )
        }
    }
}

fn load_jobs(console: &mut Console, patience: Duration) -> Result<()> {
    console.dispatch(Msg::RefreshJobsClicked);
    if !console.run_until(patience, |view| !view.polling) {
        bail!("timed out waiting for the job list");
    }
    if !console.view().jobs_loaded {
        bail!("could not load the job list, see the log for details");
    }
    Ok(())
}

/// Issue a create/retry/cancel and wait for its acknowledgement and the re-poll after it.
fn job_action(console: &mut Console, patience: Duration, msg: Msg) -> Result<()> {
    let before = last_notification_id(&console.view());
    console.dispatch(msg);
    let done = console.run_until(patience * 2, |view| {
        last_notification_id(view) != before && !view.polling
    });
    let view = console.view();
    print!("{}", render_notifications(&view));
    if !done {
        bail!("timed out waiting for the server");
    }
    if view.jobs_loaded {
        print!("{}", render_board(&view, Utc::now()));
    }
    report(&view)
}

fn list_job_files(console: &mut Console, patience: Duration, job_id: JobId) -> Result<()> {
    console.dispatch(Msg::JobFilesClicked(job_id));
    let done = console.run_until(patience, |view| {
        view.job_files.as_ref().map_or(true, |files| !files.loading)
    });
    if !done {
        bail!("timed out waiting for the file list");
    }
    let view = console.view();
    match &view.job_files {
        Some(files) => {
            print!("{}", render_job_files(files));
            Ok(())
        }
        None => {
            print!("{}", render_notifications(&view));
            report(&view)
        }
    }
}

fn transfer(console: &mut Console, patience: Duration, msg: Msg) -> Result<()> {
    console.dispatch(msg);
    let done = console.run_until(patience, |view| view.transfers_in_flight == 0);
    let view = console.view();
    print!("{}", render_notifications(&view));
    if !done {
        bail!("timed out waiting for the download");
    }
    report(&view)
}

/// Restore the remembered query, apply the requested changes and wait for the page.
fn show_page(console: &mut Console, patience: Duration, filters: &FilterArgs) -> Result<()> {
    match &filters.location {
        Some(location) => console.dispatch(Msg::LocationChanged(location.clone())),
        None => console.restore_location(),
    }
    if filters.clear {
        console.dispatch(Msg::FiltersCleared);
    }
    if let Some(patch) = filters.patch() {
        console.dispatch(Msg::FiltersPatched(patch));
    }
    if !console.run_until(patience, |view| !view.page_loading && !view.search_pending) {
        bail!("timed out waiting for documents");
    }
    Ok(())
}

fn select(console: &mut Console, pick: &PickArgs) {
    if pick.all_on_page {
        console.dispatch(Msg::SelectAllToggled);
        return;
    }
    for id in &pick.ids {
        console.dispatch(Msg::SelectionToggled(id.clone()));
    }
}

fn report(view: &AppViewModel) -> Result<()> {
    match failure(view) {
        Some(text) => bail!(text),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn filter_flags_become_one_patch() {
        let cli = Cli::parse_from([
            "retrieval-console",
            "docs",
            "--type",
            "boleta",
            "--search",
            "F001",
            "--order",
            "asc",
        ]);
        let Commands::Docs(filters) = cli.command else {
            panic!("expected docs");
        };
        let patch = filters.patch().unwrap();
        assert_eq!(patch.document_type.as_deref(), Some("boleta"));
        assert_eq!(patch.search.as_deref(), Some("F001"));
        assert_eq!(patch.sort_order, Some(SortOrder::Asc));
        assert!(!patch.is_search_only());
    }

    #[test]
    fn no_filter_flags_means_no_patch() {
        assert_eq!(FilterArgs::default().patch(), None);
    }

    #[test]
    fn job_files_take_repeated_get() {
        let cli = Cli::parse_from(["retrieval-console", "job-files", "j1", "--get", "f1", "--get", "f2"]);
        let Commands::JobFiles { job_id, files } = cli.command else {
            panic!("expected job-files");
        };
        assert_eq!(job_id, "j1");
        assert_eq!(files, vec!["f1", "f2"]);
    }

    #[test]
    fn batch_needs_ids_or_whole_page() {
        assert!(Cli::try_parse_from(["retrieval-console", "batch"]).is_err());
        assert!(Cli::try_parse_from(["retrieval-console", "batch", "--all-on-page"]).is_ok());
        let cli = Cli::try_parse_from(["retrieval-console", "batch", "--ids", "a,b", "--format", "xml"])
            .unwrap();
        let Commands::Batch { pick, format, .. } = cli.command else {
            panic!("expected batch");
        };
        assert_eq!(pick.ids, vec!["a", "b"]);
        assert_eq!(format, FormatArg::Xml);
    }
}

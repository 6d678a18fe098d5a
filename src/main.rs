use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use capshare::config::Config;
use capshare::job::{
    ClipboardContent, Job, JobDependencies, JobKind, JobManager, JobReport, JobState,
    OutputDestination, UploadOutcome, UploaderSelection,
};
use capshare::naming::NamingPolicy;
use capshare::upload::{Uploader, UploaderKind, UploaderRegistry};
use clap::{ArgAction, Parser};

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("CAPSHARE_GIT_HASH"), ")");

#[derive(Parser, Debug)]
#[command(name = "capshare")]
#[command(version = VERSION, about = "Screen capture and multi-destination upload tool")]
struct Cli {
    /// Output destination codes (see --list); defaults to clipboard and local disk
    #[arg(short = 'o', long = "outputs", value_name = "CODE", num_args = 1.., action = ArgAction::Append)]
    outputs: Vec<u8>,

    /// Image uploader codes
    #[arg(short = 'i', long = "hi", value_name = "CODE", num_args = 1.., action = ArgAction::Append)]
    image_uploaders: Vec<usize>,

    /// Text uploader codes
    #[arg(short = 't', long = "ht", value_name = "CODE", num_args = 1.., action = ArgAction::Append)]
    text_uploaders: Vec<usize>,

    /// File uploader codes
    #[arg(short = 'f', long = "hf", value_name = "CODE", num_args = 1.., action = ArgAction::Append)]
    file_uploaders: Vec<usize>,

    /// URL shortener codes
    #[arg(short = 'l', long = "hl", value_name = "CODE", num_args = 1.., action = ArgAction::Append)]
    link_uploaders: Vec<usize>,

    /// What goes on the clipboard: 0 data, 1 local path, 2 remote URL
    #[arg(long = "cc", value_name = "CODE")]
    clipboard_content: Option<u8>,

    /// Capture a window picked by clicking on it
    #[arg(short = 's', long = "ws", action = ArgAction::SetTrue)]
    selected_window: bool,

    /// Capture a rectangular region
    #[arg(short = 'r', long = "wc", action = ArgAction::SetTrue)]
    region: bool,

    /// Capture a freehand selection (saved as its bounding box)
    #[arg(long = "freehand", action = ArgAction::SetTrue)]
    freehand: bool,

    /// Capture the entire screen after --delay seconds
    #[arg(short = 'd', long = "wf", action = ArgAction::SetTrue)]
    entire_screen: bool,

    /// Capture the active window
    #[arg(short = 'a', long = "wa", action = ArgAction::SetTrue)]
    active_window: bool,

    /// Upload the clipboard contents
    #[arg(short = 'c', long = "uc", action = ArgAction::SetTrue)]
    clipboard: bool,

    /// Upload files; directories are walked recursively
    #[arg(short = 'u', long = "uf", value_name = "PATH", num_args = 1.., action = ArgAction::Append)]
    files: Vec<PathBuf>,

    /// Print output, clipboard and uploader codes
    #[arg(long, action = ArgAction::SetTrue)]
    list: bool,

    /// Seconds to wait before an entire-screen capture
    #[arg(long, value_name = "SECS", default_value_t = 3)]
    delay: u64,

    /// Configuration file (default: ~/.config/capshare/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short = 'v', long, action = ArgAction::SetTrue)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = match &cli.config {
        Some(path) if !path.exists() => bail!("config file {} not found", path.display()),
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let config = Arc::new(config);
    let naming = NamingPolicy::new(&config.naming);
    let registry = UploaderRegistry::from_config(&config.uploaders, &naming)
        .context("failed to set up uploaders")?;

    if cli.list {
        print_codes(&registry);
        return Ok(ExitCode::SUCCESS);
    }

    let jobs = build_jobs(&cli, &config, &registry)?;
    if jobs.is_empty() {
        bail!("nothing to do; pass a capture or upload flag (see --help)");
    }

    let needs_wayland = jobs.iter().any(|j| !matches!(j.kind, JobKind::File(_)));
    if needs_wayland && std::env::var_os("WAYLAND_DISPLAY").is_none() {
        bail!("WAYLAND_DISPLAY not set - screen and clipboard jobs require a Wayland session");
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let dependencies = JobDependencies::desktop(Arc::clone(&config), naming);
    let manager = JobManager::new(dependencies);
    let reports = runtime.block_on(manager.run_batch(jobs));

    for report in &reports {
        print_report(report);
    }
    Ok(exit_code(&reports))
}

fn build_jobs(cli: &Cli, config: &Config, registry: &UploaderRegistry) -> Result<Vec<Job>> {
    let outputs = if cli.outputs.is_empty() {
        config.defaults.outputs.clone()
    } else {
        cli.outputs
            .iter()
            .map(|&code| {
                OutputDestination::from_code(code)
                    .ok_or_else(|| anyhow!("unknown output code {} (see --list)", code))
            })
            .collect::<Result<Vec<_>>>()?
    };

    let clipboard_content = match cli.clipboard_content {
        Some(code) => ClipboardContent::from_code(code)
            .ok_or_else(|| anyhow!("unknown clipboard content code {} (see --list)", code))?,
        None => config.defaults.clipboard_content,
    };

    let uploaders = UploaderSelection {
        image: select(registry, UploaderKind::Image, &cli.image_uploaders, &config.defaults.image_uploaders)?,
        text: select(registry, UploaderKind::Text, &cli.text_uploaders, &config.defaults.text_uploaders)?,
        file: select(registry, UploaderKind::File, &cli.file_uploaders, &config.defaults.file_uploaders)?,
        link: select(registry, UploaderKind::Link, &cli.link_uploaders, &config.defaults.link_uploaders)?,
        shared_folder: registry.shared_folder(),
    };

    let mut kinds = Vec::new();
    if cli.selected_window {
        kinds.push(JobKind::SelectedWindow);
    }
    if cli.region {
        kinds.push(JobKind::Region);
    }
    if cli.freehand {
        kinds.push(JobKind::Freehand);
    }
    if cli.entire_screen {
        kinds.push(JobKind::EntireScreen);
    }
    if cli.active_window {
        kinds.push(JobKind::ActiveWindow);
    }
    if cli.clipboard {
        kinds.push(JobKind::Clipboard);
    }
    for path in &cli.files {
        kinds.extend(expand_path(path).into_iter().map(JobKind::File));
    }

    Ok(kinds
        .into_iter()
        .map(|kind| {
            let delay = if kind == JobKind::EntireScreen {
                Duration::from_secs(cli.delay)
            } else {
                Duration::ZERO
            };
            Job::new(kind)
                .with_outputs(outputs.iter().copied())
                .with_uploaders(uploaders.clone())
                .with_clipboard_content(clipboard_content)
                .with_overwrite(config.naming.overwrite)
                .with_capture_delay(delay)
        })
        .collect())
}

/// Command line codes win; otherwise the configured adapter names are used.
fn select(
    registry: &UploaderRegistry,
    kind: UploaderKind,
    codes: &[usize],
    configured: &[String],
) -> Result<Vec<Arc<dyn Uploader>>> {
    if !codes.is_empty() {
        return codes
            .iter()
            .map(|&code| {
                registry
                    .by_code(kind, code)
                    .ok_or_else(|| anyhow!("unknown {} uploader code {} (see --list)", kind, code))
            })
            .collect();
    }

    Ok(configured
        .iter()
        .filter_map(|name| {
            let found = registry.by_name(kind, name);
            if found.is_none() {
                log::warn!("Unknown {} uploader '{}' in config, ignoring", kind, name);
            }
            found
        })
        .collect())
}

/// Files as given; directories expanded recursively in name order.
fn expand_path(path: &Path) -> Vec<PathBuf> {
    if !path.is_dir() {
        return vec![path.to_path_buf()];
    }
    let mut entries: Vec<PathBuf> = match fs::read_dir(path) {
        Ok(entries) => entries.filter_map(|e| e.ok().map(|e| e.path())).collect(),
        Err(e) => {
            log::warn!("Cannot read directory {}: {}", path.display(), e);
            return Vec::new();
        }
    };
    entries.sort();
    entries.into_iter().flat_map(|entry| expand_path(&entry)).collect()
}

fn print_codes(registry: &UploaderRegistry) {
    println!("Outputs (-o):");
    for output in OutputDestination::ALL {
        println!("  {}  {}", output.code(), output.label());
    }
    println!("Clipboard content (--cc):");
    for content in ClipboardContent::ALL {
        println!("  {}  {}", content.code(), content.label());
    }

    let listing = registry.listing();
    for (kind, flag) in [
        (UploaderKind::Image, "-i"),
        (UploaderKind::Text, "-t"),
        (UploaderKind::File, "-f"),
        (UploaderKind::Link, "-l"),
    ] {
        println!("{} uploaders ({}):", capitalize(kind.label()), flag);
        let rows: Vec<_> = listing.iter().filter(|row| row.kind == kind).collect();
        if rows.is_empty() {
            println!("  (none)");
        }
        for row in rows {
            let note = if row.configured { "" } else { " (not configured)" };
            println!("  {}  {}{}", row.code, row.name, note);
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn print_report(report: &JobReport) {
    match report.state {
        JobState::Canceled => {
            eprintln!("Job {} canceled", report.job_id);
            return;
        }
        JobState::Failed => {
            eprintln!(
                "Job {} failed: {}",
                report.job_id,
                report.error.as_deref().unwrap_or("unknown error")
            );
            return;
        }
        _ => {}
    }

    for upload in &report.uploads {
        match &upload.outcome {
            UploadOutcome::Success(location) => println!("{}", location),
            UploadOutcome::Error(message) => eprintln!("{}: {}", upload.destination, message),
        }
    }
    if let Some(path) = &report.local_path {
        println!("{}", path.display());
    }
    for warning in &report.warnings {
        eprintln!("warning: {}", warning);
    }
}

/// 1 when a job failed, 2 when a destination reported an error, 0 otherwise.
fn exit_code(reports: &[JobReport]) -> ExitCode {
    if reports.iter().any(|r| r.state == JobState::Failed) {
        ExitCode::from(1)
    } else if reports.iter().any(JobReport::has_upload_errors) {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    }
}

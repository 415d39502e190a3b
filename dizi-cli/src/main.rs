use anyhow::{Context, Result};
use clap::Parser;
use dizi_core::settings::SETTINGS_FILE_NAME;
use dizi_core::{ProjectFilesystem, ProjectTools, Settings};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod protocol;
mod server;

use crate::server::StdioServer;

#[derive(Parser, Debug)]
#[command(name = "dizi")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Serve sandboxed project file tools over stdio")]
struct Args {
    /// Project directory every tool is confined to (defaults to the current directory)
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Settings file (defaults to dizi.toml in the project directory)
    #[arg(long, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Write logs here instead of ~/.dizi/trace/dizi.log
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Print the tool definitions as JSON and exit
    #[arg(long)]
    print_schema: bool,

    /// Print the settings file JSON schema and exit
    #[arg(long)]
    print_settings_schema: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_schema {
        let definitions = ProjectTools::definitions();
        println!("{}", serde_json::to_string_pretty(&definitions)?);
        return Ok(());
    }
    if args.print_settings_schema {
        println!("{}", serde_json::to_string_pretty(&Settings::json_schema())?);
        return Ok(());
    }

    let _guard = setup_tracing(args.log_file.as_deref())?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async_main(args))
}

async fn async_main(args: Args) -> Result<()> {
    let root = match args.root {
        Some(root) => root,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    let settings_path = args
        .settings
        .unwrap_or_else(|| root.join(SETTINGS_FILE_NAME));
    let settings = Settings::load(&settings_path)?;

    let fs = ProjectFilesystem::with_settings(&root, settings.filesystem.clone())
        .with_context(|| format!("Failed to open project root {}", root.display()))?;
    info!(
        root = %fs.root().display(),
        settings = %settings_path.display(),
        "Serving project files"
    );

    let server = Arc::new(StdioServer::new(ProjectTools::new(fs), settings.server));
    server
        .serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await?;

    info!("Input closed, shutting down");
    Ok(())
}

fn default_log_file() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".dizi")
        .join("trace")
        .join("dizi.log")
}

// Stdout carries protocol traffic, so logs only ever go to a file.
fn setup_tracing(log_file: Option<&Path>) -> Result<WorkerGuard> {
    use tracing_subscriber::fmt;

    let log_file = log_file.map_or_else(default_log_file, Path::to_path_buf);
    let trace_dir = log_file
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(trace_dir)
        .with_context(|| format!("Failed to create log directory {}", trace_dir.display()))?;
    let file_name = log_file
        .file_name()
        .context("Log file path has no file name")?;

    let appender = tracing_appender::rolling::never(trace_dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .with(filter)
        .init();

    info!("Tracing initialized to {:?}", log_file);
    Ok(guard)
}

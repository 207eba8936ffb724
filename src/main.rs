use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

mod error;
mod models;
mod report;
mod roster;
mod server;
mod storage;

#[derive(Parser)]
#[command(name = "roster-averages")]
#[command(about = "Student roster averages for Group Scholar", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Markdown,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the roster upload endpoint
    Serve {
        #[arg(long, env = "HOST", default_value = "0.0.0.0")]
        host: IpAddr,
        #[arg(long, env = "PORT", default_value_t = 5000)]
        port: u16,
        #[arg(long, env = "UPLOAD_FOLDER", default_value = "uploads")]
        upload_dir: PathBuf,
        #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = 16 * 1024 * 1024)]
        max_upload_bytes: u64,
    },
    /// Compute averages for a local CSV file
    Process {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn init_tracing() {
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(log_level.parse().unwrap_or(Level::INFO.into())),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            host,
            port,
            upload_dir,
            max_upload_bytes,
        } => {
            let store = storage::UploadStore::open(upload_dir)?;
            let config = server::ServerConfig {
                addr: SocketAddr::new(host, port),
                max_upload_bytes,
            };
            server::run(config, store).await;
        }
        Commands::Process { csv, format, out } => {
            let raw = std::fs::read(&csv)
                .with_context(|| format!("failed to read {}", csv.display()))?;
            let result = roster::process(&raw)
                .with_context(|| format!("failed to process {}", csv.display()))?;
            info!(
                "Processed {} students, {} at or below {}",
                result.all_students.len(),
                result.filtered_students.len(),
                roster::AT_RISK_THRESHOLD
            );

            let rendered = match format {
                OutputFormat::Json => serde_json::to_string_pretty(&result)?,
                OutputFormat::Markdown => {
                    report::build_report(&csv.display().to_string(), &result)
                }
            };

            match out {
                Some(path) => {
                    std::fs::write(&path, rendered)?;
                    println!("Result written to {}.", path.display());
                }
                None => println!("{rendered}"),
            }
        }
    }

    Ok(())
}

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use chunkload_cli::{run_ingest, IngestConfig};
use chunkload_core::DEFAULT_BATCH_SIZE;
use chunkload_sql::DatabaseConfig;

#[derive(Parser)]
#[command(author, version, about = "chunked CSV ingestion into a SQL table")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download a CSV source and load it into a database table in batches.
    Ingest(IngestArgs),
}

#[derive(Args)]
struct IngestArgs {
    /// Database user
    #[arg(long, env = "PG_USER")]
    user: String,
    /// Database password
    #[arg(long, env = "PG_PASSWORD")]
    password: String,
    /// Database host
    #[arg(long, env = "PG_HOST", default_value = "localhost")]
    host: String,
    /// Database port
    #[arg(long, env = "PG_PORT", default_value_t = 5432)]
    port: u16,
    /// Database name
    #[arg(long, env = "PG_DATABASE")]
    database: String,
    /// Destination table name
    #[arg(long)]
    table: String,
    /// Source URL (downloaded via wget) or local file path
    #[arg(long)]
    url: String,
    /// Maximum records per batch
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,
    /// Comma-separated source columns parsed as timestamps
    #[arg(
        long,
        value_delimiter = ',',
        default_value = "tpep_pickup_datetime,tpep_dropoff_datetime"
    )]
    timestamp_columns: Vec<String>,
    /// Disable the progress bar
    #[arg(long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Ingest(args) => {
            let descriptor = DatabaseConfig::new(
                args.host,
                args.port,
                args.user,
                args.password,
                args.database,
            )?;
            let summary = run_ingest(IngestConfig {
                dsn: descriptor.dsn(),
                table: args.table,
                source: args.url,
                batch_size: args.batch_size,
                timestamp_columns: args.timestamp_columns,
                progress: !args.quiet,
            })
            .await?;
            println!("{}", summary.summary());
        }
    }
    Ok(())
}

//! Bulkpost CLI - Publish social posts from a spreadsheet export
//!
//! # Main Commands
//!
//! ```bash
//! bulkpost submit posts.csv --api-key KEY   # Publish every row, one at a time
//! bulkpost serve                            # Start HTTP server (port 3000)
//! ```
//!
//! # Inspection Commands
//!
//! ```bash
//! bulkpost parse posts.csv      # Show the rows that would be submitted
//! bulkpost preview posts.csv    # Show the request bodies, without sending
//! bulkpost columns              # Print the template header
//! ```

use bulkpost::{
    map, parse_bytes, BatchRunner, Settings, SubmissionClient, VersionToken, TEMPLATE_COLUMNS,
    TEMPLATE_URL,
};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bulkpost")]
#[command(about = "Publish social posts from a spreadsheet export", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Overrides for the remote endpoint.
#[derive(clap::Args)]
struct EndpointArgs {
    /// Remote API base (default: BULKPOST_API_BASE or the public API)
    #[arg(long)]
    api_base: Option<String>,

    /// Prefix prepended to every request URL, e.g. a CORS relay
    #[arg(long)]
    forwarding_prefix: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish every valid row of a CSV export
    Submit {
        /// Input CSV file
        input: PathBuf,

        /// API key (default: BULKPOST_API_KEY)
        #[arg(short = 'k', long)]
        api_key: Option<String>,

        #[command(flatten)]
        endpoint: EndpointArgs,

        /// Print the summary as JSON instead of result lines
        #[arg(long)]
        json: bool,
    },

    /// Parse a CSV export and print the valid rows as JSON
    Parse {
        /// Input CSV file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the request bodies a submit would send
    Preview {
        /// Input CSV file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the expected column header
    Columns,

    /// Start HTTP server
    Serve {
        /// Port to listen on (default: BULKPOST_PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,

        #[command(flatten)]
        endpoint: EndpointArgs,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bulkpost=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match Settings::from_env() {
        Ok(settings) => run(cli.command, settings).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(command: Commands, settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Submit {
            input,
            api_key,
            endpoint,
            json,
        } => cmd_submit(&input, api_key, endpoint, json, settings).await,

        Commands::Parse { input, output } => cmd_parse(&input, output.as_deref()),

        Commands::Preview { input, output } => cmd_preview(&input, output.as_deref()),

        Commands::Columns => cmd_columns(),

        Commands::Serve { port, endpoint } => cmd_serve(port, endpoint, settings).await,
    }
}

fn apply_endpoint(settings: &mut Settings, args: EndpointArgs) {
    if let Some(base) = args.api_base {
        settings.endpoint.api_base = base;
    }
    if let Some(prefix) = args.forwarding_prefix {
        settings.endpoint.forwarding_prefix = prefix;
    }
}

async fn cmd_submit(
    input: &Path,
    api_key: Option<String>,
    endpoint: EndpointArgs,
    json: bool,
    mut settings: Settings,
) -> Result<(), Box<dyn std::error::Error>> {
    apply_endpoint(&mut settings, endpoint);
    let api_key = api_key.or(settings.api_key).unwrap_or_default();

    eprintln!("📄 Submitting: {}", input.display());
    eprintln!("⏳ Please wait...");

    let runner = BatchRunner::new(SubmissionClient::new(settings.endpoint));
    let summary = runner.run_file(input, &api_key).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("API Call Results:");
        for line in summary.lines() {
            println!("{}", line);
        }
        println!();
        println!("{}", summary.summary_line());
    }

    Ok(())
}

fn cmd_parse(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Parsing: {}", input.display());

    let rows = parse_bytes(&fs::read(input)?)?;
    eprintln!("✅ {} valid rows", rows.len());

    let json = serde_json::to_string_pretty(&rows)?;
    write_output(&json, output)
}

fn cmd_preview(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("🔍 Previewing: {}", input.display());

    let rows = parse_bytes(&fs::read(input)?)?;
    let version = VersionToken::today();
    // The credential never appears in a body, so none is needed here
    let bodies: Vec<_> = rows.iter().map(|row| map(row, "", &version)).collect();
    eprintln!("   {} requests, v={}", bodies.len(), version);

    let json = serde_json::to_string_pretty(&bodies)?;
    write_output(&json, output)
}

fn cmd_columns() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", TEMPLATE_COLUMNS.join(","));
    eprintln!("📋 Template: {}", TEMPLATE_URL);
    Ok(())
}

async fn cmd_serve(
    port: Option<u16>,
    endpoint: EndpointArgs,
    mut settings: Settings,
) -> Result<(), Box<dyn std::error::Error>> {
    apply_endpoint(&mut settings, endpoint);
    if let Some(port) = port {
        settings.port = port;
    }
    bulkpost::server::start_server(settings).await?;
    Ok(())
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}

//! Archive a batch of URLs into one WARC file.
//!
//! Reads `CHROME_HOST`, `CHROME_PORT` and `DATA_DIR` from the environment,
//! captures every URL given on the command line and prints the archive path.
//!
//! Usage:
//!   cargo run --example archive -- <session-id> <url>...
//!   cargo run --example archive -- --debug demo https://example.com/
//!   cargo run --example archive -- --idle-ms 1500 demo https://example.com/

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tracing_subscriber::EnvFilter;

use warc_capture::{ArchiverConfig, Error, Result, SessionCoordinator};

// ============================================================================
// Types
// ============================================================================

/// Command-line arguments.
#[derive(Debug, Clone)]
struct Args {
    debug: bool,
    idle: Option<Duration>,
    session_id: String,
    urls: Vec<String>,
}

impl Args {
    fn parse() -> Result<Self> {
        let mut debug = false;
        let mut idle = None;
        let mut positional = Vec::new();

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--debug" => debug = true,
                "--idle-ms" => {
                    let value = args
                        .next()
                        .ok_or_else(|| Error::config("--idle-ms needs a value"))?;
                    let ms: u64 = value
                        .parse()
                        .map_err(|_| Error::config(format!("invalid --idle-ms {value:?}")))?;
                    idle = Some(Duration::from_millis(ms));
                }
                _ => positional.push(arg),
            }
        }

        if positional.len() < 2 {
            return Err(Error::config("usage: archive [--debug] [--idle-ms N] <session-id> <url>..."));
        }
        let session_id = positional.remove(0);

        Ok(Self {
            debug,
            idle,
            session_id,
            urls: positional,
        })
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = match Args::parse() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    };
    init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let mut config = ArchiverConfig::from_env()?;
    config.network_idle = args.idle;

    println!(
        "[Setup] Browser at {}:{}, archives under {}",
        config.browser_host,
        config.browser_port,
        config.archive_dir().display()
    );

    let coordinator = SessionCoordinator::new(config);
    let path = coordinator.archive(&args.urls, &args.session_id).await?;

    println!("[Done] {}", path.display());
    Ok(())
}

fn init_logging(debug: bool) {
    let filter = if debug {
        "warc_capture=debug"
    } else {
        "warc_capture=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

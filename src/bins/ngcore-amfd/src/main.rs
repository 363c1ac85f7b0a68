//! NGCore AMF signaling tool
//!
//! Decodes N2 NGAP buffers and drives the N11 session-manager client from the
//! command line.

pub mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{CreateSessionArgs, NotifyArgs};
use ngcore_n11::{N11Config, SmfRequest};

/// NGCore AMF - N2 decoding and N11 session signaling
#[derive(Parser, Debug)]
#[command(name = "ngcore-amfd")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "AMF N2 decoder and N11 session client")]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "/etc/ngcore/amf.yaml")]
    config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode one NGAP PDU given as hex
    Decode {
        #[arg(long)]
        hex: String,
    },
    /// Send a PDU session establishment request to sessiond
    CreateSession(CreateSessionArgs),
    /// Send a session notification to sessiond
    Notify(NotifyArgs),
}

fn parse_level(level: &str) -> log::LevelFilter {
    match level.to_lowercase().as_str() {
        "trace" => log::LevelFilter::Trace,
        "debug" => log::LevelFilter::Debug,
        "info" => log::LevelFilter::Info,
        "warn" => log::LevelFilter::Warn,
        "error" => log::LevelFilter::Error,
        _ => log::LevelFilter::Info,
    }
}

async fn dispatch(config_path: &str, request: SmfRequest, dry_run: bool) -> Result<()> {
    if dry_run {
        let json = request.to_json()?;
        println!("{} {}", request.method().full_path(), String::from_utf8_lossy(&json));
        return Ok(());
    }

    let config = N11Config::load(config_path)?;
    let method = request.method();
    let status = commands::send_and_wait(&config, request).await?;
    if status.is_ok() {
        println!("{method}: OK");
        Ok(())
    } else {
        Err(anyhow::anyhow!("{} failed: {}", method, status))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(parse_level(&args.log_level))
        .format_timestamp_millis()
        .init();

    log::info!("NGCore AMF tool v{}", env!("CARGO_PKG_VERSION"));

    match &args.command {
        Command::Decode { hex } => {
            println!("{}", commands::decode_hex(hex)?);
        }
        Command::CreateSession(session) => {
            dispatch(&args.config, commands::session_request(session)?, session.dry_run).await?;
        }
        Command::Notify(notify) => {
            dispatch(&args.config, commands::notification_request(notify)?, notify.dry_run).await?;
        }
    }

    Ok(())
}

//! blewire-cli - Command-line driver for blewire
//!
//! Demonstrates the protocol against the built-in loopback peripheral:
//! scan, send a command, listen for notifications, and inspect frames
//! offline. A production deployment swaps the loopback for a platform BLE
//! transport backend.

mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use blewire_client::{Client, ConnectionConfig, LoopbackTransport};

#[derive(Parser)]
#[command(name = "blewire-cli")]
#[command(about = "Command-line driver for the blewire peripheral protocol")]
#[command(version)]
struct Cli {
    /// Device name to connect to
    #[arg(short, long, default_value = "EAF_574775", env = "BLEWIRE_DEVICE")]
    device: String,

    /// Request timeout in seconds
    #[arg(long, default_value = "5")]
    timeout: u64,

    /// GATT service index
    #[arg(long, default_value = "3")]
    service: usize,

    /// GATT characteristic index
    #[arg(long, default_value = "0")]
    characteristic: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan for nearby devices
    Scan {
        /// Scan duration in seconds
        #[arg(short = 'D', long, default_value = "10")]
        duration: u64,
    },

    /// Send a command request and print the response
    Send {
        /// Command id (auto-assigned if omitted)
        #[arg(short, long)]
        id: Option<u8>,

        /// Command subtype
        #[arg(short, long, default_value = "0")]
        subtype: u8,

        /// Payload as hex, e.g. 425031
        #[arg(short, long, conflicts_with = "text")]
        payload: Option<String>,

        /// Payload as literal text, e.g. BP123456
        #[arg(short, long)]
        text: Option<String>,
    },

    /// Wait for a notification from the peripheral
    Listen {
        /// Wait duration in seconds
        #[arg(short = 'D', long, default_value = "30")]
        duration: u64,
    },

    /// Encode a request frame and print it as hex (no device needed)
    Encode {
        /// Command id
        #[arg(short, long, default_value = "1")]
        id: u8,

        /// Command subtype
        #[arg(short, long, default_value = "0")]
        subtype: u8,

        /// Payload as hex
        #[arg(short, long, conflicts_with = "text")]
        payload: Option<String>,

        /// Payload as literal text
        #[arg(short, long)]
        text: Option<String>,
    },

    /// Decode a hex frame and print its fields (no device needed)
    Decode {
        /// Complete frame as hex
        frame: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    // Offline commands need no device connection
    match &cli.command {
        Commands::Encode {
            id,
            subtype,
            payload,
            text,
        } => {
            let payload = commands::parse_payload(payload.as_deref(), text.as_deref())?;
            println!("{}", commands::encode_frame(*id, *subtype, &payload)?);
            return Ok(());
        }
        Commands::Decode { frame } => {
            println!("{}", commands::decode_frame(frame)?);
            return Ok(());
        }
        _ => {}
    }

    let transport = Arc::new(LoopbackTransport::new());
    let config = ConnectionConfig::new()
        .with_request_timeout(Duration::from_secs(cli.timeout))
        .with_endpoint(cli.service, cli.characteristic);
    let client = Client::new(transport.clone(), config);

    match cli.command {
        Commands::Scan { duration } => {
            eprintln!("{}", "Scanning for devices...".dimmed());
            let devices = client.scan(Duration::from_secs(duration)).await?;
            println!("{}", commands::format_devices(&devices));
        }

        Commands::Send {
            id,
            subtype,
            payload,
            text,
        } => {
            let payload = commands::parse_payload(payload.as_deref(), text.as_deref())?;
            commands::connect_by_name(&client, &cli.device).await?;

            let output = commands::send(&client, id, subtype, &payload).await;
            client.disconnect().await?;

            match output {
                Ok(output) => println!("{}", output),
                Err(e) => {
                    eprintln!("{}: {}", "Error".red(), e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Listen { duration } => {
            commands::connect_by_name(&client, &cli.device).await?;
            eprintln!("{}", "Waiting for notification...".dimmed());

            // The loopback peripheral has nothing to announce on its own;
            // simulate a pairing event arriving shortly after we subscribe.
            commands::simulate_pairing_event(transport.clone());

            let output = commands::listen(&client, Duration::from_secs(duration)).await;
            client.disconnect().await?;

            match output {
                Ok(output) => println!("{}", output),
                Err(e) => {
                    eprintln!("{}: {}", "Error".red(), e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Encode { .. } | Commands::Decode { .. } => unreachable!(), // Already handled above
    }

    Ok(())
}

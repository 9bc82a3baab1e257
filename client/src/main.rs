use clap::Parser;
use client::{ConnectionConfig, LoggingListener, RemoteClientConnection};
use log::{error, info};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to; the default port is used if none is given
    #[arg(short = 's', long, default_value = "127.0.0.1")]
    server: String,

    /// Port assumed when the server address has none
    #[arg(short = 'p', long, default_value_t = protocol::DEFAULT_PORT)]
    port: u16,

    /// Save file with the player state sent on connect
    #[arg(short = 'f', long)]
    save_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let config = ConnectionConfig {
        default_port: args.port,
        ..ConnectionConfig::default()
    };
    let mut connection = RemoteClientConnection::with_config(config);
    connection.set_client_listener(Arc::new(LoggingListener));

    info!("Client {} connecting to {}", connection.id(), args.server);
    match &args.save_file {
        Some(path) => connection.open_with_save_file(&args.server, path).await?,
        None => connection.open(&args.server, serde_json::json!({})).await?,
    }

    info!("Press Ctrl+C to disconnect");
    tokio::signal::ctrl_c().await?;

    if let Err(e) = connection.close().await {
        error!("Error sending disconnect: {}", e);
    }
    connection.join_receiver().await;
    info!("Disconnected");

    Ok(())
}

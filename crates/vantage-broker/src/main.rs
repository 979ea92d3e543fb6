//! vantage-broker: session broker and message relay for remote viewing.
//!
//! Accepts WebSocket connections, rendezvous-pairs a host and a viewer by
//! a short session token, relays handshake and remote-control frames
//! between them, and tears sessions down on disconnect. The broker never
//! transports media and never inspects relayed payloads beyond the
//! envelope.

mod connection;
mod lifecycle;
mod registry;
mod router;
mod session;

use clap::Parser;
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;

use crate::connection::{handle_connection, Broker};

#[derive(Parser)]
#[command(name = "vantage-broker", about = "Session broker for remote viewing")]
struct Args {
    /// Port to listen on.
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// Address to bind.
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vantage_broker=info".into()),
        )
        .init();

    let args = Args::parse();
    let broker = Broker::new();

    let addr = format!("{}:{}", args.bind, args.port);
    let listener = TcpListener::bind(&addr)
        .await
        .expect("Failed to bind TCP listener");

    tracing::info!("vantage-broker listening on {}", addr);

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let broker = broker.clone();
                tokio::spawn(async move {
                    match accept_async(stream).await {
                        Ok(ws) => handle_connection(ws, addr, broker).await,
                        Err(e) => {
                            tracing::warn!(peer = %addr, error = %e, "WS handshake failed");
                        }
                    }
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "TCP accept error");
            }
        }
    }
}

use std::process::Command;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::info;

use crate::error::Result;

const STOP_RESPONSE: &str = "run released, stopping\n";

/// Blocks until a local callback endpoint receives one HTTP hit. This is the
/// sole operator-facing control surface: the run holds here until a human
/// (or a script) hits the printed URL.
pub async fn run_until_endpoint_hit() -> Result<()> {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
    let addr = listener.local_addr()?;
    info!("run is holding; hit http://{addr} to stop it");

    let (mut stream, peer) = listener.accept().await?;

    // Drain whatever request line arrives; the hit itself is the signal.
    let mut buf = [0u8; 1024];
    let _ = stream.read(&mut buf).await;

    let response = format!(
        "HTTP/1.1 200 OK\r\ncontent-type: text/plain\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
        STOP_RESPONSE.len(),
        STOP_RESPONSE,
    );
    stream.write_all(response.as_bytes()).await?;

    info!(%peer, "stop signal received");
    Ok(())
}

/// Opens a URL with the platform's default browser opener. The child is
/// deliberately not awaited.
pub fn open_in_browser(url: &str) -> Result<()> {
    let opener = if cfg!(target_os = "macos") {
        "open"
    } else {
        "xdg-open"
    };
    Command::new(opener).arg(url).spawn()?;
    Ok(())
}

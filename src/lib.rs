pub mod config;
pub mod detector;
pub mod errors;
pub mod executor;
pub mod perception;
pub mod platform;
pub mod tool;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::errors::{DeskError, DeskResult};
use crate::executor::dispatcher::Dispatcher;
use crate::tool::types::ToolOutput;

/// Installs the stderr log subscriber. `RUST_LOG` overrides the default `info`.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

/// Serves one JSON request per input line and writes one JSON result per
/// output line, until the input closes. A malformed line gets an error
/// record and the loop carries on.
pub async fn serve_lines<R, W>(dispatcher: &Dispatcher, mut reader: R, mut writer: W) -> DeskResult<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        let output = match std::str::from_utf8(&buf) {
            Ok(line) if line.trim().is_empty() => continue,
            Ok(line) => match serde_json::from_str::<serde_json::Value>(line.trim()) {
                Ok(args) => dispatcher.execute(args).await,
                Err(e) => ToolOutput::error(&DeskError::InvalidRequest(format!("request is not valid JSON: {e}"))),
            },
            Err(e) => ToolOutput::error(&DeskError::InvalidRequest(format!("request is not valid UTF-8: {e}"))),
        };
        let mut encoded = serde_json::to_vec(&output)?;
        encoded.push(b'\n');
        writer.write_all(&encoded).await?;
        writer.flush().await?;
    }
    tracing::info!("input closed; shutting down");
    Ok(())
}

use crate::scan::dispatcher::{ScanDispatcher, ScanStatus};
use anyhow::Result;
use chrono::Utc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{error, info, warn};

/// Keyboard-wedge scanners type the payload followed by Enter. Each non-empty
/// line is one scan, stamped on receipt and dispatched before the next is read.
pub async fn run_line_capture<R>(reader: R, dispatcher: ScanDispatcher) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut dispatched = 0usize;

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let received_at = Utc::now();
        dispatched += 1;
        match dispatcher.handle_scan(line.as_bytes(), received_at).await {
            Ok(result) if result.status == ScanStatus::Rejected => {
                warn!(reason = ?result.reason, "{}", result.message)
            }
            Ok(result) => info!(status = ?result.status, "{}", result.message),
            Err(e) => error!(error = %e, "Scan failed"),
        }
    }

    info!(dispatched, "Scanner input closed");
    Ok(dispatched)
}

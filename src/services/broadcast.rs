use std::time::Duration;

use crate::services::messaging::{ChatProvider, Keyboard};

/// Delay between consecutive sends. Bounds the outbound rate and yields the
/// task so other conversations keep flowing during a long broadcast.
const SEND_DELAY: Duration = Duration::from_millis(50);

#[derive(Debug, Default, PartialEq)]
pub struct BroadcastReport {
    pub success: usize,
    pub failed: usize,
}

/// Sends `text` to every recipient in turn. A failed recipient is counted and
/// logged, never aborts the rest.
pub async fn broadcast(
    messaging: &dyn ChatProvider,
    recipients: &[i64],
    text: &str,
) -> BroadcastReport {
    let mut report = BroadcastReport::default();

    for (i, &chat_id) in recipients.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(SEND_DELAY).await;
        }
        match messaging.send_text(chat_id, text, &Keyboard::None).await {
            Ok(()) => report.success += 1,
            Err(e) => {
                tracing::error!(chat_id, error = %e, "broadcast send failed");
                report.failed += 1;
            }
        }
    }

    tracing::info!(
        success = report.success,
        failed = report.failed,
        "broadcast finished"
    );
    report
}

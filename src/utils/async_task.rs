use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing::trace;

use crate::Result;

/// Sleeps for `duration` unless `token` fires first.
///
/// Returns `false` when the sleep was cut short by cancellation.
pub(crate) async fn sleep_or_cancelled(
    duration: Duration,
    token: &CancellationToken,
) -> bool {
    tokio::select! {
        _ = token.cancelled() => false,
        _ = sleep(duration) => true,
    }
}

// Helper function to spawn tasks and track their JoinHandles
pub(crate) fn spawn_task<Fut>(
    name: &str,
    task: Fut,
) -> JoinHandle<()>
where
    Fut: std::future::Future<Output = Result<()>> + Send + 'static,
{
    // Clone the name so it can be safely moved into the async block
    let name = name.to_string();
    tokio::spawn(async move {
        match task.await {
            Ok(()) => trace!("spawned task: {name} stopped"),
            Err(e) => error!("spawned task: {name} stopped or encountered an error: {:?}", e),
        }
    })
}

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;

/// Quiet window after which a raw input value counts as settled.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(400);

/// Forwards only values that survive the quiet window. A newer value inside
/// the window replaces the pending one and restarts the wait; intermediate
/// values are discarded, not queued. Closing the input channel tears the
/// gate down, and a value pending mid-window is dropped without emission.
pub fn spawn_debounce<T: Send + 'static>(
    mut input: mpsc::UnboundedReceiver<T>,
    window: Duration,
    output: mpsc::UnboundedSender<T>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(mut pending) = input.recv().await {
            loop {
                match timeout(window, input.recv()).await {
                    Ok(Some(next)) => pending = next,
                    Ok(None) => return,
                    Err(_) => {
                        if output.send(pending).is_err() {
                            return;
                        }
                        break;
                    }
                }
            }
        }
    })
}

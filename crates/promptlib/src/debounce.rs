//! Coalesce bursts of search input into one query.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::sleep;

/// Forward only the last value of each burst from `input`.
///
/// A burst ends once `quiet` passes without a new value, or when `input`
/// closes; the pending value is still delivered in that case.
pub fn debounce<T: Send + 'static>(mut input: mpsc::Receiver<T>, quiet: Duration) -> mpsc::Receiver<T> {
    let (tx, rx) = mpsc::channel(16);

    tokio::spawn(async move {
        while let Some(first) = input.recv().await {
            let mut latest = first;
            let mut closed = false;

            loop {
                tokio::select! {
                    next = input.recv() => match next {
                        Some(value) => latest = value,
                        None => {
                            closed = true;
                            break;
                        }
                    },
                    _ = sleep(quiet) => break,
                }
            }

            if tx.send(latest).await.is_err() || closed {
                return;
            }
        }
    });

    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_burst_collapses_to_last_value() {
        let (tx, rx) = mpsc::channel(16);
        let mut out = debounce(rx, Duration::from_millis(150));

        for query in ["c", "ca", "cat"] {
            tx.send(query.to_string()).await.unwrap();
            sleep(Duration::from_millis(20)).await;
        }

        assert_eq!(out.recv().await.as_deref(), Some("cat"));

        drop(tx);
        assert!(out.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_bursts_each_emit() {
        let (tx, rx) = mpsc::channel(16);
        let mut out = debounce(rx, Duration::from_millis(150));

        tx.send("first").await.unwrap();
        sleep(Duration::from_millis(400)).await;
        tx.send("second").await.unwrap();
        drop(tx);

        assert_eq!(out.recv().await, Some("first"));
        assert_eq!(out.recv().await, Some("second"));
        assert_eq!(out.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closing_input_flushes_pending_value() {
        let (tx, rx) = mpsc::channel(16);
        let mut out = debounce(rx, Duration::from_secs(60));

        tx.send(1).await.unwrap();
        tx.send(2).await.unwrap();
        drop(tx);

        assert_eq!(out.recv().await, Some(2));
        assert_eq!(out.recv().await, None);
    }
}

//! Debounced values
//!
//! The input side publishes every keystroke; the output side only yields
//! a value once it has stayed unchanged for the quiet period.

use std::time::Duration;

use tokio::sync::watch;

/// Create a debounced channel starting at `initial`
pub fn debounce<T: Clone>(initial: T, quiet: Duration) -> (watch::Sender<T>, Debounced<T>) {
    let (tx, rx) = watch::channel(initial.clone());
    (
        tx,
        Debounced {
            rx,
            quiet,
            settled: initial,
        },
    )
}

/// Output side of a debounced channel
#[derive(Debug)]
pub struct Debounced<T> {
    rx: watch::Receiver<T>,
    quiet: Duration,
    settled: T,
}

impl<T: Clone> Debounced<T> {
    /// Value yielded by the last [`next`](Self::next)
    pub fn current(&self) -> &T {
        &self.settled
    }

    /// Wait for the next change, then for the quiet period after the last
    /// change in a burst
    ///
    /// Returns `None` once the input side is dropped and nothing is pending.
    pub async fn next(&mut self) -> Option<T> {
        self.rx.changed().await.ok()?;

        loop {
            match tokio::time::timeout(self.quiet, self.rx.changed()).await {
                Ok(Ok(())) => continue,
                Ok(Err(_)) | Err(_) => break,
            }
        }

        self.settled = self.rx.borrow_and_update().clone();
        Some(self.settled.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn burst_yields_last_value_once() {
        let (input, mut output) = debounce(String::new(), Duration::from_millis(500));

        let typing = tokio::spawn(async move {
            for term in ["s", "sk", "sky"] {
                input.send_replace(term.to_string());
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            input
        });

        let started = tokio::time::Instant::now();
        assert_eq!(output.next().await.as_deref(), Some("sky"));
        assert!(started.elapsed() >= Duration::from_millis(700));

        let input = typing.await.unwrap();
        drop(input);
        assert_eq!(output.next().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_is_yielded_before_quiet_period() {
        use tokio_test::{assert_pending, assert_ready_eq, task};

        let (input, mut output) = debounce(0u32, Duration::from_millis(500));
        input.send_replace(7);

        let mut next = task::spawn(output.next());
        assert_pending!(next.poll());
        tokio::time::advance(Duration::from_millis(499)).await;
        assert_pending!(next.poll());
        tokio::time::advance(Duration::from_millis(1)).await;
        assert_ready_eq!(next.poll(), Some(7));
    }

    #[tokio::test(start_paused = true)]
    async fn pause_longer_than_quiet_period_splits_bursts() {
        let (input, mut output) = debounce(0u32, Duration::from_millis(500));

        input.send_replace(1);
        assert_eq!(output.next().await, Some(1));

        tokio::time::sleep(Duration::from_millis(600)).await;
        input.send_replace(2);
        assert_eq!(*output.current(), 1);
        assert_eq!(output.next().await, Some(2));
        assert_eq!(*output.current(), 2);
    }
}

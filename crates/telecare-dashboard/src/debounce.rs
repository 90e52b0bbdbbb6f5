//! Debounced value coordinator for search boxes

use std::time::Duration;
use telecare_core::DashboardConfig;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Holds a raw value and emits it once it has been stable for `delay`
///
/// Every raw change restarts the timer. Dropping the debouncer cancels a
/// pending timer without emitting.
#[derive(Debug)]
pub struct Debouncer<T> {
    raw: watch::Sender<T>,
    debounced: watch::Receiver<T>,
    cancel: CancellationToken,
}

impl<T> Debouncer<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Start with `initial` as both raw and emitted value
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(initial: T, delay: Duration) -> Self {
        let (raw, raw_rx) = watch::channel(initial.clone());
        let (emit, debounced) = watch::channel(initial);
        let cancel = CancellationToken::new();

        tokio::spawn(run(raw_rx, emit, delay, cancel.clone()));

        Self {
            raw,
            debounced,
            cancel,
        }
    }

    /// Debouncer for a search box, using the configured window
    pub fn for_search(initial: T, config: &DashboardConfig) -> Self {
        Self::new(initial, config.search_debounce())
    }

    /// Record a keystroke
    pub fn set(&self, value: T) {
        self.raw.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }

    /// Latest raw value
    pub fn raw(&self) -> T {
        self.raw.borrow().clone()
    }

    /// Latest emitted value
    pub fn current(&self) -> T {
        self.debounced.borrow().clone()
    }

    /// Receiver that sees only emitted values
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.debounced.clone()
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run<T>(
    mut raw: watch::Receiver<T>,
    emit: watch::Sender<T>,
    delay: Duration,
    cancel: CancellationToken,
) where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    loop {
        // idle until the first change of a burst
        tokio::select! {
            () = cancel.cancelled() => return,
            changed = raw.changed() => {
                if changed.is_err() {
                    return;
                }
            }
        }

        // restart the window on every further change
        loop {
            tokio::select! {
                () = cancel.cancelled() => return,
                changed = raw.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    trace!("debounce window restarted");
                }
                () = tokio::time::sleep(delay) => break,
            }
        }

        let value = raw.borrow_and_update().clone();
        emit.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test(start_paused = true)]
    async fn test_burst_emits_last_value_once() {
        let debouncer = Debouncer::new(String::new(), Duration::from_millis(500));
        let mut emitted = debouncer.subscribe();

        debouncer.set("a".to_string());
        tokio::time::sleep(Duration::from_millis(100)).await;
        debouncer.set("ab".to_string());
        tokio::time::sleep(Duration::from_millis(100)).await;
        debouncer.set("abc".to_string());

        tokio::time::sleep(Duration::from_millis(499)).await;
        assert_eq!(debouncer.current(), "");
        assert_eq!(debouncer.raw(), "abc");

        emitted.changed().await.ok();
        assert_eq!(*emitted.borrow_and_update(), "abc");

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!emitted.has_changed().unwrap_or(true));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_pending_emit() {
        let debouncer = Debouncer::new(0_u32, Duration::from_millis(300));
        let emitted = debouncer.subscribe();

        debouncer.set(7);
        tokio::time::sleep(Duration::from_millis(100)).await;
        drop(debouncer);
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(*emitted.borrow(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_return_to_emitted_value_does_not_re_emit() {
        let debouncer = Debouncer::new("x".to_string(), Duration::from_millis(200));
        let mut emitted = debouncer.subscribe();

        debouncer.set("xy".to_string());
        tokio::time::sleep(Duration::from_millis(50)).await;
        debouncer.set("x".to_string());
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(!emitted.has_changed().unwrap_or(true));
        assert_eq!(*emitted.borrow_and_update(), "x");
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_window_comes_from_config() {
        let config = DashboardConfig {
            search_debounce_ms: 250,
            ..DashboardConfig::default()
        };
        let debouncer = Debouncer::for_search(String::new(), &config);

        debouncer.set("ana".to_string());
        tokio::time::sleep(Duration::from_millis(249)).await;
        assert_eq!(debouncer.current(), "");

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(debouncer.current(), "ana");
    }
}

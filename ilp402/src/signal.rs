//! Single-fire signals for STREAM events.
//!
//! A STREAM emits `data` when money first arrives and `end` once it has
//! drained. [`signal`] turns each such event into an awaitable condition that
//! fires at most once; late waiters resolve immediately.

use tokio::sync::watch;

/// Creates a connected trigger/signal pair.
#[must_use]
pub fn signal() -> (SignalTrigger, Signal) {
    let (tx, rx) = watch::channel(false);
    (SignalTrigger(tx), Signal(rx))
}

/// Firing side of a [`Signal`].
#[derive(Debug)]
pub struct SignalTrigger(watch::Sender<bool>);

impl SignalTrigger {
    /// Fires the signal. Returns `true` only for the call that fired it.
    pub fn fire(&self) -> bool {
        self.0.send_if_modified(|fired| !std::mem::replace(fired, true))
    }

    /// Returns `true` once the signal has fired.
    #[must_use]
    pub fn has_fired(&self) -> bool {
        *self.0.borrow()
    }
}

/// Waiting side of a single-fire event. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Signal(watch::Receiver<bool>);

impl Signal {
    /// Returns `true` once the signal has fired.
    #[must_use]
    pub fn has_fired(&self) -> bool {
        *self.0.borrow()
    }

    /// Waits until the signal fires.
    ///
    /// If the trigger is dropped without firing, this never resolves: an
    /// event that can no longer happen leaves its waiter suspended.
    pub async fn fired(&self) {
        let mut rx = self.0.clone();
        if rx.wait_for(|fired| *fired).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_fire_once() {
        let (trigger, signal) = signal();
        assert!(!signal.has_fired());
        assert!(trigger.fire());
        assert!(!trigger.fire());
        assert!(signal.has_fired());
        assert!(trigger.has_fired());
    }

    #[tokio::test]
    async fn test_late_waiter_resolves_immediately() {
        let (trigger, signal) = signal();
        trigger.fire();
        tokio::time::timeout(Duration::from_secs(1), signal.fired())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_waiter_wakes_on_fire() {
        let (trigger, signal) = signal();
        let waiter = tokio::spawn({
            let signal = signal.clone();
            async move { signal.fired().await }
        });
        tokio::task::yield_now().await;
        trigger.fire();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_trigger_never_resolves() {
        let (trigger, signal) = signal();
        drop(trigger);
        let waited = tokio::time::timeout(Duration::from_secs(60), signal.fired()).await;
        assert!(waited.is_err());
    }
}

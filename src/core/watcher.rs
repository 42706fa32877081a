use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time;

use crate::core::ent::{Report, Target};
use crate::core::probe::Probe;
use crate::core::state::EngineState;

/// Repeatedly probes one target until the engine stops.
pub struct Watcher<P: Probe> {
    target: Target,
    probe: P,
    interval: Duration,
    tx: mpsc::Sender<P::Output>,
    state: EngineState,
}

impl<P: Probe> Watcher<P> {
    pub fn new(
        target: Target,
        probe: P,
        interval: Duration,
        tx: mpsc::Sender<P::Output>,
        state: EngineState,
    ) -> Watcher<P> {
        Watcher {
            target,
            probe,
            interval,
            tx,
            state,
        }
    }

    /// Probe, hand off, sleep. The running flag is only checked at the top of
    /// the loop, so an in-flight cycle always completes.
    pub async fn run(self) {
        tracing::debug!(
            identity = %self.target.identity,
            interval = ?self.interval,
            "watcher started"
        );
        while self.state.is_running() {
            let result = self.probe.probe(&self.target).await;
            if !result.is_alive() {
                tracing::debug!(identity = %self.target.identity, ?result, "probe failed");
            }
            self.dispatch(result);
            time::sleep(self.interval).await;
        }
        tracing::debug!(identity = %self.target.identity, "watcher exit");
    }

    // A full channel must not hold up the next probe, so the send is parked
    // on its own task. That task owns a sender, which keeps the aggregator
    // draining until it lands.
    fn dispatch(&self, result: P::Output) {
        match self.tx.try_send(result) {
            Ok(()) => {}
            Err(TrySendError::Full(result)) => {
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    if let Err(e) = tx.send(result).await {
                        tracing::warn!(result = ?e.0, "result channel closed, dropping result");
                    }
                });
            }
            Err(TrySendError::Closed(result)) => {
                tracing::warn!(?result, "result channel closed, dropping result");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ent::DeviceResult;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counting {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Probe for Counting {
        type Output = DeviceResult;

        async fn probe(&self, target: &Target) -> DeviceResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            DeviceResult {
                host: target.identity.clone(),
                is_alive: true,
                message: String::new(),
            }
        }
    }

    #[tokio::test]
    async fn keeps_probing_past_a_full_channel() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (tx, mut rx) = mpsc::channel(1);
        let state = EngineState::new();
        let watcher = Watcher::new(
            Target::new("10.0.0.1"),
            Counting {
                calls: calls.clone(),
            },
            Duration::from_millis(5),
            tx,
            state.clone(),
        );
        let handle = tokio::spawn(watcher.run());

        // Nobody reads yet: the loop must not stall on the one-slot channel.
        time::sleep(Duration::from_millis(100)).await;
        assert!(calls.load(Ordering::SeqCst) > 2);

        state.stop();
        handle.await.unwrap();

        let mut received = 0;
        while let Some(result) = rx.recv().await {
            assert_eq!(result.host, "10.0.0.1");
            received += 1;
        }
        assert_eq!(received, calls.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn stopped_engine_never_probes() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (tx, mut rx) = mpsc::channel(4);
        let state = EngineState::new();
        state.stop();
        Watcher::new(
            Target::new("10.0.0.1"),
            Counting {
                calls: calls.clone(),
            },
            Duration::from_millis(5),
            tx,
            state,
        )
        .run()
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(rx.recv().await.is_none());
    }
}

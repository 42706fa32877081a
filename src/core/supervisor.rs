use std::collections::HashSet;
use std::io::Write;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::core::aggregator::{Aggregator, DEFAULT_POLL_INTERVAL};
use crate::core::ent::Target;
use crate::core::probe::{Probe, Worker};
use crate::core::state::EngineState;
use crate::core::watcher::Watcher;
use crate::error::{Error, Result};

pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Runs one watcher per target plus the aggregator for a single worker kind.
pub struct Supervisor<K, W> {
    worker: K,
    targets: Vec<Target>,
    sink: W,
    state: EngineState,
    poll_interval: Duration,
}

impl<K, W> Supervisor<K, W>
where
    K: Worker,
    W: Write + Send + 'static,
{
    /// Rejects an empty target set and duplicate identities, since either
    /// would make round boundaries meaningless.
    pub fn new(worker: K, targets: Vec<Target>, sink: W) -> Result<Supervisor<K, W>> {
        if targets.is_empty() {
            return Err(Error::EmptyTargets(worker.name()));
        }
        let mut seen = HashSet::with_capacity(targets.len());
        for target in &targets {
            if !seen.insert(target.identity.as_str()) {
                return Err(Error::DuplicateTarget {
                    kind: worker.name(),
                    identity: target.identity.clone(),
                });
            }
        }
        Ok(Supervisor {
            worker,
            targets,
            sink,
            state: EngineState::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    pub fn poll_interval(mut self, poll_interval: Duration) -> Supervisor<K, W> {
        self.poll_interval = poll_interval;
        self
    }

    /// A handle on the running flag, for stopping the engine from elsewhere.
    pub fn state(&self) -> EngineState {
        self.state.clone()
    }

    pub fn stop(&self) {
        self.state.stop();
    }

    /// Builds every probe and wires each watcher to the result channel
    /// without starting anything, so a configuration error leaves nothing
    /// running.
    pub fn prepare(self) -> Result<Engine<K::Probe, W>> {
        let name = self.worker.name();
        let default_interval = self.worker.default_interval();
        let expected = self.targets.len();

        let (tx, rx) = mpsc::channel(expected.max(DEFAULT_CHANNEL_CAPACITY));
        let mut watchers = Vec::with_capacity(expected);
        for target in self.targets {
            let probe = self.worker.probe_for(&target)?;
            let interval = target.effective_interval(default_interval);
            watchers.push(Watcher::new(
                target,
                probe,
                interval,
                tx.clone(),
                self.state.clone(),
            ));
        }
        // Only watchers may hold senders, so the channel closes once they
        // have all exited.
        drop(tx);

        Ok(Engine {
            name,
            watchers,
            rx,
            sink: self.sink,
            state: self.state,
            poll_interval: self.poll_interval,
        })
    }

    /// Prepares and runs in one step.
    pub async fn boot(self) -> Result<W> {
        Ok(self.prepare()?.run().await)
    }
}

/// A worker kind whose watchers are built but not yet spawned.
pub struct Engine<P: Probe, W> {
    name: &'static str,
    watchers: Vec<Watcher<P>>,
    rx: mpsc::Receiver<P::Output>,
    sink: W,
    state: EngineState,
    poll_interval: Duration,
}

impl<P, W> Engine<P, W>
where
    P: Probe,
    W: Write + Send + 'static,
{
    pub fn state(&self) -> EngineState {
        self.state.clone()
    }

    /// Starts every watcher, then runs the aggregator on the calling task.
    ///
    /// Returns once a stop has been requested, every watcher has finished
    /// its last cycle and every produced result has been drained.
    pub async fn run(self) -> W {
        let name = self.name;
        let expected = self.watchers.len();
        let handles: Vec<_> = self
            .watchers
            .into_iter()
            .map(|watcher| tokio::spawn(watcher.run()))
            .collect();
        tracing::info!(worker = name, targets = expected, "worker booted");

        let sink = Aggregator::new(name, self.rx, expected, self.sink, self.state.clone())
            .poll_interval(self.poll_interval)
            .run()
            .await;

        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!(worker = name, "watcher task failed: {e}");
            }
        }
        tracing::info!("{name} worker shutdown");
        sink
    }
}

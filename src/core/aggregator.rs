use std::io::Write;
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::time;

use crate::core::ent::Report;
use crate::core::state::EngineState;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Drains the result channel into rounds of exactly `expected` results and
/// writes each round as one JSON line.
pub struct Aggregator<R, W> {
    name: &'static str,
    rx: mpsc::Receiver<R>,
    expected: usize,
    sink: W,
    state: EngineState,
    poll_interval: Duration,
}

impl<R: Report, W: Write> Aggregator<R, W> {
    pub fn new(
        name: &'static str,
        rx: mpsc::Receiver<R>,
        expected: usize,
        sink: W,
        state: EngineState,
    ) -> Aggregator<R, W> {
        Aggregator {
            name,
            rx,
            expected,
            sink,
            state,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn poll_interval(mut self, poll_interval: Duration) -> Aggregator<R, W> {
        self.poll_interval = poll_interval;
        self
    }

    /// Runs until the engine is stopped and every sender has gone away, then
    /// hands back the sink.
    ///
    /// A short round never blocks forever: when the channel runs dry the loop
    /// waits at most one poll interval before looking at the running flag
    /// again. Results that cannot complete a round once all senders are gone
    /// are logged, never emitted.
    pub async fn run(mut self) -> W {
        let mut round = Vec::with_capacity(self.expected);
        let mut closed = false;
        let mut draining = false;
        loop {
            closed |= self.fill(&mut round);
            if round.len() == self.expected {
                let full = std::mem::replace(&mut round, Vec::with_capacity(self.expected));
                self.emit(&full);
                continue;
            }
            if closed {
                break;
            }
            if !draining && !self.state.is_running() {
                draining = true;
                tracing::info!(worker = self.name, pending = round.len(), "stop requested, draining");
            }
            match time::timeout(self.poll_interval, self.rx.recv()).await {
                Ok(Some(result)) => round.push(result),
                Ok(None) => closed = true,
                Err(_) => {}
            }
        }

        if !round.is_empty() {
            let leftover = serde_json::to_string(&round)
                .unwrap_or_else(|e| format!("<unserializable: {e}>"));
            tracing::warn!(
                worker = self.name,
                collected = round.len(),
                expected = self.expected,
                %leftover,
                "incomplete round at shutdown"
            );
        }
        self.rx.close();
        self.sink
    }

    /// Moves whatever is already buffered into `round` without waiting.
    /// Returns true once the channel is closed and empty.
    fn fill(&mut self, round: &mut Vec<R>) -> bool {
        while round.len() < self.expected {
            match self.rx.try_recv() {
                Ok(result) => round.push(result),
                Err(TryRecvError::Empty) => return false,
                Err(TryRecvError::Disconnected) => return true,
            }
        }
        false
    }

    fn emit(&mut self, round: &[R]) {
        let mut line = match serde_json::to_vec(round) {
            Ok(line) => line,
            Err(e) => {
                tracing::error!(worker = self.name, "json encode error. {e}");
                return;
            }
        };
        line.push(b'\n');
        if let Err(e) = self.sink.write_all(&line).and_then(|_| self.sink.flush()) {
            tracing::error!(worker = self.name, "failed to write round: {e}");
            return;
        }
        let alive = round.iter().filter(|r| r.is_alive()).count();
        tracing::debug!(worker = self.name, alive, total = round.len(), "round emitted");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ent::DeviceResult;
    use serde::{Serialize, Serializer};

    fn alive(host: &str) -> DeviceResult {
        DeviceResult {
            host: host.to_string(),
            is_alive: true,
            message: String::new(),
        }
    }

    fn lines(out: &[u8]) -> Vec<serde_json::Value> {
        String::from_utf8(out.to_vec())
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn emits_only_full_rounds() {
        let (tx, rx) = mpsc::channel(16);
        let state = EngineState::new();
        for host in ["a", "b", "c", "a", "b"] {
            tx.send(alive(host)).await.unwrap();
        }
        drop(tx);
        state.stop();

        let out = Aggregator::new("snmp", rx, 3, Vec::new(), state)
            .poll_interval(Duration::from_millis(10))
            .run()
            .await;

        let rounds = lines(&out);
        assert_eq!(rounds.len(), 1);
        assert_eq!(rounds[0].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn waits_for_slow_results_while_running() {
        let (tx, rx) = mpsc::channel(16);
        let state = EngineState::new();
        let aggregator = Aggregator::new("snmp", rx, 2, Vec::new(), state.clone())
            .poll_interval(Duration::from_millis(10));
        let handle = tokio::spawn(aggregator.run());

        tx.send(alive("a")).await.unwrap();
        time::sleep(Duration::from_millis(50)).await;
        tx.send(alive("b")).await.unwrap();
        state.stop();
        drop(tx);

        let rounds = lines(&handle.await.unwrap());
        assert_eq!(rounds.len(), 1);
        let hosts: Vec<_> = rounds[0]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["host"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(hosts, vec!["a", "b"]);
    }

    #[derive(Debug)]
    enum Flaky {
        Fine(&'static str),
        Broken(&'static str),
    }

    impl Serialize for Flaky {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            match self {
                Flaky::Fine(host) => serializer.serialize_str(host),
                Flaky::Broken(_) => Err(serde::ser::Error::custom("boom")),
            }
        }
    }

    impl Report for Flaky {
        fn identity(&self) -> &str {
            match self {
                Flaky::Fine(host) | Flaky::Broken(host) => host,
            }
        }

        fn is_alive(&self) -> bool {
            matches!(self, Flaky::Fine(_))
        }
    }

    #[tokio::test]
    async fn encode_failure_drops_round_and_keeps_going() {
        let (tx, rx) = mpsc::channel(16);
        let state = EngineState::new();
        tx.send(Flaky::Broken("a")).await.unwrap();
        tx.send(Flaky::Fine("b")).await.unwrap();
        drop(tx);
        state.stop();

        let out = Aggregator::new("url", rx, 1, Vec::new(), state)
            .poll_interval(Duration::from_millis(10))
            .run()
            .await;
        assert_eq!(String::from_utf8(out).unwrap(), "[\"b\"]\n");
    }
}

use tokio_util::sync::CancellationToken;

/// The running flag shared by a supervisor, its watchers and its aggregator.
///
/// Written once by [`EngineState::stop`], read everywhere else. Readers only
/// look at it between cycles, so stopping never interrupts a probe.
#[derive(Debug, Clone, Default)]
pub struct EngineState {
    token: CancellationToken,
}

impl EngineState {
    pub fn new() -> EngineState {
        EngineState::default()
    }

    pub fn is_running(&self) -> bool {
        !self.token.is_cancelled()
    }

    pub fn stop(&self) {
        self.token.cancel();
    }
}

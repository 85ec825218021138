use depwarden_protocol::Technology;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterState {
    Init,
    ScratchReady,
    SettingsWritten,
    PluginInstalled,
    ResolverRan,
    Parsed,
    Done,
    Failed,
    Cleanup,
}

impl AdapterState {
    pub fn as_str(self) -> &'static str {
        match self {
            AdapterState::Init => "init",
            AdapterState::ScratchReady => "scratch-ready",
            AdapterState::SettingsWritten => "settings-written",
            AdapterState::PluginInstalled => "plugin-installed",
            AdapterState::ResolverRan => "resolver-ran",
            AdapterState::Parsed => "parsed",
            AdapterState::Done => "done",
            AdapterState::Failed => "failed",
            AdapterState::Cleanup => "cleanup",
        }
    }

    /// Settings and plugin installation are optional steps.
    pub fn can_advance_to(self, next: AdapterState) -> bool {
        use AdapterState::*;
        match (self, next) {
            (Cleanup, _) => false,
            (Done | Failed, Cleanup) => true,
            (Done | Failed, _) => false,
            (_, Failed) => true,
            (Init, ScratchReady) => true,
            (ScratchReady, SettingsWritten | PluginInstalled | ResolverRan) => true,
            (SettingsWritten, PluginInstalled | ResolverRan) => true,
            (PluginInstalled, ResolverRan) => true,
            (ResolverRan, Parsed) => true,
            (Parsed, Done) => true,
            _ => false,
        }
    }
}

impl fmt::Display for AdapterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks the steps of one adapter run.
#[derive(Debug, Clone)]
pub struct AdapterRun {
    technology: Technology,
    history: Vec<AdapterState>,
}

impl AdapterRun {
    pub fn start(technology: Technology) -> Self {
        Self {
            technology,
            history: vec![AdapterState::Init],
        }
    }

    pub fn state(&self) -> AdapterState {
        self.history
            .last()
            .copied()
            .unwrap_or(AdapterState::Init)
    }

    pub fn history(&self) -> &[AdapterState] {
        &self.history
    }

    /// Moves to `next`. Out-of-order steps are logged and ignored.
    pub fn advance(&mut self, next: AdapterState) {
        let current = self.state();
        if !current.can_advance_to(next) {
            log::warn!(
                "{}: ignoring transition {current} -> {next}",
                self.technology
            );
            return;
        }
        log::debug!("{}: {current} -> {next}", self.technology);
        self.history.push(next);
    }

    /// Records the outcome of the run, then cleanup.
    pub fn finish<T, E>(&mut self, outcome: &Result<T, E>) {
        if !matches!(self.state(), AdapterState::Done | AdapterState::Failed) {
            let last = match outcome {
                Ok(_) if self.state() == AdapterState::Parsed => AdapterState::Done,
                _ => AdapterState::Failed,
            };
            self.advance(last);
        }
        self.advance(AdapterState::Cleanup);
    }
}

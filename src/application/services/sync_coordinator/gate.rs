use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassState {
    Idle,
    Running,
}

/// Admits one pass at a time. A second caller is turned away, not queued.
#[derive(Debug, Clone)]
pub struct PassGate {
    state: Arc<Mutex<PassState>>,
}

/// Holds the gate in `Running` until dropped.
#[derive(Debug)]
pub struct PassGuard {
    state: Arc<Mutex<PassState>>,
}

impl PassGate {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(PassState::Idle)),
        }
    }

    pub fn try_begin(&self) -> Option<PassGuard> {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        if *state == PassState::Running {
            return None;
        }
        *state = PassState::Running;
        Some(PassGuard {
            state: Arc::clone(&self.state),
        })
    }

    pub fn state(&self) -> PassState {
        *self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn is_running(&self) -> bool {
        self.state() == PassState::Running
    }
}

impl Default for PassGate {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PassGuard {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        *state = PassState::Idle;
    }
}

//! `Uninitialized -> Fetching -> Installed -> Fetching -> ...`

use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapState {
    Uninitialized,
    Fetching,
    Installed,
}

impl BootstrapState {
    fn to_tag(self) -> u8 {
        match self {
            BootstrapState::Uninitialized => 0,
            BootstrapState::Fetching => 1,
            BootstrapState::Installed => 2,
        }
    }

    fn from_tag(tag: u8) -> Self {
        match tag {
            0 => BootstrapState::Uninitialized,
            1 => BootstrapState::Fetching,
            _ => BootstrapState::Installed,
        }
    }
}

/// Atomic cell holding the current state, readable without locking.
#[derive(Debug)]
pub struct BootstrapStateCell(AtomicU8);

impl BootstrapStateCell {
    pub fn new() -> Self {
        Self(AtomicU8::new(BootstrapState::Uninitialized.to_tag()))
    }

    pub fn get(&self) -> BootstrapState {
        BootstrapState::from_tag(self.0.load(Ordering::SeqCst))
    }

    pub fn set(&self, state: BootstrapState) {
        self.0.store(state.to_tag(), Ordering::SeqCst);
    }
}

impl Default for BootstrapStateCell {
    fn default() -> Self {
        Self::new()
    }
}

//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds the shared,
//! clonable resources every handler and socket session needs.

use crate::config::Config;
use std::sync::Arc;
use stoptalk_core::formatter::{ResponseFormatter, SeededSelector};

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// A fresh formatter for one session, seeded from config when a seed is set.
    pub fn formatter(&self) -> ResponseFormatter {
        match self.config.turn_signal_seed {
            Some(seed) => ResponseFormatter::seeded(seed),
            None => ResponseFormatter::new(Box::new(SeededSelector::from_entropy())),
        }
    }
}

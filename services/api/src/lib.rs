//! STOP-TALK API Library Crate
//!
//! This library contains the web surface around the pacing engine: the
//! application state, configuration, REST handlers, WebSocket session
//! logic, and routing. The `api` binary is a thin wrapper around it.

pub mod config;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;
pub mod ws;

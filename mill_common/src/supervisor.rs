//! Supervisor shared types.
//!
//! Everything the supervisory core shares with the run loop and the
//! interrupt domain: the operating state tag, the realtime flag sets,
//! and the boot-time policy and persisted settings.

pub mod config;
pub mod flags;
pub mod state;

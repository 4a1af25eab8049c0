//! # Mill Supervisor Library
//!
//! Supervisory core of a stepper-driven machine controller. Ties the
//! command parser, motion planner and step generator together through
//! shared state that is safe to touch from two concurrency domains:
//! run-to-completion interrupt handlers and one cooperative foreground loop.
//!
//! ## Shared State
//!
//! 1. **SignalBus**: four atomic flag registers; interrupts set, the
//!    foreground takes and clears.
//! 2. **Position registers**: machine position in steps (seqlocked,
//!    written only by the step generator) and the probe capture.
//! 3. **SystemState**: operating state and overrides, owned by the
//!    foreground.
//!
//! ## Reset Sequencer
//!
//! Runs once at boot and again after every abort: clears the record
//! (keeping only the operating state), the probe and the bus, reinitializes
//! every subsystem and resynchronizes the parser and planner to machine
//! position before handing control to the foreground loop.
//!
//! ## Zero-Allocation Core
//!
//! Nothing in `signal`, `position`, `shared`, `state`, `foreground` or
//! `sequencer` allocates. All shared state can live in a `static`.

#![deny(clippy::disallowed_types)]

pub mod collab;
pub mod foreground;
pub mod position;
pub mod report;
pub mod sequencer;
pub mod shared;
pub mod signal;
pub mod state;

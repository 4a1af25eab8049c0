//! Mill Common Library
//!
//! Shared constants, state enums, realtime flag sets and configuration
//! loading for the mill supervisor workspace.
//!
//! # Module Structure
//!
//! - [`consts`] - Axis count and override limits
//! - [`config`] - Configuration loading traits and types
//! - [`supervisor`] - Operating state, signal flags, boot policy
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use mill_common::prelude::*;
//!
//! let flags = ExecState::FEED_HOLD | ExecState::STATUS_REPORT;
//! assert!(flags.contains(ExecState::FEED_HOLD));
//! assert_eq!(OperatingState::default(), OperatingState::Idle);
//! ```

pub mod config;
pub mod consts;
pub mod prelude;
pub mod supervisor;

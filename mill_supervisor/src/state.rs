//! Foreground-owned system state.
//!
//! The record is mutated only through `&mut`, which makes the foreground
//! its single writer. Interrupt handlers never see it; they request
//! changes through the Signal Bus.

pub mod overrides;
pub mod system;

pub use overrides::Overrides;
pub use system::SystemState;

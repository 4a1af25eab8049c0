//! Realtime Signal Bus.
//!
//! Four independent one-byte flag registers through which interrupt
//! handlers request state changes from the foreground.
//!
//! ## Direction
//!
//! - `set` is callable from any domain at any time and is idempotent.
//! - `take_and_clear` / `take` / `clear` are crate-private and reached
//!   only through the foreground context and the reset sequencer, so the
//!   foreground is the single domain that ever clears bits.
//!
//! ## Atomicity
//!
//! `take_and_clear` is a single atomic swap. A flag set concurrently with
//! it lands either in the returned set or in the register afterwards,
//! never in neither. On a single core this is equivalent to masking
//! interrupts around a read-then-clear, without ever blocking.

use core::marker::PhantomData;
use core::sync::atomic::{AtomicU8, Ordering};

use bitflags::Flags;
use mill_common::supervisor::flags::{AccessoryOverride, AlarmFlags, ExecState, MotionOverride};

// ─── Flag Register ──────────────────────────────────────────────────

/// Atomic bit-set over a one-byte `bitflags` type.
pub struct FlagRegister<F> {
    bits: AtomicU8,
    _flags: PhantomData<F>,
}

impl<F: Flags<Bits = u8>> FlagRegister<F> {
    /// Create an empty register.
    pub const fn new() -> Self {
        Self {
            bits: AtomicU8::new(0),
            _flags: PhantomData,
        }
    }

    /// Set `flags`. Safe from any domain; never clears another bit.
    #[inline]
    pub fn set(&self, flags: F) {
        self.bits.fetch_or(flags.bits(), Ordering::Release);
    }

    /// Current pending set, without consuming it.
    #[inline]
    pub fn peek(&self) -> F {
        F::from_bits_retain(self.bits.load(Ordering::Acquire))
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bits.load(Ordering::Acquire) == 0
    }

    /// Read the pending set and clear exactly those bits.
    #[inline]
    pub(crate) fn take_and_clear(&self) -> F {
        F::from_bits_retain(self.bits.swap(0, Ordering::AcqRel))
    }

    /// Consume only the bits in `mask`; other pending bits stay set.
    #[inline]
    pub(crate) fn take(&self, mask: F) -> F {
        let previous = self.bits.fetch_and(!mask.bits(), Ordering::AcqRel);
        F::from_bits_retain(previous & mask.bits())
    }

    #[inline]
    pub(crate) fn clear(&self) {
        self.bits.store(0, Ordering::Release);
    }
}

impl<F: Flags<Bits = u8>> Default for FlagRegister<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Flags<Bits = u8> + core::fmt::Debug> core::fmt::Debug for FlagRegister<F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("FlagRegister").field(&self.peek()).finish()
    }
}

// ─── Signal Bus ─────────────────────────────────────────────────────

/// The four realtime executor registers.
#[derive(Debug, Default)]
pub struct SignalBus {
    /// Cycle start, feed hold, safety door, reset, ...
    pub exec_state: FlagRegister<ExecState>,
    /// Reason for entering `Alarm`.
    pub alarm: FlagRegister<AlarmFlags>,
    /// Feed / rapid override requests.
    pub motion_override: FlagRegister<MotionOverride>,
    /// Spindle / coolant override requests.
    pub accessory_override: FlagRegister<AccessoryOverride>,
}

/// Point-in-time copy of all four registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BusSnapshot {
    pub exec_state: ExecState,
    pub alarm: AlarmFlags,
    pub motion_override: MotionOverride,
    pub accessory_override: AccessoryOverride,
}

impl BusSnapshot {
    pub fn is_empty(&self) -> bool {
        self.exec_state.is_empty()
            && self.alarm.is_empty()
            && self.motion_override.is_empty()
            && self.accessory_override.is_empty()
    }
}

impl SignalBus {
    pub const fn new() -> Self {
        Self {
            exec_state: FlagRegister::new(),
            alarm: FlagRegister::new(),
            motion_override: FlagRegister::new(),
            accessory_override: FlagRegister::new(),
        }
    }

    /// Non-consuming view of every register.
    pub fn snapshot(&self) -> BusSnapshot {
        BusSnapshot {
            exec_state: self.exec_state.peek(),
            alarm: self.alarm.peek(),
            motion_override: self.motion_override.peek(),
            accessory_override: self.accessory_override.peek(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// Drop every pending request (reset iteration only).
    pub(crate) fn clear_all(&self) {
        self.exec_state.clear();
        self.alarm.clear();
        self.motion_override.clear();
        self.accessory_override.clear();
    }
}

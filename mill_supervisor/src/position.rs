//! Position registers: machine position and probe capture.
//!
//! Machine position is a multi-word vector written by the step generator
//! one pulse at a time and read by the foreground at arbitrary points.
//! Reads must never see half of one pulse, so the vector is published
//! under an even/odd sequence counter:
//!
//! - odd  = write in progress (reader retries)
//! - even = committed (reader copy is consistent if the counter did not move)
//!
//! The writer never waits. Readers retry only while a pulse is being
//! applied, which on a single core means only when they were preempted by
//! the step interrupt mid-copy.

use core::hint::spin_loop;
use core::sync::atomic::{AtomicI32, AtomicU32, AtomicU8, Ordering, fence};

use mill_common::consts::{AxisSteps, N_AXIS};
use mill_common::supervisor::state::ProbeState;

// ─── Sequence-locked Position Register ──────────────────────────────

/// Axis vector in steps published under a sequence counter.
///
/// Single writer: exactly one domain may call the write methods at a time.
#[derive(Debug)]
pub struct PositionRegister {
    seq: AtomicU32,
    axes: [AtomicI32; N_AXIS],
}

impl PositionRegister {
    /// Create a zeroed register.
    pub const fn new() -> Self {
        Self {
            seq: AtomicU32::new(0),
            axes: [const { AtomicI32::new(0) }; N_AXIS],
        }
    }

    /// Consistent copy of the whole vector.
    pub fn snapshot(&self) -> AxisSteps {
        loop {
            let before = self.seq.load(Ordering::Acquire);
            if before & 1 == 1 {
                spin_loop();
                continue;
            }

            let mut out = [0i32; N_AXIS];
            for (slot, axis) in out.iter_mut().zip(&self.axes) {
                *slot = axis.load(Ordering::Relaxed);
            }

            fence(Ordering::Acquire);
            if self.seq.load(Ordering::Relaxed) == before {
                return out;
            }
        }
    }

    /// Number of committed writes since construction (wrapping).
    #[inline]
    pub fn version(&self) -> u32 {
        self.seq.load(Ordering::Acquire) / 2
    }

    /// Apply one step pulse: every axis moves by its delta as one unit.
    pub(crate) fn apply_pulse(&self, deltas: &AxisSteps) {
        let seq = self.begin_write();
        for (axis, delta) in self.axes.iter().zip(deltas) {
            if *delta != 0 {
                axis.fetch_add(*delta, Ordering::Relaxed);
            }
        }
        self.end_write(seq);
    }

    /// Overwrite the whole vector.
    pub(crate) fn store(&self, value: &AxisSteps) {
        let seq = self.begin_write();
        for (axis, v) in self.axes.iter().zip(value) {
            axis.store(*v, Ordering::Relaxed);
        }
        self.end_write(seq);
    }

    #[inline]
    fn begin_write(&self) -> u32 {
        let seq = self.seq.load(Ordering::Relaxed);
        self.seq.store(seq.wrapping_add(1), Ordering::Relaxed);
        fence(Ordering::Release);
        seq
    }

    #[inline]
    fn end_write(&self, seq: u32) {
        self.seq.store(seq.wrapping_add(2), Ordering::Release);
    }
}

impl Default for PositionRegister {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Probe Registers ────────────────────────────────────────────────

/// Probe handshake state plus the captured trigger position.
///
/// The probing cycle arms the probe from the foreground; the step
/// interrupt captures machine position on the Armed → Triggered edge.
#[derive(Debug, Default)]
pub struct ProbeRegisters {
    state: AtomicU8,
    position: PositionRegister,
}

impl ProbeRegisters {
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(ProbeState::Inactive as u8),
            position: PositionRegister::new(),
        }
    }

    pub fn state(&self) -> ProbeState {
        ProbeState::from_u8(self.state.load(Ordering::Acquire)).unwrap_or_default()
    }

    /// Last captured probe position.
    pub fn position(&self) -> AxisSteps {
        self.position.snapshot()
    }

    /// Arm for a new probing cycle. Returns `false` unless the probe was
    /// `Inactive`.
    pub fn arm(&self) -> bool {
        self.state
            .compare_exchange(
                ProbeState::Inactive as u8,
                ProbeState::Armed as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// End a probing cycle that saw no contact.
    pub fn disarm(&self) -> bool {
        self.state
            .compare_exchange(
                ProbeState::Armed as u8,
                ProbeState::Inactive as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Consume a captured trigger position, returning the probe to
    /// `Inactive`.
    pub fn take_result(&self) -> Option<AxisSteps> {
        self.state
            .compare_exchange(
                ProbeState::Triggered as u8,
                ProbeState::Inactive as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .ok()
            .map(|_| self.position.snapshot())
    }

    /// Capture `machine` if armed. Step interrupt only.
    ///
    /// The position is published before the state moves to `Triggered`,
    /// so a foreground that sees `Triggered` always sees the capture.
    pub(crate) fn capture(&self, machine: &PositionRegister) -> bool {
        if self.state() != ProbeState::Armed {
            return false;
        }
        self.position.store(&machine.snapshot());
        self.state
            .compare_exchange(
                ProbeState::Armed as u8,
                ProbeState::Triggered as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Back to `Inactive` with a zero capture (reset iteration only).
    ///
    /// The state drops first so the step interrupt cannot capture into
    /// the register while it is being zeroed.
    pub(crate) fn clear(&self) {
        self.state.store(ProbeState::Inactive as u8, Ordering::Release);
        self.position.store(&[0; N_AXIS]);
    }
}

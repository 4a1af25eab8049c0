//! Report lines emitted through the reporting collaborator.
//!
//! Lines are formatted into fixed-capacity `heapless` strings so the run
//! loop can report without touching the heap.

use core::fmt::{self, Write};

use heapless::String;
use mill_common::consts::AxisSteps;
use mill_common::supervisor::state::OperatingState;

use crate::state::Overrides;

/// Printed after every reset iteration, at power-up and after an abort.
pub const STARTUP_NOTICE: &str = concat!("Mill ", env!("CARGO_PKG_VERSION"), " ['$' for help]");

/// Capacity of a rendered status line [bytes].
pub const STATUS_LINE_CAPACITY: usize = 96;

/// Short state label used in status lines.
pub const fn state_label(state: OperatingState) -> &'static str {
    match state {
        OperatingState::Idle => "Idle",
        OperatingState::Alarm => "Alarm",
        OperatingState::CheckMode => "Check",
        OperatingState::Homing => "Home",
        OperatingState::Cycle => "Run",
        OperatingState::Hold => "Hold",
        OperatingState::Jog => "Jog",
        OperatingState::SafetyDoor => "Door",
        OperatingState::Sleep => "Sleep",
    }
}

/// Realtime status snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReport {
    pub state: OperatingState,
    pub machine_position: AxisSteps,
    pub overrides: Overrides,
}

impl StatusReport {
    /// Render as `<State|MPos:x,y,z|Ov:feed,rapid,spindle>`.
    pub fn render(&self) -> Result<String<STATUS_LINE_CAPACITY>, fmt::Error> {
        let mut line = String::new();
        write!(line, "{self}")?;
        Ok(line)
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}|MPos:", state_label(self.state))?;
        for (i, steps) in self.machine_position.iter().enumerate() {
            if i > 0 {
                f.write_char(',')?;
            }
            write!(f, "{steps}")?;
        }
        write!(
            f,
            "|Ov:{},{},{}>",
            self.overrides.feed, self.overrides.rapid, self.overrides.spindle
        )
    }
}

//! # Fibre Records
//!
//! ```text
//!            create()
//!               │
//!               ▼
//!   ┌──────▶ Ready ───────── selected ────────▶ Running
//!   │          ▲                                  │
//!   │          │ wake tick reached                │ yield_now()
//!   │       Sleeping ◀──────── sleep(d > 0) ──────┤
//!   │                                             │
//!   └──────────────────────────────────────────── ┤
//!                                                 │ body returns
//!                                                 ▼
//!                                               Dead (slot retained)
//! ```

use shared_types::limits::NAME_MAX_LEN;
use shared_types::Tick;
use std::fmt;

/// Bounded fibre name.
pub type FibreName = heapless::String<16>;

/// Truncates `name` to at most 15 bytes on a character boundary.
#[must_use]
pub fn bounded_name(name: &str) -> FibreName {
    let mut end = name.len().min(NAME_MAX_LEN);
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    let mut bounded = FibreName::new();
    // Cannot fail: end <= NAME_MAX_LEN < capacity.
    let _ = bounded.push_str(&name[..end]);
    bounded
}

/// Handle to a fibre: its index in the fibre table.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FibreId(pub(crate) u8);

impl FibreId {
    /// The idle fibre always occupies slot 0.
    pub const IDLE: Self = Self(0);

    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[must_use]
    pub const fn is_idle(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for FibreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FibreId({})", self.0)
    }
}

impl fmt::Display for FibreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a fibre.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FibreState {
    Ready,
    Running,
    Sleeping,
    /// Reserved. No scheduler operation currently blocks a fibre.
    Blocked,
    Dead,
}

impl fmt::Display for FibreState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ready => "ready",
            Self::Running => "running",
            Self::Sleeping => "sleeping",
            Self::Blocked => "blocked",
            Self::Dead => "dead",
        };
        f.write_str(name)
    }
}

/// Snapshot of one fibre.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FibreInfo {
    pub id: FibreId,
    pub name: FibreName,
    pub state: FibreState,
    pub stack_size: u32,
    pub run_count: u32,
    pub last_run_tick: Tick,
    pub total_run_ticks: u32,
    /// Meaningful only while `state == Sleeping`.
    pub wake_tick: Tick,
}

/// Snapshot of scheduler counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub ticks: Tick,
    pub passes: u64,
    pub idle_passes: u64,
    pub fibre_count: usize,
    pub ready_count: usize,
    pub sleeping_count: usize,
    pub dead_count: usize,
}

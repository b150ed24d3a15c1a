pub mod dedup;
pub mod deficit;
pub mod evaluation;
pub mod excess;
pub mod generator;
pub mod renumber;

pub use dedup::deduplicate;
pub use deficit::{DeficitHint, Placement, QueueItem, ReflowQueue, complete_deficits, plan_reflow};
pub use evaluation::{EvaluationFilter, EvaluationReport, aggregate_evaluations};
pub use excess::trim_excess;
pub use generator::{AllocationCursor, DayAllocation, SlotChunk, generate_calendar};
pub use renumber::renumber;

/// Rows touched by a repair chain, for user-facing messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairSummary {
    pub renumbered: usize,
    pub deduplicated: usize,
    pub backfilled: usize,
    pub trimmed: usize,
}

impl RepairSummary {
    pub fn merge(&mut self, other: RepairSummary) {
        self.renumbered += other.renumbered;
        self.deduplicated += other.deduplicated;
        self.backfilled += other.backfilled;
        self.trimmed += other.trimmed;
    }

    pub fn is_empty(&self) -> bool {
        *self == RepairSummary::default()
    }

    pub fn to_cli_summary(&self) -> String {
        let mut parts = Vec::new();
        parts.push(format!("renumbered={}", self.renumbered));
        if self.deduplicated > 0 {
            parts.push(format!("duplicates={}", self.deduplicated));
        }
        if self.backfilled > 0 {
            parts.push(format!("backfilled={}", self.backfilled));
        }
        if self.trimmed > 0 {
            parts.push(format!("trimmed={}", self.trimmed));
        }
        parts.join(" ")
    }
}

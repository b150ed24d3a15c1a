use crate::class_group::ClassGroup;
use serde::{Deserialize, Serialize};

/// Lessons per weekday for one class, Monday..Friday. Weekends are always 0.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WeeklyLoad {
    per_weekday: [f64; 5],
}

impl WeeklyLoad {
    /// Explicit per-weekday fields win as soon as any one of them is set
    /// (unset ones count as 0). Otherwise the timetable hours are summed.
    pub fn resolve(class: &ClassGroup) -> Self {
        if class.weekday_load.iter().any(Option::is_some) {
            let per_weekday = class.weekday_load.map(|load| load.unwrap_or(0.0).max(0.0));
            return Self { per_weekday };
        }

        let mut per_weekday = [0.0; 5];
        for entry in &class.timetable {
            if let Some(total) = per_weekday.get_mut(entry.weekday as usize) {
                *total += entry.hours.max(0.0);
            }
        }
        Self { per_weekday }
    }

    /// 0 = Monday. Saturday and Sunday return 0.
    pub fn load(&self, weekday: u8) -> f64 {
        self.per_weekday.get(weekday as usize).copied().unwrap_or(0.0)
    }

    /// Whole lesson slots available on `weekday`.
    pub fn slots(&self, weekday: u8) -> u32 {
        self.load(weekday).floor() as u32
    }

    /// True when no weekday has room for a whole lesson slot.
    pub fn is_empty(&self) -> bool {
        self.per_weekday.iter().all(|load| *load < 1.0)
    }
}

use super::deficit::complete_deficits;
use super::renumber::renumber;
use crate::book::CalendarBook;
use crate::calendar::{SchoolCalendar, weekday_index};
use crate::curriculum::{Module, Period};
use crate::error::{CalendarError, CalendarResult};
use crate::lesson::ScheduledLesson;
use crate::load::WeeklyLoad;
use crate::operations::ensure_modules;
use chrono::NaiveDate;
use log::{debug, info};
use std::collections::{HashMap, HashSet};

/// Consecutive slots given to one module on one day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotChunk {
    pub module_index: usize,
    pub sequence_numbers: Vec<u32>,
    /// The module's delivered count after this chunk's last slot.
    pub module_sequence: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DayAllocation {
    pub chunks: Vec<SlotChunk>,
}

impl DayAllocation {
    pub fn slot_count(&self) -> usize {
        self.chunks.iter().map(|c| c.sequence_numbers.len()).sum()
    }
}

/// Module pointer and quota bookkeeping carried from one day to the next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationCursor {
    pub index: usize,
    pub delivered: Vec<u32>,
    pub global: u32,
}

impl AllocationCursor {
    pub fn new(module_count: usize) -> Self {
        Self {
            index: 0,
            delivered: vec![0; module_count],
            global: 0,
        }
    }

    /// Hands out `slots` lesson slots for one day.
    ///
    /// `targets[i]` is module `i`'s quota (0 = unlimited). With `fixed`, every
    /// slot goes to that module and the day stops once it is exhausted.
    /// Otherwise the cursor moves past exhausted modules, and the day stops
    /// when no module is left.
    pub fn allocate(&self, targets: &[u32], fixed: Option<usize>, slots: u32) -> (DayAllocation, AllocationCursor) {
        let mut next = self.clone();
        let mut allocation = DayAllocation::default();
        let exhausted = |delivered: &[u32], idx: usize| {
            let target = targets.get(idx).copied().unwrap_or(0);
            target > 0 && delivered.get(idx).copied().unwrap_or(0) >= target
        };

        for _ in 0..slots {
            let active = match fixed {
                Some(idx) if idx < targets.len() => {
                    if exhausted(&next.delivered, idx) {
                        break;
                    }
                    idx
                }
                Some(_) => break,
                None => {
                    while next.index < targets.len() && exhausted(&next.delivered, next.index) {
                        next.index += 1;
                    }
                    if next.index >= targets.len() {
                        break;
                    }
                    next.index
                }
            };

            next.delivered[active] += 1;
            next.global += 1;
            let module_sequence = next.delivered[active];
            match allocation.chunks.last_mut() {
                Some(chunk) if chunk.module_index == active => {
                    chunk.sequence_numbers.push(next.global);
                    chunk.module_sequence = module_sequence;
                }
                _ => allocation.chunks.push(SlotChunk {
                    module_index: active,
                    sequence_numbers: vec![next.global],
                    module_sequence,
                }),
            }
        }

        (allocation, next)
    }
}

/// Forward date walk over a class's periods.
pub struct CalendarGenerator<'a> {
    calendar: &'a SchoolCalendar,
    load: WeeklyLoad,
    modules: &'a [Module],
}

impl<'a> CalendarGenerator<'a> {
    pub fn new(calendar: &'a SchoolCalendar, load: WeeklyLoad, modules: &'a [Module]) -> Self {
        Self {
            calendar,
            load,
            modules,
        }
    }

    /// Builds the new lesson rows (ids unset). `occupied` dates are skipped.
    pub fn execute(
        &self,
        class_id: i32,
        periods: &[Period],
        occupied: &HashSet<NaiveDate>,
        start: AllocationCursor,
    ) -> Vec<ScheduledLesson> {
        let targets: Vec<u32> = self.modules.iter().map(|m| m.target_lessons).collect();
        let index_of: HashMap<i32, usize> = self
            .modules
            .iter()
            .enumerate()
            .map(|(idx, m)| (m.id, idx))
            .collect();

        let mut claimed = occupied.clone();
        let mut cursor = start;
        let mut rows = Vec::new();

        for period in periods {
            let fixed = period.module_id.and_then(|id| index_of.get(&id).copied());
            if period.module_id.is_some() && fixed.is_none() {
                debug!("period {} is dedicated to a module of another class; skipped", period.id);
                continue;
            }
            for day in self.calendar.lesson_days_in_range(period.start_date, period.end_date) {
                if claimed.contains(&day) {
                    continue;
                }
                let slots = self.load.slots(weekday_index(day));
                if slots == 0 {
                    continue;
                }

                let (allocation, next) = cursor.allocate(&targets, fixed, slots);
                cursor = next;
                if allocation.chunks.is_empty() {
                    continue;
                }
                claimed.insert(day);
                debug!("{day}: {} slot(s) in {} row(s)", allocation.slot_count(), allocation.chunks.len());

                for chunk in allocation.chunks {
                    let module = &self.modules[chunk.module_index];
                    let mut lesson = ScheduledLesson::new(0, class_id, period.id, Some(module.id), day);
                    lesson.slots = chunk.sequence_numbers.len() as u32;
                    lesson.global_sequence = chunk.sequence_numbers.last().copied();
                    lesson.module_sequence = Some(chunk.module_sequence);
                    lesson.summary_codes = chunk.sequence_numbers;
                    rows.push(lesson);
                }
            }
        }
        rows
    }
}

/// Generates the lesson calendar of one class and returns how many new rows
/// are still active once the class has been renumbered.
///
/// With `recalculate_all` every existing lesson of the class is removed first.
/// Otherwise dates already holding an active lesson are left alone and module
/// quotas start from what those lessons already deliver. Professional classes
/// get their deficits completed afterwards, so slots lost to a day shared by
/// two modules come back after the last lesson of the short module.
pub fn generate_calendar(book: &mut CalendarBook, class_id: i32, recalculate_all: bool) -> CalendarResult<usize> {
    if book.class(class_id).is_none() {
        return Ok(0);
    }
    let Some(year) = book.year_for_class(class_id).cloned() else {
        info!("class {class_id} has no academic year; nothing to generate");
        return Ok(0);
    };
    if year.closed {
        return Err(CalendarError::ClosedYear { year: year.name });
    }

    let calendar = book.calendar_for_year(&year)?;
    let load = book.class(class_id).map(WeeklyLoad::resolve).unwrap_or_default();
    if load.is_empty() {
        info!("class {class_id} has no weekly load; nothing to generate");
        return Ok(0);
    }
    let periods: Vec<Period> = book.applicable_periods(class_id).into_iter().cloned().collect();
    if periods.is_empty() {
        info!("class {class_id} has no applicable period; nothing to generate");
        return Ok(0);
    }
    let modules = ensure_modules(book, class_id)?;
    if modules.is_empty() {
        info!("class {class_id} has no module; nothing to generate");
        return Ok(0);
    }

    let mut cursor = AllocationCursor::new(modules.len());
    let mut occupied = HashSet::new();
    if recalculate_all {
        let existing: Vec<i32> = book
            .lessons
            .values()
            .filter(|l| l.class_id == class_id)
            .map(|l| l.id)
            .collect();
        let removed = book.purge_lessons(&existing);
        debug!("class {class_id}: removed {removed} existing lesson(s)");
    } else {
        let special = book.special_types().to_vec();
        for lesson in book.active_lessons(class_id) {
            occupied.insert(lesson.date);
            if let Some(idx) = modules.iter().position(|m| Some(m.id) == lesson.module_id) {
                let net = lesson.net_slots(&special);
                cursor.delivered[idx] += net;
                cursor.global += net;
            }
        }
    }

    let before = book.active_lessons(class_id).len();
    let rows = CalendarGenerator::new(&calendar, load, &modules).execute(class_id, &periods, &occupied, cursor);
    let written = rows.len();
    for row in rows {
        book.add_lesson(row);
    }

    let mut summary = renumber(book, class_id, None)?;
    summary.merge(complete_deficits(book, class_id, None)?);
    let created = book.active_lessons(class_id).len().saturating_sub(before);
    info!(
        "class {class_id}: generated {created} lesson(s) from {written} row(s) ({})",
        summary.to_cli_summary()
    );
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_moves_to_next_module_mid_day() {
        let cursor = AllocationCursor {
            index: 0,
            delivered: vec![1, 0],
            global: 1,
        };
        let (day, next) = cursor.allocate(&[2, 5], None, 3);
        assert_eq!(day.chunks.len(), 2);
        assert_eq!(day.chunks[0].sequence_numbers, vec![2]);
        assert_eq!(day.chunks[0].module_sequence, 2);
        assert_eq!(day.chunks[1].module_index, 1);
        assert_eq!(day.chunks[1].sequence_numbers, vec![3, 4]);
        assert_eq!(next.index, 1);
        assert_eq!(next.delivered, vec![2, 2]);
        assert_eq!(next.global, 4);
    }

    #[test]
    fn fixed_module_stops_when_exhausted() {
        let cursor = AllocationCursor {
            index: 0,
            delivered: vec![0, 4],
            global: 4,
        };
        let (day, next) = cursor.allocate(&[3, 5], Some(1), 3);
        assert_eq!(day.slot_count(), 1);
        assert_eq!(next.index, 0);
        assert_eq!(next.delivered, vec![0, 5]);
    }

    #[test]
    fn unlimited_module_never_exhausts() {
        let cursor = AllocationCursor::new(1);
        let (day, next) = cursor.allocate(&[0], None, 4);
        assert_eq!(day.slot_count(), 4);
        assert_eq!(next.delivered, vec![4]);
    }

    #[test]
    fn all_modules_exhausted_yields_empty_day() {
        let cursor = AllocationCursor {
            index: 1,
            delivered: vec![2, 2],
            global: 4,
        };
        let (day, next) = cursor.allocate(&[2, 2], None, 3);
        assert!(day.chunks.is_empty());
        assert_eq!(next.index, 2);
        assert_eq!(next.global, 4);
    }
}

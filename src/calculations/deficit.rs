//! Backfill for strict-quota classes.
//!
//! When a professional class loses delivered lessons (a deletion, a retype to
//! a special type), each under-delivered module gets new lessons right after
//! its last one. Lessons already sitting there are pushed forward, one
//! eligible day at a time, without ever exceeding a day's load.

use super::RepairSummary;
use super::renumber::renumber;
use crate::book::CalendarBook;
use crate::calendar::weekday_index;
use crate::curriculum::Period;
use crate::error::{CalendarError, CalendarResult};
use crate::lesson::ScheduledLesson;
use crate::load::WeeklyLoad;
use chrono::{Duration, NaiveDate};
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet, VecDeque};

/// The edit that triggered the backfill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeficitHint {
    pub date: NaiveDate,
    pub module_id: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueItem {
    /// One missing lesson slot for the module being repaired.
    Placeholder,
    /// An existing lesson to push forward.
    Existing(i32),
}

/// Items waiting to be placed, front first.
///
/// Placeholders always come before existing lessons, and existing lessons keep
/// their chronological order. `peek` looks at the front without removing it;
/// an item that does not fit today stays at the front and is retried on the
/// next eligible day. `pop` removes the front once it has been placed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReflowQueue {
    items: VecDeque<QueueItem>,
}

impl ReflowQueue {
    pub fn new<I: IntoIterator<Item = i32>>(placeholders: u32, existing: I) -> Self {
        let mut items: VecDeque<QueueItem> = (0..placeholders).map(|_| QueueItem::Placeholder).collect();
        items.extend(existing.into_iter().map(QueueItem::Existing));
        Self { items }
    }

    pub fn peek(&self) -> Option<&QueueItem> {
        self.items.front()
    }

    pub fn pop(&mut self) -> Option<QueueItem> {
        self.items.pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn placeholders(&self) -> usize {
        self.items
            .iter()
            .filter(|item| matches!(item, QueueItem::Placeholder))
            .count()
    }

    /// Ids of the existing lessons still waiting, front first.
    pub fn existing(&self) -> impl Iterator<Item = i32> + '_ {
        self.items.iter().filter_map(|item| match item {
            QueueItem::Existing(id) => Some(*id),
            QueueItem::Placeholder => None,
        })
    }
}

/// Where one queue item lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// A new lesson with `slots` slots, from placeholders merged on one day.
    New { date: NaiveDate, slots: u32 },
    Move { lesson_id: i32, date: NaiveDate },
}

impl Placement {
    pub fn date(&self) -> NaiveDate {
        match self {
            Placement::New { date, .. } | Placement::Move { date, .. } => *date,
        }
    }
}

/// Drains `queue` over `days` (date, capacity), in order.
///
/// Each day holds at most one row: placeholders popped on the same day merge
/// into one new lesson, and an existing lesson is moved only onto a day with
/// no row yet and only if its slots fit the capacity. Returns the placements
/// and whatever is left in the queue when the days run out.
pub fn plan_reflow(
    mut queue: ReflowQueue,
    days: &[(NaiveDate, u32)],
    sizes: &HashMap<i32, u32>,
) -> (Vec<Placement>, ReflowQueue) {
    let mut placements = Vec::new();
    for &(date, capacity) in days {
        if queue.is_empty() {
            break;
        }
        let mut remaining = capacity;
        let mut new_slots = 0;
        let mut moved = false;
        while let Some(item) = queue.peek().copied() {
            match item {
                QueueItem::Placeholder => {
                    if remaining == 0 || moved {
                        break;
                    }
                    new_slots += 1;
                    remaining -= 1;
                }
                QueueItem::Existing(lesson_id) => {
                    let size = sizes.get(&lesson_id).copied().unwrap_or(1);
                    if moved || new_slots > 0 || size > remaining {
                        break;
                    }
                    placements.push(Placement::Move { lesson_id, date });
                    remaining -= size;
                    moved = true;
                }
            }
            queue.pop();
        }
        if new_slots > 0 {
            placements.push(Placement::New { date, slots: new_slots });
        }
    }
    (placements, queue)
}

/// Restores every module of a professional class to its target.
///
/// Other tracks are left untouched. Ends with a renumber when anything moved.
pub fn complete_deficits(
    book: &mut CalendarBook,
    class_id: i32,
    hint: Option<DeficitHint>,
) -> CalendarResult<RepairSummary> {
    let mut summary = RepairSummary::default();
    let Some(class) = book.class(class_id).cloned() else {
        return Ok(summary);
    };
    if !class.is_professional() {
        return Ok(summary);
    }
    let Some(year) = book.year_for_class(class_id).cloned() else {
        return Ok(summary);
    };
    if year.closed {
        return Err(CalendarError::ClosedYear { year: year.name });
    }

    let calendar = book.calendar_for_year(&year)?;
    let load = WeeklyLoad::resolve(&class);
    let special = book.special_types().to_vec();
    let periods: Vec<Period> = book.applicable_periods(class_id).into_iter().cloned().collect();
    let (Some(earliest), Some(latest)) = (
        periods.iter().map(|p| p.start_date).min(),
        periods.iter().map(|p| p.end_date).max(),
    ) else {
        return Ok(summary);
    };

    let modules: Vec<(i32, u32)> = book
        .class_modules(class_id)
        .iter()
        .filter(|m| !m.is_unlimited())
        .map(|m| (m.id, m.target_lessons))
        .collect();

    for (module_id, target) in modules {
        // Earlier modules may have shifted dates; read state again.
        let lessons: Vec<ScheduledLesson> = book.active_lessons(class_id).into_iter().cloned().collect();
        let own: Vec<&ScheduledLesson> = lessons.iter().filter(|l| l.module_id == Some(module_id)).collect();
        let delivered: u32 = own.iter().map(|l| l.net_slots(&special)).sum();
        if delivered >= target {
            continue;
        }
        let deficit = target - delivered;

        let after_last = own.iter().map(|l| l.date + Duration::days(1)).max();
        let after_hint = hint
            .filter(|h| h.module_id == Some(module_id))
            .map(|h| h.date + Duration::days(1));
        let start = after_last.max(after_hint).unwrap_or(earliest).max(earliest);

        let movable: Vec<&ScheduledLesson> = lessons
            .iter()
            .filter(|l| l.date >= start && !l.is_special(&special))
            .collect();
        let stationary: HashSet<NaiveDate> = lessons
            .iter()
            .filter(|l| l.date >= start && l.is_special(&special))
            .map(|l| l.date)
            .collect();
        let sizes: HashMap<i32, u32> = movable.iter().map(|l| (l.id, l.total_slots())).collect();

        let mut days: Vec<(NaiveDate, u32)> = calendar
            .lesson_days_in_range(start, latest)
            .filter(|day| !stationary.contains(day))
            .filter(|day| periods.iter().any(|p| p.contains(*day)))
            .map(|day| (day, load.slots(weekday_index(day))))
            .filter(|(_, capacity)| *capacity > 0)
            .collect();

        // Lessons still queued when the days run out keep their dates, so
        // nothing else may be placed on those days.
        let current: HashMap<i32, NaiveDate> = movable.iter().map(|l| (l.id, l.date)).collect();
        let movable_ids: Vec<i32> = movable.iter().map(|l| l.id).collect();
        let (plan, leftover) = loop {
            let queue = ReflowQueue::new(deficit, movable_ids.iter().copied());
            let (placements, leftover) = plan_reflow(queue, &days, &sizes);
            let kept: HashSet<NaiveDate> = leftover.existing().filter_map(|id| current.get(&id).copied()).collect();
            if !placements.iter().any(|p| kept.contains(&p.date())) {
                break (placements, leftover);
            }
            days.retain(|(day, _)| !kept.contains(day));
        };
        if leftover.placeholders() > 0 {
            warn!(
                "class {class_id}: module {module_id} is still short by {} slot(s)",
                leftover.placeholders()
            );
        }
        let stuck = leftover.existing().count();
        if stuck > 0 {
            warn!("class {class_id}: {stuck} lesson(s) found no later day and keep their dates");
        }
        if plan.is_empty() {
            continue;
        }

        for placement in plan {
            match placement {
                Placement::New { date, slots } => {
                    let Some(period_id) = book.period_for_date(class_id, date, Some(module_id)).map(|p| p.id) else {
                        continue;
                    };
                    let mut lesson = ScheduledLesson::new(0, class_id, period_id, Some(module_id), date);
                    lesson.slots = slots;
                    book.add_lesson(lesson);
                    summary.backfilled += slots as usize;
                    debug!("class {class_id}: backfilled {slots} slot(s) of module {module_id} on {date}");
                }
                Placement::Move { lesson_id, date } => {
                    let module = book.lessons.get(&lesson_id).and_then(|l| l.module_id);
                    let Some(period_id) = book.period_for_date(class_id, date, module).map(|p| p.id) else {
                        continue;
                    };
                    if let Some(lesson) = book.lessons.get_mut(&lesson_id) {
                        if lesson.date != date {
                            debug!("class {class_id}: lesson {lesson_id} moved {} -> {date}", lesson.date);
                        }
                        lesson.move_to(date, period_id);
                    }
                }
            }
        }
    }

    if summary.backfilled > 0 {
        info!("class {class_id}: backfilled {} lesson slot(s)", summary.backfilled);
        summary.merge(renumber(book, class_id, None)?);
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn queue_yields_placeholders_before_existing() {
        let mut queue = ReflowQueue::new(2, [7, 9]);
        assert_eq!(queue.len(), 4);
        assert_eq!(queue.placeholders(), 2);
        assert_eq!(queue.peek(), Some(&QueueItem::Placeholder));
        assert_eq!(queue.pop(), Some(QueueItem::Placeholder));
        assert_eq!(queue.pop(), Some(QueueItem::Placeholder));
        assert_eq!(queue.peek(), Some(&QueueItem::Existing(7)));
        assert_eq!(queue.peek(), Some(&QueueItem::Existing(7)));
        assert_eq!(queue.pop(), Some(QueueItem::Existing(7)));
        assert_eq!(queue.pop(), Some(QueueItem::Existing(9)));
        assert!(queue.pop().is_none());
    }

    #[test]
    fn placeholders_merge_and_existing_lessons_shift() {
        let queue = ReflowQueue::new(3, [10, 11]);
        let sizes = HashMap::from([(10, 2), (11, 2)]);
        let days = [(d(2026, 3, 2), 2), (d(2026, 3, 4), 2), (d(2026, 3, 9), 2), (d(2026, 3, 11), 2)];
        let (placements, leftover) = plan_reflow(queue, &days, &sizes);
        assert!(leftover.is_empty());
        assert_eq!(
            placements,
            vec![
                Placement::New { date: d(2026, 3, 2), slots: 2 },
                Placement::New { date: d(2026, 3, 4), slots: 1 },
                Placement::Move { lesson_id: 10, date: d(2026, 3, 9) },
                Placement::Move { lesson_id: 11, date: d(2026, 3, 11) },
            ]
        );
    }

    #[test]
    fn oversized_lesson_waits_for_a_bigger_day() {
        let queue = ReflowQueue::new(0, [5]);
        let sizes = HashMap::from([(5, 3)]);
        let days = [(d(2026, 3, 2), 2), (d(2026, 3, 3), 3)];
        let (placements, leftover) = plan_reflow(queue, &days, &sizes);
        assert!(leftover.is_empty());
        assert_eq!(placements, vec![Placement::Move { lesson_id: 5, date: d(2026, 3, 3) }]);
    }

    #[test]
    fn leftover_is_reported_when_days_run_out() {
        let queue = ReflowQueue::new(2, [1]);
        let days = [(d(2026, 3, 2), 2)];
        let (placements, leftover) = plan_reflow(queue, &days, &HashMap::new());
        assert_eq!(placements.len(), 1);
        assert_eq!(leftover.len(), 1);
        assert_eq!(leftover.peek(), Some(&QueueItem::Existing(1)));
        assert_eq!(leftover.existing().collect::<Vec<_>>(), vec![1]);
    }
}

use crate::book::CalendarBook;
use chrono::NaiveDate;
use log::debug;
use std::collections::BTreeMap;

/// Leaves at most one active lesson per date for a class.
///
/// The survivor is the first row with a written summary, else the earliest
/// row. The others are soft-deleted. Returns how many were removed.
pub fn deduplicate(book: &mut CalendarBook, class_id: i32) -> usize {
    let mut by_date: BTreeMap<NaiveDate, Vec<(i32, bool)>> = BTreeMap::new();
    for lesson in book.active_lessons(class_id) {
        by_date
            .entry(lesson.date)
            .or_default()
            .push((lesson.id, lesson.has_summary()));
    }

    let mut removed = 0;
    for (date, rows) in by_date {
        if rows.len() < 2 {
            continue;
        }
        let keep = rows
            .iter()
            .find(|(_, has_summary)| *has_summary)
            .or_else(|| rows.first())
            .map(|(id, _)| *id);
        for (id, _) in &rows {
            if Some(*id) != keep && book.soft_delete_lesson(*id) {
                removed += 1;
            }
        }
        debug!("class {class_id}: {date} had {} rows, kept {keep:?}", rows.len());
    }
    removed
}

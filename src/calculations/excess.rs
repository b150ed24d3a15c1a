use super::RepairSummary;
use super::renumber::renumber;
use crate::book::CalendarBook;
use crate::error::CalendarResult;
use crate::lesson::LessonState;
use chrono::NaiveDate;
use log::{debug, info};
use std::collections::HashMap;

/// Removes lessons beyond a module's target in a professional class.
///
/// Active non-special lessons are counted in calendar order. A lesson that is
/// entirely past the target is soft-deleted; one that straddles it keeps only
/// its in-quota slots. With `reference`, only lessons on or after that date
/// are touched.
pub fn trim_excess(
    book: &mut CalendarBook,
    class_id: i32,
    reference: Option<NaiveDate>,
) -> CalendarResult<RepairSummary> {
    let mut summary = RepairSummary::default();
    if !book.class(class_id).is_some_and(|c| c.is_professional()) {
        return Ok(summary);
    }
    book.ensure_mutable(class_id)?;

    let special = book.special_types().to_vec();
    let targets: HashMap<i32, u32> = book
        .class_modules(class_id)
        .iter()
        .filter(|m| !m.is_unlimited())
        .map(|m| (m.id, m.target_lessons))
        .collect();

    let mut running: HashMap<i32, u32> = HashMap::new();
    for id in book.active_lesson_ids(class_id) {
        let Some(lesson) = book.lessons.get_mut(&id) else {
            continue;
        };
        if lesson.is_special(&special) {
            continue;
        }
        let Some(module_id) = lesson.module_id else {
            continue;
        };
        let Some(&target) = targets.get(&module_id) else {
            continue;
        };

        let net = lesson.net_slots(&special);
        let count = running.entry(module_id).or_insert(0);
        *count += net;
        if *count <= target || reference.is_some_and(|from| lesson.date < from) {
            continue;
        }

        let surplus = (*count - target).min(net);
        *count -= surplus;
        if surplus == net {
            debug!("class {class_id}: lesson {id} on {} is past module {module_id}'s target", lesson.date);
            lesson.state = LessonState::Deleted;
        } else {
            let keep = net - surplus;
            debug!("class {class_id}: lesson {id} on {} shrunk to {keep} slot(s)", lesson.date);
            lesson.slots = keep;
            lesson.summary_codes.truncate(keep as usize);
            lesson.non_lesson_count = lesson.non_lesson_count.map(|n| n.min(keep));
        }
        summary.trimmed += 1;
    }

    if summary.trimmed > 0 {
        info!("class {class_id}: trimmed {} lesson(s) over target", summary.trimmed);
        summary.merge(renumber(book, class_id, None)?);
    }
    Ok(summary)
}

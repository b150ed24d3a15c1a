use super::RepairSummary;
use super::dedup::deduplicate;
use crate::book::CalendarBook;
use crate::error::CalendarResult;
use crate::lesson::LessonType;
use log::{debug, info};
use std::collections::HashMap;

/// Recomputes summary codes and sequence numbers for a class.
///
/// Duplicates are removed first. Active lessons are then walked in
/// (date, id) order; each one takes the next `net` global numbers and
/// advances its module's counter by `net`. Lessons with no net slots keep
/// their row but lose their codes. Running it twice changes nothing.
pub fn renumber(book: &mut CalendarBook, class_id: i32, special: Option<&[LessonType]>) -> CalendarResult<RepairSummary> {
    book.ensure_mutable(class_id)?;
    let deduplicated = deduplicate(book, class_id);
    let special: Vec<LessonType> = match special {
        Some(types) => types.to_vec(),
        None => book.special_types().to_vec(),
    };

    let mut global: u32 = 0;
    let mut per_module: HashMap<Option<i32>, u32> = HashMap::new();
    let mut renumbered = 0;

    for id in book.active_lesson_ids(class_id) {
        let Some(lesson) = book.lessons.get_mut(&id) else {
            continue;
        };
        let total = lesson.total_slots();
        let is_special = lesson.is_special(&special);
        let non_lesson = lesson.effective_non_lesson(&special);
        let net = if is_special { total - non_lesson } else { total };

        let codes: Vec<u32> = (global + 1..=global + net).collect();
        global += net;
        let counter = per_module.entry(lesson.module_id).or_insert(0);
        *counter += net;

        let stored_non_lesson = if is_special {
            Some(non_lesson)
        } else {
            lesson.non_lesson_count.map(|count| count.min(total))
        };

        let changed = lesson.slots != total
            || lesson.summary_codes != codes
            || lesson.module_sequence != Some(*counter)
            || lesson.global_sequence != Some(global)
            || lesson.non_lesson_count != stored_non_lesson;
        if changed {
            lesson.slots = total;
            lesson.summary_codes = codes;
            lesson.module_sequence = Some(*counter);
            lesson.global_sequence = Some(global);
            lesson.non_lesson_count = stored_non_lesson;
            renumbered += 1;
        }
    }

    if renumbered > 0 || deduplicated > 0 {
        info!("class {class_id}: renumbered {renumbered} lesson(s), removed {deduplicated} duplicate(s)");
    } else {
        debug!("class {class_id}: numbering already consistent");
    }
    Ok(RepairSummary {
        renumbered,
        deduplicated,
        ..RepairSummary::default()
    })
}

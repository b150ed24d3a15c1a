//! User-facing operations on a [`CalendarBook`].
//!
//! Every mutation checks the academic year first and fails with
//! [`CalendarError::ClosedYear`] before changing anything. Lesson edits run the
//! repair chain: renumber, then backfill or trim, each ending in a renumber.

use crate::academic_year::Holiday;
use crate::book::CalendarBook;
use crate::calculations::{DeficitHint, RepairSummary, complete_deficits, renumber, trim_excess};
use crate::calendar::national_holidays;
use crate::class_group::TrackKind;
use crate::curriculum::{Module, Period, PeriodKind};
use crate::error::{CalendarError, CalendarResult};
use crate::lesson::{LessonState, LessonType, ScheduledLesson};
use chrono::NaiveDate;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

const IMPORTED_PERIOD_NAME: &str = "Imported";

/// Creates or updates the annual and semester periods of a class from its
/// academic year. Modular periods are never touched. Returns the period ids.
pub fn ensure_basic_periods(book: &mut CalendarBook, class_id: i32) -> CalendarResult<Vec<i32>> {
    book.ensure_mutable(class_id)?;
    let Some(year) = book.year_for_class(class_id).cloned() else {
        return Ok(Vec::new());
    };

    let mut wanted = vec![(PeriodKind::Annual, "Anual", year.start_date, year.end_date)];
    if let Some(first_end) = year.first_semester_end {
        wanted.push((PeriodKind::Semester1, "1.º Semestre", year.start_date, first_end));
    }
    if let Some(second_start) = year.second_semester_start {
        wanted.push((PeriodKind::Semester2, "2.º Semestre", second_start, year.end_date));
    }

    let mut ids = Vec::with_capacity(wanted.len());
    for (kind, name, start, end) in wanted {
        let existing = book
            .periods
            .values_mut()
            .find(|p| p.class_id == class_id && p.kind == kind && p.module_id.is_none());
        match existing {
            Some(period) => {
                period.start_date = start;
                period.end_date = end;
                ids.push(period.id);
            }
            None => {
                ids.push(book.add_period(Period::new(0, class_id, name, kind, start, end)));
            }
        }
    }
    debug!("class {class_id}: basic periods {ids:?}");
    Ok(ids)
}

/// Modules of a class in declared order. A standard class with none gets the
/// catch-all module (unlimited target).
pub fn ensure_modules(book: &mut CalendarBook, class_id: i32) -> CalendarResult<Vec<Module>> {
    let modules: Vec<Module> = book.class_modules(class_id).into_iter().cloned().collect();
    let is_standard = book.class(class_id).is_some_and(|c| c.track == TrackKind::Standard);
    if !modules.is_empty() || !is_standard {
        return Ok(modules);
    }

    book.ensure_mutable(class_id)?;
    let mut general = Module::new(0, class_id, book.config().general_module_name.clone(), 0);
    general.tolerance = book.config().default_tolerance;
    let id = book.add_module(general);
    info!("class {class_id}: created catch-all module {id}");
    Ok(book.class_modules(class_id).into_iter().cloned().collect())
}

/// The modular period dedicated to `module_id`, created over the whole
/// academic year when missing. `None` when the class has no academic year.
pub fn ensure_modular_period(book: &mut CalendarBook, module_id: i32) -> CalendarResult<Option<i32>> {
    let Some(module) = book.modules.get(&module_id).cloned() else {
        return Err(CalendarError::invalid(format!("module {module_id} does not exist")));
    };
    if let Some(period) = book
        .periods
        .values()
        .find(|p| p.kind == PeriodKind::Modular && p.module_id == Some(module_id))
    {
        return Ok(Some(period.id));
    }

    book.ensure_mutable(module.class_id)?;
    let Some(year) = book.year_for_class(module.class_id).cloned() else {
        return Ok(None);
    };
    let period = Period::new(0, module.class_id, module.name, PeriodKind::Modular, year.start_date, year.end_date)
        .for_module(module_id);
    Ok(Some(book.add_period(period)))
}

/// Adds the national holidays falling inside the academic year. Holidays
/// already recorded with the same name and date are skipped.
pub fn add_national_holidays(book: &mut CalendarBook, year_id: i32) -> CalendarResult<usize> {
    book.ensure_year_mutable(year_id)?;
    let Some(year) = book.years.get(&year_id).cloned() else {
        return Ok(0);
    };

    let mut added = 0;
    for calendar_year in year.calendar_years() {
        for (name, date) in national_holidays(calendar_year) {
            if !year.contains(date) {
                continue;
            }
            let exists = book
                .holidays
                .values()
                .any(|h| h.academic_year_id == year_id && h.name == name && h.date == Some(date));
            if exists {
                continue;
            }
            book.add_holiday(Holiday::on(0, year_id, name, date));
            added += 1;
        }
    }
    info!("academic year '{}': added {added} national holiday(s)", year.name);
    Ok(added)
}

/// A lesson typed in by hand.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLesson {
    pub date: NaiveDate,
    pub module_id: Option<i32>,
    /// Resolved from the date when empty.
    pub period_id: Option<i32>,
    pub lesson_type: LessonType,
    pub slots: u32,
    pub non_lesson_count: Option<u32>,
    pub summary: Option<String>,
    pub forecast: Option<String>,
    pub notes: Option<String>,
    pub activity: bool,
    pub activity_name: Option<String>,
}

impl NewLesson {
    pub fn on(date: NaiveDate, module_id: Option<i32>) -> Self {
        Self {
            date,
            module_id,
            period_id: None,
            lesson_type: LessonType::Normal,
            slots: 1,
            non_lesson_count: None,
            summary: None,
            forecast: None,
            notes: None,
            activity: false,
            activity_name: None,
        }
    }
}

/// Changes to an existing lesson. `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LessonEdit {
    pub date: Option<NaiveDate>,
    pub module_id: Option<Option<i32>>,
    pub lesson_type: Option<LessonType>,
    pub slots: Option<u32>,
    pub summary_codes: Option<Vec<u32>>,
    pub non_lesson_count: Option<Option<u32>>,
    pub summary: Option<Option<String>>,
    pub forecast: Option<Option<String>>,
    pub notes: Option<Option<String>>,
    pub activity: Option<bool>,
}

fn resolve_period(
    book: &CalendarBook,
    class_id: i32,
    date: NaiveDate,
    module_id: Option<i32>,
    explicit: Option<i32>,
) -> CalendarResult<i32> {
    if let Some(period_id) = explicit {
        return match book.periods.get(&period_id) {
            Some(period) if period.class_id == class_id && period.contains(date) => Ok(period_id),
            Some(_) => Err(CalendarError::invalid(format!(
                "{date} is outside period {period_id} of class {class_id}"
            ))),
            None => Err(CalendarError::invalid(format!("period {period_id} does not exist"))),
        };
    }
    book.period_for_date(class_id, date, module_id)
        .map(|p| p.id)
        .ok_or_else(|| CalendarError::invalid(format!("no period of class {class_id} contains {date}")))
}

pub fn add_lesson(book: &mut CalendarBook, class_id: i32, new: NewLesson) -> CalendarResult<(i32, RepairSummary)> {
    book.ensure_mutable(class_id)?;
    if book.class(class_id).is_none() {
        return Err(CalendarError::invalid(format!("class {class_id} does not exist")));
    }
    let period_id = resolve_period(book, class_id, new.date, new.module_id, new.period_id)?;

    let mut lesson = ScheduledLesson::new(0, class_id, period_id, new.module_id, new.date);
    lesson.slots = new.slots.max(1);
    lesson.lesson_type = new.lesson_type;
    lesson.non_lesson_count = new.non_lesson_count;
    lesson.summary = new.summary;
    lesson.forecast = new.forecast;
    lesson.notes = new.notes;
    lesson.activity = new.activity;
    lesson.activity_name = new.activity_name;
    let lesson_id = book.add_lesson(lesson);

    let mut summary = renumber(book, class_id, None)?;
    let hint = DeficitHint {
        date: new.date,
        module_id: new.module_id,
    };
    summary.merge(complete_deficits(book, class_id, Some(hint))?);
    summary.merge(renumber(book, class_id, None)?);
    Ok((lesson_id, summary))
}

pub fn edit_lesson(book: &mut CalendarBook, lesson_id: i32, edit: LessonEdit) -> CalendarResult<RepairSummary> {
    let Some(current) = book.lessons.get(&lesson_id).filter(|l| l.is_active()).cloned() else {
        debug!("lesson {lesson_id} not found or deleted; nothing to edit");
        return Ok(RepairSummary::default());
    };
    let class_id = current.class_id;
    book.ensure_mutable(class_id)?;

    let special = book.special_types().to_vec();
    let was_special = current.is_special(&special);
    let date = edit.date.unwrap_or(current.date);
    let module_id = edit.module_id.unwrap_or(current.module_id);
    let period_id = if date != current.date || module_id != current.module_id {
        resolve_period(book, class_id, date, module_id, None)?
    } else {
        current.period_id
    };

    let Some(lesson) = book.lessons.get_mut(&lesson_id) else {
        return Ok(RepairSummary::default());
    };
    lesson.module_id = module_id;
    lesson.move_to(date, period_id);
    if let Some(lesson_type) = edit.lesson_type {
        if lesson_type != lesson.lesson_type {
            lesson.lesson_type = lesson_type;
            lesson.non_lesson_count = None;
        }
    }
    if let Some(slots) = edit.slots {
        lesson.slots = slots.max(1);
    }
    if let Some(codes) = edit.summary_codes {
        lesson.summary_codes = codes;
    }
    if let Some(count) = edit.non_lesson_count {
        lesson.non_lesson_count = count;
    }
    if let Some(summary) = edit.summary {
        lesson.summary = summary;
    }
    if let Some(forecast) = edit.forecast {
        lesson.forecast = forecast;
    }
    if let Some(notes) = edit.notes {
        lesson.notes = notes;
    }
    if let Some(activity) = edit.activity {
        lesson.activity = activity;
    }
    let now_special = lesson.is_special(&special);

    let mut summary = renumber(book, class_id, None)?;
    if was_special && !now_special {
        summary.merge(trim_excess(book, class_id, Some(date))?);
    } else {
        let hint = DeficitHint { date, module_id };
        summary.merge(complete_deficits(book, class_id, Some(hint))?);
    }
    Ok(summary)
}

pub fn delete_lesson(book: &mut CalendarBook, lesson_id: i32) -> CalendarResult<RepairSummary> {
    let Some(lesson) = book.lessons.get(&lesson_id).filter(|l| l.is_active()).cloned() else {
        debug!("lesson {lesson_id} not found or already deleted");
        return Ok(RepairSummary::default());
    };
    book.ensure_mutable(lesson.class_id)?;
    book.soft_delete_lesson(lesson_id);

    let mut summary = renumber(book, lesson.class_id, None)?;
    let hint = DeficitHint {
        date: lesson.date,
        module_id: lesson.module_id,
    };
    summary.merge(complete_deficits(book, lesson.class_id, Some(hint))?);
    Ok(summary)
}

pub fn retype_lesson(book: &mut CalendarBook, lesson_id: i32, lesson_type: LessonType) -> CalendarResult<RepairSummary> {
    match book.lessons.get(&lesson_id) {
        Some(lesson) if lesson.lesson_type != lesson_type => {}
        _ => return Ok(RepairSummary::default()),
    }
    edit_lesson(
        book,
        lesson_id,
        LessonEdit {
            lesson_type: Some(lesson_type),
            ..LessonEdit::default()
        },
    )
}

/// Outcome of retyping every lesson on one date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateRetype {
    pub retyped: usize,
    /// Names of closed academic years whose lessons were left alone.
    pub skipped_years: Vec<String>,
    pub repairs: RepairSummary,
}

/// Retypes every active non-extra lesson on `date`, across all classes.
pub fn retype_date(book: &mut CalendarBook, date: NaiveDate, lesson_type: LessonType) -> CalendarResult<DateRetype> {
    if lesson_type == LessonType::Extra {
        return Err(CalendarError::invalid("lessons cannot be bulk-retyped to extra"));
    }

    let mut outcome = DateRetype::default();
    let candidates: Vec<(i32, i32)> = book
        .lessons
        .values()
        .filter(|l| l.is_active() && l.date == date && l.lesson_type != LessonType::Extra)
        .map(|l| (l.id, l.class_id))
        .collect();

    let mut touched_classes = Vec::new();
    for (lesson_id, class_id) in candidates {
        if let Some(year) = book.year_for_class(class_id).filter(|y| y.closed) {
            if !outcome.skipped_years.contains(&year.name) {
                outcome.skipped_years.push(year.name.clone());
            }
            continue;
        }
        if let Some(lesson) = book.lessons.get_mut(&lesson_id) {
            if lesson.lesson_type != lesson_type {
                lesson.lesson_type = lesson_type;
                lesson.non_lesson_count = None;
                outcome.retyped += 1;
                if !touched_classes.contains(&class_id) {
                    touched_classes.push(class_id);
                }
            }
        }
    }

    for class_id in touched_classes {
        outcome.repairs.merge(renumber(book, class_id, None)?);
    }
    if !outcome.skipped_years.is_empty() {
        warn!("{date}: closed academic years skipped: {}", outcome.skipped_years.join(", "));
    }
    Ok(outcome)
}

/// Adds an `extra` lesson holding `count` slots.
pub fn add_extra_lesson(
    book: &mut CalendarBook,
    class_id: i32,
    date: NaiveDate,
    count: u32,
    summary: Option<String>,
    notes: Option<String>,
) -> CalendarResult<i32> {
    book.ensure_mutable(class_id)?;
    if count < 1 {
        return Err(CalendarError::invalid("an extra lesson needs at least one slot"));
    }
    let period_id = resolve_period(book, class_id, date, None, None)?;
    if !book.active_lessons_on(class_id, date).is_empty() {
        return Err(CalendarError::invalid(format!("{date} already holds a lesson")));
    }

    let mut lesson = ScheduledLesson::new(0, class_id, period_id, None, date);
    lesson.lesson_type = LessonType::Extra;
    lesson.slots = count;
    lesson.summary = summary;
    lesson.notes = notes;
    let lesson_id = book.add_lesson(lesson);
    renumber(book, class_id, None)?;
    Ok(lesson_id)
}

/// Free-text changes only; numbering is not touched.
pub fn update_lesson_text(
    book: &mut CalendarBook,
    lesson_id: i32,
    summary: Option<String>,
    notes: Option<String>,
) -> CalendarResult<()> {
    let Some(class_id) = book
        .lessons
        .get(&lesson_id)
        .filter(|l| l.is_active())
        .map(|l| l.class_id)
    else {
        return Ok(());
    };
    book.ensure_mutable(class_id)?;
    if let Some(lesson) = book.lessons.get_mut(&lesson_id) {
        lesson.summary = summary;
        lesson.notes = notes;
    }
    Ok(())
}

/// Hard-deletes every lesson of the class. Returns how many were removed.
pub fn reset_calendar(book: &mut CalendarBook, class_id: i32) -> CalendarResult<usize> {
    book.ensure_mutable(class_id)?;
    let ids: Vec<i32> = book
        .lessons
        .values()
        .filter(|l| l.class_id == class_id)
        .map(|l| l.id)
        .collect();
    let removed = book.purge_lessons(&ids);
    info!("class {class_id}: calendar reset, {removed} lesson(s) removed");
    Ok(removed)
}

/// Renumbers every class holding more than one active lesson on `date`.
/// Classes in closed years are skipped. Returns the duplicates removed.
pub fn repair_duplicates_on(book: &mut CalendarBook, date: NaiveDate) -> CalendarResult<usize> {
    let mut classes: Vec<i32> = book
        .classes
        .keys()
        .copied()
        .filter(|id| book.active_lessons_on(*id, date).len() > 1)
        .collect();
    classes.retain(|id| book.ensure_mutable(*id).is_ok());

    let mut removed = 0;
    for class_id in classes {
        removed += renumber(book, class_id, None)?.deduplicated;
    }
    Ok(removed)
}

/// One lesson as exchanged with other tools.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LessonRecord {
    /// `YYYY-MM-DD`; `dd/mm/YYYY` is accepted on import.
    pub date: String,
    pub weekday: u8,
    pub module_ref: Option<i32>,
    pub module_name: Option<String>,
    pub sequence_in_module: Option<u32>,
    pub global_sequence: Option<u32>,
    /// Comma-joined global sequence numbers.
    pub summary_codes: String,
    pub free_text_summary: Option<String>,
    pub forecast_text: Option<String>,
    pub notes: Option<String>,
    #[serde(rename = "type")]
    pub lesson_type: String,
    pub period_ref: Option<i32>,
    pub non_lesson_count: Option<u32>,
}

impl LessonRecord {
    fn parse_date(&self) -> Option<NaiveDate> {
        let text = self.date.trim();
        NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .or_else(|_| NaiveDate::parse_from_str(text, "%d/%m/%Y"))
            .ok()
    }

    fn parse_codes(&self) -> Vec<u32> {
        self.summary_codes
            .split(',')
            .filter_map(|part| part.trim().parse().ok())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportCounts {
    pub created: usize,
    pub updated: usize,
    pub ignored: usize,
}

/// Active lessons of a class in date order, optionally limited to one period.
pub fn export_lessons(book: &CalendarBook, class_id: i32, period_id: Option<i32>) -> Vec<LessonRecord> {
    book.active_lessons(class_id)
        .into_iter()
        .filter(|l| period_id.is_none_or(|id| l.period_id == id))
        .map(|lesson| LessonRecord {
            date: lesson.date.format("%Y-%m-%d").to_string(),
            weekday: lesson.weekday,
            module_ref: lesson.module_id,
            module_name: lesson.module_id.map(|_| book.module_name(lesson.module_id)),
            sequence_in_module: lesson.module_sequence,
            global_sequence: lesson.global_sequence,
            summary_codes: lesson.joined_codes(),
            free_text_summary: lesson.summary.clone(),
            forecast_text: lesson.forecast.clone(),
            notes: lesson.notes.clone(),
            lesson_type: lesson.lesson_type.as_str().to_string(),
            period_ref: Some(lesson.period_id),
            non_lesson_count: lesson.non_lesson_count,
        })
        .collect()
}

fn module_for_record(book: &mut CalendarBook, class_id: i32, record: &LessonRecord) -> Option<i32> {
    let name = record.module_name.as_deref().map(str::trim).filter(|n| !n.is_empty());
    if let Some(name) = name {
        if let Some(module) = book
            .class_modules(class_id)
            .into_iter()
            .find(|m| m.name.eq_ignore_ascii_case(name))
        {
            return Some(module.id);
        }
        let mut module = Module::new(0, class_id, name, 0);
        module.tolerance = book.config().default_tolerance;
        let id = book.add_module(module);
        debug!("class {class_id}: import created module '{name}' ({id})");
        return Some(id);
    }
    record
        .module_ref
        .filter(|id| book.modules.get(id).is_some_and(|m| m.class_id == class_id))
}

fn period_for_import(book: &mut CalendarBook, class_id: i32, date: NaiveDate, module_id: Option<i32>) -> i32 {
    if let Some(period) = book.period_for_date(class_id, date, module_id) {
        return period.id;
    }
    let catch_all = book
        .periods
        .values_mut()
        .find(|p| p.class_id == class_id && p.kind == PeriodKind::Annual && p.name == IMPORTED_PERIOD_NAME);
    if let Some(period) = catch_all {
        period.start_date = period.start_date.min(date);
        period.end_date = period.end_date.max(date);
        return period.id;
    }
    let (start, end) = match book.year_for_class(class_id) {
        Some(year) => (year.start_date.min(date), year.end_date.max(date)),
        None => (date, date),
    };
    book.add_period(Period::new(0, class_id, IMPORTED_PERIOD_NAME, PeriodKind::Annual, start, end))
}

/// Upserts lessons by date. Ends with a renumber of the class.
pub fn import_lessons(book: &mut CalendarBook, class_id: i32, records: &[LessonRecord]) -> CalendarResult<ImportCounts> {
    book.ensure_mutable(class_id)?;
    if book.class(class_id).is_none() {
        return Err(CalendarError::invalid(format!("class {class_id} does not exist")));
    }

    let special = book.special_types().to_vec();
    let mut counts = ImportCounts::default();
    for record in records {
        let Some(date) = record.parse_date() else {
            warn!("class {class_id}: import skipped a row with date '{}'", record.date);
            counts.ignored += 1;
            continue;
        };
        let module_id = module_for_record(book, class_id, record);
        let period_id = period_for_import(book, class_id, date, module_id);
        let lesson_type = LessonType::from_str(&record.lesson_type).unwrap_or(LessonType::Normal);
        let codes = record.parse_codes();
        // Codes only cover lesson slots; special lessons add back their non-lesson slots.
        let non_lesson = if special.contains(&lesson_type) {
            record.non_lesson_count.unwrap_or(0)
        } else {
            0
        };

        let existing = book.active_lessons_on(class_id, date).first().map(|l| l.id);
        let lesson_id = match existing {
            Some(id) => {
                counts.updated += 1;
                id
            }
            None => {
                counts.created += 1;
                book.add_lesson(ScheduledLesson::new(0, class_id, period_id, module_id, date))
            }
        };
        if let Some(lesson) = book.lessons.get_mut(&lesson_id) {
            lesson.module_id = module_id;
            lesson.move_to(date, period_id);
            lesson.slots = (codes.len() as u32 + non_lesson).max(1);
            lesson.summary_codes = codes;
            lesson.module_sequence = record.sequence_in_module;
            lesson.global_sequence = record.global_sequence;
            lesson.lesson_type = lesson_type;
            lesson.non_lesson_count = record.non_lesson_count;
            lesson.summary = record.free_text_summary.clone();
            lesson.forecast = record.forecast_text.clone();
            lesson.notes = record.notes.clone();
            lesson.state = LessonState::Active;
        }
    }

    renumber(book, class_id, None)?;
    info!(
        "class {class_id}: import created {}, updated {}, ignored {}",
        counts.created, counts.updated, counts.ignored
    );
    Ok(counts)
}

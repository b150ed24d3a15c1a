use crate::academic_year::{AcademicYear, Holiday, Interruption};
use crate::calendar::SchoolCalendar;
use crate::class_group::ClassGroup;
use crate::config::EngineConfig;
use crate::curriculum::{Module, Period, PeriodKind};
use crate::date_text::DateExpressionError;
use crate::error::{CalendarError, CalendarResult};
use crate::lesson::{LessonState, LessonType, ScheduledLesson, StudentLessonRecord, lessons_to_dataframe};
use chrono::NaiveDate;
use polars::prelude::{DataFrame, PolarsResult};
use std::collections::BTreeMap;

/// All calendar state held in memory.
///
/// Every entity is keyed by its id. Ids are allocated as `max + 1` per entity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalendarBook {
    pub years: BTreeMap<i32, AcademicYear>,
    pub holidays: BTreeMap<i32, Holiday>,
    pub interruptions: BTreeMap<i32, Interruption>,
    pub classes: BTreeMap<i32, ClassGroup>,
    pub periods: BTreeMap<i32, Period>,
    pub modules: BTreeMap<i32, Module>,
    pub lessons: BTreeMap<i32, ScheduledLesson>,
    pub student_records: BTreeMap<i32, StudentLessonRecord>,
    config: EngineConfig,
}

fn next_id<T>(map: &BTreeMap<i32, T>) -> i32 {
    map.keys().next_back().map_or(1, |last| last + 1)
}

impl CalendarBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: EngineConfig) {
        self.config = config;
    }

    pub fn special_types(&self) -> &[LessonType] {
        &self.config.special_types
    }

    // Inserts assign a fresh id and return it.

    pub fn add_year(&mut self, mut year: AcademicYear) -> i32 {
        year.id = next_id(&self.years);
        let id = year.id;
        self.years.insert(id, year);
        id
    }

    pub fn add_holiday(&mut self, mut holiday: Holiday) -> i32 {
        holiday.id = next_id(&self.holidays);
        let id = holiday.id;
        self.holidays.insert(id, holiday);
        id
    }

    pub fn add_interruption(&mut self, mut interruption: Interruption) -> i32 {
        interruption.id = next_id(&self.interruptions);
        let id = interruption.id;
        self.interruptions.insert(id, interruption);
        id
    }

    pub fn add_class(&mut self, mut class: ClassGroup) -> i32 {
        class.id = next_id(&self.classes);
        let id = class.id;
        self.classes.insert(id, class);
        id
    }

    pub fn add_period(&mut self, mut period: Period) -> i32 {
        period.id = next_id(&self.periods);
        let id = period.id;
        self.periods.insert(id, period);
        id
    }

    pub fn add_module(&mut self, mut module: Module) -> i32 {
        module.id = next_id(&self.modules);
        let id = module.id;
        self.modules.insert(id, module);
        id
    }

    pub fn add_lesson(&mut self, mut lesson: ScheduledLesson) -> i32 {
        lesson.id = next_id(&self.lessons);
        let id = lesson.id;
        self.lessons.insert(id, lesson);
        id
    }

    pub fn add_student_record(&mut self, mut record: StudentLessonRecord) -> i32 {
        record.id = next_id(&self.student_records);
        let id = record.id;
        self.student_records.insert(id, record);
        id
    }

    pub fn class(&self, class_id: i32) -> Option<&ClassGroup> {
        self.classes.get(&class_id)
    }

    pub fn class_by_name(&self, name: &str) -> Option<&ClassGroup> {
        self.classes.values().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn year_for_class(&self, class_id: i32) -> Option<&AcademicYear> {
        self.class(class_id)
            .and_then(|c| c.academic_year_id)
            .and_then(|year_id| self.years.get(&year_id))
    }

    /// Rejects changes to a class whose academic year is closed.
    pub fn ensure_mutable(&self, class_id: i32) -> CalendarResult<()> {
        match self.year_for_class(class_id) {
            Some(year) if year.closed => Err(CalendarError::ClosedYear {
                year: year.name.clone(),
            }),
            _ => Ok(()),
        }
    }

    pub fn ensure_year_mutable(&self, year_id: i32) -> CalendarResult<()> {
        match self.years.get(&year_id) {
            Some(year) if year.closed => Err(CalendarError::ClosedYear {
                year: year.name.clone(),
            }),
            _ => Ok(()),
        }
    }

    pub fn calendar_for_year(&self, year: &AcademicYear) -> Result<SchoolCalendar, DateExpressionError> {
        SchoolCalendar::for_year(
            year,
            self.holidays.values().filter(|h| h.academic_year_id == year.id),
            self.interruptions.values().filter(|i| i.academic_year_id == year.id),
        )
    }

    /// Periods of a class ordered by start date.
    pub fn class_periods(&self, class_id: i32) -> Vec<&Period> {
        let mut periods: Vec<&Period> = self
            .periods
            .values()
            .filter(|p| p.class_id == class_id)
            .collect();
        periods.sort_by_key(|p| (p.start_date, p.id));
        periods
    }

    /// Periods the generator and the backfill walk for this class.
    pub fn applicable_periods(&self, class_id: i32) -> Vec<&Period> {
        let Some(class) = self.class(class_id) else {
            return Vec::new();
        };
        let kinds = PeriodKind::applicable(class.track, class.periodization);
        self.class_periods(class_id)
            .into_iter()
            .filter(|p| kinds.contains(&p.kind))
            .collect()
    }

    /// Modules of a class in declared order.
    pub fn class_modules(&self, class_id: i32) -> Vec<&Module> {
        self.modules.values().filter(|m| m.class_id == class_id).collect()
    }

    pub fn module_name(&self, module_id: Option<i32>) -> String {
        module_id
            .and_then(|id| self.modules.get(&id))
            .map(|m| m.name.clone())
            .unwrap_or_default()
    }

    /// Active lessons of a class ordered by (date, id).
    pub fn active_lessons(&self, class_id: i32) -> Vec<&ScheduledLesson> {
        let mut lessons: Vec<&ScheduledLesson> = self
            .lessons
            .values()
            .filter(|l| l.class_id == class_id && l.is_active())
            .collect();
        lessons.sort_by_key(|l| (l.date, l.id));
        lessons
    }

    pub fn active_lesson_ids(&self, class_id: i32) -> Vec<i32> {
        self.active_lessons(class_id).iter().map(|l| l.id).collect()
    }

    pub fn active_lessons_on(&self, class_id: i32, date: NaiveDate) -> Vec<&ScheduledLesson> {
        self.active_lessons(class_id)
            .into_iter()
            .filter(|l| l.date == date)
            .collect()
    }

    pub fn soft_delete_lesson(&mut self, lesson_id: i32) -> bool {
        match self.lessons.get_mut(&lesson_id) {
            Some(lesson) if lesson.is_active() => {
                lesson.state = LessonState::Deleted;
                true
            }
            _ => false,
        }
    }

    /// Removes lessons and their student records for good.
    pub fn purge_lessons(&mut self, lesson_ids: &[i32]) -> usize {
        let before = self.lessons.len();
        for id in lesson_ids {
            self.lessons.remove(id);
        }
        self.student_records
            .retain(|_, record| !lesson_ids.contains(&record.lesson_id));
        before - self.lessons.len()
    }

    pub fn records_for_lesson(&self, lesson_id: i32) -> impl Iterator<Item = &StudentLessonRecord> {
        self.student_records
            .values()
            .filter(move |r| r.lesson_id == lesson_id)
    }

    /// Period of the class containing `date`, preferring the one dedicated to `module_id`.
    pub fn period_for_date(&self, class_id: i32, date: NaiveDate, module_id: Option<i32>) -> Option<&Period> {
        let containing: Vec<&Period> = self
            .class_periods(class_id)
            .into_iter()
            .filter(|p| p.contains(date))
            .collect();
        containing
            .iter()
            .find(|p| module_id.is_some() && p.module_id == module_id)
            .or_else(|| containing.iter().find(|p| p.module_id.is_none()))
            .or_else(|| containing.first())
            .copied()
    }

    /// Active lessons of a class as a polars frame, in calendar order.
    pub fn lesson_frame(&self, class_id: i32) -> PolarsResult<DataFrame> {
        let lessons = self.active_lessons(class_id);
        lessons_to_dataframe(&lessons, &|module_id| self.module_name(module_id))
    }
}

pub mod academic_year;
pub mod book;
pub mod calculations;
pub mod calendar;
pub mod class_group;
pub mod config;
pub mod curriculum;
pub mod date_text;
pub mod error;
pub mod lesson;
pub mod load;
pub mod operations;
pub mod persistence;

pub use academic_year::{AcademicYear, Holiday, Interruption};
pub use book::CalendarBook;
pub use calculations::{
    AllocationCursor, DayAllocation, DeficitHint, EvaluationFilter, EvaluationReport,
    RepairSummary, SlotChunk, aggregate_evaluations, complete_deficits, deduplicate,
    generate_calendar, renumber, trim_excess,
};
pub use calendar::{SchoolCalendar, national_holidays};
pub use class_group::{ClassGroup, Periodization, TimetableEntry, TrackKind};
pub use config::EngineConfig;
pub use curriculum::{Module, Period, PeriodKind};
pub use date_text::{DateExpressionError, expand_dates, parse_pt_date};
pub use error::{CalendarError, CalendarResult};
pub use lesson::{LessonState, LessonType, ScheduledLesson, StudentLessonRecord};
pub use load::WeeklyLoad;
pub use operations::{DateRetype, ImportCounts, LessonEdit, LessonRecord, NewLesson};
#[cfg(feature = "sqlite")]
pub use persistence::sqlite::SqliteCalendarStore;
pub use persistence::{
    CalendarStore, PersistenceError, PersistenceResult, export_lessons_to_json,
    export_summaries_to_csv, import_lessons_from_json, load_book_from_json, save_book_to_json,
};

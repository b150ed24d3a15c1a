use crate::book::CalendarBook;
use polars::prelude::PolarsError;

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("dataframe conversion error: {0}")]
    DataFrame(#[from] PolarsError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "sqlite")]
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("no calendar stored")]
    NotFound,
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

pub trait CalendarStore {
    fn save_book(&self, book: &CalendarBook) -> PersistenceResult<()>;
    fn load_book(&self) -> PersistenceResult<Option<CalendarBook>>;
}

/// Cross-entity checks run before saving and after loading.
pub fn validate_book(book: &CalendarBook) -> PersistenceResult<()> {
    for lesson in book.lessons.values() {
        if !book.classes.contains_key(&lesson.class_id) {
            return Err(PersistenceError::InvalidData(format!(
                "lesson {} references unknown class {}",
                lesson.id, lesson.class_id
            )));
        }
        let Some(period) = book.periods.get(&lesson.period_id) else {
            return Err(PersistenceError::InvalidData(format!(
                "lesson {} references unknown period {}",
                lesson.id, lesson.period_id
            )));
        };
        if !period.contains(lesson.date) {
            return Err(PersistenceError::InvalidData(format!(
                "lesson {} dated {} falls outside period '{}'",
                lesson.id, lesson.date, period.name
            )));
        }
        if let Some(module_id) = lesson.module_id {
            if !book.modules.contains_key(&module_id) {
                return Err(PersistenceError::InvalidData(format!(
                    "lesson {} references unknown module {module_id}",
                    lesson.id
                )));
            }
        }
    }

    for period in book.periods.values() {
        if period.start_date > period.end_date {
            return Err(PersistenceError::InvalidData(format!(
                "period {} ends before it starts",
                period.id
            )));
        }
    }
    for year in book.years.values() {
        if year.start_date > year.end_date {
            return Err(PersistenceError::InvalidData(format!(
                "academic year '{}' ends before it starts",
                year.name
            )));
        }
    }
    Ok(())
}

#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod file;

pub use file::{
    export_lessons_to_json, export_summaries_to_csv, import_lessons_from_json,
    load_book_from_json, save_book_to_json,
};

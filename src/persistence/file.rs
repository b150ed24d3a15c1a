use super::{PersistenceError, PersistenceResult, validate_book};
use crate::academic_year::{AcademicYear, Holiday, Interruption};
use crate::book::CalendarBook;
use crate::class_group::ClassGroup;
use crate::config::EngineConfig;
use crate::curriculum::{Module, Period};
use crate::error::CalendarResult;
use crate::lesson::{LessonType, ScheduledLesson, StudentLessonRecord};
use crate::operations::{ImportCounts, LessonRecord, export_lessons, import_lessons};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

#[derive(Serialize, Deserialize)]
struct BookSnapshot {
    #[serde(default)]
    config: EngineConfig,
    #[serde(default)]
    years: Vec<AcademicYear>,
    #[serde(default)]
    holidays: Vec<Holiday>,
    #[serde(default)]
    interruptions: Vec<Interruption>,
    #[serde(default)]
    classes: Vec<ClassGroup>,
    #[serde(default)]
    periods: Vec<Period>,
    #[serde(default)]
    modules: Vec<Module>,
    #[serde(default)]
    lessons: Vec<ScheduledLesson>,
    #[serde(default)]
    student_records: Vec<StudentLessonRecord>,
}

impl BookSnapshot {
    fn from_book(book: &CalendarBook) -> PersistenceResult<Self> {
        validate_book(book)?;
        Ok(Self {
            config: book.config().clone(),
            years: book.years.values().cloned().collect(),
            holidays: book.holidays.values().cloned().collect(),
            interruptions: book.interruptions.values().cloned().collect(),
            classes: book.classes.values().cloned().collect(),
            periods: book.periods.values().cloned().collect(),
            modules: book.modules.values().cloned().collect(),
            lessons: book.lessons.values().cloned().collect(),
            student_records: book.student_records.values().cloned().collect(),
        })
    }

    fn into_book(self) -> PersistenceResult<CalendarBook> {
        let mut book = CalendarBook::with_config(self.config);
        book.years = self.years.into_iter().map(|e| (e.id, e)).collect();
        book.holidays = self.holidays.into_iter().map(|e| (e.id, e)).collect();
        book.interruptions = self.interruptions.into_iter().map(|e| (e.id, e)).collect();
        book.classes = self.classes.into_iter().map(|e| (e.id, e)).collect();
        book.periods = self.periods.into_iter().map(|e| (e.id, e)).collect();
        book.modules = self.modules.into_iter().map(|e| (e.id, e)).collect();
        book.lessons = self.lessons.into_iter().map(|e| (e.id, e)).collect();
        book.student_records = self.student_records.into_iter().map(|e| (e.id, e)).collect();
        validate_book(&book)?;
        Ok(book)
    }
}

pub fn save_book_to_json<P: AsRef<Path>>(book: &CalendarBook, path: P) -> PersistenceResult<()> {
    let snapshot = BookSnapshot::from_book(book)?;
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, &snapshot)?;
    Ok(())
}

pub fn load_book_from_json<P: AsRef<Path>>(path: P) -> PersistenceResult<CalendarBook> {
    let file = File::open(path)?;
    let snapshot: BookSnapshot = serde_json::from_reader(file)?;
    snapshot.into_book()
}

/// Writes the class's lessons as a JSON array of [`LessonRecord`].
pub fn export_lessons_to_json<P: AsRef<Path>>(
    book: &CalendarBook,
    class_id: i32,
    period_id: Option<i32>,
    path: P,
) -> PersistenceResult<usize> {
    let records = export_lessons(book, class_id, period_id);
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, &records)?;
    Ok(records.len())
}

pub fn import_lessons_from_json<P: AsRef<Path>>(
    book: &mut CalendarBook,
    class_id: i32,
    path: P,
) -> CalendarResult<ImportCounts> {
    let file = File::open(path).map_err(PersistenceError::from)?;
    let records: Vec<LessonRecord> = serde_json::from_reader(file).map_err(PersistenceError::from)?;
    import_lessons(book, class_id, &records)
}

#[derive(Serialize)]
struct SummaryCsvRecord {
    #[serde(rename = "DATA")]
    date: String,
    #[serde(rename = "MÓDULO")]
    module: String,
    #[serde(rename = "N.º Sumário")]
    codes: String,
    #[serde(rename = "Sumário")]
    summary: String,
}

impl From<&LessonRecord> for SummaryCsvRecord {
    fn from(record: &LessonRecord) -> Self {
        Self {
            date: format_date(&record.date),
            module: record.module_name.clone().unwrap_or_default(),
            codes: record.summary_codes.clone(),
            summary: record.free_text_summary.clone().unwrap_or_default(),
        }
    }
}

/// Summary sheet for spreadsheets: `;`-separated with a UTF-8 BOM, normal and
/// extra lessons only. Returns the rows written.
pub fn export_summaries_to_csv<P: AsRef<Path>>(
    book: &CalendarBook,
    class_id: i32,
    period_id: Option<i32>,
    path: P,
) -> PersistenceResult<usize> {
    let mut file = File::create(path)?;
    file.write_all("\u{feff}".as_bytes())?;
    let mut writer = csv::WriterBuilder::new().delimiter(b';').from_writer(file);

    let mut written = 0;
    for record in export_lessons(book, class_id, period_id) {
        let kind = LessonType::from_str(&record.lesson_type);
        if !matches!(kind, Some(LessonType::Normal | LessonType::Extra)) {
            continue;
        }
        writer.serialize(SummaryCsvRecord::from(&record))?;
        written += 1;
    }
    writer.flush()?;
    Ok(written)
}

fn format_date(iso: &str) -> String {
    NaiveDate::parse_from_str(iso, "%Y-%m-%d")
        .map(|d| d.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|_| iso.to_string())
}

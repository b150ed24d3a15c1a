use chrono::NaiveDate;
use lesson_calendar::operations::{LessonRecord, ensure_basic_periods, export_lessons, import_lessons, retype_lesson};
use lesson_calendar::{
    AcademicYear, CalendarBook, ClassGroup, EngineConfig, Holiday, LessonType, Module, PersistenceError,
    Periodization, ScheduledLesson, StudentLessonRecord, TrackKind, export_lessons_to_json,
    export_summaries_to_csv, generate_calendar, import_lessons_from_json, load_book_from_json, renumber,
    save_book_to_json,
};
use std::fs;
use tempfile::{NamedTempFile, tempdir};

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn sample_book() -> (CalendarBook, i32) {
    let mut book = CalendarBook::new();
    let year_id = book.add_year(
        AcademicYear::new(0, "2025/2026", d(2025, 9, 15), d(2026, 6, 30))
            .with_semesters(d(2026, 1, 30), d(2026, 2, 2)),
    );
    book.add_holiday(Holiday::on(0, year_id, "Implantação da República", d(2025, 10, 5)));
    let class_id = book.add_class(
        ClassGroup::new(0, "CP1", TrackKind::Professional, Periodization::Annual)
            .in_year(year_id)
            .with_load(0, 3.0)
            .with_load(2, 3.0),
    );
    ensure_basic_periods(&mut book, class_id).unwrap();
    book.add_module(Module::new(0, class_id, "Programação", 6));
    book.add_module(Module::new(0, class_id, "Redes", 6));
    generate_calendar(&mut book, class_id, true).unwrap();

    let first = book.active_lessons(class_id)[0].id;
    book.lessons.get_mut(&first).unwrap().summary = Some("Apresentação; regras".into());
    book.add_student_record(StudentLessonRecord::new(0, first, 7).with_rubric([4, 5, 3, 4, 5]));
    (book, class_id)
}

#[test]
fn json_snapshot_round_trip() {
    let (book, _) = sample_book();
    let file = NamedTempFile::new().unwrap();
    save_book_to_json(&book, file.path()).unwrap();
    let loaded = load_book_from_json(file.path()).unwrap();
    assert_eq!(loaded, book);
}

#[test]
fn snapshot_with_dangling_reference_is_rejected() {
    let (mut book, class_id) = sample_book();
    book.add_lesson(ScheduledLesson::new(0, class_id, 99, None, d(2025, 9, 16)));
    let file = NamedTempFile::new().unwrap();
    let err = save_book_to_json(&book, file.path()).unwrap_err();
    assert!(matches!(err, PersistenceError::InvalidData(_)));
}

#[test]
fn lesson_outside_its_period_is_rejected() {
    let (mut book, class_id) = sample_book();
    let id = book.active_lessons(class_id)[0].id;
    book.lessons.get_mut(&id).unwrap().date = d(2026, 8, 3);
    let file = NamedTempFile::new().unwrap();
    assert!(save_book_to_json(&book, file.path()).is_err());
}

#[test]
fn exported_lessons_carry_codes_and_module_names() {
    let (book, class_id) = sample_book();
    let records = export_lessons(&book, class_id, None);
    assert_eq!(records.len(), 4);
    assert_eq!(records[0].date, "2025-09-15");
    assert_eq!(records[0].summary_codes, "1,2,3");
    assert_eq!(records[0].module_name.as_deref(), Some("Programação"));
    assert_eq!(records[0].lesson_type, "normal");
    assert_eq!(records[3].global_sequence, Some(12));

    let json = serde_json::to_value(&records[0]).unwrap();
    assert_eq!(json["type"], "normal");
}

#[test]
fn import_into_another_class_recreates_modules() {
    let (mut book, class_id) = sample_book();
    let year_id = book.class(class_id).unwrap().academic_year_id.unwrap();
    let other = book.add_class(
        ClassGroup::new(0, "CP2", TrackKind::Professional, Periodization::Annual).in_year(year_id),
    );
    ensure_basic_periods(&mut book, other).unwrap();

    let file = NamedTempFile::new().unwrap();
    assert_eq!(export_lessons_to_json(&book, class_id, None, file.path()).unwrap(), 4);
    let counts = import_lessons_from_json(&mut book, other, file.path()).unwrap();
    assert_eq!((counts.created, counts.updated, counts.ignored), (4, 0, 0));

    let names: Vec<String> = book.class_modules(other).iter().map(|m| m.name.clone()).collect();
    assert_eq!(names, vec!["Programação".to_string(), "Redes".to_string()]);
    let codes: Vec<String> = book.active_lessons(other).iter().map(|l| l.joined_codes()).collect();
    assert_eq!(codes, vec!["1,2,3", "4,5,6", "7,8,9", "10,11,12"]);

    let counts = import_lessons_from_json(&mut book, other, file.path()).unwrap();
    assert_eq!((counts.created, counts.updated), (0, 4));
    assert_eq!(book.active_lessons(other).len(), 4);
}

#[test]
fn partial_special_lesson_keeps_its_slots_through_export_and_import() {
    let (mut book, class_id) = sample_book();
    let strike = book.active_lessons_on(class_id, d(2025, 9, 22))[0].id;
    let lesson = book.lessons.get_mut(&strike).unwrap();
    lesson.lesson_type = LessonType::Strike;
    lesson.non_lesson_count = Some(1);
    renumber(&mut book, class_id, None).unwrap();
    assert_eq!(book.lessons[&strike].summary_codes.len(), 2);

    let records = export_lessons(&book, class_id, None);
    let counts = import_lessons(&mut book, class_id, &records).unwrap();
    assert_eq!((counts.created, counts.updated), (0, 4));

    let lesson = &book.lessons[&strike];
    assert_eq!(lesson.slots, 3);
    assert_eq!(lesson.non_lesson_count, Some(1));
    assert_eq!(lesson.summary_codes.len(), 2);
    let redes: u32 = book
        .active_lessons(class_id)
        .iter()
        .filter(|l| l.module_id == Some(2))
        .map(|l| l.net_slots(&LessonType::DEFAULT_SPECIAL))
        .sum();
    assert_eq!(redes, 5);
}

#[test]
fn import_accepts_pt_dates_and_skips_bad_rows() {
    let (mut book, class_id) = sample_book();
    let records = vec![
        LessonRecord {
            date: "06/10/2025".into(),
            summary_codes: "13, 14".into(),
            lesson_type: "greve".into(),
            module_name: Some("Redes".into()),
            ..LessonRecord::default()
        },
        LessonRecord {
            date: "sometime".into(),
            ..LessonRecord::default()
        },
    ];
    let counts = import_lessons(&mut book, class_id, &records).unwrap();
    assert_eq!((counts.created, counts.ignored), (1, 1));

    let imported = book.active_lessons_on(class_id, d(2025, 10, 6))[0];
    assert_eq!(imported.lesson_type, LessonType::Strike);
    assert_eq!(imported.slots, 2);
    assert!(imported.summary_codes.is_empty());
}

#[test]
fn import_outside_every_period_uses_a_catch_all() {
    let (mut book, class_id) = sample_book();
    let records = vec![LessonRecord {
        date: "2026-07-10".into(),
        summary_codes: "13".into(),
        lesson_type: "normal".into(),
        ..LessonRecord::default()
    }];
    import_lessons(&mut book, class_id, &records).unwrap();

    let lesson = book.active_lessons_on(class_id, d(2026, 7, 10))[0];
    let period = &book.periods[&lesson.period_id];
    assert_eq!(period.name, "Imported");
    assert!(period.contains(d(2026, 7, 10)));
    let file = NamedTempFile::new().unwrap();
    save_book_to_json(&book, file.path()).unwrap();
}

#[test]
fn summary_csv_has_bom_and_skips_special_lessons() {
    let (mut book, class_id) = sample_book();
    let second = book.active_lessons(class_id)[1].id;
    retype_lesson(&mut book, second, LessonType::Strike).unwrap();

    let dir = tempdir().unwrap();
    let path = dir.path().join("sumarios.csv");
    let written = export_summaries_to_csv(&book, class_id, None, &path).unwrap();
    assert_eq!(written, book.active_lessons(class_id).len() - 1);

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.starts_with('\u{feff}'));
    let mut lines = content.trim_start_matches('\u{feff}').lines();
    assert_eq!(lines.next(), Some("DATA;MÓDULO;N.º Sumário;Sumário"));
    assert_eq!(lines.next(), Some("15/09/2025;Programação;1,2,3;\"Apresentação; regras\""));
    assert!(!content.contains("17/09/2025"));
}

#[test]
fn config_loads_from_toml_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("calendar.toml");
    fs::write(
        &path,
        "special_types = [\"strike\"]\ngeneral_module_name = \"Geral\"\ndefault_tolerance = 0\n",
    )
    .unwrap();
    let config = EngineConfig::from_file(&path).unwrap();
    assert_eq!(config.special_types, vec![LessonType::Strike]);
    assert_eq!(config.general_module_name, "Geral");
    assert_eq!(config.default_tolerance, 0);

    assert!(matches!(
        EngineConfig::from_file(dir.path().join("missing.toml")),
        Err(PersistenceError::Io(_))
    ));
}

#[cfg(feature = "sqlite")]
mod sqlite {
    use super::*;
    use lesson_calendar::{CalendarStore, SqliteCalendarStore};

    #[test]
    fn empty_store_has_no_book() {
        let store = SqliteCalendarStore::in_memory().unwrap();
        assert!(store.load_book().unwrap().is_none());
    }

    #[test]
    fn sqlite_store_round_trip() {
        let file = NamedTempFile::new().unwrap();
        let store = SqliteCalendarStore::new(file.path()).unwrap();
        let (mut book, _) = sample_book();
        book.set_config(EngineConfig {
            general_module_name: "Geral".into(),
            ..EngineConfig::default()
        });

        store.save_book(&book).unwrap();
        let loaded = store.load_book().unwrap().expect("book stored");
        assert_eq!(loaded, book);

        let reopened = SqliteCalendarStore::new(file.path()).unwrap();
        assert_eq!(reopened.load_book().unwrap().expect("book stored"), book);
    }

    #[test]
    fn saving_replaces_previous_rows() {
        let store = SqliteCalendarStore::in_memory().unwrap();
        let (mut book, class_id) = sample_book();
        store.save_book(&book).unwrap();

        let ids = book.active_lesson_ids(class_id);
        book.purge_lessons(&ids);
        store.save_book(&book).unwrap();
        let loaded = store.load_book().unwrap().expect("book stored");
        assert!(loaded.lessons.is_empty());
        assert!(loaded.student_records.is_empty());
    }

    #[test]
    fn invalid_book_is_not_saved() {
        let store = SqliteCalendarStore::in_memory().unwrap();
        let (mut book, class_id) = sample_book();
        book.add_lesson(ScheduledLesson::new(0, class_id, 42, None, d(2025, 9, 16)));
        assert!(matches!(store.save_book(&book), Err(PersistenceError::InvalidData(_))));
        assert!(store.load_book().unwrap().is_none());
    }
}

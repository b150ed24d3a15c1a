use chrono::NaiveDate;
use lesson_calendar::operations::{LessonEdit, edit_lesson, ensure_basic_periods, retype_lesson};
use lesson_calendar::{
    AcademicYear, CalendarBook, CalendarError, ClassGroup, LessonType, Module, Periodization,
    ScheduledLesson, TrackKind, generate_calendar, renumber,
};

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn generated_book() -> (CalendarBook, i32) {
    let mut book = CalendarBook::new();
    let year_id = book.add_year(AcademicYear::new(0, "2025/2026", d(2025, 9, 15), d(2026, 6, 30)));
    let class_id = book.add_class(
        ClassGroup::new(0, "10A", TrackKind::Standard, Periodization::Annual)
            .in_year(year_id)
            .with_load(0, 3.0)
            .with_load(2, 3.0),
    );
    ensure_basic_periods(&mut book, class_id).unwrap();
    book.add_module(Module::new(0, class_id, "M1", 9));
    book.add_module(Module::new(0, class_id, "M2", 9));
    generate_calendar(&mut book, class_id, true).unwrap();
    (book, class_id)
}

#[test]
fn renumbering_twice_changes_nothing() {
    let (mut book, class_id) = generated_book();
    let first = renumber(&mut book, class_id, None).unwrap();
    assert!(first.is_empty());
    let snapshot = book.clone();

    let second = renumber(&mut book, class_id, None).unwrap();
    assert_eq!(second.renumbered, 0);
    assert_eq!(book, snapshot);
}

#[test]
fn strike_lesson_delivers_nothing() {
    let (mut book, class_id) = generated_book();
    let second = book.active_lessons(class_id)[1].id;

    retype_lesson(&mut book, second, LessonType::Strike).unwrap();

    let lessons = book.active_lessons(class_id);
    assert!(lessons[1].summary_codes.is_empty());
    assert_eq!(lessons[1].non_lesson_count, Some(3));
    assert_eq!(lessons[1].slots, 3);
    assert_eq!(lessons[1].module_sequence, Some(3));
    assert_eq!(lessons[2].summary_codes, vec![4, 5, 6]);
    assert_eq!(lessons[2].module_sequence, Some(6));
}

#[test]
fn partial_non_lesson_count_keeps_some_slots() {
    let (mut book, class_id) = generated_book();
    let second = book.active_lessons(class_id)[1].id;

    edit_lesson(
        &mut book,
        second,
        LessonEdit {
            lesson_type: Some(LessonType::OfficialDuty),
            non_lesson_count: Some(Some(1)),
            ..LessonEdit::default()
        },
    )
    .unwrap();

    let lessons = book.active_lessons(class_id);
    assert_eq!(lessons[1].summary_codes, vec![4, 5]);
    assert_eq!(lessons[1].non_lesson_count, Some(1));
    assert_eq!(lessons[2].summary_codes, vec![6, 7, 8]);
}

#[test]
fn oversized_non_lesson_count_is_clamped() {
    let (mut book, class_id) = generated_book();
    let first = book.active_lessons(class_id)[0].id;
    edit_lesson(
        &mut book,
        first,
        LessonEdit {
            lesson_type: Some(LessonType::Other),
            non_lesson_count: Some(Some(7)),
            ..LessonEdit::default()
        },
    )
    .unwrap();

    let lesson = &book.lessons[&first];
    assert_eq!(lesson.slots, 7);
    assert!(lesson.summary_codes.is_empty());
    assert_eq!(lesson.non_lesson_count, Some(7));
}

#[test]
fn custom_special_types_override_the_configured_ones() {
    let (mut book, class_id) = generated_book();
    let first = book.active_lessons(class_id)[0].id;
    book.lessons.get_mut(&first).unwrap().lesson_type = LessonType::Strike;

    renumber(&mut book, class_id, Some(&[LessonType::Other])).unwrap();
    assert_eq!(book.lessons[&first].summary_codes, vec![1, 2, 3]);

    renumber(&mut book, class_id, None).unwrap();
    assert!(book.lessons[&first].summary_codes.is_empty());
}

#[test]
fn lessons_without_module_share_one_counter() {
    let mut book = CalendarBook::new();
    let year_id = book.add_year(AcademicYear::new(0, "2025/2026", d(2025, 9, 15), d(2026, 6, 30)));
    let class_id = book.add_class(
        ClassGroup::new(0, "10B", TrackKind::Standard, Periodization::Annual).in_year(year_id),
    );
    let period_id = ensure_basic_periods(&mut book, class_id).unwrap()[0];
    for day in [17, 15, 16] {
        let mut lesson = ScheduledLesson::new(0, class_id, period_id, None, d(2025, 9, day));
        lesson.slots = 2;
        book.add_lesson(lesson);
    }

    renumber(&mut book, class_id, None).unwrap();
    let lessons = book.active_lessons(class_id);
    assert_eq!(lessons[0].date, d(2025, 9, 15));
    assert_eq!(lessons[0].summary_codes, vec![1, 2]);
    assert_eq!(lessons[2].summary_codes, vec![5, 6]);
    assert_eq!(lessons[2].module_sequence, Some(6));
}

#[test]
fn closed_year_cannot_be_renumbered() {
    let (mut book, class_id) = generated_book();
    let year_id = book.class(class_id).unwrap().academic_year_id.unwrap();
    book.years.get_mut(&year_id).unwrap().closed = true;
    let err = renumber(&mut book, class_id, None).unwrap_err();
    assert!(matches!(err, CalendarError::ClosedYear { .. }));
}

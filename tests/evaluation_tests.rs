use chrono::NaiveDate;
use lesson_calendar::{
    CalendarBook, ClassGroup, EvaluationFilter, Periodization, ScheduledLesson, StudentLessonRecord, TrackKind,
    aggregate_evaluations,
};

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

const ANA: i32 = 101;
const BRUNO: i32 = 102;
const CARLA: i32 = 103;

fn book_with_records() -> (CalendarBook, i32) {
    let mut book = CalendarBook::new();
    let class_id = book.add_class(ClassGroup::new(0, "10A", TrackKind::Standard, Periodization::Annual));

    let mut regular = ScheduledLesson::new(0, class_id, 1, None, d(2025, 9, 15));
    regular.slots = 2;
    let regular_id = book.add_lesson(regular);

    let mut activity = ScheduledLesson::new(0, class_id, 1, None, d(2025, 9, 17));
    activity.slots = 2;
    activity.activity = true;
    activity.activity_name = Some("Teste prático".into());
    let activity_id = book.add_lesson(activity);

    book.add_student_record(StudentLessonRecord::new(0, regular_id, ANA).with_rubric([5, 5, 5, 5, 5]));
    let mut absent = StudentLessonRecord::new(0, regular_id, BRUNO).with_rubric([4, 4, 4, 4, 4]);
    absent.absent_slots = 2;
    book.add_student_record(absent);
    let mut incident = StudentLessonRecord::new(0, regular_id, CARLA).with_rubric([5, 5, 5, 5, 5]);
    incident.disciplinary_incident = true;
    book.add_student_record(incident);

    let mut scored = StudentLessonRecord::new(0, activity_id, ANA);
    scored.activity_score = Some(4);
    scored.responsibility = Some(5);
    book.add_student_record(scored);
    let mut missed = StudentLessonRecord::new(0, activity_id, BRUNO);
    missed.absent_slots = 2;
    missed.activity_score = Some(5);
    book.add_student_record(missed);
    let mut partial = StudentLessonRecord::new(0, activity_id, CARLA).with_rubric([2, 2, 2, 2, 2]);
    partial.absent_slots = 1;
    book.add_student_record(partial);

    (book, class_id)
}

#[test]
fn daily_scores_average_the_rubric() {
    let (book, class_id) = book_with_records();
    let report = aggregate_evaluations(&book, class_id, &[ANA, BRUNO, CARLA], &EvaluationFilter::default());

    assert_eq!(report.daily_score(ANA, d(2025, 9, 15)), Some(5.0));
    assert_eq!(report.daily_score(BRUNO, d(2025, 9, 15)), None);
    assert_eq!(report.daily_score(CARLA, d(2025, 9, 15)), Some(1.0));
    // Unscored criteria count as 3.
    assert_eq!(report.daily_score(ANA, d(2025, 9, 17)), Some(3.4));
    assert_eq!(report.daily_score(CARLA, d(2025, 9, 17)), Some(2.0));
}

#[test]
fn activity_scores_zero_out_full_absence() {
    let (book, class_id) = book_with_records();
    let report = aggregate_evaluations(&book, class_id, &[ANA, BRUNO, CARLA], &EvaluationFilter::default());

    assert_eq!(report.activity_score(ANA, d(2025, 9, 17)), Some(4));
    assert_eq!(report.activity_score(BRUNO, d(2025, 9, 17)), Some(0));
    assert_eq!(report.activity_score(CARLA, d(2025, 9, 17)), None);
    assert_eq!(report.activity_score(ANA, d(2025, 9, 15)), None);
}

#[test]
fn filter_and_student_list_limit_the_report() {
    let (mut book, class_id) = book_with_records();
    let filter = EvaluationFilter {
        from: Some(d(2025, 9, 16)),
        ..EvaluationFilter::default()
    };
    let report = aggregate_evaluations(&book, class_id, &[ANA], &filter);
    assert_eq!(report.daily.len(), 1);
    assert_eq!(report.daily[&ANA].len(), 1);
    assert!(report.daily_score(CARLA, d(2025, 9, 17)).is_none());

    let activity = book.active_lessons(class_id)[1].id;
    book.soft_delete_lesson(activity);
    let report = aggregate_evaluations(&book, class_id, &[ANA], &filter);
    assert!(report.daily.is_empty());
    assert!(report.activities.is_empty());
}

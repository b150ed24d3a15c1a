use crate::book::CalendarBook;
use crate::lesson::ScheduledLesson;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub period_id: Option<i32>,
    pub module_id: Option<i32>,
}

impl EvaluationFilter {
    fn accepts(&self, lesson: &ScheduledLesson) -> bool {
        self.from.is_none_or(|from| lesson.date >= from)
            && self.to.is_none_or(|to| lesson.date <= to)
            && self.period_id.is_none_or(|id| lesson.period_id == id)
            && self.module_id.is_none_or(|id| lesson.module_id == Some(id))
    }
}

/// Per-student scores keyed by date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationReport {
    /// Mean rubric score per day, 1.0 to 5.0.
    pub daily: BTreeMap<i32, BTreeMap<NaiveDate, f64>>,
    /// Activity score per activity-lesson date.
    pub activities: BTreeMap<i32, BTreeMap<NaiveDate, u8>>,
}

impl EvaluationReport {
    pub fn daily_score(&self, student_id: i32, date: NaiveDate) -> Option<f64> {
        self.daily.get(&student_id).and_then(|days| days.get(&date)).copied()
    }

    pub fn activity_score(&self, student_id: i32, date: NaiveDate) -> Option<u8> {
        self.activities.get(&student_id).and_then(|days| days.get(&date)).copied()
    }
}

/// Daily rubric averages and activity scores for the given students.
///
/// A student absent for every slot of a lesson gets no score from it (and 0
/// for an activity). A disciplinary incident forces the lesson score to 1.
pub fn aggregate_evaluations(
    book: &CalendarBook,
    class_id: i32,
    students: &[i32],
    filter: &EvaluationFilter,
) -> EvaluationReport {
    let wanted: HashSet<i32> = students.iter().copied().collect();
    let mut sums: BTreeMap<i32, BTreeMap<NaiveDate, (f64, u32)>> = BTreeMap::new();
    let mut report = EvaluationReport::default();

    for lesson in book.active_lessons(class_id) {
        if !filter.accepts(lesson) {
            continue;
        }
        let total = lesson.total_slots();
        for record in book.records_for_lesson(lesson.id) {
            if !wanted.contains(&record.student_id) {
                continue;
            }
            let fully_absent = record.absent_slots >= total;

            if lesson.activity {
                let score = if fully_absent { Some(0) } else { record.activity_score };
                if let Some(score) = score {
                    report
                        .activities
                        .entry(record.student_id)
                        .or_default()
                        .insert(lesson.date, score);
                }
            }

            if fully_absent {
                continue;
            }
            let score = if record.disciplinary_incident {
                1.0
            } else {
                record.rubric_average()
            };
            let entry = sums
                .entry(record.student_id)
                .or_default()
                .entry(lesson.date)
                .or_insert((0.0, 0));
            entry.0 += score;
            entry.1 += 1;
        }
    }

    for (student_id, days) in sums {
        let averages = days
            .into_iter()
            .map(|(date, (sum, count))| (date, sum / f64::from(count)))
            .collect();
        report.daily.insert(student_id, averages);
    }
    report
}

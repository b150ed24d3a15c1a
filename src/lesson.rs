use crate::calendar::weekday_index;
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonType {
    Normal,
    Extra,
    Strike,
    OfficialDuty,
    TeacherAbsence,
    Other,
    UnfilledSummary,
}

impl LessonType {
    /// Types whose slots may be partly or fully non-lesson slots.
    pub const DEFAULT_SPECIAL: [LessonType; 5] = [
        LessonType::Strike,
        LessonType::OfficialDuty,
        LessonType::TeacherAbsence,
        LessonType::Other,
        LessonType::UnfilledSummary,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LessonType::Normal => "normal",
            LessonType::Extra => "extra",
            LessonType::Strike => "strike",
            LessonType::OfficialDuty => "official_duty",
            LessonType::TeacherAbsence => "teacher_absence",
            LessonType::Other => "other",
            LessonType::UnfilledSummary => "unfilled_summary",
        }
    }

    /// Accepts the English names and the PT labels used in school exports.
    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "normal" => Some(LessonType::Normal),
            "extra" => Some(LessonType::Extra),
            "strike" | "greve" => Some(LessonType::Strike),
            "official_duty" | "servico_oficial" => Some(LessonType::OfficialDuty),
            "teacher_absence" | "faltei" => Some(LessonType::TeacherAbsence),
            "other" | "outros" => Some(LessonType::Other),
            "unfilled_summary" | "sem_sumario" => Some(LessonType::UnfilledSummary),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonState {
    #[default]
    Active,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledLesson {
    pub id: i32,
    pub class_id: i32,
    pub period_id: i32,
    pub module_id: Option<i32>,
    pub date: NaiveDate,
    /// 0 = Monday.
    pub weekday: u8,
    /// Lesson slots held on this day, including non-lesson ones.
    pub slots: u32,
    /// Global sequence numbers delivered on this day.
    #[serde(default)]
    pub summary_codes: Vec<u32>,
    pub module_sequence: Option<u32>,
    pub global_sequence: Option<u32>,
    pub lesson_type: LessonType,
    pub non_lesson_count: Option<u32>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub forecast: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub activity: bool,
    #[serde(default)]
    pub activity_name: Option<String>,
    #[serde(default)]
    pub state: LessonState,
}

impl ScheduledLesson {
    pub fn new(id: i32, class_id: i32, period_id: i32, module_id: Option<i32>, date: NaiveDate) -> Self {
        Self {
            id,
            class_id,
            period_id,
            module_id,
            date,
            weekday: weekday_index(date),
            slots: 1,
            summary_codes: Vec::new(),
            module_sequence: None,
            global_sequence: None,
            lesson_type: LessonType::Normal,
            non_lesson_count: None,
            summary: None,
            forecast: None,
            notes: None,
            activity: false,
            activity_name: None,
            state: LessonState::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == LessonState::Active
    }

    pub fn move_to(&mut self, date: NaiveDate, period_id: i32) {
        self.date = date;
        self.weekday = weekday_index(date);
        self.period_id = period_id;
    }

    pub fn has_summary(&self) -> bool {
        self.summary.as_deref().is_some_and(|s| !s.trim().is_empty())
    }

    pub fn is_special(&self, special: &[LessonType]) -> bool {
        special.contains(&self.lesson_type)
    }

    /// Slots this lesson occupies on its day. Never less than 1.
    pub fn total_slots(&self) -> u32 {
        self.slots
            .max(self.summary_codes.len() as u32)
            .max(self.non_lesson_count.unwrap_or(0))
            .max(1)
    }

    /// Non-lesson slots after clamping. Special lessons with no recorded
    /// count are fully non-lesson.
    pub fn effective_non_lesson(&self, special: &[LessonType]) -> u32 {
        let total = self.total_slots();
        if self.is_special(special) {
            self.non_lesson_count.unwrap_or(total).min(total)
        } else {
            self.non_lesson_count.unwrap_or(0).min(total)
        }
    }

    /// Slots that count towards the module quota.
    pub fn net_slots(&self, special: &[LessonType]) -> u32 {
        if self.is_special(special) {
            self.total_slots() - self.effective_non_lesson(special)
        } else {
            self.total_slots()
        }
    }

    pub fn joined_codes(&self) -> String {
        self.summary_codes
            .iter()
            .map(|code| code.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// One student's record for one lesson.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentLessonRecord {
    pub id: i32,
    pub lesson_id: i32,
    pub student_id: i32,
    #[serde(default)]
    pub late: bool,
    #[serde(default)]
    pub absent_slots: u32,
    pub responsibility: Option<u8>,
    pub behaviour: Option<u8>,
    pub participation: Option<u8>,
    pub autonomous_work: Option<u8>,
    pub materials: Option<u8>,
    #[serde(default)]
    pub activity_score: Option<u8>,
    #[serde(default)]
    pub disciplinary_incident: bool,
}

impl StudentLessonRecord {
    pub fn new(id: i32, lesson_id: i32, student_id: i32) -> Self {
        Self {
            id,
            lesson_id,
            student_id,
            late: false,
            absent_slots: 0,
            responsibility: None,
            behaviour: None,
            participation: None,
            autonomous_work: None,
            materials: None,
            activity_score: None,
            disciplinary_incident: false,
        }
    }

    pub fn with_rubric(mut self, scores: [u8; 5]) -> Self {
        let [responsibility, behaviour, participation, autonomous_work, materials] = scores;
        self.responsibility = Some(responsibility);
        self.behaviour = Some(behaviour);
        self.participation = Some(participation);
        self.autonomous_work = Some(autonomous_work);
        self.materials = Some(materials);
        self
    }

    /// Mean of the recorded rubric scores (missing scores count as 3).
    pub fn rubric_average(&self) -> f64 {
        let scores = [
            self.responsibility,
            self.behaviour,
            self.participation,
            self.autonomous_work,
            self.materials,
        ];
        let sum: u32 = scores.iter().map(|s| u32::from(s.unwrap_or(3).clamp(1, 5))).sum();
        f64::from(sum) / scores.len() as f64
    }
}

/// Tabular view of lessons, one row per lesson, in the given order.
pub fn lessons_to_dataframe(lessons: &[&ScheduledLesson], module_names: &dyn Fn(Option<i32>) -> String) -> PolarsResult<DataFrame> {
    let ids: Vec<i32> = lessons.iter().map(|l| l.id).collect();
    let dates: Vec<i32> = lessons.iter().map(|l| date_to_days(l.date)).collect();
    let weekdays: Vec<u32> = lessons.iter().map(|l| u32::from(l.weekday)).collect();
    let modules: Vec<String> = lessons.iter().map(|l| module_names(l.module_id)).collect();
    let module_seq: Vec<Option<u32>> = lessons.iter().map(|l| l.module_sequence).collect();
    let global_seq: Vec<Option<u32>> = lessons.iter().map(|l| l.global_sequence).collect();
    let codes: Vec<String> = lessons.iter().map(|l| l.joined_codes()).collect();
    let types: Vec<&str> = lessons.iter().map(|l| l.lesson_type.as_str()).collect();
    let non_lesson: Vec<Option<u32>> = lessons.iter().map(|l| l.non_lesson_count).collect();
    let summaries: Vec<Option<&str>> = lessons.iter().map(|l| l.summary.as_deref()).collect();

    let columns: Vec<Column> = vec![
        Series::new(PlSmallStr::from_static("id"), ids).into_column(),
        Series::new(PlSmallStr::from_static("date"), dates)
            .cast(&DataType::Date)?
            .into_column(),
        Series::new(PlSmallStr::from_static("weekday"), weekdays).into_column(),
        Series::new(PlSmallStr::from_static("module"), modules).into_column(),
        Series::new(PlSmallStr::from_static("module_seq"), module_seq).into_column(),
        Series::new(PlSmallStr::from_static("global_seq"), global_seq).into_column(),
        Series::new(PlSmallStr::from_static("codes"), codes).into_column(),
        Series::new(PlSmallStr::from_static("type"), types).into_column(),
        Series::new(PlSmallStr::from_static("non_lesson"), non_lesson).into_column(),
        Series::new(PlSmallStr::from_static("summary"), summaries).into_column(),
    ];
    DataFrame::new(columns)
}

/// Days since the Unix epoch, the physical representation of a polars `Date`.
fn date_to_days(date: NaiveDate) -> i32 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    (date - epoch).num_days() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn special_lesson_without_count_is_fully_non_lesson() {
        let mut lesson = ScheduledLesson::new(1, 1, 1, Some(1), d(2025, 9, 15));
        lesson.slots = 3;
        lesson.lesson_type = LessonType::Strike;
        assert_eq!(lesson.net_slots(&LessonType::DEFAULT_SPECIAL), 0);

        lesson.non_lesson_count = Some(1);
        assert_eq!(lesson.net_slots(&LessonType::DEFAULT_SPECIAL), 2);
    }

    #[test]
    fn normal_lesson_ignores_non_lesson_count_for_net() {
        let mut lesson = ScheduledLesson::new(1, 1, 1, Some(1), d(2025, 9, 15));
        lesson.summary_codes = vec![4, 5];
        lesson.non_lesson_count = Some(1);
        assert_eq!(lesson.total_slots(), 2);
        assert_eq!(lesson.net_slots(&LessonType::DEFAULT_SPECIAL), 2);
    }

    #[test]
    fn lesson_types_accept_pt_labels() {
        assert_eq!(LessonType::from_str("greve"), Some(LessonType::Strike));
        assert_eq!(LessonType::from_str("Faltei"), Some(LessonType::TeacherAbsence));
        assert_eq!(LessonType::from_str("holiday"), None);
    }

    #[test]
    fn lessons_frame_has_one_row_per_lesson() {
        let a = ScheduledLesson::new(1, 1, 1, Some(1), d(2025, 9, 15));
        let b = ScheduledLesson::new(2, 1, 1, None, d(2025, 9, 17));
        let df = lessons_to_dataframe(&[&a, &b], &|id| format!("{id:?}")).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.column("date").unwrap().dtype(), &DataType::Date);
    }
}

use crate::class_group::{Periodization, TrackKind};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodKind {
    Annual,
    Semester1,
    Semester2,
    Modular,
}

impl PeriodKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodKind::Annual => "annual",
            PeriodKind::Semester1 => "semester1",
            PeriodKind::Semester2 => "semester2",
            PeriodKind::Modular => "modular",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "annual" | "anual" => Some(PeriodKind::Annual),
            "semester1" | "semestre1" => Some(PeriodKind::Semester1),
            "semester2" | "semestre2" => Some(PeriodKind::Semester2),
            "modular" => Some(PeriodKind::Modular),
            _ => None,
        }
    }

    /// Period kinds the generator walks for a class.
    ///
    /// Standard-track classes have no module-dedicated periods, so a modular
    /// periodization falls back to the annual period.
    pub fn applicable(track: TrackKind, periodization: Periodization) -> &'static [PeriodKind] {
        match (periodization, track) {
            (Periodization::Annual, _) => &[PeriodKind::Annual],
            (Periodization::Semester, _) => &[PeriodKind::Semester1, PeriodKind::Semester2],
            (Periodization::Modular, TrackKind::Professional) => &[PeriodKind::Modular],
            (Periodization::Modular, TrackKind::Standard) => &[PeriodKind::Annual],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Period {
    pub id: i32,
    pub class_id: i32,
    pub name: String,
    pub kind: PeriodKind,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Module this period is dedicated to, if any.
    #[serde(default)]
    pub module_id: Option<i32>,
}

impl Period {
    pub fn new(
        id: i32,
        class_id: i32,
        name: impl Into<String>,
        kind: PeriodKind,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        Self {
            id,
            class_id,
            name: name.into(),
            kind,
            start_date,
            end_date,
            module_id: None,
        }
    }

    pub fn for_module(mut self, module_id: i32) -> Self {
        self.module_id = Some(module_id);
        self
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub id: i32,
    pub class_id: i32,
    pub name: String,
    /// Lessons to deliver. 0 means unlimited.
    pub target_lessons: u32,
    /// Stored and round-tripped; neither generation nor repair applies it.
    #[serde(default)]
    pub tolerance: u32,
}

impl Module {
    pub fn new(id: i32, class_id: i32, name: impl Into<String>, target_lessons: u32) -> Self {
        Self {
            id,
            class_id,
            name: name.into(),
            target_lessons,
            tolerance: 0,
        }
    }

    pub fn is_unlimited(&self) -> bool {
        self.target_lessons == 0
    }

    pub fn is_exhausted(&self, delivered: u32) -> bool {
        !self.is_unlimited() && delivered >= self.target_lessons
    }
}

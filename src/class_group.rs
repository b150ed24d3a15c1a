use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    Standard,
    /// Strict per-module quotas; deficits are backfilled.
    Professional,
}

impl TrackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackKind::Standard => "standard",
            TrackKind::Professional => "professional",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "standard" | "regular" => Some(TrackKind::Standard),
            "professional" | "profissional" => Some(TrackKind::Professional),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Periodization {
    Annual,
    Semester,
    Modular,
}

impl Periodization {
    pub fn as_str(&self) -> &'static str {
        match self {
            Periodization::Annual => "annual",
            Periodization::Semester => "semester",
            Periodization::Modular => "modular",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "annual" | "anual" => Some(Periodization::Annual),
            "semester" | "semestral" => Some(Periodization::Semester),
            "modular" => Some(Periodization::Modular),
            _ => None,
        }
    }
}

/// One timetable cell: `hours` lessons on `weekday` (0 = Monday).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimetableEntry {
    pub weekday: u8,
    pub hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassGroup {
    pub id: i32,
    pub name: String,
    pub academic_year_id: Option<i32>,
    pub track: TrackKind,
    pub periodization: Periodization,
    /// Explicit lessons per weekday, Monday..Friday.
    #[serde(default)]
    pub weekday_load: [Option<f64>; 5],
    /// Timetable slot index per weekday. Display ordering only.
    #[serde(default)]
    pub weekday_tempo: [Option<u8>; 5],
    #[serde(default)]
    pub timetable: Vec<TimetableEntry>,
}

impl ClassGroup {
    pub fn new(id: i32, name: impl Into<String>, track: TrackKind, periodization: Periodization) -> Self {
        Self {
            id,
            name: name.into(),
            academic_year_id: None,
            track,
            periodization,
            weekday_load: [None; 5],
            weekday_tempo: [None; 5],
            timetable: Vec::new(),
        }
    }

    pub fn in_year(mut self, academic_year_id: i32) -> Self {
        self.academic_year_id = Some(academic_year_id);
        self
    }

    /// Sets the explicit load for one weekday (0 = Monday). Weekends are ignored.
    pub fn with_load(mut self, weekday: u8, lessons: f64) -> Self {
        if let Some(slot) = self.weekday_load.get_mut(weekday as usize) {
            *slot = Some(lessons);
        }
        self
    }

    pub fn is_professional(&self) -> bool {
        self.track == TrackKind::Professional
    }
}

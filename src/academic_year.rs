use crate::calendar::days_inclusive;
use crate::date_text::{DateExpressionError, expand_dates};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcademicYear {
    pub id: i32,
    /// Label such as "2025/2026".
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub first_semester_end: Option<NaiveDate>,
    pub second_semester_start: Option<NaiveDate>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub closed: bool,
}

impl AcademicYear {
    pub fn new(id: i32, name: impl Into<String>, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            id,
            name: name.into(),
            start_date,
            end_date,
            first_semester_end: None,
            second_semester_start: None,
            description: None,
            active: false,
            closed: false,
        }
    }

    pub fn with_semesters(mut self, first_end: NaiveDate, second_start: NaiveDate) -> Self {
        self.first_semester_end = Some(first_end);
        self.second_semester_start = Some(second_start);
        self
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }

    /// Calendar years touched by this academic year, in order.
    pub fn calendar_years(&self) -> impl Iterator<Item = i32> {
        self.start_date.year()..=self.end_date.year()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holiday {
    pub id: i32,
    pub academic_year_id: i32,
    pub name: String,
    pub date: Option<NaiveDate>,
    /// Free-text PT expression, used when `date` is empty.
    #[serde(default)]
    pub date_text: Option<String>,
}

impl Holiday {
    pub fn on(id: i32, academic_year_id: i32, name: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            id,
            academic_year_id,
            name: name.into(),
            date: Some(date),
            date_text: None,
        }
    }

    pub fn days(&self) -> Result<Vec<NaiveDate>, DateExpressionError> {
        match self.date {
            Some(date) => Ok(vec![date]),
            None => expand_dates(None, self.date_text.as_deref()),
        }
    }
}

/// A break in lessons: Christmas, Carnival, Easter, or anything the school adds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interruption {
    pub id: i32,
    pub academic_year_id: i32,
    pub kind: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub date_text: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Interruption {
    pub fn between(
        id: i32,
        academic_year_id: i32,
        kind: impl Into<String>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Self {
        Self {
            id,
            academic_year_id,
            kind: kind.into(),
            start_date: Some(start),
            end_date: Some(end),
            date_text: None,
            description: None,
        }
    }

    pub fn from_text(id: i32, academic_year_id: i32, kind: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id,
            academic_year_id,
            kind: kind.into(),
            start_date: None,
            end_date: None,
            date_text: Some(text.into()),
            description: None,
        }
    }

    pub fn days(&self) -> Result<Vec<NaiveDate>, DateExpressionError> {
        let has_text = self
            .date_text
            .as_deref()
            .is_some_and(|text| !text.trim().is_empty());
        if has_text {
            return expand_dates(self.start_date, self.date_text.as_deref());
        }
        Ok(match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => days_inclusive(start, end).collect(),
            (Some(start), None) => vec![start],
            _ => Vec::new(),
        })
    }
}

use crate::academic_year::{AcademicYear, Holiday, Interruption};
use crate::date_text::DateExpressionError;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// 0 = Monday .. 6 = Sunday.
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_monday() as u8
}

/// Every date from `start` to `end`, both included. Empty when `start > end`.
pub fn days_inclusive(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |day| *day <= end)
}

/// Non-lesson-day index for one academic year.
///
/// Holds the year bounds, the holiday days and the interruption days
/// (Christmas, Carnival, Easter breaks...). Weekends are never lesson days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchoolCalendar {
    start: NaiveDate,
    end: NaiveDate,
    holidays: HashSet<NaiveDate>,
    interruptions: HashSet<NaiveDate>,
    non_working_days: HashSet<Weekday>,
}

impl SchoolCalendar {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        Self {
            start,
            end,
            holidays: HashSet::new(),
            interruptions: HashSet::new(),
            non_working_days: HashSet::from([Weekday::Sat, Weekday::Sun]),
        }
    }

    /// Builds the index from the year's holiday and interruption records.
    ///
    /// Interruptions: free text wins, then an explicit start..end range, then a
    /// lone start date. Holidays: the explicit date wins, else the free text
    /// (expanded without an anchor).
    pub fn for_year<'a, H, I>(
        year: &AcademicYear,
        holidays: H,
        interruptions: I,
    ) -> Result<Self, DateExpressionError>
    where
        H: IntoIterator<Item = &'a Holiday>,
        I: IntoIterator<Item = &'a Interruption>,
    {
        let mut calendar = Self::new(year.start_date, year.end_date);
        for interruption in interruptions {
            calendar.add_interruption_days(interruption.days()?);
        }
        for holiday in holidays {
            calendar.add_holidays(&holiday.days()?);
        }
        Ok(calendar)
    }

    pub fn interruption_days(&self) -> &HashSet<NaiveDate> {
        &self.interruptions
    }

    pub fn add_holidays(&mut self, dates: &[NaiveDate]) {
        self.holidays.extend(dates);
    }

    pub fn add_interruption_days<I: IntoIterator<Item = NaiveDate>>(&mut self, dates: I) {
        self.interruptions.extend(dates);
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Inside the year, on a weekday, and neither a holiday nor an interruption.
    pub fn is_lesson_day(&self, date: NaiveDate) -> bool {
        self.contains(date)
            && !self.non_working_days.contains(&date.weekday())
            && !self.holidays.contains(&date)
            && !self.interruptions.contains(&date)
    }

    /// Lesson days from `start` to `end`, both included, in order.
    pub fn lesson_days_in_range(&self, start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> + '_ {
        days_inclusive(start, end).filter(move |day| self.is_lesson_day(*day))
    }
}

/// Easter Sunday (Meeus/Jones/Butcher Gregorian algorithm).
pub fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = ((h + l - 7 * m + 114) % 31) + 1;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}

/// Portuguese national holidays for one calendar year, in date order.
pub fn national_holidays(year: i32) -> Vec<(&'static str, NaiveDate)> {
    let fixed = |month: u32, day: u32| NaiveDate::from_ymd_opt(year, month, day);
    let easter = easter_sunday(year);
    let movable = |offset: i64| easter.map(|e| e + Duration::days(offset));

    let candidates = [
        ("Ano Novo", fixed(1, 1)),
        ("Carnaval", movable(-47)),
        ("Sexta-feira Santa", movable(-2)),
        ("Dia da Liberdade", fixed(4, 25)),
        ("Dia do Trabalhador", fixed(5, 1)),
        ("Corpo de Deus", movable(60)),
        ("Dia de Portugal", fixed(6, 10)),
        ("Assunção de Nossa Senhora", fixed(8, 15)),
        ("Implantação da República", fixed(10, 5)),
        ("Todos os Santos", fixed(11, 1)),
        ("Restauração da Independência", fixed(12, 1)),
        ("Imaculada Conceição", fixed(12, 8)),
        ("Natal", fixed(12, 25)),
    ];

    let mut holidays: Vec<(&'static str, NaiveDate)> = candidates
        .into_iter()
        .filter_map(|(name, date)| date.map(|d| (name, d)))
        .collect();
    holidays.sort_by_key(|(_, date)| *date);
    holidays
}

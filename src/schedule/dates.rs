use chrono::{Datelike, Duration, Months, NaiveDate, Weekday};
use std::collections::HashSet;

use crate::errors::{LendingError, Result};
use crate::types::{FrequencyStep, PaymentFrequency};

/// bound on day-by-day rolling past excluded weekdays
pub const MAX_ROLL_ATTEMPTS: u32 = 30;

/// due date arithmetic: frequency steps, month-end clamping and excluded weekdays
pub struct DateRoller;

impl DateRoller {
    /// move `date` forward by one frequency step
    ///
    /// month steps clamp to the end of shorter months (jan 31 -> feb 29)
    pub fn advance(date: NaiveDate, frequency: PaymentFrequency) -> NaiveDate {
        match frequency.step() {
            FrequencyStep::Days(days) => date + Duration::days(days as i64),
            FrequencyStep::Months(months) => add_months_clamped(date, months, date.day()),
        }
    }

    /// next due date after `previous`
    ///
    /// month-based frequencies land on `original_day` of the target month
    /// (clamped) so a 31st does not creep to the 30th after a short month
    pub fn next_due_date(
        previous: NaiveDate,
        frequency: PaymentFrequency,
        original_day: Option<u32>,
    ) -> NaiveDate {
        match frequency.step() {
            FrequencyStep::Days(days) => previous + Duration::days(days as i64),
            FrequencyStep::Months(months) => {
                add_months_clamped(previous, months, original_day.unwrap_or_else(|| previous.day()))
            }
        }
    }

    /// roll forward one day at a time until the weekday is not excluded
    pub fn roll_for_excluded(date: NaiveDate, excluded: &HashSet<Weekday>) -> Result<NaiveDate> {
        if excluded.is_empty() {
            return Ok(date);
        }

        let mut candidate = date;
        for _ in 0..MAX_ROLL_ATTEMPTS {
            if !excluded.contains(&candidate.weekday()) {
                return Ok(candidate);
            }
            candidate = candidate + Duration::days(1);
        }

        Err(LendingError::DateRollExhausted {
            start: date,
            attempts: MAX_ROLL_ATTEMPTS,
        })
    }
}

/// iterator over the due dates of a schedule
///
/// month-based frequencies keep the first installment's day of month and step from the
/// previous nominal (unrolled) date so a roll across a month end never skips a
/// month; day-based frequencies step from the previous rolled date
pub struct DueDateSequence<'a> {
    frequency: PaymentFrequency,
    excluded: &'a HashSet<Weekday>,
    original_day: u32,
    nominal: NaiveDate,
    previous: Option<NaiveDate>,
}

impl<'a> DueDateSequence<'a> {
    pub fn new(
        anchor: NaiveDate,
        frequency: PaymentFrequency,
        excluded: &'a HashSet<Weekday>,
    ) -> Self {
        let first = DateRoller::advance(anchor, frequency);
        Self {
            frequency,
            excluded,
            original_day: first.day(),
            nominal: first,
            previous: None,
        }
    }
}

impl Iterator for DueDateSequence<'_> {
    type Item = Result<NaiveDate>;

    fn next(&mut self) -> Option<Self::Item> {
        let nominal = match self.previous {
            None => self.nominal,
            Some(_) if self.frequency.is_month_based() => {
                DateRoller::next_due_date(self.nominal, self.frequency, Some(self.original_day))
            }
            Some(previous) => DateRoller::next_due_date(previous, self.frequency, None),
        };
        self.nominal = nominal;

        let rolled = DateRoller::roll_for_excluded(nominal, self.excluded);
        if let Ok(date) = rolled {
            self.previous = Some(date);
        }
        Some(rolled)
    }
}

fn add_months_clamped(date: NaiveDate, months: u32, day: u32) -> NaiveDate {
    let first_of_month = date.with_day(1).unwrap_or(date);
    let target = first_of_month
        .checked_add_months(Months::new(months))
        .unwrap_or(NaiveDate::MAX);
    let day = day.min(days_in_month(target.year(), target.month()));
    target.with_day(day).unwrap_or(target)
}

/// number of days in `month` of `year`
pub fn days_in_month(year: i32, month: u32) -> u32 {
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first| first.checked_add_months(Months::new(1)))
        .and_then(|next| next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(31)
}

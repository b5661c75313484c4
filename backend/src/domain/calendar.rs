//! Calendar domain logic.
//!
//! Month-grid generation and date bucketing for the agenda view. The UI
//! only renders what this produces: leading padding cells for the first
//! weekday offset, then one cell per day carrying that day's events and
//! appointments.

use chrono::{Datelike, NaiveDate};
use log::info;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use shared::{
    Appointment, CalendarDay, CalendarDayType, CalendarFocusDate, CalendarMonth, SchoolEvent,
};

const MONTH_NAMES: [&str; 12] = [
    "Janeiro",
    "Fevereiro",
    "Março",
    "Abril",
    "Maio",
    "Junho",
    "Julho",
    "Agosto",
    "Setembro",
    "Outubro",
    "Novembro",
    "Dezembro",
];

/// Calendar service that handles month generation and navigation state.
#[derive(Clone)]
pub struct CalendarService {
    /// Current focus date for calendar navigation (month/year only).
    /// Kept in memory, never persisted.
    current_focus_date: Arc<Mutex<CalendarFocusDate>>,
}

impl CalendarService {
    pub fn new() -> Self {
        Self {
            current_focus_date: Arc::new(Mutex::new(CalendarFocusDate::default())),
        }
    }

    /// Generate a calendar month with events and appointments bucketed by
    /// day.
    pub fn generate_calendar_month(
        &self,
        month: u32,
        year: u32,
        events: &[SchoolEvent],
        appointments: &[Appointment],
    ) -> CalendarMonth {
        let days_in_month = self.days_in_month(month, year);
        let first_day = self.first_day_of_month(month, year);

        let events_by_day = self.group_events_by_day(month, year, events);
        let appointments_by_day = self.group_appointments_by_day(month, year, appointments);

        let mut calendar_days = Vec::new();

        for _ in 0..first_day {
            calendar_days.push(CalendarDay {
                day: 0,
                events: Vec::new(),
                appointments: Vec::new(),
                day_type: CalendarDayType::PaddingBefore,
            });
        }

        for day in 1..=days_in_month {
            calendar_days.push(CalendarDay {
                day,
                events: events_by_day.get(&day).cloned().unwrap_or_default(),
                appointments: appointments_by_day.get(&day).cloned().unwrap_or_default(),
                day_type: CalendarDayType::MonthDay,
            });
        }

        info!(
            "Generated calendar {}/{} with {} cells ({} padding)",
            month,
            year,
            calendar_days.len(),
            first_day
        );

        CalendarMonth {
            month,
            year,
            days: calendar_days,
            first_day_of_week: first_day,
        }
    }

    /// Get the number of days in a given month and year
    pub fn days_in_month(&self, month: u32, year: u32) -> u32 {
        match month {
            2 => {
                if self.is_leap_year(year) {
                    29
                } else {
                    28
                }
            }
            4 | 6 | 9 | 11 => 30,
            _ => 31,
        }
    }

    pub fn is_leap_year(&self, year: u32) -> bool {
        year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
    }

    /// Weekday of day 1 (0 = Sunday, 1 = Monday, etc.)
    pub fn first_day_of_month(&self, month: u32, year: u32) -> u32 {
        if let Some(date) = NaiveDate::from_ymd_opt(year as i32, month, 1) {
            date.weekday().num_days_from_sunday()
        } else {
            0
        }
    }

    pub fn month_name(&self, month: u32) -> &'static str {
        MONTH_NAMES
            .get(month.wrapping_sub(1) as usize)
            .copied()
            .unwrap_or("Mês Inválido")
    }

    fn group_events_by_day(
        &self,
        month: u32,
        year: u32,
        events: &[SchoolEvent],
    ) -> HashMap<u32, Vec<SchoolEvent>> {
        let mut by_day: HashMap<u32, Vec<SchoolEvent>> = HashMap::new();
        for day in 1..=self.days_in_month(month, year) {
            let date = cell_date(year, month, day);
            let matching: Vec<SchoolEvent> = events
                .iter()
                .filter(|e| e.date == date)
                .cloned()
                .collect();
            if !matching.is_empty() {
                by_day.insert(day, matching);
            }
        }
        by_day
    }

    fn group_appointments_by_day(
        &self,
        month: u32,
        year: u32,
        appointments: &[Appointment],
    ) -> HashMap<u32, Vec<Appointment>> {
        let mut by_day: HashMap<u32, Vec<Appointment>> = HashMap::new();
        for day in 1..=self.days_in_month(month, year) {
            let date = cell_date(year, month, day);
            // Appointment dates are full timestamps; match on the date part.
            let matching: Vec<Appointment> = appointments
                .iter()
                .filter(|a| a.date.starts_with(&date))
                .cloned()
                .collect();
            if !matching.is_empty() {
                by_day.insert(day, matching);
            }
        }
        by_day
    }

    pub fn previous_month(&self, current_month: u32, current_year: u32) -> (u32, u32) {
        if current_month == 1 {
            (12, current_year - 1)
        } else {
            (current_month - 1, current_year)
        }
    }

    pub fn next_month(&self, current_month: u32, current_year: u32) -> (u32, u32) {
        if current_month == 12 {
            (1, current_year + 1)
        } else {
            (current_month + 1, current_year)
        }
    }

    pub fn get_focus_date(&self) -> CalendarFocusDate {
        self.current_focus_date.lock().unwrap().clone()
    }

    pub fn set_focus_date(&self, month: u32, year: u32) -> Result<CalendarFocusDate, String> {
        if !(1..=12).contains(&month) {
            return Err(format!("Invalid month: {}. Must be between 1 and 12", month));
        }

        let new_focus_date = CalendarFocusDate { month, year };
        *self.current_focus_date.lock().unwrap() = new_focus_date.clone();
        Ok(new_focus_date)
    }

    pub fn navigate_previous_month(&self) -> CalendarFocusDate {
        let current = self.get_focus_date();
        let (month, year) = self.previous_month(current.month, current.year);
        // previous_month always yields a valid month
        self.set_focus_date(month, year).unwrap()
    }

    pub fn navigate_next_month(&self) -> CalendarFocusDate {
        let current = self.get_focus_date();
        let (month, year) = self.next_month(current.month, current.year);
        self.set_focus_date(month, year).unwrap()
    }
}

impl Default for CalendarService {
    fn default() -> Self {
        Self::new()
    }
}

fn cell_date(year: u32, month: u32, day: u32) -> String {
    format!("{:04}-{:02}-{:02}", year, month, day)
}

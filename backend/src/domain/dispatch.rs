//! Event dispatch.
//!
//! Broadcasting an agenda event to guardians. A single-student audience
//! produces a real messaging deep link (the caller opens it); class and
//! global audiences run the sequential simulated dispatch. Statistics are
//! committed once at the end with no rollback: a crash mid-loop loses the
//! run's statistics, matching the source behavior.

use anyhow::Result;
use chrono::{NaiveDate, Timelike, Utc};
use log::{info, warn};
use std::thread;
use std::time::Duration;

use shared::{DeliveryStats, DispatchStatus, EventAudience, EventStatus, SchoolEvent, Student};

use crate::config::DispatchPacing;
use crate::domain::gateway::DataGateway;

/// Cleaned numbers of 11 digits or fewer get the country code prefixed.
const COUNTRY_CODE: &str = "55";

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// The event was already dispatched; the caller must confirm a resend.
    ResendConfirmationRequired,
    Completed {
        stats: DeliveryStats,
        /// Present for a single-recipient dispatch with a phone on file;
        /// the caller opens it in a browser context.
        deep_link: Option<String>,
    },
}

#[derive(Clone)]
pub struct EventDispatcher {
    gateway: DataGateway,
    pacing: DispatchPacing,
    school_name: String,
}

impl EventDispatcher {
    pub fn new(gateway: DataGateway, pacing: DispatchPacing, school_name: String) -> Self {
        Self {
            gateway,
            pacing,
            school_name,
        }
    }

    /// Publish the event and run the dispatch. `on_progress` receives the
    /// completion percentage after each recipient.
    pub fn dispatch(
        &self,
        event: &SchoolEvent,
        students: &[Student],
        confirm_resend: bool,
        mut on_progress: impl FnMut(u32),
    ) -> Result<DispatchOutcome> {
        if event.dispatch_status == DispatchStatus::Completed && !confirm_resend {
            return Ok(DispatchOutcome::ResendConfirmationRequired);
        }

        let recipients = resolve_recipients(event, students);
        info!(
            "Dispatching event '{}' to {} recipient(s)",
            event.title,
            recipients.len()
        );

        let mut working = event.clone();
        working.status = EventStatus::Published;
        working.dispatch_status = DispatchStatus::Sending;
        self.gateway.update_event(&working)?;

        let total = recipients.len() as u32;
        let mut success = 0u32;
        let mut deep_link = None;

        if event.audience == EventAudience::Student && recipients.len() == 1 {
            let student = recipients[0];
            match self.build_deep_link(event, student) {
                Some(url) => {
                    deep_link = Some(url);
                    success = 1;
                    on_progress(100);
                }
                None => {
                    warn!(
                        "Student '{}' has no contact phone; nothing to send",
                        student.full_name
                    );
                }
            }
        } else {
            for (index, _student) in recipients.iter().enumerate() {
                self.pause_between_sends();
                success += 1;
                on_progress((index as u32 + 1) * 100 / total.max(1));
            }
        }

        working.dispatch_status = DispatchStatus::Completed;
        working.delivery_stats = DeliveryStats {
            total,
            success,
            failed: total - success,
        };
        self.gateway.update_event(&working)?;

        info!(
            "Dispatch of '{}' finished: {}/{} delivered",
            event.title, success, total
        );
        Ok(DispatchOutcome::Completed {
            stats: working.delivery_stats,
            deep_link,
        })
    }

    /// The prefilled messaging URL for one student, or `None` without a
    /// phone on file.
    pub fn build_deep_link(&self, event: &SchoolEvent, student: &Student) -> Option<String> {
        if student.contact_phone.trim().is_empty() {
            return None;
        }
        let phone = normalized_phone(&student.contact_phone);
        let message = self.build_message(event, &student.guardian_name);
        let encoded: String = url::form_urlencoded::byte_serialize(message.as_bytes()).collect();
        Some(format!("https://wa.me/{}?text={}", phone, encoded))
    }

    fn build_message(&self, event: &SchoolEvent, guardian_name: &str) -> String {
        format!(
            "*{}*\n\nOlá {}, nova atualização na agenda:\n\n*{}*\n📅 {} às {}\n📝 {}\n\nAcesse o app para mais detalhes.",
            self.school_name,
            guardian_name,
            event.title,
            display_date(&event.date),
            event.time,
            event.description,
        )
    }

    fn pause_between_sends(&self) {
        let jitter = if self.pacing.jitter_ms > 0 {
            u64::from(Utc::now().nanosecond() / 1_000_000) % self.pacing.jitter_ms
        } else {
            0
        };
        let delay = self.pacing.base_delay_ms + jitter;
        if delay > 0 {
            thread::sleep(Duration::from_millis(delay));
        }
    }
}

fn resolve_recipients<'a>(event: &SchoolEvent, students: &'a [Student]) -> Vec<&'a Student> {
    match event.audience {
        EventAudience::Global => students.iter().collect(),
        EventAudience::Class => students
            .iter()
            .filter(|s| s.school_class == event.target_id)
            .collect(),
        EventAudience::Student => students.iter().filter(|s| s.id == event.target_id).collect(),
    }
}

/// Digits-only form of a contact phone.
pub fn clean_phone(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Cleaned phone with the country code prefixed when the number has 11
/// digits or fewer (local numbers; longer ones already carry a code).
pub fn normalized_phone(raw: &str) -> String {
    let phone = clean_phone(raw);
    if phone.len() <= 11 {
        format!("{}{}", COUNTRY_CODE, phone)
    } else {
        phone
    }
}

/// dd/mm/yyyy for guardian-facing text; the raw value if unparseable.
fn display_date(date: &str) -> String {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|d| d.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|_| date.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgendaStats {
    pub published_events: usize,
    pub messages_sent: u32,
    pub total_recipients: u32,
    /// Percentage; 100 while nothing has been dispatched yet.
    pub success_rate: u32,
}

/// KPI aggregation over the event collection.
pub fn agenda_stats(events: &[SchoolEvent]) -> AgendaStats {
    let published_events = events
        .iter()
        .filter(|e| e.status == EventStatus::Published)
        .count();
    let messages_sent: u32 = events.iter().map(|e| e.delivery_stats.success).sum();
    let total_recipients: u32 = events.iter().map(|e| e.delivery_stats.total).sum();
    let success_rate = if total_recipients > 0 {
        (f64::from(messages_sent) / f64::from(total_recipients) * 100.0).round() as u32
    } else {
        100
    };

    AgendaStats {
        published_events,
        messages_sent,
        total_recipients,
        success_rate,
    }
}

//! # Domain Module
//!
//! Business logic for the school-management system: the optimistic CRUD
//! gateway over the document store, calendar generation for the agenda,
//! dashboard and expense aggregation, and event dispatch.
//!
//! ## Module Organization
//!
//! - **gateway**: per-entity create/update/delete against the store, with
//!   ID stripping, confirmation-gated destructive deletes and the
//!   mutation-path invariants
//! - **calendar**: month-grid generation and date bucketing
//! - **dashboard**: restriction counts over the student collection
//! - **expense_analytics**: month filtering, totals, month-over-month
//!   comparison, category and trend aggregation
//! - **dispatch**: event broadcast (deep link or simulated bulk send) and
//!   agenda KPIs

pub mod calendar;
pub mod dashboard;
pub mod dispatch;
pub mod expense_analytics;
pub mod gateway;

pub use calendar::CalendarService;
pub use dispatch::{agenda_stats, AgendaStats, DispatchOutcome, EventDispatcher};
pub use gateway::{DataGateway, DeleteOutcome};

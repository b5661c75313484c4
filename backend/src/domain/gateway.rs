//! CRUD gateway over the document store.
//!
//! Writes are optimistic and fire-and-forget: the caller gets a `Result`
//! it may inspect (tests do; the UI mostly does not), but the real
//! confirmation signal is the next snapshot from the sync layer. Every
//! create strips the client-side identifier so the store assigns the
//! canonical ID.

use anyhow::{anyhow, bail, Result};
use log::{error, info};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

use shared::{Appointment, Expense, MealLog, SchoolEvent, Student, WeeklyGoal};

use crate::storage::DocumentStore;
use crate::sync::collections;

/// Outcome of a confirmation-gated delete. Student, expense and event
/// deletions require the destructive-confirmation flag; appointment and
/// goal deletions do not. The asymmetry is intentional.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    ConfirmationRequired,
}

#[derive(Clone)]
pub struct DataGateway {
    store: Arc<dyn DocumentStore>,
}

/// Serialize an entity and strip the client-assigned identifier before it
/// reaches the store.
fn to_document<T: Serialize>(entity: &T) -> Result<Value> {
    let mut value = serde_json::to_value(entity)?;
    let obj = value
        .as_object_mut()
        .ok_or_else(|| anyhow!("entity did not serialize to an object"))?;
    obj.remove("id");
    Ok(value)
}

impl DataGateway {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    // --- Students ---

    /// Create a student. This is the one create whose failure the UI
    /// surfaces as a blocking alert, so the error matters to the caller.
    pub fn add_student(&self, student: &Student) -> Result<()> {
        let mut student = student.clone();
        student.medical.normalize_restriction();
        let doc = to_document(&student)?;
        match self.store.add_document(collections::STUDENTS, doc) {
            Ok(id) => {
                info!("Created student '{}' as {}", student.full_name, id);
                Ok(())
            }
            Err(e) => {
                error!("Failed to create student: {:#}", e);
                Err(e)
            }
        }
    }

    pub fn update_student(&self, student: &Student) -> Result<()> {
        let mut updated = student.clone();
        updated.medical.normalize_restriction();
        let doc = to_document(&updated)?;
        self.store
            .update_document(collections::STUDENTS, &student.id, doc)
            .map_err(|e| {
                error!("Failed to update student {}: {:#}", student.id, e);
                e
            })
    }

    pub fn delete_student(&self, id: &str, confirmed: bool) -> Result<DeleteOutcome> {
        self.confirmed_delete(collections::STUDENTS, id, confirmed)
    }

    // --- Meal logs (append-only) ---

    pub fn add_meal_log(&self, log: &MealLog) -> Result<()> {
        if log.student_id.is_empty() {
            bail!("meal log must reference a student");
        }
        if log.consumption_percentage > 100 {
            bail!(
                "consumption percentage must be 0-100, got {}",
                log.consumption_percentage
            );
        }
        let doc = to_document(log)?;
        self.store.add_document(collections::LOGS, doc).map(|_| ()).map_err(|e| {
            error!("Failed to create meal log: {:#}", e);
            e
        })
    }

    // --- Appointments (create/delete only) ---

    pub fn add_appointment(&self, appointment: &Appointment) -> Result<()> {
        let doc = to_document(appointment)?;
        self.store
            .add_document(collections::APPOINTMENTS, doc)
            .map(|_| ())
            .map_err(|e| {
                error!("Failed to create appointment: {:#}", e);
                e
            })
    }

    pub fn delete_appointment(&self, id: &str) -> Result<()> {
        self.store
            .delete_document(collections::APPOINTMENTS, id)
            .map_err(|e| {
                error!("Failed to delete appointment {}: {:#}", id, e);
                e
            })
    }

    // --- Weekly goals ---

    pub fn add_goal(&self, goal: &WeeklyGoal) -> Result<()> {
        let doc = to_document(goal)?;
        self.store.add_document(collections::GOALS, doc).map(|_| ()).map_err(|e| {
            error!("Failed to create goal: {:#}", e);
            e
        })
    }

    /// Flip the completion flag from the value the caller last observed.
    /// The previous value is NOT re-read from the store, so two sessions
    /// toggling concurrently can lose one flip (known limitation,
    /// preserved from the source behavior).
    pub fn toggle_goal(&self, id: &str, currently_completed: bool) -> Result<()> {
        let patch = json!({ "completed": !currently_completed });
        self.store
            .update_document(collections::GOALS, id, patch)
            .map_err(|e| {
                error!("Failed to toggle goal {}: {:#}", id, e);
                e
            })
    }

    pub fn delete_goal(&self, id: &str) -> Result<()> {
        self.store.delete_document(collections::GOALS, id).map_err(|e| {
            error!("Failed to delete goal {}: {:#}", id, e);
            e
        })
    }

    // --- Expenses ---

    pub fn add_expense(&self, expense: &Expense) -> Result<()> {
        let doc = to_document(expense)?;
        self.store
            .add_document(collections::EXPENSES, doc)
            .map(|_| ())
            .map_err(|e| {
                error!("Failed to create expense: {:#}", e);
                e
            })
    }

    pub fn update_expense(&self, expense: &Expense) -> Result<()> {
        let doc = to_document(expense)?;
        self.store
            .update_document(collections::EXPENSES, &expense.id, doc)
            .map_err(|e| {
                error!("Failed to update expense {}: {:#}", expense.id, e);
                e
            })
    }

    pub fn delete_expense(&self, id: &str, confirmed: bool) -> Result<DeleteOutcome> {
        self.confirmed_delete(collections::EXPENSES, id, confirmed)
    }

    // --- School events ---

    pub fn add_event(&self, event: &SchoolEvent) -> Result<()> {
        let doc = to_document(event)?;
        self.store
            .add_document(collections::EVENTS, doc)
            .map(|_| ())
            .map_err(|e| {
                error!("Failed to create event: {:#}", e);
                e
            })
    }

    pub fn update_event(&self, event: &SchoolEvent) -> Result<()> {
        let doc = to_document(event)?;
        self.store
            .update_document(collections::EVENTS, &event.id, doc)
            .map_err(|e| {
                error!("Failed to update event {}: {:#}", event.id, e);
                e
            })
    }

    pub fn delete_event(&self, id: &str, confirmed: bool) -> Result<DeleteOutcome> {
        self.confirmed_delete(collections::EVENTS, id, confirmed)
    }

    fn confirmed_delete(
        &self,
        collection: &str,
        id: &str,
        confirmed: bool,
    ) -> Result<DeleteOutcome> {
        if !confirmed {
            return Ok(DeleteOutcome::ConfirmationRequired);
        }
        match self.store.delete_document(collection, id) {
            Ok(()) => Ok(DeleteOutcome::Deleted),
            Err(e) => {
                error!("Failed to delete {} from '{}': {:#}", id, collection, e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::sync::SyncEngine;
    use shared::{
        new_client_id, Allergy, AppointmentType, MealMood, MealType, PaymentMethod,
    };

    fn setup() -> (Arc<MemoryStore>, SyncEngine, DataGateway) {
        let store = Arc::new(MemoryStore::new());
        let engine = SyncEngine::new(store.clone());
        engine.start().unwrap();
        let gateway = DataGateway::new(store.clone());
        (store, engine, gateway)
    }

    fn student_named(name: &str) -> Student {
        Student {
            id: new_client_id(),
            full_name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn create_discards_client_id_and_snapshot_carries_canonical_id() {
        let (_store, engine, gateway) = setup();
        let student = student_named("Ana");
        let client_id = student.id.clone();

        gateway.add_student(&student).unwrap();

        let students = engine.students.snapshot();
        assert_eq!(students.len(), 1);
        assert_ne!(students[0].id, client_id);
        assert!(!students[0].id.is_empty());
        assert_eq!(students[0].full_name, "Ana");
    }

    #[test]
    fn student_mutations_enforce_restriction_invariant() {
        let (_store, engine, gateway) = setup();

        // Created with an allergy but the flag left false.
        let mut student = student_named("Bia");
        student.medical.allergies.push(Allergy {
            id: new_client_id(),
            name: "Ovo".to_string(),
            ..Default::default()
        });
        student.medical.has_restriction = false;
        gateway.add_student(&student).unwrap();

        let synced = engine.students.snapshot()[0].clone();
        assert!(synced.medical.has_restriction);

        // Emptying the allergy list must drop the flag.
        let mut updated = synced.clone();
        updated.medical.allergies.clear();
        gateway.update_student(&updated).unwrap();

        let synced = engine.students.snapshot()[0].clone();
        assert!(!synced.medical.has_restriction);
    }

    #[test]
    fn goal_toggle_twice_restores_original_state() {
        let (_store, engine, gateway) = setup();
        gateway
            .add_goal(&WeeklyGoal {
                id: new_client_id(),
                text: "Variar o cardápio".to_string(),
                completed: false,
                created_at: "2024-03-01T08:00:00Z".to_string(),
            })
            .unwrap();

        let goal = engine.goals.snapshot()[0].clone();
        gateway.toggle_goal(&goal.id, goal.completed).unwrap();
        assert!(engine.goals.snapshot()[0].completed);

        // Second toggle from the same observed starting state.
        gateway.toggle_goal(&goal.id, !goal.completed).unwrap();
        assert_eq!(engine.goals.snapshot()[0].completed, goal.completed);
    }

    #[test]
    fn meal_log_create_validates_percentage_and_student() {
        let (_store, _engine, gateway) = setup();
        let log = MealLog {
            id: new_client_id(),
            student_id: "s1".to_string(),
            date: "2024-03-15T11:30:00Z".to_string(),
            meal_type: MealType::Lunch,
            consumption_percentage: 80,
            mood: MealMood::Happy,
            notes: String::new(),
        };
        gateway.add_meal_log(&log).unwrap();

        let over = MealLog {
            consumption_percentage: 130,
            ..log.clone()
        };
        assert!(gateway.add_meal_log(&over).is_err());

        let orphan = MealLog {
            student_id: String::new(),
            ..log
        };
        assert!(gateway.add_meal_log(&orphan).is_err());
    }

    #[test]
    fn destructive_deletes_are_confirmation_gated() {
        let (_store, engine, gateway) = setup();
        gateway.add_student(&student_named("Caio")).unwrap();
        let id = engine.students.snapshot()[0].id.clone();

        assert_eq!(
            gateway.delete_student(&id, false).unwrap(),
            DeleteOutcome::ConfirmationRequired
        );
        assert_eq!(engine.students.snapshot().len(), 1);

        assert_eq!(
            gateway.delete_student(&id, true).unwrap(),
            DeleteOutcome::Deleted
        );
        assert!(engine.students.snapshot().is_empty());
    }

    #[test]
    fn appointment_and_goal_deletes_need_no_confirmation() {
        let (_store, engine, gateway) = setup();
        gateway
            .add_appointment(&Appointment {
                id: new_client_id(),
                title: "Revisão de cardápio".to_string(),
                date: "2024-04-02T10:00:00Z".to_string(),
                appointment_type: AppointmentType::Review,
                notes: None,
            })
            .unwrap();

        let id = engine.appointments.snapshot()[0].id.clone();
        gateway.delete_appointment(&id).unwrap();
        assert!(engine.appointments.snapshot().is_empty());
    }

    #[test]
    fn expense_update_round_trips_through_snapshot() {
        let (_store, engine, gateway) = setup();
        gateway
            .add_expense(&Expense {
                id: new_client_id(),
                description: "Hortifruti".to_string(),
                category: "Alimentação".to_string(),
                amount: 120.0,
                date: "2024-03-10".to_string(),
                payment_method: PaymentMethod::Pix,
                supplier: "Ceasa".to_string(),
                notes: None,
                created_at: "2024-03-10T09:00:00Z".to_string(),
            })
            .unwrap();

        let mut expense = engine.expenses.snapshot()[0].clone();
        expense.amount = 150.0;
        gateway.update_expense(&expense).unwrap();
        assert_eq!(engine.expenses.snapshot()[0].amount, 150.0);
    }
}

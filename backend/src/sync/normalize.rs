//! Document-to-entity normalization.
//!
//! Student documents get the full defaulting treatment: any missing or
//! mistyped field is replaced by its documented default, so
//! partially-written or legacy records never fail. Every other entity type
//! is deserialized strictly with only the canonical ID injected; a
//! malformed document is an error the sync engine records on the handle.

use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::{Gender, MedicalRecord, Shift, Student};

use crate::storage::RawDocument;

fn str_or(data: &Value, key: &str, default: &str) -> String {
    data.get(key)
        .and_then(Value::as_str)
        .unwrap_or(default)
        .to_string()
}

fn num_or_zero(data: &Value, key: &str) -> f64 {
    data.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

/// Build a [`Student`] from a raw document, applying the defaulting
/// policy: `fullName` → "Sem Nome", strings → "", numbers → 0, gender →
/// M, shift → Matutino, lists → empty, nested medical record likewise.
pub fn student_from_document(doc: &RawDocument) -> Student {
    let data = &doc.data;
    let medical = data.get("medical").cloned().unwrap_or(Value::Null);

    Student {
        id: doc.id.clone(),
        full_name: str_or(data, "fullName", "Sem Nome"),
        date_of_birth: str_or(data, "dateOfBirth", ""),
        gender: match data.get("gender").and_then(Value::as_str) {
            Some("F") => Gender::F,
            _ => Gender::M,
        },
        height_cm: num_or_zero(data, "heightCm"),
        weight_kg: num_or_zero(data, "weightKg"),
        guardian_name: str_or(data, "guardianName", ""),
        contact_phone: str_or(data, "contactPhone", ""),
        contact_email: str_or(data, "contactEmail", ""),
        school_class: str_or(data, "schoolClass", ""),
        shift: match data.get("shift").and_then(Value::as_str) {
            Some("Vespertino") => Shift::Vespertino,
            Some("Integral") => Shift::Integral,
            _ => Shift::Matutino,
        },
        teacher_name: str_or(data, "teacherName", ""),
        avatar_url: str_or(data, "avatarUrl", ""),
        general_notes: str_or(data, "generalNotes", ""),
        medical: MedicalRecord {
            has_restriction: medical
                .get("hasRestriction")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            allergies: medical
                .get("allergies")
                .cloned()
                .map(|v| serde_json::from_value(v).unwrap_or_default())
                .unwrap_or_default(),
            intolerances: medical
                .get("intolerances")
                .cloned()
                .map(|v| serde_json::from_value(v).unwrap_or_default())
                .unwrap_or_default(),
            medical_notes: str_or(&medical, "medicalNotes", ""),
            blood_type: str_or(&medical, "bloodType", ""),
        },
    }
}

/// Strict deserialization for every entity type other than [`Student`]:
/// inject the canonical ID, then require the document to match the type.
pub fn typed_from_document<T: DeserializeOwned>(doc: &RawDocument) -> Result<T> {
    let mut data = doc.data.clone();
    let obj = data
        .as_object_mut()
        .ok_or_else(|| anyhow!("document '{}' is not an object", doc.id))?;
    obj.entry("id".to_string())
        .or_insert_with(|| Value::String(doc.id.clone()));
    serde_json::from_value(data).with_context(|| format!("deserializing document '{}'", doc.id))
}

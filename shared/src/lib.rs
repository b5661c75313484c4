use chrono::{Datelike, Local};
use serde::{Deserialize, Serialize};

/// Severity of a registered allergy. Wire values are the Portuguese labels
/// stored in the document database.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AllergySeverity {
    #[default]
    #[serde(rename = "Leve")]
    Mild,
    #[serde(rename = "Moderada")]
    Moderate,
    #[serde(rename = "Grave")]
    Severe,
}

/// A single allergy entry inside a student's medical record.
///
/// Every field is defaulted so a half-written entry in an old document
/// never fails deserialization of the whole student.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Allergy {
    pub id: String,
    pub name: String,
    pub severity: AllergySeverity,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalRecord {
    pub has_restriction: bool,
    pub allergies: Vec<Allergy>,
    pub intolerances: Vec<String>,
    pub medical_notes: String,
    pub blood_type: String,
}

impl MedicalRecord {
    /// Re-derive the restriction flag from the allergy list. Called on every
    /// student mutation path; stored documents are never trusted to satisfy
    /// the invariant on read.
    pub fn normalize_restriction(&mut self) {
        self.has_restriction = !self.allergies.is_empty();
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    #[default]
    M,
    F,
}

/// School shift. Documents written before the field existed default to
/// the morning shift.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Shift {
    #[default]
    Matutino,
    Vespertino,
    Integral,
}

/// A student record, the richest entity in the system.
///
/// Field names serialize in camelCase to match the documents the store
/// already holds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub full_name: String,
    /// YYYY-MM-DD
    pub date_of_birth: String,
    pub gender: Gender,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub guardian_name: String,
    pub contact_phone: String,
    pub contact_email: String,
    pub school_class: String,
    pub shift: Shift,
    pub teacher_name: String,
    pub avatar_url: String,
    pub general_notes: String,
    pub medical: MedicalRecord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MealType {
    #[serde(rename = "Café da Manhã")]
    Breakfast,
    #[serde(rename = "Almoço")]
    Lunch,
    #[serde(rename = "Lanche")]
    Snack,
    #[serde(rename = "Jantar")]
    Dinner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MealMood {
    Happy,
    Neutral,
    Fussy,
    Refused,
}

/// One meal observation for a student. Meal logs are append-only: there is
/// no update operation anywhere in the system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealLog {
    pub id: String,
    pub student_id: String,
    /// RFC 3339 timestamp of the meal
    pub date: String,
    pub meal_type: MealType,
    /// 0-100, validated on create
    pub consumption_percentage: u8,
    pub mood: MealMood,
    pub notes: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppointmentType {
    Consultation,
    Meeting,
    Review,
}

/// Nutrition-panel appointment. Create/delete only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub title: String,
    /// RFC 3339 timestamp (date and time)
    pub date: String,
    #[serde(rename = "type")]
    pub appointment_type: AppointmentType,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyGoal {
    pub id: String,
    pub text: String,
    pub completed: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    Pix,
    Dinheiro,
    #[serde(rename = "Cartão Crédito")]
    CartaoCredito,
    #[serde(rename = "Cartão Débito")]
    CartaoDebito,
    Boleto,
    #[serde(rename = "Transferência")]
    Transferencia,
}

/// The closed set of expense categories. Anything outside the list is
/// aggregated under "Outros".
pub const EXPENSE_CATEGORIES: [&str; 8] = [
    "Alimentação",
    "Material Escolar",
    "Salários",
    "Manutenção",
    "Contas (Água/Luz/Net)",
    "Marketing",
    "Impostos",
    "Outros",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: String,
    pub description: String,
    pub category: String,
    pub amount: f64,
    /// YYYY-MM-DD
    pub date: String,
    pub payment_method: PaymentMethod,
    pub supplier: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventAudience {
    Global,
    Class,
    Student,
}

/// Publication status of the event record itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventStatus {
    Draft,
    Published,
}

/// Lifecycle of a broadcast attempt, distinct from [`EventStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DispatchStatus {
    Pending,
    Sending,
    Completed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryStats {
    pub total: u32,
    pub success: u32,
    pub failed: u32,
}

/// An agenda event that can be broadcast to guardians.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolEvent {
    pub id: String,
    pub title: String,
    pub description: String,
    /// YYYY-MM-DD
    pub date: String,
    /// HH:MM
    pub time: String,
    pub audience: EventAudience,
    #[serde(default)]
    pub target_id: String,
    pub status: EventStatus,
    /// Field name kept from the existing documents.
    #[serde(rename = "whatsappStatus")]
    pub dispatch_status: DispatchStatus,
    pub delivery_stats: DeliveryStats,
    pub created_at: String,
}

impl SchoolEvent {
    /// A fresh draft for the given date, matching the form's initial state.
    pub fn draft(title: &str, date: &str, time: &str, created_at: &str) -> Self {
        Self {
            id: new_client_id(),
            title: title.to_string(),
            description: String::new(),
            date: date.to_string(),
            time: time.to_string(),
            audience: EventAudience::Global,
            target_id: String::new(),
            status: EventStatus::Draft,
            dispatch_status: DispatchStatus::Pending,
            delivery_stats: DeliveryStats::default(),
            created_at: created_at.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    Admin,
    Nutritionist,
}

/// Session-scoped identity. The runtime always assigns the Admin role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub role: UserRole,
    pub name: String,
}

/// Generate a client-side temporary identifier. The CRUD gateway strips it
/// before persistence; the store assigns the canonical ID.
pub fn new_client_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Type of calendar day for explicit rendering logic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalendarDayType {
    /// Empty padding cell before the start of the month
    PaddingBefore,
    /// Actual day within the month
    MonthDay,
}

/// A single cell in the month grid, with the day's agenda entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarDay {
    pub day: u32,
    pub events: Vec<SchoolEvent>,
    pub appointments: Vec<Appointment>,
    pub day_type: CalendarDayType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarMonth {
    pub month: u32,
    pub year: u32,
    pub days: Vec<CalendarDay>,
    /// 0 = Sunday, 1 = Monday, etc.
    pub first_day_of_week: u32,
}

/// Represents the current focus date for calendar navigation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarFocusDate {
    pub month: u32,
    pub year: u32,
}

impl Default for CalendarFocusDate {
    fn default() -> Self {
        let now = Local::now();
        Self {
            month: now.month(),
            year: now.year() as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn student_serializes_with_document_field_names() {
        let mut student = Student {
            id: "s1".to_string(),
            full_name: "Ana Souza".to_string(),
            shift: Shift::Vespertino,
            ..Default::default()
        };
        student.medical.allergies.push(Allergy {
            id: "a1".to_string(),
            name: "Amendoim".to_string(),
            severity: AllergySeverity::Severe,
            notes: None,
        });

        let value = serde_json::to_value(&student).unwrap();
        assert_eq!(value["fullName"], "Ana Souza");
        assert_eq!(value["shift"], "Vespertino");
        assert_eq!(value["medical"]["allergies"][0]["severity"], "Grave");
        assert_eq!(value["medical"]["hasRestriction"], false);
    }

    #[test]
    fn event_serializes_legacy_dispatch_field() {
        let event = SchoolEvent::draft("Reunião", "2024-03-15", "08:00", "2024-03-01T08:00:00Z");
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["whatsappStatus"], "PENDING");
        assert_eq!(value["status"], "DRAFT");
        assert_eq!(value["audience"], "GLOBAL");
    }

    #[test]
    fn normalize_restriction_follows_allergy_list() {
        let mut medical = MedicalRecord {
            has_restriction: true,
            ..Default::default()
        };
        medical.normalize_restriction();
        assert!(!medical.has_restriction);

        medical.allergies.push(Allergy::default());
        medical.normalize_restriction();
        assert!(medical.has_restriction);
    }

    #[test]
    fn meal_type_uses_portuguese_wire_values() {
        let value = serde_json::to_value(MealType::Breakfast).unwrap();
        assert_eq!(value, "Café da Manhã");
        let parsed: MealType = serde_json::from_value(serde_json::json!("Almoço")).unwrap();
        assert_eq!(parsed, MealType::Lunch);
    }

    #[test]
    fn client_ids_are_unique() {
        assert_ne!(new_client_id(), new_client_id());
    }
}

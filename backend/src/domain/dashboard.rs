//! Dashboard aggregation.
//!
//! Pure, stateless functions over the in-memory student collection; the
//! chart components consume these directly.

use shared::{AllergySeverity, Student};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestrictionSummary {
    pub total_students: usize,
    /// Students with the restriction flag or a non-empty allergy list.
    pub with_restrictions: usize,
    /// Students carrying at least one severe allergy.
    pub severe_allergies: usize,
}

pub fn restriction_summary(students: &[Student]) -> RestrictionSummary {
    let with_restrictions = students
        .iter()
        .filter(|s| s.medical.has_restriction || !s.medical.allergies.is_empty())
        .count();
    let severe_allergies = students
        .iter()
        .filter(|s| {
            s.medical
                .allergies
                .iter()
                .any(|a| a.severity == AllergySeverity::Severe)
        })
        .count();

    RestrictionSummary {
        total_students: students.len(),
        with_restrictions,
        severe_allergies,
    }
}

/// Chart-ready pairs for the restriction pie: unrestricted first.
pub fn restriction_breakdown(summary: RestrictionSummary) -> Vec<(String, usize)> {
    vec![
        (
            "Sem Restrições".to_string(),
            summary.total_students - summary.with_restrictions,
        ),
        ("Com Restrições".to_string(), summary.with_restrictions),
    ]
}

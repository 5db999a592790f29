//! Required-field validation for decoded candidates.

use crate::request::UpsertAirportRequest;
use serde::Serialize;
use std::fmt;

/// One field-level violation, in the shape it is serialized into the error
/// body: `{"field":"iata_code","error":"iata_code is a required field"}`.
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: &'static str,
    pub error: String,
}

/// Ordered violations for one candidate. Displays as the JSON array carried
/// in the error body, so the message is stable across runs.
#[derive(Debug)]
pub struct FieldViolations(pub Vec<FieldViolation>);

impl fmt::Display for FieldViolations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = serde_json::to_string(&self.0).map_err(|_| fmt::Error)?;
        f.write_str(&rendered)
    }
}

impl From<Vec<FieldViolation>> for FieldViolations {
    fn from(violations: Vec<FieldViolation>) -> Self {
        Self(violations)
    }
}

/// Checks the required fields in declaration order; `geoloc` is never
/// required. Pure; returns an empty list for a valid candidate.
pub fn check(candidate: &UpsertAirportRequest) -> Vec<FieldViolation> {
    let required = [
        ("name", &candidate.name),
        ("city", &candidate.city),
        ("country", &candidate.country),
        ("iata_code", &candidate.iata_code),
    ];

    let mut violations = Vec::new();
    for (field, value) in required {
        if value.trim().is_empty() {
            violations.push(FieldViolation {
                field,
                error: format!("{field} is a required field"),
            });
        }
    }
    violations
}

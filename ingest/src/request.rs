use serde::Deserialize;
use store::Airport;

/// Wire shape of one array element.
///
/// Absent fields deserialize to empty strings so that required-field checks
/// stay a validation concern with stable field-level messages instead of
/// becoming decode failures.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpsertAirportRequest {
    pub name: String,
    pub city: String,
    pub country: String,
    pub iata_code: String,
    /// Accepted on input, never persisted.
    pub geoloc: Option<Geoloc>,
}

#[derive(Clone, Copy, Debug, Deserialize)]
pub struct Geoloc {
    pub lat: f64,
    pub lng: f64,
}

impl UpsertAirportRequest {
    pub fn into_airport(self) -> Airport {
        Airport {
            name: self.name,
            city: self.city,
            country: self.country,
            iata_code: self.iata_code,
        }
    }
}

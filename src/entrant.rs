//! Entrant Records and Classification

use rusqlite::Row;
use serde::Serialize;

use crate::config::{CategoryMapping, StatusCodes};
use crate::schema::SchemaVersion;

/// One rider's registration, normalised across schema generations.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct EntrantRecord {
    #[serde(rename = "EntrantID")]
    pub entrant_id: i64,
    pub bike: String,
    pub bike_reg: String,
    pub rider_name: String,
    pub rider_first: String,
    #[serde(rename = "RiderIBA")]
    pub rider_iba: String,
    pub pillion_name: String,
    pub pillion_first: String,
    #[serde(rename = "PillionIBA")]
    pub pillion_iba: String,
    /// 1 for kilometres, 0 for miles.
    pub odo_kms: i64,
    pub route: String,
    pub class: i64,
    pub phone: String,
    pub email: String,
    pub nok_name: String,
    pub nok_relation: String,
    pub nok_phone: String,
    pub rider_last: String,
    pub status: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionStatus {
    None,
    Finisher,
    LateFinisher,
    Other,
}

impl CompletionStatus {
    pub fn from_code(code: i64, codes: &StatusCodes) -> Self {
        match code {
            0 => Self::None,
            c if c == codes.late_finisher => Self::LateFinisher,
            c if c == codes.finisher => Self::Finisher,
            _ => Self::Other,
        }
    }
}

/// Current schema stores the odometer unit as a letter.
pub fn normalize_odometer(units: &str) -> i64 {
    if units.trim().eq_ignore_ascii_case("K") {
        1
    } else {
        0
    }
}

/// Last whitespace-delimited token of a full name.
pub fn derive_surname(full_name: &str) -> String {
    full_name
        .split_whitespace()
        .last()
        .unwrap_or_default()
        .to_string()
}

/// Crude English-only "a"/"an" prefix for a bike description.
pub fn formatted_a_bike(bike: &str) -> String {
    let bike = bike.trim();
    let Some(first) = bike.chars().next() else {
        return String::new();
    };
    let article = match first.to_ascii_uppercase() {
        'A' | 'E' | 'I' | 'O' => "an",
        _ => "a",
    };
    format!("{article} {bike}")
}

impl EntrantRecord {
    /// Decodes one row of an entrant query built for `schema`.
    pub fn from_row(row: &Row<'_>, schema: SchemaVersion) -> rusqlite::Result<Self> {
        let odo_kms = match schema {
            SchemaVersion::Legacy => row.get(9)?,
            SchemaVersion::Current => normalize_odometer(&row.get::<_, String>(9)?),
        };
        let mut record = Self {
            entrant_id: row.get(0)?,
            bike: row.get(1)?,
            bike_reg: row.get(2)?,
            rider_name: row.get(3)?,
            rider_first: row.get(4)?,
            rider_iba: row.get(5)?,
            pillion_name: row.get(6)?,
            pillion_first: row.get(7)?,
            pillion_iba: row.get(8)?,
            odo_kms,
            route: row.get(10)?,
            class: row.get(11)?,
            phone: row.get(12)?,
            email: row.get(13)?,
            nok_name: row.get(14)?,
            nok_relation: row.get(15)?,
            nok_phone: row.get(16)?,
            rider_last: row.get(17)?,
            status: row.get(18)?,
        };
        if record.rider_last.is_empty() {
            record.rider_last = derive_surname(&record.rider_name);
        }
        Ok(record)
    }

    pub fn has_pillion(&self) -> bool {
        !self.pillion_name.trim().is_empty()
    }
}

/// Derives the printable class of each record.
#[derive(Debug, Clone, Default)]
pub struct EntrantClassifier {
    schema: SchemaVersion,
    categories: CategoryMapping,
    status: StatusCodes,
}

impl EntrantClassifier {
    pub fn new(schema: SchemaVersion, categories: CategoryMapping, status: StatusCodes) -> Self {
        Self { schema, categories, status }
    }

    pub fn categories(&self) -> &CategoryMapping {
        &self.categories
    }

    /// Class for a current-schema route and status; 0 if the route is unknown.
    pub fn category(&self, route: &str, status: i64) -> i64 {
        match CompletionStatus::from_code(status, &self.status) {
            CompletionStatus::LateFinisher => self.categories.late_class(route),
            _ => self.categories.standard_class(route),
        }
    }

    pub fn classify(&self, record: &mut EntrantRecord) {
        match self.schema {
            SchemaVersion::Current => {
                record.class = self.category(&record.route, record.status);
            }
            SchemaVersion::Legacy => {
                if record.route.is_empty() {
                    if let Some(route) = self.categories.route_for_class(record.class) {
                        record.route = route.to_string();
                    }
                }
            }
        }
    }
}

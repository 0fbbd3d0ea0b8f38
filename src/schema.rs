//! Schema Adapter
//!
//! Detects which generation of the entrants table a database carries and
//! hands out queries that return the same normalised columns either way.

use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{format_date_range, StatusCodes};
use crate::selection::{current_query, legacy_query, EntrantQuery, SelectionCriteria};
use crate::templates::DocumentType;

/// Databases at or above this `rallyparams.DBVersion` use the current schema.
pub const CURRENT_SCHEMA_THRESHOLD: i64 = 3;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaVersion {
    #[default]
    Legacy,
    Current,
}

impl SchemaVersion {
    pub fn from_db_version(version: i64) -> Self {
        if version >= CURRENT_SCHEMA_THRESHOLD {
            Self::Current
        } else {
            Self::Legacy
        }
    }
}

/// Rally-wide values read from `rallyparams`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RallyMetadata {
    /// Raw `start;finish` timestamps.
    pub date_range: String,
    pub title: String,
    pub db_version: i64,
}

impl RallyMetadata {
    pub fn event_date(&self) -> String {
        format_date_range(&self.date_range)
    }
}

fn has_version_column(conn: &Connection) -> Result<bool, SchemaError> {
    let count: i64 = conn.query_row(
        "SELECT count(*) FROM pragma_table_info('rallyparams') WHERE name = 'DBVersion'",
        [],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Reads the rally metadata. No row is not an error: the run carries on
/// with an empty date and title against the legacy schema.
pub fn read_metadata(conn: &Connection) -> Result<Option<RallyMetadata>, SchemaError> {
    let version = if has_version_column(conn)? {
        "ifnull(DBVersion,0)"
    } else {
        "0"
    };
    let sql = format!(
        "SELECT ifnull(StartTime,'') || ';' || ifnull(FinishTime,''), \
         ifnull(RallyTitle,''), {version} FROM rallyparams"
    );
    let metadata = conn
        .query_row(&sql, [], |row| {
            Ok(RallyMetadata {
                date_range: row.get(0)?,
                title: row.get(1)?,
                db_version: row.get(2)?,
            })
        })
        .optional()?;
    Ok(metadata)
}

/// Schema detected once per run.
#[derive(Debug, Clone, Default)]
pub struct SchemaAdapter {
    pub schema: SchemaVersion,
    pub metadata: RallyMetadata,
}

impl SchemaAdapter {
    pub fn detect(conn: &Connection) -> Result<Self, SchemaError> {
        let metadata = match read_metadata(conn)? {
            Some(metadata) => metadata,
            None => {
                warn!("rallyparams has no row; event date and title will be blank");
                RallyMetadata::default()
            }
        };
        let schema = SchemaVersion::from_db_version(metadata.db_version);
        debug!(?schema, db_version = metadata.db_version, "schema detected");
        Ok(Self { schema, metadata })
    }

    pub fn is_current_schema(&self) -> bool {
        self.schema == SchemaVersion::Current
    }

    pub fn build_entrant_query(
        &self,
        criteria: &SelectionCriteria,
        doc: &DocumentType,
        status: &StatusCodes,
    ) -> EntrantQuery {
        let ignored = criteria.unsupported_filters(self.schema);
        if !ignored.is_empty() {
            warn!(
                schema = ?self.schema,
                "{} filter(s) not supported by this database; ignored",
                ignored.join(", ")
            );
        }
        match self.schema {
            SchemaVersion::Legacy => legacy_query(criteria),
            SchemaVersion::Current => current_query(criteria, doc, status),
        }
    }
}

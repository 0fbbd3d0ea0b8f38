//! Selection Query Builder
//!
//! Filters are composed as clause groups rather than concatenated SQL, so
//! every value is a bound parameter and the OR/AND rule between groups is
//! visible in the types.

use rusqlite::types::Value;

use crate::config::{CategoryMapping, StatusCodes};
use crate::schema::SchemaVersion;
use crate::templates::DocumentType;

/// What to select for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionCriteria {
    /// Class codes (legacy schema).
    pub classes: Vec<i64>,
    /// Route codes (current schema).
    pub routes: Vec<String>,
    pub entrants: Vec<i64>,
    pub min_entrant: Option<i64>,
    pub finishers_only: bool,
    pub duplicates_only: bool,
    pub reprints_only: bool,
    /// When non-zero, no real entrant is selected.
    pub blanks: u32,
    /// Blank forms carry no pillion.
    pub solo: bool,
}

impl SelectionCriteria {
    pub fn wants_blanks(&self) -> bool {
        self.blanks > 0
    }

    /// Classes to generate blanks for. Routes are mapped through the
    /// standard table when no class is given; neither means the generic
    /// form.
    pub fn blank_classes(&self, categories: &CategoryMapping) -> Vec<i64> {
        if !self.classes.is_empty() {
            return self.classes.clone();
        }
        if !self.routes.is_empty() {
            return self.routes.iter().map(|r| categories.standard_class(r)).collect();
        }
        vec![0]
    }

    /// Filters the given schema cannot apply.
    pub fn unsupported_filters(&self, schema: SchemaVersion) -> Vec<&'static str> {
        let mut ignored = vec![];
        match schema {
            SchemaVersion::Legacy => {
                if !self.routes.is_empty() {
                    ignored.push("route");
                }
                if self.min_entrant.is_some() {
                    ignored.push("minimum entrant");
                }
                if self.finishers_only {
                    ignored.push("finishers");
                }
                if self.duplicates_only {
                    ignored.push("duplicates");
                }
                if self.reprints_only {
                    ignored.push("reprints");
                }
            }
            SchemaVersion::Current => {
                if !self.classes.is_empty() && !self.wants_blanks() {
                    ignored.push("class");
                }
            }
        }
        ignored
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Join {
    And,
    Or,
}

impl Join {
    fn keyword(self) -> &'static str {
        match self {
            Join::And => " AND ",
            Join::Or => " OR ",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    In { column: &'static str, values: Vec<Value> },
    Equals { column: &'static str, value: Value },
    AtLeast { column: &'static str, value: Value },
    /// Matches no entrant at all.
    Never,
}

impl Clause {
    fn render(&self, params: &mut Vec<Value>) -> String {
        match self {
            Clause::In { column, values } => {
                let marks = vec!["?"; values.len()].join(", ");
                params.extend(values.iter().cloned());
                format!("{column} IN ({marks})")
            }
            Clause::Equals { column, value } => {
                params.push(value.clone());
                format!("{column} = ?")
            }
            Clause::AtLeast { column, value } => {
                params.push(value.clone());
                format!("{column} >= ?")
            }
            Clause::Never => "EntrantID < 0".to_string(),
        }
    }
}

/// Clauses joined by a single operator.
#[derive(Debug, Clone, PartialEq)]
pub struct ClauseGroup {
    pub join: Join,
    pub clauses: Vec<Clause>,
}

impl ClauseGroup {
    pub fn any(clauses: Vec<Clause>) -> Self {
        Self { join: Join::Or, clauses }
    }

    pub fn all(clauses: Vec<Clause>) -> Self {
        Self { join: Join::And, clauses }
    }

    pub fn single(clause: Clause) -> Self {
        Self::all(vec![clause])
    }
}

/// Groups are always combined with AND.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    pub groups: Vec<ClauseGroup>,
}

impl Predicate {
    pub fn push(&mut self, group: ClauseGroup) {
        if !group.clauses.is_empty() {
            self.groups.push(group);
        }
    }

    /// Renders ` WHERE ...` (or nothing) and appends the bound values.
    pub fn render(&self, params: &mut Vec<Value>) -> String {
        if self.groups.is_empty() {
            return String::new();
        }
        let groups: Vec<String> = self
            .groups
            .iter()
            .map(|group| {
                let parts: Vec<String> =
                    group.clauses.iter().map(|c| c.render(params)).collect();
                if parts.len() > 1 {
                    format!("({})", parts.join(group.join.keyword()))
                } else {
                    parts.join("")
                }
            })
            .collect();
        format!(" WHERE {}", groups.join(" AND "))
    }
}

/// A ready-to-run entrant query.
#[derive(Debug, Clone, PartialEq)]
pub struct EntrantQuery {
    pub sql: String,
    pub params: Vec<Value>,
    pub schema: SchemaVersion,
}

impl EntrantQuery {
    pub fn is_current_schema(&self) -> bool {
        self.schema == SchemaVersion::Current
    }
}

fn integers(values: &[i64]) -> Vec<Value> {
    values.iter().map(|v| Value::Integer(*v)).collect()
}

fn texts(values: &[String]) -> Vec<Value> {
    values.iter().map(|v| Value::Text(v.clone())).collect()
}

/// Category-or-entrant group. A record matching either list is selected.
fn category_or_entrant(
    column: &'static str,
    category: Vec<Value>,
    entrants: &[i64],
) -> ClauseGroup {
    let mut clauses = vec![];
    if !category.is_empty() {
        clauses.push(Clause::In { column, values: category });
    }
    if !entrants.is_empty() {
        clauses.push(Clause::In { column: "EntrantID", values: integers(entrants) });
    }
    ClauseGroup::any(clauses)
}

const LEGACY_SELECT: &str = "SELECT EntrantID,ifnull(Bike,''),ifnull(BikeReg,'')\
,ifnull(RiderName,'') AS RiderName,ifnull(RiderFirst,''),CAST(ifnull(RiderIBA,'') AS TEXT)\
,ifnull(PillionName,''),ifnull(PillionFirst,''),CAST(ifnull(PillionIBA,'') AS TEXT)\
,ifnull(OdoKms,0),'',ifnull(Class,0)\
,ifnull(Phone,''),ifnull(Email,''),ifnull(NokName,''),ifnull(NokRelation,''),ifnull(NokPhone,'')\
,substr(RiderTrim,length(rtrim(RiderTrim,replace(RiderTrim,' ','')))+1) AS RiderLast,0 \
FROM (SELECT *,trim(ifnull(RiderName,'')) AS RiderTrim FROM entrants)";

const LEGACY_ORDER: &str = " ORDER BY RiderLast, RiderName, EntrantID";

// A missing RiderLast falls back to the last word of the composed name, in
// SQL, so the sort key and the printed surname agree.
const CURRENT_SELECT: &str = "SELECT EntrantID,ifnull(Bike,''),ifnull(BikeReg,'')\
,RiderFull AS RiderName,ifnull(RiderFirst,'') AS RiderFirstName,CAST(ifnull(RiderIBA,'') AS TEXT)\
,trim(ifnull(PillionFirst,'') || ' ' || ifnull(PillionLast,'')),ifnull(PillionFirst,'')\
,CAST(ifnull(PillionIBA,'') AS TEXT),ifnull(OdoCounts,''),ifnull(Route,''),0\
,ifnull(Phone,''),ifnull(Email,''),ifnull(NokName,''),ifnull(NokRelation,''),ifnull(NokPhone,'')\
,CASE WHEN trim(ifnull(RiderLast,''))='' \
THEN substr(RiderFull,length(rtrim(RiderFull,replace(RiderFull,' ','')))+1) \
ELSE trim(RiderLast) END AS RiderSurname,ifnull(EntrantStatus,0) \
FROM (SELECT *,trim(ifnull(RiderFirst,'') || ' ' || ifnull(RiderLast,'')) AS RiderFull \
FROM entrants)";

const CURRENT_ORDER: &str = " ORDER BY RiderSurname, RiderFirstName, EntrantID";

/// Legacy schema: class codes and entrant numbers only.
pub fn legacy_predicate(criteria: &SelectionCriteria) -> Predicate {
    let mut predicate = Predicate::default();
    if criteria.wants_blanks() {
        predicate.push(ClauseGroup::single(Clause::Never));
        return predicate;
    }
    predicate.push(category_or_entrant("Class", integers(&criteria.classes), &criteria.entrants));
    predicate
}

/// Current schema: routes, certificate state, finisher status and a
/// minimum entrant number.
pub fn current_predicate(
    criteria: &SelectionCriteria,
    doc: &DocumentType,
    status: &StatusCodes,
) -> Predicate {
    let mut predicate = Predicate::default();
    if criteria.wants_blanks() {
        predicate.push(ClauseGroup::single(Clause::Never));
        return predicate;
    }

    predicate.push(category_or_entrant("Route", texts(&criteria.routes), &criteria.entrants));

    if doc.is_certificates() {
        let delivered = if criteria.duplicates_only { "Y" } else { "N" };
        predicate.push(ClauseGroup::single(Clause::Equals {
            column: "CertificateDelivered",
            value: Value::Text(delivered.to_string()),
        }));
        if criteria.reprints_only {
            predicate.push(ClauseGroup::single(Clause::Equals {
                column: "CertificateAvailable",
                value: Value::Text("N".to_string()),
            }));
        }
    }

    if criteria.finishers_only {
        predicate.push(ClauseGroup::single(Clause::In {
            column: "EntrantStatus",
            values: integers(&[status.finisher, status.late_finisher]),
        }));
    }

    if let Some(min) = criteria.min_entrant {
        predicate.push(ClauseGroup::single(Clause::AtLeast {
            column: "EntrantID",
            value: Value::Integer(min),
        }));
    }

    predicate
}

pub fn legacy_query(criteria: &SelectionCriteria) -> EntrantQuery {
    let mut params = vec![];
    let filter = legacy_predicate(criteria).render(&mut params);
    EntrantQuery {
        sql: format!("{LEGACY_SELECT}{filter}{LEGACY_ORDER}"),
        params,
        schema: SchemaVersion::Legacy,
    }
}

pub fn current_query(
    criteria: &SelectionCriteria,
    doc: &DocumentType,
    status: &StatusCodes,
) -> EntrantQuery {
    let mut params = vec![];
    let filter = current_predicate(criteria, doc, status).render(&mut params);
    EntrantQuery {
        sql: format!("{CURRENT_SELECT}{filter}{CURRENT_ORDER}"),
        params,
        schema: SchemaVersion::Current,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(predicate: &Predicate) -> (String, Vec<Value>) {
        let mut params = vec![];
        let sql = predicate.render(&mut params);
        (sql, params)
    }

    #[test]
    fn test_no_filters_no_where() {
        let (sql, params) = rendered(&legacy_predicate(&SelectionCriteria::default()));
        assert_eq!(sql, "");
        assert!(params.is_empty());
    }

    #[test]
    fn test_class_and_entrant_are_disjoint() {
        let criteria = SelectionCriteria {
            classes: vec![2, 4],
            entrants: vec![17],
            ..Default::default()
        };
        let (sql, params) = rendered(&legacy_predicate(&criteria));
        assert_eq!(sql, " WHERE (Class IN (?, ?) OR EntrantID IN (?))");
        assert_eq!(params, vec![Value::Integer(2), Value::Integer(4), Value::Integer(17)]);
    }

    #[test]
    fn test_blanks_match_nothing() {
        let criteria = SelectionCriteria {
            classes: vec![2],
            entrants: vec![17],
            blanks: 3,
            ..Default::default()
        };
        let (sql, params) = rendered(&legacy_predicate(&criteria));
        assert_eq!(sql, " WHERE EntrantID < 0");
        assert!(params.is_empty());

        let (sql, _) = rendered(&current_predicate(
            &criteria,
            &DocumentType::certificates(),
            &StatusCodes::default(),
        ));
        assert_eq!(sql, " WHERE EntrantID < 0");
    }

    #[test]
    fn test_current_filters_are_conjunctive() {
        let criteria = SelectionCriteria {
            routes: vec!["A-NC".into()],
            entrants: vec![5, 6],
            min_entrant: Some(3),
            finishers_only: true,
            reprints_only: true,
            ..Default::default()
        };
        let (sql, params) = rendered(&current_predicate(
            &criteria,
            &DocumentType::certificates(),
            &StatusCodes::default(),
        ));
        assert_eq!(
            sql,
            " WHERE (Route IN (?) OR EntrantID IN (?, ?)) AND CertificateDelivered = ? \
             AND CertificateAvailable = ? AND EntrantStatus IN (?, ?) AND EntrantID >= ?"
        );
        assert_eq!(params.len(), 8);
        assert_eq!(params[3], Value::Text("N".into()));
        assert_eq!(params[4], Value::Text("N".into()));
        assert_eq!(params[5], Value::Integer(8));
        assert_eq!(params[6], Value::Integer(9));
        assert_eq!(params[7], Value::Integer(3));
    }

    #[test]
    fn test_duplicates_select_delivered() {
        let criteria = SelectionCriteria {
            duplicates_only: true,
            ..Default::default()
        };
        let (sql, params) = rendered(&current_predicate(
            &criteria,
            &DocumentType::certificates(),
            &StatusCodes::default(),
        ));
        assert_eq!(sql, " WHERE CertificateDelivered = ?");
        assert_eq!(params, vec![Value::Text("Y".into())]);
    }

    #[test]
    fn test_certificate_flags_only_for_certs() {
        let criteria = SelectionCriteria {
            duplicates_only: true,
            ..Default::default()
        };
        let (sql, _) = rendered(&current_predicate(
            &criteria,
            &DocumentType::new("rlogs"),
            &StatusCodes::default(),
        ));
        assert_eq!(sql, "");
    }

    #[test]
    fn test_query_is_ordered_by_surname() {
        let query = legacy_query(&SelectionCriteria::default());
        assert!(query.sql.ends_with("ORDER BY RiderLast, RiderName, EntrantID"));
        assert!(!query.is_current_schema());

        let query = current_query(
            &SelectionCriteria::default(),
            &DocumentType::new("rlogs"),
            &StatusCodes::default(),
        );
        assert!(query.sql.ends_with("ORDER BY RiderSurname, RiderFirstName, EntrantID"));
        assert!(query.is_current_schema());
    }

    #[test]
    fn test_blank_classes_default_to_generic() {
        let categories = CategoryMapping::default();
        assert_eq!(SelectionCriteria::default().blank_classes(&categories), vec![0]);
        let criteria = SelectionCriteria {
            classes: vec![3, 1],
            routes: vec!["A-NC".into()],
            ..Default::default()
        };
        assert_eq!(criteria.blank_classes(&categories), vec![3, 1]);
    }

    #[test]
    fn test_blank_classes_from_routes() {
        let criteria = SelectionCriteria {
            routes: vec!["C-SC".into(), "A-NC".into(), "Z-99".into()],
            blanks: 2,
            ..Default::default()
        };
        assert_eq!(criteria.blank_classes(&CategoryMapping::default()), vec![4, 2, 0]);
    }

    #[test]
    fn test_unsupported_filters_per_schema() {
        let criteria = SelectionCriteria {
            classes: vec![4],
            routes: vec!["C-SC".into()],
            min_entrant: Some(10),
            reprints_only: true,
            ..Default::default()
        };
        assert_eq!(criteria.unsupported_filters(SchemaVersion::Current), vec!["class"]);
        assert_eq!(
            criteria.unsupported_filters(SchemaVersion::Legacy),
            vec!["route", "minimum entrant", "reprints"]
        );

        // classes still pick the blank forms
        let blanks = SelectionCriteria { blanks: 1, ..criteria };
        assert!(blanks.unsupported_filters(SchemaVersion::Current).is_empty());
        assert!(SelectionCriteria::default()
            .unsupported_filters(SchemaVersion::Legacy)
            .is_empty());
    }
}

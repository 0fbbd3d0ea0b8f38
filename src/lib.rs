//! RBLRDOX - RBLR1000 Document Generator
//!
//! Prints disclaimers (`legal`), receipt logs (`rlogs`) and ride
//! certificates (`certs`) from the entrants held in a rally database.
//!
//! Routes (class): A-NC [2], B-NAC [1], C-SC [4], D-SAC [3], E-5C [6], F-5AC [7].
//! Late (>24hr) certificates: B-NAC [8], A-NC [9], D-SAC [10], C-SC [11].

pub mod config;
pub mod entrant;
pub mod logging;
pub mod pipeline;
pub mod print;
pub mod schema;
pub mod selection;
pub mod templates;

pub use config::{CategoryMapping, EventConfig, Settings, StatusCodes};
pub use entrant::{EntrantClassifier, EntrantRecord};
pub use pipeline::{AssemblyError, AssemblyReport, DocumentAssembler, RenderContext, RenderOutcome};
pub use print::PageLayout;
pub use schema::{SchemaAdapter, SchemaVersion};
pub use selection::{EntrantQuery, SelectionCriteria};
pub use templates::{DocumentType, HandlebarsEngine, TemplateEngine, TemplateResolver};

pub const APP_TITLE: &str = "RBLRDOX";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

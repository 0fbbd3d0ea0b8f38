//! Document Assembler - Single Entry Point
//!
//! Output is always `[header][body in selection order][footer]`. Header and
//! footer failures abort the run; a record that cannot be rendered is
//! skipped and the run carries on.

use rusqlite::{params_from_iter, Connection};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::EventConfig;
use crate::entrant::{formatted_a_bike, EntrantClassifier, EntrantRecord};
use crate::print::PageLayout;
use crate::selection::{EntrantQuery, SelectionCriteria};
use crate::templates::{DocumentType, TemplateEngine, TemplateError, TemplateResolver};

pub const BLANK_RIDER: &str = "RIDER";
pub const BLANK_PILLION: &str = "PILLION";

#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("{0} doesn't exist, quitting")]
    MissingTemplate(PathBuf),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Output error: {0}")]
    Output(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// The value merged into an entrant template.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RenderContext {
    #[serde(flatten)]
    pub entrant: EntrantRecord,
    #[serde(rename = "ABike")]
    pub a_bike: String,
    pub has_pillion: bool,
    pub is_blank: bool,
    pub page_after: bool,
    pub event_date: String,
    pub event_title: String,
}

impl RenderContext {
    pub fn for_entrant(entrant: EntrantRecord, event: &EventConfig) -> Self {
        Self {
            a_bike: formatted_a_bike(&entrant.bike),
            has_pillion: entrant.has_pillion(),
            is_blank: false,
            page_after: true,
            event_date: event.event_date.clone(),
            event_title: event.event_title.clone(),
            entrant,
        }
    }

    /// A data-less form. Pillion presence comes from `solo` alone.
    pub fn blank(class: i64, solo: bool, event: &EventConfig) -> Self {
        let entrant = EntrantRecord {
            rider_name: BLANK_RIDER.to_string(),
            pillion_name: BLANK_PILLION.to_string(),
            class,
            ..EntrantRecord::default()
        };
        Self {
            a_bike: String::new(),
            has_pillion: !solo,
            is_blank: true,
            page_after: true,
            event_date: event.event_date.clone(),
            event_title: event.event_title.clone(),
            entrant,
        }
    }

    fn at_position(&self, layout: PageLayout, position: usize) -> Self {
        Self {
            page_after: layout.page_after(position),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Decode(String),
    NoTemplate { class: i64 },
    Render(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Decode(e) => write!(f, "unreadable row: {e}"),
            SkipReason::NoTemplate { class } => write!(f, "no template for class {class}"),
            SkipReason::Render(e) => write!(f, "render failed: {e}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    Rendered(String),
    Skipped(SkipReason),
}

/// Counts for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AssemblyReport {
    /// Real entrants rendered.
    pub populated: usize,
    pub blanks: usize,
    pub skipped: usize,
    /// Forms written to the body, pillion certificate copies included.
    pub forms: usize,
}

pub struct DocumentAssembler<'a, E: TemplateEngine> {
    engine: E,
    resolver: TemplateResolver,
    doc: DocumentType,
    layout: PageLayout,
    event: &'a EventConfig,
    classifier: EntrantClassifier,
}

impl<'a, E: TemplateEngine> DocumentAssembler<'a, E> {
    pub fn new(
        engine: E,
        templates_root: &Path,
        doc: DocumentType,
        event: &'a EventConfig,
        classifier: EntrantClassifier,
    ) -> Self {
        Self {
            engine,
            resolver: TemplateResolver::new(templates_root, &doc),
            layout: PageLayout::from_flag(event.double_page),
            doc,
            event,
            classifier,
        }
    }

    /// Runs header, body and footer into `out`.
    pub fn assemble<W: Write>(
        &self,
        conn: &Connection,
        query: &EntrantQuery,
        criteria: &SelectionCriteria,
        out: &mut W,
    ) -> Result<AssemblyReport, AssemblyError> {
        self.emit_top_tail(&self.resolver.header(), out)?;

        let mut report = self.assemble_entrants(conn, query, out)?;
        info!("{} populated forms generated", report.populated);

        if criteria.wants_blanks() {
            let blanks = self.assemble_blanks(criteria, out)?;
            report.blanks = blanks.blanks;
            report.skipped += blanks.skipped;
            report.forms += blanks.forms;
            info!("{} blank forms generated", report.blanks);
        }

        self.emit_top_tail(&self.resolver.footer(), out)?;
        out.flush()?;
        Ok(report)
    }

    fn emit_top_tail<W: Write>(&self, template: &Path, out: &mut W) -> Result<(), AssemblyError> {
        if !template.is_file() {
            return Err(AssemblyError::MissingTemplate(template.to_path_buf()));
        }
        let data = serde_json::to_value(self.event)?;
        let html = self.engine.render(template, &data)?;
        out.write_all(html.as_bytes())?;
        Ok(())
    }

    /// Renders one form.
    pub fn render_unit(&self, context: &RenderContext) -> RenderOutcome {
        let class = context.entrant.class;
        let Some(template) = self.resolver.resolve(class) else {
            return RenderOutcome::Skipped(SkipReason::NoTemplate { class });
        };
        let data = match serde_json::to_value(context) {
            Ok(data) => data,
            Err(e) => return RenderOutcome::Skipped(SkipReason::Render(e.to_string())),
        };
        match self.engine.render(&template, &data) {
            Ok(html) => RenderOutcome::Rendered(html),
            Err(e) => RenderOutcome::Skipped(SkipReason::Render(e.to_string())),
        }
    }

    /// Renders every copy a record needs starting at body `position`.
    /// Certificates get a second copy for the pillion. Either all copies
    /// render or the record is skipped.
    fn render_record(
        &self,
        context: &RenderContext,
        position: usize,
    ) -> Result<Vec<String>, SkipReason> {
        let copies = if self.doc.is_certificates() && context.has_pillion { 2 } else { 1 };
        let mut forms = Vec::with_capacity(copies);
        for copy in 0..copies {
            match self.render_unit(&context.at_position(self.layout, position + copy)) {
                RenderOutcome::Rendered(html) => forms.push(html),
                RenderOutcome::Skipped(reason) => return Err(reason),
            }
        }
        Ok(forms)
    }

    fn write_forms<W: Write>(forms: &[String], out: &mut W) -> Result<(), AssemblyError> {
        for html in forms {
            out.write_all(html.as_bytes())?;
        }
        Ok(())
    }

    fn assemble_entrants<W: Write>(
        &self,
        conn: &Connection,
        query: &EntrantQuery,
        out: &mut W,
    ) -> Result<AssemblyReport, AssemblyError> {
        debug!(sql = %query.sql, params = query.params.len(), "entrant query");
        let mut report = AssemblyReport::default();
        let mut stmt = conn.prepare(&query.sql)?;
        let mut rows = stmt.query(params_from_iter(query.params.iter()))?;

        while let Some(row) = rows.next()? {
            let mut entrant = match EntrantRecord::from_row(row, query.schema) {
                Ok(entrant) => entrant,
                Err(e) => {
                    warn!("Skipping row; {}", SkipReason::Decode(e.to_string()));
                    report.skipped += 1;
                    continue;
                }
            };
            self.classifier.classify(&mut entrant);
            let context = RenderContext::for_entrant(entrant, self.event);

            match self.render_record(&context, report.forms) {
                Ok(forms) => {
                    Self::write_forms(&forms, out)?;
                    report.forms += forms.len();
                    report.populated += 1;
                }
                Err(reason) => {
                    warn!(
                        "Skipping Entrant {} {}; Class={}; {}",
                        context.entrant.entrant_id,
                        context.entrant.rider_name,
                        context.entrant.class,
                        reason
                    );
                    report.skipped += 1;
                }
            }
        }
        Ok(report)
    }

    /// Blank forms in class-major order: every copy of the first class,
    /// then every copy of the next.
    fn assemble_blanks<W: Write>(
        &self,
        criteria: &SelectionCriteria,
        out: &mut W,
    ) -> Result<AssemblyReport, AssemblyError> {
        let mut report = AssemblyReport::default();
        for class in criteria.blank_classes(self.classifier.categories()) {
            for _ in 0..criteria.blanks {
                let context = RenderContext::blank(class, criteria.solo, self.event);
                match self.render_record(&context, report.forms) {
                    Ok(forms) => {
                        Self::write_forms(&forms, out)?;
                        report.forms += forms.len();
                        report.blanks += 1;
                    }
                    Err(reason) => {
                        warn!("Skipping blank form; Class={}; {}", class, reason);
                        report.skipped += 1;
                    }
                }
            }
        }
        Ok(report)
    }
}

//! RBLRDOX CLI
//!
//! Prints disclaimers (--doc legal), receipt logs (--doc rlogs) and ride
//! certificates (--doc certs) for the RBLR1000 into a single HTML file.

use anyhow::Context;
use clap::Parser;
use rusqlite::{Connection, OpenFlags};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

use rblrdox::{
    logging::init_logging, DocumentAssembler, DocumentType, EntrantClassifier, EventConfig,
    HandlebarsEngine, SchemaAdapter, SelectionCriteria, Settings, APP_TITLE, APP_VERSION,
};

#[derive(Parser)]
#[command(name = "rblrdox", version)]
#[command(about = "Prints disclaimers, receipt logs and ride certificates for the RBLR1000")]
struct Cli {
    /// Use this database
    #[arg(long, default_value = "ScoreMaster.db")]
    db: PathBuf,

    /// The name of the document to be produced (legal, rlogs, certs)
    #[arg(long, default_value = "rlogs")]
    doc: String,

    /// Output filename
    #[arg(long, default_value = "output.html")]
    to: PathBuf,

    /// Directory holding one template folder per document
    #[arg(long, default_value = ".")]
    templates: PathBuf,

    /// Print two per A4 portrait page
    #[arg(long)]
    a5: bool,

    /// Blank forms, rider only
    #[arg(long)]
    solo: bool,

    /// The class numbers to be selected. Default=all
    #[arg(long, value_delimiter = ',')]
    class: Vec<i64>,

    /// The route codes to be selected. Default=all
    #[arg(long, value_delimiter = ',')]
    route: Vec<String>,

    /// The entrant numbers to be selected. Default=all
    #[arg(long, value_delimiter = ',')]
    entrant: Vec<i64>,

    /// Lowest entrant number to be selected
    #[arg(long)]
    min_entrant: Option<i64>,

    /// Print <n> blanks only
    #[arg(long, default_value_t = 0)]
    blanks: u32,

    /// Finishers only
    #[arg(long)]
    finishers: bool,

    /// Certificates already delivered
    #[arg(long)]
    duplicates: bool,

    /// Certificates not yet available
    #[arg(long)]
    reprints: bool,

    /// Settings file overriding the route tables and status codes
    #[arg(long)]
    config: Option<PathBuf>,

    /// Show debug info
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn criteria(&self) -> SelectionCriteria {
        SelectionCriteria {
            classes: self.class.clone(),
            routes: self.route.iter().map(|r| r.trim().to_string()).collect(),
            entrants: self.entrant.clone(),
            min_entrant: self.min_entrant,
            finishers_only: self.finishers,
            duplicates_only: self.duplicates,
            reprints_only: self.reprints,
            blanks: self.blanks,
            solo: self.solo,
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };

    let conn = Connection::open_with_flags(&cli.db, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .with_context(|| format!("Cannot open database {}", cli.db.display()))?;
    info!("Using database {}", cli.db.display());

    let adapter = SchemaAdapter::detect(&conn).context("Cannot read rally parameters")?;
    let event = EventConfig {
        event_date: adapter.metadata.event_date(),
        event_title: adapter.metadata.title.clone(),
        ..EventConfig::new(cli.db.display().to_string(), cli.a5)
    };
    let doc = DocumentType::new(cli.doc.clone());
    info!(
        "Event date: {}; generating {} into {}",
        event.event_date,
        doc,
        cli.to.display()
    );

    let criteria = cli.criteria();
    let query = adapter.build_entrant_query(&criteria, &doc, &settings.status);
    let classifier = EntrantClassifier::new(adapter.schema, settings.categories, settings.status);
    let assembler = DocumentAssembler::new(
        HandlebarsEngine::new(),
        &cli.templates,
        doc,
        &event,
        classifier,
    );

    let file = File::create(&cli.to)
        .with_context(|| format!("Cannot create {}", cli.to.display()))?;
    let mut out = BufWriter::new(file);
    let report = assembler.assemble(&conn, &query, &criteria, &mut out)?;

    info!(
        populated = report.populated,
        blanks = report.blanks,
        skipped = report.skipped,
        forms = report.forms,
        "Finished"
    );
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    info!("{} v{}", APP_TITLE, APP_VERSION);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

use std::path::Path;
use std::sync::Arc;

use crate::browser::session::BrowserSession;
use crate::cli::config::{ExtractSettings, FillSettings, ServeSettings};
use crate::client::form::{Banner, FormState, SubmitOutcome};
use crate::client::submit::HttpSubmissionClient;
use crate::schema::assembler::SchemaAssembler;
use crate::schema::store::load_schema;
use crate::server::store::{JsonlSubmissionStore, MemorySubmissionStore, SubmissionStore};
use crate::server::{AppState, check_schema, serve};
use crate::trace::logger::TraceLogger;

// ============================================================================
// extract subcommand
// ============================================================================

pub fn cmd_extract(settings: &ExtractSettings, verbose: u8) -> Result<(), Box<dyn std::error::Error>> {
    if verbose > 0 {
        eprintln!("Extracting {} with driver {}...", settings.url, settings.driver);
    }

    let session = BrowserSession::launch(&settings.driver)?;
    let assembler = SchemaAssembler::new(&settings.url, &settings.output)
        .with_options(settings.options.clone())
        .with_tracer(TraceLogger::new(&settings.trace));

    let schema = assembler.run(session)?;

    println!("Scraping completed successfully!");
    println!("Form fields found: {}", schema.fields.len());
    println!("Validation rules: {}", schema.validation_rules.len());
    println!("Data saved to {}", settings.output);
    Ok(())
}

// ============================================================================
// serve subcommand
// ============================================================================

pub fn cmd_serve(settings: &ServeSettings, verbose: u8) -> Result<(), Box<dyn std::error::Error>> {
    match load_schema(Path::new(&settings.schema)) {
        Ok(schema) => {
            check_schema(&schema);
        }
        Err(e) => tracing::warn!("No schema to cross-check: {}", e),
    }

    let store: Arc<dyn SubmissionStore> = match &settings.store {
        Some(path) => Arc::new(JsonlSubmissionStore::open(path)?),
        None => Arc::new(MemorySubmissionStore::new()),
    };

    if verbose > 0 {
        eprintln!(
            "Storing submissions in {}",
            settings.store.as_deref().unwrap_or("memory")
        );
    }

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(serve(settings.port, AppState::new(store)))?;
    Ok(())
}

// ============================================================================
// fill subcommand
// ============================================================================

/// Fill and submit the form. Returns whether the server accepted it.
pub fn cmd_fill(
    settings: &FillSettings,
    values: &[(String, String)],
    verbose: u8,
) -> Result<bool, Box<dyn std::error::Error>> {
    let schema = load_schema(Path::new(&settings.schema))?;
    let mut form = FormState::new(&schema);

    for (id, value) in values {
        if schema.field(id).is_none() {
            eprintln!("Warning: schema has no field '{}'", id);
        }
        form.set_value(id, value.as_str());
    }

    let client = HttpSubmissionClient::new(&settings.api_base_url);
    if verbose > 0 {
        eprintln!("Submitting {} fields to {}", schema.fields.len(), client.endpoint());
    }

    match form.submit(&client) {
        SubmitOutcome::Invalid(failures) => {
            for input in form.render() {
                if let Some(message) = failures.get(&input.field_id) {
                    println!("  {}: {}", input.label.as_deref().unwrap_or(&input.field_id), message);
                }
            }
            Ok(false)
        }
        SubmitOutcome::Sent(banner) => {
            println!("{}", banner.text());
            Ok(matches!(banner, Banner::Success(_)))
        }
    }
}

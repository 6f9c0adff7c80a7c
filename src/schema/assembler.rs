use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};

use tracing::{error, info};
use uuid::Uuid;

use crate::browser::loader::{LoadOptions, PageContext, ScopedContext, load_document};
use crate::dom::dom_model::Document;
use crate::error::PipelineError;
use crate::extract::{fields::extract_fields, rules::extract_validation_rules, structure::extract_structure};
use crate::schema::schema_model::{FieldRecord, FormSchema, StructureSnapshot, ValidationRule};
use crate::schema::store::write_schema;
use crate::trace::logger::TraceLogger;
use crate::trace::trace::{RunEvent, Stage, digest_of};

/// Combine the three stage results into one schema. The top-level `steps`
/// list is reserved and always empty.
pub fn assemble(
    fields: Vec<FieldRecord>,
    validation_rules: BTreeMap<String, ValidationRule>,
    structure: StructureSnapshot,
) -> FormSchema {
    FormSchema {
        fields,
        validation_rules,
        structure,
        steps: Vec::new(),
    }
}

/// Runs one extraction: navigate, fields, validation rules, structure, then
/// persist. Stages run strictly in that order; any failure aborts the run
/// and nothing is written.
pub struct SchemaAssembler {
    url: String,
    output: PathBuf,
    options: LoadOptions,
    tracer: TraceLogger,
}

impl SchemaAssembler {
    pub fn new(url: impl Into<String>, output: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            output: output.into(),
            options: LoadOptions::default(),
            tracer: TraceLogger::disabled(),
        }
    }

    pub fn with_options(mut self, options: LoadOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_tracer(mut self, tracer: TraceLogger) -> Self {
        self.tracer = tracer;
        self
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Take ownership of `context` for the run. It is closed before this
    /// returns, on success and on every failure path.
    pub fn run<P: PageContext>(&self, context: P) -> Result<FormSchema, PipelineError> {
        let run_id = Uuid::new_v4().to_string();
        info!("Starting form extraction from {} (run {})", self.url, run_id);

        let extracted = {
            let mut context = ScopedContext::new(context);
            self.extract(&mut *context, &run_id)
        };

        let schema = match extracted {
            Ok(schema) => schema,
            Err(e) => {
                error!("Extraction failed: {}", e);
                return Err(e);
            }
        };

        let persisted = write_schema(&self.output, &schema);
        self.traced(&run_id, Stage::Persist, persisted, |_, event| event)
            .inspect_err(|e| error!("Failed to save form schema: {}", e))?;

        info!(
            "Form data extraction completed: {} fields, {} validation rules, saved to {}",
            schema.fields.len(),
            schema.validation_rules.len(),
            self.output.display()
        );

        Ok(schema)
    }

    fn extract<P: PageContext>(&self, context: &mut P, run_id: &str) -> Result<FormSchema, PipelineError> {
        let loaded = load_document(context, &self.url, &self.options);
        self.traced(run_id, Stage::Navigate, loaded, |_, event| event)?;

        let document: &mut dyn Document = context;

        let fields = self.traced(run_id, Stage::Fields, extract_fields(document), |fields, event| {
            let event = event.with_count(fields.len());
            match digest_of(fields) {
                Some(digest) => event.with_digest(digest),
                None => event,
            }
        })?;
        info!("Extracted {} form fields", fields.len());

        let rules = self.traced(
            run_id,
            Stage::ValidationRules,
            extract_validation_rules(document),
            |rules, event| event.with_count(rules.len()),
        )?;
        info!("Extracted {} validation rules", rules.len());

        let structure = self.traced(run_id, Stage::Structure, extract_structure(document), |s, event| {
            event.with_count(s.steps.len())
        })?;
        info!("Extracted UI structure ({} step containers)", structure.steps.len());

        Ok(assemble(fields, rules, structure))
    }

    /// Record the outcome of a stage and convert its error into a run error.
    fn traced<T, E>(
        &self,
        run_id: &str,
        stage: Stage,
        result: Result<T, E>,
        describe: impl FnOnce(&T, RunEvent) -> RunEvent,
    ) -> Result<T, PipelineError>
    where
        E: Display + Into<PipelineError>,
    {
        let event = RunEvent::now(run_id, stage);
        match result {
            Ok(value) => {
                self.tracer.log(&describe(&value, event));
                Ok(value)
            }
            Err(e) => {
                self.tracer.log(&event.failed(&e));
                Err(e.into())
            }
        }
    }
}

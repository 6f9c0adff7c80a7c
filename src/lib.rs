//! Mirror a web form: extract its field schema from a live page, render it
//! again from the persisted schema, and accept validated submissions.
//!
//! ```text
//! PageContext ──load──▶ Document ─┬─ extract::fields     ─┐
//!                                 ├─ extract::rules      ─┼─▶ schema::assembler ─▶ JSON artifact
//!                                 └─ extract::structure  ─┘
//! JSON artifact ─▶ client::form ─▶ POST /api/udyam/step1 ─▶ server ─▶ SubmissionStore
//! ```

pub mod browser;
pub mod cli;
pub mod client;
pub mod dom;
pub mod error;
pub mod extract;
pub mod schema;
pub mod server;
pub mod trace;

pub use error::{ExtractionError, NavigationError, PersistenceError, PipelineError, ValidationError};
pub use schema::assembler::SchemaAssembler;
pub use schema::schema_model::{FieldRecord, FormSchema, StructureSnapshot, ValidationRule};

use std::collections::{BTreeMap, HashMap};

use regex::Regex;
use serde_json::{Map, Value};
use tracing::warn;

use crate::client::submit::SubmissionClient;
use crate::error::ValidationError;
use crate::schema::schema_model::{FieldRecord, FormSchema};

// ============================================================================
// Field validation
// ============================================================================

/// Check one value against its field's declared constraints.
///
/// The checks run in a fixed order (required, length, pattern) and each
/// failing check overwrites the previous message, so the last failing check
/// is the one reported. A pattern the regex engine cannot compile (JS-only
/// syntax such as lookaround) fails the field rather than passing it.
pub fn validate_field(field: &FieldRecord, value: &str) -> Option<String> {
    let name = field.display_name();
    let mut message = None;

    if field.required && value.trim().is_empty() {
        message = Some(format!("{} is required", name));
    }

    if let Some(max) = field.max_length.filter(|m| *m > 0) {
        if value.chars().count() > max as usize {
            message = Some(format!("{} must be at most {} characters", name, max));
        }
    }

    if let Some(pattern) = field.pattern.as_deref().filter(|p| !p.is_empty()) {
        match Regex::new(pattern) {
            Ok(regex) if !regex.is_match(value) => {
                message = Some(format!("{} format is invalid", name));
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Cannot compile pattern on {}: {}", field.id, e);
                message = Some(format!("{} format cannot be checked", name));
            }
        }
    }

    message
}

// ============================================================================
// Rendering
// ============================================================================

/// One input as the renderer should draw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedInput {
    pub field_id: String,
    /// `None` for hidden fields, which get no label.
    pub label: Option<String>,
    pub input_type: String,
    pub value: String,
    pub placeholder: String,
    /// Only set for a positive limit.
    pub max_length: Option<u32>,
    pub error: Option<String>,
}

/// Status line shown after a submission attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Banner {
    Success(String),
    Failure(String),
}

impl Banner {
    pub fn text(&self) -> &str {
        match self {
            Banner::Success(text) | Banner::Failure(text) => text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Client-side validation failed; nothing was sent.
    Invalid(ValidationError),
    Sent(Banner),
}

// ============================================================================
// Form state
// ============================================================================

/// A form rendered from a schema, with its in-memory value store.
pub struct FormState {
    fields: Vec<FieldRecord>,
    values: HashMap<String, String>,
    errors: BTreeMap<String, String>,
    banner: Option<Banner>,
}

impl FormState {
    pub fn new(schema: &FormSchema) -> Self {
        Self::from_fields(schema.fields.clone())
    }

    pub fn from_fields(fields: Vec<FieldRecord>) -> Self {
        Self {
            fields,
            values: HashMap::new(),
            errors: BTreeMap::new(),
            banner: None,
        }
    }

    pub fn fields(&self) -> &[FieldRecord] {
        &self.fields
    }

    pub fn render(&self) -> Vec<RenderedInput> {
        self.fields
            .iter()
            .map(|field| RenderedInput {
                field_id: field.id.clone(),
                label: (field.field_type != "hidden").then(|| field.display_name().to_string()),
                input_type: if field.field_type.is_empty() {
                    "text".to_string()
                } else {
                    field.field_type.clone()
                },
                value: self.value(&field.id).to_string(),
                placeholder: field.placeholder.clone(),
                max_length: field.max_length.filter(|m| *m > 0),
                error: self.errors.get(&field.id).cloned(),
            })
            .collect()
    }

    /// Store a value and clear any error shown for that field.
    pub fn set_value(&mut self, field_id: &str, value: impl Into<String>) {
        self.values.insert(field_id.to_string(), value.into());
        self.errors.remove(field_id);
    }

    pub fn value(&self, field_id: &str) -> &str {
        self.values.get(field_id).map(String::as_str).unwrap_or("")
    }

    pub fn errors(&self) -> &BTreeMap<String, String> {
        &self.errors
    }

    pub fn banner(&self) -> Option<&Banner> {
        self.banner.as_ref()
    }

    /// Validate every field against its current value.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut failures = ValidationError::default();
        for field in &self.fields {
            if let Some(message) = validate_field(field, self.value(&field.id)) {
                failures.insert(field.id.clone(), message);
            }
        }

        if failures.is_empty() { Ok(()) } else { Err(failures) }
    }

    /// Stored values keyed by each field's submission key. Fields that were
    /// never given a value are left out; on duplicate keys the later field
    /// wins.
    pub fn payload(&self) -> Map<String, Value> {
        let mut payload = Map::new();
        for field in &self.fields {
            if let Some(value) = self.values.get(&field.id) {
                payload.insert(field.submission_key().to_string(), Value::String(value.clone()));
            }
        }
        payload
    }

    /// Validate, then send. Validation failures replace the current error
    /// set and abort before any request is made.
    pub fn submit(&mut self, client: &dyn SubmissionClient) -> SubmitOutcome {
        if let Err(failures) = self.validate() {
            self.errors = failures.errors.clone();
            return SubmitOutcome::Invalid(failures);
        }
        self.errors.clear();

        let banner = match client.submit(&self.payload()) {
            Ok(reply) if reply.accepted => {
                self.values.clear();
                Banner::Success(match reply.message {
                    Some(message) => format!("Submitted successfully: {}", message),
                    None => "Submitted successfully".to_string(),
                })
            }
            Ok(reply) => Banner::Failure(format!(
                "Error: {}",
                reply.message.unwrap_or_else(|| "request rejected".to_string())
            )),
            Err(e) => {
                warn!("Submission failed: {}", e);
                Banner::Failure("Failed to submit".to_string())
            }
        };

        self.banner = Some(banner.clone());
        SubmitOutcome::Sent(banner)
    }
}

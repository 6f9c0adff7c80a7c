use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::error::ValidationError;

static AADHAAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{12}$").expect("valid Aadhaar pattern"));

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z\s.]{2,100}$").expect("valid name pattern"));

pub const AADHAAR_KEY: &str = "aadhaarNumber";
pub const NAME_KEY: &str = "entrepreneurName";

/// Body of a step-one submission. Only these two members are read; anything
/// else the client sends is ignored, and a missing member counts as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Step1Submission {
    pub aadhaar_number: Option<String>,
    pub entrepreneur_name: Option<String>,
}

impl Step1Submission {
    /// Read the two members from any JSON value. A member that is missing
    /// or not a string is left unset, as is everything when the body is
    /// not an object.
    pub fn from_value(body: &Value) -> Self {
        let member = |key: &str| body.get(key).and_then(Value::as_str).map(str::to_string);
        Self {
            aadhaar_number: member(AADHAAR_KEY),
            entrepreneur_name: member(NAME_KEY),
        }
    }
}

/// A submission that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidStep1 {
    pub aadhaar_number: String,
    pub entrepreneur_name: String,
}

/// Exactly 12 ASCII digits, and 2 to 100 letters, whitespace or periods.
pub fn validate_step1(body: &Step1Submission) -> Result<ValidStep1, ValidationError> {
    let aadhaar = body.aadhaar_number.as_deref().unwrap_or("");
    let name = body.entrepreneur_name.as_deref().unwrap_or("");

    let mut errors = ValidationError::default();
    if !AADHAAR_PATTERN.is_match(aadhaar) {
        errors.insert(AADHAAR_KEY, "Invalid Aadhaar number");
    }
    if !NAME_PATTERN.is_match(name) {
        errors.insert(NAME_KEY, "Invalid name format");
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(ValidStep1 {
        aadhaar_number: aadhaar.to_string(),
        entrepreneur_name: name.to_string(),
    })
}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ============================================================================
// Persisted form schema
// ============================================================================

/// One discovered input-bearing element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldRecord {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub placeholder: String,
    pub required: bool,
    /// `None` means "no limit".
    pub max_length: Option<u32>,
    pub pattern: Option<String>,
    pub class_name: String,
    pub value: String,
    pub disabled: bool,
    pub readonly: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Custom `data-val-*` attributes. Absent, not empty, when the element
    /// does not opt into custom validation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<BTreeMap<String, String>>,
    /// Submission key used by the client; never produced by extraction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl FieldRecord {
    /// Text used for the field's label and in its error messages.
    pub fn display_name(&self) -> &str {
        if self.placeholder.is_empty() {
            &self.name
        } else {
            &self.placeholder
        }
    }

    /// Key the value is submitted under.
    pub fn submission_key(&self) -> &str {
        self.api_key.as_deref().unwrap_or(&self.id)
    }
}

/// Native validation constraints of one `input` element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRule {
    pub pattern: Option<String>,
    pub required: bool,
    #[serde(rename = "type")]
    pub field_type: String,
    pub min_length: Option<u32>,
    pub max_length: Option<u32>,
}

/// Summary of one immediate child of the form root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildSummary {
    pub tag_name: String,
    pub id: String,
    pub class_name: String,
    pub text_content: String,
}

/// Descriptor of the root form element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementDescriptor {
    pub tag_name: String,
    pub id: String,
    pub class_name: String,
    #[serde(rename = "innerHTML")]
    pub inner_html: String,
    pub attributes: BTreeMap<String, String>,
    pub children: Vec<ChildSummary>,
}

/// Identity of a field contained in a step container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepField {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDescriptor {
    /// 1-based position among detected step containers.
    pub index: usize,
    pub id: String,
    pub class_name: String,
    pub visible: bool,
    pub fields: Vec<StepField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureSnapshot {
    pub form: Option<ElementDescriptor>,
    pub steps: Vec<StepDescriptor>,
    pub styles: String,
    pub layout: Layout,
}

/// The artifact written by one extraction run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSchema {
    pub fields: Vec<FieldRecord>,
    pub validation_rules: BTreeMap<String, ValidationRule>,
    pub structure: StructureSnapshot,
    /// Reserved. Always written empty; step data lives in `structure.steps`.
    #[serde(default)]
    pub steps: Vec<StepDescriptor>,
}

impl FormSchema {
    pub fn field(&self, id: &str) -> Option<&FieldRecord> {
        self.fields.iter().find(|f| f.id == id)
    }
}

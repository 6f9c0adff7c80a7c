use std::collections::BTreeMap;

use crate::dom::dom_model::{Document, DomNode, DomTree};
use crate::dom::selectors::is_native_input;
use crate::error::ExtractionError;
use crate::extract::{non_empty, normalize_length};
use crate::schema::schema_model::ValidationRule;

/// Extract native validation rules keyed by field identity.
///
/// Only `input` elements contribute. Each is keyed by its id, or its name
/// when the id is empty; elements with neither are skipped. A later element
/// with the same key replaces an earlier one.
pub fn extract_validation_rules(
    document: &mut dyn Document,
) -> Result<BTreeMap<String, ValidationRule>, ExtractionError> {
    let tree = document.elements()?;
    Ok(rules_from_tree(&tree))
}

pub fn rules_from_tree(tree: &DomTree) -> BTreeMap<String, ValidationRule> {
    tree.select(is_native_input)
        .filter_map(|(_, node)| rule_key(node).map(|key| (key, to_rule(node))))
        .collect()
}

fn rule_key(node: &DomNode) -> Option<String> {
    non_empty(&node.props.id).or_else(|| non_empty(&node.props.name))
}

fn to_rule(node: &DomNode) -> ValidationRule {
    let props = &node.props;
    ValidationRule {
        pattern: non_empty(&props.pattern),
        required: props.required,
        field_type: props
            .input_type
            .clone()
            .unwrap_or_else(|| "text".to_string()),
        min_length: normalize_length(props.min_length),
        max_length: normalize_length(props.max_length),
    }
}

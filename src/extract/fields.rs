use std::collections::{BTreeMap, HashSet};

use crate::dom::dom_model::{Document, DomNode, DomTree};
use crate::dom::selectors::{
    VALIDATION_PREFIX, has_custom_validation, is_field_bearing, is_label_for,
};
use crate::error::ExtractionError;
use crate::extract::{non_empty, normalize_length};
use crate::schema::schema_model::FieldRecord;

/// Extract one `FieldRecord` per input, select and textarea, in document order.
pub fn extract_fields(document: &mut dyn Document) -> Result<Vec<FieldRecord>, ExtractionError> {
    let tree = document.elements()?;
    Ok(fields_from_tree(&tree))
}

/// Pure half of `extract_fields`, operating on an already captured tree.
pub fn fields_from_tree(tree: &DomTree) -> Vec<FieldRecord> {
    let mut assigned: HashSet<String> = HashSet::new();

    tree.select(is_field_bearing)
        .enumerate()
        .map(|(position, (_, node))| {
            let id = assign_id(&node.props.id, position, &assigned);
            assigned.insert(id.clone());
            to_field_record(tree, node, id)
        })
        .collect()
}

/// Native id when present and not yet taken, else `field_<position>`.
fn assign_id(native: &str, position: usize, assigned: &HashSet<String>) -> String {
    if !native.is_empty() && !assigned.contains(native) {
        return native.to_string();
    }

    let synthesized = format!("field_{}", position);
    if !assigned.contains(&synthesized) {
        return synthesized;
    }

    // A native id already spelled `field_<n>`; append a counter.
    (1..)
        .map(|n| format!("{}_{}", synthesized, n))
        .find(|candidate| !assigned.contains(candidate))
        .unwrap_or(synthesized)
}

fn to_field_record(tree: &DomTree, node: &DomNode, id: String) -> FieldRecord {
    let props = &node.props;

    FieldRecord {
        field_type: field_type(node),
        name: props.name.clone(),
        placeholder: props.placeholder.clone(),
        required: props.required || node.has_attribute("required"),
        max_length: normalize_length(props.max_length),
        pattern: non_empty(&props.pattern),
        class_name: props.class_name.clone(),
        value: props.value.clone(),
        disabled: props.disabled,
        readonly: props.read_only,
        label: find_label(tree, &props.id),
        validation: custom_validation(node),
        api_key: None,
        id,
    }
}

/// Native `type` property, else the lowercase tag name.
fn field_type(node: &DomNode) -> String {
    match node.props.input_type.as_deref() {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => node.tag.to_lowercase(),
    }
}

/// Text of the first `label[for=<id>]`, trimmed.
fn find_label(tree: &DomTree, id: &str) -> Option<String> {
    tree.nodes
        .iter()
        .find(|node| is_label_for(node, id))
        .map(|label| label.text_content.trim().to_string())
}

fn custom_validation(node: &DomNode) -> Option<BTreeMap<String, String>> {
    if !has_custom_validation(node) {
        return None;
    }

    Some(
        node.attributes
            .iter()
            .filter(|(name, _)| name.starts_with(VALIDATION_PREFIX))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect(),
    )
}

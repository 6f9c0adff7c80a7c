use crate::dom::dom_model::DomNode;

// ============================================================================
// Element selection predicates
//
// Each extractor scans a different slice of the document. The slices are
// named here so the differences are visible in one place:
//   fields     -> is_field_bearing   (input, select, textarea)
//   rules      -> is_native_input    (input only)
//   structure  -> is_form_root, is_step_container
// ============================================================================

const FIELD_BEARING_TAGS: [&str; 3] = ["input", "select", "textarea"];

/// Token that marks a step container when it appears inside a class or id.
pub const STEP_TOKEN: &str = "step";

/// Class names used by tabbed and paneled multi-step layouts.
pub const STEP_CONTAINER_CLASSES: [&str; 2] = ["tab-content", "panel"];

/// Attribute that turns on the source application's custom validation.
pub const VALIDATION_MARKER: &str = "data-val";

/// Prefix of the custom validation attributes collected per field.
pub const VALIDATION_PREFIX: &str = "data-val-";

/// Elements that can hold user-entered data.
pub fn is_field_bearing(node: &DomNode) -> bool {
    FIELD_BEARING_TAGS.contains(&node.tag.as_str())
}

/// Controls with native browser validation. Selects and textareas are
/// deliberately excluded from validation rules.
pub fn is_native_input(node: &DomNode) -> bool {
    node.tag == "input"
}

pub fn is_form_root(node: &DomNode) -> bool {
    node.tag == "form"
}

/// Heuristic for one page or tab of a multi-step form.
///
/// Matches a class attribute or id containing `step` (case-sensitive
/// substring, like `[class*="step"]`), or a `tab-content` / `panel` class.
pub fn is_step_container(node: &DomNode) -> bool {
    let class_attr = node.attribute("class").unwrap_or("");
    let id_attr = node.attribute("id").unwrap_or("");

    class_attr.contains(STEP_TOKEN)
        || id_attr.contains(STEP_TOKEN)
        || node
            .classes()
            .any(|class| STEP_CONTAINER_CLASSES.contains(&class))
}

/// `label[for=<id>]`. An empty id never matches.
pub fn is_label_for(node: &DomNode, id: &str) -> bool {
    !id.is_empty() && node.tag == "label" && node.attribute("for") == Some(id)
}

/// Whether the element opts into custom validation attributes.
pub fn has_custom_validation(node: &DomNode) -> bool {
    node.has_attribute(VALIDATION_MARKER)
}

/// A step container counts as visible only when neither the `hidden`
/// attribute nor its display style hides it.
pub fn is_visible(node: &DomNode) -> bool {
    !node.hidden && node.display.as_deref().map(str::trim) != Some("none")
}

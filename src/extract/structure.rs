use std::collections::BTreeMap;

use crate::dom::dom_model::{Document, DomNode, DomTree, LayoutMetrics, StyleSheet};
use crate::dom::selectors::{is_field_bearing, is_form_root, is_step_container, is_visible};
use crate::error::ExtractionError;
use crate::schema::schema_model::{
    ChildSummary, ElementDescriptor, Layout, StepDescriptor, StepField, StructureSnapshot,
};

pub const INNER_HTML_LIMIT: usize = 1000;
pub const CHILD_TEXT_LIMIT: usize = 200;
pub const STYLES_LIMIT: usize = 5000;
pub const TRUNCATION_MARKER: &str = "...";

/// Capture the form root, step containers, stylesheet text and layout.
pub fn extract_structure(
    document: &mut dyn Document,
) -> Result<StructureSnapshot, ExtractionError> {
    let tree = document.elements()?;
    let sheets = document.style_sheets()?;
    let layout = document.layout()?;

    Ok(structure_from_parts(&tree, &sheets, layout))
}

pub fn structure_from_parts(
    tree: &DomTree,
    sheets: &[StyleSheet],
    layout: LayoutMetrics,
) -> StructureSnapshot {
    let form = tree
        .select(is_form_root)
        .next()
        .map(|(index, node)| describe_element(tree, index, node));

    let steps = tree
        .select(is_step_container)
        .enumerate()
        .map(|(position, (index, node))| describe_step(tree, position + 1, index, node))
        .collect();

    StructureSnapshot {
        form,
        steps,
        styles: collect_styles(sheets),
        layout: Layout {
            width: layout.width,
            height: layout.height,
            title: layout.title,
        },
    }
}

fn describe_element(tree: &DomTree, index: usize, node: &DomNode) -> ElementDescriptor {
    ElementDescriptor {
        tag_name: node.tag_name(),
        id: node.props.id.clone(),
        class_name: node.props.class_name.clone(),
        inner_html: truncate_marked(&node.inner_html, INNER_HTML_LIMIT),
        attributes: node
            .attributes
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect::<BTreeMap<_, _>>(),
        children: tree
            .children(index)
            .map(|child| ChildSummary {
                tag_name: child.tag_name(),
                id: child.props.id.clone(),
                class_name: child.props.class_name.clone(),
                text_content: truncate(child.text_content.trim(), CHILD_TEXT_LIMIT),
            })
            .collect(),
    }
}

fn describe_step(tree: &DomTree, number: usize, index: usize, node: &DomNode) -> StepDescriptor {
    StepDescriptor {
        index: number,
        id: node.props.id.clone(),
        class_name: node.props.class_name.clone(),
        visible: is_visible(node),
        fields: tree
            .descendants(index)
            .filter(|d| is_field_bearing(d))
            .map(|field| StepField {
                id: field.props.id.clone(),
                name: field.props.name.clone(),
                field_type: field
                    .props
                    .input_type
                    .clone()
                    .unwrap_or_else(|| field.tag.clone()),
            })
            .collect(),
    }
}

/// Readable sheets' CSS joined by newlines; unreadable sheets add nothing
/// but an empty entry.
fn collect_styles(sheets: &[StyleSheet]) -> String {
    let joined = sheets
        .iter()
        .map(StyleSheet::css_text)
        .collect::<Vec<_>>()
        .join("\n");
    truncate_marked(&joined, STYLES_LIMIT)
}

/// First `limit` characters.
pub fn truncate(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

/// First `limit` characters followed by `...` when the text was longer.
pub fn truncate_marked(text: &str, limit: usize) -> String {
    if text.chars().count() > limit {
        let mut out = truncate(text, limit);
        out.push_str(TRUNCATION_MARKER);
        out
    } else {
        text.to_string()
    }
}

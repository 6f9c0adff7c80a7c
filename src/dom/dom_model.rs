use serde::{Deserialize, Serialize};

use crate::error::ExtractionError;

// ============================================================================
// Document snapshot model
// ============================================================================

/// Live DOM properties of one element at evaluation time.
///
/// These mirror what the browser reports for the element object, not the
/// declared markup: `required`/`disabled`/`readOnly` reflect current state and
/// `maxLength`/`minLength` use the native `-1` sentinel for "no limit".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveProps {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub input_type: Option<String>,
    #[serde(default)]
    pub placeholder: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default = "no_limit")]
    pub max_length: i64,
    #[serde(default = "no_limit")]
    pub min_length: i64,
    #[serde(default)]
    pub pattern: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub class_name: String,
}

fn no_limit() -> i64 {
    -1
}

impl Default for LiveProps {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            input_type: None,
            placeholder: String::new(),
            required: false,
            disabled: false,
            read_only: false,
            max_length: -1,
            min_length: -1,
            pattern: String::new(),
            value: String::new(),
            class_name: String::new(),
        }
    }
}

/// One element of the document, captured by value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomNode {
    /// Lowercase tag name.
    pub tag: String,
    /// Index of the parent element within the same `DomTree`.
    #[serde(default)]
    pub parent: Option<usize>,
    /// Attributes as declared, in source order.
    #[serde(default)]
    pub attributes: Vec<(String, String)>,
    #[serde(default)]
    pub props: LiveProps,
    #[serde(default)]
    pub hidden: bool,
    /// Computed `display` value, when the document reports one.
    #[serde(default)]
    pub display: Option<String>,
    #[serde(rename = "innerHTML", default)]
    pub inner_html: String,
    #[serde(default)]
    pub text_content: String,
}

impl DomNode {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    /// Whitespace-separated class tokens.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.props.class_name.split_whitespace()
    }

    /// The element's `tagName` as the DOM reports it for HTML documents.
    pub fn tag_name(&self) -> String {
        self.tag.to_uppercase()
    }
}

/// All elements of a document in document (pre-)order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomTree {
    pub nodes: Vec<DomNode>,
}

impl DomTree {
    pub fn new(nodes: Vec<DomNode>) -> Self {
        Self { nodes }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&DomNode> {
        self.nodes.get(index)
    }

    /// Indices and nodes matching `predicate`, in document order.
    pub fn select<'a, F>(&'a self, predicate: F) -> impl Iterator<Item = (usize, &'a DomNode)> + 'a
    where
        F: Fn(&DomNode) -> bool + 'a,
    {
        self.nodes
            .iter()
            .enumerate()
            .filter(move |(_, node)| predicate(node))
    }

    /// Immediate element children of `index`, in document order.
    pub fn children(&self, index: usize) -> impl Iterator<Item = &DomNode> + '_ {
        self.nodes
            .iter()
            .filter(move |node| node.parent == Some(index))
    }

    /// Whether `node` sits anywhere below `ancestor`.
    pub fn is_descendant(&self, node: usize, ancestor: usize) -> bool {
        let mut cursor = self.nodes.get(node).and_then(|n| n.parent);
        while let Some(parent) = cursor {
            if parent == ancestor {
                return true;
            }
            cursor = self.nodes.get(parent).and_then(|n| n.parent);
        }
        false
    }

    /// All descendants of `index`, in document order.
    pub fn descendants(&self, index: usize) -> impl Iterator<Item = &DomNode> + '_ {
        // Pre-order: a subtree is a contiguous run right after its root.
        self.nodes
            .iter()
            .enumerate()
            .skip(index + 1)
            .take_while(move |(i, _)| self.is_descendant(*i, index))
            .map(|(_, node)| node)
    }
}

/// One stylesheet attached to the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum StyleSheet {
    /// Rules the document lets us read, as CSS text.
    Readable { rules: Vec<String> },
    /// Rules hidden from scripts, typically a cross-origin sheet.
    Unreadable {
        #[serde(default)]
        href: Option<String>,
    },
}

impl StyleSheet {
    /// CSS text of the sheet; unreadable sheets yield an empty string.
    pub fn css_text(&self) -> String {
        match self {
            StyleSheet::Readable { rules } => rules.join("\n"),
            StyleSheet::Unreadable { .. } => String::new(),
        }
    }
}

/// Viewport size and title at evaluation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutMetrics {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

// ============================================================================
// Document capability
// ============================================================================

/// A loaded document that extractors can evaluate queries against.
///
/// Every call is an independent evaluation: nothing is cached between calls,
/// so a document whose live state changes may answer differently.
pub trait Document {
    fn elements(&mut self) -> Result<DomTree, ExtractionError>;
    fn style_sheets(&mut self) -> Result<Vec<StyleSheet>, ExtractionError>;
    fn layout(&mut self) -> Result<LayoutMetrics, ExtractionError>;
}

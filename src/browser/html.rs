use std::cell::Cell;
use std::rc::Rc;

use scraper::{ElementRef, Html, Selector};

use crate::browser::loader::{LoadOptions, PageContext, Viewport};
use crate::dom::dom_model::{Document, DomNode, DomTree, LayoutMetrics, LiveProps, StyleSheet};
use crate::error::{ExtractionError, LoadPhase, NavigationError};

const INPUT_TYPES: [&str; 22] = [
    "text", "password", "email", "number", "tel", "url", "search", "date",
    "datetime-local", "month", "week", "time", "color", "range", "checkbox",
    "radio", "file", "hidden", "submit", "reset", "button", "image",
];

// ============================================================================
// In-memory document
// ============================================================================

/// A static HTML document evaluated without a browser.
///
/// Live properties are derived from markup the way a browser would report
/// them right after parsing: no scripts run, so declared attributes are the
/// current state.
#[derive(Debug, Clone)]
pub struct HtmlDocument {
    tree: DomTree,
    sheets: Vec<StyleSheet>,
    title: String,
    viewport: Viewport,
}

impl HtmlDocument {
    pub fn parse(source: &str) -> Self {
        let html = Html::parse_document(source);
        let mut nodes = Vec::new();
        collect_nodes(html.root_element(), None, &mut nodes);

        let sheets = collect_sheets(&html);
        let title = Selector::parse("title")
            .ok()
            .and_then(|sel| html.select(&sel).next().map(|t| t.text().collect::<String>()))
            .map(|t| t.trim().to_string())
            .unwrap_or_default();

        Self {
            tree: DomTree::new(nodes),
            sheets,
            title,
            viewport: Viewport::default(),
        }
    }

    /// Replace the stylesheets reported for this document.
    pub fn with_style_sheets(mut self, sheets: Vec<StyleSheet>) -> Self {
        self.sheets = sheets;
        self
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    pub fn tree(&self) -> &DomTree {
        &self.tree
    }
}

impl Document for HtmlDocument {
    fn elements(&mut self) -> Result<DomTree, ExtractionError> {
        Ok(self.tree.clone())
    }

    fn style_sheets(&mut self) -> Result<Vec<StyleSheet>, ExtractionError> {
        Ok(self.sheets.clone())
    }

    fn layout(&mut self) -> Result<LayoutMetrics, ExtractionError> {
        Ok(LayoutMetrics {
            width: self.viewport.width,
            height: self.viewport.height,
            title: self.title.clone(),
        })
    }
}

fn collect_nodes(element: ElementRef<'_>, parent: Option<usize>, out: &mut Vec<DomNode>) {
    let index = out.len();
    out.push(to_dom_node(element, parent));

    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            collect_nodes(child_element, Some(index), out);
        }
    }
}

fn to_dom_node(element: ElementRef<'_>, parent: Option<usize>) -> DomNode {
    let el = element.value();
    let tag = el.name().to_lowercase();

    DomNode {
        props: live_props(element, &tag),
        parent,
        attributes: el
            .attrs()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        hidden: el.attr("hidden").is_some(),
        display: el.attr("style").and_then(inline_display),
        inner_html: element.inner_html(),
        text_content: element.text().collect(),
        tag,
    }
}

fn live_props(element: ElementRef<'_>, tag: &str) -> LiveProps {
    let el = element.value();
    let attr = |name: &str| el.attr(name).unwrap_or("").to_string();
    let has = |name: &str| el.attr(name).is_some();

    let is_control = matches!(tag, "input" | "select" | "textarea" | "button");
    let is_text_control = matches!(tag, "input" | "textarea");

    let input_type = match tag {
        "input" => Some(normalize_input_type(el.attr("type"))),
        "select" if has("multiple") => Some("select-multiple".to_string()),
        "select" => Some("select-one".to_string()),
        "textarea" => Some("textarea".to_string()),
        "button" => Some(match el.attr("type").map(str::to_lowercase).as_deref() {
            Some(t @ ("reset" | "button")) => t.to_string(),
            _ => "submit".to_string(),
        }),
        _ => None,
    };

    let value = match tag {
        "input" => match (el.attr("value"), input_type.as_deref()) {
            (Some(v), _) => v.to_string(),
            (None, Some("checkbox" | "radio")) => "on".to_string(),
            _ => String::new(),
        },
        "textarea" => element.text().collect(),
        "select" => selected_option_value(element),
        _ => String::new(),
    };

    LiveProps {
        id: attr("id"),
        name: if is_control || tag == "form" { attr("name") } else { String::new() },
        placeholder: if is_text_control { attr("placeholder") } else { String::new() },
        required: is_control && tag != "button" && has("required"),
        disabled: is_control && has("disabled"),
        read_only: is_text_control && has("readonly"),
        max_length: if is_text_control { length_attr(el.attr("maxlength")) } else { -1 },
        min_length: if is_text_control { length_attr(el.attr("minlength")) } else { -1 },
        pattern: if tag == "input" { attr("pattern") } else { String::new() },
        class_name: attr("class"),
        input_type,
        value,
    }
}

/// Unknown or missing types fall back to `text`, as browsers do.
fn normalize_input_type(raw: Option<&str>) -> String {
    let lower = raw.unwrap_or("").trim().to_lowercase();
    if INPUT_TYPES.contains(&lower.as_str()) {
        lower
    } else {
        "text".to_string()
    }
}

fn length_attr(raw: Option<&str>) -> i64 {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|n| *n >= 0)
        .unwrap_or(-1)
}

fn inline_display(style: &str) -> Option<String> {
    style
        .split(';')
        .filter_map(|decl| decl.split_once(':'))
        .filter(|(prop, _)| prop.trim().eq_ignore_ascii_case("display"))
        .map(|(_, value)| value.trim().to_lowercase())
        .last()
}

fn selected_option_value(select: ElementRef<'_>) -> String {
    let options: Vec<ElementRef<'_>> = select
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|e| e.value().name() == "option")
        .collect();

    options
        .iter()
        .find(|o| o.value().attr("selected").is_some())
        .or_else(|| options.first())
        .map(|o| match o.value().attr("value") {
            Some(v) => v.to_string(),
            None => o
                .text()
                .collect::<String>()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" "),
        })
        .unwrap_or_default()
}

/// `<style>` blocks are readable; linked sheets are treated as cross-origin.
fn collect_sheets(html: &Html) -> Vec<StyleSheet> {
    let Ok(selector) = Selector::parse("style, link[rel~=\"stylesheet\"]") else {
        return Vec::new();
    };

    html.select(&selector)
        .map(|el| {
            if el.value().name() == "style" {
                let css = el.text().collect::<String>();
                let css = css.trim();
                StyleSheet::Readable {
                    rules: if css.is_empty() { vec![] } else { vec![css.to_string()] },
                }
            } else {
                StyleSheet::Unreadable {
                    href: el.value().attr("href").map(str::to_string),
                }
            }
        })
        .collect()
}

// ============================================================================
// In-memory page context
// ============================================================================

/// A page context serving fixed markup, for running the whole pipeline
/// without a browser. `None` markup behaves like an unreachable host.
pub struct StaticPage {
    source: Option<String>,
    sheets: Option<Vec<StyleSheet>>,
    document: Option<HtmlDocument>,
    closed: Rc<Cell<bool>>,
}

impl StaticPage {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            sheets: None,
            document: None,
            closed: Rc::new(Cell::new(false)),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            source: None,
            sheets: None,
            document: None,
            closed: Rc::new(Cell::new(false)),
        }
    }

    pub fn with_style_sheets(mut self, sheets: Vec<StyleSheet>) -> Self {
        self.sheets = Some(sheets);
        self
    }

    /// Flag that flips to `true` once the context is closed.
    pub fn closed_flag(&self) -> Rc<Cell<bool>> {
        Rc::clone(&self.closed)
    }

    fn document(&mut self) -> Result<&mut HtmlDocument, ExtractionError> {
        if self.closed.get() {
            return Err(ExtractionError::Evaluation {
                query: "document".into(),
                reason: "page context is closed".into(),
            });
        }
        self.document.as_mut().ok_or(ExtractionError::NotLoaded)
    }
}

impl Document for StaticPage {
    fn elements(&mut self) -> Result<DomTree, ExtractionError> {
        self.document()?.elements()
    }

    fn style_sheets(&mut self) -> Result<Vec<StyleSheet>, ExtractionError> {
        self.document()?.style_sheets()
    }

    fn layout(&mut self) -> Result<LayoutMetrics, ExtractionError> {
        self.document()?.layout()
    }
}

impl PageContext for StaticPage {
    fn load(&mut self, url: &str, options: &LoadOptions) -> Result<(), NavigationError> {
        let source = self.source.as_deref().ok_or_else(|| NavigationError::Unreachable {
            url: url.to_string(),
            reason: "no such host".into(),
        })?;

        let selector = Selector::parse(&options.ready_selector).map_err(|e| {
            NavigationError::Unreachable {
                url: url.to_string(),
                reason: format!("invalid ready selector '{}': {:?}", options.ready_selector, e),
            }
        })?;

        if Html::parse_document(source).select(&selector).next().is_none() {
            return Err(NavigationError::Timeout {
                phase: LoadPhase::ReadySelector,
                limit_ms: options.ready_timeout.as_millis() as u64,
            });
        }

        let mut document = HtmlDocument::parse(source).with_viewport(options.viewport);
        if let Some(sheets) = &self.sheets {
            document = document.with_style_sheets(sheets.clone());
        }
        self.document = Some(document);
        Ok(())
    }

    fn close(&mut self) {
        self.document = None;
        self.closed.set(true);
    }
}

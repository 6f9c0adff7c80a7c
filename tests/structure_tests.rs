mod common;

use common::{AADHAAR_ID, udyam_document};
use form_mirror::browser::html::HtmlDocument;
use form_mirror::browser::loader::Viewport;
use form_mirror::dom::dom_model::{DomTree, LayoutMetrics, StyleSheet};
use form_mirror::extract::structure::{
    CHILD_TEXT_LIMIT, INNER_HTML_LIMIT, STYLES_LIMIT, TRUNCATION_MARKER, extract_structure,
    structure_from_parts, truncate, truncate_marked,
};

fn layout() -> LayoutMetrics {
    LayoutMetrics {
        width: 800,
        height: 600,
        title: "t".into(),
    }
}

// ============================================================================
// Form root
// ============================================================================

#[test]
fn test_form_descriptor() {
    let mut doc = udyam_document();
    let structure = extract_structure(&mut doc).unwrap();
    let form = structure.form.unwrap();

    assert_eq!(form.tag_name, "FORM");
    assert_eq!(form.id, "form1");
    assert_eq!(form.class_name, "udyam-form");
    assert_eq!(form.attributes.get("method").map(String::as_str), Some("post"));
    assert_eq!(
        form.attributes.get("action").map(String::as_str),
        Some("./UdyamRegistration.aspx")
    );
    assert!(form.inner_html.contains(AADHAAR_ID));
}

#[test]
fn test_form_children_are_immediate_only() {
    let mut doc = udyam_document();
    let form = extract_structure(&mut doc).unwrap().form.unwrap();

    let tags: Vec<&str> = form.children.iter().map(|c| c.tag_name.as_str()).collect();
    assert_eq!(tags, vec!["INPUT", "DIV", "DIV", "DIV", "DIV"]);

    let card = &form.children[1];
    assert_eq!(card.class_name, "card");
    assert_eq!(card.text_content, "Aadhaar Verification With OTP");
    assert_eq!(form.children[2].id, "step1");
}

#[test]
fn test_no_form_gives_none() {
    let mut doc = HtmlDocument::parse("<html><body><div class='step'>x</div></body></html>");
    let structure = extract_structure(&mut doc).unwrap();

    assert!(structure.form.is_none());
    assert_eq!(structure.steps.len(), 1);
}

#[test]
fn test_first_form_is_the_root() {
    let mut doc = HtmlDocument::parse(
        r#"<form id="a"><input></form><form id="b"><input></form>"#,
    );
    let form = extract_structure(&mut doc).unwrap().form.unwrap();
    assert_eq!(form.id, "a");
}

#[test]
fn test_inner_html_truncated_with_marker() {
    let filler = "x".repeat(INNER_HTML_LIMIT + 50);
    let mut doc = HtmlDocument::parse(&format!("<form id='f'><p>{}</p></form>", filler));
    let form = extract_structure(&mut doc).unwrap().form.unwrap();

    assert_eq!(
        form.inner_html.chars().count(),
        INNER_HTML_LIMIT + TRUNCATION_MARKER.len()
    );
    assert!(form.inner_html.ends_with(TRUNCATION_MARKER));
    assert!(form.inner_html.starts_with("<p>"));
}

#[test]
fn test_child_text_truncated_without_marker() {
    let filler = "y".repeat(CHILD_TEXT_LIMIT + 20);
    let mut doc = HtmlDocument::parse(&format!("<form><div>  {}  </div></form>", filler));
    let form = extract_structure(&mut doc).unwrap().form.unwrap();

    assert_eq!(form.children[0].text_content, "y".repeat(CHILD_TEXT_LIMIT));
}

// ============================================================================
// Step containers
// ============================================================================

#[test]
fn test_steps_detected_in_order() {
    let mut doc = udyam_document();
    let steps = extract_structure(&mut doc).unwrap().steps;

    assert_eq!(steps.len(), 3);
    assert_eq!(steps.iter().map(|s| s.index).collect::<Vec<_>>(), vec![1, 2, 3]);
    assert_eq!(steps[0].id, "step1");
    assert_eq!(steps[0].class_name, "tab-content");
    assert_eq!(steps[1].id, "step2");
    assert_eq!(steps[2].class_name, "wizard-step");
}

#[test]
fn test_step_visibility() {
    let mut doc = udyam_document();
    let steps = extract_structure(&mut doc).unwrap().steps;

    assert!(steps[0].visible);
    assert!(!steps[1].visible, "hidden attribute");
    assert!(!steps[2].visible, "display: none");
}

#[test]
fn test_step_fields() {
    let mut doc = udyam_document();
    let steps = extract_structure(&mut doc).unwrap().steps;

    let first: Vec<(&str, &str)> = steps[0]
        .fields
        .iter()
        .map(|f| (f.id.as_str(), f.field_type.as_str()))
        .collect();
    assert_eq!(
        first,
        vec![
            (AADHAAR_ID, "text"),
            ("ctl00_ContentPlaceHolder1_txtownername", "text"),
            ("ctl00_ContentPlaceHolder1_chkDecarationA", "checkbox"),
        ]
    );

    let second = &steps[1].fields;
    assert_eq!(second.len(), 3);
    assert_eq!(second[0].field_type, "select-one");
    assert_eq!(second[1].id, "");
    assert_eq!(second[1].name, "pan");
    assert_eq!(second[2].field_type, "textarea");

    assert_eq!(steps[2].fields.len(), 2);
}

#[test]
fn test_nested_step_containers_both_reported() {
    let mut doc = HtmlDocument::parse(
        r#"<form><div class="steps"><div id="step-a"><input id="i"></div></div></form>"#,
    );
    let steps = extract_structure(&mut doc).unwrap().steps;

    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0].fields.len(), 1);
    assert_eq!(steps[1].fields.len(), 1);
}

// ============================================================================
// Styles and layout
// ============================================================================

#[test]
fn test_styles_skip_unreadable_sheets() {
    let mut doc = udyam_document();
    let structure = extract_structure(&mut doc).unwrap();

    assert_eq!(structure.styles, "\n.form-control { border: 1px solid #ccc; }");
}

#[test]
fn test_styles_truncated_with_marker() {
    let sheets = vec![
        StyleSheet::Readable {
            rules: vec!["a { color: red; }".repeat(400)],
        },
        StyleSheet::Unreadable { href: None },
    ];
    let structure = structure_from_parts(&DomTree::default(), &sheets, layout());

    assert_eq!(
        structure.styles.chars().count(),
        STYLES_LIMIT + TRUNCATION_MARKER.len()
    );
    assert!(structure.styles.ends_with(TRUNCATION_MARKER));
}

#[test]
fn test_all_sheets_unreadable() {
    let sheets = vec![
        StyleSheet::Unreadable { href: Some("https://cdn/a.css".into()) },
        StyleSheet::Unreadable { href: None },
    ];
    let structure = structure_from_parts(&DomTree::default(), &sheets, layout());

    assert_eq!(structure.styles, "\n");
    assert!(structure.form.is_none());
    assert!(structure.steps.is_empty());
}

#[test]
fn test_layout_reports_viewport_and_title() {
    let mut doc = udyam_document().with_viewport(Viewport {
        width: 1024,
        height: 700,
    });
    let structure = extract_structure(&mut doc).unwrap();

    assert_eq!(structure.layout.width, 1024);
    assert_eq!(structure.layout.height, 700);
    assert_eq!(
        structure.layout.title,
        "UDYAM REGISTRATION FORM - For New Enterprise"
    );
}

#[test]
fn test_truncation_counts_characters() {
    assert_eq!(truncate("héllo", 2), "hé");
    assert_eq!(truncate_marked("héllo", 5), "héllo");
    assert_eq!(truncate_marked("héllo!", 5), "héllo...");
}

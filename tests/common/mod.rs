#![allow(dead_code)]

use std::path::PathBuf;

use form_mirror::browser::html::HtmlDocument;

pub const AADHAAR_ID: &str = "ctl00_ContentPlaceHolder1_txtadharno";
pub const NAME_ID: &str = "ctl00_ContentPlaceHolder1_txtownername";

pub fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("missing fixture {}: {}", path.display(), e))
}

pub fn udyam_html() -> String {
    fixture("udyam_step1.html")
}

pub fn udyam_document() -> HtmlDocument {
    HtmlDocument::parse(&udyam_html())
}

/// Fresh path in the system temp dir; the file does not exist yet.
pub fn temp_path(label: &str) -> PathBuf {
    std::env::temp_dir().join(format!("form-mirror-{}-{}", label, uuid::Uuid::new_v4()))
}

use std::path::PathBuf;

/// A standalone page (e.g. `/about/`), loaded from the pages directory. Unlike
/// a [`crate::post::Post`], a page has no date or tags and never appears in
/// listings.
#[derive(Clone, Debug, PartialEq)]
pub struct Page {
    pub title: String,
    pub path: String,
    pub source: PathBuf,
    pub body: String,
}

//! Document types for pipeline processing.

use serde_json::Value as Json;

use crate::build::record::ContentRecord;

/// A record being processed through the pipeline.
///
/// Wraps the record with mutable state that evolves through stages:
///
/// 1. Initially: `content` = the record body, `output` = None
/// 2. After content: `content` = body with immediate expressions expanded
/// 3. After headings: `content` has anchors, `nav_heading` = contents list
/// 4. After template: `output` = the page
/// 5. After finalize: `output` = exactly what gets written
#[derive(Debug)]
pub struct ProcessingDocument {
    pub record: ContentRecord,

    /// The record as seen by expressions (`data`)
    pub data: Json,

    pub content: String,

    /// Nested contents list built from the headings
    pub nav_heading: String,

    pub output: Option<String>,
}

impl ProcessingDocument {
    pub fn new(record: ContentRecord) -> Self {
        let data = serde_json::to_value(&record).unwrap_or_default();
        let content = record.content.clone();
        Self {
            record,
            data,
            content,
            nav_heading: String::new(),
            output: None,
        }
    }

    pub fn slug(&self) -> &str {
        &self.record.slug
    }
}

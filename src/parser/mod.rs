pub mod extract;
pub mod layout;
pub mod slice;

/// One labelled field block of an embed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldBlock {
    pub label: String,
    pub value: String,
}

/// The embed shape the classifier and extractor operate on: an optional
/// title, an optional description blob of newline-separated rows, and the
/// ordered field blocks. Borrowed read-only; classify/extract never mutate it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub title: Option<String>,
    pub description: Option<String>,
    pub fields: Vec<FieldBlock>,
}

/// Two-pass pipeline: document → layout tag → extracted records.
pub fn process_document(doc: &Document) -> extract::Extraction {
    extract::extract(doc, layout::classify(doc))
}

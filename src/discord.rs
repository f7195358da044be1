//! Serde models for exported Discord messages, plus the bridge from an
//! embed into the parser's document shape.
//!
//! Only the subset of the export the pipeline reads is modelled; unknown
//! keys are ignored and missing ones default.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::parser::{Document, FieldBlock};

/// A dump file is either a bare array of messages or `{"messages": [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Dump {
    Wrapped { messages: Vec<Message> },
    Bare(Vec<Message>),
}

impl Dump {
    pub fn into_messages(self) -> Vec<Message> {
        match self {
            Dump::Wrapped { messages } => messages,
            Dump::Bare(messages) => messages,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Message {
    pub id: String,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub guild_id: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub embeds: Vec<Embed>,
}

impl Message {
    pub fn first_embed(&self) -> Option<&Embed> {
        self.embeds.first()
    }

    pub fn first_attachment_url(&self) -> Option<&str> {
        self.attachments.first().map(|a| a.url.as_str())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Attachment {
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Embed {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub fields: Vec<EmbedField>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
}

impl Embed {
    /// The shape classify/extract operate on, independent of transport.
    pub fn to_document(&self) -> Document {
        Document {
            title: self.title.clone(),
            description: self.description.clone(),
            fields: self
                .fields
                .iter()
                .map(|f| FieldBlock {
                    label: f.name.clone(),
                    value: f.value.clone(),
                })
                .collect(),
        }
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_keys_are_ignored() {
        let raw = r#"{
            "id": "1",
            "type": 0,
            "content": "hi",
            "author": {"id": "2", "username": "bot"},
            "embeds": [{"title": "T", "color": 112233, "fields": []}]
        }"#;
        let m: Message = serde_json::from_str(raw).unwrap();
        assert_eq!(m.content, "hi");
        assert_eq!(m.embeds[0].title.as_deref(), Some("T"));
    }

    #[test]
    fn embed_to_document_keeps_field_order() {
        let embed = Embed {
            title: Some("Arcview".into()),
            description: None,
            fields: vec![
                EmbedField { name: "a".into(), value: "1".into() },
                EmbedField { name: "b".into(), value: "2".into() },
            ],
        };
        let doc = embed.to_document();
        assert_eq!(doc.fields[0].label, "a");
        assert_eq!(doc.fields[1].label, "b");
    }
}

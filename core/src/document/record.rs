/*
 * record.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Bulkdoc, a client for bulk document reads and writes.
 *
 * Bulkdoc is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Bulkdoc is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Bulkdoc.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Document records: what the demultiplexer emits and what the composer writes.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DocumentError;
use crate::mime::Format;

/// Part category: document content or one kind of metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Content,
    /// All metadata kinds at once.
    Metadata,
    Collections,
    Permissions,
    Quality,
    Properties,
}

/// Metadata kinds a written document may carry, in the order they are collected.
pub const METADATA_CATEGORIES: [Category; 4] = [
    Category::Collections,
    Category::Permissions,
    Category::Quality,
    Category::Properties,
];

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Content => "content",
            Category::Metadata => "metadata",
            Category::Collections => "collections",
            Category::Permissions => "permissions",
            Category::Quality => "quality",
            Category::Properties => "properties",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "content" => Ok(Category::Content),
            "metadata" => Ok(Category::Metadata),
            "collections" => Ok(Category::Collections),
            "permissions" => Ok(Category::Permissions),
            "quality" => Ok(Category::Quality),
            "properties" => Ok(Category::Properties),
            other => Err(DocumentError::usage(format!("unknown document category: {}", other))),
        }
    }
}

/// Decoded body of a UTF-8 part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Json(Value),
    Text(String),
}


/// Metadata part that was not merged into a content part (metadata-only read, or the
/// content for its URI never arrived).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataRecord {
    pub uri: Option<String>,
    pub content_type: Option<String>,
    /// Decoded metadata object: `collections`, `permissions`, `quality`, `properties`.
    pub metadata: Map<String, Value>,
}

impl MetadataRecord {
    /// Build from a decoded metadata part body. A body that is not a JSON object is kept under `content`.
    pub fn new(uri: Option<String>, content_type: Option<String>, content: Content) -> Self {
        let metadata = match content {
            Content::Json(Value::Object(map)) => map,
            Content::Json(other) => single_entry("content", other),
            Content::Text(text) => single_entry("content", Value::String(text)),
        };
        Self {
            uri,
            content_type,
            metadata,
        }
    }

    pub fn collections(&self) -> Vec<&str> {
        string_list(&self.metadata, "collections")
    }
}

fn single_entry(key: &str, value: Value) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    map
}

fn string_list<'a>(map: &'a Map<String, Value>, key: &str) -> Vec<&'a str> {
    match map.get(key) {
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        Some(Value::String(s)) => vec![s.as_str()],
        _ => Vec::new(),
    }
}

/// Content part as seen by the consumer, with any same-URI metadata merged in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentRecord {
    /// None for a single anonymous read.
    pub uri: Option<String>,
    pub format: Option<Format>,
    pub content_type: Option<String>,
    pub content: Content,
    pub metadata: Map<String, Value>,
}

impl DocumentRecord {
    pub fn new(uri: Option<String>, format: Option<Format>, content_type: Option<String>, content: Content) -> Self {
        Self {
            uri,
            format,
            content_type,
            content,
            metadata: Map::new(),
        }
    }

    /// Copy the metadata fields onto this record; later keys win.
    pub fn merge_metadata(&mut self, metadata: MetadataRecord) {
        self.metadata.extend(metadata.metadata);
    }

    pub fn collections(&self) -> Vec<&str> {
        string_list(&self.metadata, "collections")
    }

    pub fn quality(&self) -> Option<i64> {
        self.metadata.get("quality").and_then(Value::as_i64)
    }

    pub fn has_metadata(&self) -> bool {
        !self.metadata.is_empty()
    }
}

/// Body of a document to write.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentContent {
    /// Serialized with serde_json.
    Json(Value),
    Text(String),
    Binary(Bytes),
}

impl DocumentContent {
    /// Default media type when the document does not name one.
    pub fn default_content_type(&self) -> &'static str {
        match self {
            DocumentContent::Json(_) => "application/json",
            DocumentContent::Text(_) => "text/plain",
            DocumentContent::Binary(_) => "application/octet-stream",
        }
    }
}

/// A document to write: identity, content and optional metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub uri: Option<String>,
    pub content_type: Option<String>,
    pub content: Option<DocumentContent>,
    pub collections: Option<Vec<String>>,
    pub permissions: Option<Value>,
    pub quality: Option<i64>,
    pub properties: Option<Map<String, Value>>,
}

impl Document {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: Some(uri.into()),
            ..Self::default()
        }
    }

    /// Document without identity; the server assigns or the request names it.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn json(mut self, value: Value) -> Self {
        self.content = Some(DocumentContent::Json(value));
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.content = Some(DocumentContent::Text(text.into()));
        self
    }

    pub fn binary(mut self, data: impl Into<Bytes>) -> Self {
        self.content = Some(DocumentContent::Binary(data.into()));
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn collections<I, S>(mut self, collections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.collections = Some(collections.into_iter().map(Into::into).collect());
        self
    }

    pub fn permissions(mut self, permissions: Value) -> Self {
        self.permissions = Some(permissions);
        self
    }

    pub fn quality(mut self, quality: i64) -> Self {
        self.quality = Some(quality);
        self
    }

    pub fn properties(mut self, properties: Map<String, Value>) -> Self {
        self.properties = Some(properties);
        self
    }

    /// Metadata object for the metadata part, or None when the document carries no metadata.
    pub fn metadata(&self) -> Option<Map<String, Value>> {
        let mut map = Map::new();
        for category in METADATA_CATEGORIES {
            let value = match category {
                Category::Collections => self.collections.as_ref().map(|c| Value::from(c.clone())),
                Category::Permissions => self.permissions.clone(),
                Category::Quality => self.quality.map(Value::from),
                Category::Properties => self.properties.clone().map(Value::Object),
                _ => None,
            };
            if let Some(v) = value {
                map.insert(category.as_str().to_string(), v);
            }
        }
        if map.is_empty() {
            None
        } else {
            Some(map)
        }
    }

    /// Media type for the content part.
    pub fn effective_content_type(&self) -> Option<&str> {
        self.content_type
            .as_deref()
            .or_else(|| self.content.as_ref().map(DocumentContent::default_content_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn metadata_is_collected_in_category_order() {
        let doc = Document::new("/a.json").json(json!({"x": 1})).quality(3).collections(["c1", "c2"]);
        let meta = doc.metadata().unwrap();
        let keys: Vec<&String> = meta.keys().collect();
        assert_eq!(keys, ["collections", "quality"]);
        assert_eq!(meta["collections"], json!(["c1", "c2"]));
    }

    #[test]
    fn no_metadata_without_categories() {
        assert!(Document::new("/a.txt").text("hello").metadata().is_none());
    }

    #[test]
    fn content_type_defaults_follow_content() {
        assert_eq!(Document::anonymous().json(json!(1)).effective_content_type(), Some("application/json"));
        assert_eq!(
            Document::anonymous().binary(vec![1u8]).content_type("image/png").effective_content_type(),
            Some("image/png")
        );
        assert_eq!(Document::anonymous().effective_content_type(), None);
    }

    #[test]
    fn merge_copies_metadata_fields() {
        let meta = MetadataRecord::new(
            Some("/a.json".to_string()),
            None,
            Content::Json(json!({"collections": ["c1"], "quality": 2})),
        );
        assert_eq!(meta.collections(), vec!["c1"]);
        let mut doc = DocumentRecord::new(Some("/a.json".to_string()), Some(Format::Json), None, Content::Json(json!({"x": 1})));
        doc.merge_metadata(meta);
        assert_eq!(doc.collections(), vec!["c1"]);
        assert_eq!(doc.quality(), Some(2));
    }

    #[test]
    fn category_names_round_trip() {
        for c in [Category::Content, Category::Metadata, Category::Properties] {
            assert_eq!(c.as_str().parse::<Category>().unwrap(), c);
        }
        assert!("bogus".parse::<Category>().is_err());
    }
}

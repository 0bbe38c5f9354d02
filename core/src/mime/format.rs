/*
 * format.rs
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

//! Logical content format of a part, derived from its media type.

use serde::{Deserialize, Serialize};

use super::content_type::parse_content_type;
use super::utils::media_type_essence;

/// How a part body is decoded. Binary parts have no logical format (`Option<Format>::None`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Json,
    Xml,
    Text,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Xml => "xml",
            Format::Text => "text",
        }
    }

    /// Explicit `format` parameter value. `binary` and unknown names have no logical format.
    pub fn from_name(name: &str) -> Option<Format> {
        match name.trim().to_ascii_lowercase().as_str() {
            "json" => Some(Format::Json),
            "xml" => Some(Format::Xml),
            "text" => Some(Format::Text),
            _ => None,
        }
    }

    /// `application/*` and `text/*` map by their last `+` segment; everything else is binary.
    /// Parameters are ignored, so `application/json; charset=utf-8` is still JSON.
    pub fn from_content_type(content_type: Option<&str>) -> Option<Format> {
        let content_type = content_type?;
        let (primary, suffix) = match parse_content_type(content_type) {
            Some(ct) => (ct.get_primary_type().to_string(), ct.get_suffix().to_string()),
            None => {
                let essence = media_type_essence(content_type).to_ascii_lowercase();
                let mut fields = essence.split(|c| c == '/' || c == '+');
                let primary = fields.next().unwrap_or("").to_string();
                (primary, fields.last().unwrap_or("").to_string())
            }
        };
        match (primary.as_str(), suffix.as_str()) {
            ("application" | "text", "json") => Some(Format::Json),
            ("application" | "text", "xml") => Some(Format::Xml),
            ("text", _) => Some(Format::Text),
            _ => None,
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_table() {
        let cases = [
            (Some("application/json"), Some(Format::Json)),
            (Some("application/xml"), Some(Format::Xml)),
            (Some("application/octet-stream"), None),
            (Some("text/plain"), Some(Format::Text)),
            (Some("text/xml"), Some(Format::Xml)),
            (Some("text/json"), Some(Format::Json)),
            (Some("application/vnd.marklogic-rdf+xml"), Some(Format::Xml)),
            (Some("application/ld+json; charset=utf-8"), Some(Format::Json)),
            (Some("image/png"), None),
            (Some("garbage"), None),
            (None, None),
        ];
        for (content_type, expected) in cases {
            assert_eq!(Format::from_content_type(content_type), expected, "{:?}", content_type);
        }
    }

    #[test]
    fn explicit_names() {
        assert_eq!(Format::from_name("JSON"), Some(Format::Json));
        assert_eq!(Format::from_name("binary"), None);
    }
}

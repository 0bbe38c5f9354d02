/*
 * error.rs
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

//! Document read/write errors.

use thiserror::Error;

use crate::mime::MimeParseError;

/// Errors raised by a document exchange. At most one is delivered per exchange;
/// records emitted before it stay emitted.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Expected a non-empty multipart/mixed body and got something else. The body is drained.
    #[error("malformed response: {reason}")]
    MalformedResponse { reason: String },

    /// Multipart framing or part header violation.
    #[error("multipart parse error: {0}")]
    Parse(#[from] MimeParseError),

    /// A part declared as JSON did not decode.
    #[error("invalid JSON in part{}: {source}", describe_uri(.uri))]
    Decode {
        uri: Option<String>,
        #[source]
        source: serde_json::Error,
    },

    /// Document content or metadata could not be serialized.
    #[error("cannot encode document{}: {source}", describe_uri(.uri))]
    Encode {
        uri: Option<String>,
        #[source]
        source: serde_json::Error,
    },

    /// A text-like part was not valid UTF-8.
    #[error("invalid UTF-8 in part{}", describe_uri(.uri))]
    InvalidUtf8 { uri: Option<String> },

    /// Caller arguments rejected before any request was built.
    #[error("{0}")]
    Usage(String),

    /// Server answered with an error status.
    #[error("server returned status {code}: {body}")]
    Status { code: u16, body: String },

    /// Connection-level failure reported by the transport.
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<std::io::Error> for DocumentError {
    fn from(e: std::io::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

impl DocumentError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            reason: reason.into(),
        }
    }
}

fn describe_uri(uri: &Option<String>) -> String {
    match uri {
        Some(u) => format!(" for {}", u),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, DocumentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_error_names_the_document() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = DocumentError::Decode {
            uri: Some("/a.json".to_string()),
            source,
        };
        assert!(err.to_string().starts_with("invalid JSON in part for /a.json"));
    }

    #[test]
    fn anonymous_part_has_no_uri_suffix() {
        let err = DocumentError::InvalidUtf8 { uri: None };
        assert_eq!(err.to_string(), "invalid UTF-8 in part");
    }
}

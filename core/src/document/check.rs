/*
 * check.rs
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

//! Existence check: HEAD response → exists / format / content type.

use crate::error::{DocumentError, Result};
use crate::mime::{media_type_essence, Format};
use crate::protocol::http::{Response, ResponseHandler};

/// Server header naming the stored document's format.
pub const DOCUMENT_FORMAT_HEADER: &str = "vnd.marklogic.document-format";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub exists: bool,
    /// Only known when the document exists; None also for binary documents.
    pub format: Option<Format>,
    /// Without parameters.
    pub content_type: Option<String>,
}

/// Collects a HEAD response into a `CheckResult`.
#[derive(Debug, Default)]
pub struct CheckHandler {
    status: Option<u16>,
    headers: Vec<(String, String)>,
    outcome: Option<Result<CheckResult>>,
}

impl CheckHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_complete(&self) -> bool {
        self.outcome.is_some()
    }

    /// The check outcome; an error if the exchange did not complete.
    pub fn into_result(self) -> Result<CheckResult> {
        self.outcome
            .unwrap_or_else(|| Err(DocumentError::Transport("check response did not complete".to_string())))
    }

    fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

impl ResponseHandler for CheckHandler {
    fn ok(&mut self, response: Response) {
        self.status = Some(response.code);
    }

    fn error(&mut self, response: Response) {
        self.status = Some(response.code);
    }

    fn header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_string(), value.to_string()));
    }

    fn start_body(&mut self) {}

    /// HEAD has no body; anything sent anyway is drained.
    fn body_chunk(&mut self, _data: &[u8]) {}

    fn end_body(&mut self) {}

    fn complete(&mut self) {
        if self.outcome.is_some() {
            return;
        }
        let exists = self.status.map_or(false, |code| code < 300);
        let result = if exists {
            CheckResult {
                exists,
                format: self.header_value(DOCUMENT_FORMAT_HEADER).and_then(Format::from_name),
                content_type: self
                    .header_value("content-type")
                    .map(|ct| media_type_essence(ct).to_string()),
            }
        } else {
            CheckResult {
                exists,
                format: None,
                content_type: None,
            }
        };
        self.outcome = Some(Ok(result));
    }

    fn failed(&mut self, error: &std::io::Error) {
        if self.outcome.is_none() {
            self.outcome = Some(Err(DocumentError::Transport(error.to_string())));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn existing_document() {
        let mut h = CheckHandler::new();
        h.ok(Response::new(200));
        h.header("Content-Type", "application/json; charset=utf-8");
        h.header("vnd.marklogic.document-format", "json");
        h.complete();
        let r = h.into_result().unwrap();
        assert!(r.exists);
        assert_eq!(r.format, Some(Format::Json));
        assert_eq!(r.content_type.as_deref(), Some("application/json"));
    }

    #[test]
    fn missing_document() {
        let mut h = CheckHandler::new();
        h.error(Response::new(404));
        h.header("Content-Type", "application/json");
        h.complete();
        let r = h.into_result().unwrap();
        assert!(!r.exists);
        assert!(r.content_type.is_none());
    }

    #[test]
    fn failure_is_reported() {
        let mut h = CheckHandler::new();
        h.failed(&std::io::Error::new(std::io::ErrorKind::TimedOut, "timeout"));
        assert!(matches!(h.into_result(), Err(DocumentError::Transport(_))));
    }
}

/*
 * result.rs
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

//! Plain (non-multipart) response: write, remove, patch and unpaged query results.

use tracing::debug;

use crate::document::record::Content;
use crate::document::sink::{EventSink, ReadEvent, Record};
use crate::error::DocumentError;
use crate::mime::Format;
use crate::protocol::http::{Response, ResponseHandler};

const MAX_ERROR_BODY: usize = 16 * 1024;

/// Buffers the response body and delivers it as one inline record, then `End`.
/// An empty body yields just `End`. Error statuses become `DocumentError::Status`.
#[derive(Debug)]
pub struct ResultHandler<S> {
    sink: S,
    status: Option<u16>,
    content_type: Option<String>,
    body: Vec<u8>,
    done: bool,
}

impl<S: EventSink> ResultHandler<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            status: None,
            content_type: None,
            body: Vec::new(),
            done: false,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    fn is_error_status(&self) -> bool {
        self.status.map_or(false, |code| code >= 300)
    }

    fn fail(&mut self, err: DocumentError) {
        self.done = true;
        self.sink.error(err);
    }

    fn deliver(&mut self) {
        let body = std::mem::take(&mut self.body);
        if let Some(code) = self.status.filter(|c| *c >= 300) {
            let text = String::from_utf8_lossy(&body).into_owned();
            self.fail(DocumentError::Status { code, body: text });
            return;
        }
        if !body.is_empty() {
            let text = match String::from_utf8(body) {
                Ok(t) => t,
                Err(_) => {
                    self.fail(DocumentError::InvalidUtf8 { uri: None });
                    return;
                }
            };
            let content = if Format::from_content_type(self.content_type.as_deref()) == Some(Format::Json) {
                match serde_json::from_str(&text) {
                    Ok(v) => Content::Json(v),
                    Err(source) => {
                        self.fail(DocumentError::Decode { uri: None, source });
                        return;
                    }
                }
            } else {
                Content::Text(text)
            };
            self.sink.emit(ReadEvent::Data(Record::Inline(content)));
        }
        debug!(status = ?self.status, "result response complete");
        self.done = true;
        self.sink.emit(ReadEvent::End);
    }
}

impl<S: EventSink> ResponseHandler for ResultHandler<S> {
    fn ok(&mut self, response: Response) {
        self.status = Some(response.code);
    }

    fn error(&mut self, response: Response) {
        self.status = Some(response.code);
    }

    fn header(&mut self, name: &str, value: &str) {
        if name.eq_ignore_ascii_case("content-type") && self.content_type.is_none() {
            self.content_type = Some(value.to_string());
        }
    }

    fn start_body(&mut self) {}

    fn body_chunk(&mut self, data: &[u8]) {
        if self.done {
            return;
        }
        if self.is_error_status() {
            let room = MAX_ERROR_BODY.saturating_sub(self.body.len());
            self.body.extend_from_slice(&data[..data.len().min(room)]);
        } else {
            self.body.extend_from_slice(data);
        }
    }

    fn end_body(&mut self) {}

    fn complete(&mut self) {
        if !self.done {
            self.deliver();
        }
    }

    fn failed(&mut self, error: &std::io::Error) {
        if !self.done {
            self.fail(DocumentError::Transport(error.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::sink::CollectingSink;
    use serde_json::json;

    fn respond(code: u16, content_type: &str, body: &[u8]) -> CollectingSink {
        let mut h = ResultHandler::new(CollectingSink::new());
        if code < 300 {
            h.ok(Response::new(code));
        } else {
            h.error(Response::new(code));
        }
        h.header("Content-Type", content_type);
        h.start_body();
        h.body_chunk(body);
        h.end_body();
        h.complete();
        h.into_sink()
    }

    #[test]
    fn json_body_is_decoded() {
        let sink = respond(200, "application/json", br#"{"documents":[{"uri":"/a.json"}]}"#);
        assert_eq!(
            sink.events[0],
            ReadEvent::Data(Record::Inline(Content::Json(json!({"documents": [{"uri": "/a.json"}]}))))
        );
        assert!(sink.is_ended());
    }

    #[test]
    fn empty_body_just_ends() {
        let sink = respond(204, "text/plain", b"");
        assert_eq!(sink.events, vec![ReadEvent::End]);
    }

    #[test]
    fn error_status_is_reported() {
        let sink = respond(400, "application/json", br#"{"errorResponse":{"status":"Bad Request"}}"#);
        assert!(sink.events.is_empty());
        assert!(matches!(sink.error, Some(DocumentError::Status { code: 400, .. })));
    }
}

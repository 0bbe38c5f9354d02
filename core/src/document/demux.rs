/*
 * demux.rs
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

//! Read demultiplexer: multipart/mixed response body → classified, correlated document records.
//!
//! The transport drives this as a `ResponseHandler`. Response headers are checked when the body
//! starts; a body that is not a non-empty multipart/mixed is drained and reported, never split.
//! Each part is classified from its headers, then either buffered as UTF-8 (JSON, XML, text,
//! inline and metadata parts) or forwarded chunk by chunk (binary parts).

use bytes::Bytes;
use tracing::{debug, trace, warn};

use crate::document::correlator::PendingMetadata;
use crate::document::record::{Content, DocumentRecord, MetadataRecord};
use crate::document::sink::{ConsumptionMode, EventSink, ReadEvent};
use crate::error::DocumentError;
use crate::mime::{
    is_valid_boundary, parse_content_type, parse_part_headers, Format, MimeHandler, MimeParseError, MultipartParser,
    PartHeaders,
};
use crate::protocol::http::{Response, ResponseHandler};

/// Error status bodies are kept up to this size for the error message.
const MAX_ERROR_BODY: usize = 16 * 1024;

/// Per-part classification made once the part headers are complete.
#[derive(Debug)]
struct PartState {
    headers: PartHeaders,
    format: Option<Format>,
    is_utf8: bool,
    text: Vec<u8>,
}

/// Part-level processing: classification, buffering, correlation and emission.
#[derive(Debug)]
struct PartProcessor<S> {
    sink: S,
    mode: ConsumptionMode,
    pending: PendingMetadata,
    raw_headers: Vec<(String, String)>,
    part: Option<PartState>,
    /// Set when a part fails to decode; the splitter is then aborted.
    failure: Option<DocumentError>,
}

impl<S: EventSink> PartProcessor<S> {
    fn new(sink: S, mode: ConsumptionMode) -> Self {
        Self {
            sink,
            mode,
            pending: PendingMetadata::default(),
            raw_headers: Vec::new(),
            part: None,
            failure: None,
        }
    }

    fn emit_metadata(&mut self, metadata: MetadataRecord) {
        let event = self.mode.metadata(metadata);
        self.sink.emit(event);
    }

    fn abort(&mut self, err: DocumentError) -> MimeParseError {
        let msg = err.to_string();
        self.failure = Some(err);
        MimeParseError::new(msg)
    }

    fn decode(&self, part: PartState) -> Result<(PartHeaders, Option<Format>, Content), DocumentError> {
        let PartState {
            headers, format, text, ..
        } = part;
        let text = String::from_utf8(text).map_err(|_| DocumentError::InvalidUtf8 {
            uri: headers.uri().map(str::to_string),
        })?;
        let content = if format == Some(Format::Json) {
            let value = serde_json::from_str(&text).map_err(|source| DocumentError::Decode {
                uri: headers.uri().map(str::to_string),
                source,
            })?;
            Content::Json(value)
        } else {
            Content::Text(text)
        };
        Ok((headers, format, content))
    }

    fn dispatch(&mut self, headers: PartHeaders, format: Option<Format>, content: Content) {
        let uri = headers.uri().map(str::to_string);
        if let Some(m) = self.pending.flush_diverged(uri.as_deref()) {
            self.emit_metadata(m);
        }
        if headers.is_inline() {
            let event = self.mode.inline(content);
            self.sink.emit(event);
        } else if headers.is_metadata() {
            let metadata = MetadataRecord::new(uri, headers.content_type, content);
            if let Some(previous) = self.pending.hold(metadata) {
                self.emit_metadata(previous);
            }
        } else {
            let mut document = DocumentRecord::new(uri, format, headers.content_type, content);
            self.pending.merge_into(&mut document);
            let event = self.mode.document(document);
            self.sink.emit(event);
        }
    }

    /// Body fully split: flush dangling metadata and signal the end.
    fn finish_stream(&mut self) {
        if let Some(m) = self.pending.flush() {
            self.emit_metadata(m);
        }
        self.sink.emit(ReadEvent::End);
    }
}

impl<S: EventSink> MimeHandler for PartProcessor<S> {
    fn start_part(&mut self) -> Result<(), MimeParseError> {
        self.raw_headers.clear();
        self.part = None;
        Ok(())
    }

    fn header(&mut self, name: &str, value: &str) -> Result<(), MimeParseError> {
        self.raw_headers.push((name.to_string(), value.to_string()));
        Ok(())
    }

    fn end_headers(&mut self) -> Result<(), MimeParseError> {
        let headers = parse_part_headers(self.raw_headers.iter().map(|(n, v)| (n.as_str(), v.as_str())));
        let format = match headers.format() {
            Some(name) => Format::from_name(name),
            None => Format::from_content_type(headers.content_type.as_deref()),
        };
        let is_utf8 = headers.is_inline() || headers.is_metadata() || format.is_some();
        debug!(
            uri = ?headers.uri(),
            category = ?headers.category(),
            format = ?format,
            inline = headers.is_inline(),
            is_utf8,
            "part headers"
        );
        self.part = Some(PartState {
            headers,
            format,
            is_utf8,
            text: Vec::new(),
        });
        Ok(())
    }

    fn body_content(&mut self, data: &[u8]) -> Result<(), MimeParseError> {
        let part = match self.part.as_mut() {
            Some(p) => p,
            None => return Err(MimeParseError::new("part body before part headers")),
        };
        if part.is_utf8 {
            part.text.extend_from_slice(data);
            return Ok(());
        }
        trace!(len = data.len(), "binary chunk");
        if let Some(m) = self.pending.flush() {
            self.emit_metadata(m);
        }
        let event = self.mode.chunk(Bytes::copy_from_slice(data));
        self.sink.emit(event);
        Ok(())
    }

    fn end_part(&mut self) -> Result<(), MimeParseError> {
        let part = match self.part.take() {
            Some(p) => p,
            None => return Err(MimeParseError::new("part ended before its headers")),
        };
        if !part.is_utf8 {
            // An empty binary part has no chunk to flush ahead of.
            if let Some(m) = self.pending.flush() {
                self.emit_metadata(m);
            }
            if self.mode == ConsumptionMode::Streaming {
                self.sink.emit(ReadEvent::ResultEnd);
            }
            return Ok(());
        }
        match self.decode(part) {
            Ok((headers, format, content)) => {
                self.dispatch(headers, format, content);
                Ok(())
            }
            Err(e) => Err(self.abort(e)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Collecting status and response headers.
    Headers,
    Parsing,
    /// Error status: body collected for the error message.
    ErrorStatus(u16),
    Done,
    /// An error was delivered; everything after is drained.
    Failed,
}

/// Demultiplexes one multipart/mixed document response into sink events.
///
/// One instance per HTTP exchange. The sink sees records as their parts complete, then `End`;
/// or records so far, then exactly one error.
#[derive(Debug)]
pub struct ReadDemultiplexer<S> {
    parts: PartProcessor<S>,
    boundary: String,
    trust_response_boundary: bool,
    response_headers: Vec<(String, String)>,
    parser: Option<MultipartParser>,
    error_body: Vec<u8>,
    phase: Phase,
}

impl<S: EventSink> ReadDemultiplexer<S> {
    /// `boundary` is the pre-agreed token. With `trust_response_boundary`, a valid boundary
    /// parameter on the response Content-Type takes precedence.
    pub fn new(sink: S, mode: ConsumptionMode, boundary: impl Into<String>, trust_response_boundary: bool) -> Self {
        Self {
            parts: PartProcessor::new(sink, mode),
            boundary: boundary.into(),
            trust_response_boundary,
            response_headers: Vec::new(),
            parser: None,
            error_body: Vec::new(),
            phase: Phase::Headers,
        }
    }

    pub fn mode(&self) -> ConsumptionMode {
        self.parts.mode
    }

    pub fn sink(&self) -> &S {
        &self.parts.sink
    }

    pub fn into_sink(self) -> S {
        self.parts.sink
    }

    /// True once `End` or an error has been delivered.
    pub fn is_finished(&self) -> bool {
        matches!(self.phase, Phase::Done | Phase::Failed)
    }

    fn response_header(&self, name: &str) -> Option<&str> {
        self.response_headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn fail(&mut self, err: DocumentError) {
        if self.is_finished() {
            return;
        }
        self.phase = Phase::Failed;
        self.parser = None;
        self.parts.sink.error(err);
    }

    /// Check response headers and set up the splitter, or fail with a malformed response.
    fn begin_parsing(&mut self) {
        let length = self.response_header("content-length").map(str::trim);
        if matches!(length, None | Some("0")) {
            warn!(content_length = ?length, "empty document response; draining");
            self.fail(DocumentError::malformed("response has no content"));
            return;
        }
        let content_type = self.response_header("content-type").unwrap_or("").to_string();
        let parsed = match parse_content_type(&content_type) {
            Some(ct) if ct.is_mime_type("multipart", "mixed") => ct,
            _ => {
                warn!(content_type = %content_type, "document response is not multipart/mixed; draining");
                self.fail(DocumentError::malformed(format!(
                    "expected multipart/mixed response, got {:?}",
                    content_type
                )));
                return;
            }
        };
        let boundary = match parsed.get_parameter("boundary") {
            Some(b) if self.trust_response_boundary && is_valid_boundary(b) => {
                if b != self.boundary {
                    warn!(expected = %self.boundary, actual = %b, "response uses a different multipart boundary");
                }
                b.to_string()
            }
            _ => self.boundary.clone(),
        };
        match MultipartParser::new(&boundary) {
            Ok(parser) => {
                debug!(boundary = %boundary, mode = ?self.parts.mode, "splitting multipart response");
                self.parser = Some(parser);
                self.phase = Phase::Parsing;
            }
            Err(e) => self.fail(e.into()),
        }
    }

    /// Map a splitter error to the exchange error; a decode failure takes precedence.
    fn parse_failure(&mut self, err: MimeParseError) -> DocumentError {
        self.parts.failure.take().unwrap_or(DocumentError::Parse(err))
    }

    fn end_of_body(&mut self) {
        if self.phase != Phase::Parsing {
            return;
        }
        let result = match self.parser.as_mut() {
            Some(parser) => parser.close(&mut self.parts),
            None => Ok(()),
        };
        match result {
            Ok(()) => {
                self.parser = None;
                self.phase = Phase::Done;
                self.parts.finish_stream();
            }
            Err(e) => {
                let err = self.parse_failure(e);
                self.fail(err);
            }
        }
    }
}

impl<S: EventSink> ResponseHandler for ReadDemultiplexer<S> {
    fn ok(&mut self, _response: Response) {}

    fn error(&mut self, response: Response) {
        if self.phase == Phase::Headers {
            self.phase = Phase::ErrorStatus(response.code);
        }
    }

    fn header(&mut self, name: &str, value: &str) {
        if matches!(self.phase, Phase::Headers | Phase::ErrorStatus(_)) {
            self.response_headers.push((name.to_string(), value.to_string()));
        }
    }

    fn start_body(&mut self) {
        if self.phase == Phase::Headers {
            self.begin_parsing();
        }
    }

    fn body_chunk(&mut self, data: &[u8]) {
        match self.phase {
            Phase::Parsing => {
                let result = match self.parser.as_mut() {
                    Some(parser) => parser.receive(data, &mut self.parts),
                    None => Ok(()),
                };
                if let Err(e) = result {
                    let err = self.parse_failure(e);
                    self.fail(err);
                }
            }
            Phase::ErrorStatus(_) => {
                let room = MAX_ERROR_BODY.saturating_sub(self.error_body.len());
                self.error_body.extend_from_slice(&data[..data.len().min(room)]);
            }
            _ => {}
        }
    }

    fn end_body(&mut self) {
        self.end_of_body();
    }

    fn complete(&mut self) {
        match self.phase {
            // No body at all: the empty-response check applies.
            Phase::Headers => self.begin_parsing(),
            Phase::Parsing => self.end_of_body(),
            Phase::ErrorStatus(code) => {
                let body = String::from_utf8_lossy(&self.error_body).into_owned();
                self.fail(DocumentError::Status { code, body });
            }
            Phase::Done | Phase::Failed => {}
        }
        if self.phase == Phase::Parsing {
            // begin_parsing succeeded but no body followed.
            self.end_of_body();
        }
    }

    fn failed(&mut self, error: &std::io::Error) {
        self.fail(DocumentError::Transport(error.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::sink::{CollectingSink, Record};
    use serde_json::json;

    const B: &str = "BOUND";

    fn part(disposition: &str, content_type: &str, body: &str) -> String {
        format!(
            "--{}\r\nContent-Type: {}\r\nContent-Disposition: {}\r\n\r\n{}\r\n",
            B, content_type, disposition, body
        )
    }

    fn run(mode: ConsumptionMode, body: &[u8]) -> CollectingSink {
        let mut demux = ReadDemultiplexer::new(CollectingSink::new(), mode, B, true);
        demux.ok(Response::new(200));
        demux.header("Content-Type", &format!("multipart/mixed; boundary={}", B));
        demux.header("Content-Length", &body.len().to_string());
        demux.start_body();
        for chunk in body.chunks(7) {
            demux.body_chunk(chunk);
        }
        demux.end_body();
        demux.complete();
        assert!(demux.is_finished());
        demux.into_sink()
    }

    fn body(parts: &[String]) -> Vec<u8> {
        let mut out = parts.concat();
        out.push_str(&format!("--{}--\r\n", B));
        out.into_bytes()
    }

    #[test]
    fn metadata_then_content_merges() {
        let sink = run(
            ConsumptionMode::Buffered,
            &body(&[
                part("attachment; filename=\"/a.json\"; category=metadata", "application/json", r#"{"collections":["c1"],"quality":1}"#),
                part("attachment; filename=\"/a.json\"; category=content; format=json", "application/json", r#"{"x":1}"#),
            ]),
        );
        assert!(sink.is_ended());
        assert_eq!(sink.events.len(), 2);
        let docs = sink.documents();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].uri.as_deref(), Some("/a.json"));
        assert_eq!(docs[0].content, Content::Json(json!({"x": 1})));
        assert_eq!(docs[0].collections(), vec!["c1"]);
        assert_eq!(docs[0].quality(), Some(1));
    }

    #[test]
    fn different_uris_are_never_merged() {
        let sink = run(
            ConsumptionMode::Buffered,
            &body(&[
                part("attachment; filename=\"/a.json\"; category=metadata", "application/json", r#"{"collections":["c1"]}"#),
                part("attachment; filename=\"/b.json\"; category=content", "application/json", r#"{"y":2}"#),
            ]),
        );
        let records = sink.records();
        assert_eq!(records.len(), 2);
        match records[0] {
            Record::Metadata(m) => {
                assert_eq!(m.uri.as_deref(), Some("/a.json"));
                assert_eq!(m.collections(), vec!["c1"]);
            }
            other => panic!("expected metadata, got {:?}", other),
        }
        match records[1] {
            Record::Document(d) => {
                assert_eq!(d.uri.as_deref(), Some("/b.json"));
                assert!(!d.has_metadata());
            }
            other => panic!("expected document, got {:?}", other),
        }
    }

    #[test]
    fn dangling_metadata_is_flushed_once_before_end() {
        let sink = run(
            ConsumptionMode::Buffered,
            &body(&[part(
                "attachment; filename=\"/a.json\"; category=collections",
                "application/json",
                r#"{"collections":["c1"]}"#,
            )]),
        );
        assert_eq!(sink.events.len(), 2);
        assert!(matches!(&sink.events[0], ReadEvent::Data(Record::Metadata(m)) if m.uri.as_deref() == Some("/a.json")));
        assert_eq!(sink.events[1], ReadEvent::End);
    }

    #[test]
    fn binary_part_is_forwarded_not_decoded() {
        let payload = "\u{1}not json {";
        let sink = run(
            ConsumptionMode::Buffered,
            &body(&[
                part("attachment; filename=\"/a.json\"; category=metadata", "application/json", r#"{"quality":2}"#),
                part("attachment; filename=\"/b.bin\"; category=content", "application/octet-stream", payload),
            ]),
        );
        let records = sink.records();
        assert!(matches!(records[0], Record::Metadata(_)));
        let flushed = records.iter().filter(|r| matches!(r, Record::Metadata(_))).count();
        assert_eq!(flushed, 1);
        let bytes: Vec<u8> = records
            .iter()
            .filter_map(|r| match r {
                Record::Chunk(b) => Some(b.to_vec()),
                _ => None,
            })
            .flatten()
            .collect();
        assert_eq!(bytes, payload.as_bytes());
        assert!(sink.is_ended());
    }

    #[test]
    fn streaming_mode_event_names() {
        let sink = run(
            ConsumptionMode::Streaming,
            &body(&[
                part("inline; category=content", "application/json", r#"{"total":1}"#),
                part("attachment; filename=\"/a.xml\"; category=content", "application/xml", "<a/>"),
                part("attachment; filename=\"/b.bin\"; category=content", "application/octet-stream", "bin"),
            ]),
        );
        assert_eq!(sink.events[0], ReadEvent::Summary(Content::Json(json!({"total": 1}))));
        match &sink.events[1] {
            ReadEvent::Result(Record::Document(d)) => {
                assert_eq!(d.format, Some(Format::Xml));
                assert_eq!(d.content, Content::Text("<a/>".to_string()));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(sink.events[sink.events.len() - 2], ReadEvent::ResultEnd));
        assert_eq!(sink.events.last(), Some(&ReadEvent::End));
    }

    #[test]
    fn empty_binary_part_flushes_its_metadata_first() {
        let sink = run(
            ConsumptionMode::Streaming,
            &body(&[
                part("attachment; filename=\"/a.bin\"; category=metadata", "application/json", r#"{"quality":1}"#),
                part("attachment; filename=\"/a.bin\"; category=content", "application/octet-stream", ""),
                part("attachment; filename=\"/b.json\"; category=content", "application/json", r#"{"y":2}"#),
            ]),
        );
        assert_eq!(sink.events.len(), 4);
        match &sink.events[0] {
            ReadEvent::Result(Record::Metadata(m)) => assert_eq!(m.uri.as_deref(), Some("/a.bin")),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(sink.events[1], ReadEvent::ResultEnd);
        match &sink.events[2] {
            ReadEvent::Result(Record::Document(d)) => {
                assert_eq!(d.uri.as_deref(), Some("/b.json"));
                assert!(!d.has_metadata());
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(sink.events[3], ReadEvent::End);
    }

    #[test]
    fn anonymous_inline_content_is_emitted_directly() {
        let sink = run(ConsumptionMode::Buffered, &body(&[part("inline", "text/plain", "hello")]));
        assert_eq!(sink.events[0], ReadEvent::Data(Record::Inline(Content::Text("hello".to_string()))));
    }

    #[test]
    fn zero_length_response_is_malformed() {
        let mut demux = ReadDemultiplexer::new(CollectingSink::new(), ConsumptionMode::Buffered, B, true);
        demux.ok(Response::new(200));
        demux.header("Content-Type", "multipart/mixed; boundary=BOUND");
        demux.header("Content-Length", "0");
        demux.complete();
        let sink = demux.into_sink();
        assert!(sink.events.is_empty());
        assert!(matches!(sink.error, Some(DocumentError::MalformedResponse { .. })));
    }

    #[test]
    fn non_multipart_body_is_drained() {
        let mut demux = ReadDemultiplexer::new(CollectingSink::new(), ConsumptionMode::Buffered, B, true);
        demux.ok(Response::new(200));
        demux.header("Content-Type", "application/json");
        demux.header("Content-Length", "2");
        demux.start_body();
        demux.body_chunk(b"{}");
        demux.end_body();
        demux.complete();
        let sink = demux.into_sink();
        assert!(sink.events.is_empty());
        assert!(matches!(sink.error, Some(DocumentError::MalformedResponse { .. })));
    }

    #[test]
    fn invalid_json_is_fatal_but_keeps_earlier_records() {
        let sink = run_unchecked(&body(&[
            part("inline", "text/plain", "first"),
            part("attachment; filename=\"/bad.json\"; category=content", "application/json", "{oops"),
            part("inline", "text/plain", "never"),
        ]));
        assert_eq!(sink.events.len(), 1);
        assert!(matches!(&sink.error, Some(DocumentError::Decode { uri: Some(u), .. }) if u == "/bad.json"));
    }

    #[test]
    fn truncated_body_is_a_parse_error() {
        let mut raw = part("inline", "text/plain", "first");
        raw.push_str("--BOUND\r\nContent-Type: text/plain\r\n\r\nunfinished");
        let sink = run_unchecked(raw.as_bytes());
        assert_eq!(sink.events.len(), 1);
        assert!(matches!(sink.error, Some(DocumentError::Parse(_))));
    }

    #[test]
    fn error_status_carries_body() {
        let mut demux = ReadDemultiplexer::new(CollectingSink::new(), ConsumptionMode::Buffered, B, true);
        demux.error(Response::new(404));
        demux.header("Content-Type", "application/json");
        demux.start_body();
        demux.body_chunk(br#"{"errorResponse":{}}"#);
        demux.end_body();
        demux.complete();
        match demux.into_sink().error {
            Some(DocumentError::Status { code, body }) => {
                assert_eq!(code, 404);
                assert!(body.contains("errorResponse"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn transport_failure_after_records() {
        let mut demux = ReadDemultiplexer::new(CollectingSink::new(), ConsumptionMode::Buffered, B, true);
        demux.ok(Response::new(200));
        demux.header("Content-Type", "multipart/mixed; boundary=BOUND");
        demux.header("Content-Length", "1000");
        demux.start_body();
        demux.body_chunk(part("inline", "text/plain", "one").as_bytes());
        demux.body_chunk(b"--BOUND\r\n");
        demux.failed(&std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset"));
        demux.body_chunk(b"ignored");
        demux.complete();
        let sink = demux.into_sink();
        assert_eq!(sink.events.len(), 1);
        assert!(matches!(sink.error, Some(DocumentError::Transport(_))));
    }

    #[test]
    fn configured_boundary_used_when_response_has_none() {
        let mut demux = ReadDemultiplexer::new(CollectingSink::new(), ConsumptionMode::Buffered, B, true);
        let raw = body(&[part("inline", "text/plain", "x")]);
        demux.ok(Response::new(200));
        demux.header("Content-Type", "multipart/mixed");
        demux.header("Content-Length", &raw.len().to_string());
        demux.start_body();
        demux.body_chunk(&raw);
        demux.end_body();
        demux.complete();
        let sink = demux.into_sink();
        assert!(sink.is_ended());
        assert_eq!(sink.records().len(), 1);
    }

    fn run_unchecked(raw: &[u8]) -> CollectingSink {
        let mut demux = ReadDemultiplexer::new(CollectingSink::new(), ConsumptionMode::Buffered, B, true);
        demux.ok(Response::new(200));
        demux.header("Content-Type", "multipart/mixed; boundary=BOUND");
        demux.header("Content-Length", &raw.len().to_string());
        demux.start_body();
        demux.body_chunk(raw);
        demux.end_body();
        demux.complete();
        demux.into_sink()
    }
}

/*
 * composer.rs
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

//! Write composer: documents → boundary-framed multipart parts.
//!
//! Per document, at most two parts: metadata (only when the document carries a metadata
//! category), then content (only when it has content). Attachment disposition when the
//! document has a URI, inline otherwise.

use tracing::debug;

use crate::document::record::{Document, DocumentContent};
use crate::error::{DocumentError, Result};
use crate::mime::{format_disposition, is_valid_boundary, parse_content_type, MultipartWriter};
use crate::protocol::http::RequestBody;

/// Media type of every metadata part.
pub const METADATA_CONTENT_TYPE: &str = "application/json; encoding=utf-8";

/// Appended to the pre-agreed token for multi-document batch bodies.
pub const BATCH_BOUNDARY_SUFFIX: &str = "1";

/// Request Content-Type for a multipart body with this boundary.
pub fn multipart_content_type(boundary: &str) -> String {
    format!("multipart/mixed; boundary={}", boundary)
}

/// Boundary for a batch (multi-document) body.
pub fn batch_boundary(boundary: &str) -> String {
    format!("{}{}", boundary, BATCH_BOUNDARY_SUFFIX)
}

fn check_boundary(boundary: &str) -> Result<()> {
    if is_valid_boundary(boundary) {
        Ok(())
    } else {
        Err(DocumentError::usage(format!("invalid multipart boundary: {:?}", boundary)))
    }
}

/// The URI is written inside a quoted `filename` and the content type as a header value;
/// neither may end the header line or the quoted string.
fn check_header_safe(document: &Document) -> Result<()> {
    if let Some(uri) = &document.uri {
        if uri.chars().any(|c| c == '"' || c == '\\' || c.is_control()) {
            return Err(DocumentError::usage(format!("document uri {:?} cannot be sent in a part header", uri)));
        }
    }
    if let Some(content_type) = &document.content_type {
        if content_type.chars().any(char::is_control) {
            return Err(DocumentError::usage(format!("invalid content type {:?}", content_type)));
        }
    }
    Ok(())
}

/// Text content is declared UTF-8 unless the caller already named an encoding.
fn content_part_type(document: &Document, content: &DocumentContent) -> String {
    let declared = document
        .content_type
        .clone()
        .unwrap_or_else(|| content.default_content_type().to_string());
    let has_encoding = parse_content_type(&declared)
        .map_or(false, |ct| ct.get_parameter("encoding").is_some() || ct.get_parameter("charset").is_some());
    match content {
        DocumentContent::Text(_) if !has_encoding => format!("{}; encoding=utf-8", declared),
        _ => declared,
    }
}

fn content_bytes(document: &Document, content: &DocumentContent) -> Result<Vec<u8>> {
    match content {
        DocumentContent::Text(s) => Ok(s.as_bytes().to_vec()),
        DocumentContent::Binary(b) => Ok(b.to_vec()),
        DocumentContent::Json(v) => serde_json::to_vec(v).map_err(|source| DocumentError::Encode {
            uri: document.uri.clone(),
            source,
        }),
    }
}

fn write_metadata_part<B: RequestBody>(writer: &mut MultipartWriter<B>, document: &Document) -> Result<bool> {
    let metadata = match document.metadata() {
        Some(m) => m,
        None => return Ok(false),
    };
    let body = serde_json::to_vec(&metadata).map_err(|source| DocumentError::Encode {
        uri: document.uri.clone(),
        source,
    })?;
    let disposition = format_disposition(document.uri.as_deref(), "metadata");
    writer.write_part(
        &[("Content-Type", METADATA_CONTENT_TYPE), ("Content-Disposition", disposition.as_str())],
        &body,
    )?;
    Ok(true)
}

/// Write one document's metadata and content parts.
pub fn write_document<B: RequestBody>(writer: &mut MultipartWriter<B>, document: &Document) -> Result<()> {
    check_header_safe(document)?;
    let wrote_metadata = write_metadata_part(writer, document)?;
    let wrote_content = match &document.content {
        Some(content) => {
            let content_type = content_part_type(document, content);
            let body = content_bytes(document, content)?;
            let disposition = format_disposition(document.uri.as_deref(), "content");
            writer.write_part(
                &[("Content-Type", content_type.as_str()), ("Content-Disposition", disposition.as_str())],
                &body,
            )?;
            true
        }
        None => false,
    };
    debug!(uri = ?document.uri, metadata = wrote_metadata, content = wrote_content, "composed document parts");
    Ok(())
}

/// Prepared body for a batch write, framed with `boundary` and closed.
pub fn compose_batch(documents: &[Document], boundary: &str) -> Result<Vec<u8>> {
    check_boundary(boundary)?;
    let mut writer = MultipartWriter::new(Vec::new(), boundary);
    for document in documents {
        write_document(&mut writer, document)?;
    }
    writer.finish()?;
    debug!(documents = documents.len(), parts = writer.parts(), "composed batch body");
    Ok(writer.into_inner())
}

/// Long-lived single-document write: metadata and the content part headers are written when
/// the stream opens; the caller then appends raw content bytes. `end` writes the closing
/// delimiter and ends the request body.
pub struct DocumentWriteStream<B: RequestBody> {
    writer: MultipartWriter<B>,
    uri: Option<String>,
    has_content_part: bool,
}

impl<B: RequestBody> DocumentWriteStream<B> {
    pub fn open(body: B, document: &Document, boundary: &str) -> Result<Self> {
        check_boundary(boundary)?;
        check_header_safe(document)?;
        let mut writer = MultipartWriter::new(body, boundary);
        write_metadata_part(&mut writer, document)?;
        let content_type = document.effective_content_type().map(str::to_string);
        let has_content_part = content_type.is_some();
        if let Some(content_type) = content_type {
            let disposition = format_disposition(document.uri.as_deref(), "content");
            writer.start_part(&[("Content-Type", content_type.as_str()), ("Content-Disposition", disposition.as_str())])?;
            if let Some(content) = &document.content {
                let initial = content_bytes(document, content)?;
                writer.write_body(&initial)?;
            }
        }
        debug!(uri = ?document.uri, content = has_content_part, "opened document write stream");
        Ok(Self {
            writer,
            uri: document.uri.clone(),
            has_content_part,
        })
    }

    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    /// Append raw content bytes.
    pub fn write(&mut self, chunk: &[u8]) -> Result<()> {
        if self.writer.is_finished() {
            return Err(DocumentError::usage("write after end of document write stream"));
        }
        if !self.has_content_part {
            return Err(DocumentError::usage("document write stream has no content part"));
        }
        self.writer.write_body(chunk)?;
        Ok(())
    }

    /// Write an optional last chunk, the closing delimiter, and end the request body.
    pub fn end(mut self, last: Option<&[u8]>) -> Result<B> {
        if let Some(chunk) = last {
            self.write(chunk)?;
        }
        self.writer.finish()?;
        debug!(uri = ?self.uri, "closed document write stream");
        Ok(self.writer.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn batch_writes_metadata_then_content() {
        let docs = [Document::new("/a.json").json(json!({"x": 1})).collections(["c1"])];
        let body = String::from_utf8(compose_batch(&docs, "B").unwrap()).unwrap();
        let expected = concat!(
            "--B\r\n",
            "Content-Type: application/json; encoding=utf-8\r\n",
            "Content-Disposition: attachment; filename=\"/a.json\"; category=metadata\r\n",
            "\r\n",
            "{\"collections\":[\"c1\"]}",
            "\r\n--B\r\n",
            "Content-Type: application/json\r\n",
            "Content-Disposition: attachment; filename=\"/a.json\"; category=content\r\n",
            "\r\n",
            "{\"x\":1}",
            "\r\n--B--\r\n",
        );
        assert_eq!(body, expected);
    }

    #[test]
    fn text_content_declares_utf8_and_anonymous_is_inline() {
        let docs = [Document::anonymous().text("hello").content_type("text/plain")];
        let body = String::from_utf8(compose_batch(&docs, "B").unwrap()).unwrap();
        assert!(body.contains("Content-Type: text/plain; encoding=utf-8\r\n"));
        assert!(body.contains("Content-Disposition: inline; category=content\r\n"));
        assert!(!body.contains("category=metadata"));
    }

    #[test]
    fn existing_charset_is_kept() {
        let docs = [Document::new("/a.txt").text("x").content_type("text/plain; charset=utf-8")];
        let body = String::from_utf8(compose_batch(&docs, "B").unwrap()).unwrap();
        assert!(body.contains("Content-Type: text/plain; charset=utf-8\r\n"));
    }

    #[test]
    fn metadata_only_document_writes_one_part() {
        let docs = [Document::new("/a.json").quality(5)];
        let body = String::from_utf8(compose_batch(&docs, "B").unwrap()).unwrap();
        assert_eq!(body.matches("\r\n\r\n").count(), 1);
        assert!(body.contains("{\"quality\":5}"));
    }

    #[test]
    fn invalid_boundary_is_a_usage_error() {
        assert!(matches!(compose_batch(&[], "bad boundary"), Err(DocumentError::Usage(_))));
    }

    #[test]
    fn write_stream_frames_manual_content() {
        let doc = Document::new("/img.png").content_type("image/png").collections(["pics"]);
        let mut stream = DocumentWriteStream::open(Vec::new(), &doc, "B").unwrap();
        stream.write(&[0x89, b'P']).unwrap();
        let out = stream.end(Some(b"NG")).unwrap();
        let text = String::from_utf8_lossy(&out).into_owned();
        assert!(text.starts_with("--B\r\nContent-Type: application/json; encoding=utf-8\r\n"));
        assert!(text.contains(
            "\r\n--B\r\nContent-Type: image/png\r\nContent-Disposition: attachment; filename=\"/img.png\"; category=content\r\n\r\n"
        ));
        assert!(out.ends_with(b"\x89PNG\r\n--B--\r\n"));
    }

    #[test]
    fn write_stream_without_content_rejects_writes() {
        let doc = Document::new("/a.json").quality(1);
        let mut stream = DocumentWriteStream::open(Vec::new(), &doc, "B").unwrap();
        assert!(matches!(stream.write(b"x"), Err(DocumentError::Usage(_))));
        let out = stream.end(None).unwrap();
        assert!(out.ends_with(b"\r\n--B--\r\n"));
    }

    #[test]
    fn batch_boundary_appends_differentiator() {
        assert_eq!(batch_boundary("MLBOUND_1"), "MLBOUND_11");
        assert_eq!(multipart_content_type("x"), "multipart/mixed; boundary=x");
    }

    #[test]
    fn uri_that_would_break_the_header_is_rejected() {
        let quoted = [Document::new("/a\"b.json").json(json!({}))];
        assert!(matches!(compose_batch(&quoted, "B"), Err(DocumentError::Usage(_))));
        let injected = Document::new("/a.json\r\nX-Injected: 1").text("x");
        assert!(matches!(
            DocumentWriteStream::open(Vec::new(), &injected, "B"),
            Err(DocumentError::Usage(_))
        ));
        let bad_type = [Document::new("/a.txt").text("x").content_type("text/plain\r\nX: y")];
        assert!(matches!(compose_batch(&bad_type, "B"), Err(DocumentError::Usage(_))));
    }
}

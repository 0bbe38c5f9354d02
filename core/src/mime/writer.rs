/*
 * writer.rs
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

//! Multipart body writer: frames parts with delimiters onto a request body.

use std::io;

use crate::protocol::http::RequestBody;

/// Writes `--boundary` framed parts onto a request body. Part bodies may be written in any
/// number of chunks between `start_part` and the next `start_part` or `finish`.
pub struct MultipartWriter<B> {
    body: B,
    boundary: String,
    parts: usize,
    finished: bool,
}

impl<B: RequestBody> MultipartWriter<B> {
    pub fn new(body: B, boundary: impl Into<String>) -> Self {
        Self {
            body,
            boundary: boundary.into(),
            parts: 0,
            finished: false,
        }
    }

    /// Number of parts started so far.
    pub fn parts(&self) -> usize {
        self.parts
    }

    /// Delimiter line plus headers plus the blank line. The CRLF ending the previous body is part
    /// of this delimiter.
    pub fn start_part(&mut self, headers: &[(&str, &str)]) -> io::Result<()> {
        let mut out = Vec::with_capacity(64 + self.boundary.len());
        if self.parts > 0 {
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(b"--");
        out.extend_from_slice(self.boundary.as_bytes());
        out.extend_from_slice(b"\r\n");
        for (name, value) in headers {
            out.extend_from_slice(name.as_bytes());
            out.extend_from_slice(b": ");
            out.extend_from_slice(value.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(b"\r\n");
        self.parts += 1;
        self.body.write(&out)
    }

    pub fn write_body(&mut self, data: &[u8]) -> io::Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        self.body.write(data)
    }

    pub fn write_part(&mut self, headers: &[(&str, &str)], data: &[u8]) -> io::Result<()> {
        self.start_part(headers)?;
        self.write_body(data)
    }

    /// Closing delimiter, then end of the request body. Idempotent.
    pub fn finish(&mut self) -> io::Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        let mut out = Vec::with_capacity(self.boundary.len() + 8);
        if self.parts > 0 {
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(b"--");
        out.extend_from_slice(self.boundary.as_bytes());
        out.extend_from_slice(b"--\r\n");
        self.body.write(&out)?;
        self.body.end()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn into_inner(self) -> B {
        self.body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_parts_and_closes() {
        let mut w = MultipartWriter::new(Vec::new(), "b");
        w.write_part(&[("Content-Type", "text/plain")], b"one").unwrap();
        w.start_part(&[]).unwrap();
        w.write_body(b"t").unwrap();
        w.write_body(b"wo").unwrap();
        w.finish().unwrap();
        w.finish().unwrap();
        assert_eq!(w.parts(), 2);
        let out = w.into_inner();
        assert_eq!(
            out,
            b"--b\r\nContent-Type: text/plain\r\n\r\none\r\n--b\r\n\r\ntwo\r\n--b--\r\n".to_vec()
        );
    }

    #[test]
    fn empty_body_is_just_the_closing_delimiter() {
        let mut w = MultipartWriter::new(Vec::new(), "b");
        w.finish().unwrap();
        assert_eq!(w.into_inner(), b"--b--\r\n".to_vec());
    }
}

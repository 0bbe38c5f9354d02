/*
 * parser.rs
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

//! Multipart splitter: receive(buffer) contract, byte-exact bodies, delimiter known up front.
//!
//! The CRLF preceding a delimiter belongs to the delimiter, so part bodies are delivered exactly
//! as sent. Headers are consumed line by line; bodies are scanned for `CRLF--boundary` and
//! everything that cannot be the start of a delimiter is forwarded immediately.

use bytes::BytesMut;

use crate::mime::handler::{MimeHandler, MimeLocator, MimeParseError};
use crate::mime::utils::is_valid_boundary;

/// Upper bound on one part's header block.
const MAX_HEADER_BYTES: usize = 64 * 1024;
/// Upper bound on the remainder of a delimiter line (transport padding).
const MAX_DELIMITER_LINE: usize = 998;

/// Event-driven multipart splitter. Feed data via receive(); the handler passed in gets callbacks.
#[derive(Debug)]
pub struct MultipartParser {
    state: ParserState,
    /// Unconsumed input. Seeded with CRLF so a body opening directly with a delimiter matches;
    /// `line` starts at 0 to absorb the seed.
    buf: BytesMut,
    /// `\r\n--` followed by the boundary.
    delimiter: Vec<u8>,
    /// Header being assembled (continuation lines are appended)
    pending_header: Option<(String, String)>,
    header_bytes: usize,
    consumed: u64,
    line: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ParserState {
    Preamble,
    DelimiterTail,
    Header,
    Body,
    Epilogue,
}

impl MultipartParser {
    pub fn new(boundary: &str) -> Result<Self, MimeParseError> {
        if !is_valid_boundary(boundary) {
            return Err(MimeParseError::new(format!("invalid multipart boundary: {:?}", boundary)));
        }
        let mut delimiter = Vec::with_capacity(boundary.len() + 4);
        delimiter.extend_from_slice(b"\r\n--");
        delimiter.extend_from_slice(boundary.as_bytes());
        let mut buf = BytesMut::with_capacity(8192);
        buf.extend_from_slice(b"\r\n");
        Ok(Self {
            state: ParserState::Preamble,
            buf,
            delimiter,
            pending_header: None,
            header_bytes: 0,
            consumed: 0,
            line: 0,
        })
    }

    /// Process as much of buf as possible. Bytes that may start a delimiter are kept for the next call.
    pub fn receive<H: MimeHandler>(&mut self, buf: &[u8], handler: &mut H) -> Result<(), MimeParseError> {
        if buf.is_empty() {
            return Ok(());
        }
        self.buf.extend_from_slice(buf);
        while self.step(handler)? {}
        Ok(())
    }

    /// End of input. Fails unless the closing delimiter was seen.
    pub fn close<H: MimeHandler>(&mut self, handler: &mut H) -> Result<(), MimeParseError> {
        while self.step(handler)? {}
        match self.state {
            ParserState::Epilogue => Ok(()),
            ParserState::Preamble => Err(MimeParseError::at(
                "no multipart delimiter found in body",
                self.locator(),
            )),
            _ => Err(MimeParseError::at(
                "multipart body ended before closing delimiter",
                self.locator(),
            )),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.state == ParserState::Epilogue
    }

    fn locator(&self) -> MimeLocator {
        // The CRLF seed is not part of the caller's input.
        MimeLocator {
            offset: self.consumed.saturating_sub(2),
            line: self.line,
        }
    }

    fn consume(&mut self, n: usize) -> BytesMut {
        let taken = self.buf.split_to(n);
        self.consumed += n as u64;
        self.line += taken.iter().filter(|&&b| b == b'\n').count() as u64;
        taken
    }

    /// One state transition. Returns false when more input is needed.
    fn step<H: MimeHandler>(&mut self, handler: &mut H) -> Result<bool, MimeParseError> {
        match self.state {
            ParserState::Preamble => Ok(self.scan_preamble()),
            ParserState::DelimiterTail => self.delimiter_tail(handler),
            ParserState::Header => self.header_line(handler),
            ParserState::Body => self.body(handler),
            ParserState::Epilogue => {
                let n = self.buf.len();
                if n > 0 {
                    self.consume(n);
                }
                Ok(false)
            }
        }
    }

    fn scan_preamble(&mut self) -> bool {
        match find(&self.buf, &self.delimiter) {
            Some(i) => {
                let n = i + self.delimiter.len();
                self.consume(n);
                self.state = ParserState::DelimiterTail;
                true
            }
            None => {
                let keep = self.delimiter.len() - 1;
                if self.buf.len() > keep {
                    let n = self.buf.len() - keep;
                    self.consume(n);
                }
                false
            }
        }
    }

    fn delimiter_tail<H: MimeHandler>(&mut self, handler: &mut H) -> Result<bool, MimeParseError> {
        if self.buf.len() < 2 {
            return Ok(false);
        }
        if self.buf.starts_with(b"--") {
            self.consume(2);
            self.state = ParserState::Epilogue;
            handler.finish()?;
            return Ok(true);
        }
        let newline = match self.buf.iter().position(|&b| b == b'\n') {
            Some(p) => p,
            None => {
                if self.buf.len() > MAX_DELIMITER_LINE {
                    return Err(MimeParseError::at("delimiter line too long", self.locator()));
                }
                return Ok(false);
            }
        };
        let padding = trim_cr(&self.buf[..newline]);
        if !padding.iter().all(|&b| b == b' ' || b == b'\t') {
            return Err(MimeParseError::at(
                "unexpected characters after multipart delimiter",
                self.locator(),
            ));
        }
        self.consume(newline + 1);
        self.header_bytes = 0;
        self.state = ParserState::Header;
        handler.set_locator(self.locator());
        handler.start_part()?;
        Ok(true)
    }

    fn header_line<H: MimeHandler>(&mut self, handler: &mut H) -> Result<bool, MimeParseError> {
        let newline = match self.buf.iter().position(|&b| b == b'\n') {
            Some(p) => p,
            None => {
                if self.header_bytes + self.buf.len() > MAX_HEADER_BYTES {
                    return Err(MimeParseError::at("part header block too large", self.locator()));
                }
                return Ok(false);
            }
        };
        let locator = self.locator();
        let raw = self.consume(newline + 1);
        self.header_bytes += raw.len();
        if self.header_bytes > MAX_HEADER_BYTES {
            return Err(MimeParseError::at("part header block too large", locator));
        }
        let line = trim_cr(&raw[..raw.len() - 1]);
        if line.is_empty() {
            self.flush_header(handler)?;
            handler.end_headers()?;
            self.state = ParserState::Body;
            return Ok(true);
        }
        if line[0] == b' ' || line[0] == b'\t' {
            let continuation = String::from_utf8_lossy(line);
            return match self.pending_header.as_mut() {
                Some((_, value)) => {
                    value.push(' ');
                    value.push_str(continuation.trim());
                    Ok(true)
                }
                None => Err(MimeParseError::at("continuation line without a header", locator)),
            };
        }
        self.flush_header(handler)?;
        let (name, value) = split_header(line)
            .ok_or_else(|| MimeParseError::at("malformed part header line", locator))?;
        self.pending_header = Some((
            String::from_utf8_lossy(name).trim().to_string(),
            String::from_utf8_lossy(value).trim().to_string(),
        ));
        Ok(true)
    }

    fn flush_header<H: MimeHandler>(&mut self, handler: &mut H) -> Result<(), MimeParseError> {
        if let Some((name, value)) = self.pending_header.take() {
            handler.header(&name, &value)?;
        }
        Ok(())
    }

    fn body<H: MimeHandler>(&mut self, handler: &mut H) -> Result<bool, MimeParseError> {
        match find(&self.buf, &self.delimiter) {
            Some(i) => {
                if i > 0 {
                    let data = self.consume(i);
                    handler.body_content(&data)?;
                }
                self.consume(self.delimiter.len());
                handler.end_part()?;
                self.state = ParserState::DelimiterTail;
                Ok(true)
            }
            None => {
                let keep = self.delimiter.len() - 1;
                if self.buf.len() > keep {
                    let data = self.consume(self.buf.len() - keep);
                    handler.body_content(&data)?;
                }
                Ok(false)
            }
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn trim_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn split_header(line: &[u8]) -> Option<(&[u8], &[u8])> {
    let colon = line.iter().position(|&b| b == b':')?;
    if colon == 0 {
        return None;
    }
    Some((&line[..colon], &line[colon + 1..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CollectingHandler {
        parts: Vec<(Vec<(String, String)>, Vec<u8>)>,
        body_calls: usize,
        finished: bool,
    }

    impl MimeHandler for CollectingHandler {
        fn start_part(&mut self) -> Result<(), MimeParseError> {
            self.parts.push((Vec::new(), Vec::new()));
            Ok(())
        }
        fn header(&mut self, name: &str, value: &str) -> Result<(), MimeParseError> {
            if let Some(p) = self.parts.last_mut() {
                p.0.push((name.to_string(), value.to_string()));
            }
            Ok(())
        }
        fn body_content(&mut self, data: &[u8]) -> Result<(), MimeParseError> {
            self.body_calls += 1;
            if let Some(p) = self.parts.last_mut() {
                p.1.extend_from_slice(data);
            }
            Ok(())
        }
        fn finish(&mut self) -> Result<(), MimeParseError> {
            self.finished = true;
            Ok(())
        }
    }

    const TWO_PARTS: &[u8] = b"--sep\r\nContent-Type: application/json\r\nContent-Disposition: inline\r\n\r\n{\"a\":1}\r\n--sep\r\nContent-Type: text/plain\r\n\r\nline one\nline two\r\n--sep--\r\n";

    #[test]
    fn two_parts() {
        let mut parser = MultipartParser::new("sep").unwrap();
        let mut h = CollectingHandler::default();
        parser.receive(TWO_PARTS, &mut h).unwrap();
        parser.close(&mut h).unwrap();
        assert!(h.finished);
        assert_eq!(h.parts.len(), 2);
        assert_eq!(h.parts[0].0[0], ("Content-Type".to_string(), "application/json".to_string()));
        assert_eq!(h.parts[0].0[1], ("Content-Disposition".to_string(), "inline".to_string()));
        assert_eq!(h.parts[0].1, b"{\"a\":1}");
        assert_eq!(h.parts[1].1, b"line one\nline two");
    }

    #[test]
    fn byte_at_a_time_matches_single_buffer() {
        let mut parser = MultipartParser::new("sep").unwrap();
        let mut h = CollectingHandler::default();
        for b in TWO_PARTS {
            parser.receive(std::slice::from_ref(b), &mut h).unwrap();
        }
        parser.close(&mut h).unwrap();
        assert_eq!(h.parts.len(), 2);
        assert_eq!(h.parts[0].1, b"{\"a\":1}");
        assert_eq!(h.parts[1].1, b"line one\nline two");
    }

    #[test]
    fn binary_body_is_byte_exact() {
        let mut msg = b"--sep\r\nContent-Type: application/octet-stream\r\n\r\n".to_vec();
        let body: Vec<u8> = vec![0, 13, 10, 45, 45, 255, 13, 10, 13, 10, 7];
        msg.extend_from_slice(&body);
        msg.extend_from_slice(b"\r\n--sep--");
        let mut parser = MultipartParser::new("sep").unwrap();
        let mut h = CollectingHandler::default();
        parser.receive(&msg, &mut h).unwrap();
        parser.close(&mut h).unwrap();
        assert_eq!(h.parts[0].1, body);
    }

    #[test]
    fn large_body_streams_before_delimiter() {
        let mut msg = b"--sep\r\n\r\n".to_vec();
        msg.extend(std::iter::repeat(b'x').take(100));
        let mut parser = MultipartParser::new("sep").unwrap();
        let mut h = CollectingHandler::default();
        parser.receive(&msg, &mut h).unwrap();
        // All but a possible delimiter prefix is already delivered.
        assert_eq!(h.parts[0].1.len(), 100 - ("\r\n--sep".len() - 1));
        parser.receive(b"\r\n--sep--\r\n", &mut h).unwrap();
        parser.close(&mut h).unwrap();
        assert_eq!(h.parts[0].1.len(), 100);
        assert!(h.body_calls >= 2);
    }

    #[test]
    fn preamble_epilogue_and_padding_are_ignored() {
        let msg = b"This is a preamble.\r\n--sep  \t\r\nX-Test: 1\r\n\r\nbody\r\n--sep--\r\nepilogue text";
        let mut parser = MultipartParser::new("sep").unwrap();
        let mut h = CollectingHandler::default();
        parser.receive(msg, &mut h).unwrap();
        parser.close(&mut h).unwrap();
        assert_eq!(h.parts.len(), 1);
        assert_eq!(h.parts[0].1, b"body");
    }

    #[test]
    fn folded_header_is_unfolded() {
        let msg = b"--sep\r\nContent-Disposition: attachment;\r\n\tfilename=\"/a.json\"\r\n\r\n\r\n--sep--";
        let mut parser = MultipartParser::new("sep").unwrap();
        let mut h = CollectingHandler::default();
        parser.receive(msg, &mut h).unwrap();
        parser.close(&mut h).unwrap();
        assert_eq!(h.parts[0].0[0].1, "attachment; filename=\"/a.json\"");
        assert!(h.parts[0].1.is_empty());
    }

    #[test]
    fn missing_closing_delimiter_is_an_error() {
        let mut parser = MultipartParser::new("sep").unwrap();
        let mut h = CollectingHandler::default();
        parser.receive(b"--sep\r\n\r\npartial", &mut h).unwrap();
        let err = parser.close(&mut h).unwrap_err();
        assert!(err.message.contains("before closing delimiter"));
    }

    #[test]
    fn body_without_delimiter_is_an_error() {
        let mut parser = MultipartParser::new("sep").unwrap();
        let mut h = CollectingHandler::default();
        parser.receive(b"just some text", &mut h).unwrap();
        let err = parser.close(&mut h).unwrap_err();
        assert!(err.message.contains("no multipart delimiter"));
    }

    #[test]
    fn header_without_colon_is_an_error() {
        let mut parser = MultipartParser::new("sep").unwrap();
        let mut h = CollectingHandler::default();
        let err = parser.receive(b"--sep\r\nnot a header\r\n\r\n", &mut h).unwrap_err();
        assert!(err.message.contains("malformed part header"));
        assert_eq!(err.locator.map(|l| l.line), Some(2));
    }

    #[test]
    fn garbage_after_delimiter_is_an_error() {
        let mut parser = MultipartParser::new("sep").unwrap();
        let mut h = CollectingHandler::default();
        assert!(parser.receive(b"--sepx\r\n\r\n", &mut h).is_err());
    }

    #[test]
    fn invalid_boundary_is_rejected() {
        assert!(MultipartParser::new("bad boundary\n").is_err());
    }
}

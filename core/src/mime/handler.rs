/*
 * handler.rs
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

//! Multipart handler trait: receives part events (part start, headers, body chunks, part end, finish).

use thiserror::Error;

/// Handler for multipart splitting events (push model). The splitter calls these as it reads.
///
/// Per part: `start_part`, `header` (×n), `end_headers`, `body_content` (×n), `end_part`.
/// After the closing delimiter: `finish`. Returning an error aborts the splitter.
pub trait MimeHandler {
    fn set_locator(&mut self, _locator: MimeLocator) {}

    fn start_part(&mut self) -> Result<(), MimeParseError> {
        Ok(())
    }

    /// One unfolded header field. Name is as received; value is trimmed.
    fn header(&mut self, _name: &str, _value: &str) -> Result<(), MimeParseError> {
        Ok(())
    }

    fn end_headers(&mut self) -> Result<(), MimeParseError> {
        Ok(())
    }

    /// Raw part body bytes, byte-exact. Only valid for the duration of the call.
    fn body_content(&mut self, _data: &[u8]) -> Result<(), MimeParseError> {
        Ok(())
    }

    fn end_part(&mut self) -> Result<(), MimeParseError> {
        Ok(())
    }

    /// Closing delimiter seen; no more parts.
    fn finish(&mut self) -> Result<(), MimeParseError> {
        Ok(())
    }
}

/// Position within the multipart body for error reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MimeLocator {
    pub offset: u64,
    pub line: u64,
}

#[derive(Debug, Error)]
#[error("{message}{}", describe_locator(.locator))]
pub struct MimeParseError {
    pub message: String,
    pub locator: Option<MimeLocator>,
}

impl MimeParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            locator: None,
        }
    }

    pub fn at(message: impl Into<String>, locator: MimeLocator) -> Self {
        Self {
            message: message.into(),
            locator: Some(locator),
        }
    }
}

fn describe_locator(locator: &Option<MimeLocator>) -> String {
    match locator {
        Some(l) => format!(" (line {}, offset {})", l.line, l.offset),
        None => String::new(),
    }
}

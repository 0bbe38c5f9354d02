/*
 * content_type.rs
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

//! Content-Type header (RFC 2045): media type plus parameters.

use super::parameter::Parameter;
use super::utils::is_token;

#[derive(Debug, Clone)]
pub struct ContentType {
    primary_type: String,
    sub_type: String,
    parameters: Vec<Parameter>,
}

impl ContentType {
    pub fn new(primary_type: impl Into<String>, sub_type: impl Into<String>, parameters: Vec<Parameter>) -> Self {
        Self {
            primary_type: primary_type.into().to_ascii_lowercase(),
            sub_type: sub_type.into().to_ascii_lowercase(),
            parameters,
        }
    }

    pub fn get_primary_type(&self) -> &str {
        &self.primary_type
    }

    pub fn get_sub_type(&self) -> &str {
        &self.sub_type
    }

    /// Last `+`-separated segment of the subtype: `xml` for `vnd.foo+xml`.
    pub fn get_suffix(&self) -> &str {
        self.sub_type.rsplit('+').next().unwrap_or(&self.sub_type)
    }

    pub fn is_mime_type(&self, primary: &str, sub: &str) -> bool {
        self.primary_type.eq_ignore_ascii_case(primary) && self.sub_type.eq_ignore_ascii_case(sub)
    }

    /// First parameter with this name (case-insensitive).
    pub fn get_parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|p| p.is_named(name))
            .map(Parameter::get_value)
    }
}

/// Parse a Content-Type header value. None when the media type is not `token/token`.
pub fn parse_content_type(value: &str) -> Option<ContentType> {
    let value = value.trim();
    let (media, params) = match value.find(';') {
        Some(i) => (value[..i].trim(), &value[i + 1..]),
        None => (value, ""),
    };
    let (primary, sub) = media.split_once('/')?;
    let (primary, sub) = (primary.trim(), sub.trim());
    if !is_token(primary) || !is_token(sub) {
        return None;
    }
    Some(ContentType::new(primary, sub, parse_parameter_list(params)))
}

/// Parse a semicolon-separated parameter list (`name=value; name="quoted \"value\""`).
/// Malformed entries are skipped.
pub fn parse_parameter_list(params: &str) -> Vec<Parameter> {
    let bytes = params.as_bytes();
    let len = bytes.len();
    let mut parameters = Vec::new();
    let mut pos = 0;

    while pos < len {
        while pos < len && (bytes[pos] == b';' || bytes[pos].is_ascii_whitespace()) {
            pos += 1;
        }
        if pos >= len {
            break;
        }
        let next_semi = |from: usize| bytes[from..].iter().position(|&b| b == b';').map(|i| from + i).unwrap_or(len);
        let eq = match bytes[pos..].iter().position(|&b| b == b'=' || b == b';') {
            Some(i) if bytes[pos + i] == b'=' => pos + i,
            _ => {
                pos = next_semi(pos);
                continue;
            }
        };
        let name = params[pos..eq].trim();
        pos = eq + 1;
        while pos < len && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        let value = if pos < len && bytes[pos] == b'"' {
            pos += 1;
            let mut v = Vec::new();
            while pos < len {
                match bytes[pos] {
                    b'\\' if pos + 1 < len => {
                        v.push(bytes[pos + 1]);
                        pos += 2;
                    }
                    b'"' => {
                        pos += 1;
                        break;
                    }
                    c => {
                        v.push(c);
                        pos += 1;
                    }
                }
            }
            pos = next_semi(pos);
            String::from_utf8_lossy(&v).into_owned()
        } else {
            let end = next_semi(pos);
            let v = params[pos..end].trim().to_string();
            pos = end;
            v
        };
        if is_token(name) {
            parameters.push(Parameter::new(name, value));
        }
    }
    parameters
}

/// True for `multipart/mixed` (any parameters).
pub fn is_multipart_mixed(value: &str) -> bool {
    parse_content_type(value).map_or(false, |ct| ct.is_mime_type("multipart", "mixed"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_type_and_boundary() {
        let ct = parse_content_type("multipart/mixed; boundary=MLBOUND_1422662400000").unwrap();
        assert_eq!(ct.get_primary_type(), "multipart");
        assert_eq!(ct.get_sub_type(), "mixed");
        assert_eq!(ct.get_parameter("Boundary"), Some("MLBOUND_1422662400000"));
    }

    #[test]
    fn quoted_parameter_with_escapes() {
        let ct = parse_content_type("text/plain; name=\"a \\\"b\\\"; c\"; charset=utf-8").unwrap();
        assert_eq!(ct.get_parameter("name"), Some("a \"b\"; c"));
        assert_eq!(ct.get_parameter("charset"), Some("utf-8"));
    }

    #[test]
    fn suffix_of_structured_subtype() {
        let ct = parse_content_type("application/vnd.marklogic-rdf+xml").unwrap();
        assert_eq!(ct.get_suffix(), "xml");
        let ct = parse_content_type("application/json").unwrap();
        assert_eq!(ct.get_suffix(), "json");
    }

    #[test]
    fn rejects_missing_subtype() {
        assert!(parse_content_type("application").is_none());
        assert!(parse_content_type("").is_none());
    }

    #[test]
    fn multipart_mixed_detection() {
        assert!(is_multipart_mixed("Multipart/Mixed; boundary=x"));
        assert!(!is_multipart_mixed("application/json"));
        assert!(!is_multipart_mixed("multipart/related; boundary=x"));
    }
}

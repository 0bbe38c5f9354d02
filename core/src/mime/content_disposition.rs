/*
 * content_disposition.rs
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

//! Part headers: Content-Disposition tokenizing into a part attribute map.
//!
//! The disposition value is read as a flat run of atoms (quoted string, `;`, `=`, bare token)
//! rather than as RFC 2183 `type *(; param)`, because the server repeats parameters
//! (`category=collections; category=permissions`) and the repeats must accumulate.

use std::collections::BTreeMap;

use super::utils::unquote;

/// Disposition type of a part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartType {
    /// No document identity: search summaries, facet results, single anonymous documents.
    Inline,
    /// Tied to a document URI through `filename`.
    Attachment,
}

impl PartType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartType::Inline => "inline",
            PartType::Attachment => "attachment",
        }
    }

    fn from_atom(atom: &str) -> Option<Self> {
        match atom {
            "inline" => Some(PartType::Inline),
            "attachment" => Some(PartType::Attachment),
            _ => None,
        }
    }
}

/// Disposition parameter value; a repeated key collapses into an ordered sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    Single(String),
    Multiple(Vec<String>),
}

impl AttrValue {
    pub fn first(&self) -> &str {
        match self {
            AttrValue::Single(v) => v,
            AttrValue::Multiple(vs) => vs.first().map(String::as_str).unwrap_or(""),
        }
    }

    pub fn values(&self) -> Vec<&str> {
        match self {
            AttrValue::Single(v) => vec![v.as_str()],
            AttrValue::Multiple(vs) => vs.iter().map(String::as_str).collect(),
        }
    }

    fn push(&mut self, value: String) {
        match self {
            AttrValue::Single(v) => {
                let first = std::mem::take(v);
                *self = AttrValue::Multiple(vec![first, value]);
            }
            AttrValue::Multiple(vs) => vs.push(value),
        }
    }
}

/// Attributes of one multipart part, from its Content-Disposition, Content-Type and Content-Length.
///
/// `uri` is only ever present on attachment parts that carried a `filename` parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartHeaders {
    pub part_type: Option<PartType>,
    pub content_type: Option<String>,
    pub content_length: Option<String>,
    attributes: BTreeMap<String, AttrValue>,
}

impl PartHeaders {
    pub fn uri(&self) -> Option<&str> {
        self.attribute("uri")
    }

    pub fn category(&self) -> Option<&str> {
        self.attribute("category")
    }

    /// All `category` values in header order.
    pub fn categories(&self) -> Vec<&str> {
        self.attributes.get("category").map(AttrValue::values).unwrap_or_default()
    }

    /// Explicit `format` disposition parameter, if the server sent one.
    pub fn format(&self) -> Option<&str> {
        self.attribute("format")
    }

    pub fn is_inline(&self) -> bool {
        self.part_type == Some(PartType::Inline)
    }

    /// A category other than `content` marks a metadata part.
    pub fn is_metadata(&self) -> bool {
        self.category().map_or(false, |c| c != "content")
    }

    /// First value of a disposition parameter (`filename` is exposed as `uri`).
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(AttrValue::first)
    }

    pub fn attributes(&self) -> &BTreeMap<String, AttrValue> {
        &self.attributes
    }

    fn insert(&mut self, key: String, value: String) {
        match self.attributes.get_mut(&key) {
            Some(existing) => existing.push(value),
            None => {
                self.attributes.insert(key, AttrValue::Single(value));
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Atom<'a> {
    Semi,
    Equals,
    Word(&'a str),
}

/// Split a disposition value into atoms. A quoted string keeps its quotes; a stray `"` is dropped.
fn tokenize(value: &str) -> Vec<Atom<'_>> {
    let bytes = value.as_bytes();
    let mut atoms = Vec::new();
    let mut pos = 0;
    while pos < bytes.len() {
        match bytes[pos] {
            b';' => {
                atoms.push(Atom::Semi);
                pos += 1;
            }
            b'=' => {
                atoms.push(Atom::Equals);
                pos += 1;
            }
            b'"' => match bytes[pos + 1..].iter().position(|&b| b == b'"') {
                Some(close) => {
                    let end = pos + 1 + close + 1;
                    atoms.push(Atom::Word(&value[pos..end]));
                    pos = end;
                }
                None => pos += 1,
            },
            b if b.is_ascii_whitespace() => pos += 1,
            _ => {
                let start = pos;
                while pos < bytes.len() && !matches!(bytes[pos], b';' | b'=' | b'"') && !bytes[pos].is_ascii_whitespace() {
                    pos += 1;
                }
                atoms.push(Atom::Word(&value[start..pos]));
            }
        }
    }
    atoms
}

/// Read one part's attributes from its headers. Header names match case-insensitively; the first
/// occurrence of Content-Disposition, Content-Type and Content-Length is used.
pub fn parse_part_headers<'a, I>(headers: I) -> PartHeaders
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut part = PartHeaders::default();
    let mut disposition = None;
    for (name, value) in headers {
        if name.eq_ignore_ascii_case("content-disposition") {
            disposition.get_or_insert(value);
        } else if name.eq_ignore_ascii_case("content-type") {
            part.content_type.get_or_insert_with(|| value.to_string());
        } else if name.eq_ignore_ascii_case("content-length") {
            part.content_length.get_or_insert_with(|| value.to_string());
        }
    }
    if let Some(value) = disposition {
        apply_disposition(&mut part, value);
    }
    if part.part_type != Some(PartType::Attachment) {
        part.attributes.remove("uri");
    }
    part
}

fn apply_disposition(part: &mut PartHeaders, value: &str) {
    let mut atoms = tokenize(value);
    if atoms.last() != Some(&Atom::Semi) {
        atoms.push(Atom::Semi);
    }
    let mut key: Option<&str> = None;
    let mut val: Option<&str> = None;
    for atom in atoms {
        match atom {
            Atom::Semi => {
                if let Some(k) = key.take() {
                    match val.take() {
                        Some(v) => {
                            let k = if k == "filename" { "uri" } else { k };
                            part.insert(k.to_string(), unquote(v).to_string());
                        }
                        None => {
                            if let Some(t) = PartType::from_atom(k) {
                                part.part_type = Some(t);
                            }
                        }
                    }
                }
            }
            Atom::Equals => {}
            Atom::Word(w) => {
                if key.is_none() {
                    key = Some(w);
                } else {
                    val = Some(w);
                }
            }
        }
    }
}

/// Content-Disposition value for an outgoing part.
pub fn format_disposition(uri: Option<&str>, category: &str) -> String {
    match uri {
        Some(u) => format!("attachment; filename=\"{}\"; category={}", u, category),
        None => format!("inline; category={}", category),
    }
}

/*
 * mod.rs
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

//! Multipart MIME plumbing for document exchanges (push/handler model, non-blocking buffer contract).

mod content_disposition;
mod content_type;
mod format;
mod handler;
mod parameter;
mod parser;
mod utils;
mod writer;

pub use content_disposition::{format_disposition, parse_part_headers, AttrValue, PartHeaders, PartType};
pub use content_type::{is_multipart_mixed, parse_content_type, parse_parameter_list, ContentType};
pub use format::Format;
pub use handler::{MimeHandler, MimeLocator, MimeParseError};
pub use parameter::Parameter;
pub use parser::MultipartParser;
pub use utils::{is_boundary_char, is_token, is_token_char, is_valid_boundary, media_type_essence, unquote};
pub use writer::MultipartWriter;

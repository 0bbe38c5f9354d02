/*
 * lib.rs
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

//! Bulkdoc core: client-side multipart protocol engine for bulk document reads and writes.
//!
//! Reads arrive as a multipart/mixed body; `ReadDemultiplexer` splits it, classifies
//! each part, pairs metadata with the content that follows it and emits records to an
//! `EventSink`. Writes go the other way through `compose_batch` or `DocumentWriteStream`.
//! `Documents` builds the HTTP requests and hands back the matching response handler.

pub mod config;
pub mod document;
pub mod error;
pub mod mime;
pub mod protocol;

pub use config::{ClientConfig, MULTIPART_BOUNDARY};
pub use document::{
    Category, CollectingSink, ConsumptionMode, Content, Document, DocumentRecord, Documents, EventSink,
    MetadataRecord, ReadDemultiplexer, ReadEvent, Record,
};
pub use error::{DocumentError, Result};

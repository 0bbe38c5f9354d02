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

//! Document exchanges: reading multipart responses into records, composing
//! multipart writes, and the operations that tie them to HTTP requests.

mod check;
mod composer;
mod correlator;
mod demux;
mod operations;
mod record;
mod result;
mod sink;

pub use check::{CheckHandler, CheckResult, DOCUMENT_FORMAT_HEADER};
pub use composer::{
    batch_boundary, compose_batch, multipart_content_type, write_document, DocumentWriteStream,
    BATCH_BOUNDARY_SUFFIX, METADATA_CONTENT_TYPE,
};
pub use correlator::PendingMetadata;
pub use demux::ReadDemultiplexer;
pub use operations::{
    CheckParams, Documents, Exchange, PatchParams, QueryHandler, QueryParams, QueryType, ReadParams,
    RemoveAllParams, RemoveParams, WriteParams,
};
pub use record::{Category, Content, Document, DocumentContent, DocumentRecord, MetadataRecord, METADATA_CATEGORIES};
pub use result::ResultHandler;
pub use sink::{ChannelSink, CollectingSink, ConsumptionMode, EventReceiver, EventSink, ReadEvent, Record};

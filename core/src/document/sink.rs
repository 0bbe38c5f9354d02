/*
 * sink.rs
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

//! Consumer side of a read: consumption modes, events, and sinks.

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::document::record::{Content, DocumentRecord, MetadataRecord};
use crate::error::DocumentError;

/// How records are delivered, chosen once per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsumptionMode {
    /// Every record as `Data`, then `End`. Used for document reads.
    #[default]
    Buffered,
    /// Inline parts as `Summary`, documents and metadata as `Result`, `ResultEnd` after each
    /// binary part. Used for paged query results.
    Streaming,
}

/// One unit handed to the consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Document(DocumentRecord),
    Metadata(MetadataRecord),
    /// Decoded inline part (search summary, facet result, anonymous read).
    Inline(Content),
    /// Raw bytes of a binary part, forwarded as received.
    Chunk(Bytes),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReadEvent {
    Data(Record),
    Summary(Content),
    Result(Record),
    ResultEnd,
    End,
}

impl ConsumptionMode {
    pub fn document(self, document: DocumentRecord) -> ReadEvent {
        self.record(Record::Document(document))
    }

    pub fn metadata(self, metadata: MetadataRecord) -> ReadEvent {
        self.record(Record::Metadata(metadata))
    }

    pub fn inline(self, content: Content) -> ReadEvent {
        match self {
            ConsumptionMode::Buffered => ReadEvent::Data(Record::Inline(content)),
            ConsumptionMode::Streaming => ReadEvent::Summary(content),
        }
    }

    /// Binary chunks are `Data` in both modes.
    pub fn chunk(self, data: Bytes) -> ReadEvent {
        ReadEvent::Data(Record::Chunk(data))
    }

    fn record(self, record: Record) -> ReadEvent {
        match self {
            ConsumptionMode::Buffered => ReadEvent::Data(record),
            ConsumptionMode::Streaming => ReadEvent::Result(record),
        }
    }
}

/// Receives read events. `error` is called at most once per exchange, and no events follow it.
pub trait EventSink {
    fn emit(&mut self, event: ReadEvent);

    /// Default error handler: log and drop. Sinks that surface errors override this.
    fn error(&mut self, err: DocumentError) {
        error!(error = %err, "document exchange failed");
    }
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn emit(&mut self, event: ReadEvent) {
        (**self).emit(event)
    }

    fn error(&mut self, err: DocumentError) {
        (**self).error(err)
    }
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn emit(&mut self, event: ReadEvent) {
        (**self).emit(event)
    }

    fn error(&mut self, err: DocumentError) {
        (**self).error(err)
    }
}

/// Buffers the whole exchange: the promise-style result.
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub events: Vec<ReadEvent>,
    pub error: Option<DocumentError>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ended(&self) -> bool {
        matches!(self.events.last(), Some(ReadEvent::End))
    }

    /// Records from `Data` and `Result` events, in order.
    pub fn records(&self) -> Vec<&Record> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ReadEvent::Data(r) | ReadEvent::Result(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    pub fn documents(&self) -> Vec<&DocumentRecord> {
        self.records()
            .into_iter()
            .filter_map(|r| match r {
                Record::Document(d) => Some(d),
                _ => None,
            })
            .collect()
    }

    /// Events, or the error if the exchange failed.
    pub fn into_result(self) -> Result<Vec<ReadEvent>, DocumentError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.events),
        }
    }
}

impl EventSink for CollectingSink {
    fn emit(&mut self, event: ReadEvent) {
        self.events.push(event);
    }

    fn error(&mut self, err: DocumentError) {
        self.error = Some(err);
    }
}

pub type EventReceiver = mpsc::UnboundedReceiver<Result<ReadEvent, DocumentError>>;

/// Forwards events and errors to an async consumer.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Result<ReadEvent, DocumentError>>,
}

impl ChannelSink {
    pub fn new() -> (Self, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, item: Result<ReadEvent, DocumentError>) {
        if self.tx.send(item).is_err() {
            debug!("event receiver dropped; discarding");
        }
    }
}

impl EventSink for ChannelSink {
    fn emit(&mut self, event: ReadEvent) {
        self.send(Ok(event));
    }

    fn error(&mut self, err: DocumentError) {
        self.send(Err(err));
    }
}

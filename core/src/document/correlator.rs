/*
 * correlator.rs
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

//! Metadata correlator: holds at most one metadata part until the content part for the same
//! URI arrives, or until it has to be flushed on its own.

use tracing::debug;

use crate::document::record::{DocumentRecord, MetadataRecord};

/// Single-slot pending metadata state.
#[derive(Debug, Default)]
pub enum PendingMetadata {
    #[default]
    NoPending,
    Pending(MetadataRecord),
}

impl PendingMetadata {
    pub fn is_pending(&self) -> bool {
        matches!(self, PendingMetadata::Pending(_))
    }

    /// Take the pending record unconditionally (binary content, end of stream).
    pub fn flush(&mut self) -> Option<MetadataRecord> {
        match std::mem::take(self) {
            PendingMetadata::Pending(m) => {
                debug!(uri = ?m.uri, "flushing standalone metadata");
                Some(m)
            }
            PendingMetadata::NoPending => None,
        }
    }

    /// Take the pending record if it belongs to a different document than `uri`.
    pub fn flush_diverged(&mut self, uri: Option<&str>) -> Option<MetadataRecord> {
        let diverged = matches!(self, PendingMetadata::Pending(m) if m.uri.as_deref() != uri);
        if diverged {
            self.flush()
        } else {
            None
        }
    }

    /// Hold a metadata record. Whatever was already pending is returned for standalone emission.
    pub fn hold(&mut self, metadata: MetadataRecord) -> Option<MetadataRecord> {
        debug!(uri = ?metadata.uri, "holding metadata for next content part");
        match std::mem::replace(self, PendingMetadata::Pending(metadata)) {
            PendingMetadata::Pending(previous) => Some(previous),
            PendingMetadata::NoPending => None,
        }
    }

    /// Merge the pending record into `document` when the URIs match. Returns true if merged.
    pub fn merge_into(&mut self, document: &mut DocumentRecord) -> bool {
        if !matches!(self, PendingMetadata::Pending(m) if m.uri == document.uri) {
            return false;
        }
        if let PendingMetadata::Pending(m) = std::mem::take(self) {
            debug!(uri = ?m.uri, "merging metadata into content part");
            document.merge_metadata(m);
        }
        true
    }
}

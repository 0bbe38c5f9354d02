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

//! HTTP response handler trait: the push interface the transport drives for each exchange.
//!
//! Events: status → headers → start_body → body_chunk (×n) → end_body → complete / failed.

use crate::protocol::http::response::Response;

/// Handler for HTTP response events (push model). The transport drives this as data arrives;
/// document operations supply the implementation (demultiplexer, check, result collector).
///
/// Flow for a response with body:
/// 1. `ok(response)` or `error(response)`: status received
/// 2. `header(name, value)`: for each response header
/// 3. `start_body()`: body begins
/// 4. `body_chunk(data)`: for each chunk of body data
/// 5. `end_body()`: body complete
/// 6. `complete()`: response fully complete
///
/// On connection failure or abort only `failed(error)` is called.
pub trait ResponseHandler {
    /// Successful (2xx) status received.
    fn ok(&mut self, response: Response);

    /// Error status (4xx, 5xx) received.
    fn error(&mut self, response: Response);

    /// Called for each response header. Name may repeat for multi-value headers.
    fn header(&mut self, name: &str, value: &str);

    /// Not called for responses without a body (HEAD, 204, 304).
    fn start_body(&mut self);

    /// Data is only valid for the duration of the call.
    fn body_chunk(&mut self, data: &[u8]);

    fn end_body(&mut self);

    fn complete(&mut self);

    /// Connection error, protocol error or cancellation.
    fn failed(&mut self, error: &std::io::Error);
}

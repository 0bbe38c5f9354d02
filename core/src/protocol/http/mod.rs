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

//! HTTP interface boundary: what a transport must drive (responses) and accept (request bodies).
//!
//! The transport itself (connection, TLS, socket retries) lives outside this crate. Multipart
//! bodies are not decoded here; document operations hand in a handler that feeds `MultipartParser`.

mod body;
mod handler;
mod request;
mod response;

pub use body::RequestBody;
pub use handler::ResponseHandler;
pub use request::{Method, RequestBuilder};
pub use response::Response;

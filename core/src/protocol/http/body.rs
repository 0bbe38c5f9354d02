/*
 * body.rs
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

//! Outgoing request body: the transport's incremental write side.

use std::io;

/// Request body that accepts chunks as they are produced and is ended exactly once.
/// A transport write error surfaces as the `io::Error`.
pub trait RequestBody {
    fn write(&mut self, chunk: &[u8]) -> io::Result<()>;

    fn end(&mut self) -> io::Result<()>;
}

/// In-memory body, used for prepared batch bodies.
impl RequestBody for Vec<u8> {
    fn write(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.extend_from_slice(chunk);
        Ok(())
    }

    fn end(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<B: RequestBody + ?Sized> RequestBody for &mut B {
    fn write(&mut self, chunk: &[u8]) -> io::Result<()> {
        (**self).write(chunk)
    }

    fn end(&mut self) -> io::Result<()> {
        (**self).end()
    }
}

/*
 * config.rs
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

//! Client configuration.
//!
//! Loaded from a TOML file or built in code; every field has a default so an
//! empty file is a valid configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{DocumentError, Result};
use crate::mime::is_valid_boundary;

/// Pre-agreed multipart boundary token shared with the server.
pub const MULTIPART_BOUNDARY: &str = "MLBOUND_1422662400000";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    /// Appended as `database=` to every request when set.
    pub database: Option<String>,
    /// Boundary used for requests and, by default, for reading responses.
    pub boundary: String,
    /// Prefer the boundary parameter of a response Content-Type over `boundary`.
    pub trust_response_boundary: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8000,
            database: None,
            boundary: MULTIPART_BOUNDARY.to_string(),
            trust_response_boundary: true,
        }
    }
}

impl ClientConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: ClientConfig = toml::from_str(text).map_err(|e| DocumentError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| DocumentError::Config(format!("{}: {}", path.display(), e)))?;
        match Self::from_toml_str(&text) {
            Ok(config) => {
                info!(path = %path.display(), host = %config.host, port = config.port, "loaded config");
                Ok(config)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "invalid config file");
                Err(e)
            }
        }
    }

    /// `host:port`, the request `Host` header.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(DocumentError::Config("host must not be empty".to_string()));
        }
        // Batch writes append one character to the token.
        if !is_valid_boundary(&self.boundary) || self.boundary.len() >= 70 {
            return Err(DocumentError::Config(format!("invalid multipart boundary: {:?}", self.boundary)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_defaults() {
        let config = ClientConfig::from_toml_str("").unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.boundary, MULTIPART_BOUNDARY);
    }

    #[test]
    fn partial_overrides() {
        let config = ClientConfig::from_toml_str(
            r#"
            host = "db.example.com"
            database = "Documents"
            trust_response_boundary = false
            "#,
        )
        .unwrap();
        assert_eq!(config.host, "db.example.com");
        assert_eq!(config.port, 8000);
        assert_eq!(config.database.as_deref(), Some("Documents"));
        assert!(!config.trust_response_boundary);
    }

    #[test]
    fn bad_boundary_rejected() {
        let err = ClientConfig::from_toml_str("boundary = \"has\\ttab\"").unwrap_err();
        assert!(matches!(err, DocumentError::Config(_)));
    }

    #[test]
    fn missing_file_is_defaults() {
        let config = ClientConfig::load(Path::new("/nonexistent/bulkdoc.toml")).unwrap();
        assert_eq!(config.port, 8000);
    }
}

/*
 * operations.rs
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

//! Document operations: each builds the HTTP request and the response handler
//! that turns the server's answer into events.
//!
//! Sending the request and feeding the handler is left to the transport.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::config::ClientConfig;
use crate::document::check::CheckHandler;
use crate::document::composer::{batch_boundary, compose_batch, multipart_content_type, DocumentWriteStream};
use crate::document::demux::ReadDemultiplexer;
use crate::document::record::{Category, Document};
use crate::document::result::ResultHandler;
use crate::document::sink::{ConsumptionMode, EventSink};
use crate::error::{DocumentError, Result};
use crate::protocol::http::{Method, RequestBody, RequestBuilder, Response, ResponseHandler};

const DOCUMENTS_PATH: &str = "/v1/documents";
const SEARCH_PATH: &str = "/v1/search";
const QBE_PATH: &str = "/v1/qbe";
const JSON_TYPE: &str = "application/json";

/// A request ready to send, with the handler for its response.
#[derive(Debug)]
pub struct Exchange<H> {
    pub request: RequestBuilder,
    pub handler: H,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CheckParams {
    pub uri: String,
    pub txid: Option<String>,
}

impl From<&str> for CheckParams {
    fn from(uri: &str) -> Self {
        Self {
            uri: uri.to_string(),
            txid: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadParams {
    pub uri: String,
    /// Empty means content only.
    pub categories: Vec<Category>,
    pub txid: Option<String>,
}

impl From<&str> for ReadParams {
    fn from(uri: &str) -> Self {
        Self {
            uri: uri.to_string(),
            categories: Vec::new(),
            txid: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct WriteParams {
    pub documents: Vec<Document>,
    pub categories: Vec<Category>,
    pub txid: Option<String>,
}

impl From<Vec<Document>> for WriteParams {
    fn from(documents: Vec<Document>) -> Self {
        Self {
            documents,
            ..Self::default()
        }
    }
}

impl From<Document> for WriteParams {
    fn from(document: Document) -> Self {
        vec![document].into()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RemoveParams {
    pub uri: String,
    pub txid: Option<String>,
}

impl From<&str> for RemoveParams {
    fn from(uri: &str) -> Self {
        Self {
            uri: uri.to_string(),
            txid: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RemoveAllParams {
    pub collections: Vec<String>,
    pub directory: Option<String>,
    /// Remove every document; exclusive with collections and directory.
    pub all: bool,
    pub txid: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    #[default]
    Search,
    /// Query by example.
    Qbe,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryParams {
    /// Structured query body, sent as-is.
    pub payload: Value,
    pub query_type: QueryType,
    /// `json` or `xml`, the format of the query itself.
    pub query_format: String,
    pub page_start: Option<u64>,
    /// `Some(0)` asks for the search summary only.
    pub page_length: Option<u64>,
    /// None: content and collections for paged queries.
    pub categories: Option<Vec<Category>>,
    pub txid: Option<String>,
    pub view: Option<String>,
}

impl QueryParams {
    pub fn new(payload: Value) -> Self {
        Self {
            payload,
            query_type: QueryType::Search,
            query_format: "json".to_string(),
            page_start: None,
            page_length: None,
            categories: None,
            txid: None,
            view: None,
        }
    }

    fn summary_only(&self) -> bool {
        self.page_length == Some(0)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PatchParams {
    pub uri: String,
    pub operations: Vec<Value>,
    pub categories: Vec<Category>,
    pub txid: Option<String>,
}

/// Response handler for `query`: multipart records when paged, the JSON summary otherwise.
#[derive(Debug)]
pub enum QueryHandler<S> {
    Paged(ReadDemultiplexer<S>),
    Summary(ResultHandler<S>),
}

impl<S: EventSink> QueryHandler<S> {
    pub fn into_sink(self) -> S {
        match self {
            QueryHandler::Paged(h) => h.into_sink(),
            QueryHandler::Summary(h) => h.into_sink(),
        }
    }
}

macro_rules! delegate {
    ($self:ident, $h:ident => $call:expr) => {
        match $self {
            QueryHandler::Paged($h) => $call,
            QueryHandler::Summary($h) => $call,
        }
    };
}

impl<S: EventSink> ResponseHandler for QueryHandler<S> {
    fn ok(&mut self, response: Response) {
        delegate!(self, h => h.ok(response))
    }

    fn error(&mut self, response: Response) {
        delegate!(self, h => h.error(response))
    }

    fn header(&mut self, name: &str, value: &str) {
        delegate!(self, h => h.header(name, value))
    }

    fn start_body(&mut self) {
        delegate!(self, h => h.start_body())
    }

    fn body_chunk(&mut self, data: &[u8]) {
        delegate!(self, h => h.body_chunk(data))
    }

    fn end_body(&mut self) {
        delegate!(self, h => h.end_body())
    }

    fn complete(&mut self) {
        delegate!(self, h => h.complete())
    }

    fn failed(&mut self, error: &std::io::Error) {
        delegate!(self, h => h.failed(error))
    }
}

/// Bulk document operations against one database.
#[derive(Debug, Clone, Default)]
pub struct Documents {
    config: ClientConfig,
}

impl Documents {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// HEAD: does the document exist, and in what format.
    pub fn check(&self, params: impl Into<CheckParams>) -> Result<Exchange<CheckHandler>> {
        let params = params.into();
        require_uri(&params.uri, "check")?;
        let mut request = self.request(Method::Head, DOCUMENTS_PATH);
        request.query("format", "json").query("uri", &params.uri);
        self.finish_query(&mut request, params.txid.as_deref());
        Ok(Exchange {
            request,
            handler: CheckHandler::new(),
        })
    }

    /// GET one document as multipart, buffered into whole records.
    pub fn read<S: EventSink>(&self, params: impl Into<ReadParams>, sink: S) -> Result<Exchange<ReadDemultiplexer<S>>> {
        let params = params.into();
        require_uri(&params.uri, "read")?;
        let mut request = self.request(Method::Get, DOCUMENTS_PATH);
        request.query("format", "json").query("uri", &params.uri);
        if params.categories.is_empty() {
            request.query("category", Category::Content.as_str());
        } else {
            add_categories(&mut request, &params.categories);
        }
        self.finish_query(&mut request, params.txid.as_deref());
        request.header("Accept", multipart_content_type(&self.config.boundary));
        Ok(Exchange {
            request,
            handler: self.demultiplexer(sink, ConsumptionMode::Buffered),
        })
    }

    /// POST a batch of documents with their metadata.
    pub fn write<S: EventSink>(&self, params: impl Into<WriteParams>, sink: S) -> Result<Exchange<ResultHandler<S>>> {
        let params = params.into();
        if params.documents.is_empty() {
            return Err(DocumentError::usage("must provide documents for document write()"));
        }
        let boundary = batch_boundary(&self.config.boundary);
        let body = compose_batch(&params.documents, &boundary)?;
        debug!(documents = params.documents.len(), bytes = body.len(), "composed write batch");
        let mut request = self.request(Method::Post, DOCUMENTS_PATH);
        add_categories(&mut request, &params.categories);
        self.finish_query(&mut request, params.txid.as_deref());
        request
            .header("Content-Type", multipart_content_type(&boundary))
            .header("Accept", JSON_TYPE)
            .body(body);
        Ok(Exchange {
            request,
            handler: ResultHandler::new(sink),
        })
    }

    /// POST one document whose content is streamed into `body` by the caller.
    /// The returned request carries no body; the transport sends `body` once the stream ends.
    pub fn create_write_stream<S: EventSink, B: RequestBody>(
        &self,
        document: &Document,
        txid: Option<&str>,
        body: B,
        sink: S,
    ) -> Result<(Exchange<ResultHandler<S>>, DocumentWriteStream<B>)> {
        if document.effective_content_type().is_none() {
            return Err(DocumentError::usage("must provide content or content type for document write stream"));
        }
        let stream = DocumentWriteStream::open(body, document, &self.config.boundary)?;
        let mut request = self.request(Method::Post, DOCUMENTS_PATH);
        self.finish_query(&mut request, txid);
        request
            .header("Content-Type", multipart_content_type(&self.config.boundary))
            .header("Accept", JSON_TYPE);
        Ok((
            Exchange {
                request,
                handler: ResultHandler::new(sink),
            },
            stream,
        ))
    }

    pub fn remove<S: EventSink>(&self, params: impl Into<RemoveParams>, sink: S) -> Result<Exchange<ResultHandler<S>>> {
        let params = params.into();
        require_uri(&params.uri, "remove")?;
        let mut request = self.request(Method::Delete, DOCUMENTS_PATH);
        request.query("uri", &params.uri);
        self.finish_query(&mut request, params.txid.as_deref());
        Ok(Exchange {
            request,
            handler: ResultHandler::new(sink),
        })
    }

    /// DELETE by collection and/or directory, or everything with `all`.
    pub fn remove_all<S: EventSink>(&self, params: RemoveAllParams, sink: S) -> Result<Exchange<ResultHandler<S>>> {
        let selective = !params.collections.is_empty() || params.directory.is_some();
        if selective && params.all {
            return Err(DocumentError::usage("delete all conflicts with delete collections and directory"));
        }
        if !selective && !params.all {
            return Err(DocumentError::usage("no directory or collections to delete"));
        }
        let mut request = self.request(Method::Delete, SEARCH_PATH);
        for collection in &params.collections {
            request.query("collection", collection);
        }
        if let Some(directory) = &params.directory {
            if directory.ends_with('/') {
                request.query("directory", directory);
            } else {
                request.query("directory", &format!("{}/", directory));
            }
        }
        self.finish_query(&mut request, params.txid.as_deref());
        Ok(Exchange {
            request,
            handler: ResultHandler::new(sink),
        })
    }

    /// POST a query. Paged results stream part by part; a zero page length returns the summary.
    pub fn query<S: EventSink>(&self, params: &QueryParams, sink: S) -> Result<Exchange<QueryHandler<S>>> {
        if params.query_format != "json" && params.query_format != "xml" {
            return Err(DocumentError::usage(format!("unknown query format {}", params.query_format)));
        }
        let path = match params.query_type {
            QueryType::Search => SEARCH_PATH,
            QueryType::Qbe => QBE_PATH,
        };
        let mut request = self.request(Method::Post, path);
        request.query("format", &params.query_format);
        if !params.summary_only() {
            match &params.categories {
                Some(categories) => add_categories(&mut request, categories),
                None if params.page_length.is_some() => {
                    add_categories(&mut request, &[Category::Content, Category::Collections])
                }
                None => {}
            }
        }
        if let Some(start) = params.page_start {
            request.query("start", &start.to_string());
        }
        if let Some(length) = params.page_length.filter(|l| *l != 0) {
            request.query("pageLength", &length.to_string());
        }
        if let Some(txid) = &params.txid {
            request.query("txid", txid);
        }
        if let Some(view) = &params.view {
            request.query("view", view);
        }
        self.add_database(&mut request);

        let body = serde_json::to_vec(&params.payload).map_err(|source| DocumentError::Encode { uri: None, source })?;
        request.header("Content-Type", JSON_TYPE).body(body);
        let handler = if params.summary_only() {
            request.header("Accept", JSON_TYPE);
            QueryHandler::Summary(ResultHandler::new(sink))
        } else {
            request.header("Accept", multipart_content_type(&self.config.boundary));
            QueryHandler::Paged(self.demultiplexer(sink, ConsumptionMode::Streaming))
        };
        Ok(Exchange { request, handler })
    }

    /// Partial update of one document, tunnelled through POST.
    pub fn patch<S: EventSink>(&self, params: PatchParams, sink: S) -> Result<Exchange<ResultHandler<S>>> {
        if params.uri.is_empty() || params.operations.is_empty() {
            return Err(DocumentError::usage("patch requires a uri and operations"));
        }
        let mut request = self.request(Method::Post, DOCUMENTS_PATH);
        request.query("uri", &params.uri).query("format", "json");
        add_categories(&mut request, &params.categories);
        self.finish_query(&mut request, params.txid.as_deref());
        let uri = params.uri;
        let body = serde_json::to_vec(&json!({ "patch": params.operations }))
            .map_err(|source| DocumentError::Encode { uri: Some(uri), source })?;
        request
            .header("Content-Type", JSON_TYPE)
            .header("Accept", JSON_TYPE)
            .header("X-HTTP-Method-Override", "PATCH")
            .body(body);
        Ok(Exchange {
            request,
            handler: ResultHandler::new(sink),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut request = RequestBuilder::new(method, path);
        request.header("Host", self.config.authority());
        request
    }

    fn demultiplexer<S: EventSink>(&self, sink: S, mode: ConsumptionMode) -> ReadDemultiplexer<S> {
        ReadDemultiplexer::new(sink, mode, self.config.boundary.clone(), self.config.trust_response_boundary)
    }

    fn finish_query(&self, request: &mut RequestBuilder, txid: Option<&str>) {
        if let Some(txid) = txid {
            request.query("txid", txid);
        }
        self.add_database(request);
    }

    fn add_database(&self, request: &mut RequestBuilder) {
        if let Some(database) = &self.config.database {
            request.query("database", database);
        }
    }
}

fn require_uri(uri: &str, operation: &str) -> Result<()> {
    if uri.is_empty() {
        Err(DocumentError::usage(format!("must supply uri for document {}()", operation)))
    } else {
        Ok(())
    }
}

fn add_categories(request: &mut RequestBuilder, categories: &[Category]) {
    for category in categories {
        request.query("category", category.as_str());
    }
}

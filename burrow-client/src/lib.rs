#![warn(
    missing_docs,
    rust_2018_idioms,
    future_incompatible,
    missing_copy_implementations,
    trivial_numeric_casts,
    unsafe_code,
    unused,
    unused_qualifications,
    variant_size_differences
)]
#![cfg_attr(test, deny(warnings))]

//! Client library for burrow servers.
//!
//! # Overview
//!
//! The main type of this crate is `Service`. A service is a configured client
//! talking directly to a burrow server, re-encoding the same operations the
//! storage engines expose (`create_message`, `get_messages`, `get_accounts`,
//! ...) as HTTP requests against `/v1.0`.
//!
//! ## Example
//!
//! ```
//! use burrow_client::Service;
//! use burrow_common::{EntityDetail, Filter};
//! use tokio::runtime::Builder;
//!
//! let service = Service::new("http://localhost:8080");
//!
//! let rt = Builder::new_multi_thread().enable_all().build().unwrap();
//! let result = rt.block_on(async { service.get_accounts(&Filter::default(), EntityDetail::Id).await });
//! assert!(result.is_err());
//! ```

use hyper::{
    client::{Client, HttpConnector},
    header::{HeaderValue, CONNECTION, CONTENT_TYPE},
    Body,
    Method,
    Request,
    Response,
    StatusCode,
};
use serde_json::Value;
use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

use burrow_common::{read_body, Attrs, EngineError, EntityDetail, Filter, MessageDetail, Status, DEFAULT_CONTENT_TYPE};
use burrow_engine::{EntityProjection, MessageProjection};

/// If something goes wrong, a `Service` method returns a `ClientError`
/// describing what exactly failed. `Engine` wraps the same `NotFound` /
/// `InvalidArguments` kinds the storage engines themselves raise, recovered
/// from the response body the server sent back.
#[derive(Debug)]
pub enum ClientError {
    /// Hyper returned some error.
    HyperError(hyper::Error),
    /// An invalid URI was constructed.
    InvalidUri(hyper::http::uri::InvalidUri),
    /// A JSON response body failed to parse.
    ParseError(serde_json::error::Error),
    /// The response body was larger than what the client was configured to accept.
    TooLargeResponse,
    /// The server rejected the request with a `NotFound` or `InvalidArguments` kind.
    Engine(EngineError),
}

impl Display for ClientError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl Error for ClientError {}

impl From<hyper::Error> for ClientError {
    fn from(error: hyper::Error) -> Self {
        Self::HyperError(error)
    }
}

impl From<hyper::http::uri::InvalidUri> for ClientError {
    fn from(error: hyper::http::uri::InvalidUri) -> Self {
        Self::InvalidUri(error)
    }
}

impl From<serde_json::error::Error> for ClientError {
    fn from(error: serde_json::error::Error) -> Self {
        Self::ParseError(error)
    }
}

impl From<EngineError> for ClientError {
    fn from(error: EngineError) -> Self {
        Self::Engine(error)
    }
}

/// A `Service` speaks to a single burrow server over HTTP.
pub struct Service {
    client:        Client<HttpConnector>,
    host:          String,
    max_body_size: Option<usize>,
}

impl Service {
    const DEFAULT_MAX_BODY_SIZE: usize = 5 * 1024 * 1024;

    /// Create a new instance talking to the server at `host`
    /// (e.g. `"http://localhost:8080"`).
    ///
    /// ```
    /// use burrow_client::Service;
    ///
    /// let _service = Service::new("http://localhost:8080");
    /// ```
    #[must_use]
    pub fn new(host: &str) -> Self {
        Self {
            client:        Client::new(),
            host:          host.to_string(),
            max_body_size: Some(Self::DEFAULT_MAX_BODY_SIZE),
        }
    }

    /// Configure the maximum response body size this client is prepared to
    /// accept. A bigger response is dropped and reported as
    /// `ClientError::TooLargeResponse` instead of being read into memory.
    ///
    /// ```
    /// use burrow_client::Service;
    ///
    /// let mut service = Service::new("http://localhost:8080");
    /// service.set_max_body_size(Some(1024 * 64));
    /// service.set_max_body_size(None);
    /// ```
    pub fn set_max_body_size(&mut self, max_body_size: Option<usize>) -> &mut Self {
        self.max_body_size = max_body_size;
        self
    }

    fn new_request(method: Method, uri: &str, body: Body) -> Result<Request<Body>, hyper::http::uri::InvalidUri> {
        let mut req = Request::new(body);
        *req.uri_mut() = uri.parse()?;
        *req.method_mut() = method;
        req.headers_mut().insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        Ok(req)
    }

    /// Send a request, transparently retrying while the server answers
    /// `503 Service Unavailable`.
    async fn request<E: Send, F: Sync + Send + Fn() -> Result<Request<Body>, E>>(&self, builder: F) -> Result<Response<Body>, ClientError>
    where ClientError: From<E> {
        loop {
            let res = self.client.request(builder()?).await?;
            if res.status() != StatusCode::from(Status::ServiceUnavailable) {
                return Ok(res);
            }
        }
    }

    /// Read a `400`/`404` response body and turn it into the `EngineError`
    /// kind the status code names.
    async fn engine_error(&self, status: u16, mut response: Response<Body>) -> Result<ClientError, ClientError> {
        let body = read_body(response.body_mut(), self.max_body_size)
            .await?
            .ok_or(ClientError::TooLargeResponse)?;
        let message = serde_json::from_slice::<Value>(&body)
            .ok()
            .and_then(|value| value.get("error").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| String::from_utf8_lossy(&body).into_owned());
        Ok(ClientError::Engine(if status == 400 {
            EngineError::invalid_arguments(message)
        } else {
            EngineError::not_found(message)
        }))
    }

    async fn parse_message(&self, id: &str, detail: MessageDetail, mut response: Response<Body>) -> Result<MessageProjection, ClientError> {
        match response.status().as_u16() {
            200 => {
                let content_type = response
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|h| h.to_str().ok())
                    .unwrap_or(DEFAULT_CONTENT_TYPE)
                    .to_string();
                let body = read_body(response.body_mut(), self.max_body_size)
                    .await?
                    .ok_or(ClientError::TooLargeResponse)?;
                decode_scalar_message(id, detail, &content_type, body)
            },
            204 => Ok(MessageProjection::Id(id.to_string())),
            status @ (400 | 404) => Err(self.engine_error(status, response).await?),
            status => panic!("unexpected status {} from a single-message request", status),
        }
    }

    async fn parse_messages(&self, mut response: Response<Body>, detail: MessageDetail) -> Result<Vec<MessageProjection>, ClientError> {
        match response.status().as_u16() {
            200 => {
                let body = read_body(response.body_mut(), self.max_body_size)
                    .await?
                    .ok_or(ClientError::TooLargeResponse)?;
                let value: Value = serde_json::from_slice(&body)?;
                let items = value.as_array().ok_or_else(|| ClientError::Engine(EngineError::invalid_arguments("expected a json array")))?;
                Ok(items.iter().map(|item| decode_message_value(item, detail, "")).collect())
            },
            204 => Ok(Vec::new()),
            status @ (400 | 404) => Err(self.engine_error(status, response).await?),
            status => panic!("unexpected status {} from a message range request", status),
        }
    }

    async fn parse_entities(&self, mut response: Response<Body>) -> Result<Vec<EntityProjection>, ClientError> {
        match response.status().as_u16() {
            200 => {
                let body = read_body(response.body_mut(), self.max_body_size)
                    .await?
                    .ok_or(ClientError::TooLargeResponse)?;
                let value: Value = serde_json::from_slice(&body)?;
                let items = value.as_array().ok_or_else(|| ClientError::Engine(EngineError::invalid_arguments("expected a json array")))?;
                Ok(items.iter().map(decode_entity_value).collect())
            },
            204 => Ok(Vec::new()),
            status @ (400 | 404) => Err(self.engine_error(status, response).await?),
            status => panic!("unexpected status {} from an entity range request", status),
        }
    }

    /// Create or overwrite `id` in `account`/`queue`. `attrs.ttl`/`attrs.hide`
    /// are relative seconds, same as the wire form; `None` leaves the
    /// server's configured default in effect. Returns `true` if the message
    /// was newly created, `false` if an existing message was overwritten.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server rejects it.
    pub async fn create_message(&self, account: &str, queue: &str, id: &str, body: Vec<u8>, attrs: Attrs) -> Result<bool, ClientError> {
        let uri = single_message_uri(&self.host, account, queue, id, build_query(Some(attrs), None, None));
        let response = self
            .request(|| {
                let mut req = Self::new_request(Method::PUT, &uri, Body::from(body.clone()))?;
                req.headers_mut()
                    .insert(CONTENT_TYPE, HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
                Ok::<_, ClientError>(req)
            })
            .await?;
        match response.status().as_u16() {
            201 => Ok(true),
            204 => Ok(false),
            status @ (400 | 404) => Err(self.engine_error(status, response).await?),
            status => panic!("unexpected status {} from create_message", status),
        }
    }

    /// Fetch a single message by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the message does not exist.
    pub async fn get_message(&self, account: &str, queue: &str, id: &str, detail: MessageDetail) -> Result<MessageProjection, ClientError> {
        let uri = single_message_uri(&self.host, account, queue, id, build_query(None, None, Some(message_detail_str(detail))));
        let response = self.request(|| Self::new_request(Method::GET, &uri, Body::default())).await?;
        self.parse_message(id, detail, response).await
    }

    /// Delete a single message by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the message does not exist.
    pub async fn delete_message(&self, account: &str, queue: &str, id: &str, detail: MessageDetail) -> Result<MessageProjection, ClientError> {
        let uri = single_message_uri(&self.host, account, queue, id, build_query(None, None, Some(message_detail_str(detail))));
        let response = self.request(|| Self::new_request(Method::DELETE, &uri, Body::default())).await?;
        self.parse_message(id, detail, response).await
    }

    /// Update a single message's `ttl`/`hide` by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the message does not exist.
    pub async fn update_message(
        &self,
        account: &str,
        queue: &str,
        id: &str,
        attrs: Attrs,
        detail: MessageDetail,
    ) -> Result<MessageProjection, ClientError> {
        let uri = single_message_uri(&self.host, account, queue, id, build_query(Some(attrs), None, Some(message_detail_str(detail))));
        let response = self.request(|| Self::new_request(Method::POST, &uri, Body::default())).await?;
        self.parse_message(id, detail, response).await
    }

    /// Fetch messages matching `filter` from `account`/`queue`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or no message matches.
    pub async fn get_messages(&self, account: &str, queue: &str, filter: &Filter, detail: MessageDetail) -> Result<Vec<MessageProjection>, ClientError> {
        let uri = format!(
            "{}/v1.0/{}/{}{}",
            self.host,
            account,
            queue,
            build_query(None, Some(filter), Some(message_detail_str(detail)))
        );
        let response = self.request(|| Self::new_request(Method::GET, &uri, Body::default())).await?;
        self.parse_messages(response, detail).await
    }

    /// Delete messages matching `filter` from `account`/`queue`. An empty
    /// `filter` wipes the whole queue.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or no message matches.
    pub async fn delete_messages(
        &self,
        account: &str,
        queue: &str,
        filter: &Filter,
        detail: MessageDetail,
    ) -> Result<Vec<MessageProjection>, ClientError> {
        let uri = format!(
            "{}/v1.0/{}/{}{}",
            self.host,
            account,
            queue,
            build_query(None, Some(filter), Some(message_detail_str(detail)))
        );
        let response = self.request(|| Self::new_request(Method::DELETE, &uri, Body::default())).await?;
        self.parse_messages(response, detail).await
    }

    /// Update `ttl`/`hide` on every message matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or no message matches.
    pub async fn update_messages(
        &self,
        account: &str,
        queue: &str,
        filter: &Filter,
        attrs: Attrs,
        detail: MessageDetail,
    ) -> Result<Vec<MessageProjection>, ClientError> {
        let uri = format!(
            "{}/v1.0/{}/{}{}",
            self.host,
            account,
            queue,
            build_query(Some(attrs), Some(filter), Some(message_detail_str(detail)))
        );
        let response = self.request(|| Self::new_request(Method::POST, &uri, Body::default())).await?;
        self.parse_messages(response, detail).await
    }

    /// List accounts matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or no account matches.
    pub async fn get_accounts(&self, filter: &Filter, detail: EntityDetail) -> Result<Vec<EntityProjection>, ClientError> {
        let uri = format!("{}/v1.0{}", self.host, build_query(None, Some(filter), Some(entity_detail_str(detail))));
        let response = self.request(|| Self::new_request(Method::GET, &uri, Body::default())).await?;
        self.parse_entities(response).await
    }

    /// Delete accounts matching `filter`. An empty `filter` wipes every
    /// account on the server.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or no account matches.
    pub async fn delete_accounts(&self, filter: &Filter, detail: EntityDetail) -> Result<Vec<EntityProjection>, ClientError> {
        let uri = format!("{}/v1.0{}", self.host, build_query(None, Some(filter), Some(entity_detail_str(detail))));
        let response = self.request(|| Self::new_request(Method::DELETE, &uri, Body::default())).await?;
        self.parse_entities(response).await
    }

    /// List queues within `account` matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or no queue matches.
    pub async fn get_queues(&self, account: &str, filter: &Filter, detail: EntityDetail) -> Result<Vec<EntityProjection>, ClientError> {
        let uri = format!(
            "{}/v1.0/{}{}",
            self.host,
            account,
            build_query(None, Some(filter), Some(entity_detail_str(detail)))
        );
        let response = self.request(|| Self::new_request(Method::GET, &uri, Body::default())).await?;
        self.parse_entities(response).await
    }

    /// Delete queues within `account` matching `filter`. An empty `filter`
    /// wipes every queue in the account.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or no queue matches.
    pub async fn delete_queues(&self, account: &str, filter: &Filter, detail: EntityDetail) -> Result<Vec<EntityProjection>, ClientError> {
        let uri = format!(
            "{}/v1.0/{}{}",
            self.host,
            account,
            build_query(None, Some(filter), Some(entity_detail_str(detail)))
        );
        let response = self.request(|| Self::new_request(Method::DELETE, &uri, Body::default())).await?;
        self.parse_entities(response).await
    }
}

fn single_message_uri(host: &str, account: &str, queue: &str, id: &str, query: String) -> String {
    format!("{}/v1.0/{}/{}/{}{}", host, account, queue, id, query)
}

fn decode_scalar_message(id: &str, detail: MessageDetail, content_type: &str, body: Vec<u8>) -> Result<MessageProjection, ClientError> {
    if content_type == DEFAULT_CONTENT_TYPE {
        return Ok(match detail {
            MessageDetail::Id => MessageProjection::Id(String::from_utf8_lossy(&body).into_owned()),
            _ => MessageProjection::Body(body),
        });
    }
    let value: Value = serde_json::from_slice(&body)?;
    Ok(decode_message_value(&value, detail, id))
}

/// Decode one rendered message (spec.md §4.5's response shapes): a plain
/// string for `id`/`body` detail, an object carrying `ttl`/`hide` (and
/// `body`) otherwise. Used both for a single-message body and for each
/// element of a message range's JSON array.
fn decode_message_value(item: &Value, detail: MessageDetail, fallback_id: &str) -> MessageProjection {
    let id = || item.get("id").and_then(Value::as_str).unwrap_or(fallback_id).to_string();
    let ttl = || item.get("ttl").and_then(Value::as_i64).unwrap_or(0);
    let hide = || item.get("hide").and_then(Value::as_i64).unwrap_or(0);
    let body = || item.get("body").and_then(Value::as_str).unwrap_or_default().as_bytes().to_vec();
    match detail {
        MessageDetail::None | MessageDetail::Id => MessageProjection::Id(item.as_str().map_or_else(id, str::to_string)),
        MessageDetail::Body => MessageProjection::Body(item.as_str().map_or_else(body, |s| s.as_bytes().to_vec())),
        MessageDetail::Attributes => MessageProjection::Attributes {
            id: id(),
            ttl: ttl(),
            hide: hide(),
        },
        MessageDetail::All => MessageProjection::All {
            id: id(),
            ttl: ttl(),
            hide: hide(),
            body: body(),
        },
    }
}

fn decode_entity_value(item: &Value) -> EntityProjection {
    match item.as_str() {
        Some(id) => EntityProjection::Id(id.to_string()),
        None => EntityProjection::All(item.get("id").and_then(Value::as_str).unwrap_or_default().to_string()),
    }
}

fn message_detail_str(detail: MessageDetail) -> &'static str {
    match detail {
        MessageDetail::None => "none",
        MessageDetail::Id => "id",
        MessageDetail::Attributes => "attributes",
        MessageDetail::Body => "body",
        MessageDetail::All => "all",
    }
}

fn entity_detail_str(detail: EntityDetail) -> &'static str {
    match detail {
        EntityDetail::None => "none",
        EntityDetail::Id => "id",
        EntityDetail::All => "all",
    }
}

fn push_param(url: &mut String, separator: &mut char, key: &str, value: &str) {
    url.push(*separator);
    url.push_str(key);
    url.push('=');
    url.push_str(value);
    *separator = '&';
}

/// Build a query string the way `burrow/backend/http.py::_add_parameters`
/// does: `ttl`/`hide` first, then the filter keys, then `detail`.
fn build_query(attrs: Option<Attrs>, filter: Option<&Filter>, detail: Option<&str>) -> String {
    let mut url = String::new();
    let mut separator = '?';
    if let Some(attrs) = attrs {
        if let Some(ttl) = attrs.ttl {
            push_param(&mut url, &mut separator, "ttl", &ttl.to_string());
        }
        if let Some(hide) = attrs.hide {
            push_param(&mut url, &mut separator, "hide", &hide.to_string());
        }
    }
    if let Some(filter) = filter {
        if let Some(marker) = &filter.marker {
            push_param(&mut url, &mut separator, "marker", marker);
        }
        if let Some(limit) = filter.limit {
            push_param(&mut url, &mut separator, "limit", &limit.to_string());
        }
        if filter.match_hidden {
            push_param(&mut url, &mut separator, "match_hidden", "true");
        }
    }
    if let Some(detail) = detail {
        push_param(&mut url, &mut separator, "detail", detail);
    }
    if let Some(filter) = filter {
        if filter.wait > 0 {
            push_param(&mut url, &mut separator, "wait", &filter.wait.to_string());
        }
    }
    url
}

#[cfg(test)]
mod test {
    use super::*;
    use burrow_common::test::make_runtime;

    #[test]
    fn build_query_orders_ttl_hide_then_filter_then_detail() {
        let attrs = Attrs {
            ttl:  Some(100),
            hide: Some(200),
        };
        let filter = Filter {
            marker:       Some("m1".to_string()),
            limit:        Some(5),
            match_hidden: true,
            wait:         3,
        };
        let query = build_query(Some(attrs), Some(&filter), Some("all"));
        assert_eq!(query, "?ttl=100&hide=200&marker=m1&limit=5&match_hidden=true&detail=all&wait=3");
    }

    #[test]
    fn build_query_is_empty_with_nothing_set() {
        assert_eq!(build_query(None, None, None), "");
    }

    #[test]
    fn set_max_body_size() {
        let mut service = Service::new("http://localhost:8080");
        service.set_max_body_size(None);
        assert_eq!(service.max_body_size, None);
        service.set_max_body_size(Some(64 * 1024));
        assert_eq!(service.max_body_size, Some(64 * 1024));
    }

    #[test]
    fn connection_failure_is_a_client_error() {
        let service = Service::new("http://localhost:1");
        let rt = make_runtime();
        let err = rt.block_on(async { service.get_accounts(&Filter::default(), EntityDetail::Id).await.unwrap_err() });
        assert!(matches!(err, ClientError::HyperError(_)));
    }

    #[test]
    fn decodes_id_detail_from_plain_string() {
        let value = Value::String("m1".to_string());
        let projection = decode_message_value(&value, MessageDetail::Id, "fallback");
        assert_eq!(projection, MessageProjection::Id("m1".to_string()));
    }

    #[test]
    fn decodes_all_detail_from_object() {
        let value = serde_json::json!({ "id": "m1", "ttl": 5, "hide": 0, "body": "hi" });
        let projection = decode_message_value(&value, MessageDetail::All, "fallback");
        assert_eq!(
            projection,
            MessageProjection::All {
                id:   "m1".to_string(),
                ttl:  5,
                hide: 0,
                body: b"hi".to_vec(),
            }
        );
    }
}

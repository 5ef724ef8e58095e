//! Fetch gateway: obtains raw candidate payloads for a query.

use crate::config::AutocompleteConfig;
use crate::error::{AutocompleteError, AutocompleteResult};
use reqwest::{Client, Url};
use serde_json::{Map, Value};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Future resolving to the raw JSON payload of one candidate request.
pub type FetchFuture = Pin<Box<dyn Future<Output = AutocompleteResult<Value>> + Send>>;

/// Source of candidates.
///
/// The returned future must not borrow the gateway; the controller drives it
/// on the runtime while further input keeps arriving.
pub trait FetchGateway: Send + Sync {
    /// Request candidates for `query`, sending `extra` alongside it.
    fn fetch(&self, query: &str, extra: Map<String, Value>) -> FetchFuture;
}

/// Shape of a payload after unwrapping.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Non-empty candidate array
    Candidates(Vec<Value>),
    /// Falsy or zero-length payload
    Empty,
    /// Anything else
    Malformed(Value),
}

/// Unwrap a raw response.
///
/// When `data_property` is set and the payload carries a truthy value under
/// it, that value is used; otherwise the payload itself is.
pub fn unwrap_payload(raw: Value, data_property: Option<&str>) -> Payload {
    let value = match data_property.and_then(|prop| raw.get(prop)).filter(|v| is_truthy(v)) {
        Some(inner) => inner.clone(),
        None => raw,
    };

    match value {
        Value::Array(items) if items.is_empty() => Payload::Empty,
        Value::Array(items) => Payload::Candidates(items),
        other if !is_truthy(&other) => Payload::Empty,
        other => Payload::Malformed(other),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Build request parameters: extras first, then the query parameter, which
/// replaces any extra of the same name.
pub fn build_query(query: &str, extra: &Map<String, Value>, query_param: &str) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = extra
        .iter()
        .filter(|(key, _)| key.as_str() != query_param)
        .map(|(key, value)| (key.clone(), param_text(value)))
        .collect();
    params.push((query_param.to_string(), query.to_string()));
    params
}

fn param_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// HTTP gateway issuing `GET url?extra..&query_param=query`.
#[derive(Debug, Clone)]
pub struct HttpFetchGateway {
    client: Client,
    url: Url,
    query_param: String,
}

impl HttpFetchGateway {
    /// Create a gateway from configuration.
    ///
    /// `current_location` is used when the configuration has no URL, and
    /// relative URLs are resolved against it.
    pub fn new(config: &AutocompleteConfig, current_location: &str) -> AutocompleteResult<Self> {
        let base = Url::parse(current_location)
            .map_err(|e| AutocompleteError::InvalidUrl(format!("{current_location}: {e}")))?;
        let url = match config.url.as_deref() {
            Some(target) => base
                .join(target)
                .map_err(|e| AutocompleteError::InvalidUrl(format!("{target}: {e}")))?,
            None => base,
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            url,
            query_param: config.query_param.clone(),
        })
    }

    /// Fetch target.
    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl FetchGateway for HttpFetchGateway {
    fn fetch(&self, query: &str, extra: Map<String, Value>) -> FetchFuture {
        let params = build_query(query, &extra, &self.query_param);
        let request = self.client.get(self.url.clone()).query(&params);

        Box::pin(async move {
            let response = request.send().await?;

            if !response.status().is_success() {
                return Err(AutocompleteError::Http {
                    status: response.status().as_u16(),
                });
            }

            let body = response.text().await?;
            if body.trim().is_empty() {
                return Ok(Value::Null);
            }
            Ok(serde_json::from_str(&body)?)
        })
    }
}

//! HTTP client for the Nexus node API.

use crate::error::NexusError;

use async_trait::async_trait;
use dist_store::{Record, RecordStore, Resolution, StoreError, TYPE_FIELD};
use dist_types::{Namespace, Quantity};
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{debug, info};

/// Default timeout for ledger requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default connection timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for a Nexus node.
///
/// Sends `POST {node_url}/{endpoint}` with a JSON body. Responses are either
/// `{"result": ...}` or `{"error": {"code": .., "message": ..}}`; a body with
/// neither is taken as the result itself.
pub struct NexusClient {
    /// HTTP client (reusable connection pool).
    http_client: reqwest::Client,
    node_url: String,
    session: Option<String>,
}

impl NexusClient {
    /// Create a client for the node at `node_url`.
    pub fn new(node_url: &str, timeout: Duration) -> Result<Self, NexusError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT.min(timeout))
            .build()
            .map_err(|e| NexusError::RequestFailed(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http_client,
            node_url: node_url.trim_end_matches('/').to_string(),
            session: None,
        })
    }

    /// Use an existing session id for every call.
    pub fn with_session(mut self, session: impl Into<String>) -> Self {
        self.session = Some(session.into());
        self
    }

    pub fn node_url(&self) -> &str {
        &self.node_url
    }

    pub fn session(&self) -> Option<&str> {
        self.session.as_deref()
    }

    /// Create a local session and keep its id for later calls.
    pub async fn login(
        &mut self,
        username: &str,
        password: &str,
        pin: &str,
    ) -> Result<String, NexusError> {
        let result = self
            .call(
                "sessions/create/local",
                json!({ "username": username, "password": password, "pin": pin }),
            )
            .await?;
        let session = result
            .get("session")
            .and_then(Value::as_str)
            .ok_or_else(|| NexusError::InvalidResponse("login returned no session".into()))?
            .to_string();
        info!(session = %short(&session), "logged in to ledger node");
        self.session = Some(session.clone());
        Ok(session)
    }

    /// Unlock the session for transactions.
    pub async fn unlock(&self, pin: &str) -> Result<(), NexusError> {
        self.call(
            "sessions/unlock/local",
            json!({ "pin": pin, "notifications": true }),
        )
        .await?;
        info!("ledger session unlocked");
        Ok(())
    }

    /// Perform one API call and return its payload.
    pub async fn call(&self, endpoint: &str, params: Value) -> Result<Value, NexusError> {
        let url = format!("{}/{}", self.node_url, endpoint.trim_start_matches('/'));
        let mut body = match params {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(NexusError::RequestFailed(format!(
                    "request parameters must be an object, got {other}"
                )))
            }
        };
        if let Some(session) = &self.session {
            body.insert("session".into(), Value::from(session.as_str()));
        }

        debug!(endpoint, "ledger call");
        let response = self
            .http_client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NexusError::Unreachable(format!("request timed out: {e}"))
                } else if e.is_connect() {
                    NexusError::Unreachable(format!("connection failed: {e}"))
                } else {
                    NexusError::RequestFailed(e.to_string())
                }
            })?;

        // The node reports API errors with a non-2xx status and a JSON body,
        // so the body is parsed before the status is looked at.
        let status = response.status();
        let data: Value = match response.json().await {
            Ok(data) => data,
            Err(_) if !status.is_success() => {
                return Err(NexusError::RequestFailed(format!("HTTP status {status}")))
            }
            Err(e) => {
                return Err(NexusError::InvalidResponse(format!(
                    "failed to parse {endpoint} response: {e}"
                )))
            }
        };

        if let Some(error) = data.get("error").filter(|e| !e.is_null()) {
            return Err(api_error(error));
        }
        match data {
            Value::Object(mut map) if map.contains_key("result") => {
                Ok(map.remove("result").unwrap_or(Value::Null))
            }
            other => Ok(other),
        }
    }
}

fn api_error(error: &Value) -> NexusError {
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| error.to_string());
    NexusError::Api {
        code: error.get("code").and_then(Value::as_i64),
        message,
    }
}

fn short(session: &str) -> &str {
    session.get(..16).unwrap_or(session)
}

/// Assets are created inside the session's own namespace, so the node wants
/// the name without the `{root}:` prefix.
fn local_name(name: &str) -> &str {
    name.split_once(':').map_or(name, |(_, local)| local)
}

/// Convert a ledger balance in base units to a [`Quantity`].
fn parse_balance(value: &Value) -> Result<Quantity, NexusError> {
    let invalid = || NexusError::InvalidResponse(format!("unreadable balance {value}"));
    match value {
        Value::Number(n) => match n.as_u64() {
            Some(raw) => Ok(Quantity::from_raw(raw as u128)),
            None => {
                let raw = n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).ok_or_else(invalid)?;
                Ok(Quantity::from_raw(raw.round() as u128))
            }
        },
        Value::String(s) => s
            .trim()
            .parse::<u128>()
            .map(Quantity::from_raw)
            .map_err(|_| invalid()),
        Value::Null => Ok(Quantity::ZERO),
        _ => Err(invalid()),
    }
}

fn into_record(value: Value) -> Result<Record, NexusError> {
    match value {
        Value::Object(map) => Ok(Record::from(map)),
        other => Err(NexusError::InvalidResponse(format!(
            "expected an asset object, got {other}"
        ))),
    }
}

#[async_trait]
impl RecordStore for NexusClient {
    async fn get_record(&self, name: &str) -> Result<Option<Record>, StoreError> {
        match self.call("assets/get/asset", json!({ "name": name })).await {
            Ok(value) => Ok(Some(into_record(value)?)),
            Err(e) if e.is_api() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn create_record(&self, name: &str, fields: &Record) -> Result<(), StoreError> {
        let data = serde_json::to_string(fields)?;
        self.call(
            "assets/create/asset",
            json!({ "name": local_name(name), "format": "JSON", "data": data }),
        )
        .await?;
        debug!(name, "created asset");
        Ok(())
    }

    async fn update_record(&self, name: &str, fields: &Record) -> Result<(), StoreError> {
        let mut body = fields.fields().clone();
        body.insert("name".into(), Value::from(name));
        self.call("assets/update/asset", Value::Object(body)).await?;
        debug!(name, "updated asset");
        Ok(())
    }

    async fn get_balance(&self, account: &str) -> Result<Quantity, StoreError> {
        match self.call("finance/get/account", json!({ "name": account })).await {
            Ok(value) => Ok(parse_balance(value.get("balance").unwrap_or(&Value::Null))?),
            Err(e) if e.is_api() => Ok(Quantity::ZERO),
            Err(e) => Err(e.into()),
        }
    }

    async fn resolve_identifier(&self, namespace: &Namespace) -> Result<Resolution, StoreError> {
        match self
            .call("names/get/namespace", json!({ "name": namespace.as_str() }))
            .await
        {
            Ok(value) => Ok(Resolution {
                exists: true,
                address: value.get("address").and_then(Value::as_str).map(str::to_string),
            }),
            Err(e) if e.is_api() => Ok(Resolution::missing()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_records_by_type(&self, type_tag: &str) -> Result<Vec<Record>, StoreError> {
        let filter = format!("results.{TYPE_FIELD}={type_tag}");
        let value = match self
            .call("register/list/assets:asset", json!({ "where": filter }))
            .await
        {
            Ok(value) => value,
            Err(e) if e.is_api() => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let Value::Array(items) = value else {
            return Ok(Vec::new());
        };
        Ok(items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(map) => Some(Record::from(map)),
                _ => None,
            })
            .collect())
    }
}

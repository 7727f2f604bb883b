//! Firestore Document Store
//!
//! Talks to the Firestore REST API (v1). Documents live at
//! `projects/{project}/databases/{database}/documents/{collection}/{key}`.
//! Merge writes send an `updateMask` listing only the written fields.

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::{Client, StatusCode};
use serde_json::{json, Map, Value};
use std::time::Duration;

use crate::domain::{DomainError, DomainResult};
use super::traits::{Document, Fields, ItemStore, WriteMode};

pub const DEFAULT_BASE_URL: &str = "https://firestore.googleapis.com/v1";
const PAGE_SIZE: u32 = 300;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Path segment escape set: keep unreserved characters only
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

pub struct FirestoreStore {
    client: Client,
    base_url: String,
    project_id: String,
    database: String,
    api_key: Option<String>,
}

impl FirestoreStore {
    pub fn new(
        project_id: String,
        database: String,
        api_key: Option<String>,
        base_url: Option<String>,
    ) -> DomainResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DomainError::Internal(format!("Failed to build http client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            project_id,
            database,
            api_key,
        })
    }

    fn collection_url(&self, collection: &str) -> String {
        format!(
            "{}/projects/{}/databases/{}/documents/{}",
            self.base_url,
            self.project_id,
            self.database,
            utf8_percent_encode(collection, SEGMENT)
        )
    }

    fn document_url(&self, collection: &str, key: &str) -> String {
        format!("{}/{}", self.collection_url(collection), utf8_percent_encode(key, SEGMENT))
    }

    fn auth_query(&self) -> Vec<(&'static str, String)> {
        self.api_key
            .iter()
            .map(|k| ("key", k.clone()))
            .collect()
    }
}

#[async_trait]
impl ItemStore for FirestoreStore {
    async fn get(&self, collection: &str, key: &str) -> DomainResult<Option<Fields>> {
        let url = self.document_url(collection, key);
        log::debug!("firestore GET {}", url);

        let response = self
            .client
            .get(&url)
            .query(&self.auth_query())
            .send()
            .await
            .map_err(|e| DomainError::TransientFetch(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = read_json(response, DomainError::TransientFetch).await?;
        Ok(Some(decode_document_fields(&body)?))
    }

    async fn set(&self, collection: &str, key: &str, fields: Fields, mode: WriteMode) -> DomainResult<()> {
        let url = self.document_url(collection, key);
        log::debug!("firestore PATCH {} ({:?})", url, mode);

        let mut query = self.auth_query();
        if mode == WriteMode::Merge {
            query.extend(fields.keys().map(|name| ("updateMask.fieldPaths", name.clone())));
        }

        let response = self
            .client
            .patch(&url)
            .query(&query)
            .json(&json!({ "fields": encode_fields(&fields) }))
            .send()
            .await
            .map_err(|e| DomainError::Store(e.to_string()))?;

        read_json(response, DomainError::Store).await?;
        Ok(())
    }

    async fn delete(&self, collection: &str, key: &str) -> DomainResult<()> {
        let url = self.document_url(collection, key);
        log::debug!("firestore DELETE {}", url);

        let response = self
            .client
            .delete(&url)
            .query(&self.auth_query())
            .send()
            .await
            .map_err(|e| DomainError::Store(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        read_json(response, DomainError::Store).await?;
        Ok(())
    }

    async fn list_all(&self, collection: &str) -> DomainResult<Vec<Document>> {
        let url = self.collection_url(collection);
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            log::debug!("firestore LIST {} (page token: {:?})", url, page_token);
            let mut query = self.auth_query();
            query.push(("pageSize", PAGE_SIZE.to_string()));
            if let Some(token) = &page_token {
                query.push(("pageToken", token.clone()));
            }

            let response = self
                .client
                .get(&url)
                .query(&query)
                .send()
                .await
                .map_err(|e| DomainError::TransientFetch(e.to_string()))?;
            let body = read_json(response, DomainError::TransientFetch).await?;

            for doc in body.get("documents").and_then(Value::as_array).into_iter().flatten() {
                let name = doc
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| DomainError::Internal("Document without name".to_string()))?;
                documents.push(Document {
                    key: key_from_resource_name(name),
                    fields: decode_document_fields(doc)?,
                });
            }

            page_token = body
                .get("nextPageToken")
                .and_then(Value::as_str)
                .filter(|t| !t.is_empty())
                .map(str::to_string);
            if page_token.is_none() {
                break;
            }
        }
        Ok(documents)
    }
}

/// Parse a response body, turning non-success statuses into `err`
async fn read_json(response: reqwest::Response, err: fn(String) -> DomainError) -> DomainResult<Value> {
    let status = response.status();
    let text = response.text().await.map_err(|e| err(e.to_string()))?;
    if !status.is_success() {
        return Err(err(format!("HTTP {}: {}", status, text)));
    }
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&text).map_err(|e| DomainError::Internal(format!("Bad response body: {}", e)))
}

/// Last path segment of `projects/.../documents/{collection}/{key}`
fn key_from_resource_name(name: &str) -> String {
    let raw = name.rsplit('/').next().unwrap_or(name);
    percent_encoding::percent_decode_str(raw)
        .decode_utf8_lossy()
        .to_string()
}

fn decode_document_fields(doc: &Value) -> DomainResult<Fields> {
    match doc.get("fields") {
        None => Ok(Map::new()),
        Some(Value::Object(fields)) => fields
            .iter()
            .map(|(name, value)| Ok((name.clone(), decode_value(value)?)))
            .collect(),
        Some(other) => Err(DomainError::Internal(format!("Unexpected fields payload: {}", other))),
    }
}

/// Plain JSON -> Firestore typed value
pub(crate) fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            // integerValue is transported as a string
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64().unwrap_or_default() }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => json!({
            "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() }
        }),
        Value::Object(fields) => json!({ "mapValue": { "fields": encode_fields(fields) } }),
    }
}

pub(crate) fn encode_fields(fields: &Fields) -> Value {
    Value::Object(
        fields
            .iter()
            .map(|(name, value)| (name.clone(), encode_value(value)))
            .collect(),
    )
}

/// Firestore typed value -> plain JSON
pub(crate) fn decode_value(value: &Value) -> DomainResult<Value> {
    let (kind, inner) = value
        .as_object()
        .and_then(|o| o.iter().next())
        .ok_or_else(|| DomainError::Internal(format!("Untyped value: {}", value)))?;

    match (kind.as_str(), inner) {
        ("nullValue", _) => Ok(Value::Null),
        ("booleanValue", v) => Ok(v.clone()),
        ("integerValue", Value::String(s)) => s
            .parse::<i64>()
            .map(Value::from)
            .map_err(|e| DomainError::Internal(format!("Bad integerValue {}: {}", s, e))),
        ("integerValue", v) => Ok(v.clone()),
        ("doubleValue", v) => Ok(v.clone()),
        ("stringValue", v) | ("timestampValue", v) | ("referenceValue", v) => Ok(v.clone()),
        ("arrayValue", v) => {
            let items = v
                .get("values")
                .and_then(Value::as_array)
                .map(|values| values.iter().map(decode_value).collect::<DomainResult<Vec<_>>>())
                .transpose()?
                .unwrap_or_default();
            Ok(Value::Array(items))
        }
        ("mapValue", v) => Ok(Value::Object(decode_document_fields(v)?)),
        (other, _) => Err(DomainError::Internal(format!("Unsupported Firestore value type {}", other))),
    }
}

//! Firestore REST API adapter
//!
//! Lists a user's sub-collection page by page through the v1 REST API and
//! decodes Firestore's typed value encoding into `Scalar`s.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

use super::{CollectionPath, DocumentStore, StoreError};
use crate::config::StoreConfig;
use crate::table::{Document, Scalar};

/// Connection settings for the Firestore REST API
#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    /// Base URL, e.g. "https://firestore.googleapis.com" or an emulator address
    pub base_url: String,
    pub project_id: String,
    pub database: String,
    /// Bearer token; the emulator accepts requests without one
    pub access_token: Option<String>,
    pub request_timeout_secs: u64,
    pub page_size: u32,
}

impl Default for FirestoreConfig {
    fn default() -> Self {
        Self::from_store_config(&StoreConfig::default())
    }
}

impl FirestoreConfig {
    pub fn from_store_config(config: &StoreConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            project_id: config.project_id.clone(),
            database: config.database.clone(),
            access_token: config.access_token.clone(),
            request_timeout_secs: config.request_timeout_secs,
            page_size: config.page_size,
        }
    }
}

/// Firestore REST client
pub struct FirestoreStore {
    client: Client,
    config: FirestoreConfig,
}

impl FirestoreStore {
    pub fn new(config: FirestoreConfig) -> Result<Self, StoreError> {
        if config.project_id.is_empty() {
            return Err(StoreError::Config(
                "store.project_id is required for the firestore backend".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| StoreError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FirestoreConfig {
        &self.config
    }

    fn documents_url(&self) -> String {
        format!(
            "{}/v1/projects/{}/databases/{}/documents",
            self.config.base_url,
            urlencoding::encode(&self.config.project_id),
            urlencoding::encode(&self.config.database)
        )
    }

    fn user_url(&self, user_id: &str) -> String {
        format!("{}/users/{}", self.documents_url(), urlencoding::encode(user_id))
    }

    fn collection_url(&self, path: &CollectionPath) -> String {
        format!(
            "{}/{}",
            self.user_url(&path.user_id),
            urlencoding::encode(&path.subcollection)
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(StoreError::from_transport)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            Err(StoreError::Auth(format!("{}: {}", status, text)))
        } else {
            Err(StoreError::Api {
                status: status.as_u16(),
                message: text,
            })
        }
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    fn name(&self) -> &str {
        "firestore"
    }

    async fn health_check(&self, user_id: &str) -> Result<(), StoreError> {
        // The user document itself may not exist; only its sub-collections do.
        match self.send(self.client.get(self.user_url(user_id))).await {
            Ok(_) | Err(StoreError::Api { status: 404, .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn list_documents(&self, path: &CollectionPath) -> Result<Vec<Document>, StoreError> {
        let url = self.collection_url(path);
        let page_size = self.config.page_size.to_string();
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.client.get(&url).query(&[("pageSize", page_size.as_str())]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let page: ListDocumentsResponse = self
                .send(request)
                .await?
                .json()
                .await
                .map_err(|e| StoreError::Decode {
                    path: path.to_string(),
                    message: e.to_string(),
                })?;

            for raw in page.documents {
                documents.push(raw.into_document(path)?);
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        tracing::debug!(collection = %path, count = documents.len(), "Listed Firestore documents");
        Ok(documents)
    }
}

// ============================================
// Wire format
// ============================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<RawDocument>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    name: String,
    #[serde(default)]
    fields: BTreeMap<String, FirestoreValue>,
}

impl RawDocument {
    fn into_document(self, path: &CollectionPath) -> Result<Document, StoreError> {
        let id = self
            .name
            .rsplit('/')
            .next()
            .unwrap_or(self.name.as_str())
            .to_string();

        let mut document = Document::new(id);
        for (field, value) in self.fields {
            let scalar = value.into_scalar().map_err(|message| StoreError::Decode {
                path: format!("{}/{}", path, document.id),
                message: format!("field '{}': {}", field, message),
            })?;
            document.set(field, scalar);
        }
        Ok(document)
    }
}

/// Firestore's typed value encoding
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
enum FirestoreValue {
    NullValue(Option<String>),
    BooleanValue(bool),
    IntegerValue(String),
    DoubleValue(serde_json::Value),
    TimestampValue(String),
    StringValue(String),
    BytesValue(String),
    ReferenceValue(String),
    GeoPointValue(GeoPoint),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

#[derive(Debug, Clone, Default, Deserialize)]
struct GeoPoint {
    #[serde(default)]
    latitude: f64,
    #[serde(default)]
    longitude: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ArrayValue {
    #[serde(default)]
    values: Vec<FirestoreValue>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct MapValue {
    #[serde(default)]
    fields: BTreeMap<String, FirestoreValue>,
}

impl FirestoreValue {
    fn into_scalar(self) -> Result<Scalar, String> {
        Ok(match self {
            FirestoreValue::NullValue(_) => Scalar::Null,
            FirestoreValue::BooleanValue(b) => Scalar::Bool(b),
            FirestoreValue::IntegerValue(s) => Scalar::Int(
                s.parse()
                    .map_err(|e| format!("invalid integerValue '{}': {}", s, e))?,
            ),
            FirestoreValue::DoubleValue(v) => Scalar::Float(parse_double(&v)?),
            FirestoreValue::TimestampValue(s) => Scalar::Timestamp(
                DateTime::parse_from_rfc3339(&s)
                    .map_err(|e| format!("invalid timestampValue '{}': {}", s, e))?
                    .with_timezone(&Utc),
            ),
            FirestoreValue::StringValue(s) => Scalar::Text(s),
            other => Scalar::Text(other.render()),
        })
    }

    /// Readable rendering for values that have no scalar form
    fn render(&self) -> String {
        match self {
            FirestoreValue::NullValue(_) => "null".to_string(),
            FirestoreValue::BooleanValue(b) => b.to_string(),
            FirestoreValue::IntegerValue(s) => s.clone(),
            FirestoreValue::DoubleValue(v) => v.to_string(),
            FirestoreValue::TimestampValue(s) => s.clone(),
            FirestoreValue::StringValue(s) => s.clone(),
            FirestoreValue::BytesValue(s) => s.clone(),
            FirestoreValue::ReferenceValue(s) => s.clone(),
            FirestoreValue::GeoPointValue(p) => format!("({}, {})", p.latitude, p.longitude),
            FirestoreValue::ArrayValue(a) => {
                let items: Vec<String> = a.values.iter().map(FirestoreValue::render).collect();
                format!("[{}]", items.join(", "))
            }
            FirestoreValue::MapValue(m) => {
                let items: Vec<String> = m
                    .fields
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k, v.render()))
                    .collect();
                format!("{{{}}}", items.join(", "))
            }
        }
    }
}

/// `doubleValue` is a JSON number, or a string for NaN and infinities
fn parse_double(value: &serde_json::Value) -> Result<f64, String> {
    match value {
        serde_json::Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| format!("invalid doubleValue {}", n)),
        serde_json::Value::String(s) => match s.as_str() {
            "NaN" => Ok(f64::NAN),
            "Infinity" => Ok(f64::INFINITY),
            "-Infinity" => Ok(f64::NEG_INFINITY),
            other => other
                .parse()
                .map_err(|_| format!("invalid doubleValue '{}'", other)),
        },
        other => Err(format!("invalid doubleValue {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn store() -> FirestoreStore {
        FirestoreStore::new(FirestoreConfig {
            project_id: "cedmate-test".to_string(),
            ..FirestoreConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_collection_url() {
        let url = store().collection_url(&CollectionPath::new("u 1", "stimmungen"));
        assert_eq!(
            url,
            "https://firestore.googleapis.com/v1/projects/cedmate-test/databases/%28default%29/documents/users/u%201/stimmungen"
        );
    }

    /// Answer one HTTP request with `status_line`, returning the request line
    async fn serve_once(status_line: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: 2\r\nConnection: close\r\n\r\n{{}}",
                status_line
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&head)
                .lines()
                .next()
                .unwrap_or_default()
                .to_string()
        });
        (format!("http://{}", addr), handle)
    }

    fn local_store(base_url: String) -> FirestoreStore {
        FirestoreStore::new(FirestoreConfig {
            base_url,
            project_id: "cedmate-test".to_string(),
            ..FirestoreConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_health_check_reads_only_the_users_own_path() {
        let (base_url, request) = serve_once("404 Not Found").await;

        local_store(base_url).health_check("u1").await.unwrap();

        let request_line = request.await.unwrap();
        assert!(request_line.starts_with("GET "));
        assert!(request_line.contains("/documents/users/u1 "));
    }

    #[tokio::test]
    async fn test_health_check_rejected_credentials() {
        let (base_url, request) = serve_once("403 Forbidden").await;

        let err = local_store(base_url).health_check("u1").await.unwrap_err();
        assert!(matches!(err, StoreError::Auth(_)));
        assert!(err.is_connectivity());
        request.await.unwrap();
    }

    #[test]
    fn test_requires_project_id() {
        assert!(matches!(
            FirestoreStore::new(FirestoreConfig::default()),
            Err(StoreError::Config(_))
        ));
    }

    #[test]
    fn test_decode_list_response() {
        let json = r#"{
            "documents": [{
                "name": "projects/p/databases/(default)/documents/users/u1/stimmungen/abc123",
                "fields": {
                    "wert": {"integerValue": "4"},
                    "zeit": {"timestampValue": "2024-03-01T08:00:00.123456Z"},
                    "schlaf": {"doubleValue": 7.5},
                    "gut": {"booleanValue": true},
                    "notiz": {"stringValue": "ok"},
                    "leer": {"nullValue": null},
                    "tags": {"arrayValue": {"values": [{"stringValue": "a"}, {"integerValue": "2"}]}},
                    "ort": {"geoPointValue": {"latitude": 52.5, "longitude": 13.4}},
                    "extra": {"mapValue": {"fields": {"k": {"booleanValue": false}}}}
                },
                "createTime": "2024-03-01T08:00:01Z",
                "updateTime": "2024-03-01T08:00:01Z"
            }],
            "nextPageToken": "tok"
        }"#;

        let page: ListDocumentsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(page.next_page_token.as_deref(), Some("tok"));

        let path = CollectionPath::new("u1", "stimmungen");
        let doc = page.documents.into_iter().next().unwrap().into_document(&path).unwrap();

        assert_eq!(doc.id, "abc123");
        assert_eq!(doc.get("wert"), Some(&Scalar::Int(4)));
        assert_eq!(
            doc.get("zeit"),
            Some(&Scalar::Timestamp(
                Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
                    + chrono::Duration::microseconds(123_456)
            ))
        );
        assert_eq!(doc.get("schlaf"), Some(&Scalar::Float(7.5)));
        assert_eq!(doc.get("gut"), Some(&Scalar::Bool(true)));
        assert_eq!(doc.get("notiz"), Some(&Scalar::from("ok")));
        assert_eq!(doc.get("leer"), Some(&Scalar::Null));
        assert_eq!(doc.get("tags"), Some(&Scalar::from("[a, 2]")));
        assert_eq!(doc.get("ort"), Some(&Scalar::from("(52.5, 13.4)")));
        assert_eq!(doc.get("extra"), Some(&Scalar::from("{k: false}")));
    }

    #[test]
    fn test_empty_collection_response() {
        let page: ListDocumentsResponse = serde_json::from_str("{}").unwrap();
        assert!(page.documents.is_empty());
        assert!(page.next_page_token.is_none());
    }

    #[test]
    fn test_bad_integer_is_decode_error() {
        let json = r#"{"name": "x/y/doc", "fields": {"wert": {"integerValue": "drei"}}}"#;
        let raw: RawDocument = serde_json::from_str(json).unwrap();
        let err = raw
            .into_document(&CollectionPath::new("u1", "stimmungen"))
            .unwrap_err();
        assert!(matches!(err, StoreError::Decode { .. }));
    }

    #[test]
    fn test_double_special_values() {
        assert!(parse_double(&serde_json::json!("NaN")).unwrap().is_nan());
        assert_eq!(parse_double(&serde_json::json!(2)).unwrap(), 2.0);
        assert!(parse_double(&serde_json::json!(true)).is_err());
    }
}

//! Typed client for the portal API
//!
//! Every call goes through [`ApiClient::api_request`], which keeps the session
//! cookie, unwraps the `ApiResponse` envelope and turns non-2xx responses
//! into a structured [`ApiError`]. Uploads are checked against the server's
//! [`UploadPolicy`] before anything is sent.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::{multipart, Client, Method, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use crate::entity::uploaded_file::UploadedFileResponse;
use crate::upload::{normalize_mime, UploadPolicy, UploadRejection};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Non-2xx response from the server
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{status} {status_text}: {message}")]
pub struct ApiError {
    pub message: String,
    pub status: u16,
    pub status_text: String,
    /// Field-level validation messages keyed by field name
    pub fields: BTreeMap<String, String>,
    /// Every member of a JSON error body, as sent
    pub server: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("upload rejected: {0}")]
    Rejected(#[from] UploadRejection),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Request payload
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    Form(multipart::Form),
}

/// Error body rendered by the server
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    details: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

/// Where an uploaded document belongs
#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    pub identifier: Option<String>,
    pub purpose: Option<String>,
    pub dial_record_id: Option<i64>,
}

/// One file of a batch upload
#[derive(Debug, Clone)]
pub struct UploadItem {
    pub file_name: String,
    pub mime: String,
    pub data: Vec<u8>,
    pub options: UploadOptions,
}

/// Result for one item of a batch upload
#[derive(Debug)]
pub struct UploadOutcome {
    pub file_name: String,
    pub result: Result<UploadedFileResponse, ClientError>,
}

impl UploadOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Split `"field: message; other: message"` validation details into a map.
/// Fields listed together (`"a, b: required"`) each get the message.
pub fn parse_fields(details: &str) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();
    for part in details.split(';') {
        let Some((names, message)) = part.split_once(':') else {
            continue;
        };
        for name in names.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            if name.contains(char::is_whitespace) {
                continue;
            }
            fields.insert(name.to_string(), message.trim().to_string());
        }
    }
    fields
}

impl ApiError {
    /// Build from a non-2xx status and its raw body
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let status_text = status.canonical_reason().unwrap_or("").to_string();
        let server = match serde_json::from_str::<serde_json::Value>(body) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        };
        match serde_json::from_value::<ErrorBody>(serde_json::Value::Object(server.clone())) {
            Ok(parsed) if !server.is_empty() => {
                let fields = parsed.details.as_deref().map(parse_fields).unwrap_or_default();
                let message = match (parsed.message, parsed.details) {
                    (Some(m), Some(d)) => format!("{}: {}", m, d),
                    (Some(m), None) => m,
                    (None, Some(d)) => d,
                    (None, None) => status_text.clone(),
                };
                Self {
                    message,
                    status: status.as_u16(),
                    status_text,
                    fields,
                    server,
                }
            }
            _ => Self {
                message: if body.trim().is_empty() {
                    status_text.clone()
                } else {
                    body.trim().to_string()
                },
                status: status.as_u16(),
                status_text,
                fields: BTreeMap::new(),
                server,
            },
        }
    }
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Client for a server at `base_url` (e.g. `http://localhost:8080`)
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn build_request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: RequestBody,
    ) -> RequestBuilder {
        let mut request = self.client.request(method, self.url(path));
        if !query.is_empty() {
            request = request.query(query);
        }
        match body {
            RequestBody::Empty => request,
            RequestBody::Json(value) => request.json(&value),
            RequestBody::Form(form) => request.multipart(form),
        }
    }

    /// Send a request and decode the `data` member of the response envelope.
    /// Use `()` for endpoints that return no data.
    pub async fn api_request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
    ) -> Result<T, ClientError> {
        self.api_request_with_query(method, path, &[], body).await
    }

    /// [`api_request`](Self::api_request) with query parameters
    pub async fn api_request_with_query<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: RequestBody,
    ) -> Result<T, ClientError> {
        let request = self.build_request(method.clone(), path, query, body);

        tracing::debug!("{} {}", method, path);
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let err = ApiError::from_response(status, &text);
            tracing::debug!("{} {} failed: {}", method, path, err);
            return Err(err.into());
        }

        let envelope: Envelope = if text.trim().is_empty() {
            Envelope { data: None }
        } else {
            serde_json::from_str(&text)?
        };
        Ok(serde_json::from_value(
            envelope.data.unwrap_or(serde_json::Value::Null),
        )?)
    }

    pub async fn login<T: DeserializeOwned>(&self, email: &str, password: &str) -> Result<T, ClientError> {
        let body = serde_json::to_value(LoginBody { email, password })?;
        self.api_request(Method::POST, "/api/login", RequestBody::Json(body))
            .await
    }

    pub async fn logout(&self) -> Result<(), ClientError> {
        self.api_request(Method::POST, "/api/logout", RequestBody::Empty)
            .await
    }

    /// Upload one file after checking it against `policy`
    pub async fn upload_file(
        &self,
        policy: &UploadPolicy,
        file_name: &str,
        mime: &str,
        data: Vec<u8>,
        options: &UploadOptions,
    ) -> Result<UploadedFileResponse, ClientError> {
        policy.validate(mime, data.len() as u64)?;

        let size = data.len() as u64;
        let part = multipart::Part::bytes(data)
            .file_name(file_name.to_string())
            .mime_str(&normalize_mime(mime))?;
        let form = multipart::Form::new().part(policy.field_name.clone(), part);

        let query = upload_query(size, options);
        self.api_request_with_query(Method::POST, "/api/uploads", &query, RequestBody::Form(form))
            .await
    }

    /// Upload files one after another. A failed item does not stop the batch.
    pub async fn upload_multiple(
        &self,
        policy: &UploadPolicy,
        items: Vec<UploadItem>,
    ) -> Vec<UploadOutcome> {
        let mut outcomes = Vec::with_capacity(items.len());
        for item in items {
            let result = self
                .upload_file(policy, &item.file_name, &item.mime, item.data, &item.options)
                .await;
            if let Err(e) = &result {
                tracing::warn!("Upload of {} failed: {}", item.file_name, e);
            }
            outcomes.push(UploadOutcome {
                file_name: item.file_name,
                result,
            });
        }
        outcomes
    }
}

fn upload_query(total: u64, options: &UploadOptions) -> Vec<(&'static str, String)> {
    let mut query = vec![("total", total.to_string())];
    if let Some(id) = &options.identifier {
        query.push(("identifier", id.clone()));
    }
    if let Some(purpose) = &options.purpose {
        query.push(("purpose", purpose.clone()));
    }
    if let Some(id) = options.dial_record_id {
        query.push(("dialRecordId", id.to_string()));
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> UploadPolicy {
        UploadPolicy {
            field_name: "file".to_string(),
            accepted_types: vec!["application/pdf".to_string(), "image/*".to_string()],
            max_size: 1024,
        }
    }

    // Nothing listens on the discard port; a network attempt would surface as Http
    const UNREACHABLE: &str = "http://127.0.0.1:9";

    #[tokio::test]
    async fn bad_mime_is_rejected_before_network() {
        let client = ApiClient::new(UNREACHABLE).unwrap();
        let result = client
            .upload_file(&policy(), "notes.txt", "text/plain", b"hello".to_vec(), &UploadOptions::default())
            .await;
        assert!(matches!(
            result,
            Err(ClientError::Rejected(UploadRejection::UnsupportedType { .. }))
        ));
    }

    #[test]
    fn batch_collects_each_outcome_in_order() {
        let client = ApiClient::new(UNREACHABLE).unwrap();
        let items = vec![
            UploadItem {
                file_name: "big.pdf".to_string(),
                mime: "application/pdf".to_string(),
                data: vec![0u8; 2048],
                options: UploadOptions::default(),
            },
            UploadItem {
                file_name: "empty.png".to_string(),
                mime: "image/png".to_string(),
                data: Vec::new(),
                options: UploadOptions::default(),
            },
        ];
        let outcomes = tokio_test::block_on(client.upload_multiple(&policy(), items));
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].file_name, "big.pdf");
        assert!(matches!(
            outcomes[0].result,
            Err(ClientError::Rejected(UploadRejection::TooLarge { size: 2048, max: 1024 }))
        ));
        assert!(matches!(
            outcomes[1].result,
            Err(ClientError::Rejected(UploadRejection::Empty))
        ));
        assert!(!outcomes[1].is_ok());
    }

    #[test]
    fn api_error_reads_server_body() {
        let body = r#"{"code":400,"message":"Validation Error","details":"institution, studyArea: required"}"#;
        let err = ApiError::from_response(StatusCode::BAD_REQUEST, body);
        assert_eq!(err.status, 400);
        assert_eq!(err.status_text, "Bad Request");
        assert_eq!(err.message, "Validation Error: institution, studyArea: required");
        assert_eq!(err.fields.get("studyArea").map(String::as_str), Some("required"));
        assert_eq!(err.fields.len(), 2);
        assert_eq!(err.server["code"], serde_json::json!(400));
    }

    #[test]
    fn api_error_keeps_every_server_member() {
        let body = r#"{"code":409,"message":"Conflict","details":"declaration already amended as 12","dialRecordId":12}"#;
        let err = ApiError::from_response(StatusCode::CONFLICT, body);
        assert_eq!(err.server.len(), 4);
        assert_eq!(err.server["dialRecordId"], serde_json::json!(12));
        assert_eq!(err.message, "Conflict: declaration already amended as 12");
    }

    #[test]
    fn api_error_tolerates_plain_bodies() {
        let err = ApiError::from_response(StatusCode::BAD_GATEWAY, "upstream down");
        assert_eq!(err.message, "upstream down");
        assert!(err.fields.is_empty());

        assert!(err.server.is_empty());

        let err = ApiError::from_response(StatusCode::UNAUTHORIZED, "");
        assert_eq!(err.message, "Unauthorized");
    }

    #[test]
    fn free_text_details_produce_no_fields() {
        assert!(parse_fields("declaration has no income, asset or liability items").is_empty());
        let fields = parse_fields("payeeName: required; amountCents: must be positive");
        assert_eq!(fields.len(), 2);
        assert_eq!(fields["amountCents"], "must be positive");
    }

    #[test]
    fn upload_query_is_url_encoded() {
        let client = ApiClient::new("http://portal.local/").unwrap();
        let options = UploadOptions {
            identifier: Some("id card/2026 & more".to_string()),
            purpose: None,
            dial_record_id: Some(7),
        };
        let request = client
            .build_request(Method::POST, "/api/uploads", &upload_query(5, &options), RequestBody::Empty)
            .build()
            .unwrap();
        assert_eq!(request.url().path(), "/api/uploads");
        let pairs: Vec<(String, String)> = request.url().query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("total".to_string(), "5".to_string()),
                ("identifier".to_string(), "id card/2026 & more".to_string()),
                ("dialRecordId".to_string(), "7".to_string()),
            ]
        );
    }
}

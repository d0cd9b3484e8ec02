//! Azure-Blob-compatible store authenticated with SharedKey or a SAS token

use super::error::StorageError;
use super::traits::RemoteStore;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

const API_VERSION: &str = "2021-08-06";
const DEFAULT_PROTOCOL: &str = "https";
const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";

type HmacSha256 = Hmac<Sha256>;

pub enum BlobAuth {
    SharedKey { account: String, key: SecretString },
    Sas(SecretString),
}

/// Parsed `Key=Value;...` storage connection string.
pub struct ConnectionString {
    pub blob_endpoint: String,
    pub auth: BlobAuth,
}

impl ConnectionString {
    pub fn parse(raw: &str) -> Result<Self, StorageError> {
        let mut parts: HashMap<&str, &str> = HashMap::new();
        for segment in raw.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            let (key, value) = segment.split_once('=').ok_or_else(|| {
                StorageError::ConnectionString(format!("segment '{segment}' has no '='"))
            })?;
            parts.insert(key.trim(), value.trim());
        }

        let explicit_endpoint = parts
            .get("BlobEndpoint")
            .map(|endpoint| endpoint.trim_end_matches('/').to_string());

        if let (Some(account), Some(key)) = (parts.get("AccountName"), parts.get("AccountKey")) {
            STANDARD
                .decode(key)
                .map_err(|_| StorageError::ConnectionString("AccountKey is not base64".into()))?;
            let blob_endpoint = explicit_endpoint.unwrap_or_else(|| {
                let protocol = parts
                    .get("DefaultEndpointsProtocol")
                    .copied()
                    .unwrap_or(DEFAULT_PROTOCOL);
                let suffix = parts
                    .get("EndpointSuffix")
                    .copied()
                    .unwrap_or(DEFAULT_ENDPOINT_SUFFIX);
                format!("{protocol}://{account}.blob.{suffix}")
            });
            return Ok(Self {
                blob_endpoint,
                auth: BlobAuth::SharedKey {
                    account: account.to_string(),
                    key: SecretString::from(key.to_string()),
                },
            });
        }

        match (explicit_endpoint, parts.get("SharedAccessSignature")) {
            (Some(blob_endpoint), Some(sas)) => Ok(Self {
                blob_endpoint,
                auth: BlobAuth::Sas(SecretString::from(sas.trim_start_matches('?').to_string())),
            }),
            _ => Err(StorageError::ConnectionString(
                "expected AccountName/AccountKey or BlobEndpoint/SharedAccessSignature".into(),
            )),
        }
    }
}

pub struct AzureBlobStore {
    connection: ConnectionString,
    container: String,
    http: Client,
    container_ready: AtomicBool,
}

impl AzureBlobStore {
    pub fn new(
        connection: ConnectionString,
        container: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, StorageError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            connection,
            container: container.into(),
            http,
            container_ready: AtomicBool::new(false),
        })
    }

    pub fn from_connection_string(
        raw: &str,
        container: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, StorageError> {
        Self::new(ConnectionString::parse(raw)?, container, timeout)
    }

    /// Public URI of a blob in the configured container.
    pub fn blob_url(&self, name: &str) -> String {
        format!(
            "{}/{}/{}",
            self.connection.blob_endpoint, self.container, name
        )
    }

    fn request(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, &str)],
        content_type: Option<&str>,
        content_length: usize,
        ms_headers: &[(&str, &str)],
    ) -> Result<RequestBuilder, StorageError> {
        let mut full = Url::parse(url)
            .map_err(|e| StorageError::ConnectionString(format!("bad blob url '{url}': {e}")))?;
        for (key, value) in query {
            full.query_pairs_mut().append_pair(key, value);
        }

        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        let mut headers: Vec<(String, String)> = ms_headers
            .iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
            .collect();
        headers.push(("x-ms-date".into(), date));
        headers.push(("x-ms-version".into(), API_VERSION.into()));
        headers.sort();

        let authorization = match &self.connection.auth {
            BlobAuth::SharedKey { account, key } => {
                let string_to_sign = string_to_sign(
                    method.as_str(),
                    content_length,
                    content_type.unwrap_or(""),
                    &headers,
                    &canonical_resource(account, &full, query),
                );
                Some(format!(
                    "SharedKey {account}:{}",
                    sign(key, &string_to_sign)?
                ))
            }
            BlobAuth::Sas(token) => {
                let query = match full.query() {
                    Some(existing) => format!("{existing}&{}", token.expose_secret()),
                    None => token.expose_secret().to_string(),
                };
                full.set_query(Some(&query));
                None
            }
        };

        let mut builder = self.http.request(method, full);
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(content_type) = content_type {
            builder = builder.header("Content-Type", content_type);
        }
        if let Some(authorization) = authorization {
            builder = builder.header("Authorization", authorization);
        }
        Ok(builder)
    }

    async fn ensure_container(&self) {
        if self.container_ready.load(Ordering::Acquire) {
            return;
        }
        let url = format!("{}/{}", self.connection.blob_endpoint, self.container);
        let result = match self.request(
            Method::PUT,
            &url,
            &[("restype", "container")],
            None,
            0,
            &[],
        ) {
            Ok(builder) => builder.send().await.map_err(StorageError::from),
            Err(error) => Err(error),
        };
        match result {
            Ok(response)
                if response.status().is_success() || response.status() == StatusCode::CONFLICT =>
            {
                self.container_ready.store(true, Ordering::Release);
            }
            Ok(response) => {
                warn!(container = %self.container, status = %response.status(), "Container create rejected");
            }
            Err(error) => {
                warn!(container = %self.container, %error, "Container create failed");
            }
        }
    }
}

#[async_trait]
impl RemoteStore for AzureBlobStore {
    fn location(&self) -> String {
        format!("{}/{}", self.connection.blob_endpoint, self.container)
    }

    async fn put(
        &self,
        name: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String, StorageError> {
        self.ensure_container().await;
        let url = self.blob_url(name);
        debug!(%url, size = bytes.len(), "Uploading blob");
        let response = self
            .request(
                Method::PUT,
                &url,
                &[],
                Some(content_type),
                bytes.len(),
                &[("x-ms-blob-type", "BlockBlob")],
            )?
            .body(bytes.to_vec())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(url)
    }
}

fn canonical_resource(account: &str, url: &Url, query: &[(&str, &str)]) -> String {
    let mut resource = format!("/{account}{}", url.path());
    let mut params: Vec<(String, &str)> = query
        .iter()
        .map(|(k, v)| (k.to_ascii_lowercase(), *v))
        .collect();
    params.sort();
    for (key, value) in params {
        resource.push_str(&format!("\n{key}:{value}"));
    }
    resource
}

fn string_to_sign(
    verb: &str,
    content_length: usize,
    content_type: &str,
    ms_headers: &[(String, String)],
    resource: &str,
) -> String {
    let length = if content_length == 0 {
        String::new()
    } else {
        content_length.to_string()
    };
    let mut text = format!("{verb}\n\n\n{length}\n\n{content_type}\n\n\n\n\n\n\n");
    for (name, value) in ms_headers {
        text.push_str(&format!("{name}:{value}\n"));
    }
    text.push_str(resource);
    text
}

fn sign(key: &SecretString, string_to_sign: &str) -> Result<String, StorageError> {
    let key = STANDARD
        .decode(key.expose_secret())
        .map_err(|e| StorageError::Signing(e.to_string()))?;
    let mut mac =
        HmacSha256::new_from_slice(&key).map_err(|e| StorageError::Signing(e.to_string()))?;
    mac.update(string_to_sign.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

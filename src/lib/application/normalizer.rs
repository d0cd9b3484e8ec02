//! Result Normalizer: turns a completed job's output into one byte buffer

use crate::domain::{Job, JobStatus, ServiceError};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::{Client, Url};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;

/// Object keys carrying an inline string or a fetchable URL.
const STRING_KEYS: &[&str] = &[
    "image_url",
    "image",
    "url",
    "pdf_url",
    "pdf",
    "base64",
    "image_base64",
    "pdf_base64",
];
const BYTES_KEY: &str = "bytes";

/// The three payload shapes a worker may return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultPayload {
    Bytes(Vec<u8>),
    Url(Url),
    Inline(String),
}

impl ResultPayload {
    /// Recognise exactly one payload shape in a worker output.
    pub fn classify(output: &Value) -> Result<Self, ServiceError> {
        match output {
            Value::String(text) => Self::from_text(text),
            Value::Array(items) => {
                if let Some(bytes) = byte_array(items) {
                    return Ok(Self::Bytes(bytes));
                }
                items
                    .iter()
                    .find_map(Value::as_str)
                    .ok_or_else(|| ServiceError::storage("worker output list holds no string"))
                    .and_then(Self::from_text)
            }
            Value::Object(fields) => Self::from_object(fields),
            Value::Null => Err(ServiceError::storage("worker returned no output")),
            other => Err(ServiceError::storage(format!(
                "unrecognised worker output: {other}"
            ))),
        }
    }

    fn from_text(text: &str) -> Result<Self, ServiceError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ServiceError::storage("worker output string is empty"));
        }
        if text.starts_with("http://") || text.starts_with("https://") {
            let url = Url::parse(text)
                .map_err(|e| ServiceError::storage(format!("invalid result URL: {e}")))?;
            return Ok(Self::Url(url));
        }
        Ok(Self::Inline(text.to_string()))
    }

    fn from_object(fields: &Map<String, Value>) -> Result<Self, ServiceError> {
        let present: Vec<&str> = STRING_KEYS
            .iter()
            .copied()
            .chain(std::iter::once(BYTES_KEY))
            .filter(|key| fields.get(*key).is_some_and(|v| !v.is_null()))
            .collect();

        match present.as_slice() {
            [] => Err(ServiceError::storage(
                "worker output carries no recognised payload field",
            )),
            [key] if *key == BYTES_KEY => fields
                .get(BYTES_KEY)
                .and_then(Value::as_array)
                .and_then(|items| byte_array(items))
                .map(Self::Bytes)
                .ok_or_else(|| ServiceError::storage("'bytes' must be an array of octets")),
            [key] => fields
                .get(*key)
                .and_then(Value::as_str)
                .ok_or_else(|| ServiceError::storage(format!("'{key}' must be a string")))
                .and_then(Self::from_text),
            many => Err(ServiceError::storage(format!(
                "ambiguous worker output: fields {} are all set",
                many.join(", ")
            ))),
        }
    }
}

fn byte_array(items: &[Value]) -> Option<Vec<u8>> {
    if items.is_empty() {
        return None;
    }
    items
        .iter()
        .map(|item| item.as_u64().and_then(|n| u8::try_from(n).ok()))
        .collect()
}

/// Decode a data URI or bare base64 string.
pub fn decode_inline(text: &str) -> Result<Vec<u8>, ServiceError> {
    let encoded = match text.strip_prefix("data:") {
        Some(rest) => {
            let (header, data) = rest
                .split_once(',')
                .ok_or_else(|| ServiceError::storage("data URI has no payload"))?;
            if !header.ends_with(";base64") {
                return Err(ServiceError::storage("only base64 data URIs are supported"));
            }
            data
        }
        None => text,
    };
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact)
        .map_err(|e| ServiceError::storage(format!("inline payload is not valid base64: {e}")))?;
    if bytes.is_empty() {
        return Err(ServiceError::storage("inline payload decodes to nothing"));
    }
    Ok(bytes)
}

pub struct ResultNormalizer {
    http: Client,
    max_bytes: u64,
}

impl ResultNormalizer {
    pub fn new(fetch_timeout: Duration, max_bytes: u64) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(fetch_timeout).build()?;
        Ok(Self { http, max_bytes })
    }

    /// Single byte buffer for a succeeded job.
    pub async fn normalize(&self, job: &Job) -> Result<Vec<u8>, ServiceError> {
        if job.status != JobStatus::Succeeded {
            return Err(ServiceError::storage(format!(
                "job {} has not succeeded ({:?})",
                job.id, job.status
            )));
        }
        let output = job.result_ref.as_ref().unwrap_or(&Value::Null);
        let bytes = match ResultPayload::classify(output)? {
            ResultPayload::Bytes(bytes) => bytes,
            ResultPayload::Inline(text) => decode_inline(&text)?,
            ResultPayload::Url(url) => self.fetch(url).await?,
        };
        if bytes.len() as u64 > self.max_bytes {
            return Err(self.too_large());
        }
        debug!(job = %job.id, size = bytes.len(), "Normalized job output");
        Ok(bytes)
    }

    async fn fetch(&self, url: Url) -> Result<Vec<u8>, ServiceError> {
        debug!(%url, "Fetching job output");
        let mut response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ServiceError::external(None, format!("failed to fetch {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::external(
                Some(status.as_u16()),
                format!("fetching {url} returned HTTP {status}"),
            ));
        }
        if response
            .content_length()
            .is_some_and(|length| length > self.max_bytes)
        {
            return Err(self.too_large());
        }

        let mut buffer = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| ServiceError::external(None, format!("failed to read {url}: {e}")))?
        {
            if (buffer.len() + chunk.len()) as u64 > self.max_bytes {
                return Err(self.too_large());
            }
            buffer.extend_from_slice(&chunk);
        }
        if buffer.is_empty() {
            return Err(ServiceError::storage(format!("{url} returned an empty body")));
        }
        Ok(buffer)
    }

    fn too_large(&self) -> ServiceError {
        ServiceError::storage(format!(
            "job output exceeds the {} byte limit",
            self.max_bytes
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ErrorKind, JobHandle, JobKind};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn succeeded(output: Value) -> Job {
        let mut job = Job::new(JobHandle::new(JobKind::Image, "ext"));
        job.succeed(output).unwrap();
        job
    }

    fn normalizer() -> ResultNormalizer {
        ResultNormalizer::new(Duration::from_secs(5), 1024).unwrap()
    }

    #[test]
    fn classifies_each_shape() {
        assert!(matches!(
            ResultPayload::classify(&json!("https://cdn.test/a.png")).unwrap(),
            ResultPayload::Url(_)
        ));
        assert!(matches!(
            ResultPayload::classify(&json!({"image": "data:image/png;base64,iVBO"})).unwrap(),
            ResultPayload::Inline(_)
        ));
        assert_eq!(
            ResultPayload::classify(&json!({"bytes": [1, 2, 3]})).unwrap(),
            ResultPayload::Bytes(vec![1, 2, 3])
        );
        assert!(matches!(
            ResultPayload::classify(&json!([null, "aGVsbG8="])).unwrap(),
            ResultPayload::Inline(_)
        ));
    }

    #[test]
    fn ambiguous_or_unknown_output_is_a_storage_error() {
        let both = ResultPayload::classify(&json!({"image": "aGk=", "image_url": "https://x"}));
        assert_eq!(both.unwrap_err().kind(), ErrorKind::StorageError);
        let none = ResultPayload::classify(&json!({"seed": 42}));
        assert_eq!(none.unwrap_err().kind(), ErrorKind::StorageError);
        assert!(ResultPayload::classify(&json!({"bytes": [1, 999]})).is_err());
    }

    #[test]
    fn decodes_data_uri_and_bare_base64() {
        assert_eq!(decode_inline("data:image/png;base64,aGVsbG8=").unwrap(), b"hello");
        assert_eq!(decode_inline("aGVs\nbG8=").unwrap(), b"hello");
        assert!(decode_inline("data:text/plain,hello").is_err());
        assert!(decode_inline("not base64!").is_err());
    }

    #[tokio::test]
    async fn unsucceeded_job_is_rejected() {
        let job = Job::new(JobHandle::new(JobKind::Image, "ext"));
        let err = normalizer().normalize(&job).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StorageError);
    }

    #[tokio::test]
    async fn fetches_url_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/out/r1.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"\x89PNG".to_vec()))
            .mount(&server)
            .await;

        let job = succeeded(json!({"image_url": format!("{}/out/r1.png", server.uri())}));
        let bytes = normalizer().normalize(&job).await.unwrap();
        assert_eq!(bytes, b"\x89PNG");
    }

    #[tokio::test]
    async fn oversized_download_is_refused() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 4096]))
            .mount(&server)
            .await;

        let job = succeeded(json!(format!("{}/big", server.uri())));
        let err = normalizer().normalize(&job).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StorageError);
    }

    #[tokio::test]
    async fn failed_download_is_external() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let job = succeeded(json!(format!("{}/gone", server.uri())));
        let err = normalizer().normalize(&job).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExternalServiceError);
    }
}

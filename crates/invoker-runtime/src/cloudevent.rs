//! CloudEvents HTTP binding.
//!
//! Supports the binary content mode, where attributes travel as `ce-` headers
//! and the body is the event data, and the structured content mode, where the
//! whole event is a JSON document. Batched mode is not supported.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use http::HeaderMap;
use http::header::CONTENT_TYPE;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

const HEADER_PREFIX: &str = "ce-";
const STRUCTURED_CONTENT_TYPE: &str = "application/cloudevents+json";
const BATCH_CONTENT_TYPE: &str = "application/cloudevents-batch+json";
const SUPPORTED_SPEC_VERSIONS: &[&str] = &["1.0", "0.3"];

/// Errors raised while reading a structured event from an HTTP message
#[derive(Debug, Error)]
pub enum EventParseError {
    #[error("Missing required attribute '{0}'")]
    MissingAttribute(&'static str),

    #[error("Unsupported spec version '{0}'")]
    UnsupportedSpecVersion(String),

    #[error("Header '{0}' is not valid UTF-8")]
    InvalidHeader(String),

    #[error("Batched events are not supported")]
    BatchNotSupported,

    #[error("Invalid structured event: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid structured event: {0}")]
    Invalid(String),

    #[error("Invalid base64 data: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// A CloudEvents event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructuredEvent {
    pub id: String,
    pub source: String,
    pub spec_version: String,
    pub ty: String,
    pub data_content_type: Option<String>,
    pub data_schema: Option<String>,
    pub subject: Option<String>,
    pub time: Option<String>,
    pub extensions: BTreeMap<String, String>,
    pub data: Option<Bytes>,
}

impl StructuredEvent {
    /// Read an event from the headers and body of an HTTP message
    pub fn from_http(headers: &HeaderMap, body: Bytes) -> Result<Self, EventParseError> {
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        if content_type.starts_with(BATCH_CONTENT_TYPE) {
            return Err(EventParseError::BatchNotSupported);
        }

        if content_type.starts_with(STRUCTURED_CONTENT_TYPE) {
            Self::from_structured(&body)
        } else {
            Self::from_binary(headers, body)
        }
    }

    /// Data interpreted as UTF-8 text
    pub fn text(&self) -> Option<&str> {
        self.data
            .as_ref()
            .and_then(|data| std::str::from_utf8(data).ok())
    }

    fn from_binary(headers: &HeaderMap, body: Bytes) -> Result<Self, EventParseError> {
        let mut event = StructuredEvent::default();

        for (name, value) in headers {
            let Some(attribute) = name.as_str().strip_prefix(HEADER_PREFIX) else {
                continue;
            };
            let value = value
                .to_str()
                .map_err(|_| EventParseError::InvalidHeader(name.to_string()))?
                .to_string();
            event.set_attribute(attribute, value);
        }

        event.data_content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        if !body.is_empty() {
            event.data = Some(body);
        }

        event.validate()
    }

    fn from_structured(body: &[u8]) -> Result<Self, EventParseError> {
        let document: Map<String, Value> = serde_json::from_slice(body)?;
        let mut event = StructuredEvent::default();
        let mut data = None;
        let mut data_base64 = None;

        for (name, value) in document {
            match name.as_str() {
                "data" => data = Some(value),
                "data_base64" => data_base64 = Some(value),
                _ => {
                    let value = match value {
                        Value::String(s) => s,
                        Value::Null => continue,
                        other => other.to_string(),
                    };
                    event.set_attribute(&name, value);
                }
            }
        }

        event.data = match (data, data_base64) {
            (Some(_), Some(_)) => {
                return Err(EventParseError::Invalid(
                    "both 'data' and 'data_base64' are present".to_string(),
                ));
            }
            (None, Some(Value::String(encoded))) => Some(Bytes::from(BASE64.decode(encoded)?)),
            (None, Some(_)) => {
                return Err(EventParseError::Invalid(
                    "'data_base64' must be a string".to_string(),
                ));
            }
            (Some(Value::Null), None) | (None, None) => None,
            (Some(Value::String(text)), None) if !event.has_json_data() => {
                Some(Bytes::from(text.into_bytes()))
            }
            (Some(value), None) => Some(Bytes::from(serde_json::to_vec(&value)?)),
        };

        event.validate()
    }

    fn set_attribute(&mut self, name: &str, value: String) {
        match name {
            "id" => self.id = value,
            "source" => self.source = value,
            "specversion" => self.spec_version = value,
            "type" => self.ty = value,
            "datacontenttype" => self.data_content_type = Some(value),
            "dataschema" | "schemaurl" => self.data_schema = Some(value),
            "subject" => self.subject = Some(value),
            "time" => self.time = Some(value),
            _ => {
                self.extensions.insert(name.to_string(), value);
            }
        }
    }

    fn has_json_data(&self) -> bool {
        match self.data_content_type.as_deref() {
            None => true,
            Some(ct) => ct.starts_with("application/json") || ct.contains("+json"),
        }
    }

    fn validate(self) -> Result<Self, EventParseError> {
        if self.spec_version.is_empty() {
            return Err(EventParseError::MissingAttribute("specversion"));
        }
        if !SUPPORTED_SPEC_VERSIONS.contains(&self.spec_version.as_str()) {
            return Err(EventParseError::UnsupportedSpecVersion(self.spec_version));
        }
        if self.id.is_empty() {
            return Err(EventParseError::MissingAttribute("id"));
        }
        if self.source.is_empty() {
            return Err(EventParseError::MissingAttribute("source"));
        }
        if self.ty.is_empty() {
            return Err(EventParseError::MissingAttribute("type"));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn binary_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("ce-id", HeaderValue::from_static("evt-1"));
        headers.insert("ce-source", HeaderValue::from_static("/orders"));
        headers.insert("ce-specversion", HeaderValue::from_static("1.0"));
        headers.insert("ce-type", HeaderValue::from_static("order.created"));
        headers.insert("ce-tenant", HeaderValue::from_static("acme"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        headers
    }

    #[test]
    fn test_binary_mode_keeps_body_bytes() {
        let body = Bytes::from_static(b"\x00\x01 raw \xff");
        let event = StructuredEvent::from_http(&binary_headers(), body.clone()).unwrap();

        assert_eq!(event.id, "evt-1");
        assert_eq!(event.source, "/orders");
        assert_eq!(event.ty, "order.created");
        assert_eq!(event.data_content_type.as_deref(), Some("text/plain"));
        assert_eq!(event.extensions["tenant"], "acme");
        assert_eq!(event.data, Some(body));
    }

    #[test]
    fn test_binary_mode_requires_attributes() {
        let mut headers = binary_headers();
        headers.remove("ce-type");

        let err = StructuredEvent::from_http(&headers, Bytes::new()).unwrap_err();
        assert!(matches!(err, EventParseError::MissingAttribute("type")));
    }

    #[test]
    fn test_structured_mode_json_data() {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/cloudevents+json; charset=utf-8"),
        );
        let body = br#"{
            "specversion": "1.0",
            "id": "42",
            "source": "/sensors",
            "type": "reading",
            "datacontenttype": "application/json",
            "data": {"celsius": 21}
        }"#;

        let event = StructuredEvent::from_http(&headers, Bytes::from_static(body)).unwrap();
        assert_eq!(event.id, "42");
        assert_eq!(event.text(), Some(r#"{"celsius":21}"#));
    }

    #[test]
    fn test_structured_mode_base64_data() {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/cloudevents+json"),
        );
        let body = br#"{"specversion":"1.0","id":"7","source":"s","type":"t","data_base64":"aGVsbG8="}"#;

        let event = StructuredEvent::from_http(&headers, Bytes::from_static(body)).unwrap();
        assert_eq!(event.text(), Some("hello"));
    }

    #[test]
    fn test_unsupported_spec_version() {
        let mut headers = binary_headers();
        headers.insert("ce-specversion", HeaderValue::from_static("2.0"));

        let err = StructuredEvent::from_http(&headers, Bytes::new()).unwrap_err();
        assert!(matches!(err, EventParseError::UnsupportedSpecVersion(v) if v == "2.0"));
    }

    #[test]
    fn test_batch_mode_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/cloudevents-batch+json"),
        );

        let err = StructuredEvent::from_http(&headers, Bytes::from_static(b"[]")).unwrap_err();
        assert!(matches!(err, EventParseError::BatchNotSupported));
    }
}

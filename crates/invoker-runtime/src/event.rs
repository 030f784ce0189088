//! Inbound events handed to a function through its invocation context.

use crate::cloudevent::StructuredEvent;
use bytes::{Bytes, BytesMut};
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use std::collections::HashMap;

/// An event delivered by an input binding
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingEvent {
    pub binding_name: String,
    pub metadata: HashMap<String, String>,
    pub payload: Bytes,
}

/// An event delivered by a pub/sub subscription
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicEvent {
    pub pubsub_name: String,
    pub id: String,
    pub topic: String,
    pub spec_version: String,
    pub source: String,
    pub event_type: String,
    pub content_type: String,
    pub payload: Bytes,
}

/// The request side of an HTTP exchange
#[derive(Debug, Clone)]
pub struct HttpRequest {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
}

impl HttpRequest {
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            method,
            uri,
            headers,
            body,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn query(&self) -> Option<&str> {
        self.uri.query()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header(http::header::CONTENT_TYPE.as_str())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }
}

/// The response side of an HTTP exchange, mutated by HTTP functions
#[derive(Debug, Default)]
pub struct HttpResponse {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: BytesMut,
}

impl HttpResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    /// Status explicitly chosen by the function, if any
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn status_code(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    pub fn set_content_type(&mut self, content_type: &'static str) {
        self.headers.insert(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static(content_type),
        );
    }

    pub fn append_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.append(name, value);
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn write(&mut self, data: impl AsRef<[u8]>) {
        self.body.extend_from_slice(data.as_ref());
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub(crate) fn into_parts(self) -> (HeaderMap, Bytes) {
        (self.headers, self.body.freeze())
    }
}

/// Raw request/response pair seen by HTTP functions
#[derive(Debug)]
pub struct HttpExchange {
    pub request: HttpRequest,
    pub response: HttpResponse,
}

impl HttpExchange {
    pub fn new(request: HttpRequest) -> Self {
        Self {
            request,
            response: HttpResponse::new(),
        }
    }
}

/// The event an invocation was triggered by
#[derive(Debug)]
pub enum Event {
    Binding(BindingEvent),
    Topic(TopicEvent),
    Http(HttpExchange),
    Structured(StructuredEvent),
    /// Raw request body of a generic function served over HTTP
    Payload(Bytes),
}

impl Event {
    /// Raw inbound payload bytes
    pub fn payload(&self) -> Option<&Bytes> {
        match self {
            Event::Binding(event) => Some(&event.payload),
            Event::Topic(event) => Some(&event.payload),
            Event::Http(exchange) => Some(exchange.request.body()),
            Event::Structured(event) => event.data.as_ref(),
            Event::Payload(payload) => Some(payload),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Event::Binding(_) => "binding",
            Event::Topic(_) => "topic",
            Event::Http(_) => "http",
            Event::Structured(_) => "cloudevent",
            Event::Payload(_) => "payload",
        }
    }
}

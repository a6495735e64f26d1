//! Request and response model of the resource layer.
//!
//! Only what the resources look at is modelled: method, path, query,
//! accepted content format, payload and the block-wise transfer option of
//! writes. Encoding these on the wire is left to the transport.

use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Delete,
}

/// Content formats a client may ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentFormat {
    Json,
    Text,
    /// any other registered content format, by number
    Other(u16),
}

/// Identifies the exchange a block-wise transfer belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExchangeId(u64);

/// Block-wise transfer option of a write (`Block1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Block1 {
    /// block number, starting at 0
    pub num: u32,
    /// `true` when more blocks follow
    pub more: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: Method,
    path: String,
    query: String,
    accept: Option<ContentFormat>,
    payload: Vec<u8>,
    block1: Option<Block1>,
    exchange: ExchangeId,
}

/// Response status, in CoAP terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Deleted,
    Changed,
    Content,
    Continue,
    BadRequest,
    NotFound,
    MethodNotAllowed,
    NotAcceptable,
    RequestEntityIncomplete,
    InternalServerError,
    NotImplemented,
    ServiceUnavailable,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Empty,
    Json(Value),
    /// diagnostic message
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    status: Status,
    payload: Payload,
}

impl ExchangeId {
    pub const ZERO: Self = Self::new(0);

    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use = "function does not modify the current value"]
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: String::new(),
            accept: None,
            payload: Vec::new(),
            block1: None,
            exchange: ExchangeId::ZERO,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn set_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    pub fn set_accept(mut self, accept: ContentFormat) -> Self {
        self.accept = Some(accept);
        self
    }

    pub fn set_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = payload.into();
        self
    }

    pub fn set_block1(mut self, block1: Block1) -> Self {
        self.block1 = Some(block1);
        self
    }

    pub fn set_exchange(mut self, exchange: ExchangeId) -> Self {
        self.exchange = exchange;
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// the URI path, without leading or trailing `/`
    pub fn path(&self) -> &str {
        self.path.trim_matches('/')
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn accept(&self) -> Option<ContentFormat> {
        self.accept
    }

    /// `true` unless the client asked for something other than JSON
    pub fn accepts_json(&self) -> bool {
        matches!(self.accept, None | Some(ContentFormat::Json))
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn block1(&self) -> Option<Block1> {
        self.block1
    }

    pub fn exchange(&self) -> ExchangeId {
        self.exchange
    }
}

impl Status {
    /// `(class, detail)`, as in `4.04`
    pub const fn code(self) -> (u8, u8) {
        match self {
            Self::Deleted => (2, 2),
            Self::Changed => (2, 4),
            Self::Content => (2, 5),
            Self::Continue => (2, 31),
            Self::BadRequest => (4, 0),
            Self::NotFound => (4, 4),
            Self::MethodNotAllowed => (4, 5),
            Self::NotAcceptable => (4, 6),
            Self::RequestEntityIncomplete => (4, 8),
            Self::InternalServerError => (5, 0),
            Self::NotImplemented => (5, 1),
            Self::ServiceUnavailable => (5, 3),
        }
    }

    pub const fn is_success(self) -> bool {
        self.code().0 == 2
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (class, detail) = self.code();
        write!(f, "{class}.{detail:02}")
    }
}

impl Response {
    pub fn new(status: Status, payload: Payload) -> Self {
        Self { status, payload }
    }

    pub fn content(body: Value) -> Self {
        Self::new(Status::Content, Payload::Json(body))
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn json(&self) -> Option<&Value> {
        match &self.payload {
            Payload::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.payload {
            Payload::Text(text) => Some(text),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(Status::Content.to_string(), "2.05");
        assert_eq!(Status::Continue.to_string(), "2.31");
        assert_eq!(Status::NotImplemented.to_string(), "5.01");
        assert!(Status::Deleted.is_success());
        assert!(!Status::NotFound.is_success());
    }

    #[test]
    fn path_is_trimmed() {
        let request = Request::get("/6top/stats/");
        assert_eq!(request.path(), "6top/stats");
    }

    #[test]
    fn accept() {
        assert!(Request::get("6top/stats").accepts_json());
        assert!(
            Request::get("6top/stats")
                .set_accept(ContentFormat::Json)
                .accepts_json()
        );
        assert!(
            !Request::get("6top/stats")
                .set_accept(ContentFormat::Text)
                .accepts_json()
        );
    }
}

//! HTTP request/response types exchanged between the router and app handlers.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::AppFault;

/// HTTP verbs an app may register routes for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verb {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `DELETE`
    Delete,
}

impl Verb {
    /// All verbs, in teardown order.
    pub const ALL: [Self; 4] = [Self::Get, Self::Post, Self::Put, Self::Delete];

    /// Upper-case verb name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            other => Err(format!("unsupported HTTP verb: {other}")),
        }
    }
}

/// An inbound HTTP request as seen by a route handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Request verb.
    pub verb: Verb,
    /// Full request path on the shared router (including the app prefix).
    pub path: String,
    /// Request headers, lower-cased names.
    pub headers: BTreeMap<String, String>,
    /// Raw request body.
    pub body: Vec<u8>,
}

impl Request {
    /// Create a request with an empty body.
    #[must_use]
    pub fn new(verb: Verb, path: impl Into<String>) -> Self {
        Self {
            verb,
            path: path.into(),
            headers: BTreeMap::new(),
            body: Vec::new(),
        }
    }

    /// Set the request body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Add a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    /// Body as UTF-8 text, if it is valid UTF-8.
    #[must_use]
    pub fn body_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}

/// An HTTP response produced by a route handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status code.
    pub status: u16,
    /// Response headers.
    pub headers: BTreeMap<String, String>,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl Response {
    /// Create a response with the given status and an empty body.
    #[must_use]
    pub fn with_status(status: u16) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: Vec::new(),
        }
    }

    /// `200 OK` with a raw body.
    #[must_use]
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            ..Self::with_status(200)
        }
    }

    /// `200 OK` with a plain-text body.
    #[must_use]
    pub fn text(body: impl Into<String>) -> Self {
        Self::ok(body.into()).with_header("content-type", "text/plain; charset=utf-8")
    }

    /// `200 OK` with a JSON body.
    #[must_use]
    pub fn json(value: &serde_json::Value) -> Self {
        Self::ok(value.to_string()).with_header("content-type", "application/json")
    }

    /// `404 Not Found`.
    #[must_use]
    pub fn not_found() -> Self {
        Self::with_status(404)
    }

    /// `500 Internal Server Error` carrying a short message.
    #[must_use]
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self {
            body: message.into().into_bytes(),
            ..Self::with_status(500)
        }
    }

    /// Add a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    /// Body as UTF-8 text, if it is valid UTF-8.
    #[must_use]
    pub fn body_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}

/// A route handler supplied by app code.
pub type RouteHandler = Arc<dyn Fn(&Request) -> Result<Response, AppFault> + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verb_parse_is_case_insensitive() {
        assert_eq!("get".parse::<Verb>().unwrap(), Verb::Get);
        assert_eq!("Delete".parse::<Verb>().unwrap(), Verb::Delete);
        assert!("PATCH".parse::<Verb>().is_err());
    }

    #[test]
    fn verb_serializes_upper_case() {
        assert_eq!(serde_json::to_string(&Verb::Put).unwrap(), "\"PUT\"");
    }

    #[test]
    fn response_helpers() {
        let r = Response::text("hi");
        assert_eq!(r.status, 200);
        assert_eq!(r.body_text(), Some("hi"));
        assert_eq!(
            r.headers.get("content-type").map(String::as_str),
            Some("text/plain; charset=utf-8")
        );

        let r = Response::json(&serde_json::json!({"ok": true}));
        assert_eq!(r.body_text(), Some("{\"ok\":true}"));

        assert_eq!(Response::not_found().status, 404);
        assert_eq!(Response::internal_error("x").status, 500);
    }
}

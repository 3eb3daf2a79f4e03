//! The boundary to whatever actually fetches documents.

use crate::error::{Error, FetchError};
use serde::{Deserialize, Serialize};

/// How the transport should reach the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProxyConfig {
    None,
    /// `host:port` of an HTTP proxy.
    Http(String),
}

impl Default for ProxyConfig {
    fn default() -> Self {
        ProxyConfig::None
    }
}

/// Per-subscription server parameters.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FetchParams {
    /// Top-level node names to include.
    pub queries: Vec<String>,
    /// Image keys the server may leave out.
    pub ignored_images: Vec<String>,
}

impl FetchParams {
    pub fn with_queries<I, S>(queries: I) -> FetchParams
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FetchParams {
            queries: queries.into_iter().map(Into::into).collect(),
            ignored_images: Vec::new(),
        }
    }
}

/// What the transport sends to the server, as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchRequest {
    pub auth_token: String,
    pub queries: Vec<String>,
    pub ignored_images: Vec<String>,
    /// From the previously fetched document, so the server can answer "unmodified".
    pub last_modified: Option<String>,
    /// Also from the previous document; changes e.g. when a branch is created.
    pub version: Option<String>,
    pub proxy: ProxyConfig,
}

impl FetchRequest {
    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<FetchRequest, Error> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchResponse {
    /// A header-prefixed encoded document.
    Document(Vec<u8>),
    /// The server's copy matches `last_modified` and `version` of the request.
    Unmodified,
}

/// Fetches documents. Called from the background worker only.
pub trait DocTransport: Send + Sync {
    /// `request_json` is a [`FetchRequest`] serialized with [`FetchRequest::to_json`].
    fn fetch(&self, doc_id: &str, request_json: &str) -> Result<FetchResponse, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_survives_json() {
        let request = FetchRequest {
            auth_token: "token".into(),
            queries: vec!["Main".into()],
            ignored_images: vec![],
            last_modified: Some("2024-01-01".into()),
            version: None,
            proxy: ProxyConfig::Http("localhost:8080".into()),
        };
        let json = request.to_json().unwrap();
        assert!(json.contains("\"queries\":[\"Main\"]"));
        assert_eq!(FetchRequest::from_json(&json).unwrap(), request);
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! How calls reach a service.
//!
//! Each call is a method name plus a JSON object of named arguments, and
//! yields a JSON response. [`HttpTransport`] posts the arguments to
//! `/<method>` on the service. [`SnapshotTransport`] answers from a
//! document captured earlier, keyed by method name, and so can only serve
//! read-only calls.

use std::collections::BTreeMap;
use std::net::Ipv6Addr;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde_json::Value;

use crate::types::FbossBaseError;
use crate::Error;

#[async_trait]
pub trait Transport: Send + Sync {
    async fn call(&self, method: &str, args: Value) -> Result<Value, Error>;
}

/// A live connection to a service.
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    base: String,
}

impl HttpTransport {
    /// Build a transport for the service at `host:port`. Every call must
    /// complete within `timeout`.
    pub fn new(host: &str, port: u16, timeout: Duration) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Transport(e.to_string()))?;
        Ok(HttpTransport {
            client,
            base: base_url(host, port),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }
}

fn base_url(host: &str, port: u16) -> String {
    if host.parse::<Ipv6Addr>().is_ok() {
        format!("http://[{host}]:{port}")
    } else {
        format!("http://{host}:{port}")
    }
}

// Map an HTTP response onto the service's error model.
fn classify(
    method: &str,
    status: StatusCode,
    body: &[u8],
) -> Result<Value, Error> {
    if status.is_success() {
        if body.is_empty() {
            return Ok(Value::Null);
        }
        return serde_json::from_slice(body).map_err(|source| Error::Decode {
            method: method.to_string(),
            source,
        });
    }

    match status {
        StatusCode::NOT_FOUND | StatusCode::NOT_IMPLEMENTED => {
            Err(Error::Unsupported(method.to_string()))
        }
        _ => {
            let err = serde_json::from_slice::<FbossBaseError>(body)
                .ok()
                .filter(|e| !e.message.is_empty())
                .unwrap_or_else(|| FbossBaseError {
                    message: status
                        .canonical_reason()
                        .map(String::from)
                        .unwrap_or_else(|| status.to_string()),
                });
            Err(Error::Fboss(err))
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn call(&self, method: &str, args: Value) -> Result<Value, Error> {
        let url = format!("{}/{method}", self.base);
        let rsp = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .body(args.to_string())
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        let status = rsp.status();
        let body = rsp
            .bytes()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        classify(method, status, &body)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("failed to read snapshot {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("snapshot {path} is not a JSON object of method responses")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Responses captured from a switch, keyed by method name.
///
/// Arguments are ignored: a method always answers with the same document.
#[derive(Debug, Default)]
pub struct SnapshotTransport {
    methods: BTreeMap<String, Value>,
}

impl SnapshotTransport {
    pub fn from_methods(methods: BTreeMap<String, Value>) -> Self {
        SnapshotTransport { methods }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let path = path.as_ref();
        let contents =
            std::fs::read(path).map_err(|source| SnapshotError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let methods =
            serde_json::from_slice(&contents).map_err(|source| {
                SnapshotError::Parse {
                    path: path.to_path_buf(),
                    source,
                }
            })?;
        Ok(Self::from_methods(methods))
    }
}

#[async_trait]
impl Transport for SnapshotTransport {
    async fn call(&self, method: &str, _args: Value) -> Result<Value, Error> {
        self.methods
            .get(method)
            .cloned()
            .ok_or_else(|| Error::Unsupported(method.to_string()))
    }
}

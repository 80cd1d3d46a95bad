// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use std::collections::HashMap;
use std::fmt::Debug;
use std::fmt::Formatter;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use http::HeaderMap;
use http::HeaderName;
use http::HeaderValue;
use log::debug;
use serde::Deserialize;
use serde::Serialize;

use crate::auth::Authenticator;
use crate::auth::Negotiate;
use crate::client::WebhdfsClient;
use crate::core::WebhdfsCore;
use crate::error::Error;
use crate::error::ErrorKind;
use crate::error::Result;
use crate::http::HttpClient;
use crate::uri::normalize_root;

const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Config for the WebHDFS client.
#[derive(Default, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
#[non_exhaustive]
pub struct WebhdfsConfig {
    /// `http` or `https`. Defaults to `http`.
    pub protocol: Option<String>,
    /// Host of the namenode-facing gateway. Required.
    pub host: Option<String>,
    /// Port of the gateway. Required.
    pub port: Option<u16>,
    /// Root all operation paths are resolved under. Required.
    pub root: Option<String>,
    /// Value of the `user.name` query parameter, when the gateway uses
    /// simple authentication.
    pub user_name: Option<String>,
    /// Per-request timeout in milliseconds for unary operations.
    pub timeout_ms: Option<u64>,
    /// Basic auth user.
    pub basic_user: Option<String>,
    /// Basic auth password.
    pub basic_password: Option<String>,
    /// Skip TLS certificate verification. For gateways with self-signed
    /// certificates.
    pub accept_invalid_certs: bool,
    /// Extra headers attached to every request.
    pub headers: HashMap<String, String>,
}

impl Debug for WebhdfsConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhdfsConfig")
            .field("protocol", &self.protocol)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("root", &self.root)
            .field("user_name", &self.user_name)
            .field("timeout_ms", &self.timeout_ms)
            .finish_non_exhaustive()
    }
}

/// Builder for [`WebhdfsClient`].
#[derive(Default)]
pub struct WebhdfsBuilder {
    config: WebhdfsConfig,
    negotiate: Option<Arc<dyn Negotiate>>,
}

impl Debug for WebhdfsBuilder {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhdfsBuilder")
            .field("config", &self.config)
            .field("kerberos", &self.negotiate.is_some())
            .finish()
    }
}

impl WebhdfsBuilder {
    /// Create a builder from an existing config.
    pub fn from_config(config: WebhdfsConfig) -> Self {
        Self {
            config,
            negotiate: None,
        }
    }

    /// Set the protocol, `http` or `https`.
    pub fn protocol(mut self, protocol: &str) -> Self {
        if !protocol.is_empty() {
            self.config.protocol = Some(protocol.to_string());
        }
        self
    }

    /// Set the gateway host.
    pub fn host(mut self, host: &str) -> Self {
        if !host.is_empty() {
            self.config.host = Some(host.to_string());
        }
        self
    }

    /// Set the gateway port.
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = Some(port);
        self
    }

    /// Set the root path of this client.
    ///
    /// All operations will happen under this root.
    pub fn root(mut self, root: &str) -> Self {
        if !root.is_empty() {
            self.config.root = Some(root.to_string());
        }
        self
    }

    /// Set the `user.name` sent with every request.
    pub fn user_name(mut self, user_name: &str) -> Self {
        if !user_name.is_empty() {
            self.config.user_name = Some(user_name.to_string());
        }
        self
    }

    /// Set the per-request timeout for unary operations.
    ///
    /// Defaults to 10 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    /// Use static basic-auth credentials.
    pub fn basic_auth(mut self, user: &str, password: &str) -> Self {
        self.config.basic_user = Some(user.to_string());
        self.config.basic_password = Some(password.to_string());
        self
    }

    /// Skip TLS certificate verification.
    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.config.accept_invalid_certs = accept;
        self
    }

    /// Attach an extra header to every request.
    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.config
            .headers
            .insert(key.to_string(), value.to_string());
        self
    }

    /// Enable kerberos authentication through the given negotiation
    /// primitive. 401 responses trigger a handshake and a single retry.
    pub fn negotiate(mut self, negotiate: impl Negotiate) -> Self {
        self.negotiate = Some(Arc::new(negotiate));
        self
    }

    /// Build the client.
    ///
    /// Host, port and root are mandatory; everything else has a default.
    pub fn build(self) -> Result<WebhdfsClient> {
        debug!("start building client: {:?}", self);

        let config = self.config;

        let host = config
            .host
            .ok_or_else(|| Error::new(ErrorKind::ConfigInvalid, "host is required"))?;
        let port = config
            .port
            .ok_or_else(|| Error::new(ErrorKind::ConfigInvalid, "port is required"))?;
        let root = config
            .root
            .ok_or_else(|| Error::new(ErrorKind::ConfigInvalid, "root is required"))?;
        let root = normalize_root(&root);

        let protocol = config.protocol.unwrap_or_else(|| "http".to_string());
        if protocol != "http" && protocol != "https" {
            return Err(
                Error::new(ErrorKind::ConfigInvalid, "protocol must be http or https")
                    .with_context("protocol", protocol),
            );
        }

        let endpoint = format!("{protocol}://{host}:{port}");
        debug!("client uses endpoint {endpoint} root {root}");

        let timeout = Duration::from_millis(config.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS));

        let basic_auth = match (config.basic_user, config.basic_password) {
            (Some(user), Some(password)) => {
                let encoded = BASE64.encode(format!("{user}:{password}"));
                let value = HeaderValue::from_str(&format!("Basic {encoded}")).map_err(|err| {
                    Error::new(ErrorKind::ConfigInvalid, "invalid basic auth credentials")
                        .set_source(err)
                })?;
                Some(value)
            }
            (None, None) => None,
            _ => {
                return Err(Error::new(
                    ErrorKind::ConfigInvalid,
                    "basic auth requires both user and password",
                ))
            }
        };

        let mut extra_headers = HeaderMap::new();
        for (key, value) in config.headers {
            let name = HeaderName::from_bytes(key.as_bytes()).map_err(|err| {
                Error::new(ErrorKind::ConfigInvalid, "invalid header name")
                    .with_context("header", key.clone())
                    .set_source(err)
            })?;
            let value = HeaderValue::from_str(&value).map_err(|err| {
                Error::new(ErrorKind::ConfigInvalid, "invalid header value")
                    .with_context("header", key)
                    .set_source(err)
            })?;
            extra_headers.insert(name, value);
        }

        let client = HttpClient::new(timeout, config.accept_invalid_certs)?;

        let core = WebhdfsCore {
            root,
            endpoint,
            user_name: config.user_name,
            basic_auth,
            extra_headers,
            auth: Authenticator::new(self.negotiate),
            client,
        };

        Ok(WebhdfsClient::new(core))
    }
}

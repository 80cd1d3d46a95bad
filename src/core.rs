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

use std::fmt::Debug;
use std::fmt::Formatter;

use bytes::Bytes;
use http::header;
use http::HeaderMap;
use http::HeaderValue;
use http::Method;
use http::Request;
use http::Response;
use http::StatusCode;
use log::debug;

use crate::auth::Authenticator;
use crate::error::classify;
use crate::error::new_request_build_error;
use crate::error::Error;
use crate::error::ErrorKind;
use crate::error::ResponseClass;
use crate::error::Result;
use crate::http::Body;
use crate::http::ByteStream;
use crate::http::HttpClient;
use crate::uri::build_abs_path;
use crate::uri::host_of;
use crate::uri::percent_encode_path;

pub(crate) struct WebhdfsCore {
    pub root: String,
    pub endpoint: String,
    pub user_name: Option<String>,
    pub basic_auth: Option<HeaderValue>,
    pub extra_headers: HeaderMap,
    pub auth: Authenticator,
    pub client: HttpClient,
}

impl Debug for WebhdfsCore {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhdfsCore")
            .field("root", &self.root)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl WebhdfsCore {
    /// Build the full operation url: the rooted path percent-encoded exactly
    /// once, then `op=<OP>`, then `user.name` when configured, then the
    /// operation parameters in the given order.
    pub fn url(&self, op: &str, path: &str, params: &[(&str, String)]) -> String {
        let p = build_abs_path(&self.root, path);

        let mut url = format!(
            "{}/webhdfs/v1/{}?op={}",
            self.endpoint,
            percent_encode_path(&p),
            op,
        );
        if let Some(user) = &self.user_name {
            url += format!("&user.name={user}").as_str();
        }
        for (k, v) in params {
            url += format!("&{k}={v}").as_str();
        }

        url
    }

    /// Headers attached to every outgoing request: caller-supplied extras,
    /// basic auth and the session cookie while it is unexpired.
    fn base_headers(&self) -> HeaderMap {
        let mut headers = self.extra_headers.clone();
        if let Some(basic) = &self.basic_auth {
            headers.insert(header::AUTHORIZATION, basic.clone());
        }
        if let Some(cookie) = self.auth.cookie_header() {
            // an unusable cookie value means no cookie this time
            if let Ok(value) = HeaderValue::from_str(&cookie) {
                headers.insert(header::COOKIE, value);
            }
        }
        headers
    }

    pub fn build_request(
        &self,
        method: Method,
        url: &str,
        headers: HeaderMap,
        body: Body,
    ) -> Result<Request<Body>> {
        let mut req = Request::builder()
            .method(method)
            .uri(url)
            .body(body)
            .map_err(new_request_build_error)?;
        *req.headers_mut() = headers;
        Ok(req)
    }

    /// Send a body-less request, retrying once through kerberos negotiation
    /// on a 401. The retried response's `Set-Cookie` is cached for reuse.
    pub async fn send_with_auth(&self, method: Method, url: &str) -> Result<Response<Bytes>> {
        let req = self.build_request(method.clone(), url, self.base_headers(), Body::Empty)?;
        let resp = self.client.send(req).await?;

        if resp.status() == StatusCode::UNAUTHORIZED && self.auth.kerberos_enabled() {
            let headers = self.negotiated_headers(url).await?;
            let req = self.build_request(method, url, headers, Body::Empty)?;
            let resp = self.client.send(req).await?;
            self.auth.store_from_headers(resp.headers());
            debug!("retried {url} after negotiation: {}", resp.status());
            return Ok(resp);
        }

        Ok(resp)
    }

    /// Streaming variant of [`send_with_auth`], for `OPEN`.
    pub async fn fetch_with_auth(&self, method: Method, url: &str) -> Result<Response<ByteStream>> {
        let req = self.build_request(method.clone(), url, self.base_headers(), Body::Empty)?;
        let resp = self.client.fetch(req).await?;

        if resp.status() == StatusCode::UNAUTHORIZED && self.auth.kerberos_enabled() {
            let headers = self.negotiated_headers(url).await?;
            let req = self.build_request(method, url, headers, Body::Empty)?;
            let resp = self.client.fetch(req).await?;
            self.auth.store_from_headers(resp.headers());
            debug!("retried {url} after negotiation: {}", resp.status());
            return Ok(resp);
        }

        Ok(resp)
    }

    /// Headers for a request against a redirect target: the usual set, plus
    /// a token freshly negotiated for the redirected host when kerberos is
    /// configured.
    pub async fn redirected_headers(&self, location: &str) -> Result<HeaderMap> {
        if self.auth.kerberos_enabled() {
            self.negotiated_headers(location).await
        } else {
            Ok(self.base_headers())
        }
    }

    async fn negotiated_headers(&self, url: &str) -> Result<HeaderMap> {
        let token = self.auth.negotiate(&host_of(url)?).await?;
        let mut headers = self.base_headers();
        let value = HeaderValue::from_str(&format!("Negotiate {token}")).map_err(|err| {
            Error::new(ErrorKind::Auth, "negotiated token is not a valid header").set_source(err)
        })?;
        headers.insert(header::AUTHORIZATION, value);
        Ok(headers)
    }

    /// Run a unary metadata operation. Metadata operations never redirect in
    /// the protocol, so an observed redirect is an error.
    pub async fn execute(
        &self,
        method: Method,
        op: &'static str,
        url: &str,
    ) -> Result<Response<Bytes>> {
        let resp = self.send_with_auth(method, url).await?;

        match classify(resp) {
            ResponseClass::Success(resp) => Ok(resp),
            ResponseClass::Redirect(_) => Err(Error::new(
                ErrorKind::UnexpectedRedirect,
                "Unexpected Redirect",
            )
            .with_operation(op)),
            ResponseClass::Failure(err) => Err(err.with_operation(op)),
        }
    }
}

/// Required path arguments are checked before any network round trip.
pub(crate) fn check_path(path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(Error::new(ErrorKind::Precondition, "path is required"));
    }
    Ok(())
}

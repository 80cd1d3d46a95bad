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

//! A thin transport over reqwest.
//!
//! Redirects are never followed by the transport: the upload and download
//! pipelines resolve them explicitly so kerberos tokens can be attached to
//! the redirected request.

use std::mem;
use std::str::FromStr;
use std::time::Duration;

use bytes::Bytes;
use bytes::BytesMut;
use futures::stream::BoxStream;
use futures::StreamExt;
use futures::TryStreamExt;
use http::header;
use http::HeaderMap;
use http::Request;
use http::Response;

use crate::error::Error;
use crate::error::ErrorKind;
use crate::error::Result;

/// A streaming response or request body.
pub(crate) type ByteStream = BoxStream<'static, Result<Bytes>>;

/// The outgoing request body.
pub(crate) enum Body {
    Empty,
    Bytes(Bytes),
    Stream(ByteStream),
}

impl Body {
    fn is_streaming(&self) -> bool {
        matches!(self, Body::Stream(_))
    }

    fn into_reqwest(self) -> Option<reqwest::Body> {
        match self {
            Body::Empty => None,
            Body::Bytes(bs) if bs.is_empty() => None,
            Body::Bytes(bs) => Some(reqwest::Body::from(bs)),
            Body::Stream(stream) => Some(reqwest::Body::wrap_stream(stream)),
        }
    }
}

pub(crate) struct HttpClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpClient {
    pub fn new(timeout: Duration, accept_invalid_certs: bool) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(timeout);
        if accept_invalid_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder.build().map_err(|err| {
            Error::new(ErrorKind::ConfigInvalid, "http client build failed").set_source(err)
        })?;

        Ok(Self { client, timeout })
    }

    /// Send a request and buffer the whole response body.
    pub async fn send(&self, req: Request<Body>) -> Result<Response<Bytes>> {
        let (parts, body) = self.dispatch(req).await?.into_parts();
        let body = collect(body).await?;
        Ok(Response::from_parts(parts, body))
    }

    /// Send a request and return the streaming response body.
    pub async fn fetch(&self, req: Request<Body>) -> Result<Response<ByteStream>> {
        self.dispatch(req).await
    }

    async fn dispatch(&self, req: Request<Body>) -> Result<Response<ByteStream>> {
        let (parts, body) = req.into_parts();
        let url = parts.uri.to_string();

        let mut req_builder = self
            .client
            .request(
                parts.method,
                reqwest::Url::from_str(&url).map_err(|err| {
                    Error::new(ErrorKind::Unexpected, "invalid request url")
                        .with_context("url", &url)
                        .set_source(err)
                })?,
            )
            .headers(parts.headers);

        // Requests carrying a streaming body are bounded by the connect
        // timeout only, so long transfers are not killed mid-stream.
        if !body.is_streaming() {
            req_builder = req_builder.timeout(self.timeout);
        }

        if let Some(body) = body.into_reqwest() {
            req_builder = req_builder.body(body);
        }

        let mut resp = req_builder
            .send()
            .await
            .map_err(|err| new_transport_error(err, &url))?;

        let mut hr = Response::builder()
            .status(resp.status())
            .version(resp.version());
        // Swap headers directly instead of copying the entire map.
        if let Some(headers) = hr.headers_mut() {
            mem::swap(headers, resp.headers_mut());
        }

        let stream_url = url.clone();
        let stream = resp
            .bytes_stream()
            .map_err(move |err| new_transport_error(err, &stream_url))
            .boxed();

        // status, version and headers all come from a parsed response
        Ok(hr.body(stream).expect("response must build"))
    }
}

/// Drain a byte stream into a single buffer.
pub(crate) async fn collect(mut stream: ByteStream) -> Result<Bytes> {
    let mut buf = BytesMut::new();
    while let Some(bs) = stream.try_next().await? {
        buf.extend_from_slice(&bs);
    }
    Ok(buf.freeze())
}

pub(crate) fn parse_content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

fn new_transport_error(err: reqwest::Error, url: &str) -> Error {
    Error::new(ErrorKind::Transport, "")
        .with_operation("http::send")
        .with_context("url", url)
        .set_source(err)
}

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

use std::pin::Pin;
use std::sync::Arc;
use std::task::Context;
use std::task::Poll;

use bytes::Bytes;
use futures::stream;
use futures::Stream;
use futures::StreamExt;
use http::header;
use http::HeaderMap;
use http::Method;
use http::StatusCode;
use log::debug;

use crate::core::check_path;
use crate::core::WebhdfsCore;
use crate::error::parse_error_msg;
use crate::error::parse_location;
use crate::error::parse_remote_exception;
use crate::error::Error;
use crate::error::ErrorKind;
use crate::error::Result;
use crate::http::collect;
use crate::http::parse_content_length;
use crate::http::Body;
use crate::http::ByteStream;

/// A streaming download of one path.
///
/// Yields `Result<Bytes>` chunks; dropping the reader stops the underlying
/// transfer.
pub struct Reader {
    stream: ByteStream,
    size: Option<u64>,
}

impl Reader {
    /// The size advertised by the gateway, when known.
    pub fn content_length(&self) -> Option<u64> {
        self.size
    }

    /// Drain the stream into a single buffer.
    pub async fn read_all(mut self) -> Result<Bytes> {
        use futures::TryStreamExt;

        let mut buf = bytes::BytesMut::new();
        while let Some(bs) = self.stream.try_next().await? {
            buf.extend_from_slice(&bs);
        }
        Ok(buf.freeze())
    }
}

impl std::fmt::Debug for Reader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reader").field("size", &self.size).finish()
    }
}

impl Stream for Reader {
    type Item = Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.stream.poll_next_unpin(cx)
    }
}

/// Issue `OPEN` and resolve the namenode's redirect before handing any byte
/// to the caller.
pub(crate) async fn open_stream(
    core: Arc<WebhdfsCore>,
    path: &str,
    offset: Option<u64>,
    length: Option<u64>,
) -> Result<Reader> {
    check_path(path)?;

    let mut params = Vec::new();
    if let Some(offset) = offset {
        params.push(("offset", offset.to_string()));
    }
    if let Some(length) = length {
        params.push(("length", length.to_string()));
    }

    let url = core.url("OPEN", path, &params);
    let mut resp = core.fetch_with_auth(Method::GET, &url).await?;

    let mut redirected = false;
    loop {
        let status = resp.status();

        if matches!(
            status,
            StatusCode::MOVED_PERMANENTLY | StatusCode::TEMPORARY_REDIRECT
        ) {
            let location = match parse_location(resp.headers()) {
                Some(location) => location,
                None => {
                    return Err(Error::new(
                        ErrorKind::UnexpectedRedirect,
                        "Unexpected Redirect",
                    )
                    .with_operation("open"))
                }
            };
            // the protocol defines a single namenode -> datanode hop
            if redirected {
                return Err(Error::new(
                    ErrorKind::UnexpectedRedirect,
                    "Unexpected Redirect",
                )
                .with_operation("open")
                .with_context("location", location));
            }

            debug!("open {path} redirected to data node");
            let headers = core.redirected_headers(&location).await?;
            let req = core.build_request(Method::GET, &location, headers, Body::Empty)?;
            resp = core.client.fetch(req).await?;
            if core.auth.kerberos_enabled() {
                core.auth.store_from_headers(resp.headers());
            }
            redirected = true;
            continue;
        }

        if matches!(status, StatusCode::OK | StatusCode::CREATED) {
            // Some gateways report failures in a JSON payload on a
            // 200-class response; those only become visible once the body
            // arrives.
            if is_json_content(resp.headers()) {
                let (parts, body) = resp.into_parts();
                let body = collect(body).await?;
                let text = String::from_utf8_lossy(&body);

                return match parse_remote_exception(&text) {
                    Some(remote) => Err(Error::new(ErrorKind::Protocol, "")
                        .with_status_code(parts.status)
                        .with_remote_exception(remote)
                        .with_operation("open")),
                    // not an exception payload after all, deliver it as data
                    None => Ok(Reader {
                        size: Some(body.len() as u64),
                        stream: stream::iter(vec![Ok(body)]).boxed(),
                    }),
                };
            }

            let size = parse_content_length(resp.headers());
            return Ok(Reader {
                stream: resp.into_body(),
                size,
            });
        }

        // error statuses can stream their body in after the status line
        let (parts, body) = resp.into_parts();
        let body = collect(body).await?;
        let text = String::from_utf8_lossy(&body);
        return Err(parse_error_msg(parts, &text).with_operation("open"));
    }
}

fn is_json_content(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/json"))
        .unwrap_or(false)
}

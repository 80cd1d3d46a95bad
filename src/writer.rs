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

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use bytes::Bytes;
use futures::stream;
use futures::StreamExt;
use futures::TryStreamExt;
use http::header;
use http::HeaderValue;
use http::Method;
use log::debug;
use tokio::sync::mpsc;

use crate::core::WebhdfsCore;
use crate::error::classify;
use crate::error::parse_location;
use crate::error::Error;
use crate::error::ErrorKind;
use crate::error::ResponseClass;
use crate::error::Result;
use crate::http::Body;
use crate::http::ByteStream;

/// Options for creating a file.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Replace the file if it already exists.
    pub overwrite: bool,
    /// Octal permission of the created file.
    pub permission: String,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            overwrite: true,
            permission: "0755".to_string(),
        }
    }
}

/// The terminal result of an upload.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Bytes shipped to the data node.
    pub bytes_written: u64,
    /// The canonical remote path from the final `Location` header, when the
    /// gateway reports one.
    pub location: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum UploadKind {
    Create,
    Append,
}

impl UploadKind {
    fn method(&self) -> Method {
        match self {
            UploadKind::Create => Method::PUT,
            UploadKind::Append => Method::POST,
        }
    }

    fn op(&self) -> &'static str {
        match self {
            UploadKind::Create => "CREATE",
            UploadKind::Append => "APPEND",
        }
    }

    fn name(&self) -> &'static str {
        match self {
            UploadKind::Create => "create",
            UploadKind::Append => "append",
        }
    }
}

pub(crate) enum UploadSource {
    Buffered(Bytes),
    Stream(ByteStream),
}

/// The two-step create/append protocol: the initial request must carry no
/// body, the byte source is only attached to the request against the
/// redirect target.
pub(crate) async fn upload(
    core: Arc<WebhdfsCore>,
    kind: UploadKind,
    path: String,
    options: WriteOptions,
    source: UploadSource,
) -> Result<Upload> {
    let name = kind.name();

    let mut params = Vec::new();
    if matches!(kind, UploadKind::Create) {
        params.push(("overwrite", options.overwrite.to_string()));
        params.push(("permission", options.permission.clone()));
    }

    let url = core.url(kind.op(), &path, &params);
    let resp = core.send_with_auth(kind.method(), &url).await?;

    let location = match classify(resp) {
        ResponseClass::Redirect(location) => location,
        ResponseClass::Success(_) => {
            // no byte has been attached yet, so this wrote nothing
            return Err(Error::new(
                ErrorKind::UnexpectedRedirect,
                "redirect expected but none received",
            )
            .with_operation(name)
            .with_context("path", path));
        }
        ResponseClass::Failure(err) => return Err(err.with_operation(name)),
    };

    debug!("{name} {path} redirected to data node");

    let mut headers = core.redirected_headers(&location).await?;
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );

    let (body, counter) = match source {
        UploadSource::Buffered(bs) => {
            let len = bs.len() as u64;
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
            (Body::Bytes(bs), Counter::Fixed(len))
        }
        UploadSource::Stream(stream) => {
            let counter = Arc::new(AtomicU64::new(0));
            let counting = counter.clone();
            let stream = stream
                .inspect_ok(move |bs| {
                    counting.fetch_add(bs.len() as u64, Ordering::Relaxed);
                })
                .boxed();
            (Body::Stream(stream), Counter::Counted(counter))
        }
    };

    let req = core.build_request(kind.method(), &location, headers, body)?;
    let resp = core.client.send(req).await?;
    if core.auth.kerberos_enabled() {
        core.auth.store_from_headers(resp.headers());
    }

    match classify(resp) {
        ResponseClass::Success(resp) => Ok(Upload {
            bytes_written: counter.value(),
            location: parse_location(resp.headers()),
        }),
        ResponseClass::Redirect(_) => Err(Error::new(
            ErrorKind::UnexpectedRedirect,
            "Unexpected Redirect",
        )
        .with_operation(name)),
        ResponseClass::Failure(err) => Err(err.with_operation(name)),
    }
}

enum Counter {
    Fixed(u64),
    Counted(Arc<AtomicU64>),
}

impl Counter {
    fn value(&self) -> u64 {
        match self {
            Counter::Fixed(n) => *n,
            Counter::Counted(counter) => counter.load(Ordering::Relaxed),
        }
    }
}

/// A streaming upload sink.
///
/// Bytes written before the redirect is resolved queue in a bounded channel;
/// nothing reaches the wire until the data node target is known. The upload
/// outcome is reported exactly once, by [`close`][Writer::close].
#[derive(Debug)]
pub struct Writer {
    tx: Option<mpsc::Sender<Result<Bytes>>>,
    task: tokio::task::JoinHandle<Result<Upload>>,
}

impl Writer {
    pub(crate) fn spawn(
        core: Arc<WebhdfsCore>,
        kind: UploadKind,
        path: String,
        options: WriteOptions,
    ) -> Self {
        let (tx, mut rx) = mpsc::channel::<Result<Bytes>>(16);
        let source = stream::poll_fn(move |cx| rx.poll_recv(cx)).boxed();

        let task = tokio::spawn(upload(core, kind, path, options, UploadSource::Stream(source)));

        Self { tx: Some(tx), task }
    }

    /// Push a chunk into the upload.
    ///
    /// A pipeline that already failed silently discards further chunks; its
    /// error is reported by [`close`][Writer::close], and only there.
    pub async fn write(&mut self, bs: impl Into<Bytes>) -> Result<()> {
        if let Some(tx) = &self.tx {
            let _ = tx.send(Ok(bs.into())).await;
        }
        Ok(())
    }

    /// Finish the upload and return its single terminal result.
    pub async fn close(mut self) -> Result<Upload> {
        // dropping the sender ends the byte stream
        self.tx.take();

        self.task.await.map_err(|err| {
            Error::new(ErrorKind::Unexpected, "upload task failed").set_source(err)
        })?
    }
}

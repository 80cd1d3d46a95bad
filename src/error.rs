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

//! Errors returned by the WebHDFS client.

use std::fmt;
use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;

use bytes::Bytes;
use http::header;
use http::response::Parts;
use http::HeaderMap;
use http::Response;
use http::StatusCode;

use crate::message::RemoteExceptionWrapper;

/// Result that is a wrapper of `Result<T, webhdfs_client::Error>`.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// ErrorKind is all kinds of Error of the WebHDFS client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The client doesn't know what happened here, and no actions other than
    /// just returning it back.
    Unexpected,
    /// The config for the client is invalid.
    ConfigInvalid,
    /// The caller passed an empty or otherwise unusable required argument.
    /// Raised before any network round trip.
    Precondition,
    /// The request never produced a response: connection refused, timeout,
    /// name resolution failure.
    Transport,
    /// The gateway answered with an error status, possibly enriched with a
    /// remote exception payload.
    Protocol,
    /// A success response whose JSON body lacks the expected top-level key.
    Structural,
    /// A redirect was observed where the protocol does not define one, or a
    /// redirect carried no usable `Location`.
    UnexpectedRedirect,
    /// Kerberos negotiation failed or never completed.
    Auth,
}

impl ErrorKind {
    /// Convert self into static str.
    pub fn into_static(self) -> &'static str {
        self.into()
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.into_static())
    }
}

impl From<ErrorKind> for &'static str {
    fn from(v: ErrorKind) -> &'static str {
        match v {
            ErrorKind::Unexpected => "Unexpected",
            ErrorKind::ConfigInvalid => "ConfigInvalid",
            ErrorKind::Precondition => "Precondition",
            ErrorKind::Transport => "Transport",
            ErrorKind::Protocol => "Protocol",
            ErrorKind::Structural => "Structural",
            ErrorKind::UnexpectedRedirect => "UnexpectedRedirect",
            ErrorKind::Auth => "Auth",
        }
    }
}

/// Error is the error struct returned by all client operations.
///
/// The human readable message composes the HTTP status text, the remote
/// exception text and the transport error text, whichever are available, in
/// that priority order: `"Forbidden (Permission denied)"`.
pub struct Error {
    kind: ErrorKind,
    message: String,

    status_code: Option<StatusCode>,
    remote_exception: Option<String>,
    operation: &'static str,
    context: Vec<(&'static str, String)>,
    source: Option<anyhow::Error>,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(status) = self.status_code {
            write!(f, " (http {})", status.as_u16())?;
        }
        if !self.operation.is_empty() {
            write!(f, " at {}", self.operation)?;
        }

        if !self.context.is_empty() {
            write!(f, ", context: {{ ")?;
            write!(
                f,
                "{}",
                self.context
                    .iter()
                    .map(|(k, v)| format!("{k}: {v}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            )?;
            write!(f, " }}")?;
        }

        let primary = self.primary_message();
        if !primary.is_empty() {
            write!(f, " => {primary}")?;
        }

        if let Some(source) = &self.source {
            write!(f, ", source: {source}")?;
        }

        Ok(())
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        // If alternate has been specified, print the struct layout.
        if f.alternate() {
            let mut de = f.debug_struct("Error");
            de.field("kind", &self.kind);
            de.field("message", &self.message);
            de.field("status_code", &self.status_code);
            de.field("remote_exception", &self.remote_exception);
            de.field("operation", &self.operation);
            de.field("context", &self.context);
            de.field("source", &self.source);
            return de.finish();
        }

        write!(f, "{} => {}", self.kind, self.message())?;
        writeln!(f)?;

        if !self.context.is_empty() {
            writeln!(f)?;
            writeln!(f, "Context:")?;
            for (k, v) in self.context.iter() {
                writeln!(f, "   {k}: {v}")?;
            }
        }
        if let Some(source) = &self.source {
            writeln!(f)?;
            writeln!(f, "Source:")?;
            writeln!(f, "   {source:#}")?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|v| v.as_ref())
    }
}

impl Error {
    /// Create a new Error with error kind and message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),

            status_code: None,
            remote_exception: None,
            operation: "",
            context: Vec::default(),
            source: None,
        }
    }

    /// Update error's operation.
    pub fn with_operation(mut self, operation: &'static str) -> Self {
        if !self.operation.is_empty() {
            self.context.push(("called", self.operation.to_string()));
        }

        self.operation = operation;
        self
    }

    /// Add more context in error.
    pub fn with_context(mut self, key: &'static str, value: impl ToString) -> Self {
        self.context.push((key, value.to_string()));
        self
    }

    /// Set source for error.
    pub fn set_source(mut self, src: impl Into<anyhow::Error>) -> Self {
        debug_assert!(self.source.is_none(), "the source error has been set");

        self.source = Some(src.into());
        self
    }

    pub(crate) fn with_status_code(mut self, status: StatusCode) -> Self {
        self.status_code = Some(status);
        self
    }

    pub(crate) fn with_remote_exception(mut self, message: impl Into<String>) -> Self {
        self.remote_exception = Some(message.into());
        self
    }

    /// Return error's kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The HTTP status code of the failed response, if one was received.
    pub fn status_code(&self) -> Option<StatusCode> {
        self.status_code
    }

    /// The `RemoteException.message` extracted from the response body, if any.
    pub fn remote_exception(&self) -> Option<&str> {
        self.remote_exception.as_deref()
    }

    /// The composed human readable message.
    ///
    /// `"{status} ({remote exception})"` when both are present, otherwise
    /// whichever of status text, remote exception text and transport error
    /// text is available, defaulting to `"Unknown Error"`.
    pub fn message(&self) -> String {
        let primary = self.primary_message();
        if !primary.is_empty() {
            return primary;
        }
        if let Some(source) = &self.source {
            return source.to_string();
        }
        "Unknown Error".to_string()
    }

    fn primary_message(&self) -> String {
        if !self.message.is_empty() {
            return match &self.remote_exception {
                Some(remote) => format!("{} ({})", self.message, remote),
                None => self.message.clone(),
            };
        }
        self.remote_exception.clone().unwrap_or_default()
    }
}

/// The outcome of looking at a buffered response's status line and headers.
pub(crate) enum ResponseClass {
    /// 200 or 201, body not inspected yet.
    Success(Response<Bytes>),
    /// 301 or 307 with a usable `Location` header.
    Redirect(String),
    /// Everything else.
    Failure(Error),
}

/// Categorize a response per the WebHDFS protocol.
///
/// Redirect statuses without a `Location` and statuses outside the known set
/// both collapse into the generic "Unexpected Redirect" failure.
pub(crate) fn classify(resp: Response<Bytes>) -> ResponseClass {
    let status = resp.status();

    if matches!(
        status,
        StatusCode::MOVED_PERMANENTLY | StatusCode::TEMPORARY_REDIRECT
    ) {
        return match parse_location(resp.headers()) {
            Some(location) => ResponseClass::Redirect(location),
            None => ResponseClass::Failure(
                Error::new(ErrorKind::UnexpectedRedirect, "Unexpected Redirect")
                    .with_status_code(status),
            ),
        };
    }

    if matches!(status, StatusCode::OK | StatusCode::CREATED) {
        return ResponseClass::Success(resp);
    }

    ResponseClass::Failure(parse_error(resp))
}

pub(crate) fn parse_error(resp: Response<Bytes>) -> Error {
    let (parts, body) = resp.into_parts();
    let s = String::from_utf8_lossy(&body);
    parse_error_msg(parts, &s)
}

pub(crate) fn parse_error_msg(parts: Parts, body: &str) -> Error {
    let status = parts.status;

    let (kind, message) = if known_error_status(status) {
        let message = status_message(status)
            .or(status.canonical_reason())
            .unwrap_or_default()
            .to_string();
        (ErrorKind::Protocol, message)
    } else {
        (
            ErrorKind::UnexpectedRedirect,
            "Unexpected Redirect".to_string(),
        )
    };

    let mut err = Error::new(kind, message).with_status_code(status);

    if let Some(remote) = parse_remote_exception(body) {
        err = err.with_remote_exception(remote);
    }

    err
}

/// Extract `RemoteException.message` from a JSON body, tolerating parse
/// failure by treating the remote exception as absent.
pub(crate) fn parse_remote_exception(body: &str) -> Option<String> {
    serde_json::from_str::<RemoteExceptionWrapper>(body)
        .ok()
        .map(|w| w.remote_exception.message)
}

pub(crate) fn parse_location(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn known_error_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 400 | 401 | 402 | 403 | 404 | 500)
}

fn status_message(status: StatusCode) -> Option<&'static str> {
    match status.as_u16() {
        400 => Some("Bad Request"),
        401 => Some("Unauthorized"),
        403 => Some("Forbidden"),
        404 => Some("Not Found"),
        500 => Some("Internal Server Error"),
        _ => None,
    }
}

/// Create a new error happened during building request.
pub(crate) fn new_request_build_error(err: http::Error) -> Error {
    Error::new(ErrorKind::Unexpected, "building http request")
        .with_operation("http::Request::build")
        .set_source(err)
}

/// A success body missing its expected top-level key.
pub(crate) fn new_invalid_data_error(err: serde_json::Error) -> Error {
    Error::new(ErrorKind::Structural, "Invalid Data Structure").set_source(err)
}

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

use percent_encoding::utf8_percent_encode;
use percent_encoding::AsciiSet;
use percent_encoding::NON_ALPHANUMERIC;

use crate::error::Error;
use crate::error::ErrorKind;
use crate::error::Result;

/// PATH_ENCODE_SET is the encode set for http url path.
///
/// This set follows [encodeURIComponent](https://developer.mozilla.org/en-US/docs/Web/JavaScript/Reference/Global_Objects/encodeURIComponent)
/// which will encode all non-ASCII characters except `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
///
/// `/` is kept as-is since it separates path segments, and `%` is kept so
/// that encoding an already-encoded path does not double-escape it.
static PATH_ENCODE_SET: AsciiSet = NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'%')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// percent_encode_path will do percent encoding for http encode path.
pub(crate) fn percent_encode_path(path: &str) -> String {
    utf8_percent_encode(path, &PATH_ENCODE_SET).to_string()
}

/// Make sure root is normalized to style like `/abc/def/`.
///
/// # Normalize Rules
///
/// - All whitespace will be trimmed: ` abc/def ` => `abc/def`
/// - All leading / will be trimmed: `///abc` => `abc`
/// - Internal // will be replaced by /: `abc///def` => `abc/def`
/// - Empty path will be `/`: `` => `/`
/// - Add leading `/` if not starts with: `abc/` => `/abc/`
/// - Add trailing `/` if not ends with: `/abc` => `/abc/`
pub(crate) fn normalize_root(v: &str) -> String {
    let mut v = v
        .trim()
        .split('/')
        .filter(|v| !v.is_empty())
        .collect::<Vec<&str>>()
        .join("/");
    if !v.starts_with('/') {
        v.insert(0, '/');
    }
    if !v.ends_with('/') {
        v.push('/')
    }
    v
}

/// build_abs_path joins the configured root with a caller path, dropping the
/// leading `/` so the result can be appended after `/webhdfs/v1/`.
///
/// - Input root MUST be the format like `/abc/def/`
/// - Output will be the format like `path/to/root/path`.
pub(crate) fn build_abs_path(root: &str, path: &str) -> String {
    debug_assert!(root.starts_with('/'), "root must start with /");
    debug_assert!(root.ends_with('/'), "root must end with /");

    let path = path.trim_start_matches('/');
    let p = root[1..].to_string();

    if path.is_empty() {
        p
    } else {
        p + path
    }
}

/// build_rooted_abs_path keeps the leading `/`, for path-valued query
/// parameters like `destination`.
pub(crate) fn build_rooted_abs_path(root: &str, path: &str) -> String {
    debug_assert!(root.starts_with('/'), "root must start with /");
    debug_assert!(root.ends_with('/'), "root must end with /");

    let path = path.trim_start_matches('/');

    if path.is_empty() {
        root.to_string()
    } else {
        root.to_string() + path
    }
}

/// host_of extracts the host component of a url, used to derive the
/// `HTTP@<host>` service name for kerberos negotiation.
pub(crate) fn host_of(url: &str) -> Result<String> {
    let uri = http::Uri::try_from(url).map_err(|err| {
        Error::new(ErrorKind::Unexpected, "invalid url")
            .with_context("url", url)
            .set_source(err)
    })?;

    uri.host().map(str::to_string).ok_or_else(|| {
        Error::new(ErrorKind::Unexpected, "url has no host").with_context("url", url)
    })
}

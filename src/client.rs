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
use std::sync::Arc;

use bytes::Bytes;
use futures::StreamExt;
use http::Method;
use serde::de::DeserializeOwned;

use crate::core::check_path;
use crate::core::WebhdfsCore;
use crate::error::new_invalid_data_error;
use crate::error::Error;
use crate::error::ErrorKind;
use crate::error::Result;
use crate::message::AclStatus;
use crate::message::AclStatusWrapper;
use crate::message::BooleanResp;
use crate::message::FileStatus;
use crate::message::FileStatusWrapper;
use crate::message::FileStatusesWrapper;
use crate::message::Mount;
use crate::message::MountsWrapper;
use crate::reader::open_stream;
use crate::reader::Reader;
use crate::uri::build_rooted_abs_path;
use crate::uri::percent_encode_path;
use crate::writer::upload;
use crate::writer::Upload;
use crate::writer::UploadKind;
use crate::writer::UploadSource;
use crate::writer::WriteOptions;
use crate::writer::Writer;

/// Client for a WebHDFS-compatible gateway.
///
/// A client is constructed once per logical connection via
/// [`WebhdfsBuilder`][crate::WebhdfsBuilder] and can be shared freely;
/// concurrent operations share nothing but the session cookie.
#[derive(Clone)]
pub struct WebhdfsClient {
    core: Arc<WebhdfsCore>,
}

impl Debug for WebhdfsClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhdfsClient")
            .field("core", &self.core)
            .finish()
    }
}

impl WebhdfsClient {
    pub(crate) fn new(core: WebhdfsCore) -> Self {
        Self {
            core: Arc::new(core),
        }
    }

    /// The normalized root all operation paths are resolved under.
    pub fn root(&self) -> &str {
        &self.core.root
    }

    /// The gateway endpoint, `protocol://host:port`.
    pub fn endpoint(&self) -> &str {
        &self.core.endpoint
    }

    /// List the entries of a directory.
    pub async fn list_status(&self, path: &str) -> Result<Vec<FileStatus>> {
        check_path(path)?;

        let url = self.core.url("LISTSTATUS", path, &[]);
        let resp = self.core.execute(Method::GET, "list_status", &url).await?;

        let statuses: FileStatusesWrapper = parse_body(resp.body())?;
        Ok(statuses.file_statuses.file_status)
    }

    /// Stat a single path.
    pub async fn get_file_status(&self, path: &str) -> Result<FileStatus> {
        check_path(path)?;

        let url = self.core.url("GETFILESTATUS", path, &[]);
        let resp = self
            .core
            .execute(Method::GET, "get_file_status", &url)
            .await?;

        let status: FileStatusWrapper = parse_body(resp.body())?;
        Ok(status.file_status)
    }

    /// Create a directory and any missing parents.
    ///
    /// `permission` is an octal string like `"0755"`; the gateway default
    /// applies when absent.
    pub async fn mkdirs(&self, path: &str, permission: Option<&str>) -> Result<()> {
        check_path(path)?;

        let mut params = Vec::new();
        if let Some(permission) = permission {
            params.push(("permission", permission.to_string()));
        }

        let url = self.core.url("MKDIRS", path, &params);
        let resp = self.core.execute(Method::PUT, "mkdirs", &url).await?;

        let resp: BooleanResp = parse_body(resp.body())?;
        if resp.boolean {
            Ok(())
        } else {
            Err(Error::new(ErrorKind::Unexpected, "mkdirs returned false")
                .with_operation("mkdirs")
                .with_context("path", path))
        }
    }

    /// Rename `from` to `to`. Both paths are resolved under the root.
    pub async fn rename(&self, from: &str, to: &str) -> Result<()> {
        check_path(from)?;
        check_path(to)?;

        let destination = build_rooted_abs_path(&self.core.root, to);
        let params = [("destination", percent_encode_path(&destination))];

        let url = self.core.url("RENAME", from, &params);
        let resp = self.core.execute(Method::PUT, "rename", &url).await?;

        let resp: BooleanResp = parse_body(resp.body())?;
        if resp.boolean {
            Ok(())
        } else {
            Err(Error::new(ErrorKind::Unexpected, "rename returned false")
                .with_operation("rename")
                .with_context("from", from)
                .with_context("to", to))
        }
    }

    /// Delete a path. Returns whether the gateway reports anything was
    /// removed.
    pub async fn delete(&self, path: &str, recursive: bool) -> Result<bool> {
        check_path(path)?;

        let params = [("recursive", recursive.to_string())];
        let url = self.core.url("DELETE", path, &params);
        let resp = self.core.execute(Method::DELETE, "delete", &url).await?;

        let resp: BooleanResp = parse_body(resp.body())?;
        Ok(resp.boolean)
    }

    /// Set the octal permission of a path, e.g. `"644"`.
    pub async fn set_permission(&self, path: &str, permission: &str) -> Result<()> {
        check_path(path)?;
        if permission.is_empty() {
            return Err(Error::new(ErrorKind::Precondition, "permission is required"));
        }

        let params = [("permission", permission.to_string())];
        let url = self.core.url("SETPERMISSION", path, &params);
        self.core
            .execute(Method::PUT, "set_permission", &url)
            .await?;
        Ok(())
    }

    /// Set the owner and/or group of a path.
    pub async fn set_owner(
        &self,
        path: &str,
        owner: Option<&str>,
        group: Option<&str>,
    ) -> Result<()> {
        check_path(path)?;
        if owner.is_none() && group.is_none() {
            return Err(Error::new(
                ErrorKind::Precondition,
                "owner or group is required",
            ));
        }

        let mut params = Vec::new();
        if let Some(owner) = owner {
            params.push(("owner", owner.to_string()));
        }
        if let Some(group) = group {
            params.push(("group", group.to_string()));
        }

        let url = self.core.url("SETOWNER", path, &params);
        self.core.execute(Method::PUT, "set_owner", &url).await?;
        Ok(())
    }

    /// Replace the full ACL of a path with the given spec, e.g.
    /// `"user::rwx,user:alice:rw-,group::r-x,other::---"`.
    pub async fn set_acl(&self, path: &str, aclspec: &str) -> Result<()> {
        check_path(path)?;
        if aclspec.is_empty() {
            return Err(Error::new(ErrorKind::Precondition, "aclspec is required"));
        }

        let params = [("aclspec", percent_encode_path(aclspec))];
        let url = self.core.url("SETACL", path, &params);
        self.core.execute(Method::PUT, "set_acl", &url).await?;
        Ok(())
    }

    /// Fetch the ACL status of a path.
    pub async fn get_acl_status(&self, path: &str) -> Result<AclStatus> {
        check_path(path)?;

        let url = self.core.url("GETACLSTATUS", path, &[]);
        let resp = self
            .core
            .execute(Method::GET, "get_acl_status", &url)
            .await?;

        let acl: AclStatusWrapper = parse_body(resp.body())?;
        Ok(acl.acl_status)
    }

    /// Remove the default ACL of a directory.
    pub async fn remove_default_acl(&self, path: &str) -> Result<()> {
        check_path(path)?;

        let url = self.core.url("REMOVEDEFAULTACL", path, &[]);
        self.core
            .execute(Method::PUT, "remove_default_acl", &url)
            .await?;
        Ok(())
    }

    /// Create a symlink at `link` pointing at `destination`.
    pub async fn create_symlink(
        &self,
        link: &str,
        destination: &str,
        create_parent: bool,
    ) -> Result<()> {
        check_path(link)?;
        check_path(destination)?;

        let destination = build_rooted_abs_path(&self.core.root, destination);
        let params = [
            ("destination", percent_encode_path(&destination)),
            ("createParent", create_parent.to_string()),
        ];

        let url = self.core.url("CREATESYMLINK", link, &params);
        self.core
            .execute(Method::PUT, "create_symlink", &url)
            .await?;
        Ok(())
    }

    /// List the remote stores mounted into this filesystem.
    pub async fn list_mounts(&self) -> Result<Vec<Mount>> {
        let url = self.core.url("LISTMOUNTS", "/", &[]);
        let resp = self.core.execute(Method::GET, "list_mounts", &url).await?;

        let mounts: MountsWrapper = parse_body(resp.body())?;
        Ok(mounts.mounts)
    }

    /// Open a path for reading, streaming the whole content.
    pub async fn open(&self, path: &str) -> Result<Reader> {
        open_stream(self.core.clone(), path, None, None).await
    }

    /// Open a path for reading from `offset`, optionally bounded to `length`
    /// bytes.
    pub async fn open_at(&self, path: &str, offset: u64, length: Option<u64>) -> Result<Reader> {
        open_stream(self.core.clone(), path, Some(offset), length).await
    }

    /// Read the whole content of a path.
    pub async fn read(&self, path: &str) -> Result<Bytes> {
        self.open(path).await?.read_all().await
    }

    /// Start a streaming write creating (or overwriting) `path`.
    ///
    /// Bytes pushed into the returned [`Writer`] are held back until the
    /// namenode's redirect to a datanode is resolved; [`Writer::close`]
    /// yields the single terminal result.
    pub fn writer(&self, path: &str, options: WriteOptions) -> Result<Writer> {
        check_path(path)?;
        Ok(Writer::spawn(
            self.core.clone(),
            UploadKind::Create,
            path.to_string(),
            options,
        ))
    }

    /// Start a streaming append to an existing `path`.
    pub fn appender(&self, path: &str) -> Result<Writer> {
        check_path(path)?;
        Ok(Writer::spawn(
            self.core.clone(),
            UploadKind::Append,
            path.to_string(),
            WriteOptions::default(),
        ))
    }

    /// Write a whole buffer to `path` with default options.
    pub async fn write(&self, path: &str, bs: impl Into<Bytes>) -> Result<Upload> {
        self.write_with(path, WriteOptions::default(), bs).await
    }

    /// Write a whole buffer to `path`.
    pub async fn write_with(
        &self,
        path: &str,
        options: WriteOptions,
        bs: impl Into<Bytes>,
    ) -> Result<Upload> {
        check_path(path)?;
        upload(
            self.core.clone(),
            UploadKind::Create,
            path.to_string(),
            options,
            UploadSource::Buffered(bs.into()),
        )
        .await
    }

    /// Write a byte stream to `path`.
    pub async fn write_stream<S>(
        &self,
        path: &str,
        options: WriteOptions,
        stream: S,
    ) -> Result<Upload>
    where
        S: futures::Stream<Item = Result<Bytes>> + Send + 'static,
    {
        check_path(path)?;
        upload(
            self.core.clone(),
            UploadKind::Create,
            path.to_string(),
            options,
            UploadSource::Stream(stream.boxed()),
        )
        .await
    }

    /// Append a whole buffer to an existing `path`.
    pub async fn append(&self, path: &str, bs: impl Into<Bytes>) -> Result<Upload> {
        check_path(path)?;
        upload(
            self.core.clone(),
            UploadKind::Append,
            path.to_string(),
            WriteOptions::default(),
            UploadSource::Buffered(bs.into()),
        )
        .await
    }
}

fn parse_body<T: DeserializeOwned>(bs: &Bytes) -> Result<T> {
    serde_json::from_slice(bs).map_err(new_invalid_data_error)
}

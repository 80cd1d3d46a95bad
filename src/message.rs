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

//! WebHDFS response messages

use chrono::DateTime;
use chrono::TimeZone;
use chrono::Utc;
use serde::de;
use serde::Deserialize;
use serde::Deserializer;

#[derive(Debug, Deserialize)]
pub(crate) struct BooleanResp {
    pub boolean: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct FileStatusWrapper {
    pub file_status: FileStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct FileStatusesWrapper {
    pub file_statuses: FileStatuses,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct FileStatuses {
    pub file_status: Vec<FileStatus>,
}

/// A single entry as reported by `LISTSTATUS`/`GETFILESTATUS`.
///
/// Numeric fields tolerate string-encoded numbers since some gateways quote
/// them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileStatus {
    /// Content length in bytes. Zero for directories.
    #[serde(deserialize_with = "flexible_u64")]
    pub length: u64,
    /// Modification time in milliseconds since the epoch.
    #[serde(deserialize_with = "flexible_i64")]
    pub modification_time: i64,
    /// Access time in milliseconds since the epoch.
    #[serde(deserialize_with = "flexible_i64")]
    pub access_time: i64,
    /// Block size of the file.
    #[serde(deserialize_with = "flexible_u64")]
    pub block_size: u64,
    /// Replication factor of the file.
    #[serde(deserialize_with = "flexible_u64")]
    pub replication: u64,
    /// The last path component of this entry.
    pub path_suffix: String,
    /// Owning user.
    pub owner: String,
    /// Owning group.
    pub group: String,
    /// Octal permission string, e.g. `"755"`.
    pub permission: String,
    /// Whether this entry is a file, a directory or a symlink.
    #[serde(rename = "type")]
    pub ty: FileStatusType,
}

impl FileStatus {
    /// Modification time as a UTC datetime, when representable.
    pub fn modified(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.modification_time).single()
    }
}

/// The kind of a [`FileStatus`] entry.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum FileStatusType {
    /// A directory.
    Directory,
    /// A regular file.
    #[default]
    File,
    /// A symbolic link.
    Symlink,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct AclStatusWrapper {
    pub acl_status: AclStatus,
}

/// The ACL set of a path as reported by `GETACLSTATUS`.
///
/// Entries are kept as the wire strings (`"user:alice:rwx"`); parsing them
/// into structured entries is the caller's concern.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AclStatus {
    /// ACL entries beyond the classic owner/group/other triple.
    pub entries: Vec<String>,
    /// Owning user.
    pub owner: String,
    /// Owning group.
    pub group: String,
    /// Octal permission string.
    pub permission: String,
    /// Whether the sticky bit is set.
    pub sticky_bit: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct MountsWrapper {
    pub mounts: Vec<Mount>,
}

/// A mounted remote store as reported by `LISTMOUNTS`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mount {
    /// Path the mount is exposed at.
    pub mount_path: String,
    /// The backing remote source, when reported.
    #[serde(default)]
    pub source: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct RemoteExceptionWrapper {
    pub remote_exception: RemoteException,
}

/// RemoteException is the error payload embedded by WebHDFS services.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RemoteException {
    #[serde(default)]
    #[allow(dead_code)]
    pub exception: String,
    pub message: String,
    #[serde(default)]
    #[allow(dead_code)]
    pub java_class_name: String,
}

fn flexible_u64<'de, D>(de: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    struct FlexibleU64;

    impl de::Visitor<'_> for FlexibleU64 {
        type Value = u64;

        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            f.write_str("an unsigned integer or a string holding one")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<u64, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<u64, E> {
            u64::try_from(v).map_err(E::custom)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<u64, E> {
            v.parse().map_err(E::custom)
        }
    }

    de.deserialize_any(FlexibleU64)
}

fn flexible_i64<'de, D>(de: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    struct FlexibleI64;

    impl de::Visitor<'_> for FlexibleI64 {
        type Value = i64;

        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            f.write_str("an integer or a string holding one")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<i64, E> {
            i64::try_from(v).map_err(E::custom)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<i64, E> {
            Ok(v)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<i64, E> {
            v.parse().map_err(E::custom)
        }
    }

    de.deserialize_any(FlexibleI64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_status() {
        let json = r#"
{
  "FileStatus":
  {
    "accessTime"      : 0,
    "blockSize"       : 0,
    "group"           : "supergroup",
    "length"          : 0,
    "modificationTime": 1320173277227,
    "owner"           : "webuser",
    "pathSuffix"      : "",
    "permission"      : "777",
    "replication"     : 0,
    "type"            : "DIRECTORY"
  }
}
"#;
        let status: FileStatusWrapper = serde_json::from_str(json).expect("must success");
        assert_eq!(status.file_status.length, 0);
        assert_eq!(status.file_status.modification_time, 1320173277227);
        assert_eq!(status.file_status.owner, "webuser");
        assert_eq!(status.file_status.permission, "777");
        assert_eq!(status.file_status.ty, FileStatusType::Directory);
    }

    #[test]
    fn test_file_status_with_quoted_numbers() {
        let json = r#"
{
  "FileStatus":
  {
    "length"          : "10",
    "modificationTime": "1320173277227",
    "pathSuffix"      : "a.csv",
    "type"            : "FILE"
  }
}
"#;
        let status = serde_json::from_str::<FileStatusWrapper>(json)
            .expect("must success")
            .file_status;
        assert_eq!(status.length, 10);
        assert_eq!(status.modification_time, 1320173277227);
        assert_eq!(status.ty, FileStatusType::File);
    }

    #[test]
    fn test_list_empty() {
        let json = r#"
    {
        "FileStatuses": {"FileStatus":[]}
    }
        "#;
        let file_statuses = serde_json::from_str::<FileStatusesWrapper>(json)
            .expect("must success")
            .file_statuses
            .file_status;
        assert!(file_statuses.is_empty());
    }

    #[test]
    fn test_list_status() {
        let json = r#"
{
  "FileStatuses":
  {
    "FileStatus":
    [
      {
        "accessTime"      : 1320171722771,
        "blockSize"       : 33554432,
        "group"           : "supergroup",
        "length"          : 24930,
        "modificationTime": 1320171722771,
        "owner"           : "webuser",
        "pathSuffix"      : "a.patch",
        "permission"      : "644",
        "replication"     : 1,
        "type"            : "FILE"
      },
      {
        "accessTime"      : 0,
        "blockSize"       : 0,
        "group"           : "supergroup",
        "length"          : 0,
        "modificationTime": 1320895981256,
        "owner"           : "szetszwo",
        "pathSuffix"      : "bar",
        "permission"      : "711",
        "replication"     : 0,
        "type"            : "DIRECTORY"
      }
    ]
  }
}
            "#;

        let file_statuses = serde_json::from_str::<FileStatusesWrapper>(json)
            .expect("must success")
            .file_statuses
            .file_status;

        assert_eq!(file_statuses.len(), 2);
        assert_eq!(file_statuses[0].length, 24930);
        assert_eq!(file_statuses[0].path_suffix, "a.patch");
        assert_eq!(file_statuses[0].ty, FileStatusType::File);
        assert_eq!(file_statuses[1].length, 0);
        assert_eq!(file_statuses[1].path_suffix, "bar");
        assert_eq!(file_statuses[1].ty, FileStatusType::Directory);
    }

    #[test]
    fn test_acl_status() {
        let json = r#"
{
    "AclStatus": {
        "entries": [
            "user:carla:rw-",
            "group::r-x"
        ],
        "group": "supergroup",
        "owner": "hadoop",
        "permission": "775",
        "stickyBit": false
    }
}
"#;
        let acl = serde_json::from_str::<AclStatusWrapper>(json)
            .expect("must success")
            .acl_status;

        assert_eq!(acl.entries, vec!["user:carla:rw-", "group::r-x"]);
        assert_eq!(acl.owner, "hadoop");
        assert_eq!(acl.group, "supergroup");
        assert_eq!(acl.permission, "775");
        assert!(!acl.sticky_bit);
    }

    #[test]
    fn test_mounts() {
        let json = r#"
{
    "Mounts": [
        {"mountPath": "/mnt/sales", "source": "abfs://sales@acct.dfs.core.windows.net/"},
        {"mountPath": "/mnt/hr"}
    ]
}
"#;
        let mounts = serde_json::from_str::<MountsWrapper>(json)
            .expect("must success")
            .mounts;

        assert_eq!(mounts.len(), 2);
        assert_eq!(mounts[0].mount_path, "/mnt/sales");
        assert_eq!(mounts[0].source, "abfs://sales@acct.dfs.core.windows.net/");
        assert_eq!(mounts[1].mount_path, "/mnt/hr");
        assert!(mounts[1].source.is_empty());
    }

    #[test]
    fn test_boolean() {
        let resp: BooleanResp = serde_json::from_str(r#"{"boolean": true}"#).expect("must success");
        assert!(resp.boolean);
    }

    #[test]
    fn test_modified_datetime() {
        let status = FileStatus {
            modification_time: 1320173277227,
            ..Default::default()
        };
        let dt = status.modified().expect("must be representable");
        assert_eq!(dt.timestamp_millis(), 1320173277227);
    }
}

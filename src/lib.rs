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

//! A client for the WebHDFS REST protocol.
//!
//! Implements the metadata operations (list, stat, mkdirs, rename, delete,
//! permissions, ACLs, symlinks, mounts) and the redirect-based streaming
//! upload/download protocol spoken by HDFS namenodes and datanodes, with
//! cookie and kerberos (SPNEGO) authentication.
//!
//! # Quick Start
//!
//! ```no_run
//! use webhdfs_client::Result;
//! use webhdfs_client::WebhdfsBuilder;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = WebhdfsBuilder::default()
//!         .host("namenode.example.com")
//!         .port(9870)
//!         .root("/user/hadoop")
//!         .user_name("hadoop")
//!         .build()?;
//!
//!     // Write data
//!     client.write("hello.txt", "Hello, World!").await?;
//!
//!     // Read data
//!     let bs = client.read("hello.txt").await?;
//!     assert_eq!(&bs[..], b"Hello, World!");
//!
//!     // List a directory
//!     for entry in client.list_status("/").await? {
//!         println!("{} ({:?})", entry.path_suffix, entry.ty);
//!     }
//!
//!     // Delete
//!     client.delete("hello.txt", false).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Authentication
//!
//! Three modes, matching what WebHDFS gateways deploy:
//!
//! - simple: set [`WebhdfsBuilder::user_name`], sent as `user.name`.
//! - basic auth: set [`WebhdfsBuilder::basic_auth`].
//! - kerberos: supply a [`Negotiate`] implementation through
//!   [`WebhdfsBuilder::negotiate`]. A 401 triggers one SPNEGO handshake and
//!   one retry; the session cookie the gateway hands back is reused until it
//!   expires.

// Make sure all our public APIs have docs.
#![warn(missing_docs)]
// Deny unused qualifications.
#![deny(unused_qualifications)]

mod auth;
mod client;
mod config;
mod core;
mod error;
mod http;
mod message;
mod reader;
mod uri;
mod writer;

pub use auth::Negotiate;
pub use auth::NegotiateStep;
pub use client::WebhdfsClient;
pub use config::WebhdfsBuilder;
pub use config::WebhdfsConfig;
pub use error::Error;
pub use error::ErrorKind;
pub use error::Result;
pub use message::AclStatus;
pub use message::FileStatus;
pub use message::FileStatusType;
pub use message::Mount;
pub use reader::Reader;
pub use writer::Upload;
pub use writer::WriteOptions;
pub use writer::Writer;

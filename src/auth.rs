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

//! Cookie and kerberos authentication state.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use http::header;
use http::HeaderMap;
use log::debug;

use crate::error::Error;
use crate::error::ErrorKind;
use crate::error::Result;

/// The outcome of a single kerberos negotiation step.
pub struct NegotiateStep {
    /// The opaque token produced by this step. May be empty on a final
    /// acknowledging step.
    pub token: Vec<u8>,
    /// Whether the security context is established.
    pub complete: bool,
}

/// The platform kerberos (SPNEGO) negotiation primitive.
///
/// The client initializes a context for service `HTTP@<host>` and drives at
/// most two steps, feeding each step's token back into the next. This is an
/// external collaborator: implementations typically wrap a GSSAPI/SSPI
/// binding.
#[async_trait]
pub trait Negotiate: Send + Sync + 'static {
    /// Perform one negotiation step for `service`, with the previous step's
    /// token as `input` (none on the first step).
    async fn step(&self, service: &str, input: Option<&[u8]>) -> Result<NegotiateStep>;
}

/// A session cookie handed out after a successful kerberos handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SessionCookie {
    pub key: String,
    pub value: String,
    /// Invalid once `expiry <= now`. `None` means no expiry was advertised.
    pub expiry: Option<DateTime<Utc>>,
}

impl SessionCookie {
    /// Parse the first cookie of a `Set-Cookie` header value.
    ///
    /// `Max-Age` takes precedence over `Expires`; unparseable attributes are
    /// ignored, an unusable name/value pair fails the whole parse.
    pub fn parse(header: &str) -> Option<Self> {
        let mut parts = header.split(';');

        let (key, value) = parts.next()?.trim().split_once('=')?;
        let key = key.trim();
        if key.is_empty() {
            return None;
        }

        let mut expires = None;
        let mut max_age = None;
        for attr in parts {
            let Some((name, val)) = attr.trim().split_once('=') else {
                continue;
            };
            match name.trim().to_ascii_lowercase().as_str() {
                "expires" => {
                    if let Ok(t) = DateTime::parse_from_rfc2822(val.trim()) {
                        expires = Some(t.with_timezone(&Utc));
                    }
                }
                "max-age" => {
                    if let Ok(secs) = val.trim().parse::<i64>() {
                        max_age = Some(Utc::now() + Duration::seconds(secs));
                    }
                }
                _ => {}
            }
        }

        Some(SessionCookie {
            key: key.to_string(),
            value: value.trim().to_string(),
            expiry: max_age.or(expires),
        })
    }

    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.expiry.map_or(true, |expiry| expiry > now)
    }
}

/// Holds the session cookie and drives kerberos negotiation.
///
/// The cookie is the only state shared across concurrent operations on one
/// client, hence the lock around every read and write.
pub(crate) struct Authenticator {
    cookie: Mutex<Option<SessionCookie>>,
    negotiate: Option<Arc<dyn Negotiate>>,
}

impl Authenticator {
    pub fn new(negotiate: Option<Arc<dyn Negotiate>>) -> Self {
        Self {
            cookie: Mutex::new(None),
            negotiate,
        }
    }

    /// Whether the client is configured for kerberos authentication.
    pub fn kerberos_enabled(&self) -> bool {
        self.negotiate.is_some()
    }

    /// The `Cookie` header value to attach, if a non-expired session cookie
    /// is cached.
    pub fn cookie_header(&self) -> Option<String> {
        let guard = self.lock_cookie();
        guard
            .as_ref()
            .filter(|c| c.is_valid(Utc::now()))
            .map(|c| format!("{}={}", c.key, c.value))
    }

    /// Cache the session cookie from a `Set-Cookie` header, first cookie
    /// wins. Parse failures are swallowed.
    pub fn store_from_headers(&self, headers: &HeaderMap) {
        let Some(value) = headers.get_all(header::SET_COOKIE).iter().next() else {
            return;
        };
        let Ok(value) = value.to_str() else {
            return;
        };
        if let Some(cookie) = SessionCookie::parse(value) {
            debug!("caching session cookie {}", cookie.key);
            *self.lock_cookie() = Some(cookie);
        }
    }

    /// Run the kerberos handshake for `host` and return the base64 token to
    /// send as `Authorization: Negotiate <token>`.
    pub async fn negotiate(&self, host: &str) -> Result<String> {
        let negotiate = self.negotiate.as_ref().ok_or_else(|| {
            Error::new(ErrorKind::Auth, "kerberos negotiation is not configured")
        })?;

        let service = format!("HTTP@{host}");
        debug!("negotiating kerberos token for {service}");

        let mut input: Option<Vec<u8>> = None;
        let mut token: Option<Vec<u8>> = None;
        for _ in 0..2 {
            let step = negotiate.step(&service, input.as_deref()).await?;
            if !step.token.is_empty() {
                token = Some(step.token.clone());
            }
            if step.complete {
                let token = token.ok_or_else(|| {
                    Error::new(ErrorKind::Auth, "kerberos negotiation completed without a token")
                        .with_context("service", &service)
                })?;
                return Ok(BASE64.encode(token));
            }
            input = Some(step.token);
        }

        Err(Error::new(ErrorKind::Auth, "kerberos negotiation did not complete")
            .with_context("service", service))
    }

    fn lock_cookie(&self) -> MutexGuard<'_, Option<SessionCookie>> {
        match self.cookie.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use http::HeaderValue;

    use super::*;

    #[test]
    fn test_parse_cookie_with_expires() {
        let cookie =
            SessionCookie::parse("hadoop.auth=u=hdfs&t=kerberos; Expires=Wed, 21 Oct 2048 07:28:00 GMT; Path=/")
                .expect("must parse");

        assert_eq!(cookie.key, "hadoop.auth");
        assert_eq!(cookie.value, "u=hdfs&t=kerberos");
        assert!(cookie.is_valid(Utc::now()));
    }

    #[test]
    fn test_parse_cookie_max_age_wins() {
        let cookie = SessionCookie::parse(
            "sid=abc; Expires=Wed, 21 Oct 2048 07:28:00 GMT; Max-Age=0",
        )
        .expect("must parse");

        // max-age of zero expires immediately, regardless of Expires
        assert!(!cookie.is_valid(Utc::now()));
    }

    #[test]
    fn test_parse_cookie_without_expiry() {
        let cookie = SessionCookie::parse("sid=abc; HttpOnly").expect("must parse");
        assert_eq!(cookie.expiry, None);
        assert!(cookie.is_valid(Utc::now()));
    }

    #[test]
    fn test_parse_cookie_garbage() {
        assert!(SessionCookie::parse("no cookie here").is_none());
        assert!(SessionCookie::parse("=value-without-key").is_none());
    }

    #[test]
    fn test_expired_cookie_not_attached() {
        let auth = Authenticator::new(None);
        *auth.lock_cookie() = Some(SessionCookie {
            key: "sid".to_string(),
            value: "abc".to_string(),
            expiry: Some(Utc::now() - Duration::milliseconds(1)),
        });

        assert_eq!(auth.cookie_header(), None);
    }

    #[test]
    fn test_valid_cookie_attached() {
        let auth = Authenticator::new(None);
        *auth.lock_cookie() = Some(SessionCookie {
            key: "sid".to_string(),
            value: "abc".to_string(),
            expiry: Some(Utc::now() + Duration::milliseconds(10_000)),
        });

        assert_eq!(auth.cookie_header().as_deref(), Some("sid=abc"));
    }

    #[test]
    fn test_first_cookie_wins() {
        let auth = Authenticator::new(None);
        let mut headers = HeaderMap::new();
        headers.append(header::SET_COOKIE, HeaderValue::from_static("first=1"));
        headers.append(header::SET_COOKIE, HeaderValue::from_static("second=2"));

        auth.store_from_headers(&headers);

        assert_eq!(auth.cookie_header().as_deref(), Some("first=1"));
    }

    struct OneStep {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Negotiate for OneStep {
        async fn step(&self, service: &str, input: Option<&[u8]>) -> Result<NegotiateStep> {
            assert_eq!(service, "HTTP@namenode.example.com");
            assert!(input.is_none());
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(NegotiateStep {
                token: b"tok".to_vec(),
                complete: true,
            })
        }
    }

    #[tokio::test]
    async fn test_negotiate_single_step() {
        let negotiate = Arc::new(OneStep {
            calls: AtomicUsize::new(0),
        });
        let auth = Authenticator::new(Some(negotiate.clone()));

        let token = auth.negotiate("namenode.example.com").await.expect("must negotiate");

        assert_eq!(token, BASE64.encode(b"tok"));
        assert_eq!(negotiate.calls.load(Ordering::SeqCst), 1);
    }

    struct TwoStep;

    #[async_trait]
    impl Negotiate for TwoStep {
        async fn step(&self, _: &str, input: Option<&[u8]>) -> Result<NegotiateStep> {
            match input {
                None => Ok(NegotiateStep {
                    token: b"first".to_vec(),
                    complete: false,
                }),
                Some(b"first") => Ok(NegotiateStep {
                    token: b"second".to_vec(),
                    complete: true,
                }),
                Some(other) => panic!("unexpected input {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_negotiate_two_steps() {
        let auth = Authenticator::new(Some(Arc::new(TwoStep)));

        let token = auth.negotiate("nn").await.expect("must negotiate");

        assert_eq!(token, BASE64.encode(b"second"));
    }

    struct NeverComplete;

    #[async_trait]
    impl Negotiate for NeverComplete {
        async fn step(&self, _: &str, _: Option<&[u8]>) -> Result<NegotiateStep> {
            Ok(NegotiateStep {
                token: b"partial".to_vec(),
                complete: false,
            })
        }
    }

    #[tokio::test]
    async fn test_negotiate_never_completes() {
        let auth = Authenticator::new(Some(Arc::new(NeverComplete)));

        let err = auth.negotiate("nn").await.expect_err("must fail");

        assert_eq!(err.kind(), ErrorKind::Auth);
    }
}

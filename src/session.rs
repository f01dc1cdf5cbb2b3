// Session: holds the credentials and the cached auth cookie. The token is
// fetched lazily on first use and dropped again by `invalidate`.

use std::fmt;
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::transport::{Request, Transport};

/// Name of the forms-auth cookie set by the logon endpoint.
pub const AUTH_COOKIE: &str = ".ASPXAUTH";

pub const LOGIN_PATH: &str = "Account/LogOn";

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Opaque value of the auth cookie.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(value: impl Into<String>) -> Self {
        SessionToken(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated,
}

pub struct Session<T> {
    transport: T,
    credentials: Credentials,
    token: Mutex<Option<SessionToken>>,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T, credentials: Credentials) -> Self {
        Session {
            transport,
            credentials,
            token: Mutex::new(None),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn state(&self) -> SessionState {
        match *self.slot() {
            Some(_) => SessionState::Authenticated,
            None => SessionState::Unauthenticated,
        }
    }

    /// Return the cached token, logging in first if there is none. The slot
    /// stays locked during the login so concurrent callers share one round
    /// trip.
    pub fn token(&self) -> Result<SessionToken> {
        let mut slot = self.slot();
        if let Some(token) = slot.as_ref() {
            return Ok(token.clone());
        }
        let token = self.login()?;
        *slot = Some(token.clone());
        Ok(token)
    }

    /// Post the credentials to the logon endpoint and read the auth cookie
    /// from the (redirect) response. Does not touch the cached token.
    pub fn login(&self) -> Result<SessionToken> {
        debug!(username = %self.credentials.username, "logging in");
        let request = Request::post(LOGIN_PATH).form(vec![
            ("UserName".to_string(), self.credentials.username.clone()),
            ("Password".to_string(), self.credentials.password.clone()),
            ("RememberMe".to_string(), "false".to_string()),
        ]);
        let res = self.transport.send(&request)?;

        if res.status >= 400 {
            return Err(Error::Status {
                path: LOGIN_PATH.to_string(),
                status: res.status,
                body: res.body,
            });
        }

        match res.cookie(AUTH_COOKIE) {
            Some(value) if !value.is_empty() => {
                info!(username = %self.credentials.username, "logged in");
                Ok(SessionToken::new(value))
            }
            _ => Err(Error::Authentication(format!(
                "no {AUTH_COOKIE} cookie in logon response for {} (status {})",
                self.credentials.username, res.status
            ))),
        }
    }

    /// Drop the cached token so the next `token()` logs in again.
    pub fn invalidate(&self) {
        if self.slot().take().is_some() {
            debug!("session token invalidated");
        }
    }

    /// Drop the cached token only if it is still `stale`. Returns whether
    /// the slot was cleared.
    pub fn invalidate_if(&self, stale: &SessionToken) -> bool {
        let mut slot = self.slot();
        if slot.as_ref() == Some(stale) {
            *slot = None;
            debug!("session token invalidated");
            true
        } else {
            false
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<SessionToken>> {
        // the slot only ever holds a complete value, so a poisoned lock is safe to reuse
        self.token.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<T> fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

// Scripted transport: replays queued responses in order and records every
// request it was handed.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use delorme_cli::session::AUTH_COOKIE;
use delorme_cli::{Credentials, Error, Method, Request, Response, Result, Transport};

#[derive(Debug, Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<Response>>>,
    requests: Mutex<Vec<Request>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, response: Response) -> Self {
        self.responses.lock().unwrap().push_back(Ok(response));
        self
    }

    pub fn fail(self, message: &str) -> Self {
        let err = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, message.to_string());
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(Error::Transport(Box::new(err))));
        self
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, method: Method, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    pub fn logins(&self) -> usize {
        self.count(Method::Post, "Account/LogOn")
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock().unwrap().len()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: &Request) -> Result<Response> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("no scripted response for {} {}", request.method, request.path))
    }
}

pub fn credentials() -> Credentials {
    Credentials::new("hiker", "s3cret")
}

/// The logon endpoint's success answer: a redirect that sets the cookie.
pub fn login_ok(token: &str) -> Response {
    Response::new(302, "")
        .with_location("/")
        .with_cookie(AUTH_COOKIE, token)
}

pub fn json(body: serde_json::Value) -> Response {
    Response::new(200, body.to_string())
}

pub fn expired() -> Response {
    Response::new(302, "").with_location("/Account/LogOn?ReturnUrl=%2fRoutes")
}

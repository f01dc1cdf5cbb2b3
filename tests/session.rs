mod common;

use common::{credentials, login_ok, ScriptedTransport};
use delorme_cli::session::AUTH_COOKIE;
use delorme_cli::{Body, Error, Method, Response, Session, SessionState};
use pretty_assertions::assert_eq;

#[test]
fn token_is_fetched_once() {
    let transport = ScriptedTransport::new().respond(login_ok("abc"));
    let session = Session::new(&transport, credentials());

    assert_eq!(session.state(), SessionState::Unauthenticated);
    let first = session.token().unwrap();
    let second = session.token().unwrap();

    assert_eq!(first.as_str(), "abc");
    assert_eq!(first, second);
    assert_eq!(transport.logins(), 1);
    assert_eq!(session.state(), SessionState::Authenticated);
}

#[test]
fn login_posts_credentials_without_remember_me() {
    let transport = ScriptedTransport::new().respond(login_ok("abc"));
    let session = Session::new(&transport, credentials());
    session.token().unwrap();

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, Method::Post);
    assert_eq!(requests[0].path, "Account/LogOn");
    assert!(requests[0].cookies.is_empty());
    assert_eq!(
        requests[0].body,
        Body::Form(vec![
            ("UserName".to_string(), "hiker".to_string()),
            ("Password".to_string(), "s3cret".to_string()),
            ("RememberMe".to_string(), "false".to_string()),
        ])
    );
}

#[test]
fn missing_cookie_is_an_authentication_error() {
    // wrong credentials re-render the logon form
    let transport = ScriptedTransport::new()
        .respond(Response::new(200, "<form>...</form>"))
        .respond(Response::new(302, "").with_location("/"));
    let session = Session::new(&transport, credentials());

    let err = session.token().unwrap_err();
    assert!(matches!(err, Error::Authentication(_)), "{err:?}");
    assert_eq!(session.state(), SessionState::Unauthenticated);

    let err = session.login().unwrap_err();
    assert!(err.is_authentication());
}

#[test]
fn empty_cookie_is_an_authentication_error() {
    let transport = ScriptedTransport::new()
        .respond(Response::new(302, "").with_cookie(AUTH_COOKIE, ""));
    let session = Session::new(&transport, credentials());
    assert!(session.token().unwrap_err().is_authentication());
}

#[test]
fn server_error_on_login_is_a_transport_error() {
    let transport = ScriptedTransport::new().respond(Response::new(503, "maintenance"));
    let session = Session::new(&transport, credentials());

    match session.token().unwrap_err() {
        Error::Status { status, body, .. } => {
            assert_eq!(status, 503);
            assert_eq!(body, "maintenance");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn connection_failure_propagates() {
    let transport = ScriptedTransport::new().fail("connection refused");
    let session = Session::new(&transport, credentials());

    let err = session.token().unwrap_err();
    assert!(err.is_transport());
    assert!(!err.is_authentication());
}

#[test]
fn failed_login_is_retried_on_next_access() {
    let transport = ScriptedTransport::new()
        .respond(Response::new(200, ""))
        .respond(login_ok("second"));
    let session = Session::new(&transport, credentials());

    assert!(session.token().is_err());
    assert_eq!(session.token().unwrap().as_str(), "second");
    assert_eq!(transport.logins(), 2);
}

#[test]
fn invalidate_forces_a_new_login() {
    let transport = ScriptedTransport::new()
        .respond(login_ok("one"))
        .respond(login_ok("two"));
    let session = Session::new(&transport, credentials());

    assert_eq!(session.token().unwrap().as_str(), "one");
    session.invalidate();
    assert_eq!(session.state(), SessionState::Unauthenticated);
    assert_eq!(session.token().unwrap().as_str(), "two");
    assert_eq!(session.token().unwrap().as_str(), "two");
    assert_eq!(transport.logins(), 2);
}

#[test]
fn debug_output_hides_secrets() {
    let transport = ScriptedTransport::new().respond(login_ok("tok-123"));
    let session = Session::new(&transport, credentials());
    let token = session.token().unwrap();

    let rendered = format!("{session:?} {token:?}");
    assert!(!rendered.contains("s3cret"));
    assert!(!rendered.contains("tok-123"));
    assert!(rendered.contains("hiker"));
}

#[test]
fn invalidate_if_only_clears_the_matching_token() {
    let transport = ScriptedTransport::new()
        .respond(login_ok("one"))
        .respond(login_ok("two"));
    let session = Session::new(&transport, credentials());

    let stale = session.token().unwrap();
    assert!(session.invalidate_if(&stale));
    let fresh = session.token().unwrap();

    assert!(!session.invalidate_if(&stale));
    assert_eq!(session.state(), SessionState::Authenticated);
    assert_eq!(session.token().unwrap(), fresh);
    assert_eq!(transport.logins(), 2);
}

// API client module: typed operations over routes, waypoints, bulk import
// and export. Every call goes through the session, which logs in on first
// use; a request bounced back to the logon page is retried once after a
// fresh login.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::export::ExportRequest;
use crate::models::{ImportResult, Route, Waypoint};
use crate::session::{Credentials, Session, SessionState, SessionToken, AUTH_COOKIE, LOGIN_PATH};
use crate::transport::{HttpTransport, Request, Response, Transport};

pub const DEFAULT_BASE_URL: &str = "https://explore.delorme.com";

/// Where the service lives. Read from `DELORME_URL`, falling back to the
/// public service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let base_url = std::env::var("DELORME_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.into());
        ClientConfig { base_url }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            base_url: DEFAULT_BASE_URL.into(),
        }
    }
}

#[derive(Debug)]
pub struct ApiClient<T = HttpTransport> {
    session: Session<T>,
}

impl ApiClient<HttpTransport> {
    pub fn new(config: &ClientConfig, credentials: Credentials) -> Result<Self> {
        let transport = HttpTransport::new(&config.base_url)?;
        Ok(Self::with_transport(transport, credentials))
    }
}

impl<T: Transport> ApiClient<T> {
    pub fn with_transport(transport: T, credentials: Credentials) -> Self {
        ApiClient {
            session: Session::new(transport, credentials),
        }
    }

    pub fn session(&self) -> &Session<T> {
        &self.session
    }

    /// Log in now instead of on the first call.
    pub fn ensure_authenticated(&self) -> Result<()> {
        if self.session.state() == SessionState::Unauthenticated {
            self.session.token()?;
        }
        Ok(())
    }

    /// All routes in the order the service returns them.
    pub fn list_routes(&self) -> Result<Vec<Route>> {
        let res = self.send_ok(Request::get("Routes"))?;
        parse_list(&res.body)
    }

    /// The last route of the listing.
    pub fn last_route(&self) -> Result<Route> {
        self.list_routes()?
            .pop()
            .ok_or_else(|| Error::NotFound("route".into()))
    }

    pub fn route(&self, route_id: i64) -> Result<Route> {
        self.list_routes()?
            .into_iter()
            .find(|r| r.route_id == route_id)
            .ok_or_else(|| Error::NotFound(format!("route {route_id}")))
    }

    pub fn save_route<D: Serialize>(&self, data: &D) -> Result<Route> {
        let payload = serde_json::to_value(data)?;
        let res = self.send_ok(Request::post("Routes/Save").json(payload))?;
        Ok(serde_json::from_str(&res.body)?)
    }

    pub fn delete_route(&self, route_id: i64) -> Result<()> {
        let res = self.send_ok(Request::post(format!("Routes/Delete/{route_id}")))?;
        silent_success(res)
    }

    pub fn list_waypoints(&self) -> Result<Vec<Waypoint>> {
        let res = self.send_ok(Request::get("Waypoints"))?;
        parse_list(&res.body)
    }

    pub fn waypoint(&self, waypoint_id: i64) -> Result<Waypoint> {
        self.list_waypoints()?
            .into_iter()
            .find(|w| w.waypoint_id == waypoint_id)
            .ok_or_else(|| Error::NotFound(format!("waypoint {waypoint_id}")))
    }

    pub fn save_waypoint<D: Serialize>(&self, data: &D) -> Result<Waypoint> {
        let payload = serde_json::to_value(data)?;
        let res = self.send_ok(Request::post("Waypoints/Save").json(payload))?;
        Ok(serde_json::from_str(&res.body)?)
    }

    /// The service routes this on the DELETE verb, not just the path.
    pub fn delete_waypoint(&self, waypoint_id: i64) -> Result<()> {
        let res = self.send_ok(Request::delete(format!("Waypoints/Delete/{waypoint_id}")))?;
        silent_success(res)
    }

    /// Upload a data file and return the routes it created.
    pub fn import_data(&self, file_content: Vec<u8>, file_name: &str) -> Result<Vec<ImportResult>> {
        let request = Request::post("User/Data/Import").multipart("file", file_name, file_content);
        let res = self.send_ok(request)?;

        let body: serde_json::Value = serde_json::from_str(&res.body)
            .map_err(|e| Error::Import(format!("response is not JSON: {e}")))?;
        let imports = body
            .pointer("/ImportResults/RouteImports")
            .cloned()
            .ok_or_else(|| Error::Import("response has no ImportResults.RouteImports".into()))?;
        let results: Vec<ImportResult> = serde_json::from_value(imports)
            .map_err(|e| Error::Import(format!("malformed RouteImports: {e}")))?;

        debug!(file_name, routes = results.len(), "import complete");
        Ok(results)
    }

    /// Read `path` and import it. The file is only read for the duration of
    /// this call.
    pub fn import_file(&self, path: &Path) -> Result<Vec<ImportResult>> {
        let content = std::fs::read(path)
            .map_err(|e| Error::Import(format!("could not read {}: {e}", path.display())))?;
        let file_name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("import.gpx");
        self.import_data(content, file_name)
    }

    /// Fetch the device download for `request`, returning the raw body.
    pub fn export_data(&self, request: &ExportRequest) -> Result<String> {
        let res = self.send(Request::get("Map/GetDeviceListForDownload").query(request.query()))?;
        if !res.is_success() {
            return Err(Error::Export {
                status: res.status,
                body: res.body,
            });
        }
        Ok(res.body)
    }

    /// Send with the session cookie attached. If the service bounces the
    /// request to the logon page, log in again and retry exactly once.
    fn send(&self, request: Request) -> Result<Response> {
        let (token, res) = self.send_authenticated(request.clone())?;
        if !session_expired(&res) {
            return Ok(res);
        }

        warn!(path = %request.path, status = res.status, "session expired, logging in again");
        // only drop the token this request carried; another caller may
        // already have replaced it with a fresh one
        self.session.invalidate_if(&token);
        let (token, res) = self.send_authenticated(request.clone())?;
        if session_expired(&res) {
            self.session.invalidate_if(&token);
            return Err(Error::Authentication(format!(
                "session rejected by {} after logging in again",
                request.path
            )));
        }
        Ok(res)
    }

    fn send_ok(&self, request: Request) -> Result<Response> {
        let path = request.path.clone();
        let res = self.send(request)?;
        if !res.is_success() {
            return Err(Error::Status {
                path,
                status: res.status,
                body: res.body,
            });
        }
        Ok(res)
    }

    fn send_authenticated(&self, request: Request) -> Result<(SessionToken, Response)> {
        let token = self.session.token()?;
        let request = request.cookie(AUTH_COOKIE, token.as_str());
        let res = self.session.transport().send(&request)?;
        Ok((token, res))
    }
}

/// A 401, or a redirect to the logon page.
fn session_expired(res: &Response) -> bool {
    if res.status == 401 {
        return true;
    }
    res.is_redirect()
        && res
            .location
            .as_deref()
            .is_some_and(|loc| loc.to_ascii_lowercase().contains(&LOGIN_PATH.to_ascii_lowercase()))
}

fn parse_list<R: DeserializeOwned>(body: &str) -> Result<Vec<R>> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(body)?)
}

/// Operations that answer with an empty body on success and a message
/// otherwise.
fn silent_success(res: Response) -> Result<()> {
    let detail = res.body.trim();
    if detail.is_empty() {
        Ok(())
    } else {
        Err(Error::OperationFailed(detail.to_string()))
    }
}

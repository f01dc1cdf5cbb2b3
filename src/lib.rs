// Library root
// -----------
// Client for the DeLorme Explore synchronization service. The binary
// (`main.rs`) drives these modules from an interactive menu.
//
// Module responsibilities:
// - `transport`: request/response model and the blocking reqwest sender.
// - `session`: credentials, the auth cookie and lazy login.
// - `api`: typed route, waypoint, import and export operations.
// - `models`: records returned by the service.
// - `export`: export filter and query construction.
// - `ui`: terminal menu that consumes `api`.
pub mod api;
pub mod error;
pub mod export;
pub mod models;
pub mod session;
pub mod transport;
pub mod ui;

pub use api::{ApiClient, ClientConfig};
pub use error::{Error, Result};
pub use export::{ExportFilter, ExportRequest, IdList, ServiceType};
pub use models::{ImportResult, Route, Waypoint};
pub use session::{Credentials, Session, SessionState, SessionToken};
pub use transport::{Body, HttpTransport, Method, Request, Response, Transport};

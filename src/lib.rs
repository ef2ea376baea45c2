//! # plume
//!
//! Express-style request and response facades over hyper.
//!
//! ## The contract
//!
//! hyper parses HTTP and owns connections. matchit matches routes. tokio
//! runs the server loop. plume does none of that. It adapts the native
//! `http` request and response types into two small objects a handler can
//! use without learning any of them:
//!
//! - [`Request`]: read-only. Headers, cookies, query, route params, body,
//!   client IP, protocol, content negotiation.
//! - [`Response`]: mutable and chainable. Status, headers, text/JSON/file
//!   bodies, redirects, downloads.
//!
//! A handler takes `(&Request, &mut Response)` and writes its output into
//! the response. Whatever the response holds when the handler returns is
//! what the client gets.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use plume::{App, Error, Request, Response};
//! use serde_json::json;
//!
//! fn main() -> Result<(), Error> {
//!     App::new()
//!         .get("/user/{id}", get_user)
//!         .post("/user", create_user)
//!         .get("/old", |_req, res| -> Result<(), Error> {
//!             res.redirect("/new")?;
//!             Ok(())
//!         })
//!         .listen(5000, "localhost", true)
//! }
//!
//! fn get_user(req: &Request, res: &mut Response) {
//!     res.send(format!("user {}", req.params()["id"]));
//! }
//!
//! fn create_user(req: &Request, res: &mut Response) -> Result<(), Error> {
//!     let body: serde_json::Value = req.json()?;
//!     res.status(201)
//!         .set_header([("Location", "/user/99")])?
//!         .json(&json!({"id": 99, "name": body["name"]}))?;
//!     Ok(())
//! }
//! ```

mod app;
mod error;
mod handler;
mod json;
mod method;
mod mime;
mod negotiate;
mod request;
mod response;
mod server;
mod status;

pub mod logging;

pub use app::{App, DEFAULT_HOSTNAME, DEFAULT_PORT};
pub use error::Error;
pub use handler::HandlerResult;
pub use method::Method;
pub use request::Request;
pub use response::{Payload, Response};
pub use server::Server;
pub use status::Status;

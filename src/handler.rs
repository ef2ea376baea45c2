//! Handler type erasure.
//!
//! # How handlers are stored
//!
//! The app holds handlers of *different* closure types in one route table,
//! so each is wrapped at registration time in an adapter closure with a
//! single, uniform signature and stored behind an `Arc<dyn Fn>`:
//!
//! ```text
//! fn hello(req: &Request, res: &mut Response) { … }   ← user writes this
//!        ↓ app.get("/", hello)
//! handler::boxed(hello)                                ← registration
//!        ↓
//! Arc::new(move |req, res| hello(req, res).into_result())
//!        ↓  stored as BoxedHandler
//! handler(&req, &mut res)  at request time             ← one vtable call
//! ```
//!
//! Handlers are synchronous. The dispatcher runs them on tokio's blocking
//! pool, so a handler may read files or block briefly without stalling the
//! connections around it.

use std::sync::Arc;

use crate::error::Error;
use crate::request::Request;
use crate::response::Response;

/// A type-erased handler shared across concurrent requests.
pub(crate) type BoxedHandler =
    Arc<dyn Fn(&Request, &mut Response) -> Result<(), Error> + Send + Sync + 'static>;

/// What a handler may return.
///
/// Output always goes through the [`Response`] facade; the return value only
/// says whether the handler finished. Implemented for `()` and for
/// `Result<(), E>` where `E` converts into [`Error`], so both of these are
/// handlers:
///
/// ```rust
/// use plume::{Error, Request, Response};
///
/// fn hello(_req: &Request, res: &mut Response) {
///     res.send("hello");
/// }
///
/// fn readme(_req: &Request, res: &mut Response) -> Result<(), Error> {
///     res.send_file("README.md")?;
///     Ok(())
/// }
/// ```
///
/// An `Err` becomes a `500 Internal Server Error`; whatever the handler had
/// written to the response is discarded.
pub trait HandlerResult {
    fn into_result(self) -> Result<(), Error>;
}

impl HandlerResult for () {
    fn into_result(self) -> Result<(), Error> { Ok(()) }
}

impl<E: Into<Error>> HandlerResult for Result<(), E> {
    fn into_result(self) -> Result<(), Error> { self.map_err(Into::into) }
}

/// Wraps `f` in the uniform adapter stored in the route table.
pub(crate) fn boxed<F, R>(f: F) -> BoxedHandler
where
    F: Fn(&Request, &mut Response) -> R + Send + Sync + 'static,
    R: HandlerResult,
{
    Arc::new(move |req: &Request, res: &mut Response| f(req, res).into_result())
}

//! Route registration and resolution.
//!
//! One radix tree per HTTP method, courtesy of [`matchit`]. You register a
//! path and a handler per verb; at request time the tree hands back the
//! handler, the route variables, and the pattern that matched.

use std::collections::HashMap;
use std::sync::Arc;

use http::HeaderValue;
use http::header::ALLOW;
use matchit::Router as MatchitRouter;
use tracing::error;

use crate::error::Error;
use crate::handler::{self, BoxedHandler, HandlerResult};
use crate::method::Method;
use crate::request::Request;
use crate::response::Response;
use crate::server::Server;
use crate::status::Status;

/// Port [`App::listen_default`] binds to.
pub const DEFAULT_PORT: u16 = 5000;

/// Hostname [`App::listen_default`] binds to.
pub const DEFAULT_HOSTNAME: &str = "localhost";

struct Route {
    pattern: String,
    handler: BoxedHandler,
}

/// The application: a route table of handlers keyed by verb and path.
///
/// Each registration consumes and returns the app so calls chain. Path
/// variables use `{name}` syntax and arrive in [`Request::params`]:
///
/// ```rust,no_run
/// use plume::App;
/// use serde_json::json;
///
/// App::new()
///     .get("/user/{id}", |req, res| {
///         res.send(req.param("id").unwrap_or("unknown"));
///     })
///     .post("/user", |req, res| -> Result<(), plume::Error> {
///         let body: serde_json::Value = req.json()?;
///         res.status(201).json(&json!({"created": body["name"]}))?;
///         Ok(())
///     })
///     .listen(3000, "0.0.0.0", true)
///     .unwrap();
/// ```
pub struct App {
    routes: HashMap<Method, MatchitRouter<Route>>,
}

/// Outcome of matching a method + path against the route table.
pub(crate) enum Resolved {
    Found {
        handler: BoxedHandler,
        params: HashMap<String, String>,
        route: String,
    },
    /// The path exists, but only under these methods.
    MethodNotAllowed(Vec<Method>),
    NotFound,
}

impl App {
    pub fn new() -> Self {
        Self { routes: HashMap::new() }
    }

    /// Register a handler for a method + path pair.
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid pattern or conflicts with a route
    /// already registered for `method`. Both are programming errors that
    /// surface at startup.
    pub fn on<F, R>(self, method: Method, path: &str, handler: F) -> Self
    where
        F: Fn(&Request, &mut Response) -> R + Send + Sync + 'static,
        R: HandlerResult,
    {
        self.add(method, path, handler::boxed(handler))
    }

    pub fn get<F, R>(self, path: &str, handler: F) -> Self
    where
        F: Fn(&Request, &mut Response) -> R + Send + Sync + 'static,
        R: HandlerResult,
    {
        self.on(Method::Get, path, handler)
    }

    pub fn post<F, R>(self, path: &str, handler: F) -> Self
    where
        F: Fn(&Request, &mut Response) -> R + Send + Sync + 'static,
        R: HandlerResult,
    {
        self.on(Method::Post, path, handler)
    }

    pub fn put<F, R>(self, path: &str, handler: F) -> Self
    where
        F: Fn(&Request, &mut Response) -> R + Send + Sync + 'static,
        R: HandlerResult,
    {
        self.on(Method::Put, path, handler)
    }

    pub fn delete<F, R>(self, path: &str, handler: F) -> Self
    where
        F: Fn(&Request, &mut Response) -> R + Send + Sync + 'static,
        R: HandlerResult,
    {
        self.on(Method::Delete, path, handler)
    }

    pub fn patch<F, R>(self, path: &str, handler: F) -> Self
    where
        F: Fn(&Request, &mut Response) -> R + Send + Sync + 'static,
        R: HandlerResult,
    {
        self.on(Method::Patch, path, handler)
    }

    /// Without an explicit `HEAD` route, `HEAD` requests run the `GET`
    /// handler and the body is dropped on the wire.
    pub fn head<F, R>(self, path: &str, handler: F) -> Self
    where
        F: Fn(&Request, &mut Response) -> R + Send + Sync + 'static,
        R: HandlerResult,
    {
        self.on(Method::Head, path, handler)
    }

    pub fn options<F, R>(self, path: &str, handler: F) -> Self
    where
        F: Fn(&Request, &mut Response) -> R + Send + Sync + 'static,
        R: HandlerResult,
    {
        self.on(Method::Options, path, handler)
    }

    /// Serves the app on `hostname:port`, blocking the calling thread until
    /// the process receives SIGTERM or Ctrl-C.
    ///
    /// `verbose` controls the server's own logging: when `true` a default
    /// `tracing` subscriber is installed (unless one already is) and every
    /// request is logged; when `false` the server stays silent apart from
    /// handler failures.
    pub fn listen(self, port: u16, hostname: &str, verbose: bool) -> Result<(), Error> {
        if verbose {
            crate::logging::init_logging();
        }
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        runtime.block_on(Server::bind(hostname, port).verbose(verbose).serve(self))
    }

    /// [`listen`](Self::listen) on `localhost:5000`, verbose.
    pub fn listen_default(self) -> Result<(), Error> {
        self.listen(DEFAULT_PORT, DEFAULT_HOSTNAME, true)
    }

    fn add(mut self, method: Method, path: &str, handler: BoxedHandler) -> Self {
        let route = Route { pattern: path.to_owned(), handler };
        self.routes
            .entry(method)
            .or_insert_with(MatchitRouter::new)
            .insert(path, route)
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    pub(crate) fn resolve(&self, method: &http::Method, path: &str) -> Resolved {
        if let Ok(m) = Method::try_from(method) {
            let found = self.find(m, path).or_else(|| {
                (m == Method::Head)
                    .then(|| self.find(Method::Get, path))
                    .flatten()
            });
            if let Some(found) = found {
                return found;
            }
        }

        let allowed = self.allowed(path);
        if allowed.is_empty() {
            Resolved::NotFound
        } else {
            Resolved::MethodNotAllowed(allowed)
        }
    }

    fn find(&self, method: Method, path: &str) -> Option<Resolved> {
        let matched = self.routes.get(&method)?.at(path).ok()?;
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some(Resolved::Found {
            handler: Arc::clone(&matched.value.handler),
            params,
            route: matched.value.pattern.clone(),
        })
    }

    /// Methods with a route for `path`, including the implicit `HEAD`.
    fn allowed(&self, path: &str) -> Vec<Method> {
        let has = |m: Method| self.routes.get(&m).is_some_and(|tree| tree.at(path).is_ok());
        Method::ALL
            .into_iter()
            .filter(|&m| has(m) || (m == Method::Head && has(Method::Get)))
            .collect()
    }
}

impl Default for App {
    fn default() -> Self { Self::new() }
}

/// Runs a matched handler against a fresh [`Response`] facade.
///
/// A handler error replaces whatever was written with a bare 500.
pub(crate) fn invoke(handler: &BoxedHandler, req: &Request) -> Response {
    let mut res = Response::new();
    match handler(req, &mut res) {
        Ok(()) => res,
        Err(e) => {
            error!(method = req.method(), path = req.path(), route = req.route(), "handler failed: {e}");
            internal_error()
        }
    }
}

pub(crate) fn not_found() -> Response {
    let mut res = Response::new();
    res.send_status(Status::NotFound.code());
    res
}

pub(crate) fn method_not_allowed(allowed: &[Method]) -> Response {
    let allow = allowed.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(", ");
    let mut res = Response::new();
    res.send_status(Status::MethodNotAllowed.code());
    // Method names are plain tokens.
    if let Ok(value) = HeaderValue::from_str(&allow) {
        res.insert_header(ALLOW, value);
    }
    res
}

pub(crate) fn internal_error() -> Response {
    let mut res = Response::new();
    res.send_status(Status::InternalServerError.code());
    res
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use bytes::Bytes;

    /// A `GET` request for `path` with no headers and no route data.
    pub(crate) fn request(path: &str) -> Request {
        let (parts, ()) = http::Request::builder().uri(path).body(()).unwrap().into_parts();
        Request::new(parts, Bytes::new(), HashMap::new(), String::new(), "127.0.0.1:40000".parse().unwrap())
    }

    /// Resolves and runs `method path` the way the dispatcher does, minus I/O.
    fn call(app: &App, method: http::Method, path: &str) -> Response {
        match app.resolve(&method, path) {
            Resolved::Found { handler, params, route } => {
                let (parts, ()) = http::Request::builder()
                    .method(method)
                    .uri(path)
                    .body(())
                    .unwrap()
                    .into_parts();
                let req = Request::new(parts, Bytes::new(), params, route, "127.0.0.1:40000".parse().unwrap());
                invoke(&handler, &req)
            }
            Resolved::MethodNotAllowed(allowed) => method_not_allowed(&allowed),
            Resolved::NotFound => not_found(),
        }
    }

    fn text(res: &Response) -> &str {
        std::str::from_utf8(res.body()).unwrap()
    }

    fn echo_route(req: &Request, res: &mut Response) {
        res.send(format!("{} {} {:?}", req.method(), req.route(), req.param("id")));
    }

    #[test]
    fn each_verb_registers_its_own_tree() {
        let app = App::new()
            .get("/users/{id}", echo_route)
            .post("/users/{id}", echo_route)
            .put("/users/{id}", echo_route)
            .delete("/users/{id}", echo_route)
            .patch("/users/{id}", echo_route)
            .options("/users/{id}", echo_route);

        for m in ["GET", "POST", "PUT", "DELETE", "PATCH", "OPTIONS"] {
            let method = http::Method::from_bytes(m.as_bytes()).unwrap();
            let res = call(&app, method, "/users/7");
            assert_eq!(text(&res), format!(r#"{m} /users/{{id}} Some("7")"#));
        }
    }

    #[test]
    fn unknown_path_is_404() {
        let app = App::new().get("/", echo_route);
        let res = call(&app, http::Method::GET, "/nope");
        assert_eq!(res.status_code(), 404);
        assert_eq!(text(&res), "Not Found");
    }

    #[test]
    fn wrong_method_is_405_with_allow() {
        let app = App::new().get("/items", echo_route).post("/items", echo_route);
        let res = call(&app, http::Method::DELETE, "/items");
        assert_eq!(res.status_code(), 405);
        assert_eq!(res.get("Allow"), Some("GET, HEAD, POST"));

        let res = call(&app, http::Method::TRACE, "/items");
        assert_eq!(res.status_code(), 405);
    }

    #[test]
    fn head_falls_back_to_get() {
        let app = App::new().get("/page", echo_route);
        let res = call(&app, http::Method::HEAD, "/page");
        assert_eq!(res.status_code(), 200);
        assert_eq!(text(&res), "HEAD /page None");
    }

    #[test]
    fn explicit_head_wins_over_get() {
        let app = App::new()
            .get("/page", echo_route)
            .head("/page", |_req, res| {
                res.set_header([("X-Head", "1")]).unwrap();
            });
        let res = call(&app, http::Method::HEAD, "/page");
        assert_eq!(res.get("X-Head"), Some("1"));
    }

    #[test]
    fn handler_errors_become_500() {
        let app = App::new().get("/file", |_req, res| -> Result<(), Error> {
            res.send("partial");
            res.send_file("/definitely/not/here.html")?;
            Ok(())
        });
        let res = call(&app, http::Method::GET, "/file");
        assert_eq!(res.status_code(), 500);
        assert_eq!(text(&res), "Internal Server Error");
    }

    #[test]
    #[should_panic(expected = "invalid route")]
    fn conflicting_routes_panic() {
        let _ = App::new().get("/users/{id}", echo_route).get("/users/{name}", echo_route);
    }
}

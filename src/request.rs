//! Incoming HTTP request facade.

use std::collections::HashMap;
use std::net::SocketAddr;

use bytes::Bytes;
use cookie::Cookie;
use http::HeaderMap;
use http::header::{COOKIE, HOST};
use http::request::Parts;
use serde::de::DeserializeOwned;

use crate::error::Error;
use crate::{mime, negotiate};

/// A read-only view over one inbound request.
///
/// Built by the dispatcher from hyper's native request once the route has
/// matched and the body has been collected. Every accessor is computed from
/// the native parts on demand; nothing is cached.
///
/// ```rust,no_run
/// use plume::App;
///
/// let app = App::new().get("/user/{id}", |req, res| {
///     res.send(format!("user {} via {}", req.params()["id"], req.route()));
/// });
/// ```
#[derive(Debug)]
pub struct Request {
    parts: Parts,
    body: Bytes,
    params: HashMap<String, String>,
    route: String,
    remote_addr: SocketAddr,
}

impl Request {
    pub(crate) fn new(
        parts: Parts,
        body: Bytes,
        params: HashMap<String, String>,
        route: String,
        remote_addr: SocketAddr,
    ) -> Self {
        Self { parts, body, params, route, remote_addr }
    }

    /// The body decoded as UTF-8. Empty when the request had no body.
    pub fn body(&self) -> Result<&str, Error> {
        Ok(std::str::from_utf8(&self.body)?)
    }

    pub fn raw_body(&self) -> &[u8] { &self.body }

    /// Deserializes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Cookies sent with the request, percent-decoded. If a name repeats, the
    /// first occurrence wins.
    pub fn cookies(&self) -> HashMap<String, String> {
        let mut jar = HashMap::new();
        let parsed = self.parts.headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|line| Cookie::split_parse_encoded(line))
            .filter_map(Result::ok);
        for c in parsed {
            jar.entry(c.name().to_owned()).or_insert_with(|| c.value().to_owned());
        }
        jar
    }

    /// All request headers. Lookups on [`HeaderMap`] are case-insensitive.
    pub fn headers(&self) -> &HeaderMap { &self.parts.headers }

    /// Hostname from the `Host` header (or the HTTP/2 authority), without
    /// the port. Empty if the client sent neither.
    ///
    /// `Host: example.com:3000` → `"example.com"`
    pub fn host(&self) -> &str {
        self.authority().map(strip_port).unwrap_or("")
    }

    /// Alias of [`host`](Self::host).
    pub fn hostname(&self) -> &str { self.host() }

    /// Client address: the first `X-Forwarded-For` entry when a proxy set
    /// one, otherwise the peer of the TCP connection.
    pub fn ip(&self) -> String {
        self.get("x-forwarded-for")
            .and_then(|xff| xff.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
            .map_or_else(|| self.remote_addr.ip().to_string(), str::to_owned)
    }

    pub fn method(&self) -> &str { self.parts.method.as_str() }

    /// Path part of the URL. `/users?sort=desc` → `"/users"`
    pub fn path(&self) -> &str { self.parts.uri.path() }

    /// `"https"` or `"http"`.
    ///
    /// Taken from the request target when it is absolute, otherwise from
    /// `X-Forwarded-Proto` as set by a TLS-terminating proxy.
    pub fn protocol(&self) -> &'static str {
        let https = match self.parts.uri.scheme_str() {
            Some(scheme) => scheme.eq_ignore_ascii_case("https"),
            None => self.get("x-forwarded-proto")
                .and_then(|p| p.split(',').next())
                .is_some_and(|p| p.trim().eq_ignore_ascii_case("https")),
        };
        if https { "https" } else { "http" }
    }

    pub fn secure(&self) -> bool { self.protocol() == "https" }

    /// Route variables of the matched pattern.
    ///
    /// For `/users/{id}`, a request to `/users/42` has `{"id": "42"}`.
    pub fn params(&self) -> &HashMap<String, String> { &self.params }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Query-string parameters. If a key repeats, the first value wins.
    pub fn query(&self) -> HashMap<String, String> {
        let pairs: Vec<(String, String)> =
            serde_urlencoded::from_str(self.parts.uri.query().unwrap_or("")).unwrap_or_default();
        let mut query = HashMap::with_capacity(pairs.len());
        for (k, v) in pairs {
            query.entry(k).or_insert(v);
        }
        query
    }

    /// Deserializes the query string into `T`.
    pub fn query_as<T: DeserializeOwned>(&self) -> Result<T, Error> {
        Ok(serde_urlencoded::from_str(self.parts.uri.query().unwrap_or(""))?)
    }

    /// The registered pattern that matched, e.g. `"/user/{id}"`.
    pub fn route(&self) -> &str { &self.route }

    /// Subdomains of the hostname, innermost last.
    ///
    /// `Host: tobi.ferrets.example.com` → `["ferrets", "tobi"]`
    ///
    /// The last two labels are always taken to be the domain and TLD, so a
    /// two-label host yields `[]` and a single label (`localhost`) or an IP
    /// literal is sliced the same blind way.
    pub fn subdomains(&self) -> Vec<String> {
        self.hostname()
            .split('.')
            .rev()
            .skip(2)
            .map(str::to_owned)
            .collect()
    }

    /// Full URL as the client addressed it: `protocol://host[:port]/path?query`.
    pub fn url(&self) -> String {
        let path_and_query = self.parts.uri
            .path_and_query()
            .map_or("/", |pq| pq.as_str());
        format!("{}://{}{}", self.protocol(), self.authority().unwrap_or(""), path_and_query)
    }

    /// `true` if `media_type` is acceptable per `Accept`.
    ///
    /// Takes either a MIME type (`"application/json"`) or a bare extension
    /// (`"json"`), which is resolved to its MIME type first.
    pub fn accepts(&self, media_type: &str) -> bool {
        let mime = if media_type.contains('/') {
            media_type
        } else {
            mime::from_extension(media_type).unwrap_or(media_type)
        };
        negotiate::media_type(&self.parts.headers, mime)
    }

    /// `true` if `charset` is acceptable per `Accept-Charset`.
    pub fn accepts_charset(&self, charset: &str) -> bool {
        negotiate::charset(&self.parts.headers, charset)
    }

    /// `true` if `encoding` is acceptable per `Accept-Encoding`.
    pub fn accepts_encoding(&self, encoding: &str) -> bool {
        negotiate::encoding(&self.parts.headers, encoding)
    }

    /// `true` if `language` is acceptable per `Accept-Language`.
    pub fn accepts_language(&self, language: &str) -> bool {
        negotiate::language(&self.parts.headers, language)
    }

    /// Case-insensitive header lookup. `None` if absent or not valid text.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Peer address of the TCP connection.
    pub fn remote_addr(&self) -> SocketAddr { self.remote_addr }

    /// `Host` header, falling back to the URI authority (HTTP/2 `:authority`).
    fn authority(&self) -> Option<&str> {
        self.get(HOST.as_str())
            .or_else(|| self.parts.uri.authority().map(|a| a.as_str()))
    }
}

fn strip_port(authority: &str) -> &str {
    let host_port = authority.rsplit('@').next().unwrap_or(authority);
    if host_port.starts_with('[') {
        return host_port.find(']').map_or(host_port, |end| &host_port[..=end]);
    }
    host_port.split(':').next().unwrap_or(host_port)
}

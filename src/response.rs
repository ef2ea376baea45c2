//! Outgoing HTTP response facade.
//!
//! A handler receives an empty [`Response`] and mutates it. Every method
//! returns the same facade so calls chain; the dispatcher turns whatever is
//! left at the end into hyper's native response. Last write wins for the
//! status, each header, and the body.

use std::path::Path;

use bytes::Bytes;
use http::header::{CONTENT_DISPOSITION, CONTENT_TYPE, HeaderName, HeaderValue, LOCATION};
use http::{HeaderMap, StatusCode};
use http_body_util::Full;
use serde::Serialize;
use serde_json::Value;

use crate::error::Error;
use crate::mime::{self, APPLICATION_JSON, TEXT_HTML};
use crate::status::{self, Status};

// ── Payload ───────────────────────────────────────────────────────────────────

/// Anything [`Response::send`] accepts.
///
/// Text goes out verbatim. Structured values (numbers, booleans, JSON
/// arrays and objects) are serialized the way [`Response::json`] does it.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    Text(String),
    Json(Value),
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self { Self::Text(s.to_owned()) }
}

impl From<String> for Payload {
    fn from(s: String) -> Self { Self::Text(s) }
}

impl From<&String> for Payload {
    fn from(s: &String) -> Self { Self::Text(s.clone()) }
}

impl From<Value> for Payload {
    fn from(v: Value) -> Self { Self::Json(v) }
}

macro_rules! json_payload {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Payload {
                fn from(v: $t) -> Self { Self::Json(Value::from(v)) }
            }
        )*
    };
}

json_payload!(bool, i32, i64, u32, u64, f64, Vec<Value>, serde_json::Map<String, Value>);

// ── Response ──────────────────────────────────────────────────────────────────

/// The response under construction for one request.
///
/// ```rust
/// use plume::Response;
/// use serde_json::json;
///
/// # fn main() -> Result<(), plume::Error> {
/// let mut res = Response::new();
/// res.status(201)
///     .set_header([("X-Foo", "1")])?
///     .json(&json!({"ok": true}))?;
///
/// assert_eq!(res.status_code(), 201);
/// assert_eq!(res.get("x-foo"), Some("1"));
/// assert_eq!(res.body(), br#"{"ok": true}"#);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Response {
    inner: http::Response<Bytes>,
}

impl Response {
    /// `200 OK`, no headers, empty body.
    pub fn new() -> Self {
        Self { inner: http::Response::new(Bytes::new()) }
    }

    /// Sets the status code. A [`Status`] converts with `.into()`.
    ///
    /// # Panics
    ///
    /// Panics if `code` is outside `100..=999`.
    pub fn status(&mut self, code: u16) -> &mut Self {
        *self.inner.status_mut() = StatusCode::from_u16(code)
            .unwrap_or_else(|_| panic!("invalid status code {code}"));
        self
    }

    /// Merges `fields` into the response headers, replacing any existing
    /// value under the same (case-insensitive) name.
    ///
    /// Nothing is applied if any name or value is malformed.
    pub fn set_header<I, K, V>(&mut self, fields: I) -> Result<&mut Self, Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let parsed = fields
            .into_iter()
            .map(|(k, v)| -> Result<_, Error> {
                let name = HeaderName::from_bytes(k.as_ref().as_bytes())?;
                let value = HeaderValue::from_str(v.as_ref())?;
                Ok((name, value))
            })
            .collect::<Result<Vec<_>, Error>>()?;
        let headers = self.inner.headers_mut();
        for (name, value) in parsed {
            headers.insert(name, value);
        }
        Ok(self)
    }

    /// Sets `Content-Type`.
    ///
    /// A value containing `/` is used verbatim. Anything else is treated as a
    /// file extension (`"json"`, `"html"`) and resolved to its MIME type,
    /// defaulting to `text/html` when the extension is unknown.
    pub fn content_type(&mut self, value: &str) -> Result<&mut Self, Error> {
        let mime = if value.contains('/') {
            value
        } else {
            mime::from_extension(value).unwrap_or(TEXT_HTML)
        };
        let value = HeaderValue::from_str(mime)?;
        self.inner.headers_mut().insert(CONTENT_TYPE, value);
        Ok(self)
    }

    /// Serializes `value` as the body and sets `application/json`.
    pub fn json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<&mut Self, Error> {
        let text = crate::json::to_string(value)?;
        Ok(self.json_text(text))
    }

    /// Sets the body.
    ///
    /// Text is sent verbatim, and `Content-Type` defaults to `text/html` if
    /// nothing set it earlier. Structured values are delegated to
    /// [`json`](Self::json).
    pub fn send(&mut self, value: impl Into<Payload>) -> &mut Self {
        match value.into() {
            Payload::Text(text) => {
                *self.inner.body_mut() = Bytes::from(text);
                self.inner
                    .headers_mut()
                    .entry(CONTENT_TYPE)
                    .or_insert(HeaderValue::from_static(TEXT_HTML));
                self
            }
            Payload::Json(value) => {
                // A `Value` has string keys and finite numbers only.
                let text = crate::json::to_string(&value).unwrap_or_else(|_| value.to_string());
                self.json_text(text)
            }
        }
    }

    /// Sends the file at `path` as text, with `Content-Type` from its
    /// extension (`text/html` when unknown).
    ///
    /// Fails if the file is missing, unreadable, or not UTF-8.
    pub fn send_file(&mut self, path: impl AsRef<Path>) -> Result<&mut Self, Error> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let mime = mime::from_path(path).unwrap_or(TEXT_HTML);
        *self.inner.body_mut() = Bytes::from(text);
        self.inner.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static(mime));
        Ok(self)
    }

    /// Sends the file at `path` as an attachment.
    ///
    /// `Content-Disposition` names it `filename`, or the base name of `path`
    /// when `filename` is `None`.
    pub fn download(&mut self, path: impl AsRef<Path>, filename: Option<&str>) -> Result<&mut Self, Error> {
        let path = path.as_ref();
        let name = match filename {
            Some(name) => name.to_owned(),
            None => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };
        let disposition = HeaderValue::from_str(&format!("attachment; filename={name}"))?;
        self.inner.headers_mut().insert(CONTENT_DISPOSITION, disposition);
        self.send_file(path)
    }

    /// `302 Found` to `path`, with a small HTML notice linking to it.
    ///
    /// `path` is embedded in the HTML as-is. Never redirect to a value an
    /// untrusted client controls without validating it first.
    pub fn redirect(&mut self, path: &str) -> Result<&mut Self, Error> {
        let location = HeaderValue::from_str(path)?;
        self.status(Status::Found.code());
        *self.inner.body_mut() = Bytes::from(redirect_notice(path));
        let headers = self.inner.headers_mut();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_HTML));
        headers.insert(LOCATION, location);
        Ok(self)
    }

    /// Sets the status and sends its reason phrase as the body. Codes with
    /// no registered phrase send the number itself.
    ///
    /// # Panics
    ///
    /// Panics if `code` is outside `100..=999`.
    pub fn send_status(&mut self, code: u16) -> &mut Self {
        let phrase = status::reason_phrase(code).map_or_else(|| code.to_string(), str::to_owned);
        self.status(code).send(phrase)
    }

    /// Case-insensitive lookup of a header set on this response.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.inner.headers().get(field).and_then(|v| v.to_str().ok())
    }

    pub fn status_code(&self) -> u16 { self.inner.status().as_u16() }
    pub fn headers(&self) -> &HeaderMap { self.inner.headers() }
    pub fn body(&self) -> &[u8] { self.inner.body() }

    /// Hands the accumulated response back to hyper.
    pub(crate) fn into_inner(self) -> http::Response<Full<Bytes>> {
        self.inner.map(Full::new)
    }

    pub(crate) fn insert_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.inner.headers_mut().insert(name, value);
    }

    fn json_text(&mut self, text: String) -> &mut Self {
        *self.inner.body_mut() = Bytes::from(text);
        self.inner
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
        self
    }
}

impl Default for Response {
    fn default() -> Self { Self::new() }
}

fn redirect_notice(path: &str) -> String {
    format!(
        r#"
<!DOCTYPE HTML PUBLIC "-//W3C//DTD HTML 3.2 Final//EN">
<title>Redirecting...</title>
<h1>Redirecting...</h1>
<p>You should be redirected automatically to target URL: <a href="{path}">{path}</a>.  If not click the link.
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn body(res: &Response) -> &str {
        std::str::from_utf8(res.body()).unwrap()
    }

    #[test]
    fn starts_empty() {
        let res = Response::new();
        assert_eq!(res.status_code(), 200);
        assert!(res.headers().is_empty());
        assert!(res.body().is_empty());
    }

    #[test]
    fn status_last_write_wins() {
        let mut res = Response::new();
        res.status(404).status(Status::Created.into());
        assert_eq!(res.status_code(), 201);
    }

    #[test]
    #[should_panic(expected = "invalid status code")]
    fn status_out_of_range_panics() {
        Response::new().status(1000);
    }

    #[test]
    fn header_lookup_ignores_case() {
        let mut res = Response::new();
        res.set_header([("X-Request-Id", "abc")]).unwrap();
        assert_eq!(res.get("X-Request-Id"), Some("abc"));
        assert_eq!(res.get("x-request-id"), Some("abc"));
        assert_eq!(res.get("X-REQUEST-ID"), Some("abc"));
        assert_eq!(res.get("X-Missing"), None);
    }

    #[test]
    fn set_header_overwrites_on_collision() {
        let mut res = Response::new();
        res.set_header([("X-Foo", "1"), ("X-Bar", "2")]).unwrap();
        res.set_header([("x-foo", "3")]).unwrap();
        assert_eq!(res.get("X-Foo"), Some("3"));
        assert_eq!(res.get("X-Bar"), Some("2"));
        assert_eq!(res.headers().get_all("x-foo").iter().count(), 1);
    }

    #[test]
    fn set_header_rejects_malformed_fields_atomically() {
        let mut res = Response::new();
        let err = res.set_header([("X-Ok", "1"), ("bad name", "2")]).unwrap_err();
        assert!(matches!(err, Error::InvalidHeaderName(_)));
        assert_eq!(res.get("X-Ok"), None);

        let err = res.set_header([("X-Foo", "line\nbreak")]).unwrap_err();
        assert!(matches!(err, Error::InvalidHeaderValue(_)));
    }

    #[test]
    fn content_type_by_extension_or_verbatim() {
        let mut res = Response::new();
        res.content_type("json").unwrap();
        assert_eq!(res.get("Content-Type"), Some("application/json"));

        res.content_type("application/xml").unwrap();
        assert_eq!(res.get("Content-Type"), Some("application/xml"));

        res.content_type("no-such-extension").unwrap();
        assert_eq!(res.get("Content-Type"), Some("text/html"));
    }

    #[test]
    fn send_text_defaults_to_html() {
        let mut res = Response::new();
        res.send("hello");
        assert_eq!(res.get("Content-Type"), Some("text/html"));
        assert_eq!(body(&res), "hello");
    }

    #[test]
    fn send_text_keeps_existing_content_type() {
        let mut res = Response::new();
        res.content_type("txt").unwrap().send("plain");
        assert_eq!(res.get("Content-Type"), Some("text/plain"));
        assert_eq!(body(&res), "plain");
    }

    #[test]
    fn send_structured_delegates_to_json() {
        let mut res = Response::new();
        res.send(json!({"a": 1}));
        assert_eq!(res.get("Content-Type"), Some("application/json"));
        assert_eq!(body(&res), r#"{"a": 1}"#);

        let mut res = Response::new();
        res.send(true);
        assert_eq!(body(&res), "true");
        res.send(42_i64);
        assert_eq!(body(&res), "42");
    }

    #[test]
    fn json_keeps_key_order() {
        let mut res = Response::new();
        res.json(&json!({"name": "alice", "age": 3})).unwrap();
        assert_eq!(body(&res), r#"{"name": "alice", "age": 3}"#);
    }

    #[test]
    fn json_overrides_content_type() {
        let mut res = Response::new();
        res.content_type("text/plain").unwrap().json(&[1, 2]).unwrap();
        assert_eq!(res.get("Content-Type"), Some("application/json"));
        assert_eq!(body(&res), "[1, 2]");
    }

    #[test]
    fn json_reports_unserializable_values() {
        use std::collections::BTreeMap;
        let map = BTreeMap::from([((1, 2), "tuple keys are not JSON")]);
        let err = Response::new().json(&map).unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn chained_calls_compose() {
        let mut res = Response::new();
        res.status(201)
            .set_header([("X-Foo", "1")])
            .unwrap()
            .json(&json!({"ok": true}))
            .unwrap();
        assert_eq!(res.status_code(), 201);
        assert_eq!(res.get("X-Foo"), Some("1"));
        assert_eq!(res.get("Content-Type"), Some("application/json"));
        assert_eq!(body(&res), r#"{"ok": true}"#);
    }

    #[test]
    fn redirect_sets_location_and_notice() {
        let mut res = Response::new();
        res.redirect("/x").unwrap();
        assert_eq!(res.status_code(), 302);
        assert_eq!(res.get("Location"), Some("/x"));
        assert_eq!(res.get("Content-Type"), Some("text/html"));
        assert!(body(&res).contains(r#"<a href="/x">/x</a>"#));
    }

    #[test]
    fn redirect_embeds_path_verbatim() {
        let mut res = Response::new();
        res.redirect("/search?q=<b>").unwrap();
        assert!(body(&res).contains("/search?q=<b>"));
    }

    #[test]
    fn send_status_uses_reason_phrase() {
        let mut res = Response::new();
        res.send_status(404);
        assert_eq!(res.status_code(), 404);
        assert_eq!(body(&res), "Not Found");
        assert_eq!(res.get("Content-Type"), Some("text/html"));

        let mut res = Response::new();
        res.send_status(599);
        assert_eq!(res.status_code(), 599);
        assert_eq!(body(&res), "599");
    }

    #[test]
    fn send_file_infers_content_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, r#"{"k": "v"}"#).unwrap();

        let mut res = Response::new();
        res.send_file(&path).unwrap();
        assert_eq!(res.get("Content-Type"), Some("application/json"));
        assert_eq!(body(&res), r#"{"k": "v"}"#);
    }

    #[test]
    fn send_file_without_extension_is_html() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "<p>hi</p>").unwrap();

        let mut res = Response::new();
        res.send_file(file.path()).unwrap();
        assert_eq!(res.get("Content-Type"), Some("text/html"));
        assert_eq!(body(&res), "<p>hi</p>");
    }

    #[test]
    fn send_file_missing_is_an_io_error() {
        let err = Response::new().send_file("/definitely/not/here.txt").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn download_names_the_attachment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");
        std::fs::write(&path, "a,b\n1,2\n").unwrap();

        let mut res = Response::new();
        res.download(&path, None).unwrap();
        assert_eq!(res.get("Content-Disposition"), Some("attachment; filename=report.csv"));
        assert_eq!(res.get("Content-Type"), Some("text/csv"));
        assert_eq!(body(&res), "a,b\n1,2\n");

        let mut res = Response::new();
        res.download(&path, Some("q3.csv")).unwrap();
        assert_eq!(res.get("Content-Disposition"), Some("attachment; filename=q3.csv"));
    }
}

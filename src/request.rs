use std::fmt;

use http::uri::Scheme;
use http::Uri;

use crate::Error;

/// What to send in a single request.
///
/// Headers are kept in the order they were added and are written to the wire in that
/// order. Duplicates are allowed.
///
/// ```
/// use h1wire::RequestSpec;
///
/// let spec = RequestSpec::new("POST")
///     .header("Content-Type", "application/octet-stream")
///     .body("aGVsbG8=")
///     .binary_request(true)
///     .binary_response(true);
///
/// assert_eq!(spec.method(), "POST");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestSpec {
    method: String,
    headers: Vec<(String, String)>,
    body: String,
    binary_request: bool,
    binary_response: bool,
}

impl RequestSpec {
    /// Create a request with the given method, no headers and an empty body.
    pub fn new(method: impl Into<String>) -> Self {
        RequestSpec {
            method: method.into(),
            ..Default::default()
        }
    }

    /// Append a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the body text.
    ///
    /// With [`binary_request`][RequestSpec::binary_request], this is base64 of the
    /// actual bytes to send.
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Treat the body as base64 and send the decoded bytes.
    pub fn binary_request(mut self, enabled: bool) -> Self {
        self.binary_request = enabled;
        self
    }

    /// Deliver the response body base64 encoded.
    pub fn binary_response(mut self, enabled: bool) -> Self {
        self.binary_response = enabled;
        self
    }

    /// The method token.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Headers in the order they were added.
    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The body text as given.
    pub fn body_text(&self) -> &str {
        &self.body
    }

    /// Whether the body is base64 to be decoded before sending.
    pub fn is_binary_request(&self) -> bool {
        self.binary_request
    }

    /// Whether the response body is delivered base64 encoded.
    pub fn is_binary_response(&self) -> bool {
        self.binary_response
    }

    pub(crate) fn is_head(&self) -> bool {
        self.method.eq_ignore_ascii_case("HEAD")
    }
}

/// Where a connection goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    host: String,
    port: u16,
    tls: bool,
    path: String,
}

impl Target {
    /// Create a target from its parts.
    ///
    /// An empty path is sent as `/`.
    pub fn new(host: impl Into<String>, port: u16, tls: bool, path: impl Into<String>) -> Self {
        let path = path.into();
        Target {
            host: host.into(),
            port,
            tls,
            path: if path.is_empty() { "/".into() } else { path },
        }
    }

    /// Resolve a `http://` or `https://` url into a target.
    ///
    /// The port defaults to 80 or 443 depending on scheme. The path includes the query.
    ///
    /// ```
    /// use h1wire::Target;
    ///
    /// let t = Target::from_url("https://example.test/api?x=1").unwrap();
    /// assert_eq!(t.host(), "example.test");
    /// assert_eq!(t.port(), 443);
    /// assert!(t.is_tls());
    /// assert_eq!(t.path(), "/api?x=1");
    /// ```
    pub fn from_url(url: &str) -> Result<Self, Error> {
        let uri: Uri = url.parse().map_err(|e| Error::BadUrl(format!("{}", e)))?;

        let scheme = uri
            .scheme()
            .ok_or_else(|| Error::BadUrl(format!("missing scheme: {}", url)))?;

        let tls = if *scheme == Scheme::HTTPS {
            true
        } else if *scheme == Scheme::HTTP {
            false
        } else {
            return Err(Error::BadUrl(format!("unsupported scheme: {}", scheme)));
        };

        let host = uri
            .host()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| Error::BadUrl(format!("missing host: {}", url)))?;

        let port = uri.port_u16().unwrap_or_else(|| default_port(tls));

        let path = uri
            .path_and_query()
            .map(|p| p.as_str())
            .unwrap_or_default();

        Ok(Target::new(host, port, tls, path))
    }

    /// Host name to connect to.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// TCP port to connect to.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Whether the transport must be TLS wrapped.
    pub fn is_tls(&self) -> bool {
        self.tls
    }

    /// The request path, including any query.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Value for the `host` header.
    ///
    /// The port is only included when it differs from the scheme default.
    pub(crate) fn host_header(&self) -> String {
        if self.port == default_port(self.tls) {
            self.host.clone()
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

fn default_port(tls: bool) -> u16 {
    if tls {
        443
    } else {
        80
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scheme = if self.tls { "https" } else { "http" };
        write!(f, "{}://{}:{}{}", scheme, self.host, self.port, self.path)
    }
}

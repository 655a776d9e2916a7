//! HTTP/1.1 wire format.
//!
//! [`encode`] turns a [`RequestSpec`] into the complete request bytes. [`AccumulationBuffer`]
//! collects response bytes as they arrive and tells when they form a complete response.

use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use http::{header, HeaderName, HeaderValue, Method};

use crate::util::log_data;
use crate::{Error, RequestSpec, Target};

mod decode;

pub use decode::AccumulationBuffer;

/// Max number of headers to parse from an HTTP response
pub const MAX_RESPONSE_HEADERS: usize = 128;

/// Encode a request for `target` into wire bytes.
///
/// The output is the request line, a `Host` header, the caller's headers in order, a
/// `Content-Length` header for the body and then the body itself.
///
/// A `Host` header set by the caller replaces the one derived from the target. A
/// `Content-Length` set by the caller is dropped, since the length is always computed
/// from the body that is actually sent.
///
/// If the request is a binary request, the body text is base64 decoded first.
///
/// ```
/// use h1wire::{codec, RequestSpec, Target};
///
/// let target = Target::new("example.test", 80, false, "/status");
/// let bytes = codec::encode(&RequestSpec::new("GET"), &target).unwrap();
///
/// assert_eq!(
///     bytes,
///     b"GET /status HTTP/1.1\r\nHost: example.test\r\nContent-Length: 0\r\n\r\n"
/// );
/// ```
pub fn encode(spec: &RequestSpec, target: &Target) -> Result<Vec<u8>, Error> {
    let method = Method::from_bytes(spec.method().as_bytes())
        .map_err(|_| Error::BadMethod(spec.method().to_string()))?;

    let path = target.path();
    if path.bytes().any(|c| c.is_ascii_whitespace() || c.is_ascii_control()) {
        return Err(Error::BadUrl(format!("path is not valid on the wire: {:?}", path)));
    }

    let body = request_body(spec)?;

    let mut host = target.host_header();
    let mut headers: Vec<(&str, &str)> = Vec::new();

    for (name, value) in spec.headers() {
        let parsed = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::BadRequestHeader(format!("{}: {}", e, name)))?;
        HeaderValue::from_str(value)
            .map_err(|e| Error::BadRequestHeader(format!("{}: {}", e, name)))?;

        if parsed == header::CONTENT_LENGTH {
            debug!("Drop caller content-length: {}", value);
            continue;
        }

        if parsed == header::HOST {
            host = value.to_string();
            continue;
        }

        headers.push((name, value));
    }

    HeaderValue::from_str(&host)
        .map_err(|e| Error::BadRequestHeader(format!("{}: host {:?}", e, host)))?;

    let content_length = body.len().to_string();

    let mut out = Vec::with_capacity(256 + body.len());

    put_line(&mut out, &[method.as_str(), " ", path, " HTTP/1.1"]);
    put_line(&mut out, &["Host: ", &host]);
    for (name, value) in headers {
        put_line(&mut out, &[name, ": ", value]);
    }
    put_line(&mut out, &["Content-Length: ", &content_length]);
    put_line(&mut out, &[]);

    debug!(
        "Encoded {} {} ({} header bytes, {} body bytes)",
        method,
        path,
        out.len(),
        body.len()
    );
    log_data(&out);

    out.extend_from_slice(&body);

    Ok(out)
}

fn request_body(spec: &RequestSpec) -> Result<Vec<u8>, Error> {
    if spec.is_binary_request() {
        BASE64_STANDARD
            .decode(spec.body_text())
            .map_err(|e| Error::BadBase64(e.to_string()))
    } else {
        Ok(spec.body_text().as_bytes().to_vec())
    }
}

fn put_line(out: &mut Vec<u8>, parts: &[&str]) {
    for p in parts {
        out.extend_from_slice(p.as_bytes());
    }
    out.extend_from_slice(b"\r\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str;

    fn target() -> Target {
        Target::new("foo.test", 80, false, "/page")
    }

    fn encode_str(spec: RequestSpec) -> String {
        let bytes = encode(&spec, &target()).unwrap();
        str::from_utf8(&bytes).unwrap().to_string()
    }

    #[test]
    fn get_simple() {
        let s = encode_str(RequestSpec::new("GET"));
        assert_eq!(
            s,
            "GET /page HTTP/1.1\r\nHost: foo.test\r\nContent-Length: 0\r\n\r\n"
        );
    }

    #[test]
    fn post_with_body() {
        let s = encode_str(
            RequestSpec::new("POST")
                .header("Content-Type", "text/plain")
                .body("hello"),
        );
        assert_eq!(
            s,
            "POST /page HTTP/1.1\r\n\
            Host: foo.test\r\n\
            Content-Type: text/plain\r\n\
            Content-Length: 5\r\n\
            \r\n\
            hello"
        );
    }

    #[test]
    fn headers_keep_order_and_duplicates() {
        let s = encode_str(
            RequestSpec::new("GET")
                .header("Cookie", "a=1")
                .header("X-Foo", "bar")
                .header("Cookie", "b=2"),
        );
        assert_eq!(
            s,
            "GET /page HTTP/1.1\r\n\
            Host: foo.test\r\n\
            Cookie: a=1\r\n\
            X-Foo: bar\r\n\
            Cookie: b=2\r\n\
            Content-Length: 0\r\n\
            \r\n"
        );
    }

    #[test]
    fn caller_content_length_is_replaced() {
        let s = encode_str(
            RequestSpec::new("POST")
                .header("content-length", "100")
                .body("abc"),
        );
        assert!(!s.contains("100"));
        assert_eq!(s.matches("Content-Length").count(), 1);
        assert!(s.contains("Content-Length: 3\r\n"));
    }

    #[test]
    fn caller_host_replaces_target_host() {
        let s = encode_str(RequestSpec::new("GET").header("host", "other.test"));
        assert!(s.starts_with("GET /page HTTP/1.1\r\nHost: other.test\r\n"));
        assert_eq!(s.to_ascii_lowercase().matches("host:").count(), 1);
    }

    #[test]
    fn host_with_non_default_port() {
        let target = Target::new("foo.test", 8443, true, "/");
        let bytes = encode(&RequestSpec::new("GET"), &target).unwrap();
        let s = str::from_utf8(&bytes).unwrap();
        assert!(s.contains("Host: foo.test:8443\r\n"));
    }

    #[test]
    fn host_with_line_break() {
        let target = Target::new("a.test\r\nX-Injected: 1", 80, false, "/");
        let err = encode(&RequestSpec::new("GET"), &target).unwrap_err();
        assert!(matches!(err, Error::BadRequestHeader(_)));
    }

    #[test]
    fn host_with_nul() {
        let target = Target::new("a\0b.test", 80, false, "/");
        let err = encode(&RequestSpec::new("GET"), &target).unwrap_err();
        assert!(matches!(err, Error::BadRequestHeader(_)));
    }

    #[test]
    fn caller_host_is_checked_too() {
        let err = encode(
            &RequestSpec::new("GET").header("Host", "a.test\nX-Injected: 1"),
            &target(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::BadRequestHeader(_)));
    }

    #[test]
    fn binary_request_is_decoded() {
        // [0, 1, 2, 255, 254]
        let bytes = encode(
            &RequestSpec::new("POST")
                .body("AAEC//4=")
                .binary_request(true),
            &target(),
        )
        .unwrap();

        let split = bytes.windows(4).position(|w| w == b"\r\n\r\n").unwrap();
        let head = str::from_utf8(&bytes[..split]).unwrap();
        assert!(head.ends_with("Content-Length: 5"));
        assert_eq!(&bytes[split + 4..], &[0, 1, 2, 255, 254]);
    }

    #[test]
    fn binary_request_bad_base64() {
        let err = encode(
            &RequestSpec::new("POST").body("@@@").binary_request(true),
            &target(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::BadBase64(_)));
    }

    #[test]
    fn extension_method() {
        let s = encode_str(RequestSpec::new("PROPFIND"));
        assert!(s.starts_with("PROPFIND /page HTTP/1.1\r\n"));
    }

    #[test]
    fn bad_method() {
        let err = encode(&RequestSpec::new(""), &target()).unwrap_err();
        assert!(matches!(err, Error::BadMethod(_)));
    }

    #[test]
    fn bad_header_value() {
        let err = encode(&RequestSpec::new("GET").header("x-foo", "a\r\nb"), &target()).unwrap_err();
        assert!(matches!(err, Error::BadRequestHeader(_)));
    }

    #[test]
    fn path_with_space() {
        let target = Target::new("foo.test", 80, false, "/a b");
        let err = encode(&RequestSpec::new("GET"), &target).unwrap_err();
        assert!(matches!(err, Error::BadUrl(_)));
    }

    #[test]
    fn single_boundary_before_body() {
        let methods = ["GET", "POST", "PUT", "DELETE", "OPTIONS"];
        let bodies = ["", "x", "line1\r\n\r\nline2"];

        for m in methods {
            for b in bodies {
                let spec = RequestSpec::new(m).header("Accept", "*/*").body(b);
                let bytes = encode(&spec, &target()).unwrap();

                let split = bytes.windows(4).position(|w| w == b"\r\n\r\n").unwrap();
                let head = str::from_utf8(&bytes[..split]).unwrap();

                assert!(head.starts_with(&format!("{} /page HTTP/1.1\r\n", m)));
                assert!(head.contains("\r\nHost: foo.test"));
                assert!(head.ends_with(&format!("Content-Length: {}", b.len())));
                assert_eq!(&bytes[split + 4..], b.as_bytes());
            }
        }
    }
}

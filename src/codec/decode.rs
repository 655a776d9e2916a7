use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode, Version};

use crate::util::log_data;
use crate::{Error, ResponseMessage};

use super::MAX_RESPONSE_HEADERS;

/// Response bytes received so far.
///
/// Bytes are appended with [`extend`][AccumulationBuffer::extend] as they arrive, and
/// [`try_decode`][AccumulationBuffer::try_decode] is called after each append. Nothing
/// is consumed until a complete response is produced, so it doesn't matter how the
/// response is split up on the way in.
///
/// ```
/// use h1wire::codec::AccumulationBuffer;
///
/// let mut buffer = AccumulationBuffer::new(false, false);
///
/// buffer.extend(b"HTTP/1.1 200 OK\r\nContent-Length:5\r\n\r\nhel");
/// assert!(buffer.try_decode().unwrap().is_none());
///
/// buffer.extend(b"lo");
/// let response = buffer.try_decode().unwrap().unwrap();
///
/// assert_eq!(response.status(), 200);
/// assert_eq!(response.body(), "hello");
/// ```
#[derive(Debug)]
pub struct AccumulationBuffer {
    data: Vec<u8>,
    head: Option<Head>,
    binary_response: bool,
    head_request: bool,
}

/// Status line and headers, once the boundary has been found.
#[derive(Debug)]
struct Head {
    version: Version,
    status: StatusCode,
    reason: String,
    headers: HeaderMap,
    body_start: usize,
    body_len: BodyLength,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyLength {
    /// As given by `content-length`.
    Bounded(usize),
    /// Read until the transport closes.
    Unbounded,
}

enum Parsed {
    /// A complete 1xx response of this many bytes, to be skipped.
    Interim(usize),
    Final(Head),
}

impl AccumulationBuffer {
    /// Create an empty buffer.
    ///
    /// * `binary_response` - deliver the body base64 encoded.
    /// * `head_request` - the request was `HEAD`, which means there is no body
    ///   regardless of `content-length`.
    pub fn new(binary_response: bool, head_request: bool) -> Self {
        AccumulationBuffer {
            data: Vec::new(),
            head: None,
            binary_response,
            head_request,
        }
    }

    /// Append received bytes.
    pub fn extend(&mut self, input: &[u8]) {
        self.data.extend_from_slice(input);
    }

    /// Number of bytes held.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether no bytes are held.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Tell if the status line and all headers have been received.
    pub fn is_head_complete(&self) -> bool {
        self.head.is_some()
    }

    /// How many more body bytes are needed.
    ///
    /// `None` until the head is complete, and for bodies delimited by the transport
    /// closing.
    pub fn body_remaining(&self) -> Option<usize> {
        let head = self.head.as_ref()?;
        match head.body_len {
            BodyLength::Bounded(n) => Some(n.saturating_sub(self.data.len() - head.body_start)),
            BodyLength::Unbounded => None,
        }
    }

    /// Try to produce a complete response from the bytes held.
    ///
    /// * `Ok(None)` - not enough bytes yet. Bodies without `content-length` are never
    ///   complete here; they end with [`finish`][AccumulationBuffer::finish].
    /// * `Ok(Some(response))` - the response. Any bytes beyond the body are ignored.
    /// * `Err(e)` - the bytes are not a valid response.
    pub fn try_decode(&mut self) -> Result<Option<ResponseMessage>, Error> {
        if self.head.is_none() {
            self.head = self.try_head()?;
        }

        let ready = match &self.head {
            None => None,
            Some(head) => match head.body_len {
                BodyLength::Bounded(n) => {
                    let available = self.data.len() - head.body_start;
                    if available > n {
                        debug!("Ignore {} bytes after response body", available - n);
                    }
                    (available >= n).then_some(n)
                }
                BodyLength::Unbounded => None,
            },
        };

        let Some(len) = ready else {
            return Ok(None);
        };

        Ok(self.take_response(len))
    }

    /// Produce the response when the transport has closed.
    ///
    /// A body without `content-length` ends here, with whatever bytes have arrived,
    /// including none. Anything else that is not complete yet never will be.
    pub fn finish(&mut self) -> Result<ResponseMessage, Error> {
        if let Some(response) = self.try_decode()? {
            return Ok(response);
        }

        let unbounded = match &self.head {
            Some(head) if head.body_len == BodyLength::Unbounded => {
                Some(self.data.len() - head.body_start)
            }
            _ => None,
        };

        unbounded
            .and_then(|len| self.take_response(len))
            .ok_or(Error::IncompleteResponse)
    }

    /// Parse heads until we find the final response, dropping any interim 1xx on the way.
    fn try_head(&mut self) -> Result<Option<Head>, Error> {
        loop {
            match parse_head(&self.data, self.head_request)? {
                None => return Ok(None),
                Some(Parsed::Interim(n)) => {
                    self.data.drain(..n);
                }
                Some(Parsed::Final(head)) => return Ok(Some(head)),
            }
        }
    }

    fn take_response(&mut self, len: usize) -> Option<ResponseMessage> {
        let head = self.head.take()?;

        let body = &self.data[head.body_start..head.body_start + len];
        log_data(body);

        let body = if self.binary_response {
            BASE64_STANDARD.encode(body)
        } else {
            String::from_utf8_lossy(body).into_owned()
        };

        self.data.clear();

        Some(ResponseMessage {
            version: head.version,
            status: head.status,
            reason: head.reason,
            headers: head.headers,
            body,
        })
    }
}

fn parse_head(input: &[u8], head_request: bool) -> Result<Option<Parsed>, Error> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_RESPONSE_HEADERS];
    let mut res = httparse::Response::new(&mut headers);

    let body_start = match res.parse(input)? {
        httparse::Status::Complete(n) => n,
        httparse::Status::Partial => return Ok(None),
    };

    log_data(&input[..body_start]);

    let version = match res.version {
        Some(0) => Version::HTTP_10,
        Some(1) => Version::HTTP_11,
        _ => return Err(Error::HttpParseFail("unsupported http version".into())),
    };

    let code = res.code.unwrap_or_default();
    let status = StatusCode::from_u16(code)
        .map_err(|_| Error::HttpParseFail(format!("invalid status code: {}", code)))?;

    if status.is_informational() && status != StatusCode::SWITCHING_PROTOCOLS {
        debug!("Skip interim response: {}", status);
        return Ok(Some(Parsed::Interim(body_start)));
    }

    let mut map = HeaderMap::with_capacity(res.headers.len());
    for h in res.headers.iter() {
        let name = HeaderName::from_bytes(h.name.as_bytes())
            .map_err(|e| Error::BadHeader(format!("{}: {}", e, h.name)))?;
        let value = HeaderValue::from_bytes(h.value)
            .map_err(|e| Error::BadHeader(format!("{}: {}", e, h.name)))?;

        // Last one wins.
        map.insert(name, value);
    }

    let content_length = match map.get(header::CONTENT_LENGTH) {
        Some(v) => Some(parse_content_length(v)?),
        None => None,
    };

    let no_body = head_request
        || status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED;

    let body_len = if no_body {
        BodyLength::Bounded(0)
    } else if is_chunked(&map) {
        return Err(Error::BodyIsChunked);
    } else if let Some(n) = content_length {
        BodyLength::Bounded(n)
    } else {
        BodyLength::Unbounded
    };

    debug!("Response head: {} {:?} body: {:?}", status, version, body_len);

    Ok(Some(Parsed::Final(Head {
        version,
        status,
        reason: res.reason.unwrap_or_default().to_string(),
        headers: map,
        body_start,
        body_len,
    })))
}

fn parse_content_length(v: &HeaderValue) -> Result<usize, Error> {
    v.to_str()
        .ok()
        .map(str::trim)
        .filter(|s| !s.is_empty() && s.bytes().all(|c| c.is_ascii_digit()))
        .and_then(|s| s.parse::<u64>().ok())
        .and_then(|n| usize::try_from(n).ok())
        .ok_or(Error::BadContentLengthHeader)
}

fn is_chunked(map: &HeaderMap) -> bool {
    map.get(header::TRANSFER_ENCODING)
        .and_then(|v| v.to_str().ok())
        .map(|v| {
            v.split(',')
                .any(|p| p.trim().eq_ignore_ascii_case("chunked"))
        })
        .unwrap_or(false)
}

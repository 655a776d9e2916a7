use http::{HeaderMap, HeaderValue, StatusCode, Version};

/// A complete response handed to the success callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMessage {
    pub(crate) version: Version,
    pub(crate) status: StatusCode,
    pub(crate) reason: String,
    pub(crate) headers: HeaderMap,
    pub(crate) body: String,
}

impl ResponseMessage {
    /// HTTP version of the status line, 1.0 or 1.1.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Reason phrase as sent by the server, which might be empty.
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Response headers.
    ///
    /// Lookup is case insensitive. Where the server repeated a header, only the last
    /// value is kept.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Shorthand for looking up a single header.
    pub fn header(&self, name: &str) -> Option<&HeaderValue> {
        self.headers.get(name)
    }

    /// The body.
    ///
    /// This is base64 if the request asked for a binary response, otherwise the body
    /// bytes read as UTF-8.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Take the body.
    pub fn into_body(self) -> String {
        self.body
    }
}

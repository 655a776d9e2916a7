//! Single-request HTTP/1.1 client over an event-driven byte stream.
//!
//! The crate does not own any networking of its own in the core. A [`Transport`] is a
//! byte stream (plain or TLS wrapped) that can be opened, written to and closed, and that
//! reports what happened as a sequence of [`TransportEvent`]. A [`Connection`] drives one
//! such transport through exactly one request/response cycle:
//!
//! ```text
//!   ┌──────────────────┐
//!   │      Ready       │─────────────────┐
//!   └──────────────────┘                 │
//!             │ request()                │
//!             ▼                          │
//!   ┌──────────────────┐                 │
//!   │  SendingRequest  │─────────────────┤
//!   └──────────────────┘                 │
//!             │ all bytes sent           │
//!             ▼                          │
//!   ┌──────────────────┐                 │
//!   │WaitingForResponse│──┐              │
//!   └──────────────────┘  │              │
//!                         ▼              ▼
//!                       ┌──────────────────┐
//!                       │      Closed      │
//!                       └──────────────────┘
//! ```
//!
//! Exactly one of the success/error callbacks given to [`Connection::request`] is invoked,
//! and never after [`Connection::close`].
//!
//! # Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::collections::VecDeque;
//! use std::rc::Rc;
//!
//! use h1wire::{Connection, ConnectionState, RequestSpec, ResponseMessage};
//! use h1wire::{Target, Transport, TransportEvent};
//!
//! // A transport that answers every request with a canned response.
//! #[derive(Default)]
//! struct Canned {
//!     events: VecDeque<TransportEvent>,
//! }
//!
//! impl Transport for Canned {
//!     fn open(&mut self, _host: &str, _port: u16, _tls: bool) {}
//!
//!     fn send(&mut self, data: &[u8]) {
//!         self.events.push_back(TransportEvent::Sent(data.len()));
//!         self.events.push_back(TransportEvent::Received(
//!             b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello".to_vec(),
//!         ));
//!     }
//!
//!     fn close(&mut self) {
//!         self.events.push_back(TransportEvent::Closed);
//!     }
//!
//!     fn poll_event(&mut self) -> Option<TransportEvent> {
//!         self.events.pop_front()
//!     }
//! }
//!
//! let target = Target::from_url("http://example.test/status").unwrap();
//! let mut conn = Connection::new(target, Canned::default());
//!
//! let body = Rc::new(RefCell::new(None));
//! let sink = body.clone();
//!
//! conn.request(
//!     RequestSpec::new("GET"),
//!     move |res: ResponseMessage| *sink.borrow_mut() = Some(res.body().to_string()),
//!     |err| panic!("request failed: {}", err),
//! )
//! .unwrap();
//!
//! // Pump transport events until the exchange is over.
//! conn.run();
//!
//! assert_eq!(conn.state(), ConnectionState::Closed);
//! assert_eq!(body.borrow().as_deref(), Some("hello"));
//! ```
//!
//! # In scope:
//!
//! * HTTP/1.1 request framing with computed `content-length`
//! * Incremental response parsing, `content-length` or close delimited bodies
//! * Optional base64 transcoding of request and response bodies
//! * Exactly-once completion under errors and cancellation
//!
//! # Out of scope:
//!
//! * TLS (the transport provides it)
//! * transfer-encoding: chunked
//! * Redirects, connection pooling, retries and timeouts

#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![warn(missing_docs)]

#[macro_use]
extern crate log;

mod close_reason;
mod error;
mod util;

pub mod codec;

mod request;
mod response;
mod socket;

mod connection;
mod registry;

#[cfg(feature = "tcp")]
mod tcp;

pub use close_reason::CloseReason;
pub use connection::{Connection, ConnectionState};
pub use error::{Error, ErrorKind};
pub use registry::{ConnectionId, Registry};
pub use request::{RequestSpec, Target};
pub use response::ResponseMessage;
pub use socket::{SocketAdapter, SocketObserver, Transport, TransportEvent};

#[cfg(feature = "tcp")]
pub use tcp::TcpTransport;

// Re-export the basis for this library.
pub use http;

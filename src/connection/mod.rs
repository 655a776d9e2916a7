//! The request/response state machine.
//!
//! A [`Connection`] lives for exactly one request. It is created `Ready`, goes
//! through `SendingRequest` and `WaitingForResponse`, and ends `Closed`. There
//! are no other transitions and `Closed` is final.
//!
//! The success and error callbacks are owned by the in-flight phase. Any move to
//! `Closed` takes the phase out, which is the only way a callback can be reached.
//! That's what makes "at most one callback" hold regardless of the order of
//! transport events or a racing [`Connection::close`].

use std::fmt;
use std::mem;

use crate::codec::{self, AccumulationBuffer};
use crate::socket::{SocketAdapter, SocketObserver, Transport, TransportEvent};
use crate::{CloseReason, Error, RequestSpec, ResponseMessage, Target};


/// Where a [`Connection`] is in its single request/response cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Waiting for [`Connection::request`].
    Ready,
    /// The request bytes are being written.
    SendingRequest,
    /// All request bytes are written, collecting the response.
    WaitingForResponse,
    /// Done. Nothing more happens on this connection.
    Closed,
}

type OnSuccess = Box<dyn FnOnce(ResponseMessage)>;
type OnError = Box<dyn FnOnce(Error)>;

/// A single HTTP/1.1 request/response over a [`Transport`].
///
/// Events from the transport are pumped in with [`poll`][Connection::poll],
/// [`run`][Connection::run] or [`handle_event`][Connection::handle_event]. All of
/// them must be called from the same thread; callbacks are invoked from within
/// those calls.
pub struct Connection<T> {
    socket: SocketAdapter<T>,
    machine: Machine,
}

/// The part of the connection that observes the socket.
struct Machine {
    target: Target,
    phase: Phase,
    close_reason: Option<CloseReason>,
}

enum Phase {
    Ready,
    SendingRequest(Exchange),
    WaitingForResponse(Exchange),
    Closed,
}

/// Everything about the request in flight.
struct Exchange {
    request: Vec<u8>,
    sent: usize,
    buffer: AccumulationBuffer,
    on_success: OnSuccess,
    on_error: OnError,
}

impl<T: Transport> Connection<T> {
    /// Create a connection to `target` that will use `transport`.
    ///
    /// The transport is not opened until [`request`][Connection::request].
    pub fn new(target: Target, transport: T) -> Self {
        debug!("New connection to {}", target);
        Connection {
            socket: SocketAdapter::new(transport),
            machine: Machine {
                target,
                phase: Phase::Ready,
                close_reason: None,
            },
        }
    }

    /// Create a connection to the host, port and path of a url.
    pub fn from_url(url: &str, transport: T) -> Result<Self, Error> {
        let target = Target::from_url(url)?;
        Ok(Connection::new(target, transport))
    }

    /// Send a request.
    ///
    /// Exactly one of `on_success` and `on_error` is called later, unless the
    /// connection is [closed][Connection::close] first, in which case neither is.
    ///
    /// If the request can't be encoded (bad method, header or base64 body),
    /// `on_error` is called right away and the connection closes without the
    /// transport ever being opened.
    ///
    /// Errors with [`Error::NotReady`] if a request was already made. Nothing is
    /// sent and neither callback is called in that case.
    pub fn request<S, E>(
        &mut self,
        spec: RequestSpec,
        on_success: S,
        on_error: E,
    ) -> Result<(), Error>
    where
        S: FnOnce(ResponseMessage) + 'static,
        E: FnOnce(Error) + 'static,
    {
        let state = self.state();
        if state != ConnectionState::Ready {
            debug!("Reject request in state {:?}", state);
            return Err(Error::NotReady(state));
        }

        let request = match codec::encode(&spec, &self.machine.target) {
            Ok(v) => v,
            Err(e) => {
                debug!("Failed to encode request: {}", e);
                self.machine.enter(Phase::Closed);
                self.machine.close_reason = Some(CloseReason::EncodingFailed);
                on_error(e);
                return Ok(());
            }
        };

        let target = &self.machine.target;
        self.socket.open(target.host(), target.port(), target.is_tls());
        self.socket.send(&request);

        let exchange = Exchange {
            request,
            sent: 0,
            buffer: AccumulationBuffer::new(spec.is_binary_response(), spec.is_head()),
            on_success: Box::new(on_success),
            on_error: Box::new(on_error),
        };

        self.machine.enter(Phase::SendingRequest(exchange));

        Ok(())
    }

    /// Close the connection.
    ///
    /// Valid in any state and safe to call repeatedly. After this, neither callback
    /// of the request is called.
    pub fn close(&mut self) {
        if self.state() == ConnectionState::Closed {
            return;
        }

        // Dropping the exchange drops the callbacks unused.
        self.machine.enter(Phase::Closed);
        self.machine.close_reason = Some(CloseReason::Cancelled);
        self.socket.close();
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        self.machine.state()
    }

    /// Why the connection closed, once it has.
    pub fn close_reason(&self) -> Option<CloseReason> {
        self.machine.close_reason
    }

    /// Where the connection goes.
    pub fn target(&self) -> &Target {
        &self.machine.target
    }

    /// The transport in use.
    pub fn transport(&self) -> &T {
        self.socket.transport()
    }

    /// Handle one event from the transport.
    ///
    /// Returns `false` if the event was dropped because the transport had already
    /// reported closing.
    pub fn handle_event(&mut self, event: TransportEvent) -> bool {
        self.socket.deliver(event, &mut self.machine)
    }

    /// Handle all events the transport has pending, without waiting.
    ///
    /// Returns the number of events handled.
    pub fn poll(&mut self) -> usize {
        let mut handled = 0;

        while let Some(event) = self.socket.poll_event() {
            if self.handle_event(event) {
                handled += 1;
            }
        }

        handled
    }

    /// Handle events, waiting for them as needed, until the connection is closed.
    ///
    /// Also returns if the transport says no more events will come. There is no
    /// timeout.
    pub fn run(&mut self) -> ConnectionState {
        while self.state() != ConnectionState::Closed {
            match self.socket.wait_event() {
                Some(event) => {
                    self.handle_event(event);
                }
                None => {
                    debug!("Transport has no more events in {:?}", self.state());
                    break;
                }
            }
        }

        self.state()
    }
}

impl Machine {
    fn state(&self) -> ConnectionState {
        self.phase.state()
    }

    /// Replace the phase, returning the previous one.
    fn enter(&mut self, phase: Phase) -> Phase {
        let previous = mem::replace(&mut self.phase, phase);
        debug!(
            "Connection<{:?}> -> Connection<{:?}>",
            previous.state(),
            self.state()
        );
        previous
    }

    fn enter_waiting_for_response(&mut self) {
        self.phase = match mem::replace(&mut self.phase, Phase::Ready) {
            Phase::SendingRequest(exchange) => Phase::WaitingForResponse(exchange),
            other => other,
        };
        debug!("Connection<SendingRequest> -> Connection<WaitingForResponse>");
    }

    /// Close and hand the outcome to whichever callback is still around.
    fn complete<T: Transport>(
        &mut self,
        socket: &mut SocketAdapter<T>,
        outcome: Result<ResponseMessage, Error>,
        reason: CloseReason,
    ) {
        if self.state() == ConnectionState::Closed {
            return;
        }

        let previous = self.enter(Phase::Closed);
        self.close_reason = Some(reason);
        debug!("Connection closed: {}", reason);

        socket.close();

        let exchange = match previous {
            Phase::SendingRequest(v) | Phase::WaitingForResponse(v) => v,
            Phase::Ready | Phase::Closed => return,
        };

        match outcome {
            Ok(response) => (exchange.on_success)(response),
            Err(e) => (exchange.on_error)(e),
        }
    }

    fn exchange_mut(&mut self) -> Option<&mut Exchange> {
        match &mut self.phase {
            Phase::SendingRequest(v) | Phase::WaitingForResponse(v) => Some(v),
            Phase::Ready | Phase::Closed => None,
        }
    }
}

impl Phase {
    fn state(&self) -> ConnectionState {
        match self {
            Phase::Ready => ConnectionState::Ready,
            Phase::SendingRequest(_) => ConnectionState::SendingRequest,
            Phase::WaitingForResponse(_) => ConnectionState::WaitingForResponse,
            Phase::Closed => ConnectionState::Closed,
        }
    }
}

impl<T: Transport> SocketObserver<T> for Machine {
    fn on_sent(&mut self, socket: &mut SocketAdapter<T>, amount: usize) {
        let Phase::SendingRequest(exchange) = &mut self.phase else {
            debug!("Ignore sent({}) when not sending", amount);
            return;
        };

        exchange.sent = exchange.sent.saturating_add(amount).min(exchange.request.len());

        if exchange.sent < exchange.request.len() {
            trace!(
                "Partial send, {} of {} bytes",
                exchange.sent,
                exchange.request.len()
            );
            socket.send(&exchange.request[exchange.sent..]);
            return;
        }

        self.enter_waiting_for_response();
    }

    fn on_received(&mut self, socket: &mut SocketAdapter<T>, data: &[u8]) {
        let Some(exchange) = self.exchange_mut() else {
            debug!("Ignore {} received bytes without request", data.len());
            return;
        };

        exchange.buffer.extend(data);

        match exchange.buffer.try_decode() {
            Ok(None) => {}
            Ok(Some(response)) => {
                self.complete(socket, Ok(response), CloseReason::Completed);
            }
            Err(e) => {
                self.complete(socket, Err(e), CloseReason::ProtocolError);
            }
        }
    }

    fn on_error(&mut self, socket: &mut SocketAdapter<T>, description: &str) {
        if self.exchange_mut().is_none() {
            debug!("Ignore transport error without request: {}", description);
            return;
        }

        let error = Error::Transport(description.to_string());
        self.complete(socket, Err(error), CloseReason::TransportError);
    }

    fn on_closed(&mut self, socket: &mut SocketAdapter<T>) {
        // A close delimited body ends here.
        let outcome = match self.exchange_mut() {
            Some(exchange) => exchange.buffer.finish(),
            None => {
                debug!("Ignore transport close without request");
                return;
            }
        };

        let reason = match &outcome {
            Ok(_) => CloseReason::Completed,
            Err(Error::IncompleteResponse) => CloseReason::PrematureClose,
            Err(_) => CloseReason::ProtocolError,
        };

        self.complete(socket, outcome, reason);
    }
}

impl<T> fmt::Debug for Connection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Connection<{:?}>", self.machine.phase.state())
    }
}

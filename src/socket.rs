use std::fmt;

use crate::util::log_data;

/// Something that happened on a [`Transport`].
#[derive(Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// This many bytes of the last [`send`][Transport::send] were written.
    ///
    /// This can be fewer than were given. The rest are not queued by the transport
    /// and must be sent again.
    Sent(usize),

    /// Bytes arrived from the remote side.
    Received(Vec<u8>),

    /// The transport failed. No further events are expected except possibly `Closed`.
    Error(String),

    /// The transport is closed.
    Closed,
}

/// A bidirectional byte stream, plain or TLS wrapped.
///
/// None of the methods block. What happens as a result of calling them is reported
/// as [`TransportEvent`], which the owner pulls out with
/// [`poll_event`][Transport::poll_event] one at a time.
pub trait Transport {
    /// Start connecting.
    ///
    /// Whether it worked is only known from later events.
    fn open(&mut self, host: &str, port: u16, tls: bool);

    /// Start writing bytes.
    ///
    /// Completion is reported as [`TransportEvent::Sent`].
    fn send(&mut self, data: &[u8]);

    /// Tear down the stream.
    fn close(&mut self);

    /// Next pending event, if any.
    fn poll_event(&mut self) -> Option<TransportEvent>;

    /// Next event, waiting for one if the transport can.
    ///
    /// `None` means no more events will come. The default does not wait.
    fn wait_event(&mut self) -> Option<TransportEvent> {
        self.poll_event()
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn open(&mut self, host: &str, port: u16, tls: bool) {
        (**self).open(host, port, tls)
    }

    fn send(&mut self, data: &[u8]) {
        (**self).send(data)
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn poll_event(&mut self) -> Option<TransportEvent> {
        (**self).poll_event()
    }

    fn wait_event(&mut self) -> Option<TransportEvent> {
        (**self).wait_event()
    }
}

/// Receiver of events relayed by a [`SocketAdapter`].
///
/// The adapter is handed back in each call so the observer can send or close in
/// response.
pub trait SocketObserver<T> {
    /// Bytes were written.
    fn on_sent(&mut self, socket: &mut SocketAdapter<T>, amount: usize);

    /// Bytes were received.
    fn on_received(&mut self, socket: &mut SocketAdapter<T>, data: &[u8]);

    /// The transport failed.
    fn on_error(&mut self, socket: &mut SocketAdapter<T>, description: &str);

    /// The transport closed. This is the last call.
    fn on_closed(&mut self, socket: &mut SocketAdapter<T>);
}

/// Owns one transport and relays its events to one observer.
///
/// The adapter does not buffer or interpret anything. It only makes sure the
/// transport is closed at most once, and that nothing is relayed before `open` or
/// after `Closed`.
pub struct SocketAdapter<T> {
    transport: T,
    opened: bool,
    closing: bool,
    closed: bool,
}

impl<T: Transport> SocketAdapter<T> {
    /// Wrap a transport that is not yet open.
    pub fn new(transport: T) -> Self {
        SocketAdapter {
            transport,
            opened: false,
            closing: false,
            closed: false,
        }
    }

    /// Start connecting the transport.
    pub fn open(&mut self, host: &str, port: u16, tls: bool) {
        if self.opened || self.closing {
            debug!("Ignore open of used socket");
            return;
        }
        debug!("Open {}:{} tls: {}", host, port, tls);
        self.opened = true;
        self.transport.open(host, port, tls);
    }

    /// Start writing bytes.
    ///
    /// Dropped if the socket is closing.
    pub fn send(&mut self, data: &[u8]) {
        if self.closing {
            debug!("Drop send of {} bytes on closing socket", data.len());
            return;
        }
        trace!("Send {} bytes", data.len());
        self.transport.send(data);
    }

    /// Close the transport.
    ///
    /// Can be called any number of times, the transport is only closed once.
    pub fn close(&mut self) {
        if self.closing {
            return;
        }
        debug!("Close socket");
        self.closing = true;
        self.transport.close();
    }

    /// Whether `close()` was called or the transport already reported closing.
    pub fn is_closing(&self) -> bool {
        self.closing
    }

    /// Whether the `Closed` event has been relayed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Relay one event to the observer.
    ///
    /// Returns `false` if the event was dropped because the socket was never opened
    /// or already closed.
    pub fn deliver<O>(&mut self, event: TransportEvent, observer: &mut O) -> bool
    where
        O: SocketObserver<T> + ?Sized,
    {
        if !self.opened {
            debug!("Drop event on unopened socket: {:?}", event);
            return false;
        }

        if self.closed {
            debug!("Drop event after close: {:?}", event);
            return false;
        }

        match event {
            TransportEvent::Sent(n) => observer.on_sent(self, n),
            TransportEvent::Received(data) => {
                log_data(&data);
                observer.on_received(self, &data);
            }
            TransportEvent::Error(description) => {
                debug!("Transport error: {}", description);
                observer.on_error(self, &description);
            }
            TransportEvent::Closed => {
                // The transport closed by itself, no need to close it again.
                self.closing = true;
                self.closed = true;
                observer.on_closed(self);
            }
        }

        true
    }

    /// Next pending event from the transport.
    pub fn poll_event(&mut self) -> Option<TransportEvent> {
        if self.closed {
            return None;
        }
        self.transport.poll_event()
    }

    /// Next event from the transport, waiting if the transport can.
    pub fn wait_event(&mut self) -> Option<TransportEvent> {
        if self.closed {
            return None;
        }
        self.transport.wait_event()
    }

    /// The wrapped transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl fmt::Debug for TransportEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sent(n) => write!(f, "Sent({})", n),
            Self::Received(v) => write!(f, "Received({} bytes)", v.len()),
            Self::Error(e) => write!(f, "Error({:?})", e),
            Self::Closed => write!(f, "Closed"),
        }
    }
}

impl<T> fmt::Debug for SocketAdapter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketAdapter")
            .field("opened", &self.opened)
            .field("closing", &self.closing)
            .field("closed", &self.closed)
            .finish()
    }
}

//! Plain TCP [`Transport`] on background threads.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;

use crate::{Transport, TransportEvent};

const READ_BUFFER_SIZE: usize = 16 * 1024;

/// Transport over a [`TcpStream`](std::net::TcpStream).
///
/// Connecting and writing happen on one thread, reading on another. Both report
/// back through a channel that [`poll_event`][Transport::poll_event] and
/// [`wait_event`][Transport::wait_event] read from, so the connection itself
/// stays single threaded.
///
/// There is no TLS. Opening with `tls = true` fails with an error event.
pub struct TcpTransport {
    events_tx: Sender<TransportEvent>,
    events: Receiver<TransportEvent>,
    commands: Option<Sender<Command>>,
}

enum Command {
    Send(Vec<u8>),
    Close,
}

impl TcpTransport {
    /// New transport, not yet connected.
    pub fn new() -> Self {
        let (events_tx, events) = mpsc::channel();
        TcpTransport {
            events_tx,
            events,
            commands: None,
        }
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for TcpTransport {
    fn open(&mut self, host: &str, port: u16, tls: bool) {
        if tls {
            let error = "tls is not supported by TcpTransport".to_string();
            let _ = self.events_tx.send(TransportEvent::Error(error));
            return;
        }

        let (commands_tx, commands) = mpsc::channel();
        let events = self.events_tx.clone();
        let host = host.to_string();

        let spawned = thread::Builder::new()
            .name("h1wire-io".into())
            .spawn(move || connect_and_write(&host, port, commands, events));

        match spawned {
            Ok(_) => self.commands = Some(commands_tx),
            Err(e) => {
                let _ = self.events_tx.send(TransportEvent::Error(e.to_string()));
            }
        }
    }

    fn send(&mut self, data: &[u8]) {
        match &self.commands {
            Some(tx) => {
                if tx.send(Command::Send(data.to_vec())).is_err() {
                    trace!("Writer is gone, drop {} bytes", data.len());
                }
            }
            None => {
                let _ = self
                    .events_tx
                    .send(TransportEvent::Error("not connected".to_string()));
            }
        }
    }

    fn close(&mut self) {
        if let Some(tx) = self.commands.take() {
            let _ = tx.send(Command::Close);
        }
    }

    fn poll_event(&mut self) -> Option<TransportEvent> {
        match self.events.try_recv() {
            Ok(v) => Some(v),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    fn wait_event(&mut self) -> Option<TransportEvent> {
        // Without a writer thread nothing more will arrive, only drain.
        if self.commands.is_none() {
            return self.poll_event();
        }
        self.events.recv().ok()
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        self.close();
    }
}

fn connect_and_write(
    host: &str,
    port: u16,
    commands: Receiver<Command>,
    events: Sender<TransportEvent>,
) {
    let mut stream = match TcpStream::connect((host, port)) {
        Ok(v) => v,
        Err(e) => {
            debug!("Connect to {}:{} failed: {}", host, port, e);
            let _ = events.send(TransportEvent::Error(e.to_string()));
            return;
        }
    };
    debug!("Connected to {}:{}", host, port);

    let reader = match stream.try_clone() {
        Ok(v) => v,
        Err(e) => {
            let _ = events.send(TransportEvent::Error(e.to_string()));
            return;
        }
    };

    let reader_events = events.clone();
    if let Err(e) = thread::Builder::new()
        .name("h1wire-read".into())
        .spawn(move || read_until_closed(reader, reader_events))
    {
        let _ = events.send(TransportEvent::Error(e.to_string()));
        return;
    }

    // A disconnected command channel means the transport was dropped.
    while let Ok(command) = commands.recv() {
        match command {
            Command::Send(data) => {
                let event = match write_once(&mut stream, &data) {
                    Ok(n) => TransportEvent::Sent(n),
                    Err(e) => TransportEvent::Error(e.to_string()),
                };
                let failed = matches!(event, TransportEvent::Error(_));
                let _ = events.send(event);
                if failed {
                    break;
                }
            }
            Command::Close => break,
        }
    }

    debug!("Shut down {}:{}", host, port);
    let _ = stream.shutdown(Shutdown::Both);
}

fn write_once(stream: &mut TcpStream, data: &[u8]) -> io::Result<usize> {
    loop {
        match stream.write(data) {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            r => return r,
        }
    }
}

fn read_until_closed(mut stream: TcpStream, events: Sender<TransportEvent>) {
    let mut buf = vec![0; READ_BUFFER_SIZE];

    loop {
        let event = match stream.read(&mut buf) {
            Ok(0) => TransportEvent::Closed,
            Ok(n) => TransportEvent::Received(buf[..n].to_vec()),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => TransportEvent::Error(e.to_string()),
        };

        let last = !matches!(event, TransportEvent::Received(_));
        if events.send(event).is_err() || last {
            break;
        }
    }

    trace!("Reader done");
}

//! Connections addressed by id.

use std::collections::BTreeMap;

use crate::{Connection, ConnectionState, Error, RequestSpec, ResponseMessage};
use crate::{Target, Transport};

/// Handle for a connection held by a [`Registry`].
pub type ConnectionId = u64;

/// Owns any number of [`Connection`], each known by a [`ConnectionId`].
///
/// For callers that can't hold on to a `Connection` themselves and instead pass
/// an id around. Ids are never reused.
pub struct Registry<T> {
    connections: BTreeMap<ConnectionId, Connection<T>>,
    next_id: ConnectionId,
}

impl<T: Transport> Registry<T> {
    /// Empty registry. The first id handed out is 1.
    pub fn new() -> Self {
        Registry {
            connections: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Add a connection to `url` using `transport`.
    pub fn create(&mut self, url: &str, transport: T) -> Result<ConnectionId, Error> {
        let target = Target::from_url(url)?;
        Ok(self.insert(Connection::new(target, transport)))
    }

    /// Add an already constructed connection.
    pub fn insert(&mut self, connection: Connection<T>) -> ConnectionId {
        let id = self.next_id;
        self.next_id += 1;

        debug!("Register connection {}: {:?}", id, connection);
        self.connections.insert(id, connection);

        id
    }

    /// Make the request on connection `id`.
    ///
    /// See [`Connection::request`].
    pub fn request<S, E>(
        &mut self,
        id: ConnectionId,
        spec: RequestSpec,
        on_success: S,
        on_error: E,
    ) -> Result<(), Error>
    where
        S: FnOnce(ResponseMessage) + 'static,
        E: FnOnce(Error) + 'static,
    {
        let connection = self
            .connections
            .get_mut(&id)
            .ok_or(Error::UnknownConnection(id))?;

        connection.request(spec, on_success, on_error)
    }

    /// State of connection `id`, if there is one.
    pub fn state(&self, id: ConnectionId) -> Option<ConnectionState> {
        self.connections.get(&id).map(|c| c.state())
    }

    /// Borrow connection `id`.
    pub fn get_mut(&mut self, id: ConnectionId) -> Option<&mut Connection<T>> {
        self.connections.get_mut(&id)
    }

    /// Close connection `id` and forget it.
    ///
    /// Returns `false` if there was no such connection.
    pub fn destroy(&mut self, id: ConnectionId) -> bool {
        match self.connections.remove(&id) {
            Some(mut connection) => {
                connection.close();
                debug!("Destroyed connection {}", id);
                true
            }
            None => false,
        }
    }

    /// Handle pending events on every connection, without waiting.
    ///
    /// Returns the total number of events handled.
    pub fn poll(&mut self) -> usize {
        self.connections.values_mut().map(|c| c.poll()).sum()
    }

    /// Number of connections, closed or not.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Whether there are no connections.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

impl<T: Transport> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::connection::test::scenario::{Call, MockTransport};
    use crate::TransportEvent;

    const RESPONSE: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok";

    #[test]
    fn ids_start_at_one_and_increase() {
        let mut registry = Registry::new();
        assert!(registry.is_empty());

        let a = registry
            .create("http://a.test/", MockTransport::new())
            .unwrap();
        let b = registry
            .create("http://b.test/", MockTransport::new())
            .unwrap();

        assert_eq!(a, 1);
        assert_eq!(b, 2);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.state(a), Some(ConnectionState::Ready));
    }

    #[test]
    fn create_with_bad_url() {
        let mut registry = Registry::new();
        let err = registry
            .create("not a url", MockTransport::new())
            .unwrap_err();

        assert!(matches!(err, Error::BadUrl(_)));
        assert!(registry.is_empty());
    }

    #[test]
    fn ids_are_not_reused() {
        let mut registry = Registry::new();
        let a = registry
            .create("http://a.test/", MockTransport::new())
            .unwrap();

        assert!(registry.destroy(a));
        assert!(!registry.destroy(a));

        let b = registry
            .create("http://b.test/", MockTransport::new())
            .unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn request_and_poll() {
        let mut transport = MockTransport::new();
        let log = transport.log();
        transport.push_event(TransportEvent::Sent(1000));
        transport.push_event(TransportEvent::Received(RESPONSE.to_vec()));

        let mut registry = Registry::new();
        let id = registry.create("http://a.test:8080/x", transport).unwrap();

        let body = Rc::new(RefCell::new(None));
        let sink = body.clone();
        registry
            .request(
                id,
                RequestSpec::new("GET"),
                move |r| *sink.borrow_mut() = Some(r.into_body()),
                |e| panic!("{}", e),
            )
            .unwrap();

        assert_eq!(registry.state(id), Some(ConnectionState::SendingRequest));
        assert_eq!(log.borrow().calls[0], Call::Open("a.test".into(), 8080, false));

        assert_eq!(registry.poll(), 2);
        assert_eq!(registry.state(id), Some(ConnectionState::Closed));
        assert_eq!(body.borrow().as_deref(), Some("ok"));

        // Closed connections stay until destroyed.
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn destroy_cancels_in_flight_request() {
        let mut transport = MockTransport::new();
        let log = transport.log();
        transport.push_event(TransportEvent::Received(RESPONSE.to_vec()));

        let mut registry = Registry::new();
        let id = registry.create("http://a.test/", transport).unwrap();

        registry
            .request(
                id,
                RequestSpec::new("GET"),
                |_| panic!("must not be called"),
                |_| panic!("must not be called"),
            )
            .unwrap();

        assert!(registry.destroy(id));
        assert_eq!(log.borrow().close_count(), 1);
        assert_eq!(registry.state(id), None);
        assert_eq!(registry.poll(), 0);
    }

    #[test]
    fn second_request_on_same_id() {
        let mut registry = Registry::new();
        let id = registry
            .create("http://a.test/", MockTransport::new())
            .unwrap();

        registry
            .request(id, RequestSpec::new("GET"), |_| {}, |_| {})
            .unwrap();
        let err = registry
            .request(id, RequestSpec::new("GET"), |_| {}, |_| {})
            .unwrap_err();

        assert_eq!(err, Error::NotReady(ConnectionState::SendingRequest));
    }
}

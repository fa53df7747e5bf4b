//! crates/logging-sink/src/remote.rs
//! Sink that mirrors records and scope tables to a remote observer.

use std::io;

use logging::{DataOrigin, LogRecord};
use protocol::{Routing, WireBody, WireMessage};

use crate::sink::{LogSink, SinkKind, SinkNotice, not_open};

/// Connection-oriented channel to an observer.
///
/// The sink drives the transport; it never implements the connection itself.
pub trait Transport: Send {
    /// Establishes the connection and returns its cookie.
    fn connect(&mut self) -> io::Result<u64>;

    /// Sends one encoded message.
    fn send(&mut self, frame: &[u8]) -> io::Result<()>;

    /// Pushes buffered bytes to the peer.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Tears the connection down.
    fn disconnect(&mut self);
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn connect(&mut self) -> io::Result<u64> {
        (**self).connect()
    }

    fn send(&mut self, frame: &[u8]) -> io::Result<()> {
        (**self).send(frame)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }

    fn disconnect(&mut self) {
        (**self).disconnect();
    }
}

/// Instance ids used in the routing header of outgoing messages.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RemoteEndpoint {
    /// Id of this instance.
    pub local_id: u32,
    /// Id of the observer.
    pub observer_id: u32,
}

/// Encodes records and scope notices as wire messages on a [`Transport`].
///
/// Records are stamped with the connection cookie and routing ids before
/// they are sent. A send failure drops the connection; the sink then
/// reports closed until it is opened again.
#[derive(Debug)]
pub struct RemoteSink<T> {
    transport: T,
    endpoint: RemoteEndpoint,
    cookie: Option<u64>,
    sequence: u32,
    frame: Vec<u8>,
}

impl<T: Transport> RemoteSink<T> {
    /// Creates a closed sink over `transport`.
    pub fn new(transport: T, endpoint: RemoteEndpoint) -> Self {
        Self {
            transport,
            endpoint,
            cookie: None,
            sequence: 0,
            frame: Vec::new(),
        }
    }

    /// Cookie of the current connection.
    #[must_use]
    pub const fn cookie(&self) -> Option<u64> {
        self.cookie
    }

    /// Routing ids stamped into outgoing messages.
    #[must_use]
    pub const fn endpoint(&self) -> RemoteEndpoint {
        self.endpoint
    }

    /// Borrows the transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    fn send_body(&mut self, body: WireBody) -> io::Result<()> {
        if self.cookie.is_none() {
            return Err(not_open(SinkKind::Remote));
        }
        let routing = Routing::new(self.endpoint.observer_id, self.endpoint.local_id, self.sequence);
        self.sequence = self.sequence.wrapping_add(1);

        self.frame.clear();
        WireMessage::new(routing, body).encode_into(&mut self.frame)?;
        if let Err(error) = self.transport.send(&self.frame) {
            tracing::warn!(%error, "remote observer connection lost");
            self.close();
            return Err(error);
        }
        Ok(())
    }
}

impl<T: Transport> LogSink for RemoteSink<T> {
    fn kind(&self) -> SinkKind {
        SinkKind::Remote
    }

    fn open(&mut self) -> io::Result<()> {
        if self.cookie.is_some() {
            return Ok(());
        }
        let cookie = self.transport.connect()?;
        tracing::debug!(cookie, observer = self.endpoint.observer_id, "remote observer connected");
        self.cookie = Some(cookie);
        self.sequence = 0;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.cookie.is_some()
    }

    fn write(&mut self, record: &LogRecord) -> io::Result<()> {
        let Some(cookie) = self.cookie else {
            return Err(not_open(SinkKind::Remote));
        };
        let mut outgoing = record.clone();
        outgoing.data_origin = DataOrigin::Remote;
        outgoing.source_id = self.endpoint.local_id;
        outgoing.target_id = self.endpoint.observer_id;
        outgoing.connection_cookie = cookie;
        self.send_body(WireBody::LogMessage(Box::new(outgoing)))
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.cookie.is_some() {
            self.transport.flush()
        } else {
            Ok(())
        }
    }

    fn close(&mut self) {
        if self.cookie.take().is_some() {
            let _ = self.transport.flush();
            self.transport.disconnect();
        }
    }

    fn buffered(&self) -> bool {
        true
    }

    fn notify(&mut self, notice: &SinkNotice) -> io::Result<()> {
        let body = match notice {
            SinkNotice::ScopesRegistered(scopes) => WireBody::RegisterScopes(scopes.clone()),
            SinkNotice::ScopesUpdated(scopes) => WireBody::ScopesUpdated(scopes.clone()),
            SinkNotice::ConfigurationSaved => WireBody::ConfigurationSaved,
        };
        self.send_body(body)
    }
}

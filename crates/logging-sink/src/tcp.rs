//! crates/logging-sink/src/tcp.rs
//! TCP transport for the remote sink.

use std::io::{self, BufWriter, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use crate::remote::Transport;

/// Default bound on connecting to the observer.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Buffered TCP connection to an observer.
///
/// The connection cookie combines this process id with the local port, so
/// it distinguishes reconnects of the same process.
#[derive(Debug)]
pub struct TcpTransport {
    addr: SocketAddr,
    connect_timeout: Duration,
    stream: Option<BufWriter<TcpStream>>,
}

impl TcpTransport {
    /// Creates a disconnected transport for `addr`.
    #[must_use]
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            stream: None,
        }
    }

    /// Overrides the connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Observer address.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }
}

impl Transport for TcpTransport {
    fn connect(&mut self) -> io::Result<u64> {
        let stream = TcpStream::connect_timeout(&self.addr, self.connect_timeout)?;
        stream.set_nodelay(true)?;
        let port = stream.local_addr()?.port();
        self.stream = Some(BufWriter::new(stream));
        Ok((u64::from(std::process::id()) << 16) | u64::from(port))
    }

    fn send(&mut self, frame: &[u8]) -> io::Result<()> {
        match self.stream.as_mut() {
            Some(stream) => stream.write_all(frame),
            None => Err(io::ErrorKind::NotConnected.into()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.stream.as_mut() {
            Some(stream) => stream.flush(),
            None => Ok(()),
        }
    }

    fn disconnect(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.flush();
            if let Ok(stream) = stream.into_inner() {
                let _ = stream.shutdown(std::net::Shutdown::Both);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LogSink, RemoteEndpoint, RemoteSink};
    use logging::{LogRecord, ScopeId, Severity};
    use protocol::{WireBody, read_message};
    use std::net::TcpListener;

    #[test]
    fn records_reach_a_listening_observer() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        let observer = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            read_message(&mut stream).expect("message")
        });

        let mut sink = RemoteSink::new(
            TcpTransport::new(addr),
            RemoteEndpoint {
                local_id: 2,
                observer_id: 1,
            },
        );
        sink.open().expect("connect");
        sink.write(&LogRecord::text(ScopeId::of("tcp"), Severity::Info, "over tcp"))
            .expect("write");
        sink.close();

        let message = observer.join().expect("observer joins");
        let WireBody::LogMessage(record) = message.body else {
            panic!("expected log message");
        };
        assert_eq!(record.message.as_str(), "over tcp");
    }

    #[test]
    fn connect_to_closed_port_fails() {
        let addr = TcpListener::bind("127.0.0.1:0")
            .expect("bind")
            .local_addr()
            .expect("addr");
        let mut transport =
            TcpTransport::new(addr).with_connect_timeout(Duration::from_millis(200));
        assert!(transport.connect().is_err());
        assert!(transport.send(b"x").is_err());
    }
}

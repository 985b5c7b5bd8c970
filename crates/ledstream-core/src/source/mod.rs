use std::io::ErrorKind;
use std::net::{Ipv4Addr, UdpSocket};

use log::info;
use thiserror::Error;

/// Non-blocking datagram input feeding the realtime effect.
///
/// `try_recv` never blocks: `Ok(None)` means nothing was pending this tick.
pub trait DatagramSource: Sized {
    /// Bind the source for the given UDP port. Not retried on failure.
    fn open(port: u16) -> Result<Self, SourceError>;

    /// Drain at most one pending datagram into `buf`.
    fn try_recv(&mut self, buf: &mut [u8]) -> Result<Option<usize>, SourceError>;
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("socket unavailable on port {port}: {source}")]
    SocketUnavailable {
        port: u16,
        #[source]
        source: std::io::Error,
    },
    #[error("receive failed: {0}")]
    Recv(#[from] std::io::Error),
}

/// UDP socket source. The socket is owned exclusively and released on drop.
#[derive(Debug)]
pub struct UdpDatagramSource {
    socket: UdpSocket,
}

impl UdpDatagramSource {
    /// Local address the socket actually bound to (useful with port 0).
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.socket.local_addr()
    }
}

impl DatagramSource for UdpDatagramSource {
    fn open(port: u16) -> Result<Self, SourceError> {
        let bind = |port| -> std::io::Result<UdpSocket> {
            let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, port))?;
            socket.set_nonblocking(true)?;
            Ok(socket)
        };
        let socket = bind(port).map_err(|source| SourceError::SocketUnavailable { port, source })?;
        if let Ok(addr) = socket.local_addr() {
            info!("listening for realtime frames on {addr}");
        }
        Ok(Self { socket })
    }

    fn try_recv(&mut self, buf: &mut [u8]) -> Result<Option<usize>, SourceError> {
        match self.socket.recv(buf) {
            Ok(received) => Ok(Some(received)),
            Err(err) if err.kind() == ErrorKind::WouldBlock => Ok(None),
            Err(err) => Err(SourceError::Recv(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::{Ipv4Addr, UdpSocket};

    use super::{DatagramSource, SourceError, UdpDatagramSource};

    #[test]
    fn open_ephemeral_port_and_poll_empty() {
        let mut source = UdpDatagramSource::open(0).expect("bind ephemeral port");
        let mut buf = [0u8; 16];
        assert!(matches!(source.try_recv(&mut buf), Ok(None)));
    }

    #[test]
    fn receives_a_sent_datagram() {
        let mut source = UdpDatagramSource::open(0).expect("bind ephemeral port");
        let addr = source.local_addr().expect("local addr");

        let sender = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).expect("bind sender");
        sender
            .send_to(&[2, 0, 10, 20, 30], (Ipv4Addr::LOCALHOST, addr.port()))
            .expect("send");

        let mut buf = [0u8; 16];
        let mut received = None;
        for _ in 0..200 {
            if let Some(len) = source.try_recv(&mut buf).expect("recv") {
                received = Some(len);
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(1));
        }
        assert_eq!(received, Some(5));
        assert_eq!(&buf[..5], &[2, 0, 10, 20, 30]);
    }

    #[test]
    fn bind_conflict_is_socket_unavailable() {
        let holder = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).expect("bind holder");
        let port = holder.local_addr().expect("addr").port();
        match UdpDatagramSource::open(port) {
            Err(SourceError::SocketUnavailable { port: p, .. }) => assert_eq!(p, port),
            // Some platforms allow the overlapping wildcard bind.
            Ok(_) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
}

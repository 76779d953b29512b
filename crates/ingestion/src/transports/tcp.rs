//! TCP transport

use std::io::BufReader;
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use contracts::{ConnectFailureKind, ContractError, DeviceRef, LinkCloser, Transport, TransportLink};
use tracing::debug;

/// Line stream over TCP
#[derive(Debug, Clone)]
pub struct TcpTransport {
    connect_timeout: Duration,
}

impl TcpTransport {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }

    fn open_error(device: &DeviceRef, err: &std::io::Error) -> ContractError {
        ContractError::transport_open(
            "tcp",
            device.address.clone(),
            ConnectFailureKind::from_io(err),
            err.to_string(),
        )
    }
}

impl Transport for TcpTransport {
    fn name(&self) -> &str {
        "tcp"
    }

    fn open(&self, device: &DeviceRef) -> Result<TransportLink, ContractError> {
        let addrs = device
            .address
            .to_socket_addrs()
            .map_err(|e| Self::open_error(device, &e))?;

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(stream) => {
                    debug!(%addr, "tcp link established");
                    let closer = stream
                        .try_clone()
                        .map_err(|e| Self::open_error(device, &e))?;
                    return Ok(TransportLink::new(
                        Box::new(BufReader::new(stream)),
                        Box::new(TcpCloser { stream: closer }),
                    ));
                }
                Err(e) => last_err = Some(e),
            }
        }

        Err(match last_err {
            Some(e) => Self::open_error(device, &e),
            None => ContractError::transport_open(
                "tcp",
                device.address.clone(),
                ConnectFailureKind::Transport,
                "address resolved to nothing",
            ),
        })
    }
}

struct TcpCloser {
    stream: TcpStream,
}

impl LinkCloser for TcpCloser {
    fn close(&self) -> std::io::Result<()> {
        match self.stream.shutdown(Shutdown::Both) {
            Err(e) if e.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, Write};
    use std::net::TcpListener;

    #[test]
    fn test_reads_lines_and_closes() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = std::thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            socket.write_all(b"{\"tmp\":1}\n").unwrap();
            // Keep the socket open until the client shuts down
            let mut buf = [0u8; 8];
            let _ = std::io::Read::read(&mut socket, &mut buf);
        });

        let transport = TcpTransport::new(Duration::from_secs(1));
        let mut link = transport.open(&DeviceRef::new(addr.to_string())).unwrap();

        let mut line = String::new();
        link.reader.read_line(&mut line).unwrap();
        assert_eq!(line, "{\"tmp\":1}\n");

        link.closer.close().unwrap();
        link.closer.close().unwrap();
        server.join().unwrap();
    }

    #[test]
    fn test_unresolvable_address_is_transport_error() {
        let transport = TcpTransport::new(Duration::from_millis(100));
        let err = transport
            .open(&DeviceRef::new("not an address"))
            .err()
            .unwrap();
        assert_eq!(
            err.connect_failure_kind(),
            Some(ConnectFailureKind::Transport)
        );
    }
}

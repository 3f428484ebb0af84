/// UDP socket construction.
///
/// Receive sockets carry a short read timeout so blocked receive loops
/// observe the shutdown flag; the loops treat `WouldBlock`/`TimedOut`
/// as a normal wakeup (Windows reports `TimedOut`, Unix `WouldBlock`).

use std::io;
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};

/// Read timeout on receive sockets.
pub const RECV_POLL: Duration = Duration::from_millis(100);

/// OS receive buffer size (4 MB) — enough to ride out scheduling stalls
/// at media bitrates.
pub const UDP_RECV_BUFFER: usize = 4 * 1024 * 1024;

/// Bind a receive socket with an enlarged OS buffer and the poll timeout.
pub fn bind_recv_socket(addr: SocketAddr) -> io::Result<UdpSocket> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };
    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_nonblocking(false)?;
    socket.set_recv_buffer_size(UDP_RECV_BUFFER)?;
    socket.set_read_timeout(Some(RECV_POLL))?;
    socket.bind(&addr.into())?;
    Ok(socket.into())
}

/// An unbound send-only socket (ephemeral port).
pub fn send_socket() -> io::Result<UdpSocket> {
    UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
}

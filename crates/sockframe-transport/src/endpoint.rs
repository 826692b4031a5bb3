use std::os::fd::{AsFd, AsRawFd, BorrowedFd, RawFd};

use sockframe_frame::{Packet, PacketBuffer};

use crate::address::Address;
use crate::datagram::DatagramEndpoint;
use crate::error::Result;
use crate::listener::Listener;
use crate::socket::Socket;
use crate::stream::StreamEndpoint;

/// Send and receive packets over a socket.
///
/// `flags: None` uses the endpoint's default flags. Every failure is reported
/// on the socket's reporter before it is returned.
pub trait PacketTransport {
    /// Send one packet. Stream endpoints ignore `to`.
    fn send_with(&self, packet: &Packet, to: Option<&Address>, flags: Option<i32>) -> Result<()>;

    /// Read into `buffer` until it holds at least one complete packet.
    ///
    /// Always reads at least once. Returns the address the last bytes came
    /// from (the peer address for streams).
    fn receive_with(&self, buffer: &mut PacketBuffer, flags: Option<i32>) -> Result<Address>;

    fn send(&self, packet: &Packet) -> Result<()> {
        self.send_with(packet, None, None)
    }

    fn send_to(&self, packet: &Packet, to: &Address) -> Result<()> {
        self.send_with(packet, Some(to), None)
    }

    fn receive(&self, buffer: &mut PacketBuffer) -> Result<()> {
        self.receive_with(buffer, None).map(|_| ())
    }

    fn receive_from(&self, buffer: &mut PacketBuffer) -> Result<Address> {
        self.receive_with(buffer, None)
    }
}

/// A stream or datagram endpoint.
///
/// Cloning shares the descriptor. Equality compares descriptors.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Stream(StreamEndpoint),
    Datagram(DatagramEndpoint),
}

impl Endpoint {
    pub fn socket(&self) -> &Socket {
        match self {
            Endpoint::Stream(stream) => stream.socket(),
            Endpoint::Datagram(datagram) => datagram.socket(),
        }
    }

    pub fn socket_mut(&mut self) -> &mut Socket {
        match self {
            Endpoint::Stream(stream) => stream.socket_mut(),
            Endpoint::Datagram(datagram) => datagram.socket_mut(),
        }
    }

    pub fn raw_fd(&self) -> RawFd {
        self.socket().raw_fd()
    }

    pub fn handle_count(&self) -> usize {
        self.socket().handle_count()
    }

    pub fn address(&self) -> Address {
        self.socket().address()
    }

    pub fn set_send_flags(&mut self, flags: i32) {
        self.socket_mut().set_send_flags(flags);
    }

    pub fn set_receive_flags(&mut self, flags: i32) {
        self.socket_mut().set_receive_flags(flags);
    }

    pub fn is_stream(&self) -> bool {
        matches!(self, Endpoint::Stream(_))
    }
}

impl PacketTransport for Endpoint {
    fn send_with(&self, packet: &Packet, to: Option<&Address>, flags: Option<i32>) -> Result<()> {
        match self {
            Endpoint::Stream(stream) => stream.send_with(packet, to, flags),
            Endpoint::Datagram(datagram) => datagram.send_with(packet, to, flags),
        }
    }

    fn receive_with(&self, buffer: &mut PacketBuffer, flags: Option<i32>) -> Result<Address> {
        match self {
            Endpoint::Stream(stream) => stream.receive_with(buffer, flags),
            Endpoint::Datagram(datagram) => datagram.receive_with(buffer, flags),
        }
    }
}

impl From<StreamEndpoint> for Endpoint {
    fn from(stream: StreamEndpoint) -> Self {
        Endpoint::Stream(stream)
    }
}

impl From<DatagramEndpoint> for Endpoint {
    fn from(datagram: DatagramEndpoint) -> Self {
        Endpoint::Datagram(datagram)
    }
}

impl From<&Endpoint> for Endpoint {
    fn from(endpoint: &Endpoint) -> Self {
        endpoint.clone()
    }
}

/// Watch a listener for incoming connections. Shares its descriptor.
impl From<&Listener> for Endpoint {
    fn from(listener: &Listener) -> Self {
        Endpoint::Stream(StreamEndpoint::from_socket(listener.socket().clone()))
    }
}

impl From<Listener> for Endpoint {
    fn from(listener: Listener) -> Self {
        Endpoint::from(&listener)
    }
}

impl PartialEq<Listener> for Endpoint {
    fn eq(&self, other: &Listener) -> bool {
        self.raw_fd() == other.raw_fd()
    }
}

impl AsRawFd for Endpoint {
    fn as_raw_fd(&self) -> RawFd {
        self.raw_fd()
    }
}

impl AsFd for Endpoint {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.socket().as_fd()
    }
}

#[cfg(test)]
mod tests {
    use sockframe_frame::Packet;

    use super::*;

    fn loopback() -> Address {
        Address::new("127.0.0.1", 0).unwrap()
    }

    #[test]
    fn dispatches_to_both_variants() {
        let listener = Listener::bind(loopback(), Listener::DEFAULT_BACKLOG).unwrap();
        let client: Endpoint = StreamEndpoint::connect(listener.local_address().unwrap())
            .unwrap()
            .into();
        let server: Endpoint = listener.accept().unwrap().into();

        client.send(&Packet::new(1, b"over tcp")).unwrap();
        let mut buffer = PacketBuffer::new();
        server.receive(&mut buffer).unwrap();
        assert_eq!(buffer.pop_packet().unwrap().payload(), b"over tcp");

        let receiver = DatagramEndpoint::bound(loopback()).unwrap();
        let target = receiver.socket().local_address().unwrap();
        let sender: Endpoint = DatagramEndpoint::new(target).unwrap().into();
        let receiver: Endpoint = receiver.into();

        sender.send(&Packet::new(2, b"over udp")).unwrap();
        let from = receiver.receive_from(&mut buffer).unwrap();
        assert_eq!(buffer.pop_packet().unwrap().payload(), b"over udp");
        assert_eq!(from.ip(), target.ip());
        assert!(!receiver.is_stream());
    }

    #[test]
    fn listener_conversion_shares_descriptor() {
        let listener = Listener::bind(loopback(), Listener::DEFAULT_BACKLOG).unwrap();
        let endpoint = Endpoint::from(&listener);

        assert!(endpoint == listener);
        assert_eq!(listener.socket().handle_count(), 2);
        assert_eq!(endpoint.clone(), endpoint);

        drop(endpoint);
        assert_eq!(listener.socket().handle_count(), 1);
    }
}

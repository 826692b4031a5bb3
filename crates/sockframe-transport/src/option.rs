/// Socket-level (`SOL_SOCKET`) options.
///
/// Flag options take 0 or 1; buffer options take a size in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketOption {
    ReuseAddr,
    KeepAlive,
    Broadcast,
    RecvBuffer,
    SendBuffer,
}

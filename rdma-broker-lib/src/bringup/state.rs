/// Per-connection bring-up state. Transitions are one-way; an error
/// at any step moves directly to `Closing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    TlsHandshake,
    PsnExchange,
    RdmaSetup,
    Connected,
    Closing,
}

//! Capability traits that stand between the core and the verbs library.
//! The core never calls a hardware verbs function directly; it only
//! ever holds `Arc<dyn ...>` handles to a thin adapter implementing these
//! traits, so a real backend (`transport::real`, feature `hardware`) and a
//! host-only backend (`transport::mock`, feature `mock`) are interchangeable.

use crate::error::Result;
use crate::protocol::EndpointDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkLayer {
    InfiniBand,
    Ethernet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessFlags {
    pub local_write: bool,
    pub remote_read: bool,
    pub remote_write: bool,
}

impl AccessFlags {
    pub const FULL: Self = Self { local_write: true, remote_read: true, remote_write: true };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortAttr {
    pub lid: u16,
    pub gid: [u8; 16],
    pub link_layer: LinkLayer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionStatus {
    Success,
    Error(u32),
}

#[derive(Debug, Clone, Copy)]
pub struct Completion {
    pub status: CompletionStatus,
    pub bytes: usize,
}

/// One registered memory region.
pub trait MemoryRegion: Send + Sync {
    fn rkey(&self) -> u32;
    fn lkey(&self) -> u32;
    fn addr(&self) -> u64;
}

/// The shared protection domain. Every MR and QP created through
/// the same `ProtectionDomain` can address one another.
pub trait ProtectionDomain: Send + Sync {
    fn register_mr(
        &self,
        buf: std::sync::Arc<std::sync::Mutex<Vec<u8>>>,
        access: AccessFlags,
    ) -> Result<Box<dyn MemoryRegion>>;
}

/// A completion queue; polled by a handler to learn work-request outcomes.
pub trait CompletionQueue: Send + Sync {
    /// Non-blocking poll. Returns `None` when no completion is ready.
    fn poll(&self) -> Result<Option<Completion>>;

    /// Backend-internal delivery hook. The core never calls this; it exists
    /// so a mock queue pair can hand a completion to a peer's receive CQ
    /// without the two sides sharing a real wire. Hardware backends leave
    /// the default no-op, since the NIC is what populates the queue.
    fn deliver(&self, _completion: Completion) {}
}

/// One queue pair, driven through RESET → INIT → RTR → RTS.
pub trait QueuePair: Send + Sync {
    fn qp_num(&self) -> u32;

    fn modify_to_init(&self, access: AccessFlags) -> Result<()>;

    /// `rq_psn` must be set from `remote_psn`, never the local PSN.
    fn modify_to_rtr(&self, remote: &EndpointDescriptor, link_layer: LinkLayer) -> Result<()>;

    /// `sq_psn` must be set from `local_psn`.
    fn modify_to_rts(&self, local_psn: u32) -> Result<()>;

    fn post_send(&self, buf: &[u8]) -> Result<()>;
    fn post_recv(&self) -> Result<()>;
    fn post_write(&self, buf: &[u8], remote_addr: u64, rkey: u32) -> Result<()>;
}

/// The opened device context and the resources allocated on it.
pub trait VerbsContext: Send + Sync {
    fn query_port(&self) -> Result<PortAttr>;
    fn alloc_pd(&self) -> Result<std::sync::Arc<dyn ProtectionDomain>>;
    fn create_cq(&self, capacity: usize) -> Result<std::sync::Arc<dyn CompletionQueue>>;
    #[allow(clippy::too_many_arguments)]
    fn create_qp(
        &self,
        pd: &std::sync::Arc<dyn ProtectionDomain>,
        send_cq: &std::sync::Arc<dyn CompletionQueue>,
        recv_cq: &std::sync::Arc<dyn CompletionQueue>,
        recv_mr: &dyn MemoryRegion,
        recv_buffer: std::sync::Arc<std::sync::Mutex<Vec<u8>>>,
        send_mr: &dyn MemoryRegion,
        send_buffer: std::sync::Arc<std::sync::Mutex<Vec<u8>>>,
    ) -> Result<std::sync::Arc<dyn QueuePair>>;
}

/// Opens device index 0 and fails fast if no device is reported.
pub trait VerbsProvider: Send + Sync {
    fn open_default_device(&self) -> Result<std::sync::Arc<dyn VerbsContext>>;
}

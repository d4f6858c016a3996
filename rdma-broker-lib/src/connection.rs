//! Per-connection record. Owns every resource the bring-up machine
//! allocates for one client and is the unit of teardown.

use std::sync::Arc;
use std::time::Instant;

use crate::bringup::ConnectionState;
use crate::protocol::EndpointDescriptor;
use crate::transport::verbs::{CompletionQueue, MemoryRegion, QueuePair};
use crate::transport::BufferSlab;

/// Everything the handler needs after bring-up completes, plus the live
/// control-plane channel the connection was admitted over.
pub struct Connection<S> {
    pub slot_id: usize,
    pub state: ConnectionState,
    pub tls_channel: S,

    pub local_psn: u32,
    pub remote_psn: u32,

    pub qp: Arc<dyn QueuePair>,
    pub send_cq: Arc<dyn CompletionQueue>,
    pub recv_cq: Arc<dyn CompletionQueue>,
    pub send_mr: Box<dyn MemoryRegion>,
    pub recv_mr: Box<dyn MemoryRegion>,
    pub buffers: BufferSlab,

    pub local_endpoint: EndpointDescriptor,
    pub remote_endpoint: EndpointDescriptor,

    pub connected_at: Instant,
    pub counters: ConnectionCounters,
}

/// Per-connection message/byte counters. Not shared outside the handler that
/// owns the connection, so plain fields are enough.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectionCounters {
    pub messages_sent: u64,
    pub messages_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub completion_errors: u64,
}

impl<S> Connection<S> {
    pub fn mark_closing(&mut self) {
        self.state = ConnectionState::Closing;
    }
}

//! Host-only mock verbs backend. It exists only so the bring-up machine,
//! codec, and lifecycle logic are testable without RDMA hardware; it is not
//! part of the core design. Every call below succeeds immediately,
//! mirroring the original C `mock_rdma.c` behavior.
//!
//! Two mock contexts opened against the same [`MockFabric`] behave as if
//! wired together: `post_send`/`post_write` on one queue pair deliver bytes
//! directly into the peer queue pair's registered buffers and enqueue a
//! completion on the peer's receive CQ, which is enough to drive the
//! bring-up state machine and operation primitives end-to-end in a test
//! process with no real device.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use super::verbs::{
    AccessFlags, Completion, CompletionQueue, CompletionStatus, LinkLayer, MemoryRegion, PortAttr,
    ProtectionDomain, QueuePair, VerbsContext, VerbsProvider,
};
use crate::error::{BrokerError, Result};
use crate::protocol::EndpointDescriptor;

struct MockPeer {
    recv_buffer: Arc<Mutex<Vec<u8>>>,
    recv_cq: Arc<dyn CompletionQueue>,
}

#[derive(Default)]
struct FabricState {
    qp_counter: AtomicU32,
    rkey_counter: AtomicU32,
    peers: Mutex<HashMap<u32, MockPeer>>,
    mrs: Mutex<HashMap<u32, Arc<Mutex<Vec<u8>>>>>,
}

/// A shared loopback "wire" that two (or more) mock device contexts can be
/// opened against so their queue pairs can address one another. Tests create
/// one `MockFabric` per simulated network and one [`MockProvider`] per role.
#[derive(Default, Clone)]
pub struct MockFabric {
    state: Arc<FabricState>,
}

impl MockFabric {
    pub fn new() -> Self {
        Self::default()
    }
}

pub struct MockProvider {
    fabric: MockFabric,
}

impl MockProvider {
    pub fn new(fabric: MockFabric) -> Self {
        Self { fabric }
    }
}

impl VerbsProvider for MockProvider {
    fn open_default_device(&self) -> Result<Arc<dyn VerbsContext>> {
        Ok(Arc::new(MockContext { fabric: self.fabric.clone() }))
    }
}

struct MockContext {
    fabric: MockFabric,
}

impl VerbsContext for MockContext {
    fn query_port(&self) -> Result<PortAttr> {
        Ok(PortAttr { lid: 1, gid: [0xfe; 16], link_layer: LinkLayer::Ethernet })
    }

    fn alloc_pd(&self) -> Result<Arc<dyn ProtectionDomain>> {
        Ok(Arc::new(MockPd { fabric: self.fabric.clone() }))
    }

    fn create_cq(&self, capacity: usize) -> Result<Arc<dyn CompletionQueue>> {
        Ok(Arc::new(MockCq::new(capacity)))
    }

    fn create_qp(
        &self,
        _pd: &Arc<dyn ProtectionDomain>,
        send_cq: &Arc<dyn CompletionQueue>,
        recv_cq: &Arc<dyn CompletionQueue>,
        _recv_mr: &dyn MemoryRegion,
        recv_buffer: Arc<Mutex<Vec<u8>>>,
        _send_mr: &dyn MemoryRegion,
        send_buffer: Arc<Mutex<Vec<u8>>>,
    ) -> Result<Arc<dyn QueuePair>> {
        let qp_num = self.fabric.state.qp_counter.fetch_add(1, Ordering::Relaxed) + 1;

        self.fabric
            .state
            .peers
            .lock()
            .unwrap()
            .insert(qp_num, MockPeer { recv_buffer: recv_buffer.clone(), recv_cq: recv_cq.clone() });

        Ok(Arc::new(MockQp {
            fabric: self.fabric.clone(),
            qp_num,
            dest_qp_num: Mutex::new(None),
            send_buffer,
            send_cq: send_cq.clone(),
        }))
    }
}

struct MockPd {
    fabric: MockFabric,
}

impl ProtectionDomain for MockPd {
    fn register_mr(
        &self,
        buf: Arc<Mutex<Vec<u8>>>,
        _access: AccessFlags,
    ) -> Result<Box<dyn MemoryRegion>> {
        let rkey = self.fabric.state.rkey_counter.fetch_add(1, Ordering::Relaxed) + 1;
        let addr = Arc::as_ptr(&buf) as u64;
        self.fabric.state.mrs.lock().unwrap().insert(rkey, buf);
        Ok(Box::new(MockMr { rkey, addr }))
    }
}

struct MockMr {
    rkey: u32,
    addr: u64,
}

impl MemoryRegion for MockMr {
    fn rkey(&self) -> u32 {
        self.rkey
    }
    fn lkey(&self) -> u32 {
        self.rkey
    }
    fn addr(&self) -> u64 {
        self.addr
    }
}

pub struct MockCq {
    queue: Mutex<VecDeque<Completion>>,
    #[allow(dead_code)]
    capacity: usize,
}

impl MockCq {
    fn new(capacity: usize) -> Self {
        Self { queue: Mutex::new(VecDeque::new()), capacity }
    }
}

impl CompletionQueue for MockCq {
    fn poll(&self) -> Result<Option<Completion>> {
        Ok(self.queue.lock().unwrap().pop_front())
    }

    fn deliver(&self, completion: Completion) {
        self.queue.lock().unwrap().push_back(completion);
    }
}

struct MockQp {
    fabric: MockFabric,
    qp_num: u32,
    dest_qp_num: Mutex<Option<u32>>,
    send_buffer: Arc<Mutex<Vec<u8>>>,
    send_cq: Arc<dyn CompletionQueue>,
}

impl QueuePair for MockQp {
    fn qp_num(&self) -> u32 {
        self.qp_num
    }

    fn modify_to_init(&self, _access: AccessFlags) -> Result<()> {
        Ok(())
    }

    fn modify_to_rtr(&self, remote: &EndpointDescriptor, _link_layer: LinkLayer) -> Result<()> {
        *self.dest_qp_num.lock().unwrap() = Some(remote.qp_num);
        Ok(())
    }

    fn modify_to_rts(&self, _local_psn: u32) -> Result<()> {
        Ok(())
    }

    fn post_send(&self, buf: &[u8]) -> Result<()> {
        let dest = self
            .dest_qp_num
            .lock()
            .unwrap()
            .ok_or_else(|| BrokerError::StateTransition("post_send before RTR".to_string()))?;

        {
            let mut local = self.send_buffer.lock().unwrap();
            local.clear();
            local.extend_from_slice(buf);
        }

        let peers = self.fabric.state.peers.lock().unwrap();
        let peer = peers
            .get(&dest)
            .ok_or_else(|| BrokerError::CompletionError { status: "peer unreachable".to_string() })?;
        peer.recv_buffer.lock().unwrap().clone_from(&buf.to_vec());
        peer.recv_cq.deliver(Completion { status: CompletionStatus::Success, bytes: buf.len() });

        self.send_cq.deliver(Completion { status: CompletionStatus::Success, bytes: buf.len() });
        Ok(())
    }

    fn post_recv(&self) -> Result<()> {
        Ok(())
    }

    fn post_write(&self, buf: &[u8], _remote_addr: u64, rkey: u32) -> Result<()> {
        let target = {
            let mrs = self.fabric.state.mrs.lock().unwrap();
            mrs.get(&rkey).cloned()
        };
        let target = target.ok_or_else(|| {
            BrokerError::CompletionError { status: format!("unknown rkey {rkey}") }
        })?;
        target.lock().unwrap().clone_from(&buf.to_vec());
        self.send_cq.deliver(Completion { status: CompletionStatus::Success, bytes: buf.len() });
        Ok(())
    }
}

//! Process-wide resources threaded through every connection handler. Held
//! behind one `Arc` so handlers can be spawned onto independent tasks
//! without cloning the resources themselves.

use crate::slots::SlotTable;
use crate::transport::verbs::VerbsProvider;
use crate::transport::{BufferPool, DevicePool};

pub struct SharedResources {
    pub device: DevicePool,
    pub buffers: BufferPool,
    pub slots: SlotTable,
}

impl SharedResources {
    pub fn init(provider: &dyn VerbsProvider, max_clients: usize, cq_fanout: usize) -> crate::error::Result<Self> {
        let device = DevicePool::init(provider, max_clients, cq_fanout)?;
        let buffers = BufferPool::new(max_clients);
        let slots = SlotTable::new(max_clients);
        Ok(Self { device, buffers, slots })
    }
}

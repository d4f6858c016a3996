//! Device / PD / CQ pool. Initialized once at server start, shared by
//! every connection for the life of the process; individual connections
//! never destroy these resources, only the per-connection QP and MRs.

use std::sync::Arc;

use super::verbs::{CompletionQueue, ProtectionDomain, VerbsContext, VerbsProvider};
use crate::error::Result;

/// Shared, process-wide transport resources.
pub struct DevicePool {
    context: Arc<dyn VerbsContext>,
    pd: Arc<dyn ProtectionDomain>,
    cqs: Vec<Arc<dyn CompletionQueue>>,
}

impl DevicePool {
    /// Opens device index 0, allocates the shared PD, and creates `fanout`
    /// completion queues each sized for `⌈max_clients / fanout⌉ + 1`
    /// completions. `fanout` is `cq_fanout` (`W`) from configuration.
    pub fn init(
        provider: &dyn VerbsProvider,
        max_clients: usize,
        fanout: usize,
    ) -> Result<Self> {
        let context = provider.open_default_device()?;
        let pd = context.alloc_pd()?;

        let per_cq = max_clients.div_ceil(fanout) + 1;
        let cqs = (0..fanout)
            .map(|_| context.create_cq(per_cq))
            .collect::<Result<Vec<_>>>()?;

        tracing::info!(fanout, per_cq, "device pool initialized");
        Ok(Self { context, pd, cqs })
    }

    pub fn context(&self) -> &Arc<dyn VerbsContext> {
        &self.context
    }

    pub fn pd(&self) -> &Arc<dyn ProtectionDomain> {
        &self.pd
    }

    /// Completion queue bound to `slot_id` (`slot_id mod W`).
    pub fn cq_for(&self, slot_id: usize) -> &Arc<dyn CompletionQueue> {
        &self.cqs[slot_id % self.cqs.len()]
    }

    pub fn fanout(&self) -> usize {
        self.cqs.len()
    }
}

impl Drop for DevicePool {
    fn drop(&mut self) {
        tracing::info!("device pool torn down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::{MockFabric, MockProvider};

    #[test]
    fn cq_assignment_wraps_around_fanout() {
        let provider = MockProvider::new(MockFabric::new());
        let pool = DevicePool::init(&provider, 10, 4).unwrap();
        assert_eq!(pool.fanout(), 4);

        let a = Arc::as_ptr(pool.cq_for(0));
        let b = Arc::as_ptr(pool.cq_for(4));
        assert_eq!(a, b, "slot 0 and slot 4 must share a CQ under fanout 4");

        let c = Arc::as_ptr(pool.cq_for(1));
        assert_ne!(a, c);
    }
}

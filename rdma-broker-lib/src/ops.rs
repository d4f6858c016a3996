//! Operation primitives: the only way the rest of the crate moves
//! bytes once a connection is `CONNECTED`. Completion polling is a busy-wait
//! with a short sleep between empty polls; a production deployment may arm
//! the completion channel and block on it instead.

use std::time::Duration;

use crate::error::{BrokerError, Result};
use crate::transport::verbs::{CompletionQueue, CompletionStatus, QueuePair};

const POLL_BACKOFF: Duration = Duration::from_millis(1);

async fn poll_until_completion(cq: &dyn CompletionQueue) -> Result<usize> {
    loop {
        match cq.poll()? {
            Some(completion) => {
                return match completion.status {
                    CompletionStatus::Success => Ok(completion.bytes),
                    CompletionStatus::Error(code) => {
                        Err(BrokerError::CompletionError { status: code.to_string() })
                    }
                };
            }
            None => tokio::time::sleep(POLL_BACKOFF).await,
        }
    }
}

/// Copies `data` into the send buffer, posts a signaled send WR, and blocks
/// until exactly one completion returns.
pub async fn post_send(qp: &dyn QueuePair, send_cq: &dyn CompletionQueue, data: &[u8]) -> Result<usize> {
    qp.post_send(data)?;
    poll_until_completion(send_cq).await
}

/// Posts an unsignaled receive WR pointing at the recv buffer. The caller
/// must post one receive per expected inbound message.
pub fn post_recv(qp: &dyn QueuePair) -> Result<()> {
    qp.post_recv()
}

/// Remote-write variant of [`post_send`]; only reachable when the connection
/// was admitted with remote-write explicitly enabled.
pub async fn post_write(
    qp: &dyn QueuePair,
    send_cq: &dyn CompletionQueue,
    data: &[u8],
    remote_addr: u64,
    rkey: u32,
) -> Result<usize> {
    qp.post_write(data, remote_addr, rkey)?;
    poll_until_completion(send_cq).await
}

/// Polls the recv CQ for an inbound message, then re-posts a receive so a
/// subsequent send does not stall.
pub async fn poll_recv(qp: &dyn QueuePair, recv_cq: &dyn CompletionQueue) -> Result<usize> {
    let bytes = poll_until_completion(recv_cq).await?;
    qp.post_recv()?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::{MockFabric, MockProvider};
    use crate::transport::verbs::{AccessFlags, LinkLayer, VerbsProvider};
    use std::sync::{Arc, Mutex};

    fn make_pair() -> (
        Arc<dyn QueuePair>,
        Arc<dyn CompletionQueue>,
        Arc<dyn QueuePair>,
        Arc<dyn CompletionQueue>,
    ) {
        let fabric = MockFabric::new();
        let provider = MockProvider::new(fabric);
        let ctx = provider.open_default_device().unwrap();
        let pd = ctx.alloc_pd().unwrap();

        let a_send_cq = ctx.create_cq(8).unwrap();
        let a_recv_cq = ctx.create_cq(8).unwrap();
        let b_send_cq = ctx.create_cq(8).unwrap();
        let b_recv_cq = ctx.create_cq(8).unwrap();

        let a_recv_buf = Arc::new(Mutex::new(vec![0u8; 4096]));
        let a_send_buf = Arc::new(Mutex::new(vec![0u8; 4096]));
        let b_recv_buf = Arc::new(Mutex::new(vec![0u8; 4096]));
        let b_send_buf = Arc::new(Mutex::new(vec![0u8; 4096]));

        let a_recv_mr = pd.register_mr(a_recv_buf.clone(), AccessFlags::FULL).unwrap();
        let a_send_mr = pd.register_mr(a_send_buf.clone(), AccessFlags::FULL).unwrap();
        let b_recv_mr = pd.register_mr(b_recv_buf.clone(), AccessFlags::FULL).unwrap();
        let b_send_mr = pd.register_mr(b_send_buf.clone(), AccessFlags::FULL).unwrap();

        let qp_a = ctx
            .create_qp(&pd, &a_send_cq, &a_recv_cq, a_recv_mr.as_ref(), a_recv_buf, a_send_mr.as_ref(), a_send_buf)
            .unwrap();
        let qp_b = ctx
            .create_qp(&pd, &b_send_cq, &b_recv_cq, b_recv_mr.as_ref(), b_recv_buf, b_send_mr.as_ref(), b_send_buf)
            .unwrap();

        let remote_b = crate::protocol::EndpointDescriptor::new(
            qp_b.qp_num(),
            1,
            [0; 16],
            1,
            b_recv_mr.rkey(),
            b_recv_mr.addr(),
        );
        let remote_a = crate::protocol::EndpointDescriptor::new(
            qp_a.qp_num(),
            1,
            [0; 16],
            1,
            a_recv_mr.rkey(),
            a_recv_mr.addr(),
        );
        qp_a.modify_to_rtr(&remote_b, LinkLayer::Ethernet).unwrap();
        qp_b.modify_to_rtr(&remote_a, LinkLayer::Ethernet).unwrap();
        qp_a.modify_to_rts(1).unwrap();
        qp_b.modify_to_rts(1).unwrap();

        (qp_a, a_send_cq, qp_b, b_recv_cq)
    }

    #[tokio::test]
    async fn send_from_a_completes_and_is_observable_on_bs_recv_cq() {
        let (qp_a, a_send_cq, _qp_b, b_recv_cq) = make_pair();

        let bytes = post_send(qp_a.as_ref(), a_send_cq.as_ref(), b"hello").await.unwrap();
        assert_eq!(bytes, 5);

        let received = poll_until_completion(b_recv_cq.as_ref()).await.unwrap();
        assert_eq!(received, 5);
    }
}

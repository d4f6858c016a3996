//! Fixed-size send/receive buffer pool. A direct translation of
//! the original server's `memory_pool`: a pre-allocated array of chunks and
//! an intrusive free-list guarded by a single lock, sized for `2 × max_clients`
//! chunks so a connection's churn never starves a neighbor mid-teardown.

use std::sync::{Arc, Mutex};

use crate::error::{BrokerError, Result};

/// Matches the original implementation's per-buffer size.
pub const BUFFER_SIZE: usize = 4096;

struct Inner {
    send: Vec<Arc<Mutex<Vec<u8>>>>,
    recv: Vec<Arc<Mutex<Vec<u8>>>>,
    free_list: Vec<usize>,
}

/// One chunk handed out by the pool: a send buffer and a recv buffer that
/// travel together for the lifetime of a connection.
pub struct BufferSlab {
    pub chunk_id: usize,
    pub send_buffer: Arc<Mutex<Vec<u8>>>,
    pub recv_buffer: Arc<Mutex<Vec<u8>>>,
}

pub struct BufferPool {
    inner: Mutex<Inner>,
}

impl BufferPool {
    /// `max_clients` is the admission ceiling; the pool itself holds
    /// `2 × max_clients` chunks of `2 × BUFFER_SIZE` octets, the headroom the
    /// original implementation reserved for in-flight teardown overlap.
    pub fn new(max_clients: usize) -> Self {
        let num_chunks = max_clients * 2;
        let send = (0..num_chunks).map(|_| Arc::new(Mutex::new(vec![0u8; BUFFER_SIZE]))).collect();
        let recv = (0..num_chunks).map(|_| Arc::new(Mutex::new(vec![0u8; BUFFER_SIZE]))).collect();
        let free_list = (0..num_chunks).rev().collect();
        Self { inner: Mutex::new(Inner { send, recv, free_list }) }
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().unwrap().send.len()
    }

    pub fn available(&self) -> usize {
        self.inner.lock().unwrap().free_list.len()
    }

    pub fn alloc(&self) -> Result<BufferSlab> {
        let mut inner = self.inner.lock().unwrap();
        let chunk_id = inner.free_list.pop().ok_or(BrokerError::PoolExhausted)?;
        let send_buffer = inner.send[chunk_id].clone();
        let recv_buffer = inner.recv[chunk_id].clone();
        {
            send_buffer.lock().unwrap().iter_mut().for_each(|b| *b = 0);
            recv_buffer.lock().unwrap().iter_mut().for_each(|b| *b = 0);
        }
        Ok(BufferSlab { chunk_id, send_buffer, recv_buffer })
    }

    pub fn release(&self, chunk_id: usize) {
        self.inner.lock().unwrap().free_list.push(chunk_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_and_release_round_trips_capacity() {
        let pool = BufferPool::new(4);
        assert_eq!(pool.capacity(), 8);
        assert_eq!(pool.available(), 8);

        let slab = pool.alloc().unwrap();
        assert_eq!(pool.available(), 7);
        pool.release(slab.chunk_id);
        assert_eq!(pool.available(), 8);
    }

    #[test]
    fn exhaustion_is_reported_and_recoverable() {
        let pool = BufferPool::new(1);
        let slabs: Vec<_> = (0..2).map(|_| pool.alloc().unwrap()).collect();
        assert!(matches!(pool.alloc(), Err(BrokerError::PoolExhausted)));

        pool.release(slabs[0].chunk_id);
        assert!(pool.alloc().is_ok());
    }

    #[test]
    fn released_slabs_are_zeroed_on_next_alloc() {
        let pool = BufferPool::new(1);
        let slab = pool.alloc().unwrap();
        slab.send_buffer.lock().unwrap()[0] = 0xAB;
        let chunk_id = slab.chunk_id;
        pool.release(chunk_id);

        let reused = pool.alloc().unwrap();
        assert_eq!(reused.chunk_id, chunk_id);
        assert_eq!(reused.send_buffer.lock().unwrap()[0], 0);
    }
}

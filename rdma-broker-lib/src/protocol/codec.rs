use super::endpoint::EndpointDescriptor;
use crate::error::{BrokerError, Result};

/// Encode an endpoint descriptor into its 38-octet network-byte-order wire
/// form. The 16-octet GID is copied verbatim since it is already in network
/// format.
pub fn encode_endpoint(ep: &EndpointDescriptor) -> [u8; EndpointDescriptor::WIRE_LEN] {
    let mut buf = [0u8; EndpointDescriptor::WIRE_LEN];
    let mut off = 0;

    buf[off..off + 4].copy_from_slice(&ep.qp_num.to_be_bytes());
    off += 4;
    buf[off..off + 2].copy_from_slice(&ep.lid.to_be_bytes());
    off += 2;
    buf[off..off + 16].copy_from_slice(&ep.gid);
    off += 16;
    buf[off..off + 4].copy_from_slice(&ep.psn.to_be_bytes());
    off += 4;
    buf[off..off + 4].copy_from_slice(&ep.rkey.to_be_bytes());
    off += 4;
    buf[off..off + 8].copy_from_slice(&ep.remote_addr.to_be_bytes());

    buf
}

/// Decode a 38-octet endpoint descriptor. Fails with `BrokerError::ShortRead`
/// if fewer octets than expected are supplied; the control-plane reader never
/// calls this with a partial buffer (reads are length-delimited before
/// decoding), so a length mismatch here always indicates a malformed caller.
pub fn decode_endpoint(buf: &[u8]) -> Result<EndpointDescriptor> {
    if buf.len() < EndpointDescriptor::WIRE_LEN {
        return Err(BrokerError::ShortRead {
            expected: EndpointDescriptor::WIRE_LEN,
            got: buf.len(),
        });
    }

    let mut off = 0;
    let qp_num = u32::from_be_bytes(buf[off..off + 4].try_into().unwrap());
    off += 4;
    let lid = u16::from_be_bytes(buf[off..off + 2].try_into().unwrap());
    off += 2;
    let mut gid = [0u8; 16];
    gid.copy_from_slice(&buf[off..off + 16]);
    off += 16;
    let psn = u32::from_be_bytes(buf[off..off + 4].try_into().unwrap());
    off += 4;
    let rkey = u32::from_be_bytes(buf[off..off + 4].try_into().unwrap());
    off += 4;
    let remote_addr = u64::from_be_bytes(buf[off..off + 8].try_into().unwrap());

    Ok(EndpointDescriptor { qp_num, lid, gid, psn, rkey, remote_addr })
}

/// Encode a single PSN (one direction of the PSN pair) as 4 big-endian
/// octets. Each side writes exactly one of these per exchange; the pair is
/// never sent as a single 8-octet blob.
pub fn encode_psn(psn: u32) -> [u8; 4] {
    psn.to_be_bytes()
}

pub fn decode_psn(buf: &[u8]) -> Result<u32> {
    if buf.len() < 4 {
        return Err(BrokerError::ShortRead { expected: 4, got: buf.len() });
    }
    Ok(u32::from_be_bytes(buf[..4].try_into().unwrap()))
}

/// Wire-exchanged endpoint descriptor. Immutable after construction;
/// carries no back-pointer to its owning connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointDescriptor {
    pub qp_num: u32,
    pub lid: u16,
    pub gid: [u8; 16],
    pub psn: u32,
    pub rkey: u32,
    pub remote_addr: u64,
}

impl EndpointDescriptor {
    pub const WIRE_LEN: usize = 4 + 2 + 16 + 4 + 4 + 8;

    #[allow(clippy::too_many_arguments)]
    pub fn new(
        qp_num: u32,
        lid: u16,
        gid: [u8; 16],
        psn: u32,
        rkey: u32,
        remote_addr: u64,
    ) -> Self {
        Self { qp_num, lid, gid, psn, rkey, remote_addr }
    }
}

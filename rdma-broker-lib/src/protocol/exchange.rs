use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::codec::{decode_endpoint, decode_psn, encode_endpoint, encode_psn};
use super::endpoint::EndpointDescriptor;
use crate::error::Result;

/// PSN exchange, client side: write `local_psn`, then read `remote_psn`.
/// Asymmetric with [`exchange_psn_server`] to avoid a write-write stall on a
/// stream duplex that is not guaranteed full-duplex.
pub async fn exchange_psn_client<S: AsyncRead + AsyncWrite + Unpin>(
    channel: &mut S,
    local_psn: u32,
) -> Result<u32> {
    channel.write_all(&encode_psn(local_psn)).await?;
    let mut buf = [0u8; 4];
    channel.read_exact(&mut buf).await?;
    decode_psn(&buf)
}

/// PSN exchange, server side: read `remote_psn`, then write `local_psn`.
pub async fn exchange_psn_server<S: AsyncRead + AsyncWrite + Unpin>(
    channel: &mut S,
    local_psn: u32,
) -> Result<u32> {
    let mut buf = [0u8; 4];
    channel.read_exact(&mut buf).await?;
    let remote_psn = decode_psn(&buf)?;
    channel.write_all(&encode_psn(local_psn)).await?;
    Ok(remote_psn)
}

/// Endpoint exchange, client side: read `remote_endpoint` first, then write
/// `local_endpoint`, asymmetric with the server for the same reason as the
/// PSN exchange above.
pub async fn exchange_endpoint_client<S: AsyncRead + AsyncWrite + Unpin>(
    channel: &mut S,
    local: &EndpointDescriptor,
) -> Result<EndpointDescriptor> {
    let mut buf = [0u8; EndpointDescriptor::WIRE_LEN];
    channel.read_exact(&mut buf).await?;
    let remote = decode_endpoint(&buf)?;
    channel.write_all(&encode_endpoint(local)).await?;
    Ok(remote)
}

/// Endpoint exchange, server side: write `local_endpoint` first, then read
/// `remote_endpoint`.
pub async fn exchange_endpoint_server<S: AsyncRead + AsyncWrite + Unpin>(
    channel: &mut S,
    local: &EndpointDescriptor,
) -> Result<EndpointDescriptor> {
    channel.write_all(&encode_endpoint(local)).await?;
    let mut buf = [0u8; EndpointDescriptor::WIRE_LEN];
    channel.read_exact(&mut buf).await?;
    decode_endpoint(&buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn psn_exchange_over_duplex_pipe() {
        let (mut client, mut server) = tokio::io::duplex(64);

        let client_fut = exchange_psn_client(&mut client, 0x0000_0111);
        let server_fut = exchange_psn_server(&mut server, 0x0000_0222);

        let (client_remote, server_remote) = tokio::join!(client_fut, server_fut);
        assert_eq!(client_remote.unwrap(), 0x0000_0222);
        assert_eq!(server_remote.unwrap(), 0x0000_0111);
    }

    #[tokio::test]
    async fn endpoint_exchange_over_duplex_pipe() {
        let (mut client, mut server) = tokio::io::duplex(256);

        let local_client = EndpointDescriptor::new(1, 0, [0; 16], 11, 21, 31);
        let local_server = EndpointDescriptor::new(2, 0, [1; 16], 12, 22, 32);

        let client_fut = exchange_endpoint_client(&mut client, &local_client);
        let server_fut = exchange_endpoint_server(&mut server, &local_server);

        let (from_client, from_server) = tokio::join!(client_fut, server_fut);
        assert_eq!(from_client.unwrap(), local_server);
        assert_eq!(from_server.unwrap(), local_client);
    }
}

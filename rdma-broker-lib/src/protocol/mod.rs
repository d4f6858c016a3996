mod codec;
mod endpoint;
mod exchange;

pub use codec::{decode_endpoint, decode_psn, encode_endpoint, encode_psn};
pub use endpoint::EndpointDescriptor;
pub use exchange::{
    exchange_endpoint_client, exchange_endpoint_server, exchange_psn_client, exchange_psn_server,
};

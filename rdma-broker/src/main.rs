use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use rdma_broker_lib::config::load_from_path;
use rdma_broker_lib::server::{run, SharedResources};
use rdma_broker_lib::telemetry::{init_tracing, Metrics};
use rdma_broker_lib::tls::build_connector;
use rdma_broker_lib::transport::mock::{MockFabric, MockProvider};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about = "secure RDMA connection broker")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the broker's control-plane acceptor.
    Server {
        #[arg(short, long, value_name = "FILE", default_value = "broker.toml")]
        config: PathBuf,
    },
    /// Connect as a client, bring up a connection, and send one message.
    Client {
        #[arg(short, long, value_name = "FILE", default_value = "broker.toml")]
        config: PathBuf,
        #[arg(short, long, value_name = "HOST:PORT")]
        server: SocketAddr,
        /// RDMA-write the message directly into the server's buffer instead
        /// of sending it and waiting for an echo. Requires
        /// `remote_write.enabled = true` in the server's configuration.
        #[arg(long)]
        write: bool,
        message: String,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = init_tracing("info") {
        eprintln!("failed to initialize tracing: {e}");
    }

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Server { config } => run_server(config).await,
        Command::Client { config, server, write, message } => {
            run_client(config, server, write, message).await
        }
    };

    if let Err(err) = result {
        error!(%err, "broker exited with error");
        std::process::exit(1);
    }
}

async fn run_server(config_path: PathBuf) -> rdma_broker_lib::Result<()> {
    let config = load_from_path(&config_path)?;
    info!(listen = %config.listen, max_clients = config.capacity.max_clients, "configuration loaded");

    // Cargo feature "hardware" swaps this for the real libibverbs-backed
    // provider; the default build only ever drives the mock fabric.
    let provider = MockProvider::new(MockFabric::new());
    let shared =
        Arc::new(SharedResources::init(&provider, config.capacity.max_clients, config.cq_fanout)?);

    run(config, shared).await
}

async fn run_client(
    config_path: PathBuf,
    server_addr: SocketAddr,
    write: bool,
    message: String,
) -> rdma_broker_lib::Result<()> {
    let config = load_from_path(&config_path)?;
    let connector = build_connector(&config.tls)?;
    let tcp = tokio::net::TcpStream::connect(server_addr).await?;
    let server_name = rustls_pki_types::ServerName::try_from(server_addr.ip().to_string())
        .map_err(|e| rdma_broker_lib::BrokerError::Tls(e.to_string()))?;
    let tls_stream = connector.connect(server_name, tcp).await?;

    // The mock fabric only simulates a wire within one process; a client and
    // server binary running as separate processes will complete bring-up
    // (TLS, PSN exchange, endpoint exchange all travel over the real TCP
    // connection) but cannot actually move data until run with
    // `--features hardware`, which is not in scope for this build.
    let provider = MockProvider::new(MockFabric::new());
    let shared =
        Arc::new(SharedResources::init(&provider, config.capacity.max_clients, config.cq_fanout)?);
    let slot_id = shared.slots.admit()?;

    let metrics = Metrics::default();
    let mut connection =
        rdma_broker_lib::client::connect(tls_stream, &shared.device, &shared.buffers, slot_id, &metrics)
            .await?;

    let welcome = rdma_broker_lib::client::recv_message(&mut connection).await?;
    info!(%welcome, "received welcome message");

    if write {
        rdma_broker_lib::client::write_message(&mut connection, &message, config.remote_write.enabled)
            .await?;
        info!("RDMA write completed");
    } else {
        let reply = rdma_broker_lib::client::send_and_receive(&mut connection, &message).await?;
        info!(%reply, "received echo");
    }

    shared.buffers.release(connection.buffers.chunk_id);
    shared.slots.release(slot_id);
    Ok(())
}

//! Server lifecycle: bind, receive loop, graceful shutdown.
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use chihaya_configuration::UdpTracker;
use chihaya_tracker_core::logic::Logic;
use chihaya_tracker_core::statistics::TrackerMetrics;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::connection_id::{run_rotation_task, ConnectionIdGenerator};
use crate::handlers::{handle_packet, UdpState};
use crate::RawRequest;

/// Largest datagram the tracker accepts. BEP 15 packets are far smaller;
/// anything beyond this is cut off and will fail to parse.
const MAX_PACKET_SIZE: usize = 2048;

/// A configured, not-yet-started UDP frontend.
pub struct UdpServer {
    config: Arc<UdpTracker>,
    logic: Arc<Logic>,
    metrics: Arc<TrackerMetrics>,
}

/// A started UDP frontend.
pub struct RunningUdpServer {
    /// The actually bound address (relevant when the configured port is 0).
    pub local_addr: SocketAddr,
    /// The receive loop; finishes once the halt token fires.
    pub task: JoinHandle<()>,
}

impl UdpServer {
    #[must_use]
    pub fn new(config: Arc<UdpTracker>, logic: Arc<Logic>, metrics: Arc<TrackerMetrics>) -> Self {
        Self { config, logic, metrics }
    }

    /// Binds the socket and starts the receive loop and the connection-ID
    /// rotation task. Cancelling `halt` stops both.
    ///
    /// # Errors
    ///
    /// Will return an error if the configured address cannot be bound.
    pub async fn start(self, halt: CancellationToken) -> io::Result<RunningUdpServer> {
        let socket = Arc::new(UdpSocket::bind(self.config.bind_address).await?);
        let local_addr = socket.local_addr()?;

        let connection_ids = Arc::new(ConnectionIdGenerator::new(self.config.private_key.as_deref()));

        // The clock-skew allowance widens the window during which a
        // client's connection id stays valid.
        let rotation_interval = self.config.rotation_interval() + self.config.max_clock_skew();
        tokio::spawn(run_rotation_task(connection_ids.clone(), rotation_interval, halt.clone()));

        let state = Arc::new(UdpState {
            config: self.config,
            logic: self.logic,
            metrics: self.metrics,
            connection_ids,
        });

        tracing::info!(%local_addr, "udp tracker listening");

        let task = tokio::spawn(run_receive_loop(socket, state, halt));

        Ok(RunningUdpServer { local_addr, task })
    }
}

async fn run_receive_loop(socket: Arc<UdpSocket>, state: Arc<UdpState>, halt: CancellationToken) {
    let mut buffer = [0u8; MAX_PACKET_SIZE];

    loop {
        tokio::select! {
            () = halt.cancelled() => {
                tracing::info!(local_addr = ?socket.local_addr(), "udp tracker shutting down");
                break;
            }
            received = socket.recv_from(&mut buffer) => {
                match received {
                    Ok((len, from)) => {
                        let request = RawRequest {
                            payload: buffer[..len].to_vec(),
                            from,
                        };

                        tokio::spawn(process_request(socket.clone(), state.clone(), request));
                    }
                    Err(error) => {
                        tracing::warn!(%error, "failed to receive a datagram");
                    }
                }
            }
        }
    }
}

async fn process_request(socket: Arc<UdpSocket>, state: Arc<UdpState>, request: RawRequest) {
    let from = request.from;
    let start_time = Instant::now();

    let Some(response) = handle_packet(&request, &state) else {
        return;
    };

    if state.config.enable_request_timing {
        let elapsed = start_time.elapsed();
        state.metrics.udp_requests_timed.inc();
        #[allow(clippy::cast_possible_truncation)]
        state.metrics.udp_request_processing_micros.add(elapsed.as_micros() as u64);
    }

    let mut payload = Vec::with_capacity(MAX_PACKET_SIZE);

    if let Err(error) = response.write_bytes(&mut payload) {
        tracing::error!(%error, "failed to encode a response");
        return;
    }

    // Whether it reaches the client is the network's business.
    if let Err(error) = socket.send_to(&payload, from).await {
        tracing::warn!(%error, %from, "failed to send a response");
    }
}

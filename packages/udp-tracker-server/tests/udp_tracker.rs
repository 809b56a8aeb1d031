//! Integration tests driving a real UDP frontend over the loopback
//! interface: connect, announce, scrape, and the connection-ID gate.
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use chihaya_configuration::UdpTracker;
use chihaya_primitives::announce_event::AnnounceEvent;
use chihaya_primitives::info_hash::InfoHash;
use chihaya_primitives::peer::PeerId;
use chihaya_tracker_core::logic::Logic;
use chihaya_tracker_core::statistics::TrackerMetrics;
use chihaya_tracker_core::storage::memory::{MemoryPeerStore, Options};
use chihaya_tracker_core::storage::PeerStore;
use chihaya_udp_protocol::{
    AnnounceRequest, ConnectRequest, ConnectionId, Request, Response, ScrapeRequest, TransactionId,
};
use chihaya_udp_tracker_server::UdpServer;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

async fn start_sample_server(halt: &CancellationToken) -> SocketAddr {
    let config = Arc::new(UdpTracker {
        bind_address: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0),
        ..Default::default()
    });

    let store = Arc::new(MemoryPeerStore::new(&Options::default()));
    let logic = Arc::new(Logic::new(
        Duration::from_secs(1800),
        Duration::from_secs(900),
        store as Arc<dyn PeerStore>,
        vec![],
        vec![],
    ));

    let server = UdpServer::new(config, logic, Arc::new(TrackerMetrics::default()));

    server
        .start(halt.clone())
        .await
        .expect("the udp tracker should bind to an ephemeral port")
        .local_addr
}

async fn exchange(client: &UdpSocket, server_addr: SocketAddr, request: &Request) -> Response {
    let mut payload = Vec::new();
    request.write_bytes(&mut payload).unwrap();

    client.send_to(&payload, server_addr).await.unwrap();

    let mut buffer = [0u8; 2048];
    let (len, _) = tokio::time::timeout(Duration::from_secs(5), client.recv_from(&mut buffer))
        .await
        .expect("the tracker should respond within five seconds")
        .unwrap();

    Response::parse_bytes(&buffer[..len], true).unwrap()
}

async fn connect(client: &UdpSocket, server_addr: SocketAddr) -> ConnectionId {
    let response = exchange(
        client,
        server_addr,
        &Request::Connect(ConnectRequest {
            transaction_id: TransactionId(1),
        }),
    )
    .await;

    let Response::Connect(connect) = response else {
        panic!("a connect should be answered with a connect response, got {response:?}");
    };

    assert_eq!(connect.transaction_id, TransactionId(1));

    connect.connection_id
}

fn sample_announce(connection_id: ConnectionId, transaction_id: i32) -> Request {
    Request::Announce(AnnounceRequest {
        connection_id,
        transaction_id: TransactionId(transaction_id),
        info_hash: InfoHash([0x3b; 20]),
        peer_id: PeerId(*b"-qB00000000000000001"),
        downloaded: 0,
        left: 0,
        uploaded: 0,
        event: AnnounceEvent::Started,
        ip_address: None,
        key: 0,
        peers_wanted: 50,
        port: 6969,
    })
}

#[tokio::test(flavor = "multi_thread")]
async fn a_connect_then_announce_exchange_should_register_the_seeder() {
    let halt = CancellationToken::new();
    let server_addr = start_sample_server(&halt).await;

    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    let connection_id = connect(&client, server_addr).await;

    let response = exchange(&client, server_addr, &sample_announce(connection_id, 2)).await;

    let Response::AnnounceIpv4(announce) = response else {
        panic!("an announce should be answered with an announce response, got {response:?}");
    };

    assert_eq!(announce.transaction_id, TransactionId(2));
    assert_eq!(announce.seeders, 1);
    assert_eq!(announce.leechers, 0);
    assert!(announce.peers.is_empty(), "the announcer is the only peer in the swarm");
    assert!(announce.announce_interval > 0);

    halt.cancel();
}

#[tokio::test(flavor = "multi_thread")]
async fn an_announce_with_a_forged_connection_id_should_be_answered_with_an_error() {
    let halt = CancellationToken::new();
    let server_addr = start_sample_server(&halt).await;

    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    let response = exchange(&client, server_addr, &sample_announce(ConnectionId(0x4141_4141), 3)).await;

    let Response::Error(error) = response else {
        panic!("a forged connection id should be answered with an error, got {response:?}");
    };

    assert_eq!(error.transaction_id, TransactionId(3));
    assert_eq!(error.message, "invalid connection id");

    halt.cancel();
}

#[tokio::test(flavor = "multi_thread")]
async fn a_scrape_should_report_the_announced_seeder() {
    let halt = CancellationToken::new();
    let server_addr = start_sample_server(&halt).await;

    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    let connection_id = connect(&client, server_addr).await;

    let _ = exchange(&client, server_addr, &sample_announce(connection_id, 4)).await;

    let response = exchange(
        &client,
        server_addr,
        &Request::Scrape(ScrapeRequest {
            connection_id,
            transaction_id: TransactionId(5),
            info_hashes: vec![InfoHash([0x3b; 20])],
        }),
    )
    .await;

    let Response::Scrape(scrape) = response else {
        panic!("a scrape should be answered with a scrape response, got {response:?}");
    };

    assert_eq!(scrape.transaction_id, TransactionId(5));
    assert_eq!(scrape.torrent_stats.len(), 1);
    assert_eq!(scrape.torrent_stats[0].seeders, 1);
    assert_eq!(scrape.torrent_stats[0].leechers, 0);

    halt.cancel();
}

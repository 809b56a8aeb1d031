//! Integration tests driving a real HTTP frontend over the loopback
//! interface.
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use chihaya_axum_http_tracker_server::HttpServer;
use chihaya_configuration::HttpTracker;
use chihaya_http_protocol::bencode::Value;
use chihaya_tracker_core::logic::Logic;
use chihaya_tracker_core::statistics::TrackerMetrics;
use chihaya_tracker_core::storage::memory::{MemoryPeerStore, Options};
use chihaya_tracker_core::storage::PeerStore;
use tokio_util::sync::CancellationToken;

const SAMPLE_INFO_HASH: &str = "%3B%24U%04%CF%5F%11%BB%DB%E1%20%1C%EA%6A%6B%F4%5A%EE%1B%C0";

async fn start_sample_server(halt: &CancellationToken) -> SocketAddr {
    let config = Arc::new(HttpTracker {
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

    let server = HttpServer::new(config, logic, Arc::new(TrackerMetrics::default()));

    server
        .start(halt.clone())
        .await
        .expect("the http tracker should bind to an ephemeral port")
        .local_addr
}

fn announce_url(addr: SocketAddr, peer_id: &str, port: u16, left: u64) -> String {
    format!(
        "http://{addr}/announce?info_hash={SAMPLE_INFO_HASH}&peer_id={peer_id}&port={port}&left={left}&compact=1"
    )
}

fn dict(body: &[u8]) -> std::collections::BTreeMap<Vec<u8>, Value> {
    match Value::from_bytes(body).expect("the body should be bencoded") {
        Value::Dict(entries) => entries,
        other => panic!("the body should be a dictionary, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn a_leecher_should_receive_the_already_announced_seeder() {
    let halt = CancellationToken::new();
    let addr = start_sample_server(&halt).await;

    // First announce: a seeder joins. It is alone, so no peers come back.
    let body = reqwest::get(announce_url(addr, "-qB00000000000000001", 7001, 0))
        .await
        .unwrap()
        .bytes()
        .await
        .unwrap();

    let entries = dict(&body);
    assert_eq!(entries.get(b"peers".as_slice()), Some(&Value::Bytes(vec![])));

    // Second announce: a leecher joins and must see the seeder.
    let body = reqwest::get(announce_url(addr, "-qB00000000000000002", 7002, 1024))
        .await
        .unwrap()
        .bytes()
        .await
        .unwrap();

    let entries = dict(&body);
    assert_eq!(entries.get(b"complete".as_slice()), Some(&Value::Integer(1)));

    let Some(Value::Bytes(peers)) = entries.get(b"peers".as_slice()) else {
        panic!("compact peers should be a byte string");
    };
    assert_eq!(peers.len(), 6, "one compact IPv4 record");
    assert_eq!(&peers[4..], &7001u16.to_be_bytes(), "the seeder's port");

    halt.cancel();
}

#[tokio::test(flavor = "multi_thread")]
async fn a_scrape_should_report_the_swarm_counts() {
    let halt = CancellationToken::new();
    let addr = start_sample_server(&halt).await;

    reqwest::get(announce_url(addr, "-qB00000000000000001", 7001, 0))
        .await
        .unwrap()
        .bytes()
        .await
        .unwrap();

    let body = reqwest::get(format!("http://{addr}/scrape?info_hash={SAMPLE_INFO_HASH}"))
        .await
        .unwrap()
        .bytes()
        .await
        .unwrap();

    let entries = dict(&body);
    let Some(Value::Dict(files)) = entries.get(b"files".as_slice()) else {
        panic!("files should be a dictionary");
    };

    let stats = files.values().next().expect("one scraped file");
    let Value::Dict(stats) = stats else {
        panic!("per-file stats should be a dictionary");
    };

    assert_eq!(stats.get(b"complete".as_slice()), Some(&Value::Integer(1)));
    assert_eq!(stats.get(b"incomplete".as_slice()), Some(&Value::Integer(0)));

    halt.cancel();
}

#[tokio::test(flavor = "multi_thread")]
async fn a_malformed_announce_should_get_a_failure_reason_with_status_200() {
    let halt = CancellationToken::new();
    let addr = start_sample_server(&halt).await;

    let response = reqwest::get(format!("http://{addr}/announce?info_hash=short")).await.unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let entries = dict(&response.bytes().await.unwrap());

    assert!(entries.contains_key(b"failure reason".as_slice()));

    halt.cancel();
}

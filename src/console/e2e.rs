//! End-to-end check: exercises a running tracker with announce and scrape
//! sequences and verifies the responses are coherent.
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{bail, Context};
use chihaya_http_protocol::bencode::Value;
use chihaya_primitives::announce_event::AnnounceEvent;
use chihaya_primitives::info_hash::InfoHash;
use chihaya_primitives::peer::PeerId;
use chihaya_udp_protocol::{AnnounceRequest, ConnectRequest, Request, Response, TransactionId};
use percent_encoding::{percent_encode, NON_ALPHANUMERIC};
use rand::Rng;
use tokio::net::UdpSocket;

/// What to exercise, from the `e2e` command-line flags.
#[derive(Debug, Clone)]
pub struct Options {
    /// Base URL of an HTTP frontend, e.g. `http://127.0.0.1:6969`.
    pub http: Option<String>,

    /// Address of a UDP frontend.
    pub udp: Option<SocketAddr>,

    /// Pause between the check steps.
    pub delay: Duration,
}

/// Runs the configured checks.
///
/// # Errors
///
/// Will return an error as soon as a tracker response is missing, cannot be
/// parsed or contradicts the announce that preceded it.
pub async fn run(options: &Options) -> anyhow::Result<()> {
    if options.http.is_none() && options.udp.is_none() {
        bail!("nothing to check: pass --http and/or --udp");
    }

    let info_hash = random_info_hash();

    if let Some(base_url) = &options.http {
        check_http(base_url, info_hash).await?;
        tokio::time::sleep(options.delay).await;
    }

    if let Some(server_addr) = options.udp {
        check_udp(server_addr, info_hash).await?;
    }

    tracing::info!("all e2e checks passed");

    Ok(())
}

fn random_info_hash() -> InfoHash {
    let mut bytes = [0u8; 20];
    rand::thread_rng().fill(&mut bytes);
    InfoHash(bytes)
}

async fn check_http(base_url: &str, info_hash: InfoHash) -> anyhow::Result<()> {
    tracing::info!(%base_url, "checking the http tracker");

    let encoded_hash = percent_encode(&info_hash.0, NON_ALPHANUMERIC).to_string();

    let url = format!(
        "{base_url}/announce?info_hash={encoded_hash}&peer_id=-qB00000000000000e2e&port=17548&left=0&compact=1"
    );

    let body = reqwest::get(&url).await.context("the announce request failed")?.bytes().await?;
    let entries = parse_dict(&body).context("the announce response is not a bencoded dictionary")?;

    if let Some(Value::Bytes(reason)) = entries.get(b"failure reason".as_slice()) {
        bail!("the tracker rejected the announce: {}", String::from_utf8_lossy(reason));
    }

    if !matches!(entries.get(b"interval".as_slice()), Some(Value::Integer(interval)) if *interval > 0) {
        bail!("the announce response carries no usable interval");
    }

    let scrape_url = format!("{base_url}/scrape?info_hash={encoded_hash}");
    let body = reqwest::get(&scrape_url).await.context("the scrape request failed")?.bytes().await?;
    let entries = parse_dict(&body).context("the scrape response is not a bencoded dictionary")?;

    let Some(Value::Dict(files)) = entries.get(b"files".as_slice()) else {
        bail!("the scrape response carries no files dictionary");
    };

    let Some(Value::Dict(stats)) = files.get(&info_hash.bytes().to_vec()) else {
        bail!("the scrape response does not mention the announced torrent");
    };

    if stats.get(b"complete".as_slice()) != Some(&Value::Integer(1)) {
        bail!("the scrape does not report the announced seeder");
    }

    tracing::info!("http tracker ok");

    Ok(())
}

fn parse_dict(body: &[u8]) -> Option<std::collections::BTreeMap<Vec<u8>, Value>> {
    match Value::from_bytes(body) {
        Ok(Value::Dict(entries)) => Some(entries),
        _ => None,
    }
}

async fn check_udp(server_addr: SocketAddr, info_hash: InfoHash) -> anyhow::Result<()> {
    tracing::info!(%server_addr, "checking the udp tracker");

    let client = UdpSocket::bind(("0.0.0.0", 0)).await?;

    let connect_response = udp_exchange(
        &client,
        server_addr,
        &Request::Connect(ConnectRequest {
            transaction_id: TransactionId(1),
        }),
    )
    .await?;

    let Response::Connect(connect) = connect_response else {
        bail!("the connect was not answered with a connect response: {connect_response:?}");
    };

    let announce_response = udp_exchange(
        &client,
        server_addr,
        &Request::Announce(AnnounceRequest {
            connection_id: connect.connection_id,
            transaction_id: TransactionId(2),
            info_hash,
            peer_id: PeerId(*b"-qB00000000000000e2e"),
            downloaded: 0,
            left: 0,
            uploaded: 0,
            event: AnnounceEvent::Started,
            ip_address: None,
            key: 0,
            peers_wanted: 50,
            port: 17548,
        }),
    )
    .await?;

    match announce_response {
        Response::AnnounceIpv4(announce) if announce.seeders >= 1 => {}
        Response::AnnounceIpv6(announce) if announce.seeders >= 1 => {}
        other => bail!("the announce response does not report the announcing seeder: {other:?}"),
    }

    tracing::info!("udp tracker ok");

    Ok(())
}

async fn udp_exchange(client: &UdpSocket, server_addr: SocketAddr, request: &Request) -> anyhow::Result<Response> {
    let mut payload = Vec::new();
    request.write_bytes(&mut payload)?;

    client.send_to(&payload, server_addr).await?;

    let mut buffer = [0u8; 2048];
    let (len, _) = tokio::time::timeout(Duration::from_secs(5), client.recv_from(&mut buffer))
        .await
        .context("the udp tracker did not respond within five seconds")??;

    Response::parse_bytes(&buffer[..len], server_addr.is_ipv4()).context("could not parse the udp response")
}

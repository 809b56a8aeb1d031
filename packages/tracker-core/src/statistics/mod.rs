//! Tracker statistics.
//!
//! The storage gauges (torrents, seeders, leechers) are aggregated on a
//! timer by [`run_metrics_updater`], not on every request: reading them is a
//! full sweep over the shards. The per-request counters are incremented by
//! the frontends as they serve traffic.
use std::sync::Arc;
use std::time::Duration;

use chihaya_metrics::prometheus::{encode_counter, encode_gauge, Label, Sample};
use chihaya_metrics::{Counter, Gauge};
use tokio_util::sync::CancellationToken;

use crate::storage::PeerStore;

/// All instruments exported on the metrics endpoint.
#[derive(Debug, Default)]
pub struct TrackerMetrics {
    /// Swarms with at least one peer, aggregated periodically.
    pub torrents: Gauge,
    /// Seeders over all swarms, aggregated periodically.
    pub seeders: Gauge,
    /// Leechers over all swarms, aggregated periodically.
    pub leechers: Gauge,

    pub http_announces_ipv4: Counter,
    pub http_announces_ipv6: Counter,
    pub http_scrapes: Counter,

    pub udp_connects: Counter,
    pub udp_announces_ipv4: Counter,
    pub udp_announces_ipv6: Counter,
    pub udp_scrapes: Counter,
    pub udp_errors: Counter,

    /// Number of UDP requests with recorded processing time. Only grows when
    /// request timing is enabled on a UDP frontend.
    pub udp_requests_timed: Counter,
    /// Summed UDP request processing time, in microseconds.
    pub udp_request_processing_micros: Counter,
}

impl TrackerMetrics {
    /// Renders every instrument in the Prometheus text exposition format.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();

        encode_gauge(
            &mut out,
            "chihaya_torrents",
            "Number of swarms with at least one peer.",
            &[Sample::unlabeled(self.torrents.get())],
        );
        encode_gauge(
            &mut out,
            "chihaya_seeders",
            "Number of seeders over all swarms.",
            &[Sample::unlabeled(self.seeders.get())],
        );
        encode_gauge(
            &mut out,
            "chihaya_leechers",
            "Number of leechers over all swarms.",
            &[Sample::unlabeled(self.leechers.get())],
        );

        encode_counter(
            &mut out,
            "chihaya_announces_total",
            "Number of announces served.",
            &[
                Sample::new(
                    vec![Label::new("frontend", "http"), Label::new("af", "ipv4")],
                    self.http_announces_ipv4.get(),
                ),
                Sample::new(
                    vec![Label::new("frontend", "http"), Label::new("af", "ipv6")],
                    self.http_announces_ipv6.get(),
                ),
                Sample::new(
                    vec![Label::new("frontend", "udp"), Label::new("af", "ipv4")],
                    self.udp_announces_ipv4.get(),
                ),
                Sample::new(
                    vec![Label::new("frontend", "udp"), Label::new("af", "ipv6")],
                    self.udp_announces_ipv6.get(),
                ),
            ],
        );

        encode_counter(
            &mut out,
            "chihaya_scrapes_total",
            "Number of scrapes served.",
            &[
                Sample::new(vec![Label::new("frontend", "http")], self.http_scrapes.get()),
                Sample::new(vec![Label::new("frontend", "udp")], self.udp_scrapes.get()),
            ],
        );

        encode_counter(
            &mut out,
            "chihaya_udp_connects_total",
            "Number of UDP connect requests served.",
            &[Sample::unlabeled(self.udp_connects.get())],
        );
        encode_counter(
            &mut out,
            "chihaya_udp_errors_total",
            "Number of UDP error packets sent.",
            &[Sample::unlabeled(self.udp_errors.get())],
        );

        encode_counter(
            &mut out,
            "chihaya_udp_requests_timed_total",
            "Number of UDP requests with recorded processing time.",
            &[Sample::unlabeled(self.udp_requests_timed.get())],
        );
        encode_counter(
            &mut out,
            "chihaya_udp_request_processing_micros_total",
            "Summed UDP request processing time in microseconds.",
            &[Sample::unlabeled(self.udp_request_processing_micros.get())],
        );

        out
    }
}

/// Re-aggregates the storage gauges on every interval tick until the token
/// is cancelled.
pub async fn run_metrics_updater(
    store: Arc<dyn PeerStore>,
    metrics: Arc<TrackerMetrics>,
    reporting_interval: Duration,
    halt: CancellationToken,
) {
    let mut interval = tokio::time::interval(reporting_interval);

    loop {
        tokio::select! {
            () = halt.cancelled() => {
                tracing::info!("metrics updater halting");
                break;
            }
            _ = interval.tick() => {
                let totals = store.aggregate_swarm_metadata();

                metrics.torrents.set(totals.torrents);
                metrics.seeders.set(totals.seeders);
                metrics.leechers.set(totals.leechers);
            }
        }
    }
}

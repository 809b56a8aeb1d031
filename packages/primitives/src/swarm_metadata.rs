//! Aggregate counts for a swarm, as returned by a scrape.
use derive_more::Constructor;
use serde::Serialize;

/// The metadata of a single swarm: the counts a `scrape` request reports.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Constructor, Serialize)]
pub struct SwarmMetadata {
    /// The number of peers that have completed the download (seeders).
    pub complete: u32,
    /// The number of times the torrent has been downloaded. The in-memory
    /// store does not track snatches, so this is zero unless a hook fills it.
    pub downloaded: u32,
    /// The number of peers that have not completed the download (leechers).
    pub incomplete: u32,
}

impl SwarmMetadata {
    #[must_use]
    pub fn zeroed() -> Self {
        Self::default()
    }
}

/// Totals over every swarm in the store, aggregated for the statistics
/// reporter.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Constructor, Serialize)]
pub struct AggregateSwarmMetadata {
    /// The number of swarms with at least one peer.
    pub torrents: u64,
    /// The total number of seeders over all swarms.
    pub seeders: u64,
    /// The total number of leechers over all swarms.
    pub leechers: u64,
}

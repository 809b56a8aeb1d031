//! Connection-ID generation and verification.
//!
//! A connection ID is an 8-byte fold of a keyed BLAKE3 hash over a rotating
//! 16-byte initialization vector and the client IP padded to 16 bytes. The
//! key is derived from the configured `private_key`, or drawn at random at
//! startup.
//!
//! Rotation shifts the current IV into the previous slot and draws a fresh
//! one; verification accepts IDs derived from either, so a client's ID stays
//! valid for up to two rotation intervals. The comparison is constant time.
use std::net::IpAddr;
use std::sync::Mutex;
use std::time::Duration;

use constant_time_eq::constant_time_eq;
use tokio_util::sync::CancellationToken;

use chihaya_udp_protocol::ConnectionId;

/// Key-derivation context for configured private keys. Changing it
/// invalidates every outstanding connection ID, so treat it as part of the
/// wire contract.
const KEY_DERIVATION_CONTEXT: &str = "chihaya 2024-01-01 udp connection id";

struct Ivs {
    current: [u8; 16],
    previous: [u8; 16],
}

/// Generates and verifies connection IDs for one UDP frontend.
pub struct ConnectionIdGenerator {
    key: [u8; 32],
    ivs: Mutex<Ivs>,
}

impl ConnectionIdGenerator {
    /// Builds a generator keyed by `private_key`, or by a random secret
    /// when none is configured (outstanding IDs then die with the process).
    ///
    /// # Panics
    ///
    /// Will panic if the operating system cannot provide random bytes.
    #[must_use]
    pub fn new(private_key: Option<&str>) -> Self {
        let key = match private_key {
            Some(private_key) => blake3::derive_key(KEY_DERIVATION_CONTEXT, private_key.as_bytes()),
            None => {
                let mut key = [0u8; 32];
                getrandom::getrandom(&mut key).expect("the OS should provide random bytes");
                key
            }
        };

        Self {
            key,
            ivs: Mutex::new(Ivs {
                current: random_iv(),
                previous: random_iv(),
            }),
        }
    }

    /// The ID the given client must present right now.
    pub fn generate(&self, ip: IpAddr) -> ConnectionId {
        let ivs = self.ivs.lock().expect("the iv lock should not be poisoned");

        self.derive(&ivs.current, ip)
    }

    /// Whether `connection_id` was issued to `ip` under the current or the
    /// previous IV.
    pub fn matches(&self, connection_id: ConnectionId, ip: IpAddr) -> bool {
        let (current, previous) = {
            let ivs = self.ivs.lock().expect("the iv lock should not be poisoned");
            (self.derive(&ivs.current, ip), self.derive(&ivs.previous, ip))
        };

        let presented = connection_id.to_be_bytes();

        constant_time_eq(&presented, &current.to_be_bytes()) | constant_time_eq(&presented, &previous.to_be_bytes())
    }

    /// Rotates the IVs: current becomes previous, a fresh one is drawn.
    pub fn new_iv(&self) {
        let mut ivs = self.ivs.lock().expect("the iv lock should not be poisoned");

        ivs.previous = ivs.current;
        ivs.current = random_iv();
    }

    fn derive(&self, iv: &[u8; 16], ip: IpAddr) -> ConnectionId {
        let mut hasher = blake3::Hasher::new_keyed(&self.key);
        hasher.update(iv);
        hasher.update(&pad_ip(ip));

        let hash = hasher.finalize();
        let block: &[u8] = &hash.as_bytes()[..16];

        let mut folded = [0u8; 8];
        for (index, byte) in folded.iter_mut().enumerate() {
            *byte = block[index] ^ block[index + 8];
        }

        ConnectionId::from_be_bytes(folded)
    }
}

/// The client IP padded to 16 bytes: IPv4 octets are zero extended.
fn pad_ip(ip: IpAddr) -> [u8; 16] {
    let mut padded = [0u8; 16];

    match ip {
        IpAddr::V4(ip) => padded[..4].copy_from_slice(&ip.octets()),
        IpAddr::V6(ip) => padded.copy_from_slice(&ip.octets()),
    }

    padded
}

fn random_iv() -> [u8; 16] {
    let mut iv = [0u8; 16];
    getrandom::getrandom(&mut iv).expect("the OS should provide random bytes");
    iv
}

/// Rotates the generator's IVs on every interval tick until the token is
/// cancelled. The interval should include the configured clock-skew
/// allowance, which widens the validity window accordingly.
pub async fn run_rotation_task(generator: std::sync::Arc<ConnectionIdGenerator>, rotation_interval: Duration, halt: CancellationToken) {
    let mut interval = tokio::time::interval(rotation_interval);

    // Consume the immediate first tick; the startup IVs are fresh.
    interval.tick().await;

    loop {
        tokio::select! {
            () = halt.cancelled() => {
                tracing::info!("connection id rotation halting");
                break;
            }
            _ = interval.tick() => {
                tracing::debug!("rotating connection id iv");
                generator.new_iv();
            }
        }
    }
}

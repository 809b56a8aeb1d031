//! JWT validation hook.
//!
//! Requires announces to carry a signed JWT in the `jwt` parameter. Tokens
//! are validated against an RS256 key set (JWKS) fetched periodically from a
//! configured URL; a token must name a known `kid`, carry the configured
//! issuer and audience, be unexpired and hold an `infohash` claim equal to
//! the hex form of the announced infohash.
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use super::Hook;
use crate::error::{ClientError, Error};
use crate::logic::Context;
use crate::request::{AnnounceRequest, AnnounceResponse};

/// Default seconds between JWK set refreshes.
const DEFAULT_JWK_SET_UPDATE_INTERVAL: u64 = 300;

/// Options of the [`JwtHook`].
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct Options {
    /// Required `iss` claim value.
    pub issuer: String,

    /// Required `aud` claim value.
    pub audience: String,

    /// URL of the JWK set holding the RS256 public keys.
    pub jwk_set_url: String,

    /// Seconds between JWK set refreshes.
    #[serde(default = "default_update_interval")]
    pub jwk_set_update_interval: u64,
}

fn default_update_interval() -> u64 {
    DEFAULT_JWK_SET_UPDATE_INTERVAL
}

type KeyMap = HashMap<String, DecodingKey>;

/// The JWT validation hook.
///
/// Holds the refreshed key set behind a lock whose contents are replaced
/// wholesale, so readers always observe one consistent key set.
pub struct JwtHook {
    issuer: String,
    audience: String,
    keys: Arc<RwLock<KeyMap>>,
    halt: CancellationToken,
}

impl JwtHook {
    /// Builds the hook and spawns its key-refresher task. Must be called
    /// from within a tokio runtime.
    #[must_use]
    pub fn new(options: &Options) -> Self {
        let keys = Arc::new(RwLock::new(KeyMap::new()));
        let halt = CancellationToken::new();

        tokio::spawn(run_key_refresher(
            keys.clone(),
            options.jwk_set_url.clone(),
            Duration::from_secs(options.jwk_set_update_interval),
            halt.clone(),
        ));

        Self {
            issuer: options.issuer.clone(),
            audience: options.audience.clone(),
            keys,
            halt,
        }
    }

    fn validate(&self, token: &str, request: &AnnounceRequest) -> Result<(), ClientError> {
        let header = decode_header(token).map_err(|_| ClientError::InvalidJwt)?;
        let kid = header.kid.ok_or(ClientError::InvalidJwt)?;

        let keys = self.keys.read().expect("the key set lock should not be poisoned");
        let key = keys.get(&kid).ok_or(ClientError::InvalidJwt)?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);

        let data = decode::<Claims>(token, key, &validation).map_err(|_| ClientError::InvalidJwt)?;

        if data.claims.infohash.eq_ignore_ascii_case(&request.info_hash.to_hex_string()) {
            Ok(())
        } else {
            Err(ClientError::InvalidJwt)
        }
    }
}

#[derive(Deserialize)]
struct Claims {
    /// Custom claim binding the token to one torrent, hex encoded.
    infohash: String,
}

impl Hook for JwtHook {
    fn handle_announce(
        &self,
        _context: &mut Context,
        request: &AnnounceRequest,
        _response: &mut AnnounceResponse,
    ) -> Result<(), Error> {
        let token = request.params.get("jwt").ok_or(ClientError::MissingJwtParameter)?;

        self.validate(token, request)?;

        Ok(())
    }

    fn stop(&self) {
        self.halt.cancel();
    }
}

/// Fetches the JWK set at startup and then on every interval tick, replacing
/// the key map wholesale, until the token is cancelled.
async fn run_key_refresher(keys: Arc<RwLock<KeyMap>>, jwk_set_url: String, update_interval: Duration, halt: CancellationToken) {
    let mut interval = tokio::time::interval(update_interval);

    loop {
        tokio::select! {
            () = halt.cancelled() => {
                tracing::info!("jwk set refresher halting");
                break;
            }
            _ = interval.tick() => {
                match fetch_key_set(&jwk_set_url).await {
                    Ok(fresh_keys) => {
                        tracing::debug!(keys = fresh_keys.len(), "refreshed jwk set");
                        *keys.write().expect("the key set lock should not be poisoned") = fresh_keys;
                    }
                    Err(error) => {
                        // Keep serving with the previous key set.
                        tracing::warn!(%error, url = %jwk_set_url, "failed to refresh jwk set");
                    }
                }
            }
        }
    }
}

async fn fetch_key_set(jwk_set_url: &str) -> Result<KeyMap, reqwest::Error> {
    let jwk_set: JwkSet = reqwest::get(jwk_set_url).await?.json().await?;

    let mut fresh_keys = KeyMap::new();

    for jwk in &jwk_set.keys {
        let Some(kid) = jwk.common.key_id.clone() else {
            tracing::warn!("ignoring jwk without a kid");
            continue;
        };

        match DecodingKey::from_jwk(jwk) {
            Ok(key) => {
                fresh_keys.insert(kid, key);
            }
            Err(error) => {
                tracing::warn!(%error, %kid, "ignoring unusable jwk");
            }
        }
    }

    Ok(fresh_keys)
}

#[cfg(test)]
mod tests {

    mod jwt_validation {
        use jsonwebtoken::{encode, EncodingKey, Header};
        use serde::Serialize;

        use crate::error::ClientError;
        use crate::hooks::jwt::{JwtHook, Options};
        use crate::hooks::Hook;
        use crate::logic::Context;
        use crate::request::fixture::AnnounceRequestBuilder;
        use crate::request::AnnounceResponse;

        fn sample_options() -> Options {
            Options {
                issuer: "https://issuer.example.com".to_owned(),
                audience: "sample-tracker".to_owned(),
                // Nothing listens here; the hook must still reject cleanly
                // while the key set is empty.
                jwk_set_url: "http://127.0.0.1:1/jwks.json".to_owned(),
                jwk_set_update_interval: 3600,
            }
        }

        fn assert_rejected_with(hook: &JwtHook, request: &crate::request::AnnounceRequest, expected: &ClientError) {
            let error = hook
                .handle_announce(&mut Context::default(), request, &mut AnnounceResponse::default())
                .unwrap_err();

            assert_eq!(error.to_string(), expected.to_string());
        }

        #[tokio::test]
        async fn it_should_reject_an_announce_without_the_jwt_parameter() {
            let hook = JwtHook::new(&sample_options());

            let request = AnnounceRequestBuilder::default().build();

            assert_rejected_with(&hook, &request, &ClientError::MissingJwtParameter);

            hook.stop();
        }

        #[tokio::test]
        async fn it_should_reject_a_token_that_is_not_a_jwt() {
            let hook = JwtHook::new(&sample_options());

            let request = AnnounceRequestBuilder::default().with_param("jwt", "not-a-token").build();

            assert_rejected_with(&hook, &request, &ClientError::InvalidJwt);

            hook.stop();
        }

        #[tokio::test]
        async fn it_should_reject_a_token_whose_kid_is_not_in_the_key_set() {
            #[derive(Serialize)]
            struct Claims {
                infohash: String,
                exp: u64,
            }

            let hook = JwtHook::new(&sample_options());

            let header = Header {
                kid: Some("unknown-kid".to_owned()),
                ..Header::default()
            };
            let claims = Claims {
                infohash: "3b245504cf5f11bbdbe1201cea6a6bf45aee1bc0".to_owned(),
                exp: u64::MAX,
            };
            let token = encode(&header, &claims, &EncodingKey::from_secret(b"irrelevant")).unwrap();

            let request = AnnounceRequestBuilder::default().with_param("jwt", &token).build();

            assert_rejected_with(&hook, &request, &ClientError::InvalidJwt);

            hook.stop();
        }
    }
}

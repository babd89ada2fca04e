//! In-memory token-bucket rate limiter for the password route family.
//!
//! Per-process by design: running many instances weakens the guarantee
//! proportionally, which the deployment accepts. Buckets are keyed by
//! client IP; entries expire lazily.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tokio::sync::Mutex;
use tracing::warn;

use lightbase_core::config::RateLimitConfig;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone)]
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
    blocked_until: Option<Instant>,
}

/// Cost-aware token bucket limiter.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    /// IP → bucket state.
    buckets: Arc<Mutex<HashMap<String, TokenBucket>>>,
    config: RateLimitConfig,
}

impl RateLimiter {
    /// Creates a new rate limiter.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            buckets: Arc::new(Mutex::new(HashMap::new())),
            config,
        }
    }

    /// Attempts to consume `cost` tokens for the given key.
    ///
    /// Returns false while the key is blocked. Exhausting the bucket
    /// starts the block window.
    pub async fn check(&self, key: &str, cost: u32) -> bool {
        if !self.config.enabled {
            return true;
        }

        let mut buckets = self.buckets.lock().await;
        let now = Instant::now();

        self.sweep_expired(&mut buckets, now);

        let capacity = f64::from(self.config.capacity);
        let refill_rate = capacity / self.config.window_seconds as f64;

        let bucket = buckets.entry(key.to_string()).or_insert(TokenBucket {
            tokens: capacity,
            last_refill: now,
            blocked_until: None,
        });

        if let Some(blocked_until) = bucket.blocked_until {
            if now < blocked_until {
                return false;
            }
            bucket.blocked_until = None;
            bucket.tokens = capacity;
        }

        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * refill_rate).min(capacity);
        bucket.last_refill = now;

        if bucket.tokens >= f64::from(cost) {
            bucket.tokens -= f64::from(cost);
            true
        } else {
            bucket.blocked_until = Some(now + Duration::from_secs(self.config.block_seconds));
            warn!(key = %key, "Rate limit exhausted, key blocked");
            false
        }
    }

    /// Resolve the client IP: a signed `X-SSR-Ip` header wins over the
    /// socket address, but only when its HMAC matches the shared secret.
    pub fn client_ip(
        &self,
        ssr_ip: Option<&str>,
        ssr_verification: Option<&str>,
        peer_ip: &str,
    ) -> String {
        let Some(key) = &self.config.ssr_verification_key else {
            return peer_ip.to_string();
        };
        let (Some(ip), Some(verification)) = (ssr_ip, ssr_verification) else {
            return peer_ip.to_string();
        };

        if verify_ssr_signature(key, ip, verification) {
            ip.to_string()
        } else {
            warn!("X-SSR-Ip signature mismatch, falling back to peer address");
            peer_ip.to_string()
        }
    }

    /// Drop entries whose bucket is full and whose block expired. Called
    /// under the lock on every check; cheap while the map is small.
    fn sweep_expired(&self, buckets: &mut HashMap<String, TokenBucket>, now: Instant) {
        if buckets.len() < 4096 {
            return;
        }
        let window = Duration::from_secs(self.config.window_seconds);
        buckets.retain(|_, bucket| {
            let block_active = bucket.blocked_until.is_some_and(|until| now < until);
            block_active || now.duration_since(bucket.last_refill) < window
        });
    }
}

/// Constant-shape HMAC-SHA256 check over the forwarded IP.
fn verify_ssr_signature(key: &str, ip: &str, signature_hex: &str) -> bool {
    let mut mac = match HmacSha256::new_from_slice(key.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(ip.as_bytes());

    let Ok(expected) = hex_decode(signature_hex) else {
        return false;
    };
    mac.verify_slice(&expected).is_ok()
}

fn hex_decode(input: &str) -> Result<Vec<u8>, ()> {
    if input.len() % 2 != 0 {
        return Err(());
    }
    (0..input.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&input[i..i + 2], 16).map_err(|_| ()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(capacity: u32) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            enabled: true,
            capacity,
            window_seconds: 60,
            block_seconds: 600,
            ssr_verification_key: Some("ssr-secret".into()),
        })
    }

    #[tokio::test]
    async fn bucket_exhaustion_blocks() {
        let limiter = limiter(11);

        for _ in 0..11 {
            assert!(limiter.check("1.2.3.4", 1).await);
        }
        // 12th request exhausts the bucket and starts the block.
        assert!(!limiter.check("1.2.3.4", 1).await);
        assert!(!limiter.check("1.2.3.4", 1).await);
        // Other keys are unaffected.
        assert!(limiter.check("5.6.7.8", 1).await);
    }

    #[tokio::test]
    async fn login_cost_is_double() {
        let limiter = limiter(11);

        for _ in 0..5 {
            assert!(limiter.check("1.2.3.4", 2).await);
        }
        // 10 tokens spent; a second login does not fit the remaining 1.
        assert!(!limiter.check("1.2.3.4", 2).await);
    }

    #[test]
    fn ssr_ip_requires_valid_signature() {
        let limiter = limiter(11);

        let mut mac = HmacSha256::new_from_slice(b"ssr-secret").unwrap();
        mac.update(b"9.9.9.9");
        let signature: String = mac
            .finalize()
            .into_bytes()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect();

        assert_eq!(
            limiter.client_ip(Some("9.9.9.9"), Some(&signature), "1.1.1.1"),
            "9.9.9.9"
        );
        assert_eq!(
            limiter.client_ip(Some("9.9.9.9"), Some("deadbeef"), "1.1.1.1"),
            "1.1.1.1"
        );
        assert_eq!(limiter.client_ip(None, None, "1.1.1.1"), "1.1.1.1");
    }
}

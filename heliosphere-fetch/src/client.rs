use std::sync::Arc;

use chrono::{DateTime, Utc};
use governor::{Quota, RateLimiter};
use heliosphere_core::{Config, Layer};
use nonzero_ext::nonzero;
use sha2::{Digest, Sha256};
use tracing::debug;
use url::Url;

use crate::error::FetchError;

const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";
const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8];

/// One fetched source image (C2 output). `content_hash` is SHA-256, lowercase hex.
#[derive(Debug, Clone)]
pub struct RawImage {
    pub bytes: bytes::Bytes,
    pub content_hash: String,
    pub fetched_instant: DateTime<Utc>,
}

type Limiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// HTTP client for the source screenshot API (C2). Optionally routes through
/// a caching proxy; the proxy is treated as an opaque HTTP endpoint per
/// distilled spec §1's non-goals.
pub struct SourceClient {
    http: reqwest::Client,
    base_url: Url,
    proxy_url: Option<Url>,
    limiter: Arc<Limiter>,
}

impl SourceClient {
    pub fn new(base_url: Url, proxy_url: Option<Url>, cfg: &Config) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .connect_timeout(cfg.connect_timeout)
            .timeout(cfg.total_timeout)
            .build()
            .map_err(|e| FetchError::Permanent {
                reason: format!("building http client: {e}"),
            })?;

        // Polite default: 10 requests/sec to the upstream API, regardless of
        // how many fetch workers are in flight (distilled spec §5 bounds
        // *concurrency*; this bounds *rate*).
        let limiter = RateLimiter::direct(Quota::per_second(nonzero!(10u32)));

        Ok(Self {
            http,
            base_url,
            proxy_url,
            limiter: Arc::new(limiter),
        })
    }

    fn target_url(&self, layer: Layer, instant: DateTime<Utc>) -> Url {
        let params = layer.request_params();
        let original = format!(
            "{base}/v2/takeScreenshot/?date={date}&layers=[{source},1,100]&imageScale={scale}&width={w}&height={h}&x0=0&y0=0&display=true&watermark=false",
            base = self.base_url.as_str().trim_end_matches('/'),
            date = instant.to_rfc3339(),
            source = params.source_id,
            scale = params.image_scale,
            w = params.width,
            h = params.height,
        );

        match &self.proxy_url {
            Some(proxy) => {
                let encoded = url::form_urlencoded::byte_serialize(original.as_bytes()).collect::<String>();
                Url::parse(&format!("{}/?url={}", proxy.as_str().trim_end_matches('/'), encoded))
                    .expect("proxy url + encoded original is a valid url")
            }
            None => Url::parse(&original).expect("constructed original url is valid"),
        }
    }

    /// Fetches one image for `layer` at `instant`, retrying transient
    /// failures up to `cfg.max_retries` times with a fixed backoff.
    pub async fn fetch(
        &self,
        layer: Layer,
        instant: DateTime<Utc>,
        cfg: &Config,
    ) -> Result<RawImage, FetchError> {
        let mut last_reason = String::new();
        for attempt in 1..=cfg.max_retries.max(1) {
            self.limiter.until_ready().await;
            match self.try_once(layer, instant, cfg.min_frame_size_bytes).await {
                Ok(image) => return Ok(image),
                Err(FetchError::Permanent { reason }) => return Err(FetchError::Permanent { reason }),
                Err(FetchError::Transient { reason }) => {
                    debug!(%layer, %instant, attempt, %reason, "transient fetch failure, retrying");
                    last_reason = reason;
                    if attempt < cfg.max_retries {
                        tokio::time::sleep(cfg.retry_backoff).await;
                    }
                }
            }
        }
        Err(FetchError::Permanent {
            reason: format!("exhausted {} retries: {last_reason}", cfg.max_retries),
        })
    }

    async fn try_once(
        &self,
        layer: Layer,
        instant: DateTime<Utc>,
        min_frame_size_bytes: usize,
    ) -> Result<RawImage, FetchError> {
        let url = self.target_url(layer, instant);

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| classify_transport_error(&e))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(FetchError::Transient {
                reason: format!("upstream returned {status}"),
            });
        }
        if !status.is_success() {
            return Err(FetchError::Permanent {
                reason: format!("upstream returned {status}"),
            });
        }

        let bytes = response.bytes().await.map_err(|e| FetchError::Transient {
            reason: format!("reading response body: {e}"),
        })?;

        validate_body(&bytes)?;
        validate_min_size(&bytes, min_frame_size_bytes)?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let content_hash = hex::encode(hasher.finalize());

        Ok(RawImage {
            bytes,
            content_hash,
            fetched_instant: instant,
        })
    }
}

fn classify_transport_error(e: &reqwest::Error) -> FetchError {
    // Connect failures, timeouts, and mid-transfer drops are all retry
    // candidates; reqwest doesn't otherwise distinguish them here.
    FetchError::Transient {
        reason: e.to_string(),
    }
}

/// Validates that the body looks like a real image: PNG (preferred) or JPEG
/// magic number. A 1-byte body is treated as a transient failure (distilled
/// spec §8 boundary behavior). The configured minimum frame size is checked
/// separately by `validate_min_size`.
fn validate_body(bytes: &[u8]) -> Result<(), FetchError> {
    if bytes.len() < 8 {
        return Err(FetchError::Transient {
            reason: format!("body too small ({} bytes)", bytes.len()),
        });
    }
    let is_png = bytes.starts_with(PNG_MAGIC);
    let is_jpeg = bytes.starts_with(JPEG_MAGIC);
    if !is_png && !is_jpeg {
        return Err(FetchError::Transient {
            reason: "body is neither PNG nor JPEG".to_string(),
        });
    }
    Ok(())
}

/// Separately checks the configured minimum body size; kept apart from magic-byte
/// validation so the two rejection reasons stay distinguishable in logs.
pub(crate) fn validate_min_size(bytes: &[u8], min_frame_size_bytes: usize) -> Result<(), FetchError> {
    if bytes.len() < min_frame_size_bytes {
        return Err(FetchError::Transient {
            reason: format!(
                "body ({} bytes) below minimum frame size ({} bytes)",
                bytes.len(),
                min_frame_size_bytes
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_one_byte_body() {
        let err = validate_body(&[0u8]).unwrap_err();
        assert!(matches!(err, FetchError::Transient { .. }));
    }

    #[test]
    fn accepts_png_magic() {
        let mut body = PNG_MAGIC.to_vec();
        body.extend_from_slice(&[0u8; 16]);
        assert!(validate_body(&body).is_ok());
    }

    #[test]
    fn accepts_jpeg_magic() {
        let mut body = JPEG_MAGIC.to_vec();
        body.extend_from_slice(&[0u8; 16]);
        assert!(validate_body(&body).is_ok());
    }

    #[test]
    fn rejects_unknown_magic() {
        let body = vec![0u8; 32];
        assert!(validate_body(&body).is_err());
    }

    #[test]
    fn rejects_body_under_configured_minimum() {
        let mut body = PNG_MAGIC.to_vec();
        body.extend_from_slice(&[0u8; 16]);
        assert!(validate_min_size(&body, 4096).is_err());
        assert!(validate_min_size(&body, 8).is_ok());
    }
}

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use heliosphere_core::{Config, DuplicateOracle, Layer};
use tracing::debug;

use crate::client::{RawImage, SourceClient};
use crate::error::{AttemptOutcome, OffsetAttempt, ResolveError};

/// Result of a successful C3 resolution: the accepted image plus the
/// minute offset (relative to the requested target) that produced it.
#[derive(Debug, Clone)]
pub struct ResolveOutcome {
    pub image: RawImage,
    pub offset_minutes: i64,
    pub resolved_instant: DateTime<Utc>,
}

/// Walks `layer`'s offset schedule from `target`, accepting the first fetch
/// that succeeds and is not a known duplicate at `grid_index`'s neighborhood.
/// Mirrors distilled spec §4.3: offsets are tried in the layer's fixed
/// authoritative order, not by absolute distance from the target.
pub async fn resolve(
    client: &SourceClient,
    oracle: &dyn DuplicateOracle,
    layer: Layer,
    target: DateTime<Utc>,
    grid_index: u32,
    cfg: &Config,
) -> Result<ResolveOutcome, ResolveError> {
    let mut attempted = Vec::new();

    for &offset_minutes in layer.offset_schedule() {
        if offset_minutes.unsigned_abs() > cfg.max_fallback_minutes as u64 {
            continue;
        }

        let candidate = target + ChronoDuration::minutes(offset_minutes);

        match client.fetch(layer, candidate, cfg).await {
            Ok(image) => {
                if !oracle.try_reserve(layer, &image.content_hash, grid_index) {
                    debug!(%layer, offset_minutes, hash = %image.content_hash, "rejecting duplicate");
                    attempted.push(OffsetAttempt {
                        offset_minutes,
                        outcome: AttemptOutcome::Duplicate {
                            hash: image.content_hash,
                        },
                    });
                    continue;
                }

                return Ok(ResolveOutcome {
                    image,
                    offset_minutes,
                    resolved_instant: candidate,
                });
            }
            Err(err) => {
                attempted.push(OffsetAttempt {
                    offset_minutes,
                    outcome: AttemptOutcome::FetchFailed(err),
                });
            }
        }
    }

    let all_duplicates = !attempted.is_empty()
        && attempted
            .iter()
            .all(|a| matches!(a.outcome, AttemptOutcome::Duplicate { .. }));

    if all_duplicates {
        Err(ResolveError::DuplicateExhausted { attempted })
    } else {
        Err(ResolveError::ResolveFailure { attempted })
    }
}

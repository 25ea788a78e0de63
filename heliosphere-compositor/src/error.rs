use thiserror::Error;

/// C5 compositing errors (distilled spec §7 `CompositingError`). The
/// orchestrator marks the grid index missing on any of these without
/// incrementing its consecutive-failure counter: the upstream data was fine,
/// the local image pipeline failed.
#[derive(Debug, Error)]
pub enum CompositeError {
    #[error("decoding {layer} image: {source}")]
    Decode {
        layer: &'static str,
        #[source]
        source: image::ImageError,
    },

    #[error("encoding composite as jpeg: {0}")]
    Encode(#[from] jpeg_encoder::EncodingError),

    #[error("composite crop region falls outside the canvas")]
    CropOutOfBounds,
}

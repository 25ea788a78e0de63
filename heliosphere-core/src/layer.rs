use serde::{Deserialize, Serialize};

/// One of the two source streams that are composited together into a frame.
///
/// `Corona` is the outer-corona coronagraph source; `SunDisk` is the
/// extreme-ultraviolet sun-disk source. Each has its own request geometry
/// and its own temporal-fallback offset schedule (see [`Layer::offset_schedule`]):
/// the corona source updates less frequently, so its schedule is wider and
/// biased toward the past.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Layer {
    Corona,
    SunDisk,
}

impl Layer {
    pub const ALL: [Layer; 2] = [Layer::Corona, Layer::SunDisk];

    /// Fixed request parameters for this layer's source API call.
    pub fn request_params(self) -> LayerParams {
        match self {
            Layer::Corona => LayerParams {
                source_id: 4,
                image_scale: 8.0,
                width: 1920,
                height: 1200,
            },
            Layer::SunDisk => LayerParams {
                source_id: 10,
                image_scale: 2.5,
                width: 1920,
                height: 1920,
            },
        }
    }

    /// Ordered minute offsets tried by the fallback resolver (C3), authoritative order.
    ///
    /// The first offset is always 0 (exact match). Tie-breaks live in the
    /// resolver, not here: this schedule only fixes the search order.
    pub fn offset_schedule(self) -> &'static [i64] {
        match self {
            Layer::Corona => &[0, -3, -7, -1, 1, 3, -5, 5, 7, -10, 10, -14, 14],
            Layer::SunDisk => &[0, 1, -1, 3, -3, 5, -5, 7, -7, 10, -10, 14, -14],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Layer::Corona => "corona",
            Layer::SunDisk => "sun_disk",
        }
    }
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed request parameters for one layer's source API call (see distilled spec §6).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerParams {
    pub source_id: u32,
    pub image_scale: f64,
    pub width: u32,
    pub height: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_schedule_starts_at_zero() {
        for layer in Layer::ALL {
            assert_eq!(layer.offset_schedule()[0], 0);
        }
    }

    #[test]
    fn corona_schedule_is_wider_and_negative_biased() {
        let corona = Layer::Corona.offset_schedule();
        let sun_disk = Layer::SunDisk.offset_schedule();
        assert_eq!(corona[1], -3);
        assert_eq!(sun_disk[1], 1);
        assert_eq!(corona.len(), sun_disk.len());
    }
}

//! Render-time tunables. Not loaded from a file — constructing and wiring
//! up a `Config` is the embedding application's job; this crate only
//! defines what knobs exist and their defaults.

/// Tunables consulted by the patch splitter and the render loop.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Multiplier applied to a ray's footprint width to get the patch
    /// dicing threshold: `max(footprint_width * dice_rate, min_upoly_size)`.
    pub dice_rate: f32,
    /// Floor under the dicing threshold so patches never dice smaller than
    /// this regardless of how tight the ray footprint gets.
    pub min_upoly_size: f32,
    /// Worker thread count for `Scene::render`. 0 defers to rayon's default
    /// (the number of logical cores).
    pub thread_count: usize,
    /// Square bucket edge length, in pixels, for the render's work queue.
    pub bucket_size: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dice_rate: 1.0,
            min_upoly_size: 0.001,
            thread_count: 0,
            bucket_size: 32,
        }
    }
}

impl Config {
    /// The dicing threshold for a given ray footprint width, per the
    /// canonical formula: never finer than `min_upoly_size`, never coarser
    /// than the footprint itself scaled by `dice_rate`.
    pub fn dice_threshold(&self, footprint_width: f32) -> f32 {
        (footprint_width * self.dice_rate).max(self.min_upoly_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dice_threshold_respects_floor() {
        let cfg = Config {
            dice_rate: 1.0,
            min_upoly_size: 0.01,
            ..Config::default()
        };
        assert_eq!(cfg.dice_threshold(0.001), 0.01);
        assert_eq!(cfg.dice_threshold(1.0), 1.0);
    }
}

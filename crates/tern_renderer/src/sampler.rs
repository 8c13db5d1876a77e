//! Per-pixel sample generators.
//!
//! A sampler hands out the uniform variates every other component consumes.
//! Render workers each own a clone, so samplers never need to be shared.

use serde::Deserialize;
use tern_math::{hash, Pcg32, Vec2};

/// Source of uniform variates in `[0, 1)`, organised by pixel and sample.
pub trait Sampler: Send + Sync {
    /// Samples taken per pixel.
    fn sample_count(&self) -> u32;

    fn set_base_seed(&mut self, seed: u32);

    /// Begin the first sample of pixel (x, y).
    fn start_pixel(&mut self, x: u32, y: u32);

    /// Advance to the next sample of the current pixel.
    fn start_next_sample(&mut self);

    fn next_f32(&mut self) -> f32;

    fn next_vec2(&mut self) -> Vec2 {
        let x = self.next_f32();
        let y = self.next_f32();
        Vec2::new(x, y)
    }

    /// An independent copy for another worker.
    fn boxed_clone(&self) -> Box<dyn Sampler>;
}

/// Uncorrelated random numbers from a [`Pcg32`] stream.
///
/// The stream is reseeded from the pixel, the sample index and the base seed
/// at the start of every sample, so the values of a sample never depend on
/// the order in which pixels are rendered.
#[derive(Debug, Clone)]
pub struct IndependentSampler {
    sample_count: u32,
    base_seed: u32,
    pixel: (u32, u32),
    current_sample: u32,
    rng: Pcg32,
}

impl IndependentSampler {
    pub fn new(sample_count: u32) -> Self {
        let mut sampler = Self {
            sample_count: sample_count.max(1),
            base_seed: 0,
            pixel: (0, 0),
            current_sample: 0,
            rng: Pcg32::default(),
        };
        sampler.reseed();
        sampler
    }

    pub fn current_sample(&self) -> u32 {
        self.current_sample
    }

    fn reseed(&mut self) {
        let (x, y) = self.pixel;
        self.rng
            .seed_sequence(hash!(self.current_sample, self.base_seed, x, y));
    }
}

impl Sampler for IndependentSampler {
    fn sample_count(&self) -> u32 {
        self.sample_count
    }

    fn set_base_seed(&mut self, seed: u32) {
        self.base_seed = seed;
        self.reseed();
    }

    fn start_pixel(&mut self, x: u32, y: u32) {
        self.pixel = (x, y);
        self.current_sample = 0;
        self.reseed();
    }

    fn start_next_sample(&mut self) {
        self.current_sample += 1;
        self.reseed();
    }

    fn next_f32(&mut self) -> f32 {
        self.rng.next_f32()
    }

    fn next_vec2(&mut self) -> Vec2 {
        self.rng.next_vec2()
    }

    fn boxed_clone(&self) -> Box<dyn Sampler> {
        Box::new(self.clone())
    }
}

/// Scene-file description of a sampler.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SamplerConfig {
    Independent {
        #[serde(default = "default_samples")]
        samples: u32,
    },
}

const DEFAULT_SAMPLES: u32 = 1;

fn default_samples() -> u32 {
    log::warn!(
        "Sampler has no \"samples\" key, using {} sample per pixel",
        DEFAULT_SAMPLES
    );
    DEFAULT_SAMPLES
}

impl Default for SamplerConfig {
    fn default() -> Self {
        SamplerConfig::Independent {
            samples: DEFAULT_SAMPLES,
        }
    }
}

impl SamplerConfig {
    pub fn build(&self) -> Box<dyn Sampler> {
        match *self {
            SamplerConfig::Independent { samples } => Box::new(IndependentSampler::new(samples)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn draw(sampler: &mut dyn Sampler, n: usize) -> Vec<f32> {
        (0..n).map(|_| sampler.next_f32()).collect()
    }

    #[test]
    fn test_values_in_unit_interval() {
        let mut sampler = IndependentSampler::new(4);
        sampler.start_pixel(3, 7);
        for v in draw(&mut sampler, 1000) {
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn test_samples_are_order_independent() {
        let mut a = IndependentSampler::new(4);
        a.set_base_seed(11);
        a.start_pixel(5, 5);
        a.start_next_sample();
        a.start_next_sample();
        let expected = draw(&mut a, 8);

        // Render other pixels first, then come back to the same sample
        let mut b = IndependentSampler::new(4);
        b.set_base_seed(11);
        b.start_pixel(0, 0);
        draw(&mut b, 100);
        b.start_pixel(5, 5);
        draw(&mut b, 3);
        b.start_next_sample();
        b.start_next_sample();
        assert_eq!(draw(&mut b, 8), expected);
    }

    #[test]
    fn test_pixels_and_seeds_differ() {
        let mut sampler = IndependentSampler::new(1);
        sampler.start_pixel(1, 0);
        let a = draw(&mut sampler, 4);
        sampler.start_pixel(0, 1);
        let b = draw(&mut sampler, 4);
        assert_ne!(a, b);

        sampler.set_base_seed(2);
        sampler.start_pixel(1, 0);
        assert_ne!(draw(&mut sampler, 4), a);
    }

    #[test]
    fn test_boxed_clone_continues_identically() {
        let mut sampler = IndependentSampler::new(2);
        sampler.start_pixel(9, 4);
        draw(&mut sampler, 5);
        let mut clone = sampler.boxed_clone();
        assert_eq!(clone.sample_count(), 2);
        assert_eq!(draw(clone.as_mut(), 6), draw(&mut sampler, 6));
    }

    #[test]
    fn test_sampler_config() {
        let config: SamplerConfig = serde_json::from_value(json!({"type": "independent", "samples": 16})).unwrap();
        assert_eq!(config.build().sample_count(), 16);

        // Missing counts fall back to one sample, with a warning
        let config: SamplerConfig = serde_json::from_value(json!({"type": "independent"})).unwrap();
        assert_eq!(config.build().sample_count(), 1);
        assert_eq!(SamplerConfig::default().build().sample_count(), 1);

        assert!(serde_json::from_value::<SamplerConfig>(json!({"type": "sobol"})).is_err());
    }
}

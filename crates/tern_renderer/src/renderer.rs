//! Image rendering.
//!
//! The image is split into buckets that rayon renders in parallel, each with
//! its own copy of the scene's sampler. Radiance stays linear until
//! [`ImageBuffer::to_rgba`] encodes it for display.

use crate::bucket::{generate_buckets, render_bucket, BucketResult, DEFAULT_BUCKET_SIZE};
use crate::material::Color;
use crate::sampler::Sampler;
use crate::scene::Scene;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tern_math::Vec2;

/// Render configuration.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Bucket edge length in pixels
    pub bucket_size: u32,
    /// Seed mixed into every sampler stream
    pub base_seed: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            bucket_size: DEFAULT_BUCKET_SIZE,
            base_seed: 0,
        }
    }
}

/// Average of the scene's samples for pixel (x, y).
///
/// Non-finite samples are logged and count as black.
pub fn render_pixel(scene: &Scene, sampler: &mut dyn Sampler, x: u32, y: u32) -> Color {
    let camera = scene.camera();
    let integrator = scene.integrator();
    let count = sampler.sample_count();

    sampler.start_pixel(x, y);
    let mut pixel_color = Color::ZERO;
    for _ in 0..count {
        let pixel = Vec2::new(x as f32, y as f32) + sampler.next_vec2();
        let ray = camera.generate_ray(pixel, sampler.next_vec2());
        let li = integrator.li(scene, sampler, &ray);

        if li.is_finite() {
            pixel_color += li;
        } else {
            log::warn!("Skipping non-finite radiance sample {} at pixel ({}, {})", li, x, y);
        }
        sampler.start_next_sample();
    }

    pixel_color / count.max(1) as f32
}

/// Linear radiance image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Color>,
}

impl ImageBuffer {
    /// Create a new image buffer filled with black.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Color::ZERO; (width * height) as usize],
        }
    }

    pub fn get(&self, x: u32, y: u32) -> Color {
        self.pixels[(y * self.width + x) as usize]
    }

    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        self.pixels[(y * self.width + x) as usize] = color;
    }

    /// Mean pixel value.
    pub fn average(&self) -> Color {
        if self.pixels.is_empty() {
            return Color::ZERO;
        }
        self.pixels.iter().copied().sum::<Color>() / self.pixels.len() as f32
    }

    /// Copy a rendered bucket into place.
    fn write_bucket(&mut self, result: &BucketResult) {
        let b = &result.bucket;
        for (i, color) in result.pixels.iter().enumerate() {
            let i = i as u32;
            self.set(b.x + i % b.width, b.y + i / b.width, *color);
        }
    }

    /// sRGB-encoded RGBA bytes, row-major from the top-left pixel.
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.pixels.len() * 4);
        for color in &self.pixels {
            bytes.extend_from_slice(&color_to_rgba(*color));
        }
        bytes
    }
}

/// The sRGB transfer curve.
#[inline]
pub fn linear_to_srgb(linear: f32) -> f32 {
    if linear <= 0.003_130_8 {
        12.92 * linear
    } else {
        1.055 * linear.powf(1.0 / 2.4) - 0.055
    }
}

/// Convert a linear color to 8-bit sRGB with opaque alpha.
pub fn color_to_rgba(color: Color) -> [u8; 4] {
    let quantize = |c: f32| (255.0 * linear_to_srgb(c).clamp(0.0, 1.0) + 0.5) as u8;
    [quantize(color.x), quantize(color.y), quantize(color.z), 255]
}

/// Render the scene's camera view.
///
/// `cancel` is checked before each bucket starts; buckets skipped after a
/// cancellation stay black.
pub fn render(scene: &Scene, config: &RenderConfig, cancel: Option<&AtomicBool>) -> ImageBuffer {
    let resolution = scene.camera().resolution();
    let buckets = generate_buckets(resolution.x, resolution.y, config.bucket_size);
    let total = buckets.len();
    let finished = AtomicUsize::new(0);
    let report_every = (total / 10).max(1);

    log::info!(
        "Rendering {}x{} at {} spp in {} buckets",
        resolution.x,
        resolution.y,
        scene.sampler().sample_count(),
        total
    );

    let results: Vec<BucketResult> = buckets
        .par_iter()
        .filter_map(|bucket| {
            if cancel.is_some_and(|c| c.load(Ordering::Relaxed)) {
                return None;
            }

            let mut sampler = scene.sampler().boxed_clone();
            sampler.set_base_seed(config.base_seed);
            let pixels = render_bucket(bucket, scene, sampler.as_mut());

            let done = finished.fetch_add(1, Ordering::Relaxed) + 1;
            if done % report_every == 0 || done == total {
                log::info!("Rendered {}/{} buckets", done, total);
            }
            Some(BucketResult::new(*bucket, pixels))
        })
        .collect();

    if results.len() < total {
        log::warn!("Render cancelled after {}/{} buckets", results.len(), total);
    }

    let mut image = ImageBuffer::new(resolution.x, resolution.y);
    for result in &results {
        image.write_bucket(result);
    }
    image
}

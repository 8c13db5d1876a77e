//! `tern` - render a JSON scene to an image, or run a sampling test suite.

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::time::Instant;
use tern_core::FileResolver;
use tern_renderer::{
    demo_scene, is_test_suite, render, run_test_suite, RenderConfig, Scene, DEFAULT_BUCKET_SIZE,
    DEMO_SCENES,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Scene or test-suite JSON file
    #[arg(required_unless_present = "demo", conflicts_with = "demo")]
    scene: Option<PathBuf>,

    /// Render a built-in scene instead of a file
    #[arg(long)]
    demo: Option<String>,

    /// Output image; the format follows the extension
    #[arg(short, long, default_value = "out.png")]
    output: PathBuf,

    /// Override the scene's samples per pixel
    #[arg(short, long)]
    samples: Option<u32>,

    /// Seed mixed into every pixel's random stream
    #[arg(long, default_value_t = 0)]
    seed: u32,

    /// Bucket edge length in pixels
    #[arg(long, default_value_t = DEFAULT_BUCKET_SIZE)]
    bucket_size: u32,
}

/// Set `sampler.samples`, creating the sampler section if needed.
fn override_samples(j: &mut Value, samples: u32) -> Result<()> {
    let scene = j
        .as_object_mut()
        .ok_or_else(|| anyhow!("scene description must be a JSON object"))?;
    let sampler = scene
        .entry("sampler")
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or_else(|| anyhow!("\"sampler\" must be a JSON object"))?;
    sampler.insert("samples".to_string(), Value::from(samples));
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args = Args::parse();
    let mut resolver = FileResolver::new();

    let mut j = match (&args.scene, &args.demo) {
        (_, Some(name)) => demo_scene(name).ok_or_else(|| {
            anyhow!("unknown demo \"{}\" (available: {})", name, DEMO_SCENES.join(", "))
        })?,
        (Some(path), None) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            if let Some(dir) = path.parent() {
                resolver.prepend(dir);
            }
            serde_json::from_str::<Value>(&text)
                .with_context(|| format!("parsing {}", path.display()))?
        }
        (None, None) => bail!("no scene given"),
    };

    if is_test_suite(&j) {
        let (passed, total) = run_test_suite(&j)?;
        if passed != total {
            bail!("{} of {} tests failed", total - passed, total);
        }
        return Ok(());
    }

    if let Some(samples) = args.samples {
        override_samples(&mut j, samples)?;
    }

    let start = Instant::now();
    let scene = Scene::from_json(&j, &resolver).context("loading scene")?;
    log::info!("Scene loaded in {:?}", start.elapsed());

    let config = RenderConfig {
        bucket_size: args.bucket_size,
        base_seed: args.seed,
    };
    let start = Instant::now();
    let image = render(&scene, &config, None);
    log::info!("Rendered in {:?}", start.elapsed());

    let rgba = image::RgbaImage::from_raw(image.width, image.height, image.to_rgba())
        .ok_or_else(|| anyhow!("image buffer does not match its resolution"))?;
    rgba.save(&args.output)
        .with_context(|| format!("writing {}", args.output.display()))?;
    log::info!("Saved {}", args.output.display());

    Ok(())
}

//! Tern renderer - Monte Carlo path tracing on the CPU.
//!
//! Scene geometry implements [`Surface`]; composites ([`SurfaceGroup`],
//! [`Bbh`], [`Instance`]) hold other surfaces, and emissive leaves can be
//! importance sampled through [`Emitter`]. A [`Scene`] ties the geometry to
//! a camera, a sampler and an integrator, and [`render`] produces a linear
//! [`ImageBuffer`] from it.

mod bbh;
mod bucket;
mod camera;
mod demo_scenes;
mod group;
mod instance;
mod integrator;
mod material;
mod mesh;
mod quad;
mod renderer;
mod sampler;
mod scene;
mod sphere;
mod surface;
mod triangle;

pub use bbh::{Bbh, BbhNode, DEFAULT_MAX_LEAF_SIZE};
pub use bucket::{generate_buckets, render_bucket, Bucket, BucketResult, DEFAULT_BUCKET_SIZE};
pub use camera::Camera;
pub use demo_scenes::{demo_scene, DEMO_SCENES};
pub use group::SurfaceGroup;
pub use instance::Instance;
pub use integrator::{
    Integrator, IntegratorConfig, NormalsIntegrator, PathTracer, PathTracerSettings, Strategy,
};
pub use material::{
    material_from_json, reflect, refract, Color, Dielectric, DiffuseLight, Lambertian, Material,
    MaterialLibrary, Metal, Phong, ScatterRecord,
};
pub use mesh::Mesh;
pub use quad::Quad;
pub use renderer::{
    color_to_rgba, linear_to_srgb, render, render_pixel, ImageBuffer, RenderConfig,
};
pub use sampler::{IndependentSampler, Sampler, SamplerConfig};
pub use scatter_test::{
    is_test_suite, run_test_suite, MaterialSampleTest, SampleTest, ScatterReport, ScatterTest,
    ScatterTestError, ScatterTestResult, Warp, WarpSampleTest,
};
pub use scene::{AcceleratorConfig, Scene, SceneBuilder};
pub use sphere::Sphere;
pub use surface::{
    Emitter, EmitterRecord, HitRecord, Surface, SurfaceError, SurfaceResult,
};
pub use triangle::Triangle;

/// Re-export the math types the public API is written in
pub use tern_math::{Box3, Ray, Transform, UVec2, Vec2, Vec3};

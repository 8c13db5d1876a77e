//! Built-in scene descriptions.
//!
//! Each demo is an ordinary JSON scene, so it exercises the same loading
//! path as a scene file on disk.

use serde_json::{json, Value};

/// Names accepted by [`demo_scene`].
pub const DEMO_SCENES: &[&str] = &["sphere", "cornell", "steinbach"];

/// The JSON description of a built-in scene.
pub fn demo_scene(name: &str) -> Option<Value> {
    match name {
        "sphere" => Some(sphere()),
        "cornell" => Some(cornell()),
        "steinbach" => Some(steinbach()),
        _ => None,
    }
}

/// One diffuse sphere on a floor, lit by a small spherical lamp.
fn sphere() -> Value {
    json!({
        "camera": {
            "transform": {"from": [0, 1, 4], "to": [0, 0.5, 0], "up": [0, 1, 0]},
            "resolution": [320, 240],
            "vertical fov": 40
        },
        "sampler": {"type": "independent", "samples": 16},
        "integrator": {"type": "path_tracer_mis", "max bounces": 8},
        "background": [0.05, 0.05, 0.08],
        "materials": [
            {"name": "floor", "type": "diffuse", "color": 0.6},
            {"name": "orange", "type": "diffuse", "color": [0.8, 0.4, 0.1]},
            {"name": "lamp", "type": "diffuse light", "color": 1, "intensity": 20}
        ],
        "surfaces": [
            {"type": "quad", "size": 20, "material": "floor",
             "transform": {"axis": [1, 0, 0], "angle": -90}},
            {"type": "sphere", "radius": 0.5, "material": "orange",
             "transform": {"translate": [0, 0.5, 0]}},
            {"type": "sphere", "radius": 0.25, "material": "lamp",
             "transform": {"translate": [1.5, 2.5, 1]}}
        ]
    })
}

/// The Cornell box: five walls, a ceiling light and two spheres.
fn cornell() -> Value {
    json!({
        "camera": {
            "transform": {"from": [0, 0, 3.9], "to": [0, 0, 0], "up": [0, 1, 0]},
            "resolution": [256, 256],
            "vertical fov": 38
        },
        "sampler": {"type": "independent", "samples": 32},
        "integrator": {"type": "path_tracer_mis", "max bounces": 16},
        "materials": [
            {"name": "white", "type": "diffuse", "color": 0.73},
            {"name": "red", "type": "diffuse", "color": [0.65, 0.05, 0.05]},
            {"name": "green", "type": "diffuse", "color": [0.12, 0.45, 0.15]},
            {"name": "light", "type": "diffuse light", "color": 1, "intensity": 12}
        ],
        "surfaces": [
            {"type": "quad", "size": 2, "material": "white",
             "transform": [{"axis": [1, 0, 0], "angle": -90}, {"translate": [0, -1, 0]}]},
            {"type": "quad", "size": 2, "material": "white",
             "transform": [{"axis": [1, 0, 0], "angle": 90}, {"translate": [0, 1, 0]}]},
            {"type": "quad", "size": 2, "material": "white",
             "transform": {"translate": [0, 0, -1]}},
            {"type": "quad", "size": 2, "material": "red",
             "transform": [{"axis": [0, 1, 0], "angle": 90}, {"translate": [-1, 0, 0]}]},
            {"type": "quad", "size": 2, "material": "green",
             "transform": [{"axis": [0, 1, 0], "angle": -90}, {"translate": [1, 0, 0]}]},
            {"type": "quad", "size": 0.5, "material": "light",
             "transform": [{"axis": [1, 0, 0], "angle": 90}, {"translate": [0, 0.99, 0]}]},
            {"type": "sphere", "radius": 0.3, "material": "white",
             "transform": {"translate": [-0.4, -0.7, -0.3]}},
            {"type": "sphere", "radius": 0.3, "material": {"type": "dielectric", "ior": 1.5},
             "transform": {"translate": [0.4, -0.7, 0.3]}}
        ]
    })
}

/// A grid of spheres cycling through every material type.
fn steinbach() -> Value {
    let finishes = [
        json!({"type": "diffuse", "color": [0.7, 0.3, 0.3]}),
        json!({"type": "phong", "color": [0.3, 0.6, 0.3], "exponent": 40}),
        json!({"type": "metal", "color": [0.9, 0.8, 0.5], "roughness": 0.2}),
        json!({"type": "dielectric", "ior": 1.5}),
        json!({"type": "metal", "color": 0.9, "roughness": 0}),
    ];

    let mut spheres = Vec::new();
    for row in 0..5 {
        for col in 0..5 {
            let x = (col as f32 - 2.0) * 0.9;
            let z = (row as f32 - 2.0) * 0.9;
            spheres.push(json!({
                "type": "sphere",
                "radius": 0.35,
                "material": finishes[(row + col) % finishes.len()],
                "transform": {"translate": [x, 0.35, z]}
            }));
        }
    }

    json!({
        "camera": {
            "transform": {"from": [0, 3.5, 5], "to": [0, 0, 0], "up": [0, 1, 0]},
            "resolution": [320, 240],
            "vertical fov": 45
        },
        "sampler": {"type": "independent", "samples": 16},
        "integrator": {"type": "path_tracer_mis", "max bounces": 12},
        "background": [0.2, 0.25, 0.3],
        "materials": [
            {"name": "ground", "type": "diffuse", "color": 0.5},
            {"name": "sun", "type": "diffuse light", "color": [1, 0.95, 0.85], "intensity": 8}
        ],
        "surfaces": [
            {"type": "quad", "size": 30, "material": "ground",
             "transform": {"axis": [1, 0, 0], "angle": -90}},
            {"type": "group", "surfaces": spheres},
            {"type": "sphere", "radius": 1.5, "material": "sun",
             "transform": {"translate": [-4, 7, 3]}}
        ]
    })
}

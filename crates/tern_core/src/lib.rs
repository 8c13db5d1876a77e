//! Tern Core - scene configuration and asset loading.
//!
//! This crate provides:
//!
//! - **Configuration helpers** over `serde_json::Value` scene descriptions
//! - **File resolution** for assets referenced relative to a scene file
//! - **Mesh data**: the triangle-mesh container and the parser callback
//!   interface that fills it, with an OBJ front end
//!
//! # Example
//!
//! ```ignore
//! use tern_core::{obj, Transform};
//!
//! let mesh = obj::load_obj_mesh("bunny.obj", Transform::IDENTITY, "")?;
//! println!("Loaded {} faces", mesh.face_count());
//! ```

pub mod config;
pub mod mesh;
pub mod obj;
pub mod resolver;

// Re-export commonly used types
pub use config::{ConfigError, ConfigResult};
pub use mesh::{FaceVertex, MeshBuilder, MeshData, MeshError, MeshResult, MeshSink};
pub use resolver::FileResolver;
pub use tern_math::Transform;

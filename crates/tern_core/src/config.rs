//! Helpers for reading scene descriptions.
//!
//! Scenes are JSON documents. Each component reads the keys it understands
//! from its own object and falls back to documented defaults; a key that is
//! present with the wrong shape is always an error.

use crate::mesh::MeshError;
use serde_json::{Map, Value};
use tern_math::{Mat4, Transform, UVec2, Vec2, Vec3};
use thiserror::Error;

/// Errors raised while constructing a scene from its description.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field \"{0}\"")]
    Missing(String),

    #[error("invalid value for \"{field}\": {reason}")]
    Invalid { field: String, reason: String },

    #[error("unknown {kind} type \"{name}\"")]
    UnknownType { kind: &'static str, name: String },

    #[error("unknown material \"{0}\"")]
    UnknownMaterial(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Mesh error: {0}")]
    Mesh(#[from] MeshError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

impl ConfigError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// The value stored under `key`, or an error if it is absent.
pub fn require<'a>(j: &'a Value, key: &str) -> ConfigResult<&'a Value> {
    j.get(key).ok_or_else(|| ConfigError::Missing(key.to_string()))
}

pub fn require_str<'a>(j: &'a Value, key: &str) -> ConfigResult<&'a str> {
    require(j, key)?
        .as_str()
        .ok_or_else(|| ConfigError::invalid(key, "expected a string"))
}

fn as_f32(v: &Value, field: &str) -> ConfigResult<f32> {
    v.as_f64()
        .map(|x| x as f32)
        .ok_or_else(|| ConfigError::invalid(field, "expected a number"))
}

/// A number splatted to `N` components, or an array of exactly `N` numbers.
fn as_floats<const N: usize>(v: &Value, field: &str) -> ConfigResult<[f32; N]> {
    match v {
        Value::Number(_) => Ok([as_f32(v, field)?; N]),
        Value::Array(items) if items.len() == N => {
            let mut out = [0.0; N];
            for (slot, item) in out.iter_mut().zip(items) {
                *slot = as_f32(item, field)?;
            }
            Ok(out)
        }
        _ => Err(ConfigError::invalid(
            field,
            format!("expected a number or an array of {N} numbers"),
        )),
    }
}

pub fn parse_vec2(v: &Value, field: &str) -> ConfigResult<Vec2> {
    as_floats::<2>(v, field).map(Vec2::from_array)
}

pub fn parse_vec3(v: &Value, field: &str) -> ConfigResult<Vec3> {
    as_floats::<3>(v, field).map(Vec3::from_array)
}

pub fn get_f32(j: &Value, key: &str, default: f32) -> ConfigResult<f32> {
    j.get(key).map_or(Ok(default), |v| as_f32(v, key))
}

pub fn get_u32(j: &Value, key: &str, default: u32) -> ConfigResult<u32> {
    match j.get(key) {
        None => Ok(default),
        Some(v) => v
            .as_u64()
            .and_then(|x| u32::try_from(x).ok())
            .ok_or_else(|| ConfigError::invalid(key, "expected a non-negative integer")),
    }
}

pub fn get_bool(j: &Value, key: &str, default: bool) -> ConfigResult<bool> {
    match j.get(key) {
        None => Ok(default),
        Some(v) => v
            .as_bool()
            .ok_or_else(|| ConfigError::invalid(key, "expected true or false")),
    }
}

pub fn get_string(j: &Value, key: &str, default: &str) -> ConfigResult<String> {
    match j.get(key) {
        None => Ok(default.to_string()),
        Some(v) => v
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ConfigError::invalid(key, "expected a string")),
    }
}

pub fn get_vec2(j: &Value, key: &str, default: Vec2) -> ConfigResult<Vec2> {
    j.get(key).map_or(Ok(default), |v| parse_vec2(v, key))
}

pub fn get_vec3(j: &Value, key: &str, default: Vec3) -> ConfigResult<Vec3> {
    j.get(key).map_or(Ok(default), |v| parse_vec3(v, key))
}

/// Colors share the vector syntax; a single number is a grey.
pub fn get_color(j: &Value, key: &str, default: Vec3) -> ConfigResult<Vec3> {
    get_vec3(j, key, default)
}

/// Two non-negative integers, e.g. an image resolution.
pub fn get_uvec2(j: &Value, key: &str, default: UVec2) -> ConfigResult<UVec2> {
    let Some(v) = j.get(key) else {
        return Ok(default);
    };
    let [x, y] = as_floats::<2>(v, key)?;
    if x < 0.0 || y < 0.0 || x.fract() != 0.0 || y.fract() != 0.0 {
        return Err(ConfigError::invalid(key, "expected two non-negative integers"));
    }
    Ok(UVec2::new(x as u32, y as u32))
}

/// The transform stored under `key`, or identity.
pub fn get_transform(j: &Value, key: &str) -> ConfigResult<Transform> {
    j.get(key).map_or(Ok(Transform::IDENTITY), parse_transform)
}

/// Parse any of the accepted transform spellings.
///
/// - 16 numbers (row-major) or 4 rows of 4 numbers
/// - an object with one of: `matrix`; `o`/`x`/`y`/`z`; `from`/`to`/`up`;
///   `translate`; `scale`; `axis` + `angle` (degrees)
/// - an array of the above, applied in order
pub fn parse_transform(v: &Value) -> ConfigResult<Transform> {
    match v {
        Value::Array(items) if items.len() == 16 && items.iter().all(Value::is_number) => {
            let cells = as_floats::<16>(v, "transform")?;
            Ok(Transform::new(Mat4::from_cols_array(&cells).transpose()))
        }
        Value::Array(items) if is_row_matrix(items) => {
            let mut cells = [0.0; 16];
            for (r, row) in items.iter().enumerate() {
                cells[4 * r..4 * r + 4].copy_from_slice(&as_floats::<4>(row, "transform")?);
            }
            Ok(Transform::new(Mat4::from_cols_array(&cells).transpose()))
        }
        Value::Array(items) => items.iter().try_fold(Transform::IDENTITY, |acc, item| {
            Ok(parse_transform(item)? * acc)
        }),
        Value::Object(map) => parse_transform_object(map),
        _ => Err(ConfigError::invalid(
            "transform",
            "expected a matrix, a transform object or an array of transforms",
        )),
    }
}

fn is_row_matrix(items: &[Value]) -> bool {
    items.len() == 4
        && items.iter().all(|row| {
            row.as_array()
                .is_some_and(|cells| cells.len() == 4 && cells.iter().all(Value::is_number))
        })
}

fn parse_transform_object(map: &Map<String, Value>) -> ConfigResult<Transform> {
    let j = Value::Object(map.clone());

    if let Some(m) = map.get("matrix") {
        return parse_transform(m);
    }
    if ["o", "x", "y", "z"].iter().any(|k| map.contains_key(*k)) {
        return Ok(Transform::from_frame(
            get_vec3(&j, "o", Vec3::ZERO)?,
            get_vec3(&j, "x", Vec3::X)?,
            get_vec3(&j, "y", Vec3::Y)?,
            get_vec3(&j, "z", Vec3::Z)?,
        ));
    }
    if ["from", "to", "up"].iter().any(|k| map.contains_key(*k)) {
        let from = get_vec3(&j, "from", Vec3::Z)?;
        let to = get_vec3(&j, "to", Vec3::ZERO)?;
        let up = get_vec3(&j, "up", Vec3::Y)?;
        if (from - to).length_squared() == 0.0 || up.cross(from - to).length_squared() == 0.0 {
            return Err(ConfigError::invalid("from", "degenerate look-at frame"));
        }
        return Ok(Transform::look_at(from, to, up));
    }
    if let Some(t) = map.get("translate") {
        return Ok(Transform::translate(parse_vec3(t, "translate")?));
    }
    if let Some(s) = map.get("scale") {
        let s = parse_vec3(s, "scale")?;
        if s.cmpeq(Vec3::ZERO).any() {
            return Err(ConfigError::invalid("scale", "scale factors must be non-zero"));
        }
        return Ok(Transform::scale(s));
    }
    if let Some(axis) = map.get("axis") {
        let axis = parse_vec3(axis, "axis")?;
        if axis.length_squared() == 0.0 {
            return Err(ConfigError::invalid("axis", "rotation axis must be non-zero"));
        }
        return Ok(Transform::axis_angle(axis, get_f32(&j, "angle", 0.0)?));
    }

    Err(ConfigError::invalid(
        "transform",
        "object needs one of matrix, o/x/y/z, from/to/up, translate, scale or axis/angle",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn assert_close(a: Vec3, b: Vec3) {
        assert!((a - b).length() < 1e-5, "{a:?} != {b:?}");
    }

    #[test]
    fn test_defaults_and_values() {
        let j = json!({"radius": 2.5, "samples": 16, "name": "ball", "flag": true});
        assert_eq!(get_f32(&j, "radius", 1.0).unwrap(), 2.5);
        assert_eq!(get_f32(&j, "missing", 1.0).unwrap(), 1.0);
        assert_eq!(get_u32(&j, "samples", 1).unwrap(), 16);
        assert_eq!(get_string(&j, "name", "").unwrap(), "ball");
        assert!(get_bool(&j, "flag", false).unwrap());
    }

    #[test]
    fn test_wrong_shape_is_an_error() {
        let j = json!({"radius": "big", "samples": -3, "color": [1, 2]});
        assert!(matches!(get_f32(&j, "radius", 1.0), Err(ConfigError::Invalid { .. })));
        assert!(get_u32(&j, "samples", 1).is_err());
        assert!(get_color(&j, "color", Vec3::ONE).is_err());
    }

    #[test]
    fn test_require() {
        let j = json!({"filename": "mesh.obj"});
        assert_eq!(require_str(&j, "filename").unwrap(), "mesh.obj");
        assert!(matches!(require(&j, "positions"), Err(ConfigError::Missing(k)) if k == "positions"));
    }

    #[test]
    fn test_vectors() {
        let j = json!({"a": 0.5, "b": [1, 2, 3], "res": [640, 480], "bad res": [1.5, 2]});
        assert_eq!(get_vec3(&j, "a", Vec3::ZERO).unwrap(), Vec3::splat(0.5));
        assert_eq!(get_vec3(&j, "b", Vec3::ZERO).unwrap(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(get_uvec2(&j, "res", UVec2::ONE).unwrap(), UVec2::new(640, 480));
        assert!(get_uvec2(&j, "bad res", UVec2::ONE).is_err());
        assert_eq!(get_vec2(&j, "a", Vec2::ZERO).unwrap(), Vec2::splat(0.5));
    }

    #[test]
    fn test_transform_matrix_is_row_major() {
        let flat = json!([1, 0, 0, 5, 0, 1, 0, 6, 0, 0, 1, 7, 0, 0, 0, 1]);
        let xform = parse_transform(&flat).unwrap();
        assert_close(xform.point(Vec3::ZERO), Vec3::new(5.0, 6.0, 7.0));

        let rows = json!([[1, 0, 0, 5], [0, 1, 0, 6], [0, 0, 1, 7], [0, 0, 0, 1]]);
        assert_eq!(parse_transform(&rows).unwrap(), xform);
    }

    #[test]
    fn test_transform_objects() {
        let t = parse_transform(&json!({"translate": [1, 2, 3]})).unwrap();
        assert_close(t.point(Vec3::ZERO), Vec3::new(1.0, 2.0, 3.0));

        let s = parse_transform(&json!({"scale": 2})).unwrap();
        assert_close(s.point(Vec3::ONE), Vec3::splat(2.0));

        let r = parse_transform(&json!({"axis": [0, 0, 1], "angle": 90})).unwrap();
        assert_close(r.vector(Vec3::X), Vec3::Y);

        let l = parse_transform(&json!({"from": [0, 0, 5], "to": [0, 0, 0], "up": [0, 1, 0]})).unwrap();
        assert_close(l.point(Vec3::ZERO), Vec3::new(0.0, 0.0, 5.0));

        let f = parse_transform(&json!({"o": [1, 0, 0], "x": [0, 1, 0], "y": [-1, 0, 0]})).unwrap();
        assert_close(f.point(Vec3::X), Vec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_transform_sequence_applies_in_order() {
        let j = json!([{"scale": 2}, {"translate": [1, 0, 0]}]);
        let xform = parse_transform(&j).unwrap();
        assert_close(xform.point(Vec3::ONE), Vec3::new(3.0, 2.0, 2.0));
    }

    #[test]
    fn test_transform_errors() {
        assert!(parse_transform(&json!("identity")).is_err());
        assert!(parse_transform(&json!({"spin": 3})).is_err());
        assert!(parse_transform(&json!({"scale": [1, 0, 1]})).is_err());
        assert_eq!(get_transform(&json!({}), "transform").unwrap(), Transform::IDENTITY);
    }
}

//! Deterministic hashing of argument tuples.
//!
//! The [`hash!`](crate::hash!) macro packs its arguments byte-for-byte into a
//! buffer and runs MurmurHash64A over it, which is how per-pixel and
//! per-sample random streams are seeded reproducibly.

use crate::{Vec2, Vec3, Vec4, ONE_MINUS_EPSILON};
use bytemuck::Pod;

const MURMUR_M: u64 = 0xc6a4_a793_5bd1_e995;
const MURMUR_R: u32 = 47;

/// MurmurHash64A over an arbitrary byte buffer.
pub fn murmur_hash64a(key: &[u8], seed: u64) -> u64 {
    let mut h = seed ^ (key.len() as u64).wrapping_mul(MURMUR_M);

    let mut blocks = key.chunks_exact(8);
    for block in &mut blocks {
        let mut k = u64::from_le_bytes([
            block[0], block[1], block[2], block[3], block[4], block[5], block[6], block[7],
        ]);
        k = k.wrapping_mul(MURMUR_M);
        k ^= k >> MURMUR_R;
        k = k.wrapping_mul(MURMUR_M);

        h ^= k;
        h = h.wrapping_mul(MURMUR_M);
    }

    let tail = blocks.remainder();
    if !tail.is_empty() {
        for (i, &byte) in tail.iter().enumerate().rev() {
            h ^= u64::from(byte) << (8 * i);
        }
        h = h.wrapping_mul(MURMUR_M);
    }

    h ^= h >> MURMUR_R;
    h = h.wrapping_mul(MURMUR_M);
    h ^= h >> MURMUR_R;
    h
}

/// Three-round xor-shift/multiply avalanche.
#[inline]
pub fn mix_bits(mut v: u64) -> u64 {
    v ^= v >> 31;
    v = v.wrapping_mul(0x7fb5_d329_728e_a185);
    v ^= v >> 27;
    v = v.wrapping_mul(0x81da_def4_bc2d_d44d);
    v ^= v >> 33;
    v
}

/// Byte buffer the hashing macros pack their arguments into.
#[derive(Debug, Default, Clone)]
pub struct HashBuffer {
    bytes: Vec<u8>,
}

impl HashBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the raw bytes of `value`.
    pub fn push<T: Pod>(&mut self, value: &T) {
        self.bytes.extend_from_slice(bytemuck::bytes_of(value));
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn finish(&self) -> u64 {
        murmur_hash64a(&self.bytes, 0)
    }
}

/// Low 32 bits of a hash scaled to `[0, 1)`.
#[inline]
pub fn to_float(h: u64) -> f32 {
    ((h as u32) as f32 * f32::from_bits(0x2f80_0000)).min(ONE_MINUS_EPSILON)
}

/// High and low halves of a hash scaled to `[0, 1)`.
#[inline]
pub fn to_float2(h: u64) -> Vec2 {
    Vec2::new(to_float(h >> 32), to_float(h))
}

pub fn to_float3(h: u64, h2: u64) -> Vec3 {
    to_float2(h).extend(to_float(h2))
}

pub fn to_float4(h: u64, h2: u64) -> Vec4 {
    let a = to_float2(h);
    let b = to_float2(h2);
    Vec4::new(a.x, a.y, b.x, b.y)
}

/// Hash a sequence of `Pod` values in argument order.
///
/// ```
/// let a = tern_math::hash!(1i32, 2i32);
/// let b = tern_math::hash!(2i32, 1i32);
/// assert_ne!(a, b);
/// ```
#[macro_export]
macro_rules! hash {
    ($($arg:expr),+ $(,)?) => {{
        let mut buffer = $crate::hash::HashBuffer::new();
        $( buffer.push(&$arg); )+
        buffer.finish()
    }};
}

/// One float in `[0, 1)` from the hash of the arguments.
#[macro_export]
macro_rules! hash_to_float {
    ($($arg:expr),+ $(,)?) => {
        $crate::hash::to_float($crate::hash!($($arg),+))
    };
}

/// Two floats in `[0, 1)` from the two halves of one hash.
#[macro_export]
macro_rules! hash_to_float2 {
    ($($arg:expr),+ $(,)?) => {
        $crate::hash::to_float2($crate::hash!($($arg),+))
    };
}

/// Three floats; the third comes from a second hash with a leading `2i32`.
#[macro_export]
macro_rules! hash_to_float3 {
    ($($arg:expr),+ $(,)?) => {{
        let mut plain = $crate::hash::HashBuffer::new();
        let mut salted = $crate::hash::HashBuffer::new();
        salted.push(&2i32);
        $(
            let value = $arg;
            plain.push(&value);
            salted.push(&value);
        )+
        $crate::hash::to_float3(plain.finish(), salted.finish())
    }};
}

/// Four floats; the last two come from a second hash with a leading `2i32`.
#[macro_export]
macro_rules! hash_to_float4 {
    ($($arg:expr),+ $(,)?) => {{
        let mut plain = $crate::hash::HashBuffer::new();
        let mut salted = $crate::hash::HashBuffer::new();
        salted.push(&2i32);
        $(
            let value = $arg;
            plain.push(&value);
            salted.push(&value);
        )+
        $crate::hash::to_float4(plain.finish(), salted.finish())
    }};
}

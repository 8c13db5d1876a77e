//! PCG32 random number stream.
//!
//! A 64-bit LCG state with a permuted 32-bit output (XSH RR). Streams can be
//! jumped forward or backward in O(log n) and the step distance between two
//! streams on the same sequence can be recovered exactly.

use crate::hash::mix_bits;
use crate::{Vec2, Vec3, Vec4};

const DEFAULT_STATE: u64 = 0x853c_49e6_748f_ea9b;
const DEFAULT_STREAM: u64 = 0xda3e_39cb_94b9_5bdb;
const MULT: u64 = 0x5851_f42d_4c95_7f2d;

/// Seedable, jumpable PCG32 generator.
///
/// Never shared between threads: each worker clones or reseeds its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pcg32 {
    state: u64,
    inc: u64,
}

impl Default for Pcg32 {
    fn default() -> Self {
        Self {
            state: DEFAULT_STATE,
            inc: DEFAULT_STREAM,
        }
    }
}

impl Pcg32 {
    /// Create a stream on sequence `sequence_index` starting from `initial_state`.
    pub fn new(sequence_index: u64, initial_state: u64) -> Self {
        let mut rng = Self::default();
        rng.seed(sequence_index, initial_state);
        rng
    }

    /// Create a stream whose initial state is derived from the sequence index.
    pub fn with_sequence(sequence_index: u64) -> Self {
        Self::new(sequence_index, mix_bits(sequence_index))
    }

    /// Reset the stream. The increment is always odd.
    pub fn seed(&mut self, sequence_index: u64, initial_state: u64) {
        self.state = 0;
        self.inc = (sequence_index << 1) | 1;
        self.next_u32();
        self.state = self.state.wrapping_add(initial_state);
        self.next_u32();
    }

    /// Reset the stream, deriving the initial state with [`mix_bits`].
    pub fn seed_sequence(&mut self, sequence_index: u64) {
        self.seed(sequence_index, mix_bits(sequence_index));
    }

    /// Uniformly distributed 32-bit value.
    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        let old = self.state;
        self.state = old.wrapping_mul(MULT).wrapping_add(self.inc);
        let xorshifted = (((old >> 18) ^ old) >> 27) as u32;
        let rot = (old >> 59) as u32;
        xorshifted.rotate_right(rot)
    }

    /// Unbiased value in `[0, bound)` using Lemire's multiply-and-reject.
    pub fn next_u32_bounded(&mut self, bound: u32) -> u32 {
        let mut m = u64::from(self.next_u32()) * u64::from(bound);
        let mut l = m as u32;
        if l < bound {
            let mut t = bound.wrapping_neg();
            if t >= bound {
                t -= bound;
                if t >= bound {
                    t %= bound;
                }
            }
            while l < t {
                m = u64::from(self.next_u32()) * u64::from(bound);
                l = m as u32;
            }
        }
        (m >> 32) as u32
    }

    /// Uniform float in `[0, 1)` built from the top 23 bits of a draw.
    #[inline]
    pub fn next_f32(&mut self) -> f32 {
        f32::from_bits((self.next_u32() >> 9) | 0x3f80_0000) - 1.0
    }

    pub fn next_vec2(&mut self) -> Vec2 {
        let x = self.next_f32();
        let y = self.next_f32();
        Vec2::new(x, y)
    }

    pub fn next_vec3(&mut self) -> Vec3 {
        let x = self.next_f32();
        let y = self.next_f32();
        let z = self.next_f32();
        Vec3::new(x, y, z)
    }

    pub fn next_vec4(&mut self) -> Vec4 {
        let x = self.next_f32();
        let y = self.next_f32();
        let z = self.next_f32();
        let w = self.next_f32();
        Vec4::new(x, y, z, w)
    }

    /// Knuth shuffle.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.next_u32_bounded(i as u32 + 1) as usize;
            items.swap(i, j);
        }
    }

    /// Jump `delta` steps. Negative deltas wrap around the 2^64 period.
    pub fn advance(&mut self, delta: i64) {
        let mut cur_mult = MULT;
        let mut cur_plus = self.inc;
        let mut acc_mult = 1u64;
        let mut acc_plus = 0u64;
        let mut delta = delta as u64;

        while delta > 0 {
            if delta & 1 != 0 {
                acc_mult = acc_mult.wrapping_mul(cur_mult);
                acc_plus = acc_plus.wrapping_mul(cur_mult).wrapping_add(cur_plus);
            }
            cur_plus = cur_mult.wrapping_add(1).wrapping_mul(cur_plus);
            cur_mult = cur_mult.wrapping_mul(cur_mult);
            delta >>= 1;
        }
        self.state = acc_mult.wrapping_mul(self.state).wrapping_add(acc_plus);
    }

    /// Number of steps from `other` to `self`.
    ///
    /// # Panics
    ///
    /// Both streams must be on the same sequence.
    pub fn distance(&self, other: &Pcg32) -> i64 {
        assert_eq!(
            self.inc, other.inc,
            "distance is only defined between streams on the same sequence"
        );

        let mut cur_mult = MULT;
        let mut cur_plus = self.inc;
        let mut cur_state = other.state;
        let mut the_bit = 1u64;
        let mut distance = 0u64;

        while self.state != cur_state {
            if (self.state & the_bit) != (cur_state & the_bit) {
                cur_state = cur_state.wrapping_mul(cur_mult).wrapping_add(cur_plus);
                distance |= the_bit;
            }
            debug_assert_eq!(self.state & the_bit, cur_state & the_bit);
            the_bit <<= 1;
            cur_plus = cur_mult.wrapping_add(1).wrapping_mul(cur_plus);
            cur_mult = cur_mult.wrapping_mul(cur_mult);
        }

        distance as i64
    }
}

impl rand::RngCore for Pcg32 {
    fn next_u32(&mut self) -> u32 {
        Pcg32::next_u32(self)
    }

    fn next_u64(&mut self) -> u64 {
        let hi = u64::from(Pcg32::next_u32(self));
        let lo = u64::from(Pcg32::next_u32(self));
        (hi << 32) | lo
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = Pcg32::next_u32(self).to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

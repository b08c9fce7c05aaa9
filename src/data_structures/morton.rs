//! Host-side mirror of the 30-bit Morton encoding the primitive-build
//! compute shader performs per-thread (see `res/shaders/primitive_build.wgsl`).
//!
//! Kept as plain Rust so the construction properties in `reference.rs` and
//! the property tests in `buffers.rs`/`feeder.rs` can check the exact bit
//! pattern the GPU is expected to produce, the same way the teacher's
//! `data_structures/hlbvh.rs` keeps its `encode_morton_3`/`left_shift_3`
//! pair for its CPU-side LBVH construction.

use super::vector::{Vec3, Vec3f32};

/// Take a 10-bit number and tile it as xyzw -> --x--y--z--w.
#[inline]
fn left_shift_3(mut x: u32) -> u32 {
    if x == 1 << 10 {
        x -= 1;
    }
    x = (x | (x << 16)) & 0b00000011000000000000000011111111;
    x = (x | (x << 8)) & 0b00000011000000001111000000001111;
    x = (x | (x << 4)) & 0b00000011000011000011000011000011;
    x = (x | (x << 2)) & 0b00001001001001001001001001001001;
    x
}

/// Interleave three 10-bit quantized coordinates into a 30-bit Morton code.
#[inline]
pub fn encode_morton_3(x: u32, y: u32, z: u32) -> u32 {
    (left_shift_3(z) << 2) | (left_shift_3(y) << 1) | left_shift_3(x)
}

/// Quantize a centroid normalized into `[0, 1]^3` to 10 bits per axis and
/// interleave it into a Morton code, exactly as the primitive-build shader
/// does for each primitive it emits.
pub fn morton_code_for_unit_centroid(unit: Vec3f32) -> u32 {
    const SCALE: f32 = 1024.0; // 1 << 10
    let qx = (unit.0.clamp(0.0, 1.0) * SCALE) as u32;
    let qy = (unit.1.clamp(0.0, 1.0) * SCALE) as u32;
    let qz = (unit.2.clamp(0.0, 1.0) * SCALE) as u32;
    encode_morton_3(qx.min(1023), qy.min(1023), qz.min(1023))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_maps_to_zero() {
        assert_eq!(morton_code_for_unit_centroid(Vec3::<f32>(0.0, 0.0, 0.0)), 0);
    }

    #[test]
    fn distinct_octants_differ() {
        let a = morton_code_for_unit_centroid(Vec3::<f32>(0.1, 0.1, 0.1));
        let b = morton_code_for_unit_centroid(Vec3::<f32>(0.9, 0.9, 0.9));
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn code_fits_in_30_bits() {
        let code = morton_code_for_unit_centroid(Vec3::<f32>(1.0, 1.0, 1.0));
        assert_eq!(code & !0x3FFF_FFFF, 0);
    }

    #[test]
    fn monotonic_along_single_axis() {
        let mut last = None;
        for i in 0..=20 {
            let t = i as f32 / 20.0;
            let code = morton_code_for_unit_centroid(Vec3::<f32>(t, 0.0, 0.0));
            if let Some(prev) = last {
                assert!(code >= prev);
            }
            last = Some(code);
        }
    }
}

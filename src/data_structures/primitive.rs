///
/// GPU-side layouts for the per-primitive and per-node buffers the
/// builder kernels read and write. These mirror the CPU-visible geometry
/// types (`Bbox`) but are `repr(C)` / `bytemuck::Pod` so they can be
/// uploaded and downloaded verbatim as storage-buffer contents, the same
/// way `BboxGpu` pads `Bbox` for GPU consumption.

use super::bbox::BboxGpu;
use super::vector::{Vec3, Vec3f32};

/// One triangle's worth of geometry, as the primitive-build kernel writes
/// it into `primitiveBuffer`. A hair-segment sub-quad is stored as two of
/// these, one per triangle half.
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy, bytemuck::Zeroable, bytemuck::Pod)]
pub struct PrimitiveRecord {
    pub v0: Vec3f32,
    _padding0: f32,
    pub v1: Vec3f32,
    _padding1: f32,
    pub v2: Vec3f32,
    _padding2: f32,
}
static_assertions::assert_eq_size!(PrimitiveRecord, [u8; 4 * 4 * 3]);

impl PrimitiveRecord {
    pub fn from_triangle(v0: Vec3f32, v1: Vec3f32, v2: Vec3f32) -> Self {
        Self {
            v0,
            _padding0: 0.0,
            v1,
            _padding1: 0.0,
            v2,
            _padding2: 0.0,
        }
    }

    pub fn centroid(&self) -> Vec3f32 {
        (self.v0 + self.v1 + self.v2) / 3.0
    }

    pub fn bbox(&self) -> BboxGpu {
        use super::bbox::Bbox;
        BboxGpu::from(Bbox::from_triangle(self.v0, self.v1, self.v2))
    }
}

/// A compact handle into `(instance, subset, local primitive index)`,
/// stored in `primitiveIDBuffer`. Pre-sort it is co-indexed with
/// `PrimitiveRecord`; post-sort it is permuted into Morton order and
/// becomes the leaf-to-geometry lookup the hierarchy builder consumes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, bytemuck::Zeroable, bytemuck::Pod)]
pub struct PrimitiveId {
    pub instance_index: u32,
    pub subset_index: u32,
    pub local_index: u32,
}
static_assertions::assert_eq_size!(PrimitiveId, [u8; 4 * 3]);

impl PrimitiveId {
    pub fn new(instance_index: u32, subset_index: u32, local_index: u32) -> Self {
        Self {
            instance_index,
            subset_index,
            local_index,
        }
    }
}

/// A 32-bit interleaved Morton code, sortable as an unsigned key.
/// `primitiveMortonBuffer` stores these co-indexed with `PrimitiveId`
/// before the sort and in Morton order after.
pub type MortonCode = u32;

/// Sentinel index stored in place of a real node/parent index.
pub const INVALID_INDEX: u32 = u32::MAX;

/// A single slot of `bvhNodeBuffer`. Internal-node slots (`[0, N-1)`) use
/// `left_child`/`right_child`; leaf slots (`[N-1, 2N-1)`) leave both zero
/// by convention and instead address geometry through the sorted
/// `PrimitiveId` at the same index minus the leaf offset.
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy, bytemuck::Zeroable, bytemuck::Pod)]
pub struct BvhNode {
    pub left_child: u32,
    pub right_child: u32,
    _padding0: [u32; 2],
    pub aabb_min: Vec3f32,
    _padding1: f32,
    pub aabb_max: Vec3f32,
    _padding2: f32,
}
static_assertions::assert_eq_size!(BvhNode, [u8; 4 * 4 + 4 * 4 * 2]);

impl BvhNode {
    pub fn internal(left_child: u32, right_child: u32) -> Self {
        Self {
            left_child,
            right_child,
            _padding0: [0; 2],
            aabb_min: Vec3::<f32>(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            _padding1: 0.0,
            aabb_max: Vec3::<f32>(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
            _padding2: 0.0,
        }
    }

    pub fn leaf(aabb_min: Vec3f32, aabb_max: Vec3f32) -> Self {
        Self {
            left_child: 0,
            right_child: 0,
            _padding0: [0; 2],
            aabb_min,
            _padding1: 0.0,
            aabb_max,
            _padding2: 0.0,
        }
    }
}

/// `bvhParentBuffer`: parent index for every node (internal or leaf).
/// The root's entry holds `INVALID_INDEX`.
pub type ParentLink = u32;

/// `bvhFlagBuffer` slot type: one `atomic<u32>` counter per internal
/// node, chosen over a packed bitfield per the spec's own stated
/// preference for clarity.
pub type VisitFlag = u32;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_record_is_gpu_aligned() {
        assert_eq!(std::mem::size_of::<PrimitiveRecord>() % 16, 0);
        assert_eq!(std::mem::align_of::<PrimitiveRecord>(), 16);
    }

    #[test]
    fn bvh_node_is_gpu_aligned() {
        assert_eq!(std::mem::size_of::<BvhNode>() % 16, 0);
    }

    #[test]
    fn centroid_of_triangle() {
        let p = PrimitiveRecord::from_triangle(
            Vec3::<f32>(0.0, 0.0, 0.0),
            Vec3::<f32>(3.0, 0.0, 0.0),
            Vec3::<f32>(0.0, 3.0, 0.0),
        );
        let c = p.centroid();
        assert!((c.0 - 1.0).abs() < 1e-6);
        assert!((c.1 - 1.0).abs() < 1e-6);
        assert!((c.2 - 0.0).abs() < 1e-6);
    }

    #[test]
    fn leaf_node_has_zero_children() {
        let leaf = BvhNode::leaf(Vec3::<f32>(0.0, 0.0, 0.0), Vec3::<f32>(1.0, 1.0, 1.0));
        assert_eq!(leaf.left_child, 0);
        assert_eq!(leaf.right_child, 0);
    }
}

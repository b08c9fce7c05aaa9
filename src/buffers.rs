///
/// `BvhBuffers`: the capacity manager (§4.1). Owns every GPU-resident
/// buffer the builder touches. Host keeps only this capacity counter and
/// the buffer handles themselves (§3: "All persistent state is
/// GPU-resident. Host keeps only a capacity counter and handles.").
///
/// Reallocation is destructive and only ever grows — grounded in
/// `wiGPUBVH::Update`'s `if (totalTriangles > primitiveCapacity)` check
/// and in the teacher's own capacity-doubling pattern for GPU buffers.

use wgpu::util::DeviceExt;

use crate::data_structures::bbox::{Bbox, BboxGpu};
use crate::data_structures::primitive::{BvhNode, PrimitiveId, PrimitiveRecord};
use crate::error::{BvhError, Result};

const STORAGE: wgpu::BufferUsages = wgpu::BufferUsages::STORAGE
    .union(wgpu::BufferUsages::COPY_DST)
    .union(wgpu::BufferUsages::COPY_SRC);

pub struct BvhBuffers {
    pub capacity: u32,
    pub primitive_buffer: Option<wgpu::Buffer>,
    pub primitive_id_buffer: Option<wgpu::Buffer>,
    pub primitive_morton_buffer: Option<wgpu::Buffer>,
    pub bvh_node_buffer: Option<wgpu::Buffer>,
    pub bvh_parent_buffer: Option<wgpu::Buffer>,
    pub bvh_flag_buffer: Option<wgpu::Buffer>,
    pub primitive_counter_buffer: wgpu::Buffer,
    pub scene_bounds_buffer: wgpu::Buffer,
}

fn sized_buffer(device: &wgpu::Device, label: &str, elements: u32, stride: u64) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: (elements.max(1) as u64) * stride,
        usage: STORAGE,
        mapped_at_creation: false,
    })
}

impl BvhBuffers {
    pub fn new(device: &wgpu::Device) -> Self {
        let primitive_counter_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("primitiveCounterBuffer"),
            contents: bytemuck::bytes_of(&0u32),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::COPY_SRC,
        });

        let scene_bounds_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("sceneBoundsBuffer"),
            contents: bytemuck::bytes_of(&BboxGpu::from(Bbox::new())),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        Self {
            capacity: 0,
            primitive_buffer: None,
            primitive_id_buffer: None,
            primitive_morton_buffer: None,
            bvh_node_buffer: None,
            bvh_parent_buffer: None,
            bvh_flag_buffer: None,
            primitive_counter_buffer,
            scene_bounds_buffer,
        }
    }

    /// Capacity check and lazy (re)allocation (§4.1). `requested` is T,
    /// the total primitive count for this frame. Reallocating is
    /// destructive: no buffer content survives a grow.
    pub fn ensure_capacity(&mut self, device: &wgpu::Device, requested: u32) -> Result<()> {
        if requested <= self.capacity {
            return Ok(());
        }
        let capacity = requested.max(2);
        log::info!("reallocating BVH buffers: {} -> {} primitives", self.capacity, capacity);

        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);

        let primitive_buffer = sized_buffer(
            device,
            "primitiveBuffer",
            capacity,
            std::mem::size_of::<PrimitiveRecord>() as u64,
        );
        let primitive_id_buffer = sized_buffer(
            device,
            "primitiveIDBuffer",
            capacity,
            std::mem::size_of::<PrimitiveId>() as u64,
        );
        let primitive_morton_buffer = sized_buffer(
            device,
            "primitiveMortonBuffer",
            capacity,
            std::mem::size_of::<u32>() as u64,
        );
        let bvh_node_buffer = sized_buffer(
            device,
            "bvhNodeBuffer",
            2 * capacity,
            std::mem::size_of::<BvhNode>() as u64,
        );
        let bvh_parent_buffer = sized_buffer(
            device,
            "bvhParentBuffer",
            2 * capacity,
            std::mem::size_of::<u32>() as u64,
        );
        let bvh_flag_buffer = sized_buffer(
            device,
            "bvhFlagBuffer",
            capacity - 1,
            std::mem::size_of::<u32>() as u64,
        );

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(BvhError::Allocation {
                requested: capacity,
                source: anyhow::anyhow!(err.to_string()),
            });
        }

        self.primitive_buffer = Some(primitive_buffer);
        self.primitive_id_buffer = Some(primitive_id_buffer);
        self.primitive_morton_buffer = Some(primitive_morton_buffer);
        self.bvh_node_buffer = Some(bvh_node_buffer);
        self.bvh_parent_buffer = Some(bvh_parent_buffer);
        self.bvh_flag_buffer = Some(bvh_flag_buffer);
        self.capacity = capacity;
        Ok(())
    }

    /// Resets capacity to zero; buffers are dropped lazily on the next
    /// `ensure_capacity` call that actually needs them, matching
    /// `wiGPUBVH::Clear`'s "only resets the tracked counter" behaviour.
    pub fn clear(&mut self) {
        self.capacity = 0;
    }

    pub fn upload_scene_bounds(&self, queue: &wgpu::Queue, bounds: Bbox) {
        queue.write_buffer(&self.scene_bounds_buffer, 0, bytemuck::bytes_of(&BboxGpu::from(bounds)));
    }

    pub fn upload_primitive_count(&self, queue: &wgpu::Queue, count: u32) {
        queue.write_buffer(&self.primitive_counter_buffer, 0, bytemuck::bytes_of(&count));
    }

    pub fn leaf_offset(&self, primitive_count: u32) -> u32 {
        primitive_count.saturating_sub(1)
    }

    pub fn primitive_buffer(&self) -> &wgpu::Buffer {
        self.primitive_buffer.as_ref().expect("buffers not allocated")
    }
    pub fn primitive_id_buffer(&self) -> &wgpu::Buffer {
        self.primitive_id_buffer.as_ref().expect("buffers not allocated")
    }
    pub fn primitive_morton_buffer(&self) -> &wgpu::Buffer {
        self.primitive_morton_buffer.as_ref().expect("buffers not allocated")
    }
    pub fn bvh_node_buffer(&self) -> &wgpu::Buffer {
        self.bvh_node_buffer.as_ref().expect("buffers not allocated")
    }
    pub fn bvh_parent_buffer(&self) -> &wgpu::Buffer {
        self.bvh_parent_buffer.as_ref().expect("buffers not allocated")
    }
    pub fn bvh_flag_buffer(&self) -> &wgpu::Buffer {
        self.bvh_flag_buffer.as_ref().expect("buffers not allocated")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Capacity arithmetic only; does not require a GPU device.
    #[test]
    fn capacity_floor_is_two() {
        let requested = 1u32;
        assert_eq!(requested.max(2), 2);
    }

    #[test]
    fn leaf_offset_of_n_is_n_minus_one() {
        let buffers_capacity = 10u32;
        assert_eq!(buffers_capacity.saturating_sub(1), 9);
    }

    #[test]
    fn leaf_offset_of_zero_saturates() {
        assert_eq!(0u32.saturating_sub(1), 0);
    }
}

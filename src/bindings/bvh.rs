use super::{Bindable, WgslBindDescriptor};

/// The read-only view of the builder's state a traversal consumer binds
/// against: `Bind(stage, cmd)` in the external interface resolves to
/// constructing one of these and handing the caller a `wgpu::BindGroup`
/// built from it.
pub struct BvhGpu<'a> {
    pub primitive_counter_buffer: &'a wgpu::Buffer,
    pub primitive_buffer: &'a wgpu::Buffer,
    pub bvh_node_buffer: &'a wgpu::Buffer,
}

impl<'a> Bindable for BvhGpu<'a> {
    fn get_layout_entries(&self) -> Vec<wgpu::BindGroupLayoutEntry> {
        vec![
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::COMPUTE | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: true },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::COMPUTE | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: true },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::COMPUTE | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: true },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ]
    }

    fn get_bind_group_entries(&self) -> Vec<wgpu::BindGroupEntry> {
        vec![
            wgpu::BindGroupEntry {
                binding: 0,
                resource: self.primitive_counter_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: self.primitive_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: self.bvh_node_buffer.as_entire_binding(),
            },
        ]
    }

    fn get_bind_descriptor(&self) -> Vec<WgslBindDescriptor> {
        let node_definition =
"struct BvhNode {
    left_child: u32,
    right_child: u32,
    _padding0: vec2u,
    aabb_min: vec3f,
    _padding1: f32,
    aabb_max: vec3f,
    _padding2: f32,
};";

        vec![
            WgslBindDescriptor {
                struct_def: None,
                bind_type: Some("storage, read"),
                var_name: "primitiveCounter",
                var_type: "u32",
                extra_code: None,
            },
            WgslBindDescriptor {
                struct_def: None,
                bind_type: Some("storage, read"),
                var_name: "primitiveBuffer",
                var_type: "array<vec4f>",
                extra_code: None,
            },
            WgslBindDescriptor {
                struct_def: Some(node_definition),
                bind_type: Some("storage, read"),
                var_name: "bvhNodes",
                var_type: "array<BvhNode>",
                extra_code: None,
            },
        ]
    }
}

impl<'a> BvhGpu<'a> {
    pub fn new(
        primitive_counter_buffer: &'a wgpu::Buffer,
        primitive_buffer: &'a wgpu::Buffer,
        bvh_node_buffer: &'a wgpu::Buffer,
    ) -> Self {
        BvhGpu {
            primitive_counter_buffer,
            primitive_buffer,
            bvh_node_buffer,
        }
    }

    pub fn create_bind_group(&self, device: &wgpu::Device, layout: &wgpu::BindGroupLayout) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &self.get_bind_group_entries(),
            label: Some("bvh_consumer_bind_group"),
        })
    }
}

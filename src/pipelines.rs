///
/// The three compute pipelines (§2 items 2, 4, 5): PrimitiveBuilder,
/// HierarchyBuilder (Karras LBVH) and AABBPropagator. Each owns its own
/// bind group layout and pipeline, built once at `GpuBvh::initialize`
/// time and recreated only on a shader-reload notification.

use bytemuck::{Pod, Zeroable};

use crate::buffers::BvhBuffers;
use crate::feeder::PrimitiveSpan;
use crate::shader_loader::compile_wgsl;

const WORKGROUP_SIZE: u32 = 64;

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct SpanParamsGpu {
    instance_index: u32,
    subset_index: u32,
    primitive_count: u32,
    primitive_offset: u32,
    is_hair: u32,
    segments_per_strand: u32,
    _padding: [u32; 2],
}

/// PrimitiveBuilder kernel (§4.2): one dispatch per span, driven by a
/// small per-dispatch uniform buffer instead of the source's push
/// constants (no example in the pack enables wgpu's push-constant
/// feature; a per-dispatch uniform buffer is the idiom the pack uses
/// everywhere else for small per-draw parameters).
pub struct PrimitiveBuilderPipeline {
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    span_params_buffer: wgpu::Buffer,
}

impl PrimitiveBuilderPipeline {
    pub fn new(device: &wgpu::Device) -> anyhow::Result<Self> {
        let source = include_str!("../res/shaders/primitive_build.wgsl");
        let module = compile_wgsl(device, "primitive_build", source)?;

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("primitive_build_bind_group_layout"),
            entries: &[
                uniform_entry(0),
                uniform_entry(1),
                storage_entry(2, true),
                storage_entry(3, false),
                storage_entry(4, false),
                storage_entry(5, false),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("primitive_build_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("primitive_build"),
            layout: Some(&pipeline_layout),
            module: &module,
            entry_point: "build_primitives",
        });

        let span_params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("span_params_buffer"),
            size: std::mem::size_of::<SpanParamsGpu>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Ok(Self {
            pipeline,
            bind_group_layout,
            span_params_buffer,
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn dispatch(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        buffers: &BvhBuffers,
        instance_table: &wgpu::Buffer,
        span: PrimitiveSpan,
        is_hair: bool,
        segments_per_strand: u32,
    ) {
        if span.primitive_count == 0 {
            return;
        }

        let params = SpanParamsGpu {
            instance_index: span.instance_index,
            subset_index: span.subset_index,
            primitive_count: span.primitive_count,
            primitive_offset: span.primitive_offset,
            is_hair: is_hair as u32,
            segments_per_strand,
            _padding: [0; 2],
        };
        queue.write_buffer(&self.span_params_buffer, 0, bytemuck::bytes_of(&params));

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("primitive_build_bind_group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffers.scene_bounds_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: self.span_params_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: instance_table.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: buffers.primitive_id_buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: buffers.primitive_buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: buffers.primitive_morton_buffer().as_entire_binding(),
                },
            ],
        });

        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("primitive_build_pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.dispatch_workgroups(span.primitive_count.div_ceil(WORKGROUP_SIZE), 1, 1);
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct KernelParams {
    primitive_count: u32,
    _padding: [u32; 3],
}

fn kernel_params_buffer(device: &wgpu::Device, label: &str) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: std::mem::size_of::<KernelParams>() as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// HierarchyBuilder kernel (§4.4): the Karras parallel LBVH construction.
pub struct HierarchyBuilderPipeline {
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    params_buffer: wgpu::Buffer,
}

impl HierarchyBuilderPipeline {
    pub fn new(device: &wgpu::Device) -> anyhow::Result<Self> {
        let source = include_str!("../res/shaders/hierarchy_build.wgsl");
        let module = compile_wgsl(device, "hierarchy_build", source)?;

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("hierarchy_build_bind_group_layout"),
            entries: &[
                uniform_entry(0),
                storage_entry(1, true),
                storage_entry(2, true),
                storage_entry(3, true),
                storage_entry(4, false),
                storage_entry(5, false),
                storage_entry(6, false),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("hierarchy_build_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("hierarchy_build"),
            layout: Some(&pipeline_layout),
            module: &module,
            entry_point: "build_hierarchy",
        });

        Ok(Self {
            pipeline,
            bind_group_layout,
            params_buffer: kernel_params_buffer(device, "hierarchy_build_params"),
        })
    }

    pub fn dispatch(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        buffers: &BvhBuffers,
        primitive_count: u32,
    ) {
        if primitive_count == 0 {
            return;
        }

        let params = KernelParams {
            primitive_count,
            _padding: [0; 3],
        };
        queue.write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&params));

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("hierarchy_build_bind_group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.params_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: buffers.primitive_morton_buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: buffers.primitive_id_buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: buffers.primitive_buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: buffers.bvh_node_buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: buffers.bvh_parent_buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 6,
                    resource: buffers.bvh_flag_buffer().as_entire_binding(),
                },
            ],
        });

        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("hierarchy_build_pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.dispatch_workgroups(primitive_count.div_ceil(WORKGROUP_SIZE), 1, 1);
    }
}

/// AABBPropagator kernel (§4.5): bottom-up atomic-counter reduction.
pub struct AabbPropagatorPipeline {
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    params_buffer: wgpu::Buffer,
}

impl AabbPropagatorPipeline {
    pub fn new(device: &wgpu::Device) -> anyhow::Result<Self> {
        let source = include_str!("../res/shaders/aabb_propagate.wgsl");
        let module = compile_wgsl(device, "aabb_propagate", source)?;

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("aabb_propagate_bind_group_layout"),
            entries: &[
                uniform_entry(0),
                storage_entry(1, true),
                storage_entry(2, false),
                storage_entry(3, false),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("aabb_propagate_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("aabb_propagate"),
            layout: Some(&pipeline_layout),
            module: &module,
            entry_point: "propagate",
        });

        Ok(Self {
            pipeline,
            bind_group_layout,
            params_buffer: kernel_params_buffer(device, "aabb_propagate_params"),
        })
    }

    pub fn dispatch(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        buffers: &BvhBuffers,
        primitive_count: u32,
    ) {
        if primitive_count == 0 {
            return;
        }

        let params = KernelParams {
            primitive_count,
            _padding: [0; 3],
        };
        queue.write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&params));

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("aabb_propagate_bind_group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.params_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: buffers.bvh_parent_buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: buffers.bvh_node_buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: buffers.bvh_flag_buffer().as_entire_binding(),
                },
            ],
        });

        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("aabb_propagate_pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.dispatch_workgroups(primitive_count.div_ceil(WORKGROUP_SIZE), 1, 1);
    }
}

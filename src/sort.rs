///
/// `MortonSort` (§2 item 3, §4.3): the external GPU sort collaborator.
/// Only the contract is specified by the spec ("the heaviest code lives
/// in the external sort library"); this module defines that contract as
/// a trait and ships one concrete implementation — an LSD radix sort
/// over 8-bit digits, grounded in the pack's `cuneus` radix-sort example
/// (`RadixSorter`'s zero/histogram/prefix/scatter pipeline split) but
/// written against the teacher's wgpu 0.17 API surface rather than
/// ported verbatim.

use bytemuck::{Pod, Zeroable};

use crate::shader_loader::compile_wgsl;

const RADIX_PASSES: u32 = 4;
const RADIX_BITS_PER_PASS: u32 = 8;
const WORKGROUP_SIZE: u32 = 256;

/// Key-value sort by Morton code, payload is primitive id (§4.3).
/// `primitive_count` is the host's own view of N, used purely to size
/// dispatches; `counter` is the device-resident `primitiveCounterBuffer`
/// the sort's own shader consults, so in-shader bounds checks never
/// trust a value that didn't come from the GPU's source of truth.
pub trait MortonSorter {
    #[allow(clippy::too_many_arguments)]
    fn sort(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        primitive_count: u32,
        counter: &wgpu::Buffer,
        keys: &wgpu::Buffer,
        values: &wgpu::Buffer,
    );
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct RadixParams {
    num_keys: u32,
    pass_shift: u32,
    num_blocks: u32,
    _padding: u32,
}

pub struct GpuRadixSorter {
    clear_pipeline: wgpu::ComputePipeline,
    clear_block_histogram_pipeline: wgpu::ComputePipeline,
    histogram_pipeline: wgpu::ComputePipeline,
    block_scan_pipeline: wgpu::ComputePipeline,
    scan_pipeline: wgpu::ComputePipeline,
    scatter_pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    histogram_buffer: wgpu::Buffer,
    params_buffer: wgpu::Buffer,
    scratch_keys: Option<wgpu::Buffer>,
    scratch_values: Option<wgpu::Buffer>,
    block_histogram_buffer: Option<wgpu::Buffer>,
    capacity: u32,
    block_capacity: u32,
}

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

impl GpuRadixSorter {
    pub fn new(device: &wgpu::Device) -> anyhow::Result<Self> {
        let source = include_str!("../res/shaders/radix_sort.wgsl");
        let module = compile_wgsl(device, "radix_sort", source)?;

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("radix_sort_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                storage_entry(1, true),
                storage_entry(2, false),
                storage_entry(3, true),
                storage_entry(4, false),
                storage_entry(5, true),
                storage_entry(6, false),
                storage_entry(7, false),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("radix_sort_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let make_pipeline = |entry_point: &str| {
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(entry_point),
                layout: Some(&pipeline_layout),
                module: &module,
                entry_point,
            })
        };

        let histogram_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("radix_sort_histogram"),
            size: 256 * std::mem::size_of::<u32>() as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("radix_sort_params"),
            size: std::mem::size_of::<RadixParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Ok(Self {
            clear_pipeline: make_pipeline("clear_histogram"),
            clear_block_histogram_pipeline: make_pipeline("clear_block_histogram"),
            histogram_pipeline: make_pipeline("build_histogram"),
            block_scan_pipeline: make_pipeline("block_scan"),
            scan_pipeline: make_pipeline("scan_histogram"),
            scatter_pipeline: make_pipeline("scatter"),
            bind_group_layout,
            histogram_buffer,
            params_buffer,
            scratch_keys: None,
            scratch_values: None,
            block_histogram_buffer: None,
            capacity: 0,
            block_capacity: 0,
        })
    }

    fn ensure_capacity(&mut self, device: &wgpu::Device, primitive_count: u32) {
        let num_blocks = primitive_count.max(2).div_ceil(WORKGROUP_SIZE).max(1);

        if primitive_count > self.capacity || self.scratch_keys.is_none() {
            let capacity = primitive_count.max(2);
            self.scratch_keys = Some(device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("radix_sort_scratch_keys"),
                size: (capacity as u64) * std::mem::size_of::<u32>() as u64,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
            self.scratch_values = Some(device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("radix_sort_scratch_values"),
                size: (capacity as u64) * std::mem::size_of::<u32>() as u64,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
            self.capacity = capacity;
        }

        if num_blocks > self.block_capacity || self.block_histogram_buffer.is_none() {
            self.block_histogram_buffer = Some(device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("radix_sort_block_histogram"),
                size: (num_blocks as u64) * 256 * std::mem::size_of::<u32>() as u64,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
            self.block_capacity = num_blocks;
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn make_bind_group(
        &self,
        device: &wgpu::Device,
        counter: &wgpu::Buffer,
        in_keys: &wgpu::Buffer,
        out_keys: &wgpu::Buffer,
        in_values: &wgpu::Buffer,
        out_values: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("radix_sort_bind_group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.params_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: counter.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: self.histogram_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: in_keys.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: out_keys.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: in_values.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 6,
                    resource: out_values.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 7,
                    resource: self
                        .block_histogram_buffer
                        .as_ref()
                        .expect("block histogram buffer not allocated")
                        .as_entire_binding(),
                },
            ],
        })
    }
}

impl MortonSorter for GpuRadixSorter {
    fn sort(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        primitive_count: u32,
        counter: &wgpu::Buffer,
        keys: &wgpu::Buffer,
        values: &wgpu::Buffer,
    ) {
        if primitive_count < 2 {
            return;
        }
        self.ensure_capacity(device, primitive_count);
        let scratch_keys = self.scratch_keys.as_ref().unwrap();
        let scratch_values = self.scratch_values.as_ref().unwrap();

        let dispatch_count = primitive_count.div_ceil(WORKGROUP_SIZE);

        for pass in 0..RADIX_PASSES {
            let pass_shift = pass * RADIX_BITS_PER_PASS;
            let (in_keys, out_keys, in_values, out_values) = if pass % 2 == 0 {
                (keys, scratch_keys, values, scratch_values)
            } else {
                (scratch_keys, keys, scratch_values, values)
            };

            let params = RadixParams {
                num_keys: primitive_count,
                pass_shift,
                num_blocks: dispatch_count,
                _padding: 0,
            };
            queue.write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&params));

            let bind_group =
                self.make_bind_group(device, counter, in_keys, out_keys, in_values, out_values);

            {
                let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some("radix_sort_clear"),
                    timestamp_writes: None,
                });
                pass.set_pipeline(&self.clear_pipeline);
                pass.set_bind_group(0, &bind_group, &[]);
                pass.dispatch_workgroups(1, 1, 1);
            }
            {
                let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some("radix_sort_clear_block_histogram"),
                    timestamp_writes: None,
                });
                pass.set_pipeline(&self.clear_block_histogram_pipeline);
                pass.set_bind_group(0, &bind_group, &[]);
                pass.dispatch_workgroups(dispatch_count, 1, 1);
            }
            {
                let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some("radix_sort_histogram"),
                    timestamp_writes: None,
                });
                pass.set_pipeline(&self.histogram_pipeline);
                pass.set_bind_group(0, &bind_group, &[]);
                pass.dispatch_workgroups(dispatch_count, 1, 1);
            }
            {
                let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some("radix_sort_block_scan"),
                    timestamp_writes: None,
                });
                pass.set_pipeline(&self.block_scan_pipeline);
                pass.set_bind_group(0, &bind_group, &[]);
                pass.dispatch_workgroups(1, 1, 1);
            }
            {
                let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some("radix_sort_scan"),
                    timestamp_writes: None,
                });
                pass.set_pipeline(&self.scan_pipeline);
                pass.set_bind_group(0, &bind_group, &[]);
                pass.dispatch_workgroups(1, 1, 1);
            }
            {
                let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some("radix_sort_scatter"),
                    timestamp_writes: None,
                });
                pass.set_pipeline(&self.scatter_pipeline);
                pass.set_bind_group(0, &bind_group, &[]);
                pass.dispatch_workgroups(dispatch_count, 1, 1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The ping-pong pattern must land the result back in the caller's
    /// original buffers after an even pass count.
    #[test]
    fn pass_count_is_even() {
        assert_eq!(RADIX_PASSES % 2, 0);
    }

    #[test]
    fn four_passes_cover_32_bits() {
        assert_eq!(RADIX_PASSES * RADIX_BITS_PER_PASS, 32);
    }
}

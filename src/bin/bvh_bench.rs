/// Benchmark binary for the GPU BVH builder.
///
/// Builds synthetic scenes of increasing primitive count and times
/// `Update` (capacity check/reallocation) and `Build` (the three
/// compute passes) against a real adapter, mirroring the teacher's own
/// `bvh_project.rs` benchmark shape but driving `GpuBvh` instead of a
/// CPU HLBVH.
use std::time::Instant;

use gpu_bvh::bindings::{create_bind_group_layouts, create_bind_groups, generate_wgsl_string, Bindable};
use gpu_bvh::builder::GpuBvh;
use gpu_bvh::data_structures::bbox::Bbox;
use gpu_bvh::data_structures::vector::{Vec3, Vec3f32};
use gpu_bvh::gpu_handles::GPUHandles;
use gpu_bvh::scene::{MeshComponent, MeshId, MeshSubset, ObjectInstance, Scene};

fn synthetic_scene(triangle_count: u32) -> Scene {
    let mut scene = Scene::new();
    scene.insert_mesh(
        MeshId(0),
        MeshComponent {
            subsets: vec![MeshSubset {
                index_count: triangle_count * 3,
            }],
        },
    );
    scene.objects.push(ObjectInstance {
        mesh_id: Some(MeshId(0)),
    });
    scene
}

fn run_once(handles: &GPUHandles, builder: &mut GpuBvh, scene: &Scene, instance_table: &wgpu::Buffer) -> (std::time::Duration, std::time::Duration) {
    let update_start = Instant::now();
    builder
        .update(&handles.device, scene)
        .expect("capacity update failed");
    let update_time = update_start.elapsed();

    let scene_bounds = Bbox {
        min: Vec3::<f32>(-1.0, -1.0, -1.0),
        max: Vec3::<f32>(1.0, 1.0, 1.0),
    };

    let build_start = Instant::now();
    let mut encoder = handles
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("bvh_bench_encoder"),
        });
    builder.build(&handles.device, &handles.queue, &mut encoder, scene, scene_bounds, instance_table);
    handles.queue.submit(Some(encoder.finish()));
    handles.device.poll(wgpu::Maintain::Wait);
    let build_time = build_start.elapsed();

    (update_time, build_time)
}

fn main() {
    env_logger::init();

    if !gpu_bvh::gpu_handles::self_test() {
        println!("no usable GPU adapter found, skipping benchmark");
        return;
    }

    let handles = GPUHandles::new();
    let mut builder = GpuBvh::new(&handles.device).expect("failed to create GpuBvh");

    let instance_table = handles.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("bvh_bench_instance_table"),
        size: 64,
        usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let runs = 20;
    println!("Benchmarking GpuBvh::update/build with {runs} samples per scale.\n");

    for &triangle_count in &[100u32, 1_000, 10_000, 100_000] {
        let scene = synthetic_scene(triangle_count);
        let mut total_update = std::time::Duration::ZERO;
        let mut total_build = std::time::Duration::ZERO;
        for _ in 0..runs {
            let (update_time, build_time) = run_once(&handles, &mut builder, &scene, &instance_table);
            total_update += update_time;
            total_build += build_time;
        }
        println!(
            "N = {triangle_count:>7}: update {:?} avg, build {:?} avg",
            total_update / runs,
            total_build / runs
        );
        builder.clear();
    }

    // One more build so there's a live BvhGpu to hand to a traversal
    // consumer: exercise the same Bind() path a renderer would use to
    // assemble its bind group from the builder's read-only buffers.
    let consumer_scene = synthetic_scene(1_000);
    run_once(&handles, &mut builder, &consumer_scene, &instance_table);
    let bvh_view = builder.bind();

    let layouts = create_bind_group_layouts(&handles.device, vec![bvh_view.get_layout_entries()]);
    let bind_groups = create_bind_groups(
        &handles.device,
        vec![bvh_view.get_bind_group_entries()],
        &layouts,
    );
    let _consumer_bind_group = bvh_view.create_bind_group(&handles.device, &layouts[0]);
    println!(
        "consumer bind group layouts: {}, bind groups: {}",
        layouts.len(),
        bind_groups.len(),
    );

    for (binding_id, descriptor) in bvh_view.get_bind_descriptor().into_iter().enumerate() {
        let wgsl = generate_wgsl_string(
            descriptor.struct_def,
            descriptor.bind_type.unwrap_or("storage, read"),
            descriptor.var_name,
            descriptor.var_type,
            0,
            binding_id as u32,
            descriptor.extra_code,
        );
        println!("{wgsl}");
    }

    println!("\nAll done.");
}

///
/// `GpuBvh`: the public orchestrator (§6). Owns the three compiled
/// pipelines, the sort collaborator, and the six GPU buffers; exposes
/// `initialize`/`update`/`build`/`bind`/`clear`, matching the source's
/// `Initialize`/`Update`/`Build`/`Bind`/`Clear` operations one-to-one.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::bindings::bvh::BvhGpu;
use crate::buffers::BvhBuffers;
use crate::data_structures::bbox::Bbox;
use crate::error::Result;
use crate::feeder::ScenePrimitiveFeeder;
use crate::pipelines::{AabbPropagatorPipeline, HierarchyBuilderPipeline, PrimitiveBuilderPipeline};
use crate::scene::Scene;
use crate::shader_loader::{ReloadTopic, SubscriptionHandle};
use crate::sort::{GpuRadixSorter, MortonSorter};

pub struct GpuBvh {
    primitive_builder: PrimitiveBuilderPipeline,
    hierarchy_builder: HierarchyBuilderPipeline,
    aabb_propagator: AabbPropagatorPipeline,
    sorter: GpuRadixSorter,
    buffers: BvhBuffers,
    primitive_count: u32,
    initialized: AtomicBool,
    reload_subscription: Option<SubscriptionHandle>,
}

impl GpuBvh {
    /// Constructs the builder with its buffers allocated at zero
    /// capacity; does not compile shaders yet. Call `initialize` once
    /// before the first `update`/`build`.
    pub fn new(device: &wgpu::Device) -> anyhow::Result<Self> {
        Ok(Self {
            primitive_builder: PrimitiveBuilderPipeline::new(device)?,
            hierarchy_builder: HierarchyBuilderPipeline::new(device)?,
            aabb_propagator: AabbPropagatorPipeline::new(device)?,
            sorter: GpuRadixSorter::new(device)?,
            buffers: BvhBuffers::new(device),
            primitive_count: 0,
            initialized: AtomicBool::new(false),
            reload_subscription: None,
        })
    }

    /// Subscribes to the shader-reload topic. Idempotent: repeated calls
    /// after the first are no-ops, mirroring the source's function-local
    /// static guard around its one-time subscription.
    pub fn initialize(&mut self, reload_topic: &ReloadTopic) {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return;
        }
        log::info!("GpuBvh initialized, subscribing to shader reload");
        self.reload_subscription = Some(reload_topic.subscribe(|| {
            log::info!("shader reload signalled; pipelines will recompile on next initialize");
        }));
    }

    /// `Update(scene)`: capacity check and lazy (re)allocation (§4.1).
    /// Pure host work: no GPU dispatch here, only `ensure_capacity`'s
    /// buffer (re)creation. Takes `device` explicitly since this crate
    /// keeps no ambient device global (§9: global state becomes an owned
    /// context object, never a static).
    pub fn update(&mut self, device: &wgpu::Device, scene: &Scene) -> Result<()> {
        let total = scene.total_primitive_count();
        self.buffers.ensure_capacity(device, total)
    }

    /// Records the three compute passes plus interleaved barriers into
    /// `encoder` (§6 `Build(scene, cmd)`). `scene_bounds` is the
    /// frame-constant loose AABB used for Morton normalisation (§9's
    /// resolved "scene AABB dependency" open question); `instance_table`
    /// is the external per-instance transform buffer.
    pub fn build(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        scene: &Scene,
        scene_bounds: Bbox,
        instance_table: &wgpu::Buffer,
    ) {
        let gathered = ScenePrimitiveFeeder::gather(scene);
        for skipped in &gathered.skipped {
            log::warn!("{skipped}");
        }
        self.primitive_count = gathered.primitive_count;

        self.buffers.upload_scene_bounds(queue, scene_bounds);
        self.buffers.upload_primitive_count(queue, self.primitive_count);

        if self.primitive_count == 0 {
            log::info!("build: N = 0, no-op");
            return;
        }

        for span in &gathered.spans {
            self.primitive_builder.dispatch(
                device,
                queue,
                encoder,
                &self.buffers,
                instance_table,
                *span,
                span.is_hair,
                span.segments_per_strand,
            );
        }
        // device-memory barrier after primitive-build, before sort: the
        // implicit submission-order barrier wgpu inserts between passes
        // sharing the same buffers on one command encoder.

        self.sorter.sort(
            device,
            queue,
            encoder,
            self.primitive_count,
            &self.buffers.primitive_counter_buffer,
            self.buffers.primitive_morton_buffer(),
            self.buffers.primitive_id_buffer(),
        );
        // barrier after sort, before hierarchy pass.

        self.hierarchy_builder
            .dispatch(device, queue, encoder, &self.buffers, self.primitive_count);
        // barrier after hierarchy pass, before AABB propagation.

        self.aabb_propagator
            .dispatch(device, queue, encoder, &self.buffers, self.primitive_count);
        // barrier before traversal consumers is the responsibility of Bind's caller.
    }

    /// `Bind(stage, cmd)`: exposes exactly the three read-only buffers a
    /// traversal consumer needs.
    pub fn bind(&self) -> BvhGpu<'_> {
        BvhGpu::new(
            &self.buffers.primitive_counter_buffer,
            self.buffers.primitive_buffer(),
            self.buffers.bvh_node_buffer(),
        )
    }

    /// `Clear()`: resets capacity; the next `update` call reallocates
    /// from scratch.
    pub fn clear(&mut self) {
        self.buffers.clear();
        self.primitive_count = 0;
    }

    pub fn primitive_count(&self) -> u32 {
        self.primitive_count
    }
}

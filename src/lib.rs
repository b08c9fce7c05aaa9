/// GPU-resident linear BVH builder: gathers scene primitives, sorts
/// them along a Morton curve, and constructs a Karras LBVH plus its
/// bottom-up AABB reduction, entirely on the device.
///
/// This crate is a library; it installs no global logger (see
/// `gpu_handles` and `shader_loader` for the `log` call sites) and owns
/// no window or event loop — the embedding application drives `GpuBvh`
/// by calling `update`/`build`/`bind` once per frame against its own
/// `wgpu::Device`/`wgpu::Queue`.

pub mod bindings;
pub mod builder;
pub mod buffers;
pub mod data_structures;
pub mod error;
pub mod feeder;
pub mod gpu_handles;
pub mod pipelines;
pub mod reference;
pub mod scene;
pub mod shader_loader;
pub mod sort;
pub mod validator;

pub use builder::GpuBvh;
pub use error::{BvhError, Result};
pub use scene::Scene;

use wgpu::{Adapter, AdapterInfo, Device, Instance, Queue};

/// A convenience wrapper for interfacing with the GPU. Owned by the
/// embedding application, not by `GpuBvh` itself — the builder only
/// ever borrows a `&Device`/`&Queue`.
pub struct GPUHandles {
    pub queue: Queue,
    pub adapter: Adapter,
    pub instance: Instance,
    pub device: Device,
}

impl GPUHandles {
    pub fn new() -> Self {
        let instance: Instance = get_instance();

        let adapter: Adapter =
            pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                force_fallback_adapter: false,
                ..Default::default()
            }))
            .expect("Failed to find an appropriate adapter");

        let (device, queue): (Device, Queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                label: None,
            },
            None,
        ))
        .expect("Failed to create device");

        GPUHandles {
            queue,
            adapter,
            instance,
            device,
        }
    }
}

impl Default for GPUHandles {
    fn default() -> Self {
        Self::new()
    }
}

pub fn get_instance() -> wgpu::Instance {
    wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends: wgpu::Backends::VULKAN | wgpu::Backends::METAL | wgpu::Backends::DX12,
        dx12_shader_compiler: Default::default(),
        flags: Default::default(),
        gles_minor_version: Default::default(),
    })
}

/// Checks whether the system has a findable adapter (GPU). Tests that
/// need a live `wgpu::Device` probe this first and skip rather than
/// fail when no adapter is found.
pub fn self_test() -> bool {
    log::info!("Performing self test to check system for compatibility.");
    let instance: Instance = get_instance();

    let adapter_option: Option<Adapter> =
        pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions::default()));

    match adapter_option {
        Some(adapter) => {
            let info: AdapterInfo = adapter.get_info();
            log::info!("Found GPU: {:?}", info);
            true
        }
        None => {
            log::warn!("Failed to find a usable GPU.");
            false
        }
    }
}

///
/// Shader compilation and the reload-subscription interface §9 asks for
/// in place of the original's static shader-handle globals: "a plain
/// callback registration (no ambient globals)... model as an explicit
/// Subscribe(topic, handler) returning a handle whose lifetime governs
/// the subscription."

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex,
};

use anyhow::{anyhow, Context, Result};

/// Where shader source text comes from. The default reads `res/shaders/`
/// from disk; tests and embedders that want to avoid filesystem access
/// can supply their own.
pub trait ShaderSource {
    fn load(&self, name: &str) -> Result<String>;
}

pub struct FileShaderSource {
    pub root: std::path::PathBuf,
}

impl FileShaderSource {
    pub fn new(root: impl Into<std::path::PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Default for FileShaderSource {
    fn default() -> Self {
        Self::new("res/shaders")
    }
}

impl ShaderSource for FileShaderSource {
    fn load(&self, name: &str) -> Result<String> {
        let path = self.root.join(name);
        std::fs::read_to_string(&path).with_context(|| format!("reading shader {path:?}"))
    }
}

type ReloadHandler = Box<dyn Fn() + Send + Sync>;

struct Subscriber {
    id: u64,
    handler: ReloadHandler,
}

/// An event topic subscribers register callbacks on. `GpuBvh::initialize`
/// subscribes its own shader-recompile closure once here.
#[derive(Clone, Default)]
pub struct ReloadTopic {
    subscribers: Arc<Mutex<Vec<Subscriber>>>,
    next_id: Arc<AtomicU64>,
}

impl ReloadTopic {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, handler: impl Fn() + Send + Sync + 'static) -> SubscriptionHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.lock().unwrap().push(Subscriber {
            id,
            handler: Box::new(handler),
        });
        SubscriptionHandle {
            topic: self.subscribers.clone(),
            id,
        }
    }

    pub fn notify(&self) {
        for subscriber in self.subscribers.lock().unwrap().iter() {
            (subscriber.handler)();
        }
    }
}

/// RAII guard returned by `ReloadTopic::subscribe`; dropping it removes
/// the callback from the topic.
pub struct SubscriptionHandle {
    topic: Arc<Mutex<Vec<Subscriber>>>,
    id: u64,
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.topic.lock().unwrap().retain(|s| s.id != self.id);
    }
}

/// Compile WGSL source into a shader module, surfacing validation
/// errors through the device's error scope the way the teacher's
/// `create_shader_module` does, rather than trusting wgpu's panic-on-bad-WGSL
/// default behaviour.
pub fn compile_wgsl(device: &wgpu::Device, label: &str, source: &str) -> Result<wgpu::ShaderModule> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    let error = pollster::block_on(device.pop_error_scope());
    if let Some(err) = error {
        return Err(anyhow!("{label}: {err}"));
    }
    Ok(module)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn subscribe_then_drop_stops_notifications() {
        let topic = ReloadTopic::new();
        let count = Arc::new(AtomicU32::new(0));
        let counted = count.clone();
        let handle = topic.subscribe(move || {
            counted.fetch_add(1, Ordering::SeqCst);
        });

        topic.notify();
        assert_eq!(count.load(Ordering::SeqCst), 1);

        drop(handle);
        topic.notify();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn multiple_subscribers_all_fire() {
        let topic = ReloadTopic::new();
        let count = Arc::new(AtomicU32::new(0));

        let c1 = count.clone();
        let _h1 = topic.subscribe(move || {
            c1.fetch_add(1, Ordering::SeqCst);
        });
        let c2 = count.clone();
        let _h2 = topic.subscribe(move || {
            c2.fetch_add(1, Ordering::SeqCst);
        });

        topic.notify();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}

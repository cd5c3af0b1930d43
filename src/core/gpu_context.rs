use std::sync::Arc;

use log::{debug, info};
use wgpu::{Adapter, Buffer, Device, DeviceDescriptor, Features, Instance, Limits, Queue};

use crate::error::{Error, Result};

/// Shared headless GPU context
///
/// Device and queue are behind `Arc` so rasterizers can share one context.
#[derive(Clone)]
pub struct GpuContext {
    device: Arc<Device>,
    queue: Arc<Queue>,
    adapter_name: String,
}

impl GpuContext {
    /// Create an offscreen context, trying hardware adapters before the
    /// software fallback adapter
    pub async fn new() -> Result<Self> {
        let instance = Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = match Self::request_adapter(&instance, false).await {
            Ok(adapter) => adapter,
            Err(e) => {
                debug!("No hardware adapter ({e}), trying fallback adapter");
                Self::request_adapter(&instance, true).await?
            }
        };

        let adapter_name = adapter.get_info().name;
        info!("Using GPU adapter: {adapter_name}");

        let (device, queue) = Self::request_device(&adapter).await?;

        Ok(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
            adapter_name,
        })
    }

    /// Blocking wrapper around [`GpuContext::new`]
    pub fn new_blocking() -> Result<Self> {
        pollster::block_on(Self::new())
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }

    /// Map a buffer for reading and copy its contents out
    ///
    /// Blocks the current thread while the device is polled.
    pub fn read_buffer_sync(&self, buffer: &Buffer) -> Result<Vec<u8>> {
        let buffer_slice = buffer.slice(..);

        let (sender, receiver) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            sender.send(result).ok();
        });

        self.device
            .poll(wgpu::PollType::Wait {
                submission_index: None,
                timeout: None,
            })
            .map_err(|e| Error::UnavailableContext(format!("device poll failed: {e:?}")))?;

        match receiver.recv() {
            Ok(Ok(())) => {
                let data = buffer_slice.get_mapped_range();
                let result = data.to_vec();
                drop(data);
                buffer.unmap();
                Ok(result)
            }
            Ok(Err(e)) => Err(Error::UnavailableContext(format!("buffer mapping failed: {e:?}"))),
            Err(_) => Err(Error::UnavailableContext(
                "channel closed before buffer was mapped".to_string(),
            )),
        }
    }

    async fn request_adapter(instance: &Instance, force_fallback_adapter: bool) -> Result<Adapter> {
        instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter,
            })
            .await
            .map_err(|e| Error::UnavailableContext(format!("failed to find an adapter: {e:?}")))
    }

    async fn request_device(adapter: &Adapter) -> Result<(Device, Queue)> {
        let limits = Limits {
            max_buffer_size: adapter.limits().max_buffer_size,
            max_texture_dimension_2d: adapter.limits().max_texture_dimension_2d,
            ..Limits::downlevel_defaults()
        };

        adapter
            .request_device(&DeviceDescriptor {
                label: Some("Light Field Device"),
                required_features: Features::empty(),
                required_limits: limits,
                memory_hints: Default::default(),
                experimental_features: Default::default(),
                trace: Default::default(),
            })
            .await
            .map_err(|e| Error::UnavailableContext(format!("failed to create device: {e:?}")))
    }
}

use anyhow::{Context, Result};
use wgpu::SurfaceError;
use winit::dpi::PhysicalSize;
use winit::window::Window;

/// Surface and device options used when the window's GPU context is created.
///
/// Every field has a portable default; override only what a platform needs.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Pick a linear (non-sRGB) surface format when one exists.
    ///
    /// The pulse brightness and shader colours are written as-is, so the
    /// default keeps the surface linear.
    pub prefer_srgb: bool,

    /// Swap behavior of the surface.
    ///
    /// FIFO is supported everywhere and paces `step` to the display refresh,
    /// which keeps the animation speed tied to the frame count.
    pub present_mode: wgpu::PresentMode,

    /// Preferred compositing alpha mode.
    ///
    /// Falls back to the first mode the surface reports when unsupported.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    /// Device features to request. The built-in programs need none.
    pub required_features: wgpu::Features,

    /// Device limits to request. The uniform ring stays within the defaults.
    pub required_limits: wgpu::Limits,

    /// Frames the surface may queue ahead of presentation.
    ///
    /// Hint only; support depends on the platform.
    pub desired_maximum_frame_latency: u32,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            prefer_srgb: false,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            desired_maximum_frame_latency: 2,
        }
    }
}

/// Device, queue and the window surface.
///
/// The surface borrows the window, so the window must outlive the `Gpu`.
pub struct Gpu<'w> {
    /// Kept alive for the lifetime of the surface and adapter.
    _instance: wgpu::Instance,

    /// Window surface; `'w` ties it to the window borrow.
    surface: wgpu::Surface<'w>,

    /// Adapter the device was created from, queried for driver strings.
    adapter: wgpu::Adapter,

    /// Logical device shared with the render backend.
    device: wgpu::Device,

    /// Submission queue shared with the render backend.
    queue: wgpu::Queue,

    /// Current surface configuration, reapplied on resize and surface loss.
    config: wgpu::SurfaceConfiguration,

    /// Last drawable size in physical pixels. May be zero while minimized.
    size: PhysicalSize<u32>,
}

/// One acquired surface texture plus the encoder recording into it.
///
/// Holding the surface texture blocks acquisition of the next frame.
pub struct GpuFrame {
    /// Swapchain image; presented by [`Gpu::submit`].
    pub surface_texture: wgpu::SurfaceTexture,
    /// Color attachment view of `surface_texture`.
    pub view: wgpu::TextureView,
    /// Encoder the backend records the frame's passes into.
    pub encoder: wgpu::CommandEncoder,
}

/// What the frame loop does after a failed surface acquire.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// The surface was configured again; the next redraw can render.
    Reconfigured,
    /// Nothing to fix; drop this frame and try on the next redraw.
    SkipFrame,
    /// The device cannot continue; the runtime should exit.
    Fatal,
}

impl<'w> Gpu<'w> {
    /// Creates the device and configures a surface for `window`.
    ///
    /// Adapter and device requests are asynchronous in wgpu; the runtime
    /// blocks on this with `pollster`. Fails on a zero-sized window or when no
    /// adapter can present to the surface.
    pub async fn new(window: &'w Window, init: GpuInit) -> Result<Self> {
        let size = window.inner_size();
        anyhow::ensure!(size.width > 0 && size.height > 0, "window has zero size");

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .context("failed to create wgpu surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let info = adapter.get_info();
        log::info!(
            "adapter: {} ({:?}, {:?}, driver {} {})",
            info.name,
            info.device_type,
            info.backend,
            info.driver,
            info.driver_info
        );

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("tumble device"),
                required_features: init.required_features,
                required_limits: init.required_limits,
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let format = choose_surface_format(&surface_caps.formats, init.prefer_srgb)
            .context("no supported surface formats")?;

        let alpha_mode = init
            .alpha_mode
            .filter(|m| surface_caps.alpha_modes.contains(m))
            .unwrap_or_else(|| {
                surface_caps
                    .alpha_modes
                    .first()
                    .copied()
                    .unwrap_or(wgpu::CompositeAlphaMode::Auto)
            });

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: init.present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: init.desired_maximum_frame_latency,
        };

        surface.configure(&device, &config);
        log::debug!(
            "surface configured: {}x{} {:?} {:?}",
            config.width,
            config.height,
            config.format,
            config.present_mode
        );

        Ok(Gpu {
            _instance: instance,
            surface,
            adapter,
            device,
            queue,
            config,
            size,
        })
    }

    /// Driver and adapter description, reported by the render backend at setup.
    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    /// Color format every pipeline must target.
    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Drawable size in physical pixels.
    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    /// Logical device. The render backend keeps its own clone.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Command queue used for uploads and frame submission.
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Reconfigures the surface. A zero-sized window (minimized) only records
    /// the size; the surface is reconfigured once it is visible again.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            self.size = new_size;
            return;
        }

        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
    }

    /// Acquires the next surface texture and a fresh encoder.
    ///
    /// The frame must be handed to [`Gpu::submit`] promptly; the next acquire
    /// blocks while it is held.
    pub fn begin_frame(&self) -> std::result::Result<GpuFrame, SurfaceError> {
        let surface_texture = self.surface.get_current_texture()?;
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("tumble frame encoder"),
            });

        Ok(GpuFrame {
            surface_texture,
            view,
            encoder,
        })
    }

    /// Submits the frame's commands and presents it.
    ///
    /// The view is released before the texture is presented.
    pub fn submit(&self, frame: GpuFrame) {
        self.queue.submit(std::iter::once(frame.encoder.finish()));
        drop(frame.view);
        frame.surface_texture.present();
    }

    /// Decides how the frame loop reacts to a failed acquire.
    ///
    /// Lost and outdated surfaces are reconfigured in place; timeouts skip the
    /// frame; running out of memory is fatal.
    pub fn handle_surface_error(&mut self, err: SurfaceError) -> SurfaceErrorAction {
        match err {
            SurfaceError::Lost | SurfaceError::Outdated => {
                if self.size.width > 0 && self.size.height > 0 {
                    self.surface.configure(&self.device, &self.config);
                }
                SurfaceErrorAction::Reconfigured
            }
            SurfaceError::OutOfMemory => {
                log::error!("surface out of memory");
                SurfaceErrorAction::Fatal
            }
            SurfaceError::Timeout => SurfaceErrorAction::SkipFrame,
            SurfaceError::Other => SurfaceErrorAction::SkipFrame,
        }
    }
}

/// First format whose sRGB-ness matches `prefer_srgb`, else the first format
/// the surface supports.
fn choose_surface_format(
    formats: &[wgpu::TextureFormat],
    prefer_srgb: bool,
) -> Option<wgpu::TextureFormat> {
    formats
        .iter()
        .copied()
        .find(|f| f.is_srgb() == prefer_srgb)
        .or_else(|| formats.first().copied())
}

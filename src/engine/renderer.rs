// Backend selection and the uniform render surface.
//
// Startup probes the advanced backend family first (Vulkan / Metal / DX12);
// if an adapter or logical device cannot be acquired, the whole chain is
// retried on the universal GL fallback. Falling back is the expected steady
// state on some platforms, so it logs at info level, never as an error.
// Whichever family wins, the rest of the scene talks to the same `Renderer`
// surface and never branches on the choice — only the status overlay reads
// the kind.
//
// The status overlay's readout comes from `StatusProbe`, a second,
// independent detection pass that shares nothing with the bootstrap probe.

use anyhow::Context;
use std::sync::Arc;
use std::sync::mpsc;
use winit::window::Window;

/// Which backend family the bootstrap settled on. Selected once, never
/// switched at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererKind {
    /// Next-generation API path (Vulkan / Metal / DX12).
    Advanced,
    /// Universally-supported GL path.
    Fallback,
}

/// Routing decision from the advanced-probe outcome; `Renderer::select`
/// drives its backend choice through this. Fallback is a routed result,
/// not an error.
pub fn choose_kind(advanced_probe_ok: bool) -> RendererKind {
    if advanced_probe_ok {
        RendererKind::Advanced
    } else {
        RendererKind::Fallback
    }
}

/// Tri-state readout for the status overlay. Display-only; nothing
/// programmatic consumes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendStatus {
    Checking,
    Advanced,
    Fallback,
}

impl BackendStatus {
    pub fn label(self) -> &'static str {
        match self {
            BackendStatus::Checking => "checking graphics backend...",
            BackendStatus::Advanced => "advanced backend active",
            BackendStatus::Fallback => "fallback backend active",
        }
    }
}

/// Background status detection for the overlay readout. Starts at
/// `Checking`; the probe runs on its own thread so early frames genuinely
/// show the checking state before it resolves.
pub struct StatusProbe {
    status: BackendStatus,
    rx: Option<mpsc::Receiver<BackendStatus>>,
}

impl StatusProbe {
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let _ = tx.send(pollster::block_on(probe_status()));
        });
        Self::from_channel(rx)
    }

    fn from_channel(rx: mpsc::Receiver<BackendStatus>) -> Self {
        Self {
            status: BackendStatus::Checking,
            rx: Some(rx),
        }
    }

    /// Latest readout, resolving `Checking` as soon as the probe reports.
    /// A probe thread that dies without reporting reads as `Fallback`.
    pub fn poll(&mut self) -> BackendStatus {
        if let Some(rx) = &self.rx {
            match rx.try_recv() {
                Ok(status) => {
                    log::info!("backend status readout: {}", status.label());
                    self.status = status;
                    self.rx = None;
                }
                Err(mpsc::TryRecvError::Disconnected) => {
                    self.status = BackendStatus::Fallback;
                    self.rx = None;
                }
                Err(mpsc::TryRecvError::Empty) => {}
            }
        }
        self.status
    }
}

/// Independent detection pass for the status readout. Requests its own
/// adapter and device and drops them; deliberately does not reuse the
/// bootstrap's handles.
async fn probe_status() -> BackendStatus {
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends: wgpu::Backends::PRIMARY,
        ..Default::default()
    });

    let Some(adapter) = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await
    else {
        return BackendStatus::Fallback;
    };

    match adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: Some("status probe device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
            },
            None,
        )
        .await
    {
        Ok(_) => BackendStatus::Advanced,
        Err(_) => BackendStatus::Fallback,
    }
}

// ============================================================================
// RENDERER
// ============================================================================

pub struct Renderer {
    kind: RendererKind,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    clear_color: wgpu::Color,
}

/// Kind-agnostic GPU handles from one bootstrap attempt.
struct GpuHandles {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
}

impl Renderer {
    /// Probe, pick a backend family, and bring up the surface. The kind is
    /// routed through `choose_kind` from the advanced-probe outcome.
    /// Only an environment with neither family available errors out.
    pub async fn select(window: Arc<Window>) -> anyhow::Result<Self> {
        let advanced = Self::init_with(window.clone(), wgpu::Backends::PRIMARY).await;
        let kind = choose_kind(advanced.is_ok());

        let handles = match advanced {
            Ok(handles) => {
                log::info!("advanced graphics backend initialized");
                handles
            }
            Err(err) => {
                log::info!("advanced backend unavailable ({err:#}), falling back to GL");
                Self::init_with(window, wgpu::Backends::GL)
                    .await
                    .context("fallback GL backend failed to initialize")?
            }
        };

        Ok(Self {
            kind,
            surface: handles.surface,
            device: handles.device,
            queue: handles.queue,
            config: handles.config,
            clear_color: wgpu::Color::BLACK,
        })
    }

    async fn init_with(
        window: Arc<Window>,
        backends: wgpu::Backends,
    ) -> anyhow::Result<GpuHandles> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .context("creating render surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no compatible GPU adapter")?;

        let info = adapter.get_info();
        log::info!(
            "adapter: {} ({:?}, driver {})",
            info.name,
            info.backend,
            info.driver
        );

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: None,
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await
            .context("acquiring logical device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        surface.configure(&device, &config);

        Ok(GpuHandles {
            surface,
            device,
            queue,
            config,
        })
    }

    pub fn kind(&self) -> RendererKind {
        self.kind
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn set_clear_color(&mut self, color: wgpu::Color) {
        self.clear_color = color;
    }

    pub fn clear_color(&self) -> wgpu::Color {
        self.clear_color
    }

    /// Reconfigure the swapchain for a new viewport. Zero-sized resizes
    /// (minimize) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);
        }
    }
}

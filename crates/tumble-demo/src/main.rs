use anyhow::Result;
use clap::{Parser, ValueEnum};
use winit::dpi::LogicalSize;

use tumble_engine::core::{App, AppControl, FrameCtx};
use tumble_engine::device::{Gpu, GpuInit};
use tumble_engine::logging::{init_logging, LoggingConfig};
use tumble_engine::render::WgpuBackend;
use tumble_engine::scene::{FrameLoop, SceneConfig};
use tumble_engine::window::{Runtime, RuntimeConfig};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum Preset {
    /// One unlit textured cube.
    Single,
    /// A thousand Phong-lit cubes on a spiral.
    Swarm,
    /// Forty cubes around an orbiting light.
    Ring,
}

impl Preset {
    fn scene(self) -> SceneConfig {
        match self {
            Preset::Single => SceneConfig::single_cube(),
            Preset::Swarm => SceneConfig::swarm(),
            Preset::Ring => SceneConfig::lit_ring(),
        }
    }
}

/// Spinning textured cubes over a pulsing background.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    #[arg(long, value_enum, default_value_t = Preset::Single)]
    preset: Preset,

    /// Window width in logical pixels.
    #[arg(long, default_value_t = 640)]
    width: u32,

    /// Window height in logical pixels.
    #[arg(long, default_value_t = 480)]
    height: u32,

    /// Log filter, `env_logger` syntax. Overrides RUST_LOG.
    #[arg(long)]
    log: Option<String>,
}

struct TumbleApp {
    scene: Option<SceneConfig>,
    frame_loop: Option<FrameLoop<WgpuBackend>>,
}

impl App for TumbleApp {
    fn init(&mut self, gpu: &Gpu<'_>, width: u32, height: u32) -> bool {
        let Some(scene) = self.scene.take() else {
            log::error!("init called twice");
            return false;
        };

        let backend = WgpuBackend::new(
            gpu.device(),
            gpu.queue(),
            gpu.adapter_info(),
            gpu.surface_format(),
        );
        let mut frame_loop = FrameLoop::new(backend, scene);
        if !frame_loop.init(width, height) {
            return false;
        }

        self.frame_loop = Some(frame_loop);
        true
    }

    fn resize(&mut self, width: u32, height: u32) {
        if let Some(frame_loop) = self.frame_loop.as_mut() {
            frame_loop.resize(width, height);
        }
    }

    fn step(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        let Some(frame_loop) = self.frame_loop.as_mut() else {
            return AppControl::Exit;
        };

        ctx.render(|frame| {
            frame_loop.backend_mut().begin_frame(frame);
            frame_loop.step();
            frame_loop.backend_mut().end_frame()
        })
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(LoggingConfig {
        env_filter: args.log,
        ..LoggingConfig::default()
    });

    let scene = args.preset.scene();
    log::info!("preset `{}`: {} objects", scene.name, scene.object_count);

    let config = RuntimeConfig {
        title: format!("tumble - {}", scene.name),
        initial_size: LogicalSize::new(args.width.max(1) as f64, args.height.max(1) as f64),
    };

    let app = TumbleApp {
        scene: Some(scene),
        frame_loop: None,
    };

    Runtime::run(config, GpuInit::default(), app)
}

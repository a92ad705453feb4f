//! Waydeck - a Wayland compositor engine
//!
//! Entry point: sets up logging, the desktop, the Wayland socket and the
//! event loop, and drives per-output frames.

use std::time::{Duration, Instant};

use log::{info, trace, warn};

use waydeck::backend::EventLoop;
use waydeck::compositor::{Desktop, OutputMode};
use waydeck::config::ConfigSet;
use waydeck::renderer::TraceRenderer;
use waydeck::server::WaylandServer;

/// Everything the event loop mutates
struct Runtime {
    desktop: Desktop,
    renderer: TraceRenderer,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("starting waydeck");

    // Configuration parsing is a separate concern; run with defaults here.
    let mut desktop = Desktop::new(ConfigSet::new());

    // A virtual output keeps the engine renderable until the adapter
    // reports real ones.
    match desktop.new_output(
        "VIRTUAL-1",
        "waydeck",
        "virtual",
        vec![OutputMode {
            width: 1920,
            height: 1080,
            refresh: 60000,
            preferred: true,
        }],
    ) {
        Ok(id) => info!("virtual output ready: {:?}", id),
        Err(e) => warn!("no virtual output: {}", e),
    }

    let server: WaylandServer<Runtime> = WaylandServer::new()?;
    info!("WAYLAND_DISPLAY={}", server.socket_name());

    let mut event_loop: EventLoop<Runtime> = EventLoop::new()?;
    server.insert_into_loop(event_loop.handle())?;

    let start = Instant::now();
    event_loop.add_frame_timer(Duration::from_millis(16), move |runtime| {
        let time_ms = start.elapsed().as_millis() as u32;
        let outputs: Vec<_> = runtime.desktop.outputs.iter().map(|o| o.id).collect();
        for id in outputs {
            runtime.desktop.render(id, &mut runtime.renderer, time_ms);
            runtime.renderer.reset();
        }
        for request in runtime.desktop.queue.drain() {
            trace!("adapter request: {:?}", request);
        }
    })?;

    let mut runtime = Runtime {
        desktop,
        renderer: TraceRenderer::new(),
    };
    event_loop.run(&mut runtime)
}

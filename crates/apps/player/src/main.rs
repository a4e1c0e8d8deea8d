use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use catalog::EntityCatalog;
use clap::Parser;
use engine::{AnnotationEngine, ContainerRegistry, EngineEvent};
use runtime::Frame;
use scene::view_state::reduce;
use surface::{RecordingSurface, SurfaceProbe};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod loader;
mod page;

use loader::{LoadPlan, load_surface};
use page::{PageFile, ScriptAction};

#[derive(Parser, Debug)]
#[command(author, version, about = "Replays a scripted page against the annotation engine")]
struct Args {
    /// Page file: engine config, entity catalog and script
    page: PathBuf,

    /// Animation frames per second
    #[arg(long, default_value_t = 60.0)]
    fps: f64,

    /// Simulated surface load latency
    #[arg(long, default_value_t = 250)]
    load_delay_ms: u64,

    /// Make the surface load fail with this message
    #[arg(long)]
    fail_load: Option<String>,

    /// Stop after this much page time even if the script is unfinished
    #[arg(long, default_value_t = 30_000)]
    max_ms: u64,

    /// Print every surface command after the run
    #[arg(long)]
    commands: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let raw = std::fs::read_to_string(&args.page)
        .with_context(|| format!("reading {}", args.page.display()))?;
    let page = PageFile::from_json_str(&raw).context("parsing page file")?;
    let catalog = Arc::new(EntityCatalog::from_records(page.entities).context("loading catalog")?);
    info!(entities = catalog.len(), steps = page.script.len(), "page loaded");

    let mut engine: AnnotationEngine<RecordingSurface> =
        AnnotationEngine::new(Arc::clone(&catalog), page.config, ContainerRegistry::new())?;

    let surface = RecordingSurface::new(1);
    let probe = surface.probe();
    let plan = LoadPlan {
        delay: Duration::from_millis(args.load_delay_ms),
        fail_with: args.fail_load.clone(),
    };

    let mut view = engine.initial_view_state();
    engine.on_view_state(&view);

    let ticket = match engine.mount(page.container.as_str()) {
        Ok(ticket) => ticket,
        Err(err) => {
            warn!(%err, "surface unavailable; showing placeholder");
            None
        }
    };
    let load = async move {
        match ticket {
            Some(ticket) => Some(load_surface(ticket, surface, plan).await),
            None => None,
        }
    };
    tokio::pin!(load);
    let mut load_pending = true;

    let dt = 1.0 / args.fps.max(1.0);
    let mut interval = tokio::time::interval(Duration::from_secs_f64(dt));
    let mut frame = Frame::new(0, dt);
    let mut script = page.script.into_iter().peekable();
    let mut mounted = true;

    loop {
        tokio::select! {
            loaded = &mut load, if load_pending => {
                load_pending = false;
                if let Some((ticket, result)) = loaded
                    && let Err(err) = engine.on_surface_loaded(ticket, result)
                {
                    warn!(%err, "surface failed; showing placeholder");
                }
            }
            _ = interval.tick() => {
                frame = frame.next();
                let now_ms = frame.time.as_millis() as u64;

                while let Some(step) = script.next_if(|s| s.at_ms <= now_ms) {
                    match step.action.intent() {
                        Some(intent) => {
                            view = reduce(&view, &intent, engine.catalog());
                            let report = engine.on_view_state(&view);
                            for issue in &report.issues {
                                warn!(%issue, at_ms = step.at_ms, "view update issue");
                            }
                        }
                        None if step.action == ScriptAction::Unmount => {
                            info!(at_ms = step.at_ms, "page navigated away");
                            engine.unmount();
                            mounted = false;
                        }
                        None => {}
                    }
                }

                if let Err(err) = engine.tick(frame) {
                    warn!(%err, "camera step failed");
                }
                log_events(&mut engine);

                let idle = script.peek().is_none() && engine.camera().in_flight().is_none();
                if (idle && !load_pending) || now_ms >= args.max_ms {
                    break;
                }
            }
        }
    }

    if mounted {
        engine.unmount();
    }
    log_events(&mut engine);
    summarize(&engine, &probe, args.commands);
    Ok(())
}

fn log_events(engine: &mut AnnotationEngine<RecordingSurface>) {
    for event in engine.drain_events() {
        match event.payload {
            EngineEvent::StatusChanged(status) => {
                info!(frame = event.frame_index, ?status, "status")
            }
            EngineEvent::SelectionChanged { previous, current } => {
                info!(frame = event.frame_index, ?previous, ?current, "selection")
            }
            EngineEvent::CameraSettled(view) => info!(
                frame = event.frame_index,
                lat = view.center.lat,
                lng = view.center.lng,
                zoom = view.zoom,
                "camera settled"
            ),
        }
    }
}

fn summarize(engine: &AnnotationEngine<RecordingSurface>, probe: &SurfaceProbe, commands: bool) {
    for (name, value) in engine.metrics().snapshot().counters {
        info!(metric = name, value, "counter");
    }
    let leaks = probe.leaks();
    info!(
        destroyed = probe.is_destroyed(),
        leaked_markers = leaks.markers,
        leaked_popups = leaks.popups,
        leaked_layers = leaks.layers,
        calls_after_destroy = probe.calls_after_destroy(),
        "surface released"
    );
    if commands {
        for (i, command) in probe.commands().iter().enumerate() {
            println!("{i:4} {command:?}");
        }
    }
}

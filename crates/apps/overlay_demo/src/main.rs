use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use clap::Parser;
use foundation::math::Coordinate;
use gpu::renderer::HeadlessBackend;
use layers::{FeatureCollection, SymbolLayerOptions};
use overlay::{
    HoverCallbacks, HoverComparison, MapEvent, MapHost, MapTransform, Overlay, OverlayOptions,
    PlacementOptions,
};
use runtime::scheduler::Scheduler;
use scene::components::Drawable3D;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless run of the map overlay against a simulated map")]
struct Args {
    /// Map center longitude (degrees)
    #[arg(long, default_value_t = 13.4, allow_negative_numbers = true)]
    lon: f64,

    /// Map center latitude (degrees)
    #[arg(long, default_value_t = 52.5, allow_negative_numbers = true)]
    lat: f64,

    #[arg(long, default_value_t = 14.0)]
    zoom: f64,

    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    bearing: f64,

    #[arg(long, default_value_t = 0.0)]
    pitch: f64,

    #[arg(long, default_value_t = 1024.0)]
    width: f64,

    #[arg(long, default_value_t = 768.0)]
    height: f64,

    /// Frames to run
    #[arg(long, default_value_t = 120)]
    frames: u64,

    /// Longitude panned per frame (degrees)
    #[arg(long, default_value_t = 0.0001, allow_negative_numbers = true)]
    pan_per_frame: f64,

    /// GeoJSON point source for a symbol layer; a single cube at the center otherwise
    #[arg(long)]
    source: Option<PathBuf>,

    /// JSON symbol layer options (used with --source)
    #[arg(long)]
    layer_options: Option<PathBuf>,

    /// Edge length of the center cube (meters)
    #[arg(long, default_value_t = 200.0)]
    cube_size: f64,

    /// Fire hover callbacks on identity changes instead of hit-count changes
    #[arg(long)]
    identity_hover: bool,
}

/// A map whose view is driven by the demo loop.
struct SimulatedMap {
    center: Coordinate,
    zoom: f64,
    bearing: f64,
    pitch: f64,
    width: f64,
    height: f64,
}

impl SimulatedMap {
    fn pan(&mut self, dlon: f64) {
        self.center.lon += dlon;
    }
}

impl MapHost for SimulatedMap {
    fn transform(&self) -> MapTransform {
        MapTransform::from_view(self.center, self.zoom, self.bearing, self.pitch, self.width, self.height)
    }
}

#[derive(Debug, Default, Serialize)]
struct Summary {
    frames: u64,
    rendered: u64,
    meshes: usize,
    mesh_over: Vec<String>,
    mesh_out: u64,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Err(e) = real_main(Args::parse()) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn real_main(args: Args) -> Result<(), String> {
    let map = SimulatedMap {
        center: Coordinate::lon_lat(args.lon, args.lat),
        zoom: args.zoom,
        bearing: args.bearing,
        pitch: args.pitch,
        width: args.width,
        height: args.height,
    };

    let comparison = if args.identity_hover {
        HoverComparison::Identity
    } else {
        HoverComparison::Count
    };
    let options = OverlayOptions::default().with_hover_comparison(comparison);

    let summary = Rc::new(RefCell::new(Summary::default()));
    let over = Rc::clone(&summary);
    let out = Rc::clone(&summary);
    let callbacks = HoverCallbacks::new()
        .on_mesh_over(move |mesh| {
            info!(%mesh, "mesh over");
            over.borrow_mut().mesh_over.push(mesh.to_string());
        })
        .on_mesh_out(move || {
            info!("mesh out");
            out.borrow_mut().mesh_out += 1;
        });

    let mut overlay =
        Overlay::new(map, HeadlessBackend::new(), options).with_hover_callbacks(callbacks);
    populate(&mut overlay, &args)?;

    let mut scheduler: Scheduler<Overlay<SimulatedMap, HeadlessBackend>> = Scheduler::new();
    Overlay::schedule(&mut scheduler);

    overlay.notify(MapEvent::PointerMove {
        x: args.width / 2.0,
        y: args.height / 2.0,
    });
    for _ in 0..args.frames {
        if scheduler.tick(&mut overlay).is_none() {
            break;
        }
        if args.pan_per_frame != 0.0 {
            overlay.host_mut().pan(args.pan_per_frame);
            overlay.notify(MapEvent::Move);
        }
    }

    {
        let mut s = summary.borrow_mut();
        s.frames = overlay.stats().frames;
        s.rendered = overlay.backend().frames_rendered;
        s.meshes = overlay
            .backend()
            .last_frame
            .as_ref()
            .map(|f| f.mesh_count())
            .unwrap_or(0);
    }
    overlay.stop(&mut scheduler);

    let json = serde_json::to_string_pretty(&*summary.borrow())
        .map_err(|e| format!("serialize summary: {e}"))?;
    println!("{json}");
    Ok(())
}

fn populate(overlay: &mut Overlay<SimulatedMap, HeadlessBackend>, args: &Args) -> Result<(), String> {
    let Some(path) = &args.source else {
        let cube = overlay.spawn_mesh(Drawable3D::cube(args.cube_size));
        let center = Coordinate::lon_lat(args.lon, args.lat);
        overlay
            .add_at_coordinate(cube, center, PlacementOptions::new())
            .map_err(|e| e.to_string())?;
        return Ok(());
    };

    let text = fs::read_to_string(path).map_err(|e| format!("read {path:?}: {e}"))?;
    let source = FeatureCollection::from_json(&text).map_err(|e| format!("parse {path:?}: {e}"))?;

    let layer_options = match &args.layer_options {
        Some(p) => {
            let text = fs::read_to_string(p).map_err(|e| format!("read {p:?}: {e}"))?;
            serde_json::from_str::<SymbolLayerOptions>(&text)
                .map_err(|e| format!("parse {p:?}: {e}"))?
        }
        None => SymbolLayerOptions::new("demo"),
    };

    let id = overlay
        .add_symbol_layer(layer_options, &source)
        .map_err(|e| e.to_string())?;
    let placed = overlay.layer(id).map(|l| l.len()).unwrap_or(0);
    if placed == 0 {
        warn!(path = %path.display(), "source has no point features");
    }
    info!(layer = %id, placed, "source loaded");
    Ok(())
}

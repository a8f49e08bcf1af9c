//! # Scene Viewer
//!
//! Opens a window with the free-fly camera and whatever the command line names.
//!
//! ## Usage
//!
//! Run with: `cargo run --example viewer -- [model.obj | texture.png]...`
//!
//! Each `.obj` argument is loaded as a model; any other argument is used as
//! the texture of a new sphere. Without arguments an untextured sphere is
//! shown. A white light is always added.
//!
//! ## Controls
//!
//! - W/A/S/D fly, E/Q rise and sink
//! - Right mouse drag looks around, the wheel zooms
//! - C starts a custom object, Space adds a point, Enter finishes it
//! - Escape quits

use std::path::Path;

use anyhow::Context;
use sculpt::prelude::*;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let app = ViewerApp::new(ViewerConfig::default()).with_title("sculpt viewer");
    let engine = app.engine();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        engine.create_sphere(None)?;
    }
    for arg in &args {
        let path = Path::new(arg);
        let is_model = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("obj"));
        if is_model {
            engine
                .open_model(path)
                .with_context(|| format!("opening {arg}"))?;
        } else {
            engine
                .create_sphere(Some(path))
                .with_context(|| format!("texturing a sphere with {arg}"))?;
        }
    }

    let light = engine.create_light([255, 255, 255]);
    engine.translate(light, 0.0, 8.0, 0.0)?;

    let stats = engine.statistics();
    log::info!(
        "Scene ready: {} objects, {} vertices, {} triangles",
        stats.objects,
        stats.vertices,
        stats.triangles
    );

    app.run()?;
    Ok(())
}

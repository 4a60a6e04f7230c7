//! FogMap demo
//!
//! Run with:
//!   cargo run --example fogmap
//!   cargo run --example fogmap -- --assets assets --no-overlay
//!   cargo run --example fogmap -- --light-speed 0.5

use clap::Parser;
use fogmap_renderer::{
    window::{run, WindowOptions},
    DirectorySource, FogGrid, RendererConfig,
};

#[derive(Parser, Debug)]
#[command(about = "Shadow-mapped scene with a fog-cell overlay")]
struct Args {
    /// Directory holding the shaders and the model
    #[arg(long, default_value = "assets")]
    assets: String,

    /// Shadow map edge length in texels
    #[arg(long, default_value_t = 1024)]
    shadow_size: u32,

    /// Skip the overlay pass
    #[arg(long)]
    no_overlay: bool,

    /// Fog grid columns and rows
    #[arg(long, default_value_t = 16)]
    grid: u32,

    /// Light spin in radians per second
    #[arg(long)]
    light_speed: Option<f32>,

    #[arg(long)]
    no_vsync: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = RendererConfig::default().with_shadow_map_size(args.shadow_size);
    if args.no_overlay {
        config = config.without_overlay();
    } else {
        config = config.with_fog_grid(FogGrid {
            columns: args.grid,
            rows: args.grid,
            ..Default::default()
        });
    }
    if let Some(speed) = args.light_speed {
        config = config.with_light_animation(speed);
    }

    let options = WindowOptions {
        vsync: !args.no_vsync,
        ..Default::default()
    };

    if let Err(e) = run(options, DirectorySource::new(args.assets), config) {
        eprintln!("fogmap: {}", e);
        std::process::exit(1);
    }
}

//! wavesynth - plays a wavetable voice while its harmonics are recomputed live
//!
//! Run with: cargo run --release

mod app;

use app::Demo;

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    Demo::new()
        .seconds(12.0)
        .harmonics(12)
        .unison(5, 0.4, 0.2)
        .run()
}

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cfg = laser_visualizer::config::Config::parse();
    laser_visualizer::app::init_logging(&cfg)?;
    if cfg.list_devices {
        laser_visualizer::track::list_output_devices()?;
        return Ok(());
    }

    laser_visualizer::app::run(cfg)
}

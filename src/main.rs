use anyhow::Result;
use dsmc::settings;
use dsmc::simulation::Simulation;
use log::info;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = settings::load_config()?;
    info!("{}", settings);

    let mut simulation = Simulation::new(settings)?;
    simulation.run();
    simulation.writeup()?;

    Ok(())
}

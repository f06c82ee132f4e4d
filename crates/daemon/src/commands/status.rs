//! Status command - shows paths and configuration state.

use anyhow::Result;
use meshtalk_core::{platform, Config};

pub async fn execute() -> Result<()> {
    println!("Meshtalk Status");
    println!("===============");
    println!();

    println!("Paths:");
    println!("  Config:    {:?}", platform::config_dir());
    println!("  Data:      {:?}", platform::data_dir());

    println!();

    let config_file = platform::config_file_path();
    if config_file.exists() {
        println!("Config file: {:?}", config_file);
    } else {
        println!("Config file: Not found (using defaults)");
    }

    let config = Config::load_with_env()?;
    println!("Nickname:    {}", config.nickname);
    println!("Received:    {:?}", config.received_dir);
    match config.validate() {
        Ok(()) => println!("Valid:       yes"),
        Err(e) => println!("Valid:       no ({})", e),
    }

    Ok(())
}

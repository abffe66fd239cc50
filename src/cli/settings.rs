use std::error::Error;

use crate::core::config::keys::CONFIG_KEYS;
use crate::core::config::Config;

pub fn run_set(key: &str, value: &str) -> Result<(), Box<dyn Error>> {
    let mut config = Config::load()?;
    if value.trim().is_empty() {
        config.print_all();
        return Ok(());
    }
    if let Err(err) = config.set_value(key, value) {
        eprintln!("❌ {err}");
        eprintln!("Known keys: {}", CONFIG_KEYS.join(", "));
        std::process::exit(1);
    }
    config.save()?;
    println!("✅ Set {key} to: {}", value.trim());
    Ok(())
}

pub fn run_unset(key: &str) -> Result<(), Box<dyn Error>> {
    let mut config = Config::load()?;
    if let Err(err) = config.unset_value(key) {
        eprintln!("❌ {err}");
        eprintln!("Known keys: {}", CONFIG_KEYS.join(", "));
        std::process::exit(1);
    }
    config.save()?;
    println!("✅ Unset {key}");
    Ok(())
}

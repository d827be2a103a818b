use anyhow::Result;

use termin::config::Config;

use super::query::expire;

/// Expire stale pending reservations once
pub fn sweep(config: &Config) -> Result<()> {
    let expired = expire(config)?;
    tracing::info!(expired, "Expiry sweep finished");
    println!("Expired {expired} pending reservation(s)");
    Ok(())
}

/// Validate the configuration and print the effective values
pub fn check_config(config: &Config) -> Result<()> {
    config.validate()?;
    println!("Configuration is valid");
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::budget::HardwareBudget;
use crate::error::{Error, Result};
use crate::optimizer::TierLimits;

/// Device description for the optimizer: the budget the verdict is checked
/// against and the tier capacities the search places into. Every key is
/// optional in the file; absent keys take the documented defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
pub struct DeviceConfig {
  #[serde(default)]
  pub budget: HardwareBudget,
  #[serde(default)]
  pub tiers: TierLimits,
}

/// Loads and validates a device config file.
pub fn load_config_file(path: &Path) -> Result<DeviceConfig> {
  let content = fs::read_to_string(path)
    .map_err(|e| Error::Config(format!("cannot read config file {}: {}", path.display(), e)))?;
  let config: DeviceConfig = toml::from_str(&content)
    .map_err(|e| Error::Config(format!("cannot parse config file {}: {}", path.display(), e)))?;
  validate_config(&config)?;
  Ok(config)
}

/// CLI flags win over file values.
pub fn apply_cli_overrides(
  config: &mut DeviceConfig,
  fast_mem_size: Option<u64>,
  lp_mem_size: Option<u64>,
) {
  if let Some(size) = fast_mem_size {
    config.tiers.fast_mem_size = size;
  }
  if let Some(size) = lp_mem_size {
    config.tiers.lp_mem_size = size;
  }
}

pub fn validate_config(config: &DeviceConfig) -> Result<()> {
  if config.budget.flash_size == 0 {
    return Err(Error::Config("flash_size cannot be zero".to_string()));
  }
  if config.budget.sram_size == 0 {
    return Err(Error::Config("sram_size cannot be zero".to_string()));
  }
  if config.budget.core_clock <= 0.0 {
    return Err(Error::Config("core_clock must be positive".to_string()));
  }
  if config.tiers.fast_mem_size == 0 {
    return Err(Error::Config("fast_mem_size cannot be zero".to_string()));
  }
  if config.tiers.lp_mem_size == 0 {
    return Err(Error::Config("lp_mem_size cannot be zero".to_string()));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_file_yields_the_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("device.toml");
    fs::write(&path, "").unwrap();
    let config = load_config_file(&path).unwrap();
    assert_eq!(config.budget.flash_size, 32_000_000);
    assert_eq!(config.budget.sram_size, 3_000_000);
    assert_eq!(config.budget.core_clock, 400_000_000.0);
    assert_eq!(config.tiers.fast_mem_size, 1_536_000);
    assert_eq!(config.tiers.lp_mem_size, 1_536_000);
  }

  #[test]
  fn partial_file_overrides_only_named_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("device.toml");
    fs::write(
      &path,
      "[budget]\nsram_size = 2000000\n\n[tiers]\nfast_mem_size = 1000000\n",
    )
    .unwrap();
    let config = load_config_file(&path).unwrap();
    assert_eq!(config.budget.sram_size, 2_000_000);
    assert_eq!(config.budget.flash_size, 32_000_000);
    assert_eq!(config.tiers.fast_mem_size, 1_000_000);
    assert_eq!(config.tiers.lp_mem_size, 1_536_000);
  }

  #[test]
  fn zero_sizes_are_rejected() {
    let mut config = DeviceConfig::default();
    config.budget.sram_size = 0;
    assert!(validate_config(&config).is_err());

    let mut config = DeviceConfig::default();
    config.tiers.lp_mem_size = 0;
    assert!(validate_config(&config).is_err());
  }

  #[test]
  fn unreadable_and_unparsable_files_are_config_errors() {
    assert!(matches!(
      load_config_file(Path::new("/nonexistent/device.toml")),
      Err(Error::Config(_))
    ));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("device.toml");
    fs::write(&path, "[budget\nbroken").unwrap();
    assert!(matches!(load_config_file(&path), Err(Error::Config(_))));
  }

  #[test]
  fn cli_flags_win_over_file_values() {
    let mut config = DeviceConfig::default();
    apply_cli_overrides(&mut config, Some(2_000_000), None);
    assert_eq!(config.tiers.fast_mem_size, 2_000_000);
    assert_eq!(config.tiers.lp_mem_size, 1_536_000);
  }
}

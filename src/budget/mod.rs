use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::report::Summary;

/// The report expresses memory usage in kibibytes. The conversion is exact.
pub const KIB: f64 = 1024.0;

fn default_flash_size() -> u64 {
  32_000_000
}

fn default_sram_size() -> u64 {
  3_000_000
}

fn default_core_clock() -> f64 {
  400_000_000.0
}

/// Target device constraints, loaded once per run and read-only after.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct HardwareBudget {
  /// Off-chip flash capacity in bytes.
  #[serde(default = "default_flash_size")]
  pub flash_size: u64,
  /// SRAM-tier capacity in bytes.
  #[serde(default = "default_sram_size")]
  pub sram_size: u64,
  /// Core clock the metrics are normalized onto, in Hz.
  #[serde(default = "default_core_clock")]
  pub core_clock: f64,
}

impl Default for HardwareBudget {
  fn default() -> Self {
    Self {
      flash_size: default_flash_size(),
      sram_size: default_sram_size(),
      core_clock: default_core_clock(),
    }
  }
}

/// Derived usage and limit figures from one evaluation. Byte figures are
/// actual placements; limit fields echo the budget so a caller can check
/// each ceiling independently.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PerfMetrics {
  /// Weights the compiler placed in on-chip flash. On this device that
  /// area is fast enough to count against the SRAM-tier budget, hence the
  /// field name.
  pub sram_weights_bytes: u64,
  pub sram_tensor_bytes: u64,
  pub flash_weights_bytes: u64,
  pub sram_size_limit: u64,
  /// Arena cache ceiling the compiler ran with.
  pub sram_tensor_size_limit: u64,
  pub flash_size_limit: u64,
  pub core_clock: f64,
  pub inferences_per_second: f64,
  pub inference_time: f64,
}

impl PerfMetrics {
  fn limits_only(budget: &HardwareBudget) -> Self {
    Self {
      sram_weights_bytes: 0,
      sram_tensor_bytes: 0,
      flash_weights_bytes: 0,
      sram_size_limit: budget.sram_size,
      sram_tensor_size_limit: 0,
      flash_size_limit: budget.flash_size,
      core_clock: budget.core_clock,
      inferences_per_second: 0.0,
      inference_time: 0.0,
    }
  }

  pub fn sram_used_bytes(&self) -> u64 {
    self.sram_weights_bytes + self.sram_tensor_bytes
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Verdict {
  pub fits: bool,
  pub metrics: PerfMetrics,
}

impl Verdict {
  /// Names of the ceilings the report blew through, empty when it fits.
  pub fn failures(&self) -> Vec<&'static str> {
    let mut failures = Vec::new();
    if self.metrics.flash_weights_bytes > self.metrics.flash_size_limit {
      failures.push("flash_size");
    }
    if self.metrics.sram_used_bytes() > self.metrics.sram_size_limit {
      failures.push("sram_size");
    }
    failures
  }
}

/// Checks one summary report against the device budget. A missing report is
/// a did-not-fit verdict with limit-only metrics; a present report with a
/// bad field is a fatal error naming the field.
pub fn evaluate(report: Option<&Summary>, budget: &HardwareBudget) -> Result<Verdict> {
  let summary = match report {
    Some(summary) => summary,
    None => {
      return Ok(Verdict {
        fits: false,
        metrics: PerfMetrics::limits_only(budget),
      });
    },
  };

  let report_clock = summary.require_f64("core_clock")?;
  if report_clock <= 0.0 {
    return Err(Error::MalformedField {
      field: "core_clock",
      value: report_clock.to_string(),
    });
  }
  // Report throughput and latency assume the report's own clock; re-express
  // them for the budget's clock.
  let inference_scalar = budget.core_clock / report_clock;

  let sram_weights_bytes = (summary.require_f64("on_chip_flash_memory_used")? * KIB) as u64;
  let sram_tensor_bytes = (summary.require_f64("sram_memory_used")? * KIB) as u64;
  let flash_weights_bytes = (summary.require_f64("off_chip_flash_memory_used")? * KIB) as u64;
  let sram_tensor_size_limit = (summary.require_f64("arena_cache_size")? * KIB) as u64;

  if let Some(cycles_npu) = summary.get_f64("cycles_npu")? {
    if cycles_npu == 0.0 {
      warn!("report shows zero NPU cycles, no operator was mapped to the NPU");
    }
  }

  let sram_used = sram_weights_bytes + sram_tensor_bytes;
  let fits = flash_weights_bytes <= budget.flash_size && sram_used <= budget.sram_size;

  let metrics = PerfMetrics {
    sram_weights_bytes,
    sram_tensor_bytes,
    flash_weights_bytes,
    sram_size_limit: budget.sram_size,
    sram_tensor_size_limit,
    flash_size_limit: budget.flash_size,
    core_clock: budget.core_clock,
    inferences_per_second: summary.require_f64("inferences_per_second")? / inference_scalar,
    inference_time: summary.require_f64("inference_time")? * inference_scalar,
  };

  Ok(Verdict { fits, metrics })
}

use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

use crate::budget::{evaluate, HardwareBudget, PerfMetrics, KIB};
use crate::compiler::{CompileOptions, CompileRunner};
use crate::error::Result;

/// Arena cache ceiling for the calibration run. Generous enough that the
/// compiler lays the model out however it wants, which is the layout the
/// tier decision is based on.
pub const CALIBRATION_ARENA_CACHE: u64 = 3_072_000;

fn default_fast_mem_size() -> u64 {
  1_536_000
}

fn default_lp_mem_size() -> u64 {
  1_536_000
}

/// Capacities of the two on-chip tiers, in bytes. Flash is the unbounded
/// fallback behind both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct TierLimits {
  #[serde(default = "default_fast_mem_size")]
  pub fast_mem_size: u64,
  #[serde(default = "default_lp_mem_size")]
  pub lp_mem_size: u64,
}

impl Default for TierLimits {
  fn default() -> Self {
    Self {
      fast_mem_size: default_fast_mem_size(),
      lp_mem_size: default_lp_mem_size(),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MemTier {
  /// Tensors and weights both in the fast tier.
  AllFastMem,
  /// Tensors in the fast tier, weights spilled to the low-power tier.
  TensorFastWeightsLp,
  /// Weights fall back to flash.
  WeightsFlash,
}

impl MemTier {
  pub fn as_str(&self) -> &'static str {
    match self {
      MemTier::AllFastMem => "all_fastmem",
      MemTier::TensorFastWeightsLp => "fastmem+lpmem",
      MemTier::WeightsFlash => "flash",
    }
  }

  /// System config identifier handed to the compiler for this placement.
  pub fn system_config(&self) -> &'static str {
    match self {
      MemTier::AllFastMem => "npu_400MHz_all_fastmem",
      MemTier::TensorFastWeightsLp => "npu_400MHz_tensor_fastmem_weights_lpmem",
      MemTier::WeightsFlash => "npu_400MHz_tensor_fastmem_weights_flash66MHz",
    }
  }
}

/// One candidate placement tried during the search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TieringPlan {
  pub total_working_set: u64,
  pub tier: MemTier,
  pub arena_cache_size: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
  pub fits: bool,
  /// Absent when the calibration run produced no report to plan from.
  pub plan: Option<TieringPlan>,
  pub metrics: PerfMetrics,
}

impl SearchOutcome {
  pub fn tier_name(&self) -> Option<&'static str> {
    self.plan.map(|plan| plan.tier.as_str())
  }
}

/// First fit by ascending capacity. Bounds are inclusive: a working set
/// exactly filling a tier still takes it.
pub fn select_tier(total_working_set: u64, limits: &TierLimits) -> MemTier {
  if total_working_set <= limits.fast_mem_size {
    MemTier::AllFastMem
  } else if total_working_set <= limits.fast_mem_size + limits.lp_mem_size {
    MemTier::TensorFastWeightsLp
  } else {
    MemTier::WeightsFlash
  }
}

/// Finds the smallest tier placement that lets a model fit, at the cost of
/// exactly two compiler invocations: one calibration probe to learn the
/// model's natural footprint, one final run pinned to the selected tier.
/// No within-tier shrinking is attempted after the first fit.
pub struct Optimizer<'a> {
  runner: &'a dyn CompileRunner,
  limits: TierLimits,
  budget: HardwareBudget,
}

impl<'a> Optimizer<'a> {
  pub fn new(runner: &'a dyn CompileRunner) -> Self {
    Self {
      runner,
      limits: TierLimits::default(),
      budget: HardwareBudget::default(),
    }
  }

  pub fn with_limits(mut self, limits: TierLimits) -> Self {
    self.limits = limits;
    self
  }

  pub fn with_budget(mut self, budget: HardwareBudget) -> Self {
    self.budget = budget;
    self
  }

  pub fn search(&self, model_file: &Path) -> Result<SearchOutcome> {
    // Intermediate models and reports live here and are removed on every
    // exit path, including invocation and evaluation failures.
    let workdir = TempDir::new()?;

    let mut probe_opts = CompileOptions::new(model_file);
    probe_opts.output_dir = workdir.path().to_path_buf();
    probe_opts.arena_cache_size = Some(CALIBRATION_ARENA_CACHE);
    probe_opts.stages.clear();
    info!(
      "calibration run with arena cache ceiling {} bytes",
      CALIBRATION_ARENA_CACHE
    );

    let summary = match self.runner.run(&probe_opts)? {
      Some(summary) => summary,
      None => {
        let verdict = evaluate(None, &self.budget)?;
        return Ok(SearchOutcome {
          fits: verdict.fits,
          plan: None,
          metrics: verdict.metrics,
        });
      },
    };

    let weights = (summary.require_f64("off_chip_flash_memory_used")? * KIB) as u64;
    let arena_cache_size = (summary.require_f64("sram_memory_used")? * KIB) as u64;
    let total_working_set = arena_cache_size + weights;
    let tier = select_tier(total_working_set, &self.limits);
    info!(
      "working set {} bytes (tensor arena {}, weights {}), placing as {}",
      total_working_set,
      arena_cache_size,
      weights,
      tier.as_str()
    );

    let mut final_opts = CompileOptions::new(model_file);
    final_opts.output_dir = workdir.path().to_path_buf();
    final_opts.arena_cache_size = Some(arena_cache_size);
    final_opts.system_config = tier.system_config().to_string();
    final_opts.stages.clear();
    let final_summary = self.runner.run(&final_opts)?;

    let verdict = evaluate(final_summary.as_ref(), &self.budget)?;
    Ok(SearchOutcome {
      fits: verdict.fits,
      plan: Some(TieringPlan {
        total_working_set,
        tier,
        arena_cache_size,
      }),
      metrics: verdict.metrics,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::Error;
  use crate::report::Summary;
  use std::cell::RefCell;
  use std::collections::VecDeque;
  use std::path::PathBuf;

  struct StubRunner {
    calls: RefCell<Vec<CompileOptions>>,
    results: RefCell<VecDeque<Result<Option<Summary>>>>,
  }

  impl StubRunner {
    fn new(results: Vec<Result<Option<Summary>>>) -> Self {
      Self {
        calls: RefCell::new(Vec::new()),
        results: RefCell::new(results.into_iter().collect()),
      }
    }

    fn calls(&self) -> Vec<CompileOptions> {
      self.calls.borrow().clone()
    }
  }

  impl CompileRunner for StubRunner {
    fn run(&self, opts: &CompileOptions) -> Result<Option<Summary>> {
      self.calls.borrow_mut().push(opts.clone());
      self
        .results
        .borrow_mut()
        .pop_front()
        .expect("unexpected compiler invocation")
    }
  }

  fn probe_summary(sram_kb: &str, off_chip_kb: &str) -> Summary {
    Summary::from_pairs([
      ("core_clock", "400000000.0"),
      ("arena_cache_size", "3000.0"),
      ("sram_memory_used", sram_kb),
      ("on_chip_flash_memory_used", "0"),
      ("off_chip_flash_memory_used", off_chip_kb),
      ("inferences_per_second", "71.67"),
      ("inference_time", "0.01395"),
    ])
  }

  #[test]
  fn tier_selection_bounds_are_inclusive() {
    let limits = TierLimits::default();
    assert_eq!(select_tier(1_536_000, &limits), MemTier::AllFastMem);
    assert_eq!(select_tier(1_536_001, &limits), MemTier::TensorFastWeightsLp);
    assert_eq!(select_tier(3_072_000, &limits), MemTier::TensorFastWeightsLp);
    assert_eq!(select_tier(3_072_001, &limits), MemTier::WeightsFlash);
    assert_eq!(select_tier(0, &limits), MemTier::AllFastMem);
  }

  #[test]
  fn probe_then_final_run_with_the_selected_tier() {
    // 1 KiB arena + 1 KiB weights: everything fits the 2048 byte fast tier.
    let runner = StubRunner::new(vec![
      Ok(Some(probe_summary("1.0", "1.0"))),
      Ok(Some(probe_summary("1.0", "1.0"))),
    ]);
    let limits = TierLimits {
      fast_mem_size: 2048,
      lp_mem_size: 2048,
    };
    let outcome = Optimizer::new(&runner)
      .with_limits(limits)
      .search(&PathBuf::from("pose.tflite"))
      .unwrap();

    let calls = runner.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].arena_cache_size, Some(CALIBRATION_ARENA_CACHE));
    assert_ne!(calls[0].output_dir, PathBuf::from("."));
    assert_eq!(calls[1].arena_cache_size, Some(1024));
    assert_eq!(calls[1].system_config, "npu_400MHz_all_fastmem");
    assert_eq!(calls[1].output_dir, calls[0].output_dir);

    assert!(outcome.fits);
    let plan = outcome.plan.expect("plan expected");
    assert_eq!(plan.tier, MemTier::AllFastMem);
    assert_eq!(plan.total_working_set, 2048);
    assert_eq!(plan.arena_cache_size, 1024);
    assert_eq!(outcome.tier_name(), Some("all_fastmem"));
  }

  #[test]
  fn oversized_working_set_falls_back_to_flash() {
    // 2000 KiB arena + 4000 KiB weights against the default 1.5 MB tiers.
    let runner = StubRunner::new(vec![
      Ok(Some(probe_summary("2000.0", "4000.0"))),
      Ok(Some(probe_summary("2000.0", "4000.0"))),
    ]);
    let outcome = Optimizer::new(&runner)
      .search(&PathBuf::from("pose.tflite"))
      .unwrap();

    let calls = runner.calls();
    assert_eq!(
      calls[1].system_config,
      "npu_400MHz_tensor_fastmem_weights_flash66MHz"
    );
    assert_eq!(calls[1].arena_cache_size, Some(2_048_000));
    assert_eq!(outcome.tier_name(), Some("flash"));
  }

  #[test]
  fn split_tier_is_selected_between_the_bounds() {
    // 1 KiB arena + 2 KiB weights with 2048 byte tiers: past fast, within
    // fast plus low-power.
    let runner = StubRunner::new(vec![
      Ok(Some(probe_summary("1.0", "2.0"))),
      Ok(Some(probe_summary("1.0", "2.0"))),
    ]);
    let limits = TierLimits {
      fast_mem_size: 2048,
      lp_mem_size: 2048,
    };
    let outcome = Optimizer::new(&runner)
      .with_limits(limits)
      .search(&PathBuf::from("pose.tflite"))
      .unwrap();
    assert_eq!(outcome.tier_name(), Some("fastmem+lpmem"));
    assert_eq!(
      runner.calls()[1].system_config,
      "npu_400MHz_tensor_fastmem_weights_lpmem"
    );
  }

  #[test]
  fn missing_probe_report_degrades_to_not_fitting() {
    let runner = StubRunner::new(vec![Ok(None)]);
    let outcome = Optimizer::new(&runner)
      .search(&PathBuf::from("pose.tflite"))
      .unwrap();

    assert_eq!(runner.calls().len(), 1);
    assert!(!outcome.fits);
    assert!(outcome.plan.is_none());
    assert_eq!(outcome.tier_name(), None);
    assert_eq!(outcome.metrics.sram_weights_bytes, 0);
  }

  #[test]
  fn missing_final_report_keeps_the_plan_but_not_the_fit() {
    let runner = StubRunner::new(vec![Ok(Some(probe_summary("1.0", "1.0"))), Ok(None)]);
    let outcome = Optimizer::new(&runner)
      .search(&PathBuf::from("pose.tflite"))
      .unwrap();
    assert!(!outcome.fits);
    assert!(outcome.plan.is_some());
  }

  #[test]
  fn invocation_failure_aborts_the_search() {
    let runner = StubRunner::new(vec![Err(Error::Config("compiler exploded".to_string()))]);
    let result = Optimizer::new(&runner).search(&PathBuf::from("pose.tflite"));
    assert!(result.is_err());
    assert_eq!(runner.calls().len(), 1);
  }

  #[test]
  fn malformed_probe_field_is_fatal_and_named() {
    let summary = Summary::from_pairs([
      ("core_clock", "400000000.0"),
      ("sram_memory_used", "875.5"),
      ("off_chip_flash_memory_used", "plenty"),
    ]);
    let runner = StubRunner::new(vec![Ok(Some(summary))]);
    match Optimizer::new(&runner).search(&PathBuf::from("pose.tflite")) {
      Err(Error::MalformedField { field, .. }) => {
        assert_eq!(field, "off_chip_flash_memory_used")
      },
      other => panic!("expected MalformedField, got {:?}", other),
    }
  }
}

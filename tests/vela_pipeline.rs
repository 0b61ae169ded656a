//! End-to-end runs against a real `vela` on PATH. Gated like the rest of
//! the external-binary tests; point TUNEUP_TEST_MODEL at a real model file
//! before enabling the feature.
#![cfg(feature = "vela-tests")]

use std::path::PathBuf;

use tuneup::compiler::VelaRunner;
use tuneup::init_log;
use tuneup::optimizer::Optimizer;

fn test_model() -> PathBuf {
  PathBuf::from(
    std::env::var("TUNEUP_TEST_MODEL").expect("set TUNEUP_TEST_MODEL to a .tflite file"),
  )
}

#[test]
fn optimizer_places_a_real_model() {
  init_log();

  let runner = VelaRunner;
  let outcome = Optimizer::new(&runner)
    .search(&test_model())
    .expect("search failed");

  // Whatever the verdict, a real compile run must produce a plan and
  // normalized metrics.
  let plan = outcome.plan.expect("calibration report missing");
  assert!(plan.arena_cache_size > 0);
  assert!(outcome.metrics.inference_time > 0.0);
  if outcome.fits {
    assert!(outcome.metrics.sram_used_bytes() <= outcome.metrics.sram_size_limit);
  }
}

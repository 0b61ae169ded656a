pub mod budget;
pub mod codegen;
pub mod compiler;
pub mod config;
pub mod error;
pub mod optimizer;
pub mod report;
pub mod utils;

pub use budget::{evaluate, HardwareBudget, PerfMetrics, Verdict};
pub use compiler::{compile_model, CompileOptions, CompileRunner, Compiler, VelaRunner};
pub use error::{Error, Result};
pub use optimizer::{MemTier, Optimizer, SearchOutcome, TierLimits, TieringPlan};
pub use report::Summary;
pub use utils::log::init_log;

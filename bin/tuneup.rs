/// Tuneup - NPU model conversion pipeline
///
/// Compiles a LiteRT model for the embedded NPU, emits the firmware source
/// artifacts, and searches for the smallest memory tiering that fits the
/// target device.
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use tuneup::compiler::{
  compile_model, CompileOptions, Compiler, ModelLoc, Optimize, Stage, VelaRunner,
  DEFAULT_SYSTEM_CONFIG,
};
use tuneup::config::{self, DeviceConfig};
use tuneup::init_log;
use tuneup::optimizer::Optimizer;
use tuneup::SearchOutcome;

#[derive(Parser, Debug)]
#[command(name = "tuneup")]
#[command(version = "0.1.0")]
#[command(about = "Compiles LiteRT models for the NPU and checks the device fit", long_about = None)]
struct Args {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Compile a model and emit firmware source artifacts
  Compile(CompileArgs),
  /// Search for the smallest memory tiering that fits the device
  Optimize(OptimizeArgs),
}

#[derive(clap::Args, Debug)]
struct CompileArgs {
  /// Path to the model file
  #[arg(short, long, value_name = "FILE")]
  model_file: PathBuf,

  /// Directory to output generated files
  #[arg(short, long, default_value = ".")]
  output_dir: PathBuf,

  /// Base name of the generated source files
  #[arg(short = 'n', long, default_value = "model")]
  model_file_out: String,

  /// Target compiler
  #[arg(short, long, value_enum, default_value_t = CompilerArg::Vela)]
  compiler: CompilerArg,

  /// Model placement: resident in SRAM or loaded from flash
  #[arg(long, value_enum, default_value_t = ModelLocArg::Sram)]
  model_loc: ModelLocArg,

  /// Optimization objective
  #[arg(short = 'p', long, value_enum, default_value_t = OptimizeArg::Performance)]
  optimize: OptimizeArg,

  /// System config selection
  #[arg(long, default_value = DEFAULT_SYSTEM_CONFIG)]
  system_config: String,

  /// Model arena cache size in bytes
  #[arg(long)]
  arena_cache_size: Option<u64>,

  /// Generation stages to run (default: model)
  #[arg(short, long, value_enum, num_args = 1..)]
  stage: Vec<StageArg>,

  /// Raw input files to embed as test vectors
  #[arg(short, long, num_args = 1.., value_name = "FILE")]
  input: Vec<PathBuf>,

  /// Turns on verbose all for the compiler
  #[arg(short, long)]
  verbose_all: bool,

  /// Turns on verbose cycle estimation
  #[arg(long)]
  verbose_cycle_estimate: bool,
}

#[derive(clap::Args, Debug)]
struct OptimizeArgs {
  /// Path to the model file
  #[arg(short, long, value_name = "FILE")]
  model_file: PathBuf,

  /// Fast tier capacity limit in bytes
  #[arg(long)]
  fast_mem_size: Option<u64>,

  /// Low-power tier capacity limit in bytes
  #[arg(long)]
  lp_mem_size: Option<u64>,

  /// Device configuration file
  #[arg(long, value_name = "FILE")]
  device_config: Option<PathBuf>,

  /// Print metrics as JSON
  #[arg(long)]
  json: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CompilerArg {
  Vela,
  Sdk,
  None,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ModelLocArg {
  Sram,
  Flash,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OptimizeArg {
  Performance,
  Size,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum StageArg {
  Model,
  Inout,
}

fn main() -> ExitCode {
  init_log();

  let args = Args::parse();
  let result = match args.command {
    Command::Compile(compile_args) => run_compile(compile_args),
    Command::Optimize(optimize_args) => run_optimize(optimize_args),
  };

  match result {
    Ok(code) => code,
    Err(e) => {
      eprintln!("error: {}", e);
      ExitCode::FAILURE
    },
  }
}

fn run_compile(args: CompileArgs) -> tuneup::Result<ExitCode> {
  let mut opts = CompileOptions::new(args.model_file);
  opts.output_dir = args.output_dir;
  opts.model_file_out = args.model_file_out;
  opts.compiler = match args.compiler {
    CompilerArg::Vela => Compiler::Vela,
    CompilerArg::Sdk => Compiler::Sdk,
    CompilerArg::None => Compiler::None,
  };
  opts.model_loc = match args.model_loc {
    ModelLocArg::Sram => ModelLoc::Sram,
    ModelLocArg::Flash => ModelLoc::Flash,
  };
  opts.optimize = match args.optimize {
    OptimizeArg::Performance => Optimize::Performance,
    OptimizeArg::Size => Optimize::Size,
  };
  opts.system_config = args.system_config;
  opts.arena_cache_size = args.arena_cache_size;
  opts.verbose_all = args.verbose_all;
  opts.verbose_cycle_estimate = args.verbose_cycle_estimate;
  opts.inputs = args.input;
  if !args.stage.is_empty() {
    opts.stages = args
      .stage
      .iter()
      .map(|stage| match stage {
        StageArg::Model => Stage::Model,
        StageArg::Inout => Stage::Inout,
      })
      .collect();
  }

  compile_model(&opts)?;
  Ok(ExitCode::SUCCESS)
}

fn run_optimize(args: OptimizeArgs) -> tuneup::Result<ExitCode> {
  let mut device = match args.device_config {
    Some(path) => config::load_config_file(&path)?,
    None => DeviceConfig::default(),
  };
  config::apply_cli_overrides(&mut device, args.fast_mem_size, args.lp_mem_size);
  config::validate_config(&device)?;

  let runner = VelaRunner;
  let outcome = Optimizer::new(&runner)
    .with_limits(device.tiers)
    .with_budget(device.budget)
    .search(&args.model_file)?;

  if args.json {
    println!("{}", serde_json::to_string_pretty(&outcome)?);
  } else {
    print_metrics(&outcome);
  }

  Ok(if outcome.fits {
    ExitCode::SUCCESS
  } else {
    ExitCode::FAILURE
  })
}

fn print_metrics(outcome: &SearchOutcome) {
  println!("fits: {}", outcome.fits);
  println!("tier: {}", outcome.tier_name().unwrap_or("none"));
  if let Some(plan) = outcome.plan {
    println!("total_working_set: {}", plan.total_working_set);
    println!("arena_cache_size: {}", plan.arena_cache_size);
  }
  let metrics = &outcome.metrics;
  println!("sram_weights_bytes: {}", metrics.sram_weights_bytes);
  println!("sram_tensor_bytes: {}", metrics.sram_tensor_bytes);
  println!("flash_weights_bytes: {}", metrics.flash_weights_bytes);
  println!("sram_size_limit: {}", metrics.sram_size_limit);
  println!("sram_tensor_size_limit: {}", metrics.sram_tensor_size_limit);
  println!("flash_size_limit: {}", metrics.flash_size_limit);
  println!("core_clock: {}", metrics.core_clock);
  println!("inferences_per_second: {}", metrics.inferences_per_second);
  println!("inference_time: {}", metrics.inference_time);
}

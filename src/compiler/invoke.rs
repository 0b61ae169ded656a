use std::path::PathBuf;
use std::process::Command;

use log::info;

use crate::compiler::options::CompileOptions;
use crate::error::{Error, Result};
use crate::report::{self, Summary};

/// One blocking compiler invocation: run the process, then pick up the
/// summary report it left in the output directory. Implementations other
/// than the real one exist only in tests.
pub trait CompileRunner {
  fn run(&self, opts: &CompileOptions) -> Result<Option<Summary>>;
}

/// Shells out to `vela` on PATH.
pub struct VelaRunner;

impl CompileRunner for VelaRunner {
  fn run(&self, opts: &CompileOptions) -> Result<Option<Summary>> {
    run_vela(opts)?;
    Ok(report::read_summary_file(&summary_file_path(opts)))
  }
}

/// Device characteristics file handed to the external compiler.
pub fn system_config_ini() -> PathBuf {
  PathBuf::from(env!("CARGO_MANIFEST_DIR"))
    .join("src")
    .join("compiler")
    .join("config")
    .join("npu_system_config.ini")
}

/// The compiler names the summary after the input model and the system
/// config it ran with.
pub fn summary_file_path(opts: &CompileOptions) -> PathBuf {
  opts
    .output_dir
    .join(format!("{}_summary_{}.csv", opts.model_stem(), opts.system_config))
}

pub fn vela_args(opts: &CompileOptions) -> Vec<String> {
  let mut args = vec![
    "--output-dir".to_string(),
    opts.output_dir.to_string_lossy().to_string(),
    format!("--accelerator-config={}", opts.accelerator_config),
    format!("--optimise={}", opts.optimize.as_arg()),
    format!("--config={}", system_config_ini().display()),
    opts.model_loc.memory_mode().as_flag().to_string(),
    format!("--system-config={}", opts.system_config),
  ];
  if let Some(size) = opts.arena_cache_size {
    args.push(format!("--arena-cache-size={}", size));
  }
  if opts.verbose_cycle_estimate {
    args.push("--verbose-cycle-estimate".to_string());
  }
  if opts.verbose_all {
    args.push("--verbose-all".to_string());
  }
  args.push(opts.model_file.to_string_lossy().to_string());
  args
}

pub fn run_vela(opts: &CompileOptions) -> Result<()> {
  run_command("vela", &vela_args(opts))
}

/// The vendor toolchain takes only an output directory and the model.
pub fn run_sdk(opts: &CompileOptions) -> Result<()> {
  let args = vec![
    "--output-dir".to_string(),
    opts.output_dir.to_string_lossy().to_string(),
    opts.model_file.to_string_lossy().to_string(),
  ];
  run_command("npu-sdk", &args)
}

fn run_command(program: &str, args: &[String]) -> Result<()> {
  info!("Launching compiler process...");
  info!("Compiler binary: {}", program);
  info!("Args: {:?}", args);

  let status = Command::new(program).args(args).status()?;
  if !status.success() {
    return Err(Error::Invocation {
      command: program.to_string(),
      status,
    });
  }
  Ok(())
}

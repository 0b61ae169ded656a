pub mod invoke;
pub mod options;

pub use invoke::{summary_file_path, system_config_ini, CompileRunner, VelaRunner};
pub use options::{
  CompileOptions, Compiler, MemoryMode, ModelLoc, Optimize, Stage, DEFAULT_ACCELERATOR_CONFIG,
  DEFAULT_SYSTEM_CONFIG,
};

use std::fs;
use std::path::PathBuf;

use log::info;

use crate::codegen;
use crate::error::Result;
use crate::report::{self, Summary};

#[derive(Debug)]
pub struct CompileOutcome {
  /// Parsed performance summary, when the compiler produced one.
  pub summary: Option<Summary>,
  pub compiled_model: PathBuf,
}

/// Full conversion pipeline: run the chosen compiler, pick up its summary
/// report, then run the requested generation stages against the compiled
/// model.
pub fn compile_model(opts: &CompileOptions) -> Result<CompileOutcome> {
  fs::create_dir_all(&opts.output_dir)?;
  info!("memory mode {}", opts.model_loc.memory_mode().as_flag());

  let summary = match opts.compiler {
    Compiler::Vela => {
      invoke::run_vela(opts)?;
      report::read_summary_file(&summary_file_path(opts))
    },
    Compiler::Sdk => {
      invoke::run_sdk(opts)?;
      None
    },
    Compiler::None => {
      info!("no compilation requested");
      None
    },
  };

  let compiled_model = opts.compiled_model_path();

  for stage in &opts.stages {
    match stage {
      Stage::Model => {
        let data = fs::read(&compiled_model)?;
        let ops = codegen::read_operator_codes(&compiled_model, &data)?;
        let generated = codegen::write_model_source(&data, &ops, opts)?;
        info!(
          "++ Converting {} to {}",
          compiled_model.display(),
          generated.display()
        );
      },
      Stage::Inout => {
        let original = fs::read(&opts.model_file)?;
        let ops = codegen::read_operator_codes(&opts.model_file, &original)?;
        match codegen::find_custom_op(&ops) {
          Some(name) => {
            info!(
              "{} custom op found in the model, skipping test data generation",
              name
            );
          },
          None => {
            codegen::write_input_data(opts)?;
          },
        }
      },
    }
  }

  Ok(CompileOutcome {
    summary,
    compiled_model,
  })
}

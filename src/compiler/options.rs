use std::path::PathBuf;

/// System config handed to the external compiler when the caller does not
/// pick one. The tiering search overrides this per placement.
pub const DEFAULT_SYSTEM_CONFIG: &str = "npu_400MHz_default";

pub const DEFAULT_ACCELERATOR_CONFIG: &str = "ethos-u55-128";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compiler {
  Vela,
  Sdk,
  None,
}

/// Where the firmware keeps the model: resident in SRAM or executed out of
/// external flash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelLoc {
  Sram,
  Flash,
}

impl ModelLoc {
  pub fn memory_mode(&self) -> MemoryMode {
    match self {
      ModelLoc::Sram => MemoryMode::SramOnly,
      ModelLoc::Flash => MemoryMode::SharedSram,
    }
  }

  /// Placement attribute macro stamped on the generated byte array.
  pub fn attribute(&self) -> &'static str {
    match self {
      ModelLoc::Sram => "MODEL_TFLITE_ATTRIBUTE",
      ModelLoc::Flash => "MODEL_TFLITE_ATTRIBUTE_FLASH",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryMode {
  SramOnly,
  SharedSram,
}

impl MemoryMode {
  pub fn as_flag(&self) -> &'static str {
    match self {
      MemoryMode::SramOnly => "--memory-mode=Sram_Only",
      MemoryMode::SharedSram => "--memory-mode=Shared_Sram",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Optimize {
  Performance,
  Size,
}

impl Optimize {
  pub fn as_arg(&self) -> &'static str {
    match self {
      Optimize::Performance => "Performance",
      Optimize::Size => "Size",
    }
  }
}

/// Source generation stages run after compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
  Model,
  Inout,
}

/// One compiler invocation, fully spelled out. Construct with `new` and
/// override fields as needed; every default is a named field here rather
/// than scattered through call sites.
#[derive(Debug, Clone)]
pub struct CompileOptions {
  pub model_file: PathBuf,
  pub output_dir: PathBuf,
  /// Base name for generated source files.
  pub model_file_out: String,
  pub compiler: Compiler,
  pub model_loc: ModelLoc,
  pub optimize: Optimize,
  pub system_config: String,
  pub accelerator_config: String,
  /// Arena cache size override in bytes.
  pub arena_cache_size: Option<u64>,
  pub verbose_all: bool,
  pub verbose_cycle_estimate: bool,
  pub stages: Vec<Stage>,
  /// Raw input files embedded by the inout stage.
  pub inputs: Vec<PathBuf>,
}

impl CompileOptions {
  pub fn new(model_file: impl Into<PathBuf>) -> Self {
    Self {
      model_file: model_file.into(),
      output_dir: PathBuf::from("."),
      model_file_out: "model".to_string(),
      compiler: Compiler::Vela,
      model_loc: ModelLoc::Sram,
      optimize: Optimize::Performance,
      system_config: DEFAULT_SYSTEM_CONFIG.to_string(),
      accelerator_config: DEFAULT_ACCELERATOR_CONFIG.to_string(),
      arena_cache_size: None,
      verbose_all: false,
      verbose_cycle_estimate: false,
      stages: vec![Stage::Model],
      inputs: Vec::new(),
    }
  }

  pub fn model_stem(&self) -> String {
    self
      .model_file
      .file_stem()
      .map(|stem| stem.to_string_lossy().to_string())
      .unwrap_or_default()
  }

  /// Where the compiled model lands. With no compiler involved the
  /// original file is already the deliverable.
  pub fn compiled_model_path(&self) -> PathBuf {
    match self.compiler {
      Compiler::Vela => self
        .output_dir
        .join(format!("{}_vela.tflite", self.model_stem())),
      Compiler::Sdk => self
        .output_dir
        .join(format!("{}_sdk.tflite", self.model_stem())),
      Compiler::None => self.model_file.clone(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_match_the_documented_surface() {
    let opts = CompileOptions::new("person_classification_256x448.tflite");
    assert_eq!(opts.output_dir, PathBuf::from("."));
    assert_eq!(opts.model_file_out, "model");
    assert_eq!(opts.compiler, Compiler::Vela);
    assert_eq!(opts.model_loc, ModelLoc::Sram);
    assert_eq!(opts.optimize, Optimize::Performance);
    assert_eq!(opts.system_config, DEFAULT_SYSTEM_CONFIG);
    assert_eq!(opts.arena_cache_size, None);
    assert_eq!(opts.stages, vec![Stage::Model]);
  }

  #[test]
  fn model_loc_drives_memory_mode() {
    assert_eq!(
      ModelLoc::Sram.memory_mode().as_flag(),
      "--memory-mode=Sram_Only"
    );
    assert_eq!(
      ModelLoc::Flash.memory_mode().as_flag(),
      "--memory-mode=Shared_Sram"
    );
  }

  #[test]
  fn compiled_model_is_named_after_the_compiler() {
    let mut opts = CompileOptions::new("/models/pose.tflite");
    opts.output_dir = PathBuf::from("/out");
    assert_eq!(
      opts.compiled_model_path(),
      PathBuf::from("/out/pose_vela.tflite")
    );
    opts.compiler = Compiler::Sdk;
    assert_eq!(
      opts.compiled_model_path(),
      PathBuf::from("/out/pose_sdk.tflite")
    );
    opts.compiler = Compiler::None;
    assert_eq!(opts.compiled_model_path(), PathBuf::from("/models/pose.tflite"));
  }
}

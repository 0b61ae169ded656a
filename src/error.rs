use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Fatal pipeline errors. A missing summary report and a blown budget are
/// not errors: the first is `Option::None`, the second a `fits = false`
/// verdict.
#[derive(Debug, Error)]
pub enum Error {
  /// External compiler process exited non-zero. Deterministic for a given
  /// model and config, so never retried.
  #[error("compiler process `{command}` exited with {status}")]
  Invocation {
    command: String,
    status: std::process::ExitStatus,
  },

  #[error("summary report field `{field}` is missing")]
  MissingField { field: &'static str },

  #[error("summary report field `{field}` is not numeric: `{value}`")]
  MalformedField { field: &'static str, value: String },

  #[error("model file `{path}` is not a valid model flatbuffer: {reason}")]
  InvalidModel { path: PathBuf, reason: String },

  #[error("unknown builtin operator code {code} in `{path}`")]
  UnknownOperator { code: i32, path: PathBuf },

  #[error("invalid configuration: {0}")]
  Config(String),

  #[error(transparent)]
  Json(#[from] serde_json::Error),

  #[error(transparent)]
  Io(#[from] std::io::Error),
}

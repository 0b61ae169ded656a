pub mod inout;
pub mod model_src;
pub mod resolver;
pub mod tflite;

pub use inout::write_input_data;
pub use model_src::{render_byte_array, write_model_source};
pub use resolver::render_resolver;
pub use tflite::{find_custom_op, read_operator_codes, OpCode};

use std::path::Path;

/// Banner stamped at the top of every generated source file.
fn banner(source: &Path) -> String {
  let now = chrono::Local::now();
  format!(
    "// Generated by tuneup from {}\n// Date: {}\n// Do not edit by hand.\n",
    file_name(source),
    now.format("%Y-%m-%d %H:%M:%S"),
  )
}

fn file_name(path: &Path) -> String {
  path
    .file_name()
    .map(|name| name.to_string_lossy().to_string())
    .unwrap_or_default()
}

use std::fs;
use std::path::PathBuf;

use log::info;

use crate::codegen::model_src::render_byte_array;
use crate::codegen::{banner, file_name};
use crate::compiler::options::CompileOptions;
use crate::error::Result;

/// Embeds the caller-supplied raw input files as test vectors. Capturing
/// expected outputs would need an interpreter runtime executing the model,
/// which lives outside this pipeline.
pub fn write_input_data(opts: &CompileOptions) -> Result<Option<PathBuf>> {
  if opts.inputs.is_empty() {
    info!("no input files supplied, skipping test data generation");
    return Ok(None);
  }

  let namespace = &opts.model_file_out;
  let mut text = banner(&opts.model_file);
  text.push_str("\n#include <cstdint>\n\n");
  text.push_str(&format!("namespace {} {{\nnamespace test_data {{\n\n", namespace));
  text.push_str(&format!("constexpr int kNumberInputs = {};\n\n", opts.inputs.len()));

  for (index, input) in opts.inputs.iter().enumerate() {
    let data = fs::read(input)?;
    text.push_str(&format!("// {}\n", file_name(input)));
    text.push_str(&format!(
      "const uint8_t input{}[] = {}",
      index,
      render_byte_array(&data)
    ));
    text.push_str(&format!("const uint32_t input{}_len = {};\n\n", index, data.len()));
  }

  text.push_str(&format!("}}  // namespace test_data\n}}  // namespace {}\n", namespace));

  let path = opts.output_dir.join(format!("{}_test_data.cc", namespace));
  fs::write(&path, text)?;
  Ok(Some(path))
}

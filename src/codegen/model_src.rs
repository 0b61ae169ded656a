use std::fs;
use std::path::PathBuf;

use crate::codegen::banner;
use crate::codegen::resolver::render_resolver;
use crate::codegen::tflite::OpCode;
use crate::compiler::options::CompileOptions;
use crate::error::Result;

/// Hex rendering of the model bytes, 32 per line.
pub fn render_byte_array(data: &[u8]) -> String {
  let mut out = String::from("{\n");
  for chunk in data.chunks(32) {
    let line: Vec<String> = chunk.iter().map(|byte| format!("0x{:02x}", byte)).collect();
    out.push_str(&line.join(", "));
    out.push_str(",\n");
  }
  out.push_str("};\n");
  out
}

/// Writes the model embedding: the byte array under the placement
/// attribute, the length constant, and the kernel resolver for exactly the
/// operators the model uses.
pub fn write_model_source(data: &[u8], ops: &[OpCode], opts: &CompileOptions) -> Result<PathBuf> {
  let namespace = &opts.model_file_out;
  let resolver = render_resolver(namespace, &opts.model_file, ops)?;

  let mut text = banner(&opts.model_file);
  text.push_str("\n#include <cstdint>\n\n");
  text.push_str("#ifndef MODEL_TFLITE_ATTRIBUTE\n#define MODEL_TFLITE_ATTRIBUTE\n#endif\n");
  text.push_str(
    "#ifndef MODEL_TFLITE_ATTRIBUTE_FLASH\n#define MODEL_TFLITE_ATTRIBUTE_FLASH\n#endif\n\n",
  );
  text.push_str(&format!("namespace {} {{\n\n", namespace));
  text.push_str(&format!(
    "alignas(16) const uint8_t model_data[] {} = {}",
    opts.model_loc.attribute(),
    render_byte_array(data)
  ));
  text.push_str(&format!("\nconst uint32_t model_data_len = {};\n\n", data.len()));
  text.push_str(&format!("}}  // namespace {}\n\n", namespace));
  text.push_str(&resolver);

  let path = opts.output_dir.join(format!("{}.cc", namespace));
  fs::write(&path, text)?;
  Ok(path)
}

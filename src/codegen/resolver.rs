use std::path::Path;

use crate::codegen::tflite::OpCode;
use crate::error::{Error, Result};

/// Builtin operator code to kernel registration call. Covers the operator
/// set the embedded runtime ships kernels for; anything else is a fatal
/// error rather than a silently unresolvable firmware link.
const BUILTIN_OPS: &[(i32, &str)] = &[
  (0, "AddAdd"),
  (1, "AddAveragePool2D"),
  (2, "AddConcatenation"),
  (3, "AddConv2D"),
  (4, "AddDepthwiseConv2D"),
  (5, "AddDepthToSpace"),
  (6, "AddDequantize"),
  (8, "AddFloor"),
  (9, "AddFullyConnected"),
  (11, "AddL2Normalization"),
  (12, "AddL2Pool2D"),
  (14, "AddLogistic"),
  (17, "AddMaxPool2D"),
  (18, "AddMul"),
  (19, "AddRelu"),
  (21, "AddRelu6"),
  (22, "AddReshape"),
  (23, "AddResizeBilinear"),
  (25, "AddSoftmax"),
  (26, "AddSpaceToDepth"),
  (27, "AddSvdf"),
  (28, "AddTanh"),
  (34, "AddPad"),
  (36, "AddGather"),
  (37, "AddBatchToSpaceNd"),
  (38, "AddSpaceToBatchNd"),
  (39, "AddTranspose"),
  (40, "AddMean"),
  (41, "AddSub"),
  (42, "AddDiv"),
  (43, "AddSqueeze"),
  (45, "AddStridedSlice"),
  (47, "AddExp"),
  (49, "AddSplit"),
  (50, "AddLogSoftmax"),
  (53, "AddCast"),
  (54, "AddPrelu"),
  (55, "AddMaximum"),
  (56, "AddArgMax"),
  (57, "AddMinimum"),
  (58, "AddLess"),
  (59, "AddNeg"),
  (60, "AddPadV2"),
  (61, "AddGreater"),
  (62, "AddGreaterEqual"),
  (63, "AddLessEqual"),
  (65, "AddSlice"),
  (66, "AddSin"),
  (67, "AddTransposeConv"),
  (70, "AddExpandDims"),
  (71, "AddEqual"),
  (72, "AddNotEqual"),
  (73, "AddLog"),
  (74, "AddSum"),
  (75, "AddSqrt"),
  (76, "AddRsqrt"),
  (77, "AddShape"),
  (79, "AddArgMin"),
  (82, "AddReduceMax"),
  (83, "AddPack"),
  (84, "AddLogicalOr"),
  (86, "AddLogicalAnd"),
  (87, "AddLogicalNot"),
  (88, "AddUnpack"),
  (90, "AddFloorDiv"),
  (92, "AddSquare"),
  (94, "AddFill"),
  (95, "AddFloorMod"),
  (97, "AddResizeNearestNeighbor"),
  (98, "AddLeakyRelu"),
  (99, "AddSquaredDifference"),
  (100, "AddMirrorPad"),
  (101, "AddAbs"),
  (102, "AddSplitV"),
  (104, "AddCeil"),
  (106, "AddAddN"),
  (107, "AddGatherNd"),
  (108, "AddCos"),
  (114, "AddQuantize"),
  (116, "AddRound"),
  (117, "AddHardSwish"),
  (118, "AddIf"),
  (119, "AddWhile"),
  (123, "AddSelectV2"),
  (126, "AddBatchMatMul"),
];

fn builtin_add_fn(code: i32) -> Option<&'static str> {
  BUILTIN_OPS
    .iter()
    .find(|(candidate, _)| *candidate == code)
    .map(|(_, add_fn)| *add_fn)
}

/// Custom operators register under a camelized form of their name, so
/// "ethos-u" becomes AddEthosU.
fn custom_add_fn(name: &str) -> String {
  let mut out = String::from("Add");
  for chunk in name.split(|c: char| !c.is_ascii_alphanumeric()) {
    let mut chars = chunk.chars();
    if let Some(first) = chars.next() {
      out.push(first.to_ascii_uppercase());
      out.extend(chars);
    }
  }
  out
}

/// Renders the resolver source registering exactly the kernels the model
/// needs, sized to the operator count.
pub fn render_resolver(namespace: &str, model_path: &Path, ops: &[OpCode]) -> Result<String> {
  let mut calls = Vec::with_capacity(ops.len());
  for op in ops {
    match op {
      OpCode::Builtin(code) => match builtin_add_fn(*code) {
        Some(add_fn) => calls.push(add_fn.to_string()),
        None => {
          return Err(Error::UnknownOperator {
            code: *code,
            path: model_path.to_path_buf(),
          });
        },
      },
      OpCode::Custom(name) => calls.push(custom_add_fn(name)),
    }
  }

  let mut text = String::new();
  text.push_str("#include \"tensorflow/lite/micro/micro_mutable_op_resolver.h\"\n\n");
  text.push_str(&format!("namespace {} {{\n\n", namespace));
  text.push_str(&format!("constexpr int kNumberOperators = {};\n\n", calls.len()));
  text.push_str("inline tflite::MicroMutableOpResolver<kNumberOperators> GetOpResolver() {\n");
  text.push_str("  tflite::MicroMutableOpResolver<kNumberOperators> resolver;\n");
  for call in &calls {
    text.push_str(&format!("  resolver.{}();\n", call));
  }
  text.push_str("  return resolver;\n");
  text.push_str("}\n\n");
  text.push_str(&format!("}}  // namespace {}\n", namespace));
  Ok(text)
}

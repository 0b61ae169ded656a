//! Minimal reader for the model flatbuffer: just enough to list the
//! operator codes, which drive resolver generation and custom-op
//! detection. Everything else in the model stays opaque bytes.

use std::path::Path;

use crate::error::{Error, Result};

/// Builtin code the model schema reserves for custom operators.
const BUILTIN_CUSTOM: i32 = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpCode {
  Builtin(i32),
  Custom(String),
}

pub fn read_operator_codes(path: &Path, data: &[u8]) -> Result<Vec<OpCode>> {
  walk(data).map_err(|reason| Error::InvalidModel {
    path: path.to_path_buf(),
    reason,
  })
}

/// First custom operator in the model, if any. Custom kernels only exist on
/// the device, so their presence rules out reference-interpreter stages.
pub fn find_custom_op(ops: &[OpCode]) -> Option<&str> {
  ops.iter().find_map(|op| match op {
    OpCode::Custom(name) => Some(name.as_str()),
    OpCode::Builtin(_) => None,
  })
}

fn walk(data: &[u8]) -> std::result::Result<Vec<OpCode>, String> {
  if data.len() < 8 {
    return Err("shorter than a flatbuffer header".to_string());
  }
  if &data[4..8] != b"TFL3" {
    return Err("missing TFL3 file identifier".to_string());
  }

  let root = u32_at(data, 0)? as usize;
  let model = Table::at(data, root)?;

  // Model field 1 is the operator_codes vector.
  let vec_pos = match model.offset_field(data, 1)? {
    Some(pos) => pos,
    None => return Ok(Vec::new()),
  };
  let count = u32_at(data, vec_pos)? as usize;

  let mut ops = Vec::with_capacity(count);
  for index in 0..count {
    let elem = vec_pos + 4 + 4 * index;
    let rel = u32_at(data, elem)? as usize;
    let table = Table::at(data, elem + rel)?;
    ops.push(read_opcode(data, &table)?);
  }
  Ok(ops)
}

fn read_opcode(data: &[u8], table: &Table) -> std::result::Result<OpCode, String> {
  // Field 0 is the original single-byte code, field 3 its widened
  // replacement. Codes past the old range only exist in field 3, so the
  // larger of the two is the real code.
  let deprecated = match table.field(data, 0)? {
    Some(pos) => i8_at(data, pos)? as i32,
    None => 0,
  };
  let builtin = match table.field(data, 3)? {
    Some(pos) => i32_at(data, pos)?,
    None => 0,
  };
  let code = deprecated.max(builtin);

  if code == BUILTIN_CUSTOM {
    match table.offset_field(data, 1)? {
      Some(pos) => Ok(OpCode::Custom(string_at(data, pos)?)),
      None => Err("custom operator without a custom_code string".to_string()),
    }
  } else {
    Ok(OpCode::Builtin(code))
  }
}

struct Table {
  pos: usize,
  vtable: usize,
  vtable_size: usize,
}

impl Table {
  fn at(data: &[u8], pos: usize) -> std::result::Result<Self, String> {
    let soffset = i32_at(data, pos)?;
    let vtable = pos as i64 - soffset as i64;
    if vtable < 0 || vtable as usize + 4 > data.len() {
      return Err(format!("table at {} points to an out-of-range vtable", pos));
    }
    let vtable = vtable as usize;
    let vtable_size = u16_at(data, vtable)? as usize;
    if vtable_size < 4 {
      return Err(format!("vtable at {} is too small", vtable));
    }
    Ok(Self {
      pos,
      vtable,
      vtable_size,
    })
  }

  /// Byte position of field `id`, `None` when the field holds its default.
  fn field(&self, data: &[u8], id: usize) -> std::result::Result<Option<usize>, String> {
    let slot = 4 + 2 * id;
    if slot + 2 > self.vtable_size {
      return Ok(None);
    }
    let off = u16_at(data, self.vtable + slot)? as usize;
    if off == 0 {
      return Ok(None);
    }
    Ok(Some(self.pos + off))
  }

  /// Follows an offset-typed field (string, vector, table) to its target.
  fn offset_field(&self, data: &[u8], id: usize) -> std::result::Result<Option<usize>, String> {
    match self.field(data, id)? {
      None => Ok(None),
      Some(pos) => {
        let rel = u32_at(data, pos)? as usize;
        Ok(Some(pos + rel))
      },
    }
  }
}

fn bytes_at<const N: usize>(data: &[u8], pos: usize) -> std::result::Result<[u8; N], String> {
  data
    .get(pos..pos + N)
    .and_then(|slice| slice.try_into().ok())
    .ok_or_else(|| format!("read of {} bytes at {} past end of buffer", N, pos))
}

fn u16_at(data: &[u8], pos: usize) -> std::result::Result<u16, String> {
  Ok(u16::from_le_bytes(bytes_at(data, pos)?))
}

fn u32_at(data: &[u8], pos: usize) -> std::result::Result<u32, String> {
  Ok(u32::from_le_bytes(bytes_at(data, pos)?))
}

fn i32_at(data: &[u8], pos: usize) -> std::result::Result<i32, String> {
  Ok(i32::from_le_bytes(bytes_at(data, pos)?))
}

fn i8_at(data: &[u8], pos: usize) -> std::result::Result<i8, String> {
  Ok(bytes_at::<1>(data, pos)?[0] as i8)
}

fn string_at(data: &[u8], pos: usize) -> std::result::Result<String, String> {
  let len = u32_at(data, pos)? as usize;
  let bytes = data
    .get(pos + 4..pos + 4 + len)
    .ok_or_else(|| format!("string at {} past end of buffer", pos))?;
  String::from_utf8(bytes.to_vec()).map_err(|_| format!("string at {} is not UTF-8", pos))
}

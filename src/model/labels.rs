// 该文件是 Huoyan （火眼） 项目的一部分。
// src/model/labels.rs - 类别名称表
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::{collections::BTreeMap, path::Path};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LabelError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("类别表格式错误 (位置 {pos}): {msg}")]
  Syntax { pos: usize, msg: String },
}

impl LabelError {
  fn syntax(pos: usize, msg: &str) -> Self {
    LabelError::Syntax {
      pos,
      msg: msg.to_string(),
    }
  }
}

/// 类别编号到类别名称的映射
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelMap(BTreeMap<u32, String>);

impl LabelMap {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, id: u32, name: impl Into<String>) {
    self.0.insert(id, name.into());
  }

  pub fn get(&self, id: u32) -> Option<&str> {
    self.0.get(&id).map(String::as_str)
  }

  /// 查不到时退化为 `class<ID>`
  pub fn name(&self, id: u32) -> String {
    self
      .get(id)
      .map(str::to_string)
      .unwrap_or_else(|| format!("class{}", id))
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
    self.0.iter().map(|(id, name)| (*id, name.as_str()))
  }
}

impl<S: Into<String>> FromIterator<(u32, S)> for LabelMap {
  fn from_iter<I: IntoIterator<Item = (u32, S)>>(iter: I) -> Self {
    Self(iter.into_iter().map(|(id, name)| (id, name.into())).collect())
  }
}

/// 读取类别文件，每行一个名称，行号即类别编号；空行保留编号但不登记名称
pub fn read_label_file(path: impl AsRef<Path>) -> Result<LabelMap, LabelError> {
  let content = std::fs::read_to_string(path)?;
  Ok(
    content
      .lines()
      .enumerate()
      .filter_map(|(id, line)| {
        let name = line.trim();
        (!name.is_empty()).then(|| (id as u32, name.to_string()))
      })
      .collect(),
  )
}

/// 解析导出模型元数据中的 `names` 字段
///
/// 支持 Python 字典字面量 `{0: 'fire', 1: 'smoke'}` 与 JSON 对象 `{"0": "fire"}` 两种写法。
pub fn parse_names_metadata(text: &str) -> Result<LabelMap, LabelError> {
  let mut cursor = Cursor::new(text);
  let mut map = LabelMap::new();

  cursor.skip_ws();
  cursor.expect('{')?;
  loop {
    cursor.skip_ws();
    if cursor.eat('}') {
      break;
    }

    let id = cursor.key()?;
    cursor.skip_ws();
    cursor.expect(':')?;
    cursor.skip_ws();
    let name = cursor.quoted()?;
    map.insert(id, name);

    cursor.skip_ws();
    if cursor.eat(',') {
      continue;
    }
    cursor.expect('}')?;
    break;
  }

  cursor.skip_ws();
  if !cursor.is_done() {
    return Err(LabelError::syntax(cursor.pos, "字典之后存在多余内容"));
  }
  Ok(map)
}

struct Cursor<'a> {
  chars: std::iter::Peekable<std::str::CharIndices<'a>>,
  pos: usize,
}

impl<'a> Cursor<'a> {
  fn new(text: &'a str) -> Self {
    Self {
      chars: text.char_indices().peekable(),
      pos: 0,
    }
  }

  fn peek(&mut self) -> Option<char> {
    self.chars.peek().map(|&(_, c)| c)
  }

  fn bump(&mut self) -> Option<char> {
    let (pos, c) = self.chars.next()?;
    self.pos = pos + c.len_utf8();
    Some(c)
  }

  fn is_done(&mut self) -> bool {
    self.peek().is_none()
  }

  fn skip_ws(&mut self) {
    while self.peek().is_some_and(char::is_whitespace) {
      self.bump();
    }
  }

  fn eat(&mut self, expected: char) -> bool {
    if self.peek() == Some(expected) {
      self.bump();
      true
    } else {
      false
    }
  }

  fn expect(&mut self, expected: char) -> Result<(), LabelError> {
    if self.eat(expected) {
      Ok(())
    } else {
      Err(LabelError::syntax(self.pos, &format!("期望 '{}'", expected)))
    }
  }

  fn key(&mut self) -> Result<u32, LabelError> {
    let digits = match self.peek() {
      Some('\'') | Some('"') => self.quoted()?,
      _ => {
        let mut digits = String::new();
        while let Some(c) = self.peek().filter(char::is_ascii_digit) {
          digits.push(c);
          self.bump();
        }
        digits
      }
    };
    digits
      .trim()
      .parse()
      .map_err(|_| LabelError::syntax(self.pos, "类别编号不是非负整数"))
  }

  fn quoted(&mut self) -> Result<String, LabelError> {
    let quote = match self.bump() {
      Some(c @ ('\'' | '"')) => c,
      _ => return Err(LabelError::syntax(self.pos, "期望引号")),
    };
    let mut value = String::new();
    loop {
      match self.bump() {
        Some('\\') => match self.bump() {
          Some(c) => value.push(c),
          None => break,
        },
        Some(c) if c == quote => return Ok(value),
        Some(c) => value.push(c),
        None => break,
      }
    }
    Err(LabelError::syntax(self.pos, "字符串未闭合"))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;
  use tempfile::NamedTempFile;

  #[test]
  fn test_parse_python_dict() {
    let map = parse_names_metadata("{0: 'fire', 1: 'smoke'}").unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(map.get(0), Some("fire"));
    assert_eq!(map.get(1), Some("smoke"));
  }

  #[test]
  fn test_parse_json_object() {
    let map = parse_names_metadata(r#"{"0": "fire", "7": "traffic light"}"#).unwrap();
    assert_eq!(map.get(0), Some("fire"));
    assert_eq!(map.get(7), Some("traffic light"));
    assert_eq!(map.get(1), None);
  }

  #[test]
  fn test_parse_escaped_quote_and_trailing_comma() {
    let map = parse_names_metadata("{0: 'people\\'s', 1: \"it's\",}").unwrap();
    assert_eq!(map.get(0), Some("people's"));
    assert_eq!(map.get(1), Some("it's"));
  }

  #[test]
  fn test_parse_empty_dict() {
    assert!(parse_names_metadata(" {} ").unwrap().is_empty());
  }

  #[test]
  fn test_parse_rejects_malformed() {
    assert!(parse_names_metadata("[0, 1]").is_err());
    assert!(parse_names_metadata("{0: fire}").is_err());
    assert!(parse_names_metadata("{0: 'fire'").is_err());
    assert!(parse_names_metadata("{-1: 'fire'}").is_err());
    assert!(parse_names_metadata("{0: 'fire'} extra").is_err());
  }

  #[test]
  fn test_name_fallback() {
    let map: LabelMap = [(0u32, "fire")].into_iter().collect();
    assert_eq!(map.name(0), "fire");
    assert_eq!(map.name(3), "class3");
  }

  #[test]
  fn test_read_label_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "fire").unwrap();
    writeln!(file).unwrap();
    writeln!(file, " smoke ").unwrap();

    let map = read_label_file(file.path()).unwrap();
    assert_eq!(map.get(0), Some("fire"));
    assert_eq!(map.get(1), None);
    assert_eq!(map.get(2), Some("smoke"));
  }

  #[test]
  fn test_read_nonexistent_label_file() {
    assert!(read_label_file("/nonexistent/path/labels.txt").is_err());
  }
}

// 该文件是 Huoyan （火眼） 项目的一部分。
// src/annotate/report.rs - 检测结果表格
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

use std::fmt;

use crate::{annotate::DerivedPoints, model::Detection};

pub const REPORT_TITLE: &str = "Detection results:";
pub const REPORT_HEADER: &str = "Class\tConfidence\tCenter X\tCenter Y\tBottom X\tBottom Y";

/// 结果表格中的一行
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
  pub class_name: String,
  pub confidence: f32,
  pub center_x: f32,
  pub center_y: f32,
  pub bottom_x: f32,
  pub bottom_y: f32,
}

impl ReportRow {
  pub fn new(detection: &Detection, points: &DerivedPoints) -> Self {
    Self {
      class_name: detection.class_name.clone(),
      confidence: detection.confidence,
      center_x: points.center.0,
      center_y: points.center.1,
      bottom_x: points.bottom.0,
      bottom_y: points.bottom.1,
    }
  }

  pub fn from_detection(detection: &Detection) -> Self {
    Self::new(detection, &DerivedPoints::from_bbox(&detection.bbox))
  }
}

impl fmt::Display for ReportRow {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{}\t{:.2}\t{:.1}\t{:.1}\t{:.1}\t{:.1}",
      self.class_name, self.confidence, self.center_x, self.center_y, self.bottom_x, self.bottom_y
    )
  }
}

/// 标题、表头与各行组成的完整表格
#[derive(Debug, Clone, Copy)]
pub struct Report<'a> {
  rows: &'a [ReportRow],
}

impl<'a> Report<'a> {
  pub fn new(rows: &'a [ReportRow]) -> Self {
    Self { rows }
  }

  pub fn rows(&self) -> &'a [ReportRow] {
    self.rows
  }
}

impl fmt::Display for Report<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "{}", REPORT_TITLE)?;
    writeln!(f, "{}", REPORT_HEADER)?;
    for row in self.rows {
      writeln!(f, "{}", row)?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_row_format() {
    let detection = Detection::new([10.0, 20.0, 50.0, 80.0], 0.87, 0, "fire");
    let row = ReportRow::from_detection(&detection);
    assert_eq!(row.to_string(), "fire\t0.87\t30.0\t50.0\t30.0\t80.0");
  }

  #[test]
  fn test_row_precision() {
    let detection = Detection::new([0.0, 0.0, 3.0, 5.4], 0.456, 1, "smoke");
    assert_eq!(
      ReportRow::from_detection(&detection).to_string(),
      "smoke\t0.46\t1.5\t2.7\t1.5\t5.4"
    );
  }

  #[test]
  fn test_empty_report_is_header_only() {
    let report = Report::new(&[]);
    assert_eq!(
      report.to_string(),
      "Detection results:\nClass\tConfidence\tCenter X\tCenter Y\tBottom X\tBottom Y\n"
    );
  }

  #[test]
  fn test_report_keeps_row_order() {
    let rows = vec![
      ReportRow::from_detection(&Detection::new([0.0, 0.0, 2.0, 2.0], 0.3, 1, "smoke")),
      ReportRow::from_detection(&Detection::new([0.0, 0.0, 4.0, 4.0], 0.9, 0, "fire")),
    ];
    let text = Report::new(&rows).to_string();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[2].starts_with("smoke\t0.30"));
    assert!(lines[3].starts_with("fire\t0.90"));
  }
}

// 该文件是 Huoyan （火眼） 项目的一部分。
// tests/annotate.rs - 标注结果测试
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

use huoyan::{
  annotate::{Annotator, DerivedPoints, REPORT_HEADER, REPORT_TITLE},
  model::Detection,
};
use image::{Rgb, RgbImage};

fn background() -> RgbImage {
  RgbImage::from_fn(80, 60, |x, y| Rgb([(x * 3) as u8, (y * 4) as u8, 90]))
}

#[test]
fn test_fire_example() {
  let detection = Detection::new([10.0, 20.0, 50.0, 80.0], 0.87, 0, "fire");
  let points = DerivedPoints::from_bbox(&detection.bbox);
  assert_eq!(points.center, (30.0, 50.0));
  assert_eq!(points.bottom, (30.0, 80.0));

  let annotation = Annotator::default().annotate(&RgbImage::new(100, 100), &[detection]);
  assert_eq!(annotation.rows.len(), 1);
  assert_eq!(
    annotation.rows[0].to_string(),
    "fire\t0.87\t30.0\t50.0\t30.0\t80.0"
  );
}

#[test]
fn test_annotate_is_deterministic() {
  let image = background();
  let detections = [
    Detection::new([5.0, 20.0, 40.0, 55.0], 0.7, 0, "fire"),
    Detection::new([30.0, 25.0, 78.0, 58.0], 0.3, 1, "smoke"),
  ];
  let annotator = Annotator::default();

  let first = annotator.annotate(&image, &detections);
  let second = annotator.annotate(&image, &detections);

  assert_eq!(first.image.as_raw(), second.image.as_raw());
  assert_eq!(first.rows, second.rows);
}

#[test]
fn test_input_image_untouched() {
  let image = background();
  let snapshot = image.clone();
  let detections = [Detection::new([0.0, 0.0, 80.0, 60.0], 0.99, 0, "fire")];

  let annotation = Annotator::default().annotate(&image, &detections);

  assert_eq!(image.as_raw(), snapshot.as_raw());
  assert_ne!(annotation.image.as_raw(), image.as_raw());
}

#[test]
fn test_rows_follow_input_order() {
  let detections = [
    Detection::new([0.0, 0.0, 10.0, 10.0], 0.2, 1, "smoke"),
    Detection::new([20.0, 20.0, 30.0, 30.0], 0.9, 0, "fire"),
    Detection::new([40.0, 10.0, 60.0, 50.0], 0.5, 0, "fire"),
  ];
  let annotation = Annotator::default().annotate(&background(), &detections);

  let confidences: Vec<f32> = annotation.rows.iter().map(|row| row.confidence).collect();
  assert_eq!(confidences, vec![0.2, 0.9, 0.5]);
  assert_eq!(annotation.rows[0].class_name, "smoke");
}

#[test]
fn test_empty_detections() {
  let image = background();
  let annotation = Annotator::default().annotate(&image, &[]);

  assert_eq!(annotation.image.as_raw(), image.as_raw());
  assert_eq!(
    annotation.report().to_string(),
    format!("{}\n{}\n", REPORT_TITLE, REPORT_HEADER)
  );
}

#[test]
fn test_label_text_rendered_by_default_font() {
  let annotator = Annotator::with_system_font();
  assert!(annotator.has_font());

  let image = RgbImage::from_pixel(160, 100, Rgb([255, 255, 255]));
  let detection = Detection::new([10.0, 50.0, 120.0, 95.0], 0.64, 0, "fire");
  let (text_width, text_height) = annotator.label_size("fire 0.64");
  let annotation = annotator.annotate(&image, &[detection]);

  let top = 50 - text_height - 3;
  let dark = (top..50)
    .flat_map(|y| (10..10 + text_width).map(move |x| (x, y)))
    .filter(|&(x, y)| annotation.image.get_pixel(x, y)[1] < 128)
    .count();
  assert!(dark > 0);
}

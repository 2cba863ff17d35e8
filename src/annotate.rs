// 该文件是 Huoyan （火眼） 项目的一部分。
// src/annotate.rs - 检测结果几何后处理与可视化
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

use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::{
  drawing::{draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size},
  rect::Rect,
};
use tracing::debug;

use crate::model::Detection;

mod font;
mod report;

pub use self::font::{FontError, embedded_font, find_system_font, load_font};
pub use self::report::{REPORT_HEADER, REPORT_TITLE, Report, ReportRow};

// 绘制常量
const BOX_COLOR: [u8; 3] = [0, 255, 0]; // 绿色
const CENTER_COLOR: [u8; 3] = [255, 0, 0]; // 红色
const BOTTOM_COLOR: [u8; 3] = [0, 0, 255]; // 蓝色
const TEXT_COLOR: [u8; 3] = [0, 0, 0];
const BOX_THICKNESS: i32 = 2;
const MARKER_RADIUS: i32 = 5;
const LABEL_FONT_SIZE: f32 = 18.0;
const LABEL_PADDING: i32 = 3;
// 图像外的坐标收敛到该边距内，不影响可见结果
const CANVAS_MARGIN: i32 = 1 << 15;
// 无字体时用于估算标签尺寸
const LABEL_CHAR_WIDTH: f32 = 10.0;
const LABEL_TEXT_HEIGHT: u32 = 14;

/// 检测框派生出的两个关键点
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedPoints {
  /// 检测框中心
  pub center: (f32, f32),
  /// 中心竖线与检测框底边的交点
  pub bottom: (f32, f32),
}

impl DerivedPoints {
  pub fn from_bbox(bbox: &[f32; 4]) -> Self {
    let [x1, y1, x2, y2] = *bbox;
    let center = ((x1 + x2) / 2.0, (y1 + y2) / 2.0);
    Self {
      center,
      bottom: (center.0, y2),
    }
  }

  pub fn center_pixel(&self) -> (i32, i32) {
    (self.center.0.round() as i32, self.center.1.round() as i32)
  }

  pub fn bottom_pixel(&self) -> (i32, i32) {
    (self.bottom.0.round() as i32, self.bottom.1.round() as i32)
  }
}

fn clip(v: f32, extent: u32) -> i32 {
  clip_px(v as i32, extent)
}

fn clip_px(v: i32, extent: u32) -> i32 {
  v.clamp(-CANVAS_MARGIN, extent.min(i32::MAX as u32 / 2) as i32 + CANVAS_MARGIN)
}

/// 标签文本，形如 `fire 0.87`
pub fn label_text(detection: &Detection) -> String {
  format!("{} {:.2}", detection.class_name, detection.confidence)
}

/// 绘制样式
#[derive(Debug, Clone)]
pub struct DrawStyle {
  pub box_color: Rgb<u8>,
  pub center_color: Rgb<u8>,
  pub bottom_color: Rgb<u8>,
  pub text_color: Rgb<u8>,
  pub box_thickness: i32,
  pub marker_radius: i32,
  pub font_size: f32,
}

impl Default for DrawStyle {
  fn default() -> Self {
    Self {
      box_color: Rgb(BOX_COLOR),
      center_color: Rgb(CENTER_COLOR),
      bottom_color: Rgb(BOTTOM_COLOR),
      text_color: Rgb(TEXT_COLOR),
      box_thickness: BOX_THICKNESS,
      marker_radius: MARKER_RADIUS,
      font_size: LABEL_FONT_SIZE,
    }
  }
}

/// 标注结果：绘制后的图像副本与按输入顺序排列的表格行
#[derive(Debug, Clone)]
pub struct Annotation {
  pub image: RgbImage,
  pub rows: Vec<ReportRow>,
}

impl Annotation {
  pub fn report(&self) -> Report<'_> {
    Report::new(&self.rows)
  }
}

/// 在图像副本上绘制检测框、关键点和标签，并生成结果表格
pub struct Annotator {
  style: DrawStyle,
  font: Option<FontArc>,
}

impl Default for Annotator {
  fn default() -> Self {
    Self::new(DrawStyle::default(), None)
  }
}

impl Annotator {
  pub fn new(style: DrawStyle, font: Option<FontArc>) -> Self {
    Self { style, font }
  }

  /// 优先使用系统字体，找不到时使用嵌入字体
  pub fn with_system_font() -> Self {
    Self::new(DrawStyle::default(), find_system_font().or_else(embedded_font))
  }

  pub fn with_font_path(path: impl AsRef<Path>) -> Result<Self, FontError> {
    Ok(Self::new(DrawStyle::default(), Some(load_font(path)?)))
  }

  pub fn style(&self) -> &DrawStyle {
    &self.style
  }

  pub fn has_font(&self) -> bool {
    self.font.is_some()
  }

  /// 原图只读，所有绘制都作用在副本上
  pub fn annotate(&self, image: &RgbImage, detections: &[Detection]) -> Annotation {
    let mut canvas = image.clone();
    let mut rows = Vec::with_capacity(detections.len());

    for detection in detections {
      let points = DerivedPoints::from_bbox(&detection.bbox);
      self.draw_detection(&mut canvas, detection, &points);
      rows.push(ReportRow::new(detection, &points));
    }

    debug!("绘制 {} 个检测结果", rows.len());
    Annotation {
      image: canvas,
      rows,
    }
  }

  pub fn draw_detection(&self, canvas: &mut RgbImage, detection: &Detection, points: &DerivedPoints) {
    let (width, height) = canvas.dimensions();
    let [x1, y1, x2, y2] = [
      clip(detection.bbox[0], width),
      clip(detection.bbox[1], height),
      clip(detection.bbox[2], width),
      clip(detection.bbox[3], height),
    ];
    let (center_x, center_y) = points.center_pixel();
    let (bottom_x, bottom_y) = points.bottom_pixel();

    // 检测框
    self.draw_box(canvas, (x1, y1), (x2, y2));

    // 中心点与底部点
    draw_filled_circle_mut(
      canvas,
      (clip_px(center_x, width), clip_px(center_y, height)),
      self.style.marker_radius,
      self.style.center_color,
    );
    draw_filled_circle_mut(
      canvas,
      (clip_px(bottom_x, width), clip_px(bottom_y, height)),
      self.style.marker_radius,
      self.style.bottom_color,
    );

    // 标签背景位于检测框左上角上方
    let label = label_text(detection);
    let (text_width, text_height) = self.label_size(&label);
    let label_top = y1 - text_height as i32 - LABEL_PADDING;
    let rect = Rect::at(x1, label_top).of_size(text_width.max(1), text_height + LABEL_PADDING as u32);
    draw_filled_rect_mut(canvas, rect, self.style.box_color);

    if let Some(font) = &self.font {
      draw_text_mut(
        canvas,
        self.style.text_color,
        x1,
        label_top + 1,
        PxScale::from(self.style.font_size),
        font,
        &label,
      );
    }
  }

  /// 标签渲染尺寸；没有字体时按字符数估算
  pub fn label_size(&self, label: &str) -> (u32, u32) {
    match &self.font {
      Some(font) => text_size(PxScale::from(self.style.font_size), font, label),
      None => (
        (label.chars().count() as f32 * LABEL_CHAR_WIDTH).round() as u32,
        LABEL_TEXT_HEIGHT,
      ),
    }
  }

  // 两个角点的顺序不做要求，超出图像的部分由绘制函数裁剪
  fn draw_box(&self, canvas: &mut RgbImage, a: (i32, i32), b: (i32, i32)) {
    let (left, right) = (a.0.min(b.0), a.0.max(b.0));
    let (top, bottom) = (a.1.min(b.1), a.1.max(b.1));
    let width = (right - left + 1) as u32;
    let height = (bottom - top + 1) as u32;

    for t in 0..self.style.box_thickness {
      let inset = 2 * t as u32;
      if width <= inset || height <= inset {
        break;
      }
      let rect = Rect::at(left + t, top + t).of_size(width - inset, height - inset);
      draw_hollow_rect_mut(canvas, rect, self.style.box_color);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn gray(width: u32, height: u32) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb([128, 128, 128]))
  }

  #[test]
  fn test_derived_points() {
    let points = DerivedPoints::from_bbox(&[10.0, 20.0, 50.0, 80.0]);
    assert_eq!(points.center, (30.0, 50.0));
    assert_eq!(points.bottom, (30.0, 80.0));
  }

  #[test]
  fn test_derived_points_fractional() {
    let points = DerivedPoints::from_bbox(&[1.0, 2.0, 4.0, 7.5]);
    assert_eq!(points.center, (2.5, 4.75));
    assert_eq!(points.bottom, (2.5, 7.5));
    assert_eq!(points.center_pixel(), (3, 5));
    assert_eq!(points.bottom_pixel(), (3, 8));
  }

  #[test]
  fn test_label_text() {
    let detection = Detection::new([0.0; 4], 0.8712, 0, "fire");
    assert_eq!(label_text(&detection), "fire 0.87");
  }

  #[test]
  fn test_label_size_without_font() {
    let annotator = Annotator::default();
    assert!(!annotator.has_font());
    assert_eq!(annotator.label_size("fire 0.87"), (90, LABEL_TEXT_HEIGHT));
  }

  #[test]
  fn test_empty_detections_copy_input() {
    let image = gray(32, 24);
    let annotation = Annotator::default().annotate(&image, &[]);
    assert_eq!(annotation.image.as_raw(), image.as_raw());
    assert!(annotation.rows.is_empty());
  }

  #[test]
  fn test_draw_markers_and_box() {
    let image = gray(100, 100);
    let detection = Detection::new([10.0, 40.0, 50.0, 80.0], 0.87, 0, "fire");
    let annotation = Annotator::default().annotate(&image, &[detection]);
    let out = &annotation.image;

    // 原图不变
    assert_eq!(image.get_pixel(30, 60), &Rgb([128, 128, 128]));
    // 中心点与底部点
    assert_eq!(out.get_pixel(30, 60), &Rgb(CENTER_COLOR));
    assert_eq!(out.get_pixel(30, 77), &Rgb(BOTTOM_COLOR));
    // 检测框两像素宽
    assert_eq!(out.get_pixel(10, 60), &Rgb(BOX_COLOR));
    assert_eq!(out.get_pixel(11, 60), &Rgb(BOX_COLOR));
    assert_eq!(out.get_pixel(12, 60), &Rgb([128, 128, 128]));
    assert_eq!(out.get_pixel(50, 60), &Rgb(BOX_COLOR));
    // 标签背景在框的上方
    assert_eq!(out.get_pixel(15, 35), &Rgb(BOX_COLOR));
    assert_eq!(out.get_pixel(15, 20), &Rgb([128, 128, 128]));
  }

  #[test]
  fn test_label_text_drawn_with_font() {
    let annotator = Annotator::new(DrawStyle::default(), embedded_font());
    assert!(annotator.has_font());

    let image = gray(200, 120);
    let detection = Detection::new([20.0, 60.0, 150.0, 110.0], 0.87, 0, "fire");
    let (text_width, text_height) = annotator.label_size(&label_text(&detection));
    assert!(text_width > 0 && text_height > 0);

    let annotation = annotator.annotate(&image, &[detection]);
    let out = &annotation.image;
    let left = 20;
    let top = 60 - text_height - LABEL_PADDING as u32;
    let right = left + text_width - 1;

    // 标签背景宽度等于测得的文本宽度
    assert_eq!(out.get_pixel(left, top), &Rgb(BOX_COLOR));
    assert_eq!(out.get_pixel(right, top), &Rgb(BOX_COLOR));
    assert_eq!(out.get_pixel(right + 1, top), &Rgb([128, 128, 128]));

    // 标签背景内有深色文本像素
    let text_pixels = (top..60)
      .flat_map(|y| (left..=right).map(move |x| (x, y)))
      .filter(|&(x, y)| out.get_pixel(x, y)[1] < 128)
      .count();
    assert!(text_pixels > 0);
  }

  #[test]
  fn test_degenerate_boxes_do_not_panic() {
    let image = gray(20, 20);
    let detections = [
      Detection::new([15.0, 15.0, 5.0, 5.0], 0.5, 0, "fire"),
      Detection::new([5.0, 5.0, 5.0, 5.0], 0.5, 0, "fire"),
      Detection::new([-30.0, -30.0, 100.0, 100.0], 0.5, 0, "fire"),
      Detection::new([f32::NAN, 0.0, 1.0, 1.0], 0.5, 0, ""),
    ];
    let annotation = Annotator::default().annotate(&image, &detections);
    assert_eq!(annotation.rows.len(), 4);
    assert_eq!(annotation.image.dimensions(), (20, 20));
  }

  #[test]
  fn test_overlapping_same_class_not_merged() {
    let image = gray(100, 100);
    let detections = [
      Detection::new([10.0, 30.0, 60.0, 90.0], 0.9, 0, "fire"),
      Detection::new([20.0, 40.0, 70.0, 95.0], 0.4, 0, "fire"),
    ];
    let annotation = Annotator::default().annotate(&image, &detections);
    assert_eq!(annotation.rows.len(), 2);
    assert_eq!(annotation.rows[0].confidence, 0.9);
    assert_eq!(annotation.rows[1].confidence, 0.4);
    // 两个标签背景各自绘制
    assert_eq!(annotation.image.get_pixel(12, 25), &Rgb(BOX_COLOR));
    assert_eq!(annotation.image.get_pixel(22, 35), &Rgb(BOX_COLOR));
  }
}

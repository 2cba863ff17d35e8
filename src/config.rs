// 该文件是 Huoyan （火眼） 项目的一部分。
// src/config.rs - 运行配置
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

use std::path::PathBuf;

use thiserror::Error;

pub const DEFAULT_MODEL_PATH: &str = "best_fire2.onnx";
pub const DEFAULT_IMAGE_PATH: &str = "fire_img.jpg";
pub const DEFAULT_OUTPUT_PATH: &str = "detection_result.jpg";
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.25;
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.45;
pub const DEFAULT_WINDOW_TITLE: &str = "YOLO Detection";

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
  #[error("置信度阈值必须在 0.0 - 1.0 之间, 实际为 {0}")]
  ConfidenceOutOfRange(f32),
  #[error("IOU 阈值必须在 0.0 - 1.0 之间, 实际为 {0}")]
  IouOutOfRange(f32),
}

/// 一次检测运行所需的全部配置
#[derive(Debug, Clone)]
pub struct RunConfig {
  /// ONNX 模型文件路径
  pub model_path: PathBuf,
  /// 输入图像路径
  pub image_path: PathBuf,
  /// 标注结果保存路径
  pub output_path: PathBuf,
  pub confidence_threshold: f32,
  pub iou_threshold: f32,
  /// 可选的类别名称文件，每行一个名称
  pub labels_path: Option<PathBuf>,
  /// 可选的字体文件，缺省时在系统字体目录中查找
  pub font_path: Option<PathBuf>,
  /// 是否在窗口中显示结果
  pub display: bool,
  pub window_title: String,
  /// 是否将结果表格另存为文本文件
  pub save_report: bool,
}

impl Default for RunConfig {
  fn default() -> Self {
    Self {
      model_path: PathBuf::from(DEFAULT_MODEL_PATH),
      image_path: PathBuf::from(DEFAULT_IMAGE_PATH),
      output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
      confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
      iou_threshold: DEFAULT_IOU_THRESHOLD,
      labels_path: None,
      font_path: None,
      display: true,
      window_title: DEFAULT_WINDOW_TITLE.to_string(),
      save_report: false,
    }
  }
}

impl RunConfig {
  pub fn validate(&self) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&self.confidence_threshold) {
      return Err(ConfigError::ConfidenceOutOfRange(
        self.confidence_threshold,
      ));
    }
    if !(0.0..=1.0).contains(&self.iou_threshold) {
      return Err(ConfigError::IouOutOfRange(self.iou_threshold));
    }
    Ok(())
  }

  /// 结果表格文本文件路径，与输出图像同名
  pub fn report_path(&self) -> PathBuf {
    self.output_path.with_extension("txt")
  }
}

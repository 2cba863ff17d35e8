// 该文件是 Huoyan （火眼） 项目的一部分。
// src/main.rs - 单张图像火焰检测程序
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

use anyhow::Result;
use clap::Parser;
#[cfg(feature = "model_yolo")]
use tracing::info;

use huoyan::config::{self, RunConfig};

/// Huoyan 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// ONNX 模型文件路径
  #[arg(long, default_value = config::DEFAULT_MODEL_PATH, value_name = "MODEL")]
  pub model: PathBuf,
  /// 输入图像路径
  #[arg(long, default_value = config::DEFAULT_IMAGE_PATH, value_name = "IMAGE")]
  pub input: PathBuf,
  /// 标注结果保存路径
  #[arg(long, default_value = config::DEFAULT_OUTPUT_PATH, value_name = "OUTPUT")]
  pub output: PathBuf,
  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = config::DEFAULT_CONFIDENCE_THRESHOLD, value_name = "THRESHOLD")]
  pub confidence: f32,
  /// NMS IOU 阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = config::DEFAULT_IOU_THRESHOLD, value_name = "THRESHOLD")]
  pub iou: f32,
  /// 类别名称文件，每行一个名称
  #[arg(long, value_name = "FILE")]
  pub labels: Option<PathBuf>,
  /// 标签字体文件
  #[arg(long, value_name = "FONT")]
  pub font: Option<PathBuf>,
  /// 不打开显示窗口
  #[arg(long)]
  pub no_display: bool,
  /// 将结果表格另存为与输出图像同名的 .txt 文件
  #[arg(long)]
  pub save_report: bool,
}

impl From<Args> for RunConfig {
  fn from(args: Args) -> Self {
    RunConfig {
      model_path: args.model,
      image_path: args.input,
      output_path: args.output,
      confidence_threshold: args.confidence,
      iou_threshold: args.iou,
      labels_path: args.labels,
      font_path: args.font,
      display: !args.no_display,
      save_report: args.save_report,
      ..RunConfig::default()
    }
  }
}

#[cfg(feature = "model_yolo")]
fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let config = RunConfig::from(Args::parse());

  info!("模型文件路径: {}", config.model_path.display());
  info!("输入图像: {}", config.image_path.display());
  info!("输出路径: {}", config.output_path.display());

  match huoyan::run(&config) {
    Ok(()) => Ok(()),
    Err(huoyan::RunError::ImageLoad(e)) => {
      let path = e.path().unwrap_or(config.image_path.as_path());
      println!("Error: Could not load image at {}", path.display());
      Ok(())
    }
    Err(e) => Err(e.into()),
  }
}

#[cfg(not(feature = "model_yolo"))]
fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let _ = RunConfig::from(Args::parse());
  anyhow::bail!("未启用 model_yolo 特性，无法加载模型")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_default_args() {
    let config = RunConfig::from(Args::parse_from(["huoyan"]));
    assert_eq!(config.model_path, PathBuf::from("best_fire2.onnx"));
    assert_eq!(config.image_path, PathBuf::from("fire_img.jpg"));
    assert_eq!(config.output_path, PathBuf::from("detection_result.jpg"));
    assert_eq!(config.confidence_threshold, 0.25);
    assert_eq!(config.iou_threshold, 0.45);
    assert!(config.display);
    assert!(!config.save_report);
  }

  #[test]
  fn test_flags() {
    let args = Args::parse_from([
      "huoyan",
      "--input",
      "a.png",
      "--confidence",
      "0.5",
      "--no-display",
      "--save-report",
    ]);
    let config = RunConfig::from(args);
    assert_eq!(config.image_path, PathBuf::from("a.png"));
    assert_eq!(config.confidence_threshold, 0.5);
    assert!(!config.display);
    assert!(config.save_report);
  }
}

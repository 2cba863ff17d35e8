// 该文件是 Huoyan （火眼） 项目的一部分。
// src/lib.rs - 库主文件
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

pub mod annotate;
pub mod config;
pub mod input;
pub mod model;
pub mod output;
pub mod task;

use image::RgbImage;
use thiserror::Error;
use tracing::{error, info};

use crate::{
  config::{ConfigError, RunConfig},
  input::{ImageFileInput, ImageFileInputError},
  model::{DetectResult, Model},
  output::{OutputError, OutputPipeline},
  task::{OneShotTask, Task},
};

pub trait FromUrl {
  type Error;
  fn from_url(url: &url::Url) -> Result<Self, Self::Error>
  where
    Self: Sized;
}

pub trait FromUrlWithScheme: FromUrl {
  const SCHEME: &'static str;
}

#[derive(Error, Debug)]
pub enum RunError {
  #[error("配置错误: {0}")]
  Config(#[from] ConfigError),
  #[error("{0}")]
  ImageLoad(#[from] ImageFileInputError),
  #[cfg(feature = "model_yolo")]
  #[error("模型错误: {0}")]
  Model(#[from] model::YoloError),
  #[error("输出错误: {0}")]
  Output(#[from] OutputError),
  #[error("任务错误: {0}")]
  Task(anyhow::Error),
}

impl RunError {
  /// 图像读取失败是唯一需要提示给用户而不视为崩溃的错误
  pub fn is_image_load_failure(&self) -> bool {
    matches!(self, RunError::ImageLoad(_))
  }
}

/// 使用 ONNX YOLO 模型完成一次完整的检测流程
#[cfg(feature = "model_yolo")]
pub fn run(config: &RunConfig) -> Result<(), RunError> {
  config.validate()?;

  // 先读图，读不到就不必加载模型
  let input = open_input(config)?;

  let mut builder = model::YoloOnnxBuilder::new(&config.model_path)
    .confidence(config.confidence_threshold)
    .iou(config.iou_threshold);
  if let Some(labels) = &config.labels_path {
    builder = builder.labels(model::read_label_file(labels).map_err(model::YoloError::from)?);
  }
  let model = builder.build()?;

  execute(config, input, model)
}

/// 使用外部提供的模型完成一次完整的检测流程
pub fn run_with_model<M>(config: &RunConfig, model: M) -> Result<(), RunError>
where
  M: Model<Input = RgbImage, Output = DetectResult>,
  M::Error: std::error::Error + Send + Sync + 'static,
{
  config.validate()?;
  let input = open_input(config)?;
  execute(config, input, model)
}

fn open_input(config: &RunConfig) -> Result<ImageFileInput, RunError> {
  ImageFileInput::open(&config.image_path).map_err(|e| {
    error!("图像读取失败: {}", e);
    RunError::from(e)
  })
}

fn execute<M>(config: &RunConfig, input: ImageFileInput, model: M) -> Result<(), RunError>
where
  M: Model<Input = RgbImage, Output = DetectResult>,
  M::Error: std::error::Error + Send + Sync + 'static,
{
  let output = OutputPipeline::from_config(config)?;
  info!("输出已创建: {} 个", output.len());

  OneShotTask
    .run_task(input, model, output)
    .map_err(RunError::Task)
}

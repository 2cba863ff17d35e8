// 该文件是 Huoyan （火眼） 项目的一部分。
// src/output.rs - 输出定义
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

use image::RgbImage;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  annotate::{Annotation, Annotator, FontError},
  config::RunConfig,
  model::DetectResult,
};

pub trait Render<Frame, Output>: Sized {
  type Error;
  fn render_result(&self, frame: &Frame, result: &Output) -> Result<(), Self::Error>;
}

/// 消费一次标注结果的输出端
pub trait Present {
  type Error;
  fn present(&self, annotation: &Annotation) -> Result<(), Self::Error>;
}

mod report_output;
pub use self::report_output::{ReportOutput, ReportOutputError};

mod save_image_file;
pub use self::save_image_file::{SaveImageFileError, SaveImageFileOutput};

#[cfg(feature = "display")]
mod window_output;
#[cfg(feature = "display")]
pub use self::window_output::{WindowOutput, WindowOutputError};

#[derive(Error, Debug)]
pub enum OutputError {
  #[error("结果表格输出错误: {0}")]
  ReportOutputError(#[from] ReportOutputError),
  #[error("保存图像文件错误: {0}")]
  SaveImageFileError(#[from] SaveImageFileError),
  #[cfg(feature = "display")]
  #[error("窗口显示错误: {0}")]
  WindowOutputError(#[from] WindowOutputError),
  #[error("字体错误: {0}")]
  FontError(#[from] FontError),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

pub enum OutputWrapper {
  Report(ReportOutput),
  SaveImageFile(SaveImageFileOutput),
  #[cfg(feature = "display")]
  Window(WindowOutput),
}

impl FromUrl for OutputWrapper {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      SaveImageFileOutput::SCHEME => Ok(OutputWrapper::SaveImageFile(
        SaveImageFileOutput::from_url(url)?,
      )),
      ReportOutput::SCHEME => Ok(OutputWrapper::Report(ReportOutput::from_url(url)?)),
      #[cfg(feature = "display")]
      WindowOutput::SCHEME => Ok(OutputWrapper::Window(WindowOutput::from_url(url)?)),
      _ => Err(OutputError::SchemeMismatch),
    }
  }
}

impl Present for OutputWrapper {
  type Error = OutputError;

  fn present(&self, annotation: &Annotation) -> Result<(), Self::Error> {
    match self {
      OutputWrapper::Report(output) => output.present(annotation).map_err(OutputError::from),
      OutputWrapper::SaveImageFile(output) => output.present(annotation).map_err(OutputError::from),
      #[cfg(feature = "display")]
      OutputWrapper::Window(output) => output.present(annotation).map_err(OutputError::from),
    }
  }
}

/// 标注一次，依次交给各个输出端
pub struct OutputPipeline {
  annotator: Annotator,
  outputs: Vec<OutputWrapper>,
}

impl OutputPipeline {
  pub fn new(annotator: Annotator) -> Self {
    Self {
      annotator,
      outputs: Vec::new(),
    }
  }

  pub fn with_output(mut self, output: OutputWrapper) -> Self {
    self.outputs.push(output);
    self
  }

  /// 结果表格 → 保存图像 → 窗口显示
  pub fn from_config(config: &RunConfig) -> Result<Self, OutputError> {
    let annotator = match &config.font_path {
      Some(path) => Annotator::with_font_path(path)?,
      None => Annotator::with_system_font(),
    };
    if !annotator.has_font() {
      warn!("没有可用字体，仅绘制标签背景");
    }

    let report = if config.save_report {
      ReportOutput::stdout().with_file(config.report_path())
    } else {
      ReportOutput::stdout()
    };

    #[cfg_attr(not(feature = "display"), allow(unused_mut))]
    let mut pipeline = Self::new(annotator)
      .with_output(OutputWrapper::Report(report))
      .with_output(OutputWrapper::SaveImageFile(SaveImageFileOutput::new(
        &config.output_path,
      )));

    if config.display {
      #[cfg(feature = "display")]
      {
        pipeline = pipeline.with_output(OutputWrapper::Window(WindowOutput::new(
          &config.window_title,
        )));
      }
      #[cfg(not(feature = "display"))]
      warn!("未启用 display 特性，跳过窗口显示");
    }

    Ok(pipeline)
  }

  pub fn annotator(&self) -> &Annotator {
    &self.annotator
  }

  pub fn len(&self) -> usize {
    self.outputs.len()
  }

  pub fn is_empty(&self) -> bool {
    self.outputs.is_empty()
  }
}

impl Render<RgbImage, DetectResult> for OutputPipeline {
  type Error = OutputError;

  fn render_result(&self, frame: &RgbImage, result: &DetectResult) -> Result<(), Self::Error> {
    let annotation = self.annotator.annotate(frame, &result.items);
    info!("标注完成: {} 个检测结果", annotation.rows.len());
    for output in &self.outputs {
      output.present(&annotation)?;
    }
    Ok(())
  }
}

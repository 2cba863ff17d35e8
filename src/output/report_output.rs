// 该文件是 Huoyan （火眼） 项目的一部分。
// src/output/report_output.rs - 结果表格输出
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

use std::{
  io::Write,
  path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::warn;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, annotate::Annotation, output::Present};

#[derive(Error, Debug)]
pub enum ReportOutputError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

/// 将结果表格打印到标准输出，并可另存为文本文件
#[derive(Debug, Clone, Default)]
pub struct ReportOutput {
  print: bool,
  path: Option<PathBuf>,
}

impl FromUrlWithScheme for ReportOutput {
  const SCHEME: &'static str = "report";
}

impl FromUrl for ReportOutput {
  type Error = ReportOutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ReportOutputError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        url.scheme()
      )));
    }

    Ok(ReportOutput::file(url.path()))
  }
}

impl ReportOutput {
  pub fn stdout() -> Self {
    Self {
      print: true,
      path: None,
    }
  }

  pub fn file(path: impl AsRef<Path>) -> Self {
    Self {
      print: false,
      path: Some(path.as_ref().to_path_buf()),
    }
  }

  pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
    self.path = Some(path.as_ref().to_path_buf());
    self
  }

  pub fn path(&self) -> Option<&Path> {
    self.path.as_deref()
  }
}

impl Present for ReportOutput {
  type Error = ReportOutputError;

  fn present(&self, annotation: &Annotation) -> Result<(), Self::Error> {
    let text = annotation.report().to_string();

    if self.print {
      let mut stdout = std::io::stdout().lock();
      stdout.write_all(text.as_bytes())?;
      stdout.flush()?;
    }

    if let Some(path) = &self.path {
      if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
      {
        std::fs::create_dir_all(parent)?;
      }
      std::fs::write(path, &text)?;
      warn!("保存结果表格到文件: {}", path.display());
    }

    Ok(())
  }
}

// 该文件是 Huoyan （火眼） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use std::path::{Path, PathBuf};

use image::{ImageReader, RgbImage};
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI schema mismatch: expected '{expected}', found '{found}'")]
  SchemaMismatch { expected: String, found: String },
  #[error("Could not load image at {}: {source}", path.display())]
  IoError {
    path: PathBuf,
    source: std::io::Error,
  },
  #[error("Could not load image at {}: {source}", path.display())]
  ImageLoadError {
    path: PathBuf,
    source: image::ImageError,
  },
}

impl ImageFileInputError {
  pub fn path(&self) -> Option<&Path> {
    match self {
      ImageFileInputError::SchemaMismatch { .. } => None,
      ImageFileInputError::IoError { path, .. } | ImageFileInputError::ImageLoadError { path, .. } => {
        Some(path)
      }
    }
  }
}

/// 单张图像输入，迭代一次后耗尽
#[derive(Debug)]
pub struct ImageFileInput {
  image: Option<RgbImage>,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemaMismatch {
        expected: Self::SCHEME.to_string(),
        found: url.scheme().to_string(),
      });
    }

    Self::open(url.path())
  }
}

impl ImageFileInput {
  pub fn open(path: impl AsRef<Path>) -> Result<Self, ImageFileInputError> {
    let path = path.as_ref();
    let image = ImageReader::open(path)
      .map_err(|source| ImageFileInputError::IoError {
        path: path.to_path_buf(),
        source,
      })?
      .with_guessed_format()
      .map_err(|source| ImageFileInputError::IoError {
        path: path.to_path_buf(),
        source,
      })?
      .decode()
      .map_err(|source| ImageFileInputError::ImageLoadError {
        path: path.to_path_buf(),
        source,
      })?;

    let image = image.into_rgb8();
    debug!(
      "读取图像 {}: {}x{}",
      path.display(),
      image.width(),
      image.height()
    );
    Ok(Self::from_image(image))
  }

  pub fn from_image(image: RgbImage) -> Self {
    Self { image: Some(image) }
  }

  /// 尚未被取走的图像
  pub fn peek(&self) -> Option<&RgbImage> {
    self.image.as_ref()
  }
}

impl Iterator for ImageFileInput {
  type Item = RgbImage;

  fn next(&mut self) -> Option<Self::Item> {
    self.image.take()
  }
}

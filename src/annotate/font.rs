// 该文件是 Huoyan （火眼） 项目的一部分。
// src/annotate/font.rs - 标签字体加载
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

use ab_glyph::FontArc;
use thiserror::Error;
use tracing::{info, warn};

const SYSTEM_FONT_PATHS: [&str; 6] = [
  "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
  "/usr/share/fonts/TTF/DejaVuSans.ttf",
  "/usr/share/fonts/dejavu/DejaVuSans.ttf",
  "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
  "/System/Library/Fonts/Supplemental/Arial.ttf",
  "C:\\Windows\\Fonts\\arial.ttf",
];

// DejaVu Sans，许可见 assets/font.LICENSE
static EMBEDDED_FONT: &[u8] = include_bytes!("../../assets/font.ttf");

#[derive(Error, Debug)]
pub enum FontError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("无法解析字体文件: {0}")]
  InvalidFont(PathBuf),
}

pub fn load_font(path: impl AsRef<Path>) -> Result<FontArc, FontError> {
  let path = path.as_ref();
  let data = std::fs::read(path)?;
  let font = FontArc::try_from_vec(data).map_err(|_| FontError::InvalidFont(path.to_path_buf()))?;
  info!("加载字体: {}", path.display());
  Ok(font)
}

/// 在常见的系统字体目录中查找可用字体
pub fn find_system_font() -> Option<FontArc> {
  let font = SYSTEM_FONT_PATHS
    .iter()
    .find_map(|path| load_font(path).ok());
  if font.is_none() {
    warn!("未找到系统字体, 已查找: {}", SYSTEM_FONT_PATHS.join(", "));
  }
  font
}

/// 随程序编译的默认字体
pub fn embedded_font() -> Option<FontArc> {
  match FontArc::try_from_slice(EMBEDDED_FONT) {
    Ok(font) => Some(font),
    Err(e) => {
      warn!("无法加载嵌入的字体: {}", e);
      None
    }
  }
}

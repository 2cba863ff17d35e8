// 该文件是 Huoyan （火眼） 项目的一部分。
// src/output/window_output.rs - 窗口显示
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
use pixels::{Pixels, SurfaceTexture};
use thiserror::Error;
use tracing::{error, info};
use url::Url;
use winit::{
  dpi::LogicalSize,
  event::{ElementState, Event, WindowEvent},
  event_loop::{ControlFlow, EventLoop},
  platform::run_return::EventLoopExtRunReturn,
  window::WindowBuilder,
};

use crate::{FromUrl, FromUrlWithScheme, annotate::Annotation, config, output::Present};

#[derive(Error, Debug)]
pub enum WindowOutputError {
  #[error("创建窗口失败: {0}")]
  WindowError(#[from] winit::error::OsError),
  #[error("初始化像素缓冲失败: {0}")]
  PixelsError(#[from] pixels::Error),
  #[error("绘制失败: {0}")]
  RenderError(String),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

/// 打开窗口显示标注结果，按任意键或关闭窗口后返回
pub struct WindowOutput {
  title: String,
}

impl FromUrlWithScheme for WindowOutput {
  const SCHEME: &'static str = "window";
}

impl FromUrl for WindowOutput {
  type Error = WindowOutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(WindowOutputError::SchemeMismatch(format!(
        "期望显示方式 '{}', 实际显示方式 '{}'",
        Self::SCHEME,
        url.scheme()
      )));
    }

    let title = url
      .query_pairs()
      .find(|(key, _)| key == "title")
      .map(|(_, value)| value.into_owned())
      .unwrap_or_else(|| config::DEFAULT_WINDOW_TITLE.to_string());
    Ok(WindowOutput::new(&title))
  }
}

impl WindowOutput {
  pub fn new(title: &str) -> Self {
    Self {
      title: title.to_string(),
    }
  }

  pub fn title(&self) -> &str {
    &self.title
  }

  fn show(&self, image: &RgbImage) -> Result<(), WindowOutputError> {
    let (width, height) = image.dimensions();
    let mut event_loop = EventLoop::new();
    let window = WindowBuilder::new()
      .with_title(&self.title)
      .with_inner_size(LogicalSize::new(width as f64, height as f64))
      .build(&event_loop)?;

    let size = window.inner_size();
    let surface_texture = SurfaceTexture::new(size.width, size.height, &window);
    let mut pixels = Pixels::new(width, height, surface_texture)?;
    copy_to_pixels(image, pixels.frame_mut());
    info!("窗口已打开: {}，按任意键关闭", self.title);

    let mut failure = None;
    event_loop.run_return(|event, _, control_flow| {
      *control_flow = ControlFlow::Wait;
      match event {
        Event::WindowEvent { event, .. } => match event {
          WindowEvent::CloseRequested => *control_flow = ControlFlow::Exit,
          WindowEvent::KeyboardInput { input, .. } if input.state == ElementState::Pressed => {
            *control_flow = ControlFlow::Exit;
          }
          WindowEvent::Resized(size) => {
            if let Err(err) = pixels.resize_surface(size.width, size.height) {
              error!(?err, "调整窗口表面失败");
              failure = Some(err.to_string());
              *control_flow = ControlFlow::Exit;
            }
          }
          _ => {}
        },
        Event::RedrawRequested(_) => {
          if let Err(err) = pixels.render() {
            error!(?err, "绘制失败");
            failure = Some(err.to_string());
            *control_flow = ControlFlow::Exit;
          }
        }
        _ => {}
      }
    });

    match failure {
      Some(msg) => Err(WindowOutputError::RenderError(msg)),
      None => Ok(()),
    }
  }
}

fn copy_to_pixels(image: &RgbImage, target: &mut [u8]) {
  for (src, dst) in image.pixels().zip(target.chunks_exact_mut(4)) {
    dst[..3].copy_from_slice(&src.0);
    dst[3] = 0xFF;
  }
}

impl Present for WindowOutput {
  type Error = WindowOutputError;

  fn present(&self, annotation: &Annotation) -> Result<(), Self::Error> {
    self.show(&annotation.image)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgb;

  #[test]
  fn test_copy_to_pixels() {
    let image = RgbImage::from_pixel(2, 1, Rgb([1, 2, 3]));
    let mut target = vec![0u8; 8];
    copy_to_pixels(&image, &mut target);
    assert_eq!(target, vec![1, 2, 3, 255, 1, 2, 3, 255]);
  }

  #[test]
  fn test_from_url_title() {
    let url = Url::parse("window://display?title=Fire").unwrap();
    assert_eq!(WindowOutput::from_url(&url).unwrap().title(), "Fire");

    let url = Url::parse("window://display").unwrap();
    assert_eq!(
      WindowOutput::from_url(&url).unwrap().title(),
      config::DEFAULT_WINDOW_TITLE
    );
  }
}

// 该文件是 Huoyan （火眼） 项目的一部分。
// src/model.rs - 模型
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

/// 推理后端的统一接口：输入一帧图像，输出检测结果
pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// 单个检测目标
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
  pub bbox: [f32; 4], // [x_min, y_min, x_max, y_max]，原图像素坐标
  pub confidence: f32,
  pub class_id: u32,
  pub class_name: String,
}

impl Detection {
  pub fn new(bbox: [f32; 4], confidence: f32, class_id: u32, class_name: impl Into<String>) -> Self {
    Self {
      bbox,
      confidence,
      class_id,
      class_name: class_name.into(),
    }
  }
}

#[derive(Debug, Clone, Default)]
pub struct DetectResult {
  pub items: Box<[Detection]>,
  pub names: LabelMap,
}

impl DetectResult {
  pub fn new(items: Vec<Detection>, names: LabelMap) -> Self {
    Self {
      items: items.into_boxed_slice(),
      names,
    }
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }
}

mod labels;
pub use self::labels::{LabelError, LabelMap, parse_names_metadata, read_label_file};

#[cfg(feature = "model_yolo")]
mod yolo;
#[cfg(feature = "model_yolo")]
pub use self::yolo::{YoloError, YoloOnnx, YoloOnnxBuilder};

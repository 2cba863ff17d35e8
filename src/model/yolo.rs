// 该文件是 Huoyan （火眼） 项目的一部分。
// src/model/yolo.rs - ONNX YOLO 检测模型
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

use std::{path::PathBuf, sync::Mutex};

use image::{
  RgbImage,
  imageops::{self, FilterType},
};
use ndarray::Array4;
use ort::{session::Session, value::Tensor};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  model::{DetectResult, Detection, LabelError, LabelMap, Model, parse_names_metadata},
};

const YOLO_DEFAULT_INPUT_SIZE: u32 = 640;
const YOLO_DEFAULT_CONFIDENCE: f32 = 0.25;
const YOLO_DEFAULT_IOU: f32 = 0.45;
const YOLO_MAX_DETECTIONS: usize = 300;
const YOLO_PAD_VALUE: f32 = 114.0 / 255.0;
const YOLO_BOX_ATTRS: usize = 4;

#[derive(Error, Debug)]
pub enum YoloError {
  #[error("模型加载错误: {0}")]
  ModelLoadError(std::io::Error),
  #[error("ONNX Runtime 错误: {0}")]
  OrtError(#[from] ort::Error),
  #[error("模型输出形状无效: {0}")]
  OutputShape(String),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
  #[error("类别表错误: {0}")]
  LabelError(#[from] LabelError),
  #[error("推理会话锁已损坏")]
  SessionPoisoned,
}

impl From<std::io::Error> for YoloError {
  fn from(err: std::io::Error) -> Self {
    YoloError::ModelLoadError(err)
  }
}

pub struct YoloOnnxBuilder {
  model_path: PathBuf,
  confidence: f32,
  iou: f32,
  input_size: Option<(u32, u32)>, // (宽, 高)
  labels: Option<LabelMap>,
  max_detections: usize,
}

impl FromUrlWithScheme for YoloOnnxBuilder {
  const SCHEME: &'static str = "yolo";
}

impl FromUrl for YoloOnnxBuilder {
  type Error = YoloError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(YoloError::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    Ok(YoloOnnxBuilder::new(url.path()))
  }
}

impl YoloOnnxBuilder {
  pub fn new(model_path: impl Into<PathBuf>) -> Self {
    Self {
      model_path: model_path.into(),
      confidence: YOLO_DEFAULT_CONFIDENCE,
      iou: YOLO_DEFAULT_IOU,
      input_size: None,
      labels: None,
      max_detections: YOLO_MAX_DETECTIONS,
    }
  }

  pub fn confidence(mut self, confidence: f32) -> Self {
    self.confidence = confidence;
    self
  }

  pub fn iou(mut self, iou: f32) -> Self {
    self.iou = iou;
    self
  }

  /// 指定正方形模型输入边长
  pub fn input_size(mut self, size: u32) -> Self {
    self.input_size = Some((size, size));
    self
  }

  /// 指定模型输入宽高，缺省时依次读取模型输入形状与元数据 `imgsz`
  pub fn input_shape(mut self, width: u32, height: u32) -> Self {
    self.input_size = Some((width, height));
    self
  }

  /// 指定类别名称，优先于模型元数据中的 `names`
  pub fn labels(mut self, labels: LabelMap) -> Self {
    self.labels = Some(labels);
    self
  }

  pub fn max_detections(mut self, max_detections: usize) -> Self {
    self.max_detections = max_detections;
    self
  }

  pub fn build(self) -> Result<YoloOnnx, YoloError> {
    info!("加载模型文件: {}", self.model_path.display());
    let model_data = std::fs::read(&self.model_path)?;
    debug!(
      "模型文件大小: {:.2} MB",
      model_data.len() as f64 / (1024.0 * 1024.0)
    );

    info!("创建 ONNX Runtime 推理会话");
    let session = Session::builder()?.commit_from_memory(&model_data)?;
    debug!("模型输入数量: {}", session.inputs.len());
    debug!("模型输出数量: {}", session.outputs.len());

    if session.inputs.len() != 1 || session.outputs.is_empty() {
      error!(
        "预期模型输入数量为 1, 实际为 {}; 输出数量为 {}",
        session.inputs.len(),
        session.outputs.len()
      );
      return Err(YoloError::OutputShape(format!(
        "输入 {} 个, 输出 {} 个",
        session.inputs.len(),
        session.outputs.len()
      )));
    }

    let (meta_names, meta_imgsz) = read_metadata(&session);

    let names = match (self.labels, meta_names) {
      (Some(labels), _) => labels,
      (None, Some(names)) => names,
      (None, None) => {
        warn!("模型未携带类别名称，使用类别编号代替");
        LabelMap::new()
      }
    };
    let (input_width, input_height) = self
      .input_size
      .or_else(|| read_input_shape(&session))
      .or(meta_imgsz)
      .unwrap_or((YOLO_DEFAULT_INPUT_SIZE, YOLO_DEFAULT_INPUT_SIZE));

    info!(
      "模型加载完成: 输入 {}x{}, 类别 {} 个",
      input_width,
      input_height,
      names.len()
    );

    Ok(YoloOnnx {
      session: Mutex::new(session),
      names,
      confidence: self.confidence,
      iou: self.iou,
      input_width,
      input_height,
      max_detections: self.max_detections,
    })
  }
}

/// 固定形状的模型输入 `[N, 3, H, W]`，返回 (宽, 高)；动态维度返回 None
fn read_input_shape(session: &Session) -> Option<(u32, u32)> {
  let shape = session.inputs.first()?.input_type.tensor_shape()?;
  debug!("模型输入形状: {:?}", &shape[..]);
  if shape.len() != 4 {
    warn!("预期模型输入为 4 维, 实际为 {} 维", shape.len());
    return None;
  }

  let (height, width) = (shape[2], shape[3]);
  if height > 0 && width > 0 {
    Some((width as u32, height as u32))
  } else {
    debug!("模型输入尺寸为动态，改用元数据");
    None
  }
}

fn read_metadata(session: &Session) -> (Option<LabelMap>, Option<(u32, u32)>) {
  let metadata = match session.metadata() {
    Ok(metadata) => metadata,
    Err(e) => {
      warn!("读取模型元数据失败: {}", e);
      return (None, None);
    }
  };

  let names = match metadata.custom("names") {
    Ok(Some(text)) => match parse_names_metadata(&text) {
      Ok(names) => Some(names),
      Err(e) => {
        warn!("解析模型类别名称失败: {}", e);
        None
      }
    },
    _ => None,
  };

  let imgsz = match metadata.custom("imgsz") {
    Ok(Some(text)) => parse_imgsz(&text),
    _ => None,
  };

  (names, imgsz)
}

/// `imgsz` 元数据形如 `[高, 宽]` 或单个边长，返回 (宽, 高)
fn parse_imgsz(text: &str) -> Option<(u32, u32)> {
  let sides = text
    .trim_matches(|c: char| c == '[' || c == ']' || c.is_whitespace())
    .split(',')
    .map(|v| v.trim().parse::<u32>().ok().filter(|&v| v > 0))
    .collect::<Option<Vec<_>>>()?;

  match sides[..] {
    [side] => Some((side, side)),
    [height, width] => Some((width, height)),
    _ => None,
  }
}

pub struct YoloOnnx {
  session: Mutex<Session>,
  names: LabelMap,
  confidence: f32,
  iou: f32,
  input_width: u32,
  input_height: u32,
  max_detections: usize,
}

impl YoloOnnx {
  pub fn names(&self) -> &LabelMap {
    &self.names
  }

  fn run_session(&self, input: Array4<f32>) -> Result<(Vec<usize>, Vec<f32>), YoloError> {
    let tensor = Tensor::from_array(input)?;
    let mut session = self.session.lock().map_err(|_| YoloError::SessionPoisoned)?;
    let output_name = session.outputs[0].name.clone();
    let outputs = session.run(ort::inputs![tensor])?;
    let output = outputs
      .get(output_name.as_str())
      .ok_or_else(|| YoloError::OutputShape(format!("缺少输出 {}", output_name)))?;
    let (shape, data) = output.try_extract_tensor::<f32>()?;
    let dims = shape.iter().map(|&d| d.max(0) as usize).collect();
    Ok((dims, data.to_vec()))
  }
}

impl Model for YoloOnnx {
  type Input = RgbImage;
  type Output = DetectResult;
  type Error = YoloError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    if input.width() == 0 || input.height() == 0 {
      warn!("输入图像为空，跳过推理");
      return Ok(DetectResult::new(Vec::new(), self.names.clone()));
    }

    debug!("预处理输入图像");
    let (tensor, letterbox) = letterbox(input, self.input_width, self.input_height);

    debug!("执行模型推理");
    let (dims, data) = self.run_session(tensor)?;
    debug!("模型输出形状: {:?}", dims);

    debug!("后处理模型输出");
    let candidates = decode(&data, &dims, self.confidence)?;
    debug!("置信度过滤后候选框 {} 个", candidates.len());
    let kept = nms(candidates, self.iou, self.max_detections);

    let items: Vec<Detection> = kept
      .into_iter()
      .map(|c| {
        Detection::new(
          letterbox.unmap(c.bbox),
          c.score,
          c.class_id,
          self.names.name(c.class_id),
        )
      })
      .collect();

    debug!("检测到 {} 个物体", items.len());
    Ok(DetectResult::new(items, self.names.clone()))
  }
}

/// 等比缩放并居中填充的变换参数
#[derive(Debug, Clone, Copy, PartialEq)]
struct Letterbox {
  scale: f32,
  pad_x: f32,
  pad_y: f32,
  width: f32,
  height: f32,
}

impl Letterbox {
  fn new(width: u32, height: u32, target_w: u32, target_h: u32) -> (Self, u32, u32) {
    let scale = (target_h as f32 / height as f32).min(target_w as f32 / width as f32);
    let new_w = ((width as f32 * scale).round() as u32).clamp(1, target_w);
    let new_h = ((height as f32 * scale).round() as u32).clamp(1, target_h);
    let pad_x = ((target_w - new_w) as f32 / 2.0 - 0.1).round().max(0.0);
    let pad_y = ((target_h - new_h) as f32 / 2.0 - 0.1).round().max(0.0);
    let letterbox = Letterbox {
      scale,
      pad_x,
      pad_y,
      width: width as f32,
      height: height as f32,
    };
    (letterbox, new_w, new_h)
  }

  /// 模型坐标映射回原图坐标
  fn unmap(&self, bbox: [f32; 4]) -> [f32; 4] {
    [
      ((bbox[0] - self.pad_x) / self.scale).clamp(0.0, self.width),
      ((bbox[1] - self.pad_y) / self.scale).clamp(0.0, self.height),
      ((bbox[2] - self.pad_x) / self.scale).clamp(0.0, self.width),
      ((bbox[3] - self.pad_y) / self.scale).clamp(0.0, self.height),
    ]
  }
}

fn letterbox(image: &RgbImage, target_w: u32, target_h: u32) -> (Array4<f32>, Letterbox) {
  let (letterbox, new_w, new_h) =
    Letterbox::new(image.width(), image.height(), target_w, target_h);
  let resized = imageops::resize(image, new_w, new_h, FilterType::Triangle);

  let shape = (1, 3, target_h as usize, target_w as usize);
  let mut tensor = Array4::from_elem(shape, YOLO_PAD_VALUE);
  let (left, top) = (letterbox.pad_x as usize, letterbox.pad_y as usize);
  for (x, y, pixel) in resized.enumerate_pixels() {
    let (x, y) = (x as usize + left, y as usize + top);
    for c in 0..3 {
      tensor[[0, c, y, x]] = pixel[c] as f32 / 255.0;
    }
  }
  (tensor, letterbox)
}

#[derive(Debug, Clone, PartialEq)]
struct Candidate {
  bbox: [f32; 4],
  score: f32,
  class_id: u32,
}

/// 解析 `[1, 4+nc, N]` 或 `[1, N, 4+nc]` 形式的输出
fn decode(data: &[f32], dims: &[usize], confidence: f32) -> Result<Vec<Candidate>, YoloError> {
  if dims.len() != 3 || dims[0] != 1 {
    return Err(YoloError::OutputShape(format!(
      "期望 [1, 4+nc, N] 或 [1, N, 4+nc], 实际为 {:?}",
      dims
    )));
  }

  // 特征维总是小于候选框数量
  let feature_major = dims[1] < dims[2];
  let (features, anchors) = if feature_major {
    (dims[1], dims[2])
  } else {
    (dims[2], dims[1])
  };

  if features <= YOLO_BOX_ATTRS || data.len() != features * anchors {
    return Err(YoloError::OutputShape(format!(
      "特征维 {} 或数据长度 {} 与形状 {:?} 不符",
      features,
      data.len(),
      dims
    )));
  }

  let at = |anchor: usize, feature: usize| {
    if feature_major {
      data[feature * anchors + anchor]
    } else {
      data[anchor * features + feature]
    }
  };

  let mut candidates = Vec::new();
  for anchor in 0..anchors {
    let (class_id, score) = (YOLO_BOX_ATTRS..features)
      .map(|f| (f - YOLO_BOX_ATTRS, at(anchor, f)))
      .fold((0usize, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });

    // 严格大于阈值才保留
    if score <= confidence {
      continue;
    }

    let (cx, cy, w, h) = (at(anchor, 0), at(anchor, 1), at(anchor, 2), at(anchor, 3));
    candidates.push(Candidate {
      bbox: [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0],
      score,
      class_id: class_id as u32,
    });
  }
  Ok(candidates)
}

fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
  let ix1 = a[0].max(b[0]);
  let iy1 = a[1].max(b[1]);
  let ix2 = a[2].min(b[2]);
  let iy2 = a[3].min(b[3]);
  let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
  if inter <= 0.0 {
    return 0.0;
  }
  let area_a = (a[2] - a[0]) * (a[3] - a[1]);
  let area_b = (b[2] - b[0]) * (b[3] - b[1]);
  inter / (area_a + area_b - inter)
}

/// 按类别分别做非极大值抑制，结果按置信度降序
fn nms(mut candidates: Vec<Candidate>, iou_threshold: f32, max_detections: usize) -> Vec<Candidate> {
  candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

  let mut kept: Vec<Candidate> = Vec::new();
  for candidate in candidates {
    if kept.len() >= max_detections {
      break;
    }
    let suppressed = kept
      .iter()
      .any(|k| k.class_id == candidate.class_id && iou(&k.bbox, &candidate.bbox) > iou_threshold);
    if !suppressed {
      kept.push(candidate);
    }
  }
  kept
}

// 该文件是 Huoyan （火眼） 项目的一部分。
// src/task.rs - 任务调度
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

use std::time::Instant;

use tracing::info;

use crate::{model::Model, output::Render};

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error>;
}

/// 取第一帧，推理一次，渲染一次
pub struct OneShotTask;

impl<
  F,
  D,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: Model<Input = F, Output = D, Error = ME>,
  O: Render<F, D, Error = RE>,
> Task<I, M, O> for OneShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功，开始推理...");

    let now = Instant::now();
    let result = model.infer(&frame)?;
    info!("推理完成，耗时: {:.2?}", now.elapsed());

    let now = Instant::now();
    output.render_result(&frame, &result)?;
    info!("渲染完成，耗时: {:.2?}", now.elapsed());

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use std::cell::RefCell;

  use super::*;

  struct Double;

  impl Model for Double {
    type Input = u32;
    type Output = u32;
    type Error = std::io::Error;

    fn infer(&self, input: &u32) -> Result<u32, Self::Error> {
      Ok(input * 2)
    }
  }

  struct Failing;

  impl Model for Failing {
    type Input = u32;
    type Output = u32;
    type Error = std::io::Error;

    fn infer(&self, _: &u32) -> Result<u32, Self::Error> {
      Err(std::io::Error::other("推理失败"))
    }
  }

  #[derive(Default)]
  struct Record(RefCell<Vec<(u32, u32)>>);

  impl Render<u32, u32> for &Record {
    type Error = std::io::Error;

    fn render_result(&self, frame: &u32, result: &u32) -> Result<(), Self::Error> {
      self.0.borrow_mut().push((*frame, *result));
      Ok(())
    }
  }

  #[test]
  fn test_one_shot_uses_first_frame_only() {
    let record = Record::default();
    OneShotTask
      .run_task(vec![3, 5].into_iter(), Double, &record)
      .unwrap();
    assert_eq!(*record.0.borrow(), vec![(3, 6)]);
  }

  #[test]
  fn test_one_shot_without_frame() {
    let record = Record::default();
    let result = OneShotTask.run_task(std::iter::empty(), Double, &record);
    assert!(result.is_err());
    assert!(record.0.borrow().is_empty());
  }

  #[test]
  fn test_model_error_skips_render() {
    let record = Record::default();
    let result = OneShotTask.run_task(std::iter::once(1), Failing, &record);
    assert!(result.is_err());
    assert!(record.0.borrow().is_empty());
  }
}

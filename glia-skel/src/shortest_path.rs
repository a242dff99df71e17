//! 沿到达时间场回溯最短路径.
//!
//! 到达时间场的负梯度方向处处指向 "回到源点的最快方向", 因此从任意
//! 起点沿下降方向步进, 轨迹就是该点到源点集合的最短路径 (测地线).
//! 本模块在 [`crate::raytracing`] 的步进器之上补全判停逻辑.

use itertools::izip;
use log::warn;
use ndarray::Array2;
use ordered_float::NotNan;

use crate::raytracing::{make_stepper, StepperType};
use crate::{Idx2d, Idx2dF, Polyline};

/// 一次回溯的结果.
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    /// 路径点序列, 从起点到终点 (含两端).
    pub points: Polyline,

    /// 路径折线长度.
    pub length: f64,

    /// 是否成功到达某个源点. 为 `false` 表示回溯中途停滞或出界.
    pub reached_source: bool,
}

/// 最短路径回溯器.
#[derive(Debug, Clone, Copy)]
pub struct ShortestPath {
    stepper_type: StepperType,
    step_size: f64,
}

impl ShortestPath {
    /// 指定步进器种类与步长.
    ///
    /// # 注意
    ///
    /// `step_size` 必须为正, 否则 panic. 对 [`StepperType::Simple`]
    /// 它只影响判停阈值, 不影响跳跃距离.
    pub fn new(stepper_type: StepperType, step_size: f64) -> Self {
        assert!(step_size > 0.0, "步长必须为正");
        Self {
            stepper_type,
            step_size,
        }
    }

    /// 从 `start` 出发沿 `t` 下降, 直到到达 `sources` 之一或无法继续.
    ///
    /// 判停条件 (满足其一):
    ///
    /// 1. 步进器返回 `None` (出界);
    /// 2. 距最近源点不足一个步长: 把该源点追加为终点并标记成功;
    /// 3. 相对 10 步之前的位移不足一个步长 (停滞在局部平台);
    /// 4. 迭代数超过与网格规模挂钩的上限 (记一条 warn 日志并返回
    ///    部分路径).
    pub fn trace(&self, t: &Array2<f64>, start: Idx2dF, sources: &[Idx2d]) -> Trace {
        let (rows, cols) = t.dim();
        let stepper = make_stepper(self.stepper_type, t, self.step_size);
        let cap = (10.0 * (rows + cols) as f64 / self.step_size).ceil() as usize;

        let mut points: Polyline = vec![start];
        let mut current = start;
        let mut reached = false;

        for iter in 0.. {
            if iter >= cap {
                warn!("回溯 {cap} 步后仍未到达源点, 返回部分路径");
                break;
            }
            let Some(next) = stepper.step(current) else {
                break;
            };
            points.push(next);
            current = next;

            if let Some(src) = nearest_source(sources, next) {
                let src_f = (src.0 as f64, src.1 as f64);
                if distance(next, src_f) < self.step_size {
                    points.push(src_f);
                    reached = true;
                    break;
                }
            }
            // 与 10 步前比较, 过滤掉小幅振荡而非单步的伪位移.
            if points.len() > 10 && distance(next, points[points.len() - 11]) < self.step_size {
                break;
            }
        }

        let length = polyline_length(&points);
        Trace {
            points,
            length,
            reached_source: reached,
        }
    }
}

/// 折线长度: 相邻点欧氏距离之和.
pub fn polyline_length(points: &[Idx2dF]) -> f64 {
    izip!(points, points.iter().skip(1))
        .map(|(a, b)| distance(*a, *b))
        .sum()
}

#[inline]
fn distance(a: Idx2dF, b: Idx2dF) -> f64 {
    (a.0 - b.0).hypot(a.1 - b.1)
}

/// `sources` 中距 `point` 最近的源点.
fn nearest_source(sources: &[Idx2d], point: Idx2dF) -> Option<Idx2d> {
    sources.iter().copied().min_by_key(|&(i, j)| {
        NotNan::new((point.0 - i as f64).powi(2) + (point.1 - j as f64).powi(2)).unwrap()
    })
}

//! 前向 Euler 步进器.

use ndarray::Array2;

use super::{descent_field, in_bounds, sample_direction, Stepper};
use crate::{Idx2d, Idx2dF};

/// 前向 Euler 步进器: 每步一次方向采样, 沿该方向走固定步长.
pub struct Euler {
    fi: Array2<f64>,
    fj: Array2<f64>,
    dims: Idx2d,
    step: f64,
}

impl Euler {
    /// 在到达时间场 `t` 上预计算下降方向场.
    ///
    /// # 注意
    ///
    /// `step` 必须为正, 否则 panic.
    pub fn new(t: &Array2<f64>, step: f64) -> Self {
        assert!(step > 0.0, "步长必须为正");
        let (fi, fj) = descent_field(t);
        Self {
            fi,
            fj,
            dims: t.dim(),
            step,
        }
    }
}

impl Stepper for Euler {
    fn step(&self, point: Idx2dF) -> Option<Idx2dF> {
        if !in_bounds(point, self.dims) {
            return None;
        }
        let (di, dj) = sample_direction(&self.fi, &self.fj, point);
        let next = (point.0 + self.step * di, point.1 + self.step * dj);
        in_bounds(next, self.dims).then_some(next)
    }
}

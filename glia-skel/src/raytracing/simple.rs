//! 离散邻域下降步进器.

use itertools::iproduct;
use ndarray::Array2;
use ordered_float::NotNan;

use super::{in_bounds, Stepper};
use crate::Idx2dF;

/// 离散步进器: 不做插值, 直接在格点间跳跃.
///
/// 把当前坐标取整到最近格点, 由近及远扫描切比雪夫半径 1 到 3 的环,
/// 在第一个含有严格更低值的环上跳到该环的最小值格点. 三个环都没有
/// 更低值时原地返回取整后的格点, 由调用方判停.
///
/// 精度低于插值步进器, 但对锯齿状的到达时间场更稳健, 且无需预计算.
pub struct Simple<'a> {
    t: &'a Array2<f64>,
}

impl<'a> Simple<'a> {
    /// 直接借用到达时间场, 无预计算.
    pub fn new(t: &'a Array2<f64>) -> Self {
        Self { t }
    }
}

impl Stepper for Simple<'_> {
    fn step(&self, point: Idx2dF) -> Option<Idx2dF> {
        let (rows, cols) = self.t.dim();
        if !in_bounds(point, self.t.dim()) {
            return None;
        }
        let ci = (point.0.round() as usize).min(rows - 1);
        let cj = (point.1.round() as usize).min(cols - 1);
        let here = self.t[(ci, cj)];

        for radius in 1i64..=3 {
            let best = iproduct!(-radius..=radius, -radius..=radius)
                .filter(|&(di, dj)| di.abs().max(dj.abs()) == radius)
                .filter_map(|(di, dj)| {
                    let (ni, nj) = (ci as i64 + di, cj as i64 + dj);
                    (ni >= 0 && nj >= 0 && (ni as usize) < rows && (nj as usize) < cols)
                        .then(|| (ni as usize, nj as usize))
                })
                .min_by_key(|&pos| NotNan::new(self.t[pos]).unwrap());
            if let Some(pos) = best {
                if self.t[pos] < here {
                    return Some((pos.0 as f64, pos.1 as f64));
                }
            }
        }
        Some((ci as f64, cj as f64))
    }
}

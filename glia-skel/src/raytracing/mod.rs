//! 到达时间场上的梯度下降步进器.
//!
//! 从场内任意连续坐标出发, 沿局部下降方向逐步走向源点 (时间为 0 处).
//! 提供三种实现:
//!
//! - [`StepperType::Rk4`]: 经典四阶 Runge-Kutta, 精度最高;
//! - [`StepperType::Euler`]: 前向 Euler, 每步一次方向采样;
//! - [`StepperType::Simple`]: 纯离散的邻域下降, 不做插值.
//!
//! Rk4 与 Euler 在构造时预计算整幅下降方向场 (指向 8-邻域中下降最陡
//! 的格点的单位向量, 局部平台处为零向量), 步进时对方向做双线性插值
//! 并重新归一化.

mod euler;
mod rk4;
mod simple;

pub use euler::Euler;
pub use rk4::Rk4;
pub use simple::Simple;

use ndarray::Array2;

use crate::{Idx2d, Idx2dF};

/// 步进器种类. 上层 API 以此选择具体实现.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepperType {
    /// 四阶 Runge-Kutta.
    Rk4,

    /// 前向 Euler.
    Euler,

    /// 离散邻域下降.
    Simple,
}

/// 单步推进接口.
pub trait Stepper {
    /// 从 `point` 推进一步.
    ///
    /// 返回 `None` 表示 `point` 或推进结果超出网格, 追踪应当终止.
    /// 返回原地不动的点 (位移为零) 表示到达局部平台, 由调用方判停.
    fn step(&self, point: Idx2dF) -> Option<Idx2dF>;
}

/// 在到达时间场 `t` 上构造指定种类的步进器.
///
/// `step_size` 对 [`StepperType::Simple`] 无效 (它总是整格跳跃).
pub fn make_stepper(
    kind: StepperType,
    t: &Array2<f64>,
    step_size: f64,
) -> Box<dyn Stepper + '_> {
    match kind {
        StepperType::Rk4 => Box::new(Rk4::new(t, step_size)),
        StepperType::Euler => Box::new(Euler::new(t, step_size)),
        StepperType::Simple => Box::new(Simple::new(t)),
    }
}

/// 连续坐标是否落在网格内 (含边界格点).
fn in_bounds((pi, pj): Idx2dF, (rows, cols): Idx2d) -> bool {
    pi >= 0.0 && pj >= 0.0 && pi <= (rows - 1) as f64 && pj <= (cols - 1) as f64
}

/// 预计算下降方向场.
///
/// 每个格点取 8-邻域中坡度 (值差除以几何距离) 最大且为正的邻居,
/// 存储指向它的单位向量; 无更低邻居 (局部极小或平台) 时为零向量.
fn descent_field(t: &Array2<f64>) -> (Array2<f64>, Array2<f64>) {
    let (rows, cols) = t.dim();
    let mut fi = Array2::zeros((rows, cols));
    let mut fj = Array2::zeros((rows, cols));
    for ((i, j), &center) in t.indexed_iter() {
        let mut best_slope = 0.0;
        let mut best = (0.0, 0.0);
        for di in -1i64..=1 {
            for dj in -1i64..=1 {
                if di == 0 && dj == 0 {
                    continue;
                }
                let (ni, nj) = (i as i64 + di, j as i64 + dj);
                if ni < 0 || nj < 0 || ni as usize >= rows || nj as usize >= cols {
                    continue;
                }
                let dist = ((di * di + dj * dj) as f64).sqrt();
                let slope = (center - t[(ni as usize, nj as usize)]) / dist;
                if slope > best_slope {
                    best_slope = slope;
                    best = (di as f64 / dist, dj as f64 / dist);
                }
            }
        }
        fi[(i, j)] = best.0;
        fj[(i, j)] = best.1;
    }
    (fi, fj)
}

/// 边缘钳制的双线性插值.
fn interpolate(field: &Array2<f64>, (pi, pj): Idx2dF) -> f64 {
    let (rows, cols) = field.dim();
    let pi = pi.clamp(0.0, (rows - 1) as f64);
    let pj = pj.clamp(0.0, (cols - 1) as f64);
    let (i0, j0) = (pi.floor() as usize, pj.floor() as usize);
    let (i1, j1) = ((i0 + 1).min(rows - 1), (j0 + 1).min(cols - 1));
    let (wi, wj) = (pi - i0 as f64, pj - j0 as f64);
    field[(i0, j0)] * (1.0 - wi) * (1.0 - wj)
        + field[(i0, j1)] * (1.0 - wi) * wj
        + field[(i1, j0)] * wi * (1.0 - wj)
        + field[(i1, j1)] * wi * wj
}

/// 在连续坐标处采样归一化的下降方向.
///
/// 范数加 `f64::EPSILON` 以避免平台区的除零; 平台处返回零向量.
fn sample_direction(fi: &Array2<f64>, fj: &Array2<f64>, p: Idx2dF) -> Idx2dF {
    let di = interpolate(fi, p);
    let dj = interpolate(fj, p);
    let norm = (di * di + dj * dj).sqrt() + f64::EPSILON;
    (di / norm, dj / norm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    /// 以 (0, 0) 为圆心的径向距离场.
    pub(super) fn radial_field(n: usize) -> Array2<f64> {
        Array2::from_shape_fn((n, n), |(i, j)| (i as f64).hypot(j as f64))
    }

    /// 径向场内部的下降方向指向对角线 (坡度最陡).
    #[test]
    fn test_descent_field_diagonal() {
        let (fi, fj) = descent_field(&radial_field(64));
        let inv_sqrt2 = 1.0 / std::f64::consts::SQRT_2;
        assert!((fi[(40, 40)] + inv_sqrt2).abs() < 1e-12);
        assert!((fj[(40, 40)] + inv_sqrt2).abs() < 1e-12);
    }

    /// 常数场没有下降方向, 方向场处处为零.
    #[test]
    fn test_descent_field_plateau() {
        let t = Array2::from_elem((8, 8), 3.0);
        let (fi, fj) = descent_field(&t);
        assert!(fi.iter().chain(fj.iter()).all(|&v| v == 0.0));
    }

    /// 双线性插值: 格点处精确取值, 格点之间为加权平均.
    #[test]
    fn test_interpolate() {
        let field = Array2::from_shape_fn((4, 4), |(i, j)| (i * 4 + j) as f64);
        assert_eq!(interpolate(&field, (2.0, 3.0)), 11.0);
        assert!((interpolate(&field, (1.5, 1.5)) - 7.5).abs() < 1e-12);
        // 出界坐标被钳制到边缘.
        assert_eq!(interpolate(&field, (-1.0, 0.0)), 0.0);
        assert_eq!(interpolate(&field, (9.0, 9.0)), 15.0);
    }

    /// 边界判定包含边缘格点本身.
    #[test]
    fn test_in_bounds() {
        assert!(in_bounds((0.0, 0.0), (4, 4)));
        assert!(in_bounds((3.0, 3.0), (4, 4)));
        assert!(!in_bounds((3.1, 2.0), (4, 4)));
        assert!(!in_bounds((-0.1, 2.0), (4, 4)));
    }
}

//! 一阶 / 二阶 upwind 差分 stencil 与局部到达时间候选值.
//!
//! stencil 方向固定为 4 个: 行方向, 列方向, 主对角 (↖↘), 副对角 (↗↙).
//! 前两个是 axis 方向, 后两个是 cross 方向. 每个方向从两个相对的已冻结
//! 邻居中取较小值作为一阶导数近似; 二阶修正在单调逼近时向外多看一格.

use ndarray::Array2;

use super::quadratic::roots;
use crate::consts::{CROSS_WEIGHT, EPS, SECOND_ORDER_WEIGHT};
use crate::Idx2d;

/// 若 `(i, j)` 在界内且已冻结, 返回其到达时间, 否则返回 `+inf`.
#[inline]
fn frozen_time(t: &Array2<f64>, frozen: &Array2<u8>, i: i64, j: i64) -> f64 {
    let (rows, cols) = frozen.dim();
    if i >= 0 && j >= 0 && (i as usize) < rows && (j as usize) < cols {
        let pos = (i as usize, j as usize);
        if frozen[pos] == 1 {
            return t[pos];
        }
    }
    f64::INFINITY
}

/// 4 个 stencil 方向上的导数近似与各自的阶数标志.
///
/// `order[k] == 0` 表示方向 `k` 没有任何可用的已冻结邻居,
/// 该方向不参与系数累加; 1 / 2 分别对应一阶与二阶权重.
/// 这个三值区分是必要的: 系数累加必须知道加一阶项还是二阶项, 但绝不能两者都加.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct StencilDerivative {
    /// 一阶近似值 (方向无可用邻居时内容无意义, 以 `order` 为准).
    pub tm: [f64; 4],

    /// 每个方向的阶数: 0 (不可用), 1 或 2.
    pub order: [u8; 4],
}

/// 以目标点为中心的一阶 8-邻域 stencil.
pub(crate) struct FirstOrderStencil {
    up: f64,
    down: f64,
    left: f64,
    right: f64,
    up_left: f64,
    down_right: f64,
    up_right: f64,
    down_left: f64,
}

impl FirstOrderStencil {
    pub fn new(t: &Array2<f64>, frozen: &Array2<u8>, (i, j): Idx2d) -> Self {
        let (i, j) = (i as i64, j as i64);
        Self {
            up: frozen_time(t, frozen, i - 1, j),
            down: frozen_time(t, frozen, i + 1, j),
            left: frozen_time(t, frozen, i, j - 1),
            right: frozen_time(t, frozen, i, j + 1),
            up_left: frozen_time(t, frozen, i - 1, j - 1),
            down_right: frozen_time(t, frozen, i + 1, j + 1),
            up_right: frozen_time(t, frozen, i - 1, j + 1),
            down_left: frozen_time(t, frozen, i + 1, j - 1),
        }
    }

    /// 每个方向取两个相对邻居值的较小者; 有限即记一阶.
    pub fn derivative(&self) -> StencilDerivative {
        let mut d = StencilDerivative::default();
        for (k, (a, b)) in self.pairs().into_iter().enumerate() {
            d.tm[k] = a.min(b);
            if d.tm[k].is_finite() {
                d.order[k] = 1;
            }
        }
        d
    }

    /// 4 个方向的相对邻居值对, 方向顺序与 [`StencilDerivative`] 一致.
    #[inline]
    fn pairs(&self) -> [(f64, f64); 4] {
        [
            (self.up, self.down),
            (self.left, self.right),
            (self.up_left, self.down_right),
            (self.up_right, self.down_left),
        ]
    }
}

/// 二阶 stencil: 在每个方向上向外多看一格 (距离 2 的邻居).
pub(crate) struct SecondOrderStencil {
    /// 每个方向两侧的远邻居值, 与 [`FirstOrderStencil::pairs`] 一一对应.
    far: [(f64, f64); 4],
}

impl SecondOrderStencil {
    pub fn new(t: &Array2<f64>, frozen: &Array2<u8>, (i, j): Idx2d) -> Self {
        let (i, j) = (i as i64, j as i64);
        Self {
            far: [
                (
                    frozen_time(t, frozen, i - 2, j),
                    frozen_time(t, frozen, i + 2, j),
                ),
                (
                    frozen_time(t, frozen, i, j - 2),
                    frozen_time(t, frozen, i, j + 2),
                ),
                (
                    frozen_time(t, frozen, i - 2, j - 2),
                    frozen_time(t, frozen, i + 2, j + 2),
                ),
                (
                    frozen_time(t, frozen, i - 2, j + 2),
                    frozen_time(t, frozen, i + 2, j - 2),
                ),
            ],
        }
    }

    /// 对一阶结果做二阶单侧修正, 就地升级可修正方向的阶数标志.
    ///
    /// 返回每个方向的二阶近似值 (未升级的方向内容无意义).
    pub fn refine(&self, first: &FirstOrderStencil, d: &mut StencilDerivative) -> [f64; 4] {
        let mut tm2 = [0.0; 4];
        for (k, (&(far_a, far_b), (near_a, near_b))) in
            self.far.iter().zip(first.pairs()).enumerate()
        {
            if let Some(v) = one_sided(far_a, near_a, far_b, near_b) {
                tm2[k] = v;
                d.order[k] = 2;
            }
        }
        tm2
    }
}

/// 单方向的二阶单侧估计 `(4 * near - far) / 3`.
///
/// 一侧可用的条件是远邻居值严格小于近邻居值且近邻居值有限
/// (波前沿该方向单调逼近, 远邻居冻结得更早). 两侧均可用时取较小者.
fn one_sided(far_a: f64, near_a: f64, far_b: f64, near_b: f64) -> Option<f64> {
    let side = |far: f64, near: f64| {
        (far < near && near.is_finite()).then(|| (4.0 * near - far) / 3.0)
    };
    match (side(far_a, near_a), side(far_b, near_b)) {
        (Some(x), Some(y)) => Some(x.min(y)),
        (Some(x), None) | (None, Some(x)) => Some(x),
        (None, None) => None,
    }
}

/// 将方向 `k` 的 stencil 贡献按权重 `w` 累加进二次方程系数 `(a, b, c)`.
#[inline]
fn accumulate(
    coeff: &mut (f64, f64, f64),
    d: &StencilDerivative,
    tm2: &[f64; 4],
    k: usize,
    w: f64,
) {
    let (w, t) = match d.order[k] {
        1 => (w, d.tm[k]),
        2 => (w * SECOND_ORDER_WEIGHT, tm2[k]),
        _ => return,
    };
    coeff.0 += w;
    coeff.1 += -2.0 * w * t;
    coeff.2 += w * t * t;
}

/// 按 upwind stencil 求目标点 `pos` 处的到达时间候选值.
///
/// `speed` 是该点的速度值; 非正速度在内部以 [`EPS`] 为下限钳制.
/// axis 方向得到基础系数, cross 方向 (启用时) 以 [`CROSS_WEIGHT`]
/// 加权并额外带一项 `-1 / max(speed^2, EPS)`; cross 组合解只在首项
/// 系数为正时才参与取最小.
///
/// 最后的因果性保护: 若候选值不优于任何已冻结的直接邻居, 则覆盖为
/// `min(邻居) + 1 / max(speed, EPS)`. 未启用 cross 时只检查 axis 方向.
pub(crate) fn arrival_candidate(
    t: &Array2<f64>,
    frozen: &Array2<u8>,
    pos: Idx2d,
    speed: f64,
    use_second: bool,
    use_cross: bool,
) -> f64 {
    let first = FirstOrderStencil::new(t, frozen, pos);
    let mut d = first.derivative();
    let tm2 = if use_second {
        SecondOrderStencil::new(t, frozen, pos).refine(&first, &mut d)
    } else {
        [0.0; 4]
    };

    let neg_inv_f2 = -1.0 / (speed * speed).max(EPS);
    let mut coeff = (0.0, 0.0, neg_inv_f2);
    for k in 0..2 {
        accumulate(&mut coeff, &d, &tm2, k, 1.0);
    }

    let (r0, r1) = roots(coeff.0, coeff.1, coeff.2);
    let mut tt = r0.max(r1);

    if use_cross {
        coeff.2 += neg_inv_f2;
        for k in 2..4 {
            accumulate(&mut coeff, &d, &tm2, k, CROSS_WEIGHT);
        }
        if coeff.0 > 0.0 {
            let (r0, r1) = roots(coeff.0, coeff.1, coeff.2);
            tt = tt.min(r0.max(r1));
        }
    }

    let guard_dirs = if use_cross { 4 } else { 2 };
    let finite = d.tm[..guard_dirs]
        .iter()
        .copied()
        .filter(|v| v.is_finite());
    if finite.clone().any(|v| v >= tt) {
        let best = finite.fold(f64::INFINITY, f64::min);
        tt = best + 1.0 / speed.max(EPS);
    }
    tt
}

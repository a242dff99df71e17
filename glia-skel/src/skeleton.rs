//! 二值掩膜的中轴线 (skeleton) 提取.
//!
//! 流程:
//!
//! 1. 取掩膜的外侧边界壳 (3x3 膨胀与掩膜的差) 作为源点, 用 MSFM
//!    计算掩膜内每点到边界的距离场;
//! 2. 距离场的掩膜内最大值点作为种子, 并把距离场归一化后四次方
//!    作为速度场, 使波前沿掩膜中轴传播最快;
//! 3. 迭代提取分支: 每轮以当前 skeleton 为源点集合求解到达时间场
//!    及其类欧氏伴随场, 从伴随场的掩膜内最远点回溯一条新分支;
//!    分支长度低于 2 倍最大边界距离时终止;
//! 4. 整理: 当某分支的端点落在另一分支内部附近时, 在该处把后者
//!    切成两段, 使交叉结构成为干净的分段集合.

use itertools::iproduct;
use log::{debug, warn};
use ndarray::Array2;
use num::ToPrimitive;
use ordered_float::NotNan;

use crate::consts::{CONNECT_DISTANCE_SQ, SPEED_FLOOR};
use crate::msfm::{msfm2d, msfm2d_skel};
use crate::raytracing::StepperType;
use crate::shortest_path::ShortestPath;
use crate::{Idx2d, Idx2dF, Polyline, SkelError};

/// 中轴线提取器.
#[derive(Debug, Clone, Copy)]
pub struct Skeletonizer {
    stepper_type: StepperType,
    step_size: f64,
    max_branches: usize,
}

impl Default for Skeletonizer {
    fn default() -> Self {
        Self {
            stepper_type: StepperType::Rk4,
            step_size: 1.0,
            max_branches: 1000,
        }
    }
}

impl Skeletonizer {
    /// 指定回溯用的步进器种类与步长.
    ///
    /// # 注意
    ///
    /// `step_size` 必须为正, 否则 panic.
    pub fn new(stepper_type: StepperType, step_size: f64) -> Self {
        assert!(step_size > 0.0, "步长必须为正");
        Self {
            stepper_type,
            step_size,
            ..Self::default()
        }
    }

    /// 调整分支数上限. 超过上限时停止提取并记一条 warn 日志.
    pub fn with_max_branches(mut self, max_branches: usize) -> Self {
        self.max_branches = max_branches;
        self
    }

    /// 提取 `mask` 的中轴线, 返回整理后的分段集合.
    ///
    /// 掩膜过于紧凑 (不存在长度达到 2 倍最大边界距离的分支) 时
    /// 返回空集合, 这不是错误.
    ///
    /// # 返回值
    ///
    /// - [`SkelError::EmptyMask`]: 掩膜中没有任何前景像素;
    /// - [`SkelError::NonFiniteMaximum`]: 距离场 (边界距离或伴随场)
    ///   在掩膜内的最大值非有限.
    pub fn skeletonize(&self, mask: &Array2<bool>) -> Result<Vec<Polyline>, SkelError> {
        let dims = mask.dim();
        let dist = boundary_distance(mask);
        let (seed, maxd) = max_distance_point(&dist, mask)?;
        debug!("种子 {seed:?}, 最大边界距离 {maxd:.3}");

        // 距离归一化后四次方: 中轴附近速度接近 1, 靠近边界急剧衰减.
        let speed = dist.mapv(|d| (d / maxd).powi(4).max(SPEED_FLOOR));

        let tracer = ShortestPath::new(self.stepper_type, self.step_size);
        let mut sources = vec![seed];
        let mut skeleton: Vec<Polyline> = Vec::new();

        for branch in 0.. {
            if branch >= self.max_branches {
                warn!("分支数达到上限 {}, 提前终止", self.max_branches);
                break;
            }
            let (t, euclid) = msfm2d_skel(&speed, &sources, false, false);
            let (start, _) = max_distance_point(&euclid, mask)?;
            let trace = tracer.trace(&t, (start.0 as f64, start.1 as f64), &sources);
            debug!("分支 {branch}: 长度 {:.3}, 阈值 {:.3}", trace.length, 2.0 * maxd);
            if trace.length < 2.0 * maxd {
                break;
            }
            sources.extend(trace.points.iter().map(|&p| round_to_grid(p, dims)));
            skeleton.push(trace.points);
        }
        Ok(organize_skeleton(skeleton))
    }
}

/// 掩膜外侧的边界壳: 8-邻域内含前景的背景格点.
fn boundary_shell(mask: &Array2<bool>) -> Vec<Idx2d> {
    let (rows, cols) = mask.dim();
    mask.indexed_iter()
        .filter(|&(_, &m)| !m)
        .filter(|&((i, j), _)| {
            iproduct!(-1i64..=1, -1i64..=1).any(|(di, dj)| {
                let (ni, nj) = (i as i64 + di, j as i64 + dj);
                ni >= 0
                    && nj >= 0
                    && (ni as usize) < rows
                    && (nj as usize) < cols
                    && mask[(ni as usize, nj as usize)]
            })
        })
        .map(|(pos, _)| pos)
        .collect()
}

/// 掩膜内每点到边界壳的距离场 (掩膜外清零).
fn boundary_distance(mask: &Array2<bool>) -> Array2<f64> {
    let shell = boundary_shell(mask);
    let ones = Array2::from_elem(mask.dim(), 1.0);
    let mut dist = msfm2d(&ones, &shell, false, true);
    for (d, &m) in dist.iter_mut().zip(mask.iter()) {
        if !m {
            *d = 0.0;
        }
    }
    dist
}

/// 场在掩膜内的最大值点及其取值.
///
/// 同值时返回行优先序最靠前的点.
fn max_distance_point(
    field: &Array2<f64>,
    mask: &Array2<bool>,
) -> Result<(Idx2d, f64), SkelError> {
    let mut best: Option<(Idx2d, f64)> = None;
    for (pos, &d) in field.indexed_iter() {
        if !mask[pos] {
            continue;
        }
        if best.map_or(true, |(_, bd)| d > bd) {
            best = Some((pos, d));
        }
    }
    let (pos, maxd) = best.ok_or(SkelError::EmptyMask)?;
    if !maxd.is_finite() {
        return Err(SkelError::NonFiniteMaximum);
    }
    Ok((pos, maxd))
}

/// 连续路径点取整到最近的界内格点.
fn round_to_grid(p: Idx2dF, (rows, cols): Idx2d) -> Idx2d {
    let i = p.0.round().to_usize().unwrap_or(0).min(rows - 1);
    let j = p.1.round().to_usize().unwrap_or(0).min(cols - 1);
    (i, j)
}

/// 整理分段: 其他分段的端点靠近某分段内部时, 在该分段上距端点
/// 最近的点处切开.
///
/// 每个外来端点在分段上取距离最近的点作为候选切点, 平方距离小于
/// [`CONNECT_DISTANCE_SQ`] 且切点距分段两端都超过 2 个点时才记录;
/// 最近点落在端点保护区内时整个端点不触发切割. 每个分段只按排序
/// 去重后的切点集合切一次, 切点同时保留在相邻两段中, 因此分段集合
/// 始终覆盖原始路径.
fn organize_skeleton(segments: Vec<Polyline>) -> Vec<Polyline> {
    let mut result = Vec::new();
    for (si, seg) in segments.iter().enumerate() {
        let mut cuts: Vec<usize> = segments
            .iter()
            .enumerate()
            .filter(|&(oi, _)| oi != si)
            .flat_map(|(_, other)| [other.first(), other.last()])
            .flatten()
            .filter_map(|&e| closest_index(seg, e))
            .filter(|&(k, d2)| d2 < CONNECT_DISTANCE_SQ && 2 < k && k + 2 < seg.len())
            .map(|(k, _)| k)
            .collect();
        cuts.sort_unstable();
        cuts.dedup();

        let mut from = 0;
        for &k in &cuts {
            result.push(seg[from..=k].to_vec());
            from = k;
        }
        result.push(seg[from..].to_vec());
    }
    result
}

/// `seg` 上距 `e` 最近的点的索引及平方距离.
fn closest_index(seg: &[Idx2dF], e: Idx2dF) -> Option<(usize, f64)> {
    seg.iter()
        .enumerate()
        .map(|(k, p)| (k, (p.0 - e.0).powi(2) + (p.1 - e.1).powi(2)))
        .min_by_key(|&(_, d2)| NotNan::new(d2).unwrap())
}

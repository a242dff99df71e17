//! Multistencil Fast Marching Method (MSFM) 2D 求解器.
//!
//! 给定速度场与一组源点, 计算每个格点的最短到达时间 (Eikonal 方程的
//! 网格解). 相比经典 Fast Marching, MSFM 可选地引入二阶单侧差分与
//! 对角 (cross) stencil 以提高精度.
//!
//! 算法是 Dijkstra 式的单遍波前传播: 源点以时间 0 冻结, narrow band
//! (候选边界) 放在最小堆中, 每次弹出时间最小的点冻结, 并松弛其未冻结
//! 的 4-邻居. 冻结是不可撤销的; 堆中允许过期条目, 弹出时惰性丢弃.
//!
//! 未到达的格点保持哨兵值 [`UNVISITED`] (`-1.0`), 不视为错误.

mod quadratic;

mod stencil;

pub use quadratic::roots;

use binary_heap_plus::BinaryHeap;
use ndarray::Array2;

use crate::consts::{EPS, UNVISITED};
use crate::Idx2d;

/// 4-邻域偏移.
const N4: [(i64, i64); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// `pos` 在 `dims` 界内的 4-邻居.
pub(crate) fn n4_positions(
    (i, j): Idx2d,
    (rows, cols): Idx2d,
) -> impl Iterator<Item = Idx2d> {
    N4.iter().filter_map(move |&(di, dj)| {
        let (ni, nj) = (i as i64 + di, j as i64 + dj);
        (ni >= 0 && nj >= 0 && (ni as usize) < rows && (nj as usize) < cols)
            .then(|| (ni as usize, nj as usize))
    })
}

/// 计算从源点集合出发的最短到达时间场.
///
/// `speed` 中的值应当严格为正; 非正值不是错误, 在内部以 [`EPS`]
/// 为下限钳制, 对应区域的到达时间会大到等效于不可通行.
///
/// `use_second` 启用二阶单侧差分, `use_cross` 启用对角 stencil.
///
/// # 注意
///
/// 1. 源点必须在网格界内, 否则 panic. 允许重复源点.
/// 2. 源点集合为空时, 返回的场全部为哨兵值 [`UNVISITED`].
pub fn msfm2d(
    speed: &Array2<f64>,
    sources: &[Idx2d],
    use_second: bool,
    use_cross: bool,
) -> Array2<f64> {
    march(speed, sources, use_second, use_cross, false).0
}

/// 与 [`msfm2d`] 相同, 但同时返回伴随的类欧氏距离场.
///
/// 伴随场用与主场完全相同的 stencil 机制松弛, 但速度恒为 1.0,
/// 因此近似 "从源点出发的欧氏距离", 与真实速度下的到达时间场解耦.
/// skeleton 提取用它来选取下一个分支的起点.
pub fn msfm2d_skel(
    speed: &Array2<f64>,
    sources: &[Idx2d],
    use_second: bool,
    use_cross: bool,
) -> (Array2<f64>, Array2<f64>) {
    let (t, e) = march(speed, sources, use_second, use_cross, true);
    debug_assert!(e.is_some());
    (t, e.unwrap_or_default())
}

/// 波前传播主循环.
fn march(
    speed: &Array2<f64>,
    sources: &[Idx2d],
    use_second: bool,
    use_cross: bool,
    with_euclidean: bool,
) -> (Array2<f64>, Option<Array2<f64>>) {
    let dims = speed.dim();
    assert!(
        sources.iter().all(|&(i, j)| i < dims.0 && j < dims.1),
        "源点越界"
    );

    let mut t = Array2::from_elem(dims, UNVISITED);
    let mut frozen = Array2::<u8>::zeros(dims);
    let mut euclid = with_euclidean.then(|| Array2::from_elem(dims, UNVISITED));

    // 最小堆: 堆顶是 narrow band 中暂定时间最小的条目.
    let mut band: BinaryHeap<(f64, Idx2d), _> =
        BinaryHeap::new_by(|a: &(f64, Idx2d), b: &(f64, Idx2d)| b.0.total_cmp(&a.0));
    band.reserve(64);

    for &pos in sources {
        frozen[pos] = 1;
        t[pos] = 0.0;
        if let Some(e) = euclid.as_mut() {
            e[pos] = 0.0;
        }
    }

    // 源点的直接邻居以 `1 / max(f, EPS)` 进入 narrow band,
    // 多次进入时只保留最小的暂定时间.
    for &src in sources {
        for pos in n4_positions(src, dims) {
            if frozen[pos] == 1 {
                continue;
            }
            let tv = 1.0 / speed[pos].max(EPS);
            if t[pos] == UNVISITED || tv < t[pos] {
                t[pos] = tv;
                band.push((tv, pos));
                if let Some(e) = euclid.as_mut() {
                    e[pos] = 1.0;
                }
            }
        }
    }

    while let Some((tv, pos)) = band.pop() {
        // 过期条目: 弹出时已冻结, 直接丢弃.
        if frozen[pos] == 1 {
            continue;
        }
        frozen[pos] = 1;
        t[pos] = tv;

        for npos in n4_positions(pos, dims) {
            if frozen[npos] == 1 {
                continue;
            }
            let cand =
                stencil::arrival_candidate(&t, &frozen, npos, speed[npos], use_second, use_cross);
            if t[npos] == UNVISITED || cand < t[npos] {
                t[npos] = cand;
                band.push((cand, npos));
                if let Some(e) = euclid.as_mut() {
                    e[npos] =
                        stencil::arrival_candidate(e, &frozen, npos, 1.0, use_second, use_cross);
                }
            }
        }
    }
    (t, euclid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    /// 101x101 均匀速度场, 源点位于 (51, 51).
    fn uniform_field() -> (Array2<f64>, Vec<Idx2d>) {
        (Array2::from_elem((101, 101), 1.0), vec![(51, 51)])
    }

    /// 与真实欧氏距离的平均绝对误差.
    fn mean_abs_error(t: &Array2<f64>, (si, sj): Idx2d) -> f64 {
        let mut sum = 0.0;
        for ((i, j), &v) in t.indexed_iter() {
            let d = ((i as f64 - si as f64).powi(2) + (j as f64 - sj as f64).powi(2)).sqrt();
            sum += (v - d).abs();
        }
        sum / t.len() as f64
    }

    /// 均匀速度场中, 源点时间为 0, 其 4-邻居的到达时间恰为 1.0.
    #[test]
    fn test_adjacent_arrival_is_exact() {
        let (speed, sources) = uniform_field();
        let t = msfm2d(&speed, &sources, false, true);
        assert_eq!(t[(51, 51)], 0.0);
        for pos in [(50, 51), (52, 51), (51, 50), (51, 52)] {
            assert_eq!(t[pos], 1.0);
        }
    }

    /// 因果不变量: 每个时间为正的格点存在时间严格更小的 4-邻居.
    #[test]
    fn test_causality_invariant() {
        let speed = Array2::from_elem((41, 41), 1.0);
        let t = msfm2d(&speed, &[(20, 20)], false, false);
        for ((i, j), &v) in t.indexed_iter() {
            if v <= 0.0 {
                continue;
            }
            assert!(
                n4_positions((i, j), t.dim()).any(|p| t[p] < v),
                "({i}, {j}) 没有时间更小的邻居"
            );
        }
    }

    /// 波前从源点向外单调扩张: 时间随切比雪夫环半径非降.
    #[test]
    fn test_radially_non_decreasing() {
        let speed = Array2::from_elem((41, 41), 1.0);
        let t = msfm2d(&speed, &[(20, 20)], false, true);
        let ring_min = |r: usize| -> f64 {
            t.indexed_iter()
                .filter(|&((i, j), _)| {
                    i.abs_diff(20).max(j.abs_diff(20)) == r
                })
                .map(|(_, &v)| v)
                .fold(f64::INFINITY, f64::min)
        };
        let ring_max = |r: usize| -> f64 {
            t.indexed_iter()
                .filter(|&((i, j), _)| {
                    i.abs_diff(20).max(j.abs_diff(20)) == r
                })
                .map(|(_, &v)| v)
                .fold(f64::NEG_INFINITY, f64::max)
        };
        for r in 1..20 {
            // 外环最小值不会低于内环最小值; 允许 stencil 离散误差.
            assert!(ring_min(r + 1) + 1e-9 >= ring_min(r));
            assert!(ring_max(r).is_finite());
        }
    }

    /// 二阶差分与 cross 邻居都应当降低对欧氏距离的平均误差.
    #[test]
    fn test_accuracy_ordering() {
        let (speed, sources) = uniform_field();
        let e_first = mean_abs_error(&msfm2d(&speed, &sources, false, false), (51, 51));
        let e_second = mean_abs_error(&msfm2d(&speed, &sources, true, false), (51, 51));
        let e_cross = mean_abs_error(&msfm2d(&speed, &sources, false, true), (51, 51));
        assert!(e_first < 1.0);
        assert!(e_second < e_first);
        assert!(e_cross < e_first);
    }

    /// 速度恒 1 时, 伴随场与主场逐点一致.
    #[test]
    fn test_euclidean_companion_matches_uniform() {
        let speed = Array2::from_elem((31, 31), 1.0);
        let (t, e) = msfm2d_skel(&speed, &[(15, 15)], false, false);
        for (pos, &tv) in t.indexed_iter() {
            assert!((tv - e[pos]).abs() < 1e-9);
        }
    }

    /// 近零速度的屏障: 墙另一侧的到达时间大到等效不可通行.
    #[test]
    fn test_barrier_is_effectively_unreachable() {
        let mut speed = Array2::from_elem((21, 21), 1.0);
        for i in 0..21 {
            speed[(i, 10)] = 0.0;
        }
        let t = msfm2d(&speed, &[(10, 2)], false, false);
        assert!(t[(10, 8)] < 100.0);
        assert!(t[(10, 15)] > 1e10);
    }

    /// 多个源点: 每个点的时间由最近的源决定.
    #[test]
    fn test_multiple_sources() {
        let speed = Array2::from_elem((21, 21), 1.0);
        let t = msfm2d(&speed, &[(2, 2), (18, 18)], false, true);
        assert_eq!(t[(2, 2)], 0.0);
        assert_eq!(t[(18, 18)], 0.0);
        // 两源中点处的时间远小于单源时的情形要求的对角距离.
        assert!(t[(2, 3)] == 1.0 && t[(17, 18)] == 1.0);
        assert!(t[(10, 10)] < t[(2, 2)] + 16.0);
    }

    /// 空源点集合: 场保持哨兵值.
    #[test]
    fn test_no_sources() {
        let speed = Array2::from_elem((5, 5), 1.0);
        let t = msfm2d(&speed, &[], false, false);
        assert!(t.iter().all(|&v| v == crate::consts::UNVISITED));
    }

    /// 源点越界触发 panic.
    #[test]
    #[should_panic(expected = "源点越界")]
    fn test_out_of_bounds_source_panics() {
        let speed = Array2::from_elem((5, 5), 1.0);
        let _ = msfm2d(&speed, &[(5, 0)], false, false);
    }
}

//! MSFM 专用的一元二次方程求根.

/// 求解 `a * x^2 + b * x + c = 0` 的两个实根.
///
/// 判别式被钳制为非负, 因此不会出现复根; 负判别式退化为顶点处的重根.
/// 当 `a == 0` 时按线性/退化情况处理, 两个 "根" 分别通过
/// `2c / (-b ∓ √d)` 计算; 分母恰好为零的一侧返回 `f64::INFINITY`,
/// 向调用方表示该分支上不存在有效的前向解 (调用方应偏好有限根,
/// 或退回基于邻居的下限).
///
/// 该函数从不 panic, 所有退化情况都确定性地落到有限或无穷的浮点值.
pub fn roots(a: f64, b: f64, c: f64) -> (f64, f64) {
    let d = (b * b - 4.0 * a * c).max(0.0);
    let sqrt_d = d.sqrt();

    if a != 0.0 {
        ((-b - sqrt_d) / (2.0 * a), (-b + sqrt_d) / (2.0 * a))
    } else {
        let linear = |den: f64| {
            if den != 0.0 {
                (2.0 * c) / den
            } else {
                f64::INFINITY
            }
        };
        (linear(-b - sqrt_d), linear(-b + sqrt_d))
    }
}

#[cfg(test)]
mod tests {
    use super::roots;

    /// 普通二次方程: `x^2 - 3x + 2` 的根为 1 和 2.
    #[test]
    fn test_roots_quadratic() {
        let (r0, r1) = roots(1.0, -3.0, 2.0);
        assert_eq!(r0, 1.0);
        assert_eq!(r1, 2.0);
    }

    /// 负判别式被钳制: `x^2 + 1` 返回顶点处的重根 0.
    #[test]
    fn test_roots_clamped_discriminant() {
        let (r0, r1) = roots(1.0, 0.0, 1.0);
        assert_eq!(r0, 0.0);
        assert_eq!(r1, 0.0);
    }

    /// 退化 (线性) 情况: `-x + 2` 的有效根为 2, 另一分支为无穷.
    #[test]
    fn test_roots_degenerate_linear() {
        let (r0, r1) = roots(0.0, -1.0, 2.0);
        assert!(r0.is_infinite());
        assert_eq!(r1, 2.0);
    }

    /// 完全退化: `a == b == 0` 时两个分母均为零, 两根皆为无穷.
    #[test]
    fn test_roots_fully_degenerate() {
        let (r0, r1) = roots(0.0, 0.0, 3.0);
        assert!(r0.is_infinite());
        assert!(r1.is_infinite());
    }

    /// 线性情况下判别式非零: 两个分支给出对称的结果.
    #[test]
    fn test_roots_linear_both_branches() {
        // d = 16, sqrt_d = 4; 分母分别为 -4 - 4 与 -4 + 4.
        let (r0, r1) = roots(0.0, 4.0, 8.0);
        assert_eq!(r0, -2.0);
        assert!(r1.is_infinite());
    }
}

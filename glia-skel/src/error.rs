//! 运行时错误.

/// skeleton 提取的运行时错误.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkelError {
    /// 掩膜中不存在任何前景像素.
    EmptyMask,

    /// 种子选择阶段, 掩膜内距离场的全局最大值非有限.
    /// 说明掩膜或距离场已损坏, 继续计算只会产生垃圾.
    NonFiniteMaximum,
}

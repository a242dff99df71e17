//! 通用常量.

/// IEEE-754 双精度机器精度. 用作速度的除法下限.
pub const EPS: f64 = 2.2204460492503131e-16;

/// 对角 (cross) stencil 方向的系数权重.
pub const CROSS_WEIGHT: f64 = 0.5;

/// 二阶单侧差分的系数权重, 即 `(3/2)^2`.
pub const SECOND_ORDER_WEIGHT: f64 = 2.25;

/// skeleton 速度场的严格正下限.
/// 保证 MSFM 永不除零, 同时让低距离区域几乎不可通行.
pub const SPEED_FLOOR: f64 = 1e-10;

/// organize 阶段分支切割的距离阈值 (平方, 单位: 格点^2).
pub const CONNECT_DISTANCE_SQ: f64 = 4.0;

/// 到达时间场中 "尚未计算" 的哨兵值.
pub const UNVISITED: f64 = -1.0;

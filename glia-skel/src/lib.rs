#![warn(missing_docs)]

//! 核心库. 对显微镜图像分割得到的二值掩膜 (细胞/血管等) 提取亚像素精度的
//! 中轴线 (skeleton), 基于 Multistencil Fast Marching Method (MSFM).
//!
//! 整体流程:
//!
//! 1. 从对象边界壳出发运行 MSFM, 得到每个前景像素到边界的距离场;
//! 2. 以距离最大点为 medial 种子, 用归一化距离的 4 次方构建速度场;
//! 3. 反复 "MSFM 传播 -> 最远点回溯最短路径 -> 判定分支长度",
//!    直到新分支短于最大血管直径;
//! 4. 将找到的分支折线在互相接近处切开, 得到互不重叠的 skeleton 分支.
//!
//! # 注意
//!
//! 1. 本 crate 只提供严格的 2D 求解器. 3D 是独立的推广, 不在范围内.
//! 2. 在非期望情况下 (源点越界等调用方错误), 程序会直接 panic,
//!    而不会导致内存错误. As what Rust promises.
//!    可恢复的运行时错误通过 [`SkelError`] 返回.
//! 3. 速度值非正不是错误: 内部以机器精度为下限钳制, 对应区域几乎不可通行.

/// 二维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx2d = (usize, usize);

/// 高精度二维坐标 / 向量.
pub type Idx2dF = (f64, f64);

/// 一条折线: 依序排列的亚像素坐标点.
pub type Polyline = Vec<Idx2dF>;

pub mod consts;

mod error;

pub use error::SkelError;

pub mod msfm;

pub mod raytracing;

pub mod shortest_path;

pub mod skeleton;

pub mod prelude;

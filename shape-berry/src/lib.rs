#![warn(missing_docs)] // <= 合适时移除它.

//! 核心库. 提供医学影像分割结果 (3D 标签体数据) 的表面重建与
//! shape distribution 形状比较算法.
//!
//! 处理链为 "体数据 -> 表面网格 -> 形状描述子 -> 比较得分" 四级流水线,
//! 各级之间不共享可变状态, 因此多个流水线实例可以在独立输入上并行运行.
//!
//! 该 crate 目前仅提供 `safe` 接口. 将来可能为部分高性能场景关键路径提供 `unsafe` 接口.
//!
//! # 注意
//!
//! 1. 该 crate 假定输入标签体数据已经规范化: 0 为背景, 1..=K 为结构标签.
//!   DICOM 解码, 数据集格式转换等输入侧工作由外部协作者完成,
//!   本库只提供 nii 格式的直接读入.
//! 2. 在非期望情况下 (如非法面片索引), 程序会直接 panic, 而不会导致内存错误.
//!   As what Rust promises.
//!
//! # 开发计划
//!
//! ### 体数据模型与 nii 读入 ✅
//!
//! 实现位于 `shape-berry/src/data`.
//!
//! ### 表面重建 (isosurface extraction) ✅
//!
//! 在布尔标签场上运行 surface nets 算法 (marching cubes 家族成员),
//! 直接产出带索引的封闭三角网格. 输出顶点位于物理坐标系.
//!
//! 实现位于 `shape-berry/src/surface/extract.rs`.
//!
//! ### 网格修复与归一化 ✅
//!
//! 退化面片剔除, 重复顶点合并, 连通分量选择, 质心/尺度归一化.
//! 固定顺序执行, 每一步对已干净的输入幂等.
//!
//! 实现位于 `shape-berry/src/surface/sanitize.rs`.
//!
//! ### Shape distribution 描述子 ✅
//!
//! D2 (点对距离) 与 A3 (点三元组夹角) 两种分布模型,
//! 按面积均匀采样网格表面. 参考论文: "Shape Distributions" (Osada et al.).
//!
//! 实现位于 `shape-berry/src/distro`.
//!
//! ### 直方图比较度量 ✅
//!
//! Earth-Mover (一维) 与 chi-square 两种对称度量,
//! 按标识符从固定策略表中选取.
//!
//! 实现位于 `shape-berry/src/distro/compare.rs`.
//!
//! ### 流水线编排 ✅
//!
//! `ShapePipeline` 将上述各级组合为 "体数据 -> 网格", "体数据 -> 描述子",
//! "体数据 x2 -> 比较得分" 等入口. 第一个失败级的错误原样向外传播.
//!
//! 实现位于 `shape-berry/src/pipeline.rs`.
//!
//! ### 采样稳定性消融 ✅
//!
//! 默认采样点对数的经验稳定性界由 `ablations/stability` 给出.
//!
//! ### 完善代码文档 ✅
//!
//! 给每个 public API 提供文档, 并视情况给 private API 提供文档.

/// 三维体素索引, 按 `(z, h, w)` 顺序.
pub type Idx3d = (usize, usize, usize);

/// 三维物理坐标 / 向量, 以毫米为单位.
pub type Vec3d = (f64, f64, f64);

/// 三角面片的顶点索引三元组.
pub type TriIdx = (usize, usize, usize);

pub mod consts;
pub mod data;
pub mod distro;
pub mod error;
pub mod pipeline;
pub mod prelude;
pub mod surface;

//! 运行时错误定义.
//!
//! 所有错误都在检测点同步抛出, 库内部不做任何重试;
//! 需要重试时 (例如换一个标签重新提取) 由调用者自行决定.

use thiserror::Error;

use crate::distro::{DistroModel, NormBasis};

/// 几何阶段错误. 提取, 修复, 采样三级均可能产生.
///
/// 注意: 对体数据中不存在的标签做提取得到零面片网格, 这是合法的成功值,
/// 不属于本错误; 修复后仍为空表面才是错误.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GeometryError {
    /// 体数据某个轴上的体素个数少于 2, 无法构成任何 dual cell.
    #[error("degenerate volume")]
    DegenerateVolume,

    /// 修复流程的连通分量选择之后不再剩余任何面片.
    #[error("empty surface after sanitization")]
    EmptySurface,

    /// 对零面片网格做表面采样.
    #[error("empty mesh")]
    EmptyMesh,
}

/// 两个形状描述子不可比较.
///
/// 只有分布模型, bin 个数与归一化基准三者全部一致的描述子才可比较.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IncompatibleDescriptorError {
    /// bin 个数不一致. 两个参数分别为左右描述子的 bin 个数.
    #[error("bin counts differ: {0} vs {1}")]
    BinCount(usize, usize),

    /// 分布模型不一致.
    #[error("distribution models differ: {0:?} vs {1:?}")]
    Model(DistroModel, DistroModel),

    /// 归一化基准不一致.
    #[error("normalization bases differ: {0:?} vs {1:?}")]
    Basis(NormBasis, NormBasis),
}

/// 非法参数错误. 在构造或校验配置时同步抛出.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    /// bin 个数必须为正.
    #[error("bin count must be positive")]
    NonPositiveBinCount,

    /// 采样点对个数必须为正.
    #[error("sample pair count must be positive")]
    NonPositiveSamplePairs,

    /// 外部提供的最大距离必须为有限正数.
    #[error("max distance must be positive and finite")]
    InvalidMaxDistance,

    /// 顶点合并容差必须为有限非负数.
    #[error("merge tolerance must be non-negative and finite")]
    InvalidMergeTolerance,

    /// 未注册的比较度量标识符.
    #[error("unknown metric identifier: {0}")]
    UnknownMetric(String),

    /// 体数据每个轴上至少要有一个体素.
    #[error("volume axes must all be non-empty")]
    EmptyVolumeAxis,

    /// 体素分辨率必须为有限正数.
    #[error("voxel spacing must be positive and finite")]
    InvalidSpacing,
}

/// 流水线级错误: 第一个失败级的错误原样包装向外传播.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// 几何阶段错误.
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// 描述子比较阶段错误.
    #[error(transparent)]
    IncompatibleDescriptor(#[from] IncompatibleDescriptorError),

    /// 配置校验错误.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// nii 文件读入错误 (输入边界).
    #[error(transparent)]
    Nifti(#[from] nifti::NiftiError),
}

/// 本库通用 `Result` 别名.
pub type PipelineResult<T> = Result<T, PipelineError>;

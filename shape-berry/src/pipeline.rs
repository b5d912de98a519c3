//! 流水线编排: "体数据 -> 网格 -> 描述子 -> 比较得分".
//!
//! 纯组合, 自身不携带额外状态; 第一个失败级的错误原样向外传播.
//! 每次调用独占其输入, 不同输入上的多次调用可以并行执行.

use log::debug;

use crate::consts::{DEFAULT_BIN_COUNT, DEFAULT_SAMPLE_PAIRS, MERGE_TOLERANCE_FACTOR};
use crate::data::VolumeGrid;
use crate::distro::{
    compare_descriptors, sample_distribution, ComparisonResult, DistroModel, Metric,
    SampleParams, ShapeDescriptor,
};
use crate::error::{ConfigurationError, PipelineResult};
use crate::surface::{extract_label_surface, sanitize, SanitizeParams, TriMesh};

/// 流水线配置. 覆盖修复, 采样, 比较三级的全部参数;
/// 所有操作只读取配置, 不修改任何全局状态.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PipelineConfig {
    /// 顶点合并容差 (毫米). `None` 时按体素分辨率推导:
    /// `min(spacing) * MERGE_TOLERANCE_FACTOR`.
    pub merge_tolerance: Option<f64>,

    /// 修复时是否保留所有连通分量.
    pub keep_all_components: bool,

    /// 分布模型.
    pub model: DistroModel,

    /// 直方图 bin 个数.
    pub bin_count: usize,

    /// 采样点对 (或三元组) 个数.
    pub sample_pairs: u32,

    /// D2 直方图上界. `None` 时取观测最大距离.
    pub max_distance: Option<f64>,

    /// 随机种子. 固定种子保证整条流水线逐位可复现.
    pub seed: Option<u64>,

    /// 比较度量.
    pub metric: Metric,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            merge_tolerance: None,
            keep_all_components: false,
            model: DistroModel::D2,
            bin_count: DEFAULT_BIN_COUNT,
            sample_pairs: DEFAULT_SAMPLE_PAIRS,
            max_distance: None,
            seed: None,
            metric: Metric::EarthMover,
        }
    }
}

impl PipelineConfig {
    /// 校验配置合法性.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.bin_count == 0 {
            return Err(ConfigurationError::NonPositiveBinCount);
        }
        if self.sample_pairs == 0 {
            return Err(ConfigurationError::NonPositiveSamplePairs);
        }
        if let Some(d) = self.max_distance {
            if !d.is_finite() || d <= 0.0 {
                return Err(ConfigurationError::InvalidMaxDistance);
            }
        }
        if let Some(t) = self.merge_tolerance {
            if !t.is_finite() || t < 0.0 {
                return Err(ConfigurationError::InvalidMergeTolerance);
            }
        }
        Ok(())
    }

    /// 采样级参数视图.
    fn sample_params(&self) -> SampleParams {
        SampleParams {
            model: self.model,
            bin_count: self.bin_count,
            sample_pairs: self.sample_pairs,
            max_distance: self.max_distance,
            seed: self.seed,
        }
    }

    /// 修复级参数视图, 容差缺省时按体素分辨率推导.
    fn sanitize_params(&self, volume: &VolumeGrid) -> SanitizeParams {
        SanitizeParams {
            merge_tolerance: self
                .merge_tolerance
                .unwrap_or_else(|| volume.min_spacing() * MERGE_TOLERANCE_FACTOR),
            keep_all_components: self.keep_all_components,
        }
    }
}

/// 流水线入口对象. 构造时完成配置校验, 之后的每个方法都是纯函数.
#[derive(Debug, Clone)]
pub struct ShapePipeline {
    cfg: PipelineConfig,
}

impl ShapePipeline {
    /// 用给定配置创建流水线.
    ///
    /// # 错误
    ///
    /// 配置非法时返回对应的 `ConfigurationError`.
    pub fn new(cfg: PipelineConfig) -> Result<Self, ConfigurationError> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    /// 用默认配置创建流水线.
    pub fn with_defaults() -> Self {
        // 默认配置恒合法, 可直接 unwrap.
        Self::new(PipelineConfig::default()).unwrap()
    }

    /// 当前配置.
    #[inline]
    pub fn config(&self) -> &PipelineConfig {
        &self.cfg
    }

    /// `体数据, 标签 -> 原始网格`. 不做修复.
    ///
    /// 标签不存在时返回空网格 (合法成功值).
    pub fn extract(&self, volume: &VolumeGrid, label: u8) -> PipelineResult<TriMesh> {
        Ok(extract_label_surface(volume, label)?)
    }

    /// `体数据, 标签 -> 修复并归一化后的网格`.
    ///
    /// 标签不存在时提取得到空网格, 修复级继而返回
    /// `GeometryError::EmptySurface`; 这是整条流水线的既定策略.
    pub fn mesh(&self, volume: &VolumeGrid, label: u8) -> PipelineResult<TriMesh> {
        let mut mesh = extract_label_surface(volume, label)?;
        let report = sanitize(&mut mesh, &self.cfg.sanitize_params(volume))?;
        debug!(
            "pipeline: label {label} -> {} faces after sanitize (scale {:.6})",
            mesh.face_count(),
            report.scale
        );
        Ok(mesh)
    }

    /// `体数据, 标签 -> 形状描述子`. 完整的前三级.
    pub fn describe(&self, volume: &VolumeGrid, label: u8) -> PipelineResult<ShapeDescriptor> {
        let mesh = self.mesh(volume, label)?;
        self.describe_mesh(&mesh)
    }

    /// `网格 -> 形状描述子`. 供外部已有网格直接接入采样级;
    /// 网格应当已经过修复与归一化.
    pub fn describe_mesh(&self, mesh: &TriMesh) -> PipelineResult<ShapeDescriptor> {
        sample_distribution(mesh, &self.cfg.sample_params())
    }

    /// `描述子, 描述子 -> 得分`. 只运行比较级.
    pub fn compare_descriptors(
        &self,
        a: &ShapeDescriptor,
        b: &ShapeDescriptor,
    ) -> PipelineResult<ComparisonResult> {
        Ok(compare_descriptors(a, b, self.cfg.metric)?)
    }

    /// `体数据, 标签, 体数据, 标签 -> 得分`. 完整链条跑两遍再比较.
    pub fn compare(
        &self,
        volume_a: &VolumeGrid,
        label_a: u8,
        volume_b: &VolumeGrid,
        label_b: u8,
    ) -> PipelineResult<ComparisonResult> {
        let da = self.describe(volume_a, label_a)?;
        let db = self.describe(volume_b, label_b)?;
        self.compare_descriptors(&da, &db)
    }
}

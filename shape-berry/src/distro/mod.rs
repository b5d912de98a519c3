//! Shape distribution 形状描述子.
//!
//! 用网格表面上随机点集的统计分布刻画 3D 形状, 参考论文
//! "Shape Distributions" (Osada et al.). 目前支持 D2 (点对距离)
//! 与 A3 (点三元组夹角) 两种分布模型.
//!
//! # 确定性
//!
//! 采样接受一个显式随机种子. 第 `i` 次抽取使用由 `(种子, i)`
//! 推导出的独立子种子, 因此固定种子下无论串行还是并行执行,
//! 结果都逐位一致. 不提供种子时每次调用抽取一个新种子,
//! 结果只在统计意义下可复现.

use ordered_float::NotNan;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::consts::{A3_MAX_DEGREES, DEFAULT_BIN_COUNT, DEFAULT_SAMPLE_PAIRS};
use crate::error::{ConfigurationError, GeometryError, PipelineResult};
use crate::surface::TriMesh;
use crate::Vec3d;

mod a3;
pub mod compare;
mod d2;

pub use compare::{compare_descriptors, ComparisonResult, Metric};

/// 分布模型标识.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DistroModel {
    /// 表面随机点对的欧几里得距离分布.
    D2,

    /// 表面随机点三元组的夹角分布 (顶点在中间点).
    A3,
}

/// 直方图的归一化基准. 基准不同的描述子不可比较.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NormBasis {
    /// D2: bin 区间上界取观测到的最大距离.
    ObservedMax,

    /// D2: bin 区间上界由外部给定.
    Fixed(f64),

    /// A3: 固定角度区间 `[0, 180]` 度.
    Degrees,
}

/// 形状描述子: 定长归一化直方图加上产出它的采样参数.
///
/// 不变式: 所有 bin 非负, 且 (在浮点误差内) 其和为 1.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShapeDescriptor {
    model: DistroModel,
    bins: Vec<f64>,
    basis: NormBasis,
    sample_pairs: u32,
}

impl ShapeDescriptor {
    /// 分布模型.
    #[inline]
    pub fn model(&self) -> DistroModel {
        self.model
    }

    /// 归一化直方图.
    #[inline]
    pub fn bins(&self) -> &[f64] {
        &self.bins
    }

    /// bin 个数.
    #[inline]
    pub fn bin_count(&self) -> usize {
        self.bins.len()
    }

    /// 归一化基准.
    #[inline]
    pub fn basis(&self) -> NormBasis {
        self.basis
    }

    /// 产出该描述子的采样点对 (或三元组) 个数.
    #[inline]
    pub fn sample_pairs(&self) -> u32 {
        self.sample_pairs
    }
}

/// 表面采样参数.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SampleParams {
    /// 分布模型. 默认为 D2.
    pub model: DistroModel,

    /// 直方图 bin 个数. 默认为 [`DEFAULT_BIN_COUNT`].
    pub bin_count: usize,

    /// 采样点对 (D2) 或三元组 (A3) 个数. 默认为 [`DEFAULT_SAMPLE_PAIRS`],
    /// 该默认值的经验稳定性界见 `consts` 文档与 `ablations/stability`.
    pub sample_pairs: u32,

    /// D2 直方图上界. `None` 时取观测最大距离; 给定时超出上界的距离
    /// 计入最后一个 bin. A3 忽略该字段.
    pub max_distance: Option<f64>,

    /// 随机种子. `None` 时每次调用抽取一个新种子.
    pub seed: Option<u64>,
}

impl Default for SampleParams {
    fn default() -> Self {
        Self {
            model: DistroModel::D2,
            bin_count: DEFAULT_BIN_COUNT,
            sample_pairs: DEFAULT_SAMPLE_PAIRS,
            max_distance: None,
            seed: None,
        }
    }
}

impl SampleParams {
    /// 校验参数合法性.
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
        Ok(())
    }
}

/// 对网格表面采样, 产出形状描述子.
///
/// 网格应当已经过修复与归一化; 对未归一化网格采样在数学上同样成立,
/// 但产出的 D2 描述子不具备跨尺寸可比性.
///
/// # 错误
///
/// 零面片网格返回 `GeometryError::EmptyMesh`;
/// 非法参数返回对应的 `ConfigurationError`.
pub fn sample_distribution(
    mesh: &TriMesh,
    params: &SampleParams,
) -> PipelineResult<ShapeDescriptor> {
    params.validate()?;
    if mesh.is_empty() {
        return Err(GeometryError::EmptyMesh.into());
    }

    // 面积权重表构建失败意味着所有面片都退化.
    let table = AreaTable::build(mesh).ok_or(GeometryError::EmptyMesh)?;
    let seed = params
        .seed
        .unwrap_or_else(|| rand::thread_rng().gen::<u64>());

    let (values, basis) = match params.model {
        DistroModel::D2 => {
            let dists = d2::collect_distances(mesh, &table, params.sample_pairs, seed);
            let (max, basis) = match params.max_distance {
                Some(d) => (d, NormBasis::Fixed(d)),
                None => (observed_max(&dists), NormBasis::ObservedMax),
            };
            (histogram(&dists, params.bin_count, max), basis)
        }
        DistroModel::A3 => {
            let angles = a3::collect_angles(mesh, &table, params.sample_pairs, seed);
            if angles.is_empty() {
                return Err(GeometryError::EmptyMesh.into());
            }
            (
                histogram(&angles, params.bin_count, A3_MAX_DEGREES),
                NormBasis::Degrees,
            )
        }
    };

    Ok(ShapeDescriptor {
        model: params.model,
        bins: values,
        basis,
        sample_pairs: params.sample_pairs,
    })
}

/// 面片累计面积表: 每个网格一张, 按网格生命周期存在 (不做全局缓存).
///
/// 支持以面积为权重的面片随机选择: 抽一个 `[0, 1)` 均匀数,
/// 在前缀和数组上二分定位.
pub(crate) struct AreaTable {
    cum: Vec<f64>,
    total: f64,
}

impl AreaTable {
    /// 构建前缀和表. 总面积为 0 时返回 `None`.
    pub(crate) fn build(mesh: &TriMesh) -> Option<Self> {
        let mut cum = Vec::with_capacity(mesh.face_count());
        let mut acc = 0.0;
        for i in 0..mesh.face_count() {
            acc += mesh.face_area(i);
            cum.push(acc);
        }
        if acc > 0.0 {
            Some(Self { cum, total: acc })
        } else {
            None
        }
    }

    /// 将 `[0, 1)` 均匀随机数映射为面片下标.
    #[inline]
    pub(crate) fn pick(&self, r: f64) -> usize {
        let target = r * self.total;
        let idx = self.cum.partition_point(|c| *c <= target);
        // r < 1 时理论上不会越界; 防御浮点边界.
        idx.min(self.cum.len() - 1)
    }
}

/// 按表面积均匀采样一个表面点: 面积加权选面片, 再取均匀重心坐标点.
#[inline]
pub(crate) fn surface_point<R: Rng>(mesh: &TriMesh, table: &AreaTable, rng: &mut R) -> Vec3d {
    let f = table.pick(rng.gen::<f64>());
    let (ia, ib, ic) = mesh.faces()[f];
    let (a, b, c) = (
        mesh.vertices()[ia],
        mesh.vertices()[ib],
        mesh.vertices()[ic],
    );

    // 三角形内均匀点: sqrt 变换保证均匀性.
    let r1 = rng.gen::<f64>().sqrt();
    let r2 = rng.gen::<f64>();
    let (u, v, w) = (1.0 - r1, r1 * (1.0 - r2), r1 * r2);
    (
        u * a.0 + v * b.0 + w * c.0,
        u * a.1 + v * b.1 + w * c.1,
        u * a.2 + v * b.2 + w * c.2,
    )
}

/// 由 `(种子, 抽取序号)` 推导独立子 RNG (splitmix64 混合).
///
/// 并行执行时每次抽取的随机流只依赖序号, 与执行顺序无关.
#[inline]
pub(crate) fn draw_rng(seed: u64, index: u64) -> ChaCha8Rng {
    let mut z = seed ^ index.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    ChaCha8Rng::seed_from_u64(z ^ (z >> 31))
}

/// 观测最大值. 采样值都是有限数, 可直接 unwrap.
fn observed_max(values: &[f64]) -> f64 {
    values
        .iter()
        .map(|v| NotNan::new(*v).unwrap())
        .max()
        .map(NotNan::into_inner)
        .unwrap_or(0.0)
}

/// 等宽直方图, 区间为 `[0, max]`, 计数归一化为概率分布.
///
/// 超出 `max` 的值 (外部给定上界小于观测值时) 计入最后一个 bin.
fn histogram(values: &[f64], bin_count: usize, max: f64) -> Vec<f64> {
    let mut bins = vec![0.0f64; bin_count];
    let width = max / bin_count as f64;
    for v in values {
        let idx = if width > 0.0 {
            ((v / width) as usize).min(bin_count - 1)
        } else {
            0
        };
        bins[idx] += 1.0;
    }
    let total = values.len() as f64;
    for b in &mut bins {
        *b /= total;
    }
    bins
}

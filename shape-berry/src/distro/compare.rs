//! 形状描述子比较度量.
//!
//! 度量是按标识符选取的封闭策略集合 (`compare(a, b) -> f64` 这一个能力),
//! 新增度量只需扩展 [`Metric`] 与策略表, 不影响采样器.
//!
//! 所有度量都满足: 对称, 非负, 相同描述子得 0.

use std::collections::BTreeMap;

use itertools::izip;
use once_cell::sync::Lazy;

use crate::distro::ShapeDescriptor;
use crate::error::{ConfigurationError, IncompatibleDescriptorError};

/// 比较度量标识.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Metric {
    /// 一维 Earth-Mover 距离 (累计和绝对差), 按 bin 个数归一化. 默认度量.
    EarthMover,

    /// 对称 chi-square 距离的一半.
    ChiSquare,
}

/// 标识符 -> 度量的策略表.
static METRIC_TABLE: Lazy<BTreeMap<&'static str, Metric>> = Lazy::new(|| {
    BTreeMap::from([
        ("emd", Metric::EarthMover),
        ("chi2", Metric::ChiSquare),
    ])
});

impl Metric {
    /// 全部已注册度量.
    pub const ALL: [Metric; 2] = [Metric::EarthMover, Metric::ChiSquare];

    /// 度量的标识符.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Metric::EarthMover => "emd",
            Metric::ChiSquare => "chi2",
        }
    }

    /// 按标识符查表选取度量.
    ///
    /// # 错误
    ///
    /// 未注册的标识符返回 `ConfigurationError::UnknownMetric`.
    pub fn from_name(name: &str) -> Result<Self, ConfigurationError> {
        METRIC_TABLE
            .get(name)
            .copied()
            .ok_or_else(|| ConfigurationError::UnknownMetric(name.to_string()))
    }

    /// 在两个等长直方图上求值.
    fn eval(self, a: &[f64], b: &[f64]) -> f64 {
        debug_assert_eq!(a.len(), b.len());
        match self {
            Metric::EarthMover => {
                let mut cum = 0.0;
                let mut acc = 0.0;
                for (x, y) in izip!(a, b) {
                    cum += x - y;
                    acc += cum.abs();
                }
                acc / a.len() as f64
            }
            Metric::ChiSquare => {
                let mut acc = 0.0;
                for (x, y) in izip!(a, b) {
                    let denom = x + y;
                    if denom > 0.0 {
                        acc += (x - y) * (x - y) / denom;
                    }
                }
                acc * 0.5
            }
        }
    }
}

impl Default for Metric {
    fn default() -> Self {
        Metric::EarthMover
    }
}

/// 比较结果: 非负相异度得分加上产出它的度量标识. 纯数据, 无可变状态.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ComparisonResult {
    /// 使用的度量.
    pub metric: Metric,

    /// 相异度得分. 0 表示两个描述子完全一致.
    pub score: f64,
}

/// 比较两个形状描述子.
///
/// # 错误
///
/// 分布模型, bin 个数或归一化基准不一致时返回
/// [`IncompatibleDescriptorError`].
pub fn compare_descriptors(
    a: &ShapeDescriptor,
    b: &ShapeDescriptor,
    metric: Metric,
) -> Result<ComparisonResult, IncompatibleDescriptorError> {
    if a.model() != b.model() {
        return Err(IncompatibleDescriptorError::Model(a.model(), b.model()));
    }
    if a.bin_count() != b.bin_count() {
        return Err(IncompatibleDescriptorError::BinCount(
            a.bin_count(),
            b.bin_count(),
        ));
    }
    if a.basis() != b.basis() {
        return Err(IncompatibleDescriptorError::Basis(a.basis(), b.basis()));
    }

    Ok(ComparisonResult {
        metric,
        score: metric.eval(a.bins(), b.bins()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distro::{DistroModel, NormBasis, SampleParams};

    fn float_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    /// 直接拼一个描述子 (绕过采样), 便于构造边界情形.
    fn descriptor(model: DistroModel, bins: Vec<f64>, basis: NormBasis) -> ShapeDescriptor {
        ShapeDescriptor {
            model,
            bins,
            basis,
            sample_pairs: 1024,
        }
    }

    #[test]
    fn test_metric_registry() {
        assert_eq!(Metric::from_name("emd").unwrap(), Metric::EarthMover);
        assert_eq!(Metric::from_name("chi2").unwrap(), Metric::ChiSquare);
        assert_eq!(
            Metric::from_name("cosine").unwrap_err(),
            ConfigurationError::UnknownMetric("cosine".to_string())
        );
        for m in Metric::ALL {
            assert_eq!(Metric::from_name(m.name()).unwrap(), m);
        }
    }

    /// 自反性: compare(a, a) == 0.
    #[test]
    fn test_identity_scores_zero() {
        let a = descriptor(
            DistroModel::D2,
            vec![0.25, 0.5, 0.25, 0.0],
            NormBasis::ObservedMax,
        );
        for m in Metric::ALL {
            let r = compare_descriptors(&a, &a, m).unwrap();
            assert_eq!(r.metric, m);
            assert!(float_eq(r.score, 0.0));
        }
    }

    /// 对称性与非负性.
    #[test]
    fn test_symmetry_and_nonnegativity() {
        let a = descriptor(
            DistroModel::D2,
            vec![0.7, 0.1, 0.1, 0.1],
            NormBasis::ObservedMax,
        );
        let b = descriptor(
            DistroModel::D2,
            vec![0.1, 0.1, 0.1, 0.7],
            NormBasis::ObservedMax,
        );
        for m in Metric::ALL {
            let ab = compare_descriptors(&a, &b, m).unwrap().score;
            let ba = compare_descriptors(&b, &a, m).unwrap().score;
            assert!(ab > 0.0);
            assert!(float_eq(ab, ba));
        }
    }

    /// EMD 的数值检查: 质量搬运一格的代价.
    #[test]
    fn test_emd_value() {
        let a = descriptor(DistroModel::D2, vec![1.0, 0.0], NormBasis::ObservedMax);
        let b = descriptor(DistroModel::D2, vec![0.0, 1.0], NormBasis::ObservedMax);
        let r = compare_descriptors(&a, &b, Metric::EarthMover).unwrap();
        // 累计差为 [1, 0], 归一化后 0.5.
        assert!(float_eq(r.score, 0.5));
    }

    #[test]
    fn test_incompatible_descriptors() {
        let a = descriptor(DistroModel::D2, vec![0.5, 0.5], NormBasis::ObservedMax);

        let bins = descriptor(
            DistroModel::D2,
            vec![0.5, 0.25, 0.25],
            NormBasis::ObservedMax,
        );
        assert_eq!(
            compare_descriptors(&a, &bins, Metric::EarthMover).unwrap_err(),
            IncompatibleDescriptorError::BinCount(2, 3)
        );

        let model = descriptor(DistroModel::A3, vec![0.5, 0.5], NormBasis::Degrees);
        assert!(matches!(
            compare_descriptors(&a, &model, Metric::EarthMover).unwrap_err(),
            IncompatibleDescriptorError::Model(..)
        ));

        let basis = descriptor(DistroModel::D2, vec![0.5, 0.5], NormBasis::Fixed(2.0));
        assert!(matches!(
            compare_descriptors(&a, &basis, Metric::EarthMover).unwrap_err(),
            IncompatibleDescriptorError::Basis(..)
        ));
    }

    /// 采样产出的描述子走一遍完整比较.
    #[test]
    fn test_compare_sampled_descriptors() {
        use crate::data::phantom;
        use crate::distro::sample_distribution;
        use crate::surface::{extract_label_surface, sanitize, SanitizeParams};

        let mk = |n, r| {
            let vol = phantom::solid_sphere(n, r, 1);
            let mut mesh = extract_label_surface(&vol, 1).unwrap();
            sanitize(&mut mesh, &SanitizeParams::default()).unwrap();
            mesh
        };
        let params = SampleParams {
            sample_pairs: 4096,
            seed: Some(11),
            ..Default::default()
        };

        let a = sample_distribution(&mk(12, 4.0), &params).unwrap();
        let b = sample_distribution(&mk(16, 6.0), &params).unwrap();

        // 两个归一化球面的分布非常接近.
        let r = compare_descriptors(&a, &b, Metric::EarthMover).unwrap();
        assert!(r.score >= 0.0);
        assert!(r.score < 0.05, "球面间 EMD 得分为 {}", r.score);
    }
}

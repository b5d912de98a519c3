//! 体数据模型与 nii 输入边界.

use std::collections::BTreeSet;
use std::ops::Index;
use std::path::Path;

use ndarray::{Array3, ArrayView, Ix3};
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};

use crate::error::{ConfigurationError, PipelineResult};
use crate::{Idx3d, Vec3d};

pub mod phantom;

/// 规范化标签体数据, 即 "canonical 3D voxel grid".
///
/// 数据按 `(z, h, w)` 顺序保存, 标签值以 `u8` 保存 (0 为背景).
/// `spacing` 为各轴体素分辨率 (毫米), `origin` 与 `orientation`
/// 共同给出体素索引到物理坐标的仿射映射.
///
/// 加载完成后即不可变; 每次流水线调用独占其输入体数据,
/// 网格提取结束后除非调用者显式保留, 否则随调用一起丢弃.
#[derive(Debug, Clone)]
pub struct VolumeGrid {
    data: Array3<u8>,
    spacing: [f64; 3],
    origin: [f64; 3],
    orientation: [[f64; 3]; 3],
}

/// 将 (W, H, z) 转换成 (z, H, W). 以后均按照该模式访问.
#[inline]
fn get_shape_from_header(h: &NiftiHeader) -> Idx3d {
    // [W, H, z]. 体素个数数组.
    let [_, w, h, z, ..] = h.dim;
    (z as usize, h as usize, w as usize)
}

/// 校验体素分辨率: 每个分量都必须是有限正数.
#[inline]
fn check_spacing(spacing: &[f64; 3]) -> Result<(), ConfigurationError> {
    if spacing.iter().all(|s| s.is_finite() && *s > 0.0) {
        Ok(())
    } else {
        Err(ConfigurationError::InvalidSpacing)
    }
}

impl VolumeGrid {
    /// 根据裸标签数据和体素分辨率直接创建 `VolumeGrid` 实体.
    ///
    /// `origin` 为零向量, `orientation` 为单位阵; 如需完整仿射请链式调用
    /// [`Self::with_origin`] 与 [`Self::with_orientation`].
    ///
    /// # 错误
    ///
    /// 任何轴为空时返回 `ConfigurationError::EmptyVolumeAxis`;
    /// 分辨率非法时返回 `ConfigurationError::InvalidSpacing`.
    pub fn new(data: Array3<u8>, spacing: [f64; 3]) -> Result<Self, ConfigurationError> {
        if data.shape().iter().any(|len| *len == 0) {
            return Err(ConfigurationError::EmptyVolumeAxis);
        }
        check_spacing(&spacing)?;

        Ok(Self {
            data,
            spacing,
            origin: [0.0; 3],
            orientation: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        })
    }

    /// 替换物理坐标原点.
    #[must_use]
    pub fn with_origin(mut self, origin: [f64; 3]) -> Self {
        self.origin = origin;
        self
    }

    /// 替换仿射映射的线性部分 (行优先 3x3 矩阵).
    #[must_use]
    pub fn with_orientation(mut self, orientation: [[f64; 3]; 3]) -> Self {
        self.orientation = orientation;
        self
    }

    /// 打开 nii 文件格式的 3D 标签体数据. `path` 为 nii 文件的本地路径.
    /// 如果打开成功, 则返回 `Ok(Self)`, 否则返回 `Err`.
    ///
    /// 分辨率取自 header 的 `pixdim`; 原点与方向保持默认
    /// (完整仿射属于外部加载协作者的职责).
    pub fn open_nifti<P: AsRef<Path>>(path: P) -> PipelineResult<Self> {
        let obj = ReaderOptions::new().read_file(path.as_ref())?;
        let header = obj.header().clone();

        // [W, H, z] -> [z, H, W].
        // hint: 原第一维向下增长, 原第二维向右增长.
        let data = obj
            .into_volume()
            .into_ndarray::<u8>()?
            .permuted_axes([2, 1, 0].as_slice());

        // The nature of nifti data field layout.
        debug_assert!(data.is_standard_layout());

        // 该操作不会生成 `Err`, 可直接 unwrap.
        let data =
            Array3::<u8>::from_shape_vec(get_shape_from_header(&header), data.into_raw_vec())
                .unwrap();

        let [_, w, h, z, ..] = header.pixdim;
        let spacing = [z as f64, h as f64, w as f64];

        Ok(Self::new(data, spacing)?)
    }

    /// 获取数据形状大小, 按 `(z, h, w)` 顺序.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        let s = self.data.shape();
        (s[0], s[1], s[2])
    }

    /// 获取数据体素个数.
    #[inline]
    pub fn size(&self) -> usize {
        let (z, h, w) = self.shape();
        z * h * w
    }

    /// 获取各轴体素分辨率, 以毫米为单位, 按 `(z, h, w)` 顺序.
    #[inline]
    pub fn spacing(&self) -> [f64; 3] {
        self.spacing
    }

    /// 获取最小体素分辨率分量.
    #[inline]
    pub fn min_spacing(&self) -> f64 {
        // spacing 分量构造时已校验为有限正数, 直接 fold 即可.
        self.spacing.iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// 获取物理坐标原点.
    #[inline]
    pub fn origin(&self) -> [f64; 3] {
        self.origin
    }

    /// 获取仿射映射的线性部分.
    #[inline]
    pub fn orientation(&self) -> [[f64; 3]; 3] {
        self.orientation
    }

    /// 检查索引是否合法.
    #[inline]
    pub fn check(&self, (z0, h0, w0): &Idx3d) -> bool {
        let (z, h, w) = self.shape();
        *z0 < z && *h0 < h && *w0 < w
    }

    /// 将 (连续) 体素索引坐标映射到物理坐标:
    /// `origin + orientation * (spacing ⊙ index)`.
    #[inline]
    pub fn index_to_physical(&self, (iz, ih, iw): Vec3d) -> Vec3d {
        let s = [
            iz * self.spacing[0],
            ih * self.spacing[1],
            iw * self.spacing[2],
        ];
        let m = &self.orientation;
        (
            self.origin[0] + m[0][0] * s[0] + m[0][1] * s[1] + m[0][2] * s[2],
            self.origin[1] + m[1][0] * s[0] + m[1][1] * s[1] + m[1][2] * s[2],
            self.origin[2] + m[2][0] * s[0] + m[2][1] * s[1] + m[2][2] * s[2],
        )
    }

    /// 体数据中是否存在值为 `label` 的体素?
    #[inline]
    pub fn contains_label(&self, label: u8) -> bool {
        self.data.iter().any(|v| *v == label)
    }

    /// 获取体数据中出现过的所有非背景标签, 按升序排列.
    pub fn labels(&self) -> Vec<u8> {
        self.data
            .iter()
            .copied()
            .filter(|v| crate::consts::label::is_structure(*v))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView<'_, u8, Ix3> {
        self.data.view()
    }
}

impl Index<Idx3d> for VolumeGrid {
    type Output = u8;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_volume_grid_invalid_input() {
        let empty = Array3::<u8>::zeros((0, 4, 4));
        assert_eq!(
            VolumeGrid::new(empty, [1.0; 3]).unwrap_err(),
            ConfigurationError::EmptyVolumeAxis
        );

        let data = Array3::<u8>::zeros((2, 2, 2));
        assert_eq!(
            VolumeGrid::new(data.clone(), [1.0, 0.0, 1.0]).unwrap_err(),
            ConfigurationError::InvalidSpacing
        );
        assert_eq!(
            VolumeGrid::new(data, [1.0, f64::NAN, 1.0]).unwrap_err(),
            ConfigurationError::InvalidSpacing
        );
    }

    #[test]
    fn test_volume_grid_labels() {
        let mut data = Array3::<u8>::zeros((3, 3, 3));
        data[(0, 0, 0)] = 2;
        data[(1, 1, 1)] = 1;
        data[(2, 2, 2)] = 2;
        let vol = VolumeGrid::new(data, [1.0; 3]).unwrap();

        assert_eq!(vol.labels(), vec![1, 2]);
        assert!(vol.contains_label(0));
        assert!(vol.contains_label(2));
        assert!(!vol.contains_label(3));
        assert_eq!(vol[(1, 1, 1)], 1);
    }

    /// 各向异性分辨率 + 平移原点下的物理坐标映射.
    #[test]
    fn test_index_to_physical() {
        let data = Array3::<u8>::zeros((2, 2, 2));
        let vol = VolumeGrid::new(data, [2.0, 0.5, 1.0])
            .unwrap()
            .with_origin([10.0, 0.0, -1.0]);

        let p = vol.index_to_physical((1.0, 2.0, 3.0));
        assert_eq!(p, (12.0, 1.0, 2.0));
    }

    /// 非单位方向矩阵参与映射.
    #[test]
    fn test_index_to_physical_orientation() {
        let data = Array3::<u8>::zeros((2, 2, 2));
        // 绕第一轴交换后两个轴.
        let vol = VolumeGrid::new(data, [1.0; 3])
            .unwrap()
            .with_orientation([[1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]]);

        let p = vol.index_to_physical((1.0, 2.0, 3.0));
        assert_eq!(p, (1.0, 3.0, 2.0));
    }
}

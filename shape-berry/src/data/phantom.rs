//! 合成标签体数据 (phantom) 构造工具.
//!
//! 用作单元测试与消融实验的输入, 不面向真实数据.
//! 所有 phantom 的体素分辨率均为 1 毫米, 原点为零, 方向为单位阵.

use ndarray::Array3;

use crate::data::VolumeGrid;
use crate::Idx3d;

/// 构造一个全背景体数据.
pub fn empty_volume(shape: Idx3d) -> VolumeGrid {
    assert!(shape.0 >= 1 && shape.1 >= 1 && shape.2 >= 1, "体数据轴不能为空");

    // 形状与分辨率均合法, 可直接 unwrap.
    VolumeGrid::new(Array3::zeros(shape), [1.0; 3]).unwrap()
}

/// 构造一个 `n^3` 体数据, 中心放置一个半径为 `radius` 体素的实心球,
/// 球内体素值为 `label`.
pub fn solid_sphere(n: usize, radius: f64, label: u8) -> VolumeGrid {
    assert!(n >= 2, "体数据每个轴至少需要 2 个体素");
    assert!(radius > 0.0);

    let c = (n as f64 - 1.0) / 2.0;
    let r2 = radius * radius;
    let data = Array3::from_shape_fn((n, n, n), |(z, h, w)| {
        let (dz, dh, dw) = (z as f64 - c, h as f64 - c, w as f64 - c);
        if dz * dz + dh * dh + dw * dw <= r2 {
            label
        } else {
            0
        }
    });

    // 形状与分辨率均合法, 可直接 unwrap.
    VolumeGrid::new(data, [1.0; 3]).unwrap()
}

/// 构造一个 `n^3` 体数据, 中心放置一个半轴为 `(rz, rh, rw)` 体素的实心椭球.
pub fn solid_ellipsoid(n: usize, (rz, rh, rw): (f64, f64, f64), label: u8) -> VolumeGrid {
    assert!(n >= 2, "体数据每个轴至少需要 2 个体素");
    assert!(rz > 0.0 && rh > 0.0 && rw > 0.0);

    let c = (n as f64 - 1.0) / 2.0;
    let data = Array3::from_shape_fn((n, n, n), |(z, h, w)| {
        let (dz, dh, dw) = (
            (z as f64 - c) / rz,
            (h as f64 - c) / rh,
            (w as f64 - c) / rw,
        );
        if dz * dz + dh * dh + dw * dw <= 1.0 {
            label
        } else {
            0
        }
    });

    // 形状与分辨率均合法, 可直接 unwrap.
    VolumeGrid::new(data, [1.0; 3]).unwrap()
}

/// 构造一个实心长方体标签区域: 体素索引位于 `[lo, hi)` 区间内的值为 `label`.
///
/// `hi` 各分量不能超出 `shape`, 且必须严格大于对应的 `lo` 分量.
pub fn solid_cuboid(shape: Idx3d, lo: Idx3d, hi: Idx3d, label: u8) -> VolumeGrid {
    assert!(shape.0 >= 2 && shape.1 >= 2 && shape.2 >= 2, "体数据每个轴至少需要 2 个体素");
    assert!(lo.0 < hi.0 && lo.1 < hi.1 && lo.2 < hi.2, "长方体区间为空");
    assert!(hi.0 <= shape.0 && hi.1 <= shape.1 && hi.2 <= shape.2, "长方体越界");

    let data = Array3::from_shape_fn(shape, |(z, h, w)| {
        let inside = (lo.0..hi.0).contains(&z) && (lo.1..hi.1).contains(&h) && (lo.2..hi.2).contains(&w);
        if inside {
            label
        } else {
            0
        }
    });

    // 形状与分辨率均合法, 可直接 unwrap.
    VolumeGrid::new(data, [1.0; 3]).unwrap()
}

//! 三角表面网格模型与表面查询.

use std::collections::HashMap;

use crate::{TriIdx, Vec3d};

pub mod extract;
pub mod ply;
pub mod sanitize;

pub use extract::extract_label_surface;
pub use sanitize::{sanitize, SanitizeParams, SanitizeReport};

/// `a - b`.
#[inline]
pub(crate) fn v_sub(a: Vec3d, b: Vec3d) -> Vec3d {
    (a.0 - b.0, a.1 - b.1, a.2 - b.2)
}

/// `a + b`.
#[inline]
pub(crate) fn v_add(a: Vec3d, b: Vec3d) -> Vec3d {
    (a.0 + b.0, a.1 + b.1, a.2 + b.2)
}

/// `k * a`.
#[inline]
pub(crate) fn v_scale(a: Vec3d, k: f64) -> Vec3d {
    (a.0 * k, a.1 * k, a.2 * k)
}

/// 内积.
#[inline]
pub(crate) fn v_dot(a: Vec3d, b: Vec3d) -> f64 {
    a.0 * b.0 + a.1 * b.1 + a.2 * b.2
}

/// 外积.
#[inline]
pub(crate) fn v_cross(a: Vec3d, b: Vec3d) -> Vec3d {
    (
        a.1 * b.2 - a.2 * b.1,
        a.2 * b.0 - a.0 * b.2,
        a.0 * b.1 - a.1 * b.0,
    )
}

/// 向量模长.
#[inline]
pub(crate) fn v_norm(a: Vec3d) -> f64 {
    v_dot(a, a).sqrt()
}

/// 两点欧几里得距离.
#[inline]
pub(crate) fn v_dist(a: Vec3d, b: Vec3d) -> f64 {
    v_norm(v_sub(a, b))
}

/// 带索引的三角表面网格.
///
/// 顶点坐标位于物理坐标系 (毫米); 每个面片是顶点下标三元组.
/// 由提取器创建, 被修复器原地修改, 之后作为采样器的不可变输入.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriMesh {
    pub(crate) verts: Vec<Vec3d>,
    pub(crate) faces: Vec<TriIdx>,
}

impl TriMesh {
    /// 根据顶点与面片列表创建网格.
    ///
    /// 如果任何面片索引不小于顶点个数, 则程序 panic.
    pub fn new(verts: Vec<Vec3d>, faces: Vec<TriIdx>) -> Self {
        let n = verts.len();
        for (a, b, c) in &faces {
            assert!(*a < n && *b < n && *c < n, "面片索引越界");
        }
        Self { verts, faces }
    }

    /// 顶点列表.
    #[inline]
    pub fn vertices(&self) -> &[Vec3d] {
        &self.verts
    }

    /// 面片列表.
    #[inline]
    pub fn faces(&self) -> &[TriIdx] {
        &self.faces
    }

    /// 顶点个数.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.verts.len()
    }

    /// 面片个数.
    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// 网格是否为空 (零面片)?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// 计算第 `i` 个面片的面积. 如果 `i` 越界, 则程序 panic.
    #[inline]
    pub fn face_area(&self, i: usize) -> f64 {
        let (a, b, c) = self.faces[i];
        let e1 = v_sub(self.verts[b], self.verts[a]);
        let e2 = v_sub(self.verts[c], self.verts[a]);
        v_norm(v_cross(e1, e2)) * 0.5
    }

    /// 计算第 `i` 个面片的单位法向量. 退化面片 (面积为 0) 返回 `None`.
    pub fn face_normal(&self, i: usize) -> Option<Vec3d> {
        let (a, b, c) = self.faces[i];
        let e1 = v_sub(self.verts[b], self.verts[a]);
        let e2 = v_sub(self.verts[c], self.verts[a]);
        let n = v_cross(e1, e2);
        let len = v_norm(n);
        if len > 0.0 {
            Some(v_scale(n, 1.0 / len))
        } else {
            None
        }
    }

    /// 计算总表面积.
    pub fn surface_area(&self) -> f64 {
        (0..self.faces.len()).map(|i| self.face_area(i)).sum()
    }

    /// 计算顶点质心 (顶点坐标均值, 不是包围盒中心). 无顶点时返回 `None`.
    pub fn vertex_centroid(&self) -> Option<Vec3d> {
        if self.verts.is_empty() {
            return None;
        }
        let sum = self
            .verts
            .iter()
            .fold((0.0, 0.0, 0.0), |acc, v| v_add(acc, *v));
        Some(v_scale(sum, 1.0 / self.verts.len() as f64))
    }

    /// 计算顶点到原点的平均距离. 无顶点时返回 `None`.
    pub fn mean_radius(&self) -> Option<f64> {
        if self.verts.is_empty() {
            return None;
        }
        let sum: f64 = self.verts.iter().map(|v| v_norm(*v)).sum();
        Some(sum / self.verts.len() as f64)
    }

    /// 计算轴对齐包围盒 `(min, max)`. 无顶点时返回 `None`.
    pub fn bounding_box(&self) -> Option<(Vec3d, Vec3d)> {
        let first = *self.verts.first()?;
        let mut lo = first;
        let mut hi = first;
        for v in &self.verts[1..] {
            lo = (lo.0.min(v.0), lo.1.min(v.1), lo.2.min(v.2));
            hi = (hi.0.max(v.0), hi.1.max(v.1), hi.2.max(v.2));
        }
        Some((lo, hi))
    }

    /// 统计每条无向边被多少个面片共享.
    ///
    /// 边以 `(min_idx, max_idx)` 形式为 key.
    pub fn edge_incidence(&self) -> HashMap<(usize, usize), u32> {
        let mut map = HashMap::with_capacity(self.faces.len() * 3 / 2);
        for (a, b, c) in &self.faces {
            for (u, v) in [(*a, *b), (*b, *c), (*c, *a)] {
                let key = (u.min(v), u.max(v));
                *map.entry(key).or_insert(0u32) += 1;
            }
        }
        map
    }

    /// 网格是否封闭 (watertight)? 即每条边都恰好被 2 个面片共享.
    ///
    /// 空网格不视为封闭.
    pub fn is_watertight(&self) -> bool {
        !self.is_empty() && self.edge_incidence().values().all(|cnt| *cnt == 2)
    }

    /// 网格是否是流形 (manifold)? 即每条边至多被 2 个面片共享.
    pub fn is_manifold(&self) -> bool {
        self.edge_incidence().values().all(|cnt| *cnt <= 2)
    }
}

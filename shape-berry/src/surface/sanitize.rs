//! 网格修复与归一化.
//!
//! 将原始提取网格变成可以安全进入表面采样的网格. 操作按固定顺序执行,
//! 每一步对已经干净的输入幂等:
//!
//! 1. 退化面片剔除 (重复顶点索引, 或面积低于阈值);
//! 2. 容差内重复顶点合并 (封闭提取缝隙);
//! 3. 连通分量选择 (保留总表面积最大的分量, 除非要求保留全部);
//! 4. 位姿归一化 (顶点质心平移到原点, 均匀缩放使顶点平均距离为 1).
//!
//! 归一化保证不同绝对尺寸的网格产出可比较的形状描述子.

use std::collections::{BTreeMap, HashMap};

use log::debug;
use ordered_float::NotNan;

use crate::consts::{AREA_EPS, DEFAULT_MERGE_TOLERANCE};
use crate::error::GeometryError;
use crate::surface::{v_cross, v_dist, v_norm, v_scale, v_sub, TriMesh};
use crate::Vec3d;

/// 网格修复参数.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SanitizeParams {
    /// 顶点合并容差 (毫米). 距离小于该值的顶点合并为一个.
    ///
    /// 流水线会根据体素分辨率推导该值; 脱离体数据单独使用时默认为
    /// [`DEFAULT_MERGE_TOLERANCE`]. 取 0 时跳过合并.
    pub merge_tolerance: f64,

    /// 是否保留所有连通分量 (跳过第 3 步的最大分量选择).
    pub keep_all_components: bool,
}

impl Default for SanitizeParams {
    fn default() -> Self {
        Self {
            merge_tolerance: DEFAULT_MERGE_TOLERANCE,
            keep_all_components: false,
        }
    }
}

/// 一次修复运行的统计信息, 供日志与调试使用.
#[derive(Debug, Clone, Default)]
pub struct SanitizeReport {
    /// 第 1 步剔除的退化面片个数.
    pub degenerate_faces: usize,

    /// 第 2 步合并掉的顶点个数.
    pub merged_vertices: usize,

    /// 第 3 步丢弃的连通分量个数.
    pub dropped_components: usize,

    /// 第 3 步随分量一起丢弃的面片个数.
    pub dropped_faces: usize,

    /// 第 4 步平移前的顶点质心.
    pub centroid: Vec3d,

    /// 第 4 步应用的均匀缩放因子.
    pub scale: f64,
}

/// 对 `mesh` 原地执行完整修复流程.
///
/// # 错误
///
/// 连通分量选择之后不再剩余任何面片时返回
/// `GeometryError::EmptySurface`. 对不存在标签提取出的空网格
/// 走到这里也会得到该错误 (这是整条流水线对缺失标签的既定策略).
pub fn sanitize(
    mesh: &mut TriMesh,
    params: &SanitizeParams,
) -> Result<SanitizeReport, GeometryError> {
    let degenerate_faces = remove_degenerate_faces(mesh);
    let merged_vertices = weld_vertices(mesh, params.merge_tolerance);

    let (dropped_components, dropped_faces) = if params.keep_all_components {
        (0, 0)
    } else {
        select_largest_component(mesh)
    };

    if mesh.faces.is_empty() {
        return Err(GeometryError::EmptySurface);
    }

    let (centroid, scale) = normalize_pose(mesh);

    let report = SanitizeReport {
        degenerate_faces,
        merged_vertices,
        dropped_components,
        dropped_faces,
        centroid,
        scale,
    };
    debug!(
        "sanitize: -{} degenerate, -{} merged verts, -{} components ({} faces), scale {:.6}",
        report.degenerate_faces,
        report.merged_vertices,
        report.dropped_components,
        report.dropped_faces,
        report.scale
    );
    Ok(report)
}

/// 第 1 步: 剔除重复索引或面积低于 [`AREA_EPS`] 的面片. 返回剔除个数.
fn remove_degenerate_faces(mesh: &mut TriMesh) -> usize {
    let before = mesh.faces.len();
    let verts = &mesh.verts;
    mesh.faces.retain(|(a, b, c)| {
        if a == b || b == c || a == c {
            return false;
        }
        let e1 = v_sub(verts[*b], verts[*a]);
        let e2 = v_sub(verts[*c], verts[*a]);
        v_norm(v_cross(e1, e2)) * 0.5 >= AREA_EPS
    });
    before - mesh.faces.len()
}

/// 第 2 步: 空间哈希顶点合并. 返回合并掉的顶点个数.
///
/// 哈希格边长取 `2 * epsilon`, 查询 3x3x3 邻域即可覆盖所有候选;
/// 合并关系做传递闭包后重映射面片, 再剔除因合并塌缩的面片
/// 并压缩未被引用的顶点.
fn weld_vertices(mesh: &mut TriMesh, epsilon: f64) -> usize {
    if epsilon <= 0.0 || mesh.verts.is_empty() {
        return 0;
    }

    let cell_size = epsilon * 2.0;
    let cell_of = |p: &Vec3d| -> (i64, i64, i64) {
        (
            (p.0 / cell_size).floor() as i64,
            (p.1 / cell_size).floor() as i64,
            (p.2 / cell_size).floor() as i64,
        )
    };

    let mut grid: HashMap<(i64, i64, i64), Vec<usize>> = HashMap::new();
    for (i, v) in mesh.verts.iter().enumerate() {
        grid.entry(cell_of(v)).or_default().push(i);
    }

    let mut remap: Vec<usize> = (0..mesh.verts.len()).collect();
    let mut merged = 0usize;

    for (i, v) in mesh.verts.iter().enumerate() {
        if remap[i] != i {
            continue;
        }
        let cell = cell_of(v);
        for dz in -1..=1i64 {
            for dh in -1..=1i64 {
                for dw in -1..=1i64 {
                    let key = (cell.0 + dz, cell.1 + dh, cell.2 + dw);
                    let Some(candidates) = grid.get(&key) else {
                        continue;
                    };
                    for &j in candidates {
                        if j <= i || remap[j] != j {
                            continue;
                        }
                        if v_dist(*v, mesh.verts[j]) < epsilon {
                            remap[j] = i;
                            merged += 1;
                        }
                    }
                }
            }
        }
    }

    if merged == 0 {
        return 0;
    }

    // 合并关系的传递闭包.
    for i in 0..remap.len() {
        let mut target = remap[i];
        while remap[target] != target {
            target = remap[target];
        }
        remap[i] = target;
    }

    for f in &mut mesh.faces {
        *f = (remap[f.0], remap[f.1], remap[f.2]);
    }
    mesh.faces.retain(|(a, b, c)| a != b && b != c && a != c);
    compact_vertices(mesh);

    merged
}

/// 剔除未被任何面片引用的顶点, 按原顺序压缩顶点数组. 返回剔除个数.
fn compact_vertices(mesh: &mut TriMesh) -> usize {
    let mut used = vec![false; mesh.verts.len()];
    for (a, b, c) in &mesh.faces {
        used[*a] = true;
        used[*b] = true;
        used[*c] = true;
    }

    let mut remap = vec![usize::MAX; mesh.verts.len()];
    let mut kept = Vec::with_capacity(mesh.verts.len());
    for (i, v) in mesh.verts.iter().enumerate() {
        if used[i] {
            remap[i] = kept.len();
            kept.push(*v);
        }
    }

    let removed = mesh.verts.len() - kept.len();
    mesh.verts = kept;
    for f in &mut mesh.faces {
        *f = (remap[f.0], remap[f.1], remap[f.2]);
    }
    removed
}

/// 并查集查找 (带路径减半).
fn find_root(parent: &mut [usize], mut x: usize) -> usize {
    while parent[x] != x {
        parent[x] = parent[parent[x]];
        x = parent[x];
    }
    x
}

/// 第 3 步: 只保留总表面积最大的连通分量.
/// 返回 `(丢弃分量个数, 丢弃面片个数)`.
///
/// 策略固定为最大 "表面积" (而不是体积或先到先得);
/// 面积完全相等时保留根索引最小的分量, 保证确定性.
fn select_largest_component(mesh: &mut TriMesh) -> (usize, usize) {
    if mesh.faces.is_empty() {
        return (0, 0);
    }

    let mut parent: Vec<usize> = (0..mesh.verts.len()).collect();
    for &(a, b, c) in &mesh.faces {
        let ra = find_root(&mut parent, a);
        let rb = find_root(&mut parent, b);
        parent[rb] = ra;
        let rc = find_root(&mut parent, c);
        parent[rc] = ra;
    }

    let roots: Vec<usize> = (0..mesh.faces.len())
        .map(|i| find_root(&mut parent, mesh.faces[i].0))
        .collect();

    let mut area: BTreeMap<usize, f64> = BTreeMap::new();
    for (i, root) in roots.iter().enumerate() {
        *area.entry(*root).or_insert(0.0) += mesh.face_area(i);
    }
    if area.len() <= 1 {
        return (0, 0);
    }

    // 面积是有限非负数, 可直接 unwrap.
    let best = *area
        .iter()
        .max_by_key(|&(root, a)| (NotNan::new(*a).unwrap(), std::cmp::Reverse(*root)))
        .unwrap()
        .0;

    let mut kept = Vec::with_capacity(mesh.faces.len());
    let mut dropped_faces = 0usize;
    for (i, f) in mesh.faces.iter().enumerate() {
        if roots[i] == best {
            kept.push(*f);
        } else {
            dropped_faces += 1;
        }
    }
    let dropped_components = area.len() - 1;
    mesh.faces = kept;
    compact_vertices(mesh);

    (dropped_components, dropped_faces)
}

/// 第 4 步: 质心平移 + 均匀缩放, 使顶点平均距离为 1.
/// 返回 `(平移前质心, 缩放因子)`.
fn normalize_pose(mesh: &mut TriMesh) -> (Vec3d, f64) {
    // 面片非空则顶点非空, 可直接 unwrap.
    let centroid = mesh.vertex_centroid().unwrap();
    for v in &mut mesh.verts {
        *v = v_sub(*v, centroid);
    }

    let mean_r = mesh.mean_radius().unwrap();
    // 非退化面片存在时顶点不可能全部重合.
    debug_assert!(mean_r > 0.0);
    let scale = 1.0 / mean_r;
    for v in &mut mesh.verts {
        *v = v_scale(*v, scale);
    }

    (centroid, scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::phantom;
    use crate::surface::extract_label_surface;

    fn float_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    /// 单位直角三角形对, 其中一对顶点重复但位置相同.
    fn seamed_quad() -> TriMesh {
        TriMesh::new(
            vec![
                (0.0, 0.0, 0.0),
                (1.0, 0.0, 0.0),
                (0.0, 1.0, 0.0),
                // 与前两个顶点位置重复.
                (1.0, 0.0, 0.0),
                (0.0, 1.0, 0.0),
                (1.0, 1.0, 0.0),
            ],
            vec![(0, 1, 2), (3, 5, 4)],
        )
    }

    #[test]
    fn test_empty_mesh_is_rejected() {
        let mut mesh = TriMesh::default();
        assert_eq!(
            sanitize(&mut mesh, &SanitizeParams::default()).unwrap_err(),
            GeometryError::EmptySurface
        );
    }

    #[test]
    fn test_degenerate_faces_are_removed() {
        let mut mesh = TriMesh::new(
            vec![
                (0.0, 0.0, 0.0),
                (1.0, 0.0, 0.0),
                (0.0, 1.0, 0.0),
                (2.0, 0.0, 0.0),
            ],
            vec![
                (0, 1, 2), // 正常
                (0, 1, 1), // 重复索引
                (0, 1, 3), // 共线, 零面积
            ],
        );
        let report = sanitize(&mut mesh, &SanitizeParams::default()).unwrap();
        assert_eq!(report.degenerate_faces, 2);
        assert_eq!(mesh.face_count(), 1);
    }

    #[test]
    fn test_weld_closes_seams() {
        let mut mesh = seamed_quad();
        let report = sanitize(
            &mut mesh,
            &SanitizeParams {
                merge_tolerance: 1e-3,
                keep_all_components: false,
            },
        )
        .unwrap();

        assert_eq!(report.merged_vertices, 2);
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.face_count(), 2);
        // 合并之后公共边被两个面片共享.
        assert!(mesh.edge_incidence().values().any(|cnt| *cnt == 2));
    }

    /// 容差为 0 时跳过合并.
    #[test]
    fn test_zero_tolerance_skips_weld() {
        let mut mesh = seamed_quad();
        let report = sanitize(
            &mut mesh,
            &SanitizeParams {
                merge_tolerance: 0.0,
                // 不合并时两个三角形不连通, 保留全部避免丢弃.
                keep_all_components: true,
            },
        )
        .unwrap();
        assert_eq!(report.merged_vertices, 0);
        assert_eq!(mesh.vertex_count(), 6);
    }

    /// 两个不相交的壳: 默认只保留面积更大的.
    #[test]
    fn test_largest_component_wins() {
        let small = phantom::solid_cuboid((16, 16, 16), (2, 2, 2), (5, 5, 5), 1);
        let big = phantom::solid_cuboid((16, 16, 16), (8, 2, 2), (14, 8, 8), 1);

        // 手动拼出含两个壳的体数据.
        let mut data = small.data().to_owned();
        data.zip_mut_with(&big.data(), |a, b| *a |= *b);
        let vol = crate::data::VolumeGrid::new(data, [1.0; 3]).unwrap();

        let mut mesh = extract_label_surface(&vol, 1).unwrap();
        let faces_before = mesh.face_count();
        let report = sanitize(&mut mesh, &SanitizeParams::default()).unwrap();

        assert_eq!(report.dropped_components, 1);
        assert!(report.dropped_faces > 0);
        assert!(mesh.face_count() < faces_before);
        assert!(mesh.is_watertight());

        // keep_all_components 保留两个壳.
        let mut mesh_all = extract_label_surface(&vol, 1).unwrap();
        let report_all = sanitize(
            &mut mesh_all,
            &SanitizeParams {
                keep_all_components: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(report_all.dropped_components, 0);
        assert_eq!(mesh_all.face_count(), faces_before);
    }

    /// 归一化不变式: 顶点平均距离为 1, 质心为原点.
    #[test]
    fn test_normalization_invariant() {
        let vol = phantom::solid_sphere(12, 4.0, 1);
        let mut mesh = extract_label_surface(&vol, 1).unwrap();
        let report = sanitize(&mut mesh, &SanitizeParams::default()).unwrap();

        assert!(report.scale > 0.0);
        assert!(float_eq(mesh.mean_radius().unwrap(), 1.0));

        let c = mesh.vertex_centroid().unwrap();
        assert!(float_eq(c.0, 0.0) && float_eq(c.1, 0.0) && float_eq(c.2, 0.0));
    }

    /// 实心球 (半径 >= 3 体素) 修复后封闭: 每条边恰好被 2 个面片共享.
    #[test]
    fn test_sphere_is_watertight_after_sanitize() {
        let vol = phantom::solid_sphere(12, 4.0, 1);
        let mut mesh = extract_label_surface(&vol, 1).unwrap();
        sanitize(&mut mesh, &SanitizeParams::default()).unwrap();

        assert!(mesh.edge_incidence().values().all(|cnt| *cnt == 2));
        assert!(mesh.is_manifold());
    }

    /// 对已修复网格再跑一遍: 不再有任何剔除或合并.
    #[test]
    fn test_sanitize_is_idempotent() {
        let vol = phantom::solid_sphere(12, 4.0, 1);
        let mut mesh = extract_label_surface(&vol, 1).unwrap();
        sanitize(&mut mesh, &SanitizeParams::default()).unwrap();

        let faces = mesh.face_count();
        let verts = mesh.vertex_count();
        let report = sanitize(&mut mesh, &SanitizeParams::default()).unwrap();

        assert_eq!(report.degenerate_faces, 0);
        assert_eq!(report.merged_vertices, 0);
        assert_eq!(report.dropped_components, 0);
        assert_eq!(mesh.face_count(), faces);
        assert_eq!(mesh.vertex_count(), verts);
        assert!(float_eq(report.scale, 1.0));
        assert!(float_eq(mesh.mean_radius().unwrap(), 1.0));
    }
}

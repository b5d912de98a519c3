//! 表面重建: 从标签体数据提取三角表面网格.
//!
//! 在布尔掩码 `volume == label` 上运行 boolean surface nets 算法
//! (marching cubes 家族成员): 每个取值混合的 dual cell 产出一个顶点
//! (所有穿越边中点的均值), 每条取值翻转的格点边产出一个四边形
//! (两个三角形), 绕向由固定的 "内 -> 外" 奇偶规则决定.
//!
//! 与查表式 marching cubes 相比, 该算法在布尔场上没有任何歧义构型,
//! 输出是 `(volume, label)` 的纯确定性函数; 这一规则是本库的固定契约.
//!
//! 掩码在每个方向上隐式补一层背景体素, 因此贴着体数据边界的结构
//! 也会产出封闭表面. 输出为带索引网格, 单连通实心标签区域的原始
//! 输出即已封闭 (每条边恰好被 2 个面片共享).

use std::collections::HashMap;

use log::debug;

use crate::data::VolumeGrid;
use crate::error::GeometryError;
use crate::surface::TriMesh;
use crate::{TriIdx, Vec3d};

/// 穿越边对应的四边形顶点查询.
///
/// 一条穿越边的内侧端点一定是有效体素, 因此包含该边的 4 个 cell
/// 全部是混合 cell, 顶点必然存在; 这保证了输出的封闭性.
#[inline]
fn quad(
    cells: [(i64, i64, i64); 4],
    cell_vert: &HashMap<(i64, i64, i64), usize>,
) -> [usize; 4] {
    // 上述不变式保证查询不会失败, 可直接 unwrap.
    cells.map(|c| *cell_vert.get(&c).unwrap())
}

/// 立方体 8 个角的索引偏移, 按 `(z, h, w)` 顺序.
const CORNER_OFFSETS: [(i64, i64, i64); 8] = [
    (0, 0, 0),
    (1, 0, 0),
    (1, 1, 0),
    (0, 1, 0),
    (0, 0, 1),
    (1, 0, 1),
    (1, 1, 1),
    (0, 1, 1),
];

/// 立方体 12 条棱, 以角索引对表示.
const CUBE_EDGES: [(usize, usize); 12] = [
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 0),
    (4, 5),
    (5, 6),
    (6, 7),
    (7, 4),
    (0, 4),
    (1, 5),
    (2, 6),
    (3, 7),
];

/// 提取 `volume` 中所有值为 `label` 的体素的边界表面.
///
/// 输出顶点位于物理坐标系 (经过 `spacing`/`origin`/`orientation` 映射).
///
/// # 错误
///
/// 体数据任何轴上体素个数少于 2 时返回
/// `GeometryError::DegenerateVolume`.
///
/// # 注意
///
/// `label` 在体数据中不存在时返回零顶点零面片的空网格,
/// 这是合法的成功值而不是错误.
pub fn extract_label_surface(
    volume: &VolumeGrid,
    label: u8,
) -> Result<TriMesh, GeometryError> {
    let (nz, nh, nw) = volume.shape();
    if nz < 2 || nh < 2 || nw < 2 {
        return Err(GeometryError::DegenerateVolume);
    }
    if !volume.contains_label(label) {
        return Ok(TriMesh::default());
    }

    let data = volume.data();
    let (nz, nh, nw) = (nz as i64, nh as i64, nw as i64);

    // 掩码查询, 越界一律视为背景 (隐式补一层).
    let inside = |z: i64, h: i64, w: i64| -> bool {
        if z < 0 || h < 0 || w < 0 || z >= nz || h >= nh || w >= nw {
            return false;
        }
        data[(z as usize, h as usize, w as usize)] == label
    };

    // 每个取值混合的 dual cell 产出一个顶点.
    // cell (cz, ch, cw) 的 8 个角为体素中心 (cz..=cz+1, ch..=ch+1, cw..=cw+1).
    let mut verts: Vec<Vec3d> = Vec::new();
    let mut cell_vert: HashMap<(i64, i64, i64), usize> = HashMap::new();

    for cz in -1..nz {
        for ch in -1..nh {
            for cw in -1..nw {
                let mut corner = [false; 8];
                let (mut any_in, mut any_out) = (false, false);
                for (i, (dz, dh, dw)) in CORNER_OFFSETS.iter().enumerate() {
                    let b = inside(cz + dz, ch + dh, cw + dw);
                    corner[i] = b;
                    any_in |= b;
                    any_out |= !b;
                }
                if !(any_in && any_out) {
                    continue;
                }

                // Surface nets 顶点 = 所有穿越边中点的均值 (体素索引坐标).
                let mut acc = (0.0, 0.0, 0.0);
                let mut cnt = 0u32;
                for (a, b) in CUBE_EDGES {
                    if corner[a] == corner[b] {
                        continue;
                    }
                    let (az, ah, aw) = CORNER_OFFSETS[a];
                    let (bz, bh, bw) = CORNER_OFFSETS[b];
                    acc.0 += (cz + az) as f64 + (cz + bz) as f64;
                    acc.1 += (ch + ah) as f64 + (ch + bh) as f64;
                    acc.2 += (cw + aw) as f64 + (cw + bw) as f64;
                    cnt += 1;
                }

                // 角取值混合则必有穿越边.
                debug_assert!(cnt > 0);
                let k = 1.0 / (2 * cnt) as f64;
                let idx = (acc.0 * k, acc.1 * k, acc.2 * k);

                cell_vert.insert((cz, ch, cw), verts.len());
                verts.push(volume.index_to_physical(idx));
            }
        }
    }

    let mut faces: Vec<TriIdx> = Vec::new();

    let mut emit = |q: [usize; 4], flip: bool| {
        let [i0, i1, i2, i3] = q;
        if flip {
            faces.push((i0, i1, i2));
            faces.push((i0, i2, i3));
        } else {
            faces.push((i0, i3, i2));
            faces.push((i0, i2, i1));
        }
    };

    // z 方向格点边: (z, h, w) -> (z+1, h, w). 相邻 4 个 cell 在 h/w 方向展开.
    for z in -1..nz {
        for h in 0..nh {
            for w in 0..nw {
                let a = inside(z, h, w);
                let b = inside(z + 1, h, w);
                if a == b {
                    continue;
                }
                let q = quad(
                    [
                        (z, h - 1, w - 1),
                        (z, h - 1, w),
                        (z, h, w),
                        (z, h, w - 1),
                    ],
                    &cell_vert,
                );
                emit(q, a);
            }
        }
    }

    // h 方向格点边: (z, h, w) -> (z, h+1, w). 相邻 4 个 cell 在 z/w 方向展开.
    for z in 0..nz {
        for h in -1..nh {
            for w in 0..nw {
                let a = inside(z, h, w);
                let b = inside(z, h + 1, w);
                if a == b {
                    continue;
                }
                let q = quad(
                    [
                        (z - 1, h, w - 1),
                        (z, h, w - 1),
                        (z, h, w),
                        (z - 1, h, w),
                    ],
                    &cell_vert,
                );
                emit(q, a);
            }
        }
    }

    // w 方向格点边: (z, h, w) -> (z, h, w+1). 相邻 4 个 cell 在 z/h 方向展开.
    for z in 0..nz {
        for h in 0..nh {
            for w in -1..nw {
                let a = inside(z, h, w);
                let b = inside(z, h, w + 1);
                if a == b {
                    continue;
                }
                let q = quad(
                    [
                        (z - 1, h - 1, w),
                        (z - 1, h, w),
                        (z, h, w),
                        (z, h - 1, w),
                    ],
                    &cell_vert,
                );
                emit(q, a);
            }
        }
    }

    debug!(
        "surface extraction: label {} -> {} verts, {} faces",
        label,
        verts.len(),
        faces.len()
    );

    Ok(TriMesh { verts, faces })
}

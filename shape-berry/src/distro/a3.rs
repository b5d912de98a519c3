//! A3 分布: 表面随机点三元组的夹角 (顶点在中间点), 以度为单位.

use super::{draw_rng, surface_point, AreaTable};
use crate::surface::{v_dot, v_norm, v_sub, TriMesh};

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IntoParallelIterator, ParallelIterator};
    }
}

/// 第 `index` 次抽取: 采三个表面点, 返回 `p1-p2-p3` 在 `p2` 处的夹角.
///
/// 退化三元组 (两点重合) 没有良定义的夹角, 返回 `None`.
#[inline]
fn draw_angle(mesh: &TriMesh, table: &AreaTable, seed: u64, index: u64) -> Option<f64> {
    let mut rng = draw_rng(seed, index);
    let p1 = surface_point(mesh, table, &mut rng);
    let p2 = surface_point(mesh, table, &mut rng);
    let p3 = surface_point(mesh, table, &mut rng);

    let u = v_sub(p1, p2);
    let v = v_sub(p3, p2);
    let denom = v_norm(u) * v_norm(v);
    if denom <= 0.0 {
        return None;
    }

    let cos = (v_dot(u, v) / denom).clamp(-1.0, 1.0);
    Some(cos.acos().to_degrees())
}

/// 采集 `triples` 个夹角 (度), 丢弃退化三元组.
///
/// 固定种子下输出与执行方式无关.
#[cfg(feature = "rayon")]
pub(crate) fn collect_angles(
    mesh: &TriMesh,
    table: &AreaTable,
    triples: u32,
    seed: u64,
) -> Vec<f64> {
    (0..triples as u64)
        .into_par_iter()
        .filter_map(|i| draw_angle(mesh, table, seed, i))
        .collect()
}

/// 采集 `triples` 个夹角 (串行版本).
#[cfg(not(feature = "rayon"))]
pub(crate) fn collect_angles(
    mesh: &TriMesh,
    table: &AreaTable,
    triples: u32,
    seed: u64,
) -> Vec<f64> {
    (0..triples as u64)
        .filter_map(|i| draw_angle(mesh, table, seed, i))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> TriMesh {
        TriMesh::new(
            vec![
                (0.0, 0.0, 0.0),
                (1.0, 0.0, 0.0),
                (1.0, 1.0, 0.0),
                (0.0, 1.0, 0.0),
            ],
            vec![(0, 1, 2), (0, 2, 3)],
        )
    }

    #[test]
    fn test_angles_are_in_degree_range() {
        let mesh = unit_square();
        let table = AreaTable::build(&mesh).unwrap();
        let angles = collect_angles(&mesh, &table, 512, 5);

        // 几乎不可能抽到重合点, 允许个别丢弃.
        assert!(angles.len() >= 500);
        assert!(angles.iter().all(|a| (0.0..=180.0).contains(a)));
        // 平面上的夹角应当铺开而不是集中于一个值.
        assert!(angles.iter().any(|a| *a < 60.0));
        assert!(angles.iter().any(|a| *a > 90.0));
    }
}

//! 网格输出边界: ASCII PLY 导出.
//!
//! 只负责把顶点/面片列表交给外部工具链; 二进制格式与其它
//! 3D 文件格式由外部导出协作者处理.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::surface::TriMesh;

/// 将网格以 ASCII PLY 格式写入 `writer`.
///
/// 顶点坐标按 `x y z` 输出为 `double`; 面片为三顶点索引列表.
pub fn write_ply<W: Write>(mesh: &TriMesh, writer: &mut W) -> io::Result<()> {
    writeln!(writer, "ply")?;
    writeln!(writer, "format ascii 1.0")?;
    writeln!(writer, "element vertex {}", mesh.vertex_count())?;
    writeln!(writer, "property double x")?;
    writeln!(writer, "property double y")?;
    writeln!(writer, "property double z")?;
    writeln!(writer, "element face {}", mesh.face_count())?;
    writeln!(writer, "property list uchar int vertex_indices")?;
    writeln!(writer, "end_header")?;

    for (x, y, z) in mesh.vertices() {
        writeln!(writer, "{x} {y} {z}")?;
    }
    for (a, b, c) in mesh.faces() {
        writeln!(writer, "3 {a} {b} {c}")?;
    }
    Ok(())
}

/// 将网格保存为本地 PLY 文件. `path` 为目标路径.
pub fn save_ply<P: AsRef<Path>>(mesh: &TriMesh, path: P) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_ply(mesh, &mut writer)?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_ply_layout() {
        let mesh = TriMesh::new(
            vec![(0.0, 0.0, 0.0), (1.0, 0.0, 0.0), (0.0, 1.0, 0.0)],
            vec![(0, 1, 2)],
        );

        let mut buf = Vec::new();
        write_ply(&mesh, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "ply");
        assert!(lines.contains(&"element vertex 3"));
        assert!(lines.contains(&"element face 1"));
        assert!(lines.contains(&"end_header"));
        assert_eq!(*lines.last().unwrap(), "3 0 1 2");

        // header 之后恰好 3 行顶点 + 1 行面片.
        let header_end = lines.iter().position(|l| *l == "end_header").unwrap();
        assert_eq!(lines.len() - header_end - 1, 4);
    }

    /// 空网格也能合法导出 (零元素表).
    #[test]
    fn test_write_empty_mesh() {
        let mut buf = Vec::new();
        write_ply(&TriMesh::default(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("element vertex 0"));
        assert!(text.contains("element face 0"));
    }
}

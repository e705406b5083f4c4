//! # 映射结果导出
//!
//! ## 支持格式
//! - CSV: 每个结果一行（排名、代价、det T、T、N）
//! - JSON: `pretty_json` 输出写入文件
//!
//! ## 依赖关系
//! - 被 `commands/lattices.rs`、`commands/structures.rs` 调用
//! - 使用 `csv` 库写入 CSV 文件

use crate::error::{MappingError, Result};
use crate::geometry::integer;
use crate::info::json::pretty_json;
use crate::info::lattice_mapping::{LatticeMapping, LatticeMappingResults};
use crate::info::structure_mapping::StructureMappingResults;

use serde::Serialize;
use std::path::Path;

fn matrix_field(m: &nalgebra::Matrix3<i64>) -> String {
    integer::row_major(m)
        .iter()
        .map(|x| x.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn lattice_fields(mapping: &LatticeMapping) -> [String; 3] {
    [
        mapping.volume().to_string(),
        matrix_field(&mapping.transformation_matrix_to_super),
        matrix_field(&mapping.reorientation),
    ]
}

fn flush(mut wtr: csv::Writer<std::fs::File>, output_path: &Path) -> Result<()> {
    wtr.flush().map_err(|e| MappingError::FileWriteError {
        path: output_path.display().to_string(),
        source: e,
    })
}

/// 导出晶格映射结果为 CSV
pub fn lattice_results_to_csv(results: &LatticeMappingResults, output_path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(output_path)?;
    wtr.write_record(["rank", "lattice_cost", "volume", "T", "N"])?;

    for (rank, scored) in results.iter().enumerate() {
        let [volume, t, n] = lattice_fields(&scored.lattice_mapping);
        wtr.write_record([
            (rank + 1).to_string(),
            format!("{:.8e}", scored.lattice_cost),
            volume,
            t,
            n,
        ])?;
    }

    flush(wtr, output_path)
}

/// 导出结构映射结果为 CSV
pub fn structure_results_to_csv(
    results: &StructureMappingResults,
    output_path: &Path,
) -> Result<()> {
    let mut wtr = csv::Writer::from_path(output_path)?;
    wtr.write_record([
        "rank",
        "total_cost",
        "lattice_cost",
        "atom_cost",
        "volume",
        "T",
        "N",
    ])?;

    for (rank, scored) in results.iter().enumerate() {
        let [volume, t, n] = lattice_fields(&scored.structure_mapping.lattice_mapping);
        wtr.write_record([
            (rank + 1).to_string(),
            format!("{:.8e}", scored.total_cost()),
            format!("{:.8e}", scored.lattice_cost()),
            format!("{:.8e}", scored.atom_cost()),
            volume,
            t,
            n,
        ])?;
    }

    flush(wtr, output_path)
}

/// 以 `pretty_json` 格式写入文件
pub fn write_json<T: Serialize + ?Sized>(value: &T, output_path: &Path) -> Result<()> {
    let mut text = pretty_json(value)?;
    text.push('\n');
    std::fs::write(output_path, text).map_err(|e| MappingError::FileWriteError {
        path: output_path.display().to_string(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::info::lattice_mapping::ScoredLatticeMapping;

    #[test]
    fn test_lattice_results_to_csv() {
        let results = LatticeMappingResults::from_unsorted(vec![ScoredLatticeMapping::new(
            0.0,
            LatticeMapping::identity(),
        )]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lattices.csv");
        lattice_results_to_csv(&results, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "rank,lattice_cost,volume,T,N");
        assert!(lines[1].starts_with("1,0.00000000e0,1,1 0 0 0 1 0 0 0 1,"));
    }

    #[test]
    fn test_structure_results_to_csv() {
        use crate::info::atom_mapping::AtomMapping;
        use crate::info::cost::StructureMappingCost;
        use crate::info::structure_mapping::{ScoredStructureMapping, StructureMapping};
        use crate::models::{Lattice, Prim, PrimSite};
        use nalgebra::Vector3;
        use std::sync::Arc;

        let prim = Arc::new(Prim::new(
            "A",
            Lattice::from_parameters(3.0, 3.0, 3.0, 90.0, 90.0, 90.0),
            vec![PrimSite::new([0.0, 0.0, 0.0], vec!["A".into()])],
        ));
        let mapping = StructureMapping::new(
            prim,
            LatticeMapping::identity(),
            AtomMapping::new(vec![Vector3::zeros()], vec![0], Vector3::zeros()).unwrap(),
        )
        .unwrap();
        let results = StructureMappingResults::from_unsorted(vec![ScoredStructureMapping::new(
            StructureMappingCost::new(0.02, 0.04, 0.5),
            mapping,
        )]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("structures.csv");
        structure_results_to_csv(&results, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "rank,total_cost,lattice_cost,atom_cost,volume,T,N");
        assert!(lines[1].starts_with("1,3.00000000e-2,2.00000000e-2,4.00000000e-2,1,"));
    }

    #[test]
    fn test_write_json_appends_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mapping.json");
        write_json(&LatticeMapping::identity(), &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.ends_with("}\n"));
    }
}

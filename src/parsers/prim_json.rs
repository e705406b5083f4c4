//! # prim JSON 格式解析器
//!
//! prim 描述父结构：每个基元位点可以允许多种占位，`Va` 表示空位。
//!
//! ```json
//! {
//!   "title": "FCC_AB",
//!   "lattice_vectors": [[0.0, 2.0, 2.0], [2.0, 0.0, 2.0], [2.0, 2.0, 0.0]],
//!   "coordinate_mode": "Fractional",
//!   "basis": [
//!     {"coordinate": [0.0, 0.0, 0.0], "occupants": ["A", "B", "Va"]}
//!   ]
//! }
//! ```
//!
//! `lattice_vectors` 按行给出 a, b, c；`coordinate_mode` 可为
//! `Fractional`/`Direct` 或 `Cartesian`，省略时按分数坐标处理。
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs` 使用
//! - 使用 `models/prim.rs`

use crate::error::{MappingError, Result};
use crate::models::{Lattice, Prim, PrimSite};

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Serialize, Deserialize)]
struct PrimJson {
    #[serde(default)]
    title: Option<String>,
    lattice_vectors: [[f64; 3]; 3],
    #[serde(default)]
    coordinate_mode: Option<String>,
    basis: Vec<BasisJson>,
}

#[derive(Debug, Serialize, Deserialize)]
struct BasisJson {
    coordinate: [f64; 3],
    occupants: Vec<String>,
}

fn parse_error(name: &str, reason: impl Into<String>) -> MappingError {
    MappingError::ParseError {
        format: "prim json".to_string(),
        path: name.to_string(),
        reason: reason.into(),
    }
}

/// 解析 prim JSON 文件
pub fn parse_prim_file(path: &Path) -> Result<Prim> {
    let content = fs::read_to_string(path).map_err(|e| MappingError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    let default_name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("prim");
    parse_prim_content(&content, default_name)
}

/// 从字符串内容解析 prim JSON
pub fn parse_prim_content(content: &str, default_name: &str) -> Result<Prim> {
    let raw: PrimJson =
        serde_json::from_str(content).map_err(|e| parse_error(default_name, e.to_string()))?;
    let name = raw
        .title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| default_name.to_string());
    let lattice = Lattice::from_vectors(raw.lattice_vectors);

    let cartesian = match raw.coordinate_mode.as_deref().map(str::to_lowercase) {
        None => false,
        Some(mode) if mode.starts_with('f') || mode.starts_with('d') => false,
        Some(mode) if mode.starts_with('c') => true,
        Some(mode) => {
            return Err(parse_error(
                &name,
                format!("unknown coordinate_mode '{}'", mode),
            ))
        }
    };

    let basis = raw
        .basis
        .into_iter()
        .map(|b| {
            let coordinate = if cartesian {
                let f = lattice.cart_to_frac(&Vector3::from(b.coordinate));
                [f.x, f.y, f.z]
            } else {
                b.coordinate
            };
            PrimSite::new(coordinate, b.occupants)
        })
        .collect();

    let prim = Prim::new(name, lattice, basis);
    prim.validate()?;
    Ok(prim)
}

/// 将 prim 转为 JSON（分数坐标）
pub fn to_prim_json(prim: &Prim) -> Result<String> {
    let raw = PrimJson {
        title: Some(prim.name.clone()),
        lattice_vectors: prim.lattice.matrix,
        coordinate_mode: Some("Fractional".to_string()),
        basis: prim
            .basis
            .iter()
            .map(|s| BasisJson {
                coordinate: s.coordinate,
                occupants: s.occupants.clone(),
            })
            .collect(),
    };
    crate::info::pretty_json(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FCC_AB: &str = r#"{
  "title": "FCC_AB",
  "lattice_vectors": [[0.0, 2.0, 2.0], [2.0, 0.0, 2.0], [2.0, 2.0, 0.0]],
  "coordinate_mode": "Fractional",
  "basis": [
    {"coordinate": [0.0, 0.0, 0.0], "occupants": ["A", "B", "Va"]}
  ]
}"#;

    #[test]
    fn test_parse_prim_fractional() {
        let prim = parse_prim_content(FCC_AB, "default").unwrap();
        assert_eq!(prim.name, "FCC_AB");
        assert_eq!(prim.n_sites(), 1);
        assert!(prim.basis[0].allows("B"));
        assert!(prim.basis[0].allows_vacancy());
        assert!((prim.lattice.volume().abs() - 16.0).abs() < 1e-10);
    }

    #[test]
    fn test_parse_prim_cartesian() {
        let content = r#"{
  "lattice_vectors": [[3.0, 0.0, 0.0], [0.0, 3.0, 0.0], [0.0, 0.0, 3.0]],
  "coordinate_mode": "Cartesian",
  "basis": [
    {"coordinate": [0.0, 0.0, 0.0], "occupants": ["Fe"]},
    {"coordinate": [1.5, 1.5, 1.5], "occupants": ["Fe", "Va"]}
  ]
}"#;
        let prim = parse_prim_content(content, "bcc").unwrap();
        assert_eq!(prim.name, "bcc");
        assert!((prim.basis[1].frac() - Vector3::new(0.5, 0.5, 0.5)).norm() < 1e-12);
        assert_eq!(prim.n_vacancy_sites(), 1);
    }

    #[test]
    fn test_parse_prim_rejects_bad_input() {
        let no_occupants = r#"{
  "lattice_vectors": [[3.0, 0.0, 0.0], [0.0, 3.0, 0.0], [0.0, 0.0, 3.0]],
  "basis": [{"coordinate": [0.0, 0.0, 0.0], "occupants": []}]
}"#;
        assert!(matches!(
            parse_prim_content(no_occupants, "x"),
            Err(MappingError::InvalidInput(_))
        ));

        let bad_mode = FCC_AB.replace("Fractional", "Spherical");
        assert!(matches!(
            parse_prim_content(&bad_mode, "x"),
            Err(MappingError::ParseError { .. })
        ));

        assert!(matches!(
            parse_prim_content("{\"basis\": []}", "x"),
            Err(MappingError::ParseError { .. })
        ));
    }

    #[test]
    fn test_prim_json_round_trip() {
        let prim = parse_prim_content(FCC_AB, "default").unwrap();
        let text = to_prim_json(&prim).unwrap();
        let again = parse_prim_content(&text, "default").unwrap();
        assert_eq!(prim, again);
        assert_eq!(again.basis[0].occupants, vec!["A", "B", "Va"]);
    }
}

//! # VASP POSCAR 格式解析器
//!
//! 读写 VASP POSCAR/CONTCAR 文件，作为映射的子结构输入和映射后结构输出。
//!
//! ## POSCAR 格式说明
//! ```text
//! Comment line (structure name)
//! 1.0                    # scaling factor (负值表示目标体积)
//! a1 a2 a3               # lattice vector a
//! b1 b2 b3               # lattice vector b
//! c1 c2 c3               # lattice vector c
//! Element1 Element2 ...  # element symbols (VASP 5+)
//! n1 n2 ...              # number of atoms per element
//! Selective dynamics     # optional
//! Direct/Cartesian       # coordinate type
//! x1 y1 z1               # atom positions
//! ...
//! ```
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs`、`commands/` 使用
//! - 使用 `models/structure.rs`

use crate::error::{MappingError, Result};
use crate::models::{Lattice, Site, Structure};

use nalgebra::Vector3;
use std::fs;
use std::path::Path;

/// 解析 POSCAR/CONTCAR 文件
pub fn parse_poscar_file(path: &Path) -> Result<Structure> {
    let content = fs::read_to_string(path).map_err(|e| MappingError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_poscar_content(
        &content,
        path.file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown"),
    )
}

fn parse_error(name: &str, reason: impl Into<String>) -> MappingError {
    MappingError::ParseError {
        format: "poscar".to_string(),
        path: name.to_string(),
        reason: reason.into(),
    }
}

fn parse_floats(line: &str) -> Vec<f64> {
    line.split_whitespace()
        .map_while(|s| s.parse().ok())
        .collect()
}

/// 从字符串内容解析 POSCAR 格式
pub fn parse_poscar_content(content: &str, default_name: &str) -> Result<Structure> {
    let lines: Vec<&str> = content.lines().collect();

    if lines.len() < 7 {
        return Err(parse_error(default_name, "File too short"));
    }

    let name = match lines[0].trim() {
        "" => default_name.to_string(),
        comment => comment.to_string(),
    };

    let scale: f64 = lines[1]
        .split_whitespace()
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| parse_error(&name, "Invalid scaling factor at line 2"))?;

    let mut matrix = [[0.0; 3]; 3];
    for (i, row) in matrix.iter_mut().enumerate() {
        let parts = parse_floats(lines[2 + i]);
        if parts.len() < 3 {
            return Err(parse_error(
                &name,
                format!("Invalid lattice vector at line {}", 3 + i),
            ));
        }
        *row = [parts[0], parts[1], parts[2]];
    }

    // 负缩放因子表示目标体积
    let raw = Lattice::from_vectors(matrix);
    let factor = if scale < 0.0 {
        let volume = raw.volume().abs();
        if volume < f64::EPSILON {
            return Err(parse_error(&name, "Degenerate lattice with volume scaling"));
        }
        (-scale / volume).cbrt()
    } else {
        scale
    };
    for row in matrix.iter_mut() {
        for x in row.iter_mut() {
            *x *= factor;
        }
    }
    let lattice = Lattice::from_vectors(matrix);

    // 第 6 行：VASP 5 元素符号，或 VASP 4 的原子数
    let line5_parts: Vec<&str> = lines[5].split_whitespace().collect();
    let first = line5_parts
        .first()
        .ok_or_else(|| parse_error(&name, "Missing species line"))?;
    let (elements, counts, atom_line_start) = if first.parse::<usize>().is_ok() {
        let counts: Vec<usize> = line5_parts.iter().map_while(|s| s.parse().ok()).collect();
        let elements: Vec<String> = (0..counts.len()).map(|i| format!("X{}", i + 1)).collect();
        (elements, counts, 6)
    } else {
        let elements: Vec<String> = line5_parts
            .iter()
            .take_while(|s| !s.starts_with('!') && !s.starts_with('#'))
            .map(|s| s.to_string())
            .collect();
        let counts: Vec<usize> = lines
            .get(6)
            .map(|l| l.split_whitespace().map_while(|s| s.parse().ok()).collect())
            .unwrap_or_default();
        (elements, counts, 7)
    };

    if counts.is_empty() || counts.len() != elements.len() {
        return Err(parse_error(
            &name,
            format!(
                "{} species but {} atom counts",
                elements.len(),
                counts.len()
            ),
        ));
    }

    let mut coord_line = atom_line_start;
    if lines
        .get(coord_line)
        .is_some_and(|l| l.trim().to_lowercase().starts_with('s'))
    {
        coord_line += 1;
    }

    let coord_type = lines
        .get(coord_line)
        .ok_or_else(|| parse_error(&name, "Missing coordinate type line"))?
        .trim()
        .to_lowercase();
    let is_cartesian = coord_type.starts_with('c') || coord_type.starts_with('k');

    let n_atoms: usize = counts.iter().sum();
    let mut sites: Vec<Site> = Vec::with_capacity(n_atoms);
    let mut line_idx = coord_line + 1;

    for (elem, &count) in elements.iter().zip(counts.iter()) {
        for _ in 0..count {
            let parts = lines
                .get(line_idx)
                .map(|l| parse_floats(l))
                .unwrap_or_default();
            if parts.len() < 3 {
                return Err(parse_error(
                    &name,
                    format!("Expected {} positions, invalid line {}", n_atoms, line_idx + 1),
                ));
            }
            let v = Vector3::new(parts[0], parts[1], parts[2]);
            let frac = if is_cartesian {
                lattice.cart_to_frac(&(v * factor))
            } else {
                v
            };
            sites.push(Site::new(elem.clone(), [frac.x, frac.y, frac.z]));
            line_idx += 1;
        }
    }

    Ok(Structure::new(name, lattice, sites))
}

/// 将结构转换为 POSCAR 格式字符串（VASP 5，Direct）
///
/// 位点顺序保持不变：相同占位的连续位点合并为一组，
/// 因此交错排列的占位会产生重复的元素符号。
pub fn to_poscar_string(structure: &Structure) -> String {
    let mut groups: Vec<(&str, Vec<[f64; 3]>)> = Vec::new();
    for site in &structure.sites {
        match groups.last_mut() {
            Some((occupant, positions)) if *occupant == site.occupant => {
                positions.push(site.position)
            }
            _ => groups.push((site.occupant.as_str(), vec![site.position])),
        }
    }

    let mut result = String::new();

    result.push_str(&format!("{}\n", structure.name));
    result.push_str("1.0\n");

    for row in &structure.lattice.matrix {
        result.push_str(&format!(
            "  {:16.10}  {:16.10}  {:16.10}\n",
            row[0], row[1], row[2]
        ));
    }

    let symbols: Vec<&str> = groups.iter().map(|(e, _)| *e).collect();
    result.push_str(&format!("   {}\n", symbols.join("   ")));

    let counts: Vec<String> = groups.iter().map(|(_, p)| p.len().to_string()).collect();
    result.push_str(&format!("   {}\n", counts.join("   ")));

    result.push_str("Direct\n");

    for (_, positions) in &groups {
        for pos in positions {
            result.push_str(&format!(
                "  {:16.10}  {:16.10}  {:16.10}\n",
                pos[0], pos[1], pos[2]
            ));
        }
    }

    result
}

/// 写出 POSCAR 文件
pub fn write_poscar(structure: &Structure, path: &Path) -> Result<()> {
    fs::write(path, to_poscar_string(structure)).map_err(|e| MappingError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })
}

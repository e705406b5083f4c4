//! # apply 子命令实现
//!
//! 读取保存的结构映射结果，选取指定排名的映射，写出映射后的子结构。
//!
//! ## 依赖关系
//! - 使用 `cli/apply.rs` 定义的 ApplyArgs
//! - 使用 `xtalmap::methods::make_mapped_structure`

use crate::cli::apply::ApplyArgs;
use crate::utils::output;
use xtalmap::error::{MappingError, Result};
use xtalmap::info::{from_json, ScoredStructureMapping, StructureMappingResults};
use xtalmap::methods::make_mapped_structure;
use xtalmap::parsers::{self, poscar};

use std::fs;
use std::path::Path;

/// 读取结构映射结果 JSON
fn load_results(path: &Path) -> Result<StructureMappingResults> {
    let text = fs::read_to_string(path).map_err(|e| MappingError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    from_json(&text)
}

/// 按排名（从 1 开始）选取映射
fn select_rank(results: &StructureMappingResults, rank: usize) -> Result<&ScoredStructureMapping> {
    if rank == 0 {
        return Err(MappingError::InvalidArgument(
            "rank starts at 1".to_string(),
        ));
    }
    results.get(rank - 1).ok_or_else(|| {
        MappingError::InvalidArgument(format!(
            "rank {} requested but only {} mappings are stored",
            rank,
            results.len()
        ))
    })
}

/// 执行映射应用
pub fn execute(args: ApplyArgs) -> Result<()> {
    output::print_header("Apply Structure Mapping");

    let results = load_results(&args.mapping)?;
    let scored = select_rank(&results, args.rank)?;
    let child = parsers::parse_structure_file(&args.child)?;

    output::print_info(&format!(
        "Mapping rank {}: total cost {:.6} (lattice {:.6}, atom {:.6})",
        args.rank,
        scored.total_cost(),
        scored.lattice_cost(),
        scored.atom_cost()
    ));

    let mapped = make_mapped_structure(&child, &scored.structure_mapping)?;
    poscar::write_poscar(&mapped, &args.output)?;
    output::print_written(&child.name, &args.output.display().to_string());

    Ok(())
}

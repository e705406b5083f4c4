//! # structures 子命令实现
//!
//! 搜索 prim 到子结构的结构映射。
//!
//! ## 功能
//! - 单文件模式：打印排序结果表，可选写出 JSON、CSV 与映射后结构
//! - 批量模式：并行映射目录中的所有子结构，
//!   每个子结构写出 `<stem>_mapping.json`（及 `<stem>_mapped.vasp`）
//!
//! ## 依赖关系
//! - 使用 `cli/structures.rs` 定义的 StructuresArgs
//! - 使用 `batch/` 模块进行批量处理
//! - 使用 `xtalmap::methods` 搜索与构造映射

use super::format_matrix;
use crate::batch::{BatchRunner, FileCollector, ProcessResult};
use crate::cli::structures::StructuresArgs;
use crate::cli::GlobalArgs;
use crate::utils::{output, progress};
use xtalmap::error::{MappingError, Result};
use xtalmap::info::{export, StructureMappingResults};
use xtalmap::methods::{make_mapped_structure, map_structures, StructureMappingSearchOptions};
use xtalmap::models::{Prim, Structure};
use xtalmap::parsers::{self, poscar};

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tabled::{Table, Tabled};

/// 结构映射结果行
#[derive(Debug, Clone, Tabled)]
struct StructureRow {
    #[tabled(rename = "Rank")]
    rank: usize,
    #[tabled(rename = "Total")]
    total: String,
    #[tabled(rename = "Lattice")]
    lattice: String,
    #[tabled(rename = "Atom")]
    atom: String,
    #[tabled(rename = "Vol")]
    volume: i64,
    #[tabled(rename = "T")]
    t: String,
}

/// 由命令行参数构造搜索选项
fn build_options(args: &StructuresArgs, global: &GlobalArgs) -> StructureMappingSearchOptions {
    let mut options = StructureMappingSearchOptions::default()
        .with_k_best(args.k_best)
        .with_lattice_k_best(args.lattice_k_best)
        .with_max_lattice_cost(args.max_lattice_cost)
        .with_total_cost_range(0.0, args.max_total_cost)
        .with_lattice_cost_weight(args.lattice_weight)
        .with_lattice_cost_method(args.cost_method.into())
        .with_budget(global.budget());
    options.min_volume = args.min_vol;
    options.max_volume = args.max_vol;
    options
}

fn result_rows(results: &StructureMappingResults) -> Vec<StructureRow> {
    results
        .iter()
        .enumerate()
        .map(|(i, scored)| {
            let lm = &scored.structure_mapping.lattice_mapping;
            StructureRow {
                rank: i + 1,
                total: format!("{:.6}", scored.total_cost()),
                lattice: format!("{:.6}", scored.lattice_cost()),
                atom: format!("{:.6}", scored.atom_cost()),
                volume: lm.volume(),
                t: format_matrix(&lm.transformation_matrix_to_super),
            }
        })
        .collect()
}

/// 执行结构映射
pub fn execute(args: StructuresArgs, global: &GlobalArgs) -> Result<()> {
    output::print_header("Structure Mapping");

    let prim = Arc::new(parsers::parse_prim_file(&args.prim)?);
    output::print_info(&format!(
        "Prim '{}': {} sites, {} allowing vacancies",
        prim.name,
        prim.n_sites(),
        prim.n_vacancy_sites()
    ));

    let options = build_options(&args, global);
    options.validate()?;

    if args.child.is_file() {
        execute_single_file(&args, &prim, &options)
    } else if args.child.is_dir() {
        execute_batch(&args, &prim, &options)
    } else {
        Err(MappingError::FileNotFound {
            path: args.child.display().to_string(),
        })
    }
}

/// 单文件模式
fn execute_single_file(
    args: &StructuresArgs,
    prim: &Arc<Prim>,
    options: &StructureMappingSearchOptions,
) -> Result<()> {
    let child = parsers::parse_structure_file(&args.child)?;
    output::print_info(&format!(
        "Child '{}': {} ({} atoms)",
        child.name,
        child.formula(),
        child.sites.len()
    ));

    let spinner = progress::create_spinner("Searching structure mappings...");
    let results = map_structures(prim, &child, options);
    spinner.finish_and_clear();
    let results = results?;

    if results.is_empty() {
        output::print_warning("No structure mapping found within the cost and volume limits");
        return Ok(());
    }

    println!("{}", Table::new(result_rows(&results)));
    output::print_success(&format!("Found {} structure mappings", results.len()));

    if let Some(path) = &args.output {
        check_overwrite(path, args.overwrite)?;
        export::write_json(&results, path)?;
        output::print_written("JSON", &path.display().to_string());
    }
    if let Some(path) = &args.csv {
        export::structure_results_to_csv(&results, path)?;
        output::print_written("CSV", &path.display().to_string());
    }
    if args.write_mapped {
        let path = mapped_path(&args.child, args.output.as_deref());
        check_overwrite(&path, args.overwrite)?;
        write_best_mapped(&child, &results, &path)?;
        output::print_written("POSCAR", &path.display().to_string());
    }

    Ok(())
}

/// 批量处理模式
fn execute_batch(
    args: &StructuresArgs,
    prim: &Arc<Prim>,
    options: &StructureMappingSearchOptions,
) -> Result<()> {
    output::print_info(&format!("Batch mode: directory '{}'", args.child.display()));

    let files = FileCollector::new(args.child.clone())
        .with_pattern(&args.pattern)
        .recursive(args.recursive)
        .collect();

    if files.is_empty() {
        output::print_warning(&format!(
            "No matching files found with pattern '{}'",
            args.pattern
        ));
        return Ok(());
    }
    output::print_info(&format!("Found {} child structures", files.len()));

    let output_dir = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from("mappings"));
    fs::create_dir_all(&output_dir).map_err(|e| MappingError::FileWriteError {
        path: output_dir.display().to_string(),
        source: e,
    })?;

    let config = BatchConfig {
        prim: Arc::clone(prim),
        options: options.clone(),
        output_dir,
        write_mapped: args.write_mapped,
        overwrite: args.overwrite,
    };

    let runner = BatchRunner::new(args.jobs);
    let result = runner.run(files, |file| process_batch_file(file, &config))?;

    output::print_separator();
    output::print_success(&format!(
        "Batch complete: {} of {} mapped, {} skipped, {} failed",
        result.success,
        result.total(),
        result.skipped,
        result.failed
    ));

    if !result.failures.is_empty() {
        output::print_warning("Failed files:");
        for (path, err) in result.failures.iter().take(10) {
            output::print_error(&format!("  {}: {}", path, err));
        }
        if result.failures.len() > 10 {
            output::print_warning(&format!("  ... and {} more", result.failures.len() - 10));
        }
    }

    Ok(())
}

/// 批量处理配置
struct BatchConfig {
    prim: Arc<Prim>,
    options: StructureMappingSearchOptions,
    output_dir: PathBuf,
    write_mapped: bool,
    overwrite: bool,
}

/// 处理批量模式中的单个子结构
fn process_batch_file(input: &PathBuf, config: &BatchConfig) -> ProcessResult {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("child");
    let json_path = config.output_dir.join(format!("{}_mapping.json", stem));

    if json_path.exists() && !config.overwrite {
        return ProcessResult::Skipped(format!("Output exists, skipping: {}", json_path.display()));
    }

    match map_one(input, &json_path, stem, config) {
        Ok(Some(n)) => ProcessResult::Success(format!(
            "{} -> {} ({} mappings)",
            input.display(),
            json_path.display(),
            n
        )),
        Ok(None) => ProcessResult::Skipped(format!("No mapping found: {}", input.display())),
        // 输入无效或映射不一致的结构记为失败，其余错误也一并汇报
        Err(e) if e.is_mapping_failure() => {
            ProcessResult::Failed(input.display().to_string(), format!("cannot map: {}", e))
        }
        Err(e) => ProcessResult::Failed(input.display().to_string(), e.to_string()),
    }
}

/// 映射单个子结构并写出结果；未找到映射时返回 None
fn map_one(
    input: &Path,
    json_path: &Path,
    stem: &str,
    config: &BatchConfig,
) -> Result<Option<usize>> {
    let child = parsers::parse_structure_file(input)?;
    let results = map_structures(&config.prim, &child, &config.options)?;
    if results.is_empty() {
        return Ok(None);
    }

    export::write_json(&results, json_path)?;
    if config.write_mapped {
        let path = config.output_dir.join(format!("{}_mapped.vasp", stem));
        write_best_mapped(&child, &results, &path)?;
    }
    Ok(Some(results.len()))
}

/// 写出最优映射对应的映射后结构
fn write_best_mapped(child: &Structure, results: &StructureMappingResults, path: &Path) -> Result<()> {
    let best = results
        .best()
        .ok_or_else(|| MappingError::Other("no structure mapping to apply".to_string()))?;
    let mapped = make_mapped_structure(child, &best.structure_mapping)?;
    poscar::write_poscar(&mapped, path)
}

/// 单文件模式下映射后结构的输出路径：与 JSON 同目录，缺省为当前目录
fn mapped_path(child: &Path, json: Option<&Path>) -> PathBuf {
    let stem = child
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("child");
    let dir = json
        .and_then(|p| p.parent())
        .map(Path::to_path_buf)
        .unwrap_or_default();
    dir.join(format!("{}_mapped.vasp", stem))
}

fn check_overwrite(path: &Path, overwrite: bool) -> Result<()> {
    if path.exists() && !overwrite {
        return Err(MappingError::InvalidArgument(format!(
            "Output exists: {} (use --overwrite)",
            path.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use xtalmap::models::{Lattice, Site};

    fn parse_args(extra: &[&str]) -> (StructuresArgs, GlobalArgs) {
        let mut argv = vec!["xtalmap", "structures", "prim.json", "children"];
        argv.extend_from_slice(extra);
        let cli = Cli::try_parse_from(argv).unwrap();
        match cli.command {
            Commands::Structures(args) => (args, cli.global),
            _ => panic!("expected structures subcommand"),
        }
    }

    fn write_ab(path: &Path, a: f64) {
        let structure = Structure::new(
            "AB",
            Lattice::from_parameters(a, 3.4, 3.9, 90.0, 90.0, 90.0),
            vec![
                Site::new("A", [0.0, 0.0, 0.0]),
                Site::new("B", [0.5, 0.5, 0.5]),
            ],
        );
        poscar::write_poscar(&structure, path).unwrap();
    }

    #[test]
    fn test_build_options_from_args() {
        let (args, global) = parse_args(&["--lattice-weight", "0.25", "-k", "4"]);
        let options = build_options(&args, &global);
        assert_eq!(options.k_best, 4);
        assert!((options.lattice_cost_weight - 0.25).abs() < 1e-15);
        assert!(options.validate().is_ok());

        let (args, global) = parse_args(&["--lattice-weight", "1.5"]);
        assert!(build_options(&args, &global).validate().is_err());
    }

    #[test]
    fn test_mapped_path() {
        assert_eq!(
            mapped_path(Path::new("in/POSCAR_1"), Some(Path::new("out/r.json"))),
            PathBuf::from("out/POSCAR_1_mapped.vasp")
        );
        assert_eq!(
            mapped_path(Path::new("child.vasp"), None),
            PathBuf::from("child_mapped.vasp")
        );
    }

    #[test]
    fn test_batch_file_writes_outputs() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        let out = dir.join("out");
        fs::create_dir_all(&out).unwrap();
        let prim_path = dir.join("prim.vasp");
        let child_path = dir.join("child.vasp");
        write_ab(&prim_path, 3.0);
        write_ab(&child_path, 3.05);

        let config = BatchConfig {
            prim: Arc::new(parsers::parse_prim_file(&prim_path).unwrap()),
            options: StructureMappingSearchOptions::default(),
            output_dir: out.clone(),
            write_mapped: true,
            overwrite: true,
        };
        let result = process_batch_file(&child_path, &config);
        assert!(matches!(result, ProcessResult::Success(_)), "{:?}", result);
        assert!(out.join("child_mapping.json").exists());
        assert!(out.join("child_mapped.vasp").exists());

        let keep = BatchConfig {
            overwrite: false,
            ..config
        };
        assert!(matches!(
            process_batch_file(&child_path, &keep),
            ProcessResult::Skipped(_)
        ));
    }
}

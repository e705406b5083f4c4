//! # lattices 子命令实现
//!
//! 读取父、子结构文件的晶格，搜索晶格映射并打印排序结果。
//!
//! ## 依赖关系
//! - 使用 `cli/lattices.rs` 定义的 LatticesArgs
//! - 使用 `xtalmap::methods::map_lattices`
//! - 使用 `xtalmap::info::export` 写出 JSON/CSV

use super::format_matrix;
use crate::cli::lattices::LatticesArgs;
use crate::cli::GlobalArgs;
use crate::utils::{output, progress};
use xtalmap::error::Result;
use xtalmap::info::export;
use xtalmap::info::LatticeMappingResults;
use xtalmap::methods::{map_lattices, LatticeMappingSearchOptions};
use xtalmap::parsers;

use tabled::{Table, Tabled};

/// 晶格映射结果行
#[derive(Debug, Clone, Tabled)]
struct LatticeRow {
    #[tabled(rename = "Rank")]
    rank: usize,
    #[tabled(rename = "Lattice cost")]
    cost: String,
    #[tabled(rename = "Vol")]
    volume: i64,
    #[tabled(rename = "T")]
    t: String,
    #[tabled(rename = "N")]
    n: String,
}

/// 由命令行参数构造搜索选项
fn build_options(args: &LatticesArgs, global: &GlobalArgs) -> LatticeMappingSearchOptions {
    let mut options = LatticeMappingSearchOptions::default()
        .with_k_best(args.k_best)
        .with_cost_range(0.0, args.max_cost)
        .with_cost_method(args.cost_method.into())
        .with_reorientation_range(args.range)
        .with_budget(global.budget());
    options.min_volume = args.min_vol;
    options.max_volume = args.max_vol;
    options
}

fn result_rows(results: &LatticeMappingResults) -> Vec<LatticeRow> {
    results
        .iter()
        .enumerate()
        .map(|(i, scored)| LatticeRow {
            rank: i + 1,
            cost: format!("{:.6}", scored.lattice_cost),
            volume: scored.lattice_mapping.volume(),
            t: format_matrix(&scored.lattice_mapping.transformation_matrix_to_super),
            n: format_matrix(&scored.lattice_mapping.reorientation),
        })
        .collect()
}

/// 执行晶格映射
pub fn execute(args: LatticesArgs, global: &GlobalArgs) -> Result<()> {
    output::print_header("Lattice Mapping");

    let parent = parsers::parse_structure_file(&args.parent)?;
    let child = parsers::parse_structure_file(&args.child)?;
    output::print_info(&format!(
        "Parent '{}' (V = {:.3} Å³) -> child '{}' (V = {:.3} Å³)",
        parent.name,
        parent.lattice.volume().abs(),
        child.name,
        child.lattice.volume().abs()
    ));

    let options = build_options(&args, global);
    let spinner = progress::create_spinner("Searching lattice mappings...");
    let results = map_lattices(&parent.lattice, &child.lattice, &options);
    spinner.finish_and_clear();
    let results = results?;

    if results.is_empty() {
        output::print_warning("No lattice mapping found within the cost and volume limits");
        return Ok(());
    }

    println!("{}", Table::new(result_rows(&results)));
    output::print_success(&format!("Found {} lattice mappings", results.len()));

    if let Some(path) = &args.json {
        export::write_json(&results, path)?;
        output::print_written("JSON", &path.display().to_string());
    }
    if let Some(path) = &args.csv {
        export::lattice_results_to_csv(&results, path)?;
        output::print_written("CSV", &path.display().to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use xtalmap::models::Lattice;

    fn parse_args(extra: &[&str]) -> (LatticesArgs, GlobalArgs) {
        let mut argv = vec!["xtalmap", "lattices", "a.vasp", "b.vasp"];
        argv.extend_from_slice(extra);
        let cli = Cli::try_parse_from(argv).unwrap();
        match cli.command {
            Commands::Lattices(args) => (args, cli.global),
            _ => panic!("expected lattices subcommand"),
        }
    }

    #[test]
    fn test_build_options_from_args() {
        let (args, global) = parse_args(&["--min-vol", "2", "--max-vol", "4", "-k", "3"]);
        let options = build_options(&args, &global);
        assert_eq!(options.min_volume, Some(2));
        assert_eq!(options.max_volume, Some(4));
        assert_eq!(options.k_best, 3);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_result_rows_are_ranked() {
        let (args, global) = parse_args(&[]);
        let cubic = Lattice::from_parameters(3.0, 3.0, 3.0, 90.0, 90.0, 90.0);
        let results = map_lattices(&cubic, &cubic, &build_options(&args, &global)).unwrap();
        let rows = result_rows(&results);
        assert_eq!(rows[0].rank, 1);
        assert_eq!(rows[0].volume, 1);
        assert_eq!(rows[0].t, "[[1,0,0],[0,1,0],[0,0,1]]");
    }
}

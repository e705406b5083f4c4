//! # 文件收集器
//!
//! 根据输入路径和模式收集待映射的子结构文件。
//!
//! ## 功能
//! - 支持单文件和目录输入
//! - glob 模式匹配（逗号分隔多模式）
//! - 递归目录搜索，结果按路径排序
//!
//! ## 依赖关系
//! - 被 `commands/structures.rs` 调用
//! - 使用 `walkdir` 遍历目录，`glob::Pattern` 匹配文件名

use glob::Pattern;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 文件收集器
pub struct FileCollector {
    input: PathBuf,
    patterns: Vec<Pattern>,
    recursive: bool,
}

impl FileCollector {
    pub fn new(input: PathBuf) -> Self {
        Self {
            input,
            patterns: Vec::new(),
            recursive: false,
        }
    }

    /// 设置匹配模式（逗号分隔的多模式）；无法解析的模式被忽略
    pub fn with_pattern(mut self, pattern: &str) -> Self {
        self.patterns = pattern
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|s| Pattern::new(s).ok())
            .collect();
        self
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// 收集所有匹配的文件
    pub fn collect(&self) -> Vec<PathBuf> {
        if self.input.is_file() {
            return vec![self.input.clone()];
        }

        if !self.input.is_dir() {
            return vec![];
        }

        let max_depth = if self.recursive { usize::MAX } else { 1 };

        let mut files: Vec<PathBuf> = WalkDir::new(&self.input)
            .max_depth(max_depth)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|entry| self.matches_patterns(entry.path()))
            .map(|e| e.path().to_path_buf())
            .collect();
        files.sort();
        files
    }

    /// 文件名是否匹配任一模式（未设置模式时全部匹配）
    fn matches_patterns(&self, path: &Path) -> bool {
        let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        self.patterns.is_empty() || self.patterns.iter().any(|p| p.matches(filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_pattern_match() {
        let collector = FileCollector::new(PathBuf::from(".")).with_pattern("*.vasp, POSCAR*");
        assert!(collector.matches_patterns(Path::new("dir/child.vasp")));
        assert!(collector.matches_patterns(Path::new("POSCAR")));
        assert!(collector.matches_patterns(Path::new("POSCAR_001")));
        assert!(!collector.matches_patterns(Path::new("prim.json")));
    }

    #[test]
    fn test_collect_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().to_path_buf();
        let nested = dir.join("nested");
        fs::create_dir_all(&nested).unwrap();
        for name in ["b.vasp", "a.vasp", "notes.txt"] {
            fs::write(dir.join(name), "").unwrap();
        }
        fs::write(nested.join("c.vasp"), "").unwrap();

        let flat = FileCollector::new(dir.clone()).with_pattern("*.vasp").collect();
        let names: Vec<_> = flat
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()))
            .collect();
        assert_eq!(names, vec!["a.vasp", "b.vasp"]);

        let deep = FileCollector::new(dir)
            .with_pattern("*.vasp")
            .recursive(true)
            .collect();
        assert_eq!(deep.len(), 3);
    }
}

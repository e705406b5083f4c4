//! # 超晶格枚举与超胞格点
//!
//! - 按体积枚举互不等价的超晶格（列约定下的 Hermite 标准形）
//! - 枚举超胞内的原胞平移（商群 Z³ / M Z³ 的代表元）
//!
//! 列约定：超晶格 `S = L * T`，T 右乘幺模矩阵得到同一超晶格，
//! 因此标准形取下三角，且每行对角线左侧元素对该行对角元取模：
//!
//! ```text
//! T = | a 0 0 |    a*c*f = n
//!     | b c 0 |    0 <= b < c
//!     | d e f |    0 <= d, e < f
//! ```
//!
//! ## 依赖关系
//! - 被 `methods/lattice_search.rs`、`methods/search_data.rs` 使用
//! - 使用 `geometry/integer.rs`

use crate::geometry::integer;

use nalgebra::{Matrix3, Vector3};

/// 枚举行列式为 `volume` 的全部 Hermite 标准形矩阵
pub fn hermite_normal_forms(volume: i64) -> Vec<Matrix3<i64>> {
    let mut result = Vec::new();
    if volume < 1 {
        return result;
    }

    for a in (1..=volume).filter(|a| volume % a == 0) {
        let rest = volume / a;
        for c in (1..=rest).filter(|c| rest % c == 0) {
            let f = rest / c;
            for b in 0..c {
                for d in 0..f {
                    for e in 0..f {
                        result.push(Matrix3::new(a, 0, 0, b, c, 0, d, e, f));
                    }
                }
            }
        }
    }
    result
}

/// 超胞内的原胞平移枚举器
///
/// 对整数矩阵 M（超胞 = L * M），分数坐标 `f = M⁻¹ u = adj(M) u / det(M)`。
/// 平移 u 属于超胞当且仅当 `0 <= (sign * adj(M) u)_k < |det(M)|`，
/// 全部用整数运算判断。
#[derive(Debug, Clone)]
pub struct SupercellTranslations {
    matrix: Matrix3<i64>,
    adj: Matrix3<i64>,
    det: i64,
    cells: Vec<Vector3<i64>>,
}

impl SupercellTranslations {
    /// 创建枚举器；M 奇异时返回 None
    pub fn new(matrix: Matrix3<i64>) -> Option<Self> {
        let det = integer::det(&matrix);
        if det == 0 {
            return None;
        }
        let adj = if det > 0 {
            integer::adjugate(&matrix)
        } else {
            -integer::adjugate(&matrix)
        };
        let det = det.abs();

        let mut this = SupercellTranslations {
            matrix,
            adj,
            det,
            cells: Vec::with_capacity(det as usize),
        };
        this.cells = this.enumerate();
        Some(this)
    }

    /// 超胞包含的原胞数
    pub fn n_cells(&self) -> usize {
        self.cells.len()
    }

    /// 平移列表（字典序）
    pub fn cells(&self) -> &[Vector3<i64>] {
        &self.cells
    }

    /// 整数平移是否落在超胞内
    pub fn contains(&self, u: &Vector3<i64>) -> bool {
        let scaled = self.adj * u;
        scaled.iter().all(|&x| x >= 0 && x < self.det)
    }

    fn enumerate(&self) -> Vec<Vector3<i64>> {
        // 超胞平行六面体 8 个顶点的包围盒
        let mut lo: Vector3<i64> = Vector3::zeros();
        let mut hi: Vector3<i64> = Vector3::zeros();
        for corner in 0..8_i64 {
            let pick: Vector3<i64> = Vector3::new(corner & 1, (corner >> 1) & 1, (corner >> 2) & 1);
            let p = self.matrix * pick;
            for k in 0..3 {
                lo[k] = lo[k].min(p[k]);
                hi[k] = hi[k].max(p[k]);
            }
        }

        let mut cells = Vec::with_capacity(self.det as usize);
        for i in lo[0]..=hi[0] {
            for j in lo[1]..=hi[1] {
                for k in lo[2]..=hi[2] {
                    let u = Vector3::new(i, j, k);
                    if self.contains(&u) {
                        cells.push(u);
                    }
                }
            }
        }
        cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hnf_counts() {
        // 三维超晶格数目：1, 7, 13, 35, 31, 91
        let counts: Vec<usize> = (1..=6).map(|n| hermite_normal_forms(n).len()).collect();
        assert_eq!(counts, vec![1, 7, 13, 35, 31, 91]);
    }

    #[test]
    fn test_hnf_determinants() {
        for t in hermite_normal_forms(4) {
            assert_eq!(integer::det(&t), 4);
        }
    }

    #[test]
    fn test_supercell_translations_count() {
        let m = Matrix3::new(1, 1, 0, -1, 1, 0, 0, 0, 2);
        let translations = SupercellTranslations::new(m).unwrap();
        assert_eq!(translations.n_cells(), 4);
        assert!(translations.contains(&Vector3::zeros()));
    }

    #[test]
    fn test_singular_supercell_rejected() {
        let m = Matrix3::new(1, 2, 0, 2, 4, 0, 0, 0, 1);
        assert!(SupercellTranslations::new(m).is_none());
    }
}

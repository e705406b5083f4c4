//! # 整数矩阵工具
//!
//! 超胞变换矩阵 T、重取向矩阵 N 以及点群操作在分数坐标下都是整数矩阵。
//! `nalgebra` 的行列式与求逆需要浮点域，这里提供精确的整数版本。
//!
//! ## 依赖关系
//! - 被 `geometry/`、`info/`、`methods/` 使用

use nalgebra::Matrix3;

/// 整数矩阵行列式
pub fn det(m: &Matrix3<i64>) -> i64 {
    m[(0, 0)] * (m[(1, 1)] * m[(2, 2)] - m[(1, 2)] * m[(2, 1)])
        - m[(0, 1)] * (m[(1, 0)] * m[(2, 2)] - m[(1, 2)] * m[(2, 0)])
        + m[(0, 2)] * (m[(1, 0)] * m[(2, 1)] - m[(1, 1)] * m[(2, 0)])
}

/// 伴随矩阵：`m * adj(m) = det(m) * I`
pub fn adjugate(m: &Matrix3<i64>) -> Matrix3<i64> {
    let c = |r0: usize, r1: usize, c0: usize, c1: usize| {
        m[(r0, c0)] * m[(r1, c1)] - m[(r0, c1)] * m[(r1, c0)]
    };
    Matrix3::new(
        c(1, 2, 1, 2),
        -c(0, 2, 1, 2),
        c(0, 1, 1, 2),
        -c(1, 2, 0, 2),
        c(0, 2, 0, 2),
        -c(0, 1, 0, 2),
        c(1, 2, 0, 1),
        -c(0, 2, 0, 1),
        c(0, 1, 0, 1),
    )
}

/// 幺模矩阵 (det = ±1) 的精确逆
pub fn inverse_unimodular(m: &Matrix3<i64>) -> Option<Matrix3<i64>> {
    match det(m) {
        1 => Some(adjugate(m)),
        -1 => Some(-adjugate(m)),
        _ => None,
    }
}

/// 转为浮点矩阵
pub fn to_f64(m: &Matrix3<i64>) -> Matrix3<f64> {
    m.map(|x| x as f64)
}

/// 行优先展开，用作字典序比较键
pub fn row_major(m: &Matrix3<i64>) -> [i64; 9] {
    let mut key = [0; 9];
    for i in 0..3 {
        for j in 0..3 {
            key[3 * i + j] = m[(i, j)];
        }
    }
    key
}

/// 与单位矩阵的 L1 距离，用于在等价候选中优先选择接近恒等的重取向
pub fn distance_from_identity(m: &Matrix3<i64>) -> i64 {
    (m - Matrix3::identity()).iter().map(|x| x.abs()).sum()
}

/// 元素在 [-range, range] 内的候选矩阵个数 `(2 range + 1)^9`，溢出 u64 时为 None
pub fn unimodular_candidate_count(range: i64) -> Option<u64> {
    if range < 0 {
        return None;
    }
    let n = range.checked_mul(2)?.checked_add(1)?;
    u64::try_from(n).ok()?.checked_pow(9)
}

/// 元素在 [-range, range] 内且行列式为 ±1 的所有整数矩阵
///
/// 候选个数溢出时返回空列表；调用方应先用 `unimodular_candidate_count` 检查规模。
pub fn unimodular_matrices(range: i64) -> Vec<Matrix3<i64>> {
    let Some(total) = unimodular_candidate_count(range) else {
        return Vec::new();
    };
    let values: Vec<i64> = (-range..=range).collect();
    let n = values.len() as u64;
    let mut result = Vec::new();

    for code in 0..total {
        let mut rest = code;
        let mut m = Matrix3::zeros();
        for idx in 0..9 {
            m[(idx / 3, idx % 3)] = values[(rest % n) as usize];
            rest /= n;
        }
        if det(&m).abs() == 1 {
            result.push(m);
        }
    }
    result
}

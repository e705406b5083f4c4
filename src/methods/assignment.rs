//! # 指派问题
//!
//! - `hungarian`: 方阵最小代价完美匹配（势函数形式的匈牙利算法，O(n³)）
//! - `k_best_assignments`: Murty 划分法按代价递增枚举前 k 个匹配，
//!   并保留与第 k 个代价并列的匹配
//!
//! 代价达到 `infinity` 的元素视为不允许，包含此类元素的匹配被丢弃。
//!
//! ## 依赖关系
//! - 被 `methods/atom_search.rs` 使用
//! - 使用 `methods/budget.rs` 计量求解次数

use crate::error::Result;
use crate::methods::budget::BudgetTracker;

use nalgebra::DMatrix;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// 一个完美匹配：`columns[row] = col`
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub cost: f64,
    pub columns: Vec<usize>,
}

/// 求解方阵指派问题，返回行到列的匹配
pub fn hungarian(cost: &DMatrix<f64>) -> Option<Assignment> {
    let n = cost.nrows();
    if n != cost.ncols() {
        return None;
    }
    if n == 0 {
        return Some(Assignment {
            cost: 0.0,
            columns: Vec::new(),
        });
    }

    // 1 起始下标；第 0 列为虚拟列
    let mut u = vec![0.0_f64; n + 1];
    let mut v = vec![0.0_f64; n + 1];
    let mut row_of_col = vec![0_usize; n + 1];
    let mut way = vec![0_usize; n + 1];

    for i in 1..=n {
        row_of_col[0] = i;
        let mut j0 = 0;
        let mut min_v = vec![f64::INFINITY; n + 1];
        let mut used = vec![false; n + 1];

        loop {
            used[j0] = true;
            let i0 = row_of_col[j0];
            let mut delta = f64::INFINITY;
            let mut j1 = 0;
            for j in 1..=n {
                if used[j] {
                    continue;
                }
                let reduced = cost[(i0 - 1, j - 1)] - u[i0] - v[j];
                if reduced < min_v[j] {
                    min_v[j] = reduced;
                    way[j] = j0;
                }
                if min_v[j] < delta {
                    delta = min_v[j];
                    j1 = j;
                }
            }
            if j1 == 0 {
                return None;
            }
            for j in 0..=n {
                if used[j] {
                    u[row_of_col[j]] += delta;
                    v[j] -= delta;
                } else {
                    min_v[j] -= delta;
                }
            }
            j0 = j1;
            if row_of_col[j0] == 0 {
                break;
            }
        }

        loop {
            let j1 = way[j0];
            row_of_col[j0] = row_of_col[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    let mut columns = vec![0; n];
    for j in 1..=n {
        columns[row_of_col[j] - 1] = j - 1;
    }
    let total = columns.iter().enumerate().map(|(i, &j)| cost[(i, j)]).sum();
    Some(Assignment {
        cost: total,
        columns,
    })
}

/// Murty 划分中的子问题；约束以 `(行, 列类)` 记录
#[derive(Debug, Clone)]
struct Node {
    assignment: Assignment,
    forced: Vec<(usize, usize)>,
    excluded: Vec<(usize, usize)>,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Node {}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Node {
    // BinaryHeap 是最大堆，反转得到最小代价优先
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .assignment
            .cost
            .total_cmp(&self.assignment.cost)
            .then_with(|| other.assignment.columns.cmp(&self.assignment.columns))
    }
}

/// 列的等价类：下标不小于 `n_distinct` 的列彼此可互换，归为同一类
#[derive(Debug, Clone, Copy)]
struct ColumnClasses {
    n_distinct: usize,
}

impl ColumnClasses {
    fn of(&self, col: usize) -> usize {
        col.min(self.n_distinct)
    }

    fn is_shared(&self, class: usize) -> bool {
        class >= self.n_distinct
    }

    /// 可互换列按行号递增重新编号，使同一类分配只有一种写法
    fn canonicalize(&self, columns: &mut [usize]) {
        let mut next = self.n_distinct;
        for col in columns.iter_mut() {
            if *col >= self.n_distinct {
                *col = next;
                next += 1;
            }
        }
    }
}

fn solve_constrained(
    cost: &DMatrix<f64>,
    classes: ColumnClasses,
    forced: &[(usize, usize)],
    excluded: &[(usize, usize)],
    infinity: f64,
) -> Option<Assignment> {
    let mut constrained = cost.clone();
    let n = cost.nrows();
    for &(r, class) in excluded {
        for c in 0..n {
            if classes.of(c) == class {
                constrained[(r, c)] = infinity;
            }
        }
    }
    for &(r, class) in forced {
        for c in 0..n {
            if classes.of(c) != class {
                constrained[(r, c)] = infinity;
            }
        }
        // 独占列不能再给其他行
        if !classes.is_shared(class) {
            for k in 0..n {
                if k != r {
                    constrained[(k, class)] = infinity;
                }
            }
        }
    }

    let assignment = hungarian(&constrained)?;
    let feasible = assignment
        .columns
        .iter()
        .enumerate()
        .all(|(i, &j)| constrained[(i, j)] < infinity);
    if !feasible {
        return None;
    }
    let mut columns = assignment.columns;
    classes.canonicalize(&mut columns);
    Some(Assignment {
        cost: columns.iter().enumerate().map(|(i, &j)| cost[(i, j)]).sum(),
        columns,
    })
}

/// 按代价递增枚举前 k_best 个可行匹配（并保留代价并列者）
///
/// 下标不小于 `n_distinct` 的列必须完全相同（如补齐的空位列）：
/// 它们之间的互换视为同一个匹配，只返回一次，并按行号递增编号。
pub fn k_best_assignments(
    cost: &DMatrix<f64>,
    n_distinct: usize,
    k_best: usize,
    cost_tol: f64,
    infinity: f64,
    tracker: &BudgetTracker,
) -> Result<Vec<Assignment>> {
    let mut found: Vec<Assignment> = Vec::new();
    if k_best == 0 {
        return Ok(found);
    }
    let classes = ColumnClasses { n_distinct };

    tracker.charge(1)?;
    let Some(best) = solve_constrained(cost, classes, &[], &[], infinity) else {
        return Ok(found);
    };

    let mut heap = BinaryHeap::new();
    heap.push(Node {
        assignment: best,
        forced: Vec::new(),
        excluded: Vec::new(),
    });

    while let Some(node) = heap.pop() {
        if found.len() >= k_best {
            let threshold = found[k_best - 1].cost + cost_tol;
            if node.assignment.cost > threshold {
                break;
            }
        }

        // 将剩余解空间按本解逐行划分
        let mut forced = node.forced.clone();
        let free_rows: Vec<usize> = (0..cost.nrows())
            .filter(|r| !node.forced.iter().any(|&(fr, _)| fr == *r))
            .collect();
        for (idx, &row) in free_rows.iter().enumerate() {
            // 最后一行的列类已被其余行确定
            if idx + 1 == free_rows.len() {
                break;
            }
            let class = classes.of(node.assignment.columns[row]);
            let mut excluded = node.excluded.clone();
            excluded.push((row, class));

            tracker.charge(1)?;
            if let Some(assignment) =
                solve_constrained(cost, classes, &forced, &excluded, infinity)
            {
                heap.push(Node {
                    assignment,
                    forced: forced.clone(),
                    excluded,
                });
            }
            forced.push((row, class));
        }

        found.push(node.assignment);
    }

    Ok(found)
}

//! Line-level text diff between two versions of an entity body.

/// One step of a line diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOp<'a> {
    Same(&'a str),
    Added(&'a str),
    Removed(&'a str),
}

/// Longest-common-subsequence line diff of `old` into `new`.
pub fn diff_lines<'a>(old: &'a str, new: &'a str) -> Vec<LineOp<'a>> {
    let a: Vec<&str> = old.lines().collect();
    let b: Vec<&str> = new.lines().collect();
    let (n, m) = (a.len(), b.len());

    // lcs[i][j]: LCS length of a[i..] and b[j..]
    let mut lcs = vec![vec![0u32; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i][j] = if a[i] == b[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut ops = Vec::with_capacity(n.max(m));
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if a[i] == b[j] {
            ops.push(LineOp::Same(b[j]));
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            ops.push(LineOp::Removed(a[i]));
            i += 1;
        } else {
            ops.push(LineOp::Added(b[j]));
            j += 1;
        }
    }
    ops.extend(a[i..].iter().copied().map(LineOp::Removed));
    ops.extend(b[j..].iter().copied().map(LineOp::Added));
    ops
}

/// 0-based indices of the lines of `new` that are not shared with `old`.
/// Without a previous version every line counts as changed.
pub fn changed_lines(old: Option<&str>, new: &str) -> Vec<usize> {
    let Some(old) = old else {
        return (0..new.lines().count()).collect();
    };
    let mut changed = Vec::new();
    let mut index = 0;
    for op in diff_lines(old, new) {
        match op {
            LineOp::Same(_) => index += 1,
            LineOp::Added(_) => {
                changed.push(index);
                index += 1;
            }
            LineOp::Removed(_) => {}
        }
    }
    changed
}

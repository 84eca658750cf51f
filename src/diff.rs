//! Unified line diffs for presenting rewrites before they are written.

use std::fmt::Write;

const CONTEXT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Equal,
    Delete,
    Insert,
}

/// Render a unified diff of `old` against `new`, or an empty string when the
/// texts are identical.
pub fn unified(old: &str, new: &str, old_label: &str, new_label: &str) -> String {
    if old == new {
        return String::new();
    }

    let a: Vec<&str> = old.split_inclusive('\n').collect();
    let b: Vec<&str> = new.split_inclusive('\n').collect();
    let script = edit_script(&a, &b);

    let mut out = String::new();
    let _ = writeln!(out, "--- {old_label}");
    let _ = writeln!(out, "+++ {new_label}");
    for hunk in hunks(&script) {
        render_hunk(&mut out, &script[hunk.0..hunk.1], &a, &b);
    }
    out
}

/// One entry per line of output: the operation and the line indices in `a`
/// and `b` it refers to.
type Edit = (Op, usize, usize);

/// Shortest edit script via Myers' greedy algorithm.
fn edit_script(a: &[&str], b: &[&str]) -> Vec<Edit> {
    let n = a.len() as isize;
    let m = b.len() as isize;
    let max = (n + m) as usize;
    let offset = max as isize + 1;
    let mut v = vec![0isize; 2 * max + 3];
    let mut trace: Vec<Vec<isize>> = Vec::new();

    'search: for d in 0..=max as isize {
        // Step `d` only reads diagonals `-d..=d` when walking back.
        trace.push(v[(offset - d) as usize..=(offset + d) as usize].to_vec());
        let mut k = -d;
        while k <= d {
            let index = (k + offset) as usize;
            let mut x = if k == -d || (k != d && v[index - 1] < v[index + 1]) {
                v[index + 1]
            } else {
                v[index - 1] + 1
            };
            let mut y = x - k;
            while x < n && y < m && a[x as usize] == b[y as usize] {
                x += 1;
                y += 1;
            }
            v[index] = x;
            if x >= n && y >= m {
                break 'search;
            }
            k += 2;
        }
    }

    // Walk the trace backwards from (n, m) to recover the path.
    let mut script = Vec::new();
    let (mut x, mut y) = (n, m);
    for (d, v) in trace.iter().enumerate().rev() {
        let d = d as isize;
        let k = x - y;
        let index = |k: isize| (k + d) as usize;
        let prev_k = if k == -d || (k != d && v[index(k - 1)] < v[index(k + 1)]) {
            k + 1
        } else {
            k - 1
        };
        let prev_x = if d == 0 { 0 } else { v[index(prev_k)] };
        let prev_y = prev_x - prev_k;

        while x > prev_x.max(0) && y > prev_y.max(0) {
            x -= 1;
            y -= 1;
            script.push((Op::Equal, x as usize, y as usize));
        }
        if d > 0 {
            if x == prev_x {
                y -= 1;
                script.push((Op::Insert, x as usize, y as usize));
            } else {
                x -= 1;
                script.push((Op::Delete, x as usize, y as usize));
            }
        }
    }
    script.reverse();
    script
}

/// Ranges of the edit script that form hunks, each change padded with
/// `CONTEXT` equal lines and overlapping ranges merged.
fn hunks(script: &[Edit]) -> Vec<(usize, usize)> {
    let mut ranges: Vec<(usize, usize)> = Vec::new();
    for (i, (op, _, _)) in script.iter().enumerate() {
        if *op == Op::Equal {
            continue;
        }
        let start = i.saturating_sub(CONTEXT);
        let end = (i + 1 + CONTEXT).min(script.len());
        match ranges.last_mut() {
            Some(last) if start <= last.1 => last.1 = end,
            _ => ranges.push((start, end)),
        }
    }
    ranges
}

fn render_hunk(out: &mut String, edits: &[Edit], a: &[&str], b: &[&str]) {
    let Some(&(_, old_first, new_first)) = edits.first() else {
        return;
    };
    let old_len = edits.iter().filter(|(op, _, _)| *op != Op::Insert).count();
    let new_len = edits.iter().filter(|(op, _, _)| *op != Op::Delete).count();
    let start = |first: usize, len: usize| if len == 0 { first } else { first + 1 };

    let _ = writeln!(
        out,
        "@@ -{},{} +{},{} @@",
        start(old_first, old_len),
        old_len,
        start(new_first, new_len),
        new_len
    );
    for &(op, x, y) in edits {
        let (marker, line) = match op {
            Op::Equal => (' ', a[x]),
            Op::Delete => ('-', a[x]),
            Op::Insert => ('+', b[y]),
        };
        out.push(marker);
        out.push_str(line);
        if !line.ends_with('\n') {
            out.push_str("\n\\ No newline at end of file\n");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_identical_texts_have_no_diff() {
        assert_eq!(unified("a\nb\n", "a\nb\n", "a", "b"), "");
    }

    #[test]
    fn test_single_line_change() {
        let old = "import os\nx = '%s' % y\nprint(x)\n";
        let new = "import os\nx = f'{y}'\nprint(x)\n";
        assert_eq!(
            unified(old, new, "mod.py", "mod.py"),
            "--- mod.py\n+++ mod.py\n@@ -1,3 +1,3 @@\n import os\n-x = '%s' % y\n+x = f'{y}'\n print(x)\n"
        );
    }

    #[test]
    fn test_collapsed_lines() {
        let old = "a = ('%s %s' %\n     (b, c))\n";
        let new = "a = (f'{b} {c}')\n";
        assert_eq!(
            unified(old, new, "x", "y"),
            "--- x\n+++ y\n@@ -1,2 +1,1 @@\n-a = ('%s %s' %\n-     (b, c))\n+a = (f'{b} {c}')\n"
        );
    }

    #[test]
    fn test_separate_hunks() {
        let old: String = (0..20).map(|i| format!("line {i}\n")).collect();
        let new = old.replace("line 2\n", "LINE 2\n").replace("line 17\n", "LINE 17\n");
        let diff = unified(&old, &new, "a", "b");
        let headers: Vec<&str> = diff.lines().filter(|l| l.starts_with("@@")).collect();
        assert_eq!(headers, vec!["@@ -1,6 +1,6 @@", "@@ -15,6 +15,6 @@"]);
    }

    #[test]
    fn test_missing_final_newline() {
        let diff = unified("x = '%s' % y", "x = f'{y}'", "a", "b");
        assert_eq!(
            diff,
            "--- a\n+++ b\n@@ -1,1 +1,1 @@\n-x = '%s' % y\n\\ No newline at end of file\n+x = f'{y}'\n\\ No newline at end of file\n"
        );
    }

    #[test]
    fn test_edit_script_reconstructs_both_sides() {
        // Deterministic pseudo-random line sequences over a small alphabet.
        let mut seed: u32 = 0x2545_f491;
        let mut next = move |bound: u32| {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            seed % bound
        };
        let lines = ["a\n", "b\n", "c\n", "d\n"];

        for _ in 0..200 {
            let a: Vec<&str> = (0..next(12)).map(|_| lines[next(4) as usize]).collect();
            let b: Vec<&str> = (0..next(12)).map(|_| lines[next(4) as usize]).collect();
            let script = edit_script(&a, &b);

            let old: Vec<&str> = script
                .iter()
                .filter(|(op, _, _)| *op != Op::Insert)
                .map(|&(_, x, _)| a[x])
                .collect();
            let new: Vec<&str> = script
                .iter()
                .filter(|(op, _, _)| *op != Op::Delete)
                .map(|&(_, _, y)| b[y])
                .collect();
            assert_eq!(old, a);
            assert_eq!(new, b);
            assert!(
                script
                    .iter()
                    .filter(|(op, _, _)| *op == Op::Equal)
                    .all(|&(_, x, y)| a[x] == b[y])
            );
        }
    }
}

//! Forward reachability over an index-addressed graph.

/// Blocks reachable from `entry` following `succs`.
///
/// `succs(i)` yields the successor indices of block `i`; every index must
/// be below `len`. Iterative depth-first search, so arbitrarily long
/// chains do not grow the host stack.
pub fn forward_reachable<I>(len: usize, entry: usize, mut succs: impl FnMut(usize) -> I) -> Vec<bool>
where
    I: IntoIterator<Item = usize>,
{
    let mut live = vec![false; len];
    if entry >= len {
        return live;
    }
    let mut stack = vec![entry];
    while let Some(b) = stack.pop() {
        if live[b] {
            continue;
        }
        live[b] = true;
        stack.extend(succs(b).into_iter().filter(|&s| !live[s]));
    }
    live
}

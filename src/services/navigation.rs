//! Navigation path reconstruction
//!
//! Visits link to the visit they were navigated from, so the ledger is a
//! forest. Every root-to-leaf chain is one navigation path.

use std::collections::HashMap;

use crate::errors::{HistoryError, Result};
use crate::storage::PageViewRecord;

/// Enumerate every root-to-leaf path of the visit forest.
///
/// Roots are visits without a predecessor, or whose predecessor is not in
/// `records`. A branching visit yields one path per reachable leaf, each
/// sharing the common prefix. Every path is sorted by timestamp.
///
/// Fails with `CycleDetected` when the predecessor links are not a forest.
pub fn reconstruct_paths(records: Vec<PageViewRecord>) -> Result<Vec<Vec<PageViewRecord>>> {
    let index_of: HashMap<_, usize> = records
        .iter()
        .enumerate()
        .map(|(index, record)| (record.handle, index))
        .collect();

    let mut roots = Vec::new();
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); records.len()];
    for (index, record) in records.iter().enumerate() {
        match record.previous.and_then(|prev| index_of.get(&prev)) {
            Some(&parent) => children[parent].push(index),
            None => roots.push(index),
        }
    }

    let order = |a: &usize, b: &usize| {
        let (ra, rb) = (&records[*a], &records[*b]);
        ra.timestamp
            .cmp(&rb.timestamp)
            .then_with(|| ra.handle.cmp(&rb.handle))
    };
    roots.sort_by(order);
    for list in &mut children {
        list.sort_by(order);
    }

    let mut visited = vec![false; records.len()];
    let mut paths = Vec::new();
    let mut path: Vec<usize> = Vec::new();
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for &root in &roots {
        stack.push((root, 0));

        while let Some((node, depth)) = stack.pop() {
            if visited[node] {
                return Err(HistoryError::cycle_detected(format!(
                    "Page view {} reached twice while walking navigation paths",
                    records[node].handle
                )));
            }
            visited[node] = true;

            path.truncate(depth);
            path.push(node);

            if children[node].is_empty() {
                let mut emitted: Vec<PageViewRecord> =
                    path.iter().map(|&i| records[i].clone()).collect();
                emitted.sort_by_key(|record| record.timestamp);
                paths.push(emitted);
            } else {
                // reversed so the earliest child is walked first
                for &child in children[node].iter().rev() {
                    stack.push((child, depth + 1));
                }
            }
        }
    }

    if let Some(stranded) = visited.iter().position(|seen| !seen) {
        return Err(HistoryError::cycle_detected(format!(
            "Page view {} is not reachable from any root",
            records[stranded].handle
        )));
    }

    Ok(paths)
}

//! Validation of the node table.

use std::collections::HashMap;

use crate::{
    error::{Error, Result},
    types::NodeInfo,
};

/// Fail on the first path that is declared twice
pub fn validate_unique_paths(nodes: &[NodeInfo]) -> Result<()> {
    match duplicate_paths(nodes).into_iter().next() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Fail on the first pair of nodes whose byte ranges intersect
///
/// Every pair is compared, so the declaration order of the nodes does not matter. Touching
/// ranges such as `[0, 10)` and `[10, 20)` do not overlap.
pub fn validate_no_overlaps(nodes: &[NodeInfo]) -> Result<()> {
    match overlaps(nodes).into_iter().next() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Fail on the first node that reaches past the end of the data region
pub fn validate_bounds(nodes: &[NodeInfo], region_len: u64) -> Result<()> {
    match out_of_bounds(nodes, region_len).into_iter().next() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Every violation in the node table, duplicates first, then overlaps, then bounds
pub fn collect_violations(nodes: &[NodeInfo], region_len: Option<u64>) -> Vec<Error> {
    let mut errors = duplicate_paths(nodes);
    errors.extend(overlaps(nodes));
    if let Some(region_len) = region_len {
        errors.extend(out_of_bounds(nodes, region_len));
    }
    errors
}

fn duplicate_paths(nodes: &[NodeInfo]) -> Vec<Error> {
    let mut seen: HashMap<&str, usize> = HashMap::with_capacity(nodes.len());
    let mut errors = Vec::new();
    for (index, node) in nodes.iter().enumerate() {
        if let Some(first_index) = seen.get(node.path.as_str()) {
            errors.push(Error::DuplicateNode {
                path: node.path.clone(),
                index,
                first_index: *first_index,
            });
        } else {
            seen.insert(&node.path, index);
        }
    }
    errors
}

fn overlaps(nodes: &[NodeInfo]) -> Vec<Error> {
    let mut errors = Vec::new();
    for (i, first) in nodes.iter().enumerate() {
        for second in &nodes[i + 1..] {
            if first.offset.max(second.offset) < first.end().min(second.end()) {
                errors.push(Error::NodeOverlap {
                    first: first.path.clone(),
                    first_range: (first.offset, first.end()),
                    second: second.path.clone(),
                    second_range: (second.offset, second.end()),
                });
            }
        }
    }
    errors
}

fn out_of_bounds(nodes: &[NodeInfo], region_len: u64) -> Vec<Error> {
    nodes
        .iter()
        .filter(|n| n.offset.checked_add(n.size).map_or(true, |end| end > region_len))
        .map(|n| Error::NodeExceedsDataRegion {
            path: n.path.clone(),
            offset: n.offset,
            size: n.size,
            region_len,
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::{collect_violations, validate_bounds, validate_no_overlaps, validate_unique_paths};
    use crate::error::Error;
    use crate::types::NodeInfo;

    fn node(path: &str, offset: u64, size: u64) -> NodeInfo {
        NodeInfo {
            offset,
            size,
            flags: 4,
            path: path.into(),
        }
    }

    #[test]
    fn intersecting_ranges_overlap() {
        let nodes = [node("a", 0, 20), node("b", 10, 20)];
        assert!(matches!(
            validate_no_overlaps(&nodes),
            Err(Error::NodeOverlap { first_range: (0, 20), second_range: (10, 30), .. })
        ));
    }

    #[test]
    fn overlap_found_regardless_of_order() {
        let nodes = [node("b", 10, 20), node("c", 40, 5), node("a", 0, 20)];
        assert!(validate_no_overlaps(&nodes).is_err());
    }

    #[test]
    fn touching_ranges_do_not_overlap() {
        let nodes = [node("a", 0, 10), node("b", 10, 10)];
        assert!(validate_no_overlaps(&nodes).is_ok());
    }

    #[test]
    fn empty_nodes_never_overlap() {
        let nodes = [node("a", 5, 0), node("b", 0, 10)];
        assert!(validate_no_overlaps(&nodes).is_ok());
    }

    #[test]
    fn duplicate_path_is_named() {
        let nodes = [node("CAB-same", 0, 10), node("CAB-same", 100, 10)];
        match validate_unique_paths(&nodes) {
            Err(Error::DuplicateNode {
                path,
                index,
                first_index,
            }) => {
                assert_eq!(path, "CAB-same");
                assert_eq!(index, 1);
                assert_eq!(first_index, 0);
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn bounds_are_checked_against_region() {
        let nodes = [node("a", 0, 10), node("b", 10, 7)];
        assert!(validate_bounds(&nodes, 17).is_ok());
        assert!(matches!(
            validate_bounds(&nodes, 16),
            Err(Error::NodeExceedsDataRegion { .. })
        ));
    }

    #[test]
    fn violations_are_collected() {
        let nodes = [
            node("a", 0, 20),
            node("a", 10, 20),
            node("c", u64::MAX, 2),
        ];
        let errors = collect_violations(&nodes, Some(25));

        assert_eq!(errors.len(), 4);
        assert!(matches!(errors[0], Error::DuplicateNode { .. }));
        assert!(matches!(errors[1], Error::NodeOverlap { .. }));
        assert!(matches!(errors[2], Error::NodeExceedsDataRegion { .. }));
        assert!(matches!(errors[3], Error::NodeExceedsDataRegion { .. }));
    }
}

//! Circular import detection via Tarjan's SCC algorithm.
//!
//! Operates on resolved `(from, to)` edges. Only strongly connected
//! components with at least two members count as cycles; self-imports are
//! not reported.

use std::collections::HashMap;

/// Find all SCCs of size >= 2. Each cycle's members are sorted so the
/// lexicographically first file anchors the report; the overall list is
/// sorted by anchor for deterministic output.
pub fn find_cycles(edges: &[(String, String)]) -> Vec<Vec<String>> {
    let mut ids: HashMap<&str, usize> = HashMap::new();
    let mut names: Vec<&str> = Vec::new();
    for (from, to) in edges {
        for name in [from.as_str(), to.as_str()] {
            if !ids.contains_key(name) {
                ids.insert(name, names.len());
                names.push(name);
            }
        }
    }

    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); names.len()];
    for (from, to) in edges {
        adjacency[ids[from.as_str()]].push(ids[to.as_str()]);
    }

    let sccs = tarjan(&adjacency);

    let mut cycles: Vec<Vec<String>> = sccs
        .into_iter()
        .filter(|scc| scc.len() >= 2)
        .map(|scc| {
            let mut members: Vec<String> =
                scc.into_iter().map(|idx| names[idx].to_string()).collect();
            members.sort();
            members
        })
        .collect();
    cycles.sort();
    cycles
}

/// Iterative Tarjan: no recursion so deep graphs cannot blow the stack.
fn tarjan(adjacency: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let n = adjacency.len();
    let mut index = vec![usize::MAX; n];
    let mut lowlink = vec![usize::MAX; n];
    let mut on_stack = vec![false; n];
    let mut stack: Vec<usize> = Vec::new();
    let mut next_index = 0usize;
    let mut sccs = Vec::new();

    // (vertex, next child position)
    let mut call_stack: Vec<(usize, usize)> = Vec::new();

    for start in 0..n {
        if index[start] != usize::MAX {
            continue;
        }
        call_stack.push((start, 0));
        while let Some(&(v, child)) = call_stack.last() {
            if child == 0 {
                index[v] = next_index;
                lowlink[v] = next_index;
                next_index += 1;
                stack.push(v);
                on_stack[v] = true;
            }
            if let Some(&w) = adjacency[v].get(child) {
                call_stack.last_mut().expect("frame present").1 = child + 1;
                if index[w] == usize::MAX {
                    call_stack.push((w, 0));
                } else if on_stack[w] {
                    lowlink[v] = lowlink[v].min(index[w]);
                }
            } else {
                call_stack.pop();
                if let Some(&(parent, _)) = call_stack.last() {
                    lowlink[parent] = lowlink[parent].min(lowlink[v]);
                }
                if lowlink[v] == index[v] {
                    let mut scc = Vec::new();
                    while let Some(w) = stack.pop() {
                        on_stack[w] = false;
                        scc.push(w);
                        if w == v {
                            break;
                        }
                    }
                    sccs.push(scc);
                }
            }
        }
    }
    sccs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edges(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect()
    }

    #[test]
    fn two_node_cycle() {
        let cycles = find_cycles(&edges(&[("a.ts", "b.ts"), ("b.ts", "a.ts")]));
        assert_eq!(cycles, vec![vec!["a.ts".to_string(), "b.ts".to_string()]]);
    }

    #[test]
    fn three_node_cycle() {
        let cycles = find_cycles(&edges(&[
            ("a.ts", "b.ts"),
            ("b.ts", "c.ts"),
            ("c.ts", "a.ts"),
        ]));
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].len(), 3);
        assert_eq!(cycles[0][0], "a.ts");
    }

    #[test]
    fn acyclic_graph_has_no_cycles() {
        let cycles = find_cycles(&edges(&[("a.ts", "b.ts"), ("b.ts", "c.ts")]));
        assert!(cycles.is_empty());
    }

    #[test]
    fn self_import_is_not_a_cycle() {
        let cycles = find_cycles(&edges(&[("a.ts", "a.ts")]));
        assert!(cycles.is_empty());
    }

    #[test]
    fn disjoint_cycles_reported_separately() {
        let cycles = find_cycles(&edges(&[
            ("a.ts", "b.ts"),
            ("b.ts", "a.ts"),
            ("x.ts", "y.ts"),
            ("y.ts", "x.ts"),
            ("x.ts", "a.ts"),
        ]));
        assert_eq!(cycles.len(), 2);
        assert_eq!(cycles[0][0], "a.ts");
        assert_eq!(cycles[1][0], "x.ts");
    }

    #[test]
    fn diamond_is_not_a_cycle() {
        // a -> b, a -> c, b -> d, c -> d: shared dependency, no cycle.
        let cycles = find_cycles(&edges(&[
            ("a.ts", "b.ts"),
            ("a.ts", "c.ts"),
            ("b.ts", "d.ts"),
            ("c.ts", "d.ts"),
        ]));
        assert!(cycles.is_empty());
    }

    #[test]
    fn deep_chain_does_not_overflow() {
        let mut pairs = Vec::new();
        for i in 0..10_000 {
            pairs.push((format!("f{i}.ts"), format!("f{}.ts", i + 1)));
        }
        pairs.push(("f10000.ts".to_string(), "f0.ts".to_string()));
        let cycles = find_cycles(&pairs);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].len(), 10_001);
    }
}

// SPDX-FileCopyrightText: 2026 Plexo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dependency ordering via depth-first topological sort.
//!
//! A cycle is fatal and names a participating service. Dependencies on
//! unregistered services are not an ordering error; the registry records
//! them per-service during initialization instead.

use std::collections::HashMap;

use plexo_core::PlexoError;

/// Visit state for the iterative DFS.
#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Compute an initialization order over `graph`: each key maps to the names
/// it depends on. Dependencies come strictly before dependents in the result.
///
/// Only names present as keys appear in the output; edges to unknown names
/// are ignored here. Roots are visited in sorted order so the result is
/// deterministic.
pub fn topo_sort(graph: &HashMap<String, Vec<String>>) -> Result<Vec<String>, PlexoError> {
    let mut marks: HashMap<&str, Mark> =
        graph.keys().map(|k| (k.as_str(), Mark::Unvisited)).collect();
    let mut order = Vec::with_capacity(graph.len());

    let mut roots: Vec<&String> = graph.keys().collect();
    roots.sort();

    for root in roots {
        if marks[root.as_str()] == Mark::Done {
            continue;
        }
        visit(root, graph, &mut marks, &mut order)?;
    }

    Ok(order)
}

/// Iterative DFS with an explicit stack; recursion depth would otherwise be
/// bounded by the longest dependency chain.
fn visit<'a>(
    root: &'a str,
    graph: &'a HashMap<String, Vec<String>>,
    marks: &mut HashMap<&'a str, Mark>,
    order: &mut Vec<String>,
) -> Result<(), PlexoError> {
    // Stack entries are (name, next-dependency-index).
    let mut stack: Vec<(&str, usize)> = vec![(root, 0)];
    marks.insert(root, Mark::InProgress);

    while let Some((name, dep_index)) = stack.pop() {
        let deps = &graph[name];
        if dep_index < deps.len() {
            stack.push((name, dep_index + 1));
            let dep = deps[dep_index].as_str();
            match marks.get(dep) {
                None => {} // unknown dependency, handled by the registry
                Some(Mark::Done) => {}
                Some(Mark::InProgress) => {
                    return Err(PlexoError::DependencyCycle {
                        service: dep.to_string(),
                    });
                }
                Some(Mark::Unvisited) => {
                    let dep_key = graph.get_key_value(dep).map(|(k, _)| k.as_str());
                    if let Some(dep_key) = dep_key {
                        marks.insert(dep_key, Mark::InProgress);
                        stack.push((dep_key, 0));
                    }
                }
            }
        } else {
            marks.insert(name, Mark::Done);
            order.push(name.to_string());
        }
    }

    Ok(())
}

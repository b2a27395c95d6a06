use std::collections::{BTreeSet, HashMap, HashSet};

use crate::extension::ExtensionId;
use crate::orchestrator::OrchestratorError;

/// An extension and the extensions it depends on, as registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyDecl {
    pub id: ExtensionId,
    pub dependencies: Vec<ExtensionId>,
}

impl DependencyDecl {
    pub fn new(id: impl Into<ExtensionId>, dependencies: &[&str]) -> Self {
        Self {
            id: id.into(),
            dependencies: dependencies.iter().map(|d| ExtensionId::from(*d)).collect(),
        }
    }
}

/// Get the order in which extensions should be loaded (dependencies first).
///
/// `decls` must be in registration order; ties are broken by it.
pub fn load_order(decls: &[DependencyDecl]) -> Result<Vec<ExtensionId>, OrchestratorError> {
    Ok(topological_sort(decls)?
        .into_iter()
        .map(|idx| decls[idx].id.clone())
        .collect())
}

/// Get the order in which extensions should be unloaded (reverse of load order)
pub fn unload_order(decls: &[DependencyDecl]) -> Result<Vec<ExtensionId>, OrchestratorError> {
    let mut order = load_order(decls)?;
    order.reverse();
    Ok(order)
}

/// `target` and everything it transitively depends on, in load order.
/// Unregistered dependencies are left out.
pub fn with_dependencies(
    target: &ExtensionId,
    decls: &[DependencyDecl],
) -> Result<Vec<ExtensionId>, OrchestratorError> {
    let index = index_by_id(decls);
    if !index.contains_key(target) {
        return Err(OrchestratorError::ExtensionNotFound(target.clone()));
    }

    let mut needed: HashSet<&ExtensionId> = HashSet::new();
    let mut stack = vec![target];
    while let Some(id) = stack.pop() {
        if !needed.insert(id) {
            continue;
        }
        if let Some(&idx) = index.get(id) {
            stack.extend(
                decls[idx]
                    .dependencies
                    .iter()
                    .filter(|dep| index.contains_key(*dep)),
            );
        }
    }

    let filtered: Vec<DependencyDecl> = decls
        .iter()
        .filter(|decl| needed.contains(&decl.id))
        .cloned()
        .collect();
    load_order(&filtered)
}

fn index_by_id(decls: &[DependencyDecl]) -> HashMap<&ExtensionId, usize> {
    let mut index = HashMap::with_capacity(decls.len());
    for (idx, decl) in decls.iter().enumerate() {
        index.entry(&decl.id).or_insert(idx);
    }
    index
}

/// Perform topological sort using Kahn's algorithm.
///
/// Returns registration indices. The ready set is ordered by index, so the
/// result is deterministic. Dependencies that are not registered are ignored.
fn topological_sort(decls: &[DependencyDecl]) -> Result<Vec<usize>, OrchestratorError> {
    let index = index_by_id(decls);

    // Edge dep -> idx means idx depends on dep (dep must load first)
    let mut in_degree = vec![0usize; decls.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); decls.len()];

    for (idx, decl) in decls.iter().enumerate() {
        let mut seen = HashSet::new();
        for dep in &decl.dependencies {
            let Some(&dep_idx) = index.get(dep) else {
                continue;
            };
            if seen.insert(dep_idx) {
                in_degree[idx] += 1;
                dependents[dep_idx].push(idx);
            }
        }
    }

    let mut ready: BTreeSet<usize> = (0..decls.len()).filter(|&idx| in_degree[idx] == 0).collect();
    let mut result = Vec::with_capacity(decls.len());

    while let Some(idx) = ready.pop_first() {
        result.push(idx);
        for &dependent in &dependents[idx] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                ready.insert(dependent);
            }
        }
    }

    // Check for cycles
    if result.len() != decls.len() {
        let remaining: Vec<&str> = (0..decls.len())
            .filter(|idx| in_degree[*idx] > 0)
            .map(|idx| decls[idx].id.as_str())
            .collect();
        return Err(OrchestratorError::DependencyCycle(format!(
            "Cycle detected involving: {}",
            remaining.join(", ")
        )));
    }

    Ok(result)
}

#[cfg(test)]
mod tests;

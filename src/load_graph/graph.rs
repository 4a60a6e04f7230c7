//! Load step graph definition and compilation

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;

use thiserror::Error;

/// Errors found while compiling a step graph
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("step {0} is declared twice")]
    DuplicateStep(String),
    #[error("step {step} depends on unknown step {dependency}")]
    UnknownDependency { step: String, dependency: String },
    #[error("steps {0:?} form a dependency cycle")]
    Cycle(Vec<String>),
    #[error("step {0} ran before its dependencies completed")]
    OutOfOrder(String),
}

/// Identifier of a step inside one graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StepId(pub u32);

/// Metadata for a step in the graph
#[derive(Debug, Clone)]
pub struct StepNode<K> {
    pub id: StepId,
    pub key: K,
    pub dependencies: Vec<K>,
}

/// Named steps with declared dependencies
pub struct LoadGraph<K> {
    nodes: Vec<StepNode<K>>,
}

impl<K: Copy + Eq + Hash + Debug> LoadGraph<K> {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Add a step. Dependencies may be declared before the steps they name.
    pub fn add_step(&mut self, key: K, dependencies: &[K]) -> StepId {
        let id = StepId(self.nodes.len() as u32);
        self.nodes.push(StepNode {
            id,
            key,
            dependencies: dependencies.to_vec(),
        });
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Validate the graph and order it with Kahn's algorithm
    pub fn compile(&self) -> Result<CompiledGraph<K>, GraphError> {
        let mut ids: HashMap<K, StepId> = HashMap::new();
        for node in &self.nodes {
            if ids.insert(node.key, node.id).is_some() {
                return Err(GraphError::DuplicateStep(format!("{:?}", node.key)));
            }
        }

        let mut dependencies: Vec<Vec<StepId>> = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let mut resolved = Vec::with_capacity(node.dependencies.len());
            for dependency in &node.dependencies {
                let id = ids.get(dependency).ok_or_else(|| GraphError::UnknownDependency {
                    step: format!("{:?}", node.key),
                    dependency: format!("{:?}", dependency),
                })?;
                resolved.push(*id);
            }
            dependencies.push(resolved);
        }

        let mut in_degree: Vec<usize> = dependencies.iter().map(Vec::len).collect();
        let mut dependents: Vec<Vec<StepId>> = vec![Vec::new(); self.nodes.len()];
        for (index, deps) in dependencies.iter().enumerate() {
            for dep in deps {
                dependents[dep.0 as usize].push(StepId(index as u32));
            }
        }

        // Seed in declaration order so the result is deterministic
        let mut queue: Vec<StepId> = (0..self.nodes.len())
            .rev()
            .filter(|&i| in_degree[i] == 0)
            .map(|i| StepId(i as u32))
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(step) = queue.pop() {
            order.push(step);
            for dependent in dependents[step.0 as usize].iter().rev() {
                let degree = &mut in_degree[dependent.0 as usize];
                *degree -= 1;
                if *degree == 0 {
                    queue.push(*dependent);
                }
            }
        }

        if order.len() != self.nodes.len() {
            let stuck = self
                .nodes
                .iter()
                .filter(|n| in_degree[n.id.0 as usize] > 0)
                .map(|n| format!("{:?}", n.key))
                .collect();
            return Err(GraphError::Cycle(stuck));
        }

        Ok(CompiledGraph {
            keys: self.nodes.iter().map(|n| n.key).collect(),
            ids,
            dependencies,
            order,
        })
    }
}

impl<K: Copy + Eq + Hash + Debug> Default for LoadGraph<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Validated step graph with its execution order
#[derive(Debug, Clone)]
pub struct CompiledGraph<K> {
    keys: Vec<K>,
    ids: HashMap<K, StepId>,
    dependencies: Vec<Vec<StepId>>,
    order: Vec<StepId>,
}

impl<K: Copy + Eq + Hash + Debug> CompiledGraph<K> {
    /// Steps in an order where every step follows its dependencies
    pub fn order(&self) -> impl Iterator<Item = K> + '_ {
        self.order.iter().map(|id| self.keys[id.0 as usize])
    }

    /// Steps without dependencies
    pub fn roots(&self) -> impl Iterator<Item = K> + '_ {
        self.order()
            .filter(|key| self.dependencies_of(*key).map_or(false, |deps| deps.is_empty()))
    }

    pub fn id(&self, key: K) -> Option<StepId> {
        self.ids.get(&key).copied()
    }

    pub fn dependencies_of(&self, key: K) -> Option<Vec<K>> {
        let id = self.id(key)?;
        Some(
            self.dependencies[id.0 as usize]
                .iter()
                .map(|dep| self.keys[dep.0 as usize])
                .collect(),
        )
    }

    /// A step can run once every one of its dependencies has completed
    pub fn is_runnable(&self, key: K, completed: &HashSet<K>) -> bool {
        match self.id(key) {
            Some(id) => self.dependencies[id.0 as usize]
                .iter()
                .all(|dep| completed.contains(&self.keys[dep.0 as usize])),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diamond() -> LoadGraph<&'static str> {
        let mut graph = LoadGraph::new();
        graph.add_step("fetch a", &[]);
        graph.add_step("fetch b", &[]);
        graph.add_step("build a", &["fetch a"]);
        graph.add_step("build b", &["fetch b"]);
        graph.add_step("join", &["build a", "build b"]);
        graph
    }

    #[test]
    fn test_order_respects_dependencies() {
        let compiled = diamond().compile().unwrap();
        let order: Vec<_> = compiled.order().collect();
        assert_eq!(order.len(), 5);
        let position = |k: &str| order.iter().position(|o| *o == k).unwrap();
        assert!(position("fetch a") < position("build a"));
        assert!(position("fetch b") < position("build b"));
        assert!(position("build a") < position("join"));
        assert!(position("build b") < position("join"));
        assert_eq!(*order.last().unwrap(), "join");
    }

    #[test]
    fn test_roots_are_the_fetches() {
        let compiled = diamond().compile().unwrap();
        let roots: Vec<_> = compiled.roots().collect();
        assert_eq!(roots, vec!["fetch a", "fetch b"]);
    }

    #[test]
    fn test_join_waits_for_every_branch() {
        let compiled = diamond().compile().unwrap();
        let mut completed = HashSet::new();
        assert!(!compiled.is_runnable("join", &completed));

        completed.extend(["fetch a", "fetch b", "build a"]);
        assert!(!compiled.is_runnable("join", &completed));
        assert!(compiled.is_runnable("build b", &completed));

        completed.insert("build b");
        assert!(compiled.is_runnable("join", &completed));
        assert!(!compiled.is_runnable("missing", &completed));
    }

    #[test]
    fn test_cycle_is_rejected() {
        let mut graph = LoadGraph::new();
        graph.add_step("a", &["c"]);
        graph.add_step("b", &["a"]);
        graph.add_step("c", &["b"]);
        graph.add_step("free", &[]);
        match graph.compile() {
            Err(GraphError::Cycle(steps)) => assert_eq!(steps.len(), 3),
            other => panic!("expected a cycle, got {:?}", other.map(|g| g.len())),
        }
    }

    #[test]
    fn test_unknown_dependency_is_rejected() {
        let mut graph = LoadGraph::new();
        graph.add_step("build", &["fetch"]);
        assert!(matches!(
            graph.compile(),
            Err(GraphError::UnknownDependency { .. })
        ));
    }

    #[test]
    fn test_duplicate_step_is_rejected() {
        let mut graph = LoadGraph::new();
        graph.add_step("fetch", &[]);
        graph.add_step("fetch", &[]);
        assert_eq!(
            graph.compile().unwrap_err(),
            GraphError::DuplicateStep("\"fetch\"".to_string())
        );
    }
}

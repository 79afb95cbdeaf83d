//! Wiring graph
//!
//! Built from declared dependencies at start. Every edge is resolved to
//! exactly one definition up front, so missing and ambiguous dependencies
//! surface before any factory runs.

use super::capability::Capability;
use super::registry::BeanRegistry;
use beanbox_domain::error::{Error, Result};

/// A resolved edge from a consumer to the definition that satisfies it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyEdge {
    pub consumer: String,
    pub provider: String,
    pub capability: Capability,
    pub qualifier: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Done,
}

/// Dependency graph over registered definitions
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    names: Vec<String>,
    adjacency: Vec<Vec<usize>>,
    edges: Vec<DependencyEdge>,
}

impl DependencyGraph {
    /// Resolve every declared dependency in `registry`
    pub fn build(registry: &BeanRegistry) -> Result<Self> {
        let mut names = Vec::with_capacity(registry.definition_count());
        let mut adjacency = Vec::with_capacity(registry.definition_count());
        let mut edges = Vec::new();

        for definition in registry.definitions() {
            let mut targets = Vec::with_capacity(definition.dependencies().len());
            for dependency in definition.dependencies() {
                let target = registry
                    .select_candidate(dependency.capability(), dependency.qualifier())
                    .map_err(|error| error.required_by(definition.name()))?;
                targets.push(target);
                edges.push(DependencyEdge {
                    consumer: definition.name().to_string(),
                    provider: registry.definition_at(target).name().to_string(),
                    capability: *dependency.capability(),
                    qualifier: dependency.qualifier().map(str::to_string),
                });
            }
            names.push(definition.name().to_string());
            adjacency.push(targets);
        }

        Ok(Self {
            names,
            adjacency,
            edges,
        })
    }

    pub fn edges(&self) -> &[DependencyEdge] {
        &self.edges
    }

    /// Providers of `bean`, in declaration order
    pub fn dependencies_of(&self, bean: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|edge| edge.consumer == bean)
            .map(|edge| edge.provider.as_str())
            .collect()
    }

    /// Indices ordered so that every provider precedes its consumers
    ///
    /// Independent beans keep registration order. Fails with the offending
    /// path when the graph has a cycle.
    pub fn topological_order(&self) -> Result<Vec<usize>> {
        let mut marks = vec![Mark::Unvisited; self.names.len()];
        let mut path = Vec::new();
        let mut order = Vec::with_capacity(self.names.len());
        for node in 0..self.names.len() {
            self.visit(node, &mut marks, &mut path, &mut order)?;
        }
        Ok(order)
    }

    /// Bean names in construction order
    pub fn construction_order(&self) -> Result<Vec<&str>> {
        Ok(self
            .topological_order()?
            .into_iter()
            .map(|index| self.names[index].as_str())
            .collect())
    }

    fn visit(
        &self,
        node: usize,
        marks: &mut [Mark],
        path: &mut Vec<usize>,
        order: &mut Vec<usize>,
    ) -> Result<()> {
        match marks[node] {
            Mark::Done => return Ok(()),
            Mark::Visiting => {
                let start = path.iter().position(|&n| n == node).unwrap_or(0);
                let cycle = path[start..]
                    .iter()
                    .map(|&n| self.names[n].clone())
                    .collect();
                return Err(Error::cyclic_dependency(cycle));
            }
            Mark::Unvisited => {}
        }

        marks[node] = Mark::Visiting;
        path.push(node);
        for &target in &self.adjacency[node] {
            self.visit(target, marks, path, order)?;
        }
        path.pop();
        marks[node] = Mark::Done;
        order.push(node);
        Ok(())
    }
}

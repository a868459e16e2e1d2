// assay-core/src/domain/graph/dag.rs

use crate::domain::error::DomainError;
use crate::domain::project::ModelRegistry;
use std::collections::{BTreeMap, BTreeSet, HashMap};

pub struct GraphSolver;

/// upstream -> models that read it, plus the number of unresolved upstreams per model.
struct DependencyGraph<'a> {
    in_degree: BTreeMap<&'a str, usize>,
    downstream: HashMap<&'a str, BTreeSet<&'a str>>,
}

impl<'a> DependencyGraph<'a> {
    fn build(registry: &'a ModelRegistry) -> Result<Self, DomainError> {
        let mut in_degree: BTreeMap<&str, usize> = BTreeMap::new();
        let mut downstream: HashMap<&str, BTreeSet<&str>> = HashMap::new();

        // 1. Initialization: Prepare all known nodes
        for model in registry.all() {
            in_degree.insert(model.name.as_str(), 0);
            downstream.insert(model.name.as_str(), BTreeSet::new());
        }

        // 2. Edges (B -> A when A holds a relationship to B)
        let mut models: Vec<_> = registry.all().collect();
        models.sort_by(|a, b| a.name.cmp(&b.name));

        for model in models {
            for target in model.upstream_models() {
                let Some(readers) = downstream.get_mut(target) else {
                    return Err(DomainError::DanglingReference {
                        model: model.name.clone(),
                        target: target.to_string(),
                    });
                };
                // Several columns may point at the same upstream: one edge only.
                if readers.insert(model.name.as_str()) {
                    *in_degree.entry(model.name.as_str()).or_insert(0) += 1;
                }
            }
        }

        Ok(Self {
            in_degree,
            downstream,
        })
    }

    fn release(&mut self, resolved: &str, ready: &mut BTreeSet<&'a str>) {
        if let Some(readers) = self.downstream.get(resolved) {
            for reader in readers {
                if let Some(degree) = self.in_degree.get_mut(reader) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert(*reader);
                    }
                }
            }
        }
    }

    fn roots(&self) -> BTreeSet<&'a str> {
        self.in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(name, _)| *name)
            .collect()
    }

    fn unresolved(&self) -> BTreeSet<&'a str> {
        self.in_degree
            .iter()
            .filter(|(_, degree)| **degree > 0)
            .map(|(name, _)| *name)
            .collect()
    }
}

impl GraphSolver {
    /// Topological order of every registered model.
    ///
    /// For each relationship from A to B, B comes before A. When several models
    /// are ready at once they are emitted by ascending name, so the order is
    /// stable across runs.
    pub fn resolve(registry: &ModelRegistry) -> Result<Vec<String>, DomainError> {
        let mut graph = DependencyGraph::build(registry)?;
        let mut ready = graph.roots();
        let mut order = Vec::with_capacity(registry.len());

        while let Some(current) = ready.pop_first() {
            order.push(current.to_string());
            graph.release(current, &mut ready);
        }

        if order.len() != registry.len() {
            return Err(DomainError::CyclicDependency(find_cycle(
                registry,
                &graph.unresolved(),
            )));
        }

        Ok(order)
    }

    /// Same ordering grouped into layers.
    /// Layer N depends only on layers 0..N-1; models inside a layer are independent.
    pub fn plan_layers(registry: &ModelRegistry) -> Result<Vec<Vec<String>>, DomainError> {
        let mut graph = DependencyGraph::build(registry)?;
        let mut current_layer = graph.roots();
        let mut layers: Vec<Vec<String>> = Vec::new();
        let mut total_resolved = 0;

        while !current_layer.is_empty() {
            let mut next_layer = BTreeSet::new();
            for name in &current_layer {
                graph.release(name, &mut next_layer);
            }
            total_resolved += current_layer.len();
            layers.push(current_layer.iter().map(|s| s.to_string()).collect());
            current_layer = next_layer;
        }

        if total_resolved != registry.len() {
            return Err(DomainError::CyclicDependency(find_cycle(
                registry,
                &graph.unresolved(),
            )));
        }

        Ok(layers)
    }
}

/// Walks upstream from the smallest unresolved model until a node repeats.
/// Every unresolved model still waits on another unresolved one, so the walk
/// always closes a loop.
fn find_cycle<'a>(registry: &'a ModelRegistry, unresolved: &BTreeSet<&'a str>) -> Vec<String> {
    let mut path: Vec<&'a str> = Vec::new();
    let mut position: HashMap<&'a str, usize> = HashMap::new();

    let Some(mut current) = unresolved.first().copied() else {
        return Vec::new();
    };

    loop {
        if let Some(&start) = position.get(current) {
            let mut cycle: Vec<String> = path[start..].iter().map(|s| s.to_string()).collect();
            cycle.push(current.to_string());
            return cycle;
        }
        position.insert(current, path.len());
        path.push(current);

        let next = registry.get(current).ok().and_then(|model| {
            model
                .upstream_models()
                .filter(|u| unresolved.contains(u))
                .min()
        });

        match next {
            Some(upstream) => current = upstream,
            None => return path.iter().map(|s| s.to_string()).collect(),
        }
    }
}

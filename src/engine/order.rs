//! Constrained elimination orderings over the interaction graph.
//!
//! Every factor scope induces a clique on the interaction graph; a greedy
//! elimination scheme repeatedly removes the cheapest eligible variable and
//! connects its remaining neighbors. For influence diagrams the temporal
//! partial order restricts eligibility: bucket elimination must run against
//! the information ordering, so a variable named in the partial order can be
//! eliminated only after everything observed later than it. Constrained
//! variables therefore appear in the result in reverse temporal order;
//! unconstrained variables interleave wherever the heuristic puts them.

use rustc_hash::FxHashSet;

use crate::engine::errors::SolveError;
use crate::model::{InfluenceDiagram, VarKind};

/// Greedy scoring heuristic for the next variable to eliminate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderMethod {
    /// Fewest fill-in edges.
    MinFill,
    /// Fewest not-yet-eliminated neighbors.
    MinInduced,
    /// Smallest total weight of fill-in edges, weighting an edge by the
    /// product of its endpoint cardinalities.
    WeightedMinFill,
}

/// Computes a total elimination order for every variable of the model,
/// constrained by the temporal partial order.
pub fn elimination_order(
    model: &InfluenceDiagram,
    method: OrderMethod,
) -> Result<Vec<u32>, SolveError> {
    let n = model.nvar();
    let porder = validated_partial_order(model)?;

    let mut adj = interaction_graph(model);
    let cards: Vec<u64> = model.vars().iter().map(|v| v.card() as u64).collect();
    let mut in_porder = vec![false; n];
    for &v in &porder {
        in_porder[v as usize] = true;
    }

    let mut eliminated = vec![false; n];
    let mut order = Vec::with_capacity(n);
    // Only the latest not-yet-eliminated entry of the partial order is
    // eligible; `remaining` is the count of constrained variables still in
    // the graph.
    let mut remaining = porder.len();

    for _ in 0..n {
        let mut best: Option<(u64, u32)> = None;
        for v in 0..n as u32 {
            if eliminated[v as usize] {
                continue;
            }
            if in_porder[v as usize] && porder[remaining - 1] != v {
                continue;
            }
            let score = score(&adj, &cards, v, method);
            if best.map_or(true, |(s, _)| score < s) {
                best = Some((score, v));
            }
        }
        // n un-eliminated variables always leave at least one eligible.
        let Some((_, v)) = best else { break };
        connect_neighbors(&mut adj, &eliminated, v);
        eliminated[v as usize] = true;
        if in_porder[v as usize] {
            remaining -= 1;
        }
        order.push(v);
    }
    Ok(order)
}

/// Induced width of the model's interaction graph along `order`: the
/// largest number of not-yet-eliminated neighbors any variable has at its
/// elimination step.
pub fn induced_width(model: &InfluenceDiagram, order: &[u32]) -> usize {
    let mut adj = interaction_graph(model);
    let mut eliminated = vec![false; model.nvar()];
    let mut width = 0usize;
    for &v in order {
        let live = adj[v as usize]
            .iter()
            .filter(|&&u| !eliminated[u as usize])
            .count();
        width = width.max(live);
        connect_neighbors(&mut adj, &eliminated, v);
        eliminated[v as usize] = true;
    }
    width
}

/// Checks the partial order against the model: indices in range, no value
/// variables, no duplicates, and every decision present when the order is
/// non-empty. The caller consumes it back to front, eliminating the latest
/// observed variable first.
fn validated_partial_order(model: &InfluenceDiagram) -> Result<Vec<u32>, SolveError> {
    let porder = model.partial_order();
    if porder.is_empty() {
        return Ok(Vec::new());
    }

    let mut seen = FxHashSet::default();
    for &v in porder {
        match model.kind(v) {
            None => {
                return Err(SolveError::MissingOrder(format!(
                    "partial order references unknown variable {v}"
                )));
            }
            Some(VarKind::Value) => {
                return Err(SolveError::MissingOrder(format!(
                    "partial order may not contain value variable {v}"
                )));
            }
            Some(_) => {}
        }
        if !seen.insert(v) {
            return Err(SolveError::MissingOrder(format!(
                "variable {v} appears twice in the partial order"
            )));
        }
    }
    for d in model.decisions() {
        if !seen.contains(&d) {
            return Err(SolveError::MissingOrder(format!(
                "decision variable {d} is missing from the partial order"
            )));
        }
    }
    Ok(porder.to_vec())
}

fn interaction_graph(model: &InfluenceDiagram) -> Vec<FxHashSet<u32>> {
    let mut adj: Vec<FxHashSet<u32>> = vec![FxHashSet::default(); model.nvar()];
    for factor in model.factors() {
        let scope = factor.scope().as_slice();
        for (i, a) in scope.iter().enumerate() {
            for b in &scope[i + 1..] {
                adj[a.index() as usize].insert(b.index());
                adj[b.index() as usize].insert(a.index());
            }
        }
    }
    adj
}

/// Connects all not-yet-eliminated neighbors of `v` pairwise.
fn connect_neighbors(adj: &mut [FxHashSet<u32>], eliminated: &[bool], v: u32) {
    let neighbors: Vec<u32> = adj[v as usize]
        .iter()
        .copied()
        .filter(|&u| !eliminated[u as usize])
        .collect();
    for (i, &a) in neighbors.iter().enumerate() {
        for &b in &neighbors[i + 1..] {
            adj[a as usize].insert(b);
            adj[b as usize].insert(a);
        }
        adj[a as usize].remove(&v);
    }
}

fn score(adj: &[FxHashSet<u32>], cards: &[u64], v: u32, method: OrderMethod) -> u64 {
    // Eliminating a variable removes it from every live neighbor's set, so
    // the set of a live variable holds exactly its live neighborhood.
    let neighbors: Vec<u32> = adj[v as usize].iter().copied().collect();
    match method {
        OrderMethod::MinInduced => neighbors.len() as u64,
        OrderMethod::MinFill => {
            let mut fill = 0u64;
            for (i, &a) in neighbors.iter().enumerate() {
                for &b in &neighbors[i + 1..] {
                    if !adj[a as usize].contains(&b) {
                        fill += 1;
                    }
                }
            }
            fill
        }
        OrderMethod::WeightedMinFill => {
            let mut weight = 0u64;
            for (i, &a) in neighbors.iter().enumerate() {
                for &b in &neighbors[i + 1..] {
                    if !adj[a as usize].contains(&b) {
                        weight = weight
                            .saturating_add(cards[a as usize].saturating_mul(cards[b as usize]));
                    }
                }
            }
            weight
        }
    }
}

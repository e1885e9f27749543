//! Tensor-lifetime-aware memory planning.
//!
//! Walks the topological order once to find each node output's
//! `[first_use, last_use]` step interval, then estimates peak
//! concurrent live memory by sweeping the interval set. The graph's
//! pool is sized to `1.2 *` that estimate before execution begins.

use crate::node::NodeId;

/// One tensor's lifetime, indexed by position in the topological order.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Lifetime {
    pub(crate) producer: NodeId,
    pub(crate) first_use: usize,
    pub(crate) last_use: usize,
    pub(crate) size_bytes: usize,
}

/// Output of a planning pass: one lifetime per producing node, plus the
/// peak-concurrency byte estimate the pool should be sized against.
pub(crate) struct MemoryPlan {
    pub(crate) lifetimes: Vec<Lifetime>,
    pub(crate) peak_bytes: usize,
}

/// `order`: topological order (index = step). `size_of`: byte size of
/// the tensor a node produces, once known (0 before it has run once —
/// planning happens before the node has a computed output, so callers
/// that already know the element count/dtype should supply an
/// estimate; unknown producers contribute zero and are refined after
/// the fact by `refine`).
pub(crate) fn plan(
    order: &[NodeId],
    inputs_of: impl Fn(NodeId) -> Vec<NodeId>,
    size_of: impl Fn(NodeId) -> usize,
) -> MemoryPlan {
    let mut lifetimes: Vec<Lifetime> = Vec::with_capacity(order.len());
    for (step, &node) in order.iter().enumerate() {
        lifetimes.push(Lifetime { producer: node, first_use: step, last_use: step, size_bytes: size_of(node) });
    }

    for (step, &node) in order.iter().enumerate() {
        for pred in inputs_of(node) {
            if let Some(lt) = lifetimes.iter_mut().find(|lt| lt.producer == pred) {
                lt.last_use = lt.last_use.max(step);
            }
        }
    }

    let peak_bytes = estimate_peak(&lifetimes);
    MemoryPlan { lifetimes, peak_bytes }
}

/// Sweep-line over `[first_use, last_use]` intervals: at each step,
/// sum the bytes of every tensor whose interval contains it, and track
/// the maximum.
fn estimate_peak(lifetimes: &[Lifetime]) -> usize {
    if lifetimes.is_empty() {
        return 0;
    }
    let horizon = lifetimes.iter().map(|lt| lt.last_use).max().unwrap_or(0);
    let mut peak = 0usize;
    for step in 0..=horizon {
        let live: usize = lifetimes
            .iter()
            .filter(|lt| lt.first_use <= step && step <= lt.last_use)
            .map(|lt| lt.size_bytes)
            .sum();
        peak = peak.max(live);
    }
    peak
}

/// `1.2 *` the peak estimate, per the planner's sizing rule.
pub(crate) fn recommended_pool_size(peak_bytes: usize) -> usize {
    ((peak_bytes as f64) * 1.2).ceil() as usize
}

/// Which of `lifetimes`' tensors are no longer referenced by any node
/// at or after `step` — candidates for the reclaimer to free back to
/// the pool. v1 only reports the set; actual free-to-pool is deferred
/// (freeing would require the executor to also drop the node's
/// `Tensor`, releasing it back to the pool via `Storage::drop`, which
/// already happens naturally once no live handle references it).
pub(crate) fn reclaimable_at(plan: &MemoryPlan, step: usize) -> Vec<NodeId> {
    plan.lifetimes.iter().filter(|lt| lt.last_use < step).map(|lt| lt.producer).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peak_accounts_for_overlapping_lifetimes() {
        let lifetimes = vec![
            Lifetime { producer: NodeId(0), first_use: 0, last_use: 2, size_bytes: 100 },
            Lifetime { producer: NodeId(1), first_use: 1, last_use: 3, size_bytes: 200 },
            Lifetime { producer: NodeId(2), first_use: 3, last_use: 3, size_bytes: 50 },
        ];
        // At step 1 and 2, both node 0 and node 1 are live: 300.
        assert_eq!(estimate_peak(&lifetimes), 300);
    }

    #[test]
    fn recommended_size_is_120_percent_of_peak() {
        assert_eq!(recommended_pool_size(1000), 1200);
    }

    #[test]
    fn reclaimable_excludes_tensors_still_needed() {
        let plan = MemoryPlan {
            lifetimes: vec![
                Lifetime { producer: NodeId(0), first_use: 0, last_use: 1, size_bytes: 10 },
                Lifetime { producer: NodeId(1), first_use: 0, last_use: 5, size_bytes: 10 },
            ],
            peak_bytes: 20,
        };
        let reclaimable = reclaimable_at(&plan, 2);
        assert_eq!(reclaimable, vec![NodeId(0)]);
    }
}

//! Negative cycle search over the rate graph.
//!
//! The search is a single-source Bellman-Ford followed by a walk back through the
//! predecessor tree from every edge that can still be relaxed. It reports at most one
//! cycle per negative region reachable through that tree; it does not enumerate
//! every negative cycle of the graph. Callers and fixtures rely on exactly this
//! output, so the search must stay single-source.

use eyre::{eyre, Result};
use log::{debug, warn};

use super::cycle::{Cycle, Hop};
use super::graph::{NodeIndex, RateGraph};
use super::types::{PoolId, TokenId};

/// Edge a node was last relaxed through
type Predecessor = Option<(NodeIndex, PoolId)>;

/// Finds negative cycles in a built [`RateGraph`]
#[derive(Debug, Clone, Copy)]
pub struct CycleDetector<'a> {
    /// Graph to search
    graph: &'a RateGraph,
}

impl<'a> CycleDetector<'a> {
    /// Creates a detector over `graph`
    #[must_use]
    pub const fn new(graph: &'a RateGraph) -> Self {
        Self { graph }
    }

    /// Returns the negative cycles found from `anchor`, in discovery order and without
    /// duplicates. Each cycle is in trading order. An anchor without edges yields none.
    #[must_use]
    pub fn search(&self, anchor: &TokenId) -> Vec<Cycle> {
        let Some(source) = self.graph.node(anchor) else {
            debug!("arb::detector: anchor {anchor} is not in the graph");
            return Vec::new();
        };

        let (distance, predecessor) = self.relax_from(source);

        let mut cycles: Vec<Cycle> = Vec::new();
        let mut visited = vec![false; self.graph.node_count()];
        for (u, v, edge) in self.graph.indexed_edges() {
            if distance[u] + edge.weight >= distance[v] {
                continue;
            }
            if visited[v] || predecessor[v].is_none() {
                continue;
            }
            let Some(hops) = self.walk_back(v, &predecessor, &mut visited) else {
                continue;
            };
            match Cycle::new(hops) {
                Ok(cycle) => {
                    if !cycles.contains(&cycle) {
                        cycles.push(cycle);
                    }
                }
                Err(e) => warn!("arb::detector: discarding malformed walk: {e}"),
            }
        }

        debug!(
            "arb::detector: {} cycles from {} over {} nodes / {} edges",
            cycles.len(),
            anchor,
            self.graph.node_count(),
            self.graph.edge_count()
        );
        cycles
    }

    /// Runs `node_count - 1` relaxation passes from `source`
    fn relax_from(&self, source: NodeIndex) -> (Vec<f64>, Vec<Predecessor>) {
        let nodes = self.graph.node_count();
        let mut distance = vec![f64::INFINITY; nodes];
        let mut predecessor: Vec<Predecessor> = vec![None; nodes];
        distance[source] = 0.0;

        for _ in 1..nodes {
            for (u, v, edge) in self.graph.indexed_edges() {
                let candidate = distance[u] + edge.weight;
                if candidate < distance[v] {
                    distance[v] = candidate;
                    predecessor[v] = Some((u, edge.pool));
                }
            }
        }
        (distance, predecessor)
    }

    /// Follows predecessors back from `v` until the walk closes on itself, then returns
    /// the closed part in trading order. `None` if the walk falls off the tree.
    fn walk_back(
        &self,
        v: NodeIndex,
        predecessor: &[Predecessor],
        visited: &mut [bool],
    ) -> Option<Vec<Hop>> {
        // (predecessor, node, pool), collected backwards
        let mut walk: Vec<(NodeIndex, NodeIndex, PoolId)> = Vec::new();
        let mut x = v;
        loop {
            visited[x] = true;
            let (pred, pool) = predecessor[x]?;
            walk.push((pred, x, pool));
            x = pred;
            if x == v || walk.iter().any(|&(_, node, _)| node == x) {
                break;
            }
        }

        let start = walk.iter().position(|&(_, node, _)| node == x)?;
        Some(
            walk[start..]
                .iter()
                .rev()
                .map(|&(from, to, pool)| {
                    Hop::new(self.graph.token(from), self.graph.token(to), pool)
                })
                .collect(),
        )
    }

    /// Relative profit of trading around `cycle` at current prices, before fees and
    /// slippage: `exp(-sum of weights) - 1`.
    ///
    /// # Errors
    /// * If a hop has no matching edge in the graph
    pub fn profit(&self, cycle: &Cycle) -> Result<f64> {
        let mut total = 0.0;
        for hop in cycle.hops() {
            let edge = self
                .graph
                .edge(&hop.from, &hop.to, &hop.pool)
                .ok_or_else(|| eyre!("No edge {} -> {} via {}", hop.from, hop.to, hop.pool))?;
            total += edge.weight;
        }
        Ok((-total).exp() - 1.0)
    }

    /// Whether the graph contains any negative cycle at all, wherever it is.
    ///
    /// Relaxes from a virtual source tied to every node with a zero-weight edge, so it
    /// is independent of any anchor. Cheap enough to gate the full search.
    #[must_use]
    pub fn has_any_negative_cycle(&self) -> bool {
        let nodes = self.graph.node_count();
        let mut distance = vec![0.0_f64; nodes];

        for _ in 0..nodes {
            let mut relaxed = false;
            for (u, v, edge) in self.graph.indexed_edges() {
                let candidate = distance[u] + edge.weight;
                if candidate < distance[v] {
                    distance[v] = candidate;
                    relaxed = true;
                }
            }
            if !relaxed {
                return false;
            }
        }

        self.graph
            .indexed_edges()
            .any(|(u, v, edge)| distance[u] + edge.weight < distance[v])
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::arb::test_helpers::*;

    #[test]
    fn test_three_pools_one_exchange_arb() {
        let records = quoted_records(&[
            ("Pool1", "A", "B", 1.1, 100, 110, "Ex1"),
            ("Pool2", "B", "C", 1.1, 200, 220, "Ex1"),
            ("Pool3", "C", "A", 0.9, 300, 270, "Ex1"),
        ]);
        let graph = RateGraph::build(&records);
        let detector = CycleDetector::new(&graph);

        assert!(detector.has_any_negative_cycle());
        let cycles = detector.search(&token_id("A"));

        // 0.9 * 1.1 * 1.1 = 1.089
        assert_eq!(
            cycles,
            vec![cycle(&[
                ("A", "C", "Pool3"),
                ("C", "B", "Pool2"),
                ("B", "A", "Pool1")
            ])]
        );
        let profit = detector.profit(&cycles[0]).unwrap();
        assert!((profit - 0.089).abs() < 1e-9, "profit was {profit}");
    }

    #[test]
    fn test_two_pools_arb_with_many_tokens() {
        let records = quoted_records(&[
            ("Pool1", "A", "B", 1.2, 100, 120, "Ex1"),
            ("Pool2", "B", "C", 1.2, 200, 240, "Ex2"),
            ("Pool3", "B", "A", 0.9, 200, 180, "Ex3"),
            ("Pool4", "C", "D", 1.2, 300, 360, "Ex4"),
            ("Pool5", "C", "B", 0.9, 300, 270, "Ex5"),
            ("Pool6", "D", "A", 0.75, 400, 300, "Ex6"),
        ]);
        let graph = RateGraph::build(&records);
        let cycles = CycleDetector::new(&graph).search(&token_id("A"));

        // 0.9 * 1.2 = 1.08, the other loops are not reported
        assert_eq!(
            cycles,
            vec![cycle(&[("A", "B", "Pool3"), ("B", "A", "Pool1")])]
        );
    }

    #[test]
    fn test_two_pools_same_pair_across_exchanges() {
        // Two pools on the same pair priced apart. Only the cycle reachable through the
        // predecessor tree from WETH is reported, not its mirror image.
        let aergo = "0x91Af0fBB28ABA7E31403Cb457106Ce79397FD4E6";
        let weth = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2";
        let sushi_pool = "0x9E48FaDf799E0513d2EF4631478ea186741fA617";
        let uni_pool = "0x505a152C24B03A666E903aA6159e5F9433094893";
        let records = quoted_records(&[
            (sushi_pool, aergo, weth, 21_421.536_494_150_692, 1, 1, "sushiswapV2"),
            (uni_pool, aergo, weth, 21_318.652_274_278_63, 1, 1, "uniswapV2"),
        ]);
        let graph = RateGraph::build(&records);
        let detector = CycleDetector::new(&graph);
        let cycles = detector.search(&token_id(weth));

        assert_eq!(
            cycles,
            vec![cycle(&[(aergo, weth, uni_pool), (weth, aergo, sushi_pool)])]
        );
        let profit = detector.profit(&cycles[0]).unwrap();
        let expected = 1.0 / 21_318.652_274_278_63 * 21_421.536_494_150_692 - 1.0;
        assert!((profit - expected).abs() < 1e-10);
    }

    #[test]
    fn test_no_arb_without_fees() {
        let records = quoted_records(&[
            ("Pool1", "A", "B", 1.0, 100, 100, "Ex1"),
            ("Pool2", "B", "C", 1.0, 200, 200, "Ex2"),
            ("Pool3", "C", "A", 1.0, 300, 300, "Ex3"),
        ]);
        let graph = RateGraph::build(&records);
        let detector = CycleDetector::new(&graph);

        assert!(!detector.has_any_negative_cycle());
        assert!(detector.search(&token_id("A")).is_empty());
    }

    #[test]
    fn test_arbitrage_calculation_with_parallel_pool() {
        let records = quoted_records(&[
            ("Pool1", "A", "B", 1.1, 100, 110, "Ex1"),
            ("Pool2", "B", "C", 1.1, 200, 220, "Ex2"),
            ("Pool3", "C", "A", 0.9, 300, 270, "Ex3"),
            ("Pool4", "A", "B", 1.1, 400, 440, "Ex4"),
        ]);
        let graph = RateGraph::build(&records);
        let detector = CycleDetector::new(&graph);
        let cycles = detector.search(&token_id("A"));

        assert_eq!(cycles.len(), 1);
        assert!(detector.profit(&cycles[0]).unwrap() > 0.0);
    }

    #[test]
    fn test_unknown_anchor_finds_nothing() {
        let records = quoted_records(&[
            ("Pool1", "A", "B", 1.1, 100, 110, "Ex1"),
            ("Pool2", "B", "C", 1.1, 200, 220, "Ex1"),
            ("Pool3", "C", "A", 0.9, 300, 270, "Ex1"),
        ]);
        let graph = RateGraph::build(&records);
        assert!(CycleDetector::new(&graph).search(&token_id("Z")).is_empty());
    }

    #[test]
    fn test_negative_cycle_unreachable_from_anchor() {
        // A-B is a fair market; the profitable loop lives on C-D-E only
        let records = quoted_records(&[
            ("Pool1", "A", "B", 1.0, 100, 100, "Ex1"),
            ("Pool2", "C", "D", 1.1, 100, 110, "Ex1"),
            ("Pool3", "D", "E", 1.1, 100, 110, "Ex1"),
            ("Pool4", "E", "C", 0.9, 100, 90, "Ex1"),
        ]);
        let graph = RateGraph::build(&records);
        let detector = CycleDetector::new(&graph);

        assert!(detector.has_any_negative_cycle());
        assert!(detector.search(&token_id("A")).is_empty());
    }

    #[test]
    fn test_profit_of_unknown_hop_is_an_error() {
        let records = quoted_records(&[("Pool1", "A", "B", 1.1, 100, 110, "Ex1")]);
        let graph = RateGraph::build(&records);
        let bogus = cycle(&[("A", "B", "Pool9"), ("B", "A", "Pool1")]);
        assert!(CycleDetector::new(&graph).profit(&bogus).is_err());
    }
}

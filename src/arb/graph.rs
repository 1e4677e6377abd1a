//! Directed multigraph of log prices built from the pool table.
//!
//! Every pool with liquidity contributes two edges between its tokens, one per swap
//! direction, weighted so that a closed walk whose weights sum below zero is a round
//! trip that ends with more than it started with.
//!
//! The graph is a disposable view: it is rebuilt from the store on every detection
//! pass and never mutated afterwards.

use std::collections::HashMap;
use std::fmt::{self, Debug};

use alloy::primitives::U256;

use super::pool::PoolRecord;
use super::types::{Exchange, PoolId, TokenId};

/// Position of a token in the node arena
pub type NodeIndex = usize;

/// Position of an edge in the edge arena
pub type EdgeIndex = usize;

/// One swap direction of a pool
#[derive(Clone, PartialEq)]
pub struct Edge {
    /// Token paid into the pool
    pub from: TokenId,
    /// Token received from the pool
    pub to: TokenId,
    /// Pool the swap goes through
    pub pool: PoolId,
    /// `ln(quote)` for token_a -> token_b, `-ln(quote)` for the opposite direction
    pub weight: f64,
    /// Reserve of `from`
    pub reserve_in: U256,
    /// Reserve of `to`
    pub reserve_out: U256,
    /// Exchange of the pool
    pub exchange: Exchange,
}

impl Debug for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Edge({} -> {} via {}, {} / {} @ {})",
            self.from, self.to, self.pool, self.reserve_in, self.reserve_out, self.weight
        )
    }
}

/// Edge list with adjacency by source node.
///
/// Iteration order is deterministic: source nodes in first-seen order, then
/// destinations in first-seen order per source, then parallel edges in insertion
/// order. The cycle search walks edges in exactly this order.
#[derive(Debug, Default, Clone)]
pub struct RateGraph {
    /// Tokens in first-seen order
    nodes: Vec<TokenId>,
    /// Token to node position
    node_index: HashMap<TokenId, NodeIndex>,
    /// Edge arena
    edges: Vec<Edge>,
    /// Per node: outgoing edges grouped by destination
    adjacency: Vec<Vec<(NodeIndex, Vec<EdgeIndex>)>>,
    /// `(from, to, pool)` to edge position
    edge_index: HashMap<(NodeIndex, NodeIndex, PoolId), EdgeIndex>,
}

impl RateGraph {
    /// Builds the graph from pool records. Pools without liquidity contribute nothing.
    #[must_use]
    pub fn build<'a>(records: impl IntoIterator<Item = &'a PoolRecord>) -> Self {
        let mut graph = Self::default();
        for record in records {
            if !record.has_liquidity() {
                continue;
            }
            let weight = record.quote.ln();
            graph.add_edge(Edge {
                from: record.token_b,
                to: record.token_a,
                pool: record.id,
                weight: -weight,
                reserve_in: record.reserve_b,
                reserve_out: record.reserve_a,
                exchange: record.exchange.clone(),
            });
            graph.add_edge(Edge {
                from: record.token_a,
                to: record.token_b,
                pool: record.id,
                weight,
                reserve_in: record.reserve_a,
                reserve_out: record.reserve_b,
                exchange: record.exchange.clone(),
            });
        }
        graph
    }

    /// Adds an edge, replacing any edge with the same `(from, to, pool)`
    fn add_edge(&mut self, edge: Edge) {
        let from = self.add_node(edge.from);
        let to = self.add_node(edge.to);
        let key = (from, to, edge.pool);

        if let Some(&existing) = self.edge_index.get(&key) {
            self.edges[existing] = edge;
            return;
        }

        let position = self.edges.len();
        self.edges.push(edge);
        self.edge_index.insert(key, position);

        let outgoing = &mut self.adjacency[from];
        match outgoing.iter_mut().find(|(destination, _)| *destination == to) {
            Some((_, parallel)) => parallel.push(position),
            None => outgoing.push((to, vec![position])),
        }
    }

    /// Returns the node for `token`, creating it on first sight
    fn add_node(&mut self, token: TokenId) -> NodeIndex {
        if let Some(&index) = self.node_index.get(&token) {
            return index;
        }
        let index = self.nodes.len();
        self.nodes.push(token);
        self.node_index.insert(token, index);
        self.adjacency.push(Vec::new());
        index
    }

    /// Number of tokens
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Token at a node position
    #[must_use]
    pub fn token(&self, node: NodeIndex) -> TokenId {
        self.nodes[node]
    }

    /// Node position of a token, if the token has any edge
    #[must_use]
    pub fn node(&self, token: &TokenId) -> Option<NodeIndex> {
        self.node_index.get(token).copied()
    }

    /// Edges in iteration order together with their endpoints' node positions
    pub fn indexed_edges(&self) -> impl Iterator<Item = (NodeIndex, NodeIndex, &Edge)> + '_ {
        self.adjacency
            .iter()
            .enumerate()
            .flat_map(move |(from, outgoing)| {
                outgoing.iter().flat_map(move |(to, parallel)| {
                    parallel
                        .iter()
                        .map(move |&position| (from, *to, &self.edges[position]))
                })
            })
    }

    /// Edges in iteration order
    pub fn edges(&self) -> impl Iterator<Item = &Edge> + '_ {
        self.indexed_edges().map(|(_, _, edge)| edge)
    }

    /// The edge from `from` to `to` through `pool`
    #[must_use]
    pub fn edge(&self, from: &TokenId, to: &TokenId, pool: &PoolId) -> Option<&Edge> {
        let from = self.node(from)?;
        let to = self.node(to)?;
        self.edge_index
            .get(&(from, to, *pool))
            .map(|&position| &self.edges[position])
    }

    /// Whether any pool swaps `from` into `to`
    #[must_use]
    pub fn has_edge(&self, from: &TokenId, to: &TokenId) -> bool {
        let (Some(from), Some(to)) = (self.node(from), self.node(to)) else {
            return false;
        };
        self.adjacency[from]
            .iter()
            .any(|(destination, _)| *destination == to)
    }
}

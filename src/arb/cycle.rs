/// Cycle is a Vec<Hop> that forms a closed walk (the first hop starts where the last one ends).
/// It is produced by the cycle detector and read by the sizing engine and the arb log.
use std::fmt::{self, Debug, Display};

use eyre::{bail, Result};
use serde::Serialize;

use super::types::{PoolId, TokenId};

/// One swap of a cycle: pay `from` into `pool`, receive `to`
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Hop {
    /// Token paid in
    pub from: TokenId,
    /// Token received
    pub to: TokenId,
    /// Pool swapped through
    pub pool: PoolId,
}

impl Hop {
    /// Creates a hop
    #[must_use]
    pub const fn new(from: TokenId, to: TokenId, pool: PoolId) -> Self {
        Self { from, to, pool }
    }
}

impl Debug for Hop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.from, self.to, self.pool)
    }
}

/// A closed walk through the rate graph
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Cycle {
    /// Hops in trading order
    hops: Vec<Hop>,
}

impl Debug for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cycle({})",
            self.hops
                .iter()
                .map(|hop| format!("{hop:?}"))
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tokens = self
            .path()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" -> ");
        write!(f, "{tokens}")
    }
}

impl Cycle {
    /// Creates a cycle from hops in trading order.
    ///
    /// # Errors
    /// * If there are no hops
    /// * If a hop does not start where the previous one ended, or the walk does not close
    pub fn new(hops: Vec<Hop>) -> Result<Self> {
        if hops.is_empty() {
            bail!("Cycle must have at least 1 hop");
        }
        for i in 0..hops.len() {
            let next = (i + 1) % hops.len();
            if hops[i].to != hops[next].from {
                bail!(
                    "Hop {} ends at {} but hop {} starts at {}",
                    i,
                    hops[i].to,
                    next,
                    hops[next].from
                );
            }
        }
        Ok(Self { hops })
    }

    /// Hops in trading order
    #[must_use]
    pub fn hops(&self) -> &[Hop] {
        &self.hops
    }

    /// Number of hops
    #[must_use]
    pub fn len(&self) -> usize {
        self.hops.len()
    }

    /// Always false, a cycle has at least one hop
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }

    /// Token the cycle starts and ends with
    #[must_use]
    pub fn start(&self) -> TokenId {
        self.hops[0].from
    }

    /// Pools in trading order
    #[must_use]
    pub fn pools(&self) -> Vec<PoolId> {
        self.hops.iter().map(|hop| hop.pool).collect()
    }

    /// Tokens visited, starting and ending with [`Cycle::start`]
    #[must_use]
    pub fn path(&self) -> Vec<TokenId> {
        std::iter::once(self.start())
            .chain(self.hops.iter().map(|hop| hop.to))
            .collect()
    }
}

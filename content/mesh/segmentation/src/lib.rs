//! Bounded size segmentation for the mesh lod graph.
//!
//! Both the triangle to cluster pass and the cluster to group pass are the same problem: merge
//! items of an adjacency graph greedily, strongest connection first, while no part exceeds a size
//! limit. [`greedy_merge`] solves that problem once, [`build_clusters`] and
//! [`build_cluster_groups`] feed it their respective graphs.

use std::collections::BTreeMap;

use fast_hash_collection::*;

mod union_find;
pub use union_find::*;
mod greedy;
pub use greedy::*;
mod triangle;
pub use triangle::*;
mod group;
pub use group::*;

/// Shared edge count keyed by the neighbor part index.
pub type AdjacencyWeights = BTreeMap<u32, u32>;

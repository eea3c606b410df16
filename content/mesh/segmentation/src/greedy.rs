use std::{cmp::Ordering, collections::BinaryHeap};

use crate::*;

/// Undirected weighted graph to be partitioned by [`greedy_merge`].
#[derive(Clone, Debug, Default)]
pub struct MergeGraph {
  /// contribution of each item to the size of the part containing it
  pub item_sizes: Vec<u32>,
  /// `(a, b, weight)`, repeated pairs accumulate, self loops are ignored
  pub edges: Vec<(u32, u32, u32)>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergedPart {
  /// ascending item ids
  pub items: Vec<u32>,
  pub size: u32,
  /// accumulated edge weight to other parts, keyed by part index in the result
  pub adjacency: AdjacencyWeights,
}

/// A queued proposal to merge the parts rooted at `a` and `b`, with `a < b`.
///
/// Candidates are never updated in place. When a merge changes the weight between two parts a
/// new candidate is pushed and the old one is left in the queue; it is recognized as stale when
/// popped because its recorded weight no longer matches the live weight, or because one of its
/// ends is no longer a root.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct MergeCandidate {
  weight: u32,
  a: u32,
  b: u32,
}

impl MergeCandidate {
  fn new(x: u32, y: u32, weight: u32) -> Self {
    Self {
      weight,
      a: x.min(y),
      b: x.max(y),
    }
  }
}

impl Ord for MergeCandidate {
  // max heap: heavier first, then the smallest ids first
  fn cmp(&self, other: &Self) -> Ordering {
    self
      .weight
      .cmp(&other.weight)
      .then_with(|| other.a.cmp(&self.a))
      .then_with(|| other.b.cmp(&self.b))
  }
}

impl PartialOrd for MergeCandidate {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

/// All mutable state of one merge run. Only the entries of root items are meaningful.
struct MergeContext {
  sets: DisjointSet,
  sizes: Vec<u32>,
  members: Vec<Vec<u32>>,
  adjacency: Vec<FastHashMap<u32, u32>>,
  queue: BinaryHeap<MergeCandidate>,
  size_limit: u32,
}

impl MergeContext {
  fn new(graph: MergeGraph, size_limit: u32) -> Self {
    let count = graph.item_sizes.len();
    let mut adjacency: Vec<FastHashMap<u32, u32>> = vec![FastHashMap::default(); count];

    for (a, b, weight) in graph.edges {
      if a == b || weight == 0 {
        continue;
      }
      *adjacency[a as usize].entry(b).or_insert(0) += weight;
      *adjacency[b as usize].entry(a).or_insert(0) += weight;
    }

    let mut queue = BinaryHeap::new();
    for (a, neighbors) in adjacency.iter().enumerate() {
      let a = a as u32;
      for (&b, &weight) in neighbors {
        if a < b {
          queue.push(MergeCandidate::new(a, b, weight));
        }
      }
    }

    Self {
      sets: DisjointSet::new(count),
      sizes: graph.item_sizes,
      members: (0..count as u32).map(|i| vec![i]).collect(),
      adjacency,
      queue,
      size_limit,
    }
  }

  fn is_live(&mut self, candidate: &MergeCandidate) -> bool {
    self.sets.is_root(candidate.a)
      && self.sets.is_root(candidate.b)
      && self.adjacency[candidate.a as usize].get(&candidate.b) == Some(&candidate.weight)
  }

  fn fits(&self, candidate: &MergeCandidate) -> bool {
    self.sizes[candidate.a as usize] + self.sizes[candidate.b as usize] <= self.size_limit
  }

  fn merge(&mut self, candidate: MergeCandidate) {
    let MergeCandidate { a, b, .. } = candidate;
    // move the smaller part into the bigger one
    let (survivor, absorbed) = if self.sizes[b as usize] > self.sizes[a as usize] {
      (b, a)
    } else {
      (a, b)
    };

    self.sets.union(survivor, absorbed);
    self.sizes[survivor as usize] += self.sizes[absorbed as usize];
    self.sizes[absorbed as usize] = 0;

    let moved = std::mem::take(&mut self.members[absorbed as usize]);
    self.members[survivor as usize].extend(moved);

    let absorbed_neighbors = std::mem::take(&mut self.adjacency[absorbed as usize]);
    self.adjacency[survivor as usize].remove(&absorbed);

    let mut touched: Vec<u32> = Vec::with_capacity(absorbed_neighbors.len());
    for (neighbor, weight) in absorbed_neighbors {
      if neighbor == survivor {
        continue;
      }
      let neighbor_adjacency = &mut self.adjacency[neighbor as usize];
      neighbor_adjacency.remove(&absorbed);
      *neighbor_adjacency.entry(survivor).or_insert(0) += weight;
      *self.adjacency[survivor as usize]
        .entry(neighbor)
        .or_insert(0) += weight;
      touched.push(neighbor);
    }

    touched.sort_unstable();
    for neighbor in touched {
      let weight = self.adjacency[survivor as usize][&neighbor];
      self.queue.push(MergeCandidate::new(survivor, neighbor, weight));
    }
  }

  fn finish(mut self) -> Vec<MergedPart> {
    let count = self.sizes.len() as u32;
    let roots: Vec<u32> = (0..count).filter(|&i| self.sets.is_root(i)).collect();

    let mut part_of_root = vec![u32::MAX; count as usize];
    for (part, root) in roots.iter().enumerate() {
      part_of_root[*root as usize] = part as u32;
    }

    roots
      .into_iter()
      .map(|root| {
        let mut items = std::mem::take(&mut self.members[root as usize]);
        items.sort_unstable();
        let adjacency = self.adjacency[root as usize]
          .iter()
          .map(|(neighbor, weight)| (part_of_root[*neighbor as usize], *weight))
          .collect();
        MergedPart {
          items,
          size: self.sizes[root as usize],
          adjacency,
        }
      })
      .collect()
  }
}

/// Greedily merge adjacent items, the heaviest connection first, without letting any part grow
/// above `size_limit`.
///
/// The result is deterministic for a given graph: candidate order is total, and parts are
/// reported in ascending order of their root item.
pub fn greedy_merge(graph: MergeGraph, size_limit: u32) -> Vec<MergedPart> {
  let mut cx = MergeContext::new(graph, size_limit);

  let mut stale = 0_usize;
  let mut rejected = 0_usize;
  while let Some(candidate) = cx.queue.pop() {
    if !cx.is_live(&candidate) {
      stale += 1;
      continue;
    }
    if !cx.fits(&candidate) {
      rejected += 1;
      continue;
    }
    cx.merge(candidate);
  }

  let parts = cx.finish();
  log::trace!(
    "greedy merge: {} parts, {stale} stale candidates, {rejected} over limit",
    parts.len()
  );
  parts
}

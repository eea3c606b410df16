/// Disjoint set over `0..len` items.
///
/// `find` is iterative with full path compression, so long merge chains on big meshes do not
/// translate into deep recursion.
#[derive(Clone, Debug)]
pub struct DisjointSet {
  parent: Vec<u32>,
}

impl DisjointSet {
  pub fn new(len: usize) -> Self {
    Self {
      parent: (0..len as u32).collect(),
    }
  }

  pub fn len(&self) -> usize {
    self.parent.len()
  }

  pub fn is_empty(&self) -> bool {
    self.parent.is_empty()
  }

  pub fn find(&mut self, item: u32) -> u32 {
    let mut root = item;
    while self.parent[root as usize] != root {
      root = self.parent[root as usize];
    }

    let mut cursor = item;
    while self.parent[cursor as usize] != root {
      let next = self.parent[cursor as usize];
      self.parent[cursor as usize] = root;
      cursor = next;
    }

    root
  }

  pub fn is_root(&mut self, item: u32) -> bool {
    self.find(item) == item
  }

  /// attach `absorbed`'s set under `survivor`'s root, return the root of the merged set
  pub fn union(&mut self, survivor: u32, absorbed: u32) -> u32 {
    let survivor = self.find(survivor);
    let absorbed = self.find(absorbed);
    if survivor != absorbed {
      self.parent[absorbed as usize] = survivor;
    }
    survivor
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn long_chain_is_flattened() {
    let count = 200_000;
    let mut set = DisjointSet::new(count);
    // worst case chain: i + 1 -> i
    for i in (0..count as u32 - 1).rev() {
      set.union(i, i + 1);
    }

    let root = 0;
    assert_eq!(set.find(count as u32 - 1), root);
    // after compression every visited node points to the root directly
    assert!((0..count as u32).all(|i| set.parent[i as usize] == root));
  }

  #[test]
  fn union_keeps_survivor_root() {
    let mut set = DisjointSet::new(4);
    assert_eq!(set.union(2, 3), 2);
    assert_eq!(set.union(0, 3), 0);
    assert!(set.is_root(0));
    assert!(!set.is_root(2));
    assert_eq!(set.find(3), 0);
    assert!(set.is_root(1));
  }
}

//! Edge collapse simplification driven by quadric error metrics.
//!
//! The simplifier accepts a per vertex lock mask. Locked vertices never move and never disappear,
//! which is what keeps the border between independently simplified pieces of a mesh watertight.

use std::{
  cmp::Ordering,
  collections::BinaryHeap,
  ops::{Add, AddAssign},
};

use fast_hash_collection::*;
use glam::{Mat3, Vec3};
use serde::{Deserialize, Serialize};

mod qem;
pub use qem::*;
mod remap;
pub use remap::*;
mod edge_collapse;
pub use edge_collapse::*;

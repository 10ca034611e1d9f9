//! Loose octree over irradiance records.
//!
//! A record is stored in the first cell on its descent path whose side is no
//! larger than `4 r` (or no larger than [`MIN_SIDE_LENGTH`]). Hence every
//! record below the root has `r < side / 2` and can only influence queries
//! within a bounded margin around its cell, which is what lookups prune on.

use lumi_math::{Aabb, Vec3};

/// Cells are never subdivided below this side length.
pub const MIN_SIDE_LENGTH: f32 = 0.1;

/// Slack added to the pruning margin so boundary queries are not lost to rounding.
const MARGIN_EPSILON: f32 = 1e-4;

#[derive(Debug, Clone)]
pub struct OctreeNode {
    pub center: Vec3,
    pub side_length: f32,
    pub children: [Option<u32>; 8],
    /// Indices into the cache's record store
    pub records: Vec<u32>,
}

impl OctreeNode {
    fn new(center: Vec3, side_length: f32) -> Self {
        Self {
            center,
            side_length,
            children: [None; 8],
            records: Vec::new(),
        }
    }

    fn contains(&self, p: Vec3) -> bool {
        ((p - self.center).abs().max_element()) <= self.side_length * 0.5
    }

    /// Child slot of `p`, one bit per axis (bit 0 = X, 1 = Y, 2 = Z).
    fn octant(&self, p: Vec3) -> usize {
        (p.x >= self.center.x) as usize
            | ((p.y >= self.center.y) as usize) << 1
            | ((p.z >= self.center.z) as usize) << 2
    }

    fn child_center(&self, octant: usize) -> Vec3 {
        let quarter = self.side_length * 0.25;
        let sign = |bit: usize| if octant & bit != 0 { quarter } else { -quarter };
        self.center + Vec3::new(sign(1), sign(2), sign(4))
    }
}

/// Node arena; index 0 is the root.
#[derive(Debug, Clone)]
pub struct Octree {
    nodes: Vec<OctreeNode>,
}

impl Octree {
    /// Root cube enclosing `bounds` (slightly enlarged). An empty box gives a
    /// unit cube at the origin.
    pub fn new(bounds: &Aabb) -> Self {
        let (center, side) = if bounds.is_empty() {
            (Vec3::ZERO, 1.0)
        } else {
            (bounds.centroid(), (bounds.max_extent() * 1.01).max(MIN_SIDE_LENGTH))
        };
        Self {
            nodes: vec![OctreeNode::new(center, side)],
        }
    }

    pub fn root(&self) -> &OctreeNode {
        &self.nodes[0]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> &[OctreeNode] {
        &self.nodes
    }

    /// File record `index` located at `position` with validity radius `r`.
    ///
    /// Records outside the root cube stay in the root, which lookups always scan.
    pub fn insert(&mut self, index: u32, position: Vec3, r: f32) {
        let mut node_id = 0usize;
        if !self.nodes[0].contains(position) {
            self.nodes[0].records.push(index);
            return;
        }

        loop {
            let node = &self.nodes[node_id];
            let side = node.side_length;
            if side <= MIN_SIDE_LENGTH || side <= 4.0 * r {
                break;
            }

            let octant = node.octant(position);
            let existing = node.children[octant];
            let child_center = node.child_center(octant);
            node_id = match existing {
                Some(child) => child as usize,
                None => {
                    let child = OctreeNode::new(child_center, side * 0.5);
                    let child_id = self.nodes.len();
                    self.nodes.push(child);
                    self.nodes[node_id].children[octant] = Some(child_id as u32);
                    child_id
                }
            };
        }

        self.nodes[node_id].records.push(index);
    }

    /// Call `visit` with every record index that can have a positive weight
    /// at `point` for the given error threshold.
    ///
    /// A record's weight vanishes beyond `r * error_threshold / 2`; with
    /// `r < side / 2` that bounds its reach to `side * error_threshold / 4`
    /// outside its cell.
    pub fn for_each_candidate<F>(&self, point: Vec3, error_threshold: f32, mut visit: F)
    where
        F: FnMut(u32),
    {
        let reach_factor = 0.5 + error_threshold.max(0.0) * 0.25;
        let root = &self.nodes[0];
        root.records.iter().copied().for_each(&mut visit);

        let mut stack: Vec<u32> = root.children.iter().flatten().copied().collect();
        while let Some(node_id) = stack.pop() {
            let node = &self.nodes[node_id as usize];
            let margin = node.side_length * reach_factor + MARGIN_EPSILON;
            if (point - node.center).abs().max_element() > margin {
                continue;
            }
            node.records.iter().copied().for_each(&mut visit);
            stack.extend(node.children.iter().flatten().copied());
        }
    }
}

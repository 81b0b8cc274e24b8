//! 2-D spatial index over loaded column keys, for region queries.

use crate::column::ColumnKey;

const MAX_OBJECTS: usize = 8;
const MAX_LEVELS: i32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aabb2d {
    pub x_min: i64,
    pub z_min: i64,
    pub x_max: i64,
    pub z_max: i64,
}

impl Aabb2d {
    pub fn new(x_min: i64, z_min: i64, x_max: i64, z_max: i64) -> Self {
        Aabb2d { x_min, z_min, x_max, z_max }
    }

    pub fn contains(&self, x: i64, z: i64) -> bool {
        x >= self.x_min && x <= self.x_max && z >= self.z_min && z <= self.z_max
    }

    pub fn intersects(&self, other: &Aabb2d) -> bool {
        !(self.x_max < other.x_min || self.x_min > other.x_max || self.z_max < other.z_min || self.z_min > other.z_max)
    }
}

struct Node {
    bounds: Aabb2d,
    level: i32,
    entries: Vec<ColumnKey>,
    children: Option<Box<[Node; 4]>>,
}

impl Node {
    fn new(bounds: Aabb2d, level: i32) -> Self {
        Node { bounds, level, entries: Vec::new(), children: None }
    }

    fn subdivide(&mut self) {
        let mid_x = (self.bounds.x_min + self.bounds.x_max) / 2;
        let mid_z = (self.bounds.z_min + self.bounds.z_max) / 2;
        let b = self.bounds;
        let next = self.level + 1;
        self.children = Some(Box::new([
            Node::new(Aabb2d::new(b.x_min, b.z_min, mid_x, mid_z), next),
            Node::new(Aabb2d::new(mid_x + 1, b.z_min, b.x_max, mid_z), next),
            Node::new(Aabb2d::new(b.x_min, mid_z + 1, mid_x, b.z_max), next),
            Node::new(Aabb2d::new(mid_x + 1, mid_z + 1, b.x_max, b.z_max), next),
        ]));
    }

    fn insert(&mut self, key: ColumnKey) {
        if let Some(children) = &mut self.children {
            for child in children.iter_mut() {
                if child.bounds.contains(key.x, key.z) {
                    child.insert(key);
                    return;
                }
            }
        }
        self.entries.push(key);
        if self.children.is_none() && self.entries.len() > MAX_OBJECTS && self.level < MAX_LEVELS {
            self.subdivide();
            let entries = std::mem::take(&mut self.entries);
            for entry in entries {
                self.insert(entry);
            }
        }
    }

    fn remove(&mut self, key: ColumnKey) -> bool {
        if let Some(pos) = self.entries.iter().position(|k| *k == key) {
            self.entries.remove(pos);
            return true;
        }
        if let Some(children) = &mut self.children {
            for child in children.iter_mut() {
                if child.bounds.contains(key.x, key.z) && child.remove(key) {
                    return true;
                }
            }
        }
        false
    }

    fn query_region(&self, region: &Aabb2d, out: &mut Vec<ColumnKey>) {
        if !self.bounds.intersects(region) {
            return;
        }
        for key in &self.entries {
            if region.contains(key.x, key.z) {
                out.push(*key);
            }
        }
        if let Some(children) = &self.children {
            for child in children.iter() {
                child.query_region(region, out);
            }
        }
    }
}

/// Region index over loaded column keys. Entries and the column map a
/// [`crate::world::WorldManager`] owns must always agree on membership.
pub struct Quadtree {
    root: Node,
}

impl Quadtree {
    pub fn new(world_bounds: Aabb2d) -> Self {
        Quadtree { root: Node::new(world_bounds, 0) }
    }

    pub fn insert(&mut self, key: ColumnKey) {
        self.root.insert(key);
    }

    pub fn remove(&mut self, key: ColumnKey) -> bool {
        self.root.remove(key)
    }

    pub fn query_region(&self, region: Aabb2d) -> Vec<ColumnKey> {
        let mut out = Vec::new();
        self.root.query_region(&region, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn big_bounds() -> Aabb2d {
        Aabb2d::new(-1_000_000, -1_000_000, 1_000_000, 1_000_000)
    }

    #[test]
    fn insert_then_query_finds_key() {
        let mut qt = Quadtree::new(big_bounds());
        let key = ColumnKey::new(32, 64);
        qt.insert(key);
        let found = qt.query_region(Aabb2d::new(0, 0, 100, 100));
        assert!(found.contains(&key));
    }

    #[test]
    fn query_outside_region_excludes_key() {
        let mut qt = Quadtree::new(big_bounds());
        qt.insert(ColumnKey::new(5000, 5000));
        let found = qt.query_region(Aabb2d::new(0, 0, 100, 100));
        assert!(found.is_empty());
    }

    #[test]
    fn remove_drops_key_from_future_queries() {
        let mut qt = Quadtree::new(big_bounds());
        let key = ColumnKey::new(10, 10);
        qt.insert(key);
        assert!(qt.remove(key));
        let found = qt.query_region(Aabb2d::new(0, 0, 100, 100));
        assert!(!found.contains(&key));
    }

    #[test]
    fn subdivides_past_max_objects_and_still_finds_all() {
        let mut qt = Quadtree::new(big_bounds());
        let mut keys = Vec::new();
        for i in 0..64 {
            let key = ColumnKey::new(i * 32, i * 32);
            keys.push(key);
            qt.insert(key);
        }
        let found = qt.query_region(Aabb2d::new(0, 0, 64 * 32, 64 * 32));
        for key in keys {
            assert!(found.contains(&key));
        }
    }
}

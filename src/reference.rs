///
/// Pure-Rust oracle of the Karras algorithm, Morton encoding and AABB
/// union, built the way the teacher's `data_structures/hlbvh.rs` keeps a
/// CPU implementation alongside the GPU-facing one — except this oracle
/// targets the Karras radix-tree construction §4.4 mandates rather than
/// PBR-book treelets, since that is the algorithm the device kernels
/// must match. Used by property tests in `validator.rs` and by
/// `builder.rs`'s own tests; never runs on the hot path.

use crate::data_structures::bbox::Bbox;
use crate::data_structures::morton::morton_code_for_unit_centroid;
use crate::data_structures::primitive::INVALID_INDEX;
use crate::data_structures::vector::{Vec3, Vec3f32};

#[derive(Debug, Clone, Copy)]
pub struct ReferenceNode {
    pub left_child: u32,
    pub right_child: u32,
    pub aabb_min: Vec3f32,
    pub aabb_max: Vec3f32,
}

/// A fully built reference BVH: `2N - 1` nodes, internal nodes in
/// `[0, N-1)`, leaves in `[N-1, 2N-1)`, matching §3's layout exactly.
#[derive(Debug, Clone)]
pub struct ReferenceBvh {
    pub nodes: Vec<ReferenceNode>,
    pub parents: Vec<u32>,
    /// `sorted_indices[i]` is the original (pre-sort) primitive index now
    /// occupying sorted slot `i`.
    pub sorted_indices: Vec<u32>,
    pub primitive_count: u32,
}

fn leaf_index(primitive_count: u32, local: u32) -> u32 {
    primitive_count - 1 + local
}

/// Common-prefix length of `morton[a]` and `morton[b]`, tie-broken on
/// index, matching `delta()` in `hierarchy_build.wgsl` bit for bit.
fn delta(morton: &[u32], a: i64, b: i64) -> i64 {
    let n = morton.len() as i64;
    if b < 0 || b >= n {
        return -1;
    }
    let ka = morton[a as usize];
    let kb = morton[b as usize];
    if ka == kb {
        return 32 + (a as u32 ^ b as u32).leading_zeros() as i64;
    }
    (ka ^ kb).leading_zeros() as i64
}

fn union(a_min: Vec3f32, a_max: Vec3f32, b_min: Vec3f32, b_max: Vec3f32) -> (Vec3f32, Vec3f32) {
    let min = Vec3::<f32>(a_min.0.min(b_min.0), a_min.1.min(b_min.1), a_min.2.min(b_min.2));
    let max = Vec3::<f32>(a_max.0.max(b_max.0), a_max.1.max(b_max.1), a_max.2.max(b_max.2));
    (min, max)
}

/// Builds the reference BVH over `centroids`/`bboxes` (co-indexed,
/// object-space), normalised into `scene_bounds` for Morton
/// quantisation, exactly as the primitive-build kernel does.
pub fn build_reference(
    centroids: &[Vec3f32],
    bboxes: &[(Vec3f32, Vec3f32)],
    scene_bounds: Bbox,
) -> ReferenceBvh {
    let n = centroids.len() as u32;
    if n == 0 {
        return ReferenceBvh {
            nodes: Vec::new(),
            parents: Vec::new(),
            sorted_indices: Vec::new(),
            primitive_count: 0,
        };
    }

    let extent = Vec3::<f32>(
        (scene_bounds.max.0 - scene_bounds.min.0).max(1e-6),
        (scene_bounds.max.1 - scene_bounds.min.1).max(1e-6),
        (scene_bounds.max.2 - scene_bounds.min.2).max(1e-6),
    );

    let mut order: Vec<u32> = (0..n).collect();
    let mortons: Vec<u32> = centroids
        .iter()
        .map(|c| {
            let unit = Vec3::<f32>(
                (c.0 - scene_bounds.min.0) / extent.0,
                (c.1 - scene_bounds.min.1) / extent.1,
                (c.2 - scene_bounds.min.2) / extent.2,
            );
            morton_code_for_unit_centroid(unit)
        })
        .collect();
    order.sort_by(|&a, &b| mortons[a as usize].cmp(&mortons[b as usize]).then(a.cmp(&b)));

    // `delta`'s index tie-break assumes index order reflects sort order,
    // so it runs against positions in `order`, not original indices.
    let sorted_morton_by_position: Vec<u32> = order.iter().map(|&i| mortons[i as usize]).collect();

    let total_nodes = (2 * n - 1) as usize;
    let mut nodes = vec![
        ReferenceNode {
            left_child: 0,
            right_child: 0,
            aabb_min: Vec3::<f32>(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            aabb_max: Vec3::<f32>(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        };
        total_nodes
    ];
    let mut parents = vec![INVALID_INDEX; total_nodes];

    for local in 0..n {
        let original = order[local as usize];
        let (lo, hi) = bboxes[original as usize];
        nodes[leaf_index(n, local) as usize] = ReferenceNode {
            left_child: 0,
            right_child: 0,
            aabb_min: lo,
            aabb_max: hi,
        };
    }

    if n == 1 {
        parents[leaf_index(n, 0) as usize] = INVALID_INDEX;
        return ReferenceBvh {
            nodes,
            parents,
            sorted_indices: order,
            primitive_count: n,
        };
    }

    for i in 0..(n - 1) {
        let ii = i as i64;
        let d_plus = delta(&sorted_morton_by_position, ii, ii + 1);
        let d_minus = delta(&sorted_morton_by_position, ii, ii - 1);
        let d: i64 = if d_plus < d_minus { -1 } else { 1 };
        let delta_min = delta(&sorted_morton_by_position, ii, ii - d);

        let mut l_max: i64 = 2;
        while delta(&sorted_morton_by_position, ii, ii + l_max * d) > delta_min {
            l_max *= 2;
        }

        let mut l: i64 = 0;
        let mut t = l_max / 2;
        while t >= 1 {
            if delta(&sorted_morton_by_position, ii, ii + (l + t) * d) > delta_min {
                l += t;
            }
            t /= 2;
        }
        let j = ii + l * d;

        let delta_node = delta(&sorted_morton_by_position, ii, j);
        let a = ii.min(j);
        let b = ii.max(j);

        let mut s: i64 = 0;
        let mut step = (b - a + 1) / 2;
        loop {
            if step < 1 {
                break;
            }
            let candidate = a + s + step;
            if candidate < b && delta(&sorted_morton_by_position, ii, candidate) > delta_node {
                s += step;
            }
            if step == 1 {
                break;
            }
            step = (step + 1) / 2;
        }
        let gamma = a + s;

        let left_child = if gamma == a {
            leaf_index(n, gamma as u32)
        } else {
            gamma as u32
        };
        let right_child = if gamma + 1 == b {
            leaf_index(n, b as u32)
        } else {
            (gamma + 1) as u32
        };

        nodes[i as usize].left_child = left_child;
        nodes[i as usize].right_child = right_child;
        parents[left_child as usize] = i;
        parents[right_child as usize] = i;
    }
    parents[0] = INVALID_INDEX;

    propagate_aabbs(&mut nodes, n);

    ReferenceBvh {
        nodes,
        parents,
        sorted_indices: order,
        primitive_count: n,
    }
}

/// Bottom-up union, computed directly (no atomic-counter dance needed on
/// the CPU); the device kernel's race-free scheme exists only because
/// many threads share the work this function does sequentially.
fn propagate_aabbs(nodes: &mut [ReferenceNode], n: u32) {
    fn visit(nodes: &mut [ReferenceNode], index: u32, leaf_offset: u32) -> (Vec3f32, Vec3f32) {
        if index >= leaf_offset {
            let node = nodes[index as usize];
            return (node.aabb_min, node.aabb_max);
        }
        let left = nodes[index as usize].left_child;
        let right = nodes[index as usize].right_child;
        let (left_min, left_max) = visit(nodes, left, leaf_offset);
        let (right_min, right_max) = visit(nodes, right, leaf_offset);
        let (min, max) = union(left_min, left_max, right_min, right_max);
        nodes[index as usize].aabb_min = min;
        nodes[index as usize].aabb_max = max;
        (min, max)
    }
    if n >= 2 {
        visit(nodes, 0, n - 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(min: Vec3f32, max: Vec3f32) -> Bbox {
        Bbox { min, max }
    }

    #[test]
    fn single_primitive_is_degenerate_leaf() {
        let centroids = [Vec3::<f32>(0.5, 0.5, 0.0)];
        let bboxes = [(Vec3::<f32>(0.0, 0.0, 0.0), Vec3::<f32>(1.0, 1.0, 0.0))];
        let bounds = bbox(Vec3::<f32>(-1.0, -1.0, -1.0), Vec3::<f32>(2.0, 2.0, 2.0));

        let result = build_reference(&centroids, &bboxes, bounds);
        assert_eq!(result.primitive_count, 1);
        assert_eq!(result.nodes.len(), 1);
        assert_eq!(result.parents[0], INVALID_INDEX);
    }

    #[test]
    fn two_primitives_produce_one_internal_node() {
        let centroids = [Vec3::<f32>(0.0, 0.0, 0.0), Vec3::<f32>(10.0, 10.0, 10.0)];
        let bboxes = [
            (Vec3::<f32>(-0.5, -0.5, -0.5), Vec3::<f32>(0.5, 0.5, 0.5)),
            (Vec3::<f32>(9.5, 9.5, 9.5), Vec3::<f32>(10.5, 10.5, 10.5)),
        ];
        let bounds = bbox(Vec3::<f32>(-1.0, -1.0, -1.0), Vec3::<f32>(11.0, 11.0, 11.0));

        let result = build_reference(&centroids, &bboxes, bounds);
        assert_eq!(result.nodes.len(), 3);
        assert_eq!(result.parents[1], 0);
        assert_eq!(result.parents[2], 0);
        assert!(result.nodes[0].aabb_min.0 <= -0.5 && result.nodes[0].aabb_max.0 >= 10.5);
    }

    #[test]
    fn every_internal_node_aabb_contains_children() {
        let mut centroids = Vec::new();
        let mut bboxes = Vec::new();
        for i in 0..16u32 {
            let c = Vec3::<f32>(i as f32, (i * 3 % 7) as f32, (i * 5 % 11) as f32);
            centroids.push(c);
            bboxes.push((
                Vec3::<f32>(c.0 - 0.1, c.1 - 0.1, c.2 - 0.1),
                Vec3::<f32>(c.0 + 0.1, c.1 + 0.1, c.2 + 0.1),
            ));
        }
        let bounds = bbox(Vec3::<f32>(-1.0, -1.0, -1.0), Vec3::<f32>(20.0, 20.0, 20.0));
        let result = build_reference(&centroids, &bboxes, bounds);

        let leaf_offset = result.primitive_count - 1;
        for i in 0..leaf_offset {
            let node = result.nodes[i as usize];
            let left = result.nodes[node.left_child as usize];
            let right = result.nodes[node.right_child as usize];
            assert!(node.aabb_min.0 <= left.aabb_min.0 && node.aabb_min.0 <= right.aabb_min.0);
            assert!(node.aabb_max.0 >= left.aabb_max.0 && node.aabb_max.0 >= right.aabb_max.0);
        }
    }

    #[test]
    fn duplicate_mortons_still_produce_strict_binary_tree() {
        let centroids: Vec<Vec3f32> = (0..16).map(|_| Vec3::<f32>(0.5, 0.5, 0.5)).collect();
        let bboxes: Vec<(Vec3f32, Vec3f32)> = centroids
            .iter()
            .map(|&c| (c, c))
            .collect();
        let bounds = bbox(Vec3::<f32>(0.0, 0.0, 0.0), Vec3::<f32>(1.0, 1.0, 1.0));

        let result = build_reference(&centroids, &bboxes, bounds);
        assert_eq!(result.nodes.len(), 31);

        let mut visited = vec![false; 16];
        fn walk(nodes: &[ReferenceNode], index: u32, leaf_offset: u32, visited: &mut [bool]) {
            if index >= leaf_offset {
                let local = (index - leaf_offset) as usize;
                assert!(!visited[local], "leaf visited twice");
                visited[local] = true;
                return;
            }
            let node = nodes[index as usize];
            walk(nodes, node.left_child, leaf_offset, visited);
            walk(nodes, node.right_child, leaf_offset, visited);
        }
        walk(&result.nodes, 0, 15, &mut visited);
        assert!(visited.iter().all(|&v| v));
    }

    /// Property test (§8): for arbitrary seeds, an arbitrary scatter of
    /// centroids still yields a tree where every leaf is visited exactly
    /// once and every internal node's AABB contains both children's.
    #[test]
    fn random_scenes_produce_valid_trees_for_any_seed() {
        use rand::{Rng, SeedableRng};
        use rand_pcg::Pcg32;

        for seed in 0..32u64 {
            let mut rng = Pcg32::seed_from_u64(seed);
            let n = rng.gen_range(2..64u32);

            let mut centroids = Vec::with_capacity(n as usize);
            let mut bboxes = Vec::with_capacity(n as usize);
            for _ in 0..n {
                let c = Vec3::<f32>(
                    rng.gen_range(-10.0..10.0),
                    rng.gen_range(-10.0..10.0),
                    rng.gen_range(-10.0..10.0),
                );
                let half = Vec3::<f32>(
                    rng.gen_range(0.01..0.5),
                    rng.gen_range(0.01..0.5),
                    rng.gen_range(0.01..0.5),
                );
                centroids.push(c);
                bboxes.push((
                    Vec3::<f32>(c.0 - half.0, c.1 - half.1, c.2 - half.2),
                    Vec3::<f32>(c.0 + half.0, c.1 + half.1, c.2 + half.2),
                ));
            }
            let bounds = bbox(Vec3::<f32>(-11.0, -11.0, -11.0), Vec3::<f32>(11.0, 11.0, 11.0));
            let result = build_reference(&centroids, &bboxes, bounds);

            assert_eq!(result.nodes.len(), (2 * n - 1) as usize, "seed {seed}");

            let leaf_offset = n - 1;
            let mut visited = vec![false; n as usize];
            fn walk(nodes: &[ReferenceNode], index: u32, leaf_offset: u32, visited: &mut [bool]) {
                if index >= leaf_offset {
                    let local = (index - leaf_offset) as usize;
                    assert!(!visited[local], "leaf visited twice");
                    visited[local] = true;
                    return;
                }
                let node = nodes[index as usize];
                walk(nodes, node.left_child, leaf_offset, visited);
                walk(nodes, node.right_child, leaf_offset, visited);
            }
            walk(&result.nodes, 0, leaf_offset, &mut visited);
            assert!(visited.iter().all(|&v| v), "seed {seed}");

            for i in 0..leaf_offset {
                let node = result.nodes[i as usize];
                let left = result.nodes[node.left_child as usize];
                let right = result.nodes[node.right_child as usize];
                for axis in 0..3 {
                    let (node_min, node_max) = axis_extent(node, axis);
                    let (left_min, left_max) = axis_extent(left, axis);
                    let (right_min, right_max) = axis_extent(right, axis);
                    assert!(node_min <= left_min && node_min <= right_min, "seed {seed}");
                    assert!(node_max >= left_max && node_max >= right_max, "seed {seed}");
                }
            }
        }
    }

    fn axis_extent(node: ReferenceNode, axis: u32) -> (f32, f32) {
        match axis {
            0 => (node.aabb_min.0, node.aabb_max.0),
            1 => (node.aabb_min.1, node.aabb_max.1),
            _ => (node.aabb_min.2, node.aabb_max.2),
        }
    }
}

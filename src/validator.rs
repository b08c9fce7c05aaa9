///
/// Optional debug readback validator (§4.6). Downloads the counter,
/// node and flag buffers after `Build` and checks the three invariants
/// the source's `BVH_VALIDATE` block asserts: every leaf visited exactly
/// once by a depth-first walk from the root, leaves have no children,
/// every flag counter is ≤ 2. Strictly a debug aid, never on the hot
/// path — grounded in `vibe-graph-layout-gpu`'s
/// `read_positions_blocking`'s staging-buffer/`map_async`/`poll(Wait)`
/// readback pattern.

use crate::buffers::BvhBuffers;
use crate::data_structures::primitive::BvhNode;
use crate::error::{BvhError, Result};

fn read_buffer_blocking(device: &wgpu::Device, queue: &wgpu::Queue, source: &wgpu::Buffer, size: u64) -> Vec<u8> {
    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("validator_staging"),
        size,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("validator_readback_encoder"),
    });
    encoder.copy_buffer_to_buffer(source, 0, &staging, 0, size);
    queue.submit(Some(encoder.finish()));

    let slice = staging.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        tx.send(result).unwrap();
    });
    device.poll(wgpu::Maintain::Wait);
    rx.recv().unwrap().expect("failed to map validator staging buffer");

    let data = slice.get_mapped_range().to_vec();
    staging.unmap();
    data
}

/// Depth-first traversal from root; checks each leaf is visited exactly
/// once and has no children, returns the error for the first violation
/// found, if any.
fn validate_traversal(nodes: &[BvhNode], primitive_count: u32) -> Result<()> {
    if primitive_count <= 1 {
        return Ok(());
    }
    let leaf_offset = primitive_count - 1;
    let mut visited = vec![false; primitive_count as usize];

    fn walk(
        nodes: &[BvhNode],
        index: u32,
        leaf_offset: u32,
        visited: &mut [bool],
    ) -> Result<()> {
        if index >= leaf_offset {
            let local = (index - leaf_offset) as usize;
            if visited[local] {
                return Err(BvhError::ValidationFailed(format!(
                    "leaf {local} visited more than once"
                )));
            }
            visited[local] = true;
            let node = nodes[index as usize];
            if node.left_child != 0 || node.right_child != 0 {
                return Err(BvhError::ValidationFailed(format!(
                    "leaf {local} has non-zero children"
                )));
            }
            return Ok(());
        }
        let node = nodes[index as usize];
        walk(nodes, node.left_child, leaf_offset, visited)?;
        walk(nodes, node.right_child, leaf_offset, visited)
    }

    walk(nodes, 0, leaf_offset, &mut visited)?;
    if visited.iter().any(|&v| !v) {
        return Err(BvhError::ValidationFailed("not every leaf was reached from root".into()));
    }
    Ok(())
}

fn validate_flags(flags: &[u32]) -> Result<()> {
    for (node, &value) in flags.iter().enumerate() {
        if value > 2 {
            return Err(BvhError::CounterMismatch {
                node: node as u32,
                value,
            });
        }
    }
    Ok(())
}

/// Downloads `bvhNodeBuffer` and `bvhFlagBuffer` and runs the §4.6 checks.
/// `primitive_count` is the host's own N for this frame (the same value
/// passed to `GpuBvh::build`); `N = 0` and `N = 1` are accepted
/// trivially, matching §8 boundary cases 10-11.
pub fn validate(device: &wgpu::Device, queue: &wgpu::Queue, buffers: &BvhBuffers, primitive_count: u32) -> Result<()> {
    if primitive_count == 0 {
        return Ok(());
    }

    let node_count = (2 * primitive_count - 1) as u64;
    let node_bytes = node_count * std::mem::size_of::<BvhNode>() as u64;
    let node_data = read_buffer_blocking(device, queue, buffers.bvh_node_buffer(), node_bytes);
    let nodes: &[BvhNode] = bytemuck::cast_slice(&node_data);
    validate_traversal(nodes, primitive_count)?;

    if primitive_count > 1 {
        let flag_count = (primitive_count - 1) as u64;
        let flag_bytes = flag_count * std::mem::size_of::<u32>() as u64;
        let flag_data = read_buffer_blocking(device, queue, buffers.bvh_flag_buffer(), flag_bytes);
        let flags: &[u32] = bytemuck::cast_slice(&flag_data);
        validate_flags(flags)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::primitive::INVALID_INDEX;
    use crate::data_structures::vector::{Vec3, Vec3f32};

    fn leaf(min: Vec3f32, max: Vec3f32) -> BvhNode {
        BvhNode::leaf(min, max)
    }

    #[test]
    fn single_leaf_tree_validates() {
        let nodes = vec![leaf(Vec3::<f32>(0.0, 0.0, 0.0), Vec3::<f32>(1.0, 1.0, 1.0))];
        assert!(validate_traversal(&nodes, 1).is_ok());
    }

    #[test]
    fn two_leaf_tree_validates() {
        let nodes = vec![
            BvhNode::internal(1, 2),
            leaf(Vec3::<f32>(0.0, 0.0, 0.0), Vec3::<f32>(1.0, 1.0, 1.0)),
            leaf(Vec3::<f32>(2.0, 2.0, 2.0), Vec3::<f32>(3.0, 3.0, 3.0)),
        ];
        assert!(validate_traversal(&nodes, 2).is_ok());
    }

    #[test]
    fn leaf_with_children_fails() {
        let mut bad_leaf = leaf(Vec3::<f32>(0.0, 0.0, 0.0), Vec3::<f32>(1.0, 1.0, 1.0));
        bad_leaf.left_child = 7;
        let nodes = vec![BvhNode::internal(1, 2), bad_leaf, leaf(Vec3::<f32>(2.0, 2.0, 2.0), Vec3::<f32>(3.0, 3.0, 3.0))];
        assert!(validate_traversal(&nodes, 2).is_err());
    }

    #[test]
    fn flag_above_two_is_rejected() {
        assert!(validate_flags(&[0, 1, 2]).is_ok());
        assert!(validate_flags(&[0, 3]).is_err());
    }

    #[test]
    fn invalid_index_sentinel_never_collides_with_real_index() {
        assert_eq!(INVALID_INDEX, u32::MAX);
    }
}

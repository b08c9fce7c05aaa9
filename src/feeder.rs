///
/// `ScenePrimitiveFeeder`: walks the external scene twice — opaque
/// instances, then hair particles — enumerating primitive spans. Each
/// span becomes one primitive-build dispatch (§2 item 1, §4.2).

use crate::error::BvhError;
use crate::scene::Scene;

/// One (instance_index, subset_index, primitive_count, primitive_offset)
/// record; the per-dispatch uniform payload for one primitive-build
/// dispatch. `is_hair`/`segments_per_strand` select which of the kernel's
/// two geometry-fetch paths (mesh triangle vs hair quad) this span uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimitiveSpan {
    pub instance_index: u32,
    pub subset_index: u32,
    pub primitive_count: u32,
    pub primitive_offset: u32,
    pub is_hair: bool,
    pub segments_per_strand: u32,
}

/// The result of one gather pass: the spans to dispatch, the total
/// primitive count they cover, and any spans dropped because they
/// referenced scene state that did not resolve (§7's recoverable
/// "scene inconsistency" case).
#[derive(Debug, Default)]
pub struct GatherResult {
    pub spans: Vec<PrimitiveSpan>,
    pub primitive_count: u32,
    pub skipped: Vec<BvhError>,
}

pub struct ScenePrimitiveFeeder;

impl ScenePrimitiveFeeder {
    /// Enumerate every span the scene currently contributes. Hair
    /// particles are appended after mesh objects, with instance indices
    /// continuing past `scene.objects.len()`, matching the numbering the
    /// primitive-build shader's instance-table lookup expects.
    pub fn gather(scene: &Scene) -> GatherResult {
        let mut result = GatherResult::default();

        for (instance_index, object) in scene.objects.iter().enumerate() {
            let instance_index = instance_index as u32;
            match object.mesh_id.and_then(|id| scene.mesh(id)) {
                Some(mesh) => {
                    for (subset_index, subset) in mesh.subsets.iter().enumerate() {
                        let primitive_count = subset.index_count / 3;
                        if primitive_count == 0 {
                            continue;
                        }
                        let span = PrimitiveSpan {
                            instance_index,
                            subset_index: subset_index as u32,
                            primitive_count,
                            primitive_offset: result.primitive_count,
                            is_hair: false,
                            segments_per_strand: 0,
                        };
                        result.primitive_count += primitive_count;
                        result.spans.push(span);
                    }
                }
                None => {
                    if object.mesh_id.is_some() {
                        let span = PrimitiveSpan {
                            instance_index,
                            subset_index: 0,
                            primitive_count: 0,
                            primitive_offset: result.primitive_count,
                            is_hair: false,
                            segments_per_strand: 0,
                        };
                        log::warn!("object {instance_index} references an absent mesh, skipping");
                        result.skipped.push(BvhError::SceneInconsistency { span });
                    }
                }
            }
        }

        let hair_instance_base = scene.objects.len() as u32;
        for (hair_index, hair) in scene.hairs.iter().enumerate() {
            let instance_index = hair_instance_base + hair_index as u32;
            if hair.mesh_id.is_none() {
                continue;
            }
            let primitive_count = hair.primitive_count();
            if primitive_count == 0 {
                continue;
            }
            let span = PrimitiveSpan {
                instance_index,
                subset_index: 0,
                primitive_count,
                primitive_offset: result.primitive_count,
                is_hair: true,
                segments_per_strand: hair.segment_count,
            };
            result.primitive_count += primitive_count;
            result.spans.push(span);
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{HairParticle, MeshComponent, MeshId, MeshSubset, ObjectInstance};

    #[test]
    fn empty_scene_has_no_spans() {
        let scene = Scene::new();
        let result = ScenePrimitiveFeeder::gather(&scene);
        assert!(result.spans.is_empty());
        assert_eq!(result.primitive_count, 0);
    }

    #[test]
    fn single_triangle_mesh_yields_one_span() {
        let mut scene = Scene::new();
        scene.insert_mesh(
            MeshId(0),
            MeshComponent {
                subsets: vec![MeshSubset { index_count: 3 }],
            },
        );
        scene.objects.push(ObjectInstance {
            mesh_id: Some(MeshId(0)),
        });

        let result = ScenePrimitiveFeeder::gather(&scene);
        assert_eq!(result.spans.len(), 1);
        assert_eq!(result.primitive_count, 1);
        assert_eq!(result.spans[0].primitive_offset, 0);
        assert!(result.skipped.is_empty());
    }

    #[test]
    fn missing_mesh_reference_is_skipped_not_fatal() {
        let mut scene = Scene::new();
        scene.objects.push(ObjectInstance {
            mesh_id: Some(MeshId(42)),
        });

        let result = ScenePrimitiveFeeder::gather(&scene);
        assert!(result.spans.is_empty());
        assert_eq!(result.primitive_count, 0);
        assert_eq!(result.skipped.len(), 1);
    }

    #[test]
    fn mixed_mesh_and_hair_matches_scenario_e() {
        let mut scene = Scene::new();
        scene.insert_mesh(
            MeshId(0),
            MeshComponent {
                subsets: vec![MeshSubset { index_count: 9 }],
            },
        );
        scene.objects.push(ObjectInstance {
            mesh_id: Some(MeshId(0)),
        });
        scene.hairs.push(HairParticle {
            mesh_id: Some(MeshId(1)),
            strand_count: 2,
            segment_count: 4,
        });

        let result = ScenePrimitiveFeeder::gather(&scene);
        assert_eq!(result.primitive_count, 19);
        assert_eq!(result.spans.len(), 2);
        assert_eq!(result.spans[1].primitive_offset, 3);
        assert_eq!(result.spans[1].primitive_count, 16);
    }

    #[test]
    fn offsets_are_contiguous_across_subsets() {
        let mut scene = Scene::new();
        scene.insert_mesh(
            MeshId(0),
            MeshComponent {
                subsets: vec![
                    MeshSubset { index_count: 6 },
                    MeshSubset { index_count: 12 },
                ],
            },
        );
        scene.objects.push(ObjectInstance {
            mesh_id: Some(MeshId(0)),
        });

        let result = ScenePrimitiveFeeder::gather(&scene);
        assert_eq!(result.spans[0].primitive_offset, 0);
        assert_eq!(result.spans[0].primitive_count, 2);
        assert_eq!(result.spans[1].primitive_offset, 2);
        assert_eq!(result.spans[1].primitive_count, 4);
        assert_eq!(result.primitive_count, 6);
    }
}

///
/// The external scene/component-store contract this core consumes.
/// Ownership lives entirely outside the crate (§1 names the scene store
/// an external collaborator); these types are the minimal read-only
/// shape `ScenePrimitiveFeeder` needs to enumerate primitive spans.

use crate::data_structures::bbox::Bbox;

/// One renderable object: a reference to a mesh plus the instance's
/// transform index into the external instance table.
#[derive(Debug, Clone, Copy)]
pub struct ObjectInstance {
    pub mesh_id: Option<MeshId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshId(pub u32);

/// A contiguous range of indices within a mesh, corresponding to one
/// draw-call-sized grouping of triangles (the original's "subset").
#[derive(Debug, Clone, Copy)]
pub struct MeshSubset {
    pub index_count: u32,
}

#[derive(Debug, Clone)]
pub struct MeshComponent {
    pub subsets: Vec<MeshSubset>,
}

/// A hair-particle system: `strand_count` strands of `segment_count`
/// segments each, each segment contributing two triangles (a ribbon
/// quad), per §2 item 1 and §4.2's hair-indexing rule.
#[derive(Debug, Clone, Copy)]
pub struct HairParticle {
    pub mesh_id: Option<MeshId>,
    pub strand_count: u32,
    pub segment_count: u32,
}

impl HairParticle {
    pub fn primitive_count(&self) -> u32 {
        2 * self.strand_count * self.segment_count
    }
}

/// The minimal scene snapshot `Update`/`Build` walk. Meshes are looked
/// up by `MeshId`; a missing lookup is the "scene inconsistency" error
/// case in §7 — the offending span is skipped, not treated as fatal.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub objects: Vec<ObjectInstance>,
    pub hairs: Vec<HairParticle>,
    meshes: std::collections::HashMap<MeshId, MeshComponent>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_mesh(&mut self, id: MeshId, mesh: MeshComponent) {
        self.meshes.insert(id, mesh);
    }

    pub fn mesh(&self, id: MeshId) -> Option<&MeshComponent> {
        self.meshes.get(&id)
    }

    /// Total primitive count T used by the capacity manager (§4.1):
    /// the sum of mesh-triangle counts plus hair-segment quad-triangle
    /// counts, skipping any object/hair whose mesh reference doesn't
    /// resolve.
    pub fn total_primitive_count(&self) -> u32 {
        let mesh_triangles: u32 = self
            .objects
            .iter()
            .filter_map(|object| object.mesh_id.and_then(|id| self.mesh(id)))
            .flat_map(|mesh| mesh.subsets.iter())
            .map(|subset| subset.index_count / 3)
            .sum();

        let hair_triangles: u32 = self
            .hairs
            .iter()
            .filter(|hair| hair.mesh_id.is_some())
            .map(HairParticle::primitive_count)
            .sum();

        mesh_triangles + hair_triangles
    }
}

/// The frame-constant loose scene bound used to normalise primitive
/// centroids into `[0, 1]^3` before Morton quantisation (§4.2, and the
/// resolved open question in SPEC_FULL.md's "Scene AABB dependency").
pub type SceneBounds = Bbox;

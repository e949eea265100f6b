//! Read-only access to imported models and their meshes.

use meshport_core::Bounds;
use meshport_ecs::{ArrayElement, Entity, World};

use crate::components::{
    ChannelMask, Mesh, MeshRequest, Model, ModelMesh, ModelRequest, Name, RequestStatus,
    VertexBitangent, VertexColor, VertexIndex, VertexNormal, VertexPosition, VertexTangent,
    VertexUv,
};

/// A model entity seen through its request, header and mesh list.
#[derive(Clone, Copy)]
pub struct ModelView<'w> {
    world: &'w World,
    entity: Entity,
}

impl<'w> ModelView<'w> {
    pub fn new(world: &'w World, entity: Entity) -> Self {
        Self { world, entity }
    }

    pub fn entity(&self) -> Entity {
        self.entity
    }

    pub fn request(&self) -> Option<&'w ModelRequest> {
        self.world.get(self.entity)
    }

    pub fn status(&self) -> Option<RequestStatus> {
        self.request().map(|request| request.status)
    }

    pub fn model(&self) -> Option<&'w Model> {
        self.world.get(self.entity)
    }

    /// True once the current declared version has been imported.
    pub fn is_current(&self) -> bool {
        match (self.request(), self.model()) {
            (Some(request), Some(model)) => {
                request.status == RequestStatus::Loaded
                    && model.imported_version == request.version
            }
            _ => false,
        }
    }

    pub fn mesh_count(&self) -> usize {
        self.world.array_len::<ModelMesh>(self.entity).unwrap_or(0)
    }

    /// The mesh at `index` in traversal order. `None` when out of range or
    /// when the record behind it is gone.
    pub fn mesh(&self, index: usize) -> Option<MeshView<'w>> {
        let reference = self.world.array::<ModelMesh>(self.entity)?.get(index)?;
        let entity = self.world.reference(self.entity, reference.0)?;
        Some(MeshView::new(self.world, entity))
    }

    pub fn meshes(&self) -> impl Iterator<Item = MeshView<'w>> + 'w {
        let view = *self;
        (0..self.mesh_count()).filter_map(move |index| view.mesh(index))
    }

    /// Bounds over the positions of every mesh.
    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(
            self.meshes()
                .flat_map(|mesh| mesh.positions().iter().map(|p| p.0)),
        )
    }
}

/// A mesh record, owned by a model or copied onto a mesh request.
#[derive(Clone, Copy)]
pub struct MeshView<'w> {
    world: &'w World,
    entity: Entity,
}

impl<'w> MeshView<'w> {
    pub fn new(world: &'w World, entity: Entity) -> Self {
        Self { world, entity }
    }

    pub fn entity(&self) -> Entity {
        self.entity
    }

    pub fn name(&self) -> Option<&'w str> {
        self.world
            .get::<Name>(self.entity)
            .map(|name| name.0.as_str())
    }

    pub fn header(&self) -> Option<&'w Mesh> {
        self.world.get(self.entity)
    }

    pub fn request(&self) -> Option<&'w MeshRequest> {
        self.world.get(self.entity)
    }

    pub fn version(&self) -> u32 {
        self.header().map_or(0, |mesh| mesh.version)
    }

    pub fn channels(&self) -> ChannelMask {
        self.header().map_or(ChannelMask::empty(), |mesh| mesh.channels)
    }

    pub fn vertex_count(&self) -> u32 {
        self.header().map_or(0, |mesh| mesh.vertex_count)
    }

    pub fn index_count(&self) -> u32 {
        self.header().map_or(0, |mesh| mesh.index_count)
    }

    pub fn positions(&self) -> &'w [VertexPosition] {
        self.array()
    }

    pub fn uvs(&self) -> &'w [VertexUv] {
        self.array()
    }

    pub fn normals(&self) -> &'w [VertexNormal] {
        self.array()
    }

    pub fn tangents(&self) -> &'w [VertexTangent] {
        self.array()
    }

    pub fn bitangents(&self) -> &'w [VertexBitangent] {
        self.array()
    }

    pub fn colors(&self) -> &'w [VertexColor] {
        self.array()
    }

    pub fn indices(&self) -> &'w [VertexIndex] {
        self.array()
    }

    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(self.positions().iter().map(|position| position.0))
    }

    fn array<T: ArrayElement>(&self) -> &'w [T] {
        self.world.array::<T>(self.entity).unwrap_or_default()
    }
}

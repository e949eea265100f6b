//! Vertex data of one mesh, staged onto a mesh record channel by channel.

use meshport_assets::SceneMesh;
use meshport_ecs::{ArrayElement, CommandBuffer, Entity, World};

use crate::components::{
    ChannelMask, VertexBitangent, VertexChannel, VertexColor, VertexIndex, VertexNormal,
    VertexPosition, VertexTangent, VertexUv,
};

/// Channel arrays and flattened indices for one mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct MeshData {
    pub vertex_count: usize,
    pub positions: Option<Vec<VertexPosition>>,
    pub uvs: Option<Vec<VertexUv>>,
    pub normals: Option<Vec<VertexNormal>>,
    pub tangents: Option<Vec<VertexTangent>>,
    pub bitangents: Option<Vec<VertexBitangent>>,
    pub colors: Option<Vec<VertexColor>>,
    pub indices: Vec<VertexIndex>,
}

/// What [`MeshData::stage`] wrote, for the mesh header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StagedMesh {
    pub channels: ChannelMask,
    pub vertex_count: u32,
    pub index_count: u32,
}

impl MeshData {
    /// Convert a parsed mesh. UVs keep their first two components and faces
    /// are flattened in order.
    pub fn from_scene(mesh: &SceneMesh) -> Self {
        Self {
            vertex_count: mesh.vertex_count,
            positions: convert(&mesh.positions, VertexPosition),
            uvs: convert(&mesh.uvs, |uv| VertexUv(uv.truncate())),
            normals: convert(&mesh.normals, VertexNormal),
            tangents: convert(&mesh.tangents, VertexTangent),
            bitangents: convert(&mesh.bitangents, VertexBitangent),
            colors: convert(&mesh.colors, VertexColor),
            indices: mesh
                .faces
                .iter()
                .flat_map(|face| face.indices.iter().copied())
                .map(VertexIndex)
                .collect(),
        }
    }

    /// Read back the arrays of an existing mesh record.
    pub fn from_record(world: &World, entity: Entity, vertex_count: usize) -> Self {
        Self {
            vertex_count,
            positions: read(world, entity),
            uvs: read(world, entity),
            normals: read(world, entity),
            tangents: read(world, entity),
            bitangents: read(world, entity),
            colors: read(world, entity),
            indices: read(world, entity).unwrap_or_default(),
        }
    }

    /// Stage array writes for the selected record. `existing` is the record
    /// as it is in `world` before the buffer runs, or `None` for a record
    /// the buffer creates itself.
    pub fn stage(
        self,
        buffer: &mut CommandBuffer,
        world: &World,
        existing: Option<Entity>,
    ) -> StagedMesh {
        let index_count = self.indices.len() as u32;
        let mut channels = ChannelMask::empty();
        channels |= stage_channel(buffer, world, existing, self.positions);
        channels |= stage_channel(buffer, world, existing, self.uvs);
        channels |= stage_channel(buffer, world, existing, self.normals);
        channels |= stage_channel(buffer, world, existing, self.tangents);
        channels |= stage_channel(buffer, world, existing, self.bitangents);
        channels |= stage_channel(buffer, world, existing, self.colors);
        stage_array(buffer, had_array::<VertexIndex>(world, existing), Some(self.indices));
        StagedMesh {
            channels,
            vertex_count: self.vertex_count as u32,
            index_count,
        }
    }
}

fn convert<S: Copy, T>(source: &Option<Vec<S>>, f: impl Fn(S) -> T) -> Option<Vec<T>> {
    source
        .as_ref()
        .map(|values| values.iter().copied().map(f).collect())
}

fn read<T: ArrayElement>(world: &World, entity: Entity) -> Option<Vec<T>> {
    world.array::<T>(entity).map(<[T]>::to_vec)
}

fn had_array<T: ArrayElement>(world: &World, existing: Option<Entity>) -> bool {
    existing.is_some_and(|entity| world.has_array::<T>(entity))
}

fn stage_channel<C: VertexChannel>(
    buffer: &mut CommandBuffer,
    world: &World,
    existing: Option<Entity>,
    values: Option<Vec<C>>,
) -> ChannelMask {
    if stage_array(buffer, had_array::<C>(world, existing), values) {
        C::MASK
    } else {
        ChannelMask::empty()
    }
}

/// Create, resize and fill the array, or remove it when the channel went
/// away. Returns whether the array is present afterwards.
fn stage_array<T: ArrayElement>(
    buffer: &mut CommandBuffer,
    had: bool,
    values: Option<Vec<T>>,
) -> bool {
    match values {
        Some(values) => {
            if !had {
                buffer.create_array::<T>();
            }
            buffer
                .resize_array::<T>(values.len())
                .set_array_elements(0, values);
            true
        }
        None => {
            if had {
                buffer.remove_array::<T>();
            }
            false
        }
    }
}

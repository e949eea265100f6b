use meshport_assets::{DataLoader, DataServer, Importer, SceneProvider};
use meshport_core::FrameTime;
use meshport_ecs::{CommandBuffer, Entity, System, World};
use tracing::{error, warn};

use crate::components::{MeshRequest, ModelRequest, RequestStatus};
use crate::error::ImportError;
use crate::fanout::{copy_mesh, ready_source};
use crate::request::{Progress, RequestContext};
use crate::settings::ImportSettings;
use crate::version::{FanoutStamp, VersionCache};

/// What one [`ModelImportSystem::update`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStats {
    /// Model requests that were looked at (changed and not terminal).
    pub models_processed: usize,
    pub models_imported: usize,
    pub models_failed: usize,
    /// Commands applied by the model phase.
    pub model_operations: usize,
    pub meshes_copied: usize,
    pub mesh_failures: usize,
    /// Commands applied by the fan-out phase.
    pub mesh_operations: usize,
}

impl TickStats {
    pub fn operations(&self) -> usize {
        self.model_operations + self.mesh_operations
    }
}

/// Imports requested models into the world and fans their meshes out to
/// mesh requests.
///
/// Each update runs two phases. The model phase advances every changed
/// [`ModelRequest`] and reconciles finished scenes into mesh records. Its
/// buffer is applied before the fan-out phase copies meshes onto
/// [`MeshRequest`] entities, so a model imported this tick is visible to
/// fan-out in the same tick.
///
/// Records that have not changed since they were last processed cost no
/// commands.
pub struct ModelImportSystem<L = DataServer, P = Importer> {
    loader: L,
    provider: P,
    settings: ImportSettings,
    model_versions: VersionCache<u32>,
    mesh_versions: VersionCache<FanoutStamp>,
    model_buffer: CommandBuffer,
    mesh_buffer: CommandBuffer,
    scratch: CommandBuffer,
    /// Versions staged this tick, committed once their buffer applied.
    model_commits: Vec<(Entity, u32)>,
    mesh_commits: Vec<(Entity, FanoutStamp)>,
    last_tick: TickStats,
}

impl<L: DataLoader> ModelImportSystem<L, Importer> {
    /// A system parsing glTF and OBJ from `loader`.
    pub fn with_loader(loader: L) -> Self {
        Self::new(loader, Importer)
    }
}

impl<L: DataLoader, P: SceneProvider> ModelImportSystem<L, P> {
    pub fn new(loader: L, provider: P) -> Self {
        Self {
            loader,
            provider,
            settings: ImportSettings::default(),
            model_versions: VersionCache::new(),
            mesh_versions: VersionCache::new(),
            model_buffer: CommandBuffer::new(),
            mesh_buffer: CommandBuffer::new(),
            scratch: CommandBuffer::new(),
            model_commits: Vec::new(),
            mesh_commits: Vec::new(),
            last_tick: TickStats::default(),
        }
    }

    pub fn with_settings(mut self, settings: ImportSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &ImportSettings {
        &self.settings
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn loader_mut(&mut self) -> &mut L {
        &mut self.loader
    }

    pub fn last_tick(&self) -> TickStats {
        self.last_tick
    }

    /// Forget cached versions of despawned entities. An entity handle that
    /// is later recycled starts out unseen either way.
    pub fn prune(&mut self, world: &World) -> usize {
        self.model_versions.retain_alive(world) + self.mesh_versions.retain_alive(world)
    }

    /// Run both phases with `delta` seconds elapsed since the last update.
    ///
    /// Per-record failures are logged and recorded on the record. An error
    /// is only returned when a staged buffer fails to apply; records staged
    /// into that buffer are then processed again on the next update.
    pub fn update(&mut self, world: &mut World, delta: f32) -> Result<TickStats, ImportError> {
        let mut stats = TickStats::default();

        self.update_models(world, delta, &mut stats);
        stats.model_operations = flush(
            &mut self.model_buffer,
            world,
            &mut self.model_versions,
            &mut self.model_commits,
        )?;

        self.update_meshes(world, &mut stats);
        stats.mesh_operations = flush(
            &mut self.mesh_buffer,
            world,
            &mut self.mesh_versions,
            &mut self.mesh_commits,
        )?;

        self.last_tick = stats;
        Ok(stats)
    }

    fn update_models(&mut self, world: &World, delta: f32, stats: &mut TickStats) {
        let mut context = RequestContext {
            loader: &mut self.loader,
            provider: &self.provider,
            settings: &self.settings,
        };

        for (entity, (request,)) in world.query::<(&ModelRequest,)>() {
            if request.status.is_terminal() {
                continue;
            }
            if request.status == RequestStatus::Loaded
                && !self.model_versions.changed(entity, request.version)
            {
                continue;
            }
            stats.models_processed += 1;

            match context.advance(world, entity, request, delta, &mut self.scratch) {
                Ok(Progress::Imported(_)) => {
                    self.model_buffer.append(&mut self.scratch);
                    self.model_commits.push((entity, request.version));
                    stats.models_imported += 1;
                }
                Ok(Progress::Pending | Progress::TimedOut) => {
                    self.model_buffer.append(&mut self.scratch);
                }
                Err(err) => {
                    self.scratch.clear();
                    error!(?entity, address = %request.address, "model import failed: {}", err);
                    stage_failed(&mut self.model_buffer, entity, request);
                    stats.models_failed += 1;
                }
            }
        }
    }

    fn update_meshes(&mut self, world: &World, stats: &mut TickStats) {
        for (entity, (request,)) in world.query::<(&MeshRequest,)>() {
            let Some(source) = ready_source(world, entity, request) else {
                continue;
            };
            if !self.mesh_versions.changed(entity, source.stamp) {
                continue;
            }

            match copy_mesh(world, entity, request, source, &mut self.scratch) {
                Ok(()) => {
                    self.mesh_buffer.append(&mut self.scratch);
                    stats.meshes_copied += 1;
                }
                Err(err) => {
                    self.scratch.clear();
                    warn!(?entity, "mesh request not served: {}", err);
                    if request.loaded {
                        self.mesh_buffer.select(entity).set_component(MeshRequest {
                            loaded: false,
                            ..*request
                        });
                    }
                    stats.mesh_failures += 1;
                }
            }
            self.mesh_commits.push((entity, source.stamp));
        }
    }
}

/// Apply `buffer`, then commit the versions staged with it. A failed apply
/// commits nothing.
fn flush<V: Copy + PartialEq>(
    buffer: &mut CommandBuffer,
    world: &mut World,
    versions: &mut VersionCache<V>,
    commits: &mut Vec<(Entity, V)>,
) -> Result<usize, ImportError> {
    let applied = buffer.apply(world);
    let staged = std::mem::take(commits);
    let applied = applied?;
    for (entity, version) in staged {
        versions.commit(entity, version);
    }
    Ok(applied)
}

fn stage_failed(buffer: &mut CommandBuffer, entity: Entity, request: &ModelRequest) {
    buffer.select(entity).set_component(ModelRequest {
        status: RequestStatus::Failed,
        ..request.clone()
    });
}

impl<L: DataLoader, P: SceneProvider> System for ModelImportSystem<L, P> {
    fn run(&mut self, world: &mut World) {
        let delta = world
            .resource::<FrameTime>()
            .map_or(0.0, |time| time.delta_time);
        if let Err(err) = self.update(world, delta) {
            error!("model import tick aborted: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use meshport_assets::{Face, Node, Scene};
    use meshport_core::{Bounds, Vec3};
    use meshport_ecs::SystemSchedule;

    use super::*;
    use crate::components::{Mesh, Model, ModelMesh, Name, VertexIndex};
    use crate::settings::OrphanPolicy;
    use crate::testing::{flat_scene, ScriptedLoader, ScriptedProvider, CUBE_OBJ, TRIANGLE_OBJ};
    use crate::view::{MeshView, ModelView};

    fn served(address: &str, bytes: &str) -> ModelImportSystem {
        let mut loader = DataServer::new();
        loader.insert(address, bytes);
        ModelImportSystem::with_loader(loader)
    }

    fn scripted(scenes: &[(&str, Scene)]) -> ModelImportSystem<DataServer, ScriptedProvider> {
        let mut provider = ScriptedProvider::default();
        for (key, scene) in scenes {
            provider = provider.with(key, scene.clone());
        }
        ModelImportSystem::new(DataServer::new(), provider)
    }

    fn mesh_records(world: &World, model: Entity) -> Vec<Entity> {
        ModelView::new(world, model)
            .meshes()
            .map(|mesh| mesh.entity())
            .collect()
    }

    #[test]
    fn cube_imports_with_expected_shape() {
        let mut world = World::new();
        let mut system = served("cube.obj", CUBE_OBJ);
        let model = ModelRequest::new("cube.obj").spawn(&mut world);

        system.update(&mut world, 0.016).unwrap();

        let view = ModelView::new(&world, model);
        assert_eq!(view.status(), Some(RequestStatus::Loaded));
        assert_eq!(view.mesh_count(), 1);
        let mesh = view.mesh(0).unwrap();
        assert_eq!(mesh.vertex_count(), 24);
        assert_eq!(mesh.index_count(), 36);
        assert_eq!(
            mesh.bounds(),
            Some(Bounds::new(Vec3::splat(-1.0), Vec3::splat(1.0)))
        );
        assert_eq!(world.get::<Model>(model).unwrap().version, 1);
    }

    #[test]
    fn cube_fans_out_in_the_import_tick() {
        let mut world = World::new();
        let mut system = served("cube.obj", CUBE_OBJ);
        let model = ModelRequest::new("cube.obj").spawn(&mut world);
        let copy = MeshRequest::spawn(&mut world, model, 0).unwrap();

        system.update(&mut world, 0.016).unwrap();

        let mesh = MeshView::new(&world, copy);
        assert!(mesh.request().unwrap().loaded);
        assert_eq!(mesh.vertex_count(), 24);
        assert_eq!(mesh.bounds(), ModelView::new(&world, model).bounds());
        assert_eq!(
            mesh.bounds(),
            Some(Bounds::new(Vec3::splat(-1.0), Vec3::splat(1.0)))
        );
    }

    #[test]
    fn second_tick_without_changes_is_free() {
        let mut world = World::new();
        let mut system = served("cube.obj", CUBE_OBJ);
        let model = ModelRequest::new("cube.obj").spawn(&mut world);
        MeshRequest::spawn(&mut world, model, 0).unwrap();

        let first = system.update(&mut world, 0.016).unwrap();
        assert!(first.operations() > 0);
        assert_eq!(first.meshes_copied, 1);

        let second = system.update(&mut world, 0.016).unwrap();
        assert_eq!(second, TickStats::default());
        assert_eq!(system.last_tick(), TickStats::default());
    }

    #[test]
    fn reimport_keeps_identity_and_bumps_versions_once() {
        let mut world = World::new();
        let mut system = served("cube.obj", CUBE_OBJ);
        let model = ModelRequest::new("cube.obj").spawn(&mut world);
        system.update(&mut world, 0.016).unwrap();
        let before = mesh_records(&world, model);
        let child_count = world.children(model).len();

        world.get_mut::<ModelRequest>(model).unwrap().request_reimport();
        let stats = system.update(&mut world, 0.016).unwrap();
        assert_eq!(stats.models_imported, 1);

        assert_eq!(mesh_records(&world, model), before);
        assert_eq!(world.children(model).len(), child_count);
        assert_eq!(world.get::<Mesh>(before[0]).unwrap().version, 2);
        assert_eq!(
            world.get::<Model>(model),
            Some(&Model {
                version: 2,
                imported_version: 1
            })
        );

        assert_eq!(system.update(&mut world, 0.016).unwrap().operations(), 0);
    }

    #[test]
    fn mesh_requests_follow_reimports() {
        let mut world = World::new();
        let mut system = scripted(&[("v1", flat_scene(&["a"])), ("v2", flat_scene(&["b"]))]);
        system.loader_mut().insert("ship", "v1");
        let model = ModelRequest::new("ship").spawn(&mut world);
        let copy = MeshRequest::spawn(&mut world, model, 0).unwrap();

        system.update(&mut world, 0.016).unwrap();
        assert_eq!(world.get::<Name>(copy), Some(&Name("a".into())));
        assert_eq!(world.get::<MeshRequest>(copy).unwrap().source_version, 1);

        system.loader_mut().insert("ship", "v2");
        world.get_mut::<ModelRequest>(model).unwrap().request_reimport();
        system.update(&mut world, 0.016).unwrap();
        assert_eq!(world.get::<Name>(copy), Some(&Name("b".into())));
        assert_eq!(world.get::<MeshRequest>(copy).unwrap().source_version, 2);
        assert_eq!(world.get::<Mesh>(copy).unwrap().version, 2);
    }

    #[test]
    fn mesh_request_waits_for_its_model() {
        let mut world = World::new();
        let mut system = ModelImportSystem::with_loader(ScriptedLoader::after(1, TRIANGLE_OBJ));
        let model = ModelRequest::new("tri.obj").spawn(&mut world);
        let copy = MeshRequest::spawn(&mut world, model, 0).unwrap();

        let first = system.update(&mut world, 0.016).unwrap();
        assert_eq!(first.meshes_copied, 0);
        assert!(!world.get::<MeshRequest>(copy).unwrap().loaded);

        let second = system.update(&mut world, 0.016).unwrap();
        assert_eq!(second.meshes_copied, 1);
        assert!(world.get::<MeshRequest>(copy).unwrap().loaded);
        assert_eq!(world.array_len::<VertexIndex>(copy), Some(3));
    }

    #[test]
    fn timed_out_request_is_never_polled_again() {
        let mut world = World::new();
        let mut system = ModelImportSystem::with_loader(ScriptedLoader::after(usize::MAX, ""));
        let model = ModelRequest::new("missing.obj")
            .with_timeout(0.5)
            .spawn(&mut world);

        system.update(&mut world, 0.3).unwrap();
        system.update(&mut world, 0.3).unwrap();
        assert_eq!(
            world.get::<ModelRequest>(model).unwrap().status,
            RequestStatus::NotFound
        );
        assert_eq!(system.loader().polls(), 2);

        let idle = system.update(&mut world, 0.3).unwrap();
        assert_eq!(idle.operations(), 0);
        assert_eq!(system.loader().polls(), 2);

        world.get_mut::<ModelRequest>(model).unwrap().resubmit();
        system.update(&mut world, 0.3).unwrap();
        assert_eq!(system.loader().polls(), 3);
    }

    #[test]
    fn parse_failure_marks_request_failed_and_spares_siblings() {
        let mut world = World::new();
        let mut loader = DataServer::new();
        loader.insert("broken.glb", b"garbage".to_vec());
        loader.insert("tri.obj", TRIANGLE_OBJ);
        let mut system = ModelImportSystem::with_loader(loader);
        let broken = ModelRequest::new("broken.glb").spawn(&mut world);
        let good = ModelRequest::new("tri.obj").spawn(&mut world);

        let stats = system.update(&mut world, 0.016).unwrap();
        assert_eq!((stats.models_failed, stats.models_imported), (1, 1));
        assert_eq!(
            world.get::<ModelRequest>(broken).unwrap().status,
            RequestStatus::Failed
        );
        assert!(!world.has::<Model>(broken));
        assert!(world.children(broken).is_empty());
        assert_eq!(ModelView::new(&world, good).mesh_count(), 1);

        assert_eq!(system.update(&mut world, 0.016).unwrap().operations(), 0);
    }

    #[test]
    fn out_of_range_mesh_request_is_not_retried() {
        let mut world = World::new();
        let mut system = served("tri.obj", TRIANGLE_OBJ);
        let model = ModelRequest::new("tri.obj").spawn(&mut world);
        let copy = MeshRequest::spawn(&mut world, model, 5).unwrap();

        let first = system.update(&mut world, 0.016).unwrap();
        assert_eq!(first.mesh_failures, 1);
        assert!(!world.get::<MeshRequest>(copy).unwrap().loaded);

        let second = system.update(&mut world, 0.016).unwrap();
        assert_eq!(second.mesh_failures, 0);
    }

    #[test]
    fn mesh_request_losing_its_source_is_no_longer_loaded() {
        let mut world = World::new();
        let mut system = scripted(&[("two", flat_scene(&["a", "b"])), ("one", flat_scene(&["a"]))]);
        system.loader_mut().insert("m", "two");
        let model = ModelRequest::new("m").spawn(&mut world);
        let copy = MeshRequest::spawn(&mut world, model, 1).unwrap();

        system.update(&mut world, 0.016).unwrap();
        assert!(world.get::<MeshRequest>(copy).unwrap().loaded);

        system.loader_mut().insert("m", "one");
        world.get_mut::<ModelRequest>(model).unwrap().request_reimport();
        let stats = system.update(&mut world, 0.016).unwrap();
        assert_eq!(stats.mesh_failures, 1);
        let request = world.get::<MeshRequest>(copy).unwrap();
        assert!(!request.loaded);
        assert_eq!(request.source_version, 1);

        assert_eq!(system.update(&mut world, 0.016).unwrap().operations(), 0);
    }

    #[test]
    fn failed_flush_leaves_records_to_retry() {
        let mut world = World::new();
        let mut system = served("tri.obj", TRIANGLE_OBJ);
        let model = ModelRequest::new("tri.obj").spawn(&mut world);
        let dead = world.spawn();
        world.despawn(dead);

        let mut stats = TickStats::default();
        system.update_models(&world, 0.016, &mut stats);
        assert_eq!(stats.models_imported, 1);
        system.model_buffer.select(dead).destroy();
        assert!(flush(
            &mut system.model_buffer,
            &mut world,
            &mut system.model_versions,
            &mut system.model_commits,
        )
        .is_err());
        assert!(system.model_versions.get(model).is_none());
        assert!(system.model_commits.is_empty());

        let retry = system.update(&mut world, 0.016).unwrap();
        assert_eq!(retry.models_processed, 1);
        assert_eq!(system.model_versions.get(model), Some(0));
    }

    #[test]
    fn shrinking_reimport_respects_orphan_policy() {
        let scenes = [
            ("big", flat_scene(&["a", "b", "c"])),
            ("small", flat_scene(&["a"])),
        ];
        for policy in [OrphanPolicy::Destroy, OrphanPolicy::Keep] {
            let mut world = World::new();
            let mut system = scripted(&scenes).with_settings(ImportSettings {
                orphans: policy,
                ..ImportSettings::default()
            });
            system.loader_mut().insert("m", "big");
            let model = ModelRequest::new("m").spawn(&mut world);
            system.update(&mut world, 0.016).unwrap();
            let before = mesh_records(&world, model);

            system.loader_mut().insert("m", "small");
            world.get_mut::<ModelRequest>(model).unwrap().request_reimport();
            system.update(&mut world, 0.016).unwrap();

            assert_eq!(mesh_records(&world, model), vec![before[0]]);
            let survivors = before[1..].iter().filter(|e| world.is_alive(**e)).count();
            match policy {
                OrphanPolicy::Destroy => assert_eq!(survivors, 0),
                OrphanPolicy::Keep => assert_eq!(survivors, 2),
            }
        }
    }

    #[test]
    fn dropped_channel_is_removed_on_reimport() {
        let with_normals = flat_scene(&["a"]);
        let mut without_normals = with_normals.clone();
        without_normals.meshes[0].normals = None;

        let mut world = World::new();
        let mut system = scripted(&[("n", with_normals), ("plain", without_normals)]);
        system.loader_mut().insert("m", "n");
        let model = ModelRequest::new("m").spawn(&mut world);
        system.update(&mut world, 0.016).unwrap();

        system.loader_mut().insert("m", "plain");
        world.get_mut::<ModelRequest>(model).unwrap().request_reimport();
        system.update(&mut world, 0.016).unwrap();

        let mesh = ModelView::new(&world, model).mesh(0).unwrap();
        assert!(!mesh.channels().contains(crate::ChannelMask::NORMALS));
        assert!(mesh.normals().is_empty());
    }

    #[test]
    fn nested_nodes_import_depth_first() {
        let mut leaf = flat_scene(&["root", "child"]);
        leaf.root.meshes = vec![0];
        leaf.root.children = vec![Node {
            name: "child".into(),
            meshes: vec![1],
            children: Vec::new(),
        }];
        leaf.meshes[1].faces.push(Face::new([2, 1, 0]));

        let mut world = World::new();
        let mut system = scripted(&[("tree", leaf)]);
        system.loader_mut().insert("m", "tree");
        let model = ModelRequest::new("m").spawn(&mut world);
        system.update(&mut world, 0.016).unwrap();

        let view = ModelView::new(&world, model);
        let names: Vec<_> = view.meshes().map(|m| m.name().unwrap_or("").to_string()).collect();
        assert_eq!(names, vec!["root", "child"]);
        assert_eq!(view.mesh(1).unwrap().index_count(), 6);
    }

    #[test]
    fn runs_from_a_schedule_with_frame_time() {
        let mut world = World::new();
        let mut schedule = SystemSchedule::new();
        schedule.add_system(ModelImportSystem::with_loader(DataServer::new()));
        let model = ModelRequest::new("nowhere.obj")
            .with_timeout(0.2)
            .spawn(&mut world);

        schedule.update(&mut world, 0.1);
        assert_eq!(
            world.get::<ModelRequest>(model).unwrap().status,
            RequestStatus::Loading
        );
        schedule.update(&mut world, 0.1);
        assert_eq!(
            world.get::<ModelRequest>(model).unwrap().status,
            RequestStatus::NotFound
        );
    }

    #[test]
    fn prune_drops_despawned_entries() {
        let mut world = World::new();
        let mut system = served("tri.obj", TRIANGLE_OBJ);
        let model = ModelRequest::new("tri.obj").spawn(&mut world);
        let copy = MeshRequest::spawn(&mut world, model, 0).unwrap();
        system.update(&mut world, 0.016).unwrap();

        world.despawn(copy);
        assert_eq!(system.prune(&world), 1);
        assert_eq!(system.prune(&world), 0);
        assert!(world.array::<ModelMesh>(model).is_some());
    }
}

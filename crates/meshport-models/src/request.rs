//! Advancing a single model request by one tick.

use meshport_assets::{DataLoader, SceneProvider};
use meshport_ecs::{CommandBuffer, Entity, World};
use tracing::{debug, info, warn};

use crate::components::{ModelRequest, RequestStatus};
use crate::error::ImportError;
use crate::reconcile::{reconcile, Reconciliation};
use crate::settings::ImportSettings;

/// Where a request stands after one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Progress {
    /// Still waiting for bytes.
    Pending,
    /// Gave up waiting; the request is now `NotFound`.
    TimedOut,
    /// The scene was reconciled into the model.
    Imported(Reconciliation),
}

/// Everything needed to turn a request into staged writes.
pub(crate) struct RequestContext<'a, L, P> {
    pub loader: &'a mut L,
    pub provider: &'a P,
    pub settings: &'a ImportSettings,
}

impl<L: DataLoader, P: SceneProvider> RequestContext<'_, L, P> {
    /// Stage this tick's writes for `request` on `entity`.
    ///
    /// On error nothing useful is left in `buffer`; the caller discards it
    /// and marks the request failed.
    pub fn advance(
        &mut self,
        world: &World,
        entity: Entity,
        request: &ModelRequest,
        delta: f32,
        buffer: &mut CommandBuffer,
    ) -> Result<Progress, ImportError> {
        let mut next = request.clone();
        match request.status {
            RequestStatus::Submitted => {
                info!(address = %request.address, format = %request.format, "loading model");
                next.status = RequestStatus::Loading;
                next.duration = 0.0;
            }
            RequestStatus::Loaded => {
                info!(address = %request.address, version = request.version, "reimporting model");
                next.status = RequestStatus::Loading;
                next.duration = 0.0;
            }
            _ => {}
        }

        let Some(bytes) = self.loader.try_consume(&request.address)? else {
            next.duration += delta;
            let progress = if next.duration >= next.timeout {
                warn!(
                    address = %request.address,
                    waited = next.duration,
                    "model source not found before timeout"
                );
                next.status = RequestStatus::NotFound;
                Progress::TimedOut
            } else {
                Progress::Pending
            };
            buffer.select(entity).set_component(next);
            return Ok(progress);
        };

        debug!(address = %request.address, bytes = bytes.len(), "model bytes ready");
        let scene = self.provider.parse(&bytes, request.format.as_str())?;
        drop(bytes);
        scene.validate()?;

        let stats = reconcile(world, entity, &scene, request.version, self.settings, buffer)?;
        next.status = RequestStatus::Loaded;
        buffer.select(entity).set_component(next);
        info!(
            address = %request.address,
            meshes = stats.meshes,
            created = stats.created,
            reused = stats.reused,
            "model imported"
        );
        Ok(Progress::Imported(stats))
    }
}

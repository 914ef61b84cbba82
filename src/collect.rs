use bevy::ecs::query::Has;
use bevy::prelude::*;

use crate::collider::{Collider, Collider2d, ColliderResponse, RigidBody, Sensor};
use crate::encode::{encode_collider, encode_collider_2d, submit};
use crate::kernel::{KernelHandle, OwnerId, SimulationBounds};
use crate::settings::BridgeSettings;
use crate::ParticleWorld;

/// One collected obstacle, alive for the tick that collected it.
#[derive(Clone, Copy, Debug)]
pub struct ObstacleRecord {
    pub collider: Entity,
    /// The obstacle's rigid body, if it has one. Same entity as the
    /// collider in this world model.
    pub body: Option<Entity>,
}

/// Everything the feedback pass needs from the collection pass. Rebuilt
/// from scratch every tick; owner indices into `obstacles` mean nothing
/// outside the tick that assigned them.
#[derive(Resource, Default)]
pub struct TickContext {
    pub obstacles: Vec<ObstacleRecord>,
    /// Feedback force multiplier, snapshotted at collection time.
    pub force: f32,
}

impl TickContext {
    pub fn begin(&mut self, force: f32) {
        self.obstacles.clear();
        self.force = force;
    }

    pub fn body_of(&self, owner: usize) -> Option<Entity> {
        self.obstacles.get(owner).and_then(|record| record.body)
    }
}

/// Enumerate obstacles overlapping the simulation bounds and submit each
/// to the kernel in canonical form.
///
/// The broad phase is a loose center-distance test against the bounds
/// sphere (circle in the 2D pass); the kernel runs its own narrow tests.
/// 3D and 2D obstacles share one owner index space so a particle's hit
/// owner always resolves into the same tick's combined obstacle list.
pub fn collect_colliders(
    settings: Res<BridgeSettings>,
    mut ctx: ResMut<TickContext>,
    mut kernel: ResMut<KernelHandle>,
    bounds_query: Query<&GlobalTransform, With<ParticleWorld>>,
    obstacles_3d: Query<(
        Entity,
        &Collider,
        &GlobalTransform,
        Option<&ColliderResponse>,
        Has<Sensor>,
        Has<RigidBody>,
    )>,
    obstacles_2d: Query<(
        Entity,
        &Collider2d,
        &GlobalTransform,
        Option<&ColliderResponse>,
        Has<Sensor>,
        Has<RigidBody>,
    )>,
) {
    // Reset first: with no bounds entity this tick must not leave the
    // previous tick's obstacle list visible to the feedback pass.
    ctx.begin(settings.force);

    let Ok(world_transform) = bounds_query.single() else {
        return;
    };
    let bounds = SimulationBounds::from_transform(world_transform);
    let query_radius = bounds.query_radius();

    if settings.include_3d {
        for (entity, collider, transform, response, is_sensor, has_body) in &obstacles_3d {
            let (scale, _, translation) = transform.to_scale_rotation_translation();
            if translation.distance(bounds.center) > query_radius + collider.broad_radius(scale) {
                continue;
            }
            if is_sensor {
                continue;
            }
            let mut receive = false;
            if let Some(response) = response {
                if !response.send_collision {
                    continue;
                }
                receive = response.receive_collision;
            }
            let owner = if receive {
                OwnerId::Obstacle(ctx.obstacles.len())
            } else {
                OwnerId::Anonymous
            };
            submit(&mut kernel, owner, encode_collider(collider, transform));
            ctx.obstacles.push(ObstacleRecord {
                collider: entity,
                body: has_body.then_some(entity),
            });
        }
    }

    if settings.include_2d {
        let center_2d = bounds.center.truncate();
        for (entity, collider, transform, response, is_sensor, has_body) in &obstacles_2d {
            let (scale, _, translation) = transform.to_scale_rotation_translation();
            if translation.truncate().distance(center_2d)
                > query_radius + collider.broad_radius(scale)
            {
                continue;
            }
            if is_sensor {
                continue;
            }
            let mut receive = false;
            if let Some(response) = response {
                if !response.send_collision {
                    continue;
                }
                receive = response.receive_collision;
            }
            let owner = if receive {
                OwnerId::Obstacle(ctx.obstacles.len())
            } else {
                OwnerId::Anonymous
            };
            submit(&mut kernel, owner, encode_collider_2d(collider, transform));
            ctx.obstacles.push(ObstacleRecord {
                collider: entity,
                body: has_body.then_some(entity),
            });
        }
    }

    debug!("Collected {} obstacles", ctx.obstacles.len());
}

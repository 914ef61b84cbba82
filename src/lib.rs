//! Per-tick bridge between Bevy scene colliders and an external particle
//! simulation kernel: mirrors solver parameters, feeds overlapping
//! obstacles to the kernel as canonical primitives, steps it, and turns
//! fresh particle contacts into rigid-body impulses.

pub mod collect;
pub mod collider;
pub mod encode;
pub mod feedback;
pub mod kernel;
pub mod settings;
pub mod tick;

use bevy::prelude::*;

// Re-exports
pub use collect::{ObstacleRecord, TickContext};
pub use collider::{Axis, Collider, Collider2d, ColliderResponse, ExternalImpulse, RigidBody, Sensor};
pub use encode::ColliderPrimitive;
pub use feedback::{CollisionFeedback, FeedbackHandler, ParticleSink, RigidBodyFeedback};
pub use kernel::{
    KernelHandle, KernelParams, OwnerId, ParticleKernel, ParticleRecord, SimulationBounds,
    SolverType, NO_HIT,
};
pub use settings::BridgeSettings;
pub use tick::ParticleWorld;

/// Drives one full bridge tick per `Update`:
/// parameter sync, collider collection, kernel step, transient clear,
/// feedback dispatch, strictly in that order with no overlap.
///
/// The host must insert a [`KernelHandle`] before adding this plugin and
/// spawn one [`ParticleWorld`] entity whose transform defines the bounds.
/// Insert a [`FeedbackHandler`] first to replace the default rigid-body
/// responder.
pub struct ParticleBridgePlugin;

impl Plugin for ParticleBridgePlugin {
    fn build(&self, app: &mut App) {
        if !app.world().contains_resource::<FeedbackHandler>() {
            app.insert_resource(FeedbackHandler::rigid_body());
        }
        app.init_resource::<BridgeSettings>()
            .init_resource::<TickContext>()
            .add_systems(
                Startup,
                (
                    settings::seed_settings,
                    settings::load_settings,
                    tick::clear_particles,
                )
                    .chain(),
            )
            .add_systems(
                Update,
                (
                    tick::sync_kernel_params,
                    collect::collect_colliders,
                    tick::step_kernel,
                    tick::clear_transient,
                    feedback::dispatch_feedback,
                )
                    .chain(),
            );
    }
}

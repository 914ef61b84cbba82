use bevy::prelude::*;

use crate::kernel::{KernelHandle, SimulationBounds};
use crate::settings::BridgeSettings;

/// Marks the entity whose transform defines the simulation region:
/// translation is the bounds center, scale the extents. Spawn exactly one.
#[derive(Component, Default, Clone, Copy, Debug)]
pub struct ParticleWorld;

/// Mirror the bridge's configuration and the bounds entity's current
/// transform into the kernel's parameter block. Runs before collection;
/// scalar values pass through unvalidated, the kernel is the arbiter.
pub fn sync_kernel_params(
    settings: Res<BridgeSettings>,
    mut kernel: ResMut<KernelHandle>,
    bounds_query: Query<&GlobalTransform, With<ParticleWorld>>,
) {
    let Ok(world_transform) = bounds_query.single() else {
        return;
    };
    let bounds = SimulationBounds::from_transform(world_transform);
    let params = settings.kernel_params(bounds);
    kernel.set_params(params);
}

/// The single kernel invocation that advances particle state. Blocking;
/// everything this tick submitted is consumed here.
pub fn step_kernel(time: Res<Time>, mut kernel: ResMut<KernelHandle>) {
    kernel.step(time.delta_secs());
}

/// Drop this tick's collider and force submissions so the next tick starts
/// clean. Host geometry may have moved; nothing persists.
pub fn clear_transient(mut kernel: ResMut<KernelHandle>) {
    kernel.clear_colliders_and_forces();
}

/// Startup: the kernel may have been handed over with stale particles.
pub fn clear_particles(mut kernel: ResMut<KernelHandle>) {
    kernel.clear_particles();
}

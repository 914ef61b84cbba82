use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::kernel::{KernelHandle, KernelParams, SimulationBounds, SolverType};

/// Optional on-disk override for [`BridgeSettings`].
pub const SETTINGS_PATH: &str = "bridge_settings.json";

/// The bridge's live configuration. Mirrored into the kernel's parameter
/// block at the start of every tick; the bounds come from the
/// [`ParticleWorld`](crate::ParticleWorld) entity's transform instead.
#[derive(Resource, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BridgeSettings {
    pub solver: SolverType,
    /// Multiplier on particle velocity for rigid-body feedback impulses.
    /// Zero disables feedback entirely.
    pub force: f32,
    pub particle_lifetime: f32,
    pub timestep: f32,
    pub deceleration: f32,
    pub pressure_stiffness: f32,
    pub wall_stiffness: f32,
    pub coord_scale: Vec3,
    pub include_3d: bool,
    pub include_2d: bool,
    pub divisions: UVec3,
    pub particle_size: f32,
    pub max_particles: u32,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        let kernel = KernelParams::default();
        Self {
            solver: kernel.solver,
            force: 1.0,
            particle_lifetime: kernel.particle_lifetime,
            timestep: kernel.timestep,
            deceleration: kernel.deceleration,
            pressure_stiffness: kernel.pressure_stiffness,
            wall_stiffness: kernel.wall_stiffness,
            coord_scale: kernel.coord_scale,
            include_3d: true,
            include_2d: true,
            divisions: kernel.divisions,
            particle_size: kernel.particle_size,
            max_particles: kernel.max_particles,
        }
    }
}

impl BridgeSettings {
    /// Adopt the kernel-owned fields of a parameter block. Leaves the
    /// bridge-only fields (force, dimension toggles) untouched.
    pub fn adopt_kernel_params(&mut self, params: &KernelParams) {
        self.solver = params.solver;
        self.particle_lifetime = params.particle_lifetime;
        self.timestep = params.timestep;
        self.deceleration = params.deceleration;
        self.pressure_stiffness = params.pressure_stiffness;
        self.wall_stiffness = params.wall_stiffness;
        self.coord_scale = params.coord_scale;
        self.divisions = params.divisions;
        self.particle_size = params.particle_size;
        self.max_particles = params.max_particles;
    }

    /// Build the parameter block for one tick. Division counts are clamped
    /// to at least one cell per axis.
    pub fn kernel_params(&self, bounds: SimulationBounds) -> KernelParams {
        KernelParams {
            solver: self.solver,
            bounds,
            divisions: self.divisions.max(UVec3::ONE),
            particle_lifetime: self.particle_lifetime,
            timestep: self.timestep,
            deceleration: self.deceleration,
            pressure_stiffness: self.pressure_stiffness,
            wall_stiffness: self.wall_stiffness,
            coord_scale: self.coord_scale,
            particle_size: self.particle_size,
            max_particles: self.max_particles,
        }
    }
}

/// Seed settings from the kernel's own defaults, once at startup.
pub fn seed_settings(mut settings: ResMut<BridgeSettings>, kernel: Res<KernelHandle>) {
    settings.adopt_kernel_params(&kernel.params());
    info!("Seeded bridge settings from kernel defaults");
}

/// Load settings overrides from disk if present. Missing or malformed
/// files fall back to whatever the settings already hold.
pub fn load_settings(mut settings: ResMut<BridgeSettings>) {
    let path = std::path::Path::new(SETTINGS_PATH);
    let Ok(data) = std::fs::read_to_string(path) else {
        return;
    };
    match serde_json::from_str::<BridgeSettings>(&data) {
        Ok(loaded) => {
            *settings = loaded;
            info!("Loaded bridge settings from {SETTINGS_PATH}");
        }
        Err(err) => {
            warn!("Ignoring malformed {SETTINGS_PATH}: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::test_kernel::RecordingKernel;

    #[test]
    fn seeding_copies_kernel_defaults_and_keeps_bridge_fields() {
        let mut kernel_defaults = KernelParams::default();
        kernel_defaults.solver = SolverType::Sph;
        kernel_defaults.particle_lifetime = 12.0;
        kernel_defaults.max_particles = 5000;

        let mut app = App::new();
        app.insert_resource(KernelHandle::new(RecordingKernel {
            defaults: kernel_defaults,
            ..Default::default()
        }));
        app.insert_resource(BridgeSettings {
            force: 3.5,
            include_2d: false,
            ..Default::default()
        });
        app.add_systems(Update, seed_settings);
        app.update();

        let settings = app.world().resource::<BridgeSettings>();
        assert_eq!(settings.solver, SolverType::Sph);
        assert_eq!(settings.particle_lifetime, 12.0);
        assert_eq!(settings.max_particles, 5000);
        assert_eq!(settings.force, 3.5);
        assert!(!settings.include_2d);
    }

    #[test]
    fn kernel_params_clamp_divisions() {
        let settings = BridgeSettings {
            divisions: UVec3::new(0, 0, 64),
            ..Default::default()
        };
        let params = settings.kernel_params(SimulationBounds::default());
        assert_eq!(params.divisions, UVec3::new(1, 1, 64));
    }

    #[test]
    fn settings_round_trip_through_json() {
        let settings = BridgeSettings {
            solver: SolverType::NoInteraction,
            force: 0.25,
            coord_scale: Vec3::new(1.0, 1.0, 0.0),
            ..Default::default()
        };
        let json = serde_json::to_string(&settings).unwrap();
        let back: BridgeSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, settings);
    }
}

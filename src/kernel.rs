use bevy::prelude::*;
use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};
use std::ops::{Deref, DerefMut};

/// Raw owner value the kernel stores on particles when they were not hit by
/// an owned collider (or were not hit at all).
pub const NO_HIT: i32 = -1;

/// Solver the kernel should run for the tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolverType {
    /// Simple distance-based impulse resolution between particles.
    #[default]
    Impulse,
    /// Density/pressure-based smoothed-particle solver.
    Sph,
    /// Particles ignore each other, colliders and walls still apply.
    NoInteraction,
}

/// Region particles exist in and colliders are collected from.
/// Rebuilt every tick from the bounds entity's current transform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulationBounds {
    pub center: Vec3,
    pub extents: Vec3,
}

impl SimulationBounds {
    pub fn from_transform(transform: &GlobalTransform) -> Self {
        let (scale, _, translation) = transform.to_scale_rotation_translation();
        Self {
            center: translation,
            extents: scale,
        }
    }

    /// Radius of the loose broad-phase query sphere/circle.
    pub fn query_radius(&self) -> f32 {
        self.extents.length()
    }
}

impl Default for SimulationBounds {
    fn default() -> Self {
        Self {
            center: Vec3::ZERO,
            extents: Vec3::ONE,
        }
    }
}

/// The kernel's active parameter block. Written once per tick by the
/// parameter mirror, read by the kernel for the step it governs.
#[derive(Clone, Debug, PartialEq)]
pub struct KernelParams {
    pub solver: SolverType,
    pub bounds: SimulationBounds,
    /// Grid cell counts along each axis, each at least 1.
    pub divisions: UVec3,
    pub particle_lifetime: f32,
    pub timestep: f32,
    pub deceleration: f32,
    pub pressure_stiffness: f32,
    pub wall_stiffness: f32,
    pub coord_scale: Vec3,
    pub particle_size: f32,
    pub max_particles: u32,
}

impl Default for KernelParams {
    fn default() -> Self {
        Self {
            solver: SolverType::default(),
            bounds: SimulationBounds::default(),
            divisions: UVec3::new(256, 1, 256),
            particle_lifetime: 30.0,
            timestep: 1.0 / 60.0,
            deceleration: 0.99,
            pressure_stiffness: 500.0,
            wall_stiffness: 1500.0,
            coord_scale: Vec3::ONE,
            particle_size: 0.08,
            max_particles: 200_000,
        }
    }
}

/// Identifies which obstacle a submitted collider primitive belongs to.
///
/// `Obstacle(i)` indexes the tick's obstacle list and makes the collider
/// eligible for feedback; `Anonymous` colliders still block particles but
/// never receive impulses. Valid only within the tick that assigned it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OwnerId {
    Anonymous,
    Obstacle(usize),
}

impl OwnerId {
    /// Index into the tick's obstacle list, if this owner is eligible for
    /// feedback.
    pub fn index(self) -> Option<usize> {
        match self {
            OwnerId::Anonymous => None,
            OwnerId::Obstacle(i) => Some(i),
        }
    }

    /// Encode to the raw-integer wire convention kernels store on
    /// particles: [`NO_HIT`] for anonymous, the index otherwise.
    pub fn to_raw(self) -> i32 {
        match self {
            OwnerId::Anonymous => NO_HIT,
            OwnerId::Obstacle(i) => i as i32,
        }
    }

    /// Decode the raw-integer wire convention; any negative value reads
    /// as anonymous.
    pub fn from_raw(raw: i32) -> Self {
        if raw < 0 {
            OwnerId::Anonymous
        } else {
            OwnerId::Obstacle(raw as usize)
        }
    }
}

/// One particle as the kernel exposes it after a step.
///
/// Layout is shared with the kernel's own buffer, so this is a plain POD
/// view; the bridge only reads position, velocity and the two hit owners.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct ParticleRecord {
    pub position: Vec3,
    pub lifetime: f32,
    pub velocity: Vec3,
    pub density: f32,
    /// Owner index of the collider hit this step, or [`NO_HIT`].
    pub hit: i32,
    /// Owner index of the collider hit the previous step, or [`NO_HIT`].
    pub hit_prev: i32,
}

impl ParticleRecord {
    /// Owner index of the current hit, if any.
    pub fn hit_owner(&self) -> Option<usize> {
        OwnerId::from_raw(self.hit).index()
    }

    /// True on the first step of a contact span. Sustained contact keeps
    /// reporting the same owner and must not retrigger feedback.
    pub fn contact_began(&self) -> bool {
        self.hit != NO_HIT && self.hit != self.hit_prev
    }
}

/// Call contract the bridge depends on. The kernel owns particle storage,
/// integration and spatial acceleration; the bridge only feeds it
/// parameters and transient colliders and reads particles back.
///
/// The bridge never calls `step` re-entrantly and never mutates parameters
/// or colliders while a step is in flight; the chained tick systems
/// guarantee that ordering.
pub trait ParticleKernel: Send + Sync + 'static {
    fn params(&self) -> KernelParams;
    fn set_params(&mut self, params: KernelParams);

    fn add_sphere_collider(&mut self, owner: OwnerId, center: Vec3, radius: f32);
    fn add_capsule_collider(&mut self, owner: OwnerId, start: Vec3, end: Vec3, radius: f32);
    fn add_box_collider(&mut self, owner: OwnerId, world_from_local: Mat4, half_extents: Vec3);

    /// Advance particle state using the colliders and parameters submitted
    /// this tick. Blocking; may be expensive.
    fn step(&mut self, dt: f32);

    /// Discard this tick's collider and force submissions so the next tick
    /// starts clean. Does not invalidate the particle buffer.
    fn clear_colliders_and_forces(&mut self);

    fn particle_count(&self) -> usize {
        self.particles().len()
    }

    /// Borrowed view into the kernel's particle buffer, valid until the
    /// next `step` or clear call.
    fn particles(&self) -> &[ParticleRecord];

    /// Remove all live particles. Called once at startup.
    fn clear_particles(&mut self);
}

/// The kernel instance the bridge drives. Insert before adding the plugin:
///
/// ```ignore
/// app.insert_resource(KernelHandle::new(MyKernel::default()));
/// ```
#[derive(Resource)]
pub struct KernelHandle(pub Box<dyn ParticleKernel>);

impl KernelHandle {
    pub fn new(kernel: impl ParticleKernel) -> Self {
        Self(Box::new(kernel))
    }
}

impl Deref for KernelHandle {
    type Target = dyn ParticleKernel;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

impl DerefMut for KernelHandle {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.0
    }
}

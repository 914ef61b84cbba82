use bevy::prelude::*;

/// Local axis a capsule's length runs along.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Axis {
    X,
    #[default]
    Y,
    Z,
}

impl Axis {
    pub fn unit(self) -> Vec3 {
        match self {
            Axis::X => Vec3::X,
            Axis::Y => Vec3::Y,
            Axis::Z => Vec3::Z,
        }
    }
}

/// Obstacle shape in 3D, tagged once at authoring time so the encoder can
/// dispatch with a single exhaustive match. Only shapes the kernel can
/// represent are constructible.
#[derive(Component, Clone, Debug, PartialEq)]
pub enum Collider {
    Sphere {
        radius: f32,
    },
    Capsule {
        axis: Axis,
        /// Total length including both end caps, as authored.
        height: f32,
        radius: f32,
    },
    Box {
        /// Full edge lengths in local space.
        size: Vec3,
    },
}

impl Collider {
    /// Conservative world-space bounding radius for the loose broad phase.
    /// Overestimates are fine; the kernel does its own narrow tests.
    pub fn broad_radius(&self, scale: Vec3) -> f32 {
        let s = scale.abs().max_element();
        match self {
            Collider::Sphere { radius } => radius * s,
            Collider::Capsule { height, radius, .. } => (height * 0.5 + radius) * s,
            Collider::Box { size } => (*size * scale * 0.5).length(),
        }
    }
}

/// Obstacle shape in 2D. Encoded into the same 3D kernel primitives with a
/// synthesized depth, so flat scenes share the particle volume.
#[derive(Component, Clone, Debug, PartialEq)]
pub enum Collider2d {
    Circle { radius: f32 },
    Box { size: Vec2 },
}

impl Collider2d {
    pub fn broad_radius(&self, scale: Vec3) -> f32 {
        let s = scale.abs().max_element();
        match self {
            Collider2d::Circle { radius } => radius * s,
            Collider2d::Box { size } => (*size * scale.truncate() * 0.5).length(),
        }
    }
}

/// Marks a collider as a non-physical trigger region. The collection pass
/// never submits sensors to the kernel.
#[derive(Component, Default, Clone, Copy, Debug)]
pub struct Sensor;

/// Optional per-obstacle participation flags. An obstacle without this
/// component is submitted but never eligible for feedback.
#[derive(Component, Clone, Copy, Debug)]
pub struct ColliderResponse {
    /// Submit this obstacle to the kernel at all.
    pub send_collision: bool,
    /// Let particle contacts push back on this obstacle's rigid body.
    pub receive_collision: bool,
}

impl Default for ColliderResponse {
    fn default() -> Self {
        Self {
            send_collision: true,
            receive_collision: false,
        }
    }
}

impl ColliderResponse {
    pub fn receiving() -> Self {
        Self {
            send_collision: true,
            receive_collision: true,
        }
    }
}

/// Marks an obstacle entity as having a rigid body the host integrates.
/// Feedback impulses are only applied to obstacles carrying this marker
/// together with an [`ExternalImpulse`].
#[derive(Component, Default, Clone, Copy, Debug)]
pub struct RigidBody;

/// Accumulated impulse for the host's physics integration to consume and
/// reset. Applying at a point also accumulates the induced torque.
#[derive(Component, Default, Clone, Copy, Debug, PartialEq)]
pub struct ExternalImpulse {
    pub impulse: Vec3,
    pub torque: Vec3,
}

impl ExternalImpulse {
    pub fn apply_at_point(&mut self, impulse: Vec3, point: Vec3, center_of_mass: Vec3) {
        self.impulse += impulse;
        self.torque += (point - center_of_mass).cross(impulse);
    }
}

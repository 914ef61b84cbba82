use bevy::prelude::*;

use crate::collider::{Collider, Collider2d};
use crate::kernel::{KernelHandle, OwnerId};

/// One collider in the canonical form the kernel accepts. Created fresh per
/// tick, consumed by the step, discarded by the transient clear.
#[derive(Clone, Debug, PartialEq)]
pub enum ColliderPrimitive {
    Sphere {
        center: Vec3,
        radius: f32,
    },
    Capsule {
        start: Vec3,
        end: Vec3,
        radius: f32,
    },
    Box {
        world_from_local: Mat4,
        half_extents: Vec3,
    },
}

/// Canonicalize a 3D obstacle shape under its world transform.
///
/// Sphere and capsule radii only survive as single scalars, so non-uniform
/// scale is approximated: spheres take half the scale vector's magnitude,
/// capsule end caps take the x-axis scale. Capsule endpoints and box
/// orientation go through the full matrix and are exact.
pub fn encode_collider(shape: &Collider, transform: &GlobalTransform) -> ColliderPrimitive {
    let (scale, _, translation) = transform.to_scale_rotation_translation();
    match *shape {
        Collider::Sphere { radius } => ColliderPrimitive::Sphere {
            center: translation,
            radius: radius * scale.length() * 0.5,
        },
        Collider::Capsule {
            axis,
            height,
            radius,
        } => {
            let half_height = (height - radius * 2.0).max(0.0) * 0.5;
            let offset = axis.unit() * half_height;
            let matrix = transform.compute_matrix();
            ColliderPrimitive::Capsule {
                start: matrix.transform_point3(offset),
                end: matrix.transform_point3(-offset),
                radius: radius * scale.x,
            }
        }
        Collider::Box { size } => ColliderPrimitive::Box {
            world_from_local: transform.compute_matrix(),
            half_extents: size * 0.5,
        },
    }
}

/// Canonicalize a 2D obstacle shape. Circles become spheres scaled by the
/// x axis only; boxes get a synthesized depth equal to their x size so the
/// kernel's 3D primitive stays flat but non-degenerate.
pub fn encode_collider_2d(shape: &Collider2d, transform: &GlobalTransform) -> ColliderPrimitive {
    let (scale, _, translation) = transform.to_scale_rotation_translation();
    match *shape {
        Collider2d::Circle { radius } => ColliderPrimitive::Sphere {
            center: translation,
            radius: radius * scale.x,
        },
        Collider2d::Box { size } => ColliderPrimitive::Box {
            world_from_local: transform.compute_matrix(),
            half_extents: Vec3::new(size.x, size.y, size.x) * 0.5,
        },
    }
}

/// Hand a primitive to the kernel under the given owner.
pub fn submit(kernel: &mut KernelHandle, owner: OwnerId, primitive: ColliderPrimitive) {
    match primitive {
        ColliderPrimitive::Sphere { center, radius } => {
            kernel.add_sphere_collider(owner, center, radius);
        }
        ColliderPrimitive::Capsule { start, end, radius } => {
            kernel.add_capsule_collider(owner, start, end, radius);
        }
        ColliderPrimitive::Box {
            world_from_local,
            half_extents,
        } => {
            kernel.add_box_collider(owner, world_from_local, half_extents);
        }
    }
}

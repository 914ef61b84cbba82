use bevy::prelude::*;

use crate::collider::{ExternalImpulse, RigidBody};
use crate::collect::TickContext;
use crate::kernel::{KernelHandle, ParticleRecord};

/// Mutable access to rigid bodies for the duration of one dispatch call.
pub struct BodyWriter<'w, 's, 'a> {
    bodies: &'a mut Query<'w, 's, (&'static GlobalTransform, &'static mut ExternalImpulse), With<RigidBody>>,
}

impl BodyWriter<'_, '_, '_> {
    /// Apply an impulse at a world-space point. Returns false when the
    /// entity has no rigid body to push, which callers treat as a normal
    /// skip rather than an error.
    pub fn apply_impulse_at_point(&mut self, body: Entity, impulse: Vec3, point: Vec3) -> bool {
        match self.bodies.get_mut(body) {
            Ok((transform, mut external)) => {
                external.apply_at_point(impulse, point, transform.translation());
                true
            }
            Err(_) => false,
        }
    }
}

/// Consumes the per-tick particle buffer after the kernel step. Selected
/// once at app construction through [`FeedbackHandler`]; the buffer and
/// body access are only valid for the duration of the call.
pub trait CollisionFeedback: Send + Sync + 'static {
    fn handle(
        &mut self,
        particles: &[ParticleRecord],
        tick: &TickContext,
        bodies: &mut BodyWriter<'_, '_, '_>,
    );
}

/// Default responder: on the first tick of each contact span, push the
/// owning obstacle's rigid body with the particle's velocity scaled by the
/// tick's force multiplier. Sustained contact never re-fires; unresolvable
/// owners are skipped silently.
pub struct RigidBodyFeedback;

impl CollisionFeedback for RigidBodyFeedback {
    fn handle(
        &mut self,
        particles: &[ParticleRecord],
        tick: &TickContext,
        bodies: &mut BodyWriter<'_, '_, '_>,
    ) {
        if tick.force == 0.0 {
            return;
        }
        for particle in particles {
            if !particle.contact_began() {
                continue;
            }
            let Some(owner) = particle.hit_owner() else {
                continue;
            };
            let Some(body) = tick.body_of(owner) else {
                continue;
            };
            bodies.apply_impulse_at_point(
                body,
                particle.velocity * tick.force,
                particle.position,
            );
        }
    }
}

/// Adapter that forwards the raw buffer to a caller-supplied closure
/// instead of applying rigid-body impulses. Analytics, custom effects.
pub struct ParticleSink<F>(pub F);

impl<F> CollisionFeedback for ParticleSink<F>
where
    F: FnMut(usize, &[ParticleRecord]) + Send + Sync + 'static,
{
    fn handle(
        &mut self,
        particles: &[ParticleRecord],
        _tick: &TickContext,
        _bodies: &mut BodyWriter<'_, '_, '_>,
    ) {
        (self.0)(particles.len(), particles);
    }
}

/// The feedback implementation the dispatcher runs. Defaults to
/// [`RigidBodyFeedback`]; insert before adding the plugin to override.
#[derive(Resource)]
pub struct FeedbackHandler(pub Box<dyn CollisionFeedback>);

impl FeedbackHandler {
    pub fn rigid_body() -> Self {
        Self(Box::new(RigidBodyFeedback))
    }

    pub fn sink<F>(f: F) -> Self
    where
        F: FnMut(usize, &[ParticleRecord]) + Send + Sync + 'static,
    {
        Self(Box::new(ParticleSink(f)))
    }

    pub fn custom(handler: impl CollisionFeedback) -> Self {
        Self(Box::new(handler))
    }
}

/// Final tick phase: read back the particle buffer and hand it to the
/// configured feedback implementation together with this tick's obstacle
/// list.
pub fn dispatch_feedback(
    ctx: Res<TickContext>,
    kernel: Res<KernelHandle>,
    mut handler: ResMut<FeedbackHandler>,
    // Data lifetimes spelled out to match BodyWriter's field; &mut is
    // invariant, so elided function lifetimes would not unify.
    mut bodies: Query<'_, '_, (&'static GlobalTransform, &'static mut ExternalImpulse), With<RigidBody>>,
) {
    let particles = kernel.particles();
    let mut writer = BodyWriter {
        bodies: &mut bodies,
    };
    handler.0.handle(particles, &ctx, &mut writer);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collider::{Collider, ColliderResponse};
    use crate::collect::collect_colliders;
    use crate::kernel::test_kernel::RecordingKernel;
    use crate::kernel::NO_HIT;
    use crate::settings::BridgeSettings;
    use crate::tick::ParticleWorld;
    use std::sync::{Arc, Mutex};

    fn particle(hit: i32, hit_prev: i32, velocity: Vec3, position: Vec3) -> ParticleRecord {
        ParticleRecord {
            position,
            lifetime: 1.0,
            velocity,
            density: 0.0,
            hit,
            hit_prev,
        }
    }

    fn feedback_app(particles: Vec<ParticleRecord>, handler: FeedbackHandler) -> App {
        let (kernel, _log) = RecordingKernel::with_particles(particles);
        let mut app = App::new();
        app.insert_resource(KernelHandle::new(kernel))
            .init_resource::<BridgeSettings>()
            .init_resource::<TickContext>()
            .insert_resource(handler)
            .add_systems(Update, (collect_colliders, dispatch_feedback).chain());
        app.world_mut().spawn((
            ParticleWorld,
            GlobalTransform::from(Transform::from_scale(Vec3::splat(100.0))),
        ));
        app
    }

    fn spawn_receiving_body(app: &mut App) -> Entity {
        app.world_mut()
            .spawn((
                Collider::Box { size: Vec3::ONE },
                GlobalTransform::IDENTITY,
                ColliderResponse::receiving(),
                RigidBody,
                ExternalImpulse::default(),
            ))
            .id()
    }

    #[test]
    fn new_contact_applies_one_impulse() {
        let velocity = Vec3::new(3.0, 0.0, 0.0);
        let mut app = feedback_app(
            vec![particle(0, NO_HIT, velocity, Vec3::new(0.0, 1.0, 0.0))],
            FeedbackHandler::rigid_body(),
        );
        let body = spawn_receiving_body(&mut app);
        app.update();

        let impulse = app.world().get::<ExternalImpulse>(body).unwrap();
        assert_eq!(impulse.impulse, velocity); // default force multiplier 1.0
        // Impulse applied above the center of mass induces spin.
        assert_eq!(impulse.torque, Vec3::new(0.0, 1.0, 0.0).cross(velocity));
    }

    #[test]
    fn sustained_contact_never_refires() {
        let mut app = feedback_app(
            vec![particle(0, 0, Vec3::X, Vec3::ZERO)],
            FeedbackHandler::rigid_body(),
        );
        let body = spawn_receiving_body(&mut app);
        app.update();
        app.update();
        app.update();

        let impulse = app.world().get::<ExternalImpulse>(body).unwrap();
        assert_eq!(*impulse, ExternalImpulse::default());
    }

    #[test]
    fn only_transitioning_particles_contribute() {
        let mut app = feedback_app(
            vec![
                particle(0, NO_HIT, Vec3::X, Vec3::ZERO),
                particle(0, 0, Vec3::splat(100.0), Vec3::ZERO),
                particle(NO_HIT, NO_HIT, Vec3::splat(100.0), Vec3::ZERO),
            ],
            FeedbackHandler::rigid_body(),
        );
        let body = spawn_receiving_body(&mut app);
        app.update();

        let impulse = app.world().get::<ExternalImpulse>(body).unwrap();
        assert_eq!(impulse.impulse, Vec3::X);
    }

    #[test]
    fn zero_force_disables_feedback() {
        let mut app = feedback_app(
            vec![particle(0, NO_HIT, Vec3::X, Vec3::ZERO)],
            FeedbackHandler::rigid_body(),
        );
        app.world_mut().resource_mut::<BridgeSettings>().force = 0.0;
        let body = spawn_receiving_body(&mut app);
        app.update();

        let impulse = app.world().get::<ExternalImpulse>(body).unwrap();
        assert_eq!(*impulse, ExternalImpulse::default());
    }

    #[test]
    fn force_multiplier_scales_impulses() {
        let mut app = feedback_app(
            vec![particle(0, NO_HIT, Vec3::X, Vec3::ZERO)],
            FeedbackHandler::rigid_body(),
        );
        app.world_mut().resource_mut::<BridgeSettings>().force = 2.5;
        let body = spawn_receiving_body(&mut app);
        app.update();

        let impulse = app.world().get::<ExternalImpulse>(body).unwrap();
        assert_eq!(impulse.impulse, Vec3::new(2.5, 0.0, 0.0));
    }

    #[test]
    fn bodyless_obstacles_are_skipped_silently() {
        let mut app = feedback_app(
            vec![particle(0, NO_HIT, Vec3::X, Vec3::ZERO)],
            FeedbackHandler::rigid_body(),
        );
        // Receives collisions but carries no rigid body.
        app.world_mut().spawn((
            Collider::Box { size: Vec3::ONE },
            GlobalTransform::IDENTITY,
            ColliderResponse::receiving(),
        ));
        app.update(); // must not panic
    }

    #[test]
    fn out_of_range_owners_are_skipped_silently() {
        let mut app = feedback_app(
            vec![particle(7, NO_HIT, Vec3::X, Vec3::ZERO)],
            FeedbackHandler::rigid_body(),
        );
        let body = spawn_receiving_body(&mut app);
        app.update();

        let impulse = app.world().get::<ExternalImpulse>(body).unwrap();
        assert_eq!(*impulse, ExternalImpulse::default());
    }

    #[test]
    fn impulse_lands_on_the_obstacle_at_the_hit_index() {
        let mut app = feedback_app(
            vec![particle(3, NO_HIT, Vec3::Z, Vec3::ZERO)],
            FeedbackHandler::rigid_body(),
        );
        // Three non-receiving obstacles ahead of the receiver, all in one
        // archetype so collection order is spawn order.
        let mut entities = Vec::new();
        for i in 0..4 {
            let response = if i == 3 {
                ColliderResponse::receiving()
            } else {
                ColliderResponse::default()
            };
            entities.push(
                app.world_mut()
                    .spawn((
                        Collider::Sphere { radius: 1.0 },
                        GlobalTransform::from(Transform::from_xyz(i as f32, 0.0, 0.0)),
                        response,
                        RigidBody,
                        ExternalImpulse::default(),
                    ))
                    .id(),
            );
        }
        app.update();

        for (i, entity) in entities.iter().enumerate() {
            let impulse = app.world().get::<ExternalImpulse>(*entity).unwrap();
            if i == 3 {
                assert_eq!(impulse.impulse, Vec3::Z);
            } else {
                assert_eq!(*impulse, ExternalImpulse::default());
            }
        }
    }

    #[test]
    fn custom_sink_sees_the_whole_buffer_and_replaces_impulses() {
        let seen: Arc<Mutex<Vec<(usize, Vec<ParticleRecord>)>>> = Arc::default();
        let sink_seen = seen.clone();
        let mut app = feedback_app(
            vec![
                particle(0, NO_HIT, Vec3::X, Vec3::ZERO),
                particle(NO_HIT, NO_HIT, Vec3::Y, Vec3::ONE),
            ],
            FeedbackHandler::sink(move |count, particles| {
                sink_seen.lock().unwrap().push((count, particles.to_vec()));
            }),
        );
        let body = spawn_receiving_body(&mut app);
        app.update();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, 2);
        assert_eq!(seen[0].1[1].velocity, Vec3::Y);

        // The default rigid-body path did not run.
        let impulse = app.world().get::<ExternalImpulse>(body).unwrap();
        assert_eq!(*impulse, ExternalImpulse::default());
    }
}

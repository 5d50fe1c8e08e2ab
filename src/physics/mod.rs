//! Collision detection and rigid body simulation over a `hecs` world.
//!
//! # Architecture
//!
//! [`PhysicsWorld::update`] runs a fixed timestep loop. Every sub-step:
//!
//! 1. Integrate velocities, then positions (semi-implicit Euler)
//! 2. Broadphase collision detection (sort-and-sweep over AABBs)
//! 3. Narrowphase collision detection (closed forms, GJK/EPA fallback)
//! 4. Collision response (positional correction and impulses)
//!
//! The host owns the `hecs::World` and reports component changes through
//! [`PhysicsWorld::on_entity_component_added`] and
//! [`PhysicsWorld::on_entity_component_removed`], or reconciles in bulk with
//! [`PhysicsWorld::sync_rigidbodies`].

pub mod broadphase;
pub mod collider;
pub mod contact;
pub mod epa;
pub mod error;
pub mod geometry;
pub mod gjk;
pub mod narrowphase;
pub mod raycast;
pub mod response;
pub mod rigid_body;

#[cfg(test)]
mod test_util;

use std::collections::BTreeSet;

use glam::Vec3;
use tracing::{debug, trace, warn};

use crate::ecs::components::physics::{ColliderShape, ComponentKind, ComponentMask};

use self::broadphase::{BroadphaseCollision, SweepAndPrune};
use self::contact::{IntersectionInfo, NarrowphaseCollision};
use self::error::PhysicsError;
use self::narrowphase::NarrowphaseConfig;
use self::raycast::RaycastInfo;
use self::rigid_body::{RigidbodyState, RigidbodyStates};

/// Configuration for the physics simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicsConfig {
    /// Gravity vector. Default: (0, -9.81, 0).
    pub gravity: Vec3,
    /// Fixed timestep for physics updates in seconds. Default: 1/60.
    pub fixed_timestep: f64,
    /// Maximum number of sub-steps per update call. Default: 60.
    pub max_substeps: u32,
    /// GJK/EPA limits used by the narrowphase and [`PhysicsWorld::intersect`].
    pub narrowphase: NarrowphaseConfig,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.81, 0.0),
            fixed_timestep: 1.0 / 60.0,
            max_substeps: 60,
            narrowphase: NarrowphaseConfig::default(),
        }
    }
}

impl PhysicsConfig {
    pub fn validate(&self) -> Result<(), PhysicsError> {
        if !self.fixed_timestep.is_finite() || self.fixed_timestep <= 0.0 {
            return Err(PhysicsError::InvalidTimestep(self.fixed_timestep));
        }
        if self.max_substeps == 0 {
            return Err(PhysicsError::InvalidSubstepCap);
        }
        if !self.gravity.is_finite() {
            return Err(PhysicsError::InvalidGravity);
        }
        if self.narrowphase.gjk_max_iterations == 0 {
            return Err(PhysicsError::InvalidIterationCap("GJK"));
        }
        if self.narrowphase.epa_max_iterations == 0 {
            return Err(PhysicsError::InvalidIterationCap("EPA"));
        }
        let tolerance = self.narrowphase.epa_tolerance;
        if !tolerance.is_finite() || tolerance <= 0.0 {
            return Err(PhysicsError::InvalidTolerance(tolerance));
        }
        Ok(())
    }
}

/// The physics module: rigid body states plus the last step's collisions.
///
/// Starts stopped; call [`init`](Self::init) before [`update`](Self::update).
pub struct PhysicsWorld {
    config: PhysicsConfig,
    initialized: bool,
    accumulator: f64,
    rigidbodies: RigidbodyStates,
    broadphase: SweepAndPrune,
    broadphase_collisions: BTreeSet<BroadphaseCollision>,
    narrowphase_collisions: Vec<NarrowphaseCollision>,
}

impl PhysicsWorld {
    /// Create a new physics world with the given configuration.
    pub fn new(config: PhysicsConfig) -> Result<Self, PhysicsError> {
        config.validate()?;
        Ok(Self {
            config,
            initialized: false,
            accumulator: 0.0,
            rigidbodies: RigidbodyStates::new(),
            broadphase: SweepAndPrune::new(),
            broadphase_collisions: BTreeSet::new(),
            narrowphase_collisions: Vec::new(),
        })
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// Start the simulation from a clean state. Calling it again resets.
    pub fn init(&mut self) {
        self.reset();
        self.initialized = true;
        debug!("physics world initialized");
    }

    /// Drop all owned state and stop the simulation. Safe to call repeatedly.
    pub fn destroy(&mut self) {
        self.reset();
        if self.initialized {
            debug!("physics world destroyed");
        }
        self.initialized = false;
    }

    fn reset(&mut self) {
        self.accumulator = 0.0;
        self.rigidbodies.clear();
        self.broadphase = SweepAndPrune::new();
        self.broadphase_collisions.clear();
        self.narrowphase_collisions.clear();
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Component kinds that make an entity simulatable.
    pub fn component_mask(&self) -> ComponentMask {
        ComponentMask::RIGIDBODY | ComponentMask::COLLIDER
    }

    /// Notification that `entity` gained a component.
    ///
    /// A new rigid body starts at rest. Ignored while stopped.
    pub fn on_entity_component_added(&mut self, entity: hecs::Entity, kind: ComponentKind) {
        if !self.initialized {
            trace!(?entity, ?kind, "component added while stopped");
            return;
        }
        if kind == ComponentKind::RigidBody {
            self.rigidbodies.insert(entity, RigidbodyState::default());
        }
    }

    /// Notification that `entity` lost a component.
    ///
    /// Losing a rigid body or a collider drops every cached collision that
    /// references the entity.
    pub fn on_entity_component_removed(&mut self, entity: hecs::Entity, kind: ComponentKind) {
        match kind {
            ComponentKind::RigidBody => {
                self.rigidbodies.remove(&entity);
                self.forget_collisions(entity);
            }
            ComponentKind::Collider => self.forget_collisions(entity),
            ComponentKind::Transform => {}
        }
    }

    /// Notification that `entity` was despawned.
    pub fn on_entity_destroyed(&mut self, entity: hecs::Entity) {
        self.rigidbodies.remove(&entity);
        self.forget_collisions(entity);
    }

    fn forget_collisions(&mut self, entity: hecs::Entity) {
        self.broadphase_collisions
            .retain(|pair| !pair.involves(entity));
        self.narrowphase_collisions
            .retain(|collision| !collision.involves(entity));
    }

    /// Reconcile rigid body states with the [`RigidBody`] components in
    /// `world`, for hosts that do not send notifications.
    ///
    /// [`RigidBody`]: crate::ecs::components::physics::RigidBody
    pub fn sync_rigidbodies(&mut self, world: &hecs::World) {
        if !self.initialized {
            warn!("sync_rigidbodies called on a stopped physics world");
            return;
        }
        for entity in rigid_body::sync_states(world, &mut self.rigidbodies) {
            self.forget_collisions(entity);
        }
    }

    /// Step the physics simulation forward by `delta_time` seconds.
    ///
    /// Uses a fixed timestep accumulator. At most `max_substeps` sub-steps
    /// run per call; whole sub-steps beyond that are dropped.
    pub fn update(&mut self, world: &mut hecs::World, delta_time: f64) {
        if !self.initialized {
            warn!("update called on a stopped physics world");
            return;
        }
        if !delta_time.is_finite() || delta_time < 0.0 {
            warn!(delta_time, "ignoring invalid frame time");
            return;
        }

        let step = self.config.fixed_timestep;
        self.accumulator += delta_time;

        let mut substeps = 0u32;
        while self.accumulator >= step && substeps < self.config.max_substeps {
            self.fixed_step(world, step as f32);
            self.accumulator -= step;
            substeps += 1;
        }

        // Clamp accumulator to avoid spiral of death
        if self.accumulator >= step {
            let remainder = self.accumulator % step;
            debug!(
                substeps,
                dropped = self.accumulator - remainder,
                "sub-step cap reached, dropping backlog"
            );
            self.accumulator = remainder;
        }
    }

    fn fixed_step(&mut self, world: &mut hecs::World, dt: f32) {
        // 1. Integrate velocities and positions
        rigid_body::integrate(world, &mut self.rigidbodies, self.config.gravity, dt);

        // 2. Broadphase collision detection
        self.broadphase_collisions = self.broadphase.find_pairs(world);

        // 3. Narrowphase collision detection
        self.narrowphase_collisions = narrowphase::detect_collisions(
            world,
            &self.broadphase_collisions,
            &self.config.narrowphase,
        );

        // 4. Collision response
        response::resolve_collisions(world, &mut self.rigidbodies, &self.narrowphase_collisions);

        trace!(
            bodies = self.rigidbodies.len(),
            candidates = self.broadphase_collisions.len(),
            contacts = self.narrowphase_collisions.len(),
            "physics step"
        );
    }

    /// One-shot intersection query between two world-space shapes.
    pub fn intersect(
        &self,
        shape1: &ColliderShape,
        shape2: &ColliderShape,
    ) -> Option<IntersectionInfo> {
        narrowphase::intersect(shape1, shape2, &self.config.narrowphase)
    }

    /// Cast a ray against every collider in `world`; see [`raycast::raycast`].
    pub fn raycast(
        &self,
        world: &hecs::World,
        origin: Vec3,
        direction: Vec3,
        t_min: f32,
        t_max: f32,
    ) -> Vec<RaycastInfo> {
        raycast::raycast(world, origin, direction, t_min, t_max)
    }

    pub fn rigidbody_state(&self, entity: hecs::Entity) -> Option<&RigidbodyState> {
        self.rigidbodies.get(&entity)
    }

    /// Mutable state, e.g. to give a body an initial velocity.
    pub fn rigidbody_state_mut(&mut self, entity: hecs::Entity) -> Option<&mut RigidbodyState> {
        self.rigidbodies.get_mut(&entity)
    }

    pub fn rigidbody_count(&self) -> usize {
        self.rigidbodies.len()
    }

    /// Candidate pairs found by the last sub-step.
    pub fn broadphase_collisions(&self) -> &BTreeSet<BroadphaseCollision> {
        &self.broadphase_collisions
    }

    /// Contacts found by the last sub-step.
    pub fn narrowphase_collisions(&self) -> &[NarrowphaseCollision] {
        &self.narrowphase_collisions
    }

    /// Simulation time accumulated but not yet stepped, in seconds.
    pub fn pending_time(&self) -> f64 {
        self.accumulator
    }
}

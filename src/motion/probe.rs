//! Motion domain: contact probing and surface classification.
//!
//! The probe takes one batch of overlap samples per fixed tick (fetched by
//! `systems::collisions`), classifies each contact normal against the up axis
//! and rebuilds the aggregate [`ContactState`] from scratch. Observers get
//! entry/stay/exit notifications; contact identity across ticks is the pair
//! (collider entity, contact normal).
//!
//! The classification is an axis-aligned heuristic and is only valid for
//! upright box colliders. Known limitation: a contacting body rotating in
//! place changes its contact normal without the probe moving, which churns
//! the identity pairs and fires spurious entry/exit notifications.

use bevy::prelude::*;

/// cos(45°); normals steeper than this count as ground/ceiling.
const SURFACE_THRESHOLD: f32 = std::f32::consts::FRAC_1_SQRT_2;
/// Normals within this distance are the same contact across ticks.
const NORMAL_IDENTITY_EPSILON: f32 = 1.0e-3;

/// One overlap hit, recreated every probe tick. Never outlives the
/// current/previous tick pair.
#[derive(Debug, Clone, Copy)]
pub struct ContactSample {
    pub entity: Entity,
    /// Outward surface normal of the touched collider at the contact.
    pub normal: Vec2,
    pub point: Vec2,
}

impl ContactSample {
    fn same_contact(&self, other: &ContactSample) -> bool {
        self.entity == other.entity
            && (self.normal - other.normal).length_squared()
                < NORMAL_IDENTITY_EPSILON * NORMAL_IDENTITY_EPSILON
    }
}

/// What a single contact normal says about the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SurfaceContacts {
    pub grounded: bool,
    pub ceiling: bool,
    /// -1 wall on the left, 1 wall on the right, 0 no wall.
    pub wall_dir: i8,
}

/// Classify a contact normal by a fixed angular threshold against the up axis.
pub fn classify_normal(normal: Vec2) -> SurfaceContacts {
    let mut contacts = SurfaceContacts::default();
    if normal.y >= SURFACE_THRESHOLD {
        contacts.grounded = true;
    } else if normal.y <= -SURFACE_THRESHOLD {
        contacts.ceiling = true;
    } else if normal.x.abs() >= SURFACE_THRESHOLD {
        // Normal points away from the wall, so the wall sits on the other side.
        contacts.wall_dir = if normal.x < 0.0 { 1 } else { -1 };
    }
    contacts
}

/// Aggregate contact flags for the current tick. Owned by [`ContactProbe`];
/// everything else reads a copy. Rebuilt from scratch every tick: grounded and
/// ceiling are the OR across all samples, `wall_dir` keeps the first non-zero
/// classification encountered.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ContactState {
    pub grounded: bool,
    pub ceiling: bool,
    pub wall_dir: i8,
    pub hit_count: usize,
}

impl ContactState {
    pub fn is_walling(&self) -> bool {
        self.wall_dir != 0
    }

    pub fn is_colliding(&self) -> bool {
        self.grounded || self.ceiling || self.is_walling()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactPhase {
    Entry,
    Stay,
    Exit,
}

/// Notification handed to observers during a probe tick.
#[derive(Debug, Clone, Copy)]
pub struct ContactEvent {
    pub phase: ContactPhase,
    pub sample: ContactSample,
    /// Classification of this sample's normal.
    pub surface: SurfaceContacts,
    /// Aggregate state of the tick the event belongs to. For exits this is
    /// the new state the contact is no longer part of.
    pub contacts: ContactState,
}

type Observer<C> = Box<dyn FnMut(&mut C, &ContactEvent) + Send + Sync>;

/// Per-tick contact classifier with enter/stay/exit notification.
///
/// `tick` must run exactly once per fixed step, before any consumer reads the
/// state. Observers form an explicit ordered list and run synchronously; they
/// receive the context, never the sample set being iterated.
pub struct ContactProbe<C> {
    state: ContactState,
    last: Vec<ContactSample>,
    max_hits: usize,
    observers: Vec<Observer<C>>,
}

impl<C> ContactProbe<C> {
    pub fn new(max_hits: usize) -> Self {
        Self {
            state: ContactState::default(),
            last: Vec::with_capacity(max_hits),
            max_hits,
            observers: Vec::new(),
        }
    }

    /// Register an observer. Observers run in registration order.
    pub fn observe(&mut self, observer: impl FnMut(&mut C, &ContactEvent) + Send + Sync + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn state(&self) -> &ContactState {
        &self.state
    }

    /// Samples of the most recent tick.
    pub fn samples(&self) -> &[ContactSample] {
        &self.last
    }

    /// Process one tick worth of overlap samples. Self-collisions are already
    /// excluded by the query filter upstream. Within the tick, exits fire
    /// first (against the old sample set), then stays for every current
    /// sample, then entries for samples absent last tick.
    pub fn tick(&mut self, mut samples: Vec<ContactSample>, ctx: &mut C) {
        samples.truncate(self.max_hits);

        // Rebuild the aggregate before any notification goes out so every
        // observer sees this tick's state.
        let mut state = ContactState {
            hit_count: samples.len(),
            ..ContactState::default()
        };
        for sample in &samples {
            let surface = classify_normal(sample.normal);
            state.grounded = state.grounded || surface.grounded;
            state.ceiling = state.ceiling || surface.ceiling;
            if state.wall_dir == 0 {
                state.wall_dir = surface.wall_dir;
            }
        }
        self.state = state;

        for lost in &self.last {
            if !samples.iter().any(|s| s.same_contact(lost)) {
                Self::notify(&mut self.observers, ctx, ContactPhase::Exit, *lost, state);
            }
        }
        for sample in &samples {
            Self::notify(&mut self.observers, ctx, ContactPhase::Stay, *sample, state);
        }
        for sample in &samples {
            if !self.last.iter().any(|l| l.same_contact(sample)) {
                Self::notify(&mut self.observers, ctx, ContactPhase::Entry, *sample, state);
            }
        }

        self.last = samples;
    }

    fn notify(
        observers: &mut [Observer<C>],
        ctx: &mut C,
        phase: ContactPhase,
        sample: ContactSample,
        contacts: ContactState,
    ) {
        let event = ContactEvent {
            phase,
            surface: classify_normal(sample.normal),
            sample,
            contacts,
        };
        for observer in observers.iter_mut() {
            observer(ctx, &event);
        }
    }
}

impl<C> std::fmt::Debug for ContactProbe<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContactProbe")
            .field("state", &self.state)
            .field("max_hits", &self.max_hits)
            .field("observers", &self.observers.len())
            .finish()
    }
}

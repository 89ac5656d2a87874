//! Motion domain: buffered action requests and cooperative countdowns.
//!
//! One mechanism generalizes input buffering, coyote windows and multi-tick
//! action playback: a [`RequestSlot`] holds at most one pending request and at
//! most one active timed phase for its role. The pending request's readiness
//! predicate is re-evaluated every tick until it fires or its buffer window
//! expires; expiry is the designed "miss" outcome of input buffering and drops
//! the request without any callback.
//!
//! Pre-emption semantics: `force` replaces the pending request and aborts any
//! in-flight phase of the slot silently; the completion callback of an
//! aborted phase never runs. Phases and countdowns are cooperative: one
//! callback per tick with monotonically increasing progress, never blocking.

type Action<C> = Box<dyn FnMut(&mut C) + Send + Sync>;
type Predicate<C> = Box<dyn Fn(&C) -> bool + Send + Sync>;
type ProgressFn<C> = Box<dyn FnMut(&mut C, f32) + Send + Sync>;

/// A bounded multi-tick follow-through declared by a request: the progress
/// callback runs every fixed step with elapsed/duration in 0..=1, then the
/// completion callback runs once.
pub struct TimedPhase<C> {
    pub duration: f32,
    pub on_tick: ProgressFn<C>,
    pub on_complete: Action<C>,
}

/// A buffered, conditionally-executed action.
pub struct Request<C> {
    pub action: Action<C>,
    pub ready: Predicate<C>,
    /// Seconds the request survives while `ready` stays false.
    pub buffer: f32,
    pub phase: Option<TimedPhase<C>>,
}

struct Pending<C> {
    request: Request<C>,
    remaining: f32,
}

struct ActivePhase<C> {
    phase: TimedPhase<C>,
    elapsed: f32,
}

/// Pending-request and phase storage for a single action role.
pub struct RequestSlot<C> {
    pending: Option<Pending<C>>,
    phase: Option<ActivePhase<C>>,
}

impl<C> Default for RequestSlot<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> RequestSlot<C> {
    pub fn new() -> Self {
        Self {
            pending: None,
            phase: None,
        }
    }

    /// Install `request` as this role's pending request, replacing any
    /// previous pending one and silently aborting an in-flight phase.
    pub fn force(&mut self, request: Request<C>) {
        self.phase = None;
        self.pending = Some(Pending {
            remaining: request.buffer,
            request,
        });
    }

    /// Drop the pending request and the active phase without running anything.
    pub fn abort(&mut self) {
        self.pending = None;
        self.phase = None;
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn phase_active(&self) -> bool {
        self.phase.is_some()
    }

    /// Frame-step tick: fire the pending request if it just became ready,
    /// otherwise run down its buffer window and drop it on expiry.
    pub fn tick_frame(&mut self, dt: f32, ctx: &mut C) {
        if self.try_fire(ctx) {
            return;
        }
        if let Some(pending) = &mut self.pending {
            pending.remaining -= dt;
            if pending.remaining <= 0.0 {
                self.pending = None;
            }
        }
    }

    /// Fixed-step tick: fire the pending request if ready, then service the
    /// active phase.
    pub fn tick_fixed(&mut self, dt: f32, ctx: &mut C) {
        self.try_fire(ctx);

        let mut finished = false;
        if let Some(active) = &mut self.phase {
            active.elapsed += dt;
            let progress = (active.elapsed / active.phase.duration).min(1.0);
            (active.phase.on_tick)(ctx, progress);
            finished = active.elapsed >= active.phase.duration;
        }
        if finished
            && let Some(mut done) = self.phase.take()
        {
            (done.phase.on_complete)(ctx);
        }
    }

    fn try_fire(&mut self, ctx: &mut C) -> bool {
        if !self
            .pending
            .as_ref()
            .is_some_and(|pending| (pending.request.ready)(ctx))
        {
            return false;
        }
        let Some(mut pending) = self.pending.take() else {
            return false;
        };
        (pending.request.action)(ctx);
        if let Some(phase) = pending.request.phase {
            // First progress callback lands on the next fixed tick.
            self.phase = Some(ActivePhase { phase, elapsed: 0.0 });
        }
        true
    }
}

impl<C> std::fmt::Debug for RequestSlot<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSlot")
            .field("pending", &self.pending.is_some())
            .field("phase", &self.phase.is_some())
            .finish()
    }
}

/// A scheduled countdown: progress callback per tick, completion callback at
/// the end, optional abort predicate checked before each tick. Aborting it,
/// whether by predicate or by handle, discards it without completion.
pub struct Countdown<C> {
    duration: f32,
    elapsed: f32,
    on_tick: Option<ProgressFn<C>>,
    on_complete: Option<Action<C>>,
    abort_when: Option<Predicate<C>>,
}

pub(crate) enum CountdownStatus {
    Running,
    Finished,
    Aborted,
}

impl<C> Countdown<C> {
    pub fn new(duration: f32) -> Self {
        Self {
            duration,
            elapsed: 0.0,
            on_tick: None,
            on_complete: None,
            abort_when: None,
        }
    }

    pub fn on_tick(mut self, f: impl FnMut(&mut C, f32) + Send + Sync + 'static) -> Self {
        self.on_tick = Some(Box::new(f));
        self
    }

    pub fn on_complete(mut self, f: impl FnMut(&mut C) + Send + Sync + 'static) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }

    pub fn abort_when(mut self, f: impl Fn(&C) -> bool + Send + Sync + 'static) -> Self {
        self.abort_when = Some(Box::new(f));
        self
    }

    fn tick(&mut self, dt: f32, ctx: &mut C) -> CountdownStatus {
        if let Some(abort) = &self.abort_when
            && abort(ctx)
        {
            return CountdownStatus::Aborted;
        }
        self.elapsed += dt;
        let progress = if self.duration <= 0.0 {
            1.0
        } else {
            (self.elapsed / self.duration).min(1.0)
        };
        if let Some(on_tick) = &mut self.on_tick {
            on_tick(ctx, progress);
        }
        if self.elapsed >= self.duration {
            if let Some(on_complete) = &mut self.on_complete {
                on_complete(ctx);
            }
            return CountdownStatus::Finished;
        }
        CountdownStatus::Running
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerHandle(u64);

/// Per-instance countdown scheduler with explicit abort handles. Owned by the
/// controller; there is no process-wide scheduling state.
pub struct TimerPool<C> {
    next_id: u64,
    timers: Vec<(TimerHandle, Countdown<C>)>,
}

impl<C> Default for TimerPool<C> {
    fn default() -> Self {
        Self {
            next_id: 0,
            timers: Vec::new(),
        }
    }
}

impl<C> TimerPool<C> {
    pub fn start(&mut self, countdown: Countdown<C>) -> TimerHandle {
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        self.timers.push((handle, countdown));
        handle
    }

    /// Discard a countdown without running its completion callback.
    pub fn abort(&mut self, handle: TimerHandle) {
        self.timers.retain(|(h, _)| *h != handle);
    }

    pub fn is_running(&self, handle: TimerHandle) -> bool {
        self.timers.iter().any(|(h, _)| *h == handle)
    }

    pub fn tick(&mut self, dt: f32, ctx: &mut C) {
        let mut i = 0;
        while i < self.timers.len() {
            match self.timers[i].1.tick(dt, ctx) {
                CountdownStatus::Running => i += 1,
                CountdownStatus::Finished | CountdownStatus::Aborted => {
                    self.timers.remove(i);
                }
            }
        }
    }
}

impl<C> std::fmt::Debug for TimerPool<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerPool")
            .field("timers", &self.timers.len())
            .finish()
    }
}

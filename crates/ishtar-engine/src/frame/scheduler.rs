use crate::asset::{AssetError, AssetRegistry, BindingKey, BundleLoader, TextStore};
use crate::core::{App, FrameCtx, StartupReport};
use crate::event::{Drained, Event, EventQueue, EventRouter, Notifier};
use crate::input::{InputFrame, InputState};
use crate::time::{FrameClock, FrameTime};

use super::restart::RestartController;

/// Where the scheduler is within the current frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum SchedulerPhase {
    Idle,
    CollectingEvents,
    Restarting,
    Dispatching,
    Rendering,
}

/// Result of one frame.
#[derive(Debug)]
pub struct FrameOutput<V> {
    pub view: V,
    pub time: FrameTime,

    /// Events handed to `App::update` this frame, tick included.
    pub delivered: usize,

    /// True when this frame re-ran initialization.
    pub restarted: bool,

    /// Submissions the router refused while this frame ran. Never queued.
    pub rejected: Vec<AssetError>,
}

/// Drives an [`App`] one frame at a time.
///
/// Sole owner of the event queue's read side. Built by
/// [`EngineBuilder::build`](crate::core::EngineBuilder::build), which has
/// already resolved startup assets and run `App::init`.
pub struct FrameScheduler<A: App> {
    app:         A,
    state:       Option<A::State>,
    view_model:  A::ViewModel,
    queue:       EventQueue,
    router:      EventRouter,
    registry:    AssetRegistry,
    texts:       TextStore,
    restart:     RestartController,
    clock:       FrameClock,
    input_state: InputState,
    input_frame: InputFrame,
    phase:       SchedulerPhase,
    phase_path:  Vec<SchedulerPhase>,
    startup:     StartupReport,
}

impl<A: App> FrameScheduler<A> {
    pub(crate) fn start(
        app: A,
        queue: EventQueue,
        router: EventRouter,
        registry: AssetRegistry,
        texts: TextStore,
        clock: FrameClock,
        startup: StartupReport,
    ) -> Self {
        let mut scheduler = Self {
            app,
            state: None,
            view_model: A::ViewModel::default(),
            queue,
            router,
            registry,
            texts,
            restart: RestartController::new(),
            clock,
            input_state: InputState::default(),
            input_frame: InputFrame::default(),
            phase: SchedulerPhase::Idle,
            phase_path: Vec::new(),
            startup,
        };

        let mut rejected = Vec::new();
        let state = scheduler.initialize(&mut rejected);
        scheduler.state = Some(state);
        log_rejected(&rejected);
        scheduler
    }

    /// Runs one frame and returns its view.
    ///
    /// Never blocks on asset I/O: completions that have not reached the
    /// queue yet are simply picked up by a later frame.
    pub fn step(&mut self) -> FrameOutput<A::View> {
        self.phase_path.clear();
        self.set_phase(SchedulerPhase::CollectingEvents);
        let Drained { mut events, restarts, deferred } = self.queue.drain();
        let mut rejected = Vec::new();

        // Immediate work raised off-thread runs now; its notices are queued
        // for the next frame like any other.
        rejected.extend(self.router.route_all(deferred));

        let triggers: Vec<BindingKey> = restarts
            .into_iter()
            .filter(|k| self.router.bundles().is_live(k))
            .collect();
        if !triggers.is_empty() {
            self.router.bundles().cancel_all_except(&triggers);
        }
        self.router.bundles().admit(&mut events);

        self.set_phase(SchedulerPhase::Dispatching);
        let restarted = !triggers.is_empty();
        if restarted {
            // The reset happens before the first update of the frame, so no
            // event is ever applied to the discarded state.
            self.set_phase(SchedulerPhase::Restarting);
            events = self.restart(&triggers, events, &mut rejected);
            self.set_phase(SchedulerPhase::CollectingEvents);
            self.set_phase(SchedulerPhase::Dispatching);
        }

        let time = self.clock.tick();
        events.push(Event::Tick(time));
        log::trace!("frame {}: delivering {} events", time.frame_index, events.len());

        let mut state = match self.state.take() {
            Some(state) => state,
            None => self.initialize(&mut rejected),
        };
        for event in &events {
            let (next, emitted) = self.app.update(state, event);
            state = next;
            rejected.extend(self.router.route_all(emitted));
        }

        self.set_phase(SchedulerPhase::Rendering);
        self.input_frame.clear();
        for event in &events {
            if let Event::Input(ev) = event {
                self.input_state.apply_event(&mut self.input_frame, ev.clone());
            }
        }

        let view = {
            let ctx = FrameCtx {
                state:       &state,
                input:       &self.input_state,
                input_frame: &self.input_frame,
                assets:      &self.registry,
                time,
            };
            self.app.update_view_model(&mut self.view_model, &ctx);
            self.app.view(&self.view_model, &ctx)
        };
        self.state = Some(state);

        let delivered = events.len();
        drop(events);
        self.input_frame.clear();
        log_rejected(&rejected);
        self.set_phase(SchedulerPhase::Idle);

        FrameOutput { view, time, delivered, restarted, rejected }
    }

    /// Routes an event from outside the frame (host input, timers).
    ///
    /// Queued events land in the next frame.
    pub fn submit(&mut self, event: Event) -> Result<(), AssetError> {
        self.router.route(event)
    }

    /// Handle for reporting completions from other threads.
    pub fn notifier(&self) -> Notifier {
        self.router.notifier()
    }

    pub fn phase(&self) -> SchedulerPhase {
        self.phase
    }

    /// Phases entered by the most recent [`step`](Self::step), in order.
    pub fn phase_path(&self) -> &[SchedulerPhase] {
        &self.phase_path
    }

    pub fn registry(&self) -> &AssetRegistry {
        &self.registry
    }

    pub fn bundles(&self) -> &BundleLoader {
        self.router.bundles()
    }

    pub fn startup_report(&self) -> &StartupReport {
        &self.startup
    }

    pub fn restarts(&self) -> u64 {
        self.restart.restarts()
    }

    /// Current application state, between frames.
    pub fn state(&self) -> Option<&A::State> {
        self.state.as_ref()
    }

    pub fn app(&self) -> &A {
        &self.app
    }

    pub fn app_mut(&mut self) -> &mut A {
        &mut self.app
    }

    /// Resets the frame clock baseline, e.g. after the host was suspended.
    pub fn reset_clock(&mut self) {
        self.clock.reset();
    }

    /// Discards the running state and re-runs initialization, keeping only
    /// what the fresh state may still consume.
    fn restart(
        &mut self,
        triggers: &[BindingKey],
        events: Vec<Event>,
        rejected: &mut Vec<AssetError>,
    ) -> Vec<Event> {
        let keys: Vec<&str> = triggers.iter().map(BindingKey::as_str).collect();
        log::info!("restarting application for text bundle(s): {}", keys.join(", "));

        self.restart.record();
        self.state = None;
        self.view_model = A::ViewModel::default();
        let state = self.initialize(rejected);
        self.state = Some(state);

        RestartController::carry_over(triggers, events)
    }

    fn initialize(&mut self, rejected: &mut Vec<AssetError>) -> A::State {
        let startup = self.texts.snapshot();
        let (state, emitted) = self.app.init(&startup);
        rejected.extend(self.router.route_all(emitted));
        state
    }

    fn set_phase(&mut self, phase: SchedulerPhase) {
        log::trace!("scheduler {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
        self.phase_path.push(phase);
    }
}

fn log_rejected(rejected: &[AssetError]) {
    for err in rejected {
        log::error!("submission rejected: {err}");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::asset::fixtures::png;
    use crate::asset::{AssetDescriptor, AssetRequest, BundleEvent, MemoryFetcher, StartupContext};
    use crate::core::EngineBuilder;
    use crate::event::Route;
    use crate::input::{ButtonState, InputEvent, Key, Modifiers};
    use crate::services::StorageRequest;

    /// Records every event it sees, per frame, and echoes `Navigate` as a
    /// custom event.
    #[derive(Default)]
    struct Tracer {
        frames:  Vec<Vec<String>>,
        current: Vec<String>,
        emit:    Vec<Event>,
        on_tick: Vec<Event>,
    }

    fn label(ev: &Event) -> String {
        match ev {
            Event::Tick(_) => "tick".into(),
            Event::Navigate(r) => format!("nav:{}", r.scene),
            Event::Custom(c) => format!("custom:{}", c.tag()),
            Event::Bundle(BundleEvent::Started { key }) => format!("started:{key}"),
            Event::Bundle(BundleEvent::Progress { key, .. }) => format!("progress:{key}"),
            Event::Bundle(BundleEvent::Success { key }) => format!("success:{key}"),
            Event::Bundle(BundleEvent::Failure { key, .. }) => format!("failure:{key}"),
            Event::Input(_) => "input".into(),
            other => format!("{other:?}"),
        }
    }

    impl App for Tracer {
        type State = u32;
        type ViewModel = u32;
        type View = (u32, usize);

        fn init(&mut self, _: &StartupContext) -> (u32, Vec<Event>) {
            (0, std::mem::take(&mut self.emit))
        }

        fn update(&mut self, state: u32, event: &Event) -> (u32, Vec<Event>) {
            self.current.push(label(event));
            let mut emitted = match event {
                Event::Navigate(r) => vec![Event::custom(r.scene.clone(), ())],
                _ => Vec::new(),
            };
            if event.is_tick() {
                self.frames.push(std::mem::take(&mut self.current));
                emitted.append(&mut self.on_tick);
            }
            (state + 1, emitted)
        }

        fn update_view_model(&mut self, vm: &mut u32, ctx: &FrameCtx<'_, u32>) {
            *vm = *ctx.state;
        }

        fn view(&mut self, vm: &u32, ctx: &FrameCtx<'_, u32>) -> (u32, usize) {
            (*vm, ctx.input.keys_down.len())
        }
    }

    fn scheduler(tracer: Tracer) -> FrameScheduler<Tracer> {
        let fetcher = MemoryFetcher::new()
            .with("a.png", png(2, 2, [1, 2, 3, 255]))
            .with("t.txt", b"chapter one".to_vec());
        EngineBuilder::new()
            .fetcher(Arc::new(fetcher))
            .build(tracer)
            .unwrap()
    }

    // ── ordering ──────────────────────────────────────────────────────────

    #[test]
    fn tick_is_last_and_emissions_wait_a_frame() {
        let tracer = Tracer { emit: vec![Event::Navigate(Route::new("menu"))], ..Tracer::default() };
        let mut s = scheduler(tracer);

        s.step();
        s.step();
        s.step();

        let frames = &s.app().frames;
        assert_eq!(frames[0], vec!["nav:menu", "tick"]);
        assert_eq!(frames[1], vec!["custom:menu", "tick"]);
        assert_eq!(frames[2], vec!["tick"]);
    }

    #[test]
    fn state_threads_across_frames_and_phase_returns_to_idle() {
        let mut s = scheduler(Tracer::default());
        assert_eq!(s.phase(), SchedulerPhase::Idle);

        let first = s.step();
        let second = s.step();
        assert_eq!(first.view.0, 1);
        assert_eq!(second.view.0, 2);
        assert_eq!(second.delivered, 1);
        assert_eq!(s.phase(), SchedulerPhase::Idle);
        assert!(second.time.frame_index > first.time.frame_index);
    }

    // ── phases ────────────────────────────────────────────────────────────

    #[test]
    fn plain_frame_walks_the_main_cycle() {
        use SchedulerPhase::*;
        let mut s = scheduler(Tracer::default());
        s.step();
        assert_eq!(s.phase_path(), &[CollectingEvents, Dispatching, Rendering, Idle]);
    }

    #[test]
    fn restart_branches_off_dispatching() {
        use SchedulerPhase::*;
        let mut s = scheduler(Tracer::default());
        s.submit(bundle("story", AssetDescriptor::text("t", "t.txt"))).unwrap();
        s.bundles().wait_idle();

        assert!(s.step().restarted);
        assert_eq!(s.phase_path(), &[
            CollectingEvents,
            Dispatching,
            Restarting,
            CollectingEvents,
            Dispatching,
            Rendering,
            Idle,
        ]);
    }

    // ── deferred requests ─────────────────────────────────────────────────

    #[test]
    fn notifier_request_runs_at_boundary_and_notice_follows() {
        let mut s = scheduler(Tracer::default());
        s.notifier().notify(Event::Storage(StorageRequest::Save { key: "slot".into(), data: vec![7] }));

        let first = s.step();
        assert!(first.rejected.is_empty());
        s.step();

        let frames = &s.app().frames;
        assert_eq!(frames[0], vec!["tick"]);
        assert!(frames[1][0].starts_with("StorageNotice(Saved"));
    }

    // ── input ─────────────────────────────────────────────────────────────

    #[test]
    fn input_state_is_derived_from_delivered_input() {
        let mut s = scheduler(Tracer::default());
        s.submit(Event::Input(InputEvent::Key {
            key: Key::Space,
            state: ButtonState::Pressed,
            modifiers: Modifiers::default(),
            code: 0,
            repeat: false,
        }))
        .unwrap();

        assert_eq!(s.step().view.1, 1);
        // Held keys persist even without new events.
        assert_eq!(s.step().view.1, 1);
    }

    // ── rejections ────────────────────────────────────────────────────────

    fn bundle(key: &str, asset: AssetDescriptor) -> Event {
        Event::Asset(AssetRequest::LoadBundle { key: key.into(), assets: vec![asset] })
    }

    #[test]
    fn host_submission_conflict_is_returned() {
        let mut s = scheduler(Tracer::default());
        s.submit(bundle("k", AssetDescriptor::image("a", "a.png"))).unwrap();
        let err = s.submit(bundle("k", AssetDescriptor::image("a", "a.png"))).unwrap_err();
        assert!(matches!(err, AssetError::DuplicateKeyInFlight { .. }));

        s.bundles().wait_idle();
        s.step();
        let frame = &s.app().frames[0];
        assert_eq!(frame.iter().filter(|l| l.starts_with("started:")).count(), 1);
        assert_eq!(frame.last().map(String::as_str), Some("tick"));
    }

    #[test]
    fn app_submission_conflict_lands_in_frame_output() {
        let mut s = scheduler(Tracer::default());
        s.submit(bundle("k", AssetDescriptor::image("a", "a.png"))).unwrap();
        s.app_mut().on_tick = vec![bundle("other", AssetDescriptor::audio("a", "a.png"))];

        let out = s.step();
        assert!(matches!(out.rejected.as_slice(), [AssetError::DuplicateNameConflict { .. }]));

        s.bundles().wait_idle();
        s.step();
        assert!(s.app().frames.concat().iter().all(|l| !l.ends_with(":other")));
    }
}

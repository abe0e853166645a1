use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::core::{App, AppControl};
use crate::event::Event;
use crate::frame::FrameScheduler;
use crate::input::{translate_window_event, InputFrame, InputState};
use crate::time::FrameTime;

/// Host loop configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,

    /// Initial window size in logical pixels.
    pub initial_size: (f64, f64),

    /// Stop after this many frames. `None` runs until the presenter exits.
    pub frame_limit: Option<u64>,

    /// Headless pacing; frames that finish early sleep for the rest.
    pub target_frame_time: Duration,

    /// Open a window instead of running headless.
    pub windowed: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title:             "ishtar".to_string(),
            initial_size:      (1280.0, 720.0),
            frame_limit:       None,
            target_frame_time: Duration::from_millis(16),
            windowed:          false,
        }
    }
}

/// Consumer of each frame's view. The renderer lives behind this.
pub trait Presenter<V> {
    fn present(&mut self, view: &V, time: &FrameTime) -> AppControl;
}

impl<V, F> Presenter<V> for F
where
    F: FnMut(&V, &FrameTime) -> AppControl,
{
    fn present(&mut self, view: &V, time: &FrameTime) -> AppControl {
        self(view, time)
    }
}

/// Entry point for the host loops.
pub struct Runtime;

impl Runtime {
    /// Runs headless or windowed per `config.windowed`. Returns the number
    /// of frames stepped.
    pub fn run<A, P>(config: &RuntimeConfig, scheduler: &mut FrameScheduler<A>, presenter: &mut P) -> Result<u64>
    where
        A: App,
        P: Presenter<A::View>,
    {
        if config.windowed {
            Self::run_windowed(config, scheduler, presenter)
        } else {
            Self::run_headless(config, scheduler, presenter)
        }
    }

    /// Steps frames on the calling thread at `target_frame_time` pace.
    pub fn run_headless<A, P>(
        config: &RuntimeConfig,
        scheduler: &mut FrameScheduler<A>,
        presenter: &mut P,
    ) -> Result<u64>
    where
        A: App,
        P: Presenter<A::View>,
    {
        log::info!("headless runtime started");
        let mut frames = 0u64;

        while !limit_reached(config, frames) {
            let started = Instant::now();
            let out = scheduler.step();
            frames += 1;

            if presenter.present(&out.view, &out.time) == AppControl::Exit {
                log::info!("presenter requested exit at frame {}", out.time.frame_index);
                break;
            }

            if let Some(rest) = config.target_frame_time.checked_sub(started.elapsed()) {
                std::thread::sleep(rest);
            }
        }

        Ok(frames)
    }

    /// Opens a window and steps one frame per redraw. Window input is
    /// submitted as queued input events.
    pub fn run_windowed<A, P>(
        config: &RuntimeConfig,
        scheduler: &mut FrameScheduler<A>,
        presenter: &mut P,
    ) -> Result<u64>
    where
        A: App,
        P: Presenter<A::View>,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut host = WindowHost {
            config,
            scheduler,
            presenter,
            window: None,
            tracker: InputState::default(),
            scratch: InputFrame::default(),
            frames: 0,
        };

        event_loop
            .run_app(&mut host)
            .context("winit event loop terminated with error")?;

        Ok(host.frames)
    }
}

fn limit_reached(config: &RuntimeConfig, frames: u64) -> bool {
    config.frame_limit.is_some_and(|limit| frames >= limit)
}

struct WindowHost<'a, A: App, P> {
    config:    &'a RuntimeConfig,
    scheduler: &'a mut FrameScheduler<A>,
    presenter: &'a mut P,
    window:    Option<Window>,

    // Host-side copy used only to fill in pointer position and modifiers
    // that winit events do not carry.
    tracker: InputState,
    scratch: InputFrame,

    frames: u64,
}

impl<A, P> WindowHost<'_, A, P>
where
    A: App,
    P: Presenter<A::View>,
{
    fn create_window(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let (w, h) = self.config.initial_size;
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(LogicalSize::new(w, h));

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;
        window.request_redraw();
        self.window = Some(window);
        self.scheduler.reset_clock();
        Ok(())
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let out = self.scheduler.step();
        self.frames += 1;

        if self.presenter.present(&out.view, &out.time) == AppControl::Exit
            || limit_reached(self.config, self.frames)
        {
            event_loop.exit();
        }
    }
}

impl<A, P> ApplicationHandler for WindowHost<'_, A, P>
where
    A: App,
    P: Presenter<A::View>,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.create_window(event_loop) {
            log::error!("failed to create initial window: {e:#}");
            event_loop.exit();
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Wait);
        // Continuous redraw: the application loop never idles.
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(window) = self.window.as_ref().filter(|w| w.id() == window_id) else {
            return;
        };

        if let Some(ev) = translate_window_event(window.scale_factor(), &self.tracker, &event) {
            self.tracker.apply_event(&mut self.scratch, ev.clone());
            self.scratch.clear();
            if let Err(e) = self.scheduler.submit(Event::Input(ev)) {
                log::error!("input event rejected: {e}");
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                log::info!("window closed");
                self.window = None;
                event_loop.exit();
            }
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => window.request_redraw(),
            WindowEvent::RedrawRequested => {
                window.pre_present_notify();
                self.redraw(event_loop);
            }
            _ => {}
        }
    }
}

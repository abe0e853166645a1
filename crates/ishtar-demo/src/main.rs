use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use ishtar_engine::asset::{AssetDescriptor, AssetRequest, BundleEvent, FsFetcher, StartupContext};
use ishtar_engine::core::{App, AppControl, EngineBuilder, EngineConfig, FrameCtx};
use ishtar_engine::event::{Event, Route};
use ishtar_engine::logging::{init_logging, LoggingConfig};
use ishtar_engine::services::{StorageNotice, StorageRequest};
use ishtar_engine::time::FrameTime;
use ishtar_engine::window::{Runtime, RuntimeConfig};

/// Reads a title at startup, then pulls the story in as a background
/// bundle. The story is text, so its arrival restarts the app with the
/// story visible to `init`.
#[derive(Default)]
struct Storybook;

#[derive(Debug)]
struct Page {
    title:   String,
    lines:   Vec<String>,
    scene:   String,
    loading: Option<u32>,
    ticks:   u64,
}

impl App for Storybook {
    type State = Page;
    type ViewModel = String;
    type View = String;

    fn init(&mut self, startup: &StartupContext) -> (Page, Vec<Event>) {
        let title = startup.get_str("title").unwrap_or("untitled").trim().to_string();
        let lines: Vec<String> = startup
            .get_str("story")
            .map(|s| s.lines().map(str::to_string).collect())
            .unwrap_or_default();

        let mut emit = vec![Event::Storage(StorageRequest::Load { key: "visits".into() })];
        if lines.is_empty() {
            emit.push(Event::Asset(AssetRequest::LoadBundle {
                key:    "story".into(),
                assets: vec![AssetDescriptor::text("story", "story.txt")],
            }));
        }

        let scene = if lines.is_empty() { "loading" } else { "reading" };
        let page = Page { title, lines, scene: scene.into(), loading: None, ticks: 0 };
        (page, emit)
    }

    fn update(&mut self, mut page: Page, event: &Event) -> (Page, Vec<Event>) {
        let mut emit = Vec::new();
        match event {
            Event::Tick(_) => page.ticks += 1,
            Event::Navigate(route) => page.scene = route.scene.clone(),
            Event::Bundle(BundleEvent::Progress { percent, .. }) => page.loading = Some(*percent),
            Event::Bundle(BundleEvent::Success { key }) => {
                log::info!("bundle '{key}' ready");
                page.loading = None;
                emit.push(Event::Navigate(Route::new("reading")));
            }
            Event::Bundle(BundleEvent::Failure { key, failed }) => {
                log::warn!("bundle '{key}' failed: {}", failed.join(", "));
                page.loading = None;
                emit.push(Event::Navigate(Route::new("missing")));
            }
            Event::StorageNotice(StorageNotice::Loaded { data, .. }) => {
                let visits = data.as_ref().and_then(|d| d.first().copied()).unwrap_or(0);
                log::info!("visit #{}", visits + 1);
                emit.push(Event::Storage(StorageRequest::Save {
                    key:  "visits".into(),
                    data: vec![visits.saturating_add(1)],
                }));
            }
            _ => {}
        }
        (page, emit)
    }

    fn update_view_model(&mut self, vm: &mut String, ctx: &FrameCtx<'_, Page>) {
        let page = ctx.state;
        let at = (page.ticks / 60) as usize % page.lines.len().max(1);
        let line = page.lines.get(at).map_or("", String::as_str);
        *vm = match page.loading {
            Some(p) => format!("{} [{}] loading {p}%", page.title, page.scene),
            None => format!("{} [{}] {line}", page.title, page.scene),
        };
    }

    fn view(&mut self, vm: &String, _: &FrameCtx<'_, Page>) -> String {
        vm.clone()
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match std::env::var(name) {
        Ok(v) => v.parse().ok().with_context(|| format!("{name}={v} is not valid")),
        Err(_) => Ok(default),
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let root: String = env_or("ISHTAR_ASSETS", "crates/ishtar-demo/assets".to_string())?;
    let frames: u64 = env_or("ISHTAR_FRAMES", 120)?;
    let windowed = env_or("ISHTAR_WINDOWED", 0u8)? != 0;

    let mut engine = EngineBuilder::new()
        .config(EngineConfig::default())
        .fetcher(Arc::new(FsFetcher::new(&root)))
        .startup_asset(AssetDescriptor::text("title", "title.txt"))
        .build(Storybook)
        .context("failed to start engine")?;

    if !engine.startup_report().is_success() {
        log::warn!("starting with missing assets from '{root}'");
    }

    let config = RuntimeConfig {
        title: "Ishtar Storybook".to_string(),
        frame_limit: Some(frames),
        target_frame_time: Duration::from_millis(16),
        windowed,
        ..RuntimeConfig::default()
    };

    let mut last = String::new();
    let mut presenter = |view: &String, time: &FrameTime| {
        if *view != last {
            log::info!("frame {:>4}: {view}", time.frame_index);
            last = view.clone();
        }
        AppControl::Continue
    };

    let stepped = Runtime::run(&config, &mut engine, &mut presenter)?;
    log::info!("{stepped} frames, {} restart(s)", engine.restarts());
    Ok(())
}

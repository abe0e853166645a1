use crate::asset::StartupContext;
use crate::event::Event;

use super::ctx::FrameCtx;

/// Control directive returned by presenters.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract driven by the frame scheduler.
///
/// Every step returns its new state together with the events it emits;
/// there is no other side channel into the engine.
pub trait App {
    type State;
    type ViewModel: Default;
    type View;

    /// Builds the initial state. The only place text assets are readable.
    ///
    /// Runs once before the first frame and again after every restart.
    fn init(&mut self, startup: &StartupContext) -> (Self::State, Vec<Event>);

    /// Folds one event into the state. Called once per delivered event, in
    /// order, with the frame tick last.
    fn update(&mut self, state: Self::State, event: &Event) -> (Self::State, Vec<Event>);

    /// Called once per frame after dispatch, before [`view`](Self::view).
    fn update_view_model(&mut self, vm: &mut Self::ViewModel, ctx: &FrameCtx<'_, Self::State>) {
        let _ = (vm, ctx);
    }

    fn view(&mut self, vm: &Self::ViewModel, ctx: &FrameCtx<'_, Self::State>) -> Self::View;
}

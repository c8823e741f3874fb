use crate::app::{Action, AppContext, AppResult, AppView};
use ratatui::Frame;
use ratatui::layout::Rect;

/// Trait implemented by every pane (account panel, forms, event feed, bars).
pub trait Component {
    /// Component-local command type. Returned actions are lifted into the global [`Action`].
    type Command;

    /// Setup logic run once before the first frame.
    fn init(&mut self, ctx: &mut AppContext<'_>) -> AppResult<()>;

    /// Handle a component-local command and optionally bubble up a global action.
    fn update(
        &mut self,
        command: &Self::Command,
        ctx: &mut AppContext<'_>,
    ) -> AppResult<Option<Action>>;

    /// Render the component into the provided [`Rect`].
    fn render(&mut self, frame: &mut Frame<'_>, area: Rect, ctx: &AppView<'_>);

    /// Called once per loop iteration, before pending messages are drained.
    fn tick(&mut self, ctx: &mut AppContext<'_>) -> AppResult<Option<Action>>;
}

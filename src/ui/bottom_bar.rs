use crate::{
    app::{Action, AppContext, AppResult, AppView, FocusedPane},
    components::Component,
};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Paragraph},
};

#[derive(Debug, Default)]
pub struct BottomBar;

impl BottomBar {
    fn keymap(pane: FocusedPane) -> &'static str {
        match pane {
            FocusedPane::Connection => {
                "j k Select connector • Enter Connect • d Disconnect • Tab Next pane • q Quit"
            }
            FocusedPane::Forms => {
                "[ ] Switch form • e/Enter Edit • Tab Next field • Enter Submit • Esc Stop editing"
            }
            FocusedPane::Events => "c Clear feed • Tab Next pane • q Quit",
            FocusedPane::Top | FocusedPane::BottomBar => {
                "q Quit • Tab Next pane • 1..5 Focus pane"
            }
        }
    }
}

impl Component for BottomBar {
    type Command = ();

    fn init(&mut self, _ctx: &mut AppContext<'_>) -> AppResult<()> {
        Ok(())
    }

    fn update(
        &mut self,
        _command: &Self::Command,
        _ctx: &mut AppContext<'_>,
    ) -> AppResult<Option<Action>> {
        Ok(None)
    }

    fn render(&mut self, frame: &mut Frame<'_>, area: Rect, ctx: &AppView<'_>) {
        let pane = ctx.state.navigation.focused_pane;
        let style = if matches!(pane, FocusedPane::BottomBar) {
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
                .add_modifier(Modifier::UNDERLINED)
        } else {
            Style::default().add_modifier(Modifier::BOLD)
        };
        let widget = Paragraph::new(Line::from(Self::keymap(pane)))
            .block(Block::bordered().title(Line::from("[5] Keymap").style(style)));
        frame.render_widget(widget, area);
    }

    fn tick(&mut self, _ctx: &mut AppContext<'_>) -> AppResult<Option<Action>> {
        Ok(None)
    }
}

use super::util::short_hex;
use crate::{
    app::{Action, AppContext, AppResult, AppView, FocusedPane},
    components::Component,
};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Paragraph},
};

#[derive(Debug)]
pub struct TopBar {
    title: String,
    status: Option<String>,
}

impl Default for TopBar {
    fn default() -> Self {
        Self {
            title: "todos-tui".to_string(),
            status: None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum TopCommand {
    ShowStatus(String),
}

impl TopBar {
    fn status_line(&self) -> Option<Line<'_>> {
        self.status
            .as_ref()
            .map(|status| Line::from(status.clone()).style(Style::default().fg(Color::Gray)))
    }
}

impl Component for TopBar {
    type Command = TopCommand;

    fn init(&mut self, _ctx: &mut AppContext<'_>) -> AppResult<()> {
        self.status = Some("Pick a connector and press Enter to connect".into());
        Ok(())
    }

    fn update(
        &mut self,
        command: &Self::Command,
        _ctx: &mut AppContext<'_>,
    ) -> AppResult<Option<Action>> {
        match command {
            TopCommand::ShowStatus(message) => {
                self.status = Some(message.clone());
            }
        }
        Ok(None)
    }

    fn render(&mut self, frame: &mut Frame<'_>, area: Rect, ctx: &AppView<'_>) {
        let is_focused = matches!(ctx.state.navigation.focused_pane, FocusedPane::Top);
        let account = ctx.state.wallet.account();
        let descriptor = match account.addresses.first() {
            Some(address) => format!(
                "{} [{}]",
                short_hex(&address.to_checksum(None)),
                account
                    .chain_id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "?".into())
            ),
            None => account.status.to_string(),
        };
        let title = Line::from(format!("[1] {} • {}", self.title, descriptor));
        let style = if is_focused {
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().add_modifier(Modifier::BOLD)
        };

        let mut lines = vec![Line::from(vec![
            Span::styled("Contract ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(ctx.chain.contract_checksum()),
            Span::styled(" • RPC ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(ctx.chain.rpc_url.clone()),
        ])];
        if ctx.state.loading.any() {
            lines.push(Line::from(Span::styled(
                "Working…",
                Style::default().fg(Color::Yellow),
            )));
        } else if let Some(status) = self.status_line() {
            lines.push(status);
        }

        let widget = Paragraph::new(lines)
            .style(Style::default().fg(Color::Gray))
            .block(Block::bordered().title(title.style(style)));
        frame.render_widget(widget, area);
    }

    fn tick(&mut self, _ctx: &mut AppContext<'_>) -> AppResult<Option<Action>> {
        Ok(None)
    }
}

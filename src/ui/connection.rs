use crate::{
    app::{Action, AppContext, AppResult, AppView, FocusedPane, Message},
    chain::{AccountStatus, ConnectStatus, ConnectorKind},
    components::Component,
};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

/// Account status plus the connector list, as the wallet session reports them.
#[derive(Debug, Default)]
pub struct ConnectionPanel {
    selected_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionCommand {
    MoveUp,
    MoveDown,
    Connect,
    Disconnect,
}

impl ConnectionPanel {
    pub fn command_from_key(event: KeyEvent) -> Option<ConnectionCommand> {
        match (event.modifiers, event.code) {
            (KeyModifiers::NONE, KeyCode::Char('k') | KeyCode::Up) => {
                Some(ConnectionCommand::MoveUp)
            }
            (KeyModifiers::NONE, KeyCode::Char('j') | KeyCode::Down) => {
                Some(ConnectionCommand::MoveDown)
            }
            (_, KeyCode::Enter) => Some(ConnectionCommand::Connect),
            (KeyModifiers::NONE, KeyCode::Char('d')) => Some(ConnectionCommand::Disconnect),
            _ => None,
        }
    }

    fn connector_hint(kind: &ConnectorKind) -> &'static str {
        match kind {
            ConnectorKind::LocalKey(_) => "local signer",
            ConnectorKind::NodeAccounts => "eth_accounts",
        }
    }

    fn connect(&mut self, ctx: &mut AppContext<'_>) -> AppResult<Option<Action>> {
        let Some(uid) = ctx
            .state
            .wallet
            .connectors()
            .get(self.selected_index)
            .map(|connector| connector.uid().to_string())
        else {
            return Ok(None);
        };
        match ctx.state.wallet.begin_connect(&uid) {
            Ok((request, connector)) => {
                tracing::debug!(connector = %uid, "connect requested");
                let chain = ctx.chain.clone();
                ctx.commands.spawn_async(move || async move {
                    let result = connector.connect(chain).await;
                    Message::ConnectFinished { request, result }
                });
                Ok(Some(Action::LoadingStarted(FocusedPane::Connection)))
            }
            Err(err) => Ok(Some(Action::ShowStatus(err.to_string()))),
        }
    }
}

impl Component for ConnectionPanel {
    type Command = ConnectionCommand;

    fn init(&mut self, _ctx: &mut AppContext<'_>) -> AppResult<()> {
        self.selected_index = 0;
        Ok(())
    }

    fn update(
        &mut self,
        command: &Self::Command,
        ctx: &mut AppContext<'_>,
    ) -> AppResult<Option<Action>> {
        match command {
            ConnectionCommand::MoveUp => {
                self.selected_index = self.selected_index.saturating_sub(1);
            }
            ConnectionCommand::MoveDown => {
                let len = ctx.state.wallet.connectors().len();
                if len > 0 {
                    self.selected_index = (self.selected_index + 1).min(len - 1);
                }
            }
            ConnectionCommand::Connect => return self.connect(ctx),
            ConnectionCommand::Disconnect => {
                if ctx.state.wallet.is_connected() {
                    return Ok(Some(Action::Disconnect));
                }
            }
        }
        Ok(None)
    }

    fn render(&mut self, frame: &mut Frame<'_>, area: Rect, ctx: &AppView<'_>) {
        let is_focused = matches!(ctx.state.navigation.focused_pane, FocusedPane::Connection);
        let border_style = if is_focused {
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
                .add_modifier(Modifier::UNDERLINED)
        } else {
            Style::default().add_modifier(Modifier::BOLD)
        };
        let label = Style::default().add_modifier(Modifier::BOLD);
        let wallet = &ctx.state.wallet;
        let account = wallet.account();

        let mut lines = vec![
            Line::from(vec![
                Span::styled("Status: ", label),
                Span::raw(account.status.to_string()),
            ]),
            Line::from(vec![
                Span::styled("Addresses: ", label),
                Span::raw(account.addresses_json()),
            ]),
            Line::from(vec![
                Span::styled("Chain ID: ", label),
                Span::raw(
                    account
                        .chain_id
                        .map(|id| id.to_string())
                        .unwrap_or_default(),
                ),
            ]),
        ];

        if account.status == AccountStatus::Connected {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "[d] Disconnect",
                Style::default().fg(Color::Black).bg(Color::Gray),
            )));
        }

        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("Connect", label)));
        for (index, connector) in wallet.connectors().iter().enumerate() {
            let selected = index == self.selected_index;
            let marker = if selected { "▸ " } else { "  " };
            let style = if selected {
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            lines.push(Line::from(vec![
                Span::styled(format!("{marker}{}", connector.name()), style),
                Span::styled(
                    format!(" ({})", Self::connector_hint(connector.kind())),
                    Style::default().fg(Color::DarkGray),
                ),
            ]));
        }

        let status = wallet.connect_status();
        if status != ConnectStatus::Idle {
            let mut text = status.to_string();
            if let Some(secs) = ctx.state.loading.connection.elapsed_secs() {
                text.push_str(&format!(" ({secs}s)"));
            }
            lines.push(Line::from(Span::styled(
                text,
                Style::default().fg(Color::Gray),
            )));
        }
        if let Some(error) = wallet.error() {
            lines.push(Line::from(Span::styled(
                error.to_string(),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )));
        }

        let widget = Paragraph::new(lines).wrap(Wrap { trim: false }).block(
            Block::default()
                .borders(Borders::ALL)
                .title(Line::from("[2] Account").style(border_style)),
        );
        frame.render_widget(widget, area);
    }

    fn tick(&mut self, ctx: &mut AppContext<'_>) -> AppResult<Option<Action>> {
        let len = ctx.state.wallet.connectors().len();
        if self.selected_index >= len {
            self.selected_index = len.saturating_sub(1);
        }
        Ok(None)
    }
}

use crate::{
    chain::{
        ChainContext, ConnectRequest, Connection, Connector, EventBatch, TodoEventKind, WalletError,
        WalletSession, WriteError, WriteReceipt,
    },
    components::Component,
    forms::FormKind,
    ui::{
        bottom_bar::BottomBar,
        connection::{ConnectionCommand, ConnectionPanel},
        event_feed::{EventFeed, EventFeedCommand},
        forms::{FormsCommand, FormsPanel},
        top::{TopBar, TopCommand},
        util::short_hex,
    },
};
pub type AppResult<T> = color_eyre::Result<T>;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use ratatui::{
    DefaultTerminal, Frame,
    layout::{Constraint, Direction, Layout},
};
use std::{
    sync::mpsc,
    time::{Duration, Instant},
};
use tokio::runtime::{Handle, Runtime};

pub use navigation::FocusedPane;

const INPUT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Central application type that orchestrates state and delegates to UI components.
pub struct App {
    running: bool,
    pub state: AppState,
    chain: ChainContext,
    top_bar: TopBar,
    connection_panel: ConnectionPanel,
    forms_panel: FormsPanel,
    event_feed: EventFeed,
    bottom_bar: BottomBar,
    // Dropping the runtime tears down the watcher tasks.
    runtime: Runtime,
    message_rx: mpsc::Receiver<Message>,
    message_tx: mpsc::Sender<Message>,
}

impl App {
    pub fn new(chain: ChainContext, connectors: Vec<Connector>) -> AppResult<Self> {
        let mut state = AppState {
            wallet: WalletSession::new(connectors),
            ..AppState::default()
        };
        let mut top_bar = TopBar::default();
        let mut connection_panel = ConnectionPanel::default();
        let mut forms_panel = FormsPanel::default();
        let mut event_feed = EventFeed::default();
        let mut bottom_bar = BottomBar::default();
        let runtime = Runtime::new()?;
        let (message_tx, message_rx) = mpsc::channel();

        {
            let mut ctx = AppContext {
                state: &mut state,
                chain: &chain,
                commands: CommandBus::new(message_tx.clone(), runtime.handle().clone()),
            };
            top_bar.init(&mut ctx)?;
            connection_panel.init(&mut ctx)?;
            forms_panel.init(&mut ctx)?;
            event_feed.init(&mut ctx)?;
            bottom_bar.init(&mut ctx)?;
        }

        let app = Self {
            running: false,
            state,
            chain,
            top_bar,
            connection_panel,
            forms_panel,
            event_feed,
            bottom_bar,
            runtime,
            message_rx,
            message_tx,
        };
        app.start_watchers();
        Ok(app)
    }

    pub fn run(mut self, mut terminal: DefaultTerminal) -> AppResult<()> {
        self.running = true;
        while self.running {
            self.tick()?;
            terminal.draw(|frame| self.render(frame))?;
            self.handle_events()?;
        }
        tracing::info!("shutting down");
        Ok(())
    }

    /// One watcher task per event kind, forwarding batches until the stream ends.
    fn start_watchers(&self) {
        let bus = self.command_bus();
        for kind in TodoEventKind::ALL {
            let chain = self.chain.clone();
            bus.spawn_forwarding(move |sender| async move {
                match chain.watch(kind).await {
                    Ok(mut stream) => {
                        tracing::info!(
                            event = kind.label(),
                            contract = %chain.contract_checksum(),
                            "watching contract events"
                        );
                        while let Some(batch) = stream.next().await {
                            if sender.send(Message::EventBatch(batch)).is_err() {
                                return;
                            }
                        }
                        tracing::warn!(event = kind.label(), "event stream ended");
                    }
                    Err(err) => {
                        let _ = sender.send(Message::WatchFailed {
                            kind,
                            error: format!("{err:#}"),
                        });
                    }
                }
            });
        }
    }

    fn render(&mut self, frame: &mut Frame<'_>) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4),
                Constraint::Min(1),
                Constraint::Length(3),
            ])
            .split(frame.area());

        let top_area = layout[0];
        let main_area = layout[1];
        let bottom_area = layout[2];

        let app_panes = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(48), Constraint::Min(1)])
            .split(main_area);

        let connection_area = app_panes[0];
        let right_panes = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(14), Constraint::Min(5)])
            .split(app_panes[1]);

        let view = AppView {
            state: &self.state,
            chain: &self.chain,
        };

        self.top_bar.render(frame, top_area, &view);
        self.connection_panel.render(frame, connection_area, &view);
        self.forms_panel.render(frame, right_panes[0], &view);
        self.event_feed.render(frame, right_panes[1], &view);
        self.bottom_bar.render(frame, bottom_area, &view);
    }

    fn handle_events(&mut self) -> AppResult<()> {
        if !event::poll(INPUT_POLL_INTERVAL)? {
            return Ok(());
        }
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => self.on_key_event(key)?,
            Event::Mouse(_) | Event::Resize(_, _) => {}
            _ => {}
        }
        Ok(())
    }

    fn on_key_event(&mut self, key: KeyEvent) -> AppResult<()> {
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
        {
            self.dispatch(Action::Quit);
            return Ok(());
        }

        if self.forms_panel.is_editing() {
            if let Some(command) = FormsPanel::command_from_key(key) {
                self.forms_command(command)?;
            }
            return Ok(());
        }

        match (key.modifiers, key.code) {
            (_, KeyCode::Esc | KeyCode::Char('q')) => self.dispatch(Action::Quit),
            (KeyModifiers::NONE, KeyCode::Tab) => self.dispatch(Action::FocusNextPane),
            (_, KeyCode::BackTab) => self.dispatch(Action::FocusPreviousPane),
            (KeyModifiers::NONE, KeyCode::Char(d)) if d.is_ascii_digit() => {
                if let Some(pane) = d
                    .to_digit(10)
                    .and_then(|n| FocusedPane::from_number(n as usize))
                {
                    self.dispatch(Action::FocusPane(pane));
                }
            }
            _ => self.handle_pane_key(key)?,
        }
        Ok(())
    }

    fn handle_pane_key(&mut self, key: KeyEvent) -> AppResult<()> {
        match self.state.navigation.focused_pane {
            FocusedPane::Connection => {
                if let Some(command) = ConnectionPanel::command_from_key(key) {
                    self.connection_command(command)?;
                }
            }
            FocusedPane::Forms => {
                if let Some(command) = FormsPanel::navigation_command_from_key(key) {
                    self.forms_command(command)?;
                }
            }
            FocusedPane::Events => {
                if let (KeyModifiers::NONE, KeyCode::Char('c')) = (key.modifiers, key.code) {
                    self.event_feed_command(EventFeedCommand::Clear)?;
                }
            }
            FocusedPane::Top | FocusedPane::BottomBar => {}
        }
        Ok(())
    }

    fn dispatch(&mut self, action: Action) {
        tracing::debug!(?action, "dispatch");
        match action {
            Action::Quit => self.running = false,
            Action::FocusPane(pane) => self.state.navigation.focused_pane = pane,
            Action::FocusNextPane => self.state.navigation.focus_next(),
            Action::FocusPreviousPane => self.state.navigation.focus_previous(),
            Action::Disconnect => {
                self.state.wallet.disconnect();
                self.state.loading.set_loading(FocusedPane::Connection, false);
                let _ = self.top_bar_command(TopCommand::ShowStatus("Disconnected".into()));
            }
            Action::LoadingStarted(pane) => self.state.loading.set_loading(pane, true),
            Action::LoadingFinished(pane) => self.state.loading.set_loading(pane, false),
            Action::ShowStatus(message) => {
                let _ = self.top_bar_command(TopCommand::ShowStatus(message));
            }
        }
    }

    fn command_bus(&self) -> CommandBus {
        CommandBus::new(self.message_tx.clone(), self.runtime.handle().clone())
    }

    fn connection_command(&mut self, command: ConnectionCommand) -> AppResult<()> {
        let commands = self.command_bus();
        let action = update_component(
            &mut self.connection_panel,
            &command,
            &mut self.state,
            &self.chain,
            commands,
        )?;
        if let Some(action) = action {
            self.dispatch(action);
        }
        Ok(())
    }

    fn forms_command(&mut self, command: FormsCommand) -> AppResult<()> {
        let commands = self.command_bus();
        let action = update_component(
            &mut self.forms_panel,
            &command,
            &mut self.state,
            &self.chain,
            commands,
        )?;
        if let Some(action) = action {
            self.dispatch(action);
        }
        Ok(())
    }

    fn event_feed_command(&mut self, command: EventFeedCommand) -> AppResult<()> {
        let commands = self.command_bus();
        let action = update_component(
            &mut self.event_feed,
            &command,
            &mut self.state,
            &self.chain,
            commands,
        )?;
        if let Some(action) = action {
            self.dispatch(action);
        }
        Ok(())
    }

    fn top_bar_command(&mut self, command: TopCommand) -> AppResult<()> {
        let commands = self.command_bus();
        let action = update_component(
            &mut self.top_bar,
            &command,
            &mut self.state,
            &self.chain,
            commands,
        )?;
        if let Some(action) = action {
            self.dispatch(action);
        }
        Ok(())
    }

    fn tick(&mut self) -> AppResult<()> {
        let mut actions = Vec::new();
        {
            let mut ctx = AppContext {
                state: &mut self.state,
                chain: &self.chain,
                commands: CommandBus::new(self.message_tx.clone(), self.runtime.handle().clone()),
            };
            actions.extend(self.top_bar.tick(&mut ctx)?);
            actions.extend(self.connection_panel.tick(&mut ctx)?);
            actions.extend(self.forms_panel.tick(&mut ctx)?);
            actions.extend(self.event_feed.tick(&mut ctx)?);
            actions.extend(self.bottom_bar.tick(&mut ctx)?);
        }
        for action in actions {
            self.dispatch(action);
        }
        self.drain_messages();
        Ok(())
    }

    fn drain_messages(&mut self) {
        while let Ok(message) = self.message_rx.try_recv() {
            match message {
                Message::ConnectFinished { request, result } => {
                    let status = match &result {
                        Ok(connection) => format!(
                            "Connected {} on chain {}",
                            connection
                                .addresses
                                .first()
                                .map(|address| short_hex(&address.to_checksum(None)))
                                .unwrap_or_default(),
                            connection.chain_id
                        ),
                        Err(err) => format!("Connection failed: {err}"),
                    };
                    if self.state.wallet.finish_connect(&request, result) {
                        self.dispatch(Action::LoadingFinished(FocusedPane::Connection));
                        self.dispatch(Action::ShowStatus(status));
                    }
                }
                Message::WriteFinished { kind, outcome } => {
                    match &outcome {
                        Ok(receipt) => tracing::info!(
                            form = kind.title(),
                            tx = %receipt.transaction_hash,
                            block = ?receipt.block_number,
                            "todo write confirmed"
                        ),
                        Err(err) => tracing::warn!(form = kind.title(), %err, "todo write failed"),
                    }
                    if let Err(err) =
                        self.forms_command(FormsCommand::WriteFinished { kind, outcome })
                    {
                        tracing::error!(%err, "failed to apply write result");
                    }
                }
                Message::EventBatch(batch) => {
                    tracing::info!(
                        event = batch.kind.label(),
                        count = batch.entries.len(),
                        entries = %serde_json::to_string(&batch.entries).unwrap_or_default(),
                        "received event batch"
                    );
                    if let Err(err) = self.event_feed_command(EventFeedCommand::Append(batch)) {
                        tracing::error!(%err, "failed to append event batch");
                    }
                }
                Message::WatchFailed { kind, error } => {
                    tracing::warn!(event = kind.label(), %error, "failed to watch events");
                    self.dispatch(Action::ShowStatus(format!("Cannot watch {kind}: {error}")));
                }
            }
        }
    }
}

fn update_component<C: Component>(
    component: &mut C,
    command: &C::Command,
    state: &mut AppState,
    chain: &ChainContext,
    commands: CommandBus,
) -> AppResult<Option<Action>> {
    let mut ctx = AppContext {
        state,
        chain,
        commands,
    };
    component.update(command, &mut ctx)
}

/// State shared across components.
#[derive(Debug, Default)]
pub struct AppState {
    pub navigation: NavigationState,
    pub loading: LoadingState,
    pub wallet: WalletSession,
}

#[derive(Debug, Default)]
pub struct NavigationState {
    pub focused_pane: FocusedPane,
}

impl NavigationState {
    pub fn focus_next(&mut self) {
        self.focused_pane = match self.focused_pane {
            FocusedPane::Top => FocusedPane::Connection,
            FocusedPane::Connection => FocusedPane::Forms,
            FocusedPane::Forms => FocusedPane::Events,
            FocusedPane::Events => FocusedPane::BottomBar,
            FocusedPane::BottomBar => FocusedPane::Top,
        };
    }

    pub fn focus_previous(&mut self) {
        self.focused_pane = match self.focused_pane {
            FocusedPane::Top => FocusedPane::BottomBar,
            FocusedPane::Connection => FocusedPane::Top,
            FocusedPane::Forms => FocusedPane::Connection,
            FocusedPane::Events => FocusedPane::Forms,
            FocusedPane::BottomBar => FocusedPane::Events,
        };
    }
}

#[derive(Debug, Default)]
pub struct LoadingState {
    pub connection: PaneLoading,
    pub forms: PaneLoading,
}

impl LoadingState {
    pub fn set_loading(&mut self, pane: FocusedPane, value: bool) {
        let target = match pane {
            FocusedPane::Connection => &mut self.connection,
            FocusedPane::Forms => &mut self.forms,
            FocusedPane::Top | FocusedPane::Events | FocusedPane::BottomBar => return,
        };
        target.is_loading = value;
        target.started_at = if value { Some(Instant::now()) } else { None };
    }

    pub fn any(&self) -> bool {
        self.connection.is_loading || self.forms.is_loading
    }
}

#[derive(Debug, Default)]
pub struct PaneLoading {
    pub is_loading: bool,
    pub started_at: Option<Instant>,
}

impl PaneLoading {
    pub fn elapsed_secs(&self) -> Option<u64> {
        self.started_at.map(|started| started.elapsed().as_secs())
    }
}

/// Mutable context passed to components while handling logic.
pub struct AppContext<'a> {
    pub state: &'a mut AppState,
    pub chain: &'a ChainContext,
    pub commands: CommandBus,
}

/// Read-only context used during rendering.
pub struct AppView<'a> {
    pub state: &'a AppState,
    pub chain: &'a ChainContext,
}

#[derive(Clone)]
pub struct CommandBus {
    sender: mpsc::Sender<Message>,
    handle: Handle,
}

impl CommandBus {
    pub fn new(sender: mpsc::Sender<Message>, handle: Handle) -> Self {
        Self { sender, handle }
    }

    pub fn spawn_async<F, Fut>(&self, task: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Message> + Send + 'static,
    {
        let sender = self.sender.clone();
        self.handle.spawn(async move {
            let message = task().await;
            let _ = sender.send(message);
        });
    }

    /// Spawns a long-running task that sends any number of messages itself.
    pub fn spawn_forwarding<F, Fut>(&self, task: F)
    where
        F: FnOnce(mpsc::Sender<Message>) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let sender = self.sender.clone();
        self.handle.spawn(async move { task(sender).await });
    }
}

#[derive(Debug)]
pub enum Message {
    ConnectFinished {
        request: ConnectRequest,
        result: Result<Connection, WalletError>,
    },
    WriteFinished {
        kind: FormKind,
        outcome: Result<WriteReceipt, WriteError>,
    },
    EventBatch(EventBatch),
    WatchFailed {
        kind: TodoEventKind,
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Quit,
    FocusPane(FocusedPane),
    FocusNextPane,
    FocusPreviousPane,
    Disconnect,
    LoadingStarted(FocusedPane),
    LoadingFinished(FocusedPane),
    ShowStatus(String),
}

mod navigation {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub enum FocusedPane {
        Top,
        #[default]
        Connection,
        Forms,
        Events,
        BottomBar,
    }

    impl FocusedPane {
        pub fn from_number(number: usize) -> Option<Self> {
            match number {
                1 => Some(Self::Top),
                2 => Some(Self::Connection),
                3 => Some(Self::Forms),
                4 => Some(Self::Events),
                5 => Some(Self::BottomBar),
                _ => None,
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn focus_cycles_through_every_pane() {
        let mut nav = NavigationState::default();
        assert_eq!(nav.focused_pane, FocusedPane::Connection);
        for _ in 0..5 {
            nav.focus_next();
        }
        assert_eq!(nav.focused_pane, FocusedPane::Connection);
        nav.focus_previous();
        assert_eq!(nav.focused_pane, FocusedPane::Top);
    }

    #[test]
    fn pane_numbers_match_titles() {
        assert_eq!(FocusedPane::from_number(2), Some(FocusedPane::Connection));
        assert_eq!(FocusedPane::from_number(4), Some(FocusedPane::Events));
        assert_eq!(FocusedPane::from_number(9), None);
    }

    #[test]
    fn loading_tracks_start_time() {
        let mut loading = LoadingState::default();
        loading.set_loading(FocusedPane::Forms, true);
        assert!(loading.any());
        assert_eq!(loading.forms.elapsed_secs(), Some(0));
        loading.set_loading(FocusedPane::Forms, false);
        loading.set_loading(FocusedPane::Events, true);
        assert!(!loading.any());
    }
}

use crate::{
    app::{Action, AppContext, AppResult, AppView, FocusedPane},
    chain::{EventBatch, TodoEvent, TodoEventKind},
    components::Component,
};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
};
use std::collections::VecDeque;

const FEED_CAPACITY: usize = 256;

/// Decoded `Todo*` logs, newest first. Older entries fall off once the feed
/// holds [`FEED_CAPACITY`] of them.
#[derive(Debug)]
pub struct EventFeed {
    entries: VecDeque<TodoEvent>,
    batches: usize,
    capacity: usize,
}

impl Default for EventFeed {
    fn default() -> Self {
        Self {
            entries: VecDeque::new(),
            batches: 0,
            capacity: FEED_CAPACITY,
        }
    }
}

#[derive(Debug, Clone)]
pub enum EventFeedCommand {
    Append(EventBatch),
    Clear,
}

impl EventFeed {
    fn append(&mut self, batch: &EventBatch) {
        self.batches += 1;
        for event in &batch.entries {
            self.entries.push_front(event.clone());
        }
        self.entries.truncate(self.capacity);
    }

    fn kind_color(kind: TodoEventKind) -> Color {
        match kind {
            TodoEventKind::Created => Color::Green,
            TodoEventKind::Updated => Color::Yellow,
            TodoEventKind::Deleted => Color::Red,
        }
    }

    fn entry_item(event: &TodoEvent) -> ListItem<'static> {
        let mut lines = vec![Line::from(vec![
            Span::styled(
                format!("{:<12}", event.kind.label()),
                Style::default()
                    .fg(Self::kind_color(event.kind))
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(event.summary()),
        ])];
        if let Some(description) = event.description.as_ref().filter(|d| !d.is_empty()) {
            lines.push(Line::from(Span::styled(
                format!("{:<12}{description}", ""),
                Style::default().fg(Color::Gray),
            )));
        }
        ListItem::new(lines)
    }
}

impl Component for EventFeed {
    type Command = EventFeedCommand;

    fn init(&mut self, _ctx: &mut AppContext<'_>) -> AppResult<()> {
        self.entries.clear();
        self.batches = 0;
        Ok(())
    }

    fn update(
        &mut self,
        command: &Self::Command,
        _ctx: &mut AppContext<'_>,
    ) -> AppResult<Option<Action>> {
        match command {
            EventFeedCommand::Append(batch) => self.append(batch),
            EventFeedCommand::Clear => {
                self.entries.clear();
                self.batches = 0;
            }
        }
        Ok(None)
    }

    fn render(&mut self, frame: &mut Frame<'_>, area: Rect, ctx: &AppView<'_>) {
        let is_focused = matches!(ctx.state.navigation.focused_pane, FocusedPane::Events);
        let border_style = if is_focused {
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
                .add_modifier(Modifier::UNDERLINED)
        } else {
            Style::default().add_modifier(Modifier::BOLD)
        };
        let block = Block::default().borders(Borders::ALL).title(
            Line::from(format!("[4] Events ({} batches)", self.batches)).style(border_style),
        );

        if self.entries.is_empty() {
            let placeholder = Paragraph::new(Line::from(Span::styled(
                "Waiting for TodoCreated / TodoUpdated / TodoDeleted logs…",
                Style::default().fg(Color::DarkGray),
            )))
            .block(block);
            frame.render_widget(placeholder, area);
            return;
        }

        let items: Vec<ListItem> = self.entries.iter().map(Self::entry_item).collect();
        frame.render_widget(List::new(items).block(block), area);
    }

    fn tick(&mut self, _ctx: &mut AppContext<'_>) -> AppResult<Option<Action>> {
        Ok(None)
    }
}

use super::util::short_hex;
use crate::{
    app::{Action, AppContext, AppResult, AppView, FocusedPane, Message},
    chain::{WriteError, WriteReceipt},
    components::Component,
    forms::{FormField, FormKind, TodoForm, TodoForms},
};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

#[derive(Debug, Clone, PartialEq, Eq)]
struct FormMessage {
    text: String,
    is_error: bool,
}

impl FormMessage {
    fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }
}

/// Tabbed create/update/delete forms. Each tab keeps its own fields and
/// submission state.
#[derive(Debug, Default)]
pub struct FormsPanel {
    forms: TodoForms,
    active: FormKind,
    editing: bool,
    field_index: usize,
    messages: [Option<FormMessage>; 3],
}

#[derive(Debug)]
pub enum FormsCommand {
    NextForm,
    PreviousForm,
    StartEditing,
    StopEditing,
    FocusNextField,
    FocusPreviousField,
    InputChar(char),
    Backspace,
    ClearField,
    Submit,
    WriteFinished {
        kind: FormKind,
        outcome: Result<WriteReceipt, WriteError>,
    },
}

impl FormsPanel {
    pub fn is_editing(&self) -> bool {
        self.editing
    }

    /// Keys while a field has input focus.
    pub fn command_from_key(event: KeyEvent) -> Option<FormsCommand> {
        match (event.modifiers, event.code) {
            (_, KeyCode::Esc) => Some(FormsCommand::StopEditing),
            (KeyModifiers::NONE, KeyCode::Tab | KeyCode::Down) => {
                Some(FormsCommand::FocusNextField)
            }
            (_, KeyCode::BackTab) | (KeyModifiers::NONE, KeyCode::Up) => {
                Some(FormsCommand::FocusPreviousField)
            }
            (_, KeyCode::Enter) => Some(FormsCommand::Submit),
            (_, KeyCode::Backspace) => Some(FormsCommand::Backspace),
            (KeyModifiers::CONTROL, KeyCode::Char('u')) => Some(FormsCommand::ClearField),
            (modifiers, KeyCode::Char(c)) if !modifiers.contains(KeyModifiers::CONTROL) => {
                Some(FormsCommand::InputChar(c))
            }
            _ => None,
        }
    }

    /// Keys while the pane is focused but no field is being edited.
    pub fn navigation_command_from_key(event: KeyEvent) -> Option<FormsCommand> {
        match (event.modifiers, event.code) {
            (_, KeyCode::Char(']') | KeyCode::Right)
            | (KeyModifiers::NONE, KeyCode::Char('l')) => Some(FormsCommand::NextForm),
            (_, KeyCode::Char('[') | KeyCode::Left)
            | (KeyModifiers::NONE, KeyCode::Char('h')) => Some(FormsCommand::PreviousForm),
            (KeyModifiers::NONE, KeyCode::Char('e')) | (_, KeyCode::Enter) => {
                Some(FormsCommand::StartEditing)
            }
            (KeyModifiers::NONE, KeyCode::Char('s')) => Some(FormsCommand::Submit),
            _ => None,
        }
    }

    fn active_form(&self) -> &dyn TodoForm {
        self.forms.get(self.active)
    }

    fn focused_field(&self) -> FormField {
        let fields = self.active_form().fields();
        fields[self.field_index.min(fields.len() - 1)]
    }

    fn focused_value(&mut self) -> Option<&mut String> {
        let field = self.focused_field();
        self.forms.get_mut(self.active).value_mut(field)
    }

    fn switch_form(&mut self, kind: FormKind) {
        self.active = kind;
        self.field_index = 0;
    }

    fn cycle_field(&mut self, forward: bool) {
        let len = self.active_form().fields().len();
        self.field_index = if forward {
            (self.field_index + 1) % len
        } else {
            (self.field_index + len - 1) % len
        };
    }

    fn set_message(&mut self, kind: FormKind, message: Option<FormMessage>) {
        self.messages[kind.index()] = message;
    }

    fn submit(&mut self, ctx: &mut AppContext<'_>) -> AppResult<Option<Action>> {
        let kind = self.active;
        let call = match self.forms.get_mut(kind).begin_submit() {
            Ok(call) => call,
            Err(err) => {
                self.set_message(kind, Some(FormMessage::error(err.to_string())));
                return Ok(None);
            }
        };

        let Some(writer) = ctx.state.wallet.writer() else {
            let outcome = Err(WriteError::NotConnected);
            self.forms.get_mut(kind).finish_submit(&outcome);
            self.set_message(kind, outcome.err().map(|err| FormMessage::error(err.to_string())));
            return Ok(None);
        };

        tracing::info!(
            form = kind.title(),
            function = call.function_name(),
            contract = %writer.contract(),
            "submitting todo write"
        );
        ctx.commands.spawn_async(move || async move {
            let outcome = writer.write(call).await;
            Message::WriteFinished { kind, outcome }
        });
        self.set_message(kind, Some(FormMessage::info("Waiting for confirmation…")));
        Ok(Some(Action::LoadingStarted(FocusedPane::Forms)))
    }

    fn finish_write(
        &mut self,
        kind: FormKind,
        outcome: &Result<WriteReceipt, WriteError>,
    ) -> Option<Action> {
        self.forms.get_mut(kind).finish_submit(outcome);
        let message = match outcome {
            Ok(receipt) => {
                let mut text = format!(
                    "Confirmed {}",
                    short_hex(&receipt.transaction_hash.to_string())
                );
                if let Some(block) = receipt.block_number {
                    text.push_str(&format!(" in block {block}"));
                }
                FormMessage::info(text)
            }
            Err(err) => FormMessage::error(err.to_string()),
        };
        self.set_message(kind, Some(message));

        let still_pending = FormKind::ALL
            .into_iter()
            .any(|form| self.forms.get(form).is_pending());
        (!still_pending).then_some(Action::LoadingFinished(FocusedPane::Forms))
    }

    fn placeholder(kind: FormKind, field: FormField) -> &'static str {
        match (kind, field) {
            (_, FormField::Id) => "Todo ID",
            (_, FormField::Title) => "Todo Title",
            (FormKind::Update, FormField::Description) => "Update your todo here.",
            (_, FormField::Description) => "What's on your mind?",
        }
    }

    fn button_label(kind: FormKind) -> &'static str {
        match kind {
            FormKind::Create => "Submit New Todo",
            FormKind::Update => "Submit Updated Todo",
            FormKind::Delete => "Delete Todo By ID",
        }
    }

    fn tabs_line(&self) -> Line<'static> {
        let mut spans = Vec::new();
        for kind in FormKind::ALL {
            let style = if kind == self.active {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            };
            spans.push(Span::styled(format!(" {} ", kind.title()), style));
            spans.push(Span::raw(" "));
        }
        Line::from(spans)
    }
}

impl Component for FormsPanel {
    type Command = FormsCommand;

    fn init(&mut self, _ctx: &mut AppContext<'_>) -> AppResult<()> {
        self.forms = TodoForms::default();
        self.switch_form(FormKind::Create);
        Ok(())
    }

    fn update(
        &mut self,
        command: &Self::Command,
        ctx: &mut AppContext<'_>,
    ) -> AppResult<Option<Action>> {
        match command {
            FormsCommand::NextForm => self.switch_form(self.active.next()),
            FormsCommand::PreviousForm => self.switch_form(self.active.previous()),
            FormsCommand::StartEditing => self.editing = true,
            FormsCommand::StopEditing => self.editing = false,
            FormsCommand::FocusNextField => self.cycle_field(true),
            FormsCommand::FocusPreviousField => self.cycle_field(false),
            FormsCommand::InputChar(c) => {
                if let Some(value) = self.focused_value() {
                    value.push(*c);
                }
            }
            FormsCommand::Backspace => {
                if let Some(value) = self.focused_value() {
                    value.pop();
                }
            }
            FormsCommand::ClearField => {
                if let Some(value) = self.focused_value() {
                    value.clear();
                }
            }
            FormsCommand::Submit => return self.submit(ctx),
            FormsCommand::WriteFinished { kind, outcome } => {
                return Ok(self.finish_write(*kind, outcome));
            }
        }
        Ok(None)
    }

    fn render(&mut self, frame: &mut Frame<'_>, area: Rect, ctx: &AppView<'_>) {
        let is_focused = matches!(ctx.state.navigation.focused_pane, FocusedPane::Forms);
        let border_style = if is_focused {
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
                .add_modifier(Modifier::UNDERLINED)
        } else {
            Style::default().add_modifier(Modifier::BOLD)
        };

        let kind = self.active;
        let form = self.active_form();
        let focused_field = self.focused_field();
        let mut lines = vec![self.tabs_line(), Line::from("")];

        for field in form.fields() {
            let value = form.value(*field);
            let is_current = self.editing && *field == focused_field;
            let mut spans = vec![Span::styled(
                format!("{}: ", field.label()),
                Style::default()
                    .fg(Color::Gray)
                    .add_modifier(Modifier::BOLD),
            )];
            if value.is_empty() {
                spans.push(Span::styled(
                    Self::placeholder(kind, *field),
                    Style::default().fg(Color::DarkGray),
                ));
            } else {
                spans.push(Span::styled(
                    value.to_string(),
                    if is_current {
                        Style::default()
                            .fg(Color::White)
                            .bg(Color::Blue)
                            .add_modifier(Modifier::BOLD)
                    } else {
                        Style::default().fg(Color::White)
                    },
                ));
            }
            if is_current {
                spans.push(Span::styled(
                    " ▌",
                    Style::default()
                        .fg(Color::LightCyan)
                        .add_modifier(Modifier::BOLD),
                ));
            }
            lines.push(Line::from(spans));
        }

        lines.push(Line::from(""));
        let button = if form.is_pending() {
            let mut text = "Submitting…".to_string();
            if let Some(secs) = ctx.state.loading.forms.elapsed_secs() {
                text.push_str(&format!(" ({secs}s)"));
            }
            Span::styled(text, Style::default().fg(Color::Yellow))
        } else {
            Span::styled(
                format!("[Enter] {}", Self::button_label(kind)),
                Style::default().fg(Color::Black).bg(Color::Gray),
            )
        };
        lines.push(Line::from(button));

        if let Some(message) = &self.messages[kind.index()] {
            let color = if message.is_error {
                Color::Red
            } else {
                Color::Green
            };
            lines.push(Line::from(Span::styled(
                message.text.clone(),
                Style::default().fg(color),
            )));
        } else if !self.editing {
            lines.push(Line::from(Span::styled(
                "Press e to edit • [ ] to switch form",
                Style::default().fg(Color::Gray),
            )));
        }

        let widget = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .title(Line::from("[3] Todo Forms").style(border_style)),
        );
        frame.render_widget(widget, area);
    }

    fn tick(&mut self, _ctx: &mut AppContext<'_>) -> AppResult<Option<Action>> {
        Ok(None)
    }
}

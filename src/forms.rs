//! Field state for the create/update/delete forms and their submit lifecycle.

use crate::chain::{TodoCall, WriteError, WriteReceipt};
use alloy::primitives::U256;
use std::fmt;

pub const DEFAULT_ID: &str = "0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FormKind {
    #[default]
    Create,
    Update,
    Delete,
}

impl FormKind {
    pub const ALL: [FormKind; 3] = [FormKind::Create, FormKind::Update, FormKind::Delete];

    pub fn title(self) -> &'static str {
        match self {
            FormKind::Create => "Create",
            FormKind::Update => "Update",
            FormKind::Delete => "Delete",
        }
    }

    pub fn index(self) -> usize {
        match self {
            FormKind::Create => 0,
            FormKind::Update => 1,
            FormKind::Delete => 2,
        }
    }

    pub fn next(self) -> Self {
        match self {
            FormKind::Create => FormKind::Update,
            FormKind::Update => FormKind::Delete,
            FormKind::Delete => FormKind::Create,
        }
    }

    pub fn previous(self) -> Self {
        match self {
            FormKind::Create => FormKind::Delete,
            FormKind::Update => FormKind::Create,
            FormKind::Delete => FormKind::Update,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Id,
    Title,
    Description,
}

impl FormField {
    pub fn label(self) -> &'static str {
        match self {
            FormField::Id => "Todo ID",
            FormField::Title => "Todo Title",
            FormField::Description => "Description",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    InvalidId(String),
    Pending,
}

impl fmt::Display for FormError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormError::InvalidId(input) => {
                write!(f, "\"{input}\" is not a valid todo id (expected a non-negative integer)")
            }
            FormError::Pending => f.write_str("a submission is already in flight"),
        }
    }
}

impl std::error::Error for FormError {}

/// Parses a user-entered todo id. Only plain decimal digits are accepted.
pub fn parse_todo_id(input: &str) -> Result<U256, FormError> {
    let trimmed = input.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(FormError::InvalidId(input.to_string()));
    }
    U256::from_str_radix(trimmed, 10).map_err(|_| FormError::InvalidId(input.to_string()))
}

/// Common surface of the three todo forms.
pub trait TodoForm {
    fn fields(&self) -> &'static [FormField];

    fn value(&self, field: FormField) -> &str;

    fn value_mut(&mut self, field: FormField) -> Option<&mut String>;

    /// Validates the fields into the contract call they describe.
    fn build_call(&self) -> Result<TodoCall, FormError>;

    /// Restores every field to its default.
    fn reset(&mut self);

    fn is_pending(&self) -> bool;

    fn set_pending(&mut self, pending: bool);

    fn begin_submit(&mut self) -> Result<TodoCall, FormError> {
        if self.is_pending() {
            return Err(FormError::Pending);
        }
        let call = self.build_call()?;
        self.set_pending(true);
        Ok(call)
    }

    /// Fields are only reset when the write succeeded.
    fn finish_submit(&mut self, outcome: &Result<WriteReceipt, WriteError>) {
        self.set_pending(false);
        if outcome.is_ok() {
            self.reset();
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CreateTodoForm {
    pub title: String,
    pub description: String,
    pending: bool,
}

impl TodoForm for CreateTodoForm {
    fn fields(&self) -> &'static [FormField] {
        &[FormField::Title, FormField::Description]
    }

    fn value(&self, field: FormField) -> &str {
        match field {
            FormField::Title => &self.title,
            FormField::Description => &self.description,
            FormField::Id => "",
        }
    }

    fn value_mut(&mut self, field: FormField) -> Option<&mut String> {
        match field {
            FormField::Title => Some(&mut self.title),
            FormField::Description => Some(&mut self.description),
            FormField::Id => None,
        }
    }

    fn build_call(&self) -> Result<TodoCall, FormError> {
        Ok(TodoCall::Create {
            title: self.title.clone(),
            description: self.description.clone(),
        })
    }

    fn reset(&mut self) {
        self.title.clear();
        self.description.clear();
    }

    fn is_pending(&self) -> bool {
        self.pending
    }

    fn set_pending(&mut self, pending: bool) {
        self.pending = pending;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateTodoForm {
    pub id: String,
    pub title: String,
    pub description: String,
    pending: bool,
}

impl Default for UpdateTodoForm {
    fn default() -> Self {
        Self {
            id: DEFAULT_ID.to_string(),
            title: String::new(),
            description: String::new(),
            pending: false,
        }
    }
}

impl TodoForm for UpdateTodoForm {
    fn fields(&self) -> &'static [FormField] {
        &[FormField::Id, FormField::Title, FormField::Description]
    }

    fn value(&self, field: FormField) -> &str {
        match field {
            FormField::Id => &self.id,
            FormField::Title => &self.title,
            FormField::Description => &self.description,
        }
    }

    fn value_mut(&mut self, field: FormField) -> Option<&mut String> {
        Some(match field {
            FormField::Id => &mut self.id,
            FormField::Title => &mut self.title,
            FormField::Description => &mut self.description,
        })
    }

    fn build_call(&self) -> Result<TodoCall, FormError> {
        Ok(TodoCall::Update {
            id: parse_todo_id(&self.id)?,
            title: self.title.clone(),
            description: self.description.clone(),
        })
    }

    fn reset(&mut self) {
        self.id = DEFAULT_ID.to_string();
        self.title.clear();
        self.description.clear();
    }

    fn is_pending(&self) -> bool {
        self.pending
    }

    fn set_pending(&mut self, pending: bool) {
        self.pending = pending;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteTodoForm {
    pub id: String,
    pending: bool,
}

impl Default for DeleteTodoForm {
    fn default() -> Self {
        Self {
            id: DEFAULT_ID.to_string(),
            pending: false,
        }
    }
}

impl TodoForm for DeleteTodoForm {
    fn fields(&self) -> &'static [FormField] {
        &[FormField::Id]
    }

    fn value(&self, field: FormField) -> &str {
        match field {
            FormField::Id => &self.id,
            FormField::Title | FormField::Description => "",
        }
    }

    fn value_mut(&mut self, field: FormField) -> Option<&mut String> {
        match field {
            FormField::Id => Some(&mut self.id),
            FormField::Title | FormField::Description => None,
        }
    }

    fn build_call(&self) -> Result<TodoCall, FormError> {
        Ok(TodoCall::Delete {
            id: parse_todo_id(&self.id)?,
        })
    }

    fn reset(&mut self) {
        self.id = DEFAULT_ID.to_string();
    }

    fn is_pending(&self) -> bool {
        self.pending
    }

    fn set_pending(&mut self, pending: bool) {
        self.pending = pending;
    }
}

/// The three forms, each fully independent of the others.
#[derive(Debug, Default)]
pub struct TodoForms {
    pub create: CreateTodoForm,
    pub update: UpdateTodoForm,
    pub delete: DeleteTodoForm,
}

impl TodoForms {
    pub fn get(&self, kind: FormKind) -> &dyn TodoForm {
        match kind {
            FormKind::Create => &self.create,
            FormKind::Update => &self.update,
            FormKind::Delete => &self.delete,
        }
    }

    pub fn get_mut(&mut self, kind: FormKind) -> &mut dyn TodoForm {
        match kind {
            FormKind::Create => &mut self.create,
            FormKind::Update => &mut self.update,
            FormKind::Delete => &mut self.delete,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::TxHash;

    fn confirmed() -> Result<WriteReceipt, WriteError> {
        Ok(WriteReceipt {
            transaction_hash: TxHash::repeat_byte(0x11),
            block_number: Some(1),
        })
    }

    #[test]
    fn create_builds_positional_call_and_clears_on_success() {
        let mut form = CreateTodoForm {
            title: "Buy milk".into(),
            description: "2%".into(),
            ..Default::default()
        };

        let call = form.begin_submit().unwrap();
        assert_eq!(
            call,
            TodoCall::Create {
                title: "Buy milk".into(),
                description: "2%".into(),
            }
        );
        assert!(form.is_pending());

        form.finish_submit(&confirmed());
        assert_eq!(form.title, "");
        assert_eq!(form.description, "");
        assert!(!form.is_pending());
    }

    #[test]
    fn empty_create_fields_are_sent_as_is() {
        let mut form = CreateTodoForm::default();
        assert_eq!(
            form.begin_submit().unwrap(),
            TodoCall::Create {
                title: String::new(),
                description: String::new(),
            }
        );
    }

    #[test]
    fn failed_write_keeps_fields() {
        let mut form = UpdateTodoForm {
            id: "7".into(),
            title: "X".into(),
            description: "Y".into(),
            ..Default::default()
        };

        form.begin_submit().unwrap();
        form.finish_submit(&Err(WriteError::Reverted(TxHash::repeat_byte(0xee))));

        assert_eq!(form.id, "7");
        assert_eq!(form.title, "X");
        assert_eq!(form.description, "Y");
        assert!(!form.is_pending());
    }

    #[test]
    fn malformed_id_is_rejected_before_pending() {
        for input in ["", "abc", "-1", "4.2", "1e3"] {
            let mut form = DeleteTodoForm {
                id: input.into(),
                ..Default::default()
            };
            assert!(
                matches!(form.begin_submit(), Err(FormError::InvalidId(_))),
                "input {input:?}"
            );
            assert!(!form.is_pending());
            assert_eq!(form.id, input);
        }
    }

    #[test]
    fn parse_todo_id_accepts_full_width_integers() {
        assert_eq!(parse_todo_id(" 42 ").unwrap(), U256::from(42));
        assert_eq!(parse_todo_id("0").unwrap(), U256::ZERO);
        assert_eq!(
            parse_todo_id(&U256::MAX.to_string()).unwrap(),
            U256::MAX
        );
        // one past 2^256 - 1
        let overflow =
            "115792089237316195423570985008687907853269984665640564039457584007913129639936";
        assert!(parse_todo_id(overflow).is_err());
    }

    #[test]
    fn pending_form_rejects_second_submit() {
        let mut form = CreateTodoForm::default();
        form.begin_submit().unwrap();
        assert_eq!(form.begin_submit(), Err(FormError::Pending));
        form.finish_submit(&Err(WriteError::NotConnected));
        assert!(form.begin_submit().is_ok());
    }

    #[test]
    fn forms_are_independent() {
        let mut forms = TodoForms::default();
        if let Some(title) = forms.get_mut(FormKind::Create).value_mut(FormField::Title) {
            title.push_str("mine");
        }
        assert_eq!(forms.create.title, "mine");
        assert_eq!(forms.update.title, "");
        assert_eq!(forms.get(FormKind::Delete).value(FormField::Id), DEFAULT_ID);
        assert!(forms.get_mut(FormKind::Delete).value_mut(FormField::Title).is_none());
    }
}

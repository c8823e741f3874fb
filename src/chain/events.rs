use super::Todos;
use alloy::{
    primitives::{Address, B256, TxHash, U256},
    providers::DynProvider,
    rpc::types::Log,
    sol_types::SolEvent,
};
use futures::{Stream, StreamExt, stream::BoxStream};
use serde::Serialize;
use std::{
    fmt,
    pin::Pin,
    task::{Context, Poll},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TodoEventKind {
    Created,
    Updated,
    Deleted,
}

impl TodoEventKind {
    pub const ALL: [TodoEventKind; 3] = [
        TodoEventKind::Created,
        TodoEventKind::Updated,
        TodoEventKind::Deleted,
    ];

    pub fn signature_hash(self) -> B256 {
        match self {
            TodoEventKind::Created => Todos::TodoCreated::SIGNATURE_HASH,
            TodoEventKind::Updated => Todos::TodoUpdated::SIGNATURE_HASH,
            TodoEventKind::Deleted => Todos::TodoDeleted::SIGNATURE_HASH,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TodoEventKind::Created => "TodoCreated",
            TodoEventKind::Updated => "TodoUpdated",
            TodoEventKind::Deleted => "TodoDeleted",
        }
    }

    pub fn verb(self) -> &'static str {
        match self {
            TodoEventKind::Created => "created",
            TodoEventKind::Updated => "updated",
            TodoEventKind::Deleted => "deleted",
        }
    }
}

impl fmt::Display for TodoEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A decoded `Todo*` log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TodoEvent {
    pub kind: TodoEventKind,
    pub id: U256,
    pub owner: Address,
    pub title: Option<String>,
    pub description: Option<String>,
    pub block_number: Option<u64>,
    pub transaction_hash: Option<TxHash>,
}

impl TodoEvent {
    pub fn decode(kind: TodoEventKind, log: &Log) -> alloy::sol_types::Result<Self> {
        let (id, owner, title, description) = match kind {
            TodoEventKind::Created => {
                let data = log.log_decode::<Todos::TodoCreated>()?.inner.data;
                (data.id, data.owner, Some(data.title), Some(data.description))
            }
            TodoEventKind::Updated => {
                let data = log.log_decode::<Todos::TodoUpdated>()?.inner.data;
                (data.id, data.owner, Some(data.title), Some(data.description))
            }
            TodoEventKind::Deleted => {
                let data = log.log_decode::<Todos::TodoDeleted>()?.inner.data;
                (data.id, data.owner, None, None)
            }
        };
        Ok(Self {
            kind,
            id,
            owner,
            title,
            description,
            block_number: log.block_number,
            transaction_hash: log.transaction_hash,
        })
    }

    pub fn summary(&self) -> String {
        let mut line = format!("#{} {} by {}", self.id, self.kind.verb(), self.owner);
        if let Some(title) = &self.title {
            line.push_str(&format!(" \"{title}\""));
        }
        if let Some(block) = self.block_number {
            line.push_str(&format!(" @{block}"));
        }
        line
    }
}

/// Entries decoded from a single poll of one event filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventBatch {
    pub kind: TodoEventKind,
    pub entries: Vec<TodoEvent>,
}

impl EventBatch {
    /// Decodes `logs`, skipping entries that do not match the `kind` ABI.
    pub fn decode(kind: TodoEventKind, logs: &[Log]) -> Self {
        let entries = logs
            .iter()
            .filter_map(|log| match TodoEvent::decode(kind, log) {
                Ok(event) => Some(event),
                Err(err) => {
                    tracing::warn!(
                        event = kind.label(),
                        tx = ?log.transaction_hash,
                        %err,
                        "skipping undecodable log"
                    );
                    None
                }
            })
            .collect();
        Self { kind, entries }
    }
}

/// Lazy, unbounded sequence of [`EventBatch`]es for one event kind.
///
/// Ends only when the underlying log poller stops; a finished stream cannot be
/// restarted, open a new one through [`super::ChainContext::watch`] instead.
pub struct EventStream {
    batches: BoxStream<'static, EventBatch>,
    // The poller only holds a weak handle to its client.
    _provider: DynProvider,
}

impl EventStream {
    pub(crate) fn new(batches: BoxStream<'static, EventBatch>, provider: DynProvider) -> Self {
        Self {
            batches,
            _provider: provider,
        }
    }
}

impl Stream for EventStream {
    type Item = EventBatch;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.batches.poll_next_unpin(cx)
    }
}

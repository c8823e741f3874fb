//! Chain-facing side of the app: the `Todos` contract binding, the shared
//! [`ChainContext`], contract writes, event streams and the wallet session.

mod address;
mod events;
mod wallet;

pub use address::{AddressError, resolve_address};
pub use events::{EventBatch, EventStream, TodoEvent, TodoEventKind};
pub use wallet::{
    AccountSnapshot, AccountStatus, ConnectRequest, ConnectStatus, Connection, Connector,
    ConnectorKind, WalletError, WalletSession,
};

use alloy::{
    network::EthereumWallet,
    primitives::{Address, TxHash, U256},
    providers::{DynProvider, PendingTransactionError, Provider, ProviderBuilder},
    rpc::types::Filter,
    sol,
    transports::TransportResult,
};
use color_eyre::{Result, eyre::WrapErr};
use futures::{StreamExt, future::BoxFuture};
use std::{fmt, time::Duration};

sol! {
    #[sol(rpc)]
    contract Todos {
        event TodoCreated(uint256 indexed id, address indexed owner, string title, string description);
        event TodoUpdated(uint256 indexed id, address indexed owner, string title, string description);
        event TodoDeleted(uint256 indexed id, address indexed owner);

        function createTodo(string calldata title, string calldata description) external;
        function updateTodo(uint256 id, string calldata title, string calldata description) external;
        function deleteTodo(uint256 id) external;
    }
}

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2_000);

/// Runtime configuration shared by every component that talks to the chain.
///
/// Built once at startup and handed out by reference (or cloned into async
/// tasks); nothing reads it from ambient state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainContext {
    pub rpc_url: String,
    pub contract: Address,
    pub poll_interval: Duration,
}

impl ChainContext {
    pub fn new(
        rpc_url: impl Into<String>,
        contract_address: &str,
        poll_interval: Duration,
    ) -> Result<Self, AddressError> {
        Ok(Self {
            rpc_url: rpc_url.into(),
            contract: resolve_address(contract_address)?,
            poll_interval,
        })
    }

    pub fn contract_checksum(&self) -> String {
        self.contract.to_checksum(None)
    }

    pub(crate) async fn connect_provider(&self) -> TransportResult<DynProvider> {
        let provider = ProviderBuilder::new().connect(&self.rpc_url).await?;
        Ok(provider.erased())
    }

    pub(crate) async fn connect_signing_provider(
        &self,
        wallet: EthereumWallet,
    ) -> TransportResult<DynProvider> {
        let provider = ProviderBuilder::new()
            .wallet(wallet)
            .connect(&self.rpc_url)
            .await?;
        Ok(provider.erased())
    }

    /// Opens a log filter for `kind` on the configured contract.
    ///
    /// The returned stream is lazy: nothing is polled until it is driven.
    pub async fn watch(&self, kind: TodoEventKind) -> Result<EventStream> {
        let provider = self
            .connect_provider()
            .await
            .wrap_err_with(|| format!("failed to connect to RPC provider at {}", self.rpc_url))?;
        let filter = Filter::new()
            .address(self.contract)
            .event_signature(kind.signature_hash());
        let poller = provider
            .watch_logs(&filter)
            .await
            .wrap_err_with(|| format!("failed to install {} log filter", kind.label()))?;
        let batches = poller
            .with_poll_interval(self.poll_interval)
            .into_stream()
            .filter(|logs| futures::future::ready(!logs.is_empty()))
            .map(move |logs| EventBatch::decode(kind, &logs))
            .boxed();
        Ok(EventStream::new(batches, provider))
    }
}

/// A write against the `Todos` contract with its positional arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TodoCall {
    Create {
        title: String,
        description: String,
    },
    Update {
        id: U256,
        title: String,
        description: String,
    },
    Delete {
        id: U256,
    },
}

impl TodoCall {
    pub fn function_name(&self) -> &'static str {
        match self {
            TodoCall::Create { .. } => "createTodo",
            TodoCall::Update { .. } => "updateTodo",
            TodoCall::Delete { .. } => "deleteTodo",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReceipt {
    pub transaction_hash: TxHash,
    pub block_number: Option<u64>,
}

#[derive(Debug)]
pub enum WriteError {
    NotConnected,
    Contract(alloy::contract::Error),
    Pending(PendingTransactionError),
    Reverted(TxHash),
}

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteError::NotConnected => f.write_str("no wallet connected"),
            WriteError::Contract(err) => write!(f, "transaction rejected: {err}"),
            WriteError::Pending(err) => write!(f, "failed waiting for receipt: {err}"),
            WriteError::Reverted(hash) => write!(f, "transaction {hash} reverted"),
        }
    }
}

impl std::error::Error for WriteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WriteError::Contract(err) => Some(err),
            WriteError::Pending(err) => Some(err),
            _ => None,
        }
    }
}

impl From<alloy::contract::Error> for WriteError {
    fn from(value: alloy::contract::Error) -> Self {
        WriteError::Contract(value)
    }
}

impl From<PendingTransactionError> for WriteError {
    fn from(value: PendingTransactionError) -> Self {
        WriteError::Pending(value)
    }
}

/// Issues contract writes on behalf of a connected account.
pub trait TodoWriter: Send + Sync {
    /// Address every call is sent to.
    fn contract(&self) -> Address;

    /// Sends `call` and resolves once the transaction receipt is available.
    fn write(&self, call: TodoCall) -> BoxFuture<'_, Result<WriteReceipt, WriteError>>;
}

/// [`TodoWriter`] backed by an alloy provider. With a wallet-filled provider
/// the transaction is signed locally, otherwise the node signs for `from`.
pub struct AlloyTodoWriter {
    instance: Todos::TodosInstance<DynProvider>,
    from: Address,
}

impl AlloyTodoWriter {
    pub fn new(contract: Address, provider: DynProvider, from: Address) -> Self {
        Self {
            instance: Todos::new(contract, provider),
            from,
        }
    }
}

impl TodoWriter for AlloyTodoWriter {
    fn contract(&self) -> Address {
        *self.instance.address()
    }

    fn write(&self, call: TodoCall) -> BoxFuture<'_, Result<WriteReceipt, WriteError>> {
        Box::pin(async move {
            tracing::debug!(function = call.function_name(), from = %self.from, "sending todo write");
            let pending = match call {
                TodoCall::Create { title, description } => {
                    self.instance
                        .createTodo(title, description)
                        .from(self.from)
                        .send()
                        .await?
                }
                TodoCall::Update {
                    id,
                    title,
                    description,
                } => {
                    self.instance
                        .updateTodo(id, title, description)
                        .from(self.from)
                        .send()
                        .await?
                }
                TodoCall::Delete { id } => {
                    self.instance
                        .deleteTodo(id)
                        .from(self.from)
                        .send()
                        .await?
                }
            };
            let receipt = pending.get_receipt().await?;
            if !receipt.status() {
                return Err(WriteError::Reverted(receipt.transaction_hash));
            }
            Ok(WriteReceipt {
                transaction_hash: receipt.transaction_hash,
                block_number: receipt.block_number,
            })
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Records every call and answers with a canned outcome.
    pub struct RecordingWriter {
        contract: Address,
        fail: bool,
        calls: Mutex<Vec<(Address, TodoCall)>>,
    }

    impl RecordingWriter {
        pub fn succeeding(contract: Address) -> Self {
            Self {
                contract,
                fail: false,
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn failing(contract: Address) -> Self {
            Self {
                fail: true,
                ..Self::succeeding(contract)
            }
        }

        pub fn calls(&self) -> Vec<(Address, TodoCall)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl TodoWriter for RecordingWriter {
        fn contract(&self) -> Address {
            self.contract
        }

        fn write(&self, call: TodoCall) -> BoxFuture<'_, Result<WriteReceipt, WriteError>> {
            self.calls.lock().unwrap().push((self.contract, call));
            let fail = self.fail;
            Box::pin(async move {
                if fail {
                    Err(WriteError::Reverted(TxHash::repeat_byte(0xee)))
                } else {
                    Ok(WriteReceipt {
                        transaction_hash: TxHash::repeat_byte(0x11),
                        block_number: Some(1),
                    })
                }
            })
        }
    }

    pub fn connection_with(writer: Arc<RecordingWriter>, address: Address) -> Connection {
        Connection {
            connector_uid: "node-accounts".into(),
            addresses: vec![address],
            chain_id: 31337,
            writer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_context_resolves_contract_once() {
        let ctx = ChainContext::new(
            "http://127.0.0.1:8545",
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266",
            DEFAULT_POLL_INTERVAL,
        )
        .unwrap();
        assert_eq!(
            ctx.contract_checksum(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
        );
    }

    #[test]
    fn chain_context_rejects_invalid_contract() {
        let err = ChainContext::new("http://127.0.0.1:8545", "not-an-address", DEFAULT_POLL_INTERVAL)
            .unwrap_err();
        assert!(matches!(err, AddressError::MissingPrefix(_)));
    }

    #[test]
    fn calls_map_to_contract_functions() {
        let create = TodoCall::Create {
            title: "a".into(),
            description: "b".into(),
        };
        let delete = TodoCall::Delete { id: U256::from(3) };
        assert_eq!(create.function_name(), "createTodo");
        assert_eq!(delete.function_name(), "deleteTodo");
    }

    #[test]
    fn write_error_messages_are_readable() {
        assert_eq!(WriteError::NotConnected.to_string(), "no wallet connected");
        let hash = TxHash::repeat_byte(0xab);
        assert!(WriteError::Reverted(hash).to_string().ends_with("reverted"));
    }
}

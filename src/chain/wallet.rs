use super::{AlloyTodoWriter, ChainContext, TodoWriter};
use alloy::{
    network::EthereumWallet, primitives::Address, providers::Provider,
    signers::local::PrivateKeySigner, transports::TransportError,
};
use serde::Serialize;
use std::{fmt, sync::Arc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AccountStatus::Disconnected => "disconnected",
            AccountStatus::Connecting => "connecting",
            AccountStatus::Connected => "connected",
        })
    }
}

/// Read-only view of the wallet's account, updated only by [`WalletSession`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct AccountSnapshot {
    pub status: AccountStatus,
    pub addresses: Vec<Address>,
    pub chain_id: Option<u64>,
}

impl AccountSnapshot {
    /// Checksummed addresses rendered as a JSON array.
    pub fn addresses_json(&self) -> String {
        addresses_json(&self.addresses)
    }
}

fn addresses_json(addresses: &[Address]) -> String {
    let checksummed: Vec<String> = addresses
        .iter()
        .map(|address| address.to_checksum(None))
        .collect();
    serde_json::to_string(&checksummed).unwrap_or_else(|_| "[]".into())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectStatus {
    #[default]
    Idle,
    Pending,
    Success,
    Error,
}

impl fmt::Display for ConnectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConnectStatus::Idle => "idle",
            ConnectStatus::Pending => "pending",
            ConnectStatus::Success => "success",
            ConnectStatus::Error => "error",
        })
    }
}

#[derive(Debug)]
pub enum WalletError {
    UnknownConnector(String),
    AlreadyConnecting,
    NoAccounts,
    Transport(TransportError),
}

impl fmt::Display for WalletError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalletError::UnknownConnector(uid) => write!(f, "unknown connector \"{uid}\""),
            WalletError::AlreadyConnecting => f.write_str("a connection request is already pending"),
            WalletError::NoAccounts => f.write_str("the node did not expose any accounts"),
            WalletError::Transport(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for WalletError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WalletError::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TransportError> for WalletError {
    fn from(value: TransportError) -> Self {
        WalletError::Transport(value)
    }
}

#[derive(Debug, Clone)]
pub enum ConnectorKind {
    /// Signs locally with a configured key.
    LocalKey(PrivateKeySigner),
    /// Uses the accounts the RPC node exposes through `eth_accounts`.
    NodeAccounts,
}

/// Opaque handle to a way of connecting an account.
#[derive(Debug, Clone)]
pub struct Connector {
    uid: String,
    name: String,
    kind: ConnectorKind,
}

impl Connector {
    pub fn local_key(signer: PrivateKeySigner) -> Self {
        Self {
            uid: format!("local:{:#x}", signer.address()),
            name: "Private Key".into(),
            kind: ConnectorKind::LocalKey(signer),
        }
    }

    pub fn node_accounts() -> Self {
        Self {
            uid: "node-accounts".into(),
            name: "Node Accounts".into(),
            kind: ConnectorKind::NodeAccounts,
        }
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &ConnectorKind {
        &self.kind
    }

    pub async fn connect(self, chain: ChainContext) -> Result<Connection, WalletError> {
        let (provider, addresses) = match self.kind {
            ConnectorKind::LocalKey(signer) => {
                let address = signer.address();
                let provider = chain
                    .connect_signing_provider(EthereumWallet::from(signer))
                    .await?;
                (provider, vec![address])
            }
            ConnectorKind::NodeAccounts => {
                let provider = chain.connect_provider().await?;
                let accounts = provider.get_accounts().await?;
                if accounts.is_empty() {
                    return Err(WalletError::NoAccounts);
                }
                (provider, accounts)
            }
        };
        let chain_id = provider.get_chain_id().await?;
        let writer = AlloyTodoWriter::new(chain.contract, provider, addresses[0]);
        Ok(Connection {
            connector_uid: self.uid,
            addresses,
            chain_id,
            writer: Arc::new(writer),
        })
    }
}

/// Result of a successful connect: the account plus a writer bound to it.
#[derive(Clone)]
pub struct Connection {
    pub connector_uid: String,
    pub addresses: Vec<Address>,
    pub chain_id: u64,
    pub writer: Arc<dyn TodoWriter>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("connector_uid", &self.connector_uid)
            .field("addresses", &self.addresses)
            .field("chain_id", &self.chain_id)
            .finish_non_exhaustive()
    }
}

/// Identifies one connect attempt. Results are only applied to the attempt
/// that is still pending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    pub uid: String,
    seq: u64,
}

/// Owns the account snapshot, the connector list and the active connection.
#[derive(Debug, Default)]
pub struct WalletSession {
    connectors: Vec<Connector>,
    account: AccountSnapshot,
    connect_status: ConnectStatus,
    error: Option<String>,
    connection: Option<Connection>,
    pending: Option<ConnectRequest>,
    next_seq: u64,
}

impl WalletSession {
    pub fn new(connectors: Vec<Connector>) -> Self {
        Self {
            connectors,
            ..Self::default()
        }
    }

    pub fn connectors(&self) -> &[Connector] {
        &self.connectors
    }

    pub fn account(&self) -> &AccountSnapshot {
        &self.account
    }

    pub fn connect_status(&self) -> ConnectStatus {
        self.connect_status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_connected(&self) -> bool {
        self.account.status == AccountStatus::Connected
    }

    pub fn writer(&self) -> Option<Arc<dyn TodoWriter>> {
        self.connection
            .as_ref()
            .map(|connection| Arc::clone(&connection.writer))
    }

    /// Marks a connect attempt for `uid` as in flight and hands back the
    /// request handle plus the connector to drive it. A live connection stays
    /// usable (and disconnectable) until the new result arrives.
    pub fn begin_connect(
        &mut self,
        uid: &str,
    ) -> Result<(ConnectRequest, Connector), WalletError> {
        if self.pending.is_some() {
            return Err(WalletError::AlreadyConnecting);
        }
        let connector = self
            .connectors
            .iter()
            .find(|connector| connector.uid == uid)
            .cloned()
            .ok_or_else(|| WalletError::UnknownConnector(uid.to_string()))?;
        self.next_seq += 1;
        let request = ConnectRequest {
            uid: connector.uid.clone(),
            seq: self.next_seq,
        };
        self.pending = Some(request.clone());
        self.connect_status = ConnectStatus::Pending;
        self.error = None;
        if self.connection.is_none() {
            self.account.status = AccountStatus::Connecting;
        }
        Ok((request, connector))
    }

    /// Applies the result of `request` and reports whether it was applied.
    /// Results for any other attempt, or connections made through a different
    /// connector, are dropped.
    pub fn finish_connect(
        &mut self,
        request: &ConnectRequest,
        result: Result<Connection, WalletError>,
    ) -> bool {
        if self.pending.as_ref() != Some(request) {
            tracing::debug!(connector = %request.uid, "ignoring stale connect result");
            return false;
        }
        if let Ok(connection) = &result {
            if connection.connector_uid != request.uid {
                tracing::warn!(
                    requested = %request.uid,
                    connector = %connection.connector_uid,
                    "ignoring connect result from another connector"
                );
                return false;
            }
        }
        self.pending = None;
        match result {
            Ok(connection) => {
                tracing::info!(
                    connector = %connection.connector_uid,
                    chain_id = connection.chain_id,
                    addresses = %addresses_json(&connection.addresses),
                    "wallet connected"
                );
                self.account = AccountSnapshot {
                    status: AccountStatus::Connected,
                    addresses: connection.addresses.clone(),
                    chain_id: Some(connection.chain_id),
                };
                self.connection = Some(connection);
                self.connect_status = ConnectStatus::Success;
            }
            Err(err) => {
                tracing::warn!(connector = %request.uid, %err, "wallet connection failed");
                self.account.status = if self.connection.is_some() {
                    AccountStatus::Connected
                } else {
                    AccountStatus::Disconnected
                };
                self.connect_status = ConnectStatus::Error;
                self.error = Some(err.to_string());
            }
        }
        true
    }

    pub fn disconnect(&mut self) {
        if let Some(connection) = self.connection.take() {
            tracing::info!(connector = %connection.connector_uid, "wallet disconnected");
        }
        self.pending = None;
        self.account = AccountSnapshot::default();
        self.connect_status = ConnectStatus::Idle;
        self.error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::testing::{RecordingWriter, connection_with};
    use alloy::primitives::address;
    use std::str::FromStr;

    const ACCOUNT: Address = address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
    const ANVIL_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn local_uid() -> String {
        format!("local:{:#x}", ACCOUNT)
    }

    fn session() -> WalletSession {
        let signer = PrivateKeySigner::from_str(ANVIL_KEY).unwrap();
        WalletSession::new(vec![
            Connector::local_key(signer),
            Connector::node_accounts(),
        ])
    }

    #[test]
    fn local_key_connector_is_named_after_signer() {
        let signer = PrivateKeySigner::from_str(ANVIL_KEY).unwrap();
        let connector = Connector::local_key(signer);
        assert_eq!(connector.name(), "Private Key");
        assert_eq!(
            connector.uid(),
            "local:0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[test]
    fn connect_lifecycle_updates_snapshot() {
        let mut session = session();
        assert_eq!(session.account().status, AccountStatus::Disconnected);
        assert!(session.writer().is_none());

        let (request, connector) = session.begin_connect("node-accounts").unwrap();
        assert_eq!(connector.name(), "Node Accounts");
        assert_eq!(request.uid, "node-accounts");
        assert_eq!(session.account().status, AccountStatus::Connecting);
        assert_eq!(session.connect_status(), ConnectStatus::Pending);

        let writer = Arc::new(RecordingWriter::succeeding(ACCOUNT));
        session.finish_connect(&request, Ok(connection_with(writer, ACCOUNT)));

        assert!(session.is_connected());
        assert_eq!(session.account().chain_id, Some(31337));
        assert_eq!(session.account().addresses, vec![ACCOUNT]);
        assert_eq!(
            session.account().addresses_json(),
            "[\"0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266\"]"
        );
        assert!(session.writer().is_some());

        session.disconnect();
        assert_eq!(session.account(), &AccountSnapshot::default());
        assert!(session.writer().is_none());
    }

    #[test]
    fn failed_connect_keeps_error_verbatim() {
        let mut session = session();
        let (request, _) = session.begin_connect("node-accounts").unwrap();
        session.finish_connect(&request, Err(WalletError::NoAccounts));

        assert_eq!(session.account().status, AccountStatus::Disconnected);
        assert_eq!(session.connect_status(), ConnectStatus::Error);
        assert_eq!(session.error(), Some("the node did not expose any accounts"));

        // a retry clears the previous error
        session.begin_connect("node-accounts").unwrap();
        assert!(session.error().is_none());
    }

    #[test]
    fn rejects_unknown_and_concurrent_connects() {
        let mut session = session();
        assert!(matches!(
            session.begin_connect("metamask"),
            Err(WalletError::UnknownConnector(_))
        ));
        session.begin_connect("node-accounts").unwrap();
        assert!(matches!(
            session.begin_connect("node-accounts"),
            Err(WalletError::AlreadyConnecting)
        ));
    }

    #[test]
    fn stale_connect_result_is_ignored_after_disconnect() {
        let mut session = session();
        let (request, _) = session.begin_connect("node-accounts").unwrap();
        session.disconnect();

        let writer = Arc::new(RecordingWriter::succeeding(ACCOUNT));
        session.finish_connect(&request, Ok(connection_with(writer, ACCOUNT)));

        assert!(!session.is_connected());
        assert_eq!(session.connect_status(), ConnectStatus::Idle);
    }

    #[test]
    fn late_result_does_not_answer_a_newer_request() {
        let mut session = session();
        let (stale, _) = session.begin_connect("node-accounts").unwrap();
        session.disconnect();
        let (current, connector) = session.begin_connect(&local_uid()).unwrap();
        assert_eq!(connector.name(), "Private Key");

        let writer = Arc::new(RecordingWriter::succeeding(ACCOUNT));
        assert!(!session.finish_connect(&stale, Ok(connection_with(writer.clone(), ACCOUNT))));
        assert!(!session.is_connected());
        assert_eq!(session.connect_status(), ConnectStatus::Pending);

        session.finish_connect(&stale, Err(WalletError::NoAccounts));
        assert!(session.error().is_none());

        let connection = Connection {
            connector_uid: local_uid(),
            ..connection_with(writer, ACCOUNT)
        };
        assert!(session.finish_connect(&current, Ok(connection)));
        assert!(session.is_connected());
        assert_eq!(session.connect_status(), ConnectStatus::Success);
    }

    #[test]
    fn same_connector_retry_ignores_the_earlier_attempt() {
        let mut session = session();
        let (first, _) = session.begin_connect("node-accounts").unwrap();
        session.disconnect();
        let (second, _) = session.begin_connect("node-accounts").unwrap();
        assert_ne!(first, second);

        session.finish_connect(&first, Err(WalletError::NoAccounts));
        assert_eq!(session.connect_status(), ConnectStatus::Pending);

        let writer = Arc::new(RecordingWriter::succeeding(ACCOUNT));
        session.finish_connect(&second, Ok(connection_with(writer, ACCOUNT)));
        assert!(session.is_connected());
    }

    #[test]
    fn result_from_another_connector_is_dropped() {
        let mut session = session();
        let (request, _) = session.begin_connect(&local_uid()).unwrap();

        let writer = Arc::new(RecordingWriter::succeeding(ACCOUNT));
        session.finish_connect(&request, Ok(connection_with(writer, ACCOUNT)));

        assert!(!session.is_connected());
        assert_eq!(session.connect_status(), ConnectStatus::Pending);
    }

    #[test]
    fn reconnecting_keeps_the_live_connection_disconnectable() {
        let mut session = session();
        let (request, _) = session.begin_connect("node-accounts").unwrap();
        let writer = Arc::new(RecordingWriter::succeeding(ACCOUNT));
        session.finish_connect(&request, Ok(connection_with(writer, ACCOUNT)));

        session.begin_connect(&local_uid()).unwrap();

        assert_eq!(session.account().status, AccountStatus::Connected);
        assert!(session.is_connected());
        assert!(session.writer().is_some());
        assert_eq!(session.connect_status(), ConnectStatus::Pending);
    }
}

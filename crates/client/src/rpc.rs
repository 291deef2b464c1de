//! Staking ledger reached over Ethereum JSON-RPC
//!
//! Reads go through `eth_call`. Writes are sent with `eth_sendTransaction`
//! from accounts unlocked on the node, then confirmed by polling
//! `eth_getTransactionReceipt`.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use seascape_bindings::{StakingCall, TokenCall, abi};
use seascape_core::{
    Address, Amount, LedgerError, LedgerResult, SessionId, SessionParams, StakingLedger,
    StakingToken,
};

use crate::config::RpcConfig;

/// Revert reason carried by a JSON-RPC error object
///
/// Nodes report reverts differently: an `Error(string)` payload in `data`,
/// a per-transaction `reason` map (ganache), or a `revert <reason>` suffix
/// in the message.
pub fn revert_reason(error: &Value) -> Option<String> {
    match error.get("data") {
        Some(Value::String(data)) => {
            if let Some(reason) = abi::parse_hex(data).ok().and_then(|b| abi::decode_revert_reason(&b)) {
                return Some(reason);
            }
        }
        Some(Value::Object(map)) => {
            if let Some(reason) = map.get("data").and_then(Value::as_str).and_then(|data| {
                abi::parse_hex(data).ok().and_then(|b| abi::decode_revert_reason(&b))
            }) {
                return Some(reason);
            }
            if let Some(reason) =
                map.values().find_map(|v| v.get("reason").and_then(Value::as_str))
            {
                return Some(reason.to_string());
            }
        }
        _ => {}
    }

    let message = error.get("message").and_then(Value::as_str)?;
    ["execution reverted: ", "revert "].iter().find_map(|marker| {
        message
            .find(marker)
            .map(|at| message[at + marker.len()..].trim().trim_matches('\'').to_string())
            .filter(|reason| !reason.is_empty())
    })
}

/// Turn a JSON-RPC error object into a ledger error
fn classify_error(method: &str, error: &Value) -> LedgerError {
    match revert_reason(error) {
        Some(reason) => LedgerError::from_reason(&reason),
        None => LedgerError::Transport(format!("{method} failed: {error}")),
    }
}

/// Staking ledger backed by a deployed contract
#[derive(Debug)]
pub struct RpcLedger {
    config: RpcConfig,
    staking: Address,
    /// HTTP client for RPC calls
    http_client: reqwest::Client,
}

impl RpcLedger {
    /// Create a ledger for the configured staking contract
    pub fn new(config: RpcConfig) -> Result<Self> {
        let staking = config.staking_address()?;
        Ok(Self { config, staking, http_client: reqwest::Client::new() })
    }

    /// Address of the staking contract all calls go to
    pub const fn staking_address(&self) -> Address {
        self.staking
    }

    /// Call node RPC
    async fn rpc_call(&self, method: &str, params: Value) -> LedgerResult<Value> {
        let request = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let response = self
            .http_client
            .post(&self.config.url)
            .json(&request)
            .send()
            .await
            .map_err(LedgerError::transport)?
            .json::<Value>()
            .await
            .map_err(LedgerError::transport)?;

        if let Some(error) = response.get("error") {
            return Err(classify_error(method, error));
        }

        response
            .get("result")
            .cloned()
            .ok_or_else(|| LedgerError::Transport(format!("{method}: no result in response")))
    }

    /// Accounts unlocked on the node, in `eth_accounts` order
    pub async fn accounts(&self) -> LedgerResult<Vec<Address>> {
        let result = self.rpc_call("eth_accounts", json!([])).await?;
        let list = result
            .as_array()
            .ok_or_else(|| LedgerError::transport("eth_accounts: expected an array"))?;

        list.iter()
            .map(|v| {
                v.as_str()
                    .and_then(|s| s.parse().ok())
                    .ok_or_else(|| LedgerError::Transport(format!("eth_accounts: bad entry {v}")))
            })
            .collect()
    }

    /// `eth_call` against `to`, returning raw return data
    async fn call(&self, from: Option<Address>, to: Address, calldata: &[u8]) -> LedgerResult<Vec<u8>> {
        let mut tx = json!({
            "to": to.to_string(),
            "data": format!("0x{}", hex::encode(calldata)),
        });
        if let Some(from) = from {
            tx["from"] = json!(from.to_string());
        }

        let result = self.rpc_call("eth_call", json!([tx, "latest"])).await?;
        let hex_result = result
            .as_str()
            .ok_or_else(|| LedgerError::transport("eth_call: invalid result"))?;
        abi::parse_hex(hex_result).map_err(LedgerError::transport)
    }

    /// Send a transaction and wait until it is mined
    async fn send(&self, from: Address, to: Address, calldata: &[u8], label: &str) -> LedgerResult<()> {
        let tx_request = json!({
            "from": from.to_string(),
            "to": to.to_string(),
            "data": format!("0x{}", hex::encode(calldata)),
            "gas": self.config.gas,
        });

        let result = self.rpc_call("eth_sendTransaction", json!([tx_request])).await?;
        let tx_hash = result
            .as_str()
            .ok_or_else(|| LedgerError::transport("no tx hash in response"))?
            .to_string();
        debug!("{} sent by {}: {}", label, from, tx_hash);

        let receipt = self.wait_for_receipt(&tx_hash).await?;
        let status = receipt.get("status").and_then(Value::as_str);
        if status == Some("0x1") {
            return Ok(());
        }

        warn!("{} reverted in {} (status {:?})", label, tx_hash, status);
        // Replay as a call to recover the reason
        match self.call(Some(from), to, calldata).await {
            Err(err) if err.is_rejection() => Err(err),
            _ => Err(LedgerError::Rejected(format!("{label}: transaction {tx_hash} reverted"))),
        }
    }

    async fn wait_for_receipt(&self, tx_hash: &str) -> LedgerResult<Value> {
        for _ in 0..self.config.receipt_attempts {
            let receipt = self.rpc_call("eth_getTransactionReceipt", json!([tx_hash])).await?;
            if !receipt.is_null() {
                return Ok(receipt);
            }
            tokio::time::sleep(self.config.receipt_poll).await;
        }
        Err(LedgerError::Transport(format!("no receipt for {tx_hash}")))
    }

    async fn read(&self, call: StakingCall) -> LedgerResult<Vec<u8>> {
        debug_assert!(call.is_read_only());
        self.call(None, self.staking, &call.calldata()).await
    }

    async fn transact(&self, call: StakingCall, actor: Address) -> LedgerResult<()> {
        self.send(actor, self.staking, &call.calldata(), call.method()).await
    }
}

#[async_trait]
impl StakingLedger for RpcLedger {
    async fn start_session(
        &self,
        token: Address,
        params: &SessionParams,
        actor: Address,
    ) -> LedgerResult<()> {
        let call = StakingCall::StartSession {
            token,
            total_reward: params.total_reward,
            period: params.period_secs,
            start_time: params.start_time,
            generation: params.generation,
        };
        self.transact(call, actor).await
    }

    async fn session_for(&self, token: Address) -> LedgerResult<SessionId> {
        let data = self.read(StakingCall::SessionFor { token }).await?;
        abi::decode_u64(&data).map_err(LedgerError::transport)
    }

    async fn deposit(&self, token: Address, amount: Amount, actor: Address) -> LedgerResult<()> {
        self.transact(StakingCall::Deposit { token, amount }, actor).await
    }

    async fn withdraw(&self, token: Address, amount: Amount, actor: Address) -> LedgerResult<()> {
        self.transact(StakingCall::Withdraw { token, amount }, actor).await
    }

    async fn claim(&self, token: Address, actor: Address) -> LedgerResult<()> {
        self.transact(StakingCall::Claim { token }, actor).await
    }

    async fn staked_balance_of(&self, token: Address, account: Address) -> LedgerResult<Amount> {
        let data = self.read(StakingCall::StakedBalanceOf { token, account }).await?;
        abi::decode_uint(&data).map_err(LedgerError::transport)
    }

    async fn claimable(&self, token: Address, account: Address) -> LedgerResult<Amount> {
        let data = self.read(StakingCall::Claimable { token, account }).await?;
        abi::decode_uint(&data).map_err(LedgerError::transport)
    }
}

#[async_trait]
impl StakingToken for RpcLedger {
    async fn approve(&self, token: Address, amount: Amount, actor: Address) -> LedgerResult<()> {
        let call = TokenCall::Approve { spender: self.staking, amount };
        info!("  → approving {} of {} for {}", amount, token, self.staking);
        self.send(actor, token, &call.calldata(), call.method()).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use axum::extract::State as AxumState;
    use axum::routing::post;
    use axum::{Json, Router};

    use super::*;
    use seascape_bindings::Token;
    use seascape_core::error::{NOTHING_TO_CLAIM, NO_STAKE_TO_CLAIM, SESSION_STARTED};

    const STAKING: &str = "0x0000000000000000000000000000000000000abc";

    type Reply = dyn Fn(&str, &Value) -> Value + Send + Sync;

    /// JSON-RPC node answering from a fixed script
    #[derive(Clone)]
    struct FakeNode {
        reply: Arc<Reply>,
        methods: Arc<Mutex<Vec<String>>>,
    }

    impl FakeNode {
        fn methods(&self) -> Vec<String> {
            self.methods.lock().unwrap().clone()
        }
    }

    async fn rpc_handler(AxumState(node): AxumState<FakeNode>, Json(req): Json<Value>) -> Json<Value> {
        let method = req["method"].as_str().unwrap_or_default().to_string();
        node.methods.lock().unwrap().push(method.clone());
        let mut response = (node.reply)(&method, &req["params"]);
        response["jsonrpc"] = json!("2.0");
        response["id"] = req["id"].clone();
        Json(response)
    }

    /// Serve `reply` on a local port and point a ledger at it
    async fn spawn_node(
        reply: impl Fn(&str, &Value) -> Value + Send + Sync + 'static,
    ) -> (RpcLedger, FakeNode) {
        let node = FakeNode { reply: Arc::new(reply), methods: Arc::default() };
        let app = Router::new().route("/", post(rpc_handler)).with_state(node.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let config = RpcConfig {
            url: format!("http://{addr}"),
            staking_address: Some(STAKING.to_string()),
            receipt_poll: Duration::from_millis(1),
            receipt_attempts: 3,
            ..RpcConfig::default()
        };
        (RpcLedger::new(config).unwrap(), node)
    }

    fn revert_data(reason: &str) -> String {
        format!("0x{}", hex::encode(abi::encode_revert_reason(reason)))
    }

    fn word(value: u64) -> String {
        format!("0x{}", hex::encode(Token::from(value).to_word()))
    }

    /// Selector of the calldata in a call or transaction, as lowercase hex
    fn called_selector(params: &Value) -> String {
        params[0]["data"].as_str().unwrap_or_default().trim_start_matches("0x")[..8].to_string()
    }

    fn selector_hex(call: &StakingCall) -> String {
        hex::encode(abi::selector(call.signature()))
    }

    fn token() -> Address {
        "0x5beabaebb3146685dd74176f68a0721f91297d37".parse().unwrap()
    }

    fn player() -> Address {
        Address::repeat_byte(0xa1)
    }

    #[tokio::test]
    async fn test_rejected_send_is_classified() {
        let claim = selector_hex(&StakingCall::Claim { token: token() });
        let (ledger, node) = spawn_node(move |method, params| match method {
            "eth_sendTransaction" => {
                if called_selector(params) == claim {
                    json!({ "error": {
                        "code": 3,
                        "message": "execution reverted",
                        "data": revert_data(NO_STAKE_TO_CLAIM)
                    } })
                } else {
                    json!({ "error": {
                        "code": -32000,
                        "message": format!("VM Exception while processing transaction: revert {SESSION_STARTED}")
                    } })
                }
            }
            _ => json!({ "result": null }),
        })
        .await;

        let params = SessionParams {
            total_reward: Amount::from(100u64),
            period_secs: 5,
            start_time: 0,
            generation: 0,
        };
        let err = ledger.start_session(token(), &params, player()).await.unwrap_err();
        assert_eq!(err, LedgerError::SessionActive);

        let err = ledger.claim(token(), player()).await.unwrap_err();
        assert_eq!(err, LedgerError::NoStake);

        // rejected before mining, so no receipt was asked for
        assert_eq!(node.methods(), vec!["eth_sendTransaction", "eth_sendTransaction"]);
    }

    #[tokio::test]
    async fn test_failed_receipt_replays_call_for_reason() {
        let (ledger, node) = spawn_node(|method, _| match method {
            "eth_sendTransaction" => json!({ "result": "0xfeed" }),
            "eth_getTransactionReceipt" => {
                json!({ "result": { "transactionHash": "0xfeed", "status": "0x0" } })
            }
            "eth_call" => json!({ "error": {
                "code": 3,
                "message": "execution reverted",
                "data": revert_data(NOTHING_TO_CLAIM)
            } }),
            _ => json!({ "error": { "code": -32601, "message": "method not found" } }),
        })
        .await;

        let err = ledger.claim(token(), player()).await.unwrap_err();
        assert_eq!(err, LedgerError::NothingToClaim);
        assert_eq!(
            node.methods(),
            vec!["eth_sendTransaction", "eth_getTransactionReceipt", "eth_call"]
        );
    }

    #[tokio::test]
    async fn test_failed_receipt_without_reason() {
        let (ledger, _) = spawn_node(|method, _| match method {
            "eth_sendTransaction" => json!({ "result": "0xfeed" }),
            "eth_getTransactionReceipt" => json!({ "result": { "status": "0x0" } }),
            // replay succeeds, the revert cannot be explained
            "eth_call" => json!({ "result": "0x" }),
            _ => json!({ "result": null }),
        })
        .await;

        let err = ledger.withdraw(token(), Amount::from(1u64), player()).await.unwrap_err();
        assert_eq!(err, LedgerError::Rejected("withdraw: transaction 0xfeed reverted".to_string()));
    }

    #[tokio::test]
    async fn test_missing_receipt_times_out() {
        let (ledger, node) = spawn_node(|method, _| match method {
            "eth_sendTransaction" => json!({ "result": "0xfeed" }),
            _ => json!({ "result": null }),
        })
        .await;

        let err = ledger.deposit(token(), Amount::from(50u64), player()).await.unwrap_err();
        assert!(!err.is_rejection());
        assert!(err.to_string().contains("no receipt for 0xfeed"));

        let polls = node.methods().iter().filter(|m| *m == "eth_getTransactionReceipt").count();
        assert_eq!(polls, 3);
    }

    #[tokio::test]
    async fn test_accounts_and_reads() {
        let session_for = selector_hex(&StakingCall::SessionFor { token: token() });
        let claimable = selector_hex(&StakingCall::Claimable { token: token(), account: player() });
        let (ledger, _) = spawn_node(move |method, params| match method {
            "eth_accounts" => json!({ "result": [
                "0x00000000000000000000000000000000000000a0",
                "0x00000000000000000000000000000000000000a1"
            ] }),
            "eth_call" if called_selector(params) == session_for => json!({ "result": word(1) }),
            "eth_call" if called_selector(params) == claimable => json!({ "result": word(40) }),
            "eth_sendTransaction" => json!({ "result": "0xbeef" }),
            "eth_getTransactionReceipt" => json!({ "result": { "status": "0x1" } }),
            _ => json!({ "error": { "code": -32601, "message": "method not found" } }),
        })
        .await;

        let accounts = ledger.accounts().await.unwrap();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[1].as_slice()[19], 0xa1);

        assert_eq!(ledger.session_for(token()).await.unwrap(), 1);
        assert_eq!(ledger.claimable(token(), player()).await.unwrap(), Amount::from(40u64));
        ledger.approve(token(), Amount::from(50u64), player()).await.unwrap();

        // not wired on this node
        let err = ledger.staked_balance_of(token(), player()).await.unwrap_err();
        assert!(!err.is_rejection());
    }

    #[tokio::test]
    async fn test_bad_account_entry_is_transport() {
        let (ledger, _) = spawn_node(|_, _| {
            json!({ "result": ["0x00000000000000000000000000000000000000a0", "not-an-address"] })
        })
        .await;

        let err = ledger.accounts().await.unwrap_err();
        assert!(err.to_string().contains("bad entry"));
    }

    #[test]
    fn test_reason_from_error_payload() {
        let data = format!("0x{}", hex::encode(abi::encode_revert_reason(NO_STAKE_TO_CLAIM)));
        let error = json!({ "code": 3, "message": "execution reverted", "data": data });
        assert_eq!(revert_reason(&error).as_deref(), Some(NO_STAKE_TO_CLAIM));
    }

    #[test]
    fn test_reason_from_ganache_map() {
        let error = json!({
            "code": -32000,
            "message": "VM Exception while processing transaction: revert",
            "data": {
                "0xabc": { "error": "revert", "program_counter": 812, "reason": SESSION_STARTED },
                "stack": "RuntimeError: VM Exception",
                "name": "RuntimeError"
            }
        });
        assert_eq!(revert_reason(&error).as_deref(), Some(SESSION_STARTED));
    }

    #[test]
    fn test_reason_from_message() {
        let error = json!({
            "message": format!("VM Exception while processing transaction: revert {SESSION_STARTED}")
        });
        assert_eq!(revert_reason(&error).as_deref(), Some(SESSION_STARTED));

        let error = json!({ "message": "execution reverted: Seascape Staking: Nothing was generated to claim" });
        assert_eq!(
            classify_error("eth_sendTransaction", &error),
            LedgerError::NothingToClaim
        );
    }

    #[test]
    fn test_non_revert_error_is_transport() {
        let error = json!({ "code": -32601, "message": "method not found" });
        assert_eq!(revert_reason(&error), None);
        assert!(!classify_error("eth_call", &error).is_rejection());
    }

    #[test]
    fn test_new_requires_staking_address() {
        assert!(RpcLedger::new(RpcConfig::default()).is_err());

        let config = RpcConfig {
            staking_address: Some("0x0000000000000000000000000000000000000abc".to_string()),
            ..RpcConfig::default()
        };
        let ledger = RpcLedger::new(config).unwrap();
        assert_eq!(ledger.staking_address().as_slice()[19], 0xbc);
    }
}

//! JSON-RPC 2.0 chain client over HTTP.
//!
//! Methods used: `getBalance`, `getTokenAccountsByOwner` (token
//! program, `jsonParsed`), `getLatestBlockhash`, `sendTransaction`
//! (base64). Every transport error, non-2xx status, RPC error object
//! or missing field surfaces as [`SwiftvaultError::NetworkError`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use swiftvault_types::{PublicKey, Result, SwiftvaultError};

use crate::{Blockhash, ChainClient, TokenAccount, TransactionSignature};

/// SPL token program id.
pub const TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// `{ "context": {...}, "value": ... }` wrapper used by most methods.
#[derive(Deserialize)]
struct WithContext<T> {
    value: Option<T>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LatestBlockhash {
    blockhash: String,
}

#[derive(Deserialize)]
struct KeyedTokenAccount {
    account: ParsedAccount,
}

#[derive(Deserialize)]
struct ParsedAccount {
    data: ParsedData,
}

#[derive(Deserialize)]
struct ParsedData {
    parsed: ParsedToken,
}

#[derive(Deserialize)]
struct ParsedToken {
    info: TokenInfo,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenInfo {
    mint: String,
    owner: String,
    token_amount: TokenAmount,
}

#[derive(Deserialize)]
struct TokenAmount {
    amount: String,
    decimals: u8,
}

fn network_error(reason: impl Into<String>) -> SwiftvaultError {
    SwiftvaultError::NetworkError {
        reason: reason.into(),
    }
}

// ---------------------------------------------------------------------------
// Response decoding
// ---------------------------------------------------------------------------

/// Decodes a JSON-RPC response body into its `result`.
fn decode_response<T: DeserializeOwned>(method: &str, body: &str) -> Result<T> {
    let response: RpcResponse<T> = serde_json::from_str(body)
        .map_err(|e| network_error(format!("{method}: malformed response: {e}")))?;

    if let Some(err) = response.error {
        return Err(network_error(format!(
            "{method}: rpc error {}: {}",
            err.code, err.message
        )));
    }

    response
        .result
        .ok_or_else(|| network_error(format!("{method}: response has no result")))
}

fn context_value<T>(method: &str, wrapped: WithContext<T>) -> Result<T> {
    wrapped
        .value
        .ok_or_else(|| network_error(format!("{method}: response has no value")))
}

fn parse_balance(body: &str) -> Result<u64> {
    let wrapped: WithContext<u64> = decode_response("getBalance", body)?;
    context_value("getBalance", wrapped)
}

fn parse_token_accounts(body: &str) -> Result<Vec<TokenAccount>> {
    let method = "getTokenAccountsByOwner";
    let wrapped: WithContext<Vec<KeyedTokenAccount>> = decode_response(method, body)?;

    context_value(method, wrapped)?
        .into_iter()
        .map(|keyed| {
            let info = keyed.account.data.parsed.info;
            let mint: PublicKey = info
                .mint
                .parse()
                .map_err(|e| network_error(format!("{method}: bad mint: {e}")))?;
            let owner: PublicKey = info
                .owner
                .parse()
                .map_err(|e| network_error(format!("{method}: bad owner: {e}")))?;
            let amount_raw = info
                .token_amount
                .amount
                .parse::<u64>()
                .map_err(|e| network_error(format!("{method}: bad amount: {e}")))?;

            Ok(TokenAccount {
                mint,
                amount_raw,
                decimals: info.token_amount.decimals,
                owner,
            })
        })
        .collect()
}

fn parse_latest_blockhash(body: &str) -> Result<Blockhash> {
    let method = "getLatestBlockhash";
    let wrapped: WithContext<LatestBlockhash> = decode_response(method, body)?;
    context_value(method, wrapped)?
        .blockhash
        .parse()
        .map_err(|e| network_error(format!("{method}: {e}")))
}

fn parse_send_transaction(body: &str) -> Result<TransactionSignature> {
    let signature: String = decode_response("sendTransaction", body)?;
    if signature.is_empty() {
        return Err(network_error("sendTransaction: empty signature"));
    }
    Ok(TransactionSignature::new(signature))
}

// ---------------------------------------------------------------------------
// JsonRpcChainClient
// ---------------------------------------------------------------------------

/// [`ChainClient`] backed by a JSON-RPC HTTP endpoint.
pub struct JsonRpcChainClient {
    client: Client,
    url: String,
    next_id: AtomicU64,
}

impl JsonRpcChainClient {
    /// Builds a client for `url` with the given request timeout.
    ///
    /// # Errors
    ///
    /// [`SwiftvaultError::ConfigError`] if the HTTP client cannot be
    /// constructed.
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .build()
            .map_err(|e| SwiftvaultError::ConfigError {
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            url: url.trim_end_matches('/').to_string(),
            next_id: AtomicU64::new(1),
        })
    }

    /// Endpoint this client talks to.
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call(&self, method: &str, params: Value) -> Result<String> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        tracing::debug!(method, id, url = %self.url, "rpc request");

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| network_error(format!("{method}: request failed: {e}")))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(network_error(format!("{method}: rate limited by endpoint")));
        }
        if !status.is_success() {
            return Err(network_error(format!("{method}: HTTP {}", status.as_u16())));
        }

        response
            .text()
            .await
            .map_err(|e| network_error(format!("{method}: failed to read body: {e}")))
    }
}

#[async_trait]
impl ChainClient for JsonRpcChainClient {
    async fn get_balance(&self, owner: &PublicKey) -> Result<u64> {
        let body = self
            .call("getBalance", json!([owner.to_base58(), { "commitment": "confirmed" }]))
            .await?;
        parse_balance(&body)
    }

    async fn get_token_accounts(&self, owner: &PublicKey) -> Result<Vec<TokenAccount>> {
        let body = self
            .call(
                "getTokenAccountsByOwner",
                json!([
                    owner.to_base58(),
                    { "programId": TOKEN_PROGRAM_ID },
                    { "encoding": "jsonParsed", "commitment": "confirmed" }
                ]),
            )
            .await?;
        parse_token_accounts(&body)
    }

    async fn latest_blockhash(&self) -> Result<Blockhash> {
        let body = self
            .call("getLatestBlockhash", json!([{ "commitment": "finalized" }]))
            .await?;
        parse_latest_blockhash(&body)
    }

    async fn submit_transaction(&self, signed_tx: &[u8]) -> Result<TransactionSignature> {
        let encoded = BASE64.encode(signed_tx);
        let body = self
            .call(
                "sendTransaction",
                json!([encoded, { "encoding": "base64", "preflightCommitment": "confirmed" }]),
            )
            .await?;
        let signature = parse_send_transaction(&body)?;
        tracing::info!(signature = %signature, "transaction submitted");
        Ok(signature)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

    fn owner() -> PublicKey {
        PublicKey::from_bytes([5u8; 32])
    }

    #[test]
    fn balance_is_read_from_context_value() -> std::result::Result<(), SwiftvaultError> {
        let body = r#"{"jsonrpc":"2.0","result":{"context":{"slot":1},"value":1500000000},"id":1}"#;
        assert_eq!(parse_balance(body)?, 1_500_000_000);
        Ok(())
    }

    #[test]
    fn missing_balance_value_is_an_error_not_zero() {
        let body = r#"{"jsonrpc":"2.0","result":{"context":{"slot":1},"value":null},"id":1}"#;
        assert!(matches!(
            parse_balance(body),
            Err(SwiftvaultError::NetworkError { .. })
        ));
    }

    #[test]
    fn rpc_error_object_is_transient_network_error() {
        let body = r#"{"jsonrpc":"2.0","error":{"code":-32602,"message":"Invalid param"},"id":1}"#;
        let err = parse_balance(body).err();
        assert!(err.as_ref().map(SwiftvaultError::is_transient).unwrap_or(false));
        assert!(err.map(|e| e.to_string().contains("Invalid param")).unwrap_or(false));
    }

    #[test]
    fn garbage_body_is_network_error() {
        assert!(matches!(
            parse_balance("<html>502</html>"),
            Err(SwiftvaultError::NetworkError { .. })
        ));
    }

    #[test]
    fn token_accounts_are_parsed() -> std::result::Result<(), SwiftvaultError> {
        let owner = owner();
        let body = format!(
            r#"{{"jsonrpc":"2.0","id":1,"result":{{"context":{{"slot":9}},"value":[
                {{"pubkey":"{owner}","account":{{"lamports":2039280,"owner":"{TOKEN_PROGRAM_ID}",
                  "data":{{"program":"spl-token","space":165,"parsed":{{"type":"account","info":{{
                    "isNative":false,"mint":"{MINT}","owner":"{owner}","state":"initialized",
                    "tokenAmount":{{"amount":"2500000","decimals":6,"uiAmount":2.5,"uiAmountString":"2.5"}}
                  }}}}}}}}}}
            ]}}}}"#
        );
        let accounts = parse_token_accounts(&body)?;
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].mint.to_base58(), MINT);
        assert_eq!(accounts[0].owner, owner);
        assert_eq!(accounts[0].amount_raw, 2_500_000);
        assert_eq!(accounts[0].decimals, 6);
        Ok(())
    }

    #[test]
    fn empty_token_list_is_ok() -> std::result::Result<(), SwiftvaultError> {
        let body = r#"{"jsonrpc":"2.0","result":{"context":{"slot":1},"value":[]},"id":1}"#;
        assert!(parse_token_accounts(body)?.is_empty());
        Ok(())
    }

    #[test]
    fn latest_blockhash_is_decoded() -> std::result::Result<(), SwiftvaultError> {
        let expected = Blockhash::from_bytes([3u8; 32]);
        let body = format!(
            r#"{{"jsonrpc":"2.0","result":{{"context":{{"slot":2}},"value":{{"blockhash":"{expected}","lastValidBlockHeight":3090}}}},"id":1}}"#
        );
        assert_eq!(parse_latest_blockhash(&body)?, expected);
        Ok(())
    }

    #[test]
    fn send_transaction_returns_signature() -> std::result::Result<(), SwiftvaultError> {
        let body = r#"{"jsonrpc":"2.0","result":"2id3YC2jK9G5Wo2phDx4gJVAew8DcY5NAojnVuao8rkxwPYPe8cSwE5GzhEgJA2y8fVjDEo6iR6ykBvDxrTQrtpb","id":1}"#;
        let sig = parse_send_transaction(body)?;
        assert!(sig.as_str().starts_with("2id3YC"));
        Ok(())
    }

    #[test]
    fn client_trims_trailing_slash() -> std::result::Result<(), SwiftvaultError> {
        let client = JsonRpcChainClient::new("http://127.0.0.1:8899/", Duration::from_secs(5))?;
        assert_eq!(client.url(), "http://127.0.0.1:8899");
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_network_error() -> std::result::Result<(), SwiftvaultError> {
        let client = JsonRpcChainClient::new("http://127.0.0.1:9", Duration::from_secs(2))?;
        let result = client.get_balance(&owner()).await;
        assert!(matches!(result, Err(SwiftvaultError::NetworkError { .. })));
        Ok(())
    }
}

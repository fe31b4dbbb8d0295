//! Ethereum JSON-RPC ledger reader.
//!
//! Basket reads (balance, price, composition) go to the basket chain
//! endpoint; USD oracle answers are read from the oracle chain endpoint.
//! Every read is a single `eth_call` against the `latest` block.
//!
//! Return words are decoded as unsigned 256-bit integers and must fit in
//! 128 bits before scaling:
//! - balances, supply and composition amounts: 18 decimals
//! - basket manager price: 30 decimals
//! - oracle answers: 8 decimals

use crate::ledger::LedgerReader;
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use basket_hedge_core::{ChainConfig, Constituent, ContractAddresses, HedgeAsset};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sha3::{Digest, Keccak256};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

pub const TOKEN_DECIMALS: u32 = 18;
pub const PRICE_DECIMALS: u32 = 30;
pub const ORACLE_DECIMALS: u32 = 8;

const BALANCE_OF: &str = "balanceOf(address)";
const GET_PRICE: &str = "getPrice(bool)";
const TOTAL_SUPPLY: &str = "totalSupply()";
const USDG_AMOUNTS: &str = "usdgAmounts(address)";
const LATEST_ANSWER: &str = "latestAnswer()";

/// Reads the snapshot inputs from two JSON-RPC endpoints.
#[derive(Debug)]
pub struct RpcLedger {
    client: reqwest::Client,
    basket_rpc_url: String,
    oracle_rpc_url: String,
    owner: [u8; 32],
    contracts: ContractAddresses,
    tokens: BTreeMap<Constituent, [u8; 32]>,
    next_id: AtomicU64,
}

impl RpcLedger {
    /// Builds a reader from the chain section of the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if an endpoint is unset or any address is malformed.
    pub fn new(chain: &ChainConfig) -> Result<Self> {
        if chain.basket_rpc_url.is_empty() {
            bail!("basket RPC endpoint is not configured (chain.basket_rpc_url / ARBITRUM_RPC_URL)");
        }
        if chain.oracle_rpc_url.is_empty() {
            bail!("oracle RPC endpoint is not configured (chain.oracle_rpc_url / MAINNET_RPC_URL)");
        }

        let owner = encode_address(&chain.owner_address)
            .context("owner address (chain.owner_address / ADDRESS)")?;

        let contracts = &chain.contracts;
        for (name, address) in [
            ("staked_basket", &contracts.staked_basket),
            ("basket_manager", &contracts.basket_manager),
            ("vault", &contracts.vault),
            ("usdg", &contracts.usdg),
            ("eth_usd_oracle", &contracts.eth_usd_oracle),
            ("btc_usd_oracle", &contracts.btc_usd_oracle),
        ] {
            encode_address(address).with_context(|| format!("contract address `{name}`"))?;
        }

        let tokens = chain
            .tokens
            .iter()
            .map(|(constituent, address)| {
                encode_address(address)
                    .with_context(|| format!("token address for `{constituent}`"))
                    .map(|word| (*constituent, word))
            })
            .collect::<Result<BTreeMap<_, _>>>()?;

        Ok(Self {
            client: reqwest::Client::new(),
            basket_rpc_url: chain.basket_rpc_url.clone(),
            oracle_rpc_url: chain.oracle_rpc_url.clone(),
            owner,
            contracts: contracts.clone(),
            tokens,
            next_id: AtomicU64::new(1),
        })
    }

    async fn request(
        &self,
        rpc_url: &str,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value> {
        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": self.next_id.fetch_add(1, Ordering::Relaxed)
        });

        let response: RpcResponse = self
            .client
            .post(rpc_url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(error) = response.error {
            bail!("RPC error: {} - {}", error.code, error.message);
        }

        response
            .result
            .filter(|result| !result.is_null())
            .ok_or_else(|| anyhow!("No result in RPC response to {method}"))
    }

    async fn call(&self, rpc_url: &str, to: &str, data: &[u8]) -> Result<[u8; 32]> {
        let params = serde_json::json!([
            { "to": to, "data": format!("0x{}", hex::encode(data)) },
            "latest"
        ]);
        let result = self.request(rpc_url, "eth_call", params).await?;
        let hex_data = result
            .as_str()
            .ok_or_else(|| anyhow!("eth_call to {to} returned a non-string result"))?;

        tracing::debug!(to, result = hex_data, "eth_call");
        return_word(hex_data).with_context(|| format!("decoding eth_call result from {to}"))
    }

    async fn read_scaled(
        &self,
        rpc_url: &str,
        to: &str,
        data: &[u8],
        decimals: u32,
    ) -> Result<f64> {
        let word = self.call(rpc_url, to, data).await?;
        Ok(scale(decode_uint(&word)?, decimals))
    }
}

#[async_trait]
impl LedgerReader for RpcLedger {
    async fn latest_block_time(&self) -> Result<DateTime<Utc>> {
        let block = self
            .request(
                &self.basket_rpc_url,
                "eth_getBlockByNumber",
                serde_json::json!(["latest", false]),
            )
            .await?;

        let timestamp = block
            .get("timestamp")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| anyhow!("block has no timestamp"))?;
        let secs = parse_quantity(timestamp)?;

        DateTime::from_timestamp(i64::try_from(secs)?, 0)
            .ok_or_else(|| anyhow!("block timestamp {secs} is out of range"))
    }

    async fn basket_units_held(&self) -> Result<f64> {
        self.read_scaled(
            &self.basket_rpc_url,
            &self.contracts.staked_basket,
            &calldata(BALANCE_OF, &[self.owner]),
            TOKEN_DECIMALS,
        )
        .await
    }

    async fn basket_unit_price_usd(&self) -> Result<f64> {
        // `true` selects the maximise-price variant.
        self.read_scaled(
            &self.basket_rpc_url,
            &self.contracts.basket_manager,
            &calldata(GET_PRICE, &[encode_bool(true)]),
            PRICE_DECIMALS,
        )
        .await
    }

    async fn oracle_price_usd(&self, asset: HedgeAsset) -> Result<f64> {
        let oracle = match asset {
            HedgeAsset::Eth => &self.contracts.eth_usd_oracle,
            HedgeAsset::Btc => &self.contracts.btc_usd_oracle,
        };
        let word = self
            .call(&self.oracle_rpc_url, oracle, &calldata(LATEST_ANSWER, &[]))
            .await?;
        if word[0] & 0x80 != 0 {
            bail!("oracle answer for {asset} is negative");
        }
        Ok(scale(decode_uint(&word)?, ORACLE_DECIMALS))
    }

    async fn composition_total(&self) -> Result<f64> {
        self.read_scaled(
            &self.basket_rpc_url,
            &self.contracts.usdg,
            &calldata(TOTAL_SUPPLY, &[]),
            TOKEN_DECIMALS,
        )
        .await
    }

    async fn composition_amount(&self, constituent: Constituent) -> Result<f64> {
        let token = self
            .tokens
            .get(&constituent)
            .ok_or_else(|| anyhow!("no token address configured for {constituent}"))?;
        self.read_scaled(
            &self.basket_rpc_url,
            &self.contracts.vault,
            &calldata(USDG_AMOUNTS, &[*token]),
            TOKEN_DECIMALS,
        )
        .await
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<serde_json::Value>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// First four bytes of the Keccak-256 hash of a canonical signature.
fn selector(signature: &str) -> [u8; 4] {
    let hash = Keccak256::digest(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

fn calldata(signature: &str, args: &[[u8; 32]]) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + args.len() * 32);
    data.extend_from_slice(&selector(signature));
    for arg in args {
        data.extend_from_slice(arg);
    }
    data
}

/// Left-pads a 20-byte hex address into an ABI word.
fn encode_address(address: &str) -> Result<[u8; 32]> {
    let digits = address.strip_prefix("0x").unwrap_or(address);
    let bytes = hex::decode(digits).with_context(|| format!("invalid address {address:?}"))?;
    if bytes.len() != 20 {
        bail!("address {address:?} is {} bytes, expected 20", bytes.len());
    }
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(&bytes);
    Ok(word)
}

fn encode_bool(value: bool) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[31] = u8::from(value);
    word
}

/// First 32-byte word of hex return data.
fn return_word(hex_data: &str) -> Result<[u8; 32]> {
    let bytes = hex::decode(hex_data.strip_prefix("0x").unwrap_or(hex_data))?;
    if bytes.len() < 32 {
        bail!(
            "return data is {} bytes, expected at least one 32-byte word",
            bytes.len()
        );
    }
    let mut word = [0u8; 32];
    word.copy_from_slice(&bytes[..32]);
    Ok(word)
}

fn decode_uint(word: &[u8; 32]) -> Result<u128> {
    if word[..16].iter().any(|byte| *byte != 0) {
        bail!("value 0x{} does not fit in 128 bits", hex::encode(word));
    }
    let mut low = [0u8; 16];
    low.copy_from_slice(&word[16..]);
    Ok(u128::from_be_bytes(low))
}

fn parse_quantity(quantity: &str) -> Result<u64> {
    u64::from_str_radix(quantity.strip_prefix("0x").unwrap_or(quantity), 16)
        .with_context(|| format!("invalid hex quantity {quantity:?}"))
}

/// Fixed-point integer to float, splitting off the integer part first so
/// large raw values keep their fractional digits.
#[must_use]
pub fn scale(raw: u128, decimals: u32) -> f64 {
    let unit = 10u128.pow(decimals);
    (raw / unit) as f64 + (raw % unit) as f64 / unit as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    const OWNER: &str = "0x00000000000000000000000000000000000000aa";
    const E18: u128 = 1_000_000_000_000_000_000;

    fn word(value: u128) -> String {
        format!("0x{value:064x}")
    }

    fn reply(id: &serde_json::Value, result: serde_json::Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": result
        }))
    }

    /// Answers every read the reader makes, dispatching on method, target
    /// and selector.
    fn ledger_responder(
        contracts: ContractAddresses,
    ) -> impl Fn(&Request) -> ResponseTemplate + Send + Sync + 'static {
        move |req: &Request| {
            let body: serde_json::Value = serde_json::from_slice(&req.body).unwrap();
            let id = body["id"].clone();

            if body["method"] == "eth_getBlockByNumber" {
                return reply(
                    &id,
                    serde_json::json!({ "number": "0x10", "timestamp": "0x65f1a2b0" }),
                );
            }

            let to = body["params"][0]["to"].as_str().unwrap().to_string();
            let data = body["params"][0]["data"].as_str().unwrap().to_string();
            let is = |signature: &str| {
                data.starts_with(&format!("0x{}", hex::encode(selector(signature))))
            };

            let value = if is(BALANCE_OF) {
                1_500 * E18
            } else if is(GET_PRICE) {
                950_000_000_000_000_000_000_000_000_000
            } else if is(TOTAL_SUPPLY) {
                1_000 * E18
            } else if is(USDG_AMOUNTS) {
                125 * E18
            } else if is(LATEST_ANSWER) && to.eq_ignore_ascii_case(&contracts.eth_usd_oracle) {
                300_000_000_000
            } else if is(LATEST_ANSWER) && to.eq_ignore_ascii_case(&contracts.btc_usd_oracle) {
                6_000_000_000_000
            } else {
                return ResponseTemplate::new(400);
            };
            reply(&id, serde_json::Value::String(word(value)))
        }
    }

    fn chain(uri: &str) -> ChainConfig {
        ChainConfig {
            basket_rpc_url: uri.to_string(),
            oracle_rpc_url: uri.to_string(),
            owner_address: OWNER.to_string(),
            ..ChainConfig::default()
        }
    }

    async fn mock_ledger() -> (MockServer, RpcLedger) {
        let server = MockServer::start().await;
        let config = chain(&server.uri());
        Mock::given(method("POST"))
            .respond_with(ledger_responder(config.contracts.clone()))
            .mount(&server)
            .await;
        let ledger = RpcLedger::new(&config).unwrap();
        (server, ledger)
    }

    #[test]
    fn known_selectors() {
        assert_eq!(hex::encode(selector(BALANCE_OF)), "70a08231");
        assert_eq!(hex::encode(selector(TOTAL_SUPPLY)), "18160ddd");
        assert_eq!(hex::encode(selector(LATEST_ANSWER)), "50d25bcd");
    }

    #[test]
    fn address_is_left_padded() {
        let word = encode_address(OWNER).unwrap();
        assert_eq!(word[..31], [0u8; 31]);
        assert_eq!(word[31], 0xaa);
    }

    #[test]
    fn malformed_address_is_rejected() {
        assert!(encode_address("0x1234").is_err());
        assert!(encode_address("not-an-address").is_err());
    }

    #[test]
    fn oversized_word_is_rejected() {
        let mut word = [0u8; 32];
        word[15] = 1;
        assert!(decode_uint(&word).is_err());
    }

    #[test]
    fn short_return_data_is_rejected() {
        assert!(return_word("0x").is_err());
        assert!(return_word("0x01").is_err());
    }

    #[test]
    fn scaling_keeps_fractional_digits() {
        assert_eq!(scale(1_500 * E18, TOKEN_DECIMALS), 1_500.0);
        assert_eq!(scale(300_050_000_000, ORACLE_DECIMALS), 3_000.5);
        assert!((scale(950_000_000_000_000_000_000_000_000_000, PRICE_DECIMALS) - 0.95).abs() < 1e-12);
    }

    #[test]
    fn missing_endpoint_is_rejected() {
        let config = ChainConfig {
            owner_address: OWNER.to_string(),
            ..ChainConfig::default()
        };
        assert!(RpcLedger::new(&config).is_err());
    }

    #[tokio::test]
    async fn reads_every_value() {
        let (_server, ledger) = mock_ledger().await;

        assert_eq!(ledger.basket_units_held().await.unwrap(), 1_500.0);
        assert!((ledger.basket_unit_price_usd().await.unwrap() - 0.95).abs() < 1e-12);
        assert_eq!(ledger.composition_total().await.unwrap(), 1_000.0);
        assert_eq!(ledger.composition_amount(Constituent::Dai).await.unwrap(), 125.0);
        assert_eq!(ledger.oracle_price_usd(HedgeAsset::Eth).await.unwrap(), 3_000.0);
        assert_eq!(ledger.oracle_price_usd(HedgeAsset::Btc).await.unwrap(), 60_000.0);
        assert_eq!(
            ledger.latest_block_time().await.unwrap().timestamp(),
            0x65f1_a2b0
        );
    }

    #[tokio::test]
    async fn rpc_error_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": { "code": -32000, "message": "execution reverted" }
            })))
            .mount(&server)
            .await;

        let ledger = RpcLedger::new(&chain(&server.uri())).unwrap();
        let err = ledger.composition_total().await.unwrap_err();
        assert!(err.to_string().contains("execution reverted"));
    }

    #[tokio::test]
    async fn negative_oracle_answer_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": format!("0x{}", "f".repeat(64))
            })))
            .mount(&server)
            .await;

        let ledger = RpcLedger::new(&chain(&server.uri())).unwrap();
        let err = ledger.oracle_price_usd(HedgeAsset::Eth).await.unwrap_err();
        assert!(err.to_string().contains("negative"));
    }

    #[tokio::test]
    async fn null_result_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": null
            })))
            .mount(&server)
            .await;

        let ledger = RpcLedger::new(&chain(&server.uri())).unwrap();
        assert!(ledger.basket_units_held().await.is_err());
    }
}

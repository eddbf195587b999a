//! HTTP + WebSocket adapter for the gateway fronting the chain node.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::{future, StreamExt};
use reqwest::Client;
use shared::{
    domain::{Address, PolicyId},
    error::ApiError,
    protocol::{
        EventEnvelope, TokenAddressResponse, TokenSymbolResponse, TransactionReceipt,
        TransactionRequest,
    },
    U256,
};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{info, warn};
use url::Url;

use crate::{
    contract::{EventFeed, EventStream, IssuanceContract, TransactionApi},
    error::TransactionError,
};

#[derive(Clone)]
pub struct GatewayClient {
    http: Client,
    base_url: Url,
    app_address: Address,
}

impl GatewayClient {
    pub fn new(base_url: &str, app_address: Address) -> Result<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .with_context(|| format!("invalid gateway url: {base_url}"))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(anyhow!("gateway url must start with http:// or https://"));
        }
        Ok(Self {
            http: Client::new(),
            base_url,
            app_address,
        })
    }

    pub fn app_address(&self) -> Address {
        self.app_address
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}/{path}"))
            .with_context(|| format!("invalid gateway endpoint: {path}"))
    }

    fn app_path(&self, suffix: &str) -> String {
        format!("apps/{:?}/{suffix}", self.app_address)
    }

    pub fn events_url(&self, from_sequence: Option<u64>) -> Result<Url> {
        let mut url = self.endpoint(&self.app_path("events"))?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|_| anyhow!("cannot derive websocket url from {}", self.base_url))?;
        if let Some(from) = from_sequence {
            url.query_pairs_mut().append_pair("from", &from.to_string());
        }
        Ok(url)
    }

    pub async fn submit(
        &self,
        request: TransactionRequest,
    ) -> Result<TransactionReceipt, TransactionError> {
        let name = request.name();
        let transport = |source: anyhow::Error| TransactionError::Transport {
            request: name,
            source,
        };

        let url = self
            .endpoint(&self.app_path("transactions"))
            .map_err(transport)?;
        let response = self
            .http
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|err| transport(err.into()))?;

        let status = response.status();
        if status.is_success() {
            let receipt: TransactionReceipt = response
                .json()
                .await
                .map_err(|err| transport(anyhow!("invalid receipt body: {err}")))?;
            info!(
                request = name,
                tx_hash = ?receipt.tx_hash,
                "gateway: transaction submitted"
            );
            return Ok(receipt);
        }

        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ApiError>(&body) {
            Ok(error) => {
                warn!(request = name, code = ?error.code, "gateway: transaction rejected");
                Err(TransactionError::Rejected {
                    request: name,
                    error: error.into(),
                })
            }
            Err(_) => Err(transport(anyhow!("gateway returned {status}: {body}"))),
        }
    }
}

#[async_trait]
impl IssuanceContract for GatewayClient {
    async fn token(&self) -> Result<Address> {
        let url = self.endpoint(&self.app_path("token"))?;
        let body: TokenAddressResponse = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("invalid token address response")?;
        Ok(body.address)
    }

    async fn token_symbol(&self, token: Address) -> Result<String> {
        let url = self.endpoint(&format!("tokens/{token:?}/symbol"))?;
        let body: TokenSymbolResponse = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("invalid token symbol response")?;
        Ok(body.symbol)
    }
}

#[async_trait]
impl TransactionApi for GatewayClient {
    async fn add_policy(
        &self,
        beneficiary: Address,
        block_inflation_rate: U256,
    ) -> Result<TransactionReceipt, TransactionError> {
        self.submit(TransactionRequest::AddPolicy {
            beneficiary,
            block_inflation_rate,
        })
        .await
    }

    async fn remove_policy(
        &self,
        policy_id: PolicyId,
    ) -> Result<TransactionReceipt, TransactionError> {
        self.submit(TransactionRequest::RemovePolicy { policy_id })
            .await
    }

    async fn execute_issuance(&self) -> Result<TransactionReceipt, TransactionError> {
        self.submit(TransactionRequest::ExecuteIssuance).await
    }
}

#[async_trait]
impl EventFeed for GatewayClient {
    async fn subscribe(&self, from_sequence: Option<u64>) -> Result<EventStream> {
        let ws_url = self.events_url(from_sequence)?;
        let (ws_stream, _) = connect_async(ws_url.as_str())
            .await
            .with_context(|| format!("failed to connect event feed: {ws_url}"))?;
        info!(url = %ws_url, "gateway: event feed connected");
        let (_, ws_reader) = ws_stream.split();

        let events = ws_reader
            .take_while(|msg| future::ready(!matches!(msg, Ok(Message::Close(_)))))
            .filter_map(|msg| async move {
                match msg {
                    Ok(Message::Text(text)) => match serde_json::from_str::<EventEnvelope>(&text) {
                        Ok(envelope) => Some(Ok(envelope)),
                        Err(err) => {
                            warn!("gateway: skipping malformed event frame: {err}");
                            None
                        }
                    },
                    Ok(_) => None,
                    Err(err) => Some(Err(anyhow!("event feed receive failed: {err}"))),
                }
            })
            .boxed();
        Ok(events)
    }
}

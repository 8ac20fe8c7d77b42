use gloo_net::http::{Request, Response};
use serde::de::DeserializeOwned;
use wasm_bindgen_futures::spawn_local;

use upbeat_shared::{GatewayError, LandResponse, PlanGateway, PlayerResponse};

/// Base URL of the game server: the stored `server` key, else the one baked
/// in at build time, else the page's own origin.
pub fn server_base() -> String {
    crate::storage::drafts()
        .server_base()
        .or_else(|| option_env!("UPBEAT_SERVER").map(str::to_string))
        .unwrap_or_default()
        .trim_end_matches('/')
        .to_string()
}

fn encode(segment: &str) -> String {
    String::from(js_sys::encode_uri_component(segment))
}

fn network(e: gloo_net::Error) -> GatewayError {
    GatewayError::Network(format!("fetch error: {e}"))
}

fn check(resp: Response) -> Result<Response, GatewayError> {
    if !resp.ok() {
        return Err(GatewayError::Status {
            status: resp.status(),
        });
    }
    Ok(resp)
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, GatewayError> {
    resp.json::<T>()
        .await
        .map_err(|e| GatewayError::Decode(format!("{e}")))
}

/// HTTP client for the game server.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    base: String,
}

impl Default for HttpGateway {
    fn default() -> Self {
        Self::new(server_base())
    }
}

impl HttpGateway {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    fn player_url(&self, player: &str, suffix: &str) -> String {
        self.url(&format!("/player/{}{suffix}", encode(player)))
    }

    pub async fn fetch_player(&self, player: &str) -> Result<PlayerResponse, GatewayError> {
        let resp = Request::get(&self.player_url(player, ""))
            .send()
            .await
            .map_err(network)?;
        decode(check(resp)?).await
    }

    pub async fn fetch_land(&self) -> Result<LandResponse, GatewayError> {
        let resp = Request::get(&self.url("/Land"))
            .send()
            .await
            .map_err(network)?;
        decode(check(resp)?).await
    }

    async fn put_ready(&self) -> Result<(), GatewayError> {
        let resp = Request::put(&self.url("/newGame"))
            .send()
            .await
            .map_err(network)?;
        check(resp).map(|_| ())
    }
}

impl PlanGateway for HttpGateway {
    async fn save_plan(&self, player: &str, plan: &str) -> Result<(), GatewayError> {
        let resp = Request::put(&self.player_url(player, "/constructionplan"))
            .header("Content-Type", "text/plain")
            .body(plan.to_string())
            .map_err(network)?
            .send()
            .await
            .map_err(network)?;
        check(resp).map(|_| ())
    }

    async fn validate_plan(&self, player: &str) -> Result<(), GatewayError> {
        let resp = Request::post(&self.player_url(player, "/parse"))
            .send()
            .await
            .map_err(network)?;
        check(resp).map(|_| ())
    }

    fn mark_ready(&self) {
        let gateway = self.clone();
        spawn_local(async move {
            if let Err(e) = gateway.put_ready().await {
                web_sys::console::warn_1(&format!("ready notice failed: {e}").into());
            }
        });
    }
}

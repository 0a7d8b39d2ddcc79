use std::{future::Future, time::Duration};

use serde::de;
use shared::interaction::{has_error_marker, NetworkEvent};
use tokio::{sync::mpsc::UnboundedSender, task::JoinHandle};
use tracing::*;

pub mod last_winner;
pub mod mining_info;
pub mod pool_info;
pub mod submit_pool;
pub mod submit_solo;
pub mod submit_solo_fallback;
pub mod trigger;

pub use last_winner::RequestLastWinner;
pub use mining_info::RequestMiningInfo;
pub use pool_info::RequestPoolInfo;
pub use submit_pool::SubmitPoolNonce;
pub use submit_solo::SubmitSoloNonce;
pub use submit_solo_fallback::SubmitSoloNonceFallback;
pub use trigger::RequestTriggerServer;

/// Runs network tasks on their own execution contexts without blocking the
/// caller. Deliberately unbounded: volume is a handful of tasks per round
/// plus at most three fallbacks per submission, availability wins over
/// backpressure.
#[derive(Debug, Default)]
pub struct TaskPool;

impl TaskPool {
    pub fn execute<F>(&self, task: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static, {
        tokio::spawn(task)
    }
}

/// Collaborators every task shares: the HTTP client and the event channel
/// back to the rest of the miner.
#[derive(Debug, Clone)]
pub struct TaskCtx {
    pub client: reqwest::Client,
    pub events: UnboundedSender<NetworkEvent>,
}

impl TaskCtx {
    pub fn publish(&self, event: NetworkEvent) {
        // receiver gone means we are shutting down, nothing left to notify
        self.events.send(event).ok();
    }
}

/// One-shot unit of network work, configured once and executed exactly once.
#[derive(Debug, Clone)]
pub enum NetworkTask {
    MiningInfo(RequestMiningInfo),
    TriggerServer(RequestTriggerServer),
    LastWinner(RequestLastWinner),
    PoolInfo(RequestPoolInfo),
    SubmitPool(SubmitPoolNonce),
    SubmitSolo(SubmitSoloNonce),
    SubmitSoloFallback(SubmitSoloNonceFallback),
}

impl NetworkTask {
    /// Never lets a failure escape: every transport or protocol error ends
    /// here as a logged warning.
    pub async fn run(self, ctx: TaskCtx) {
        match self {
            NetworkTask::MiningInfo(task) => task.run(&ctx).await,
            NetworkTask::TriggerServer(task) => task.run(&ctx).await,
            NetworkTask::LastWinner(task) => task.run(&ctx).await,
            NetworkTask::PoolInfo(task) => task.run(&ctx).await,
            NetworkTask::SubmitPool(task) => task.run(&ctx).await,
            NetworkTask::SubmitSolo(task) => task.run(&ctx).await,
            NetworkTask::SubmitSoloFallback(task) => task.run(&ctx).await,
        }
    }
}

/// GET a wallet/pool endpoint and deserialize the payload. An `error`-marked
/// body is a soft failure: logged, `None` returned, no event published.
pub(crate) async fn get_json<T>(ctx: &TaskCtx, url: &str, timeout: u64, what: &str) -> Option<T>
where
    T: de::DeserializeOwned, {
    let response = match ctx.client.get(url).timeout(Duration::from_millis(timeout)).send().await {
        Ok(response) => response,
        Err(err) if err.is_timeout() => {
            warn!("'{what}' ran into connection timeout of '{} sec.', try increasing it", timeout / 1000);
            return None;
        }
        Err(err) => {
            warn!("fail to send '{what}' request: {err:#}");
            return None;
        }
    };

    let text = match response.text().await {
        Ok(text) => text,
        Err(err) => {
            warn!("fail to read '{what}' response content: {err:#}");
            return None;
        }
    };

    if has_error_marker(&text) {
        warn!("error: '{what}' not successful: {text}");
        return None;
    }

    match serde_json::from_str(&text) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!("fail to deserialize '{what}' response: {err:#}, response: {text}");
            None
        }
    }
}

/// POST a submission and deserialize the outcome. Submissions parse error
/// payloads instead of discarding them, the caller reports the description.
pub(crate) async fn post_json<T>(
    ctx: &TaskCtx,
    url: &str,
    params: &[(&str, String)],
    headers: &[(&'static str, String)],
    timeout: u64,
    what: &str,
) -> Option<T>
where
    T: de::DeserializeOwned, {
    let mut request = ctx
        .client
        .post(url)
        .query(params)
        .header("X-Miner", concat!("miner-", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_millis(timeout));
    for (name, value) in headers {
        request = request.header(*name, value.as_str());
    }

    let response = match request.send().await {
        Ok(response) => response,
        Err(err) if err.is_timeout() => {
            warn!("unable to '{what}', caused by connection timeout, currently '{} sec.', try increasing it", timeout / 1000);
            return None;
        }
        Err(err) => {
            warn!("fail to send '{what}' request: {err:#}");
            return None;
        }
    };

    let text = match response.text().await {
        Ok(text) => text,
        Err(err) => {
            warn!("fail to read '{what}' response content: {err:#}");
            return None;
        }
    };

    match serde_json::from_str(&text) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!("fail to deserialize '{what}' response: {err:#}, response: {text}");
            None
        }
    }
}

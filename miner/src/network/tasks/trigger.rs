use std::time::Duration;

use tracing::*;

use super::TaskCtx;

/// Keep-alive ping against the solo wallet. Some wallets stop forging state
/// updates when no request reaches them between rounds; the response itself
/// is discarded.
#[derive(Debug, Clone)]
pub struct RequestTriggerServer {
    pub server: String,
    pub connection_timeout: u64,
}

impl RequestTriggerServer {
    pub async fn run(self, ctx: &TaskCtx) {
        let url = format!("{}/burst?requestType=getMiningInfo", self.server);
        let request = ctx.client.get(&url).timeout(Duration::from_millis(self.connection_timeout));
        match request.send().await {
            Ok(_) => trace!("wallet server triggered"),
            Err(err) => debug!("fail to trigger wallet server: {err:#}"),
        }
    }
}

use shared::{
    interaction::{AccountResponse, BlockResponse, NetworkEvent},
    utils::retry,
};
use tracing::*;

use super::{get_json, TaskCtx};

/// Looks up who forged the previous round. The block may not have reached
/// this wallet yet when a round change comes in, so the first call retries
/// on a fixed interval before the chain is given up.
#[derive(Debug, Clone)]
pub struct RequestLastWinner {
    pub server: String,
    pub block_number: u64,
    pub connection_timeout: u64,
    pub retries: u32,
    pub retry_interval: u64,
}

impl RequestLastWinner {
    pub async fn run(self, ctx: &TaskCtx) {
        let last_block = self.block_number.saturating_sub(1);
        let block_url = format!("{}/burst?requestType=getBlock&height={}", self.server, last_block);

        let block = retry(
            || async {
                get_json::<BlockResponse>(ctx, &block_url, self.connection_timeout, "getBlock").await.ok_or("unavailable")
            },
            self.retries,
            self.retry_interval,
        )
        .await;

        let Ok(block) = block else {
            warn!("last winner of block '{last_block}' not available after {} retries", self.retries);
            return;
        };

        let account_url =
            format!("{}/burst?requestType=getAccount&account={}", self.server, block.generator);
        let Some(account) = get_json::<AccountResponse>(ctx, &account_url, self.connection_timeout, "getAccount").await
        else {
            return;
        };

        ctx.publish(NetworkEvent::LastWinner {
            block_number: last_block,
            account_id: block.generator,
            account_rs: account.account_rs,
        });
    }
}

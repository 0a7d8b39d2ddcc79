use num_bigint::BigUint;
use shared::{
    interaction::{NetworkEvent, SubmitResultResponse},
    types::AccountId,
    utils::format_deadline,
};
use tracing::*;

use super::{post_json, TaskCtx};

/// Submits a found deadline to the pool. The pool identifies the miner by
/// numeric account id and uses the capacity header for share accounting.
#[derive(Debug, Clone)]
pub struct SubmitPoolNonce {
    pub server: String,
    pub account_id: AccountId,
    pub block_number: u64,
    pub connection_timeout: u64,
    pub nonce: BigUint,
    pub chunk_part_start_nonce: BigUint,
    pub calculated_deadline: u64,
    pub total_capacity: u64,
    pub result: BigUint,
}

impl SubmitPoolNonce {
    pub async fn run(self, ctx: &TaskCtx) {
        debug!(
            "commit nonce '{}' (chunk part start '{}', result '{}') to pool",
            self.nonce, self.chunk_part_start_nonce, self.result
        );

        let url = format!("{}/burst", self.server);
        let params = [
            ("requestType", "submitNonce".to_string()),
            ("accountId", self.account_id.to_string()),
            ("nonce", self.nonce.to_string()),
            ("blockheight", self.block_number.to_string()),
        ];
        // capacity in gigabytes per pool convention
        let headers = [("X-Capacity", (self.total_capacity / 1_000_000_000).to_string())];

        let Some(result) = post_json::<SubmitResultResponse>(
            ctx,
            &url,
            &params,
            &headers,
            self.connection_timeout,
            "submit pool nonce",
        )
        .await
        else {
            return;
        };

        if !result.is_success() {
            warn!(
                "error: submit pool nonce not successful: {}",
                result.error_description.as_deref().unwrap_or("unknown reason")
            );
            return;
        }

        match result.deadline {
            Some(deadline) if deadline == self.calculated_deadline => {
                info!(
                    "dl '{}' committed to pool, block '{}' ({})",
                    deadline,
                    self.block_number,
                    format_deadline(deadline)
                );
                ctx.publish(NetworkEvent::SubmitResult {
                    block_number: self.block_number,
                    nonce: self.nonce,
                    chunk_part_start_nonce: self.chunk_part_start_nonce,
                    deadline,
                });
            }
            _ => {
                warn!(
                    "error: pool deadline '{:?}' does not match calculated deadline '{}'",
                    result.deadline, self.calculated_deadline
                );
            }
        }
    }
}

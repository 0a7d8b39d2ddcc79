use num_bigint::BigUint;
use shared::{
    interaction::{NetworkEvent, SubmitResultResponse},
    types::SecretPhrase,
    utils::format_deadline,
};
use tracing::*;

use super::{post_json, TaskCtx};

/// Submits a found deadline straight to the solo wallet, authenticated by
/// the pass phrase.
#[derive(Debug, Clone)]
pub struct SubmitSoloNonce {
    pub server: String,
    pub pass_phrase: SecretPhrase,
    pub block_number: u64,
    pub connection_timeout: u64,
    pub nonce: BigUint,
    pub chunk_part_start_nonce: BigUint,
    pub calculated_deadline: u64,
    pub result: BigUint,
}

impl SubmitSoloNonce {
    pub async fn run(self, ctx: &TaskCtx) {
        debug!(
            "commit nonce '{}' (chunk part start '{}', result '{}') to solo wallet",
            self.nonce, self.chunk_part_start_nonce, self.result
        );

        let url = format!("{}/burst", self.server);
        let params = [
            ("requestType", "submitNonce".to_string()),
            ("secretPhrase", self.pass_phrase.as_str().to_string()),
            ("nonce", self.nonce.to_string()),
        ];

        let Some(result) = post_json::<SubmitResultResponse>(
            ctx,
            &url,
            &params,
            &[],
            self.connection_timeout,
            "submit solo nonce",
        )
        .await
        else {
            return;
        };

        if !result.is_success() {
            warn!(
                "error: submit solo nonce not successful: {}",
                result.error_description.as_deref().unwrap_or("unknown reason")
            );
            return;
        }

        match result.deadline {
            Some(deadline) if deadline == self.calculated_deadline => {
                info!(
                    "dl '{}' committed to solo wallet, block '{}' ({})",
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
                // happens when the pass phrase does not belong to the plots
                warn!(
                    "error: calculated deadline '{}' does not match deadline from solo wallet '{:?}'",
                    self.calculated_deadline, result.deadline
                );
            }
        }
    }
}

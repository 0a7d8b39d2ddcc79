use std::time::Duration;

use num_bigint::BigUint;
use shared::{interaction::SubmitResultResponse, types::SecretPhrase};
use tokio::time::sleep;
use tracing::*;

use super::{post_json, TaskCtx};

/// Delayed re-submission of a promising solo deadline. Some wallets drop a
/// submission without a trace; recommitting the bare nonce after a fixed
/// delay costs one request and recovers the round. Fire-and-forget: no
/// event is published, the outcome is only logged.
#[derive(Debug, Clone)]
pub struct SubmitSoloNonceFallback {
    pub server: String,
    pub delay: u64,
    pub pass_phrase: SecretPhrase,
    pub connection_timeout: u64,
    pub nonce: BigUint,
    pub calculated_deadline: u64,
}

impl SubmitSoloNonceFallback {
    pub async fn run(self, ctx: &TaskCtx) {
        sleep(Duration::from_millis(self.delay)).await;

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
            "recommit solo nonce",
        )
        .await
        else {
            return;
        };

        if result.is_success() {
            if result.deadline == Some(self.calculated_deadline) {
                info!("recommit dl '{}' after '{} sec.'", self.calculated_deadline, self.delay / 1000);
            }
        } else {
            warn!(
                "error: recommit solo nonce not successful: {}",
                result.error_description.as_deref().unwrap_or("unknown reason")
            );
        }
    }
}

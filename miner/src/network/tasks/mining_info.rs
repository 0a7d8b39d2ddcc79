use shared::interaction::{MiningInfoResponse, NetworkEvent};

use super::{get_json, TaskCtx};

/// Round discovery: asks the current endpoint for the active mining round
/// and announces a state change when the chain moved past the block this
/// task was dispatched with.
#[derive(Debug, Clone)]
pub struct RequestMiningInfo {
    pub server: String,
    pub block_number: u64,
    pub pool_mining: bool,
    pub connection_timeout: u64,
    pub default_target_deadline: u64,
}

impl RequestMiningInfo {
    pub async fn run(self, ctx: &TaskCtx) {
        let url = format!("{}/burst?requestType=getMiningInfo", self.server);
        let Some(info) = get_json::<MiningInfoResponse>(ctx, &url, self.connection_timeout, "getMiningInfo").await
        else {
            return;
        };

        if info.height > self.block_number {
            // pools may demand a tighter deadline than the local default
            let target_deadline = match info.target_deadline {
                Some(pool_deadline) if self.pool_mining && pool_deadline < self.default_target_deadline => {
                    pool_deadline
                }
                _ => self.default_target_deadline,
            };

            ctx.publish(NetworkEvent::StateChange {
                block_number: info.height,
                base_target: info.base_target,
                generation_signature: info.generation_signature,
                target_deadline,
            });
        }
    }
}

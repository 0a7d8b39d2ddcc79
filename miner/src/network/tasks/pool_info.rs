use shared::{
    interaction::{AccountResponse, AccountsWithRewardRecipientResponse, NetworkEvent, RewardRecipientResponse},
    types::AccountId,
};

use super::{get_json, TaskCtx};

/// Pool statistics lookup, a chain of three sequential wallet calls:
/// resolve the reward recipient, count the accounts assigned to it, fetch
/// its balances. Any failing link aborts the rest of the chain.
#[derive(Debug, Clone)]
pub struct RequestPoolInfo {
    pub wallet_server: String,
    pub account_id: AccountId,
    pub connection_timeout: u64,
}

impl RequestPoolInfo {
    pub async fn run(self, ctx: &TaskCtx) {
        let url = format!(
            "{}/burst?requestType=getRewardRecipient&account={}",
            self.wallet_server, self.account_id
        );
        let Some(recipient) =
            get_json::<RewardRecipientResponse>(ctx, &url, self.connection_timeout, "getRewardRecipient").await
        else {
            return;
        };

        // number of registered miner accounts, missing data counts as zero
        let url = format!(
            "{}/burst?requestType=getAccountsWithRewardRecipient&account={}",
            self.wallet_server, recipient.reward_recipient
        );
        let accounts = get_json::<AccountsWithRewardRecipientResponse>(
            ctx,
            &url,
            self.connection_timeout,
            "getAccountsWithRewardRecipient",
        )
        .await;

        let url = format!(
            "{}/burst?requestType=getAccount&account={}",
            self.wallet_server, recipient.reward_recipient
        );
        let Some(account) = get_json::<AccountResponse>(ctx, &url, self.connection_timeout, "getAccount").await
        else {
            return;
        };

        ctx.publish(NetworkEvent::PoolInfo {
            reward_recipient_rs: account.account_rs,
            balance_nqt: account.balance_nqt.unwrap_or(0),
            forged_balance_nqt: account.forged_balance_nqt.unwrap_or(0),
            miner_count: accounts.map(|a| a.accounts.len()).unwrap_or(0),
        });
    }
}

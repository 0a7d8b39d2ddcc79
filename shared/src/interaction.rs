use num_bigint::BigUint;
use serde::{Deserialize, Deserializer};

/// Wallets answer numeric fields either as JSON numbers or as quoted
/// strings depending on version, so accept both.
fn u64_lenient<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>, {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

fn u64_lenient_opt<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>, {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(n)) => Ok(Some(n)),
        Some(Raw::Text(s)) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// `requestType=getMiningInfo`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MiningInfoResponse {
    pub generation_signature: String,
    #[serde(deserialize_with = "u64_lenient")]
    pub base_target: u64,
    #[serde(deserialize_with = "u64_lenient")]
    pub height: u64,
    #[serde(default, deserialize_with = "u64_lenient_opt")]
    pub target_deadline: Option<u64>,
}

/// `requestType=submitNonce`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResultResponse {
    pub result: Option<String>,
    #[serde(default, deserialize_with = "u64_lenient_opt")]
    pub deadline: Option<u64>,
    pub error_code: Option<i64>,
    pub error_description: Option<String>,
}

impl SubmitResultResponse {
    pub fn is_success(&self) -> bool {
        self.result.as_deref() == Some("success")
    }
}

/// `requestType=getRewardRecipient`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardRecipientResponse {
    pub reward_recipient: String,
}

/// `requestType=getAccountsWithRewardRecipient`
#[derive(Debug, Clone, Deserialize)]
pub struct AccountsWithRewardRecipientResponse {
    #[serde(default)]
    pub accounts: Vec<String>,
}

/// `requestType=getAccount`
#[derive(Debug, Clone, Deserialize)]
pub struct AccountResponse {
    #[serde(rename = "accountRS")]
    pub account_rs: String,
    #[serde(rename = "balanceNQT", default, deserialize_with = "u64_lenient_opt")]
    pub balance_nqt: Option<u64>,
    #[serde(rename = "forgedBalanceNQT", default, deserialize_with = "u64_lenient_opt")]
    pub forged_balance_nqt: Option<u64>,
}

/// `requestType=getBlock`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockResponse {
    pub generator: String,
    #[serde(rename = "generatorRS")]
    pub generator_rs: Option<String>,
}

/// Wallets flag application-level failures inside an OK response body.
pub fn has_error_marker(body: &str) -> bool {
    body.contains("error")
}

/// A submission candidate handed over by the scanning engine. Consumed
/// exactly once; a solo recommit fans out into further independent calls
/// that share the nonce and deadline.
#[derive(Debug, Clone)]
pub struct Solution {
    pub block_number: u64,
    pub nonce: BigUint,
    pub chunk_part_start_nonce: BigUint,
    pub calculated_deadline: u64,
    pub total_capacity: u64,
    pub result: BigUint,
}

/// Outcomes the network tasks publish back to the rest of the miner.
#[derive(Debug, Clone)]
pub enum NetworkEvent {
    StateChange {
        block_number: u64,
        base_target: u64,
        generation_signature: String,
        target_deadline: u64,
    },
    PoolInfo {
        reward_recipient_rs: String,
        balance_nqt: u64,
        forged_balance_nqt: u64,
        miner_count: usize,
    },
    LastWinner {
        block_number: u64,
        account_id: String,
        account_rs: String,
    },
    SubmitResult {
        block_number: u64,
        nonce: BigUint,
        chunk_part_start_nonce: BigUint,
        deadline: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mining_info_with_quoted_numbers() {
        let body = r#"{"generationSignature":"6046a1cca8b118f6b88e38bed7e2f4ff010c4dd5b9e3dbf54b581cdd55932d04",
            "baseTarget":"70312","height":"471938","requestProcessingTime":0}"#;
        let info: MiningInfoResponse = serde_json::from_str(body).unwrap();
        assert_eq!(info.height, 471938);
        assert_eq!(info.base_target, 70312);
        assert!(info.target_deadline.is_none());
    }

    #[test]
    fn mining_info_with_plain_numbers() {
        let body = r#"{"generationSignature":"abc","baseTarget":70312,"height":471938,"targetDeadline":86400}"#;
        let info: MiningInfoResponse = serde_json::from_str(body).unwrap();
        assert_eq!(info.height, 471938);
        assert_eq!(info.target_deadline, Some(86400));
    }

    #[test]
    fn submit_result_success() {
        let body = r#"{"result":"success","deadline":"7890","requestProcessingTime":1}"#;
        let result: SubmitResultResponse = serde_json::from_str(body).unwrap();
        assert!(result.is_success());
        assert_eq!(result.deadline, Some(7890));
    }

    #[test]
    fn error_marker_detected() {
        let body = r#"{"errorCode":4,"errorDescription":"Incorrect request"}"#;
        assert!(has_error_marker(body));
        let result: SubmitResultResponse = serde_json::from_str(body).unwrap();
        assert!(!result.is_success());
        assert_eq!(result.error_code, Some(4));
    }

    #[test]
    fn account_balances_in_nqt() {
        let body = r#"{"accountRS":"BURST-LUXE-RED2-G6JW-H4HG5","balanceNQT":"1047600000000","forgedBalanceNQT":"0"}"#;
        let account: AccountResponse = serde_json::from_str(body).unwrap();
        assert_eq!(account.balance_nqt, Some(1047600000000));
        assert_eq!(account.forged_balance_nqt, Some(0));
    }
}

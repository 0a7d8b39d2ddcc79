use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use shared::{
    interaction::{NetworkEvent, Solution},
    types::{AccountId, SecretPhrase},
};
use tokio::{sync::mpsc::UnboundedSender, time};
use tracing::*;
use url::Url;

use crate::config::MiningConfig;

pub mod tasks;

use self::tasks::{
    NetworkTask, RequestLastWinner, RequestMiningInfo, RequestPoolInfo, RequestTriggerServer,
    SubmitPoolNonce, SubmitSoloNonce, SubmitSoloNonceFallback, TaskCtx, TaskPool,
};

// solo deadlines below this are worth defending with recommits
const RECOMMIT_DEADLINE_LIMIT: u64 = 1200;

const RECOMMIT_DELAYS: [u64; 3] = [5_000, 10_000, 15_000];

/// Coordinates all traffic towards the pool or solo wallet: round polling,
/// keep-alive, winner and pool lookups, and result submission with its
/// retry policy. All operations dispatch one-shot tasks onto the pool and
/// return immediately.
///
/// A broken configuration leaves the coordinator inert instead of failing:
/// every dispatch operation turns into a no-op until the endpoints are
/// configured properly.
pub struct Network {
    pool_mining: bool,

    pool_server: Option<String>,
    wallet_server: Option<String>,
    numeric_account_id: Option<AccountId>,

    solo_server: Option<String>,
    pass_phrase: Option<SecretPhrase>,

    default_target_deadline: u64,
    connection_timeout: u64,
    refresh_interval: u64,
    winner_retries_on_async: u32,
    winner_retry_interval: u64,
    recommit_deadlines: bool,
    trigger_server_enabled: bool,

    block_number: AtomicU64,
    pool: TaskPool,
    ctx: TaskCtx,
}

fn checked_server(name: &str, server: &Option<String>) -> Option<String> {
    let server = server.as_deref()?.trim_end_matches('/').to_string();
    match Url::parse(&server) {
        Ok(_) => Some(server),
        Err(err) => {
            error!("'{name}' is not a valid url ({err}): {server}");
            None
        }
    }
}

impl Network {
    pub fn new(cfg: &MiningConfig, events: UnboundedSender<NetworkEvent>) -> Network {
        let mut pool_server = None;
        let mut wallet_server = None;
        let mut numeric_account_id = None;
        let mut solo_server = None;
        let mut pass_phrase = None;

        if cfg.pool_mining {
            match (checked_server("pool_server", &cfg.pool_server), cfg.numeric_account_id.clone()) {
                (Some(server), Some(account_id)) => {
                    pool_server = Some(server);
                    numeric_account_id = Some(account_id);
                    wallet_server = checked_server("wallet_server", &cfg.wallet_server);
                }
                _ => {
                    error!("init pool network failed!");
                    error!("config: 'pool_server' or 'numeric_account_id' is missing?!");
                }
            }
        } else {
            match (checked_server("solo_server", &cfg.solo_server), cfg.pass_phrase.clone()) {
                (Some(server), Some(phrase)) => {
                    solo_server = Some(server);
                    pass_phrase = Some(phrase);
                }
                _ => {
                    error!("init solo network failed!");
                    error!("config: 'solo_server' or 'pass_phrase' is missing?!");
                }
            }
        }

        Network {
            pool_mining: cfg.pool_mining,
            pool_server,
            wallet_server,
            numeric_account_id,
            solo_server,
            pass_phrase,
            default_target_deadline: cfg.target_deadline,
            connection_timeout: cfg.connection_timeout,
            refresh_interval: cfg.refresh_interval,
            winner_retries_on_async: cfg.winner_retries_on_async,
            winner_retry_interval: cfg.winner_retry_interval,
            recommit_deadlines: cfg.recommit_deadlines,
            trigger_server_enabled: cfg.trigger_server,
            block_number: AtomicU64::new(0),
            pool: TaskPool,
            ctx: TaskCtx { client: reqwest::Client::new(), events },
        }
    }

    /// Round-change notification from the outside. Safe against concurrent
    /// dispatches: a task planned before this call keeps the block number
    /// it was stamped with.
    pub fn handle_state_change(&self, block_number: u64) {
        self.block_number.store(block_number, Ordering::Relaxed);
    }

    pub fn block_number(&self) -> u64 {
        self.block_number.load(Ordering::Relaxed)
    }

    /// Poll the current endpoint for the active round.
    pub fn check_network_state(&self) {
        if let Some(task) = self.mining_info_task() {
            self.dispatch(task);
        }
    }

    /// Keep the solo wallet from going stale between rounds.
    pub fn trigger_server(&self) {
        if let Some(task) = self.trigger_server_task() {
            self.dispatch(task);
        }
    }

    /// Find the winner of the round before `block_number`.
    pub fn check_last_winner(&self, block_number: u64) {
        if let Some(task) = self.last_winner_task(block_number) {
            self.dispatch(task);
        }
    }

    /// Refresh pool account statistics.
    pub fn check_pool_info(&self) {
        if let Some(task) = self.pool_info_task() {
            self.dispatch(task);
        }
    }

    /// Submit a found solution; in solo mode promising deadlines fan out
    /// into three delayed recommits on top of the primary submission.
    pub fn commit_result(&self, solution: Solution) {
        for task in self.submission_tasks(&solution) {
            self.dispatch(task);
        }
    }

    /// Start the recurring round poll, and, for solo mode, the keep-alive.
    pub fn start_mining(self: &Arc<Self>) {
        let network = self.clone();
        self.pool.execute(async move {
            let start = time::Instant::now() + Duration::from_millis(100);
            let mut ticks = time::interval_at(start, Duration::from_millis(network.refresh_interval));
            loop {
                ticks.tick().await;
                network.check_network_state();
            }
        });

        if !self.pool_mining && self.trigger_server_enabled {
            let network = self.clone();
            self.pool.execute(async move {
                let start = time::Instant::now() + Duration::from_secs(5);
                let mut ticks = time::interval_at(start, Duration::from_secs(25));
                loop {
                    ticks.tick().await;
                    network.trigger_server();
                }
            });
        }
    }

    fn dispatch(&self, task: NetworkTask) {
        let ctx = self.ctx.clone();
        self.pool.execute(task.run(ctx));
    }

    fn mining_info_task(&self) -> Option<NetworkTask> {
        let server = if self.pool_mining { &self.pool_server } else { &self.solo_server };
        let server = server.clone()?;
        Some(NetworkTask::MiningInfo(RequestMiningInfo {
            server,
            block_number: self.block_number(),
            pool_mining: self.pool_mining,
            connection_timeout: self.connection_timeout,
            default_target_deadline: self.default_target_deadline,
        }))
    }

    fn trigger_server_task(&self) -> Option<NetworkTask> {
        let server = self.solo_server.clone()?;
        Some(NetworkTask::TriggerServer(RequestTriggerServer {
            server,
            connection_timeout: self.connection_timeout,
        }))
    }

    fn last_winner_task(&self, block_number: u64) -> Option<NetworkTask> {
        // the solo wallet knows the chain; under pool mode only a
        // configured wallet can answer
        let server = if self.pool_mining { &self.wallet_server } else { &self.solo_server };
        let server = server.clone()?;
        Some(NetworkTask::LastWinner(RequestLastWinner {
            server,
            block_number,
            connection_timeout: self.connection_timeout,
            retries: self.winner_retries_on_async,
            retry_interval: self.winner_retry_interval,
        }))
    }

    fn pool_info_task(&self) -> Option<NetworkTask> {
        if !self.pool_mining {
            return None;
        }
        let wallet_server = self.wallet_server.clone()?;
        let account_id = self.numeric_account_id.clone()?;
        Some(NetworkTask::PoolInfo(RequestPoolInfo {
            wallet_server,
            account_id,
            connection_timeout: self.connection_timeout,
        }))
    }

    fn submission_tasks(&self, solution: &Solution) -> Vec<NetworkTask> {
        let mut tasks = vec![];

        if self.pool_mining {
            if let (Some(server), Some(account_id)) = (&self.pool_server, &self.numeric_account_id) {
                tasks.push(NetworkTask::SubmitPool(SubmitPoolNonce {
                    server: server.clone(),
                    account_id: account_id.clone(),
                    block_number: solution.block_number,
                    connection_timeout: self.connection_timeout,
                    nonce: solution.nonce.clone(),
                    chunk_part_start_nonce: solution.chunk_part_start_nonce.clone(),
                    calculated_deadline: solution.calculated_deadline,
                    total_capacity: solution.total_capacity,
                    result: solution.result.clone(),
                }));
            }
        } else if let (Some(server), Some(pass_phrase)) = (&self.solo_server, &self.pass_phrase) {
            tasks.push(NetworkTask::SubmitSolo(SubmitSoloNonce {
                server: server.clone(),
                pass_phrase: pass_phrase.clone(),
                block_number: solution.block_number,
                connection_timeout: self.connection_timeout,
                nonce: solution.nonce.clone(),
                chunk_part_start_nonce: solution.chunk_part_start_nonce.clone(),
                calculated_deadline: solution.calculated_deadline,
                result: solution.result.clone(),
            }));

            if self.recommit_deadlines && solution.calculated_deadline < RECOMMIT_DEADLINE_LIMIT {
                for delay in RECOMMIT_DELAYS {
                    tasks.push(NetworkTask::SubmitSoloFallback(SubmitSoloNonceFallback {
                        server: server.clone(),
                        delay,
                        pass_phrase: pass_phrase.clone(),
                        connection_timeout: self.connection_timeout,
                        nonce: solution.nonce.clone(),
                        calculated_deadline: solution.calculated_deadline,
                    }));
                }
            }
        }

        tasks
    }
}

#[cfg(test)]
mod tests {
    use num_bigint::BigUint;
    use tokio::sync::mpsc::unbounded_channel;

    use super::*;

    fn solo_config() -> MiningConfig {
        MiningConfig {
            pool_mining: false,
            solo_server: Some("http://localhost:8125".to_string()),
            pass_phrase: Some(SecretPhrase("secret".to_string())),
            ..MiningConfig::default()
        }
    }

    fn pool_config() -> MiningConfig {
        MiningConfig {
            pool_mining: true,
            pool_server: Some("http://pool.example.com:8124".to_string()),
            wallet_server: Some("http://localhost:8125".to_string()),
            numeric_account_id: Some(AccountId("12297839419837437157".to_string())),
            ..MiningConfig::default()
        }
    }

    fn solution(calculated_deadline: u64) -> Solution {
        Solution {
            block_number: 471938,
            nonce: BigUint::from(68216375553u64),
            chunk_part_start_nonce: BigUint::from(68216000000u64),
            calculated_deadline,
            total_capacity: 4 * 1000 * 1000 * 1000 * 1000,
            result: BigUint::from(1234567890u64),
        }
    }

    fn network(cfg: MiningConfig) -> Network {
        let (events, _receiver) = unbounded_channel();
        Network::new(&cfg, events)
    }

    #[test]
    fn promising_solo_deadline_schedules_three_recommits() {
        let network = network(solo_config());
        let tasks = network.submission_tasks(&solution(800));

        assert_eq!(tasks.len(), 4);
        assert!(matches!(tasks[0], NetworkTask::SubmitSolo(_)));

        let mut delays = vec![];
        for task in &tasks[1..] {
            match task {
                NetworkTask::SubmitSoloFallback(fallback) => {
                    assert_eq!(fallback.nonce, BigUint::from(68216375553u64));
                    assert_eq!(fallback.calculated_deadline, 800);
                    delays.push(fallback.delay);
                }
                other => panic!("expected fallback task, got {other:?}"),
            }
        }
        assert_eq!(delays, vec![5_000, 10_000, 15_000]);
    }

    #[test]
    fn long_solo_deadline_is_submitted_once() {
        let network = network(solo_config());
        let tasks = network.submission_tasks(&solution(1500));

        assert_eq!(tasks.len(), 1);
        assert!(matches!(tasks[0], NetworkTask::SubmitSolo(_)));
    }

    #[test]
    fn disabled_recommit_never_schedules_fallbacks() {
        let mut cfg = solo_config();
        cfg.recommit_deadlines = false;
        let network = network(cfg);

        assert_eq!(network.submission_tasks(&solution(1)).len(), 1);
    }

    #[test]
    fn pool_submission_never_schedules_fallbacks() {
        let network = network(pool_config());
        let tasks = network.submission_tasks(&solution(1));

        assert_eq!(tasks.len(), 1);
        match &tasks[0] {
            NetworkTask::SubmitPool(submit) => {
                assert_eq!(submit.account_id.as_str(), "12297839419837437157");
                assert_eq!(submit.block_number, 471938);
            }
            other => panic!("expected pool submit task, got {other:?}"),
        }
    }

    #[test]
    fn incomplete_pool_config_leaves_the_coordinator_inert() {
        let mut cfg = pool_config();
        cfg.numeric_account_id = None;
        let network = network(cfg);

        assert!(network.mining_info_task().is_none());
        assert!(network.pool_info_task().is_none());
        assert!(network.submission_tasks(&solution(1)).is_empty());
    }

    #[test]
    fn invalid_endpoint_url_leaves_the_coordinator_inert() {
        let mut cfg = solo_config();
        cfg.solo_server = Some("localhost without a scheme".to_string());
        let network = network(cfg);

        assert!(network.mining_info_task().is_none());
        assert!(network.submission_tasks(&solution(1)).is_empty());
    }

    #[test]
    fn dispatched_task_keeps_its_round_stamp() {
        let network = network(solo_config());
        network.handle_state_change(1000);

        let in_flight = network.mining_info_task().unwrap();
        network.handle_state_change(1001);

        match in_flight {
            NetworkTask::MiningInfo(task) => assert_eq!(task.block_number, 1000),
            other => panic!("expected mining info task, got {other:?}"),
        }
        match network.mining_info_task().unwrap() {
            NetworkTask::MiningInfo(task) => assert_eq!(task.block_number, 1001),
            other => panic!("expected mining info task, got {other:?}"),
        }
    }

    #[test]
    fn last_winner_uses_the_wallet_under_pool_mode() {
        let net = network(pool_config());
        match net.last_winner_task(471938).unwrap() {
            NetworkTask::LastWinner(task) => {
                assert_eq!(task.server, "http://localhost:8125");
                assert_eq!(task.block_number, 471938);
            }
            other => panic!("expected last winner task, got {other:?}"),
        }

        let mut cfg = pool_config();
        cfg.wallet_server = None;
        assert!(network(cfg).last_winner_task(471938).is_none());
    }

    #[test]
    fn trigger_is_solo_only() {
        assert!(network(pool_config()).trigger_server_task().is_none());
        assert!(network(solo_config()).trigger_server_task().is_some());
    }
}

//! The mint loop driver.
//!
//! Issues mint transactions against a resolved candy machine, either a fixed
//! number concurrently (bounded mode) or open-ended until stopped (unbounded
//! mode). A background balance checker cancels the shared stop token once
//! the payer wallet drops under the safety threshold; attempts already in
//! flight are allowed to finish, attempts not yet dispatched are recorded as
//! skipped failures.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use solana_sdk::{
    native_token::LAMPORTS_PER_SOL,
    program_pack::Pack,
    signature::Keypair,
    signer::Signer,
    system_instruction,
};
use spl_associated_token_account::{
    get_associated_token_address, instruction::create_associated_token_account,
};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::candy::{derive_master_edition, derive_metadata, mint_nft_instruction};
use crate::chain::ChainClient;
use crate::error::{Error, Result};
use crate::logs::RunLogs;
use crate::candy::resolver::ResolvedContract;
use crate::types::{BalanceSample, MintAttempt};

/// Sentinel mint count for unbounded mode.
pub const UNBOUNDED: i64 = -1;
/// Minting halts when the payer balance drops under one SOL.
pub const MIN_BALANCE_LAMPORTS: u64 = LAMPORTS_PER_SOL;
pub const BALANCE_CHECK_INTERVAL: Duration = Duration::from_secs(5);
/// Unbounded mode pauses briefly every tenth dispatch.
const DISPATCH_PAUSE_EVERY: u64 = 10;
const DISPATCH_PAUSE: Duration = Duration::from_secs(1);

/// Terminal state of one run of the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopOutcome {
    /// The requested attempt count was issued without a stop signal.
    Completed,
    /// The stop signal fired (funding exhausted or external cancel).
    Stopped,
}

pub struct MintLoopDriver {
    ctx: MintContext,
    checker_started: AtomicBool,
    checker_handle: Mutex<Option<JoinHandle<()>>>,
}

/// Everything one mint attempt needs, cheap to clone into a task.
#[derive(Clone)]
struct MintContext {
    client: Arc<dyn ChainClient>,
    payer: Arc<Keypair>,
    candy: ResolvedContract,
    logs: Arc<RunLogs>,
    stop: CancellationToken,
}

impl MintLoopDriver {
    pub fn new(
        client: Arc<dyn ChainClient>,
        payer: Arc<Keypair>,
        candy: ResolvedContract,
        logs: Arc<RunLogs>,
    ) -> Self {
        Self {
            ctx: MintContext {
                client,
                payer,
                candy,
                logs,
                stop: CancellationToken::new(),
            },
            checker_started: AtomicBool::new(false),
            checker_handle: Mutex::new(None),
        }
    }

    /// Token observed by every attempt; external callers may cancel it too.
    pub fn stop_token(&self) -> CancellationToken {
        self.ctx.stop.clone()
    }

    /// Run the loop and return the terminal state plus every attempt record,
    /// ordered by index. In-flight attempts are always joined before the
    /// list is returned, so the report covers everything dispatched.
    pub async fn run(&self, mint_count: i64) -> (LoopOutcome, Vec<MintAttempt>) {
        self.start_balance_checker();

        let mut attempts = if mint_count >= 0 {
            self.ctx
                .logs
                .info(&format!("Minting count: {}", mint_count));
            self.run_bounded(mint_count as u64).await
        } else {
            self.ctx.logs.info("!!!!! Infinite mint !!!!!");
            self.run_unbounded().await
        };
        attempts.sort_by_key(|a| a.index);

        if let Ok(mut handle) = self.checker_handle.lock() {
            if let Some(handle) = handle.take() {
                handle.abort();
            }
        }

        let outcome = if self.ctx.stop.is_cancelled() {
            LoopOutcome::Stopped
        } else {
            LoopOutcome::Completed
        };
        (outcome, attempts)
    }

    /// Dispatch exactly `count` attempts concurrently and settle them all.
    async fn run_bounded(&self, count: u64) -> Vec<MintAttempt> {
        let mut tasks = JoinSet::new();
        for index in 0..count {
            let ctx = self.ctx.clone();
            tasks.spawn(async move { attempt(ctx, index).await });
        }
        collect(tasks).await
    }

    /// Open-ended dispatch until the stop token fires, then join stragglers.
    async fn run_unbounded(&self) -> Vec<MintAttempt> {
        let mut tasks = JoinSet::new();
        let mut index = 0u64;
        while !self.ctx.stop.is_cancelled() {
            if index % DISPATCH_PAUSE_EVERY == 0 {
                sleep(DISPATCH_PAUSE).await;
            }
            let ctx = self.ctx.clone();
            tasks.spawn(async move { attempt(ctx, index).await });
            index += 1;
        }
        collect(tasks).await
    }

    /// Start the periodic balance check. Idempotent: the second start is a
    /// no-op. The checker lives until the loop exits.
    fn start_balance_checker(&self) {
        if self.checker_started.swap(true, Ordering::SeqCst) {
            return;
        }
        let ctx = self.ctx.clone();
        let handle = tokio::spawn(async move {
            loop {
                check_balance(&ctx).await;
                sleep(BALANCE_CHECK_INTERVAL).await;
            }
        });
        if let Ok(mut slot) = self.checker_handle.lock() {
            *slot = Some(handle);
        }
    }
}

async fn collect(mut tasks: JoinSet<MintAttempt>) -> Vec<MintAttempt> {
    let mut attempts = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        if let Ok(attempt) = joined {
            attempts.push(attempt);
        }
    }
    attempts
}

/// One loop iteration. Never propagates: every outcome becomes a record.
async fn attempt(ctx: MintContext, index: u64) -> MintAttempt {
    if ctx.stop.is_cancelled() {
        ctx.logs.info(&format!("Stopping, skip mint #{}!", index));
        return MintAttempt::failed(index);
    }
    ctx.logs.info(&format!("Mint #{}...", index));
    match mint_once(&ctx).await {
        Ok(tx) => {
            ctx.logs.tx(&tx);
            MintAttempt::succeeded(index, tx)
        }
        Err(err) => {
            ctx.logs.err(&format!("[MINT] #{}: {}", index, err));
            MintAttempt::failed(index)
        }
    }
}

/// Submit one mint transaction: create the throwaway mint account,
/// initialize it, create the payer's associated token account, mint one
/// token into it and invoke the candy program's `mint_nft`.
async fn mint_once(ctx: &MintContext) -> Result<String> {
    let payer = ctx.payer.pubkey();
    let mint = Keypair::new();
    let token = get_associated_token_address(&payer, &mint.pubkey());
    let metadata = derive_metadata(&mint.pubkey());
    let master_edition = derive_master_edition(&mint.pubkey());

    let mint_space = spl_token::state::Mint::LEN;
    let rent = ctx.client.minimum_rent(mint_space).await?;

    let instructions = vec![
        system_instruction::create_account(
            &payer,
            &mint.pubkey(),
            rent,
            mint_space as u64,
            &spl_token::id(),
        ),
        spl_token::instruction::initialize_mint(
            &spl_token::id(),
            &mint.pubkey(),
            &payer,
            Some(&payer),
            0,
        )
        .map_err(|e| Error::Chain(e.to_string()))?,
        create_associated_token_account(&payer, &payer, &mint.pubkey(), &spl_token::id()),
        spl_token::instruction::mint_to(
            &spl_token::id(),
            &mint.pubkey(),
            &token,
            &payer,
            &[],
            1,
        )
        .map_err(|e| Error::Chain(e.to_string()))?,
        mint_nft_instruction(
            &ctx.candy.config,
            &ctx.candy.candy_machine,
            &payer,
            &ctx.candy.state.wallet,
            &mint.pubkey(),
            &metadata,
            &master_edition,
        ),
    ];

    ctx.client
        .submit_transaction(&instructions, &payer, &[ctx.payer.as_ref(), &mint])
        .await
}

/// One balance sample; cancels the stop token when funds run low.
async fn check_balance(ctx: &MintContext) {
    match ctx.client.balance(&ctx.payer.pubkey()).await {
        Ok(lamports) => {
            let sample = BalanceSample::new(lamports);
            ctx.logs.info(&format!("CURRENT BALANCE: {} sol", sample.sol));
            if sample.lamports < MIN_BALANCE_LAMPORTS && !ctx.stop.is_cancelled() {
                ctx.logs.info("Insufficient balance (< 1 sol), will end.");
                ctx.stop.cancel();
            }
        }
        Err(err) => ctx.logs.err(&format!("[BALANCE] {}", err)),
    }
}

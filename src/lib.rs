//! Benchmarking harness for the optimistic concurrent transaction executor.
//!
//! This crate generates signed multi-denomination transfer workloads and runs
//! them either one by one or through the `occ-executor` scheduler, with fee
//! payments to the fee collector module account deferred until block end.
//!
//! # Architecture
//!
//! The framework is organized around three main concepts:
//!
//! - **Workload**: Pre-generated accounts and blocks of signed transfers
//! - **Executor**: A strategy for executing the blocks (sequential or OCC)
//! - **LedgerStore**: The authoritative in-memory balance and nonce store
//!
//! # Quick Start
//!
//! ```
//! use occ_bench::{Executor, OccExecutor, SequentialExecutor, Workload, WorkloadConfig};
//!
//! let config = WorkloadConfig {
//!     num_accounts: 50,
//!     num_transactions: 40,
//!     transactions_per_block: 20,
//!     conflict_factor: 0.5,
//!     seed: 42,
//!     chain_id: 1,
//! };
//!
//! // Generate workload (signs all transactions upfront)
//! let workload = Workload::generate(config);
//!
//! let (sequential, _) = SequentialExecutor::new(true)
//!     .execute(workload.create_store(), &workload)
//!     .unwrap();
//! let (parallel, result) = OccExecutor::new(4, true)
//!     .execute(workload.create_store(), &workload)
//!     .unwrap();
//!
//! assert_eq!(sequential.snapshot(), parallel.snapshot());
//! println!("Successful: {}", result.successful);
//! ```

pub mod error;
pub mod executor;
pub mod store;
mod transfer;

pub use error::{BenchError, TxError};
pub use executor::{ExecutionResult, Executor, OccExecutor, SequentialExecutor};
pub use store::{LedgerSnapshot, LedgerStore};
pub use transfer::TxOutcome;

use alloy_primitives::{keccak256, Address, Signature, B256};
use k256::ecdsa::{SigningKey, VerifyingKey};
use occ_executor::{BalanceStore, Denom};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::collections::HashMap;

/// Module account that receives every transaction fee.
pub const FEE_COLLECTOR: Address = Address::new([0xfe; 20]);

/// Denomination fees are paid in.
pub const FEE_DENOM: &str = "ufee";

/// Denominations transfers are drawn from.
pub const TRANSFER_DENOMS: [&str; 3] = ["uatom", "uusdc", FEE_DENOM];

/// Starting balance of every user account, per denomination.
pub const INITIAL_BALANCE: i128 = 50_000;

/// Starting fee-denomination balance of the fee collector.
pub const COLLECTOR_FLOAT: i128 = 1_000_000_000;

// ============================================================================
// Account & Key Management
// ============================================================================

/// An account with its signing key for transaction signing.
#[derive(Clone)]
pub struct Account {
    /// The secp256k1 signing key.
    pub signing_key: SigningKey,
    /// The address derived from the public key.
    pub address: Address,
}

impl Account {
    /// Creates a new account from a signing key.
    pub fn from_signing_key(signing_key: SigningKey) -> Self {
        let verifying_key = VerifyingKey::from(&signing_key);
        let address = public_key_to_address(&verifying_key);
        Self {
            signing_key,
            address,
        }
    }

    /// Generates a deterministic account from a seed.
    ///
    /// Draws fresh key bytes until they form a valid scalar.
    pub fn from_seed(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        loop {
            let mut key_bytes = [0u8; 32];
            rng.fill(&mut key_bytes);
            if let Ok(signing_key) = SigningKey::from_bytes(&key_bytes.into()) {
                return Self::from_signing_key(signing_key);
            }
        }
    }
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("address", &self.address)
            .finish()
    }
}

fn public_key_to_address(verifying_key: &VerifyingKey) -> Address {
    let public_key_bytes = verifying_key.to_encoded_point(false);
    // Skip the 0x04 prefix byte, hash the rest.
    let hash = keccak256(&public_key_bytes.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}

// ============================================================================
// Signed Transfer
// ============================================================================

/// A signed bank transfer that also pays a fee.
#[derive(Debug, Clone)]
pub struct SignedTransfer {
    /// The sender's address.
    pub from: Address,
    /// The recipient's address.
    pub to: Address,
    /// Denomination being transferred.
    pub denom: Denom,
    /// Amount of `denom` to transfer.
    pub amount: u64,
    /// Fee in [`FEE_DENOM`], paid to [`FEE_COLLECTOR`].
    pub fee: u64,
    /// The sender's account sequence number.
    pub nonce: u64,
    /// Chain the transfer was signed for.
    pub chain_id: u64,
    /// The ECDSA signature.
    pub signature: Option<Signature>,
}

impl SignedTransfer {
    /// Creates and signs a new transfer.
    pub fn new(
        account: &Account,
        to: Address,
        denom: impl Into<Denom>,
        amount: u64,
        fee: u64,
        nonce: u64,
        chain_id: u64,
    ) -> Self {
        let mut tx = Self {
            from: account.address,
            to,
            denom: denom.into(),
            amount,
            fee,
            nonce,
            chain_id,
            signature: None,
        };
        tx.signature = Self::sign(&account.signing_key, tx.tx_hash());
        tx
    }

    /// Hash of the signed fields, recomputed from the current contents.
    pub fn tx_hash(&self) -> B256 {
        Self::compute_tx_hash(
            self.from,
            self.to,
            &self.denom,
            self.amount,
            self.fee,
            self.nonce,
            self.chain_id,
        )
    }

    fn compute_tx_hash(
        from: Address,
        to: Address,
        denom: &str,
        amount: u64,
        fee: u64,
        nonce: u64,
        chain_id: u64,
    ) -> B256 {
        let mut data = Vec::with_capacity(20 + 20 + denom.len() + 8 * 4);
        data.extend_from_slice(from.as_slice());
        data.extend_from_slice(to.as_slice());
        data.extend_from_slice(denom.as_bytes());
        data.extend_from_slice(&amount.to_be_bytes());
        data.extend_from_slice(&fee.to_be_bytes());
        data.extend_from_slice(&nonce.to_be_bytes());
        data.extend_from_slice(&chain_id.to_be_bytes());
        keccak256(&data)
    }

    fn sign(signing_key: &SigningKey, tx_hash: B256) -> Option<Signature> {
        let (sig, recovery_id) = signing_key
            .sign_prehash_recoverable(tx_hash.as_slice())
            .ok()?;
        Some(Signature::from_signature_and_parity(
            sig,
            recovery_id.is_y_odd(),
        ))
    }

    /// Recovers the sender's address from the signature over the current
    /// fields. Returns None if signature verification fails.
    pub fn recover_signer(&self) -> Option<Address> {
        self.signature
            .as_ref()?
            .recover_address_from_prehash(&self.tx_hash())
            .ok()
    }

    /// Verifies the signature and returns true if valid.
    pub fn verify(&self) -> bool {
        self.recover_signer()
            .map(|addr| addr == self.from)
            .unwrap_or(false)
    }
}

// ============================================================================
// Workload Configuration & Generation
// ============================================================================

/// Configuration for workload generation.
#[derive(Debug, Clone)]
pub struct WorkloadConfig {
    /// Total number of accounts in the system.
    pub num_accounts: usize,
    /// Number of transactions to generate.
    pub num_transactions: usize,
    /// Number of transactions per block. The last block may be shorter.
    pub transactions_per_block: usize,
    /// Conflict factor: 0.0 = no conflicts, 1.0 = all transactions touch same accounts.
    pub conflict_factor: f64,
    /// Random seed for reproducibility.
    pub seed: u64,
    /// Chain ID for transaction signing.
    pub chain_id: u64,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            num_accounts: 1000,
            num_transactions: 100,
            transactions_per_block: 100,
            conflict_factor: 0.0,
            seed: 42,
            chain_id: 1,
        }
    }
}

/// A complete benchmark workload with pre-generated accounts and signed transfers.
#[derive(Debug, Clone)]
pub struct Workload {
    /// The accounts (with signing keys) participating in this workload.
    pub accounts: Vec<Account>,
    /// Pre-signed transfers, grouped into blocks.
    pub blocks: Vec<Vec<SignedTransfer>>,
    /// The configuration used to generate this workload.
    pub config: WorkloadConfig,
}

impl Workload {
    /// Generates a new workload from the given configuration.
    /// All transactions are pre-signed during generation.
    pub fn generate(config: WorkloadConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);

        let accounts: Vec<Account> = (0..config.num_accounts)
            .map(|i| Account::from_seed(config.seed.wrapping_add(i as u64)))
            .collect();

        // Track nonces per account for proper transaction sequencing.
        let mut nonces: HashMap<usize, u64> = HashMap::new();

        // "Hot" account range for conflict simulation.
        let hot_account_count = if config.conflict_factor > 0.0 {
            (2.0 + (1.0 - config.conflict_factor) * (config.num_accounts as f64 - 2.0))
                .max(2.0) as usize
        } else {
            config.num_accounts
        };

        let mut transactions = Vec::with_capacity(config.num_transactions);
        if config.num_accounts >= 2 {
            for _ in 0..config.num_transactions {
                let pool = if rng.gen::<f64>() < config.conflict_factor {
                    hot_account_count
                } else {
                    config.num_accounts
                };
                let from_idx = rng.gen_range(0..pool);
                let mut to_idx = rng.gen_range(0..pool);
                while to_idx == from_idx {
                    to_idx = rng.gen_range(0..pool);
                }

                let denom = TRANSFER_DENOMS[rng.gen_range(0..TRANSFER_DENOMS.len())];
                let amount = rng.gen_range(1..=20_000u64);
                let fee = rng.gen_range(1..=50u64);

                let nonce = nonces.entry(from_idx).or_insert(0);
                transactions.push(SignedTransfer::new(
                    &accounts[from_idx],
                    accounts[to_idx].address,
                    denom,
                    amount,
                    fee,
                    *nonce,
                    config.chain_id,
                ));
                *nonce += 1;
            }
        }

        let block_size = config.transactions_per_block.max(1);
        let blocks = transactions
            .chunks(block_size)
            .map(|chunk| chunk.to_vec())
            .collect();

        Self {
            accounts,
            blocks,
            config,
        }
    }

    /// All transfers in block order.
    pub fn transactions(&self) -> impl Iterator<Item = &SignedTransfer> {
        self.blocks.iter().flatten()
    }

    pub fn num_transactions(&self) -> usize {
        self.blocks.iter().map(Vec::len).sum()
    }

    /// Creates a store funding every account with [`INITIAL_BALANCE`] of each
    /// transfer denomination, and the fee collector with [`COLLECTOR_FLOAT`].
    pub fn create_store(&self) -> LedgerStore {
        let store = LedgerStore::new();
        for account in &self.accounts {
            for denom in TRANSFER_DENOMS {
                store.set_balance(&account.address, denom, INITIAL_BALANCE);
            }
        }
        store.set_balance(&FEE_COLLECTOR, FEE_DENOM, COLLECTOR_FLOAT);
        store
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Transfer state machine shared by every executor.
//!
//! A transfer first runs the ante checks (signature, nonce, fee) and then the
//! bank message. If the ante checks pass the fee is charged and the nonce is
//! bumped even when the message fails; a failed message refunds half the fee
//! out of the fee collector.

use crate::error::TxError;
use crate::{SignedTransfer, FEE_DENOM};
use alloy_primitives::Address;
use occ_executor::{Coins, StoreError};

/// Result of a transfer that made it past block inclusion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxOutcome {
    /// Fee charged and funds moved.
    Success,
    /// Fee charged, nonce bumped, message failed.
    MessageFailed(TxError),
    /// Rejected by the ante checks; no state changed.
    Rejected(TxError),
}

impl TxOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TxOutcome::Success)
    }
}

/// State access used by [`apply_transfer`].
///
/// Reads may fail with [`TxError::Blocked`] under optimistic execution.
/// Writes are buffered by the implementation and only land if the transfer
/// returns `Ok`.
pub(crate) trait LedgerAccess {
    fn balance(&mut self, account: &Address, denom: &str) -> Result<i128, TxError>;

    fn set_balance(&mut self, account: &Address, denom: &str, amount: i128);

    fn nonce(&mut self, account: &Address) -> Result<u64, TxError>;

    fn set_nonce(&mut self, account: &Address, nonce: u64);

    /// Pays `fee` into the fee collector.
    fn collect_fee(&mut self, fee: &Coins) -> Result<(), TxError>;

    /// Takes `amount` back out of the fee collector.
    fn refund_fee(&mut self, amount: &Coins) -> Result<(), TxError>;
}

/// Runs one transfer against `access`.
///
/// `Err` means the transfer must be discarded: either it was rejected by the
/// ante checks or, for [`TxError::Blocked`], the attempt has to be retried.
pub(crate) fn apply_transfer<A: LedgerAccess>(
    access: &mut A,
    tx: &SignedTransfer,
    verify_signatures: bool,
) -> Result<TxOutcome, TxError> {
    // Ante
    if verify_signatures && !tx.verify() {
        return Err(TxError::InvalidSignature);
    }

    let expected = access.nonce(&tx.from)?;
    if expected != tx.nonce {
        return Err(TxError::BadNonce {
            expected,
            got: tx.nonce,
        });
    }

    let fee = i128::from(tx.fee);
    let fee_balance = access.balance(&tx.from, FEE_DENOM)?;
    if fee_balance < fee {
        return Err(StoreError::InsufficientFunds {
            denom: FEE_DENOM.to_string(),
            available: fee_balance,
            requested: fee,
        }
        .into());
    }
    access.set_balance(&tx.from, FEE_DENOM, fee_balance - fee);
    access.collect_fee(&Coins::single(FEE_DENOM, fee))?;
    access.set_nonce(&tx.from, expected + 1);

    // Message
    let amount = i128::from(tx.amount);
    let from_balance = access.balance(&tx.from, &tx.denom)?;
    if from_balance < amount {
        let refund = fee / 2;
        if refund > 0 {
            access.refund_fee(&Coins::single(FEE_DENOM, refund))?;
            let current = access.balance(&tx.from, FEE_DENOM)?;
            access.set_balance(&tx.from, FEE_DENOM, current + refund);
        }
        return Ok(TxOutcome::MessageFailed(
            StoreError::InsufficientFunds {
                denom: tx.denom.clone(),
                available: from_balance,
                requested: amount,
            }
            .into(),
        ));
    }

    access.set_balance(&tx.from, &tx.denom, from_balance - amount);
    let to_balance = access.balance(&tx.to, &tx.denom)?;
    access.set_balance(&tx.to, &tx.denom, to_balance + amount);
    Ok(TxOutcome::Success)
}

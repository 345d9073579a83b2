//! Multi-denomination signed amounts.
//!
//! [`Coins`] is the value stored per account in the deferred aggregates. It
//! never holds a zero entry for a denomination, mirroring the ledger rule that
//! zero balances are not stored.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Add, Neg, Sub};

/// Denomination name.
pub type Denom = String;

/// A set of `(denomination, signed amount)` pairs, unique per denomination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Coins {
    amounts: BTreeMap<Denom, i128>,
}

impl Coins {
    /// Returns an empty amount.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an amount from pairs, merging duplicates and dropping zeros.
    pub fn from_pairs<D, I>(pairs: I) -> Self
    where
        D: Into<Denom>,
        I: IntoIterator<Item = (D, i128)>,
    {
        let mut coins = Self::new();
        for (denom, amount) in pairs {
            coins.add_amount(denom.into(), amount);
        }
        coins
    }

    /// A single-denomination amount.
    pub fn single(denom: impl Into<Denom>, amount: i128) -> Self {
        let denom: Denom = denom.into();
        Self::from_pairs([(denom, amount)])
    }

    pub fn is_empty(&self) -> bool {
        self.amounts.is_empty()
    }

    /// Number of non-zero denominations.
    pub fn len(&self) -> usize {
        self.amounts.len()
    }

    /// Amount held for `denom`, zero when absent.
    pub fn amount_of(&self, denom: &str) -> i128 {
        self.amounts.get(denom).copied().unwrap_or(0)
    }

    /// Iterates denominations in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i128)> + '_ {
        self.amounts.iter().map(|(d, a)| (d.as_str(), *a))
    }

    /// True when every denomination is strictly positive.
    pub fn is_all_positive(&self) -> bool {
        self.amounts.values().all(|a| *a > 0)
    }

    /// True when any denomination is negative.
    pub fn is_any_negative(&self) -> bool {
        self.amounts.values().any(|a| *a < 0)
    }

    /// Splits into the strictly positive denominations and the absolute value
    /// of the strictly negative ones.
    pub fn partition(&self) -> (Coins, Coins) {
        let mut non_negative = Coins::new();
        let mut negative = Coins::new();
        for (denom, amount) in &self.amounts {
            if *amount > 0 {
                non_negative.amounts.insert(denom.clone(), *amount);
            } else {
                negative
                    .amounts
                    .insert(denom.clone(), amount.saturating_neg());
            }
        }
        (non_negative, negative)
    }

    fn add_amount(&mut self, denom: Denom, amount: i128) {
        if amount == 0 {
            return;
        }
        match self.amounts.entry(denom) {
            Entry::Vacant(slot) => {
                slot.insert(amount);
            }
            Entry::Occupied(mut slot) => {
                let next = slot.get().saturating_add(amount);
                if next == 0 {
                    slot.remove();
                } else {
                    slot.insert(next);
                }
            }
        }
    }
}

impl Add<&Coins> for &Coins {
    type Output = Coins;

    fn add(self, rhs: &Coins) -> Coins {
        let mut out = self.clone();
        for (denom, amount) in &rhs.amounts {
            out.add_amount(denom.clone(), *amount);
        }
        out
    }
}

impl Sub<&Coins> for &Coins {
    type Output = Coins;

    fn sub(self, rhs: &Coins) -> Coins {
        self + &(-rhs)
    }
}

impl Neg for &Coins {
    type Output = Coins;

    fn neg(self) -> Coins {
        Coins {
            amounts: self
                .amounts
                .iter()
                .map(|(d, a)| (d.clone(), a.saturating_neg()))
                .collect(),
        }
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.amounts.is_empty() {
            return write!(f, "0");
        }
        for (i, (denom, amount)) in self.amounts.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{amount}{denom}")?;
        }
        Ok(())
    }
}

impl<D: Into<Denom>> FromIterator<(D, i128)> for Coins {
    fn from_iter<I: IntoIterator<Item = (D, i128)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}

use crate::numeric::Usd;
use crate::storage::EventLog;
use crate::ProtocolError;
use candid::Principal;
use ethnum::U256;
use std::collections::BTreeMap;

// Like assert_eq, but returns an error instead of panicking.
macro_rules! ensure_eq {
    ($lhs:expr, $rhs:expr, $msg:expr $(, $args:expr)* $(,)*) => {
        if $lhs != $rhs {
            return Err(format!("{} ({:?}) != {} ({:?}): {}",
                               std::stringify!($lhs), $lhs,
                               std::stringify!($rhs), $rhs,
                               format!($msg $(,$args)*)));
        }
    }
}

macro_rules! ensure {
    ($cond:expr, $msg:expr $(, $args:expr)* $(,)*) => {
        if !$cond {
            return Err(format!("Condition {} is false: {}",
                               std::stringify!($cond),
                               format!($msg $(,$args)*)));
        }
    }
}

/// The two ledgers plus the event log that records how they got here.
///
/// Zero balances are never stored: an entry that drops to zero is removed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct State {
    /// user -> asset -> raw collateral amount
    pub collateral_deposited: BTreeMap<Principal, BTreeMap<Principal, U256>>,
    /// user -> stable tokens minted against their collateral
    pub debt_minted: BTreeMap<Principal, Usd>,
    pub event_log: EventLog,
}

/// Ledger contents captured at the start of an operation.
#[derive(Clone, Debug)]
pub struct Snapshot {
    collateral_deposited: BTreeMap<Principal, BTreeMap<Principal, U256>>,
    debt_minted: BTreeMap<Principal, Usd>,
    event_count: usize,
}

impl State {
    pub fn collateral_balance(&self, user: &Principal, asset: &Principal) -> U256 {
        self.collateral_deposited
            .get(user)
            .and_then(|assets| assets.get(asset))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    pub fn debt_of(&self, user: &Principal) -> Usd {
        self.debt_minted.get(user).copied().unwrap_or(Usd::ZERO)
    }

    pub fn total_debt(&self) -> Usd {
        self.debt_minted.values().copied().sum()
    }

    pub fn total_deposited(&self, asset: &Principal) -> U256 {
        self.collateral_deposited
            .values()
            .filter_map(|assets| assets.get(asset))
            .fold(U256::ZERO, |acc, amount| acc.saturating_add(*amount))
    }

    pub fn deposit_collateral(&mut self, user: Principal, asset: Principal, amount: U256) {
        if amount == U256::ZERO {
            return;
        }
        let balance = self
            .collateral_deposited
            .entry(user)
            .or_default()
            .entry(asset)
            .or_insert(U256::ZERO);
        *balance = balance.saturating_add(amount);
    }

    pub fn withdraw_collateral(
        &mut self,
        user: Principal,
        asset: Principal,
        amount: U256,
    ) -> Result<(), ProtocolError> {
        let available = self.collateral_balance(&user, &asset);
        if available < amount {
            return Err(ProtocolError::InsufficientCollateral {
                asset,
                available,
                requested: amount,
            });
        }
        if let Some(assets) = self.collateral_deposited.get_mut(&user) {
            if available == amount {
                assets.remove(&asset);
            } else {
                assets.insert(asset, available - amount);
            }
            if assets.is_empty() {
                self.collateral_deposited.remove(&user);
            }
        }
        Ok(())
    }

    pub fn mint_debt(&mut self, user: Principal, amount: Usd) {
        if amount.is_zero() {
            return;
        }
        let debt = self.debt_minted.entry(user).or_insert(Usd::ZERO);
        *debt = debt.saturating_add(amount);
    }

    pub fn burn_debt(&mut self, user: Principal, amount: Usd) -> Result<(), ProtocolError> {
        let available = self.debt_of(&user);
        match available.checked_sub(amount) {
            None => Err(ProtocolError::InsufficientDebt {
                available,
                requested: amount,
            }),
            Some(remaining) if remaining.is_zero() => {
                self.debt_minted.remove(&user);
                Ok(())
            }
            Some(remaining) => {
                self.debt_minted.insert(user, remaining);
                Ok(())
            }
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            collateral_deposited: self.collateral_deposited.clone(),
            debt_minted: self.debt_minted.clone(),
            event_count: self.event_log.len(),
        }
    }

    pub fn restore(&mut self, snapshot: Snapshot) {
        self.collateral_deposited = snapshot.collateral_deposited;
        self.debt_minted = snapshot.debt_minted;
        self.event_log.truncate(snapshot.event_count);
    }

    /// Compares the ledgers of two states, ignoring the event log.
    pub fn check_semantically_eq(&self, other: &Self) -> Result<(), String> {
        ensure_eq!(
            self.collateral_deposited,
            other.collateral_deposited,
            "collateral_deposited does not match"
        );
        ensure_eq!(
            self.debt_minted,
            other.debt_minted,
            "debt_minted does not match"
        );
        Ok(())
    }

    pub fn check_invariants(&self) -> Result<(), String> {
        for (user, assets) in &self.collateral_deposited {
            ensure!(
                !assets.is_empty(),
                "user {} kept an empty collateral map",
                user
            );
            for (asset, amount) in assets {
                ensure!(
                    *amount != U256::ZERO,
                    "user {} kept a zero balance of {}",
                    user,
                    asset
                );
            }
        }
        for (user, debt) in &self.debt_minted {
            ensure!(!debt.is_zero(), "user {} kept a zero debt entry", user);
        }
        Ok(())
    }
}

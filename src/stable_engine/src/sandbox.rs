//! In-memory collaborators for simulations and tests.

use crate::management::{AssetToken, PriceReading, PriceSource, TokenError, Transactional};
use candid::Principal;
use ethnum::U256;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

/// Called with `(from, to, amount)` after every successful balance move.
pub type TransferHook = Rc<dyn Fn(Principal, Principal, U256)>;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct Ledger {
    balances: BTreeMap<Principal, U256>,
    allowances: BTreeMap<(Principal, Principal), U256>,
}

impl Ledger {
    fn balance_of(&self, owner: &Principal) -> U256 {
        self.balances.get(owner).copied().unwrap_or(U256::ZERO)
    }

    fn allowance(&self, owner: &Principal, spender: &Principal) -> U256 {
        self.allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    fn move_funds(&mut self, from: Principal, to: Principal, amount: U256) -> Result<(), TokenError> {
        let balance = self.balance_of(&from);
        if balance < amount {
            return Err(TokenError::InsufficientFunds { balance });
        }
        self.balances.insert(from, balance - amount);
        let credited = self.balance_of(&to).saturating_add(amount);
        self.balances.insert(to, credited);
        Ok(())
    }
}

/// A fungible token with a faucet, switchable failures and a transfer hook.
pub struct SandboxToken {
    id: Principal,
    ledger: RefCell<Ledger>,
    snapshots: RefCell<Vec<Ledger>>,
    failure: RefCell<Option<TokenError>>,
    hook: RefCell<Option<TransferHook>>,
}

impl SandboxToken {
    pub fn new(id: Principal) -> Self {
        Self {
            id,
            ledger: RefCell::new(Ledger::default()),
            snapshots: RefCell::new(Vec::new()),
            failure: RefCell::new(None),
            hook: RefCell::new(None),
        }
    }

    /// Faucet: creates `amount` out of thin air for `to`.
    pub fn mint_to(&self, to: Principal, amount: U256) {
        let mut ledger = self.ledger.borrow_mut();
        let balance = ledger.balance_of(&to).saturating_add(amount);
        ledger.balances.insert(to, balance);
    }

    pub fn approve(&self, owner: Principal, spender: Principal, amount: U256) {
        self.ledger
            .borrow_mut()
            .allowances
            .insert((owner, spender), amount);
    }

    pub fn allowance(&self, owner: Principal, spender: Principal) -> U256 {
        self.ledger.borrow().allowance(&owner, &spender)
    }

    /// Makes every subsequent transfer fail with `error`, or succeed again
    /// when `None`.
    pub fn fail_transfers_with(&self, error: Option<TokenError>) {
        *self.failure.borrow_mut() = error;
    }

    pub fn set_transfer_hook(&self, hook: Option<TransferHook>) {
        *self.hook.borrow_mut() = hook;
    }

    fn check_failure(&self) -> Result<(), TokenError> {
        match self.failure.borrow().as_ref() {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn run_hook(&self, from: Principal, to: Principal, amount: U256) {
        let hook = self.hook.borrow().clone();
        if let Some(hook) = hook {
            hook(from, to, amount);
        }
    }
}

impl Transactional for SandboxToken {
    fn begin_transaction(&self) {
        let snapshot = self.ledger.borrow().clone();
        self.snapshots.borrow_mut().push(snapshot);
    }

    fn commit_transaction(&self) {
        self.snapshots.borrow_mut().pop();
    }

    fn rollback_transaction(&self) {
        let snapshot = self.snapshots.borrow_mut().pop();
        if let Some(snapshot) = snapshot {
            *self.ledger.borrow_mut() = snapshot;
        }
    }
}

impl AssetToken for SandboxToken {
    fn id(&self) -> Principal {
        self.id
    }

    fn balance_of(&self, owner: Principal) -> U256 {
        self.ledger.borrow().balance_of(&owner)
    }

    fn transfer(&self, from: Principal, to: Principal, amount: U256) -> Result<(), TokenError> {
        self.check_failure()?;
        self.ledger.borrow_mut().move_funds(from, to, amount)?;
        self.run_hook(from, to, amount);
        Ok(())
    }

    fn transfer_from(
        &self,
        spender: Principal,
        from: Principal,
        to: Principal,
        amount: U256,
    ) -> Result<(), TokenError> {
        self.check_failure()?;
        {
            let mut ledger = self.ledger.borrow_mut();
            let allowance = ledger.allowance(&from, &spender);
            if allowance < amount {
                return Err(TokenError::InsufficientAllowance { allowance });
            }
            ledger.move_funds(from, to, amount)?;
            ledger.allowances.insert((from, spender), allowance - amount);
        }
        self.run_hook(from, to, amount);
        Ok(())
    }
}

/// A price feed whose answer is set by hand.
pub struct SandboxPriceFeed {
    price: Cell<i128>,
    decimals: Cell<u8>,
    valid: Cell<bool>,
}

impl SandboxPriceFeed {
    pub fn new(price: i128, decimals: u8) -> Self {
        Self {
            price: Cell::new(price),
            decimals: Cell::new(decimals),
            valid: Cell::new(true),
        }
    }

    pub fn set_price(&self, price: i128) {
        self.price.set(price);
    }

    pub fn set_decimals(&self, decimals: u8) {
        self.decimals.set(decimals);
    }

    pub fn set_valid(&self, valid: bool) {
        self.valid.set(valid);
    }
}

impl PriceSource for SandboxPriceFeed {
    fn latest_price(&self) -> PriceReading {
        PriceReading {
            price: self.price.get(),
            decimals: self.decimals.get(),
            is_valid: self.valid.get(),
        }
    }
}

//! Minimal fungible ledger for the stable-value token.
//!
//! Supply control (mint and burn) is a capability held by exactly one principal,
//! checked on every call. Transfers and allowances work like an ICRC-2 ledger.

mod types;


use candid::Principal;
use ethnum::U256;
use ic_canister_log::{declare_log_buffer, log};
use std::cell::RefCell;
use std::collections::BTreeMap;

pub use types::{StableTokenError, StableTokenInitArg};

declare_log_buffer!(name = LOG, capacity = 1000);

pub const DECIMALS: u8 = 18;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct Balances {
    balances: BTreeMap<Principal, U256>,
    allowances: BTreeMap<(Principal, Principal), U256>,
    total_supply: U256,
}

impl Balances {
    fn balance_of(&self, owner: &Principal) -> U256 {
        self.balances.get(owner).copied().unwrap_or(U256::ZERO)
    }

    fn allowance(&self, owner: &Principal, spender: &Principal) -> U256 {
        self.allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    fn credit(&mut self, owner: Principal, amount: U256) -> Result<(), StableTokenError> {
        let balance = self
            .balance_of(&owner)
            .checked_add(amount)
            .ok_or(StableTokenError::Overflow)?;
        self.balances.insert(owner, balance);
        Ok(())
    }

    fn debit(&mut self, owner: Principal, amount: U256) -> Result<(), StableTokenError> {
        let balance = self.balance_of(&owner);
        if balance < amount {
            return Err(StableTokenError::InsufficientFunds { balance });
        }
        if balance == amount {
            self.balances.remove(&owner);
        } else {
            self.balances.insert(owner, balance - amount);
        }
        Ok(())
    }

    fn spend_allowance(
        &mut self,
        owner: Principal,
        spender: Principal,
        amount: U256,
    ) -> Result<(), StableTokenError> {
        let allowance = self.allowance(&owner, &spender);
        if allowance < amount {
            return Err(StableTokenError::InsufficientAllowance { allowance });
        }
        if allowance == amount {
            self.allowances.remove(&(owner, spender));
        } else {
            self.allowances.insert((owner, spender), allowance - amount);
        }
        Ok(())
    }
}

pub struct StableToken {
    name: String,
    symbol: String,
    controller: RefCell<Principal>,
    ledger: RefCell<Balances>,
    checkpoints: RefCell<Vec<Balances>>,
}

impl StableToken {
    pub fn new(args: StableTokenInitArg) -> Self {
        log!(
            LOG,
            "[init] {} ({}) controlled by {}",
            args.name,
            args.symbol,
            args.controller
        );
        Self {
            name: args.name,
            symbol: args.symbol,
            controller: RefCell::new(args.controller),
            ledger: RefCell::new(Balances::default()),
            checkpoints: RefCell::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn decimals(&self) -> u8 {
        DECIMALS
    }

    pub fn controller(&self) -> Principal {
        *self.controller.borrow()
    }

    pub fn total_supply(&self) -> U256 {
        self.ledger.borrow().total_supply
    }

    pub fn balance_of(&self, owner: Principal) -> U256 {
        self.ledger.borrow().balance_of(&owner)
    }

    pub fn allowance(&self, owner: Principal, spender: Principal) -> U256 {
        self.ledger.borrow().allowance(&owner, &spender)
    }

    fn ensure_controller(&self, caller: Principal) -> Result<(), StableTokenError> {
        if caller != self.controller() {
            log!(LOG, "[ensure_controller] rejected call from {}", caller);
            return Err(StableTokenError::Unauthorized { caller });
        }
        Ok(())
    }

    /// Hands the mint/burn capability to a new principal. Only the current
    /// controller can do this.
    pub fn transfer_controller(
        &self,
        caller: Principal,
        new_controller: Principal,
    ) -> Result<(), StableTokenError> {
        self.ensure_controller(caller)?;
        *self.controller.borrow_mut() = new_controller;
        log!(LOG, "[transfer_controller] {} -> {}", caller, new_controller);
        Ok(())
    }

    pub fn mint(&self, caller: Principal, to: Principal, amount: U256) -> Result<(), StableTokenError> {
        self.ensure_controller(caller)?;
        if amount == U256::ZERO {
            return Err(StableTokenError::AmountMustBePositive);
        }
        let mut ledger = self.ledger.borrow_mut();
        let total_supply = ledger.total_supply.checked_add(amount).ok_or_else(|| {
            log!(LOG, "[mint] {} to {} would overflow the supply", amount, to);
            StableTokenError::Overflow
        })?;
        // balances never exceed the supply
        ledger.credit(to, amount)?;
        ledger.total_supply = total_supply;
        log!(LOG, "[mint] {} to {}", amount, to);
        Ok(())
    }

    /// Destroys `amount` from `from`. The controller burns its own balance
    /// directly; any other holder must have approved the controller first.
    pub fn burn_from(
        &self,
        caller: Principal,
        from: Principal,
        amount: U256,
    ) -> Result<(), StableTokenError> {
        self.ensure_controller(caller)?;
        if amount == U256::ZERO {
            return Err(StableTokenError::AmountMustBePositive);
        }
        let mut ledger = self.ledger.borrow_mut();
        let balance = ledger.balance_of(&from);
        if balance < amount {
            return Err(StableTokenError::InsufficientFunds { balance });
        }
        if from != caller {
            ledger.spend_allowance(from, caller, amount)?;
        }
        ledger.debit(from, amount)?;
        ledger.total_supply -= amount;
        log!(LOG, "[burn_from] {} from {}", amount, from);
        Ok(())
    }

    pub fn transfer(&self, from: Principal, to: Principal, amount: U256) -> Result<(), StableTokenError> {
        let mut ledger = self.ledger.borrow_mut();
        ledger.debit(from, amount)?;
        ledger.credit(to, amount)
    }

    pub fn approve(&self, owner: Principal, spender: Principal, amount: U256) {
        let mut ledger = self.ledger.borrow_mut();
        if amount == U256::ZERO {
            ledger.allowances.remove(&(owner, spender));
        } else {
            ledger.allowances.insert((owner, spender), amount);
        }
    }

    pub fn transfer_from(
        &self,
        spender: Principal,
        from: Principal,
        to: Principal,
        amount: U256,
    ) -> Result<(), StableTokenError> {
        let mut ledger = self.ledger.borrow_mut();
        let balance = ledger.balance_of(&from);
        if balance < amount {
            return Err(StableTokenError::InsufficientFunds { balance });
        }
        ledger.spend_allowance(from, spender, amount)?;
        ledger.debit(from, amount)?;
        ledger.credit(to, amount)
    }

    /// Saves the current balances so that a later `rollback` can restore them.
    pub fn checkpoint(&self) {
        let snapshot = self.ledger.borrow().clone();
        self.checkpoints.borrow_mut().push(snapshot);
    }

    pub fn commit(&self) {
        self.checkpoints.borrow_mut().pop();
    }

    pub fn rollback(&self) {
        if let Some(snapshot) = self.checkpoints.borrow_mut().pop() {
            *self.ledger.borrow_mut() = snapshot;
        }
    }
}

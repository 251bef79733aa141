use crate::collateral::CollateralRegistry;
use crate::event::{record_init, replay, Event};
use crate::guard::ReentrancyGuard;
use crate::health::calculate_health_factor;
use crate::logs::{DEBUG, INFO};
use crate::management::{AssetToken, DebtToken, PriceSource, Transactional};
use crate::numeric::Usd;
use crate::state::State;
use crate::{ProtocolError, LIQUIDATION_PRECISION, LIQUIDATION_THRESHOLD, MIN_HEALTH_FACTOR};
use candid::Principal;
use ethnum::U256;
use ic_canister_log::log;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Construction arguments. `collateral_assets` and `price_sources` are
/// parallel lists: the i-th source prices the i-th asset.
pub struct InitArg {
    /// Custody account the engine holds collateral under. The stable token
    /// must name this principal as its controller.
    pub engine_id: Principal,
    pub collateral_assets: Vec<Rc<dyn AssetToken>>,
    pub price_sources: Vec<Rc<dyn PriceSource>>,
    pub stable_token: Rc<dyn DebtToken>,
}

enum Phase {
    Begin,
    Commit,
    Rollback,
}

fn apply_phase<T: Transactional + ?Sized>(collaborator: &T, phase: &Phase) {
    match phase {
        Phase::Begin => collaborator.begin_transaction(),
        Phase::Commit => collaborator.commit_transaction(),
        Phase::Rollback => collaborator.rollback_transaction(),
    }
}

pub struct Engine {
    id: Principal,
    registry: CollateralRegistry,
    stable_token: Rc<dyn DebtToken>,
    state: RefCell<State>,
    lock: Cell<bool>,
}

impl Engine {
    pub fn new(args: InitArg) -> Result<Self, ProtocolError> {
        let registry = CollateralRegistry::new(args.collateral_assets, args.price_sources)?;
        let mut state = State::default();
        record_init(&mut state, registry.ids());
        log!(
            INFO,
            "[init] engine {} accepting {} collateral assets",
            args.engine_id,
            registry.len()
        );
        Ok(Self {
            id: args.engine_id,
            registry,
            stable_token: args.stable_token,
            state: RefCell::new(state),
            lock: Cell::new(false),
        })
    }

    pub fn id(&self) -> Principal {
        self.id
    }

    pub fn registry(&self) -> &CollateralRegistry {
        &self.registry
    }

    pub fn stable_token(&self) -> &Rc<dyn DebtToken> {
        &self.stable_token
    }

    pub(crate) fn read_state<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&State) -> R,
    {
        f(&*self.state.borrow())
    }

    pub(crate) fn mutate_state<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut State) -> R,
    {
        f(&mut *self.state.borrow_mut())
    }

    fn for_each_collaborator(&self, phase: Phase) {
        for asset in self.registry.iter() {
            apply_phase(&**asset.token(), &phase);
        }
        apply_phase(&*self.stable_token, &phase);
    }

    /// Runs `f` as one atomic, non-reentrant operation.
    ///
    /// On failure the ledgers, the event log and every token collaborator are
    /// put back to where they were when `f` started.
    pub(crate) fn execute<T, F>(&self, operation: &str, f: F) -> Result<T, ProtocolError>
    where
        F: FnOnce() -> Result<T, ProtocolError>,
    {
        let _guard = ReentrancyGuard::new(&self.lock, operation)?;
        let snapshot = self.read_state(State::snapshot);
        self.for_each_collaborator(Phase::Begin);
        match f() {
            Ok(value) => {
                self.for_each_collaborator(Phase::Commit);
                Ok(value)
            }
            Err(error) => {
                self.for_each_collaborator(Phase::Rollback);
                self.mutate_state(|s| s.restore(snapshot));
                log!(DEBUG, "[{}] rolled back: {}", operation, error);
                Err(error)
            }
        }
    }

    pub fn collateral_assets(&self) -> Vec<Principal> {
        self.registry.ids()
    }

    pub fn collateral_balance(&self, user: Principal, asset: Principal) -> U256 {
        self.read_state(|s| s.collateral_balance(&user, &asset))
    }

    pub fn debt_of(&self, user: Principal) -> Usd {
        self.read_state(|s| s.debt_of(&user))
    }

    /// Returns `(debt, collateral value in USD)`.
    pub fn account_information(&self, user: Principal) -> Result<(Usd, Usd), ProtocolError> {
        let debt = self.debt_of(user);
        let collateral_value = self.total_collateral_value_usd(user)?;
        Ok((debt, collateral_value))
    }

    pub fn usd_value(&self, asset: Principal, amount: U256) -> Result<Usd, ProtocolError> {
        self.registry.get(&asset)?.oracle().usd_value(amount)
    }

    pub fn token_amount_for_usd(&self, asset: Principal, usd: Usd) -> Result<U256, ProtocolError> {
        self.registry.get(&asset)?.oracle().token_amount_for_usd(usd)
    }

    /// Latest price of one whole unit of `asset`, at 18 decimals.
    pub fn collateral_price(&self, asset: Principal) -> Result<U256, ProtocolError> {
        self.registry.get(&asset)?.oracle().normalized_price()
    }

    pub fn price_source_of(&self, asset: Principal) -> Result<Rc<dyn PriceSource>, ProtocolError> {
        Ok(self.registry.get(&asset)?.oracle().source().clone())
    }

    /// Additional debt `user` could take on and still sit exactly at the
    /// minimum health factor. Zero when already at or below it.
    pub fn max_mintable(&self, user: Principal) -> Result<Usd, ProtocolError> {
        let (debt, collateral_value) = self.account_information(user)?;
        let capacity = collateral_value.mul_ratio(
            U256::from(LIQUIDATION_THRESHOLD),
            U256::from(LIQUIDATION_PRECISION),
        );
        Ok(capacity.saturating_sub(debt))
    }

    pub fn total_debt(&self) -> Usd {
        self.read_state(State::total_debt)
    }

    pub fn total_deposited(&self, asset: Principal) -> U256 {
        self.read_state(|s| s.total_deposited(&asset))
    }

    pub fn events(&self) -> Vec<Event> {
        self.read_state(|s| s.event_log.events().collect())
    }

    /// Checks that total debt stays within the risk-adjusted value of all
    /// collateral held, priced at the current oracle readings.
    pub fn check_solvency(&self) -> Result<(), String> {
        let mut collateral_value = Usd::ZERO;
        for asset in self.registry.iter() {
            let deposited = self.total_deposited(asset.id());
            if deposited == U256::ZERO {
                continue;
            }
            let value = asset
                .oracle()
                .usd_value(deposited)
                .map_err(|e| e.to_string())?;
            collateral_value = collateral_value.saturating_add(value);
        }
        let total_debt = self.total_debt();
        let health_factor = calculate_health_factor(total_debt, collateral_value);
        if health_factor < MIN_HEALTH_FACTOR {
            return Err(format!(
                "total debt {} exceeds the risk-adjusted value of {} in collateral",
                total_debt, collateral_value
            ));
        }
        Ok(())
    }

    /// Checks ledger hygiene and that replaying the event log rebuilds the
    /// current ledgers.
    pub fn check_invariants(&self) -> Result<(), String> {
        self.read_state(|s| {
            s.check_invariants()?;
            let recovered = replay(s.event_log.events())
                .map_err(|e| format!("failed to replay the event log: {:?}", e))?;
            recovered.check_invariants()?;
            s.check_semantically_eq(&recovered)
        })
    }
}

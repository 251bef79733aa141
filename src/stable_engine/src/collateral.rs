use crate::engine::Engine;
use crate::event::{record_collateral_deposited, record_collateral_redeemed};
use crate::logs::INFO;
use crate::management::{AssetToken, PriceSource};
use crate::numeric::Usd;
use crate::oracle::OracleAdapter;
use crate::ProtocolError;
use candid::Principal;
use ethnum::U256;
use ic_canister_log::log;
use std::collections::HashMap;
use std::rc::Rc;

/// An approved collateral asset: its token ledger and the oracle that prices it.
#[derive(Clone)]
pub struct CollateralAsset {
    token: Rc<dyn AssetToken>,
    oracle: OracleAdapter,
}

impl CollateralAsset {
    pub fn id(&self) -> Principal {
        self.token.id()
    }

    pub fn token(&self) -> &Rc<dyn AssetToken> {
        &self.token
    }

    pub fn oracle(&self) -> &OracleAdapter {
        &self.oracle
    }
}

/// The allow-list of collateral assets, fixed at construction.
///
/// Iteration follows construction order; membership goes through the index.
#[derive(Clone, Default)]
pub struct CollateralRegistry {
    assets: Vec<CollateralAsset>,
    index: HashMap<Principal, usize>,
}

impl CollateralRegistry {
    pub fn new(
        tokens: Vec<Rc<dyn AssetToken>>,
        price_sources: Vec<Rc<dyn PriceSource>>,
    ) -> Result<Self, ProtocolError> {
        if tokens.len() != price_sources.len() {
            return Err(ProtocolError::ConfigLengthMismatch {
                assets: tokens.len(),
                price_sources: price_sources.len(),
            });
        }
        let mut registry = Self::default();
        for (token, source) in tokens.into_iter().zip(price_sources) {
            let id = token.id();
            if registry.index.contains_key(&id) {
                return Err(ProtocolError::DuplicateCollateral(id));
            }
            registry.index.insert(id, registry.assets.len());
            registry.assets.push(CollateralAsset {
                token,
                oracle: OracleAdapter::new(id, source),
            });
        }
        Ok(registry)
    }

    pub fn contains(&self, asset: &Principal) -> bool {
        self.index.contains_key(asset)
    }

    pub fn get(&self, asset: &Principal) -> Result<&CollateralAsset, ProtocolError> {
        self.index
            .get(asset)
            .map(|i| &self.assets[*i])
            .ok_or(ProtocolError::AssetNotAllowed(*asset))
    }

    pub fn ids(&self) -> Vec<Principal> {
        self.assets.iter().map(CollateralAsset::id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CollateralAsset> {
        self.assets.iter()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

impl Engine {
    /// Credits `amount` of `asset` to `user`. Pulling the funds into custody is
    /// left to the calling operation.
    pub(crate) fn record_deposit(
        &self,
        user: Principal,
        asset: Principal,
        amount: U256,
    ) -> Result<(), ProtocolError> {
        if amount == U256::ZERO {
            return Err(ProtocolError::AmountMustBePositive);
        }
        self.registry().get(&asset)?;
        self.mutate_state(|s| record_collateral_deposited(s, user, asset, amount));
        Ok(())
    }

    /// Debits `from`'s balance and pays `amount` out of custody to `to`.
    pub(crate) fn record_withdrawal(
        &self,
        from: Principal,
        to: Principal,
        asset: Principal,
        amount: U256,
    ) -> Result<(), ProtocolError> {
        if amount == U256::ZERO {
            return Err(ProtocolError::AmountMustBePositive);
        }
        let token = self.registry().get(&asset)?.token().clone();
        self.mutate_state(|s| record_collateral_redeemed(s, from, to, asset, amount))?;
        token.transfer(self.id(), to, amount)?;
        log!(
            INFO,
            "[record_withdrawal] {} of {} moved from {} to {}",
            amount,
            asset,
            from,
            to
        );
        Ok(())
    }

    /// USD value of everything `user` has deposited, summed in registry order.
    /// Assets with a zero balance are skipped without consulting their oracle.
    pub fn total_collateral_value_usd(&self, user: Principal) -> Result<Usd, ProtocolError> {
        let mut total = Usd::ZERO;
        for asset in self.registry().iter() {
            let balance = self.read_state(|s| s.collateral_balance(&user, &asset.id()));
            if balance == U256::ZERO {
                continue;
            }
            total = total.saturating_add(asset.oracle().usd_value(balance)?);
        }
        Ok(total)
    }
}

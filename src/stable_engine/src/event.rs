use crate::numeric::Usd;
use crate::state::State;
use crate::ProtocolError;
use candid::Principal;
use ethnum::U256;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    #[serde(rename = "init")]
    Init { assets: Vec<Principal> },

    #[serde(rename = "collateral_deposited")]
    CollateralDeposited {
        user: Principal,
        asset: Principal,
        #[serde(with = "ethnum::serde::decimal")]
        amount: U256,
    },

    #[serde(rename = "collateral_redeemed")]
    CollateralRedeemed {
        from: Principal,
        to: Principal,
        asset: Principal,
        #[serde(with = "ethnum::serde::decimal")]
        amount: U256,
    },

    #[serde(rename = "stable_minted")]
    StableMinted { user: Principal, amount: Usd },

    #[serde(rename = "stable_burned")]
    StableBurned {
        on_behalf_of: Principal,
        payer: Principal,
        amount: Usd,
    },

    /// Summary of a liquidation. The ledger effects are carried by the
    /// `CollateralRedeemed` and `StableBurned` events recorded before it.
    #[serde(rename = "liquidated")]
    Liquidated {
        liquidator: Principal,
        user: Principal,
        asset: Principal,
        debt_covered: Usd,
        #[serde(with = "ethnum::serde::decimal")]
        collateral_seized: U256,
    },
}

impl Event {
    pub fn involves(&self, principal: &Principal) -> bool {
        match self {
            Event::Init { .. } => false,
            Event::CollateralDeposited { user, .. } => user == principal,
            Event::CollateralRedeemed { from, to, .. } => from == principal || to == principal,
            Event::StableMinted { user, .. } => user == principal,
            Event::StableBurned {
                on_behalf_of,
                payer,
                ..
            } => on_behalf_of == principal || payer == principal,
            Event::Liquidated {
                liquidator, user, ..
            } => liquidator == principal || user == principal,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ReplayLogError {
    /// There are no events in the event log.
    EmptyLog,
    /// The event log is inconsistent.
    InconsistentLog(String),
}

/// Rebuilds both ledgers from an event log. The returned state carries an
/// empty log of its own.
pub fn replay(mut events: impl Iterator<Item = Event>) -> Result<State, ReplayLogError> {
    let mut state = match events.next() {
        Some(Event::Init { .. }) => State::default(),
        Some(evt) => {
            return Err(ReplayLogError::InconsistentLog(format!(
                "The first event is not Init: {:?}",
                evt
            )))
        }
        None => return Err(ReplayLogError::EmptyLog),
    };
    for event in events {
        match event {
            Event::Init { .. } => {
                return Err(ReplayLogError::InconsistentLog(
                    "should have only one init event".to_string(),
                ))
            }
            Event::CollateralDeposited {
                user,
                asset,
                amount,
            } => state.deposit_collateral(user, asset, amount),
            Event::CollateralRedeemed {
                from,
                to: _,
                asset,
                amount,
            } => state
                .withdraw_collateral(from, asset, amount)
                .map_err(|e| ReplayLogError::InconsistentLog(e.to_string()))?,
            Event::StableMinted { user, amount } => state.mint_debt(user, amount),
            Event::StableBurned {
                on_behalf_of,
                payer: _,
                amount,
            } => state
                .burn_debt(on_behalf_of, amount)
                .map_err(|e| ReplayLogError::InconsistentLog(e.to_string()))?,
            Event::Liquidated { .. } => {}
        }
    }
    Ok(state)
}

pub fn record_init(state: &mut State, assets: Vec<Principal>) {
    state.event_log.record_event(&Event::Init { assets });
}

pub fn record_collateral_deposited(state: &mut State, user: Principal, asset: Principal, amount: U256) {
    state.deposit_collateral(user, asset, amount);
    state.event_log.record_event(&Event::CollateralDeposited {
        user,
        asset,
        amount,
    });
}

pub fn record_collateral_redeemed(
    state: &mut State,
    from: Principal,
    to: Principal,
    asset: Principal,
    amount: U256,
) -> Result<(), ProtocolError> {
    state.withdraw_collateral(from, asset, amount)?;
    state.event_log.record_event(&Event::CollateralRedeemed {
        from,
        to,
        asset,
        amount,
    });
    Ok(())
}

pub fn record_stable_minted(state: &mut State, user: Principal, amount: Usd) {
    state.mint_debt(user, amount);
    state
        .event_log
        .record_event(&Event::StableMinted { user, amount });
}

pub fn record_stable_burned(
    state: &mut State,
    on_behalf_of: Principal,
    payer: Principal,
    amount: Usd,
) -> Result<(), ProtocolError> {
    state.burn_debt(on_behalf_of, amount)?;
    state.event_log.record_event(&Event::StableBurned {
        on_behalf_of,
        payer,
        amount,
    });
    Ok(())
}

pub fn record_liquidated(
    state: &mut State,
    liquidator: Principal,
    user: Principal,
    asset: Principal,
    debt_covered: Usd,
    collateral_seized: U256,
) {
    state.event_log.record_event(&Event::Liquidated {
        liquidator,
        user,
        asset,
        debt_covered,
        collateral_seized,
    });
}

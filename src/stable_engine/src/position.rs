//! The user-facing transitions of a position. Each public operation runs
//! inside [`Engine::execute`]; the composed ones chain the same internal
//! steps under a single atomic boundary.

use crate::engine::Engine;
use crate::logs::INFO;
use crate::numeric::Usd;
use crate::ProtocolError;
use candid::Principal;
use ethnum::U256;
use ic_canister_log::log;

impl Engine {
    pub fn deposit_collateral(
        &self,
        caller: Principal,
        asset: Principal,
        amount: U256,
    ) -> Result<(), ProtocolError> {
        self.execute("deposit_collateral", || {
            self.deposit_collateral_internal(caller, asset, amount)
        })
    }

    pub fn mint(&self, caller: Principal, amount: Usd) -> Result<(), ProtocolError> {
        self.execute("mint", || self.mint_internal(caller, amount))
    }

    pub fn deposit_collateral_and_mint(
        &self,
        caller: Principal,
        asset: Principal,
        collateral_amount: U256,
        mint_amount: Usd,
    ) -> Result<(), ProtocolError> {
        self.execute("deposit_collateral_and_mint", || {
            self.deposit_collateral_internal(caller, asset, collateral_amount)?;
            self.mint_internal(caller, mint_amount)
        })
    }

    pub fn redeem_collateral(
        &self,
        caller: Principal,
        asset: Principal,
        amount: U256,
    ) -> Result<(), ProtocolError> {
        self.execute("redeem_collateral", || {
            self.redeem_collateral_internal(caller, asset, amount)
        })
    }

    pub fn burn(&self, caller: Principal, amount: Usd) -> Result<(), ProtocolError> {
        self.execute("burn", || self.burn_internal(caller, amount))
    }

    pub fn redeem_collateral_for_debt(
        &self,
        caller: Principal,
        asset: Principal,
        collateral_amount: U256,
        burn_amount: Usd,
    ) -> Result<(), ProtocolError> {
        self.execute("redeem_collateral_for_debt", || {
            self.burn_internal(caller, burn_amount)?;
            self.redeem_collateral_internal(caller, asset, collateral_amount)
        })
    }

    fn deposit_collateral_internal(
        &self,
        caller: Principal,
        asset: Principal,
        amount: U256,
    ) -> Result<(), ProtocolError> {
        self.record_deposit(caller, asset, amount)?;
        let token = self.registry().get(&asset)?.token().clone();
        token.transfer_from(self.id(), caller, self.id(), amount)?;
        log!(
            INFO,
            "[deposit_collateral] {} deposited {} of {}",
            caller,
            amount,
            asset
        );
        Ok(())
    }

    fn mint_internal(&self, caller: Principal, amount: Usd) -> Result<(), ProtocolError> {
        self.record_mint(caller, amount)?;
        if !self.stable_token().mint(self.id(), caller, amount.to_u256()) {
            return Err(ProtocolError::MintFailed);
        }
        self.assert_healthy(caller)?;
        log!(INFO, "[mint] {} minted {}", caller, amount);
        Ok(())
    }

    fn redeem_collateral_internal(
        &self,
        caller: Principal,
        asset: Principal,
        amount: U256,
    ) -> Result<(), ProtocolError> {
        self.registry().get(&asset)?;
        self.record_withdrawal(caller, caller, asset, amount)?;
        self.assert_healthy(caller)?;
        log!(
            INFO,
            "[redeem_collateral] {} redeemed {} of {}",
            caller,
            amount,
            asset
        );
        Ok(())
    }

    fn burn_internal(&self, caller: Principal, amount: Usd) -> Result<(), ProtocolError> {
        self.record_burn(caller, caller, amount)?;
        self.assert_healthy(caller)?;
        log!(INFO, "[burn] {} repaid {}", caller, amount);
        Ok(())
    }
}

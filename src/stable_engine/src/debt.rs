use crate::engine::Engine;
use crate::event::{record_stable_burned, record_stable_minted};
use crate::logs::INFO;
use crate::numeric::Usd;
use crate::ProtocolError;
use candid::Principal;
use ic_canister_log::log;

impl Engine {
    /// Adds `amount` to `user`'s debt. Issuing the tokens is left to the
    /// calling operation.
    pub(crate) fn record_mint(&self, user: Principal, amount: Usd) -> Result<(), ProtocolError> {
        if amount.is_zero() {
            return Err(ProtocolError::AmountMustBePositive);
        }
        self.mutate_state(|s| record_stable_minted(s, user, amount));
        Ok(())
    }

    /// Clears `amount` of `on_behalf_of`'s debt using `payer`'s tokens.
    ///
    /// The tokens are pulled into custody with the payer's allowance and then
    /// destroyed, so the engine never holds a stable balance across operations.
    pub(crate) fn record_burn(
        &self,
        on_behalf_of: Principal,
        payer: Principal,
        amount: Usd,
    ) -> Result<(), ProtocolError> {
        if amount.is_zero() {
            return Err(ProtocolError::AmountMustBePositive);
        }
        self.mutate_state(|s| record_stable_burned(s, on_behalf_of, payer, amount))?;
        let engine_id = self.id();
        let stable_token = self.stable_token();
        stable_token.transfer_from(engine_id, payer, engine_id, amount.to_u256())?;
        stable_token.burn_from(engine_id, engine_id, amount.to_u256())?;
        log!(
            INFO,
            "[record_burn] {} paid by {} for {}",
            amount,
            payer,
            on_behalf_of
        );
        Ok(())
    }
}

use candid::Principal;
use ethnum::U256;
use proptest::collection::vec as pvec;
use proptest::prelude::*;
use stable_engine::management::{AssetToken, PriceSource};
use stable_engine::numeric::{HealthFactor, Usd, PRECISION};
use stable_engine::oracle::OracleAdapter;
use stable_engine::sandbox::{SandboxPriceFeed, SandboxToken};
use stable_engine::{Engine, InitArg, FEED_DECIMALS, MIN_HEALTH_FACTOR};
use stable_token::{StableToken, StableTokenInitArg};
use std::rc::Rc;

const USERS: u8 = 4;

fn engine_id() -> Principal {
    Principal::from_slice(&[0xEE])
}

fn user(i: u8) -> Principal {
    Principal::from_slice(&[1 + i])
}

fn asset_id(i: u8) -> Principal {
    Principal::from_slice(&[10 + i])
}

struct World {
    engine: Engine,
    tokens: Vec<Rc<SandboxToken>>,
    feeds: Vec<Rc<SandboxPriceFeed>>,
    stable: Rc<StableToken>,
}

fn world(prices: &[i128]) -> World {
    let tokens: Vec<Rc<SandboxToken>> = (0..prices.len() as u8)
        .map(|i| Rc::new(SandboxToken::new(asset_id(i))))
        .collect();
    let feeds: Vec<Rc<SandboxPriceFeed>> = prices
        .iter()
        .map(|p| Rc::new(SandboxPriceFeed::new(*p, FEED_DECIMALS)))
        .collect();
    let stable = Rc::new(StableToken::new(StableTokenInitArg {
        controller: engine_id(),
        name: "Stable".to_string(),
        symbol: "STB".to_string(),
    }));
    let engine = Engine::new(InitArg {
        engine_id: engine_id(),
        collateral_assets: tokens
            .iter()
            .map(|t| t.clone() as Rc<dyn AssetToken>)
            .collect(),
        price_sources: feeds
            .iter()
            .map(|f| f.clone() as Rc<dyn PriceSource>)
            .collect(),
        stable_token: stable.clone(),
    })
    .unwrap();
    World {
        engine,
        tokens,
        feeds,
        stable,
    }
}

#[derive(Clone, Debug)]
enum Op {
    Deposit { user: u8, asset: u8, amount: u128 },
    Mint { user: u8, dollars: u128 },
    DepositAndMint { user: u8, asset: u8, amount: u128, dollars: u128 },
    Redeem { user: u8, asset: u8, amount: u128 },
    Burn { user: u8, dollars: u128 },
    RedeemForDebt { user: u8, asset: u8, amount: u128, dollars: u128 },
}

fn arb_amount() -> impl Strategy<Value = u128> {
    // tenths of a unit
    (0..200u128).prop_map(|tenths| tenths * (PRECISION.as_u128() / 10))
}

fn arb_dollars() -> impl Strategy<Value = u128> {
    0..20_000u128
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..USERS, 0..2u8, arb_amount())
            .prop_map(|(user, asset, amount)| Op::Deposit { user, asset, amount }),
        (0..USERS, arb_dollars()).prop_map(|(user, dollars)| Op::Mint { user, dollars }),
        (0..USERS, 0..2u8, arb_amount(), arb_dollars()).prop_map(
            |(user, asset, amount, dollars)| Op::DepositAndMint {
                user,
                asset,
                amount,
                dollars
            }
        ),
        (0..USERS, 0..2u8, arb_amount())
            .prop_map(|(user, asset, amount)| Op::Redeem { user, asset, amount }),
        (0..USERS, arb_dollars()).prop_map(|(user, dollars)| Op::Burn { user, dollars }),
        (0..USERS, 0..2u8, arb_amount(), arb_dollars()).prop_map(
            |(user, asset, amount, dollars)| Op::RedeemForDebt {
                user,
                asset,
                amount,
                dollars
            }
        ),
    ]
}

impl World {
    fn fund(&self, user: Principal, asset: u8, amount: u128) {
        let token = &self.tokens[asset as usize];
        token.mint_to(user, U256::from(amount));
        token.approve(user, engine_id(), U256::from(amount));
    }

    fn approve_stable(&self, user: Principal, dollars: u128) {
        self.stable
            .approve(user, engine_id(), Usd::from_whole(dollars).to_u256());
    }

    fn apply(&self, op: &Op) {
        // failures are expected; they must simply leave no trace
        let _ = match *op {
            Op::Deposit { user: u, asset, amount } => {
                self.fund(user(u), asset, amount);
                self.engine
                    .deposit_collateral(user(u), asset_id(asset), U256::from(amount))
            }
            Op::Mint { user: u, dollars } => self.engine.mint(user(u), Usd::from_whole(dollars)),
            Op::DepositAndMint {
                user: u,
                asset,
                amount,
                dollars,
            } => {
                self.fund(user(u), asset, amount);
                self.engine.deposit_collateral_and_mint(
                    user(u),
                    asset_id(asset),
                    U256::from(amount),
                    Usd::from_whole(dollars),
                )
            }
            Op::Redeem { user: u, asset, amount } => {
                self.engine
                    .redeem_collateral(user(u), asset_id(asset), U256::from(amount))
            }
            Op::Burn { user: u, dollars } => {
                self.approve_stable(user(u), dollars);
                self.engine.burn(user(u), Usd::from_whole(dollars))
            }
            Op::RedeemForDebt {
                user: u,
                asset,
                amount,
                dollars,
            } => {
                self.approve_stable(user(u), dollars);
                self.engine.redeem_collateral_for_debt(
                    user(u),
                    asset_id(asset),
                    U256::from(amount),
                    Usd::from_whole(dollars),
                )
            }
        };
    }
}

proptest! {
    #[test]
    fn usd_round_trip_rounds_down(
        dollars in 1..1_000_000i128,
        cents in 0..100i128,
        amount in any::<u128>(),
    ) {
        let feed = Rc::new(SandboxPriceFeed::new(dollars * 100_000_000 + cents * 1_000_000, FEED_DECIMALS));
        let oracle = OracleAdapter::new(asset_id(0), feed);
        let amount = U256::from(amount);
        let price = oracle.normalized_price().unwrap();

        let back = oracle
            .token_amount_for_usd(oracle.usd_value(amount).unwrap())
            .unwrap();
        prop_assert!(back <= amount);
        prop_assert!(amount - back <= U256::ONE + PRECISION / price);
    }

    #[test]
    fn every_committed_state_is_solvent(ops in pvec(arb_op(), 1..40)) {
        let w = world(&[2_000 * 100_000_000, 30_000 * 100_000_000]);
        for op in &ops {
            w.apply(op);
            for i in 0..USERS {
                let hf = w.engine.health_factor(user(i)).unwrap();
                prop_assert!(hf >= MIN_HEALTH_FACTOR, "user {} at {} after {:?}", i, hf, op);
            }
            prop_assert_eq!(w.engine.check_solvency(), Ok(()));
            prop_assert_eq!(w.engine.check_invariants(), Ok(()));
            prop_assert_eq!(
                w.stable.total_supply(),
                w.engine.total_debt().to_u256()
            );
            for (i, token) in w.tokens.iter().enumerate() {
                prop_assert_eq!(
                    token.balance_of(engine_id()),
                    w.engine.total_deposited(asset_id(i as u8))
                );
            }
        }
    }

    #[test]
    fn reads_are_idempotent(ops in pvec(arb_op(), 1..20), probe in 0..USERS) {
        let w = world(&[2_000 * 100_000_000, 30_000 * 100_000_000]);
        for op in &ops {
            w.apply(op);
        }
        let who = user(probe);
        let first = (
            w.engine.total_collateral_value_usd(who),
            w.engine.account_information(who),
            w.engine.health_factor(who),
            w.engine.max_mintable(who),
            w.engine.collateral_balance(who, asset_id(0)),
            w.engine.usd_value(asset_id(1), U256::from(12_345u32)),
            w.engine.token_amount_for_usd(asset_id(1), Usd::from_whole(7)),
            w.engine.collateral_assets(),
        );
        let second = (
            w.engine.total_collateral_value_usd(who),
            w.engine.account_information(who),
            w.engine.health_factor(who),
            w.engine.max_mintable(who),
            w.engine.collateral_balance(who, asset_id(0)),
            w.engine.usd_value(asset_id(1), U256::from(12_345u32)),
            w.engine.token_amount_for_usd(asset_id(1), Usd::from_whole(7)),
            w.engine.collateral_assets(),
        );
        prop_assert_eq!(first, second);
    }

    #[test]
    fn successful_liquidation_improves_health(
        tenths in 10..500u128,
        crash_price in 500..2_000i128,
        cover_permille in 1..=1_000u128,
    ) {
        let w = world(&[2_000 * 100_000_000, 1_000 * 100_000_000]);
        let target = user(0);
        let liquidator = user(1);

        let collateral = tenths * (PRECISION.as_u128() / 10);
        w.fund(target, 0, collateral);
        w.engine
            .deposit_collateral(target, asset_id(0), U256::from(collateral))
            .unwrap();
        let debt = w.engine.max_mintable(target).unwrap();
        w.engine.mint(target, debt).unwrap();

        let backing = 1_000_000 * PRECISION.as_u128();
        w.fund(liquidator, 1, backing);
        w.engine
            .deposit_collateral_and_mint(liquidator, asset_id(1), U256::from(backing), debt)
            .unwrap();
        w.stable.approve(liquidator, engine_id(), debt.to_u256());

        w.feeds[0].set_price(crash_price * 100_000_000);
        let cover = debt.mul_ratio(U256::from(cover_permille), U256::from(1_000u32));
        prop_assume!(!cover.is_zero());
        let before = w.engine.health_factor(target).unwrap();
        prop_assert!(before < MIN_HEALTH_FACTOR);

        match w.engine.liquidate(liquidator, asset_id(0), target, cover) {
            Ok(receipt) => {
                prop_assert!(receipt.health_factor_after > before);
                prop_assert_eq!(w.engine.health_factor(target).unwrap(), receipt.health_factor_after);
                prop_assert_eq!(w.engine.debt_of(target), debt - cover);
                prop_assert_eq!(
                    w.tokens[0].balance_of(liquidator),
                    receipt.collateral_seized
                );
            }
            Err(_) => {
                prop_assert_eq!(w.engine.debt_of(target), debt);
                prop_assert_eq!(w.engine.collateral_balance(target, asset_id(0)), U256::from(collateral));
                prop_assert_eq!(w.tokens[0].balance_of(liquidator), U256::ZERO);
            }
        }
        prop_assert_eq!(w.engine.check_invariants(), Ok(()));
    }

    #[test]
    fn zero_debt_reports_max_health(tenths in 1..1_000u128, price in 1..100_000i128) {
        let w = world(&[price * 100_000_000, 1]);
        let collateral = tenths * (PRECISION.as_u128() / 10);
        w.fund(user(0), 0, collateral);
        w.engine
            .deposit_collateral(user(0), asset_id(0), U256::from(collateral))
            .unwrap();
        prop_assert_eq!(w.engine.health_factor(user(0)).unwrap(), HealthFactor::MAX);
    }
}

use table_ladder::{
    ledger::Asset,
    units::{parse_units, UNIT},
    Address, Game, GameConfig, GameError, GameEvent,
};

fn addr(label: &str) -> Address {
    Address::derive(label.as_bytes())
}

fn units(text: &str) -> u128 {
    parse_units(text).unwrap()
}

struct World {
    game: Game,
    root: Address,
    charity: Address,
    alice: Address,
    bob: Address,
    carol: Address,
}

fn deploy() -> World {
    let root = addr("root");
    let charity = addr("charity");
    let mut game = Game::new(GameConfig::new(root, charity, addr("busd"), addr("game"))).unwrap();

    let (alice, bob, carol) = (addr("alice"), addr("bob"), addr("carol"));
    for who in [alice, bob, carol] {
        game.mint(who, Asset::Stable, 10_000 * UNIT).unwrap();
        game.mint(who, Asset::Native, 10_000 * UNIT).unwrap();
    }
    World {
        game,
        root,
        charity,
        alice,
        bob,
        carol,
    }
}

#[test]
fn full_deployment_scenario() {
    let mut w = deploy();

    // verification
    for who in [w.alice, w.bob] {
        w.game.approve(who, units("10"));
        let receipt = w.game.verify(who).unwrap();
        assert_eq!(receipt.events, vec![GameEvent::UserVerification { user: who }]);
    }
    assert_eq!(w.game.ledger().stable_balance(&w.alice), units("9990"));

    // plain transfer from alice
    assert_eq!(w.game.retained_pool(), 0);
    w.game.send(w.alice, units("0.1")).unwrap();
    assert_eq!(w.game.retained_pool(), units("0.025"));
    assert_eq!(w.game.ledger().native_balance(&w.root), units("0.065"));
    assert_eq!(w.game.ledger().native_balance(&w.charity), units("0.01"));

    // bob overpays, then buys table 1 under alice
    let err = w.game.buy(w.bob, w.carol, units("50")).unwrap_err();
    assert_eq!(err.reason(), "Only to next table");

    let receipt = w.game.buy(w.bob, w.alice, units("0.1")).unwrap();
    for expected in [
        GameEvent::InvestmentReceived { user: w.bob, value: units("0.1"), table: 1 },
        GameEvent::ReferralRewardSent { to: w.alice, value: units("0.025"), table: 1 },
        GameEvent::DonationRewardSent { to: w.root, value: units("0.008"), table: 1 },
        GameEvent::DonationReferralRewardSent { to: w.root, value: units("0.005"), table: 1 },
        GameEvent::CharitySent { to: w.charity, value: units("0.01"), table: 1 },
    ] {
        assert!(receipt.events.contains(&expected), "missing {expected:?}");
    }
    assert_eq!(w.game.ledger().native_balance(&w.charity), units("0.02"));
    assert_eq!(w.game.retained_pool(), units("0.025") + units("0.052"));

    // unverified carol cannot buy
    let err = w.game.buy(w.carol, w.alice, units("0.1")).unwrap_err();
    assert!(matches!(err, GameError::UnverifiedCaller));
    assert_eq!(err.reason(), "Only verified users");

    // bob's second table keeps alice as referrer, no second bonus
    let receipt = w.game.buy(w.bob, w.carol, units("0.2")).unwrap();
    assert!(receipt
        .events
        .contains(&GameEvent::ReferralRewardSent { to: w.alice, value: units("0.05"), table: 2 }));
    assert!(receipt
        .events
        .contains(&GameEvent::DonationRewardSent { to: w.root, value: units("0.016"), table: 2 }));
    assert!(receipt
        .events
        .contains(&GameEvent::CharitySent { to: w.charity, value: units("0.02"), table: 2 }));
    assert!(!receipt
        .events
        .iter()
        .any(|e| matches!(e, GameEvent::DonationReferralRewardSent { .. })));

    // queries
    assert_eq!(w.game.get_table_addresses_count(1).unwrap(), 3);
    assert_eq!(w.game.get_table_threshold(1).unwrap(), units("0.1"));
    let info = w.game.info(&w.alice);
    assert!(info.verified);
    assert!(info.has_received_donation_bonus);
    let membership = w.game.info_table(1, &w.alice).unwrap();
    assert_eq!(membership.position, Some(1));
}

#[test]
fn every_native_unit_is_accounted_for() {
    let mut w = deploy();
    for who in [w.alice, w.bob, w.carol] {
        w.game.approve(who, units("10"));
        w.game.verify(who).unwrap();
    }
    let total_before: u128 = w.game.ledger().accounts.values().map(|b| b.native).sum();

    w.game.send(w.alice, units("0.1")).unwrap();
    w.game.buy(w.bob, w.alice, units("0.1")).unwrap();
    w.game.buy(w.carol, w.bob, units("0.1")).unwrap();
    w.game.buy(w.bob, w.alice, units("0.2")).unwrap();
    w.game.buy(w.alice, w.carol, units("0.2")).unwrap();

    let total_after: u128 = w.game.ledger().accounts.values().map(|b| b.native).sum();
    assert_eq!(total_before, total_after);
    for who in [w.alice, w.bob, w.carol] {
        let table = w.game.info(&who).current_table;
        assert_eq!(table, if who == w.carol { 1 } else { 2 });
    }
}

use std::path::Path;

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

/// Writes the game out and reads it back, the way every CLI invocation does.
fn reopen(game: Game, path: &Path) -> Game {
    game.save(path).unwrap();
    let loaded = Game::load(path).unwrap();
    assert_eq!(loaded, game);
    loaded
}

fn native_supply(game: &Game) -> u128 {
    game.ledger().accounts.values().map(|b| b.native).sum()
}

#[test]
fn ladder_climbs_to_the_top_across_reloads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("table-ladder.state.json");

    let (root, charity) = (addr("root"), addr("charity"));
    let (alice, bob) = (addr("alice"), addr("bob"));
    let mut game = Game::new(GameConfig::new(root, charity, addr("busd"), addr("game"))).unwrap();
    game = reopen(game, &path);

    for who in [alice, bob] {
        game.mint(who, Asset::Native, 1_000 * UNIT).unwrap();
        game = reopen(game, &path);
        game.mint(who, Asset::Stable, 100 * UNIT).unwrap();
        game = reopen(game, &path);
        game.approve(who, game.verification_cost());
        game = reopen(game, &path);
        game.verify(who).unwrap();
        game = reopen(game, &path);
    }
    let minted = native_supply(&game);
    assert_eq!(minted, 2_000 * UNIT);

    // alice enters table 1 with a plain transfer, then buys the rest
    game.send(alice, units("0.1")).unwrap();
    game = reopen(game, &path);
    for table in 2..=11 {
        let threshold = game.get_table_threshold(table).unwrap();
        game.buy(alice, Address::ZERO, threshold).unwrap();
        game = reopen(game, &path);
        assert_eq!(game.info(&alice).current_table, table);
    }
    assert_eq!(game.info(&alice).referrer, Some(root));

    // bob climbs under alice
    for table in 1..=10 {
        let threshold = game.get_table_threshold(table).unwrap();
        game.buy(bob, alice, threshold).unwrap();
        game = reopen(game, &path);
    }
    let last_events = game.buy(bob, alice, units("102.4")).unwrap().events;
    game = reopen(game, &path);
    assert_eq!(game.info(&bob).current_table, 11);
    assert_eq!(game.info(&bob).referrer, Some(alice));
    assert!(game.info(&alice).has_received_donation_bonus);

    assert_eq!(
        last_events,
        vec![
            GameEvent::ReferralRewardSent { to: alice, value: units("25.6"), table: 11 },
            GameEvent::DonationRewardSent { to: root, value: units("8.192"), table: 11 },
            GameEvent::CharitySent { to: charity, value: units("10.24"), table: 11 },
            GameEvent::InvestmentReceived { user: bob, value: units("102.4"), table: 11 },
        ]
    );

    for (table, threshold) in [(9, "25.6"), (10, "51.2"), (11, "102.4")] {
        assert_eq!(game.get_table_threshold(table).unwrap(), units(threshold));
        assert_eq!(game.get_table_addresses_count(table).unwrap(), 3);
        let info = game.info_table(table, &bob).unwrap();
        assert!(info.entered);
        assert_eq!(info.position, Some(2));
    }
    let top = game.info_table(11, &alice).unwrap();
    assert_eq!(top.position, Some(1));
    assert_eq!(top.referral_earned, units("25.6"));

    // 2 verifications + 11 alice entries + 11 bob entries
    assert_eq!(game.receipts().len(), 24);
    assert_eq!(game.ledger().meta.height, 24);
    assert_eq!(native_supply(&game), minted);

    let err = game.buy(alice, root, units("204.8")).unwrap_err();
    assert!(matches!(err, GameError::AllTablesCompleted));
    assert_eq!(Game::load(&path).unwrap(), game);
}

#[test]
fn state_file_keeps_large_amounts_as_strings() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let who = addr("whale");
    let mut game =
        Game::new(GameConfig::new(addr("root"), addr("charity"), addr("busd"), addr("game"))).unwrap();
    game.mint(who, Asset::Native, 1_000_000 * UNIT).unwrap();
    game.save(&path).unwrap();

    let raw: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    let balance = &raw["ledger"]["accounts"][who.to_string()]["native"];
    assert_eq!(balance, "1000000000000000000000000");
    assert_eq!(
        raw["ledger"]["events"][0],
        serde_json::json!({
            "type": "mint",
            "to": who.to_string(),
            "asset": "native",
            "amount": "1000000000000000000000000",
        })
    );
    assert_eq!(
        Game::load(&path).unwrap().ledger().native_balance(&who),
        1_000_000 * UNIT
    );
}

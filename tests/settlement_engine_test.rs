use chrono::NaiveDate;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tempfile::TempDir;
use tradebook::db::init_db;
use tradebook::domain::{CloseTrade, Decimal, LotEventKind, NewTrade, OwnerId, Symbol, TradeCategory};
use tradebook::orchestration::{EquityPositionLedger, SettlementEngine, SettlementError, StatsAggregator};
use tradebook::{Repository, Trade};

struct Harness {
    repo: Arc<Repository>,
    engine: SettlementEngine,
    ledger: EquityPositionLedger,
    _temp: TempDir,
}

async fn setup() -> Harness {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path, 4).await.expect("init_db failed");
    let repo = Arc::new(Repository::new(pool));
    let ledger = EquityPositionLedger::new(repo.clone());
    let engine = SettlementEngine::new(repo.clone(), ledger.clone(), StatsAggregator::new());

    Harness {
        repo,
        engine,
        ledger,
        _temp: temp_dir,
    }
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn owner() -> OwnerId {
    OwnerId("owner-1".to_string())
}

fn aapl() -> Symbol {
    Symbol("AAPL".to_string())
}

async fn open_option(
    h: &Harness,
    category: TradeCategory,
    strike: rust_decimal::Decimal,
    premium: rust_decimal::Decimal,
    quantity: i64,
) -> Trade {
    h.repo
        .insert_trade(&NewTrade {
            owner_id: owner(),
            symbol: aapl(),
            category,
            strike_price: Some(strike.into()),
            premium: Some(premium.into()),
            quantity,
            open_date: date("2024-01-02"),
            expiration_date: Some(date("2024-01-19")),
        })
        .await
        .unwrap()
}

fn close(price: rust_decimal::Decimal, on: &str, assigned: bool) -> CloseTrade {
    CloseTrade {
        close_price: price.into(),
        close_date: date(on),
        was_assigned: assigned,
    }
}

#[tokio::test]
async fn covered_call_closed_without_assignment() {
    let h = setup().await;
    let trade = open_option(&h, TradeCategory::CoveredCall, dec!(180.00), dec!(2.50), 1).await;

    let closed = h
        .engine
        .close_trade(trade.id, close(dec!(1.00), "2024-01-10", false))
        .await
        .unwrap();

    assert_eq!(closed.realized_pnl, Some(Decimal::new(dec!(150))));
    assert_eq!(closed.is_win, Some(true));
    assert_eq!(closed.return_percentage, Some(Decimal::new(dec!(60))));
    assert_eq!(closed.close_date, Some(date("2024-01-10")));
    assert!(!closed.was_assigned);
    assert_eq!(closed.shares_assigned, None);
    assert_eq!(closed.linked_position_id, None);

    let stats = h.repo.get_user_stats(&owner()).await.unwrap().unwrap();
    assert_eq!(stats.trade_count, 1);
    assert_eq!(stats.win_count, 1);
    assert_eq!(stats.total_profit_loss, Decimal::new(dec!(150)));
}

#[tokio::test]
async fn covered_call_assignment_delivers_shares() {
    let h = setup().await;
    let (position, _) = h
        .ledger
        .record_manual_lot(&owner(), &aapl(), 300, dec!(175.50).into())
        .await
        .unwrap();
    let trade = open_option(&h, TradeCategory::CoveredCall, dec!(180.00), dec!(2.50), 1).await;

    let closed = h
        .engine
        .close_trade(trade.id, close(dec!(181.00), "2024-01-19", true))
        .await
        .unwrap();

    assert_eq!(closed.realized_pnl, Some(Decimal::new(dec!(700))));
    assert_eq!(closed.shares_assigned, Some(-100));
    assert_eq!(closed.assignment_price, Some(Decimal::new(dec!(180))));
    assert_eq!(closed.linked_position_id, Some(position.id));

    let after = h.repo.get_position(&owner(), &aapl()).await.unwrap().unwrap();
    assert_eq!(after.quantity, 200);
    assert_eq!(after.average_cost, Decimal::new(dec!(175.50)));

    let history = h.repo.list_lot_events(after.id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].kind, LotEventKind::CalledAway);
    assert_eq!(history[1].quantity_delta, -100);
    assert_eq!(history[1].trade_id, Some(trade.id));
}

#[tokio::test]
async fn cash_secured_put_assignment_creates_position() {
    let h = setup().await;
    let trade = open_option(&h, TradeCategory::CashSecuredPut, dec!(150), dec!(2.00), 1).await;

    let closed = h
        .engine
        .close_trade(trade.id, close(dec!(145), "2024-01-19", true))
        .await
        .unwrap();

    // 200 premium + (145 - 150) * 100
    assert_eq!(closed.realized_pnl, Some(Decimal::new(dec!(-300))));
    assert_eq!(closed.is_win, Some(false));
    assert_eq!(closed.shares_assigned, Some(100));

    let position = h.repo.get_position(&owner(), &aapl()).await.unwrap().unwrap();
    assert_eq!(position.quantity, 100);
    assert_eq!(position.average_cost, Decimal::new(dec!(150)));
    assert_eq!(closed.linked_position_id, Some(position.id));
}

#[tokio::test]
async fn second_close_is_rejected_without_changes() {
    let h = setup().await;
    let trade = open_option(&h, TradeCategory::NakedPut, dec!(150), dec!(3.20), 2).await;

    let first = h
        .engine
        .close_trade(trade.id, close(dec!(1.20), "2024-01-12", false))
        .await
        .unwrap();
    let err = h
        .engine
        .close_trade(trade.id, close(dec!(0.10), "2024-01-15", false))
        .await
        .unwrap_err();
    assert!(matches!(err, SettlementError::AlreadyClosed(id) if id == trade.id));

    let stored = h.repo.get_trade(trade.id).await.unwrap().unwrap();
    assert_eq!(stored, first);
    let stats = h.repo.get_user_stats(&owner()).await.unwrap().unwrap();
    assert_eq!(stats.trade_count, 1);
}

#[tokio::test]
async fn unknown_trade_is_not_found() {
    let h = setup().await;
    let err = h
        .engine
        .close_trade(tradebook::TradeId(999), close(dec!(1), "2024-01-10", false))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "not_found");
}

#[tokio::test]
async fn close_window_bounds_are_inclusive() {
    let h = setup().await;
    let on_open = open_option(&h, TradeCategory::LongCall, dec!(100), dec!(1), 1).await;
    let on_expiry = open_option(&h, TradeCategory::LongCall, dec!(100), dec!(1), 1).await;
    let late = open_option(&h, TradeCategory::LongCall, dec!(100), dec!(1), 1).await;
    let early = open_option(&h, TradeCategory::LongCall, dec!(100), dec!(1), 1).await;

    h.engine
        .close_trade(on_open.id, close(dec!(2), "2024-01-02", false))
        .await
        .unwrap();
    h.engine
        .close_trade(on_expiry.id, close(dec!(2), "2024-01-19", false))
        .await
        .unwrap();

    let err = h
        .engine
        .close_trade(late.id, close(dec!(2), "2024-01-20", false))
        .await
        .unwrap_err();
    assert!(matches!(err, SettlementError::InvalidCloseWindow { .. }));
    let err = h
        .engine
        .close_trade(early.id, close(dec!(2), "2024-01-01", false))
        .await
        .unwrap_err();
    assert!(matches!(err, SettlementError::InvalidCloseWindow { .. }));

    assert!(!h.repo.get_trade(late.id).await.unwrap().unwrap().is_closed());
    assert!(!h.repo.get_trade(early.id).await.unwrap().unwrap().is_closed());
}

#[tokio::test]
async fn naked_assignment_is_unsupported() {
    let h = setup().await;
    let trade = open_option(&h, TradeCategory::NakedCall, dec!(200), dec!(4), 1).await;

    let err = h
        .engine
        .close_trade(trade.id, close(dec!(210), "2024-01-19", true))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SettlementError::UnsupportedAssignment(TradeCategory::NakedCall)
    ));
    assert!(!h.repo.get_trade(trade.id).await.unwrap().unwrap().is_closed());
}

#[tokio::test]
async fn insufficient_shares_rolls_back_the_close() {
    let h = setup().await;
    h.ledger
        .record_manual_lot(&owner(), &aapl(), 50, dec!(170).into())
        .await
        .unwrap();
    let trade = open_option(&h, TradeCategory::CoveredCall, dec!(180), dec!(2.50), 1).await;

    let err = h
        .engine
        .close_trade(trade.id, close(dec!(181), "2024-01-19", true))
        .await
        .unwrap_err();
    match err {
        SettlementError::InsufficientShares {
            symbol,
            held,
            required,
        } => {
            assert_eq!(symbol, aapl());
            assert_eq!(held, 50);
            assert_eq!(required, 100);
        }
        other => panic!("Expected InsufficientShares, got {:?}", other),
    }

    // The claim ran inside the rolled-back unit, so the trade is still open.
    let stored = h.repo.get_trade(trade.id).await.unwrap().unwrap();
    assert!(!stored.is_closed());
    assert_eq!(stored.realized_pnl, None);

    let position = h.repo.get_position(&owner(), &aapl()).await.unwrap().unwrap();
    assert_eq!(position.quantity, 50);
    assert_eq!(h.repo.list_lot_events(position.id).await.unwrap().len(), 1);
    assert!(h.repo.get_user_stats(&owner()).await.unwrap().is_none());
}

#[tokio::test]
async fn stats_match_closed_trades() {
    let h = setup().await;
    let win = open_option(&h, TradeCategory::CoveredCall, dec!(180), dec!(2.50), 1).await;
    let loss = open_option(&h, TradeCategory::LongPut, dec!(100), dec!(3), 2).await;
    open_option(&h, TradeCategory::LongCall, dec!(100), dec!(1), 1).await;

    h.engine
        .close_trade(win.id, close(dec!(1.00), "2024-01-10", false))
        .await
        .unwrap();
    h.engine
        .close_trade(loss.id, close(dec!(1.50), "2024-01-11", false))
        .await
        .unwrap();

    // 150 + (1.50 - 3) * 200
    let stats = h.repo.get_user_stats(&owner()).await.unwrap().unwrap();
    assert_eq!(stats.trade_count, 2);
    assert_eq!(stats.win_count, 1);
    assert_eq!(stats.total_profit_loss, Decimal::new(dec!(-150)));
    assert_eq!(stats.average_return, Decimal::new(dec!(-75)));

    let trades = h.repo.list_trades(&owner()).await.unwrap();
    let closed_sum = trades
        .iter()
        .filter_map(|t| t.realized_pnl)
        .fold(Decimal::zero(), |acc, pnl| acc + pnl);
    assert_eq!(closed_sum, stats.total_profit_loss);
}

#[tokio::test]
async fn equity_trade_uses_share_multiplier() {
    let h = setup().await;
    let trade = h
        .repo
        .insert_trade(&NewTrade {
            owner_id: owner(),
            symbol: aapl(),
            category: TradeCategory::Equity,
            strike_price: None,
            premium: Some(dec!(100).into()),
            quantity: 10,
            open_date: date("2024-01-02"),
            expiration_date: None,
        })
        .await
        .unwrap();

    let err = h
        .engine
        .close_trade(trade.id, close(dec!(110), "2024-03-01", true))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "unsupported_assignment");

    let closed = h
        .engine
        .close_trade(trade.id, close(dec!(110), "2024-03-01", false))
        .await
        .unwrap();
    assert_eq!(closed.realized_pnl, Some(Decimal::new(dec!(100))));
    assert_eq!(closed.return_percentage, Some(Decimal::new(dec!(10))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_closes_settle_once() {
    let h = setup().await;
    let trade = open_option(&h, TradeCategory::CashSecuredPut, dec!(150), dec!(2.00), 1).await;

    let id = trade.id;
    let a = h.engine.clone();
    let b = h.engine.clone();
    let (ra, rb) = futures::join!(
        tokio::spawn(async move { a.close_trade(id, close(dec!(145), "2024-01-19", true)).await }),
        tokio::spawn(async move { b.close_trade(id, close(dec!(145), "2024-01-19", true)).await }),
    );
    let results = [ra.unwrap(), rb.unwrap()];

    let ok = results.iter().filter(|r| r.is_ok()).count();
    let already_closed = results
        .iter()
        .filter(|r| matches!(r, Err(SettlementError::AlreadyClosed(_))))
        .count();
    assert_eq!(ok, 1);
    assert_eq!(already_closed, 1);

    let position = h.repo.get_position(&owner(), &aapl()).await.unwrap().unwrap();
    assert_eq!(position.quantity, 100);
    assert_eq!(h.repo.list_lot_events(position.id).await.unwrap().len(), 1);
    let stats = h.repo.get_user_stats(&owner()).await.unwrap().unwrap();
    assert_eq!(stats.trade_count, 1);
}

#[tokio::test]
async fn oversized_amounts_fail_validation_and_leave_trade_open() {
    let h = setup().await;
    let trade = h
        .repo
        .insert_trade(&NewTrade {
            owner_id: owner(),
            symbol: aapl(),
            category: TradeCategory::NakedCall,
            strike_price: Some(dec!(100).into()),
            premium: Some(Decimal::from_str_scientific("1e20").unwrap()),
            quantity: 1_000_000_000_000_000,
            open_date: date("2024-01-02"),
            expiration_date: Some(date("2024-01-19")),
        })
        .await
        .unwrap();

    let engine = h.engine.clone();
    let id = trade.id;
    let result = tokio::spawn(async move {
        engine
            .close_trade(id, close(dec!(1), "2024-01-10", false))
            .await
    })
    .await
    .expect("settlement task must not panic");

    let err = result.unwrap_err();
    assert_eq!(err.kind(), "validation_error");
    assert!(!h.repo.get_trade(trade.id).await.unwrap().unwrap().is_closed());
    assert!(h.repo.get_user_stats(&owner()).await.unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_assignments_on_one_position_serialize() {
    let h = setup().await;
    h.ledger
        .record_manual_lot(&owner(), &aapl(), 100, dec!(175.50).into())
        .await
        .unwrap();
    let first = open_option(&h, TradeCategory::CoveredCall, dec!(180.00), dec!(2.50), 1).await;
    let second = open_option(&h, TradeCategory::CoveredCall, dec!(180.00), dec!(2.50), 1).await;

    let a = h.engine.clone();
    let b = h.engine.clone();
    let (first_id, second_id) = (first.id, second.id);
    let (ra, rb) = futures::join!(
        tokio::spawn(async move { a.close_trade(first_id, close(dec!(181), "2024-01-19", true)).await }),
        tokio::spawn(async move { b.close_trade(second_id, close(dec!(181), "2024-01-19", true)).await }),
    );
    let results = [ra.unwrap(), rb.unwrap()];

    let settled: Vec<&Trade> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(settled.len(), 1);
    assert_eq!(settled[0].realized_pnl, Some(Decimal::new(dec!(700))));
    let short = results
        .iter()
        .filter(|r| matches!(r, Err(SettlementError::InsufficientShares { held: 0, required: 100, .. })))
        .count();
    assert_eq!(short, 1);

    let position = h.repo.get_position(&owner(), &aapl()).await.unwrap().unwrap();
    assert_eq!(position.quantity, 0);
    let history = h.repo.list_lot_events(position.id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].kind, LotEventKind::ManualEntry);
    assert_eq!(history[1].kind, LotEventKind::CalledAway);
    assert_eq!(history[1].trade_id, Some(settled[0].id));

    let stats = h.repo.get_user_stats(&owner()).await.unwrap().unwrap();
    assert_eq!(stats.trade_count, 1);
}

use chrono::{DateTime, Duration, TimeZone, Utc};
use diesel::prelude::*;
use std::sync::Arc;

use circlepoints_core::errors::{Error, ValidationError};
use circlepoints_core::points::{
    LedgerReader, LedgerWriter, NewPointEvent, PointEventKind, PointEventReason, PointsWindow,
};

use super::LedgerRepository;
use crate::db::get_connection;
use crate::schema::{point_balances, point_events};
use crate::test_support::{test_db, TestDb};

fn at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, day, 10, 0, 0).unwrap()
}

fn repo(db: &TestDb) -> LedgerRepository {
    LedgerRepository::new(Arc::clone(&db.pool), db.writer.clone())
}

#[tokio::test]
async fn append_moves_balance_and_records_event() {
    let db = test_db();
    let ledger = repo(&db);

    let event = ledger
        .append(NewPointEvent::award("u1", "g1", 50, "admin", at(1)))
        .await
        .unwrap();
    assert_eq!(event.amount, 50);
    assert_eq!(event.kind, PointEventKind::Grant);
    assert_eq!(event.created_at, at(1));

    ledger
        .append(NewPointEvent::deduction("u1", "g1", 20, "admin", at(2)))
        .await
        .unwrap();

    assert_eq!(ledger.get_balance("u1", "g1").unwrap(), 30);
    assert_eq!(ledger.get_balance("u1", "other").unwrap(), 0);
    assert_eq!(ledger.get_balance("nobody", "g1").unwrap(), 0);

    let history = ledger.list_events("u1", "g1").unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].reason, PointEventReason::Deduction);
    assert_eq!(history[1].reason, PointEventReason::Award);
}

#[tokio::test]
async fn invalid_entries_write_nothing() {
    let db = test_db();
    let ledger = repo(&db);

    let err = ledger
        .append(NewPointEvent::award("u1", "g1", 0, "admin", at(1)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::NonPositive { .. })
    ));

    let mut conn = get_connection(&db.pool).unwrap();
    let events: i64 = point_events::table.count().get_result(&mut conn).unwrap();
    let balances: i64 = point_balances::table.count().get_result(&mut conn).unwrap();
    assert_eq!(events, 0);
    assert_eq!(balances, 0);
}

#[tokio::test]
async fn balance_matches_signed_event_sum() {
    let db = test_db();
    let ledger = repo(&db);

    let entries = [
        NewPointEvent::award("u1", "g1", 40, "admin", at(1)),
        NewPointEvent::award("u1", "g1", 15, "admin", at(2)),
        NewPointEvent::deduction("u1", "g1", 70, "admin", at(3)),
        NewPointEvent::award("u1", "g1", 5, "admin", at(4)),
    ];
    for entry in entries {
        ledger.append(entry).await.unwrap();
    }

    let signed: i64 = ledger
        .list_events("u1", "g1")
        .unwrap()
        .iter()
        .map(|e| e.signed_amount())
        .sum();
    // Deductions are not balance-checked, so the running total may dip below zero.
    assert_eq!(signed, -10);
    assert_eq!(ledger.get_balance("u1", "g1").unwrap(), signed);
}

#[tokio::test]
async fn sum_points_honours_window_and_own_bonus() {
    let db = test_db();
    let ledger = repo(&db);

    ledger
        .append(NewPointEvent::award("u1", "g1", 10, "admin", at(1)))
        .await
        .unwrap();
    ledger
        .append(NewPointEvent::award("u1", "g1", 20, "admin", at(5)))
        .await
        .unwrap();
    ledger
        .append(NewPointEvent::goal_bonus("goal-a", "u1", "g1", 7, "system", at(6)))
        .await
        .unwrap();
    ledger
        .append(NewPointEvent::award("u1", "g1", 40, "admin", at(10)))
        .await
        .unwrap();
    ledger
        .append(NewPointEvent::deduction("u1", "g1", 3, "admin", at(6)))
        .await
        .unwrap();

    let all = PointsWindow::all_time();
    assert_eq!(
        ledger.sum_points("u1", "g1", PointEventKind::Grant, &all).unwrap(),
        77
    );
    assert_eq!(
        ledger.sum_points("u1", "g1", PointEventKind::Spend, &all).unwrap(),
        3
    );

    // Both bounds are inclusive.
    let window = PointsWindow {
        since: Some(at(5)),
        until: Some(at(10)),
        exclude_bonus_of_goal: None,
    };
    assert_eq!(
        ledger.sum_points("u1", "g1", PointEventKind::Grant, &window).unwrap(),
        67
    );

    let own = PointsWindow {
        exclude_bonus_of_goal: Some("goal-a".into()),
        ..window.clone()
    };
    assert_eq!(
        ledger.sum_points("u1", "g1", PointEventKind::Grant, &own).unwrap(),
        60
    );

    let other = PointsWindow {
        exclude_bonus_of_goal: Some("goal-b".into()),
        ..window
    };
    assert_eq!(
        ledger.sum_points("u1", "g1", PointEventKind::Grant, &other).unwrap(),
        67
    );

    assert_eq!(
        ledger
            .sum_points("u2", "g1", PointEventKind::Grant, &PointsWindow::all_time())
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn grants_are_summed_per_user_since_cutoff() {
    let db = test_db();
    let ledger = repo(&db);

    for (user, amount, day) in [("u1", 10, 1), ("u1", 5, 8), ("u2", 30, 9), ("u3", 2, 2)] {
        ledger
            .append(NewPointEvent::award(user, "g1", amount, "admin", at(day)))
            .await
            .unwrap();
    }
    ledger
        .append(NewPointEvent::deduction("u2", "g1", 25, "admin", at(9)))
        .await
        .unwrap();
    ledger
        .append(NewPointEvent::award("u1", "g2", 100, "admin", at(9)))
        .await
        .unwrap();

    let sums = ledger.sum_grants_by_user("g1", at(9) - Duration::days(2)).unwrap();
    assert_eq!(sums.len(), 2);
    assert_eq!(sums.get("u1"), Some(&5));
    assert_eq!(sums.get("u2"), Some(&30));
    assert!(!sums.contains_key("u3"));
}

#[tokio::test]
async fn list_balances_covers_only_the_group() {
    let db = test_db();
    let ledger = repo(&db);

    ledger
        .append(NewPointEvent::award("u1", "g1", 10, "admin", at(1)))
        .await
        .unwrap();
    ledger
        .append(NewPointEvent::award("u2", "g1", 25, "admin", at(1)))
        .await
        .unwrap();
    ledger
        .append(NewPointEvent::award("u1", "g2", 99, "admin", at(1)))
        .await
        .unwrap();

    let balances = ledger.list_balances("g1").unwrap();
    let pairs: Vec<(&str, i64)> = balances
        .iter()
        .map(|b| (b.user_id.as_str(), b.points))
        .collect();
    assert_eq!(pairs, vec![("u2", 25), ("u1", 10)]);
}

//! Latest-selection-wins behavior of the role views
//!
//! Status reads are slowed per date on a paused clock, so the order in
//! which responses arrive is deterministic.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use uuid::Uuid;

use helpers::*;
use meal_planner::models::{Role, User};
use meal_planner::services::ServiceFactory;
use meal_planner::state::{CookView, EaterView, FetchOutcome};

const SLOW: Duration = Duration::from_millis(200);
const FAST: Duration = Duration::from_millis(10);

/// Alice cooks for Bob; Bob needs breakfast and dinner on the 1st and lunch on the 2nd
async fn household(delays: Vec<(chrono::NaiveDate, Duration)>) -> (TestContext, ServiceFactory, Uuid, User) {
    let ctx = TestContext::with_statuses(|store| SlowStatusStorage::new(store, delays));
    let services = ctx.device();
    let alice = ctx.add_user("Alice", Role::Cook).await;
    let bob = ctx.add_user("Bob", Role::Eater).await;

    let group = services.groups.create_group("Home", &alice.uid, Role::Cook).await.unwrap();
    services.groups.join_group(&group.code, &bob.uid, Role::Eater).await.unwrap();
    let bob = ctx.reload(&bob).await;

    services.meal_status.declare(&bob, june(1), breakfast_and_dinner()).await.unwrap();
    services.meal_status.declare(&bob, june(2), lunch_only()).await.unwrap();

    (ctx, services, group.id, bob)
}

#[tokio::test(start_paused = true)]
async fn test_late_roster_for_earlier_date_is_discarded() {
    let (_ctx, services, group_id, _bob) = household(vec![(june(1), SLOW), (june(2), FAST)]).await;
    let view = CookView::new(services.roster.clone(), group_id);

    let (first, second) = tokio::join!(view.select_date(june(1)), view.select_date(june(2)));

    assert_matches!(first, Ok(FetchOutcome::Discarded));
    assert!(second.unwrap().is_applied());
    let (date, roster) = view.displayed().unwrap();
    assert_eq!(date, june(2));
    assert_eq!(roster[0].status.selection(), lunch_only());
}

#[tokio::test(start_paused = true)]
async fn test_superseded_roster_is_discarded_even_when_it_arrives_first() {
    let (_ctx, services, group_id, _bob) = household(vec![(june(1), FAST), (june(2), SLOW)]).await;
    let view = CookView::new(services.roster.clone(), group_id);

    let (first, second) = tokio::join!(view.select_date(june(1)), view.select_date(june(2)));

    assert_matches!(first, Ok(FetchOutcome::Discarded));
    assert!(second.unwrap().is_applied());
    assert_eq!(view.displayed().map(|(date, _)| date), Some(june(2)));
}

#[tokio::test(start_paused = true)]
async fn test_closed_view_ignores_in_flight_roster() {
    let (_ctx, services, group_id, _bob) = household(vec![(june(1), SLOW)]).await;
    let view = Arc::new(CookView::new(services.roster.clone(), group_id));

    let task = {
        let view = view.clone();
        tokio::spawn(async move { view.select_date(june(1)).await })
    };
    tokio::time::sleep(FAST).await;
    view.close();

    let outcome = task.await.unwrap();
    assert_matches!(outcome, Ok(FetchOutcome::Discarded));
    assert_eq!(view.displayed(), None);
}

#[tokio::test(start_paused = true)]
async fn test_eater_sees_only_latest_date() {
    let (_ctx, services, _group_id, bob) = household(vec![(june(1), SLOW), (june(2), FAST)]).await;
    let view = EaterView::new(services.meal_status.clone(), bob);

    let (first, second) = tokio::join!(view.select_date(june(1)), view.select_date(june(2)));

    assert_matches!(first, Ok(FetchOutcome::Discarded));
    assert_eq!(second.unwrap(), FetchOutcome::Applied(lunch_only()));
    assert_eq!(view.displayed(), Some((june(2), lunch_only())));
}

#[tokio::test(start_paused = true)]
async fn test_save_supersedes_pending_load() {
    let (_ctx, services, _group_id, bob) = household(vec![(june(1), SLOW)]).await;
    let view = EaterView::new(services.meal_status.clone(), bob.clone());

    let (loaded, saved) = tokio::join!(view.select_date(june(1)), async {
        tokio::time::sleep(FAST).await;
        view.save(lunch_only()).await
    });

    assert_matches!(loaded, Ok(FetchOutcome::Discarded));
    assert_eq!(saved.unwrap().selection(), lunch_only());
    assert_eq!(view.displayed(), Some((june(1), lunch_only())));

    let stored = services.meal_status.get_status(&bob.uid, june(1)).await.unwrap();
    assert_eq!(stored.selection(), lunch_only());
}

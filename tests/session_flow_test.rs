//! End-to-end session flows: sign-up, group onboarding, role views

mod helpers;

use assert_matches::assert_matches;

use helpers::*;
use meal_planner::models::{MealSelection, Role};
use meal_planner::state::{FetchOutcome, RoleView, SessionState};
use meal_planner::MealPlannerError;

#[tokio::test]
async fn test_cook_and_eaters_share_a_roster() {
    let ctx = TestContext::new();
    let alice_email = unique_email();

    // Alice registers as a cook and creates the group
    let (_alice_device, mut alice) = ctx.session();
    let state = alice.sign_up(sign_up_request(&alice_email, Role::Cook, "Alice")).await.unwrap();
    assert_matches!(state, SessionState::NeedsGroup { .. });

    let group = alice.create_group("Home").await.unwrap();
    assert_matches!(alice.state(), SessionState::InGroup { view: RoleView::Cook, .. });

    // Bob joins as an eater with a sloppily typed code
    let (_bob_device, mut bob) = ctx.session();
    bob.sign_up(sign_up_request(&unique_email(), Role::Eater, "Bob")).await.unwrap();
    let typed_code = format!("  {} ", group.code.to_lowercase());
    let joined = bob.join_group(&typed_code).await.unwrap();
    assert_eq!(joined.id, group.id);
    assert_matches!(bob.state(), SessionState::InGroup { view: RoleView::Eater, .. });

    let bob_view = bob.eater_view().unwrap();
    let loaded = bob_view.select_date(june(1)).await.unwrap();
    assert_eq!(loaded, FetchOutcome::Applied(MealSelection::default()));
    bob_view.save(breakfast_and_dinner()).await.unwrap();
    assert_eq!(bob_view.displayed(), Some((june(1), breakfast_and_dinner())));

    let alice_view = alice.cook_view().unwrap();
    let roster = alice_view.select_date(june(1)).await.unwrap().applied().unwrap();
    assert_eq!(roster.len(), 1);
    assert_eq!(roster[0].user.display_name.as_deref(), Some("Bob"));
    assert_eq!(roster[0].status.selection(), breakfast_and_dinner());

    // Carol joins later without declaring anything
    let (_carol_device, mut carol) = ctx.session();
    carol.sign_up(sign_up_request(&unique_email(), Role::Eater, "Carol")).await.unwrap();
    carol.join_group(&group.code).await.unwrap();

    let roster = alice_view.select_date(june(1)).await.unwrap().applied().unwrap();
    let names: Vec<&str> = roster.iter().map(|entry| entry.user.label()).collect();
    assert_eq!(names, vec!["Bob", "Carol"]);
    assert_eq!(roster[1].status.selection(), MealSelection::default());

    // Signing back in lands straight in the group view
    alice.sign_out().await.unwrap();
    assert_eq!(alice.state(), &SessionState::Unauthenticated);
    let state = alice.sign_in(&alice_email, TEST_PASSWORD).await.unwrap();
    assert_matches!(state, SessionState::InGroup { group: g, view: RoleView::Cook, .. } if g.id == group.id);
}

#[tokio::test]
async fn test_wrong_code_keeps_user_waiting_for_group() {
    let ctx = TestContext::new();
    let (_device, mut bob) = ctx.session();
    bob.sign_up(sign_up_request(&unique_email(), Role::Eater, &random_name())).await.unwrap();

    assert_matches!(bob.join_group("NOPE00").await, Err(MealPlannerError::GroupNotFound { .. }));
    assert_matches!(bob.state(), SessionState::NeedsGroup { .. });
    assert_matches!(bob.eater_view(), Err(MealPlannerError::InvalidStateTransition { .. }));
}

#[tokio::test]
async fn test_transitions_outside_onboarding_are_rejected() {
    let ctx = TestContext::new();
    let (_device, mut session) = ctx.session();

    assert_matches!(session.join_group("ABCDEF").await, Err(MealPlannerError::Authorization(_)));
    assert_matches!(session.create_group("Home").await, Err(MealPlannerError::Authorization(_)));

    session.sign_up(sign_up_request(&unique_email(), Role::Cook, "Alice")).await.unwrap();
    session.create_group("Home").await.unwrap();

    assert_matches!(
        session.create_group("Second").await,
        Err(MealPlannerError::InvalidStateTransition { from, .. }) if from == "in_group"
    );
    assert_matches!(session.eater_view(), Err(MealPlannerError::InvalidStateTransition { .. }));
    assert!(session.cook_view().is_ok());
}

#[tokio::test]
async fn test_router_maps_users_to_states() {
    let ctx = TestContext::new();
    let (services, session) = ctx.session();
    let router = session.router();

    assert_eq!(router.route(None).await.unwrap(), SessionState::Unauthenticated);

    let alice = ctx.add_user("Alice", Role::Cook).await;
    assert_matches!(router.route(Some(alice.clone())).await.unwrap(), SessionState::NeedsGroup { .. });

    let group = services.groups.create_group("Home", &alice.uid, Role::Cook).await.unwrap();
    let alice = ctx.reload(&alice).await;
    assert_matches!(
        router.route(Some(alice)).await.unwrap(),
        SessionState::InGroup { group: g, view: RoleView::Cook, .. } if g == group
    );
}

#[tokio::test]
async fn test_session_follows_auth_changes() {
    let ctx = TestContext::new();
    let (services, mut session) = ctx.session();
    let mut changes = services.identity.subscribe();

    services
        .identity
        .sign_up(sign_up_request(&unique_email(), Role::Eater, "Bob"))
        .await
        .unwrap();
    assert!(session.follow(&mut changes).await.unwrap());
    assert_matches!(session.state(), SessionState::NeedsGroup { .. });

    services.identity.sign_out().await.unwrap();
    assert!(session.follow(&mut changes).await.unwrap());
    assert_eq!(session.state(), &SessionState::Unauthenticated);
}

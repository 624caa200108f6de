//! End-to-end routing behavior: auth gate dominance, short-circuiting,
//! deferred-intent handling, and classification defaults.

mod common;

use common::{harness, turn};
use gugu::domain::models::conversation::{Intent, RoutingPhase, SessionStatus};
use gugu::domain::ports::session_store::SessionStore;

#[tokio::test]
async fn test_auth_gate_dominates_fresh_classification() {
    let h = harness();
    h.generation.set_label("municipal");

    let result = h
        .router
        .route_turn(turn("s1", "water pipe burst on Main Street", SessionStatus::None))
        .await;

    // The citizen is routed to auth regardless of what they asked for...
    assert_eq!(result.agent_name, "auth");

    // ...but the underlying request is preserved for replay.
    let state = h.store.load("s1").await.unwrap().unwrap();
    assert_eq!(state.intent, Some(Intent::Auth));
    assert_eq!(state.pending_intent, Some(Intent::Municipal));
}

#[tokio::test]
async fn test_auth_gate_fires_for_every_unauthenticated_status() {
    for status in [
        SessionStatus::None,
        SessionStatus::Expired,
        SessionStatus::OtpPending,
    ] {
        let h = harness();
        h.generation.set_label("gbv");
        let result = h
            .router
            .route_turn(turn("s1", "I need to talk to someone about my home", status))
            .await;
        assert_eq!(result.agent_name, "auth", "status {status:?} must gate");
    }
}

#[tokio::test]
async fn test_owning_specialist_short_circuits_classification() {
    let h = harness();
    h.generation.set_label("municipal");
    h.generation.push_reply(Ok(serde_json::json!({
        "message": "What is the location of the problem?",
        "requires_followup": true
    })
    .to_string()));

    // First turn commits the municipal specialist.
    h.router
        .route_turn(turn("s1", "my electricity has been off since Monday morning", SessionStatus::Active))
        .await;
    assert_eq!(h.generation.classification_calls(), 1);

    let state = h.store.load("s1").await.unwrap().unwrap();
    assert_eq!(state.routing_phase, RoutingPhase::Municipal);

    // Second turn: a bare "yes" would misclassify, so it must not be classified.
    let result = h
        .router
        .route_turn(turn("s1", "yes, still broken", SessionStatus::Active))
        .await;

    assert_eq!(result.agent_name, "municipal");
    assert_eq!(
        h.generation.classification_calls(),
        1,
        "short-circuited turn must not call the classifier"
    );
}

#[tokio::test]
async fn test_short_circuit_precedes_auth_gate() {
    let h = harness();
    h.generation.push_reply(Ok(serde_json::json!({
        "message": "Please type the 6-digit code you received.",
        "requires_followup": true
    })
    .to_string()));

    // Auth flow in progress (OTP pending), phase already owned by auth.
    h.router
        .route_turn(turn("s1", "please register me for municipal reports", SessionStatus::None))
        .await;
    let calls_after_first = h.generation.classification_calls();

    // Mid-flow turn: the owning specialist keeps it without reclassification.
    let result = h
        .router
        .route_turn(turn("s1", "123456", SessionStatus::OtpPending))
        .await;

    assert_eq!(result.agent_name, "auth");
    assert_eq!(h.generation.classification_calls(), calls_after_first);
}

#[tokio::test]
async fn test_pending_intent_is_never_overwritten() {
    let h = harness();

    // Auth handler keeps asking for the OTP but releases phase ownership so
    // the gate logic (not the short-circuit) is exercised each turn.
    for _ in 0..2 {
        h.generation.push_reply(Ok(serde_json::json!({
            "message": "Please share the 6-digit code when you have it.",
            "requires_followup": false
        })
        .to_string()));
    }

    h.generation.set_label("ticket_status");
    h.router
        .route_turn(turn("s1", "how far is my water complaint", SessionStatus::None))
        .await;

    // The classifier now suggests something different; the slot must hold.
    h.generation.set_label("gbv");
    h.router
        .route_turn(turn("s1", "never mind, different question entirely now", SessionStatus::Expired))
        .await;

    let state = h.store.load("s1").await.unwrap().unwrap();
    assert_eq!(state.pending_intent, Some(Intent::TicketStatus));
}

#[tokio::test]
async fn test_pending_intent_is_consumed_after_authentication() {
    let h = harness();
    h.generation.push_reply(Ok(serde_json::json!({
        "message": "You are verified, welcome back.",
        "action_taken": "authenticated",
        "requires_followup": false
    })
    .to_string()));

    h.generation.set_label("municipal");
    h.router
        .route_turn(turn("s1", "the robots at the corner are out again", SessionStatus::None))
        .await;
    let state = h.store.load("s1").await.unwrap().unwrap();
    assert_eq!(state.pending_intent, Some(Intent::Municipal));

    // Replay turn after the auth collaborator flipped the session active.
    h.router
        .route_turn(turn("s1", "the robots at the corner are out again", SessionStatus::Active))
        .await;

    let state = h.store.load("s1").await.unwrap().unwrap();
    assert_eq!(state.pending_intent, None, "deferred intent must be consumed");
    assert_eq!(state.intent, Some(Intent::Municipal));
}

#[tokio::test]
async fn test_adversarial_police_message_routes_to_gbv_without_generation() {
    let h = harness();
    // A wrong label is staged; it must never be asked for.
    h.generation.set_label("ticket_status");

    let result = h
        .router
        .route_turn(turn(
            "s1",
            "the detective assigned to my case never called back",
            SessionStatus::Active,
        ))
        .await;

    assert_eq!(result.agent_name, "gbv");
    assert_eq!(
        h.generation.classification_calls(),
        0,
        "pre-filter must bypass the model entirely"
    );
}

#[tokio::test]
async fn test_unrecognized_label_defaults_to_municipal() {
    let h = harness();
    h.generation.set_label("UNKNOWN_CATEGORY");

    let result = h
        .router
        .route_turn(turn("s1", "good afternoon, I have a question", SessionStatus::Active))
        .await;

    assert_eq!(result.agent_name, "municipal");
}

#[tokio::test]
async fn test_completed_specialist_releases_ownership() {
    let h = harness();
    h.generation.set_label("municipal");
    h.generation.push_reply(Ok(serde_json::json!({
        "message": "Done, your reference is on its way by SMS.",
        "action_taken": "ticket_created",
        "requires_followup": false
    })
    .to_string()));

    h.router
        .route_turn(turn("s1", "please log a pothole on Kerk Street", SessionStatus::Active))
        .await;

    let state = h.store.load("s1").await.unwrap().unwrap();
    assert_eq!(state.routing_phase, RoutingPhase::Manager);
}

#[tokio::test]
async fn test_route_turn_survives_total_generation_failure() {
    let h = harness();
    h.generation.set_label("municipal");
    h.generation.push_failures(3);

    let result = h
        .router
        .route_turn(turn("s1", "my refuse was not collected this week", SessionStatus::Active))
        .await;

    assert!(!result.message.is_empty());
    assert!(result.is_error());
    assert_eq!(result.agent_name, "municipal");
}

#[tokio::test]
async fn test_language_is_updated_from_clear_signal() {
    let h = harness();
    h.generation.set_label("municipal");

    h.router
        .route_turn(turn(
            "s1",
            "Sawubona, ngicela usizo ngamanzi ami avuzayo endlini yami eThekwini namhlanje",
            SessionStatus::Active,
        ))
        .await;

    let state = h.store.load("s1").await.unwrap().unwrap();
    assert_eq!(state.language.as_tag(), "zu");
}

#[tokio::test]
async fn test_short_message_keeps_session_language() {
    let h = harness();
    h.generation.set_label("municipal");
    h.generation.push_reply(Ok(serde_json::json!({
        "message": "Dankie, ek het dit aangeteken vir jou.",
        "requires_followup": true
    })
    .to_string()));

    // Establish Afrikaans with a clear first message.
    h.router
        .route_turn(turn(
            "s1",
            "Goeie more, daar is 'n waterpyp wat gebars het in ons straat naby die skool",
            SessionStatus::Active,
        ))
        .await;

    // "ja" is far too short to re-detect; the session language must hold.
    h.router.route_turn(turn("s1", "ja", SessionStatus::Active)).await;

    let state = h.store.load("s1").await.unwrap().unwrap();
    assert_eq!(state.language.as_tag(), "af");
}

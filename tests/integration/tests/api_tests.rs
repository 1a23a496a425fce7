//! End-to-end tests over the HTTP front-end and the directory.
//!
//! Requirements:
//! - running PostgreSQL (DATABASE_URL) with the weft schema
//! - running Redis (REDIS_URL)
//!
//! Without them each test prints a skip notice and passes.

use integration_tests::{check_test_env, login_user, register_user, unique_name, TestStack};
use serde_json::json;

#[tokio::test]
async fn register_then_login_yield_valid_tokens() {
    if !check_test_env().await {
        return;
    }
    let stack = TestStack::start().await.expect("stack failed to start");

    let name = unique_name("alice");
    let register_token = register_user(&stack, &name, "hunter2").await.unwrap();

    let check = stack
        .post("/user/checkAuth", &json!({ "authToken": register_token }))
        .await
        .unwrap();
    assert_eq!(check["code"], 0);
    assert_eq!(check["data"]["userName"], name);

    let login_token = login_user(&stack, &name, "hunter2").await.unwrap();
    let check = stack
        .post("/user/checkAuth", &json!({ "authToken": login_token }))
        .await
        .unwrap();
    assert_eq!(check["code"], 0);
}

#[tokio::test]
async fn duplicate_registration_fails() {
    if !check_test_env().await {
        return;
    }
    let stack = TestStack::start().await.expect("stack failed to start");

    let name = unique_name("dup");
    register_user(&stack, &name, "pw").await.unwrap();

    let again = stack
        .post(
            "/user/register",
            &json!({ "userName": name, "passWord": "pw" }),
        )
        .await
        .unwrap();
    assert_eq!(again["code"], 1);
}

#[tokio::test]
async fn wrong_password_is_rejected_generically() {
    if !check_test_env().await {
        return;
    }
    let stack = TestStack::start().await.expect("stack failed to start");

    let name = unique_name("carol");
    register_user(&stack, &name, "right").await.unwrap();

    let response = stack
        .post(
            "/user/login",
            &json!({ "userName": name, "passWord": "wrong" }),
        )
        .await
        .unwrap();
    assert_eq!(response["code"], 1);
    let message = response["message"].as_str().unwrap_or_default();
    assert!(!message.contains("password"), "no credential detail leaks");
}

#[tokio::test]
async fn logout_evicts_the_token_and_relogin_works() {
    if !check_test_env().await {
        return;
    }
    let stack = TestStack::start().await.expect("stack failed to start");

    let name = unique_name("dave");
    let token = register_user(&stack, &name, "pw").await.unwrap();

    let logout = stack
        .post("/user/logout", &json!({ "authToken": token }))
        .await
        .unwrap();
    assert_eq!(logout["code"], 0);

    // The old token fails both the cache and the directory.
    let check = stack
        .post("/user/checkAuth", &json!({ "authToken": token }))
        .await
        .unwrap();
    assert_eq!(check["code"], 1);

    // A second login mints a distinct, working token.
    let fresh = login_user(&stack, &name, "pw").await.unwrap();
    assert_ne!(fresh, token);
    let check = stack
        .post("/user/checkAuth", &json!({ "authToken": fresh }))
        .await
        .unwrap();
    assert_eq!(check["code"], 0);
}

#[tokio::test]
async fn push_requires_a_recipient() {
    if !check_test_env().await {
        return;
    }
    let stack = TestStack::start().await.expect("stack failed to start");

    let name = unique_name("erin");
    let token = register_user(&stack, &name, "pw").await.unwrap();

    // Both toUserId and roomId zero is invalid.
    let response = stack
        .post(
            "/push/push",
            &json!({ "authToken": token, "msg": "hi", "toUserId": 0, "roomId": 0 }),
        )
        .await
        .unwrap();
    assert_eq!(response["code"], 1);
}

#[tokio::test]
async fn push_room_publishes_for_delivery() {
    if !check_test_env().await {
        return;
    }
    let stack = TestStack::start().await.expect("stack failed to start");

    let name = unique_name("frank");
    let token = register_user(&stack, &name, "pw").await.unwrap();

    let response = stack
        .post(
            "/push/pushRoom",
            &json!({ "authToken": token, "msg": "hello room", "roomId": 7 }),
        )
        .await
        .unwrap();
    assert_eq!(response["code"], 0);

    // The record is durable: it shows up in room history immediately.
    let history = stack
        .post(
            "/push/history/room",
            &json!({ "authToken": token, "roomId": 7, "limit": 10 }),
        )
        .await
        .unwrap();
    assert_eq!(history["code"], 0);
    let messages = history["data"].as_array().unwrap();
    assert!(messages
        .iter()
        .any(|m| m["content"] == "hello room" && m["fromUserName"] == name));
}

#[tokio::test]
async fn empty_history_is_success_with_empty_list() {
    if !check_test_env().await {
        return;
    }
    let stack = TestStack::start().await.expect("stack failed to start");

    let name = unique_name("grace");
    let token = register_user(&stack, &name, "pw").await.unwrap();

    let response = stack
        .post(
            "/push/history/single",
            &json!({ "authToken": token, "otherUserId": 999_999_999, "limit": 10 }),
        )
        .await
        .unwrap();
    assert_eq!(response["code"], 0);
    assert_eq!(response["data"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn protected_routes_reject_missing_and_bogus_tokens() {
    if !check_test_env().await {
        return;
    }
    let stack = TestStack::start().await.expect("stack failed to start");

    let missing = stack
        .post("/push/count", &json!({ "roomId": 1 }))
        .await
        .unwrap();
    assert_eq!(missing["code"], 1);

    let bogus = stack
        .post(
            "/push/count",
            &json!({ "authToken": "not-a-real-token", "roomId": 1 }),
        )
        .await
        .unwrap();
    assert_eq!(bogus["code"], 1);
    assert_eq!(bogus["message"], "auth fail");
}

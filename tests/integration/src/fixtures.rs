//! Test data factories.

use crate::helpers::TestStack;
use anyhow::{anyhow, Result};
use serde_json::json;

/// A user name that cannot collide across test runs.
pub fn unique_name(prefix: &str) -> String {
    format!("{prefix}-{}", uuid::Uuid::new_v4().simple())
}

/// Register a fresh user and return their auth token.
pub async fn register_user(stack: &TestStack, name: &str, password: &str) -> Result<String> {
    let response = stack
        .post(
            "/user/register",
            &json!({ "userName": name, "passWord": password }),
        )
        .await?;

    if response["code"] != 0 {
        return Err(anyhow!("register failed: {response}"));
    }
    response["data"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("register returned no token"))
}

/// Log an existing user in and return the fresh token.
pub async fn login_user(stack: &TestStack, name: &str, password: &str) -> Result<String> {
    let response = stack
        .post(
            "/user/login",
            &json!({ "userName": name, "passWord": password }),
        )
        .await?;

    if response["code"] != 0 {
        return Err(anyhow!("login failed: {response}"));
    }
    response["data"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("login returned no token"))
}

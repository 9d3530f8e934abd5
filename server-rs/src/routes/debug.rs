use axum::{extract::State, Json};
use serde_json::{json, Map, Value};

use crate::config::Config;
use crate::AppState;

/// Reports which configuration variables are set. Values are never echoed.
pub async fn env_probe(State(state): State<AppState>) -> Json<Value> {
    let vars: Map<String, Value> = Config::PROBED_ENV_VARS
        .iter()
        .map(|name| {
            let set = std::env::var(name).map(|v| !v.is_empty()).unwrap_or(false);
            (name.to_string(), Value::Bool(set))
        })
        .collect();

    Json(json!({
        "app_env": state.config.app_env,
        "mailer_configured": state.mailer.is_some(),
        "fallback_store": state.config.storage.fallback_path.is_some(),
        "env": vars,
    }))
}

use std::sync::Arc;

use agent_provider::AnalysisAgent;
use agent_provider_mock::{ScriptedAgent, MOCK_AGENT_ID};

pub const DEFAULT_PROVIDER_ID: &str = MOCK_AGENT_ID;
pub const PROVIDER_ENV_VAR: &str = "DATA_ANALYST_PROVIDER";

pub fn provider_from_env() -> Result<Arc<dyn AnalysisAgent>, String> {
    let provider_id = std::env::var(PROVIDER_ENV_VAR)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());

    provider_for_id(provider_id.as_deref().unwrap_or(DEFAULT_PROVIDER_ID))
}

pub fn provider_for_id(provider_id: &str) -> Result<Arc<dyn AnalysisAgent>, String> {
    match provider_id {
        DEFAULT_PROVIDER_ID => Ok(Arc::new(ScriptedAgent::default())),
        unknown => Err(format!(
            "Unsupported provider '{unknown}'. Available providers: {DEFAULT_PROVIDER_ID}"
        )),
    }
}

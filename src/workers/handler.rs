//! Handler plugin vocabulary. The handlers themselves run inside the
//! out-of-scope LLM worker (§1); the host only needs the shared `Intent` tag
//! and `Handler` trait so the LLM adapter's `Complete` event can carry an
//! intent label, plus a null registry for tests.

/// Tag carried on `TokenEvent::Complete` when a handler claimed the turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Default,
    Memory,
    FileSearch,
    WebSearch,
    Note,
}

impl Default for Intent {
    fn default() -> Self {
        Intent::Default
    }
}

/// Duck-typed dispatch contract, kept here as the shared vocabulary even
/// though production handler implementations live in the LLM worker.
pub trait Handler: Send + Sync {
    fn claims(&self, text: &str) -> bool;
    fn handle(&self, text: &str) -> String;
}

/// A registry that never claims anything — used by tests that exercise the
/// controller/bridge without a real handler-bearing LLM worker.
pub struct NullHandlerRegistry;

impl NullHandlerRegistry {
    pub fn dispatch(&self, _text: &str) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_registry_never_claims() {
        let registry = NullHandlerRegistry;
        assert!(registry.dispatch("take a note").is_none());
    }
}

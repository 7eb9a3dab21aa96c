//! Environment-variable defaults, consulted only when the caller leaves
//! the corresponding `AgentParams` field unset (spec [AMBIENT]
//! Configuration).

use std::str::FromStr;

const MAX_TURNS_VAR: &str = "AGENT_MAX_TURNS";
const TEMPERATURE_VAR: &str = "AGENT_TEMPERATURE";

pub const DEFAULT_MAX_TURNS: usize = 10;

/// Resolves the run's turn budget: explicit value, else `AGENT_MAX_TURNS`,
/// else [`DEFAULT_MAX_TURNS`].
pub fn max_turns(explicit: Option<usize>) -> usize {
    explicit
        .or_else(|| env_parsed(MAX_TURNS_VAR))
        .unwrap_or(DEFAULT_MAX_TURNS)
}

/// Resolves the default sampling temperature: explicit value, else
/// `AGENT_TEMPERATURE`, else `None` (let the language model use its own
/// default).
pub fn default_temperature(explicit: Option<f32>) -> Option<f32> {
    explicit.or_else(|| env_parsed(TEMPERATURE_VAR))
}

fn env_parsed<T: FromStr>(var: &str) -> Option<T> {
    std::env::var(var).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn explicit_value_wins_over_env() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var(MAX_TURNS_VAR, "5");
        assert_eq!(max_turns(Some(20)), 20);
        std::env::remove_var(MAX_TURNS_VAR);
    }

    #[test]
    fn env_var_used_when_unset() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var(MAX_TURNS_VAR, "7");
        assert_eq!(max_turns(None), 7);
        std::env::remove_var(MAX_TURNS_VAR);
    }

    #[test]
    fn falls_back_to_default() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::remove_var(MAX_TURNS_VAR);
        assert_eq!(max_turns(None), DEFAULT_MAX_TURNS);
    }

    #[test]
    fn temperature_has_no_hardcoded_fallback() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::remove_var(TEMPERATURE_VAR);
        assert_eq!(default_temperature(None), None);
    }
}

use serde::{Deserialize, Serialize};

/// Fallback resolution providers, tried after every impersonation profile
/// has failed. Either list may be emptied to drop that strategy from the
/// chain entirely.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MirrorsConfig {
    #[serde(default = "default_cobalt_instances")]
    pub cobalt: Vec<String>,
    #[serde(default = "default_piped_instances")]
    pub piped: Vec<String>,
}

fn default_cobalt_instances() -> Vec<String> {
    vec![
        "https://api.cobalt.tools/api/json".to_string(),
        "https://co.wuk.sh/api/json".to_string(),
    ]
}

fn default_piped_instances() -> Vec<String> {
    vec![
        "https://pipedapi.kavin.rocks".to_string(),
        "https://pipedapi.adminforge.de".to_string(),
    ]
}

impl Default for MirrorsConfig {
    fn default() -> Self {
        Self {
            cobalt: default_cobalt_instances(),
            piped: default_piped_instances(),
        }
    }
}

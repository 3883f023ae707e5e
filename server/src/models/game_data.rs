use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct ProgressDocument {
    pub progress: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ModulesDocument {
    pub inventory: serde_json::Value,
    pub equipped: serde_json::Value,
}

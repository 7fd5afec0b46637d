//! Config schema types.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IntrachatConfig {
    pub gateway: GatewayConfig,
    pub seed: SeedAccount,
}

/// Listen address for the WebSocket gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 8080,
        }
    }
}

/// The bootstrap account inserted at startup. The process always holds
/// exactly one seed so that registration (privileged-unit only) is
/// reachable on a fresh instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedAccount {
    pub cpf: String,
    pub senha: String,
    pub nome: String,
    pub setor: String,
    pub cargo: String,
}

impl Default for SeedAccount {
    fn default() -> Self {
        Self {
            cpf: "20030321778".into(),
            senha: "SergioP10".into(),
            nome: "Sergio Paulo de Andrade".into(),
            setor: "T.I".into(),
            cargo: "Gestor de T.I".into(),
        }
    }
}

//! Shared gateway runtime state.

use std::sync::Arc;

use tokio::sync::RwLock;

use {
    intrachat_config::IntrachatConfig,
    intrachat_directory::{Account, Directory},
    intrachat_rooms::Rooms,
};

use crate::presence::ConnectionRegistry;

/// Shared gateway runtime state, wrapped in `Arc` for use across async
/// tasks.
///
/// Each store sits behind its own `RwLock`; a write guard serializes all
/// mutations to that store, which is what preserves the single-writer
/// discipline the in-memory model assumes. Guards are held only for the
/// duration of one handler step. When two locks are nested, the order is
/// always directory → rooms → presence.
pub struct GatewayState {
    pub directory: RwLock<Directory>,
    pub rooms: RwLock<Rooms>,
    pub presence: RwLock<ConnectionRegistry>,
    /// Server version string (for `/health`).
    pub version: String,
}

impl GatewayState {
    /// Build the state with the configured bootstrap seed account.
    pub fn new(config: &IntrachatConfig) -> Arc<Self> {
        let mut directory = Directory::new();
        directory.insert_seed(Account {
            cpf: config.seed.cpf.clone(),
            senha: config.seed.senha.clone(),
            nome: config.seed.nome.clone(),
            setor: config.seed.setor.clone(),
            cargo: config.seed.cargo.clone(),
        });

        Arc::new(Self {
            directory: RwLock::new(directory),
            rooms: RwLock::new(Rooms::new()),
            presence: RwLock::new(ConnectionRegistry::new()),
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }

    /// Number of open channels.
    pub async fn client_count(&self) -> usize {
        self.presence.read().await.count()
    }
}

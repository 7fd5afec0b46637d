//! Identity store: registered accounts, credential checks, privileged
//! registration.
//!
//! Accounts are held in memory and never deleted. The store is a plain
//! mutable struct owned by the gateway state behind a lock; it knows
//! nothing about connections — presence is joined in by the caller.

use std::collections::HashMap;

use tracing::info;

use intrachat_protocol::{DirectoryEntry, ParticipantRef, PeerSummary, UserProfile};

/// The organizational unit allowed to register new accounts.
pub const PRIVILEGED_UNIT: &str = "T.I";

// ── Account ──────────────────────────────────────────────────────────────────

/// A registered account. The identity key (`cpf`) is immutable; the secret
/// is stored as given (hashing is out of scope).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub cpf: String,
    pub senha: String,
    pub nome: String,
    pub setor: String,
    pub cargo: String,
}

impl Account {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            cpf: self.cpf.clone(),
            nome: self.nome.clone(),
            setor: self.setor.clone(),
            cargo: self.cargo.clone(),
        }
    }

    pub fn peer(&self) -> PeerSummary {
        PeerSummary {
            cpf: self.cpf.clone(),
            nome: self.nome.clone(),
            setor: self.setor.clone(),
        }
    }

    pub fn participant(&self) -> ParticipantRef {
        ParticipantRef {
            cpf: self.cpf.clone(),
            nome: self.nome.clone(),
        }
    }
}

// ── Errors ───────────────────────────────────────────────────────────────────

/// Typed identity-store failures. The display strings are the user-facing
/// wire messages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectoryError {
    #[error("CPF ou senha incorretos")]
    InvalidCredentials,
    #[error("Acesso negado. Apenas usuários do setor T.I podem cadastrar novos usuários.")]
    PermissionDenied,
    #[error("CPF já cadastrado")]
    DuplicateIdentity,
}

// ── Store ────────────────────────────────────────────────────────────────────

/// In-memory account directory keyed by cpf.
#[derive(Debug, Default)]
pub struct Directory {
    accounts: HashMap<String, Account>,
}

/// Constant-time string comparison for the credential check.
fn safe_equal(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let diff = a
        .as_bytes()
        .iter()
        .zip(b.as_bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y));
    diff == 0
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an account unconditionally (bootstrap seed).
    pub fn insert_seed(&mut self, account: Account) {
        self.accounts.insert(account.cpf.clone(), account);
    }

    /// Exact key + secret match, or `InvalidCredentials`.
    pub fn verify_credentials(&self, cpf: &str, senha: &str) -> Result<Account, DirectoryError> {
        match self.accounts.get(cpf) {
            Some(account) if safe_equal(&account.senha, senha) => Ok(account.clone()),
            _ => Err(DirectoryError::InvalidCredentials),
        }
    }

    /// Register a new account on behalf of `requesting_cpf`.
    ///
    /// Only members of [`PRIVILEGED_UNIT`] may register; an anonymous or
    /// unknown requester is denied the same way. Existing accounts are
    /// never overwritten.
    pub fn register(
        &mut self,
        new_account: Account,
        requesting_cpf: Option<&str>,
    ) -> Result<Account, DirectoryError> {
        let authorized = requesting_cpf
            .and_then(|cpf| self.accounts.get(cpf))
            .is_some_and(|account| account.setor == PRIVILEGED_UNIT);
        if !authorized {
            return Err(DirectoryError::PermissionDenied);
        }
        if self.accounts.contains_key(&new_account.cpf) {
            return Err(DirectoryError::DuplicateIdentity);
        }
        info!(cpf = %new_account.cpf, nome = %new_account.nome, "account registered");
        self.accounts
            .insert(new_account.cpf.clone(), new_account.clone());
        Ok(new_account)
    }

    /// Every account except the caller's, annotated with live presence.
    /// Sorted by cpf for a stable listing.
    pub fn list_others(
        &self,
        excluding_cpf: &str,
        is_online: impl Fn(&str) -> bool,
    ) -> Vec<DirectoryEntry> {
        let mut entries: Vec<_> = self
            .accounts
            .values()
            .filter(|account| account.cpf != excluding_cpf)
            .map(|account| DirectoryEntry {
                cpf: account.cpf.clone(),
                nome: account.nome.clone(),
                setor: account.setor.clone(),
                cargo: account.cargo.clone(),
                online: is_online(&account.cpf),
            })
            .collect();
        entries.sort_by(|a, b| a.cpf.cmp(&b.cpf));
        entries
    }

    pub fn get(&self, cpf: &str) -> Option<&Account> {
        self.accounts.get(cpf)
    }

    pub fn contains(&self, cpf: &str) -> bool {
        self.accounts.contains_key(cpf)
    }

    pub fn count(&self) -> usize {
        self.accounts.len()
    }
}

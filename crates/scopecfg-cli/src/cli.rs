use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use scopecfg_core::{Scope, ScopeKind};

/// CLI surface definition.
#[derive(Parser, Debug)]
#[command(
    name = "scopecfg",
    about = "Resolve, set and delete scoped configuration values",
    version,
    propagate_version = true
)]
pub struct Cli {
    /// Scope to resolve or write at.
    #[arg(long, value_enum, default_value_t = ScopeArg::Store, global = true)]
    pub scope: ScopeArg,
    /// Website or store id; the current store is used when omitted.
    #[arg(long, global = true)]
    pub scope_id: Option<i64>,
    /// Read configuration from this file instead of the default location.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Resolution scope for this invocation. Global scope never needs a store id.
    pub fn scope(&self) -> Scope {
        match (self.scope, self.scope_id) {
            (ScopeArg::Global, None) => Scope::global(),
            (kind, id) => Scope::new(kind.into(), id),
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeArg {
    Global,
    Website,
    Store,
}

impl From<ScopeArg> for ScopeKind {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::Global => ScopeKind::Global,
            ScopeArg::Website => ScopeKind::Website,
            ScopeArg::Store => ScopeKind::Store,
        }
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the resolved value of a key (decrypted when the key is secret).
    Get { key: String },
    /// Store a value for a key, encrypting it when the key is secret.
    Set { key: String, value: String },
    /// Remove the override for a key at the selected scope.
    Delete { key: String },
    /// Print the storage path registered for a key.
    Path { key: String },
    /// Report whether the module is enabled at the selected scope.
    Enabled,
    /// List registered keys.
    Keys,
    /// Print version and exit.
    Version,
    /// Manage CLI configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Manage the default store and store-to-website map in the override table.
    #[command(subcommand)]
    Store(StoreCommand),
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Create a default config file if one does not exist.
    Init,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum StoreCommand {
    /// Store used when no `--scope-id` is given.
    Default { store_id: i64 },
    /// Record the website a store belongs to, for website-level fallback.
    Assign { store_id: i64, website_id: i64 },
    /// Print the default store and store-to-website map.
    Show,
}

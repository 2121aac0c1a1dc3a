mod cli;
mod config;
mod storage;

use std::io::{self, Write};

use crate::cli::{Command, ConfigCommand, StoreCommand};
use clap::Parser;
use color_eyre::Result;
use scopecfg_core::{ConfigResolver, FieldKind, ReadSource, Scope};
use scopecfg_storage::file_table::FileConfigTable;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Entry point wiring the CLI to the resolver.
fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = cli::Cli::parse();
    let scope = cli.scope();
    let config = match &cli.config {
        Some(path) => config::load_from_path(path)?,
        None => config::load()?,
    };

    match cli.command {
        Command::Version => print_version(),
        Command::Config(ConfigCommand::Init) => init_config(&config, cli.config.as_deref())?,
        Command::Store(command) => {
            if let Some(id) = config.default_store {
                tracing::warn!(default_store = id, "config default_store overrides the table");
            }
            let table = storage::open_table(&config)?;
            let stdout = io::stdout();
            run_store(command, &table, &mut stdout.lock())?;
        }
        command => {
            let resolver = storage::build_resolver(&config)?;
            let stdout = io::stdout();
            execute(command, scope, &resolver, &mut stdout.lock())?;
        }
    }

    Ok(())
}

const DEFAULT_LOG_FILTER: &str = "info";

fn init_tracing() {
    // Logs go to stderr so `get` output stays pipeable.
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(io::stderr);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn print_version() {
    println!("scopecfg {}", env!("CARGO_PKG_VERSION"));
}

fn init_config(config: &config::Config, path: Option<&std::path::Path>) -> Result<()> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => config::default_path()?,
    };
    let path = config::write_if_missing(config, &path)?;
    println!("Config initialized at {}", path.display());
    Ok(())
}

/// Edit or print the store bookkeeping kept in the override table.
fn run_store<W: Write>(command: StoreCommand, table: &FileConfigTable, out: &mut W) -> Result<()> {
    match command {
        StoreCommand::Default { store_id } => {
            table.set_default_store(store_id)?;
            writeln!(out, "Default store set to {store_id}")?;
        }
        StoreCommand::Assign {
            store_id,
            website_id,
        } => {
            table.assign_store(store_id, website_id)?;
            writeln!(out, "Store {store_id} assigned to website {website_id}")?;
        }
        StoreCommand::Show => {
            let doc = table.load()?;
            match doc.default_store {
                Some(id) => writeln!(out, "default store: {id}")?,
                None => writeln!(out, "default store: (not set)")?,
            }
            for (store, website) in &doc.store_websites {
                writeln!(out, "store {store} -> website {website}")?;
            }
        }
    }
    Ok(())
}

/// Run a resolver-backed command, writing user-facing output to `out`.
fn execute<W: Write>(
    command: Command,
    scope: Scope,
    resolver: &ConfigResolver,
    out: &mut W,
) -> Result<()> {
    match command {
        Command::Get { key } => match resolver.get(&key, scope)? {
            Some(value) => writeln!(out, "{value}")?,
            None => {
                if !resolver.registry().contains(&key) {
                    tracing::warn!(%key, "key is not registered");
                }
                writeln!(out, "(not set)")?
            }
        },
        Command::Set { key, value } => {
            resolver.save_key(&key, &value, scope)?;
            writeln!(out, "Saved {key} at {scope}")?;
        }
        Command::Delete { key } => {
            resolver.delete(&key, scope)?;
            writeln!(out, "Deleted {key} at {scope}")?;
        }
        Command::Path { key } => writeln!(out, "{}", resolver.config_path(&key)?)?,
        Command::Enabled => {
            let label = if resolver.is_enabled(scope) {
                "enabled"
            } else {
                "disabled"
            };
            writeln!(out, "{label}")?;
        }
        Command::Keys => {
            for (key, descriptor) in resolver.registry().iter() {
                let mut flags = Vec::new();
                if descriptor.kind == FieldKind::Encrypted {
                    flags.push("encrypted");
                }
                if descriptor.source == ReadSource::OverrideTable {
                    flags.push("override-table");
                }
                writeln!(out, "{key}\t{}\t{}", descriptor.path, flags.join(","))?;
            }
        }
        Command::Version | Command::Config(_) | Command::Store(_) => {
            color_eyre::eyre::bail!("command does not use the resolver")
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage;

    fn run(command: Command, scope: Scope, resolver: &ConfigResolver) -> String {
        let mut out = Vec::new();
        execute(command, scope, resolver, &mut out).expect("command should succeed");
        String::from_utf8(out).expect("utf8 output")
    }

    fn resolver_in(dir: &tempfile::TempDir) -> ConfigResolver {
        storage::test_resolver(&config::Config {
            data_dir: Some(dir.path().to_path_buf()),
            default_store: Some(1),
            ..config::Config::default()
        })
    }

    #[test]
    fn set_then_get_round_trips_secret() {
        let dir = tempfile::tempdir().expect("tempdir");
        let resolver = resolver_in(&dir);
        let scope = Scope::current_store();

        let saved = run(
            Command::Set {
                key: "secret".into(),
                value: "hunter2".into(),
            },
            scope,
            &resolver,
        );
        assert_eq!(saved, "Saved secret at store:current\n");

        let got = run(
            Command::Get {
                key: "secret".into(),
            },
            scope,
            &resolver,
        );
        assert_eq!(got, "hunter2\n");
    }

    #[test]
    fn enabled_reflects_active_flag() {
        let dir = tempfile::tempdir().expect("tempdir");
        let resolver = resolver_in(&dir);
        let scope = Scope::store(1);
        assert_eq!(run(Command::Enabled, scope, &resolver), "disabled\n");

        run(
            Command::Set {
                key: "core_active".into(),
                value: "1".into(),
            },
            Scope::global(),
            &resolver,
        );
        assert_eq!(run(Command::Enabled, scope, &resolver), "enabled\n");
    }

    #[test]
    fn get_of_unknown_key_reports_not_set() {
        let dir = tempfile::tempdir().expect("tempdir");
        let resolver = resolver_in(&dir);
        let got = run(
            Command::Get {
                key: "nope".into(),
            },
            Scope::store(1),
            &resolver,
        );
        assert_eq!(got, "(not set)\n");
    }

    #[test]
    fn path_of_unknown_key_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let resolver = resolver_in(&dir);
        let mut out = Vec::new();
        let err = execute(
            Command::Path {
                key: "nope".into(),
            },
            Scope::store(1),
            &resolver,
            &mut out,
        )
        .expect_err("unknown key");
        assert!(err.to_string().contains("unknown configuration key: nope"));
    }

    #[test]
    fn default_log_filter_is_info() {
        assert_eq!(EnvFilter::new(DEFAULT_LOG_FILTER).to_string(), "info");
    }

    #[test]
    fn store_commands_drive_current_store_and_fallback() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = config::Config {
            data_dir: Some(dir.path().to_path_buf()),
            ..config::Config::default()
        };
        let table = storage::open_table(&config).expect("table");
        let mut out = Vec::new();
        run_store(StoreCommand::Default { store_id: 3 }, &table, &mut out).expect("default");
        run_store(
            StoreCommand::Assign {
                store_id: 3,
                website_id: 7,
            },
            &table,
            &mut out,
        )
        .expect("assign");
        run_store(StoreCommand::Show, &table, &mut out).expect("show");
        assert_eq!(
            String::from_utf8(out).expect("utf8 output"),
            "Default store set to 3\n\
             Store 3 assigned to website 7\n\
             default store: 3\n\
             store 3 -> website 7\n"
        );

        let resolver = storage::test_resolver(&config);
        resolver
            .save_key("app_key", "site-key", Scope::website(7))
            .expect("save");
        assert_eq!(
            resolver
                .get("app_key", Scope::current_store())
                .expect("get"),
            Some("site-key".to_string())
        );
    }

    #[test]
    fn keys_lists_flags() {
        let dir = tempfile::tempdir().expect("tempdir");
        let resolver = resolver_in(&dir);
        let listing = run(Command::Keys, Scope::store(1), &resolver);
        assert!(listing.contains("secret\tcore/settings/secret\tencrypted\n"));
        assert!(listing.contains("core_active\tcore/settings/active\t\n"));
    }
}

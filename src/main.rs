//! Trust - Secure Boot Keyset Manager
//!
//! ```bash
//! trust keyset list
//! trust keyset add prod --org "Example Org"
//! trust tpm-read
//! trust provision cert.pem privkey.pem
//! ```

use anyhow::{bail, Context, Result};
use clap::{crate_description, crate_name, crate_version, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use trust::bootkit::BootkitScript;
use trust::certificate_authority::OpensslAuthority;
use trust::configs::AppConfig;
use trust::registry::KeysetRegistry;
use trust::strategy::{Collaborators, GitFetcher};
use trust::trust_anchor::{self, TrustAnchor, Tpm2};

fn cli() -> Command {
    Command::new(crate_name!())
        .version(crate_version!())
        .about(crate_description!())
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .value_parser(clap::value_parser!(PathBuf))
                .global(true)
                .help("Configuration file (TOML)"),
        )
        .arg(
            Arg::new("debug")
                .short('d')
                .long("debug")
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Prints debugging information"),
        )
        .subcommand(
            Command::new("keyset")
                .about("Administer keysets for mos")
                .subcommand_required(true)
                .subcommand(Command::new("list").about("list keysets"))
                .subcommand(
                    Command::new("add")
                        .about("add a new keyset")
                        .arg(
                            Arg::new("name")
                                .value_name("keyset-name")
                                .required(true)
                                .help("Name of the new keyset"),
                        )
                        .arg(
                            Arg::new("org")
                                .long("org")
                                .visible_aliases(["Org", "organization"])
                                .value_name("VALUE")
                                .action(ArgAction::Append)
                                .help(
                                    "X509-Organization field to add to certificates when \
                                     generating a new keyset. (optional)",
                                ),
                        ),
                ),
        )
        .subcommand(Command::new("tpm-read").about("Debug tpm state"))
        .subcommand(
            Command::new("provision")
                .about("Provision a new system")
                .arg(
                    Arg::new("cert")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("key")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
}

fn init_logging(debug: bool) {
    let env = env_logger::Env::default().filter_or(
        "RUST_LOG",
        if debug { "debug" } else { "info" },
    );
    env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn load_config(matches: &ArgMatches) -> Result<AppConfig> {
    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => AppConfig::from_file(path),
        None => AppConfig::load(),
    };
    config.context("Failed to load configuration")
}

fn do_list_keysets(config: &AppConfig) -> Result<()> {
    let registry = KeysetRegistry::from_config(config)?;
    for name in registry.list()? {
        println!("{}", name);
    }
    Ok(())
}

fn do_add_keyset(config: &AppConfig, matches: &ArgMatches) -> Result<()> {
    let name = matches
        .get_one::<String>("name")
        .map(String::as_str)
        .unwrap_or_default();
    let organization: Vec<String> = matches
        .get_many::<String>("org")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    if organization.is_empty() {
        log::info!("X509-Organization field for new certificates not specified.");
    }

    let registry = KeysetRegistry::from_config(config)?;
    let bootkit = BootkitScript::new(config.bootkit.command.clone());
    let collaborators = Collaborators {
        ca: &OpensslAuthority,
        bootkit: &bootkit,
        fetcher: &GitFetcher,
    };
    registry
        .add(config, name, &organization, collaborators)
        .with_context(|| format!("Failed to add keyset {}", name))
}

fn do_tpm_read(config: &AppConfig) -> Result<()> {
    let tpm = Tpm2::new(&config.trust_anchor);
    println!("TPM layout version: {}.", tpm.layout_version()?);
    println!("EA Policy version: {}.", tpm.ea_policy_version()?);
    Ok(())
}

fn do_provision(config: &AppConfig, matches: &ArgMatches) -> Result<()> {
    let (Some(cert), Some(key)) = (
        matches.get_one::<PathBuf>("cert"),
        matches.get_one::<PathBuf>("key"),
    ) else {
        bail!("Required arguments: certificate and key paths");
    };
    let tpm = Tpm2::new(&config.trust_anchor);
    trust_anchor::provision(&tpm, cert, key)?;
    Ok(())
}

fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_logging(matches.get_flag("debug"));
    let config = load_config(&matches)?;

    match matches.subcommand() {
        Some(("keyset", sub)) => match sub.subcommand() {
            Some(("list", _)) => do_list_keysets(&config),
            Some(("add", add)) => do_add_keyset(&config, add),
            _ => unreachable!("subcommand_required"),
        },
        Some(("tpm-read", _)) => do_tpm_read(&config),
        Some(("provision", args)) => do_provision(&config, args),
        _ => unreachable!("subcommand_required"),
    }
}

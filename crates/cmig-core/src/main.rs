//! `cmig` command-line interface

use anyhow::{bail, Context};
use clap::{value_parser, Arg, ArgAction, ArgGroup, ArgMatches, Command};
use cmig_core::{MigrationConfig, MigrationEngine};
use cmig_graph::RootSelector;
use cmig_model::{Bundle, MappingAction};
use cmig_store::MemoryStore;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("cmig")
        .version(cmig_core::VERSION)
        .about("Dependency-ordered export and identity-reconciling import of gateway configuration")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .subcommand(
            Command::new("export")
                .about("Export an entity and its dependencies as a bundle")
                .arg(store_arg())
                .arg(
                    Arg::new("policy")
                        .long("policy")
                        .value_name("ID")
                        .help("Export a policy"),
                )
                .arg(
                    Arg::new("folder")
                        .long("folder")
                        .value_name("ID")
                        .help("Export a folder's contents"),
                )
                .arg(
                    Arg::new("all")
                        .long("all")
                        .action(ArgAction::SetTrue)
                        .help("Export the whole store"),
                )
                .group(
                    ArgGroup::new("root")
                        .args(["policy", "folder", "all"])
                        .required(true),
                )
                .arg(
                    Arg::new("default-action")
                        .long("default-action")
                        .value_parser(|s: &str| s.parse::<MappingAction>())
                        .help("Action placed on every directive"),
                )
                .arg(
                    Arg::new("include-request-folder")
                        .long("include-request-folder")
                        .action(ArgAction::SetTrue)
                        .help("Include the requested folder itself"),
                )
                .arg(
                    Arg::new("encrypt-secrets")
                        .long("encrypt-secrets")
                        .action(ArgAction::SetTrue)
                        .help("Seal secrets with the configured passphrase instead of redacting"),
                )
                .arg(
                    Arg::new("out")
                        .long("out")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Bundle file to write"),
                ),
        )
        .subcommand(
            Command::new("import")
                .about("Import a bundle into a store snapshot")
                .arg(store_arg())
                .arg(bundle_arg())
                .arg(
                    Arg::new("test")
                        .long("test")
                        .action(ArgAction::SetTrue)
                        .help("Resolve and report without changing the store"),
                )
                .arg(
                    Arg::new("activate")
                        .long("activate")
                        .value_parser(value_parser!(bool))
                        .num_args(0..=1)
                        .default_missing_value("true")
                        .help("Activate written revisions"),
                )
                .arg(
                    Arg::new("version-comment")
                        .long("version-comment")
                        .help("Comment attached to written revisions"),
                ),
        )
        .subcommand(
            Command::new("inspect")
                .about("Print a bundle's directive order")
                .arg(bundle_arg()),
        )
}

fn store_arg() -> Arg {
    Arg::new("store")
        .long("store")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Store snapshot file")
}

fn bundle_arg() -> Arg {
    Arg::new("bundle")
        .long("bundle")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Bundle file")
}

fn path(args: &ArgMatches, id: &str) -> anyhow::Result<PathBuf> {
    args.get_one::<PathBuf>(id)
        .cloned()
        .with_context(|| format!("--{id} is required"))
}

fn read_bundle(path: &Path) -> anyhow::Result<Bundle> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading bundle {}", path.display()))?;
    Ok(Bundle::from_json(&json)?)
}

fn export(config: MigrationConfig, args: &ArgMatches) -> anyhow::Result<ExitCode> {
    let store_path = path(args, "store")?;
    let store = MemoryStore::load(&store_path)
        .with_context(|| format!("loading store {}", store_path.display()))?;
    let engine = MigrationEngine::new(store, config);

    let root = if args.get_flag("all") {
        RootSelector::All
    } else if let Some(id) = args.get_one::<String>("policy") {
        RootSelector::policy(id)
    } else if let Some(id) = args.get_one::<String>("folder") {
        RootSelector::folder(id)
    } else {
        bail!("one of --policy, --folder or --all is required");
    };

    let mut options = engine
        .export_options()
        .with_all(root == RootSelector::All)
        .with_request_folder(args.get_flag("include-request-folder"));
    if let Some(action) = args.get_one::<MappingAction>("default-action") {
        options = options.with_default_action(*action);
    }
    options.encrypt_secrets = args.get_flag("encrypt-secrets");

    let export = engine.export(&root, options)?;
    let out = path(args, "out")?;
    std::fs::write(&out, export.bundle.to_json_pretty()?)
        .with_context(|| format!("writing bundle {}", out.display()))?;
    println!(
        "exported {} references, {} directives to {}",
        export.bundle.references.len(),
        export.bundle.mappings.len(),
        out.display()
    );
    Ok(ExitCode::SUCCESS)
}

fn import(config: MigrationConfig, args: &ArgMatches) -> anyhow::Result<ExitCode> {
    let store_path = path(args, "store")?;
    let store = MemoryStore::load(&store_path)
        .with_context(|| format!("loading store {}", store_path.display()))?;
    let bundle = read_bundle(&path(args, "bundle")?)?;
    let engine = MigrationEngine::new(store, config);

    let mut options = engine.import_options();
    if let Some(activate) = args.get_one::<bool>("activate") {
        options = options.with_activate(*activate);
    }
    if let Some(comment) = args.get_one::<String>("version-comment") {
        options = options.with_version_comment(comment);
    }
    if args.get_flag("test") {
        options = options.test_mode();
    }

    let report = engine.import(&bundle, options)?;
    if report.committed {
        engine
            .store()
            .save(&store_path)
            .with_context(|| format!("saving store {}", store_path.display()))?;
    }
    println!("{}", serde_json::to_string_pretty(&report)?);
    eprintln!("{}", report.summary());

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn inspect(args: &ArgMatches) -> anyhow::Result<ExitCode> {
    let bundle = read_bundle(&path(args, "bundle")?)?;
    bundle.validate()?;
    let references = bundle.reference_index();
    for (position, directive) in bundle.mappings.iter().enumerate() {
        let name = references
            .get(&directive.key())
            .map_or("-", |r| r.name.as_str());
        println!(
            "{:>4}  {:<24} {:<34} {:<16} {}",
            position + 1,
            directive.entity_type,
            directive.src_id,
            directive.action,
            name
        );
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let matches = cli().get_matches();
    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => MigrationConfig::load(path)?,
        None => MigrationConfig::default(),
    };

    match matches.subcommand() {
        Some(("export", args)) => export(config, args),
        Some(("import", args)) => import(config, args),
        Some(("inspect", args)) => inspect(args),
        _ => {
            cli().print_help()?;
            Ok(ExitCode::FAILURE)
        }
    }
}

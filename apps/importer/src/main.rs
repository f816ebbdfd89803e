use clap::{command, Parser, Subcommand, ValueEnum};
use common::logging::CommonLogger;
use std::path::PathBuf;
use vat_store::{AssetClass, AssetStore, MemoryStore};
use vat_vatgen::identity::AnimTokenRule;
use vat_vatgen::report::BindOutcome;
use vat_vatgen::{hierarchy, GenConfig};

#[derive(Parser)]
#[command(version, about = "Dry-runs the VAT bake pipeline against an in-memory store", long_about = None)]
struct CLI {
    /// Bake root directory containing geo/, tex/ and data/
    #[arg(short, long)]
    source: String,

    /// Destination namespace path in the asset store
    #[arg(short, long)]
    destination: String,

    /// Comma-separated character filter (all discoverable when omitted)
    #[arg(short, long)]
    characters: Option<String>,

    /// Base parent material for each character's first chain instance
    #[arg(short, long)]
    base_parent: Option<String>,

    /// Animation token rule used by identity extraction
    #[arg(short, long, value_enum, default_value_t = TokenRuleArg::Capitalized)]
    token_rule: TokenRuleArg,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
#[clap(rename_all = "kebab_case")]
enum TokenRuleArg {
    Capitalized,
    Legacy,
}

impl From<TokenRuleArg> for AnimTokenRule {
    fn from(arg: TokenRuleArg) -> AnimTokenRule {
        match arg {
            TokenRuleArg::Capitalized => AnimTokenRule::Capitalized,
            TokenRuleArg::Legacy => AnimTokenRule::Legacy,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Import mesh files
    Meshes,
    /// Import bake textures and enforce their settings
    Textures,
    /// Build the per-character material instance chains
    Chains,
    /// Run meshes, textures and chains in order
    All,
    /// Duplicate and relink a template's material hierarchy
    Hierarchy {
        /// Template asset path
        #[arg(long)]
        template: String,
        /// Namespace root searched for slot instances
        #[arg(long)]
        search_root: String,
        /// Variant name override (derived from the template name if omitted)
        #[arg(long)]
        variant: Option<String>,
    },
}

fn main() {
    // Initialize the logger
    log::set_logger(&CommonLogger).unwrap();
    log::set_max_level(log::LevelFilter::Debug);

    let cli = CLI::parse();
    log::info!("Source directory: {}", cli.source);
    log::info!("Destination namespace: {}", cli.destination);

    let config = GenConfig {
        source_root: PathBuf::from(&cli.source),
        destination: cli.destination.as_str().into(),
        character_filter: cli.characters.clone(),
        base_parent: cli.base_parent.as_deref().map(Into::into),
        token_rule: cli.token_rule.into(),
    };

    let mut store = MemoryStore::new();
    if let Some(base_parent) = &config.base_parent {
        store.insert(base_parent.clone(), AssetClass::Material);
    }

    let ok = match &cli.command {
        Command::Meshes => !vat_vatgen::run_mesh_import(&mut store, &config).is_empty(),
        Command::Textures => run_textures(&mut store, &config),
        Command::Chains => !vat_vatgen::run_chain_build(&mut store, &config).is_empty(),
        Command::All => {
            let meshes = !vat_vatgen::run_mesh_import(&mut store, &config).is_empty();
            let textures = run_textures(&mut store, &config);
            let chains = !vat_vatgen::run_chain_build(&mut store, &config).is_empty();
            meshes && textures && chains
        }
        Command::Hierarchy {
            template,
            search_root,
            variant,
        } => hierarchy::synthesize(
            &mut store,
            &template.as_str().into(),
            &search_root.as_str().into(),
            variant.as_deref(),
        ),
    };

    log::info!("Resulting namespace:");
    for path in store.list_assets(&"/".into(), true) {
        log::info!("  {}", path);
    }

    if !ok {
        log::error!("Pipeline run produced no usable result");
        std::process::exit(1);
    }
}

fn run_textures(store: &mut MemoryStore, config: &GenConfig) -> bool {
    let (produced, reports) = vat_vatgen::run_texture_import(store, config);
    for report in reports.iter().filter(|r| !r.is_clean()) {
        for (binding, outcome) in report.bindings() {
            if let BindOutcome::Failed(reason) = outcome {
                log::warn!(
                    "Texture {} kept its import-time {}: {}",
                    report.asset(),
                    binding,
                    reason
                );
            }
        }
    }
    !produced.is_empty()
}

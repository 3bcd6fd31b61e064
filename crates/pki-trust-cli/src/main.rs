//! pki-trust CLI: `pki` command.
//!
//! Provisions an admin and organization in a working directory and manages
//! the organization's index of secret references. Every command walks the
//! trust chain from the local admin bootstrap; any broken link is fatal.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};

use pki_trust::time::micros_to_rfc3339;
use pki_trust::{
    parse_tags, provision_admin, provision_organization, AdminConfig, Config, Entity, EntityId,
    FsStorage, Index, OrgConfig, Scope, TrustChainLoader, CONFIG_FILE,
};

// ── CLI structure ─────────────────────────────────────────────────────────────

/// pki-trust CLI: provision a trust chain and manage the organization index.
#[derive(Parser, Debug)]
#[command(
    name = "pki",
    about = "pki-trust CLI",
    version,
    long_about = "pki: pki-trust CLI\n\nProvision an admin and organization, and manage the signed,\nencrypted index of secret references the organization owns."
)]
struct Cli {
    /// Working directory holding pki.io.conf and the stored containers
    #[arg(long, global = true, default_value = ".")]
    dir: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Provision a new admin and organization in the working directory
    Init {
        /// Organization name
        #[arg(long)]
        org: String,

        /// Admin name
        #[arg(long, default_value = "admin")]
        admin: String,
    },

    /// Inspect the organization
    Org {
        #[command(subcommand)]
        subcommand: OrgCommands,
    },

    /// Manage the organization index
    Index {
        #[command(subcommand)]
        subcommand: IndexCommands,
    },
}

#[derive(Subcommand, Debug)]
enum OrgCommands {
    /// Display organization information
    Show {
        /// Load the admin-signed public copy instead of the private one
        #[arg(long)]
        public: bool,
    },
}

#[derive(Subcommand, Debug)]
enum IndexCommands {
    /// Add or replace an entry
    Add {
        /// Logical name (e.g. db-cert)
        name: String,

        /// Secret reference (e.g. blob://abc)
        reference: String,

        /// Comma-separated tags (e.g. prod,db)
        #[arg(long)]
        tags: Option<String>,
    },

    /// Remove an entry
    Remove {
        /// Logical name
        name: String,
    },

    /// Print the reference stored under a name
    Get {
        /// Logical name
        name: String,
    },

    /// List entries
    List {
        /// Only entries carrying this tag
        #[arg(long)]
        tag: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

// ── Main ──────────────────────────────────────────────────────────────────────

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let verbose = cli.verbose;
    let dir = cli.dir;

    let result = match cli.command {
        Commands::Init { org, admin } => cmd_init(&dir, &org, &admin, verbose),
        Commands::Org { subcommand } => match subcommand {
            OrgCommands::Show { public } => cmd_org_show(&dir, public, verbose),
        },
        Commands::Index { subcommand } => match subcommand {
            IndexCommands::Add {
                name,
                reference,
                tags,
            } => cmd_index_add(&dir, &name, &reference, tags.as_deref(), verbose),
            IndexCommands::Remove { name } => cmd_index_remove(&dir, &name, verbose),
            IndexCommands::Get { name } => cmd_index_get(&dir, &name),
            IndexCommands::List { tag, json } => cmd_index_list(&dir, tag.as_deref(), json),
        },
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

// ── Trust chain boundary ──────────────────────────────────────────────────────

fn config_path(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILE)
}

fn load_config(dir: &Path) -> Result<Config> {
    let path = config_path(dir);
    Config::load(&path).with_context(|| format!("could not load config {}", path.display()))
}

/// Storage rooted at `dir`, acting as the primary admin.
fn open_storage(dir: &Path, config: &Config) -> Result<FsStorage> {
    let admin = config.primary_admin().context("could not select admin")?;
    Ok(FsStorage::new(dir, admin.id.clone()))
}

fn load_admin(storage: &FsStorage) -> Result<Entity> {
    TrustChainLoader::new(storage)
        .load_local_admin()
        .context("could not load admin")
}

fn load_organization(
    storage: &FsStorage,
    config: &Config,
    anchor: &Entity,
    scope: Scope,
) -> Result<Entity> {
    let org = TrustChainLoader::new(storage)
        .load_organization(anchor, scope)
        .context("could not load organization")?;
    if org.id() != &config.org.id {
        return Err(anyhow!(
            "organization {} does not match configured organization {}",
            org.id(),
            config.org.id
        ));
    }
    Ok(org)
}

fn load_index(storage: &FsStorage, org: &Entity) -> Result<Index> {
    TrustChainLoader::new(storage)
        .load_index(org)
        .context("could not load index")
}

fn save_index(storage: &FsStorage, org: &Entity, index: &Index) -> Result<()> {
    TrustChainLoader::new(storage)
        .save_index(org, index)
        .context("could not save index")
}

/// Walk the whole chain: config → admin → private organization → index.
fn load_chain(dir: &Path) -> Result<(FsStorage, Entity, Index)> {
    let config = load_config(dir)?;
    let storage = open_storage(dir, &config)?;
    let admin = load_admin(&storage)?;
    let org = load_organization(&storage, &config, &admin, Scope::Private)?;
    let index = load_index(&storage, &org)?;
    Ok((storage, org, index))
}

// ── Command implementations ───────────────────────────────────────────────────

/// `pki init --org NAME [--admin NAME]`
fn cmd_init(dir: &Path, org_name: &str, admin_name: &str, verbose: bool) -> Result<()> {
    let path = config_path(dir);
    if path.exists() {
        return Err(anyhow!("already initialized ({} exists)", path.display()));
    }
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;

    let admin_id = EntityId::generate();
    let storage = FsStorage::new(dir, admin_id.clone());
    let admin = provision_admin(&storage, admin_id, Some(admin_name.to_string()))
        .context("failed to provision admin")?;
    let org = provision_organization(
        &storage,
        &admin,
        EntityId::generate(),
        Some(org_name.to_string()),
    )
    .context("failed to provision organization")?;

    let config = Config::new(
        OrgConfig {
            name: org_name.to_string(),
            id: org.id().clone(),
        },
        AdminConfig {
            name: admin_name.to_string(),
            id: admin.id().clone(),
        },
    );
    config.save(&path).context("failed to save config")?;

    println!("Initialized organization '{org_name}'");
    println!("  Org ID:   {}", org.id());
    println!("  Admin ID: {}", admin.id());
    println!("  Config:   {}", path.display());

    if verbose {
        println!("  Org fingerprint:   {}", org.fingerprint());
        println!("  Admin fingerprint: {}", admin.fingerprint());
    }

    Ok(())
}

/// `pki org show [--public]`
fn cmd_org_show(dir: &Path, public: bool, verbose: bool) -> Result<()> {
    let config = load_config(dir)?;
    let storage = open_storage(dir, &config)?;
    let admin = load_admin(&storage)?;
    let scope = if public { Scope::Public } else { Scope::Private };
    let org = load_organization(&storage, &config, &admin, scope)?;

    println!("Organization: {}", org.name.as_deref().unwrap_or(&config.org.name));
    println!("  ID:          {}", org.id());
    println!("  Role:        {}", org.role());
    println!("  Fingerprint: {}", org.fingerprint());
    println!("  Created:     {}", micros_to_rfc3339(org.created_at));
    println!("  Loaded from: {scope}");
    if let Some(anchor) = org.anchored_by() {
        println!("  Anchored by: {anchor}");
    }

    if verbose {
        println!(
            "  Private keys: {}",
            if org.has_signing_key() { "held" } else { "not held" }
        );
        if org.has_decryption_key() {
            let index = load_index(&storage, &org)?;
            println!("  Index entries: {}", index.len());
        }
    }

    Ok(())
}

/// `pki index add NAME REF [--tags a,b]`
fn cmd_index_add(
    dir: &Path,
    name: &str,
    reference: &str,
    tags: Option<&str>,
    verbose: bool,
) -> Result<()> {
    let (storage, org, mut index) = load_chain(dir)?;

    let previous = index.add_entry(name, reference);
    if let Some(tags) = tags {
        index.add_tags(name, parse_tags(tags))?;
    }
    save_index(&storage, &org, &index)?;

    match previous {
        Some(old) if verbose => println!("Replaced '{name}' ({old} → {reference})"),
        Some(_) => println!("Replaced '{name}'"),
        None => println!("Added '{name}'"),
    }
    Ok(())
}

/// `pki index remove NAME`
fn cmd_index_remove(dir: &Path, name: &str, verbose: bool) -> Result<()> {
    let (storage, org, mut index) = load_chain(dir)?;

    let reference = index.remove_entry(name)?;
    save_index(&storage, &org, &index)?;

    println!("Removed '{name}'");
    if verbose {
        println!("  Reference: {reference}");
    }
    Ok(())
}

/// `pki index get NAME`
fn cmd_index_get(dir: &Path, name: &str) -> Result<()> {
    let (_, _, index) = load_chain(dir)?;
    println!("{}", index.lookup(name)?);
    Ok(())
}

/// `pki index list [--tag TAG] [--json]`
fn cmd_index_list(dir: &Path, tag: Option<&str>, json: bool) -> Result<()> {
    let (_, _, index) = load_chain(dir)?;

    let entries: Vec<(&str, &str)> = match tag {
        Some(tag) => {
            let tag = tag.trim().to_lowercase();
            let names = index.entries_by_tag(&tag);
            index
                .entries()
                .filter(|(name, _)| names.contains(name))
                .collect()
        }
        None => index.entries().collect(),
    };

    if json {
        let rows: Vec<serde_json::Value> = entries
            .iter()
            .map(|(name, reference)| {
                serde_json::json!({
                    "name": name,
                    "reference": reference,
                    "tags": index.tags_for(name),
                })
            })
            .collect();
        let out = serde_json::to_string_pretty(&rows).context("failed to serialize entries")?;
        println!("{out}");
        return Ok(());
    }

    if entries.is_empty() {
        println!("No entries.");
        return Ok(());
    }
    for (name, reference) in entries {
        let tags = index.tags_for(name);
        if tags.is_empty() {
            println!("{name}\t{reference}");
        } else {
            println!("{name}\t{reference}\t[{}]", tags.join(","));
        }
    }
    Ok(())
}

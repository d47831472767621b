use std::path::PathBuf;

use clap::Parser;
use kcp::provider::Provider;

use crate::manifest::Manifest;

mod apply;
mod destroy;
mod import;
mod refresh;
mod schema;

#[derive(Parser)]
pub struct SchemaCommand {
    /// Resource or data source type; all type names are listed when omitted
    pub type_name: Option<String>,
}

#[derive(Parser)]
pub struct ApplyCommand {}

#[derive(Parser)]
pub struct RefreshCommand {}

#[derive(Parser)]
pub struct ImportCommand {
    /// Resource type, e.g. keycloak_group
    pub type_name: String,
    /// Name the resource gets in the state file
    pub name: String,
    /// Import id, e.g. {{realm}}/{{groupId}}
    pub id: String,
}

#[derive(Parser)]
pub struct DestroyCommand {
    /// Only destroy the resource with this `type.name` address
    #[clap(long)]
    pub target: Option<String>,
}

#[derive(Parser)]
pub enum SubCommand {
    /// print resource schemas
    Schema(SchemaCommand),
    /// create, update or replace the resources of the manifest
    Apply(ApplyCommand),
    /// read every resource in state back from Keycloak
    Refresh(RefreshCommand),
    /// adopt an existing Keycloak object into state
    Import(ImportCommand),
    /// delete the resources in state
    Destroy(DestroyCommand),
}

#[derive(Parser)]
#[clap(version)]
pub struct Opts {
    #[clap(short, long)]
    pub quiet: bool,
    /// Manifest with the provider configuration and the resources
    #[clap(short, long, env = "KCP_MANIFEST", default_value = "kcp.json")]
    pub file: PathBuf,
    #[clap(short, long, env = "KCP_STATE", default_value = "kcp.state.json")]
    pub state: PathBuf,
    #[clap(subcommand)]
    pub subcmd: SubCommand,
}

impl Opts {
    pub fn manifest(&self) -> anyhow::Result<Manifest> {
        Manifest::load(&self.file)
    }

    /// Provider configured from the manifest's `provider` block; unset keys
    /// fall back to the `KEYCLOAK_` environment.
    pub async fn provider(&self, manifest: &Manifest) -> anyhow::Result<Provider> {
        let mut provider = Provider::new();
        provider.configure(&manifest.provider).await?;
        Ok(provider)
    }
}

//! # import command
//!
//! Adopts an existing Keycloak object into state under a new name.
//!

use anyhow::bail;

use crate::{
    commands::{ImportCommand, Opts},
    state::State,
};

impl ImportCommand {
    pub async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let address = format!("{}.{}", self.type_name, self.name);
        let mut state = State::load(&opts.state)?;
        if state.get(&address).is_some() {
            bail!("{address} is already managed");
        }
        let manifest = opts.manifest()?;
        let provider = opts.provider(&manifest).await?;
        let data = provider.import(&self.type_name, &self.id).await?;
        tracing::info!("imported {address} with id {}", data.id());
        state.upsert(&self.type_name, &self.name, data);
        state.save(&opts.state)
    }
}

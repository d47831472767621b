//! # refresh command
//!
//! Reads every resource in state back from Keycloak. Objects deleted
//! outside of kcp are dropped from state.
//!

use crate::{
    commands::{Opts, RefreshCommand},
    state::State,
};

impl RefreshCommand {
    pub async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let manifest = opts.manifest()?;
        let provider = opts.provider(&manifest).await?;
        let mut state = State::load(&opts.state)?;
        let mut refreshed = State::default();
        for entry in state.resources.drain(..) {
            let address = entry.address();
            let data = provider.read(&entry.type_name, entry.data).await?;
            if data.is_removed() {
                tracing::warn!("{address} no longer exists, removing it from state");
                continue;
            }
            tracing::info!("refreshed {address}");
            refreshed.upsert(&entry.type_name, &entry.name, data);
        }
        refreshed.save(&opts.state)
    }
}

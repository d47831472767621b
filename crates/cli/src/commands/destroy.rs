//! # destroy command
//!
//! Deletes the resources in state, newest first.
//!

use anyhow::bail;

use crate::{
    commands::{DestroyCommand, Opts},
    state::State,
};

impl DestroyCommand {
    pub async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let manifest = opts.manifest()?;
        let mut state = State::load(&opts.state)?;
        let targets: Vec<_> = state
            .resources
            .iter()
            .rev()
            .filter(|entry| self.target.as_ref().is_none_or(|t| *t == entry.address()))
            .cloned()
            .collect();
        if targets.is_empty() {
            if let Some(target) = &self.target {
                bail!("{target} is not in state");
            }
            tracing::info!("nothing to destroy");
            return Ok(());
        }
        let provider = opts.provider(&manifest).await?;
        for entry in targets {
            let address = entry.address();
            tracing::info!("destroying {address}");
            provider.delete(&entry.type_name, entry.data).await?;
            state.remove(&address);
            state.save(&opts.state)?;
        }
        Ok(())
    }
}

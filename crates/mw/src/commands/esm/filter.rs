use clap::Args;
use miette::Result;
use mw_esm::{load, save, Plugin, TypeFilter, TypeTag};
use std::path::PathBuf;
use tracing::info;

#[derive(Args)]
pub struct FilterArgs {
    /// An input plugin file
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// The output plugin file
    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,

    /// Record types to keep; the header is always kept
    #[arg(short, long, value_name = "TYPE", value_delimiter = ',', required = true)]
    types: Vec<TypeTag>,
}

impl FilterArgs {
    pub fn handle(&self) -> Result<()> {
        let mut plugin = Plugin::new();
        load(
            &mut plugin,
            &self.file,
            &TypeFilter::only(self.types.iter().copied()),
        )?;

        info!(
            "loaded {} records from {}",
            plugin.record_count(),
            self.file.display()
        );

        save(&mut plugin, &self.output)?;
        info!("wrote {}", self.output.display());

        Ok(())
    }
}

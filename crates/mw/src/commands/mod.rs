pub mod esm;

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Handle ESM/ESP plugin files
    Esm {
        #[command(subcommand)]
        command: esm::EsmCommands,
    },
}

impl Commands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            Commands::Esm { command } => command.handle(),
        }
    }
}

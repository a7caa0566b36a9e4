pub mod filter;
pub mod info;
pub mod list;

#[derive(clap::Subcommand)]
pub enum EsmCommands {
    /// Show the header metadata of a plugin file
    Info(info::InfoArgs),
    /// List record types and counts in a plugin file
    List(list::ListArgs),
    /// Copy selected record types into a new plugin file
    Filter(filter::FilterArgs),
}

impl EsmCommands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            EsmCommands::Info(info) => info.handle(),
            EsmCommands::List(list) => list.handle(),
            EsmCommands::Filter(filter) => filter.handle(),
        }
    }
}

use clap::Args;
use miette::Result;
use mw_esm::{load, Plugin, TypeFilter};
use owo_colors::OwoColorize;
use std::path::PathBuf;

#[derive(Args)]
pub struct ListArgs {
    /// An input plugin file
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Print the sub-record tags of every record
    #[arg(long, default_value_t = false)]
    sub_records: bool,
}

impl ListArgs {
    pub fn handle(&self) -> Result<()> {
        let mut plugin = Plugin::new();
        load(&mut plugin, &self.file, &TypeFilter::All)?;

        for tag in plugin.types() {
            let records = plugin.records_by_type(tag);
            println!("{} {}", tag.bold(), records.len());

            if self.sub_records {
                for record in records {
                    let tags: Vec<_> = record
                        .sub_records()
                        .iter()
                        .map(|sub| sub.tag().to_string())
                        .collect();
                    println!("  {}", tags.join(" ").dimmed());
                }
            }
        }

        println!("{} {}", "total:".bold(), plugin.record_count());

        Ok(())
    }
}

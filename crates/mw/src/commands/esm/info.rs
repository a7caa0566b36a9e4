use clap::Args;
use miette::{miette, Result};
use mw_esm::types::{HEADER_META_TAG, HEADER_TAG, RECORD_COUNT_OFFSET};
use mw_esm::{load, FieldKind, Plugin, TypeFilter};
use owo_colors::OwoColorize;
use std::path::PathBuf;

#[derive(Args)]
pub struct InfoArgs {
    /// An input plugin file
    #[arg(value_name = "FILE")]
    file: PathBuf,
}

impl InfoArgs {
    pub fn handle(&self) -> Result<()> {
        let mut plugin = Plugin::new();
        load(&mut plugin, &self.file, &TypeFilter::only([]))?;

        let header = plugin
            .record_by_type(HEADER_TAG, 0)
            .ok_or_else(|| miette!("no header record in {}", self.file.display()))?;
        let meta = header
            .sub_record(HEADER_META_TAG, 0)
            .ok_or_else(|| miette!("header record has no metadata sub-record"))?;

        let version = meta.unpack(FieldKind::Float, 0, 4)?;
        let author = meta.unpack(FieldKind::Str, 8, 32)?;
        let description = meta.unpack(FieldKind::Str, 40, 256)?;
        let declared = meta.unpack(FieldKind::Long, RECORD_COUNT_OFFSET, 4)?;

        println!(
            "{} {}",
            "version:".bold(),
            version.as_float().unwrap_or_default()
        );
        println!(
            "{} {}",
            "author:".bold(),
            author.as_str().unwrap_or_default()
        );
        println!(
            "{} {}",
            "description:".bold(),
            description.as_str().unwrap_or_default()
        );
        println!(
            "{} {} {}",
            "records:".bold(),
            declared.as_long().unwrap_or_default(),
            "(as declared; the stored count is unreliable)".dimmed()
        );

        Ok(())
    }
}

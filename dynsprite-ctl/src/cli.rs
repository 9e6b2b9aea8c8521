use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use dynsprite_core::MarkupStyle;

#[derive(Parser, Debug)]
#[command(name = "dynsprite-ctl")]
#[command(about = "Fetch dialogue sprites, pack inline icons into an atlas and render the dialogue")]
pub struct Cli {
    /// Configuration file (TOML or JSON). Falls back to DYNSPRITE_CONFIG_PATH,
    /// DYNSPRITE_CONFIG_JSON, then dynsprite.toml in the working directory.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Download a manifest's avatars and icons and print the rendered dialogue
    Fetch(FetchArgs),
    /// Print the effective configuration and any guard-rail warnings
    Config,
}

#[derive(Args, Debug, Clone)]
pub struct FetchArgs {
    /// Manifest path or http(s) URL
    pub manifest: String,

    /// Where to write the packed atlas as PNG
    #[arg(long, default_value = "atlas.png")]
    pub atlas_out: PathBuf,

    /// How packed icons appear in rendered text
    #[arg(long, value_enum, default_value = "tag")]
    pub style: StyleArg,

    /// Skip printing the glyph table
    #[arg(long)]
    pub no_glyphs: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StyleArg {
    /// `<sprite name="...">` tags
    Tag,
    /// Private-use characters
    Char,
}

impl From<StyleArg> for MarkupStyle {
    fn from(value: StyleArg) -> Self {
        match value {
            StyleArg::Tag => MarkupStyle::SpriteTag,
            StyleArg::Char => MarkupStyle::CodePoint,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn fetch_defaults() {
        let cli = Cli::parse_from(["dynsprite-ctl", "fetch", "dialogue.json"]);
        let Command::Fetch(args) = cli.command else {
            panic!("expected fetch");
        };
        assert_eq!(args.manifest, "dialogue.json");
        assert_eq!(args.atlas_out, PathBuf::from("atlas.png"));
        assert_eq!(args.style, StyleArg::Tag);
        assert!(!args.no_glyphs);
    }
}

use camino::Utf8PathBuf;
use clap::{ArgAction, Parser};
use extpack_core::DEFAULT_OUTPUT_DIR;

pub const DEFAULT_INFOS_PATH: &str = "__build__/c4che/_cache.py";

#[derive(Parser, Debug)]
#[command(
    name = "extpackdist",
    author,
    version,
    about = "Pack the installed tree of each external package into a reproducible tarball"
)]
pub struct ExtpackCli {
    #[arg(
        short = 'o',
        long = "output",
        value_name = "DIR",
        default_value = DEFAULT_OUTPUT_DIR,
        help = "Output directory for tarballs"
    )]
    pub output: Utf8PathBuf,
    #[arg(long, help = "List packable packages without creating any tarball")]
    pub list: bool,
    #[arg(long, help = "Also assemble one project tarball from the package tarballs")]
    pub pack_all: bool,
    #[arg(
        long,
        value_name = "NAME",
        help = "Project tarball name (defaults to HWAF_BDIST_APPNAME)"
    )]
    pub pack_name: Option<String>,
    #[arg(
        long,
        value_name = "VERSION",
        help = "Project tarball version (defaults to HWAF_BDIST_VERSION)"
    )]
    pub pack_version: Option<String>,
    #[arg(
        long,
        value_name = "FILE",
        env = "EXTPACK_INFOS",
        default_value = DEFAULT_INFOS_PATH,
        help = "waf cache file holding the project infos"
    )]
    pub infos: Utf8PathBuf,
    #[arg(long, help = "Build variant to use instead of the recorded HWAF_VARIANT")]
    pub variant: Option<String>,
    #[arg(long, help = "Print --list output as JSON")]
    pub json: bool,
    #[arg(long, help = "Disable colored output")]
    pub no_color: bool,
    #[arg(short, long, action = ArgAction::Count, help = "Increase logging (-vv reaches trace)")]
    pub verbose: u8,
    #[arg(value_name = "PACKAGE", help = "Only consider these packages")]
    pub packages: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        ExtpackCli::command().debug_assert();
    }

    #[test]
    fn defaults_match_the_packer() {
        let cli = ExtpackCli::try_parse_from(["extpackdist"]).unwrap();
        assert_eq!(cli.output.as_str(), DEFAULT_OUTPUT_DIR);
        assert!(!cli.list && !cli.pack_all);
        assert!(cli.packages.is_empty());
    }

    #[test]
    fn parses_pack_all_flags() {
        let cli = ExtpackCli::try_parse_from([
            "extpackdist",
            "-o",
            "dist",
            "--pack-all",
            "--pack-name",
            "mana",
            "--pack-version",
            "1.0",
            "-vv",
            "boost",
            "zlib",
        ])
        .unwrap();
        assert_eq!(cli.output.as_str(), "dist");
        assert!(cli.pack_all);
        assert_eq!(cli.pack_name.as_deref(), Some("mana"));
        assert_eq!(cli.pack_version.as_deref(), Some("1.0"));
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.packages, vec!["boost", "zlib"]);
    }
}

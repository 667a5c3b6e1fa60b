use clap::Parser;
use std::io;
use tracing::Level;

use crate::cli::run::{argument_lines, Runner, StdinLines};
use crate::cve::CveFetcher;
use crate::settings::Settings;

pub mod run;

#[derive(Parser, Debug)]
#[command(name = "cvecat")]
#[command(about = "Fetch CVE records and render them through a template")]
#[command(version)]
pub struct Cli {
    /// CVE identifiers (CVE-YYYY-NNNN, YYYY-NNNN or NNNN), read from stdin
    /// when none are given. `-` reads a record body from stdin.
    pub cve: Vec<String>,
    /// Do not download
    #[arg(long)]
    pub dryrun: bool,
    /// Output template [env: CVECAT_FORMAT]
    #[arg(long)]
    pub format: Option<String>,
    /// Enable debug messages (0-4) [env: CVECAT_VERBOSE]
    #[arg(long)]
    pub verbose: Option<u8>,
    /// Base URL of the CVE record repository [env: CVECAT_BASE_URL]
    #[arg(long = "url", value_name = "URL")]
    pub base_url: Option<String>,
}

impl Cli {
    /// Layers command-line flags over settings resolved from the environment.
    pub fn apply(&self, mut settings: Settings) -> Settings {
        if let Some(format) = &self.format {
            settings.format = format.clone();
        }
        if let Some(verbose) = self.verbose {
            settings.verbose = verbose;
        }
        if let Some(base_url) = &self.base_url {
            settings.base_url = base_url.clone();
        }
        settings.dryrun |= self.dryrun;
        settings
    }
}

/// Maximum log level for a verbosity setting.
pub fn log_level(verbose: u8) -> Level {
    match verbose {
        0 | 1 => Level::WARN,
        2 => Level::INFO,
        3 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

pub fn run_cli(cli: Cli, settings: Settings) -> crate::Result<()> {
    let runner = Runner::new(CveFetcher::new()?, settings);
    let mut stdout = io::stdout().lock();

    if cli.cve.is_empty() {
        runner.run(StdinLines, &mut stdout);
    } else {
        runner.run(argument_lines(&cli.cve), &mut stdout);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_settings() {
        let cli = Cli::parse_from([
            "cvecat",
            "--format",
            "{{.url}}",
            "--verbose",
            "3",
            "--dryrun",
            "CVE-2019-5007",
            "-",
        ]);
        assert_eq!(cli.cve, vec!["CVE-2019-5007", "-"]);

        let settings = cli.apply(Settings::default());
        assert_eq!(settings.format, "{{.url}}");
        assert_eq!(settings.verbose, 3);
        assert!(settings.dryrun);
        assert_eq!(settings.base_url, Settings::default().base_url);
    }

    #[test]
    fn test_unset_flags_keep_settings() {
        let cli = Cli::parse_from(["cvecat"]);
        let env = Settings {
            verbose: 2,
            dryrun: true,
            ..Settings::default()
        };
        assert_eq!(cli.apply(env.clone()), env);
    }

    #[test]
    fn test_log_level() {
        assert_eq!(log_level(0), Level::WARN);
        assert_eq!(log_level(2), Level::INFO);
        assert_eq!(log_level(9), Level::TRACE);
    }
}

use crate::config::DEFAULT_STYLE;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Clone, Debug)]
#[command(name = "xob")]
#[command(about = "Lightweight overlay bar for the X Window System")]
#[command(after_help = "Values are read from standard input: an integer per token, \
    followed by '!' to use the alternative colors.")]
pub struct Args {
    /// Value shown as a full bar
    #[arg(short = 'm', value_name = "MAX", default_value_t = 100,
          value_parser = clap::value_parser!(u32).range(1..))]
    pub cap: u32,

    /// Hide the bar after this many milliseconds without input (0 = never)
    #[arg(short = 't', value_name = "MILLISECONDS", default_value_t = 1000)]
    pub timeout: u64,

    /// Configuration file to read instead of the default locations
    #[arg(short = 'c', value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Style to use from the configuration file
    #[arg(short = 's', value_name = "STYLE", default_value = DEFAULT_STYLE)]
    pub style: String,

    /// Do not report updates on standard output
    #[arg(short = 'q')]
    pub quiet: bool,

    /// Print the version and exit
    #[arg(short = 'v')]
    pub version: bool,
}

impl Args {
    pub fn hide_after(&self) -> Option<Duration> {
        (self.timeout > 0).then(|| Duration::from_millis(self.timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use clap::error::ErrorKind;

    #[test]
    fn command_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["xob"]).unwrap();
        assert_eq!(args.cap, 100);
        assert_eq!(args.timeout, 1000);
        assert_eq!(args.style, "default");
        assert_eq!(args.config, None);
        assert!(!args.quiet && !args.version);
        assert_eq!(args.hide_after(), Some(Duration::from_secs(1)));
    }

    #[test]
    fn every_flag_is_accepted() {
        let args = Args::try_parse_from([
            "xob", "-m", "50", "-t", "0", "-c", "/tmp/xob.toml", "-s", "dark", "-q", "-v",
        ])
        .unwrap();
        assert_eq!(args.cap, 50);
        assert_eq!(args.hide_after(), None);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/xob.toml")));
        assert_eq!(args.style, "dark");
        assert!(args.quiet && args.version);
    }

    #[test]
    fn invalid_values_are_usage_errors() {
        for argv in [
            &["xob", "-m", "0"][..],
            &["xob", "-m", "-4"],
            &["xob", "-t", "soon"],
            &["xob", "--volume"],
            &["xob", "stray"],
        ] {
            let err = Args::try_parse_from(argv).unwrap_err();
            assert_ne!(err.kind(), ErrorKind::DisplayHelp, "{argv:?}");
            assert_eq!(err.exit_code(), 2, "{argv:?}");
        }
    }
}

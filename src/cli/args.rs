use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "hijra", version, author, about = "Offline-first prayer log with background sync")]
pub struct Cli {
    /// User id (overrides the configured one)
    #[arg(long, global = true)]
    pub user: Option<String>,

    /// Work offline: never contact the remote store
    #[arg(long, global = true)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show a day's prayers (today by default)
    Show {
        /// Date as YYYY-MM-DD
        #[arg(long)]
        date: Option<String>,
    },
    /// Advance a prayer through on time → late → missed → no entry
    Mark {
        /// Prayer name (fajr, dhuhr, asr, maghrib, isha)
        prayer: String,
        /// Date as YYYY-MM-DD
        #[arg(long)]
        date: Option<String>,
        /// Number of steps to advance
        #[arg(long, default_value = "1")]
        times: u8,
    },
    /// Push all unsynced days now
    Sync,
    /// List days waiting to be synced
    Pending,
    /// Show streaks and weekly completion
    Stats,
    /// Show a completion grid for recent days
    Heatmap {
        /// Number of days to show (1-366)
        #[arg(long, value_parser = clap::value_parser!(u16).range(1..=366))]
        days: Option<u16>,
    },
    /// Save default settings (`--user` sets the default user id)
    Config {
        /// Start online (true) or offline (false)
        #[arg(long)]
        online: Option<bool>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heatmap_days_must_be_in_range() {
        let cli = Cli::try_parse_from(["hijra", "heatmap", "--days", "30"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Heatmap { days: Some(30) })));

        assert!(Cli::try_parse_from(["hijra", "heatmap", "--days", "0"]).is_err());
        assert!(Cli::try_parse_from(["hijra", "heatmap", "--days", "367"]).is_err());
        assert!(Cli::try_parse_from(["hijra", "heatmap", "--days", "99999999999"]).is_err());
    }

    #[test]
    fn bare_invocation_and_config_parse() {
        let cli = Cli::try_parse_from(["hijra"]).unwrap();
        assert!(cli.command.is_none());

        let cli = Cli::try_parse_from(["hijra", "config", "--user", "u1", "--online", "false"]).unwrap();
        assert_eq!(cli.user.as_deref(), Some("u1"));
        match cli.command {
            Some(Commands::Config { online }) => assert_eq!(online, Some(false)),
            other => panic!("expected config, got {:?}", other),
        }
    }
}

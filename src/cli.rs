use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::pipeline::settings::JamSettings;
use crate::shared::{Genre, Instrument, Locality, MAX_BPM, MIN_BPM};

/// Live backing band that follows the key you play in.
#[derive(Debug, Parser)]
#[command(name = "jampilot", version, about)]
pub struct Cli {
    /// Config file (default: the platform config dir)
    #[arg(long, global = true, env = "JAMPILOT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Where settings, logs and recordings live
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Open the stage (default)
    Jam(JamArgs),
    /// Print stored sessions, most recent first
    List,
    /// Play back a stored session's recording
    Play { id: String },
    /// Delete a stored session and its audio
    Delete { id: String },
    /// Print the genre table, or one genre
    Genres { name: Option<String> },
}

#[derive(Debug, Clone, Default, Args)]
pub struct JamArgs {
    #[arg(long, value_enum)]
    pub genre: Option<Genre>,
    #[arg(long, value_enum)]
    pub instrument: Option<Instrument>,
    #[arg(long, value_enum)]
    pub locality: Option<Locality>,
    #[arg(long, value_parser = clap::value_parser!(u16).range(MIN_BPM as i64..=MAX_BPM as i64))]
    pub bpm: Option<u16>,
}

impl JamArgs {
    /// Flags win over the saved selection.
    pub fn apply(&self, mut settings: JamSettings) -> JamSettings {
        if let Some(g) = self.genre {
            settings.genre = g;
        }
        if let Some(i) = self.instrument {
            settings.instrument = i;
        }
        if let Some(l) = self.locality {
            settings.locality = l;
        }
        if let Some(bpm) = self.bpm {
            settings = settings.with_bpm(bpm);
        }
        settings
    }
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or_else(|| Command::Jam(JamArgs::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_jam() {
        let cli = Cli::try_parse_from(["jampilot"]).unwrap();
        assert!(matches!(cli.command(), Command::Jam(_)));
    }

    #[test]
    fn jam_flags_override_settings() {
        let cli = Cli::try_parse_from([
            "jampilot", "jam", "--genre", "amapiano", "--instrument", "full_band",
            "--locality", "south_africa", "--bpm", "112",
        ])
        .unwrap();
        let Command::Jam(args) = cli.command() else { panic!("expected jam") };
        let s = args.apply(JamSettings::default().with_bpm(90));
        assert_eq!(s.genre, Genre::Amapiano);
        assert_eq!(s.instrument, Instrument::FullBand);
        assert_eq!(s.locality, Locality::SouthAfrica);
        assert_eq!(s.bpm, 112);
    }

    #[test]
    fn bpm_outside_range_is_rejected() {
        assert!(Cli::try_parse_from(["jampilot", "jam", "--bpm", "200"]).is_err());
        assert!(Cli::try_parse_from(["jampilot", "jam", "--genre", "polka"]).is_err());
    }

    #[test]
    fn genres_takes_an_optional_name() {
        let cli = Cli::try_parse_from(["jampilot", "genres", "jazz"]).unwrap();
        assert!(matches!(cli.command(), Command::Genres { name: Some(n) } if n == "jazz"));
    }

    #[test]
    fn play_takes_an_id() {
        let cli = Cli::try_parse_from(["jampilot", "play", "rec_42"]).unwrap();
        assert!(matches!(cli.command(), Command::Play { id } if id == "rec_42"));
        assert!(Cli::try_parse_from(["jampilot", "play"]).is_err());
    }

    #[test]
    fn global_flags_and_delete() {
        let cli = Cli::try_parse_from(["jampilot", "delete", "rec_1", "--data-dir", "/tmp/j"]).unwrap();
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/j")));
        assert!(matches!(cli.command(), Command::Delete { id } if id == "rec_1"));
    }
}

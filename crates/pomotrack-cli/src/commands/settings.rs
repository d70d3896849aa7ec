use clap::Subcommand;
use pomotrack_core::{AppConfig, SettingsPatch};

use super::{open_tracker, print_json, CmdResult};

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Print the user's settings as JSON
    Show,
    /// Update one or more settings; omitted fields keep their value
    Set {
        /// Work duration in minutes (1-60)
        #[arg(long, allow_negative_numbers = true)]
        work: Option<i64>,
        /// Short break duration in minutes (1-30)
        #[arg(long = "break", allow_negative_numbers = true)]
        short_break: Option<i64>,
        /// Long break duration in minutes (1-60)
        #[arg(long, allow_negative_numbers = true)]
        long_break: Option<i64>,
        /// Work intervals before a long break (1-10)
        #[arg(long, allow_negative_numbers = true)]
        cycles: Option<i64>,
        #[arg(long)]
        notifications: Option<bool>,
        #[arg(long)]
        sound: Option<bool>,
    },
}

pub fn run(action: SettingsAction, user: &str, config: &AppConfig) -> CmdResult {
    let tracker = open_tracker(config)?;

    match action {
        SettingsAction::Show => print_json(&tracker.settings(user)?),
        SettingsAction::Set {
            work,
            short_break,
            long_break,
            cycles,
            notifications,
            sound,
        } => {
            let patch = SettingsPatch {
                work_duration: work,
                break_duration: short_break,
                long_break_duration: long_break,
                cycles_until_long_break: cycles,
                notifications,
                sound,
            };
            if patch.is_empty() {
                return Err("nothing to update; pass at least one setting".into());
            }
            print_json(&tracker.update_settings(user, &patch)?)
        }
    }
}

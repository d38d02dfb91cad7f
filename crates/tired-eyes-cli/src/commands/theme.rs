use clap::Args;
use tired_eyes_core::{SettingsStore, SystemAppearance, ThemeResolver};

use super::CommandResult;
use crate::shell::{SystemTheme, SystemThemeFlag};

#[derive(Args)]
pub struct ThemeArgs {
    /// Current OS appearance
    #[arg(long, value_enum, env = "TIRED_EYES_SYSTEM_THEME")]
    system_theme: Option<SystemTheme>,

    /// Print preference and result as JSON
    #[arg(long)]
    json: bool,
}

pub fn run(args: ThemeArgs) -> CommandResult {
    let settings = SettingsStore::open_default().read();
    let system_is_dark = SystemThemeFlag(args.system_theme).is_dark();
    let resolver = ThemeResolver::new(settings.theme, system_is_dark);

    if args.json {
        let out = serde_json::json!({
            "preference": resolver.preference(),
            "systemIsDark": system_is_dark,
            "appearance": resolver.current(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{}", resolver.current());
    }
    Ok(())
}

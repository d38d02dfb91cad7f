use clap::ValueEnum;
use tired_eyes_core::SystemAppearance;

/// OS appearance as reported on the command line. A terminal cannot ask the
/// desktop for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SystemTheme {
    Light,
    Dark,
}

impl SystemTheme {
    pub fn is_dark(self) -> bool {
        self == SystemTheme::Dark
    }

    pub fn parse(value: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(value.trim(), true).ok()
    }
}

/// `--system-theme` (or `TIRED_EYES_SYSTEM_THEME`); light when unset.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemThemeFlag(pub Option<SystemTheme>);

impl SystemAppearance for SystemThemeFlag {
    fn is_dark(&self) -> bool {
        self.0.is_some_and(SystemTheme::is_dark)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_flag_reads_as_light() {
        assert!(!SystemThemeFlag::default().is_dark());
        assert!(SystemThemeFlag(Some(SystemTheme::Dark)).is_dark());
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(SystemTheme::parse(" Dark"), Some(SystemTheme::Dark));
        assert_eq!(SystemTheme::parse("light"), Some(SystemTheme::Light));
        assert_eq!(SystemTheme::parse("sepia"), None);
    }
}

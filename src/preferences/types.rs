use crate::Error;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    /// OS colour-scheme preference, from a GTK theme name such as
    /// `Adwaita:dark`. `None` when nothing is set.
    pub fn from_system(gtk_theme: Option<&str>) -> Option<Self> {
        let name = gtk_theme?.trim();
        if name.is_empty() {
            return None;
        }
        if name.to_ascii_lowercase().ends_with(":dark") {
            Some(Self::Dark)
        } else {
            Some(Self::Light)
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(Error::validation(format!(
                "Unknown theme '{other}', expected 'light' or 'dark'"
            ))),
        }
    }
}

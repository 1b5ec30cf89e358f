use std::fmt;
use std::str::FromStr;

use crate::error::NearCliError;

pub const DEFAULT_LEDGER_PATH: &str = "44'/397'/0'/0'/1'";

const HARDENED_OFFSET: u32 = 0x8000_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathComponent {
    pub index: u32,
    pub hardened: bool,
}

impl PathComponent {
    /// Index as encoded for the device, hardened bit included.
    pub fn raw(&self) -> u32 {
        if self.hardened {
            self.index | HARDENED_OFFSET
        } else {
            self.index
        }
    }
}

/// BIP32-style derivation path, e.g. `44'/397'/0'/0'/1'`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HdPath(Vec<PathComponent>);

impl HdPath {
    pub fn components(&self) -> &[PathComponent] {
        &self.0
    }
}

impl Default for HdPath {
    fn default() -> Self {
        HdPath(vec![
            PathComponent { index: 44, hardened: true },
            PathComponent { index: 397, hardened: true },
            PathComponent { index: 0, hardened: true },
            PathComponent { index: 0, hardened: true },
            PathComponent { index: 1, hardened: true },
        ])
    }
}

impl FromStr for HdPath {
    type Err = NearCliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches("m/");
        if trimmed.is_empty() {
            return Err(NearCliError::InvalidHdPath("empty path".to_string()));
        }

        let mut components = Vec::new();
        for part in trimmed.split('/') {
            let (digits, hardened) = match part.strip_suffix('\'').or_else(|| part.strip_suffix('h')) {
                Some(d) => (d, true),
                None => (part, false),
            };
            let index: u32 = digits
                .parse()
                .map_err(|_| NearCliError::InvalidHdPath(format!("bad component '{}' in {}", part, s)))?;
            if index >= HARDENED_OFFSET {
                return Err(NearCliError::InvalidHdPath(format!("index {} out of range in {}", index, s)));
            }
            components.push(PathComponent { index, hardened });
        }
        Ok(HdPath(components))
    }
}

impl fmt::Display for HdPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|c| if c.hardened { format!("{}'", c.index) } else { c.index.to_string() })
            .collect();
        write!(f, "{}", parts.join("/"))
    }
}

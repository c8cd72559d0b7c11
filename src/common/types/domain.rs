/*
 * This file is part of the Obvia ERP.
 *
 * Copyright (C) 2025 Kovács Dávid <kapcsolat@kovacsdavid.dev>
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published
 * by the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */
use regex::Regex;
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;

/// A fully-qualified custom domain a tenant wants the platform to serve
/// (e.g. `permits.springfield.gov`). Stored lowercase, without a trailing
/// dot, always containing at least one label separator.
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub struct Domain(String);

impl Domain {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_valid_domain(s: &str) -> bool {
    let re = Regex::new(
        r"^(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,63}$",
    )
    .unwrap();
    s.len() <= 253 && re.is_match(s)
}

impl FromStr for Domain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().trim_end_matches('.').to_lowercase();
        if is_valid_domain(&normalized) {
            Ok(Domain(normalized))
        } else {
            Err(format!("'{s}' is not a valid domain name"))
        }
    }
}

impl TryFrom<String> for Domain {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl<'de> Deserialize<'de> for Domain {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_subdomain() {
        let domain: Domain = "permits.springfield.gov".parse().unwrap();
        assert_eq!(domain.as_str(), "permits.springfield.gov");
    }

    #[test]
    fn strips_trailing_dot_and_lowercases() {
        let domain: Domain = "Permits.Springfield.GOV.".parse().unwrap();
        assert_eq!(domain.as_str(), "permits.springfield.gov");
    }

    #[test]
    fn rejects_bare_label() {
        assert!("springfield".parse::<Domain>().is_err());
    }
}

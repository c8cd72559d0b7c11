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

/// A tenant slug: lowercase ascii, digits and hyphens, 3-63 chars, never
/// starting or ending with a hyphen. Used as the default host label
/// (`{slug}.{base_domain}`).
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub struct Slug(String);

impl Slug {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_valid_slug(s: &str) -> bool {
    let re = Regex::new(r"^[a-z0-9]([a-z0-9-]{1,61}[a-z0-9])?$").unwrap();
    (3..=63).contains(&s.len()) && re.is_match(s)
}

impl FromStr for Slug {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        if is_valid_slug(&normalized) {
            Ok(Slug(normalized))
        } else {
            Err(format!("'{s}' is not a valid tenant slug"))
        }
    }
}

impl TryFrom<String> for Slug {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl<'de> Deserialize<'de> for Slug {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_lowercase_hyphenated_slug() {
        let slug: Slug = "springfield-parks".parse().unwrap();
        assert_eq!(slug.as_str(), "springfield-parks");
    }

    #[test]
    fn normalizes_case() {
        let slug: Slug = "Springfield".parse().unwrap();
        assert_eq!(slug.as_str(), "springfield");
    }

    #[test]
    fn rejects_leading_hyphen() {
        assert!("-springfield".parse::<Slug>().is_err());
    }

    #[test]
    fn rejects_too_short() {
        assert!("ab".parse::<Slug>().is_err());
    }
}

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
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use sqlx::Type;
use std::fmt;

/// A JSON object value (`contact`, `theme`, `settings`) that rejects a
/// top-level `null` or a non-object payload at construction, the same
/// invariant-at-the-boundary the teacher applies to its scalar value
/// objects, generalized here to a map shape.
#[derive(Debug, Clone, PartialEq, Serialize, Type)]
#[sqlx(transparent)]
pub struct JsonObject(Value);

impl JsonObject {
    pub fn empty() -> Self {
        JsonObject(Value::Object(Map::new()))
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

impl TryFrom<Value> for JsonObject {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        if value.is_object() {
            Ok(JsonObject(value))
        } else {
            Err("expected a JSON object".to_string())
        }
    }
}

impl<'de> Deserialize<'de> for JsonObject {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        JsonObject::try_from(value).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for JsonObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for JsonObject {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_object() {
        let obj = JsonObject::try_from(json!({"phone": "555-0100"})).unwrap();
        assert!(obj.as_value().is_object());
    }

    #[test]
    fn rejects_top_level_null() {
        assert!(JsonObject::try_from(Value::Null).is_err());
    }

    #[test]
    fn rejects_array() {
        assert!(JsonObject::try_from(json!([1, 2, 3])).is_err());
    }
}

// Copyright 2022 Webb Technologies Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use serde::{Deserialize, Serialize};

/// A secret string (API key, RPC password, envelope key, ...).
///
/// In the config it is either the literal value or `$ENV_VAR`, in which case
/// the value is read from the environment. It never shows up in `Debug`
/// output and serializes as an empty string.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretString(String);

impl SecretString {
    /// Exposes the secret value.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SecretString").finish()
    }
}

impl From<String> for SecretString {
    fn from(secret: String) -> Self {
        SecretString(secret)
    }
}

impl From<&str> for SecretString {
    fn from(secret: &str) -> Self {
        SecretString(secret.to_owned())
    }
}

impl Serialize for SecretString {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str("")
    }
}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct SecretStringVisitor;
        impl<'de> serde::de::Visitor<'de> for SecretStringVisitor {
            type Value = String;

            fn expecting(
                &self,
                formatter: &mut std::fmt::Formatter,
            ) -> std::fmt::Result {
                formatter.write_str(
                    "a secret string or an env var containing the secret in it",
                )
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                if let Some(var) = value.strip_prefix('$') {
                    tracing::trace!("Reading {} from env", var);
                    let val = std::env::var(var).map_err(|e| {
                        serde::de::Error::custom(format!(
                            "error while loading this env {var}: {e}",
                        ))
                    })?;
                    return Ok(val);
                }
                Ok(value.to_string())
            }
        }

        let secret = deserializer.deserialize_str(SecretStringVisitor)?;
        Ok(Self(secret))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_from_env_and_hides_value() {
        std::env::set_var("BRIDGE_TEST_SECRET_READ", "hunter2");
        let s: SecretString =
            serde_json::from_str(r#""$BRIDGE_TEST_SECRET_READ""#).unwrap();
        assert_eq!(s.expose(), "hunter2");
        assert_eq!(format!("{s:?}"), "SecretString");
        assert_eq!(serde_json::to_string(&s).unwrap(), r#""""#);

        let s: SecretString = serde_json::from_str(r#""plain""#).unwrap();
        assert_eq!(s.expose(), "plain");
    }

    #[test]
    fn missing_env_var_is_an_error() {
        let r: Result<SecretString, _> =
            serde_json::from_str(r#""$BRIDGE_TEST_SECRET_SURELY_UNSET""#);
        assert!(r.is_err());
    }
}

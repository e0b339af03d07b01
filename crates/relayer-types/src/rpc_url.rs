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

/// A URL wrapper around [`url::Url`] used for every remote endpoint (source
/// chain node, verifier, destination node) so it can be read from environment
/// variables with the `$VAR` syntax.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct RpcUrl(url::Url);

impl RpcUrl {
    /// Returns the inner [`url::Url`].
    pub fn as_url(&self) -> &url::Url {
        &self.0
    }

    /// Appends `path` to this URL, keeping whatever path it already has.
    ///
    /// `http://node/api/` and `http://node/api` both give
    /// `http://node/api/<path>`.
    pub fn endpoint(&self, path: &str) -> Result<url::Url, url::ParseError> {
        let base = self.0.as_str().trim_end_matches('/');
        url::Url::parse(&format!("{base}/{}", path.trim_start_matches('/')))
    }
}

impl std::fmt::Display for RpcUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Display the inner url, not the wrapper.
        // with all the parts, scheme, host, port, path, query, fragment.
        let scheme = self.0.scheme();
        write!(f, "{scheme}")?;
        if let Some(host) = self.0.host_str() {
            write!(f, "://{host}")?;
        }
        if let Some(port) = self.0.port_or_known_default() {
            write!(f, ":{port}")?;
        }
        write!(f, "{}", self.0.path())?;

        if let Some(query) = self.0.query() {
            write!(f, "?{query}")?;
        }
        if let Some(fragment) = self.0.fragment() {
            write!(f, "#{fragment}")?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for RpcUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")?;
        Ok(())
    }
}

impl From<RpcUrl> for url::Url {
    fn from(rpc_url: RpcUrl) -> Self {
        rpc_url.0
    }
}

impl From<url::Url> for RpcUrl {
    fn from(url: url::Url) -> Self {
        RpcUrl(url)
    }
}

impl std::ops::Deref for RpcUrl {
    type Target = url::Url;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<'de> Deserialize<'de> for RpcUrl {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct RpcUrlVistor;
        impl<'de> serde::de::Visitor<'de> for RpcUrlVistor {
            type Value = url::Url;

            fn expecting(
                &self,
                formatter: &mut std::fmt::Formatter,
            ) -> std::fmt::Result {
                formatter.write_str(
                    "rpc url string or an env var containing a rpc url string in it",
                )
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                let raw = match value.strip_prefix('$') {
                    Some(var) => {
                        tracing::trace!("Reading {} from env", var);
                        std::env::var(var).map_err(|e| {
                            serde::de::Error::custom(format!(
                                "error while loading this env {var}: {e}",
                            ))
                        })?
                    }
                    None => value.to_string(),
                };
                url::Url::parse(&raw)
                    .map_err(|e| serde::de::Error::custom(format!("{e:?}")))
            }
        }

        let rpc_url = deserializer.deserialize_str(RpcUrlVistor)?;
        Ok(Self(rpc_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_literal_and_env_urls() {
        let u: RpcUrl =
            serde_json::from_str(r#""http://127.0.0.1:8332""#).unwrap();
        assert_eq!(u.port(), Some(8332));

        std::env::set_var("BRIDGE_TEST_RPC_URL", "https://verifier.local/api");
        let u: RpcUrl =
            serde_json::from_str(r#""$BRIDGE_TEST_RPC_URL""#).unwrap();
        assert_eq!(u.to_string(), "https://verifier.local:443/api");

        let bad: Result<RpcUrl, _> = serde_json::from_str(r#""not a url""#);
        assert!(bad.is_err());
    }

    #[test]
    fn endpoint_appends_to_the_base_path() {
        let u: RpcUrl =
            url::Url::parse("http://node.local/api/").unwrap().into();
        assert_eq!(
            u.endpoint("/bridge/submit").unwrap().as_str(),
            "http://node.local/api/bridge/submit"
        );
        let u: RpcUrl = url::Url::parse("http://node.local").unwrap().into();
        assert_eq!(u.endpoint("verify").unwrap().as_str(), "http://node.local/verify");
    }
}

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

use std::sync::Arc;

use bridge_chain_client::{JsonRpcChainClient, SourceChainClient};
use bridge_proof_verifiers::{
    LocalStubVerifier, ProofVerifier, RemoteProofVerifier,
};
use bridge_relay_engine::{BackendFactory, RelayBackends};
use bridge_relayer_utils::{Error, Result};
use bridge_submitters::{DestinationSubmitter, HttpSubmitter};

use crate::{millis, RelayerContext};

/// Builds relayer backends from a [`RelayerContext`].
///
/// With real clients the source chain is read over JSON-RPC and events are
/// submitted over HTTP. Otherwise the context's in-memory chain and mocked
/// submitter are used. The verifier only depends on `verifier.url`.
#[derive(Debug, Clone)]
pub struct ContextBackends {
    ctx: RelayerContext,
    use_real_clients: bool,
}

impl ContextBackends {
    /// Creates a new factory.
    pub fn new(ctx: RelayerContext, use_real_clients: bool) -> Self {
        Self {
            ctx,
            use_real_clients,
        }
    }

    fn chain(&self) -> Result<Arc<dyn SourceChainClient>> {
        if !self.use_real_clients {
            return Ok(Arc::new(self.ctx.simulated_chain().clone()));
        }
        let source = &self.ctx.config.source;
        let url = source
            .rpc_url
            .clone()
            .ok_or(Error::MissingConfig("source.rpc-url"))?;
        let client = JsonRpcChainClient::new(
            url,
            source.rpc_user.clone(),
            source.rpc_password.clone(),
            millis(source.request_timeout),
        )?;
        Ok(Arc::new(client))
    }

    fn submitter(&self) -> Result<Arc<dyn DestinationSubmitter>> {
        if !self.use_real_clients {
            return Ok(Arc::new(self.ctx.mocked_submitter().clone()));
        }
        let destination = &self.ctx.config.destination;
        let url = destination
            .node_url
            .as_ref()
            .ok_or(Error::MissingConfig("destination.node-url"))?;
        let submitter = HttpSubmitter::new(
            url,
            destination.bridge_program_id.clone(),
            destination.api_key.clone(),
            millis(destination.request_timeout),
        )?;
        Ok(Arc::new(submitter))
    }

    fn verifier(&self) -> Result<Arc<dyn ProofVerifier>> {
        let config = &self.ctx.config.verifier;
        match &config.url {
            Some(url) => Ok(Arc::new(RemoteProofVerifier::new(
                url,
                millis(config.request_timeout),
            )?)),
            None => {
                tracing::warn!(
                    "!!WARNING!!: No verifier configured, falling back to the \
                     LOCAL STUB verifier which accepts any 0x proof"
                );
                Ok(Arc::new(LocalStubVerifier::new()))
            }
        }
    }
}

#[async_trait::async_trait]
impl BackendFactory for ContextBackends {
    #[tracing::instrument(skip_all, fields(use_real_clients = self.use_real_clients))]
    async fn build(&self) -> Result<RelayBackends> {
        self.ctx.config.verify(self.use_real_clients)?;
        let backends = RelayBackends {
            chain: self.chain()?,
            verifier: self.verifier()?,
            submitter: self.submitter()?,
            store: self.ctx.store(),
        };
        tracing::debug!(
            chain = ?backends.chain,
            submitter = ?backends.submitter,
            "Relayer backends ready"
        );
        Ok(backends)
    }
}

#[cfg(test)]
mod tests {
    use bridge_relayer_config::BridgeRelayerConfig;
    use bridge_relayer_store::InMemoryStore;

    use super::*;

    fn context(config: BridgeRelayerConfig) -> RelayerContext {
        RelayerContext::new(config, InMemoryStore::default()).unwrap()
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn simulation_uses_stub_and_mocks() {
        let ctx = context(BridgeRelayerConfig::default());
        let backends = ctx.backend_factory(false).build().await.unwrap();
        assert!(!backends.verifier.is_production_grade());
        assert!(logs_contain("LOCAL STUB"));

        ctx.simulated_chain().push_empty_blocks(3);
        assert_eq!(backends.chain.current_height().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn real_clients_need_urls() {
        let ctx = context(BridgeRelayerConfig::default());
        let err = ctx.backend_factory(true).build().await.unwrap_err();
        assert!(matches!(err, Error::MissingConfig("source.rpc-url")));
    }

    #[tokio::test]
    async fn real_clients_with_verifier() {
        let mut config = BridgeRelayerConfig::default();
        config.source.rpc_url =
            Some(rpc_url("http://127.0.0.1:18232"));
        config.destination.node_url =
            Some(rpc_url("http://127.0.0.1:57291"));
        config.verifier.url = Some(rpc_url("http://127.0.0.1:8081"));
        let backends =
            context(config).backend_factory(true).build().await.unwrap();
        assert!(backends.verifier.is_production_grade());
        assert!(format!("{:?}", backends.chain).contains("JsonRpcChainClient"));
        assert!(format!("{:?}", backends.submitter).contains("HttpSubmitter"));
    }

    fn rpc_url(url: &str) -> bridge_relayer_types::RpcUrl {
        url::Url::parse(url).unwrap().into()
    }
}

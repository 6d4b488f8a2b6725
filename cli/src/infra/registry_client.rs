//! HTTP implementation of the `ManifestRegistry` port.
//!
//! `PUT <base>/manifests/<name>/<version>` uploads the YAML source;
//! `GET <base>/manifests/<id>` downloads it.

use std::io::Read;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::application::ports::{ManifestRegistry, PublishReceipt};

/// Downloads larger than this are refused.
const MAX_DOCUMENT_BYTES: u64 = 1024 * 1024;
const TIMEOUT: Duration = Duration::from_secs(30);

/// Registry client over plain HTTP(S).
pub struct HttpManifestRegistry {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpManifestRegistry {
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent: ureq::AgentBuilder::new()
                .timeout(TIMEOUT)
                .user_agent(concat!("agentport/", env!("CARGO_PKG_VERSION")))
                .build(),
        }
    }

    fn url(&self, tail: &str) -> String {
        format!("{}/manifests/{tail}", self.base_url)
    }
}

/// Turns a non-2xx response into a readable error.
fn describe(err: ureq::Error, what: &str) -> anyhow::Error {
    match err {
        ureq::Error::Status(404, _) => anyhow::anyhow!("{what}: not found in the registry"),
        ureq::Error::Status(code, response) => {
            let body = response.into_string().unwrap_or_default();
            let body = body.trim();
            if body.is_empty() {
                anyhow::anyhow!("{what}: registry answered HTTP {code}")
            } else {
                anyhow::anyhow!("{what}: registry answered HTTP {code}: {body}")
            }
        }
        ureq::Error::Transport(t) => anyhow::anyhow!("{what}: {t}"),
    }
}

impl ManifestRegistry for HttpManifestRegistry {
    fn publish(&self, name: &str, version: &str, document: &str) -> Result<PublishReceipt> {
        let url = self.url(&format!("{name}/{version}"));
        tracing::debug!(%url, bytes = document.len(), "publishing manifest");
        let response = self
            .agent
            .put(&url)
            .set("Content-Type", "application/yaml")
            .send_string(document)
            .map_err(|e| describe(e, "publish"))?;

        // Registries that answer with an empty body still count as success.
        let body = response.into_string().context("failed to read registry response")?;
        if let Ok(receipt) = serde_json::from_str::<PublishReceipt>(&body) {
            return Ok(receipt);
        }
        Ok(PublishReceipt {
            id: name.to_string(),
            version: version.to_string(),
            url,
        })
    }

    fn fetch(&self, id: &str) -> Result<String> {
        let url = self.url(id);
        tracing::debug!(%url, "fetching manifest");
        let response = self
            .agent
            .get(&url)
            .set("Accept", "application/yaml")
            .call()
            .map_err(|e| describe(e, id))?;
        let mut body = String::new();
        response
            .into_reader()
            .take(MAX_DOCUMENT_BYTES)
            .read_to_string(&mut body)
            .context("failed to read manifest")?;
        Ok(body)
    }
}

//! `container-image`: Dockerfile, entrypoint and Compose file.
//!
//! Pure functions. The image installs dependencies before copying source so
//! the dependency layer caches, and runs as a non-root user unless the
//! caller explicitly allows root.

#![allow(clippy::format_push_string)]

use agentport_common::{Diagnostic, ValidationResult};

use super::runtime::{RuntimeSupport, compose_memory, cpu_cores, dropped_fields};
use super::{
    Conversion, PlatformConverter, active_tool_bindings, option_report, python_requirements,
    readme_env, readme_header, readme_tool_bindings,
};
use crate::domain::artifact::{Artifact, ArtifactSet};
use crate::domain::error::ConvertError;
use crate::domain::manifest::{Manifest, ToolBinding};
use crate::domain::naming::image_reference;
use crate::domain::options::{OptionReader, PlatformOptions, option_path};
use crate::domain::quote::{json_str, yaml_str};

pub const PLATFORM: &str = "container-image";

const SUPPORT: RuntimeSupport = RuntimeSupport {
    scaling: false,
    ..RuntimeSupport::ALL
};

const DEFAULT_BASE_IMAGE: &str = "python:3.12-slim";
const DEFAULT_USER: &str = "10001";
const DEFAULT_PORT: u64 = 8080;

#[derive(Debug, Clone, PartialEq, Eq)]
struct ContainerOptions {
    base_image: String,
    user: String,
    port: u64,
}

impl ContainerOptions {
    fn read(options: &PlatformOptions) -> Result<Self, Vec<Diagnostic>> {
        let mut r = OptionReader::new(options, &["baseImage", "user", "port", "allowRoot"]);
        let base_image = r.string("baseImage", DEFAULT_BASE_IMAGE);
        let user = r.string("user", DEFAULT_USER);
        let port = r.integer("port", DEFAULT_PORT, 1, 65535);
        let allow_root = r.bool("allowRoot", false);

        if !is_image_reference(&base_image) {
            r.reject(
                option_path("baseImage"),
                format!("'{base_image}' is not a valid image reference"),
            );
        }
        if !is_user_spec(&user) {
            r.reject(option_path("user"), format!("'{user}' is not a valid user"));
        } else if is_root(&user) && !allow_root {
            r.reject(
                option_path("user"),
                "running as root requires allowRoot=true",
            );
        }
        r.finish()?;
        Ok(Self {
            base_image,
            user,
            port,
        })
    }
}

fn is_image_reference(s: &str) -> bool {
    s.chars().next().is_some_and(|c| c.is_ascii_alphanumeric())
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "._-/:@".contains(c))
}

fn is_user_spec(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_.-:".contains(c))
}

/// The user part names uid 0, by name or by any zero-padded number.
fn is_root(user: &str) -> bool {
    let name = user.split(':').next().unwrap_or(user);
    name == "root" || (!name.is_empty() && name.bytes().all(|b| b == b'0'))
}

pub struct ContainerImageConverter;

impl PlatformConverter for ContainerImageConverter {
    fn platform(&self) -> &str {
        PLATFORM
    }

    fn implementation(&self) -> &str {
        "agentport.container-image"
    }

    fn description(&self) -> &str {
        "OCI container image (Dockerfile, entrypoint, Compose file)"
    }

    fn validate_options(&self, _manifest: &Manifest, options: &PlatformOptions) -> ValidationResult {
        option_report(ContainerOptions::read(options))
    }

    fn convert(&self, manifest: &Manifest, options: &PlatformOptions) -> Result<Conversion, ConvertError> {
        let opts = ContainerOptions::read(options).map_err(ConvertError::InvalidOptions)?;
        let tools = active_tool_bindings(PLATFORM, manifest, options)?;

        let artifacts = ArtifactSet::from_artifacts([
            Artifact::new("Dockerfile", dockerfile(manifest, &opts)),
            Artifact::new("requirements.txt", python_requirements(manifest, &["pyyaml>=6.0"])),
            Artifact::executable("entrypoint.sh", entrypoint(manifest)),
            Artifact::new(".dockerignore", dockerignore()),
            Artifact::new("compose.yaml", compose(manifest, &opts)),
            Artifact::new("README.md", readme(manifest, &opts, &tools)),
        ])?;
        Ok(Conversion {
            artifacts,
            warnings: dropped_fields(manifest, SUPPORT, PLATFORM),
        })
    }
}

fn dockerfile(manifest: &Manifest, opts: &ContainerOptions) -> String {
    let mut out = String::new();
    out.push_str(&format!("FROM {}\n\n", opts.base_image));
    out.push_str(&format!(
        "LABEL org.opencontainers.image.title={}\n",
        json_str(manifest.name())
    ));
    out.push_str(&format!(
        "LABEL org.opencontainers.image.version={}\n",
        json_str(manifest.version())
    ));
    out.push_str(&format!(
        "LABEL org.opencontainers.image.description={}\n",
        json_str(&manifest.description_or_default())
    ));
    if let Some(license) = &manifest.identity().license {
        out.push_str(&format!(
            "LABEL org.opencontainers.image.licenses={}\n",
            json_str(license)
        ));
    }
    out.push_str(&format!(
        "LABEL dev.agentport.capabilities={}\n\n",
        json_str(&manifest.unique_capabilities().join(","))
    ));

    out.push_str("ENV PYTHONDONTWRITEBYTECODE=1 \\\n    PYTHONUNBUFFERED=1\n");
    if let Some(timeout) = manifest.runtime().timeout_seconds {
        out.push_str(&format!("ENV AGENT_TIMEOUT_SECONDS={timeout}\n"));
    }
    out.push_str(&format!("ENV AGENT_PORT={}\n\n", opts.port));

    out.push_str("WORKDIR /app\n\n");
    // Dependencies first so source edits do not invalidate this layer.
    out.push_str("COPY requirements.txt ./\n");
    out.push_str("RUN pip install --no-cache-dir -r requirements.txt\n\n");
    out.push_str("COPY . .\n");
    out.push_str("RUN chmod 0755 entrypoint.sh\n\n");
    out.push_str(&format!("USER {}\n", opts.user));
    out.push_str(&format!("EXPOSE {}\n", opts.port));
    out.push_str("ENTRYPOINT [\"./entrypoint.sh\"]\n");
    out
}

fn entrypoint(manifest: &Manifest) -> String {
    let mut out = String::new();
    out.push_str("#!/bin/sh\n");
    out.push_str("set -eu\n\n");
    for var in &manifest.runtime().env {
        out.push_str(&format!("if [ -z \"${{{var}:-}}\" ]; then\n"));
        out.push_str(&format!(
            "  echo \"entrypoint: required variable {var} is not set\" >&2\n"
        ));
        out.push_str("  exit 1\n");
        out.push_str("fi\n");
    }
    if !manifest.runtime().env.is_empty() {
        out.push('\n');
    }
    out.push_str("exec python -m agent \"$@\"\n");
    out
}

fn dockerignore() -> String {
    [
        ".git",
        ".gitignore",
        "__pycache__/",
        "*.pyc",
        ".venv/",
        ".env",
        "compose.yaml",
        "README.md",
    ]
    .iter()
    .fold(String::new(), |mut out, line| {
        out.push_str(line);
        out.push('\n');
        out
    })
}

fn compose(manifest: &Manifest, opts: &ContainerOptions) -> String {
    let name = manifest.dns_name();
    let rt = manifest.runtime();
    let mut out = String::new();
    out.push_str("services:\n");
    out.push_str(&format!("  {name}:\n"));
    out.push_str("    build: .\n");
    out.push_str(&format!(
        "    image: {}\n",
        yaml_str(&image_reference(manifest.name(), manifest.version()))
    ));
    out.push_str("    ports:\n");
    out.push_str(&format!("      - \"{0}:{0}\"\n", opts.port));
    if !rt.env.is_empty() {
        out.push_str("    environment:\n");
        for var in &rt.env {
            out.push_str(&format!("      {var}: ${{{var}:?{var} must be set}}\n"));
        }
    }
    if rt.memory.is_some() || rt.cpu.is_some() {
        out.push_str("    deploy:\n");
        out.push_str("      resources:\n");
        out.push_str("        limits:\n");
        if let Some(memory) = &rt.memory {
            out.push_str(&format!("          memory: {}\n", compose_memory(memory)));
        }
        if let Some(cpu) = &rt.cpu {
            out.push_str(&format!("          cpus: \"{}\"\n", cpu_cores(cpu)));
        }
    }
    out.push_str("    restart: unless-stopped\n");
    out
}

fn readme(manifest: &Manifest, opts: &ContainerOptions, tools: &[&ToolBinding]) -> String {
    let mut out = readme_header(manifest, "container image");
    out.push_str("## Build and run\n\n");
    out.push_str("```sh\n");
    out.push_str(&format!(
        "docker build -t {} .\n",
        image_reference(manifest.name(), manifest.version())
    ));
    out.push_str("docker compose up\n");
    out.push_str("```\n\n");
    out.push_str(&format!(
        "The image runs as user `{}` on `{}` and listens on port {}. Place the \
         `agent` Python package next to the Dockerfile before building.\n\n",
        opts.user, opts.base_image, opts.port
    ));
    out.push_str(&readme_env(manifest));
    out.push_str(&readme_tool_bindings(tools));
    out
}

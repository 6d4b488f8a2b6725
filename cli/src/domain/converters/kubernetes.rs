//! `kubernetes`: Deployment, Service, ConfigMap, optional HPA and a
//! kustomization tying them together.
//!
//! Every descriptor carries the same `metadata.name` (the manifest's DNS
//! name) and the same selector labels.

#![allow(clippy::format_push_string)]

use agentport_common::{Diagnostic, ScalingSection, ValidationResult};

use super::runtime::{RuntimeSupport, dropped_fields};
use super::{
    Conversion, PlatformConverter, active_tool_bindings, option_report, readme_env,
    readme_header, readme_tool_bindings,
};
use crate::domain::artifact::{Artifact, ArtifactSet};
use crate::domain::error::ConvertError;
use crate::domain::manifest::{Manifest, ToolBinding};
use crate::domain::naming::{image_reference, is_dns_label};
use crate::domain::options::{OptionReader, PlatformOptions, option_path};
use crate::domain::quote::yaml_str;

pub const PLATFORM: &str = "kubernetes";

const DEFAULT_PORT: u64 = 8080;
const DEFAULT_CPU_TARGET: u8 = 80;
const MAX_REPLICAS: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
struct KubernetesOptions {
    namespace: Option<String>,
    image: String,
    port: u64,
    replicas: u64,
}

impl KubernetesOptions {
    fn read(manifest: &Manifest, options: &PlatformOptions) -> Result<Self, Vec<Diagnostic>> {
        let mut r = OptionReader::new(options, &["namespace", "image", "port", "replicas"]);
        let namespace = r.optional_string("namespace");
        let default_image = image_reference(manifest.name(), manifest.version());
        let image = r.string("image", &default_image);
        let port = r.integer("port", DEFAULT_PORT, 1, 65535);
        let replicas = r.integer("replicas", 1, 0, MAX_REPLICAS);

        if let Some(ns) = &namespace
            && !is_dns_label(ns)
        {
            r.reject(
                option_path("namespace"),
                format!("'{ns}' is not a DNS label"),
            );
        }
        if image.is_empty() || image.chars().any(|c| c.is_whitespace() || c.is_control()) {
            r.reject(option_path("image"), "image must be a non-empty reference without whitespace");
        }
        r.finish()?;
        Ok(Self {
            namespace,
            image,
            port,
            replicas,
        })
    }
}

pub struct KubernetesConverter;

impl PlatformConverter for KubernetesConverter {
    fn platform(&self) -> &str {
        PLATFORM
    }

    fn implementation(&self) -> &str {
        "agentport.kubernetes"
    }

    fn description(&self) -> &str {
        "Kubernetes manifests (Deployment, Service, ConfigMap, HPA, kustomization)"
    }

    fn validate_options(&self, manifest: &Manifest, options: &PlatformOptions) -> ValidationResult {
        option_report(KubernetesOptions::read(manifest, options))
    }

    fn convert(&self, manifest: &Manifest, options: &PlatformOptions) -> Result<Conversion, ConvertError> {
        let opts = KubernetesOptions::read(manifest, options).map_err(ConvertError::InvalidOptions)?;
        let tools = active_tool_bindings(PLATFORM, manifest, options)?;
        let scaling = manifest.runtime().scaling;

        let mut artifacts = ArtifactSet::new();
        artifacts.push(Artifact::new("deployment.yaml", deployment(manifest, &opts)))?;
        artifacts.push(Artifact::new("service.yaml", service(manifest, &opts)))?;
        artifacts.push(Artifact::new("configmap.yaml", configmap(manifest, &opts, &tools)))?;
        if let Some(scaling) = scaling {
            artifacts.push(Artifact::new("hpa.yaml", hpa(manifest, &opts, scaling)))?;
        }
        artifacts.push(Artifact::new(
            "kustomization.yaml",
            kustomization(&opts, scaling.is_some()),
        ))?;
        artifacts.push(Artifact::new("README.md", readme(manifest, &opts, &tools)))?;

        Ok(Conversion {
            artifacts,
            warnings: dropped_fields(manifest, RuntimeSupport::ALL, PLATFORM),
        })
    }
}

/// Kubernetes label values allow `[A-Za-z0-9._-]`, at most 63 characters,
/// beginning and ending alphanumeric.
fn label_value(raw: &str) -> String {
    let replaced: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .take(63)
        .collect();
    replaced
        .trim_matches(|c: char| !c.is_ascii_alphanumeric())
        .to_string()
}

fn metadata(out: &mut String, manifest: &Manifest, opts: &KubernetesOptions, indent: &str) {
    let name = manifest.dns_name();
    out.push_str(&format!("{indent}name: {name}\n"));
    if let Some(ns) = &opts.namespace {
        out.push_str(&format!("{indent}namespace: {ns}\n"));
    }
    out.push_str(&format!("{indent}labels:\n"));
    labels(out, manifest, &format!("{indent}  "));
}

fn labels(out: &mut String, manifest: &Manifest, indent: &str) {
    out.push_str(&format!(
        "{indent}app.kubernetes.io/name: {}\n",
        manifest.dns_name()
    ));
    out.push_str(&format!(
        "{indent}app.kubernetes.io/version: {}\n",
        yaml_str(&label_value(manifest.version()))
    ));
    out.push_str(&format!("{indent}app.kubernetes.io/managed-by: agentport\n"));
}

fn selector(out: &mut String, manifest: &Manifest, indent: &str) {
    out.push_str(&format!(
        "{indent}app.kubernetes.io/name: {}\n",
        manifest.dns_name()
    ));
}

fn deployment(manifest: &Manifest, opts: &KubernetesOptions) -> String {
    let name = manifest.dns_name();
    let rt = manifest.runtime();
    let replicas = rt
        .scaling
        .map_or(opts.replicas, |s| opts.replicas.max(u64::from(s.min_replicas)));

    let mut out = String::new();
    out.push_str("apiVersion: apps/v1\n");
    out.push_str("kind: Deployment\n");
    out.push_str("metadata:\n");
    metadata(&mut out, manifest, opts, "  ");
    out.push_str("spec:\n");
    out.push_str(&format!("  replicas: {replicas}\n"));
    out.push_str("  selector:\n");
    out.push_str("    matchLabels:\n");
    selector(&mut out, manifest, "      ");
    out.push_str("  template:\n");
    out.push_str("    metadata:\n");
    out.push_str("      labels:\n");
    labels(&mut out, manifest, "        ");
    out.push_str("    spec:\n");
    out.push_str("      securityContext:\n");
    out.push_str("        runAsNonRoot: true\n");
    out.push_str("      containers:\n");
    out.push_str(&format!("        - name: {name}\n"));
    out.push_str(&format!("          image: {}\n", yaml_str(&opts.image)));
    out.push_str("          ports:\n");
    out.push_str(&format!("            - containerPort: {}\n", opts.port));
    out.push_str("              name: http\n");
    out.push_str("          envFrom:\n");
    out.push_str("            - configMapRef:\n");
    out.push_str(&format!("                name: {name}\n"));
    if !rt.env.is_empty() {
        out.push_str("          env:\n");
        for var in &rt.env {
            out.push_str(&format!("            - name: {var}\n"));
            out.push_str("              valueFrom:\n");
            out.push_str("                secretKeyRef:\n");
            out.push_str(&format!("                  name: {name}\n"));
            out.push_str(&format!("                  key: {var}\n"));
        }
    }
    if rt.memory.is_some() || rt.cpu.is_some() {
        out.push_str("          resources:\n");
        for section in ["requests", "limits"] {
            out.push_str(&format!("            {section}:\n"));
            if let Some(memory) = &rt.memory {
                out.push_str(&format!("              memory: {}\n", yaml_str(memory)));
            }
            if let Some(cpu) = &rt.cpu {
                out.push_str(&format!("              cpu: {}\n", yaml_str(cpu)));
            }
        }
    }
    out.push_str("          securityContext:\n");
    out.push_str("            allowPrivilegeEscalation: false\n");
    out.push_str("            readOnlyRootFilesystem: true\n");
    out
}

fn service(manifest: &Manifest, opts: &KubernetesOptions) -> String {
    let mut out = String::new();
    out.push_str("apiVersion: v1\n");
    out.push_str("kind: Service\n");
    out.push_str("metadata:\n");
    metadata(&mut out, manifest, opts, "  ");
    out.push_str("spec:\n");
    out.push_str("  selector:\n");
    selector(&mut out, manifest, "    ");
    out.push_str("  ports:\n");
    out.push_str("    - name: http\n");
    out.push_str(&format!("      port: {}\n", opts.port));
    out.push_str("      targetPort: http\n");
    out
}

fn configmap(manifest: &Manifest, opts: &KubernetesOptions, tools: &[&ToolBinding]) -> String {
    let mut out = String::new();
    out.push_str("apiVersion: v1\n");
    out.push_str("kind: ConfigMap\n");
    out.push_str("metadata:\n");
    metadata(&mut out, manifest, opts, "  ");
    out.push_str("data:\n");
    out.push_str(&format!("  AGENT_NAME: {}\n", yaml_str(manifest.name())));
    out.push_str(&format!("  AGENT_VERSION: {}\n", yaml_str(manifest.version())));
    out.push_str(&format!(
        "  AGENT_CAPABILITIES: {}\n",
        yaml_str(&manifest.unique_capabilities().join(","))
    ));
    out.push_str(&format!("  AGENT_PORT: \"{}\"\n", opts.port));
    if let Some(timeout) = manifest.runtime().timeout_seconds {
        out.push_str(&format!("  AGENT_TIMEOUT_SECONDS: \"{timeout}\"\n"));
    }
    if let Some(llm) = manifest.llm() {
        out.push_str(&format!("  AGENT_LLM_PROVIDER: {}\n", yaml_str(&llm.provider)));
        out.push_str(&format!("  AGENT_LLM_MODEL: {}\n", yaml_str(&llm.model)));
    }
    if !tools.is_empty() {
        let joined = tools
            .iter()
            .map(|t| format!("{}={}", t.name, t.endpoint))
            .collect::<Vec<_>>()
            .join(",");
        out.push_str(&format!("  AGENT_TOOL_BINDINGS: {}\n", yaml_str(&joined)));
    }
    out
}

fn hpa(manifest: &Manifest, opts: &KubernetesOptions, scaling: ScalingSection) -> String {
    let target = scaling.target_cpu_percent.unwrap_or(DEFAULT_CPU_TARGET);
    let mut out = String::new();
    out.push_str("apiVersion: autoscaling/v2\n");
    out.push_str("kind: HorizontalPodAutoscaler\n");
    out.push_str("metadata:\n");
    metadata(&mut out, manifest, opts, "  ");
    out.push_str("spec:\n");
    out.push_str("  scaleTargetRef:\n");
    out.push_str("    apiVersion: apps/v1\n");
    out.push_str("    kind: Deployment\n");
    out.push_str(&format!("    name: {}\n", manifest.dns_name()));
    out.push_str(&format!("  minReplicas: {}\n", scaling.min_replicas.max(1)));
    out.push_str(&format!("  maxReplicas: {}\n", scaling.max_replicas.max(1)));
    out.push_str("  metrics:\n");
    out.push_str("    - type: Resource\n");
    out.push_str("      resource:\n");
    out.push_str("        name: cpu\n");
    out.push_str("        target:\n");
    out.push_str("          type: Utilization\n");
    out.push_str(&format!("          averageUtilization: {target}\n"));
    out
}

fn kustomization(opts: &KubernetesOptions, with_hpa: bool) -> String {
    let mut out = String::new();
    out.push_str("apiVersion: kustomize.config.k8s.io/v1beta1\n");
    out.push_str("kind: Kustomization\n");
    if let Some(ns) = &opts.namespace {
        out.push_str(&format!("namespace: {ns}\n"));
    }
    out.push_str("resources:\n");
    out.push_str("  - deployment.yaml\n");
    out.push_str("  - service.yaml\n");
    out.push_str("  - configmap.yaml\n");
    if with_hpa {
        out.push_str("  - hpa.yaml\n");
    }
    out
}

fn readme(manifest: &Manifest, opts: &KubernetesOptions, tools: &[&ToolBinding]) -> String {
    let name = manifest.dns_name();
    let mut out = readme_header(manifest, "Kubernetes");
    out.push_str("## Deploy\n\n");
    out.push_str("```sh\n");
    if !manifest.runtime().env.is_empty() {
        let literals: Vec<String> = manifest
            .runtime()
            .env
            .iter()
            .map(|v| format!("--from-literal={v}=..."))
            .collect();
        let ns = opts
            .namespace
            .as_ref()
            .map(|ns| format!(" -n {ns}"))
            .unwrap_or_default();
        out.push_str(&format!(
            "kubectl create secret generic {name}{ns} {}\n",
            literals.join(" ")
        ));
    }
    out.push_str("kubectl apply -k .\n");
    out.push_str("```\n\n");
    out.push_str(&format!(
        "The Deployment runs `{}` and the Service exposes port {}.\n\n",
        opts.image, opts.port
    ));
    out.push_str(&readme_env(manifest));
    out.push_str(&readme_tool_bindings(tools));
    out
}

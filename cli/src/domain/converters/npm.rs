//! `npm-package`: a redistributable CommonJS package that ships the manifest
//! verbatim alongside a small loader.

#![allow(clippy::format_push_string)]

use agentport_common::{Diagnostic, ValidationResult};
use serde_json::{Value, json};

use super::runtime::{RuntimeSupport, dropped_fields};
use super::{
    Conversion, PlatformConverter, active_tool_bindings, option_report, readme_env,
    readme_header, readme_tool_bindings,
};
use crate::domain::artifact::{Artifact, ArtifactSet};
use crate::domain::error::ConvertError;
use crate::domain::manifest::{Manifest, ToolBinding};
use crate::domain::naming::{is_dns_label, package_name};
use crate::domain::options::{OptionReader, PlatformOptions, option_path};

pub const PLATFORM: &str = "npm-package";

const DEFAULT_SCOPE: &str = "agents";
const DEFAULT_LICENSE: &str = "UNLICENSED";

#[derive(Debug, Clone, PartialEq, Eq)]
struct NpmOptions {
    scope: String,
    license: String,
}

impl NpmOptions {
    fn read(manifest: &Manifest, options: &PlatformOptions) -> Result<Self, Vec<Diagnostic>> {
        let mut r = OptionReader::new(options, &["scope", "license"]);
        let scope = r.string("scope", DEFAULT_SCOPE);
        let license = r.optional_string("license");
        if !is_dns_label(&scope) {
            r.reject(
                option_path("scope"),
                format!("'{scope}' must be lowercase letters, digits and hyphens"),
            );
        }
        if let Err(message) = strict_version(manifest.version()) {
            r.reject("metadata.version", message);
        }
        r.finish()?;
        let license = license
            .or_else(|| manifest.identity().license.clone())
            .unwrap_or_else(|| DEFAULT_LICENSE.to_string());
        Ok(Self { scope, license })
    }
}

/// npm publishes only plain `MAJOR.MINOR.PATCH` here; pre-release and build
/// suffixes are refused.
fn strict_version(version: &str) -> Result<(), String> {
    match semver::Version::parse(version) {
        Ok(v) if v.pre.is_empty() && v.build.is_empty() => Ok(()),
        Ok(_) => Err(format!(
            "version '{version}' must be plain MAJOR.MINOR.PATCH for npm (no pre-release or build suffix)"
        )),
        Err(e) => Err(format!("version '{version}' is not MAJOR.MINOR.PATCH: {e}")),
    }
}

pub struct NpmPackageConverter;

impl PlatformConverter for NpmPackageConverter {
    fn platform(&self) -> &str {
        PLATFORM
    }

    fn implementation(&self) -> &str {
        "agentport.npm-package"
    }

    fn description(&self) -> &str {
        "npm package bundling the manifest with a typed loader"
    }

    fn validate_options(&self, manifest: &Manifest, options: &PlatformOptions) -> ValidationResult {
        option_report(NpmOptions::read(manifest, options))
    }

    fn convert(&self, manifest: &Manifest, options: &PlatformOptions) -> Result<Conversion, ConvertError> {
        let opts = NpmOptions::read(manifest, options).map_err(ConvertError::InvalidOptions)?;
        let tools = active_tool_bindings(PLATFORM, manifest, options)?;

        let artifacts = ArtifactSet::from_artifacts([
            Artifact::new("package.json", package_json(manifest, &opts)?),
            Artifact::new("index.js", index_js(manifest, &tools)?),
            Artifact::new("index.d.ts", index_d_ts()),
            Artifact::new("agent.yaml", manifest.source()),
            Artifact::new("README.md", readme(manifest, &opts, &tools)),
        ])?;
        Ok(Conversion {
            artifacts,
            warnings: dropped_fields(manifest, RuntimeSupport::PROCESS_ONLY, PLATFORM),
        })
    }
}

fn pretty(value: &Value) -> Result<String, ConvertError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ConvertError::Defect(format!("JSON rendering failed: {e}")))
}

fn package_json(manifest: &Manifest, opts: &NpmOptions) -> Result<String, ConvertError> {
    let mut pkg = json!({
        "name": package_name(&opts.scope, manifest.name()),
        "version": manifest.version(),
        "description": manifest.description_or_default(),
        "license": opts.license,
        "main": "index.js",
        "types": "index.d.ts",
        "files": ["index.js", "index.d.ts", "agent.yaml", "README.md"],
        "keywords": manifest.unique_capabilities(),
        "engines": { "node": ">=18" },
    });
    if let Some(author) = &manifest.identity().author {
        pkg["author"] = Value::String(author.clone());
    }
    let mut out = pretty(&pkg)?;
    out.push('\n');
    Ok(out)
}

fn index_js(manifest: &Manifest, tools: &[&ToolBinding]) -> Result<String, ConvertError> {
    let rt = manifest.runtime();
    let bindings: Vec<Value> = tools
        .iter()
        .map(|t| {
            json!({
                "name": t.name,
                "endpoint": t.endpoint,
                "auth": t.auth.kind.as_str(),
            })
        })
        .collect();
    let info = json!({
        "name": manifest.name(),
        "version": manifest.version(),
        "description": manifest.description_or_default(),
        "capabilities": manifest.unique_capabilities(),
        "timeoutSeconds": rt.timeout_seconds,
        "requiredEnv": rt.env,
        "toolBindings": bindings,
    });

    let mut out = String::new();
    out.push_str("'use strict';\n\n");
    out.push_str("const path = require('path');\n\n");
    out.push_str(&format!("const agent = Object.freeze({});\n\n", pretty(&info)?));
    out.push_str("function manifestPath() {\n");
    out.push_str("  return path.join(__dirname, 'agent.yaml');\n");
    out.push_str("}\n\n");
    out.push_str("function missingEnv(env = process.env) {\n");
    out.push_str("  return agent.requiredEnv.filter((name) => !env[name]);\n");
    out.push_str("}\n\n");
    out.push_str("function assertEnv(env = process.env) {\n");
    out.push_str("  const missing = missingEnv(env);\n");
    out.push_str("  if (missing.length > 0) {\n");
    out.push_str("    throw new Error(`missing required environment variables: ${missing.join(', ')}`);\n");
    out.push_str("  }\n");
    out.push_str("}\n\n");
    out.push_str("module.exports = { agent, manifestPath, missingEnv, assertEnv };\n");
    Ok(out)
}

fn index_d_ts() -> String {
    let mut out = String::new();
    out.push_str("export interface ToolBinding {\n");
    out.push_str("  readonly name: string;\n");
    out.push_str("  readonly endpoint: string;\n");
    out.push_str("  readonly auth: 'none' | 'apiKey' | 'bearer' | 'oauth2' | 'basic';\n");
    out.push_str("}\n\n");
    out.push_str("export interface AgentInfo {\n");
    out.push_str("  readonly name: string;\n");
    out.push_str("  readonly version: string;\n");
    out.push_str("  readonly description: string;\n");
    out.push_str("  readonly capabilities: readonly string[];\n");
    out.push_str("  readonly timeoutSeconds: number | null;\n");
    out.push_str("  readonly requiredEnv: readonly string[];\n");
    out.push_str("  readonly toolBindings: readonly ToolBinding[];\n");
    out.push_str("}\n\n");
    out.push_str("export declare const agent: AgentInfo;\n");
    out.push_str("export declare function manifestPath(): string;\n");
    out.push_str(
        "export declare function missingEnv(env?: Record<string, string | undefined>): string[];\n",
    );
    out.push_str(
        "export declare function assertEnv(env?: Record<string, string | undefined>): void;\n",
    );
    out
}

fn readme(manifest: &Manifest, opts: &NpmOptions, tools: &[&ToolBinding]) -> String {
    let pkg = package_name(&opts.scope, manifest.name());
    let mut out = readme_header(manifest, "npm package");
    out.push_str("## Install\n\n");
    out.push_str(&format!("```sh\nnpm install {pkg}\n```\n\n"));
    out.push_str("## Use\n\n");
    out.push_str("```js\n");
    out.push_str(&format!("const {{ agent, manifestPath, assertEnv }} = require('{pkg}');\n"));
    out.push_str("assertEnv();\n");
    out.push_str("```\n\n");
    out.push_str(&readme_env(manifest));
    out.push_str(&readme_tool_bindings(tools));
    out
}

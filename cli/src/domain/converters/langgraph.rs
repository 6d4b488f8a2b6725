//! `langgraph`: a runnable LangGraph script with one node per capability.
//!
//! Workflow conditions are rendered from the parsed expression tree, never
//! from the manifest text, so a condition cannot smuggle Python into the
//! generated script.

#![allow(clippy::format_push_string)]
#![allow(clippy::too_many_lines)]

use std::collections::BTreeSet;

use agentport_common::{Diagnostic, ValidationResult};

use super::runtime::{RuntimeSupport, dropped_fields};
use super::{
    Conversion, PlatformConverter, active_tool_bindings, option_report, python_requirements,
    readme_env, readme_header, readme_tool_bindings,
};
use crate::domain::artifact::{Artifact, ArtifactSet};
use crate::domain::error::ConvertError;
use crate::domain::manifest::{Manifest, ToolBinding, Transition};
use crate::domain::naming::python_identifier;
use crate::domain::options::{OptionReader, PlatformOptions, option_path};
use crate::domain::quote::{python_str, single_line};

pub const PLATFORM: &str = "langgraph";

const DEFAULT_PYTHON: &str = "3.11";
const STATE_PREFIX: &str = "state.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Checkpointer {
    Memory,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct LangGraphOptions {
    python_version: String,
    checkpointer: Checkpointer,
}

impl LangGraphOptions {
    fn read(options: &PlatformOptions) -> Result<Self, Vec<Diagnostic>> {
        let mut r = OptionReader::new(options, &["pythonVersion", "checkpointer"]);
        let python_version = r.string("pythonVersion", DEFAULT_PYTHON);
        let checkpointer = match r.string("checkpointer", "memory").as_str() {
            "memory" => Checkpointer::Memory,
            "none" => Checkpointer::None,
            other => {
                r.reject(
                    option_path("checkpointer"),
                    format!("'{other}' must be one of: memory, none"),
                );
                Checkpointer::Memory
            }
        };
        let well_formed = python_version
            .split_once('.')
            .is_some_and(|(major, minor)| {
                major == "3"
                    && !minor.is_empty()
                    && minor.chars().all(|c| c.is_ascii_digit())
            });
        if !well_formed {
            r.reject(
                option_path("pythonVersion"),
                format!("'{python_version}' must look like 3.<minor>"),
            );
        }
        r.finish()?;
        Ok(Self {
            python_version,
            checkpointer,
        })
    }
}

/// Capability -> Python identifier, made unique in declaration order.
fn node_names(manifest: &Manifest) -> Vec<(&str, String)> {
    let mut taken = BTreeSet::new();
    let mut out = Vec::new();
    for cap in manifest.unique_capabilities() {
        let base = python_identifier(cap);
        let mut ident = base.clone();
        let mut n = 2;
        while !taken.insert(ident.clone()) {
            ident = format!("{base}_{n}");
            n += 1;
        }
        out.push((cap, ident));
    }
    out
}

fn ident_of<'a>(nodes: &'a [(&str, String)], capability: &str) -> Option<&'a str> {
    nodes
        .iter()
        .find(|(cap, _)| *cap == capability)
        .map(|(_, ident)| ident.as_str())
}

pub struct LangGraphConverter;

impl PlatformConverter for LangGraphConverter {
    fn platform(&self) -> &str {
        PLATFORM
    }

    fn implementation(&self) -> &str {
        "agentport.langgraph"
    }

    fn description(&self) -> &str {
        "LangGraph script with one node per capability"
    }

    fn validate_options(&self, _manifest: &Manifest, options: &PlatformOptions) -> ValidationResult {
        option_report(LangGraphOptions::read(options))
    }

    fn convert(&self, manifest: &Manifest, options: &PlatformOptions) -> Result<Conversion, ConvertError> {
        let opts = LangGraphOptions::read(options).map_err(ConvertError::InvalidOptions)?;
        let tools = active_tool_bindings(PLATFORM, manifest, options)?;
        let script = graph_script(manifest, &opts, &tools)?;

        let artifacts = ArtifactSet::from_artifacts([
            Artifact::executable("agent_graph.py", script),
            Artifact::new(
                "requirements.txt",
                python_requirements(manifest, &["langgraph>=0.2"]),
            ),
            Artifact::new("README.md", readme(manifest, &opts, &tools)),
        ])?;
        Ok(Conversion {
            artifacts,
            warnings: dropped_fields(manifest, RuntimeSupport::PROCESS_ONLY, PLATFORM),
        })
    }
}

/// Python expression reading `state.<path>` from the graph state.
fn python_state_read(ident: &str) -> String {
    let path = ident.strip_prefix(STATE_PREFIX).unwrap_or(ident);
    format!("_lookup(state, {})", python_str(path))
}

fn graph_script(
    manifest: &Manifest,
    opts: &LangGraphOptions,
    tools: &[&ToolBinding],
) -> Result<String, ConvertError> {
    let nodes = node_names(manifest);
    let Some((_, entry)) = nodes.first() else {
        return Err(ConvertError::Defect(
            "manifest has no capabilities to turn into graph nodes".to_string(),
        ));
    };
    let rt = manifest.runtime();

    let mut out = String::new();
    out.push_str("#!/usr/bin/env python3\n");
    out.push_str(&format!(
        "\"\"\"LangGraph entry point for {} {}.\"\"\"\n\n",
        single_line(manifest.name()),
        single_line(manifest.version())
    ));
    out.push_str("from __future__ import annotations\n\n");
    out.push_str("import os\n");
    out.push_str("import sys\n");
    out.push_str("from typing import Any, TypedDict\n\n");
    out.push_str("from langgraph.graph import END, START, StateGraph\n");
    if opts.checkpointer == Checkpointer::Memory {
        out.push_str("from langgraph.checkpoint.memory import MemorySaver\n");
    }
    out.push('\n');

    out.push_str(&format!("AGENT_NAME = {}\n", python_str(manifest.name())));
    out.push_str(&format!("AGENT_VERSION = {}\n", python_str(manifest.version())));
    out.push_str(&format!(
        "AGENT_DESCRIPTION = {}\n",
        python_str(&manifest.description_or_default())
    ));
    out.push_str(&format!(
        "PYTHON_REQUIRES = ({})\n",
        opts.python_version.replace('.', ", ")
    ));
    match rt.timeout_seconds {
        Some(t) => out.push_str(&format!("TIMEOUT_SECONDS: int | None = {t}\n")),
        None => out.push_str("TIMEOUT_SECONDS: int | None = None\n"),
    }
    let env: Vec<String> = rt.env.iter().map(|v| python_str(v)).collect();
    out.push_str(&format!("REQUIRED_ENV = [{}]\n", env.join(", ")));
    out.push_str("TOOL_BINDINGS = {\n");
    for t in tools {
        out.push_str(&format!(
            "    {}: {{\"endpoint\": {}, \"auth\": {}}},\n",
            python_str(&t.name),
            python_str(&t.endpoint),
            python_str(t.auth.kind.as_str())
        ));
    }
    out.push_str("}\n\n\n");

    out.push_str("class AgentState(TypedDict, total=False):\n");
    out.push_str("    capability: str\n");
    out.push_str("    input: Any\n");
    out.push_str("    output: Any\n");
    out.push_str("    state: dict[str, Any]\n\n\n");

    out.push_str("def _lookup(state: AgentState, path: str) -> Any:\n");
    out.push_str("    value: Any = state.get(\"state\", {})\n");
    out.push_str("    for key in path.split(\".\"):\n");
    out.push_str("        if not isinstance(value, dict):\n");
    out.push_str("            return None\n");
    out.push_str("        value = value.get(key)\n");
    out.push_str("    return value\n\n\n");

    out.push_str("def check_environment() -> None:\n");
    out.push_str("    if sys.version_info < PYTHON_REQUIRES:\n");
    out.push_str("        raise SystemExit(f\"Python {PYTHON_REQUIRES[0]}.{PYTHON_REQUIRES[1]}+ is required\")\n");
    out.push_str("    missing = [name for name in REQUIRED_ENV if not os.environ.get(name)]\n");
    out.push_str("    if missing:\n");
    out.push_str("        raise SystemExit(f\"missing required environment variables: {', '.join(missing)}\")\n\n\n");

    for (cap, ident) in &nodes {
        out.push_str(&format!("def node_{ident}(state: AgentState) -> AgentState:\n"));
        out.push_str(&format!("    \"\"\"Handles the {cap} capability.\"\"\"\n"));
        out.push_str(&format!(
            "    return {{\"capability\": {}, \"output\": state.get(\"input\")}}\n\n\n",
            python_str(cap)
        ));
    }

    for (cap, ident) in &nodes {
        let outgoing: Vec<&Transition> = manifest
            .transitions()
            .iter()
            .filter(|t| t.from == *cap)
            .collect();
        if needs_router(&outgoing) {
            out.push_str(&route_function(ident, &outgoing, &nodes)?);
        }
    }

    out.push_str("def build_graph():\n");
    out.push_str("    graph = StateGraph(AgentState)\n");
    for (_, ident) in &nodes {
        out.push_str(&format!("    graph.add_node(\"{ident}\", node_{ident})\n"));
    }
    out.push_str(&format!("    graph.add_edge(START, \"{entry}\")\n"));
    // Without a workflow the capabilities run as a chain in declaration order.
    let chained = manifest.transitions().is_empty();
    for (i, (cap, ident)) in nodes.iter().enumerate() {
        let outgoing: Vec<&Transition> = manifest
            .transitions()
            .iter()
            .filter(|t| t.from == *cap)
            .collect();
        if needs_router(&outgoing) {
            out.push_str(&format!(
                "    graph.add_conditional_edges(\"{ident}\", route_{ident})\n"
            ));
        } else if let Some(t) = outgoing.first() {
            let target = resolve(&nodes, &t.to)?;
            out.push_str(&format!("    graph.add_edge(\"{ident}\", \"{target}\")\n"));
        } else if let Some((_, next)) = nodes.get(i + 1).filter(|_| chained) {
            out.push_str(&format!("    graph.add_edge(\"{ident}\", \"{next}\")\n"));
        } else {
            out.push_str(&format!("    graph.add_edge(\"{ident}\", END)\n"));
        }
    }
    match opts.checkpointer {
        Checkpointer::Memory => {
            out.push_str("    app = graph.compile(checkpointer=MemorySaver())\n");
        }
        Checkpointer::None => out.push_str("    app = graph.compile()\n"),
    }
    out.push_str("    if TIMEOUT_SECONDS is not None:\n");
    out.push_str("        app.step_timeout = TIMEOUT_SECONDS\n");
    out.push_str("    return app\n\n\n");

    out.push_str("def main() -> None:\n");
    out.push_str("    check_environment()\n");
    out.push_str("    app = build_graph()\n");
    out.push_str("    payload = sys.argv[1] if len(sys.argv) > 1 else None\n");
    out.push_str(
        "    result = app.invoke({\"input\": payload, \"state\": {}}, config={\"configurable\": {\"thread_id\": AGENT_NAME}})\n",
    );
    out.push_str("    print(result)\n\n\n");
    out.push_str("if __name__ == \"__main__\":\n");
    out.push_str("    main()\n");
    Ok(out)
}

/// A single unconditional transition is a plain edge; anything else needs a
/// routing function.
fn needs_router(outgoing: &[&Transition]) -> bool {
    match outgoing {
        [] => false,
        [only] => only.when.is_some(),
        _ => true,
    }
}

fn resolve<'a>(nodes: &'a [(&str, String)], capability: &str) -> Result<&'a str, ConvertError> {
    ident_of(nodes, capability).ok_or_else(|| {
        ConvertError::Defect(format!(
            "workflow references undeclared capability '{capability}'"
        ))
    })
}

/// Router that tries the transitions in declaration order; the first whose
/// condition holds wins, and an unconditional transition always holds.
fn route_function(
    ident: &str,
    outgoing: &[&Transition],
    nodes: &[(&str, String)],
) -> Result<String, ConvertError> {
    let mut out = String::new();
    out.push_str(&format!("def route_{ident}(state: AgentState) -> str:\n"));
    for t in outgoing {
        let target = resolve(nodes, &t.to)?;
        match &t.when {
            Some(expr) => {
                out.push_str(&format!(
                    "    if {}:\n",
                    expr.to_python(&python_state_read)
                ));
                out.push_str(&format!("        return \"{target}\"\n"));
            }
            None => {
                out.push_str(&format!("    return \"{target}\"\n\n\n"));
                return Ok(out);
            }
        }
    }
    out.push_str("    return END\n\n\n");
    Ok(out)
}

fn readme(manifest: &Manifest, opts: &LangGraphOptions, tools: &[&ToolBinding]) -> String {
    let mut out = readme_header(manifest, "LangGraph");
    out.push_str("## Run\n\n");
    out.push_str(&format!(
        "Requires Python {} or newer.\n\n",
        opts.python_version
    ));
    out.push_str("```sh\n");
    out.push_str("pip install -r requirements.txt\n");
    out.push_str("./agent_graph.py '<input>'\n");
    out.push_str("```\n\n");
    let nodes = node_names(manifest);
    out.push_str("## Graph\n\n");
    for (cap, ident) in &nodes {
        out.push_str(&format!("- node `{ident}` handles `{cap}`\n"));
    }
    out.push('\n');
    if opts.checkpointer == Checkpointer::Memory {
        out.push_str("State is checkpointed in memory per thread.\n\n");
    }
    out.push_str(&readme_env(manifest));
    out.push_str(&readme_tool_bindings(tools));
    out
}

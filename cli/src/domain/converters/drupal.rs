//! `drupal-module`: a Drupal module scaffold with a dispatcher service, its
//! unit test and default settings.

#![allow(clippy::format_push_string)]
#![allow(clippy::too_many_lines)]

use agentport_common::{Diagnostic, ValidationResult};

use super::runtime::{RuntimeSupport, dropped_fields};
use super::{
    Conversion, PlatformConverter, active_tool_bindings, option_report, readme_env,
    readme_header, readme_tool_bindings,
};
use crate::domain::artifact::{Artifact, ArtifactSet};
use crate::domain::error::ConvertError;
use crate::domain::manifest::{Manifest, ToolBinding};
use crate::domain::naming::{class_name, machine_name};
use crate::domain::options::{OptionReader, PlatformOptions, option_path};
use crate::domain::quote::{php_str, single_line, yaml_str};

pub const PLATFORM: &str = "drupal-module";

const DEFAULT_PACKAGE: &str = "AI Agents";
const DEFAULT_CORE_VERSION: &str = "^10 || ^11";

#[derive(Debug, Clone, PartialEq, Eq)]
struct DrupalOptions {
    package: String,
    core_version: String,
}

impl DrupalOptions {
    fn read(options: &PlatformOptions) -> Result<Self, Vec<Diagnostic>> {
        let mut r = OptionReader::new(options, &["package", "coreVersion"]);
        let package = r.string("package", DEFAULT_PACKAGE);
        let core_version = r.string("coreVersion", DEFAULT_CORE_VERSION);
        if single_line(&package).is_empty() {
            r.reject(option_path("package"), "package must not be empty");
        }
        if !core_version
            .chars()
            .all(|c| c.is_ascii_digit() || " ^~<>=|.*x-".contains(c))
            || core_version.trim().is_empty()
        {
            r.reject(
                option_path("coreVersion"),
                format!("'{core_version}' is not a Composer version constraint"),
            );
        }
        r.finish()?;
        Ok(Self {
            package,
            core_version,
        })
    }
}

/// Names every generated file shares.
struct ModuleNames {
    machine: String,
    class: String,
}

impl ModuleNames {
    fn of(manifest: &Manifest) -> Self {
        Self {
            machine: machine_name(manifest.name()),
            class: format!("{}Dispatcher", class_name(manifest.name())),
        }
    }
}

pub struct DrupalModuleConverter;

impl PlatformConverter for DrupalModuleConverter {
    fn platform(&self) -> &str {
        PLATFORM
    }

    fn implementation(&self) -> &str {
        "agentport.drupal-module"
    }

    fn description(&self) -> &str {
        "Drupal module scaffold with a capability dispatcher service"
    }

    fn validate_options(&self, _manifest: &Manifest, options: &PlatformOptions) -> ValidationResult {
        option_report(DrupalOptions::read(options))
    }

    fn convert(&self, manifest: &Manifest, options: &PlatformOptions) -> Result<Conversion, ConvertError> {
        let opts = DrupalOptions::read(options).map_err(ConvertError::InvalidOptions)?;
        let tools = active_tool_bindings(PLATFORM, manifest, options)?;
        let names = ModuleNames::of(manifest);
        let m = &names.machine;
        let class = &names.class;

        let artifacts = ArtifactSet::from_artifacts([
            Artifact::new(format!("{m}.info.yml"), info_yml(manifest, &opts)),
            Artifact::new(format!("{m}.services.yml"), services_yml(&names)),
            Artifact::new(format!("src/{class}.php"), dispatcher_php(manifest, &names, &tools)),
            Artifact::new(
                format!("tests/src/Unit/{class}Test.php"),
                dispatcher_test_php(manifest, &names),
            ),
            Artifact::new(
                format!("config/install/{m}.settings.yml"),
                settings_yml(manifest),
            ),
            Artifact::new("README.md", readme(manifest, &names, &tools)),
        ])?;
        Ok(Conversion {
            artifacts,
            warnings: dropped_fields(manifest, RuntimeSupport::PROCESS_ONLY, PLATFORM),
        })
    }
}

fn info_yml(manifest: &Manifest, opts: &DrupalOptions) -> String {
    let mut out = String::new();
    out.push_str(&format!("name: {}\n", yaml_str(&single_line(manifest.name()))));
    out.push_str("type: module\n");
    out.push_str(&format!(
        "description: {}\n",
        yaml_str(&single_line(&manifest.description_or_default()))
    ));
    out.push_str(&format!("package: {}\n", yaml_str(&single_line(&opts.package))));
    out.push_str(&format!(
        "core_version_requirement: {}\n",
        yaml_str(&opts.core_version)
    ));
    out.push_str(&format!("version: {}\n", yaml_str(manifest.version())));
    out
}

fn services_yml(names: &ModuleNames) -> String {
    let m = &names.machine;
    let mut out = String::new();
    out.push_str("services:\n");
    out.push_str(&format!("  {m}.dispatcher:\n"));
    out.push_str(&format!("    class: Drupal\\{m}\\{}\n", names.class));
    out.push_str("    arguments: ['@http_client', '@config.factory', '@logger.factory']\n");
    out
}

fn php_list(items: &[&str]) -> String {
    let quoted: Vec<String> = items.iter().map(|s| php_str(s)).collect();
    format!("[{}]", quoted.join(", "))
}

fn dispatcher_php(manifest: &Manifest, names: &ModuleNames, tools: &[&ToolBinding]) -> String {
    let m = &names.machine;
    let class = &names.class;
    let mut out = String::new();
    out.push_str("<?php\n\n");
    out.push_str("declare(strict_types=1);\n\n");
    out.push_str(&format!("namespace Drupal\\{m};\n\n"));
    out.push_str("use Drupal\\Core\\Config\\ConfigFactoryInterface;\n");
    out.push_str("use Drupal\\Core\\Logger\\LoggerChannelFactoryInterface;\n");
    out.push_str("use GuzzleHttp\\ClientInterface;\n\n");
    out.push_str("/**\n");
    out.push_str(&format!(
        " * Dispatches capability requests for {}.\n",
        single_line(manifest.name())
    ));
    out.push_str(" *\n");
    out.push_str(&format!(
        " * {}\n",
        single_line(&manifest.description_or_default()).replace("*/", "* /")
    ));
    out.push_str(" */\n");
    out.push_str(&format!("final class {class} {{\n\n"));
    out.push_str(&format!(
        "  public const CAPABILITIES = {};\n\n",
        php_list(&manifest.unique_capabilities())
    ));
    out.push_str("  public const TOOL_BINDINGS = [\n");
    for t in tools {
        let credential = t
            .auth
            .credential
            .as_deref()
            .map_or_else(|| "NULL".to_string(), php_str);
        out.push_str(&format!(
            "    {} => ['endpoint' => {}, 'auth' => {}, 'credential' => {credential}],\n",
            php_str(&t.name),
            php_str(&t.endpoint),
            php_str(t.auth.kind.as_str()),
        ));
    }
    out.push_str("  ];\n\n");
    out.push_str("  public function __construct(\n");
    out.push_str("    private readonly ClientInterface $httpClient,\n");
    out.push_str("    private readonly ConfigFactoryInterface $configFactory,\n");
    out.push_str("    private readonly LoggerChannelFactoryInterface $loggerFactory,\n");
    out.push_str("  ) {}\n\n");
    out.push_str("  public function supports(string $capability): bool {\n");
    out.push_str("    return in_array($capability, self::CAPABILITIES, TRUE);\n");
    out.push_str("  }\n\n");
    out.push_str("  public function dispatch(string $capability, array $payload): array {\n");
    out.push_str("    if (!$this->supports($capability)) {\n");
    out.push_str(
        "      throw new \\InvalidArgumentException(sprintf('Unsupported capability: %s', $capability));\n",
    );
    out.push_str("    }\n");
    out.push_str(&format!(
        "    $config = $this->configFactory->get('{m}.settings');\n"
    ));
    out.push_str(&format!(
        "    $this->loggerFactory->get('{m}')->info('Dispatching @capability', ['@capability' => $capability]);\n"
    ));
    out.push_str("    return [\n");
    out.push_str("      'capability' => $capability,\n");
    out.push_str("      'timeout' => (int) $config->get('timeout_seconds'),\n");
    out.push_str("      'payload' => $payload,\n");
    out.push_str("    ];\n");
    out.push_str("  }\n\n");
    out.push_str("  public function missingEnvironment(): array {\n");
    out.push_str(&format!(
        "    $required = $this->configFactory->get('{m}.settings')->get('required_env') ?? [];\n"
    ));
    out.push_str(
        "    return array_values(array_filter($required, static fn (string $name): bool => getenv($name) === FALSE));\n",
    );
    out.push_str("  }\n\n");
    out.push_str("}\n");
    out
}

fn dispatcher_test_php(manifest: &Manifest, names: &ModuleNames) -> String {
    let m = &names.machine;
    let class = &names.class;
    let caps = manifest.unique_capabilities();
    let mut out = String::new();
    out.push_str("<?php\n\n");
    out.push_str("declare(strict_types=1);\n\n");
    out.push_str(&format!("namespace Drupal\\Tests\\{m}\\Unit;\n\n"));
    out.push_str("use Drupal\\Core\\Config\\ConfigFactoryInterface;\n");
    out.push_str("use Drupal\\Core\\Logger\\LoggerChannelFactoryInterface;\n");
    out.push_str(&format!("use Drupal\\{m}\\{class};\n"));
    out.push_str("use Drupal\\Tests\\UnitTestCase;\n");
    out.push_str("use GuzzleHttp\\ClientInterface;\n\n");
    out.push_str("/**\n");
    out.push_str(&format!(" * @coversDefaultClass \\Drupal\\{m}\\{class}\n"));
    out.push_str(&format!(" * @group {m}\n"));
    out.push_str(" */\n");
    out.push_str(&format!("final class {class}Test extends UnitTestCase {{\n\n"));
    out.push_str(&format!("  private function dispatcher(): {class} {{\n"));
    out.push_str(&format!("    return new {class}(\n"));
    out.push_str("      $this->createMock(ClientInterface::class),\n");
    out.push_str("      $this->createMock(ConfigFactoryInterface::class),\n");
    out.push_str("      $this->createMock(LoggerChannelFactoryInterface::class),\n");
    out.push_str("    );\n");
    out.push_str("  }\n\n");
    out.push_str("  public function testDeclaresCapabilities(): void {\n");
    out.push_str(&format!(
        "    $this->assertSame({}, {class}::CAPABILITIES);\n",
        php_list(&caps)
    ));
    out.push_str("  }\n\n");
    out.push_str("  /**\n");
    out.push_str("   * @covers ::supports\n");
    out.push_str("   */\n");
    out.push_str("  public function testSupportsOnlyDeclaredCapabilities(): void {\n");
    out.push_str("    $dispatcher = $this->dispatcher();\n");
    for cap in &caps {
        out.push_str(&format!(
            "    $this->assertTrue($dispatcher->supports({}));\n",
            php_str(cap)
        ));
    }
    out.push_str("    $this->assertFalse($dispatcher->supports('undeclared-capability'));\n");
    out.push_str("  }\n\n");
    out.push_str("  /**\n");
    out.push_str("   * @covers ::dispatch\n");
    out.push_str("   */\n");
    out.push_str("  public function testDispatchRejectsUnknownCapability(): void {\n");
    out.push_str("    $this->expectException(\\InvalidArgumentException::class);\n");
    out.push_str("    $this->dispatcher()->dispatch('undeclared-capability', []);\n");
    out.push_str("  }\n\n");
    out.push_str("}\n");
    out
}

fn settings_yml(manifest: &Manifest) -> String {
    let rt = manifest.runtime();
    let mut out = String::new();
    match rt.timeout_seconds {
        Some(timeout) => out.push_str(&format!("timeout_seconds: {timeout}\n")),
        None => out.push_str("timeout_seconds: 30\n"),
    }
    if rt.env.is_empty() {
        out.push_str("required_env: []\n");
    } else {
        out.push_str("required_env:\n");
        for var in &rt.env {
            out.push_str(&format!("  - {var}\n"));
        }
    }
    if let Some(llm) = manifest.llm() {
        out.push_str("llm:\n");
        out.push_str(&format!("  provider: {}\n", yaml_str(&llm.provider)));
        out.push_str(&format!("  model: {}\n", yaml_str(&llm.model)));
    }
    out
}

fn readme(manifest: &Manifest, names: &ModuleNames, tools: &[&ToolBinding]) -> String {
    let m = &names.machine;
    let mut out = readme_header(manifest, "Drupal module");
    out.push_str("## Install\n\n");
    out.push_str(&format!(
        "Copy this directory to `modules/custom/{m}` and enable it:\n\n"
    ));
    out.push_str(&format!("```sh\ndrush en {m}\n```\n\n"));
    out.push_str(&format!(
        "The `{m}.dispatcher` service routes capability requests. Run its unit \
         tests with `phpunit modules/custom/{m}/tests`.\n\n"
    ));
    out.push_str(&readme_env(manifest));
    out.push_str(&readme_tool_bindings(tools));
    out
}

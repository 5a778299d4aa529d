use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod validator;
pub mod watcher;

use crate::cli::Cli;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub server: ServerSettings,
    #[serde(default)]
    pub dev: DevSettings,
    #[serde(default)]
    pub widgets: WidgetSettings,
    #[serde(default)]
    pub generator: GeneratorSettings,
    #[serde(default)]
    pub extractor: ExtractorSettings,
    #[serde(default)]
    pub loader: LoaderSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Shell documents and the directory they (and all modules) are served from.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DevSettings {
    #[serde(default = "default_root")]
    pub root: PathBuf,
    /// Allow-list of shell documents, relative to `root`.
    #[serde(default = "default_shell_documents")]
    pub shell_documents: Vec<String>,
    /// Script reference injected into every served shell document.
    #[serde(default = "default_livereload_script")]
    pub livereload_script: String,
}

impl Default for DevSettings {
    fn default() -> Self {
        Self {
            root: default_root(),
            shell_documents: default_shell_documents(),
            livereload_script: default_livereload_script(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WidgetSettings {
    #[serde(default = "default_widgets_dir")]
    pub dir: PathBuf,
    /// Shared schema/example module that widget sources reference by identifier.
    #[serde(default = "default_shared_module")]
    pub shared: PathBuf,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Selector used when a request carries no `widget` query parameter.
    #[serde(default = "default_widget")]
    pub default_widget: String,
}

impl Default for WidgetSettings {
    fn default() -> Self {
        Self {
            dir: default_widgets_dir(),
            shared: default_shared_module(),
            extensions: default_extensions(),
            default_widget: default_widget(),
        }
    }
}

/// Mock generation policy. These are tunables, not contracts.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct GeneratorSettings {
    #[serde(default = "default_probability")]
    pub optional_probability: f64,
    #[serde(default = "default_probability")]
    pub nullable_probability: f64,
    #[serde(default = "default_array_min")]
    pub array_min: usize,
    #[serde(default = "default_array_max")]
    pub array_max: usize,
    #[serde(default = "default_number_min")]
    pub number_min: i64,
    #[serde(default = "default_number_max")]
    pub number_max: i64,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            optional_probability: default_probability(),
            nullable_probability: default_probability(),
            array_min: default_array_min(),
            array_max: default_array_max(),
            number_min: default_number_min(),
            number_max: default_number_max(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExtractorSettings {
    #[serde(default = "default_output")]
    pub output: PathBuf,
    /// Token whose presence marks a source unit as a widget registration.
    #[serde(default = "default_marker")]
    pub marker: String,
    #[serde(default = "default_example_keys")]
    pub example_keys: Vec<String>,
    #[serde(default = "default_schema_keys")]
    pub schema_keys: Vec<String>,
}

impl Default for ExtractorSettings {
    fn default() -> Self {
        Self {
            output: default_output(),
            marker: default_marker(),
            example_keys: default_example_keys(),
            schema_keys: default_schema_keys(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoaderSettings {
    /// How long an embedded loader waits for host data before giving up.
    #[serde(default = "default_host_timeout_ms")]
    pub host_timeout_ms: u64,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            host_timeout_ms: default_host_timeout_ms(),
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_shell_documents() -> Vec<String> {
    vec!["index.html".to_string(), "test.html".to_string()]
}

fn default_livereload_script() -> String {
    "/__vitrine/livereload.js".to_string()
}

fn default_widgets_dir() -> PathBuf {
    PathBuf::from("widgets")
}

fn default_shared_module() -> PathBuf {
    PathBuf::from("widgets/shared.yaml")
}

fn default_extensions() -> Vec<String> {
    vec!["html".to_string(), "tera".to_string()]
}

fn default_widget() -> String {
    "pokemon".to_string()
}

fn default_probability() -> f64 {
    0.5
}

fn default_array_min() -> usize {
    1
}

fn default_array_max() -> usize {
    3
}

fn default_number_min() -> i64 {
    1
}

fn default_number_max() -> i64 {
    100
}

fn default_output() -> PathBuf {
    PathBuf::from("dist/widget-metadata.json")
}

fn default_marker() -> String {
    "define_widget".to_string()
}

fn default_example_keys() -> Vec<String> {
    vec!["exampleOutput".to_string(), "example_output".to_string()]
}

fn default_schema_keys() -> Vec<String> {
    vec!["schema".to_string()]
}

fn default_host_timeout_ms() -> u64 {
    30_000
}

impl Settings {
    pub fn new() -> Result<Self, anyhow::Error> {
        Self::from_root(".")
    }

    /// Create settings from CLI arguments (includes config file and CLI overrides)
    pub fn new_with_cli(cli: &Cli) -> Result<Self, anyhow::Error> {
        let s = Self::builder(File::from(cli.config.clone()).required(false))?;
        let mut settings: Settings = s.try_deserialize()?;

        // CLI > env vars > config file
        settings.apply_cli_overrides(cli);

        let root = cli.root.clone().unwrap_or_else(|| {
            cli.config
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default()
        });
        settings.rebase(&root);

        settings.validate()?;
        Ok(settings)
    }

    /// Load `vitrine.toml` (or `.yaml`/`.json`) from `root`; relative paths in
    /// the loaded settings are resolved against `root`.
    pub fn from_root(root: &str) -> Result<Self, anyhow::Error> {
        let config_path = Path::new(root).join("vitrine");
        let s = Self::builder(File::from(config_path).required(false))?;
        let mut settings: Settings = s.try_deserialize()?;

        settings.rebase(Path::new(root));
        settings.validate()?;
        Ok(settings)
    }

    fn builder<S>(source: S) -> Result<Config, anyhow::Error>
    where
        S: config::Source + Send + Sync + 'static,
    {
        Ok(Config::builder()
            .add_source(source)
            .add_source(
                Environment::with_prefix("VITRINE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 5173)?
            .build()?)
    }

    fn apply_cli_overrides(&mut self, cli: &Cli) {
        if let Some(host) = &cli.host {
            self.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            self.server.port = port;
        }
        if let Some(output) = &cli.output {
            self.extractor.output = output.clone();
        }
    }

    /// Resolve relative directories against `root`.
    pub fn rebase(&mut self, root: &Path) {
        fn join(root: &Path, path: &mut PathBuf) {
            if path.is_relative() {
                *path = root.join(&*path);
            }
        }
        join(root, &mut self.dev.root);
        join(root, &mut self.widgets.dir);
        join(root, &mut self.widgets.shared);
        join(root, &mut self.extractor.output);
    }

    fn validate(&self) -> Result<(), anyhow::Error> {
        validator::ConfigValidator::validate(self).map_err(|errors| {
            let error_messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            anyhow::anyhow!(
                "Configuration validation failed:\n{}",
                error_messages.join("\n")
            )
        })
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 5173,
            },
            dev: DevSettings::default(),
            widgets: WidgetSettings::default(),
            generator: GeneratorSettings::default(),
            extractor: ExtractorSettings::default(),
            loader: LoaderSettings::default(),
        }
    }
}

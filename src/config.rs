use crate::error::{PanelError, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 7860;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub share: bool,
    /// Lets `/api/dispatch` read server-side image paths sent by the client.
    pub allow_path_inputs: bool,
}

/// How the external generator is launched.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub program: String,
    /// Leading arguments placed before any flag, e.g. the script path.
    pub base_args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub timeout: Duration,
    pub temp_dir: Option<PathBuf>,
}

/// Secrets consumed by the generator itself. Only their presence is ever logged.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub hf_token: Option<String>,
    pub google_api_key: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub server: ServerConfig,
    pub generator: GeneratorConfig,
    pub credentials: Credentials,
}

fn flag_from_env(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map_or(default, |val| val.trim().eq_ignore_ascii_case("true"))
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|val| !val.trim().is_empty())
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            share: true,
            allow_path_inputs: false,
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let host = non_empty_var("GRADIO_SERVER_NAME").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = env::var("GRADIO_SERVER_PORT")
            .ok()
            .and_then(|port| port.trim().parse().ok())
            .unwrap_or(DEFAULT_PORT);
        let share = flag_from_env("GRADIO_SHARE", true);
        let allow_path_inputs = flag_from_env("FIBO_ALLOW_PATH_INPUTS", false);

        ServerConfig {
            host,
            port,
            share,
            allow_path_inputs,
        }
    }

    pub fn with_bind(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    pub fn with_share(mut self, share: bool) -> Self {
        self.share = share;
        self
    }

    pub fn with_path_inputs(mut self, allowed: bool) -> Self {
        self.allow_path_inputs = allowed;
        self
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            program: "python".to_string(),
            base_args: vec!["generate.py".to_string()],
            working_dir: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            temp_dir: None,
        }
    }
}

impl GeneratorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        let program = non_empty_var("FIBO_PROGRAM").unwrap_or(defaults.program);
        let base_args = match env::var("FIBO_SCRIPT") {
            Ok(script) if script.trim().is_empty() => Vec::new(),
            Ok(script) => vec![script],
            Err(_) => defaults.base_args,
        };
        let working_dir = non_empty_var("FIBO_WORKDIR").map(PathBuf::from);
        let timeout = env::var("FIBO_TIMEOUT_SECS")
            .ok()
            .and_then(|secs| secs.trim().parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);
        let temp_dir = non_empty_var("FIBO_TEMP_DIR").map(PathBuf::from);

        GeneratorConfig {
            program,
            base_args,
            working_dir,
            timeout,
            temp_dir,
        }
    }

    /// Run `program` directly with no leading arguments.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self.base_args.clear();
        self
    }

    pub fn with_base_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.base_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }
}

impl Credentials {
    pub fn from_env() -> Self {
        Credentials {
            hf_token: non_empty_var("HF_TOKEN"),
            google_api_key: non_empty_var("GOOGLE_API_KEY"),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        Config {
            server: ServerConfig::from_env(),
            generator: GeneratorConfig::from_env(),
            credentials: Credentials::from_env(),
        }
    }

    pub fn with_server(mut self, server: ServerConfig) -> Self {
        self.server = server;
        self
    }

    pub fn with_generator(mut self, generator: GeneratorConfig) -> Self {
        self.generator = generator;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.generator.program.trim().is_empty() {
            return Err(PanelError::ConfigError(
                "generator program must not be empty".into(),
            ));
        }
        if self.generator.timeout.is_zero() {
            return Err(PanelError::ConfigError(
                "generator timeout must be greater than zero".into(),
            ));
        }
        if let Some(dir) = &self.generator.temp_dir {
            if !dir.is_dir() {
                return Err(PanelError::ConfigError(format!(
                    "temp dir {} does not exist",
                    dir.display()
                )));
            }
        }
        Ok(())
    }
}

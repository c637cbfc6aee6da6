use crate::error::{to_env_var, ConfigError};
use config::{Config, Environment, File};
use quill::normalize::ImageMode;
use quill::providers::{
    base::ModelSettings,
    configs::{OpenAiProviderConfig, ProviderConfig},
    factory::ProviderType,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

const CONFIG_FILE: &str = "quill";

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Upper bound on a whole multipart request
    pub max_upload_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid listen address {}:{}: {}", self.host, self.port, e))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum ProviderSettings {
    OpenAi {
        host: String,
        api_key: String,
        timeout_secs: u64,
    },
}

impl ProviderSettings {
    pub fn to_config(&self) -> ProviderConfig {
        match self {
            ProviderSettings::OpenAi {
                host,
                api_key,
                timeout_secs,
            } => ProviderConfig::OpenAi(
                OpenAiProviderConfig::new(host, api_key)
                    .with_timeout(Duration::from_secs(*timeout_secs)),
            ),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelsSettings {
    pub chat: String,
    pub vision: String,
}

impl Default for ModelsSettings {
    fn default() -> Self {
        Self {
            chat: default_chat_model(),
            vision: default_vision_model(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatSettings {
    pub temperature: f32,
    pub max_tokens: i32,
    pub image_policy: ImageMode,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 4096,
            image_policy: ImageMode::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GradingSettings {
    pub temperature: f32,
    pub max_tokens: i32,
}

impl Default for GradingSettings {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_tokens: 4096,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcrSettings {
    pub max_tokens: i32,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self { max_tokens: 2048 }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub provider: ProviderSettings,
    pub models: ModelsSettings,
    pub chat: ChatSettings,
    pub grading: GradingSettings,
    pub ocr: OcrSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load(CONFIG_FILE)
    }

    /// Defaults, then the optional config file, then `QUILL_*` environment variables
    pub fn load(config_file: &str) -> Result<Self, ConfigError> {
        let server = ServerSettings::default();
        let chat = ChatSettings::default();
        let grading = GradingSettings::default();
        let ocr = OcrSettings::default();

        let config = Config::builder()
            // Server defaults
            .set_default("server.host", server.host)?
            .set_default("server.port", server.port)?
            .set_default("server.max_upload_bytes", server.max_upload_bytes as u64)?
            // Provider defaults
            .set_default("provider.type", ProviderType::OpenAi.to_string())?
            .set_default("provider.host", default_openai_host())?
            .set_default("provider.timeout_secs", 600u64)?
            // Endpoint defaults
            .set_default("models.chat", default_chat_model())?
            .set_default("models.vision", default_vision_model())?
            .set_default("chat.temperature", chat.temperature as f64)?
            .set_default("chat.max_tokens", chat.max_tokens)?
            .set_default("chat.image_policy", chat.image_policy.to_string())?
            .set_default("grading.temperature", grading.temperature as f64)?
            .set_default("grading.max_tokens", grading.max_tokens)?
            .set_default("ocr.max_tokens", ocr.max_tokens)?
            .add_source(File::with_name(config_file).required(false))
            // Layer on the environment variables
            .add_source(
                Environment::with_prefix("QUILL")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        // A blank key would only fail later, on the first request
        match config.get_string("provider.api_key") {
            Ok(key) if !key.trim().is_empty() => {}
            _ => {
                return Err(ConfigError::MissingEnvVar {
                    env_var: to_env_var("provider.api_key"),
                })
            }
        }

        let result: Result<Self, config::ConfigError> = config.try_deserialize();

        match result {
            Ok(settings) => Ok(settings),
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);

                let error_str = err.to_string();
                if error_str.starts_with("missing field") {
                    // "missing field `type`"
                    let field = error_str
                        .trim_start_matches("missing field `")
                        .trim_end_matches('`');
                    let env_var = to_env_var(field);
                    Err(ConfigError::MissingEnvVar { env_var })
                } else if let config::ConfigError::NotFound(field) = &err {
                    let env_var = to_env_var(field);
                    Err(ConfigError::MissingEnvVar { env_var })
                } else {
                    Err(ConfigError::Other(err))
                }
            }
        }
    }

    pub fn chat_model(&self) -> ModelSettings {
        ModelSettings::new(&self.models.chat)
            .with_temperature(self.chat.temperature)
            .with_max_tokens(self.chat.max_tokens)
    }

    pub fn grading_model(&self) -> ModelSettings {
        ModelSettings::new(&self.models.chat)
            .with_temperature(self.grading.temperature)
            .with_max_tokens(self.grading.max_tokens)
    }

    pub fn ocr_model(&self) -> ModelSettings {
        ModelSettings::new(&self.models.vision).with_max_tokens(self.ocr.max_tokens)
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_max_upload_bytes() -> usize {
    128 * 1024 * 1024
}

fn default_openai_host() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_chat_model() -> String {
    "qwen-plus".to_string()
}

fn default_vision_model() -> String {
    "qwen-vl-ocr-latest".to_string()
}

use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub http: HttpConfig,
    pub recognition: RecognitionConfig,
    pub llm: LlmConfig,
    pub relay: RelayConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct RecognitionConfig {
    /// Recognition engine WebSocket endpoint.
    pub url: String,
    /// Acoustic model selector sent on the start control line.
    pub engine: String,
    /// API key for the engine (env: AMIVOICE_APPKEY).
    pub appkey: String,
}

#[derive(Debug, Deserialize)]
pub struct LlmConfig {
    /// API key for the generation service (env: GEMINI_API_KEY).
    pub api_key: String,
    pub model: String,
    /// Base URL of the generation API; overridable for tests.
    pub base_url: String,
    pub system_instruction: String,
}

/// Settings forwarded to the telephony provider's TTS/transcription leg via
/// the call wiring document.
#[derive(Debug, Deserialize)]
pub struct RelayConfig {
    pub language_code: String,
    pub tts_provider: String,
    pub voice: String,
    pub transcription_provider: String,
    pub speech_model: String,
}

impl Config {
    /// Load configuration: built-in defaults, overlaid by an optional config
    /// file, overlaid by environment variables (`HTTP__PORT` style nesting;
    /// the two secrets also accept their conventional flat names).
    pub fn load(path: &str) -> Result<Self> {
        let mut builder = config::Config::builder()
            .set_default("http.bind", "0.0.0.0")?
            .set_default("http.port", 8000_i64)?
            .set_default("recognition.url", "wss://acp-api.amivoice.com/v1/")?
            .set_default("recognition.engine", "-a-general")?
            .set_default("recognition.appkey", "")?
            .set_default("llm.api_key", "")?
            .set_default("llm.model", "gemini-2.5-flash-lite")?
            .set_default("llm.base_url", "https://generativelanguage.googleapis.com")?
            .set_default(
                "llm.system_instruction",
                "あなたはプロフェッショナルで、電話応対を行うスペシャリストです。回答は全て短文でわかりやすく話してください。",
            )?
            .set_default("relay.language_code", "ja-JP")?
            .set_default("relay.tts_provider", "google")?
            .set_default("relay.voice", "ja-JP-Chirp3-HD-Aoede")?
            .set_default("relay.transcription_provider", "google")?
            .set_default("relay.speech_model", "long")?
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::default().separator("__"));

        if let Ok(key) = std::env::var("AMIVOICE_APPKEY") {
            builder = builder.set_override("recognition.appkey", key)?;
        }
        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            builder = builder.set_override("llm.api_key", key)?;
        }

        Ok(builder.build()?.try_deserialize()?)
    }
}

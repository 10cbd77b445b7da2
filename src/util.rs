const TELEGRAM_TOKEN: &str = "PINGWATCH_TELEGRAM_TOKEN";

pub fn get_telegram_token() -> Option<String> {
    std::env::var(TELEGRAM_TOKEN)
        .ok()
        .filter(|token| !token.trim().is_empty())
}

const TELEGRAM_CHAT_ID: &str = "PINGWATCH_TELEGRAM_CHAT_ID";

pub fn get_telegram_chat_id() -> Option<String> {
    std::env::var(TELEGRAM_CHAT_ID)
        .ok()
        .filter(|chat_id| !chat_id.trim().is_empty())
}

const CONFIG_FILE: &str = "PINGWATCH_CONFIG";

const DEFAULT_CONFIG_FILE: &str = "./pingwatch.json";

pub fn get_config_file() -> String {
    std::env::var(CONFIG_FILE).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string())
}

/// Round a millisecond value to one decimal place.
pub fn round_ms(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

//! Remote endpoints used by the broker adapters and the notifier.

/// Default SmartAPI REST base URL.
pub const SMARTAPI_BASE_URL: &str = "https://apiconnect.angelone.in";
/// Password + TOTP login.
pub const LOGIN_PATH: &str = "/rest/auth/angelbroking/user/v1/loginByPassword";
/// Market data quote (LTP/OHLC/FULL modes).
pub const MARKET_QUOTE_PATH: &str = "/rest/secure/angelbroking/market/v1/quote/";
/// Legacy single-instrument LTP endpoint.
pub const LTP_DATA_PATH: &str = "/rest/secure/angelbroking/order/v1/getLtpData";
/// Option greeks for an underlying and expiry.
pub const OPTION_GREEK_PATH: &str = "/rest/secure/angelbroking/marketData/v1/optionGreek";

/// Default Telegram Bot API base URL.
pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Join a base URL and a path without doubling the separator.
pub fn url(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

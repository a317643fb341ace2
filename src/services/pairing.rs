//! Match identifiers travelling from the keeper to a display through a scanned code.

use qrcode::{QrCode, types::QrError};
use rand::Rng;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::warn;
use url::Url;

use crate::{config::AppConfig, state::MatchId};

/// Query parameter carrying the identifier in the URL form.
pub const MATCH_QUERY_PARAM: &str = "match";
/// Query parameter telling the target page to open in display mode.
pub const DISPLAY_QUERY_PARAM: &str = "display";
/// Random characters appended after the time component.
const RANDOM_SUFFIX_LEN: usize = 6;
const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Pairing failures.
#[derive(Debug, Error)]
pub enum PairingError {
    /// The scanned text carries no usable match identifier.
    #[error("not a match code")]
    NotAMatchCode,
    /// The payload does not fit in a QR code.
    #[error("failed to render pairing code")]
    Render(#[source] QrError),
}

/// Shape of the payload handed to displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairingTarget {
    /// The identifier alone.
    Bare,
    /// A link to the display page with the identifier as `match` query parameter.
    DisplayUrl(Url),
}

impl PairingTarget {
    /// URL form when a usable `display_url` is configured, bare otherwise.
    pub fn from_config(config: &AppConfig) -> Self {
        let Some(raw) = config.display_url.as_deref() else {
            return PairingTarget::Bare;
        };
        match Url::parse(raw) {
            Ok(url) => PairingTarget::DisplayUrl(url),
            Err(err) => {
                warn!(display_url = %raw, error = %err, "invalid display url; using bare codes");
                PairingTarget::Bare
            }
        }
    }
}

/// Scannable payload for one match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingCode {
    payload: String,
}

impl PairingCode {
    /// Text encoded in the code.
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Render the payload as a QR code drawn with block characters.
    pub fn render(&self) -> Result<String, PairingError> {
        let code = QrCode::new(self.payload.as_bytes()).map_err(PairingError::Render)?;
        Ok(code
            .render::<char>()
            .quiet_zone(true)
            .module_dimensions(2, 1)
            .build())
    }
}

/// Fresh identifier: base36 milliseconds since the epoch followed by a random suffix.
pub fn mint() -> MatchId {
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    let mut raw = to_base36(millis.max(0) as u128);

    let mut rng = rand::rng();
    for _ in 0..RANDOM_SUFFIX_LEN {
        raw.push(BASE36[rng.random_range(0..BASE36.len())] as char);
    }
    MatchId::from_minted(raw)
}

fn to_base36(mut value: u128) -> String {
    if value == 0 {
        return "0".into();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

/// Build the payload for `id` in the shape `target` asks for.
pub fn encode(id: &MatchId, target: &PairingTarget) -> PairingCode {
    let payload = match target {
        PairingTarget::Bare => id.to_string(),
        PairingTarget::DisplayUrl(base) => {
            let mut url = base.clone();
            let kept: Vec<(String, String)> = base
                .query_pairs()
                .filter(|(key, _)| key != MATCH_QUERY_PARAM && key != DISPLAY_QUERY_PARAM)
                .map(|(key, value)| (key.into_owned(), value.into_owned()))
                .collect();
            url.query_pairs_mut()
                .clear()
                .extend_pairs(kept)
                .append_pair(DISPLAY_QUERY_PARAM, "1")
                .append_pair(MATCH_QUERY_PARAM, id.as_str());
            url.into()
        }
    };
    PairingCode { payload }
}

/// Extract the identifier from a scanned payload, URL or bare token.
pub fn decode(scanned: &str) -> Result<MatchId, PairingError> {
    let text = scanned.trim();

    if let Ok(url) = Url::parse(text) {
        return url
            .query_pairs()
            .find(|(key, _)| key == MATCH_QUERY_PARAM)
            .and_then(|(_, value)| MatchId::parse(&value).ok())
            .ok_or(PairingError::NotAMatchCode);
    }

    MatchId::parse(text).map_err(|_| PairingError::NotAMatchCode)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url_target() -> PairingTarget {
        PairingTarget::DisplayUrl(Url::parse("https://scores.example/board").unwrap())
    }

    #[test]
    fn decodes_display_link() {
        let id = decode("https://host/?display=1&match=abc123").unwrap();
        assert_eq!(id.as_str(), "abc123");
    }

    #[test]
    fn rejects_garbage_without_panicking() {
        assert!(matches!(
            decode("not-a-url-or-token"),
            Err(PairingError::NotAMatchCode)
        ));
        assert!(decode("").is_err());
        assert!(decode("https://host/?display=1").is_err());
        assert!(decode("https://host/?match=a/b").is_err());
    }

    #[test]
    fn bare_token_round_trips() {
        let id = mint();
        let code = encode(&id, &PairingTarget::Bare);
        assert_eq!(code.payload(), id.as_str());
        assert_eq!(decode(code.payload()).unwrap(), id);
    }

    #[test]
    fn url_form_round_trips() {
        let id = MatchId::parse("abc123").unwrap();
        let code = encode(&id, &url_target());
        assert_eq!(
            code.payload(),
            "https://scores.example/board?display=1&match=abc123"
        );
        assert_eq!(decode(code.payload()).unwrap(), id);
    }

    #[test]
    fn url_form_replaces_stale_parameters() {
        let base = Url::parse("https://host/?theme=dark&match=old999").unwrap();
        let id = MatchId::parse("new123").unwrap();
        let code = encode(&id, &PairingTarget::DisplayUrl(base));
        assert_eq!(code.payload(), "https://host/?theme=dark&display=1&match=new123");
    }

    #[test]
    fn minted_ids_are_valid_and_distinct() {
        let first = mint();
        let second = mint();
        assert!(MatchId::parse(first.as_str()).is_ok());
        assert_ne!(first, second);
    }

    #[test]
    fn target_follows_display_url() {
        let mut config = AppConfig::default();
        assert_eq!(PairingTarget::from_config(&config), PairingTarget::Bare);

        config.display_url = Some("https://scores.example/board".into());
        assert_eq!(PairingTarget::from_config(&config), url_target());

        config.display_url = Some("::not a url::".into());
        assert_eq!(PairingTarget::from_config(&config), PairingTarget::Bare);
    }

    #[test]
    fn renders_block_code() {
        let code = encode(&MatchId::parse("abc123").unwrap(), &PairingTarget::Bare);
        let rendered = code.render().unwrap();
        assert!(rendered.lines().count() > 10);
    }
}

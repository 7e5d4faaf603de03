//! Client for the HYP launcher API.

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use hypmirror_catalogue::hyp::{GameInfo, GamePackage};
use hypmirror_fetch::retry_delay;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::SourceError;

const MIHOYO_API_BASE: &str = "https://hyp-api.mihoyo.com/hyp/hyp-connect/api/";
const HOYOVERSE_API_BASE: &str = "https://sg-hyp-api.hoyoverse.com/hyp/hyp-connect/api/";

/// Attempts per request, the first included.
const MAX_ATTEMPTS: u32 = 3;
const RETRY_BASE: Duration = Duration::from_secs(1);

/// Launchers with a known id and API base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Launcher {
    MiHoYoLauncher,
    HoYoPlay,
    BilibiliGenshin,
    BilibiliStarRail,
    BilibiliZzz,
}

impl Launcher {
    pub const ALL: [Self; 5] = [
        Self::MiHoYoLauncher,
        Self::HoYoPlay,
        Self::BilibiliGenshin,
        Self::BilibiliStarRail,
        Self::BilibiliZzz,
    ];

    /// Name used in the config file.
    pub fn name(self) -> &'static str {
        match self {
            Self::MiHoYoLauncher => "miHoYoLauncher",
            Self::HoYoPlay => "HoYoPlay",
            Self::BilibiliGenshin => "BilibiliGenshin",
            Self::BilibiliStarRail => "BilibiliStarRail",
            Self::BilibiliZzz => "BilibiliZZZ",
        }
    }

    pub fn id(self) -> &'static str {
        match self {
            Self::MiHoYoLauncher => "jGHBHlcOq1",
            Self::HoYoPlay => "VYTpXlbWo8",
            Self::BilibiliGenshin => "umfgRO5gh5",
            Self::BilibiliStarRail => "6P5gHMNyK3",
            Self::BilibiliZzz => "xV0f4r1GT0",
        }
    }

    pub fn api_base(self) -> &'static str {
        match self {
            Self::HoYoPlay => HOYOVERSE_API_BASE,
            _ => MIHOYO_API_BASE,
        }
    }

    /// `(channel, sub_channel)` the official launcher sends.
    pub fn default_channel(self) -> (&'static str, &'static str) {
        match self {
            Self::MiHoYoLauncher | Self::HoYoPlay => ("1", "1"),
            _ => ("14", "0"),
        }
    }
}

impl fmt::Display for Launcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

impl FromStr for Launcher {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|launcher| launcher.name() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// Where catalogues come from.
pub trait CatalogueSource: Send + Sync {
    /// Launcher id reported alongside each stream.
    fn launcher_id(&self) -> &str;

    /// Games the launcher offers.
    fn games(&self) -> impl Future<Output = Result<Vec<GameInfo>, SourceError>> + Send;

    /// Package catalogues for `game_ids`, fetched in one request.
    fn game_packages(&self, game_ids: &[String]) -> impl Future<Output = Result<Vec<GamePackage>, SourceError>> + Send;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LauncherOptions {
    pub language:    Option<String>,
    pub channel:     Option<String>,
    pub sub_channel: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HypClient {
    http:        reqwest::Client,
    launcher:    Launcher,
    api_base:    Url,
    language:    Option<String>,
    channel:     String,
    sub_channel: String,
    retry_base:  Duration,
}

impl HypClient {
    pub fn new(launcher: Launcher, options: LauncherOptions) -> Result<Self, SourceError> {
        let (channel, sub_channel) = launcher.default_channel();
        Ok(Self {
            http: reqwest::Client::new(),
            launcher,
            api_base: Url::parse(launcher.api_base())?,
            language: options.language,
            channel: options.channel.unwrap_or_else(|| channel.to_string()),
            sub_channel: options.sub_channel.unwrap_or_else(|| sub_channel.to_string()),
            retry_base: RETRY_BASE,
        })
    }

    #[must_use]
    pub fn with_http(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    #[must_use]
    pub fn with_api_base(mut self, api_base: Url) -> Self {
        self.api_base = api_base;
        self
    }

    #[must_use]
    pub fn with_retry_base(mut self, retry_base: Duration) -> Self {
        self.retry_base = retry_base;
        self
    }

    pub fn launcher(&self) -> Launcher { self.launcher }

    pub fn channel(&self) -> (&str, &str) { (&self.channel, &self.sub_channel) }

    /// URL of `api` with the launcher id, the language when asked for, and
    /// one `game_ids[]` pair per id.
    pub fn endpoint(&self, api: &str, with_language: bool, game_ids: &[String]) -> Result<Url, SourceError> {
        let mut url = self.api_base.join(api)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("launcher_id", self.launcher.id());
            if with_language && let Some(language) = &self.language {
                query.append_pair("language", language);
            }
            for id in game_ids {
                query.append_pair("game_ids[]", id);
            }
        }
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(&self, url: Url, field: &'static str) -> Result<T, SourceError> {
        let mut attempt = 0;
        loop {
            match self.get_once(&url, field).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt + 1 < MAX_ATTEMPTS => {
                    let delay = retry_delay(attempt, self.retry_base);
                    tracing::warn!(%url, attempt = attempt + 1, error = %e, ?delay, "launcher API request failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn get_once<T: DeserializeOwned>(&self, url: &Url, field: &'static str) -> Result<T, SourceError> {
        let request_error = |source| SourceError::Request {
            url: url.to_string(),
            source,
        };
        let response = self.http.get(url.clone()).send().await.map_err(request_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::HttpStatus {
                status: status.as_u16(),
                url:    url.to_string(),
            });
        }
        let body = response.bytes().await.map_err(request_error)?;
        parse_envelope(&body, field)
    }
}

impl CatalogueSource for HypClient {
    fn launcher_id(&self) -> &str { self.launcher.id() }

    async fn games(&self) -> Result<Vec<GameInfo>, SourceError> {
        let url = self.endpoint("getGames", true, &[])?;
        self.get(url, "games").await
    }

    async fn game_packages(&self, game_ids: &[String]) -> Result<Vec<GamePackage>, SourceError> {
        let url = self.endpoint("getGamePackages", false, game_ids)?;
        self.get(url, "game_packages").await
    }
}

#[derive(Deserialize)]
struct Envelope {
    retcode: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data:    Option<serde_json::Value>,
}

/// Unwrap `{ retcode, message, data }` and decode `data.<field>`.
pub fn parse_envelope<T: DeserializeOwned>(body: &[u8], field: &'static str) -> Result<T, SourceError> {
    let envelope: Envelope = serde_json::from_slice(body)?;
    if envelope.retcode != 0 {
        return Err(SourceError::Api {
            retcode: envelope.retcode,
            message: envelope.message,
        });
    }
    let value = envelope
        .data
        .and_then(|mut data| data.get_mut(field).map(serde_json::Value::take))
        .ok_or(SourceError::MissingField(field))?;
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(language: Option<&str>) -> HypClient {
        HypClient::new(Launcher::HoYoPlay, LauncherOptions {
            language: language.map(str::to_string),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_launcher_names_round_trip() {
        for launcher in Launcher::ALL {
            assert_eq!(launcher.name().parse::<Launcher>(), Ok(launcher));
        }
        assert!("Steam".parse::<Launcher>().is_err());
    }

    #[test]
    fn test_default_channels() {
        assert_eq!(client(None).channel(), ("1", "1"));
        let bilibili = HypClient::new(Launcher::BilibiliZzz, LauncherOptions::default()).unwrap();
        assert_eq!(bilibili.channel(), ("14", "0"));
        assert_eq!(bilibili.launcher().api_base(), MIHOYO_API_BASE);
    }

    #[test]
    fn test_endpoint_query() {
        let url = client(Some("en-us")).endpoint("getGames", true, &[]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://sg-hyp-api.hoyoverse.com/hyp/hyp-connect/api/getGames?launcher_id=VYTpXlbWo8&language=en-us"
        );

        let ids = ["gopR6Cufr3".to_string(), "4ziysqXOQ8".to_string()];
        let url = client(Some("en-us")).endpoint("getGamePackages", false, &ids).unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs, [
            ("launcher_id".to_string(), "VYTpXlbWo8".to_string()),
            ("game_ids[]".to_string(), "gopR6Cufr3".to_string()),
            ("game_ids[]".to_string(), "4ziysqXOQ8".to_string()),
        ]);
    }

    #[test]
    fn test_parse_envelope() {
        let body = br#"{"retcode": 0, "message": "OK", "data": {"games": [{"id": "x", "biz": "nap_global"}]}}"#;
        let games: Vec<GameInfo> = parse_envelope(body, "games").unwrap();
        assert_eq!(games[0].biz, "nap_global");
    }

    #[test]
    fn test_parse_envelope_api_error() {
        let body = br#"{"retcode": -1, "message": "launcher not found", "data": null}"#;
        let err = parse_envelope::<Vec<GameInfo>>(body, "games").unwrap_err();
        assert!(matches!(err, SourceError::Api { retcode: -1, .. }));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_parse_envelope_missing_field() {
        let body = br#"{"retcode": 0, "message": "OK", "data": {}}"#;
        let err = parse_envelope::<Vec<GamePackage>>(body, "game_packages").unwrap_err();
        assert!(matches!(err, SourceError::MissingField("game_packages")));
    }

    #[test]
    fn test_transient_statuses() {
        let status = |status| SourceError::HttpStatus {
            status,
            url: String::new(),
        };
        assert!(status(503).is_transient());
        assert!(status(429).is_transient());
        assert!(!status(404).is_transient());
    }
}

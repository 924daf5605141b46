use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::models::MapKind;

// Главная структура конфигурации - контейнер для всех настроек
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub backend: BackendConfig,
    pub realtime: RealtimeConfig,
    pub viewport: ViewportConfig,
}

// Настройки приложения
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub rust_log: String,
}

// Адрес бэкенда (host:port), из него строятся HTTP и WebSocket адреса
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    pub address: String,
    pub http_timeout_seconds: u64,
    /// Вид карты для `/api/map?type=...`; без него грузится `/api/seatmap`.
    pub map_kind: Option<MapKind>,
}

// Настройки push-канала
#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeConfig {
    pub reconnect_delay_ms: u64,
}

// Настройки жестов и анимаций карты
#[derive(Debug, Clone, Deserialize)]
pub struct ViewportConfig {
    pub min_scale: f64,
    pub max_scale: f64,
    pub zoom_threshold: f64,
    pub spring_stiffness: f64,
    pub spring_damping: f64,
    pub touch_threshold: f64,
    pub window_width: f64,
    pub window_height: f64,
    pub frame_interval_ms: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be a valid number, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
    #[error("MAP_KIND must be sectionMap or seatMap, got {0:?}")]
    InvalidMapKind(String),
    #[error("{name} must be a finite number, got {value}")]
    NotFinite { name: &'static str, value: f64 },
    #[error("MIN_SCALE ({min}) must be positive and not greater than MAX_SCALE ({max})")]
    InvalidScaleBounds { min: f64, max: f64 },
    #[error("{name} must be positive, got {value}")]
    NotPositive { name: &'static str, value: f64 },
}

impl Default for Config {
    fn default() -> Self {
        Config {
            app: AppConfig {
                rust_log: "seat_map_client=debug".to_string(),
            },
            backend: BackendConfig {
                address: "127.0.0.1:8090".to_string(),
                http_timeout_seconds: 30,
                map_kind: None,
            },
            realtime: RealtimeConfig {
                reconnect_delay_ms: 1000,
            },
            viewport: ViewportConfig::default(),
        }
    }
}

impl Default for ViewportConfig {
    fn default() -> Self {
        ViewportConfig {
            min_scale: 0.5,
            max_scale: 2.0,
            zoom_threshold: 1.5,
            spring_stiffness: 100.0,
            spring_damping: 15.0,
            touch_threshold: 15.0,
            window_width: 390.0,
            window_height: 844.0,
            frame_interval_ms: 16,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();
        let view = defaults.viewport;

        let viewport = ViewportConfig {
            min_scale: parse_finite_or("MIN_SCALE", view.min_scale)?,
            max_scale: parse_finite_or("MAX_SCALE", view.max_scale)?,
            zoom_threshold: parse_finite_or("ZOOM_THRESHOLD", view.zoom_threshold)?,
            spring_stiffness: parse_finite_or("SPRING_STIFFNESS", view.spring_stiffness)?,
            spring_damping: parse_finite_or("SPRING_DAMPING", view.spring_damping)?,
            touch_threshold: parse_finite_or("TOUCH_THRESHOLD", view.touch_threshold)?,
            window_width: parse_finite_or("WINDOW_WIDTH", view.window_width)?,
            window_height: parse_finite_or("WINDOW_HEIGHT", view.window_height)?,
            frame_interval_ms: parse_or("FRAME_INTERVAL_MS", view.frame_interval_ms)?,
        };
        viewport.validate()?;

        Ok(Config {
            app: AppConfig {
                rust_log: env::var("RUST_LOG").unwrap_or(defaults.app.rust_log),
            },
            backend: BackendConfig {
                address: env::var("BACKEND_ADDRESS").unwrap_or(defaults.backend.address),
                http_timeout_seconds: parse_or(
                    "HTTP_TIMEOUT_SECONDS",
                    defaults.backend.http_timeout_seconds,
                )?,
                map_kind: match env::var("MAP_KIND") {
                    Ok(value) => Some(
                        MapKind::from_query(&value).ok_or(ConfigError::InvalidMapKind(value))?,
                    ),
                    Err(_) => None,
                },
            },
            realtime: RealtimeConfig {
                reconnect_delay_ms: parse_or(
                    "RECONNECT_DELAY_MS",
                    defaults.realtime.reconnect_delay_ms,
                )?,
            },
            viewport,
        })
    }
}

impl BackendConfig {
    /// Базовый адрес для HTTP-запросов, например `http://127.0.0.1:8090`.
    pub fn base_url(&self) -> String {
        let (secure, host) = self.split_scheme();
        let scheme = if secure { "https" } else { "http" };
        format!("{}://{}", scheme, host)
    }

    /// Адрес push-канала, например `ws://127.0.0.1:8090/ws`.
    pub fn websocket_url(&self) -> String {
        let (secure, host) = self.split_scheme();
        let scheme = if secure { "wss" } else { "ws" };
        format!("{}://{}/ws", scheme, host)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_seconds)
    }

    // Адрес может прийти как голый host:port или с http(s):// префиксом
    fn split_scheme(&self) -> (bool, &str) {
        let address = self.address.trim().trim_end_matches('/');
        if let Some(host) = address.strip_prefix("https://") {
            (true, host)
        } else if let Some(host) = address.strip_prefix("http://") {
            (false, host)
        } else {
            (false, address)
        }
    }
}

impl RealtimeConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

impl ViewportConfig {
    /// Проверяет числа, которые потом идут в `f64::clamp` и пружины.
    /// NaN и бесконечности отвергаются: `clamp` с NaN в границах паникует.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("MIN_SCALE", self.min_scale),
            ("MAX_SCALE", self.max_scale),
            ("ZOOM_THRESHOLD", self.zoom_threshold),
            ("SPRING_STIFFNESS", self.spring_stiffness),
            ("SPRING_DAMPING", self.spring_damping),
            ("TOUCH_THRESHOLD", self.touch_threshold),
            ("WINDOW_WIDTH", self.window_width),
            ("WINDOW_HEIGHT", self.window_height),
        ];
        for (name, value) in fields {
            finite(name, value)?;
        }

        if self.min_scale <= 0.0 || self.min_scale > self.max_scale {
            return Err(ConfigError::InvalidScaleBounds {
                min: self.min_scale,
                max: self.max_scale,
            });
        }
        if self.spring_stiffness <= 0.0 {
            return Err(ConfigError::NotPositive {
                name: "SPRING_STIFFNESS",
                value: self.spring_stiffness,
            });
        }
        Ok(())
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms.max(1))
    }
}

fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { name, value }),
        Err(_) => Ok(default),
    }
}

fn parse_finite_or(name: &'static str, default: f64) -> Result<f64, ConfigError> {
    finite(name, parse_or(name, default)?)
}

fn finite(name: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ConfigError::NotFinite { name, value })
    }
}

//! reqwest implementations of the collaborator traits
//!
//! Response bodies are decoded by free `parse_*` functions so the mapping
//! from vendor JSON to records is testable without a network.
use crate::clients::{EventsClient, PlacesClient, SearchClient, WeatherClient};
use crate::error::ClientError;
use async_trait::async_trait;
use chrono::NaiveDate;
use guide_core::{DailyForecast, EventRecord, PlaceCategory, PlaceRecord, ProviderSettings};
use guide_resilience::{namespaces, CacheStore};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_SEARCH_ENDPOINT: &str = "https://api.openai.com/v1";
pub const DEFAULT_SEARCH_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_WEATHER_ENDPOINT: &str = "https://api.open-meteo.com/v1";
pub const DEFAULT_GEOCODE_ENDPOINT: &str = "https://geocoding-api.open-meteo.com/v1";
pub const DEFAULT_PLACES_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/place";
pub const DEFAULT_EVENTS_ENDPOINT: &str = "https://app.ticketmaster.com/discovery/v2";

const SYSTEM_PROMPT: &str = "You are a travel guide writer. Reply with a single JSON object only.";

/// Map an HTTP status to a client error
pub fn classify_status(status: u16, body: &str) -> ClientError {
    let message = truncate(body, 200);
    match status {
        401 | 403 => ClientError::Auth(format!("{}: {}", status, message)),
        429 => ClientError::RateLimited(message),
        400 | 404 | 422 => ClientError::BadRequest(format!("{}: {}", status, message)),
        _ => ClientError::Upstream { status, message },
    }
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

/// Shared reqwest client with a transport-level timeout
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, ClientError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ClientError::Network(e.to_string()))
}

async fn checked(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(classify_status(status.as_u16(), &body))
}

fn endpoint(settings: &ProviderSettings, default: &str) -> String {
    settings
        .endpoint
        .clone()
        .unwrap_or_else(|| default.to_string())
        .trim_end_matches('/')
        .to_string()
}

// ============================================================================
// Search (OpenAI-compatible chat completions)
// ============================================================================

pub struct HttpSearchClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    response_format: Value,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

impl HttpSearchClient {
    pub fn new(http: reqwest::Client, settings: &ProviderSettings) -> Self {
        Self {
            http,
            endpoint: endpoint(settings, DEFAULT_SEARCH_ENDPOINT),
            api_key: settings.api_key.clone().unwrap_or_default(),
            model: settings
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_SEARCH_MODEL.to_string()),
        }
    }
}

/// First choice's message text
pub fn parse_chat_response(body: &str) -> Result<String, ClientError> {
    let parsed: ChatResponse =
        serde_json::from_str(body).map_err(|e| ClientError::InvalidResponse(e.to_string()))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ClientError::InvalidResponse("completion had no content".into()))
}

#[async_trait]
impl SearchClient for HttpSearchClient {
    async fn query(&self, prompt: &str) -> Result<String, ClientError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: SYSTEM_PROMPT },
                ChatMessage { role: "user", content: prompt },
            ],
            temperature: 0.4,
            response_format: json!({ "type": "json_object" }),
        };
        let response = self
            .http
            .post(format!("{}/chat/completions", self.endpoint))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;
        let body = checked(response).await?.text().await?;
        parse_chat_response(&body)
    }
}

// ============================================================================
// Weather (Open-Meteo style geocode + daily forecast)
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

pub struct HttpWeatherClient {
    http: reqwest::Client,
    endpoint: String,
    geocode_endpoint: String,
    api_key: Option<String>,
    cache: Option<Arc<CacheStore>>,
}

impl HttpWeatherClient {
    pub fn new(http: reqwest::Client, settings: &ProviderSettings) -> Self {
        Self {
            http,
            endpoint: endpoint(settings, DEFAULT_WEATHER_ENDPOINT),
            geocode_endpoint: DEFAULT_GEOCODE_ENDPOINT.to_string(),
            api_key: settings.api_key.clone().filter(|k| !k.trim().is_empty()),
            cache: None,
        }
    }

    /// Cache geocoding lookups in the long-lived `geocode` namespace
    pub fn with_cache(mut self, cache: Arc<CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_geocode_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.geocode_endpoint = endpoint.into();
        self
    }

    async fn geocode(&self, location: &str) -> Result<Coordinates, ClientError> {
        let params = json!({ "location": location });
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(namespaces::GEOCODE, &params).await {
                if let Ok(coords) = serde_json::from_value::<Coordinates>(hit) {
                    return Ok(coords);
                }
            }
        }

        let response = self
            .http
            .get(format!("{}/search", self.geocode_endpoint))
            .query(&[("name", location), ("count", "1")])
            .send()
            .await?;
        let body: Value = checked(response).await?.json().await?;
        let coords = parse_geocode(&body)?;
        debug!(location, lat = coords.latitude, lon = coords.longitude, "geocoded");

        if let Some(cache) = &self.cache {
            if let Ok(value) = serde_json::to_value(coords) {
                cache.set(namespaces::GEOCODE, &params, value, None).await;
            }
        }
        Ok(coords)
    }
}

pub fn parse_geocode(body: &Value) -> Result<Coordinates, ClientError> {
    let first = body
        .get("results")
        .and_then(Value::as_array)
        .and_then(|r| r.first())
        .ok_or_else(|| ClientError::BadRequest("location could not be geocoded".into()))?;
    match (
        first.get("latitude").and_then(Value::as_f64),
        first.get("longitude").and_then(Value::as_f64),
    ) {
        (Some(latitude), Some(longitude)) => Ok(Coordinates { latitude, longitude }),
        _ => Err(ClientError::InvalidResponse("geocode result missing coordinates".into())),
    }
}

/// WMO weather code → condition keywords
pub fn weather_code_conditions(code: i64) -> Vec<String> {
    let words: &[&str] = match code {
        0 => &["clear", "sunny"],
        1 => &["mostly sunny", "sunny"],
        2 => &["partly cloudy", "cloudy"],
        3 => &["overcast", "cloudy"],
        45 | 48 => &["fog"],
        51..=57 => &["drizzle", "rain"],
        61..=67 | 80..=82 => &["rain"],
        71..=77 | 85 | 86 => &["snow"],
        95..=99 => &["thunderstorm", "rain"],
        _ => &["unknown"],
    };
    words.iter().map(|w| w.to_string()).collect()
}

pub fn parse_forecast(body: &Value) -> Result<Vec<DailyForecast>, ClientError> {
    let daily = body
        .get("daily")
        .ok_or_else(|| ClientError::InvalidResponse("forecast missing 'daily'".into()))?;
    let column = |name: &str| -> Vec<Value> {
        daily
            .get(name)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    };
    let dates = column("time");
    let highs = column("temperature_2m_max");
    let lows = column("temperature_2m_min");
    let codes = column("weathercode");
    let precip = column("precipitation_probability_max");

    let mut out = Vec::with_capacity(dates.len());
    for (i, date) in dates.iter().enumerate() {
        let date = date
            .as_str()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .ok_or_else(|| ClientError::InvalidResponse(format!("bad forecast date at {}", i)))?;
        let (Some(high_f), Some(low_f)) = (
            highs.get(i).and_then(Value::as_f64),
            lows.get(i).and_then(Value::as_f64),
        ) else {
            continue;
        };
        out.push(DailyForecast {
            date,
            high_f,
            low_f,
            conditions: codes
                .get(i)
                .and_then(Value::as_i64)
                .map(weather_code_conditions)
                .unwrap_or_default(),
            precipitation_chance: precip
                .get(i)
                .and_then(Value::as_u64)
                .map(|p| p.min(100) as u8),
        });
    }
    Ok(out)
}

#[async_trait]
impl WeatherClient for HttpWeatherClient {
    async fn forecast(
        &self,
        location: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyForecast>, ClientError> {
        let coords = self.geocode(location).await?;
        let mut query = vec![
            ("latitude", coords.latitude.to_string()),
            ("longitude", coords.longitude.to_string()),
            (
                "daily",
                "temperature_2m_max,temperature_2m_min,weathercode,precipitation_probability_max"
                    .to_string(),
            ),
            ("temperature_unit", "fahrenheit".to_string()),
            ("timezone", "auto".to_string()),
            ("start_date", start.to_string()),
            ("end_date", end.to_string()),
        ];
        if let Some(key) = &self.api_key {
            query.push(("apikey", key.clone()));
        }
        let response = self
            .http
            .get(format!("{}/forecast", self.endpoint))
            .query(&query)
            .send()
            .await?;
        let body: Value = checked(response).await?.json().await?;
        parse_forecast(&body)
    }
}

// ============================================================================
// Places (Google Places text search shape)
// ============================================================================

pub struct HttpPlacesClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpPlacesClient {
    pub fn new(http: reqwest::Client, settings: &ProviderSettings) -> Self {
        Self {
            http,
            endpoint: endpoint(settings, DEFAULT_PLACES_ENDPOINT),
            api_key: settings.api_key.clone().unwrap_or_default(),
        }
    }
}

const RESTAURANT_TYPES: &[&str] = &["restaurant", "food", "cafe", "bar", "bakery", "meal_takeaway"];
const ATTRACTION_TYPES: &[&str] = &[
    "tourist_attraction",
    "museum",
    "park",
    "art_gallery",
    "church",
    "landmark",
    "point_of_interest",
    "zoo",
    "aquarium",
];

pub fn categorize(types: &[String]) -> PlaceCategory {
    let has = |set: &[&str]| types.iter().any(|t| set.contains(&t.as_str()));
    if has(RESTAURANT_TYPES) {
        PlaceCategory::Restaurant
    } else if has(ATTRACTION_TYPES) {
        PlaceCategory::Attraction
    } else {
        PlaceCategory::Other
    }
}

pub fn parse_places(body: &Value) -> Result<Vec<PlaceRecord>, ClientError> {
    let status = body.get("status").and_then(Value::as_str).unwrap_or("OK");
    let detail = body
        .get("error_message")
        .and_then(Value::as_str)
        .unwrap_or(status)
        .to_string();
    match status {
        "OK" => {}
        "ZERO_RESULTS" => return Ok(Vec::new()),
        "REQUEST_DENIED" => return Err(ClientError::Auth(detail)),
        "OVER_QUERY_LIMIT" => return Err(ClientError::RateLimited(detail)),
        "INVALID_REQUEST" => return Err(ClientError::BadRequest(detail)),
        _ => return Err(ClientError::Upstream { status: 200, message: detail }),
    }

    let results = body
        .get("results")
        .and_then(Value::as_array)
        .ok_or_else(|| ClientError::InvalidResponse("places response missing 'results'".into()))?;

    Ok(results
        .iter()
        .filter_map(|r| {
            let name = r.get("name").and_then(Value::as_str)?.trim().to_string();
            if name.is_empty() {
                return None;
            }
            let types: Vec<String> = r
                .get("types")
                .and_then(Value::as_array)
                .map(|ts| ts.iter().filter_map(|t| t.as_str().map(String::from)).collect())
                .unwrap_or_default();
            Some(PlaceRecord {
                name,
                address: r
                    .get("formatted_address")
                    .and_then(Value::as_str)
                    .map(String::from),
                rating: r.get("rating").and_then(Value::as_f64).map(|v| v as f32),
                price_level: r
                    .get("price_level")
                    .and_then(Value::as_u64)
                    .map(|p| p.min(4) as u8),
                category: categorize(&types),
                types,
            })
        })
        .collect())
}

#[async_trait]
impl PlacesClient for HttpPlacesClient {
    async fn search(&self, query: &str) -> Result<Vec<PlaceRecord>, ClientError> {
        let response = self
            .http
            .get(format!("{}/textsearch/json", self.endpoint))
            .query(&[("query", query), ("key", self.api_key.as_str())])
            .send()
            .await?;
        let body: Value = checked(response).await?.json().await?;
        parse_places(&body)
    }
}

// ============================================================================
// Events (Ticketmaster Discovery shape)
// ============================================================================

pub struct HttpEventsClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpEventsClient {
    pub fn new(http: reqwest::Client, settings: &ProviderSettings) -> Self {
        Self {
            http,
            endpoint: endpoint(settings, DEFAULT_EVENTS_ENDPOINT),
            api_key: settings.api_key.clone().unwrap_or_default(),
        }
    }
}

pub fn parse_events(body: &Value) -> Result<Vec<EventRecord>, ClientError> {
    if !body.is_object() {
        return Err(ClientError::InvalidResponse("events response is not an object".into()));
    }
    let Some(events) = body
        .pointer("/_embedded/events")
        .and_then(Value::as_array)
    else {
        // Discovery omits `_embedded` entirely when nothing matched
        return Ok(Vec::new());
    };

    Ok(events
        .iter()
        .filter_map(|e| {
            let name = e.get("name").and_then(Value::as_str)?.trim().to_string();
            if name.is_empty() {
                return None;
            }
            Some(EventRecord {
                name,
                date: e
                    .pointer("/dates/start/localDate")
                    .and_then(Value::as_str)
                    .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()),
                venue: e
                    .pointer("/_embedded/venues/0/name")
                    .and_then(Value::as_str)
                    .map(String::from),
                category: e
                    .pointer("/classifications/0/segment/name")
                    .and_then(Value::as_str)
                    .map(String::from),
                url: e.get("url").and_then(Value::as_str).map(String::from),
                description: e
                    .get("info")
                    .or_else(|| e.get("pleaseNote"))
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            })
        })
        .collect())
}

#[async_trait]
impl EventsClient for HttpEventsClient {
    async fn events(
        &self,
        location: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<EventRecord>, ClientError> {
        let start_time = format!("{}T00:00:00Z", start);
        let end_time = format!("{}T23:59:59Z", end);
        let response = self
            .http
            .get(format!("{}/events.json", self.endpoint))
            .query(&[
                ("apikey", self.api_key.as_str()),
                ("city", location),
                ("startDateTime", start_time.as_str()),
                ("endDateTime", end_time.as_str()),
                ("size", "20"),
                ("sort", "date,asc"),
            ])
            .send()
            .await?;
        let body: Value = checked(response).await?.json().await?;
        parse_events(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_status() {
        assert!(matches!(classify_status(401, ""), ClientError::Auth(_)));
        assert!(matches!(classify_status(403, ""), ClientError::Auth(_)));
        assert!(matches!(classify_status(429, ""), ClientError::RateLimited(_)));
        assert!(matches!(classify_status(400, ""), ClientError::BadRequest(_)));
        assert!(matches!(
            classify_status(503, "down"),
            ClientError::Upstream { status: 503, .. }
        ));
        assert!(classify_status(500, "").is_transient());
    }

    #[test]
    fn test_chat_response() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"{\"summary\":\"x\"}"}}]}"#;
        assert_eq!(parse_chat_response(body).unwrap(), "{\"summary\":\"x\"}");

        let empty = r#"{"choices":[]}"#;
        assert!(matches!(
            parse_chat_response(empty),
            Err(ClientError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_forecast_columns() {
        let body = json!({
            "daily": {
                "time": ["2025-06-01", "2025-06-02"],
                "temperature_2m_max": [95.0, 70.5],
                "temperature_2m_min": [72.0, 55.0],
                "weathercode": [0, 61],
                "precipitation_probability_max": [5, 80]
            }
        });
        let days = parse_forecast(&body).unwrap();
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].high_f, 95.0);
        assert!(days[0].conditions.contains(&"sunny".to_string()));
        assert!(days[1].conditions.contains(&"rain".to_string()));
        assert_eq!(days[1].precipitation_chance, Some(80));

        assert!(parse_forecast(&json!({})).is_err());
    }

    #[test]
    fn test_geocode() {
        let body = json!({"results": [{"name": "Paris", "latitude": 48.85, "longitude": 2.35}]});
        let coords = parse_geocode(&body).unwrap();
        assert_eq!(coords.latitude, 48.85);
        assert!(matches!(
            parse_geocode(&json!({"results": []})),
            Err(ClientError::BadRequest(_))
        ));
    }

    #[test]
    fn test_places_status_codes() {
        let ok = json!({
            "status": "OK",
            "results": [
                {"name": "Le Jules Verne", "formatted_address": "Eiffel Tower, Paris",
                 "rating": 4.4, "price_level": 4, "types": ["restaurant", "food"]},
                {"name": "Musée d'Orsay", "types": ["museum", "tourist_attraction"]},
                {"name": "", "types": []}
            ]
        });
        let places = parse_places(&ok).unwrap();
        assert_eq!(places.len(), 2);
        assert_eq!(places[0].category, PlaceCategory::Restaurant);
        assert_eq!(places[0].price_level, Some(4));
        assert_eq!(places[1].category, PlaceCategory::Attraction);

        assert!(parse_places(&json!({"status": "ZERO_RESULTS"})).unwrap().is_empty());
        assert!(matches!(
            parse_places(&json!({"status": "REQUEST_DENIED", "error_message": "bad key"})),
            Err(ClientError::Auth(_))
        ));
        assert!(matches!(
            parse_places(&json!({"status": "OVER_QUERY_LIMIT"})),
            Err(ClientError::RateLimited(_))
        ));
    }

    #[test]
    fn test_events_shape() {
        let body = json!({
            "_embedded": {"events": [{
                "name": "Fête de la Musique",
                "url": "https://example.org/fete",
                "dates": {"start": {"localDate": "2025-06-21"}},
                "classifications": [{"segment": {"name": "Music"}}],
                "_embedded": {"venues": [{"name": "Place de la République"}]}
            }]}
        });
        let events = parse_events(&body).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].date, NaiveDate::from_ymd_opt(2025, 6, 21));
        assert_eq!(events[0].venue.as_deref(), Some("Place de la République"));
        assert_eq!(events[0].category.as_deref(), Some("Music"));

        assert!(parse_events(&json!({"page": {"totalElements": 0}})).unwrap().is_empty());
    }
}

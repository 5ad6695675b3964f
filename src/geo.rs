use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

// ── Types ──────────────────────────────────────────────────────────────────

/// Geolocation data for a single IP address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeoRecord {
    pub ip: IpAddr,
    pub country_code: String,
    pub country: String,
    pub region: String,
    pub city: String,
    pub isp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum GeoError {
    /// Private, loopback and similar ranges are never sent to a public API.
    #[error("{0} is not a publicly routable address")]
    NotRoutable(IpAddr),

    #[error("geolocation request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider answered but refused the lookup.
    #[error("geolocation provider rejected the lookup: {0}")]
    Rejected(String),

    #[error("no geolocation data for {0}")]
    NoData(IpAddr),
}

/// Maps an IP address to location metadata.
#[async_trait]
pub trait GeoResolver: Send + Sync {
    async fn resolve(&self, ip: IpAddr) -> Result<GeoRecord, GeoError>;
}

/// Public geolocation APIs the HTTP resolver can talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoProvider {
    /// http://ip-api.com (free tier is HTTP only)
    IpApi,
    /// https://get.geojs.io
    GeoJs,
}

impl GeoProvider {
    pub fn name(self) -> &'static str {
        match self {
            GeoProvider::IpApi => "ip-api",
            GeoProvider::GeoJs => "geojs",
        }
    }

    fn lookup_url(self, ip: IpAddr) -> String {
        match self {
            GeoProvider::IpApi => format!(
                "http://ip-api.com/json/{ip}?fields=status,message,country,countryCode,regionName,city,isp"
            ),
            GeoProvider::GeoJs => format!("https://get.geojs.io/v1/ip/geo/{ip}.json"),
        }
    }
}

impl FromStr for GeoProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ip-api" | "ipapi" => Ok(GeoProvider::IpApi),
            "geojs" => Ok(GeoProvider::GeoJs),
            other => anyhow::bail!("GEOIP_PROVIDER '{other}' is not one of: ip-api, geojs"),
        }
    }
}

// ── HTTP resolver ──────────────────────────────────────────────────────────

/// Resolver backed by a public HTTP API, with an in-memory cache of
/// successful lookups so the same IP is fetched at most once per process.
pub struct HttpGeoResolver {
    client: reqwest::Client,
    provider: GeoProvider,
    cache: Arc<DashMap<IpAddr, GeoRecord>>,
}

impl HttpGeoResolver {
    pub fn new(provider: GeoProvider, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            provider,
            cache: Arc::new(DashMap::new()),
        })
    }

    async fn fetch(&self, ip: IpAddr) -> Result<GeoRecord, GeoError> {
        let resp = self
            .client
            .get(self.provider.lookup_url(ip))
            .send()
            .await?
            .error_for_status()?;

        match self.provider {
            GeoProvider::IpApi => resp.json::<IpApiResponse>().await?.into_record(ip),
            GeoProvider::GeoJs => resp.json::<GeoJsResponse>().await?.into_record(ip),
        }
    }
}

#[async_trait]
impl GeoResolver for HttpGeoResolver {
    async fn resolve(&self, ip: IpAddr) -> Result<GeoRecord, GeoError> {
        let ip = ip.to_canonical();

        // Skip addresses that can never be geolocated
        if is_private(ip) {
            return Err(GeoError::NotRoutable(ip));
        }

        if let Some(hit) = self.cache.get(&ip) {
            return Ok(hit.clone());
        }

        let record = self.fetch(ip).await.map_err(|e| {
            tracing::debug!(%ip, provider = self.provider.name(), error = %e, "geo lookup failed");
            e
        })?;

        // Failures are not cached so a transient outage does not stick
        self.cache.insert(ip, record.clone());
        Ok(record)
    }
}

// ── Provider response shapes ───────────────────────────────────────────────

#[derive(Deserialize)]
struct IpApiResponse {
    status: String,
    message: Option<String>,
    country: Option<String>,
    #[serde(rename = "countryCode")]
    country_code: Option<String>,
    #[serde(rename = "regionName")]
    region_name: Option<String>,
    city: Option<String>,
    isp: Option<String>,
}

impl IpApiResponse {
    fn into_record(self, ip: IpAddr) -> Result<GeoRecord, GeoError> {
        if self.status != "success" {
            return Err(GeoError::Rejected(
                self.message.unwrap_or_else(|| self.status.clone()),
            ));
        }
        build_record(
            ip,
            self.country_code,
            self.country,
            self.region_name,
            self.city,
            self.isp,
        )
    }
}

#[derive(Deserialize)]
struct GeoJsResponse {
    country: Option<String>,
    country_code: Option<String>,
    region: Option<String>,
    city: Option<String>,
    organization_name: Option<String>,
}

impl GeoJsResponse {
    fn into_record(self, ip: IpAddr) -> Result<GeoRecord, GeoError> {
        build_record(
            ip,
            self.country_code,
            self.country,
            self.region,
            self.city,
            self.organization_name,
        )
    }
}

fn build_record(
    ip: IpAddr,
    country_code: Option<String>,
    country: Option<String>,
    region: Option<String>,
    city: Option<String>,
    isp: Option<String>,
) -> Result<GeoRecord, GeoError> {
    let field = |v: Option<String>| v.map(|s| s.trim().to_owned()).unwrap_or_default();

    let record = GeoRecord {
        ip,
        country_code: field(country_code),
        country: field(country),
        region: field(region),
        city: field(city),
        isp: field(isp),
    };

    // Treat completely empty results as a miss
    if record.country_code.is_empty() && record.country.is_empty() && record.city.is_empty() {
        return Err(GeoError::NoData(ip));
    }
    Ok(record)
}

/// Return `true` for addresses that should never be sent to a public
/// geolocation API: loopback, link-local, private ranges, and IPv6 special
/// addresses.
fn is_private(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(addr) => {
            addr.is_loopback()          // 127.x.x.x
            || addr.is_link_local()     // 169.254.x.x
            || addr.is_unspecified()    // 0.0.0.0
            || addr.is_broadcast()
            || addr.is_private() // 10/8, 172.16/12, 192.168/16
        }
        IpAddr::V6(addr) => {
            addr.is_loopback()       // ::1
            || addr.is_unspecified() // ::
            // fe80::/10  link-local
            || (addr.segments()[0] & 0xffc0) == 0xfe80
            // fc00::/7   unique-local
            || (addr.segments()[0] & 0xfe00) == 0xfc00
        }
    }
}

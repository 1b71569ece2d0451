use anyhow::Context;
use serde::Deserialize;
use url::Url;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub razorpay: RazorpayConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub mail: MailConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RazorpayConfig {
    #[serde(default)]
    pub key_id: String,
    #[serde(default)]
    pub key_secret: String,
    #[serde(default = "default_razorpay_api")]
    pub api_base: String,
    /// ISO currency used when a create-order request does not name one
    #[serde(default = "default_currency")]
    pub currency: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_api")]
    pub base_url: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    /// Document field holding the unit price in rupees
    #[serde(default = "default_price_field")]
    pub price_field: String,
    #[serde(default)]
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    #[serde(default = "default_identity_api")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    /// Service credential used for privileged account updates
    #[serde(default)]
    pub access_token: Option<String>,
    /// Uids treated as admins before any claim has been granted
    #[serde(default)]
    pub bootstrap_admins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_mail_api")]
    pub api_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_mail_from")]
    pub from: String,
}

fn default_host() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    3000
}

fn default_razorpay_api() -> String {
    "https://api.razorpay.com".into()
}

fn default_currency() -> String {
    "INR".into()
}

fn default_catalog_api() -> String {
    "https://firestore.googleapis.com".into()
}

fn default_collection() -> String {
    "products".into()
}

fn default_price_field() -> String {
    "price".into()
}

fn default_identity_api() -> String {
    "https://identitytoolkit.googleapis.com".into()
}

fn default_mail_api() -> String {
    "https://api.resend.com/emails".into()
}

fn default_mail_from() -> String {
    "payments@localhost".into()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for RazorpayConfig {
    fn default() -> Self {
        Self {
            key_id: String::new(),
            key_secret: String::new(),
            api_base: default_razorpay_api(),
            currency: default_currency(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_catalog_api(),
            project_id: String::new(),
            collection: default_collection(),
            price_field: default_price_field(),
            access_token: None,
        }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            base_url: default_identity_api(),
            api_key: String::new(),
            access_token: None,
            bootstrap_admins: Vec::new(),
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_url: default_mail_api(),
            api_key: None,
            from: default_mail_from(),
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let path =
            std::env::var("CHECKOUT_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {path}"))?;

        let mut config = Self::from_toml_str(&content)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).context("Failed to parse config")
    }

    /// Secrets and the listen port may come from the environment instead of the file.
    /// Empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(v) = get("RAZORPAY_KEY_ID") {
            self.razorpay.key_id = v;
        }
        if let Some(v) = get("RAZORPAY_KEY_SECRET") {
            self.razorpay.key_secret = v;
        }
        if let Some(port) = get("PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!(%port, "Ignoring unparseable PORT"),
            }
        }
        if let Some(v) = get("CATALOG_ACCESS_TOKEN") {
            self.catalog.access_token = Some(v);
        }
        if let Some(v) = get("IDENTITY_API_KEY") {
            self.identity.api_key = v;
        }
        if let Some(v) = get("IDENTITY_ACCESS_TOKEN") {
            self.identity.access_token = Some(v);
        }
        if let Some(v) = get("MAIL_API_KEY") {
            self.mail.api_key = Some(v);
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.razorpay.key_secret.is_empty() {
            anyhow::bail!("razorpay.key_secret is not set (config or RAZORPAY_KEY_SECRET)");
        }
        if self.razorpay.key_id.is_empty() {
            anyhow::bail!("razorpay.key_id is not set (config or RAZORPAY_KEY_ID)");
        }
        Ok(())
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Parse an upstream base URL so that relative joins append to its path.
pub fn base_url(raw: &str) -> anyhow::Result<Url> {
    let mut url = Url::parse(raw).with_context(|| format!("Invalid base URL: {raw}"))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

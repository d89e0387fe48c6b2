use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::{env, fmt, fs, path::Path, time::Duration};

const DEFAULT_LISTEN: &str = ":2804";
const DEFAULT_LOG_LEVEL: u8 = 1;
const DEFAULT_PRESIGN_EXPIRY_MINUTES: u32 = 60;
const DEFAULT_REGION: &str = "us-east-1";

/// How a resolved object reaches the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delivery {
    /// 302 to a presigned URL.
    Redirect,
    /// Stream the body through the gateway.
    Stream,
}

/// Centralized application configuration.
/// Combines CLI arguments, environment variables and an optional TOML file.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen: String,
    pub log_level: u8,
    pub cloudflare: bool,
    pub enable_list: bool,
    pub presign_expiry_minutes: u32,
    pub delivery: Delivery,
    pub s3: S3Settings,
}

/// Connection settings for the object store.
#[derive(Clone)]
pub struct S3Settings {
    /// Authority of the S3 service, `host[:port]`, without scheme.
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub secure: bool,
    pub path_style: bool,
}

impl fmt::Debug for S3Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Settings")
            .field("endpoint", &self.endpoint)
            .field("bucket", &self.bucket)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("region", &self.region)
            .field("secure", &self.secure)
            .field("path_style", &self.path_style)
            .finish()
    }
}

/// Command-line configuration. Every flag overrides its environment variable.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Read-only HTTP gateway for an S3 bucket")]
pub struct Args {
    /// TOML file with `[app]` and `[s3]` sections
    #[arg(long)]
    pub config: Option<String>,

    /// Listen address, `host:port` or `:port` (overrides LISTEN)
    #[arg(long)]
    pub listen: Option<String>,

    /// 0 debug, 1 info, 2 warn, 3 error (overrides LOG_LEVEL)
    #[arg(long)]
    pub log_level: Option<u8>,

    /// Take the client IP from Cf-Connecting-Ip instead of X-Real-Ip (overrides CLOUDFLARE)
    #[arg(long)]
    pub cloudflare: Option<bool>,

    /// Serve GET /list (overrides ENABLE_LIST)
    #[arg(long)]
    pub enable_list: Option<bool>,

    /// Lifetime of presigned URLs in minutes (overrides PRESIGN_EXPIRY_MINUTES)
    #[arg(long)]
    pub presign_expiry: Option<u32>,

    /// Redirect to a presigned URL or stream the body (overrides DELIVERY)
    #[arg(long, value_enum)]
    pub delivery: Option<Delivery>,

    /// S3 endpoint `host[:port]` (overrides S3_ENDPOINT)
    #[arg(long)]
    pub s3_endpoint: Option<String>,

    /// Bucket to serve (overrides S3_BUCKET)
    #[arg(long)]
    pub s3_bucket: Option<String>,

    /// Signing region (overrides S3_REGION)
    #[arg(long)]
    pub s3_region: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub app: FileApp,
    pub s3: FileS3,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileApp {
    pub listen: Option<String>,
    pub log_level: Option<u8>,
    pub cloudflare: Option<bool>,
    pub enable_list: Option<bool>,
    pub presign_expiry_minutes: Option<u32>,
    pub delivery: Option<Delivery>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileS3 {
    pub endpoint: Option<String>,
    pub bucket: Option<String>,
    pub region: Option<String>,
    pub secure: Option<bool>,
    pub path_style: Option<bool>,
    pub key: FileS3Key,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileS3Key {
    pub access: Option<String>,
    pub secret: Option<String>,
}

impl FileConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing config file {}", path.display()))
    }
}

impl AppConfig {
    /// Parse CLI args, the optional config file and the process environment.
    pub fn from_env_and_args() -> Result<Self> {
        let args = Args::parse();
        let file = match args.config.as_deref() {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::merge(args, file, |name| env::var(name).ok())
    }

    /// Merge sources with precedence CLI > environment > file > default.
    pub fn merge(
        args: Args,
        file: FileConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let env_bool = |name: &str| -> Result<Option<bool>> {
            env(name)
                .map(|v| parse_bool(&v).with_context(|| format!("parsing {} value `{}`", name, v)))
                .transpose()
        };
        let env_num = |name: &str| -> Result<Option<u32>> {
            env(name)
                .map(|v| {
                    v.trim()
                        .parse::<u32>()
                        .with_context(|| format!("parsing {} value `{}`", name, v))
                })
                .transpose()
        };
        let required = |value: Option<String>, name: &str| -> Result<String> {
            match value {
                Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
                _ => bail!("missing required setting {}", name),
            }
        };

        let log_level = match args.log_level {
            Some(level) => level,
            None => match env_num("LOG_LEVEL")? {
                Some(level) => u8::try_from(level).context("LOG_LEVEL out of range")?,
                None => file.app.log_level.unwrap_or(DEFAULT_LOG_LEVEL),
            },
        };

        let delivery = match args.delivery {
            Some(d) => d,
            None => match env("DELIVERY") {
                Some(v) => Delivery::from_str(v.trim(), true)
                    .map_err(|e| anyhow::anyhow!(e))
                    .with_context(|| format!("parsing DELIVERY value `{}`", v))?,
                None => file.app.delivery.unwrap_or(Delivery::Redirect),
            },
        };

        let presign_expiry_minutes = args
            .presign_expiry
            .or(env_num("PRESIGN_EXPIRY_MINUTES")?)
            .or(file.app.presign_expiry_minutes)
            .unwrap_or(DEFAULT_PRESIGN_EXPIRY_MINUTES);
        if presign_expiry_minutes == 0 {
            bail!("presign expiry must be a positive number of minutes");
        }

        let endpoint = required(
            args.s3_endpoint.or(env("S3_ENDPOINT")).or(file.s3.endpoint),
            "S3_ENDPOINT",
        )?;
        if endpoint.contains("://") || endpoint.contains('/') {
            bail!("S3_ENDPOINT must be host[:port] without scheme or path, got `{}`", endpoint);
        }

        let s3 = S3Settings {
            endpoint,
            bucket: required(
                args.s3_bucket.or(env("S3_BUCKET")).or(file.s3.bucket),
                "S3_BUCKET",
            )?,
            access_key: required(env("S3_ACCESS_KEY").or(file.s3.key.access), "S3_ACCESS_KEY")?,
            secret_key: required(env("S3_SECRET_KEY").or(file.s3.key.secret), "S3_SECRET_KEY")?,
            region: args
                .s3_region
                .or(env("S3_REGION"))
                .or(file.s3.region)
                .unwrap_or_else(|| DEFAULT_REGION.into()),
            secure: env_bool("S3_SECURE")?.or(file.s3.secure).unwrap_or(true),
            path_style: env_bool("S3_PATH_STYLE")?
                .or(file.s3.path_style)
                .unwrap_or(true),
        };

        Ok(Self {
            listen: args
                .listen
                .or(env("LISTEN"))
                .or(file.app.listen)
                .unwrap_or_else(|| DEFAULT_LISTEN.into()),
            log_level,
            cloudflare: match args.cloudflare {
                Some(v) => v,
                None => env_bool("CLOUDFLARE")?
                    .or(file.app.cloudflare)
                    .unwrap_or(true),
            },
            enable_list: match args.enable_list {
                Some(v) => v,
                None => env_bool("ENABLE_LIST")?
                    .or(file.app.enable_list)
                    .unwrap_or(true),
            },
            presign_expiry_minutes,
            delivery,
            s3,
        })
    }

    /// Socket address to bind. A bare `:port` binds every interface.
    pub fn addr(&self) -> String {
        if self.listen.starts_with(':') {
            format!("0.0.0.0{}", self.listen)
        } else {
            self.listen.clone()
        }
    }

    pub fn presign_ttl(&self) -> Duration {
        Duration::from_secs(u64::from(self.presign_expiry_minutes) * 60)
    }

    /// Header carrying the original client IP behind the edge proxy.
    pub fn client_ip_header(&self) -> &'static str {
        if self.cloudflare {
            "cf-connecting-ip"
        } else {
            "x-real-ip"
        }
    }

    /// `tracing` filter directive for the numeric log level.
    pub fn log_directive(&self) -> &'static str {
        match self.log_level {
            0 => "debug",
            1 => "info",
            2 => "warn",
            _ => "error",
        }
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("`{}` is not a boolean", other),
    }
}

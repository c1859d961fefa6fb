use crate::error::DashboardError;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub data: DataConfig,
    #[serde(default)]
    pub charts: ChartConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DataConfig {
    pub csv_path: String,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct ChartConfig {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    #[serde(default = "default_realm")]
    pub realm: String,
    pub users: Vec<UserEntry>,
}

/// One allow-list entry. Exactly one of `password` and `password_hash`
/// (an Argon2 PHC string) must be set.
#[derive(Debug, Deserialize, Clone)]
pub struct UserEntry {
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub password_hash: Option<String>,
}

impl Default for ChartConfig {
    fn default() -> Self {
        ChartConfig {
            width: 900,
            height: 360,
        }
    }
}

fn default_static_dir() -> String {
    "static".to_string()
}

fn default_realm() -> String {
    "Demo Dashboard".to_string()
}

/// Default configuration embedded in the binary
pub const DEFAULT_CONFIG: &str = r#"
[server]
bind = "127.0.0.1:3000"
static_dir = "static"

[data]
csv_path = "data/sample_data.csv"

[charts]
width = 900
height = 360

[auth]
realm = "Demo Dashboard"

[[auth.users]]
username = "username"
password = "password"

[[auth.users]]
username = "naruto"
password = "uzumaki"
"#;

/// File looked up in the working directory when no path is given
pub const CONFIG_FILE: &str = "dashboard.toml";

impl Config {
    pub fn from_toml(contents: &str) -> Result<Self, DashboardError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), DashboardError> {
        if self.auth.users.is_empty() {
            return Err(DashboardError::Config(
                "auth.users must list at least one user".to_string(),
            ));
        }
        for user in &self.auth.users {
            if user.username.is_empty() {
                return Err(DashboardError::Config("empty username".to_string()));
            }
            match (&user.password, &user.password_hash) {
                (Some(_), None) | (None, Some(_)) => {}
                _ => {
                    return Err(DashboardError::Config(format!(
                        "user '{}' needs exactly one of password or password_hash",
                        user.username
                    )));
                }
            }
        }
        if self.charts.width == 0 || self.charts.height == 0 {
            return Err(DashboardError::Config(
                "chart width and height must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load configuration
///
/// Search order:
/// 1. The explicit path, if one was given (it must exist)
/// 2. `dashboard.toml` in the working directory
/// 3. The embedded default config
pub fn load_config(path: Option<&Path>) -> Result<Config, DashboardError> {
    if let Some(path) = path {
        log::info!("Loading config from: {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        return Config::from_toml(&contents);
    }

    let local = Path::new(CONFIG_FILE);
    if local.exists() {
        log::info!("Loading config from: {}", local.display());
        let contents = std::fs::read_to_string(local)?;
        return Config::from_toml(&contents);
    }

    log::info!("Using default embedded configuration");
    Config::from_toml(DEFAULT_CONFIG)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_loads() {
        let config = Config::from_toml(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:3000");
        assert_eq!(config.data.csv_path, "data/sample_data.csv");
        assert_eq!(config.auth.users.len(), 2);
        assert_eq!(config.auth.users[1].username, "naruto");
        assert_eq!(config.charts.width, 900);
    }

    #[test]
    fn test_charts_section_is_optional() {
        let toml = r#"
            [server]
            bind = "0.0.0.0:8050"
            [data]
            csv_path = "x.csv"
            [auth]
            users = [{ username = "a", password = "b" }]
        "#;
        let config = Config::from_toml(toml).unwrap();
        assert_eq!(config.charts.height, 360);
        assert_eq!(config.server.static_dir, "static");
        assert_eq!(config.auth.realm, "Demo Dashboard");
    }

    #[test]
    fn test_empty_allow_list_rejected() {
        let toml = r#"
            [server]
            bind = "0.0.0.0:8050"
            [data]
            csv_path = "x.csv"
            [auth]
            users = []
        "#;
        assert!(matches!(
            Config::from_toml(toml),
            Err(DashboardError::Config(_))
        ));
    }

    #[test]
    fn test_user_needs_one_secret() {
        let toml = r#"
            [server]
            bind = "0.0.0.0:8050"
            [data]
            csv_path = "x.csv"
            [auth]
            users = [{ username = "a" }]
        "#;
        assert!(Config::from_toml(toml).is_err());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        assert!(matches!(
            Config::from_toml("[server"),
            Err(DashboardError::Config(_))
        ));
    }

    #[test]
    fn test_load_config_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(DEFAULT_CONFIG.replace("3000", "3100").as_bytes())
            .unwrap();
        file.flush().unwrap();
        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:3100");
    }
}

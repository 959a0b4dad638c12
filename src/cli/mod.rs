use clap::Parser;
use dockinfo::config::Overrides;
use std::path::PathBuf;

/// Every setting is optional here so that an unset flag falls through to
/// the config file and then to the built-in default.
#[derive(Parser, Debug)]
#[command(name = "dockinfo")]
#[command(about = "Read-only HTTP directory of Docker containers, images and labelled services")]
#[command(version, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path (TOML)
    #[arg(short, long, env = "DOCKINFO_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    /// Docker endpoint URL (unix://, tcp://, http://)
    #[arg(long, env = "DOCKER_HOST")]
    pub docker_host: Option<String>,

    /// Docker socket path
    #[arg(long, env = "DOCKER_SOCKET")]
    pub docker_socket: Option<String>,

    /// Namespace of the labels services are described with
    #[arg(long, env = "LABEL_PREFIX")]
    pub label_prefix: Option<String>,

    /// Comma-separated allowed origins; entries may use `*` wildcards
    #[arg(long, env = "CORS_ORIGINS")]
    pub cors_origins: Option<String>,

    /// Disable CORS headers entirely
    #[arg(long = "no-cors", env = "DISABLE_CORS")]
    pub disable_cors: bool,

    /// Container name `/self` resolves (defaults to the hostname)
    #[arg(long, env = "HOSTNAME", hide_env_values = true)]
    pub self_name: Option<String>,

    /// Log filter directive, e.g. `info` or `dockinfo=debug`
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log output format: compact, pretty or json
    #[arg(long, env = "LOG_FORMAT")]
    pub log_format: Option<String>,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            host: self.host.clone(),
            port: self.port,
            docker_host: self.docker_host.clone(),
            docker_socket: self.docker_socket.clone(),
            label_prefix: self.label_prefix.clone(),
            cors_origins: self.cors_origins.clone(),
            disable_cors: self.disable_cors,
            self_name: self.self_name.clone(),
            log_level: self.log_level.clone(),
            log_format: self.log_format.clone(),
            verbose: self.verbose,
        }
    }
}

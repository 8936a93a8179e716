//! Glean MCP - Entry Point
//!
//! Runs the stdio MCP server, signs in to Glean, and writes MCP host configs.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use glean_mcp::auth::{
    DeviceFlowSettings, GleanAuth, StateDir, TerminalInteraction, auth_http_client,
};
use glean_mcp::config::{self, ClientConfig, ConfigFlags, ConfigSources, GleanConfig};
use glean_mcp::configure::{self, Host, HostDirs, ServerDescriptor};
use glean_mcp::error::{AuthError, ConfigError};
use glean_mcp::logging::{self, LogSettings};
use glean_mcp::server::McpServer;
use glean_mcp::GleanClient;

#[derive(Parser, Debug)]
#[command(name = "glean-mcp")]
#[command(about = "MCP server and configurator for Glean")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    glean: GleanArgs,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    /// Directory for tokens, OAuth metadata and logs
    #[arg(long, global = true, env = "GLEAN_STATE_DIR")]
    state_dir: Option<PathBuf>,
}

/// Glean connection flags. These win over the env file and the environment.
#[derive(Args, Debug)]
struct GleanArgs {
    /// Glean instance name (derives https://<instance>-be.glean.com/)
    #[arg(long, global = true)]
    instance: Option<String>,

    /// Glean backend URL (overrides --instance)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Glean API token (skips OAuth)
    #[arg(long, global = true)]
    token: Option<String>,

    /// User to act as with a global API token
    #[arg(long, global = true)]
    act_as: Option<String>,

    /// Env file with GLEAN_* variables
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,
}

impl GleanArgs {
    fn flags(&self) -> ConfigFlags {
        ConfigFlags {
            instance: self.instance.clone(),
            base_url: self.base_url.clone(),
            api_token: self.token.clone(),
            act_as: self.act_as.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the MCP server over stdio
    Server,

    /// Add Glean to an MCP host's config
    Configure {
        /// Host to configure
        #[arg(long, value_enum)]
        client: Host,

        /// Use the hosted Glean MCP endpoint instead of a local server
        #[arg(long)]
        remote: bool,

        /// Do not check that the instance is reachable first
        #[arg(long)]
        skip_preflight: bool,
    },

    /// Remove Glean from an MCP host's config
    Remove {
        /// Host to update
        #[arg(long, value_enum)]
        client: Host,
    },

    /// Sign in with the OAuth device flow
    Auth,

    /// Refresh the saved OAuth tokens
    AuthRefresh,

    /// Show saved credentials
    AuthStatus,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let state = match &cli.state_dir {
        Some(dir) => Ok(StateDir::new(dir)),
        None => StateDir::from_env(),
    };

    let _log_guard = logging::init(&LogSettings {
        level: cli.log_level.clone(),
        json: cli.json_logs,
        log_dir: state.as_ref().ok().map(StateDir::logs_dir),
    });

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), command = ?cli.command, "Starting glean-mcp");

    match run(cli, state).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = ?e, "Command failed");
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, state: Result<StateDir, ConfigError>) -> anyhow::Result<()> {
    let sources = ConfigSources::load(cli.glean.flags(), cli.glean.env_file.as_deref())?;

    match cli.command {
        Command::Server => {
            let config = config::resolve(&sources)?;
            let client = GleanClient::new(config.base_url(), &ClientConfig::default())?;
            let auth = build_auth(config, state?)?;
            McpServer::new(client, auth).run_stdio().await
        }
        Command::Configure { client: host, remote, skip_preflight } => {
            let config = config::resolve(&sources)?;
            if !skip_preflight {
                let client = GleanClient::new(config.base_url(), &ClientConfig::default())?;
                configure::preflight(&client).await?;
            }

            let descriptor = if remote {
                ServerDescriptor::remote(&config)
            } else {
                let exe = std::env::current_exe().context("Unable to locate the glean-mcp binary")?;
                ServerDescriptor::local(exe.display().to_string(), &config)
            };

            let path = configure::configure_host(host, &HostDirs::from_env()?, &descriptor)?;
            println!("Configured Glean for {} in {}", host.display_name(), path.display());
            Ok(())
        }
        Command::Remove { client: host } => {
            if configure::remove_host(host, &HostDirs::from_env()?)? {
                println!("Removed Glean from {}", host.display_name());
            } else {
                println!("{} has no Glean entry", host.display_name());
            }
            Ok(())
        }
        Command::Auth => {
            let auth = build_auth(resolve_for_auth(&sources)?, state.map_err(AuthError::from)?)?;
            let tokens = auth.force_authorize(None).await?;
            match tokens.expires_at {
                Some(at) => println!("Signed in to Glean. Access token expires at {at}."),
                None => println!("Signed in to Glean."),
            }
            Ok(())
        }
        Command::AuthRefresh => {
            let auth = build_auth(resolve_for_auth(&sources)?, state.map_err(AuthError::from)?)?;
            let tokens = auth.force_refresh_tokens().await?;
            match tokens.expires_at {
                Some(at) => println!("Refreshed Glean tokens. Access token expires at {at}."),
                None => println!("Refreshed Glean tokens."),
            }
            Ok(())
        }
        Command::AuthStatus => {
            let config = resolve_for_auth(&sources)?;
            if let GleanConfig::Token(_) = &config {
                println!("Using an API token for {}", config.base_url());
                return Ok(());
            }
            let base_url = config.base_url().to_string();
            let auth = build_auth(config, state.map_err(AuthError::from)?)?;
            match auth.saved_tokens() {
                None => println!("Not signed in to {base_url}. Run `glean-mcp auth`."),
                Some(tokens) if tokens.is_expired() && tokens.refresh_token.is_some() => {
                    println!("Signed in to {base_url}; access token expired and will be refreshed on next use.");
                }
                Some(tokens) if tokens.is_expired() => {
                    println!("Signed in to {base_url}, but the session expired. Run `glean-mcp auth`.");
                }
                Some(tokens) => match tokens.expires_at {
                    Some(at) => println!("Signed in to {base_url}; access token valid until {at}."),
                    None => println!("Signed in to {base_url}."),
                },
            }
            Ok(())
        }
    }
}

/// Config errors on auth commands carry their `ERR_A_20` code.
fn resolve_for_auth(sources: &ConfigSources) -> Result<GleanConfig, AuthError> {
    Ok(config::resolve(sources)?)
}

fn build_auth(config: GleanConfig, state: StateDir) -> anyhow::Result<GleanAuth> {
    let http = auth_http_client(&ClientConfig::default())?;
    Ok(GleanAuth::new(
        config,
        http,
        &state,
        Arc::new(TerminalInteraction),
        DeviceFlowSettings::default(),
    ))
}

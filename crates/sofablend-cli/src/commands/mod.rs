pub mod import;
pub mod record;
pub mod replay;
pub mod serve;

use clap::Args;
use sofablend_server::ServerOptions;

/// Flags overriding the `[server]` settings.
#[derive(Debug, Clone, Default, Args)]
pub struct ServerArgs {
    /// Host to listen on or connect to
    #[arg(long)]
    pub host: Option<String>,
    /// TCP port
    #[arg(long)]
    pub port: Option<u16>,
}

impl ServerArgs {
    pub fn apply(&self, mut options: ServerOptions) -> ServerOptions {
        if let Some(host) = &self.host {
            options.host = host.clone();
        }
        if let Some(port) = self.port {
            options.port = port;
        }
        options
    }
}

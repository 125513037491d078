use clap::Parser;

/// Interactive client for the support-chat proxy.
#[derive(Parser, Debug)]
#[command(name = "support-chat", version, about)]
pub struct Args {
    /// Proxy base URL (overrides SUPPORT_PROXY_URL).
    #[arg(long)]
    pub base_url: Option<String>,

    /// Member id to chat as; a persisted guest id is used otherwise.
    #[arg(long)]
    pub user: Option<String>,

    /// Log level override (debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,
}

pub fn parse() -> Args {
    Args::parse()
}

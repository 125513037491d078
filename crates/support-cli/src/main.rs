mod cli;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

use support_chat::{
    extract_intent, load_or_create_guest_id, member_user_id, ChatError, ChatSession,
    FileIdentityStore, ProxyClient, ProxyConfig, SessionState,
};

/// Load environment variables from a .env file (KEY=VALUE lines).
fn load_dotenv() {
    let candidates = [
        std::path::PathBuf::from(".env"),
        std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join(".env"),
    ];

    for path in &candidates {
        if let Ok(contents) = std::fs::read_to_string(path) {
            for line in contents.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    let key = key.trim();
                    let value = value.trim().trim_matches('"').trim_matches('\'');
                    if std::env::var(key).is_err() {
                        std::env::set_var(key, value);
                    }
                }
            }
            return;
        }
    }
}

#[tokio::main]
async fn main() {
    load_dotenv();

    let args = cli::parse();

    let log_directive = args.log_level.as_deref().unwrap_or("support_chat=info");
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(
                log_directive
                    .parse()
                    .unwrap_or_else(|_| "support_chat=info".parse().unwrap()),
            ),
        )
        .init();

    let config = match args.base_url {
        Some(url) => ProxyConfig::new(url),
        None => match ProxyConfig::from_env() {
            Ok(config) => config,
            Err(e) => {
                eprintln!("no proxy configured: {e} (pass --base-url or set SUPPORT_PROXY_URL)");
                std::process::exit(1);
            }
        },
    };
    tracing::info!(base_url = %config.base_url, "support-chat v{}", env!("CARGO_PKG_VERSION"));

    let user_id = match args.user {
        Some(member) => member_user_id(member),
        None => load_or_create_guest_id(&FileIdentityStore::new()),
    };
    tracing::info!(%user_id, "caller identity resolved");

    let client = ProxyClient::new(config);
    let mut session = ChatSession::new(client, user_id);

    let outcome = session.initialize().await;
    println!("status: {}", session.status_text());
    if !outcome.is_ready() {
        println!("(use /retry once the service is back)");
    }

    println!("commands: /clear /retry /history /quit");

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await.ok();
        stdout.flush().await.ok();

        let Ok(Some(line)) = lines.next_line().await else {
            break;
        };
        let line = line.trim();

        match line {
            "" => continue,
            "/quit" => break,
            "/clear" => {
                session.clear_messages();
                println!("conversation cleared");
            }
            "/retry" => {
                session.manual_retry().await;
                println!("status: {}", session.status_text());
            }
            "/history" => {
                for turn in session.history() {
                    let marker = if turn.is_error { "!" } else { " " };
                    println!("{marker}[{:?}] {}", turn.role, turn.content);
                }
            }
            text => match session.send_message(text).await {
                Ok(raw) => {
                    let parsed = extract_intent(&raw);
                    // The transcript keeps the clean text; the intent is a
                    // diagnostic for whatever consumes it downstream.
                    if let Some(last) = session.history().last() {
                        println!("{}", last.content);
                    }
                    if let Some(intent) = parsed.intent {
                        println!("[intent] {intent}");
                    }
                }
                Err(ChatError::Degraded) => {
                    println!("{} — /retry to reconnect", session.status_text());
                }
                Err(e) => {
                    println!("error: {e}");
                    if session.state() == SessionState::Degraded {
                        println!("{} — /retry to reconnect", session.status_text());
                    }
                }
            },
        }
    }

    session.destroy();
    tracing::info!("shutdown complete");
}

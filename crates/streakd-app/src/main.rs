//! streakd - chat streak tracker with evasion-resistant trigger detection.
//!
//! This binary runs a line-oriented console frontend over the service
//! layer: plain lines are processed as chat messages, `/`-prefixed lines
//! are admin commands. A messenger bot frontend drives the same service
//! the same way.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use streakd_core::{Detector, IdentityLemmatizer};
use streakd_service::{format, InboundMessage, ServiceConfig, StreakService};
use streakd_storage::TriggerRegistry;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

/// streakd - chat streak tracker
#[derive(Parser, Debug)]
#[command(name = "streakd", version, about)]
struct Args {
    /// Database file (defaults to the platform app data directory)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Chat id to operate in
    #[arg(long, default_value_t = 1)]
    chat_id: i64,

    /// User id messages are attributed to
    #[arg(long, default_value_t = 1)]
    user_id: i64,

    /// Username messages are attributed to
    #[arg(long)]
    username: Option<String>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_logging(args: &Args) {
    let log_level = if args.debug { "debug" } else { &args.log_level };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("streakd={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

const HELP: &str = "\
Команды:
  /counter            текущий счётчик
  /reset [причина]    сбросить счётчик вручную
  /undo [N]           отменить последние N сбросов
  /addword <слово>    добавить слово-триггер
  /removeword <слово> убрать слово-триггер
  /enablerule <имя>   включить правило
  /disablerule <имя>  выключить правило
  /words              список слов
  /rules              список правил
  /leaderboard        кто чаще всех срывает
  /chats              чаты с лучшими рекордами
  /history            последние события
  /clearchat          стереть все данные чата
  /help               эта справка
Любая другая строка обрабатывается как сообщение в чате.";

async fn handle_command(svc: &StreakService, args: &Args, line: &str) -> anyhow::Result<()> {
    let mut parts = line.splitn(2, char::is_whitespace);
    let command = parts.next().unwrap_or(line);
    let rest = parts.next().unwrap_or("").trim();

    match command {
        "/counter" => {
            let report = svc.streak_report(args.chat_id)?;
            println!("{}", format::counter_message(&report));
        }
        "/reset" => {
            let reason = if rest.is_empty() { "ручной сброс" } else { rest };
            let outcome = svc
                .manual_reset(args.chat_id, args.user_id, args.username.as_deref(), reason)
                .await?;
            println!(
                "Сброшено. Продержались: {}",
                streakd_core::duration::format_duration(outcome.broken_seconds)
            );
        }
        "/undo" => {
            let count = rest.parse().unwrap_or(1);
            let outcome = svc
                .undo(args.chat_id, args.user_id, args.username.as_deref(), count)
                .await?;
            println!("{}", format::undo_message(&outcome));
        }
        "/addword" => match svc.add_word(args.chat_id, rest, Some(args.user_id)) {
            Ok(true) => println!("Добавлено: {}", rest.to_lowercase()),
            Ok(false) => println!("Уже в списке: {}", rest.to_lowercase()),
            Err(e) => println!("Не получилось: {e}"),
        },
        "/removeword" => {
            if svc.remove_word(args.chat_id, rest)? {
                println!("Убрано: {}", rest.to_lowercase());
            } else {
                println!("Такого слова нет: {rest}");
            }
        }
        "/enablerule" => match svc.enable_rule(args.chat_id, rest) {
            Ok(()) => println!("Правило включено: {rest}"),
            Err(e) => println!("Не получилось: {e}"),
        },
        "/disablerule" => match svc.disable_rule(args.chat_id, rest) {
            Ok(()) => println!("Правило выключено: {rest}"),
            Err(e) => println!("Не получилось: {e}"),
        },
        "/words" => {
            let words = svc.list_words(args.chat_id)?;
            println!("{}", format::triggers_message(&words));
        }
        "/rules" => {
            for (rule, enabled) in svc.list_rules(args.chat_id)? {
                let marker = if enabled { "✅" } else { "🚫" };
                println!("{marker} {rule}");
            }
        }
        "/leaderboard" => {
            let board = svc.leaderboard(args.chat_id, 10)?;
            println!("{}", format::leaderboard_message(&board));
        }
        "/chats" => {
            for state in svc.chat_leaderboard(10)? {
                println!(
                    "чат {}: рекорд {}",
                    state.chat_id,
                    streakd_core::duration::format_duration(state.best_streak_seconds)
                );
            }
        }
        "/clearchat" => {
            svc.clear_chat(args.chat_id).await?;
            println!("Данные чата {} стёрты.", args.chat_id);
        }
        "/history" => {
            let now = chrono::Utc::now();
            for occurrence in svc.recent_events(args.chat_id, 10)? {
                println!("{}", format::event_line(&occurrence, now));
            }
        }
        "/help" | "/start" => println!("{HELP}"),
        other => println!("Неизвестная команда: {other}. /help для справки."),
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args);

    let mut config = ServiceConfig::from_env();
    if args.db.is_some() {
        config.db_path = args.db.clone();
    }
    let db = config.open_database()?;

    let registry = TriggerRegistry::new(db.clone());
    let detector = Detector::new(Arc::new(IdentityLemmatizer));
    let svc = StreakService::new(db, registry, detector);

    println!("streakd готов. /help для справки.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }

        if line.starts_with('/') {
            handle_command(&svc, &args, &line).await?;
            continue;
        }

        let msg = InboundMessage {
            chat_id: args.chat_id,
            user_id: args.user_id,
            username: args.username.clone(),
            message_id: None,
            text: Some(line),
        };
        if let Some(broken) = svc.process_message(&msg).await? {
            println!("{}", format::streak_broken_message(&broken));
        }
    }

    Ok(())
}

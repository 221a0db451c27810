use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::{Config as RlConfig, DefaultEditor};
use std::sync::Arc;
use taskchat_core::backend::ChatBackend;
use taskchat_core::catalog::ToolCatalog;
use taskchat_core::chat::ChatService;
use taskchat_core::config::AppConfig;
use taskchat_core::openai::OpenAiBackend;
use taskchat_store::MemoryStore;

const BANNER: &str = r#"
  ╔═══════════════════════════════════════════╗
  ║             taskchat v0.1.0               ║
  ║   Natural-language task management        ║
  ╚═══════════════════════════════════════════╝

  Type your message and press Enter to chat.
  Commands:
    /new           — Start a new conversation
    /tools         — List available tools
    /config        — Show current config
    /help          — Show this help
    /exit          — Quit
"#;

/// Run the interactive REPL.
pub async fn run(config: AppConfig, user: Option<String>) -> Result<()> {
    let user_id = user.unwrap_or_else(|| "local".to_string());

    println!("{}", BANNER);
    if config.backend_configured() {
        println!(
            "  Model: {}  |  Endpoint: {}",
            config.provider.model, config.provider.api_base
        );
    } else {
        println!("  No model backend configured — using the pattern-matching fallback.");
        println!("  Try: 'add task buy milk', 'show my tasks', 'complete task 1'");
    }
    println!();

    let store = Arc::new(MemoryStore::new());
    let mut catalog = ToolCatalog::new();
    taskchat_tools::register_all(&mut catalog, store.clone())?;
    let catalog = Arc::new(catalog);

    let backend: Option<Arc<dyn ChatBackend>> = if config.backend_configured() {
        Some(Arc::new(OpenAiBackend::new(
            &config.provider,
            config.system_prompt.as_deref(),
        )))
    } else {
        None
    };

    let service = ChatService::new(&config.chat, catalog.clone(), store, backend);
    let mut conversation_id: Option<i64> = None;

    // Set up rustyline.
    let rl_config = RlConfig::builder().auto_add_history(true).build();
    let history_path = AppConfig::data_dir().join("repl_history.txt");
    let mut rl = DefaultEditor::with_config(rl_config)?;
    let _ = rl.load_history(&history_path);

    loop {
        let prompt = format!("\x1b[1;36m{}\x1b[0m \x1b[1;32m❯\x1b[0m ", user_id);

        match rl.readline(&prompt) {
            Ok(line) => {
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }

                // Handle slash commands.
                if input.starts_with('/') {
                    match input {
                        "/exit" | "/quit" => break,
                        "/new" => {
                            conversation_id = None;
                            println!("Started a new conversation.");
                        }
                        "/tools" => print!("{}", catalog.describe()),
                        "/config" => println!("{}", toml::to_string_pretty(&config)?),
                        "/help" => println!("{}", BANNER),
                        other => println!("Unknown command: {}", other),
                    }
                    continue;
                }

                match service.chat(&user_id, conversation_id, input).await {
                    Ok(reply) => {
                        conversation_id = Some(reply.conversation_id);
                        for call in &reply.tool_calls {
                            let status = if call.result.is_failure() {
                                "\x1b[0;31m✗\x1b[0m"
                            } else {
                                "\x1b[0;32m✓\x1b[0m"
                            };
                            println!(
                                "  \x1b[0;35m⚡ {} {}\x1b[0m {}",
                                call.tool_name, call.result.status, status
                            );
                        }
                        println!("\x1b[1;33massistant\x1b[0m: {}\n", reply.response);
                    }
                    Err(e) => {
                        println!("\x1b[0;31mError: {}\x1b[0m\n", e);
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("(Use /exit to quit)");
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                println!("Readline error: {}", e);
                break;
            }
        }
    }

    if let Some(dir) = history_path.parent() {
        let _ = std::fs::create_dir_all(dir);
    }
    let _ = rl.save_history(&history_path);

    Ok(())
}

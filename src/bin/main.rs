use flaix::chat::APOLOGY;
use flaix::{ChatEngine, ChatSession, Config};
use futures::{pin_mut, StreamExt};
use std::io::{BufRead, Write};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    let config = Config::from_env()?;
    let engine = ChatEngine::new(&config)?;
    let mut session = ChatSession::new();

    info!("Flaix chat starting");

    println!("Flaix - Your Financial Assistant");
    println!("Ask about investing, financial planning, or the Indian financial market.");
    println!("Commands: /reset clears the conversation, /quit exits.\n");

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();

    loop {
        print!("you> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        match query {
            "/quit" | "/exit" => break,
            "/reset" => {
                session.reset();
                println!("Conversation cleared.\n");
                continue;
            }
            _ => {}
        }

        print!("flaix> ");
        stdout.flush()?;

        {
            let answer = engine.respond(&mut session, query.to_string());
            pin_mut!(answer);
            let mut printed_any = false;
            while let Some(fragment) = answer.next().await {
                if break_before_apology(&fragment, printed_any) {
                    println!();
                }
                print!("{}", fragment);
                printed_any = true;
                stdout.flush()?;
            }
        }

        println!("\n");
    }

    println!("Goodbye!");
    Ok(())
}

/// The engine records the apology in place of any partial output, but the
/// partial fragments have already gone to the terminal. Set the apology off
/// on its own line so it reads as the final answer.
fn break_before_apology(fragment: &str, printed_any: bool) -> bool {
    printed_any && fragment == APOLOGY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apology_breaks_line_only_after_partial_output() {
        assert!(break_before_apology(APOLOGY, true));
        assert!(!break_before_apology(APOLOGY, false));
        assert!(!break_before_apology("regular fragment", true));
    }
}

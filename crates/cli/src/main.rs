use std::sync::Arc;

use {
    anyhow::Result,
    clap::{Parser, Subcommand},
    tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    tracing::{info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    skiff_agents::{LoopOutcome, RunnerConfig, ToolRegistry, run_agent_loop},
    skiff_browser::{BrowserConfig, BrowserSession},
    skiff_memory::SessionMemory,
    skiff_tools::register_browser_tools,
};

const SYSTEM_PROMPT: &str = r#"You are an expert browser automation agent. Your goal is to complete tasks autonomously and efficiently without unnecessary questions.

## CORE WORKFLOW
1. Analyze - use analyze_page() to inspect the current viewport
2. Execute - perform actions decisively (click, type, navigate, scroll)
3. Verify - use analyze_page() after major changes to confirm success
4. Adapt - if blocked, re-analyze and try alternatives before asking
5. Complete - report success with concrete evidence from the page

## AVAILABLE TOOLS
- analyze_page() - inspect the current viewport (element IDs, types, text, positions); use frequently
- navigate(url) - go to a URL
- go_back() - navigate back
- scroll(direction) - "down", "up", "top", "bottom"
- click(target) - click an element: {"id": "5", "type": "button", "text": "Submit"}
- type(value) - type text (MUST click an input field first)
- select_option({"id": "...", "type": "dropdown", "text": "Label", "value": "Option"})
- keyboard_action(key) - "enter", "tab", "escape", "ctrl+a", ...
- ask_user({"prompt": "...", "type": "text/password/choice", "choices": [...], "default": "..."})

## AUTONOMOUS EXECUTION RULES
- Make reasonable assumptions when targets are ambiguous (use the best match)
- Click obvious elements without asking (buttons, links, fields)
- Fill forms field-by-field automatically when data is available
- Try alternative targeting if the first attempt fails (ID, then text, then position)
- Scroll and explore pages autonomously to find targets
- Use analyze_page() strategically (after navigation, form submission, errors)

## WHEN TO USE ask_user()
Only for credentials that aren't provided, payment or purchase confirmations,
destructive actions, ambiguous choices with significant consequences, or data
you genuinely don't have and can't infer.

## COMPLETION
Report: "Task completed successfully - Evidence: [quote specific text/result from the page]"
Only declare success when verified with actual page content.

Remember: act autonomously, execute multiple steps, ask only when critical,
verify results, complete efficiently."#;

#[derive(Parser)]
#[command(name = "skiff", about = "skiff — LLM-driven browser automation agent")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Run the browser headless (overrides config).
    #[arg(long, global = true)]
    headless: bool,

    /// Iteration ceiling per task (overrides config).
    #[arg(long, global = true)]
    max_iterations: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single task and exit.
    Run {
        /// The task to perform.
        task: String,
    },
    /// Interactive task loop (default when no subcommand is provided).
    Repl,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.json_logs);

    let mut config = skiff_config::discover_and_load();
    if cli.headless {
        config.browser.headless = true;
    }
    if let Some(max) = cli.max_iterations {
        config.agent.max_iterations = max;
    }

    let resolved = config.llm.resolve()?;
    info!(
        provider = resolved.kind.as_str(),
        model = %resolved.model,
        "provider selected"
    );
    let provider = skiff_agents::build_provider(resolved);

    eprintln!("Launching browser...");
    let session = Arc::new(BrowserSession::launch(BrowserConfig::from(&config.browser)).await?);

    let mut registry = ToolRegistry::new();
    register_browser_tools(&mut registry, session.clone());

    let mut memory = SessionMemory::new(config.agent.memory_max_exchanges);
    let runner_config = RunnerConfig {
        max_iterations: config.agent.max_iterations,
        memory_context_messages: config.agent.memory_context_messages,
    };

    match cli.command {
        Some(Commands::Run { task }) => {
            run_task(
                provider.as_ref(),
                &registry,
                &task,
                &mut memory,
                &runner_config,
            )
            .await;
        },
        Some(Commands::Repl) | None => {
            repl(provider.as_ref(), &registry, &mut memory, &runner_config).await?;
        },
    }

    Ok(())
}

fn init_logging(log_level: &str, json_logs: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("skiff={log_level},warn")));

    if json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false))
            .init();
    }
}

async fn run_task(
    provider: &dyn skiff_agents::LlmProvider,
    registry: &ToolRegistry,
    task: &str,
    memory: &mut SessionMemory,
    runner_config: &RunnerConfig,
) {
    let run = run_agent_loop(
        provider,
        registry,
        SYSTEM_PROMPT,
        task,
        Some(memory),
        runner_config,
    );

    // Ctrl-C aborts the outer loop; an in-flight tool call is not resumed.
    tokio::select! {
        result = run => match result {
            Ok(result) => {
                match result.outcome {
                    LoopOutcome::Done => println!("\n{}", result.text),
                    LoopOutcome::MaxIterationsReached => {
                        warn!(iterations = result.iterations, "iteration ceiling reached");
                        println!("\n{}", result.text);
                    },
                }
                info!(
                    iterations = result.iterations,
                    tool_calls = result.tool_calls_made,
                    input_tokens = result.usage.input_tokens,
                    output_tokens = result.usage.output_tokens,
                    "task finished"
                );
            },
            Err(e) => {
                eprintln!("Task failed: {e:#}");
            },
        },
        _ = tokio::signal::ctrl_c() => {
            eprintln!("\nTask interrupted.");
        },
    }
}

async fn repl(
    provider: &dyn skiff_agents::LlmProvider,
    registry: &ToolRegistry,
    memory: &mut SessionMemory,
    runner_config: &RunnerConfig,
) -> Result<()> {
    eprintln!("Ready. Type a task, or \"quit\" to exit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"\nskiff> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let task = line.trim();
        if task.is_empty() {
            continue;
        }
        if task.eq_ignore_ascii_case("quit") || task.eq_ignore_ascii_case("exit") {
            break;
        }

        run_task(provider, registry, task, memory, runner_config).await;
    }

    eprintln!("Goodbye.");
    Ok(())
}

use crate::app::status::render_status;
use crate::cli::commands::{Cli, Commands, ConfigCommands};
use anyhow::{Context, Result, bail};
use postguard::config::Locale;
use postguard::feedback::LogFeedback;
use postguard::page::{HostPage, MemoryPage};
use postguard::session::{SessionPatch, SessionStore};
use postguard::verdict::{Draft, RiskAssessor, Verdict, VerdictClient};
use postguard::{Config, Engine};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

async fn run_init(config: Config, force: bool) -> Result<()> {
    let client = VerdictClient::new(&config.service);
    let session = SessionStore::file_backed(&config);

    let id = if force {
        session.renew_conversation(&client).await?
    } else {
        session.ensure_conversation(&client).await?
    };
    println!("Conversation: {id}");
    Ok(())
}

fn read_draft(text: Option<String>, stdin: bool) -> Result<Draft> {
    if stdin {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read draft from stdin")?;
        return Ok(Draft::new(buf.trim_end_matches(['\r', '\n'])));
    }
    match text {
        Some(text) => Ok(Draft::new(text)),
        None => bail!("Provide the draft as an argument or pass --stdin"),
    }
}

fn render_verdict(verdict: &Verdict) -> String {
    let mut lines = vec![format!("level:      {}", verdict.level)];
    if let Some(reason) = &verdict.reason {
        lines.push(format!("reason:     {reason}"));
    }
    if let Some(suggestion) = &verdict.suggestion {
        lines.push(format!("suggestion: {suggestion}"));
    }
    if let Some(corrected) = &verdict.corrected_text {
        lines.push(format!("correction: {corrected}"));
    }
    lines.join("\n")
}

async fn run_check(config: Config, text: Option<String>, stdin: bool) -> Result<()> {
    let draft = read_draft(text, stdin)?;
    let client = VerdictClient::new(&config.service);
    let session = SessionStore::file_backed(&config);

    session.ensure_conversation(&client).await?;
    let resolved = session.get().resolve()?;
    let verdict = client.assess(&draft, &resolved).await?;

    println!("{}", render_verdict(&verdict));
    Ok(())
}

fn run_config_set(
    config: &Config,
    base_url: Option<String>,
    assistant_id: Option<String>,
    locale: Option<Locale>,
) -> Result<()> {
    if base_url.is_none() && assistant_id.is_none() && locale.is_none() {
        bail!("Nothing to change; pass --base-url, --assistant-id or --locale");
    }

    SessionStore::file_backed(config).set(SessionPatch {
        service_base_url: base_url,
        assistant_id,
        conversation_id: None,
    })?;
    if let Some(locale) = locale {
        Config::update_file(&config.config_path, |stored| stored.feedback.locale = locale)?;
    }
    println!("Configuration saved.");
    Ok(())
}

async fn run_dry_run(config: Config, html: &Path, click: &str) -> Result<()> {
    let markup = std::fs::read_to_string(html)
        .with_context(|| format!("Failed to read {}", html.display()))?;
    let page = Arc::new(MemoryPage::from_html(&markup)?);

    let client: Arc<dyn RiskAssessor> = Arc::new(VerdictClient::new(&config.service));
    let session = Arc::new(SessionStore::file_backed(&config));
    let engine = Engine::new(
        &config,
        page.clone(),
        client,
        session,
        Arc::new(LogFeedback::new()),
    );

    engine.bootstrap().await;
    let hooked = engine.start();
    info!(hooked, "Page loaded");

    let Some(control) = page.query_selector(click) else {
        bail!("No element matches `{click}`");
    };
    let gate = engine.gate_for(control);
    if gate.is_none() {
        println!("Control {control} is not guarded by any rule; clicking it directly.");
    }

    page.click(control)?;
    if let Some(gate) = &gate {
        gate.settled().await;
    }

    println!("native action fired: {}", page.native_activations(control) > 0);
    if let Some(gate) = gate {
        let selector = &gate.control().rule().draft_source_selector;
        let text = page
            .query_selector(selector)
            .and_then(|source| page.text_content(source))
            .unwrap_or_default();
        println!("draft text:          {text}");
    }
    Ok(())
}

pub async fn dispatch(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Init { force } => run_init(config, force).await,

        Commands::Check { text, stdin } => run_check(config, text, stdin).await,

        Commands::Config { config_command } => match config_command {
            ConfigCommands::Show => {
                println!("{}", render_status(&config));
                Ok(())
            }
            ConfigCommands::Set {
                base_url,
                assistant_id,
                locale,
            } => run_config_set(&config, base_url, assistant_id, locale),
        },

        Commands::DryRun { html, click } => run_dry_run(config, &html, &click).await,
    }
}

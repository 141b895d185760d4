use crate::output::finding_lines;
use anyhow::{bail, Context};
use clap::Args;
use fluxa_core::config::Config;
use fluxa_core::cost::{estimate_agent_cost, estimate_cost, CostEstimate};
use fluxa_core::envelope::{assemble, format_output, write_output};
use fluxa_core::orchestrator::{GenerationBackend, GenerationRequest, GenerationResult, Orchestrator};
use fluxa_core::source::{self, classify_url, youtube_video_id, ExtractedContent, SourceKind};
use fluxa_llm::agent::{resolve_docs_path, AgentBackend};
use fluxa_llm::{fetch_web_article, prompt, ChatBackend};
use std::path::PathBuf;

#[derive(Args)]
pub struct GenerateArgs {
    /// Tutorial URL (YouTube video or web article)
    url: Option<String>,

    /// Read the tutorial from a transcript file instead of a URL
    #[arg(long, value_name = "FILE", conflicts_with = "url")]
    transcript: Option<PathBuf>,

    /// Output file
    #[arg(short, long, default_value = "output.json")]
    output: PathBuf,

    /// Model name (overrides config)
    #[arg(short, long)]
    model: Option<String>,

    /// API key for the chat backend
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Chat completions base URL (overrides config)
    #[arg(long)]
    base_url: Option<String>,

    /// Attempts before giving up (overrides config)
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Write the bare action array without the metadata envelope
    #[arg(long)]
    no_metadata: bool,

    /// Do not report validation findings
    #[arg(long)]
    no_validate: bool,

    /// Print the estimated cost and exit without generating
    #[arg(long)]
    estimate_cost: bool,

    /// Generate with the documentation-reading agent instead of chat
    #[arg(long)]
    use_agent: bool,

    /// Documentation folder for the agent (default: ./ps_action_docs)
    #[arg(long, value_name = "PATH")]
    docs: Option<PathBuf>,

    /// Also write the bare action array to this file
    #[arg(long, value_name = "FILE")]
    actions_only: Option<PathBuf>,
}

pub fn run(config: &Config, args: GenerateArgs) -> anyhow::Result<()> {
    let content = acquire_content(config, &args)?;
    tracing::info!(
        source = %content.source,
        kind = %content.kind,
        title = content.title.as_deref().unwrap_or(""),
        chars = content.content.chars().count(),
        "content ready"
    );

    if args.estimate_cost {
        print_estimate(&estimate_for(config, &args, &content));
        return Ok(());
    }

    let backend = build_backend(config, &args)?;
    let request = GenerationRequest {
        content: &content.content,
        source: &content.source,
        source_kind: content.kind.as_str(),
    };
    let max_attempts = args
        .max_attempts
        .unwrap_or(config.generator.max_attempts);

    println!("Generating actions with {}...", backend.name());
    let result = Orchestrator::new(config.validator())
        .with_max_attempts(max_attempts)
        .generate(&request, backend.as_ref())
        .context("generation failed")?;
    println!(
        "Generated {} action(s) on attempt {}",
        result.actions.len(),
        result.attempt
    );

    if !args.no_validate && config.output.validate {
        report_findings(&result);
    }

    write_results(config, &args, &content, result)
}

// ---------------------------------------------------------------------------
// Content
// ---------------------------------------------------------------------------

fn acquire_content(config: &Config, args: &GenerateArgs) -> anyhow::Result<ExtractedContent> {
    if let Some(path) = &args.transcript {
        let content = source::read_transcript(path, config.extraction.youtube_max_length)
            .with_context(|| format!("failed to read transcript {}", path.display()))?;
        println!("Transcript loaded from {}", path.display());
        return Ok(content);
    }

    let Some(url) = args.url.as_deref() else {
        bail!("either a URL or --transcript FILE is required");
    };

    match classify_url(url) {
        SourceKind::Youtube => match youtube_video_id(url) {
            Some(id) => bail!(
                "YouTube transcript download is not supported (video id {id}); \
                 save the transcript to a file and pass --transcript FILE"
            ),
            None => bail!("could not find a YouTube video id in {url}"),
        },
        _ => {
            let content = fetch_web_article(
                url,
                config.extraction.web_timeout_seconds,
                config.extraction.web_max_length,
            )
            .context("content extraction failed")?;
            println!("Content extracted from {url}");
            Ok(content)
        }
    }
}

// ---------------------------------------------------------------------------
// Cost
// ---------------------------------------------------------------------------

fn estimate_for(config: &Config, args: &GenerateArgs, content: &ExtractedContent) -> CostEstimate {
    let content_chars = content.content.chars().count();
    if args.use_agent {
        let prompt_chars = prompt::AGENT_SYSTEM_PROMPT.chars().count()
            + prompt::agent_user_prompt("", &content.source, content.kind.as_str())
                .chars()
                .count();
        estimate_agent_cost(prompt_chars, content_chars)
    } else {
        estimate_cost(
            prompt::chat_prompt_chars(config.generator.few_shot),
            content_chars,
            u64::from(config.generator.max_tokens),
        )
    }
}

fn print_estimate(estimate: &CostEstimate) {
    println!("Cost estimate:");
    println!("  Input tokens:   ~{}", estimate.input_tokens);
    println!("  Output tokens:  ~{}", estimate.output_tokens);
    println!(
        "  Estimated cost: ${:.4} {}",
        estimate.total_cost, estimate.currency
    );
}

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

fn build_backend(
    config: &Config,
    args: &GenerateArgs,
) -> anyhow::Result<Box<dyn GenerationBackend>> {
    if args.use_agent {
        let mut agent = config.agent.clone();
        if let Some(model) = &args.model {
            agent.model = Some(model.clone());
        }
        let cwd = std::env::current_dir().context("failed to read current directory")?;
        let docs = resolve_docs_path(args.docs.as_deref().or(agent.docs_path.as_deref()), &cwd)?;
        let backend = AgentBackend::new(&agent, docs)?;
        if let Some(docs) = backend.docs_path() {
            println!("Agent reading documentation in {}", docs.display());
        }
        return Ok(Box::new(backend));
    }

    let Some(api_key) = args.api_key.as_deref().filter(|k| !k.trim().is_empty()) else {
        bail!("API key not found; set OPENAI_API_KEY or pass --api-key");
    };

    let mut settings = config.generator.clone();
    if let Some(model) = &args.model {
        settings.model = model.clone();
    }
    if let Some(base_url) = &args.base_url {
        settings.base_url = base_url.clone();
    }
    Ok(Box::new(ChatBackend::new(settings, api_key)?))
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

fn report_findings(result: &GenerationResult) {
    if result.has_warnings() {
        println!("Succeeded with warnings:");
        for line in finding_lines(&result.findings) {
            println!("{line}");
        }
    } else {
        println!("Validation passed");
    }
}

fn write_results(
    config: &Config,
    args: &GenerateArgs,
    content: &ExtractedContent,
    result: GenerationResult,
) -> anyhow::Result<()> {
    let indent = config.output.indent;

    if let Some(path) = &args.actions_only {
        let text = format_output(&result.actions, indent)?;
        write_output(path, &text)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Saved actions to {}", path.display());
    }

    let text = if args.no_metadata || !config.output.add_metadata {
        format_output(&result.actions, indent)?
    } else {
        let envelope = assemble(
            result.actions,
            &content.source,
            content.kind.as_str(),
            None,
        );
        format_output(&envelope, indent)?
    };
    write_output(&args.output, &text)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    println!("Saved to {}", args.output.display());
    Ok(())
}

use anyhow::Result;
use clap::{Parser, Subcommand};
use recrutime_broker::candidate::{
    CandidateChannel, HandoffChannel, ScriptedChannel, TerminalChannel,
};
use recrutime_broker::config::{
    DEFAULT_FRONTEND_ORIGIN, DEFAULT_HOST, DEFAULT_KNOWLEDGE_DIR, DEFAULT_PORT,
};
use recrutime_broker::handoff::HandoffStore;
use recrutime_broker::interviewer::{InterviewPlan, ScriptedInterviewer};
use recrutime_broker::job_config::{DEFAULT_JOB_CONFIG_PATH, JobConfigStore};
use recrutime_broker::{ServerConfig, run_server};
use recrutime_retriever::SearchEngine;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// RecruTime interview backend
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory containing the knowledge documents
    #[arg(short, long, env = "KNOWLEDGE_DIR", default_value = DEFAULT_KNOWLEDGE_DIR)]
    knowledge_dir: PathBuf,

    /// TOML interview plan (role_title, candidate_name, questions)
    #[arg(long, env = "RECRUTIME_PLAN")]
    plan: Option<PathBuf>,

    /// Maximum chunk size in characters
    #[arg(long, env = "RECRUTIME_CHUNK_SIZE")]
    chunk_size: Option<usize>,

    /// Overlap between slices of an oversized paragraph
    #[arg(long, env = "RECRUTIME_OVERLAP")]
    overlap: Option<usize>,

    #[arg(long, env = "RECRUTIME_HOST", default_value = DEFAULT_HOST)]
    host: String,

    #[arg(short, long, env = "RECRUTIME_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Origin allowed to call the API from a browser
    #[arg(long, env = "FRONTEND_ORIGIN", default_value = DEFAULT_FRONTEND_ORIGIN)]
    frontend_origin: String,

    /// JSON file backing /api/items
    #[arg(long = "handoff-store", env = "RECRUTIME_HANDOFF")]
    handoff: Option<PathBuf>,

    /// JSON file persisting the admin job config
    #[arg(long, env = "ADMIN_CONFIG_PATH", default_value = DEFAULT_JOB_CONFIG_PATH)]
    job_config: PathBuf,

    /// Company named in interviews when the job config leaves it blank
    #[arg(long, env = "COMPANY_NAME")]
    company_name: Option<String>,

    /// Fail a session after this many seconds without an answer
    #[arg(long)]
    answer_timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the HTTP polling API (default)
    Serve,
    /// Run one interview in the terminal
    Interview {
        /// Role to interview for; overrides the plan
        role_title: Option<String>,
        /// Answer with a simulated candidate instead of reading stdin
        #[arg(long)]
        simulate: bool,
        /// Wait for answers written to the handoff store instead of reading stdin
        #[arg(long, conflicts_with = "simulate")]
        handoff: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut plan = match &args.plan {
        Some(path) => InterviewPlan::load(path)?,
        None => InterviewPlan::default(),
    };
    if args.company_name.is_some() {
        plan.company_name = args.company_name;
    }

    let mut config = ServerConfig::new(args.knowledge_dir.clone())
        .with_plan(plan)
        .with_handoff_path(args.handoff)
        .with_job_config_path(Some(args.job_config))
        .with_answer_timeout(args.answer_timeout_secs.map(Duration::from_secs));
    config.host = args.host;
    config.port = args.port;
    config.frontend_origin = args.frontend_origin;
    if let Some(chunk_size) = args.chunk_size {
        config.chunk_size = chunk_size;
    }
    if let Some(overlap) = args.overlap {
        config.overlap = overlap;
    }

    match args.command {
        Some(Commands::Serve) | None => run_server(config).await,
        Some(Commands::Interview {
            role_title,
            simulate,
            handoff,
        }) => {
            let job = config
                .job_config_path
                .as_ref()
                .map(|path| JobConfigStore::load(path).get())
                .unwrap_or_default();
            let plan = match role_title {
                Some(role_title) => config.plan.for_request(&role_title, None, None),
                None => config.plan.clone(),
            }
            .with_job(job);

            let channel: Box<dyn CandidateChannel> = if simulate {
                Box::new(ScriptedChannel::default())
            } else if handoff {
                let path = config.handoff_path.clone().ok_or_else(|| {
                    anyhow::anyhow!("--handoff needs a store path (--handoff-store or RECRUTIME_HANDOFF)")
                })?;
                let store = Arc::new(HandoffStore::open(path)?);
                Box::new(HandoffChannel::new(store).with_timeout(config.answer_timeout))
            } else {
                Box::new(TerminalChannel::stdio())
            };
            let engine = Arc::new(SearchEngine::new(config.index_config()));

            tokio::task::spawn_blocking(move || run_terminal_interview(plan, engine, channel))
                .await?
        }
    }
}

fn run_terminal_interview(
    plan: InterviewPlan,
    engine: Arc<SearchEngine>,
    channel: Box<dyn CandidateChannel>,
) -> Result<()> {
    let interviewer = ScriptedInterviewer::new(plan).with_search_engine(engine);
    let transcript = interviewer.run(channel.as_ref())?;

    println!("{}", serde_json::to_string_pretty(&transcript)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interview_modes() {
        let args = Args::try_parse_from([
            "recrutime-broker",
            "--handoff-store",
            "runtime/web_interview.json",
            "interview",
            "--handoff",
        ])
        .unwrap();
        assert_eq!(args.handoff, Some(PathBuf::from("runtime/web_interview.json")));
        assert!(matches!(
            args.command,
            Some(Commands::Interview {
                handoff: true,
                simulate: false,
                ..
            })
        ));

        assert!(
            Args::try_parse_from(["recrutime-broker", "interview", "--handoff", "--simulate"])
                .is_err()
        );
    }
}

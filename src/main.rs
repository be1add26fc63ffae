use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use privacyscrub_console::{
    config::{ConsoleConfig, LogFormat, Overrides},
    console,
    contract::ContractVersion,
    models::{
        media::{MediaKind, UploadFile},
        redaction::{
            parse_mode, parse_profile, ComplianceProfile, RedactionMode, RedactionRequest,
            RegionOfInterest, TargetOverrides,
        },
    },
    services::{
        client::ScrubClient,
        poller::{JobPoller, PollOutcome},
    },
    telemetry, ConsoleError,
};

#[derive(Parser)]
#[command(name = "scrub-console", version, about = "PrivacyScrub operator console")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Args)]
struct GlobalArgs {
    /// Backend base URL (overrides API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// API key sent as X-API-KEY (overrides API_KEY)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Backend contract revision: v1, v2 or webhook (overrides CONTRACT_VERSION)
    #[arg(long, global = true)]
    contract: Option<ContractVersion>,
}

impl From<GlobalArgs> for Overrides {
    fn from(args: GlobalArgs) -> Self {
        Self {
            api_url: args.api_url,
            api_key: args.api_key,
            contract: args.contract,
        }
    }
}

#[derive(Subcommand)]
enum Cmd {
    /// Redact a single image (jpg, jpeg, png)
    Image {
        file: PathBuf,
        #[arg(long, default_value = "NONE", value_parser = parse_profile)]
        profile: ComplianceProfile,
        #[arg(long, default_value = "blur", value_parser = parse_mode)]
        mode: RedactionMode,
        /// Override face redaction (true/false)
        #[arg(long)]
        faces: Option<bool>,
        /// Override licence plate redaction (true/false)
        #[arg(long)]
        plates: Option<bool>,
        /// Override logo redaction (true/false)
        #[arg(long)]
        logos: Option<bool>,
        /// Override text (OCR) redaction (true/false)
        #[arg(long)]
        text: Option<bool>,
        /// Region of interest as x_min,y_min,x_max,y_max in 0.0..=1.0
        #[arg(long)]
        roi: Option<RegionOfInterest>,
        /// Return detected regions as JSON instead of a redacted image
        #[arg(long)]
        coordinates_only: bool,
        /// Where to write the redacted image
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Submit a video (mp4) as a background job
    Video {
        file: PathBuf,
        #[arg(long, default_value = "NONE", value_parser = parse_profile)]
        profile: ComplianceProfile,
        /// Completion webhook (webhook contract only)
        #[arg(long)]
        webhook_url: Option<String>,
        /// Print the job id and exit without polling
        #[arg(long)]
        no_wait: bool,
    },
    /// Show the status of a video job
    Status {
        job_id: String,
        /// Keep polling until the job finishes
        #[arg(long)]
        watch: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match ConsoleConfig::from_env() {
        Ok(config) => config.with_overrides(cli.global.into()),
        Err(e) => {
            telemetry::init_tracing(LogFormat::Text);
            tracing::error!(error = %e, "Failed to load configuration");
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    telemetry::init_tracing(config.log_format);

    let result = run(cli.cmd, &config).await;
    if let Err(e) = &result {
        tracing::error!(error = %e, "Console action failed");
        eprintln!("error: {e}");
    }
    ExitCode::from(exit_code(&result))
}

/// 0 only when the action succeeded and any job it followed completed.
fn exit_code(result: &Result<bool, ConsoleError>) -> u8 {
    match result {
        Ok(true) => 0,
        Ok(false) | Err(_) => 1,
    }
}

/// Run one action. `Ok(false)` means the job finished unsuccessfully.
async fn run(cmd: Cmd, config: &ConsoleConfig) -> Result<bool, ConsoleError> {
    let client = Arc::new(ScrubClient::new(
        config.api_base()?,
        config.api_key().map(str::to_string),
        config.contract_version.adapter(),
        config.request_timeout(),
    )?);
    tracing::debug!(
        api_url = %client.base(),
        contract = %client.contract().version(),
        "Console ready"
    );
    let mut stdout = std::io::stdout();

    match cmd {
        Cmd::Image {
            file,
            profile,
            mode,
            faces,
            plates,
            logos,
            text,
            roi,
            coordinates_only,
            out,
        } => {
            let upload = UploadFile::load(&file, MediaKind::Image)?;
            let request = RedactionRequest {
                profile,
                mode,
                targets: TargetOverrides { faces, plates, logos, text },
                roi,
                coordinates_only,
                webhook_url: None,
            }
            .validated()?;

            let result = client.submit_image(&upload, &request).await?;
            console::present_image(&result, &file, out.as_deref(), &mut stdout)?;
            Ok(true)
        }
        Cmd::Video {
            file,
            profile,
            webhook_url,
            no_wait,
        } => {
            let upload = UploadFile::load(&file, MediaKind::Video)?;
            let webhook_url = webhook_url.or_else(|| {
                (config.contract_version == ContractVersion::Webhook)
                    .then(|| config.webhook_url.clone())
                    .flatten()
            });
            let request = RedactionRequest {
                profile,
                webhook_url,
                ..Default::default()
            }
            .validated()?;

            let job = client.submit_video(&upload, &request).await?;
            println!("Job started: {} ({})", job.job_id, job.status);
            if no_wait {
                return Ok(true);
            }
            follow(client, job.job_id, config).await
        }
        Cmd::Status { job_id, watch } => {
            let snapshot = client.fetch_job(&job_id).await?;
            println!("{}", console::status_line(&snapshot));

            if let Some(outcome) = snapshot.outcome() {
                let outcome = PollOutcome::from(outcome);
                println!("{}", console::outcome_message(&outcome));
                return Ok(outcome.is_success());
            }
            if !watch {
                return Ok(true);
            }
            follow(client, job_id, config).await
        }
    }
}

/// Poll a job in the background until it ends; Ctrl-C stops watching.
async fn follow(
    client: Arc<ScrubClient>,
    job_id: String,
    config: &ConsoleConfig,
) -> Result<bool, ConsoleError> {
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let handle = JobPoller::new(client, config.poll_settings()).spawn(job_id, cancel);
    let outcome = console::watch(handle, &mut std::io::stdout()).await?;
    Ok(outcome.is_success())
}

pub mod command;
pub mod extract;
pub mod runner;
pub mod temp;

use crate::{
    config::GeneratorConfig,
    error::{PanelError, Result},
    logger,
    models::{
        DispatchOutcome, GenerateRequest, InspireOutcome, InspireRequest, InvocationResult, Mode,
        PayloadSource, RefineRequest, Request, Response,
    },
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub use runner::{CommandRunner, ProcessRunner, RunOutput};

pub const MISSING_REFERENCE_IMAGE: &str = "No image provided or file not found";

/// Turns panel requests into generator runs. Each call spawns its own process
/// and allocates its own temp files; nothing is shared between calls.
#[derive(Clone)]
pub struct Dispatcher {
    runner: Arc<dyn CommandRunner>,
    temp_dir: Option<PathBuf>,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(config: &GeneratorConfig) -> Self {
        Self::with_runner(config, Arc::new(ProcessRunner::new(config)))
    }

    pub fn with_runner(config: &GeneratorConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            temp_dir: config.temp_dir.clone(),
            timeout: config.timeout,
        }
    }

    pub fn temp_dir(&self) -> Option<&Path> {
        self.temp_dir.as_deref()
    }

    pub async fn dispatch(&self, request: &Request) -> Response {
        match request {
            Request::Generate(req) => Response::Image(self.generate(req).await),
            Request::Refine(req) => Response::Image(self.refine(req).await),
            Request::Inspire(req) => Response::Prompt(self.inspire(req).await),
        }
    }

    pub async fn generate(&self, request: &GenerateRequest) -> DispatchOutcome {
        let _timer = logger::timer("generate");
        let result = self.invoke_generate(request).await;
        self.image_outcome(Mode::Generate, result)
    }

    pub async fn refine(&self, request: &RefineRequest) -> DispatchOutcome {
        let _timer = logger::timer("refine");
        let result = self.invoke_refine(request).await;
        self.image_outcome(Mode::Refine, result)
    }

    pub async fn inspire(&self, request: &InspireRequest) -> InspireOutcome {
        let _timer = logger::timer("inspire");
        match self
            .invoke_inspire(request)
            .await
            .and_then(InvocationResult::ensure_success)
        {
            Ok(result) => InspireOutcome {
                status: success_status(Mode::Inspire, &result.stdout),
                structured_prompt: result.structured_prompt.unwrap_or_default(),
            },
            Err(e) => InspireOutcome::failure(self.failure_status(Mode::Inspire, &e)),
        }
    }

    pub async fn invoke_generate(&self, request: &GenerateRequest) -> Result<InvocationResult> {
        let output = temp::allocate_output_image(self.temp_dir())?;
        let args = command::generate_args(request, &output);
        self.execute(Mode::Generate, &args, output).await
    }

    /// The structured-prompt temp file lives only for the duration of this
    /// call and is removed whatever the outcome.
    pub async fn invoke_refine(&self, request: &RefineRequest) -> Result<InvocationResult> {
        let source_image = request.source_image.as_deref().filter(|path| {
            let exists = path.exists();
            if !exists {
                log::warn!("⚠️  Source image {} not found, refining without it", path.display());
            }
            exists
        });

        let prompt_file = match request
            .structured_prompt
            .as_deref()
            .filter(|json| !json.trim().is_empty())
        {
            Some(json) => Some(temp::write_structured_prompt(self.temp_dir(), json)?),
            None => None,
        };

        let output = temp::allocate_output_image(self.temp_dir())?;
        let args = command::refine_args(
            request,
            &output,
            source_image,
            prompt_file.as_ref().map(|file| file.path()),
        );
        let result = self.execute(Mode::Refine, &args, output).await;
        drop(prompt_file);
        result
    }

    /// Fails with `ValidationError` before spawning anything when the
    /// reference image is missing. The output image only exists so the
    /// generator can derive its sidecar path and is removed afterwards.
    pub async fn invoke_inspire(&self, request: &InspireRequest) -> Result<InvocationResult> {
        let reference = match request.reference_image.as_deref() {
            Some(path) if path.exists() => path,
            _ => return Err(PanelError::ValidationError(MISSING_REFERENCE_IMAGE.into())),
        };

        let output = temp::allocate_output_image(self.temp_dir())?;
        let args = command::inspire_args(request, reference, &output);
        let mut result = self.execute(Mode::Inspire, &args, output).await?;
        if let Some(image) = result.image_path.take() {
            temp::discard(&image);
        }
        Ok(result)
    }

    async fn execute(&self, mode: Mode, args: &[String], output: PathBuf) -> Result<InvocationResult> {
        log::info!(mode = mode.as_str(), args = args.len(); "🚀 Dispatching {} with {} arguments", mode, args.len());

        let run = match self.runner.run(args).await {
            Ok(run) => run,
            Err(e) => {
                log::error!(mode = mode.as_str(); "❌ {} run failed: {}", mode, e);
                discard_outputs(&output);
                return Err(e);
            }
        };

        if !run.success() {
            // -1 stands for termination by signal.
            log::error!(
                mode = mode.as_str(),
                exit_code = run.exit_code.unwrap_or(-1);
                "❌ {} exited with {:?}", mode, run.exit_code
            );
            discard_outputs(&output);
            return Ok(InvocationResult {
                exit_code: run.exit_code,
                stdout: run.stdout,
                stderr: run.stderr,
                image_path: None,
                structured_prompt: None,
                payload_source: PayloadSource::None,
            });
        }

        let (structured_prompt, payload_source) =
            extract::extract_structured_prompt(&output, &run.stdout);
        log::info!(
            mode = mode.as_str(),
            exit_code = 0,
            source = payload_source.as_str();
            "✅ {} succeeded, structured prompt from {}",
            mode,
            payload_source.as_str()
        );

        Ok(InvocationResult {
            exit_code: run.exit_code,
            stdout: run.stdout,
            stderr: run.stderr,
            image_path: Some(output),
            structured_prompt,
            payload_source,
        })
    }

    fn image_outcome(&self, mode: Mode, result: Result<InvocationResult>) -> DispatchOutcome {
        match result.and_then(InvocationResult::ensure_success) {
            Ok(result) => DispatchOutcome {
                status: success_status(mode, &result.stdout),
                image_path: result.image_path,
                structured_prompt: result.structured_prompt.unwrap_or_default(),
            },
            Err(e) => DispatchOutcome::failure(self.failure_status(mode, &e)),
        }
    }

    fn failure_status(&self, mode: Mode, err: &PanelError) -> String {
        match err {
            PanelError::Timeout(_) => {
                format!("⏱️ Timeout: {} took >{}", mode.title(), describe(self.timeout))
            }
            PanelError::ProcessFailure { stderr, .. } => format!("❌ Error:\n{}", stderr),
            PanelError::ValidationError(msg) => format!("❌ Error: {}", msg),
            other => format!("❌ Error: {}", other),
        }
    }
}

fn success_status(mode: Mode, stdout: &str) -> String {
    format!("{}\n\n{}", mode.success_message(), stdout)
}

fn describe(timeout: Duration) -> String {
    let secs = timeout.as_secs();
    match secs {
        60 => "1 minute".to_string(),
        s if s >= 60 && s % 60 == 0 => format!("{} minutes", s / 60),
        s => format!("{} seconds", s),
    }
}

/// A failed run leaves nothing the caller can use.
fn discard_outputs(output: &Path) {
    temp::discard(output);
    temp::discard(&extract::sidecar_path(output));
}

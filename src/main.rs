use argh::FromArgs;
use physique_trainer::{
    AssessmentMode, OllamaConfig, OllamaModel, ProgressionGroup, SurveyOptions, Trainer,
    TrainerError, TrainerOptions, WorkoutPlan,
    ollama::{DEFAULT_HOST, DEFAULT_PORT, DEFAULT_TEXT_MODEL, DEFAULT_VISION_MODEL},
    progression,
};
use std::{
    io::Write,
    path::{Path, PathBuf},
    process::ExitCode,
    time::Duration,
};

#[derive(FromArgs)]
/// Suggests exercises for the weak points seen in front, side and back photographs.
struct TrainerArgs {
    /// the host of the inference server
    #[argh(option, short = 'h', default = "DEFAULT_HOST.to_string()")]
    host: String,

    /// the port of the inference server
    #[argh(option, short = 'p', default = "DEFAULT_PORT")]
    port: u16,

    /// base url of a separate server for the text model
    #[argh(option)]
    text_endpoint: Option<String>,

    /// the vision-capable model
    #[argh(option, default = "DEFAULT_VISION_MODEL.to_string()")]
    vision_model: String,

    /// the text-generation model
    #[argh(option, default = "DEFAULT_TEXT_MODEL.to_string()")]
    text_model: String,

    /// directory holding image_front.jpeg, image_side.jpeg and image_back.jpeg
    #[argh(option, short = 'i', default = "PathBuf::from(\".\")")]
    images: PathBuf,

    /// text file with the current workout plan
    #[argh(option)]
    plan: PathBuf,

    /// write the updated plan to this file instead of stdout
    #[argh(option, short = 'o')]
    output: Option<PathBuf>,

    /// give up on a model call after this many seconds
    #[argh(option)]
    timeout_secs: Option<u64>,

    /// rate every body region separately instead of one overall assessment
    #[argh(switch)]
    survey: bool,

    /// ratings taken per view in survey mode
    #[argh(option, default = "SurveyOptions::default().opinions")]
    opinions: usize,

    /// extra samples allowed for an unusable rating in survey mode
    #[argh(option, default = "SurveyOptions::default().max_resamples")]
    max_resamples: usize,

    /// lowest-rated regions kept in survey mode
    #[argh(option, default = "SurveyOptions::default().lagging_areas")]
    lagging_areas: usize,

    /// comma-separated exercises of one progression the athlete may already do; repeatable
    #[argh(option)]
    progression: Vec<String>,

    /// check the built-in leg-raise, push-up and pull-up progressions
    #[argh(switch)]
    default_progressions: bool,
}

impl TrainerArgs {
    fn options(&self) -> Result<TrainerOptions, TrainerError> {
        let mode = if self.survey {
            let survey = SurveyOptions {
                opinions: self.opinions,
                max_resamples: self.max_resamples,
                lagging_areas: self.lagging_areas,
            };
            survey.validate()?;
            AssessmentMode::Survey(survey)
        } else {
            AssessmentMode::Summary
        };

        let mut progressions: Vec<ProgressionGroup> = self
            .progression
            .iter()
            .map(|list| ProgressionGroup::parse(list.as_str()))
            .filter(|group| !group.exercises.is_empty())
            .collect();
        if self.default_progressions {
            progressions.extend(progression::default_groups());
        }

        Ok(TrainerOptions { mode, progressions })
    }
}

fn write_output(path: Option<&Path>, plan: &WorkoutPlan) -> Result<(), TrainerError> {
    match path {
        Some(path) => std::fs::write(path, plan.as_str()).map_err(|source| TrainerError::Output {
            path: path.to_path_buf(),
            source,
        }),
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", plan.as_str().trim_end()).map_err(|source| {
                TrainerError::Output {
                    path: PathBuf::from("<stdout>"),
                    source,
                }
            })
        }
    }
}

fn run(args: TrainerArgs) -> Result<(), Box<dyn std::error::Error>> {
    let options = args.options()?;

    log::warn!(
        "Do not start any exercise program without first consulting with a doctor. AI-based systems can make mistakes."
    );

    // format the host and port
    let endpoint = format!("http://{}:{}", args.host, args.port);
    let text_endpoint = args.text_endpoint.clone().unwrap_or_else(|| endpoint.clone());
    let timeout = args.timeout_secs.map(Duration::from_secs);

    let vision = OllamaModel::new(
        OllamaConfig::new(endpoint, args.vision_model.clone()).with_timeout(timeout),
    )?;
    let text = OllamaModel::new(
        OllamaConfig::new(text_endpoint, args.text_model.clone()).with_timeout(timeout),
    )?;

    log::info!("Vision model {} at {}", args.vision_model, vision.url());
    log::info!("Text model {} at {}", args.text_model, text.url());

    let mut trainer = Trainer::new(vision, text).with_options(options);
    let outcome = trainer.run_from_files(&args.images, &args.plan)?;

    for report in &outcome.stages {
        log::info!("{}: {:?}", report.stage.as_str(), report.duration);
    }
    log::debug!("Assessment:\n{}", outcome.assessment);

    write_output(args.output.as_deref(), &outcome.plan)?;

    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args: TrainerArgs = argh::from_env();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            log::debug!("{e:?}");
            ExitCode::FAILURE
        }
    }
}

mod settings;

use std::collections::BTreeMap;
use std::error::Error;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use bookcaption_core::benchmark::domain::speed_test_config_key::SpeedTestConfigKey;
use bookcaption_core::benchmark::infrastructure::json_speed_ratio_store::SpeedRatioStore;
use bookcaption_core::benchmark::speed_benchmark::SpeedBenchmark;
use bookcaption_core::benchmark::speed_test_use_case::SpeedTestUseCase;
use bookcaption_core::capabilities::capability_probe::CapabilityProbe;
use bookcaption_core::capabilities::domain::feature_flags::FeatureFlags;
use bookcaption_core::capabilities::infrastructure::whisper_help_detector::WhisperHelpDetector;
use bookcaption_core::jobs::job_registry::JobRegistry;
use bookcaption_core::library::audio_library::AudioLibrary;
use bookcaption_core::media::infrastructure::ffmpeg_clip_extractor::FfmpegClipExtractor;
use bookcaption_core::media::infrastructure::ffprobe_duration_probe::FfprobeDurationProbe;
use bookcaption_core::media::infrastructure::vtt_caption_inspector::VttCaptionInspector;
use bookcaption_core::tool::infrastructure::whisper_cli::WhisperCli;
use bookcaption_core::transcription::caption_use_case::{BatchMode, CaptionPlan, CaptionUseCase};
use bookcaption_core::transcription::transcription_runner::{
    TranscriptionRequest, TranscriptionRunner,
};

use settings::Settings;

/// Caption audiobook collections with whisper.
#[derive(Parser)]
#[command(name = "bookcaption")]
struct Cli {
    /// Library root holding one directory per collection.
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Whisper model name.
    #[arg(long, global = true)]
    model: Option<String>,

    /// Do not request word-level timestamps.
    #[arg(long, global = true)]
    no_word_timestamps: bool,

    /// Do not request word highlighting.
    #[arg(long, global = true)]
    no_highlighting: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List collections in the library.
    Collections,
    /// Show duration, caption and job status for every item of a collection.
    Info { collection: String },
    /// List the items of a collection that already have captions.
    Tracks { collection: String },
    /// Report which optional features the installed whisper supports.
    Capabilities,
    /// Caption one item, streaming whisper's output.
    Caption { collection: String, item: String },
    /// Caption every item of a collection that has no caption yet.
    CaptionAll {
        collection: String,

        /// Run several items at once.
        #[arg(long)]
        parallel: bool,

        /// Worker threads for --parallel (defaults to the settings value).
        #[arg(long)]
        max_workers: Option<usize>,
    },
    /// Time whisper on a short clip and store the speed ratio.
    SpeedTest { collection: String },
    /// Show the stored speed ratio for the selected model and flags.
    SpeedRatio,
    /// Show the settings file location and effective settings.
    Config {
        /// Write the effective settings to the settings file.
        #[arg(long)]
        write: bool,
    },
}

impl Cli {
    fn features(&self) -> FeatureFlags {
        FeatureFlags::new(!self.no_word_timestamps, !self.no_highlighting)
    }

    fn apply_to(&self, settings: &mut Settings) {
        if let Some(root) = &self.root {
            settings.library_root = root.clone();
        }
        if let Some(model) = &self.model {
            settings.model = model.clone();
        }
    }
}

/// Shared collaborators, built once per invocation.
struct Services {
    settings: Settings,
    library: AudioLibrary,
    registry: Arc<JobRegistry>,
    capabilities: Arc<CapabilityProbe>,
    tool: Arc<WhisperCli>,
    probe: Arc<FfprobeDurationProbe>,
    inspector: Arc<VttCaptionInspector>,
}

impl Services {
    fn new(settings: Settings) -> Self {
        let detector = WhisperHelpDetector::new(&settings.whisper_program)
            .with_leading_args(&settings.whisper_args);
        Self {
            library: AudioLibrary::new(&settings.library_root),
            registry: Arc::new(JobRegistry::new()),
            capabilities: Arc::new(CapabilityProbe::new(Box::new(detector))),
            tool: Arc::new(
                WhisperCli::new(&settings.whisper_program)
                    .with_leading_args(&settings.whisper_args),
            ),
            probe: Arc::new(FfprobeDurationProbe::new(&settings.ffprobe_program)),
            inspector: Arc::new(VttCaptionInspector),
            settings,
        }
    }

    fn runner(&self) -> TranscriptionRunner {
        TranscriptionRunner::new(
            self.library.clone(),
            Arc::clone(&self.registry),
            Arc::clone(&self.capabilities),
            self.tool.clone(),
            self.inspector.clone(),
        )
        .with_model(&self.settings.model)
    }

    fn speed_ratio_store(&self) -> Arc<SpeedRatioStore> {
        Arc::new(SpeedRatioStore::new(&self.settings.speed_ratio_file))
    }

    fn speed_test(&self) -> SpeedTestUseCase {
        let benchmark = SpeedBenchmark::new(
            self.tool.clone(),
            Arc::clone(&self.capabilities),
            self.probe.clone(),
        );
        SpeedTestUseCase::new(
            self.library.clone(),
            Arc::new(FfmpegClipExtractor::new(&self.settings.ffmpeg_program)),
            benchmark,
            self.speed_ratio_store(),
        )
        .with_model(&self.settings.model)
    }

    fn require_collection(&self, collection: &str) -> Result<(), Box<dyn Error>> {
        if !self.library.has_collection(collection) {
            return Err(format!(
                "Collection not found: {}",
                self.library.collection_dir(collection).display()
            )
            .into());
        }
        Ok(())
    }
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let mut settings = Settings::load();
    cli.apply_to(&mut settings);
    let features = cli.features();

    if let Command::Config { write } = cli.command {
        return run_config(&settings, write);
    }

    let services = Services::new(settings);
    match cli.command {
        Command::Collections => run_collections(&services),
        Command::Info { collection } => run_info(&services, &collection),
        Command::Tracks { collection } => run_tracks(&services, &collection),
        Command::Capabilities => print_json(&services.capabilities.get()),
        Command::Caption { collection, item } => {
            run_caption(&services, &collection, &item, features)
        }
        Command::CaptionAll {
            collection,
            parallel,
            max_workers,
        } => {
            let mode = if parallel {
                BatchMode::Parallel {
                    max_workers: max_workers.unwrap_or(services.settings.max_workers),
                }
            } else {
                BatchMode::Sequential
            };
            run_caption_all(&services, &collection, features, mode)
        }
        Command::SpeedTest { collection } => run_speed_test(&services, &collection, features),
        Command::SpeedRatio => run_speed_ratio(&services, features),
        Command::Config { .. } => Ok(()),
    }
}

fn run_collections(services: &Services) -> Result<(), Box<dyn Error>> {
    for collection in services.library.collections()? {
        println!("{collection}");
    }
    Ok(())
}

fn run_info(services: &Services, collection: &str) -> Result<(), Box<dyn Error>> {
    services.require_collection(collection)?;
    let info = services.library.file_info(
        collection,
        services.probe.as_ref(),
        services.inspector.as_ref(),
        &services.registry,
    )?;
    print_json(&info)
}

fn run_tracks(services: &Services, collection: &str) -> Result<(), Box<dyn Error>> {
    services.require_collection(collection)?;
    for item in services.library.captioned_items(collection)? {
        println!("{item}");
    }
    Ok(())
}

fn run_caption(
    services: &Services,
    collection: &str,
    item: &str,
    features: FeatureFlags,
) -> Result<(), Box<dyn Error>> {
    let use_case = CaptionUseCase::new(services.runner());
    let request = TranscriptionRequest::new(collection, item).with_features(features);
    narrate(use_case.caption_item(request));
    Ok(())
}

fn run_caption_all(
    services: &Services,
    collection: &str,
    features: FeatureFlags,
    mode: BatchMode,
) -> Result<(), Box<dyn Error>> {
    services.require_collection(collection)?;
    let use_case = CaptionUseCase::new(services.runner());
    narrate(use_case.caption_collection(collection, features, mode)?);
    Ok(())
}

fn narrate(plan: CaptionPlan) {
    match plan {
        CaptionPlan::AlreadyCaptioned => println!("exists"),
        CaptionPlan::NothingPending => println!("All files already have transcripts"),
        CaptionPlan::Narrate(lines) => {
            for line in lines {
                println!("{line}");
            }
        }
    }
}

fn run_speed_test(
    services: &Services,
    collection: &str,
    features: FeatureFlags,
) -> Result<(), Box<dyn Error>> {
    services.require_collection(collection)?;
    let durations: BTreeMap<String, f64> = services
        .library
        .file_info(
            collection,
            services.probe.as_ref(),
            services.inspector.as_ref(),
            &services.registry,
        )?
        .into_iter()
        .map(|(item, info)| (item, info.duration))
        .collect();

    let outcome = services
        .speed_test()
        .execute(collection, features, &durations)?;
    print_json(&outcome)
}

fn run_speed_ratio(services: &Services, features: FeatureFlags) -> Result<(), Box<dyn Error>> {
    match services.speed_test().lookup(features) {
        Some(record) => print_json(&record),
        None => {
            let key = SpeedTestConfigKey::new(&services.settings.model, features);
            println!("No speed ratio recorded for {key}");
            Ok(())
        }
    }
}

fn run_config(settings: &Settings, write: bool) -> Result<(), Box<dyn Error>> {
    let path = Settings::config_path().ok_or("no configuration directory on this platform")?;
    if write {
        settings.save_to(&path)?;
        log::info!("Settings written to {}", path.display());
    }
    println!("{}", path.display());
    print_json(settings)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("bookcaption").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_feature_flags_default_on() {
        let cli = parse(&["caption", "Book", "01.mp3"]);
        assert_eq!(cli.features(), FeatureFlags::new(true, true));
    }

    #[test]
    fn test_feature_flags_can_be_disabled_after_subcommand() {
        let cli = parse(&["caption-all", "Book", "--no-word-timestamps", "--no-highlighting"]);
        assert_eq!(cli.features(), FeatureFlags::new(false, false));
    }

    #[test]
    fn test_caption_all_options() {
        let cli = parse(&["caption-all", "Book", "--parallel", "--max-workers", "3"]);
        match cli.command {
            Command::CaptionAll {
                collection,
                parallel,
                max_workers,
            } => {
                assert_eq!(collection, "Book");
                assert!(parallel);
                assert_eq!(max_workers, Some(3));
            }
            _ => panic!("expected caption-all"),
        }
    }

    #[test]
    fn test_global_overrides_apply_to_settings() {
        let cli = parse(&["--root", "/srv/books", "--model", "tiny", "collections"]);
        let mut settings = Settings::default();

        cli.apply_to(&mut settings);

        assert_eq!(settings.library_root, PathBuf::from("/srv/books"));
        assert_eq!(settings.model, "tiny");
        assert_eq!(settings.max_workers, 2);
    }

    #[test]
    fn test_tracks_takes_collection() {
        let cli = parse(&["tracks", "Book"]);
        assert!(matches!(cli.command, Command::Tracks { collection } if collection == "Book"));
    }

    #[test]
    fn test_caption_requires_item() {
        let result = Cli::try_parse_from(["bookcaption", "caption", "Book"]);
        assert!(result.is_err());
    }
}

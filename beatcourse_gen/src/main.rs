// Beat Course Generator: CLI entry point.
//
// Loads `<beat-dir>/<track>.json`, searches a course for one or all
// difficulties, and writes each to `<output-dir>/<track>/<difficulty>.json`.
// Difficulties are independent, so `--all-difficulties` runs them in
// parallel; results are still written and reported in easy/normal/hard
// order. Logs go to stderr (RUST_LOG overrides the level), summaries to
// stdout.
//
// Usage:
//   generate --track <ID> (--difficulty <easy|normal|hard> | --all-difficulties)
//     [--max-attempts N] [--target-score F] [--params FILE]
//     [--beat-dir DIR] [--output-dir DIR] [-v]

use anyhow::{Context, Result, ensure};
use beatcourse_gen::beatmap::BeatMap;
use beatcourse_gen::course::{Course, GeneratedCourse, course_path, generate_course};
use beatcourse_gen::params::{Difficulty, ParameterOverrides};
use beatcourse_gen::post::PostProcessOdds;
use beatcourse_gen::search::SearchConfig;
use clap::{ArgGroup, Parser};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Generate rhythm-game courses from a track's beat map.
#[derive(Parser, Debug)]
#[command(about, long_about = None, version)]
#[command(group(ArgGroup::new("selector").required(true).args(["difficulty", "all_difficulties"])))]
struct Args {
    /// Track id; the beat map is read from `<beat-dir>/<track>.json`
    #[arg(long)]
    track: String,

    /// Generate a single difficulty (easy, normal or hard)
    #[arg(long)]
    difficulty: Option<Difficulty>,

    /// Generate all three difficulties
    #[arg(long)]
    all_difficulties: bool,

    /// Maximum number of generation attempts per difficulty
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u64).range(1..))]
    max_attempts: u64,

    /// Stop searching once a course scores at least this much
    #[arg(long, default_value_t = 9.60)]
    target_score: f64,

    /// JSON file of parameter overrides applied on top of every preset
    #[arg(long)]
    params: Option<PathBuf>,

    /// Directory containing beat-map JSON files
    #[arg(long, default_value = "public/beat_data")]
    beat_dir: PathBuf,

    /// Directory courses are written under
    #[arg(long, default_value = "public/courses")]
    output_dir: PathBuf,

    /// Log every attempt
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    run(&args)
}

fn run(args: &Args) -> Result<()> {
    let beat_file = args.beat_dir.join(format!("{}.json", args.track));
    let map = BeatMap::load(&beat_file)
        .with_context(|| format!("could not load beat map for track {}", args.track))?;

    let overrides = match &args.params {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("could not read parameter file {}", path.display()))?;
            ParameterOverrides::from_json(&json, &path.display().to_string())?
        }
        None => ParameterOverrides::default(),
    };

    let difficulties: Vec<Difficulty> = match args.difficulty {
        Some(d) if !args.all_difficulties => vec![d],
        _ => Difficulty::ALL.to_vec(),
    };

    // Validate every bundle before any search starts.
    let bundles = difficulties
        .iter()
        .map(|&d| {
            d.preset()
                .with_overrides(&overrides)
                .with_context(|| format!("invalid parameters for {d}"))
                .map(|p| (d, p))
        })
        .collect::<Result<Vec<_>>>()?;

    let config = SearchConfig {
        max_attempts: usize::try_from(args.max_attempts).context("--max-attempts is too large")?,
        target_score: args.target_score,
    };
    let odds = PostProcessOdds::default();
    info!(
        track = %args.track,
        samples = map.sample_count(),
        difficulties = difficulties.len(),
        max_attempts = config.max_attempts,
        target = config.target_score,
        "generating courses"
    );

    let results: Vec<GeneratedCourse> = bundles
        .par_iter()
        .map(|(d, params)| generate_course(&map, *d, params, &config, &odds, &args.track))
        .collect();

    for generated in &results {
        let course = &generated.course;
        let out_file = course_path(&args.output_dir, &args.track, course.difficulty);
        course
            .write(&out_file)
            .with_context(|| format!("could not write {} course", course.difficulty))?;
        let saved = Course::load(&out_file)
            .with_context(|| format!("could not read back {}", out_file.display()))?;
        ensure!(
            saved.difficulty == course.difficulty && saved.events.len() == course.events.len(),
            "{} does not match the generated course",
            out_file.display()
        );
        print_summary(generated, &out_file);
    }
    Ok(())
}

fn print_summary(generated: &GeneratedCourse, out_file: &Path) {
    let course = &generated.course;
    let s = &course.score;
    println!("=== {} course for {} ===", course.difficulty, course.spotify_track_id);
    println!(
        "Result: {} events, score={:.2} (champion attempt {} of {}{})",
        course.events.len(),
        s.total,
        course.attempts,
        generated.attempts_run,
        if generated.reached_target { ", target reached" } else { "" }
    );
    println!(
        "  beat_sync={:.1}  flow={:.1}  curve={:.1}  variety={:.1}",
        s.beat_sync, s.flow, s.difficulty_curve, s.type_variety
    );
    println!(
        "  coverage={:.1}  energy={:.1}  cull_rate={:.1}",
        s.lane_coverage, s.energy_match, s.cull_rate
    );
    println!(
        "  post: +{} car_crash_beat, +{} guardian, {} enemy_car",
        generated.post.car_crash_beats, generated.post.guardians, generated.post.enemy_cars
    );
    println!("Saved: {}", out_file.display());
}

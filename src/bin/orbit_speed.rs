use anyhow::{Context, Result};
use chrono::{DateTime, TimeDelta, Utc};
use clap::{Parser, Subcommand};
use orbit_speed::prelude::*;
use serde::{Deserialize, de::DeserializeOwned};
use sguaba::systems::Wgs84;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uom::{
    ConstZero,
    si::{
        angle::degree,
        f64::{Angle, Length},
    },
};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Optional JSON file overriding the default pipeline configuration.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// File overwritten with the latest estimate.
    #[arg(short, long, global = true, default_value = "result.txt")]
    output: PathBuf,

    /// Stop once the captures span this many seconds.
    #[arg(long, global = true, default_value_t = 540.0)]
    run_duration: f64,
}

#[derive(Subcommand)]
enum Command {
    /// Replay recorded frames and matches.
    Replay {
        /// JSON file with the recorded frames and matches.
        #[arg(long)]
        dataset: PathBuf,

        #[arg(long, default_value_t = 6)]
        min_group_size: usize,

        /// Replay this run of consecutive frames instead of a random one.
        #[arg(long)]
        group: Option<usize>,

        #[arg(long, default_value_t = 0)]
        seed: u64,
    },

    /// Generate frames and matches along a simulated orbit.
    Simulate {
        /// JSON file with the orbit parameters.
        #[arg(long)]
        params: Option<PathBuf>,

        /// JSON file with the match noise parameters.
        #[arg(long)]
        noise: Option<PathBuf>,
    },
}

#[derive(Deserialize)]
struct RecordedFrame {
    id: u64,
    timestamp: DateTime<Utc>,
    latitude_deg: Option<f64>,
    longitude_deg: Option<f64>,
    width: u32,
    height: u32,
}

#[derive(Deserialize)]
struct RecordedPair {
    base: u64,
    compare: u64,

    /// Matched points as (x1, y1, x2, y2) in pixels.
    points: Vec<[f64; 4]>,
}

#[derive(Deserialize)]
struct Dataset {
    frames: Vec<RecordedFrame>,
    pairs: Vec<RecordedPair>,
}

impl RecordedFrame {
    fn into_image(self) -> Result<Image> {
        let image = Image::new(self.id, self.timestamp, self.width, self.height);
        let (Some(latitude), Some(longitude)) = (self.latitude_deg, self.longitude_deg) else {
            return Ok(image);
        };

        let position = Wgs84::builder()
            .latitude(Angle::new::<degree>(latitude))
            .with_context(|| format!("frame {} has latitude {latitude}", self.id))?
            .longitude(Angle::new::<degree>(longitude))
            .altitude(Length::ZERO)
            .build();

        Ok(image.with_position(position))
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let serialized = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&serialized).with_context(|| format!("failed to parse {}", path.display()))
}

fn run<C: Camera, M: FeatureMatcher>(
    camera: &mut C,
    pipeline: &mut SpeedPipeline<M>,
    output: &Path,
    run_duration: TimeDelta,
) -> Result<()> {
    let mut started: Option<DateTime<Utc>> = None;

    loop {
        let image = match camera.capture() {
            Ok(image) => image,
            Err(CaptureError::Exhausted) => {
                info!("camera exhausted");
                break;
            }
            Err(err) => return Err(err.into()),
        };

        let start = *started.get_or_insert(image.timestamp());
        if image.timestamp() - start > run_duration {
            info!("run duration reached");
            break;
        }

        let Some(report) = pipeline.ingest(image) else {
            continue;
        };

        if let Ok(estimate) = &report.estimate {
            fs::write(output, format!("{estimate}\n"))
                .with_context(|| format!("failed to write {}", output.display()))?;
        }
    }

    pipeline.finish();
    match pipeline.current_estimate() {
        Ok(estimate) => info!("final speed: {estimate}"),
        Err(err) => warn!("insufficient data for a final speed: {err}"),
    }

    Ok(())
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("orbit_speed=info"))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();

    let config: PipelineConfig = match &args.config {
        Some(path) => read_json(path)?,
        None => PipelineConfig::default(),
    };
    let run_duration = TimeDelta::milliseconds((args.run_duration * 1000.0) as i64);

    match args.command {
        Command::Replay {
            dataset,
            min_group_size,
            group,
            seed,
        } => {
            let dataset: Dataset = read_json(&dataset)?;

            let mut matcher = RecordedMatcher::new();
            for pair in dataset.pairs {
                let points = pair
                    .points
                    .iter()
                    .map(|[x1, y1, x2, y2]| CoordinatePair::from_points((*x1, *y1), (*x2, *y2)))
                    .collect();
                matcher.record(pair.base, pair.compare, points);
            }

            let frames = dataset
                .frames
                .into_iter()
                .map(RecordedFrame::into_image)
                .collect::<Result<Vec<_>>>()?;
            let selection = group.map_or(GroupSelection::Random(seed), GroupSelection::Index);
            let mut camera = ReplayCamera::new(frames, min_group_size, selection)?;

            info!(pairs = matcher.len(), frames = camera.remaining(), "loaded dataset");
            let mut pipeline = SpeedPipeline::new(config, matcher)?;
            run(&mut camera, &mut pipeline, &args.output, run_duration)
        }
        Command::Simulate { params, noise } => {
            let params: OrbitParams = match &params {
                Some(path) => read_json(path)?,
                None => OrbitParams::default(),
            };
            let noise: MatchNoise = match &noise {
                Some(path) => read_json(path)?,
                None => MatchNoise::default(),
            };

            let simulation = OrbitSimulation::new(params, Utc::now())?;
            let mut camera = simulation.camera()?;
            let matcher = simulation.matcher(config.ground_sample_distance(), noise)?;

            info!(
                speed_mps = params.speed_mps,
                frames = params.frame_count,
                "simulating orbit"
            );
            let mut pipeline = SpeedPipeline::new(config, matcher)?;
            run(&mut camera, &mut pipeline, &args.output, run_duration)
        }
    }
}

use std::error::Error;
use std::path::PathBuf;

use burn_ndarray::NdArray;
use clap::{Parser, ValueEnum};
use log::LevelFilter;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use arcadenet::models::DenseHead;
use arcadenet::{
    CnnBackbone, CnnBackboneConfig, EnvExt, Environment, Observation, ResNetExtractor,
    ResNetExtractorConfig, Surround, observations_to_tensor,
};

type Backend = NdArray<f32>;
type Device = <Backend as burn::tensor::backend::Backend>::Device;

#[derive(Parser, Debug)]
#[command(
    about = "Play Surround through the observation pipeline with an untrained network",
    version
)]
struct RolloutArgs {
    /// Number of episodes to play.
    #[arg(long, default_value_t = 2)]
    episodes: usize,
    /// Network used to score actions.
    #[arg(long, value_enum, default_value_t = NetworkKind::Cnn)]
    network: NetworkKind,
    /// Observations stacked into the channel axis.
    #[arg(long, default_value_t = 4)]
    frames: usize,
    /// Feature width of the residual extractor.
    #[arg(long, default_value_t = 256)]
    features: usize,
    /// Number of residual stages.
    #[arg(long, default_value_t = 2)]
    depth: usize,
    /// Playfield width in cells.
    #[arg(long, default_value_t = 40)]
    grid_width: usize,
    /// Playfield height in cells.
    #[arg(long, default_value_t = 20)]
    grid_height: usize,
    /// Points needed to win a match.
    #[arg(long, default_value_t = 3)]
    points: u32,
    /// Probability of taking a uniformly random action.
    #[arg(long, default_value_t = 0.1)]
    epsilon: f64,
    /// Stop an episode after this many pipeline steps.
    #[arg(long, default_value_t = 2_000)]
    max_steps: usize,
    /// Master seed for the environment and exploration.
    #[arg(long, default_value_t = 0x5EED_0F_A5CAu64)]
    seed: u64,
    /// Log verbosity.
    #[arg(long, default_value_t = LevelFilter::Info)]
    log_level: LevelFilter,
    /// Write logs to this file instead of stdout.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum NetworkKind {
    Cnn,
    Resnet,
}

enum Scorer {
    Cnn(CnnBackbone<Backend>),
    ResNet {
        extractor: ResNetExtractor<Backend>,
        head: DenseHead<Backend>,
    },
}

impl Scorer {
    fn action_values(
        &self,
        observation: &Observation,
        device: &Device,
    ) -> Result<Vec<f32>, Box<dyn Error>> {
        let input = observations_to_tensor::<Backend>(std::slice::from_ref(observation), device)?;
        let logits = match self {
            Scorer::Cnn(backbone) => backbone.forward(input),
            Scorer::ResNet { extractor, head } => head.forward(extractor.forward(input)),
        };
        logits
            .into_data()
            .to_vec::<f32>()
            .map_err(|err| format!("tensor conversion failed: {err:?}").into())
    }
}

fn setup_logger(level: LevelFilter, log_file: &Option<PathBuf>) -> Result<(), fern::InitError> {
    let dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(level);

    match log_file {
        None => dispatch.chain(std::io::stdout()),
        Some(path) => dispatch.chain(fern::log_file(path)?),
    }
    .apply()?;
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = RolloutArgs::parse();
    setup_logger(args.log_level, &args.log_file)?;

    let surround = Surround::builder()
        .with_grid(args.grid_width, args.grid_height)
        .with_points_to_win(args.points)
        .with_seed(args.seed)
        .build()?;
    let mut env = surround
        .skip_redundant_frames()
        .remove_noop()?
        .stop_on_round_end(1.0)
        .progressive_reward(arcadenet::wrappers::DEFAULT_SURVIVAL_REWARD)
        .channel_first()?
        .frame_stack(args.frames)?
        .channel_wise_frame_stack()?
        .normalize();

    let device = Device::default();
    let space = env.observation_space().clone();
    let actions = env.action_space();
    log::info!(
        "pipeline observation shape {:?}, {} actions",
        space.shape,
        actions.n
    );

    let scorer = match args.network {
        NetworkKind::Cnn => {
            let obs_shape = [space.shape[0], space.shape[1], space.shape[2]];
            Scorer::Cnn(CnnBackboneConfig::new(obs_shape, actions.n).init(&device)?)
        }
        NetworkKind::Resnet => {
            let extractor = ResNetExtractorConfig::new(args.features)
                .with_depth(args.depth)
                .init(&space, &device)?;
            let head = DenseHead::new(extractor.features_dim(), &[], actions.n, &device);
            Scorer::ResNet { extractor, head }
        }
    };

    let mut rng = StdRng::seed_from_u64(args.seed ^ 0x9E37_79B9);
    for episode in 0..args.episodes {
        let mut observation = env.reset(Some(args.seed + episode as u64))?.observation;
        let mut episode_return = 0.0;
        let mut steps = 0usize;
        loop {
            let action = if rng.gen_bool(args.epsilon) {
                actions.sample(&mut rng)
            } else {
                let values = scorer.action_values(&observation, &device)?;
                values
                    .iter()
                    .enumerate()
                    .max_by(|a, b| a.1.total_cmp(b.1))
                    .map(|(index, _)| index)
                    .unwrap_or(0)
            };
            let step = env.step(action)?;
            episode_return += step.reward;
            steps += 1;
            let done = step.is_done();
            observation = step.observation;
            if done || steps >= args.max_steps {
                log::info!(
                    "episode {} finished after {} steps (terminated: {}, truncated: {}) with return {:.4}",
                    episode,
                    steps,
                    step.terminated,
                    step.truncated,
                    episode_return
                );
                break;
            }
        }
    }

    Ok(())
}

use std::path::PathBuf;

use anyhow::Context;
use baker::{cache, stat_readout, BuildConfig};
use clap::Parser;
use common::{asset::Asset, CLUSTER_GROUP_SIZE, CLUSTER_SIZE, DEFAULT_MAX_LEVELS, PARTITION_SEED};

/// Bake a cluster LOD hierarchy from a glTF or Wavefront mesh
#[derive(Parser, Debug)]
#[command(name = "baker", version)]
struct Args {
    /// Source mesh (.glb, .gltf or .obj)
    input: PathBuf,

    /// Where to write the hierarchy. Defaults to the input's cache location
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Target triangles per cluster
    #[arg(long, default_value_t = CLUSTER_SIZE)]
    cluster_size: u32,

    /// Target clusters per group
    #[arg(long, default_value_t = CLUSTER_GROUP_SIZE)]
    group_size: u32,

    /// Most levels to build
    #[arg(long, default_value_t = DEFAULT_MAX_LEVELS)]
    levels: u32,

    #[arg(long, default_value_t = PARTITION_SEED)]
    seed: i32,

    /// Always rebuild, and do not write the cache
    #[arg(long)]
    no_cache: bool,

    /// Colour each level's cluster graph
    #[arg(long)]
    colour_groups: bool,
}

impl Args {
    fn build_config(&self) -> BuildConfig {
        BuildConfig {
            cluster_size: self.cluster_size,
            group_size: self.group_size,
            seed: self.seed,
            max_levels: self.levels,
            use_cache: !self.no_cache,
            colour_groups: self.colour_groups,
            ..Default::default()
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = args.build_config();

    log::info!("Baking {} with {config:?}", args.input.display());

    let hierarchy = cache::load_or_build(&args.input, &config)?;

    for lod in &hierarchy.lods {
        stat_readout(lod);
    }

    if let Some(output) = &args.output {
        hierarchy
            .save(output)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        log::info!("Wrote {}", output.display());
    }

    Ok(())
}

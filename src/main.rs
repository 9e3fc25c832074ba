use std::env;
use std::fs;
use std::path::PathBuf;

use cgmath::Point3;
use log::{error, info};
use web_time::Instant;

use editsc_core::config::{load_or_create_config, Config};
use editsc_core::error::EditorError;
use editsc_core::init_logger;
use editsc_core::task_management::WorkerPool;
use editsc_core::voxels::block::block_type::BlockType;
use editsc_core::voxels::block::Block;
use editsc_core::voxels::chunk::Chunk;
use editsc_core::voxels::world::World;

const USAGE: &str = "usage:
  editsc info <world>
  editsc scan <world>
  editsc generate <world> <radius> [seed]
  editsc fill <in> <out> <x1> <y1> <z1> <x2> <y2> <z2> <value|name>

The config file is read from $EDITSC_CONFIG, or editsc.json.";

fn config_path() -> PathBuf {
    env::var_os("EDITSC_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("editsc.json"))
}

fn usage() -> EditorError {
    EditorError::Usage(USAGE.to_owned())
}

fn parse<T: std::str::FromStr>(arg: &str, what: &str) -> Result<T, EditorError> {
    arg.parse()
        .map_err(|_| EditorError::Usage(format!("Invalid {}: {}", what, arg)))
}

fn parse_block(arg: &str) -> Result<Block, EditorError> {
    match BlockType::from_name(arg) {
        Some(block_type) => Ok(block_type.block()),
        None => parse::<u32>(arg, "block value").map(Block::new),
    }
}

fn read_world(path: &str) -> Result<World, EditorError> {
    let start = Instant::now();
    let bytes = fs::read(path)?;
    let world = World::load_detected(&bytes)?;
    info!("Read {} in {:?}", path, start.elapsed());
    Ok(world)
}

fn write_world(path: &str, world: &World) -> Result<(), EditorError> {
    let bytes = world.encode();
    fs::write(path, &bytes)?;
    info!("Wrote {} chunks ({} bytes) to {}", world.len(), bytes.len(), path);
    Ok(())
}

fn info_command(path: &str) -> Result<(), EditorError> {
    let world = read_world(path)?;
    let layout = world.layout();
    println!(
        "{}: {} chunks, directory: {}, surface: {}",
        path,
        world.len(),
        layout.has_directory,
        layout.has_surface
    );
    for (index, chunk) in world.chunks().iter().enumerate() {
        println!(
            "  #{} ({}, {}): {} solid blocks",
            index,
            chunk.x(),
            chunk.z(),
            chunk.count(|block| !block.is_air())
        );
    }
    let mismatches = world.directory_mismatches();
    if !mismatches.is_empty() {
        println!("  {} directory entries disagree with chunk order", mismatches.len());
    }
    Ok(())
}

fn scan_command(path: &str, config: &Config) -> Result<(), EditorError> {
    let world = read_world(path)?;
    let mut pool = WorkerPool::new(config.worker_count)?;
    let results = pollster::block_on(pool.scan_world(&world, &config.scan_block_types))?;
    pool.shutdown();

    for result in &results {
        println!(
            "({}, {}): {} visible faces",
            result.position.x,
            result.position.y,
            result.total_faces()
        );
        for scan in &result.scans {
            let name = BlockType::from_type_id(scan.block_type_id)
                .map(BlockType::name)
                .unwrap_or("unknown");
            println!("  {:>4} {:<14} {}", scan.block_type_id, name, scan.face_count);
        }
    }
    Ok(())
}

fn generate_command(path: &str, radius: i32, seed: u32, config: &Config) -> Result<(), EditorError> {
    let mut world = World::with_layout(config.layout);
    for z in -radius..=radius {
        for x in -radius..=radius {
            world.push_chunk(Chunk::perlin(x, z, seed));
        }
    }
    write_world(path, &world)
}

fn fill_command(args: &[String]) -> Result<(), EditorError> {
    let [input, output, x1, y1, z1, x2, y2, z2, value] = args else {
        return Err(usage());
    };
    let mut world = read_world(input)?;
    let from = Point3::new(parse(x1, "x1")?, parse(y1, "y1")?, parse(z1, "z1")?);
    let to = Point3::new(parse(x2, "x2")?, parse(y2, "y2")?, parse(z2, "z2")?);
    let written = world.fill_blocks(from, to, parse_block(value)?)?;
    println!("Filled {} blocks", written);
    write_world(output, &world)
}

fn run(args: &[String]) -> Result<(), EditorError> {
    let path = config_path();
    let (config, created) = load_or_create_config(&path)?;
    init_logger(&config.log_level);
    if created {
        info!("Wrote default config to {}", path.display());
    }

    match args {
        [command, path] if command == "info" => info_command(path),
        [command, path] if command == "scan" => scan_command(path, &config),
        [command, path, radius] if command == "generate" => {
            generate_command(path, parse(radius, "radius")?, 0, &config)
        }
        [command, path, radius, seed] if command == "generate" => {
            generate_command(path, parse(radius, "radius")?, parse(seed, "seed")?, &config)
        }
        [command, rest @ ..] if command == "fill" => fill_command(rest),
        _ => Err(usage()),
    }
}

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    if let Err(e) = run(&args) {
        match e {
            EditorError::Usage(msg) => eprintln!("{}", msg),
            e => {
                error!("{}", e);
                eprintln!("editsc: {}", e);
            }
        }
        std::process::exit(1);
    }
}

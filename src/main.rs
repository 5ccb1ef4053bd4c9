use std::{env, fs, path::PathBuf, process};

use anyhow::Context;
use pmx2scene::{FileTextureLoader, ImportOptions, Model, import_model};

const USAGE: &str = "Usage: pmx2scene <model.json> <scene.json> [--no-mesh] [--physics] [--scale <f32>]";

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run() {
        eprintln!("{err:#}");
        process::exit(1);
    }
}

fn usage_error(message: &str) -> ! {
    eprintln!("{message}");
    eprintln!("{USAGE}");
    process::exit(2);
}

fn parse_args(args: &[String]) -> (PathBuf, PathBuf, ImportOptions) {
    let mut positional = Vec::new();
    let mut options = ImportOptions::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--no-mesh" => options.include_mesh = false,
            "--physics" => options.include_physics = true,
            "--scale" => {
                let Some(value) = iter.next() else {
                    usage_error("--scale needs a value");
                };
                options.scale = match value.parse::<f32>() {
                    Ok(scale) if scale > 0.0 => scale,
                    _ => usage_error(&format!("invalid scale: {value}")),
                };
            }
            flag if flag.starts_with("--") => usage_error(&format!("unknown option: {flag}")),
            _ => positional.push(PathBuf::from(arg)),
        }
    }

    if positional.len() != 2 {
        usage_error("expected an input model and an output scene path");
    }
    let output = positional.pop().unwrap_or_default();
    let input = positional.pop().unwrap_or_default();
    (input, output, options)
}

fn run() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let (input, output, options) = parse_args(&args);

    let text = fs::read_to_string(&input)
        .with_context(|| format!("failed to read model: {}", input.display()))?;
    let model: Model = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse model: {}", input.display()))?;

    let scene = import_model(&model, &input, &options, &mut FileTextureLoader)?;

    let json = serde_json::to_string_pretty(&scene).context("failed to serialize scene")?;
    fs::write(&output, json)
        .with_context(|| format!("failed to write scene: {}", output.display()))?;

    let report = scene.report();
    println!("Model: {}", report.model_name);
    println!("Bones: {}", report.bone_count);
    println!(
        "Mesh: {} vertices, {} faces, {} materials",
        report.vertex_count, report.face_count, report.material_count
    );
    println!(
        "Textures: {} (placeholders: {})",
        report.texture_count, report.placeholder_texture_count
    );
    println!(
        "Physics: {} rigid bodies, {} joints",
        report.rigid_body_count, report.joint_count
    );
    println!("Warnings: {}", report.warnings.len());
    for warning in &report.warnings {
        println!("  [{}] {}", warning.kind.code(), warning.message);
    }

    Ok(())
}

use clap::Parser;
use ndarray::Array4;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sine_modes_core::{Hectopascals, ModeProjector, ProjectorConfig, VerticalBasis};
use std::f32::consts::PI;
use tracing_subscriber::EnvFilter;

/// Sine-mode projection demo on a synthetic vertical-velocity field
#[derive(Parser, Debug)]
#[command(name = "sine-modes-demo")]
#[command(about = "Project a synthetic omega field onto baroclinic sine modes", long_about = None)]
struct Args {
    /// Level preset (standard = 13 mandatory levels, coarse = 8 levels)
    #[arg(short = 'l', long, default_value = "standard")]
    levels: String,

    /// Number of time steps
    #[arg(long, default_value_t = 4)]
    ntime: usize,

    /// Number of latitude rows
    #[arg(long, default_value_t = 32)]
    nlat: usize,

    /// Number of longitude columns
    #[arg(long, default_value_t = 64)]
    nlon: usize,

    /// Peak mode 1 amplitude in Pa/s
    #[arg(long, default_value_t = 0.3)]
    mode1: f32,

    /// Peak mode 2 amplitude in Pa/s
    #[arg(long, default_value_t = 0.1)]
    mode2: f32,

    /// Uniform noise amplitude in Pa/s
    #[arg(short, long, default_value_t = 0.02)]
    noise: f32,

    /// Random seed for the noise
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Order levels top-down (increasing pressure) instead of bottom-up
    #[arg(short, long)]
    reverse: bool,

    /// Reduce on a single thread
    #[arg(long)]
    serial: bool,
}

/// Min, max and mean over the finite values of an array
fn finite_stats<'a>(values: impl Iterator<Item = &'a f32>) -> Option<(f32, f32, f32)> {
    let mut count = 0_usize;
    let (mut min, mut max, mut sum) = (f32::INFINITY, f32::NEG_INFINITY, 0.0_f64);
    for &v in values.filter(|v| v.is_finite()) {
        min = min.min(v);
        max = max.max(v);
        sum += f64::from(v);
        count += 1;
    }
    (count > 0).then(|| (min, max, (sum / count as f64) as f32))
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    println!("=== Sine-Mode Projection Demo ===\n");

    let mut levels: Vec<f32> = match args.levels.to_lowercase().as_str() {
        "coarse" => vec![1000.0, 850.0, 700.0, 500.0, 300.0, 200.0, 100.0, 50.0],
        "standard" => vec![
            1000.0, 925.0, 850.0, 700.0, 600.0, 500.0, 400.0, 300.0, 250.0, 200.0, 150.0, 100.0,
            50.0,
        ],
        other => {
            println!("Unknown level preset '{}', using standard", other);
            vec![
                1000.0, 925.0, 850.0, 700.0, 600.0, 500.0, 400.0, 300.0, 250.0, 200.0, 150.0,
                100.0, 50.0,
            ]
        }
    };
    if args.reverse {
        levels.reverse();
    }

    let typed: Vec<Hectopascals> = levels.iter().copied().map(Hectopascals::new).collect();
    let basis = match VerticalBasis::from_hectopascals(&typed) {
        Ok(basis) => basis,
        Err(e) => {
            eprintln!("Failed to build basis: {e}");
            std::process::exit(1);
        }
    };
    let (top, bottom) = (typed.iter().min(), typed.iter().max());
    println!(
        "Levels: {} ({} to {}), |y1|² = {:.1}, |y2|² = {:.1}",
        basis.n_levels(),
        top.copied().unwrap_or_default(),
        bottom.copied().unwrap_or_default(),
        basis.y1_norm2(),
        basis.y2_norm2()
    );

    // Mode 1 amplitude follows a zonal wave, mode 2 a meridional one
    let mut rng = StdRng::seed_from_u64(args.seed);
    let (y1, y2) = (basis.y1(), basis.y2());
    let shape = (args.ntime, basis.n_levels(), args.nlat, args.nlon);
    let field = Array4::from_shape_fn(shape, |(t, k, j, i)| {
        let phase = 2.0 * PI * (i as f32 / args.nlon.max(1) as f32 + t as f32 * 0.1);
        let lat = PI * (j as f32 + 0.5) / args.nlat.max(1) as f32;
        let signal = args.mode1 * phase.cos() * y1[k] + args.mode2 * lat.cos() * y2[k];
        signal + args.noise * rng.random_range(-1.0_f32..=1.0)
    });
    println!(
        "Field: {} time x {} levels x {} lat x {} lon\n",
        args.ntime,
        basis.n_levels(),
        args.nlat,
        args.nlon
    );

    let config = if args.serial {
        ProjectorConfig::serial()
    } else {
        ProjectorConfig::default()
    };
    let result = match ModeProjector::new(config).project_with_basis(&basis, &field, 1) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Projection failed: {e}");
            std::process::exit(1);
        }
    };

    println!("{:<8} {:>10} {:>10} {:>10}", "output", "min", "max", "mean");
    let unexplained = result.unexplained_fraction();
    let outputs = [
        ("a", &result.a),
        ("b", &result.b),
        ("var_a", &result.var_a),
        ("var_b", &result.var_b),
        ("rest", &unexplained),
    ];
    for (name, values) in outputs {
        match finite_stats(values.iter()) {
            Some((min, max, mean)) => {
                println!("{:<8} {:>10.4} {:>10.4} {:>10.4}", name, min, max, mean);
            }
            None => println!("{:<8} {:>10} {:>10} {:>10}", name, "NaN", "NaN", "NaN"),
        }
    }

    let nan_points = result.var_a.iter().filter(|v| v.is_nan()).count();
    if nan_points > 0 {
        println!("\n{} grid point(s) with undefined variance fraction", nan_points);
    }
}

// Print the sine-mode basis for a level set stored in Pa
use sine_modes_core::{Pascals, VerticalBasis};

fn main() {
    let levels: Vec<Pascals> = [
        100_000.0, 85_000.0, 70_000.0, 50_000.0, 30_000.0, 20_000.0, 10_000.0, 5_000.0,
    ]
    .into_iter()
    .map(Pascals::new)
    .collect();

    let basis = match VerticalBasis::from_pascals(&levels) {
        Ok(basis) => basis,
        Err(e) => {
            eprintln!("{e}");
            return;
        }
    };

    println!("{:>12} {:>8} {:>9} {:>9} {:>9}", "level", "x", "y1", "y2", "dp");
    for (k, level) in levels.iter().enumerate() {
        println!(
            "{:>12} {:>8.4} {:>9.4} {:>9.4} {:>9.1}",
            level.to_hectopascals().to_string(),
            basis.x()[k],
            basis.y1()[k],
            basis.y2()[k],
            basis.delta_p()[k]
        );
    }
    println!(
        "\n|y1|² = {:.2}, |y2|² = {:.2}, monotonic: {}",
        basis.y1_norm2(),
        basis.y2_norm2(),
        basis.is_monotonic()
    );
}

use std::collections::hash_map::DefaultHasher;
use std::hash::Hash;
use std::hash::Hasher;

use clap::Parser;
use unified_set::FunctionPair;
use unified_set::UnifiedSet;

#[derive(Parser, Debug)]
struct Args {
    #[arg(short = 'c', long = "target_capacity", default_value_t = 1000)]
    target_capacity: usize,

    #[arg(short = 'l', long = "load_factor", default_value_t = 0.75)]
    load_factor: f32,

    /// Keep only this many low bits of each hash, forcing collisions.
    #[arg(short = 'b', long = "hash_bits", default_value_t = 64)]
    hash_bits: u32,

    #[arg(short = 's', long = "batch_size", default_value_t = 64)]
    batch_size: usize,
}

fn hash_u64(value: u64) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let mask = match args.hash_bits {
        0 => 0,
        bits if bits >= 64 => u64::MAX,
        bits => (1u64 << bits) - 1,
    };
    let strategy = FunctionPair::new(move |v: &u64| hash_u64(*v) & mask, |a: &u64, b: &u64| a == b);

    println!(
        "Creating set with target capacity {} and load factor {}",
        args.target_capacity, args.load_factor
    );
    let mut set = match UnifiedSet::with_capacity_load_factor_and_strategy(
        args.target_capacity,
        args.load_factor,
        strategy,
    ) {
        Ok(set) => set,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(2);
        }
    };

    println!(
        "Slot count: {}, threshold: {}",
        set.slot_count(),
        set.threshold()
    );
    println!("Filling set to its threshold with u64 values...");

    let target = set.threshold();
    for value in 0..target as u64 {
        set.add(value);
    }

    println!("Inserted {} values", set.len());
    println!(
        "Final fill: {:.2}% of slots",
        (set.len() as f64 / set.slot_count() as f64) * 100.0
    );

    set.table().chain_histogram().print();
    set.table().debug_stats().print();

    let sections = set.batch_count(args.batch_size);
    let mut sizes = Vec::with_capacity(sections);
    for index in 0..sections {
        let mut visited = 0usize;
        if let Err(err) = set.batch_for_each(index, sections, |_| visited += 1) {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
        sizes.push(visited);
    }

    let smallest = sizes.iter().copied().min().unwrap_or(0);
    let largest = sizes.iter().copied().max().unwrap_or(0);
    println!(
        "{} batch sections of ~{} slots: smallest {} elements, largest {} elements",
        sections, args.batch_size, smallest, largest
    );
}

//! Fill both kinds of filter with animal names, print their statistics, and
//! save and reload them.
//!
//! Run with `RUST_LOG=debug` to see the filters grow, save and load.
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};

use scalebloom::{BloomFilter, Filter, GrowthRate, ScalableBloomFilter};
use tracing_subscriber::EnvFilter;

const ANIMALS: &[&str] = &[
    "dog", "cat", "giraffe", "fly", "mosquito", "horse", "eagle", "bird", "bison", "boar",
    "butterfly", "ant", "anaconda", "bear", "chicken", "dolphin", "donkey", "crow", "crocodile",
];

const OTHER_ANIMALS: &[&str] = &[
    "badger", "cow", "pig", "sheep", "bee", "wolf", "fox", "whale", "shark", "fish", "turkey",
    "duck", "dove", "deer", "elephant", "frog", "falcon", "goat", "gorilla", "hawk",
];

fn report<F: Filter>(filter: &F) {
    for animal in ANIMALS.iter().chain(OTHER_ANIMALS) {
        if filter.contains(animal) {
            if OTHER_ANIMALS.contains(animal) {
                println!("\"{animal}\" is a FALSE POSITIVE case (please adjust fp_rate to a smaller value).");
            } else {
                println!("\"{animal}\" is PROBABLY IN the filter.");
            }
        } else {
            println!("\"{animal}\" is DEFINITELY NOT in the filter as expected.");
        }
    }
}

fn round_trip<F: Filter>(filter: &F, name: &str) -> scalebloom::Result<F> {
    let path = std::env::temp_dir().join(name);
    {
        let mut writer = BufWriter::new(File::create(&path)?);
        filter.save(&mut writer)?;
        writer.flush()?;
    }
    let mut reader = BufReader::new(File::open(&path)?);
    let restored = F::load(&mut reader)?;
    println!("+ Saved to and reloaded from {}", path.display());

    Ok(restored)
}

fn bloom_filter_example() -> scalebloom::Result<()> {
    println!("========== Bloom Filter Example ==========");
    let mut filter = BloomFilter::with_rate(1000, 1e-6);

    for animal in ANIMALS {
        filter.add(animal);
    }
    println!("+ Capacity: {} item(s)", filter.capacity());
    println!("+ Number of inserted items: {}", filter.len());
    println!("+ Filter size: {} bit(s)", filter.bits());
    println!("+ False Positive probability: {}", filter.fp_rate());
    println!("+ Number of hash functions: {}", filter.hashes());
    println!();

    report(&filter);

    let restored = round_trip(&filter, "bloom_filter.bin")?;
    assert_eq!(restored, filter);
    println!();

    Ok(())
}

fn scalable_bloom_filter_example() -> scalebloom::Result<()> {
    println!("========== Scalable Bloom Filter Example ==========");
    let mut filter = ScalableBloomFilter::builder(10, 1e-7)
        .growth_rate(GrowthRate::Large)
        .fp_decay_rate(0.9)
        .build();

    for animal in ANIMALS {
        filter.add(animal);
    }
    println!("+ Capacity: {} item(s)", filter.capacity());
    println!("+ Number of inserted items: {}", filter.len());
    println!("+ Number of Bloom filters: {}", filter.num_filters());
    println!("+ Total size of filters: {} bit(s)", filter.bits());
    println!("+ False Positive probability: {}", filter.fp_rate());
    println!();

    report(&filter);

    let restored = round_trip(&filter, "scalable_bloom_filter.bin")?;
    assert_eq!(restored, filter);

    Ok(())
}

fn main() -> scalebloom::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    bloom_filter_example()?;
    scalable_bloom_filter_example()
}

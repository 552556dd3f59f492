use piano_pir::{DEFAULT_FAILURE_PROB_LOG2, PianoPIRConfig, pir::PianoPIR};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use std::time::Duration;

fn main() {
    divan::main();
}

fn generate_random_database(rng: &mut ChaCha8Rng, num_records: usize, max_entry_words: usize) -> Vec<Vec<u64>> {
    (0..num_records)
        .map(|_| {
            let num_words = rng.random_range(1..=max_entry_words);
            (0..num_words).map(|_| rng.random::<u64>()).collect()
        })
        .collect()
}

#[derive(Debug)]
struct DBConfig {
    num_records: usize,
    max_entry_words: usize,
}

const ARGS: &[DBConfig] = &[
    DBConfig {
        num_records: 1usize << 14,
        max_entry_words: 4,
    },
    DBConfig {
        num_records: 1usize << 16,
        max_entry_words: 16,
    },
];

#[divan::bench(args = ARGS, max_time = Duration::from_secs(300), skip_ext_time = true)]
fn facade_query(bencher: divan::Bencher, db_config: &DBConfig) {
    let mut rng = ChaCha8Rng::from_os_rng();

    let raw_db = generate_random_database(&mut rng, db_config.num_records, db_config.max_entry_words);
    let config = PianoPIRConfig::new(db_config.num_records, db_config.max_entry_words, 8 * db_config.max_entry_words, 4, DEFAULT_FAILURE_PROB_LOG2).unwrap();

    let mut pir = PianoPIR::new(config, raw_db).unwrap();
    pir.preprocessing().unwrap();

    // Stride through distinct indices; a re-preprocessing epoch change is part of the
    // amortized cost once the budget runs out.
    let mut idx = 0usize;
    bencher.bench_local(|| {
        idx = (idx + 631) % db_config.num_records;
        match pir.query(idx) {
            Ok(record) => Some(record),
            Err(piano_pir::PianoPIRError::NoCoveringHint) => None,
            Err(e) => panic!("query failed: {}", e),
        }
    });
}

#[divan::bench(args = ARGS, max_time = Duration::from_secs(300), skip_ext_time = true)]
fn facade_dummy_query(bencher: divan::Bencher, db_config: &DBConfig) {
    let mut rng = ChaCha8Rng::from_os_rng();

    let raw_db = generate_random_database(&mut rng, db_config.num_records, db_config.max_entry_words);
    let config = PianoPIRConfig::new(db_config.num_records, db_config.max_entry_words, 8 * db_config.max_entry_words, 4, DEFAULT_FAILURE_PROB_LOG2).unwrap();

    let mut pir = PianoPIR::new(config, raw_db).unwrap();
    pir.preprocessing().unwrap();

    bencher.bench_local(|| pir.dummy_query().unwrap());
}

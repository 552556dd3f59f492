#![cfg(test)]

use crate::{DEFAULT_FAILURE_PROB_LOG2, PianoPIRConfig, PianoPIRError, client::Client, pir::PianoPIR, server::Server};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// Generates a deterministic database of ragged records: record `i` holds between 1 and
/// `max_entry_words` non-zero words derived from its index.
fn generate_ragged_database(num_records: usize, max_entry_words: usize) -> Vec<Vec<u64>> {
    (0..num_records)
        .map(|i| {
            let num_words = 1 + i % max_entry_words;
            (0..num_words).map(|w| ((i as u64) << 16) | (w as u64) | 1).collect()
        })
        .collect()
}

/// Wires a client and server the way the facade does: the client preprocesses a deep copy of the
/// raw database and the server serves the padded result.
fn preprocessed_pair(config: &PianoPIRConfig, raw_db: &[Vec<u64>], seed: u64) -> (Client, Server) {
    let mut client = Client::with_rng(config.clone(), ChaCha8Rng::seed_from_u64(seed));

    let mut padded_db = raw_db.to_vec();
    client.preprocessing(&mut padded_db).expect("Preprocessing must succeed");

    let server = Server::new(config.clone(), padded_db).expect("Padded database must fit the configuration");
    (client, server)
}

/// Distinct in-range indices spread evenly across chunks, so no chunk saturates prematurely.
fn spread_indices(config: &PianoPIRConfig, count: usize) -> Vec<usize> {
    let live_chunks = config.db_size().div_ceil(config.chunk_size());
    (0..count).map(|i| (i % live_chunks) * config.chunk_size() + i / live_chunks).filter(|&idx| idx < config.db_size()).collect()
}

#[test]
fn every_query_decodes_to_the_plain_record() {
    const NUM_RECORDS: usize = 1024;
    const MAX_ENTRY_WORDS: usize = 4;

    let config = PianoPIRConfig::new(NUM_RECORDS, MAX_ENTRY_WORDS, 8 * MAX_ENTRY_WORDS, 4, DEFAULT_FAILURE_PROB_LOG2).unwrap();
    let raw_db = generate_ragged_database(NUM_RECORDS, MAX_ENTRY_WORDS);
    let (mut client, server) = preprocessed_pair(&config, &raw_db, 13);

    for idx in spread_indices(&config, client.max_query_num()) {
        let received = client.query(idx, &server).expect("Query within budget must succeed");
        let expected = server.fetch_plain(idx).expect("Plain fetch must succeed");

        assert_eq!(received, expected, "idx = {}", idx);
    }
}

#[test]
fn sixteen_record_scenario_with_cache_short_circuit() {
    const NUM_RECORDS: usize = 16;

    let config = PianoPIRConfig::new(NUM_RECORDS, 1, 8, 1, DEFAULT_FAILURE_PROB_LOG2).unwrap();
    assert_eq!(config.chunk_size(), 8);
    assert_eq!(config.set_size(), 4);
    assert_eq!(config.padded_db_size(), 32);

    let raw_db: Vec<Vec<u64>> = (0..NUM_RECORDS as u64).map(|i| vec![i.wrapping_mul(0x9e3779b97f4a7c15) | 1]).collect();
    let (mut client, server) = preprocessed_pair(&config, &raw_db, 21);

    let first = client.query(5, &server).expect("First query must succeed");
    assert_eq!(first[0], raw_db[5][0]);
    assert_eq!(server.private_fetch_count(), 1);
    assert_eq!(client.finished_query_num(), 1);

    // Same index again: served from the epoch-local cache, zero additional server calls.
    let second = client.query(5, &server).expect("Cached query must succeed");
    assert_eq!(second, first);
    assert_eq!(server.private_fetch_count(), 1);
    assert_eq!(client.finished_query_num(), 1);
}

#[test]
fn query_budget_is_enforced_after_exactly_max_query_num_queries() {
    const NUM_RECORDS: usize = 16;

    let config = PianoPIRConfig::new(NUM_RECORDS, 1, 8, 1, DEFAULT_FAILURE_PROB_LOG2).unwrap();
    let raw_db = generate_ragged_database(NUM_RECORDS, 1);
    let (mut client, server) = preprocessed_pair(&config, &raw_db, 34);

    let candidates = spread_indices(&config, NUM_RECORDS);
    assert!(candidates.len() > client.max_query_num());

    let mut num_successes = 0;
    let mut terminal_error = None;
    for &idx in candidates.iter() {
        match client.query(idx, &server) {
            Ok(_) => num_successes += 1,
            Err(e) => {
                terminal_error = Some(e);
                break;
            }
        }
    }

    assert_eq!(num_successes, client.max_query_num());
    assert_eq!(terminal_error, Some(PianoPIRError::QueryBudgetExhausted));
}

#[test]
fn facade_repreprocesses_instead_of_failing_on_exhaustion() {
    const NUM_RECORDS: usize = 16;

    let config = PianoPIRConfig::new(NUM_RECORDS, 1, 8, 1, DEFAULT_FAILURE_PROB_LOG2).unwrap();
    let raw_db = generate_ragged_database(NUM_RECORDS, 1);
    let mut pir = PianoPIR::with_rng(config.clone(), raw_db.clone(), ChaCha8Rng::seed_from_u64(55)).unwrap();

    // One more query than the per-epoch budget; the facade must absorb the epoch change.
    let num_queries = config.max_query_num() + 1;
    for &idx in spread_indices(&config, NUM_RECORDS).iter().take(num_queries) {
        let received = pir.query(idx).expect("Facade query must succeed across epochs");
        assert_eq!(received[0], raw_db[idx][0]);
    }
}

#[test]
fn chunk_saturation_surfaces_to_the_caller() {
    const NUM_RECORDS: usize = 1024;

    let config = PianoPIRConfig::new(NUM_RECORDS, 1, 8, 1, DEFAULT_FAILURE_PROB_LOG2).unwrap();
    assert!(config.max_query_per_chunk() < config.chunk_size());

    let raw_db = generate_ragged_database(NUM_RECORDS, 1);
    let (mut client, server) = preprocessed_pair(&config, &raw_db, 89);

    // Hammer chunk 0 with distinct indices until its allotment runs out.
    let mut num_successes = 0;
    let mut terminal_error = None;
    for idx in 0..config.chunk_size() {
        match client.query(idx, &server) {
            Ok(_) => num_successes += 1,
            Err(e) => {
                terminal_error = Some(e);
                break;
            }
        }
    }

    assert_eq!(num_successes, client.max_query_per_chunk());
    assert_eq!(terminal_error, Some(PianoPIRError::ChunkQueryBudgetExhausted(0)));
}

#[test]
fn dummy_queries_touch_no_client_state() {
    const NUM_RECORDS: usize = 64;

    let config = PianoPIRConfig::new(NUM_RECORDS, 2, 16, 1, DEFAULT_FAILURE_PROB_LOG2).unwrap();
    let raw_db = generate_ragged_database(NUM_RECORDS, 2);
    let (mut client, server) = preprocessed_pair(&config, &raw_db, 3);

    for _ in 0..5 {
        client.dummy_query(&server).expect("Dummy query must succeed");
    }

    assert_eq!(server.private_fetch_count(), 5);
    assert_eq!(client.finished_query_num(), 0);
    assert!(!client.is_exhausted());
}

#[test]
fn out_of_range_and_unpreprocessed_queries_are_rejected() {
    const NUM_RECORDS: usize = 64;

    let config = PianoPIRConfig::new(NUM_RECORDS, 1, 8, 1, DEFAULT_FAILURE_PROB_LOG2).unwrap();
    let raw_db = generate_ragged_database(NUM_RECORDS, 1);

    let mut fresh_client = Client::with_rng(config.clone(), ChaCha8Rng::seed_from_u64(7));
    let server = Server::new(config.clone(), raw_db.clone()).unwrap();
    assert_eq!(fresh_client.query(0, &server), Err(PianoPIRError::PreprocessingRequired));

    let (mut client, server) = preprocessed_pair(&config, &raw_db, 8);
    assert_eq!(client.query(NUM_RECORDS, &server), Err(PianoPIRError::IndexOutOfRange(NUM_RECORDS)));
}

#[test]
fn databases_shorter_than_the_configured_size_are_rejected_up_front() {
    const NUM_RECORDS: usize = 16;

    let config = PianoPIRConfig::new(NUM_RECORDS, 1, 8, 1, DEFAULT_FAILURE_PROB_LOG2).unwrap();
    let short_db = generate_ragged_database(10, 1);

    // The facade must refuse the pairing outright; a server built over the short database could
    // otherwise be driven into the gap below `db_size` by any private fetch, dummy ones included.
    assert!(matches!(PianoPIR::new(config.clone(), short_db.clone()), Err(PianoPIRError::DatabaseShorterThanConfigured)));

    let mut client = Client::with_rng(config, ChaCha8Rng::seed_from_u64(17));
    let mut db = short_db;
    assert_eq!(client.preprocessing(&mut db), Err(PianoPIRError::DatabaseShorterThanConfigured));
}

#[test]
fn hint_misses_surface_as_no_covering_hint_without_consuming_budget() {
    const NUM_RECORDS: usize = 64;

    // A deliberately tight failure bound (2^-0) provisions only `chunk_size` primary hints, which
    // leaves roughly a third of all offsets uncovered; a sweep of the database is then all but
    // guaranteed to observe misses. The seed keeps the outcome reproducible.
    let config = PianoPIRConfig::new(NUM_RECORDS, 1, 8, 1, 0).unwrap();
    let raw_db = generate_ragged_database(NUM_RECORDS, 1);
    let (mut client, server) = preprocessed_pair(&config, &raw_db, 99);

    let mut num_misses = 0;
    let mut num_successes = 0;
    for &idx in spread_indices(&config, NUM_RECORDS).iter() {
        if client.is_exhausted() {
            break;
        }

        match client.query(idx, &server) {
            Ok(record) => {
                assert_eq!(record, server.fetch_plain(idx).unwrap());
                num_successes += 1;
            }
            Err(PianoPIRError::NoCoveringHint) => num_misses += 1,
            Err(e) => panic!("unexpected query error: {}", e),
        }
    }

    // A miss is an expected, droppable event: it consumes no budget and poisons no later query.
    assert!(num_misses > 0);
    assert_eq!(client.finished_query_num(), num_successes);
    assert!(num_successes > 0);
}

#[test]
fn facade_reports_costs_as_pure_functions_of_the_configuration() {
    const NUM_RECORDS: usize = 256;
    const MAX_ENTRY_WORDS: usize = 3;

    let config = PianoPIRConfig::new(NUM_RECORDS, MAX_ENTRY_WORDS, 8 * MAX_ENTRY_WORDS, 4, DEFAULT_FAILURE_PROB_LOG2).unwrap();
    let raw_db = generate_ragged_database(NUM_RECORDS, MAX_ENTRY_WORDS);
    let pir = PianoPIR::new(config.clone(), raw_db).unwrap();

    assert_eq!(pir.comm_cost_per_query_bytes(), config.set_size() * 4 + config.max_entry_words() * 8);
    assert!(pir.local_storage_bytes() > 0);
}

//! Integration tests for the raffle engine.
//!
//! Full runs over ledger-shaped JSON fixtures: extraction, filtering, drawing
//! and rendering, with replayed or seeded winning numbers.
//!
//! Run:
//! ```bash
//! cargo test -p raffle-integration-tests
//! ```

use std::cell::Cell;
use std::collections::HashMap;

use raffle_common::merkle::{compute_leaf_hash, verify_merkle_proof, MerkleTree};
use raffle_engine::audit;
use raffle_engine::convert::Conversion;
use raffle_engine::execute::{seed_commitment, seeded_rng, ReplaySource, RngSource};
use raffle_engine::query::render;
use raffle_engine::raffle::prepare;
use raffle_engine::snapshot::{ledger_extractor, RemoteDelegator, RemoteStakeExtractor};
use raffle_engine::{run_raffle, DrawError, RaffleConfig, RaffleError, RaffleReport, Selector};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

// ─── Constants ───

const POOL: &str = "pool_abc";
const POLICY: &str = "policy_xyz";
const ADA: u64 = 1_000_000;

// ─── Fixtures ───

fn stake_pair(credential: &str, value: Value) -> Value {
    json!([{ "key hash": credential }, value])
}

/// Pool with two regular delegators, a dust delegator, an owner and a reward account.
fn delegator_ledger() -> Value {
    json!({
        "lastEpoch": 412,
        "stakeDistrib": {
            POOL: { "individualPoolStake": { "numerator": 1_500_500_000u64, "denominator": 1 } }
        },
        "stateBefore": {
            "esLState": {
                "delegationState": {
                    "pstate": {
                        "pParams pState": {
                            POOL: {
                                "owners": ["owner"],
                                "rewardAccount": { "credential": { "key hash": "reward" } }
                            }
                        }
                    }
                }
            },
            "esSnapshots": {
                "pstakeSet": {
                    "delegations": [
                        stake_pair("d1", json!(POOL)),
                        stake_pair("owner", json!(POOL)),
                        stake_pair("elsewhere", json!("pool_other")),
                        stake_pair("d2", json!(POOL)),
                        stake_pair("dust", json!(POOL)),
                        stake_pair("reward", json!(POOL))
                    ],
                    "stake": [
                        stake_pair("d1", json!(100 * ADA)),
                        stake_pair("d2", json!(200 * ADA)),
                        stake_pair("dust", json!(500_000u64)),
                        stake_pair("owner", json!(1_000 * ADA)),
                        stake_pair("reward", json!(200 * ADA)),
                        stake_pair("elsewhere", json!(77 * ADA))
                    ]
                }
            }
        }
    })
}

fn utxo(address: &str, assets: Value) -> Value {
    json!({
        "address": address,
        "amount": { "coin": 1_500_000, "policies": { POLICY: assets } }
    })
}

fn token_ledger() -> Value {
    json!({
        "stateBefore": {
            "esLState": {
                "utxoState": {
                    "utxo": {
                        "aa#0": utxo("addr_a", json!({ "t1": 60, "t2": 40 })),
                        "bb#0": utxo("addr_b", json!({ "t1": 200 })),
                        "cc#0": { "address": "addr_ada_only", "amount": 3_000_000 },
                        "dd#1": utxo("addr_c", json!({ "t1": 700 })),
                        "ee#0": {
                            "address": "addr_other",
                            "amount": { "coin": 1_000_000, "policies": { "policy_other": { "x": 5 } } }
                        }
                    }
                }
            }
        }
    })
}

fn pool_config() -> RaffleConfig {
    RaffleConfig::new(Selector::Pool(POOL.to_string()))
}

fn token_config() -> RaffleConfig {
    RaffleConfig::new(Selector::Policy(POLICY.to_string()))
}

fn run_replay(ledger: &Value, config: &RaffleConfig, numbers: &[u64]) -> Result<RaffleReport, RaffleError> {
    let extractor = ledger_extractor(ledger, &config.selector);
    let mut source = ReplaySource::new(numbers.iter().copied());
    run_raffle(config, extractor.as_ref(), &mut source, None)
}

fn winners(report: &RaffleReport) -> Vec<&str> {
    report
        .winners
        .iter()
        .map(|w| w.outcome.participant.as_str())
        .collect()
}

// ─── Delegator giveaways ───

#[test]
fn test_delegator_raffle_excludes_pool_principals() {
    let mut config = pool_config();
    config.min_balance = 1;

    let ledger = delegator_ledger();
    let report = run_replay(&ledger, &config, &[150_000_000]).unwrap();

    assert_eq!(report.epoch, Some(412));
    assert_eq!(report.recorded_total, Some(1_500_500_000));
    assert_eq!(report.observed_total, 1_500_500_000);
    assert_eq!(report.eligible_participants, 2);
    assert_eq!(report.excluded_participants, 3);
    assert_eq!(report.eligible_raw_total, 300 * ADA as u128);
    assert_eq!(
        report.eligible_raw_total + report.excluded_raw_total,
        report.observed_total
    );
    assert_eq!(winners(&report), vec!["d2"]);
}

#[test]
fn test_delegator_report_text() {
    let mut config = pool_config();
    config.min_balance = 1;

    let report = run_replay(&delegator_ledger(), &config, &[150_000_000]).unwrap();
    let text = render(&report);

    assert!(text.contains("Current Epoch: 412"));
    assert!(text.contains("Total pool stake on record (ADA): 1500.500000"));
    assert!(text.contains("Total eligible stake (ADA): 300.000000"));
    assert!(text.contains("Prize #1 Winning number: 150000000"));
    assert!(text.contains("Congrats to d2 (200 out of 300 tickets, 66.67% chance)!"));
    assert!(!text.contains("A number of problems occurred"));
    assert!(text.ends_with("best of luck next time to everyone else!"));
}

#[test]
fn test_caller_exclusions_add_to_principals() {
    let mut config = pool_config();
    config.exclude = vec!["d2".to_string()];

    let report = run_replay(&delegator_ledger(), &config, &[1]).unwrap();
    assert_eq!(report.eligible_participants, 2);
    assert_eq!(winners(&report), vec!["d1"]);
}

#[test]
fn test_unknown_pool_is_fatal() {
    let config = RaffleConfig::new(Selector::Pool("pool_missing".to_string()));
    let err = run_replay(&delegator_ledger(), &config, &[1]).unwrap_err();
    assert!(matches!(err, RaffleError::MissingField { path } if path.contains("pool_missing")));
}

#[test]
fn test_threshold_removing_everyone_is_empty_pool() {
    let mut config = pool_config();
    config.min_balance = 200;

    let err = run_replay(&delegator_ledger(), &config, &[1]).unwrap_err();
    assert_eq!(err, RaffleError::EmptyPool);
}

// ─── Remote delegator listing ───

#[test]
fn test_remote_listing_draws_on_latest_pool_epoch() {
    let delegators: Vec<RemoteDelegator> = [
        (
            "stake1_a",
            "150000000",
            json!([
                { "active_epoch": 410, "amount": "90000000", "pool_id": POOL },
                { "active_epoch": 412, "amount": "100000000", "pool_id": POOL },
                { "active_epoch": 413, "amount": "5000000", "pool_id": "pool_other" }
            ]),
        ),
        (
            "stake1_b",
            "300000000",
            json!([{ "active_epoch": 412, "amount": "300000000", "pool_id": POOL }]),
        ),
        ("stake1_new", "40000000", json!([])),
    ]
    .into_iter()
    .map(|(address, live, history)| RemoteDelegator {
        delegator: serde_json::from_value(json!({ "address": address, "live_stake": live })).unwrap(),
        history: serde_json::from_value(history).unwrap(),
    })
    .collect();

    let extractor = RemoteStakeExtractor::new(POOL, delegators);
    let mut config = pool_config();
    config.winners = 2;
    config.unique = true;

    let mut source = ReplaySource::new([100_000_001, 1]);
    let report = run_raffle(&config, &extractor, &mut source, None).unwrap();

    assert_eq!(report.epoch, Some(412));
    assert_eq!(report.recorded_total, Some(490_000_000));
    assert_eq!(report.observed_total, 400_000_000);
    assert_eq!(winners(&report), vec!["stake1_b", "stake1_a"]);
}

// ─── Token giveaways ───

#[test]
fn test_token_raffle_merges_outputs_and_ignores_ada_only() {
    let mut config = token_config();
    config.winners = 2;
    config.unique = true;

    let report = run_replay(&token_ledger(), &config, &[150, 50]).unwrap();
    assert_eq!(report.eligible_participants, 3);
    assert_eq!(report.observed_total, 1000);
    assert_eq!(winners(&report), vec!["addr_b", "addr_a"]);
    assert_eq!(report.winners[0].outcome.total_weight, 1000.0);
    assert_eq!(report.winners[1].outcome.total_weight, 800.0);
}

#[test]
fn test_token_threshold_is_exclusive() {
    let mut config = token_config();
    config.min_balance = 100;

    let report = run_replay(&token_ledger(), &config, &[1]).unwrap();
    assert_eq!(report.eligible_participants, 2);
    assert_eq!(report.excluded_raw_total, 100);
    assert_eq!(winners(&report), vec!["addr_b"]);
}

#[test]
fn test_sqrt_weighting() {
    let mut config = token_config();
    config.dampen = true;

    let report = run_replay(&token_ledger(), &config, &[11]).unwrap();
    // sqrt(100) + sqrt(200) + sqrt(700) = 10 + 14.142 + 26.458 = 50.6
    assert!((report.eligible_weight_total - 50.6).abs() < 0.01);
    assert_eq!(winners(&report), vec!["addr_b"]);

    let report = run_replay(&token_ledger(), &config, &[51]).unwrap();
    assert_eq!(winners(&report), vec!["addr_c"]);
    assert!(render(&report).contains("Total eligible tickets: 51"));
}

#[test]
fn test_converter_names_winners_and_warns_once() {
    let calls = Cell::new(0);
    let failing = |_: &str| {
        calls.set(calls.get() + 1);
        Conversion::Unavailable {
            reason: "runbech32.sh not found".to_string(),
        }
    };

    let mut config = token_config();
    config.winners = 3;

    let ledger = token_ledger();
    let extractor = ledger_extractor(&ledger, &config.selector);
    let mut source = ReplaySource::new([1, 1000, 500]);
    let report = run_raffle(&config, extractor.as_ref(), &mut source, Some(&failing)).unwrap();

    assert_eq!(calls.get(), 1);
    assert!(report.converter_failed);
    assert_eq!(report.winners[1].display, "addr_c");
    assert!(render(&report).contains("bech32"));

    let converting = |raw: &str| Conversion::Converted(raw.replace("addr_", "addr1q"));
    let mut source = ReplaySource::new([1]);
    let report = run_raffle(&config, extractor.as_ref(), &mut source, Some(&converting)).unwrap();
    assert_eq!(report.winners[0].display, "addr1qa");
    assert_eq!(report.winners[0].outcome.participant, "addr_a");
}

// ─── Draw failures ───

#[test]
fn test_failed_draws_are_reported_and_run_continues() {
    let mut config = token_config();
    config.winners = 3;

    let report = run_replay(&token_ledger(), &config, &[5000, 1000]).unwrap();
    assert_eq!(winners(&report), vec!["addr_c"]);
    assert_eq!(report.failures.len(), 2);
    assert_eq!(report.failures[0].prize, 1);
    assert!(matches!(
        report.failures[0].error,
        DrawError::OutOfRange { winning_number: 5000, upper: 1000 }
    ));
    assert_eq!(report.failures[1].error, DrawError::SourceExhausted);

    let text = render(&report);
    assert!(text.contains("A number of problems occurred: 2"));
}

#[test]
fn test_unique_with_too_few_participants() {
    let mut config = token_config();
    config.winners = 4;
    config.unique = true;

    let err = run_replay(&token_ledger(), &config, &[1, 2, 3, 4]).unwrap_err();
    assert!(matches!(err, RaffleError::TooFewParticipants { eligible: 3, prizes: 4 }));
}

// ─── Seeded draws ───

#[test]
fn test_seeded_draw_is_reproducible() {
    let mut config = token_config();
    config.winners = 5;

    let ledger = token_ledger();
    let extractor = ledger_extractor(&ledger, &config.selector);
    let draw = |seed: &str| {
        let mut source = RngSource::new(seeded_rng(seed));
        run_raffle(&config, extractor.as_ref(), &mut source, None).unwrap()
    };

    let first = draw("epoch-412-giveaway");
    let second = draw("epoch-412-giveaway");
    assert_eq!(first.winners, second.winners);
    for winner in &first.winners {
        assert!(winner.outcome.winning_number >= 1 && winner.outcome.winning_number <= 1000);
    }

    let expected = hex::encode(Sha256::digest(b"epoch-412-giveaway"));
    assert_eq!(seed_commitment("epoch-412-giveaway"), expected);
}

#[test]
fn test_unique_seeded_draw_awards_everyone_once() {
    let mut config = token_config();
    config.winners = 3;
    config.unique = true;

    let ledger = token_ledger();
    let extractor = ledger_extractor(&ledger, &config.selector);
    let mut source = RngSource::new(seeded_rng("all-three"));
    let report = run_raffle(&config, extractor.as_ref(), &mut source, None).unwrap();

    let mut got = winners(&report);
    got.sort();
    assert_eq!(got, vec!["addr_a", "addr_b", "addr_c"]);
    assert!(report.failures.is_empty());
}

#[test]
fn test_win_frequency_tracks_weight() {
    let mut config = token_config();
    config.winners = 20_000;

    let ledger = token_ledger();
    let extractor = ledger_extractor(&ledger, &config.selector);
    let mut source = RngSource::new(seeded_rng("frequency"));
    let report = run_raffle(&config, extractor.as_ref(), &mut source, None).unwrap();

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for w in winners(&report) {
        *counts.entry(w).or_default() += 1;
    }
    let share = |p: &str| counts.get(p).copied().unwrap_or(0) as f64 / 20_000.0;
    assert!((share("addr_a") - 0.1).abs() < 0.02);
    assert!((share("addr_b") - 0.2).abs() < 0.02);
    assert!((share("addr_c") - 0.7).abs() < 0.02);
}

// ─── Eligibility commitment ───

#[test]
fn test_eligibility_root_and_proofs() {
    let config = token_config();
    let ledger = token_ledger();
    let report = run_replay(&ledger, &config, &[1]).unwrap();

    let extractor = ledger_extractor(&ledger, &config.selector);
    let prepared = prepare(&config, extractor.as_ref()).unwrap();
    let ranges = prepared.ledger.ranges();
    assert_eq!(MerkleTree::from_ranges(&ranges).root_hex(), report.eligibility_root);

    for range in &ranges {
        let proof = audit::prove(&prepared.ledger, &range.participant).unwrap();
        assert!(audit::verify(&report.eligibility_root, &proof).unwrap());

        let leaf = compute_leaf_hash(&range.participant, range.cumulative_start, range.cumulative_end);
        assert!(verify_merkle_proof(&report.eligibility_root, &proof.proof, &leaf));

        let forged = compute_leaf_hash(&range.participant, range.cumulative_start, range.cumulative_end + 1.0);
        assert!(!verify_merkle_proof(&report.eligibility_root, &proof.proof, &forged));
    }
}

#[test]
fn test_json_report_shape() {
    let mut config = token_config();
    config.winners = 2;

    let report = run_replay(&token_ledger(), &config, &[150, 9999]).unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["kind"], "token_holder");
    assert_eq!(json["selector_id"], POLICY);
    assert_eq!(json["winners"][0]["participant"], "addr_b");
    assert_eq!(json["winners"][0]["winning_number"], 150);
    assert_eq!(json["failures"][0]["prize"], 2);
    assert_eq!(json["failures"][0]["error"]["kind"], "out_of_range");
}

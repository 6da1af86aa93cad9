//! # Address Mapping Tests
//!
//! Verifies field extraction, the decode/encode round trip over every
//! coordinate tuple of a small topology, and rejection of malformed mapping
//! strings.

use memsim_core::common::{Address, ConfigError};
use memsim_core::mapping::AddressMapper;
use rstest::rstest;

use crate::common::test_config;

#[test]
fn decode_extracts_low_fields() {
    let config = test_config();
    let mapper = AddressMapper::new(&config).unwrap();
    // One burst covers 64 bytes; addresses inside it decode identically.
    assert_eq!(mapper.decode(0x00), mapper.decode(0x3F));
    // Default order "rochrababgco": column occupies the bits just above the
    // burst offset.
    let addr = mapper.decode(1 << 6);
    assert_eq!(addr.column, 1);
    assert_eq!(addr.row, 0);
}

#[rstest]
#[case("rochrababgco")]
#[case("chrobabgraco")]
#[case("rarobgbachco")]
#[case("cobabgraroch")]
fn round_trip_covers_all_tuples(#[case] mapping: &str) {
    let mut config = test_config();
    config.scheduler.address_mapping = mapping.to_string();
    let mapper = AddressMapper::new(&config).unwrap();

    let d = &config.dram;
    for rank in 0..d.ranks {
        for bankgroup in 0..d.bankgroups {
            for bank in 0..d.banks_per_group {
                for row in (0..d.rows).step_by(7) {
                    for column in (0..d.columns).step_by(5) {
                        let addr = Address::new(0, rank, bankgroup, bank, row, column);
                        let encoded = mapper.encode(addr);
                        assert_eq!(mapper.decode(encoded), addr, "mapping {mapping}");
                    }
                }
            }
        }
    }
}

#[test]
fn encode_is_injective_over_distinct_tuples() {
    let config = test_config();
    let mapper = AddressMapper::new(&config).unwrap();
    let a = mapper.encode(Address::new(0, 1, 0, 1, 5, 3));
    let b = mapper.encode(Address::new(0, 1, 1, 1, 5, 3));
    let c = mapper.encode(Address::new(0, 1, 0, 1, 6, 3));
    assert_ne!(a, b);
    assert_ne!(a, c);
    assert_ne!(b, c);
}

#[test]
fn burst_aligned_round_trip() {
    let config = test_config();
    let mapper = AddressMapper::new(&config).unwrap();
    for addr in (0..1u64 << 16).step_by(64) {
        assert_eq!(mapper.encode(mapper.decode(addr)), addr);
    }
}

#[rstest]
#[case("")]
#[case("rochraba")]
#[case("rochrababgcoba")]
#[case("xxchrababgco")]
#[case("rorochbabgco")]
fn malformed_strings_are_config_errors(#[case] mapping: &str) {
    let mut config = test_config();
    config.scheduler.address_mapping = mapping.to_string();
    let err = AddressMapper::new(&config).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidAddressMapping { .. }));
}

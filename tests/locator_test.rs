mod common;

use std::cell::RefCell;

use casework::error::Error;
use casework::locator::{DEFAULT_BASE_URL, Locator, ResolutionResult};
use casework::model::{DocumentUrl, Partition, UnitInput, WorkUnit};
use common::{number, partition, range};

fn resolve_with(primary: u8, hits: &[u8]) -> (ResolutionResult, Vec<u8>) {
    let locator = Locator::default();
    let tried = RefCell::new(Vec::new());
    let exists = |url: &DocumentUrl| {
        let p = url.partition().get();
        tried.borrow_mut().push(p);
        hits.contains(&p)
    };
    let result = locator.resolve(number(39186), partition(primary), &exists);
    (result, tried.into_inner())
}

#[test]
fn build_url_matches_canonical_format() {
    let locator = Locator::default();
    let url = locator.build_url(number(39186), partition(9));
    assert_eq!(
        url.as_str(),
        "https://www.justice.gov/epstein/files/DataSet%209/EFTA00039186.pdf"
    );
    assert_eq!(locator.base_url(), DEFAULT_BASE_URL);
    // Built URLs pass the canonical pattern.
    assert_eq!(DocumentUrl::parse(url.as_str()).unwrap(), url);
}

#[test]
fn build_url_is_deterministic_and_injective_per_partition() {
    let locator = Locator::default();
    for p in 1..=12u8 {
        let mut seen = std::collections::HashSet::new();
        for n in [0u32, 1, 39186, 39187, 99_999_999] {
            let a = locator.build_url(number(n), partition(p));
            let b = locator.build_url(number(n), partition(p));
            assert_eq!(a, b);
            assert!(seen.insert(a.as_str().to_string()));
        }
    }
}

#[test]
fn primary_partition_prefers_smallest_on_overlap() {
    let locator = Locator::new(
        DEFAULT_BASE_URL,
        vec![range(9, 39_000, 40_000), range(8, 39_500, 39_999), range(10, 0, 50_000)],
    )
    .unwrap();
    assert_eq!(locator.get_primary_partition(number(39_600)), Some(partition(8)));
    assert_eq!(locator.get_primary_partition(number(39_100)), Some(partition(9)));
    assert_eq!(locator.get_primary_partition(number(45_000)), Some(partition(10)));
    assert_eq!(locator.get_primary_partition(number(60_000)), None);
}

#[test]
fn resolve_short_circuits_on_primary() {
    let (result, tried) = resolve_with(5, &[5, 4, 6]);
    assert_eq!(tried, vec![5]);
    assert!(result.found);
    assert!(!result.was_adjacent);
    assert!(!result.genuinely_missing);
    assert_eq!(result.partition, Some(partition(5)));
}

#[test]
fn resolve_tries_lower_neighbour_before_upper() {
    let (result, tried) = resolve_with(5, &[4, 6]);
    assert_eq!(tried, vec![5, 4]);
    assert!(result.found && result.was_adjacent);
    assert_eq!(result.partition, Some(partition(4)));
    assert_eq!(
        result.url.unwrap().as_str(),
        "https://www.justice.gov/epstein/files/DataSet%204/EFTA00039186.pdf"
    );

    let (result, tried) = resolve_with(5, &[6]);
    assert_eq!(tried, vec![5, 4, 6]);
    assert!(result.was_adjacent);
    assert_eq!(result.partition, Some(partition(6)));
}

#[test]
fn resolve_reports_genuinely_missing_after_all_candidates() {
    let (result, tried) = resolve_with(5, &[]);
    assert_eq!(tried, vec![5, 4, 6]);
    assert!(!result.found);
    assert!(result.genuinely_missing);
    assert!(!result.was_adjacent);
    assert!(result.url.is_none());
    assert!(result.partition.is_none());
}

#[test]
fn resolve_skips_out_of_range_candidates() {
    let (_, tried) = resolve_with(1, &[]);
    assert_eq!(tried, vec![1, 2]);

    let (result, tried) = resolve_with(12, &[11]);
    assert_eq!(tried, vec![12, 11]);
    assert!(result.was_adjacent);
}

#[test]
fn malformed_inputs_are_rejected_at_construction() {
    assert!(Partition::new(0).is_err());
    assert!(Partition::new(13).is_err());
    assert!(casework::model::DocumentNumber::new(123_456_789).is_err());
    assert!("EFTA0003918".parse::<casework::model::DocumentId>().is_err());
}

#[test]
fn base_url_that_breaks_the_canonical_format_is_rejected() {
    for base in [
        "https://mirror.example/epstein",
        "http://www.justice.gov/epstein/files",
        "www.justice.gov/epstein/files",
        "",
    ] {
        assert!(
            matches!(Locator::new(base, Vec::new()), Err(Error::FormatInvalid(_))),
            "{base}"
        );
    }
}

#[test]
fn mirror_base_url_builds_units_that_round_trip() {
    let locator = Locator::new("https://mirror.example/archive/files/", Vec::new()).unwrap();
    let built = locator.build_url(number(39186), partition(9));
    assert_eq!(
        built.as_str(),
        "https://mirror.example/archive/files/DataSet%209/EFTA00039186.pdf"
    );
    assert_eq!(DocumentUrl::parse(built.as_str()).unwrap(), built);

    let catalog = common::single_claim_catalog();
    let generator = casework::generator::Generator::new(&catalog, locator);
    let unit = generator.generate_unit(casework::model::UnitType::VerifyFinding).unwrap();
    let json = serde_json::to_string(&unit).unwrap();
    let back: WorkUnit = serde_json::from_str(&json).unwrap();
    match back.input {
        UnitInput::VerifyFinding { document_urls, .. } => {
            assert_eq!(document_urls, vec![built]);
        }
        other => panic!("unexpected input {other:?}"),
    }
}

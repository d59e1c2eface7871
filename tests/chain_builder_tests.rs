mod common;

use common::{make_certificate, make_certificate_with_validity, make_three_level_chain};
use custody_signer::{ChainBuildOptions, ChainBuilder, MemoryCertificateStore, SigningError};
use der::Encode;

fn linkage_only() -> ChainBuildOptions {
    ChainBuildOptions {
        ignore_trust_errors: true,
    }
}

#[test]
fn builds_full_chain_from_unordered_pool() {
    let (leaf, intermediate, root) = make_three_level_chain();
    let mut store = MemoryCertificateStore::new();

    // Pool order deliberately reversed relative to the chain.
    let chain = ChainBuilder::build_chain(
        &leaf,
        &[root.clone(), intermediate.clone()],
        &linkage_only(),
        &mut store,
    )
    .expect("chain should build");

    assert_eq!(chain.len(), 3);
    assert_eq!(
        chain.certificates()[0].tbs_certificate.subject,
        leaf.tbs_certificate.subject
    );
    assert_eq!(
        chain.certificates()[1].tbs_certificate.subject,
        intermediate.tbs_certificate.subject
    );
    assert_eq!(
        chain.certificates()[2].tbs_certificate.subject,
        root.tbs_certificate.subject
    );
}

#[test]
fn populates_store_leaf_first() {
    let (leaf, intermediate, root) = make_three_level_chain();
    let mut store = MemoryCertificateStore::new();

    let chain =
        ChainBuilder::build_chain(&leaf, &[intermediate, root], &linkage_only(), &mut store)
            .expect("chain should build");

    assert_eq!(store.len(), 3);
    assert_eq!(store.certificates()[0], leaf.to_der().unwrap());
    assert_eq!(store.certificates(), chain.der_certificates());
}

#[test]
fn self_signed_leaf_is_a_one_element_chain() {
    let leaf = make_certificate("CN=Self Signed", "CN=Self Signed", 7);
    let mut store = MemoryCertificateStore::new();

    let chain =
        ChainBuilder::build_chain(&leaf, &[], &linkage_only(), &mut store).expect("should build");

    assert_eq!(chain.len(), 1);
    assert_eq!(store.len(), 1);
}

#[test]
fn leaf_with_no_linkable_issuer_fails() {
    let leaf = make_certificate("CN=Orphan", "CN=Unknown Issuer", 9);
    let mut store = MemoryCertificateStore::new();

    let error = ChainBuilder::build_chain(&leaf, &[], &linkage_only(), &mut store)
        .expect_err("no trivial link");
    assert!(matches!(error, SigningError::ChainBuildError(_)));
    assert!(store.is_empty());
}

#[test]
fn unrelated_pool_certificates_do_not_link() {
    let leaf = make_certificate("CN=Orphan", "CN=Unknown Issuer", 9);
    let bystander = make_certificate("CN=Bystander", "CN=Bystander", 10);
    let mut store = MemoryCertificateStore::new();

    let error = ChainBuilder::build_chain(&leaf, &[bystander], &linkage_only(), &mut store)
        .expect_err("bystander is not the issuer");
    assert!(matches!(error, SigningError::ChainBuildError(_)));
}

#[test]
fn stops_at_furthest_reachable_issuer() {
    // Root withheld: the chain ends at the intermediate.
    let (leaf, intermediate, _root) = make_three_level_chain();
    let mut store = MemoryCertificateStore::new();

    let chain = ChainBuilder::build_chain(&leaf, &[intermediate], &linkage_only(), &mut store)
        .expect("partial chain is still a chain");

    assert_eq!(chain.len(), 2);
    assert_eq!(store.len(), 2);
}

#[test]
fn expired_intermediate_is_tolerated_when_trust_is_ignored() {
    let root = make_certificate("CN=Test Root", "CN=Test Root", 3);
    let expired = make_certificate_with_validity(
        "CN=Test Intermediate",
        "CN=Test Root",
        2,
        1_262_304_000, // 2010-01-01
        1_420_070_400, // 2015-01-01
    );
    let leaf = make_certificate("CN=Test Leaf", "CN=Test Intermediate", 1);
    let mut store = MemoryCertificateStore::new();

    let chain = ChainBuilder::build_chain(
        &leaf,
        &[expired.clone(), root.clone()],
        &linkage_only(),
        &mut store,
    )
    .expect("linkage ignores validity");
    assert_eq!(chain.len(), 3);

    let mut store = MemoryCertificateStore::new();
    let error = ChainBuilder::build_chain(
        &leaf,
        &[expired, root],
        &ChainBuildOptions {
            ignore_trust_errors: false,
        },
        &mut store,
    )
    .expect_err("validity enforced");
    assert!(matches!(error, SigningError::ChainBuildError(_)));
}

use std::path::Path;

use custody_signer::adapters::platform::flags;
use custody_signer::{
    HashAlgorithm, MemoryCertificateStore, PageHashing, RequestAssembler, SigningError,
    TimestampConfiguration, TimestampUrl,
};

const DUMMY_CERT: &[u8] = &[0x30, 0x03, 0x02, 0x01, 0x01];

fn assemble<'a>(
    page_hashing: PageHashing,
    timestamp: &'a TimestampConfiguration,
    store: &'a MemoryCertificateStore,
) -> custody_signer::SigningRequest<'a> {
    RequestAssembler::assemble(
        Path::new("target.exe"),
        Some("Example App"),
        Some("https://example.com"),
        page_hashing,
        HashAlgorithm::Sha256,
        timestamp,
        DUMMY_CERT,
        store,
    )
    .expect("assembly should succeed")
}

#[test]
fn page_hashing_bits_are_mutually_exclusive() {
    let store = MemoryCertificateStore::new();
    let timestamp = TimestampConfiguration::None;

    let include = assemble(PageHashing::Include, &timestamp, &store);
    assert_ne!(include.flags & flags::SPC_INC_PE_PAGE_HASHES, 0);
    assert_eq!(include.flags & flags::SPC_EXC_PE_PAGE_HASHES, 0);

    let exclude = assemble(PageHashing::Exclude, &timestamp, &store);
    assert_ne!(exclude.flags & flags::SPC_EXC_PE_PAGE_HASHES, 0);
    assert_eq!(exclude.flags & flags::SPC_INC_PE_PAGE_HASHES, 0);

    let unset = assemble(PageHashing::PlatformDefault, &timestamp, &store);
    assert_eq!(unset.flags & flags::SPC_INC_PE_PAGE_HASHES, 0);
    assert_eq!(unset.flags & flags::SPC_EXC_PE_PAGE_HASHES, 0);
}

#[test]
fn callback_signing_flag_is_always_present() {
    let store = MemoryCertificateStore::new();
    let timestamp = TimestampConfiguration::None;
    for mode in [
        PageHashing::Include,
        PageHashing::Exclude,
        PageHashing::PlatformDefault,
    ] {
        let request = assemble(mode, &timestamp, &store);
        assert_ne!(request.flags & flags::SIGNER_DIGEST_SIGN, 0);
    }
}

#[test]
fn no_timestamp_means_no_flags_oid_or_url() {
    let store = MemoryCertificateStore::new();
    let request = assemble(
        PageHashing::PlatformDefault,
        &TimestampConfiguration::None,
        &store,
    );

    assert_eq!(request.timestamp_flags, 0);
    assert!(request.timestamp_algorithm_oid.is_none());
    assert!(request.timestamp_url.is_none());
    assert!(!request.wants_timestamp());
}

#[test]
fn authenticode_timestamp_sets_legacy_flag_without_oid() {
    let store = MemoryCertificateStore::new();
    let timestamp = TimestampConfiguration::Authenticode {
        url: TimestampUrl::new("http://timestamp.digicert.com").unwrap(),
    };
    let request = assemble(PageHashing::PlatformDefault, &timestamp, &store);

    assert_eq!(request.timestamp_flags, flags::TIMESTAMP_AUTHENTICODE);
    assert!(request.timestamp_algorithm_oid.is_none());
    assert_eq!(
        request.timestamp_url.map(TimestampUrl::as_str),
        Some("http://timestamp.digicert.com")
    );
}

#[test]
fn rfc3161_timestamp_resolves_sha256_oid() {
    let store = MemoryCertificateStore::new();
    let timestamp = TimestampConfiguration::Rfc3161 {
        url: TimestampUrl::new("http://timestamp.digicert.com").unwrap(),
        digest_algorithm: HashAlgorithm::Sha256,
    };
    let request = assemble(PageHashing::PlatformDefault, &timestamp, &store);

    assert_eq!(request.timestamp_flags, flags::TIMESTAMP_RFC3161);
    assert_ne!(request.timestamp_flags & flags::TIMESTAMP_RFC3161, 0);
    assert_eq!(request.timestamp_flags & flags::TIMESTAMP_AUTHENTICODE, 0);
    assert_eq!(
        request.timestamp_algorithm_oid,
        Some("2.16.840.1.101.3.4.2.1")
    );
    assert!(request.wants_timestamp());
}

#[test]
fn assembly_rejects_missing_certificate() {
    let store = MemoryCertificateStore::new();
    let timestamp = TimestampConfiguration::None;
    let error = RequestAssembler::assemble(
        Path::new("target.exe"),
        None,
        None,
        PageHashing::PlatformDefault,
        HashAlgorithm::Sha256,
        &timestamp,
        &[],
        &store,
    )
    .expect_err("empty certificate");
    assert!(matches!(error, SigningError::CertificateError(_)));
}

#[test]
fn page_hashing_parses_from_cli_strings() {
    assert_eq!(
        "include".parse::<PageHashing>().unwrap(),
        PageHashing::Include
    );
    assert_eq!(
        "exclude".parse::<PageHashing>().unwrap(),
        PageHashing::Exclude
    );
    assert_eq!(
        "default".parse::<PageHashing>().unwrap(),
        PageHashing::PlatformDefault
    );
    assert!("sometimes".parse::<PageHashing>().is_err());
}

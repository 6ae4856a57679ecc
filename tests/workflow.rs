mod support;

use std::collections::BTreeMap;
use std::time::Duration;

use assert_matches::assert_matches;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde_json::{Value, json};

use refinebio::error::RefineError;
use refinebio::fs_util::extract_archive;
use refinebio::http::Method;
use refinebio::workflow::{
    DatasetDownload, DatasetOutcome, download_compendium, download_dataset,
    download_quantfile_compendium,
};

use support::{MockTransport, query_value};

const ARCHIVE_URL: &str = "https://files.test/dataset_abc.zip";
const COMPENDIUM_URL: &str = "https://files.test/danio.tar.gz";

fn dataset(extra: Value) -> Value {
    let mut body = json!({"id": "abc", "data": {"GSE1": ["ALL"]}, "is_processing": true});
    if let (Some(body), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
        body.extend(extra.clone());
    }
    body
}

fn quick(path: &std::path::Path) -> DatasetDownload {
    let mut request = DatasetDownload::new(path);
    request.poll_interval = Duration::from_millis(1);
    request
}

fn tar_gz(name: &str, contents: &[u8]) -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    let mut header = tar::Header::new_gnu();
    header.set_size(contents.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append_data(&mut header, name, contents).unwrap();
    builder.into_inner().unwrap().finish().unwrap()
}

#[test]
fn dict_and_experiments_conflict() {
    let mock = MockTransport::new();
    let dir = tempfile::tempdir().unwrap();
    let mut request = quick(dir.path());
    request.dataset_dict = Some(BTreeMap::from([(
        "GSE1".to_string(),
        vec!["ALL".to_string()],
    )]));
    request.experiments = vec!["GSE2".to_string()];

    let err = download_dataset(&mock.api(), &request, None).unwrap_err();
    assert_matches!(
        err,
        RefineError::DownloadError { info, .. } if info.contains("but not both")
    );
    assert_eq!(mock.request_count(), 0);
}

#[test]
fn dataset_is_processed_polled_and_downloaded() {
    let mock = MockTransport::new();
    mock.on(Method::Post, "dataset/", &[], dataset(json!({"start": true})));
    mock.on(Method::Get, "dataset/abc/", &[], dataset(json!({})));
    mock.on(
        Method::Get,
        "dataset/abc/",
        &[],
        dataset(json!({"is_processing": false, "is_processed": true, "download_url": ARCHIVE_URL})),
    );
    mock.serve_file(ARCHIVE_URL, Some(3), b"zip");
    let dir = tempfile::tempdir().unwrap();

    let mut request = quick(dir.path());
    request.experiments = vec!["GSE1".to_string()];
    request.skip_quantile_normalization = true;
    request.email_address = Some("me@example.org".to_string());

    let outcome = download_dataset(&mock.api(), &request, None).unwrap();
    assert_eq!(
        outcome,
        DatasetOutcome::Downloaded(dir.path().join("dataset_abc.zip"))
    );

    let requests = mock.requests();
    let body = requests[0].body.as_ref().unwrap();
    assert_eq!(body["data"], json!({"GSE1": ["ALL"]}));
    assert_eq!(body["aggregate_by"], json!("EXPERIMENT"));
    assert_eq!(body["scale_by"], json!("NONE"));
    assert_eq!(body["quantile_normalize"], json!(false));
    assert_eq!(body["start"], json!(true));
    assert_eq!(requests.len(), 3);
    assert_eq!(mock.opened(), vec![ARCHIVE_URL.to_string()]);
}

#[test]
fn dataset_wait_is_bounded_by_the_timeout() {
    let mock = MockTransport::new();
    mock.on(Method::Post, "dataset/", &[], dataset(json!({"start": true})));
    mock.on(Method::Get, "dataset/abc/", &[], dataset(json!({})));
    let dir = tempfile::tempdir().unwrap();

    let mut request = quick(dir.path());
    request.experiments = vec!["GSE1".to_string()];
    request.timeout = Some(Duration::from_millis(20));

    let outcome = download_dataset(&mock.api(), &request, None).unwrap();
    assert_eq!(
        outcome,
        DatasetOutcome::TimedOut {
            id: "abc".to_string()
        }
    );
    assert!(mock.opened().is_empty());
}

#[test]
fn missing_compendium_is_a_download_error() {
    let mock = MockTransport::new();
    mock.on(
        Method::Get,
        "compendia/",
        &[],
        json!({"count": 0, "next": null, "previous": null, "results": []}),
    );
    let dir = tempfile::tempdir().unwrap();

    let err = download_quantfile_compendium(&mock.api(), dir.path(), "UNICORN", None).unwrap_err();
    assert_matches!(
        err,
        RefineError::DownloadError { entity, info }
            if entity == "Compendium"
                && info.contains("organism name, UNICORN and quant_sf_only, true")
    );

    let requests = mock.requests();
    let request = &requests[0];
    assert_eq!(query_value(request, "primary_organism__name"), Some("UNICORN"));
    assert_eq!(query_value(request, "quant_sf_only"), Some("true"));
    assert_eq!(query_value(request, "latest_version"), Some("true"));
}

#[test]
fn latest_compendium_is_downloaded_and_extracted() {
    let mock = MockTransport::new();
    mock.on(
        Method::Get,
        "compendia/",
        &[("primary_organism__name", "DANIO_RERIO")],
        json!({
            "count": 1,
            "next": null,
            "previous": null,
            "results": [{
                "id": 7,
                "primary_organism_name": "DANIO_RERIO",
                "compendium_version": 2,
                "quant_sf_only": false,
                "computed_file": {
                    "id": 70,
                    "filename": "danio.tar.gz",
                    "download_url": COMPENDIUM_URL
                }
            }]
        }),
    );
    mock.serve_file(COMPENDIUM_URL, Some(10), &tar_gz("quant.sf", b"Name\tTPM\n"));
    let dir = tempfile::tempdir().unwrap();

    let path = download_compendium(&mock.api(), dir.path(), "DANIO_RERIO", false, None)
        .unwrap()
        .unwrap();
    assert_eq!(path, dir.path().join("danio.tar.gz"));
    assert_eq!(mock.request_count(), 1);

    let extracted = extract_archive(&path).unwrap();
    assert_eq!(extracted, dir.path().join("danio"));
    assert_eq!(
        std::fs::read_to_string(extracted.join("quant.sf")).unwrap(),
        "Name\tTPM\n"
    );
}

mod support;

use assert_matches::assert_matches;
use serde_json::{Value, json};

use refinebio::error::RefineError;
use refinebio::http::Method;
use refinebio::models::{Sample, SampleRecord};
use refinebio::pagination::{Filters, PaginatedList};

use support::{MockTransport, query_value};

fn page(count: usize, range: std::ops::Range<usize>) -> Value {
    let results: Vec<Value> = range
        .map(|index| json!({"id": index, "accession_code": format!("GSM{index}")}))
        .collect();
    json!({"count": count, "next": null, "previous": null, "results": results})
}

fn codes(samples: &[Sample]) -> Vec<String> {
    samples
        .iter()
        .map(|sample| sample.key().unwrap_or_default())
        .collect()
}

/// Twenty samples served ten at a time.
fn twenty(mock: &MockTransport) -> PaginatedList<SampleRecord> {
    mock.on(Method::Get, "samples/", &[("limit", "10")], page(20, 0..10));
    mock.on(
        Method::Get,
        "samples/",
        &[("offset", "10"), ("limit", "10")],
        page(20, 10..20),
    );
    Sample::search(&mock.api(), &Filters::new().with("limit", 10)).unwrap()
}

#[test]
fn second_page_is_fetched_by_offset() {
    let mock = MockTransport::new();
    let list = twenty(&mock);
    assert_eq!(list.len(), 20);
    assert_eq!(list.page_size(), 10);
    assert_eq!(mock.request_count(), 1);

    let sample = list.get(15).unwrap();
    assert_eq!(sample.key().as_deref(), Some("GSM15"));

    let requests = mock.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(query_value(&requests[1], "offset"), Some("10"));
    assert_eq!(query_value(&requests[1], "limit"), Some("10"));

    list.get(12).unwrap();
    list.get(3).unwrap();
    assert_eq!(mock.request_count(), 2);
}

#[test]
fn negative_and_out_of_range_indexes() {
    let mock = MockTransport::new();
    let list = twenty(&mock);

    assert_eq!(list.get(19).unwrap(), list.get(-1).unwrap());
    assert_eq!(list.get(-20).unwrap().key().as_deref(), Some("GSM0"));
    assert_matches!(
        list.get(20),
        Err(RefineError::IndexOutOfRange { index: 20, len: 20 })
    );
    assert_matches!(
        list.get(-21),
        Err(RefineError::IndexOutOfRange { index: -21, len: 20 })
    );
}

#[test]
fn stepped_slices_match_indexing() {
    let mock = MockTransport::new();
    let list = twenty(&mock);

    let forward = list.slice(None, None, 5).unwrap();
    assert_eq!(codes(&forward), ["GSM0", "GSM5", "GSM10", "GSM15"]);

    let backward = list.slice(None, None, -5).unwrap();
    assert_eq!(codes(&backward), ["GSM19", "GSM14", "GSM9", "GSM4"]);

    let window = list.slice(Some(-3), None, 1).unwrap();
    let indexed: Vec<Sample> = (17..20).map(|index| list.get(index).unwrap()).collect();
    assert_eq!(window, indexed);

    assert!(list.slice(Some(5), Some(2), 1).unwrap().is_empty());
    assert_matches!(
        list.slice(None, None, 0),
        Err(RefineError::InvalidArgument(_))
    );
}

#[test]
fn iterating_two_pages_makes_one_more_request() {
    let mock = MockTransport::new();
    let list = twenty(&mock);

    let all: Vec<Sample> = list.iter().collect::<Result<_, _>>().unwrap();
    assert_eq!(all.len(), 20);
    assert_eq!(all[19].key().as_deref(), Some("GSM19"));
    assert_eq!(mock.request_count(), 2);

    let again = (&list).into_iter().count();
    assert_eq!(again, 20);
    assert_eq!(mock.request_count(), 2);
}

#[test]
fn changed_count_poisons_the_list() {
    let mock = MockTransport::new();
    mock.on(Method::Get, "samples/", &[("limit", "10")], page(20, 0..10));
    mock.on(
        Method::Get,
        "samples/",
        &[("offset", "10"), ("limit", "10")],
        page(21, 10..20),
    );
    let list = Sample::search(&mock.api(), &Filters::new().with("limit", 10)).unwrap();

    assert_matches!(
        list.get(10),
        Err(RefineError::ListChanged {
            expected: 20,
            actual: 21
        })
    );
    // Cached pages are refused too.
    assert_matches!(list.get(0), Err(RefineError::ListChanged { .. }));

    let results: Vec<_> = list.iter().collect();
    assert_eq!(results.len(), 1);
    assert!(results[0].is_err());
}

#[test]
fn starting_offset_shifts_the_view() {
    let mock = MockTransport::new();
    mock.on(
        Method::Get,
        "samples/",
        &[("offset", "5"), ("limit", "10")],
        page(20, 5..15),
    );
    mock.on(
        Method::Get,
        "samples/",
        &[("offset", "15"), ("limit", "10")],
        page(20, 15..20),
    );
    let filters = Filters::new().with("offset", 5).with("limit", 10);
    let list = Sample::search(&mock.api(), &filters).unwrap();

    assert_eq!(list.len(), 15);
    assert_eq!(list.get(0).unwrap().key().as_deref(), Some("GSM5"));
    assert_eq!(list.get(-1).unwrap().key().as_deref(), Some("GSM19"));
    assert_eq!(mock.request_count(), 2);
}

#[test]
fn empty_results() {
    let mock = MockTransport::new();
    mock.on(Method::Get, "samples/", &[], page(0, 0..0));
    let list = Sample::search(&mock.api(), &Filters::new()).unwrap();

    assert!(list.is_empty());
    assert!(list.first().unwrap().is_none());
    assert_matches!(list.get(0), Err(RefineError::IndexOutOfRange { .. }));
    assert_eq!(list.iter().count(), 0);
}

#[test]
fn filters_are_sent_with_the_search() {
    let mock = MockTransport::new();
    mock.on(Method::Get, "samples/", &[], page(1, 0..1));
    let filters = Filters::new()
        .with("organism__name", "GORILLA")
        .with("is_processed", true);
    Sample::search(&mock.api(), &filters).unwrap();

    let requests = mock.requests();
    let request = &requests[0];
    assert_eq!(query_value(request, "organism__name"), Some("GORILLA"));
    assert_eq!(query_value(request, "is_processed"), Some("true"));
}

#[test]
fn bad_filters_surface_the_error_envelope() {
    let mock = MockTransport::new();
    mock.respond(
        Method::Get,
        "samples/",
        &[],
        400,
        json!({
            "error_type": "invalid_filters",
            "message": "Invalid filters",
            "details": ["colour"]
        }),
    );
    let err = Sample::search(&mock.api(), &Filters::new().with("colour", "red")).unwrap_err();
    assert_matches!(err, RefineError::InvalidFilters(details) if details.contains("colour"));
}

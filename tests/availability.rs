mod common;

use uframe_inventory::availability::{AvailabilityTester, RESULT_COLUMNS};

use common::{client, single_stream_catalog, url};

const INPUT: &str = "\
id,refdes,name,streamR,streamT,paramR,paramT
1,CE01ISSM-MFD35-02-PRESFA000,pressure,,A_sample,,pressure
2,CE01ISSM-MFD35-02-PRESFA000,depth,A_sample,A_sample,pressure_depth,missing
3,not-a-refdes,bogus,,,,
";

fn run(input: &str) -> (usize, Vec<Vec<String>>) {
    let client = client(single_stream_catalog());
    let mut output = Vec::new();
    let rows = AvailabilityTester::new(&client)
        .run(input.as_bytes(), &mut output)
        .unwrap();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(output.as_slice());
    let table = reader
        .records()
        .map(|record| record.unwrap().iter().map(str::to_string).collect())
        .collect();
    (rows, table)
}

#[test]
fn results_are_appended_to_each_row() {
    let (rows, table) = run(INPUT);
    assert_eq!(rows, 3);
    assert_eq!(table.len(), 4);
    assert_eq!(&table[0][7..], RESULT_COLUMNS.as_slice());

    let metadata = url("/CE01ISSM/MFD35/02-PRESFA000/metadata");
    assert_eq!(
        &table[1][7..],
        ["0", "0", "0", "1", "1", "1", "", "A_sample", metadata.as_str()].as_slice()
    );
}

#[test]
fn stream_and_parameter_checks_are_independent() {
    let (_, table) = run(INPUT);
    let row = &table[2][7..];
    // recovered: stream exists under another method, parameter exists but
    // no recovered record carries it
    assert_eq!(&row[..3], ["1", "1", "1"].as_slice());
    assert_eq!(row[6], "");
    // telemetered: stream exists, parameter is unknown
    assert_eq!(&row[3..6], ["1", "0", "0"].as_slice());
}

#[test]
fn invalid_refdes_yields_empty_result() {
    let (_, table) = run(INPUT);
    assert_eq!(
        &table[3][7..],
        ["0", "0", "0", "0", "0", "0", "", "", ""].as_slice()
    );
}

#[test]
fn metadata_is_fetched_once_per_refdes() {
    let client = client(single_stream_catalog());
    let mut output = Vec::new();
    AvailabilityTester::new(&client)
        .run(INPUT.as_bytes(), &mut output)
        .unwrap();
    assert_eq!(
        client.transport().requests(),
        vec![url("/CE01ISSM/MFD35/02-PRESFA000/metadata")]
    );
}

#[test]
fn test_availability_writes_default_results_file() {
    let temp = tempfile::tempdir().unwrap();
    let input = temp.path().join("streams.csv");
    std::fs::write(&input, INPUT).unwrap();
    let client = client(single_stream_catalog());

    let output = client.test_availability(&input, None).unwrap();

    assert_eq!(output, temp.path().join("streams-test_results.csv"));
    let written = std::fs::read_to_string(&output).unwrap();
    assert_eq!(written.lines().count(), 4);
    assert!(written.lines().next().unwrap().ends_with("UFrame Metadata URL"));
}

#[test]
fn missing_metadata_is_cached_too() {
    let input = "\
id,refdes,name,streamR,streamT,paramR,paramT
1,CE09OSPM-WFP01-03-CTDPFK000,ctd,,ctdpf_ckl_wfp_instrument,,temperature
2,CE09OSPM-WFP01-03-CTDPFK000,ctd,ctdpf_ckl_wfp_instrument_recovered,,pressure,
";
    let client = client(single_stream_catalog());
    let mut output = Vec::new();

    let rows = AvailabilityTester::new(&client)
        .run(input.as_bytes(), &mut output)
        .unwrap();

    assert_eq!(rows, 2);
    assert_eq!(
        client.transport().requests(),
        vec![url("/CE09OSPM/WFP01/03-CTDPFK000/metadata")]
    );
    let written = String::from_utf8(output).unwrap();
    let data = written.lines().skip(1).collect::<Vec<_>>();
    assert_eq!(data.len(), 2);
    assert!(data.iter().all(|line| line.ends_with(",0,0,0,0,0,0,,,")));
}

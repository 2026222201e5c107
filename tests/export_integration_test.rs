use anyhow::Result;
use flowmap_etl::core::geojson::FeatureCollection;
use flowmap_etl::domain::model::Direction;
use flowmap_etl::{
    load_store, CsvFlowSource, ExportEngine, FlowQueryEngine, LocalStorage, RegionSpec,
    ScenarioSpec,
};
use std::path::Path;
use tempfile::TempDir;

const AREAS: &str = "code,name,lat,lon
E02000001,City of London 001,51.5155,-0.0922
E02000977,Westminster 018,51.5123,-0.1340
E02006801,Reading 003,51.4551,-0.9787
E02005939,Oxford 004,51.7520,-1.2577
E02000166,Camden 022,51.5290,-0.1255
E02009999,Duplicate of City,51.5155,-0.0922
";

const FLOWS: &str = "origin_code,origin_name,dest_code,dest_name,count
E02006801,Reading 003,E02000977,Westminster 018,120
E02005939,Oxford 004,E02000001,City of London 001,45
E02000001,City of London 001,E02009999,Duplicate of City,300
E02006801,Reading 003,E02005939,Oxford 004,80
E02000166,Camden 022,E02000977,Westminster 018,120
E02099999,Nowhere 001,E02000977,Westminster 018,9
E02005939,Oxford 004,E02006801,Reading 003,not-a-number
E02000977,Westminster 018,E02000166,Camden 022,6500
";

fn write_inputs(dir: &Path) -> Result<CsvFlowSource> {
    let flows = dir.join("flows.csv");
    let areas = dir.join("areas.csv");
    std::fs::write(&flows, FLOWS)?;
    std::fs::write(&areas, AREAS)?;
    Ok(CsvFlowSource::new(flows, areas))
}

fn scenarios() -> Vec<ScenarioSpec> {
    vec![
        ScenarioSpec::new("top1000-geral", 1000),
        ScenarioSpec::new("reading-outflows-top500", 500).with_filter("origin_code", "E02006801"),
        ScenarioSpec::new("london-inflows-top5000", 5000)
            .with_dest_region(RegionSpec::Preset("central-london".to_string())),
        ScenarioSpec::new("broken", 0),
    ]
}

#[tokio::test]
async fn test_join_drops_unresolved_and_self_loops() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let source = write_inputs(temp_dir.path())?;

    let store = load_store(&source).await?;
    let report = store.report();

    assert_eq!(report.input_flows, 8);
    assert_eq!(report.missing_centroid, 1);
    assert_eq!(report.self_loops, 1);
    assert_eq!(store.len(), 6);
    assert_eq!(
        store.len(),
        report.input_flows - report.missing_centroid - report.self_loops
    );

    // 非數字流量保留下來，值為 0
    let zeroed = store
        .flows()
        .iter()
        .find(|f| f.flow.origin_code == "E02005939" && f.flow.dest_code == "E02006801")
        .expect("defaulted row is kept");
    assert_eq!(zeroed.count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_query_matches_stable_ranking() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let source = write_inputs(temp_dir.path())?;
    let store = load_store(&source).await?;
    let engine = FlowQueryEngine::new(&store);

    let incoming = engine.query("E02000977", Direction::Incoming, 10)?;
    let origins: Vec<&str> = incoming.iter().map(|f| f.flow.origin_code.as_str()).collect();
    // 同為 120，依原始順序
    assert_eq!(origins, vec!["E02006801", "E02000166"]);
    assert!(incoming.iter().all(|f| f.flow.dest_code == "E02000977"));

    let outgoing = engine.query("E02006801", Direction::Outgoing, 1)?;
    assert_eq!(outgoing.len(), 1);
    assert_eq!(outgoing[0].count(), 120);

    assert!(engine.query("E02099999", Direction::Incoming, 10)?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_export_writes_one_file_per_valid_scenario() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let source = write_inputs(temp_dir.path())?;
    let output_dir = temp_dir.path().join("processed");

    let engine = ExportEngine::new(source, LocalStorage::new(&output_dir), scenarios());
    let summary = engine.run().await?;

    assert!(!summary.is_complete());
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].name, "broken");
    assert_eq!(summary.artifacts.len(), 3);
    assert!(!output_dir.join("broken.geojson").exists());
    assert!(output_dir.join("manifest.json").exists());

    let top: FeatureCollection =
        serde_json::from_str(&std::fs::read_to_string(output_dir.join("top1000-geral.geojson"))?)?;
    assert_eq!(top.name.as_deref(), Some("top1000-geral"));
    assert_eq!(top.features.len(), 6);
    assert_eq!(top.features[0].properties.count, 6500);
    assert_eq!(top.features[0].properties.count_bin.as_deref(), Some("5000+"));
    assert_eq!(
        top.features[0].geometry.coordinates,
        vec![[-0.1340, 51.5123], [-0.1255, 51.5290]]
    );

    let reading: FeatureCollection = serde_json::from_str(&std::fs::read_to_string(
        output_dir.join("reading-outflows-top500.geojson"),
    )?)?;
    assert_eq!(reading.features.len(), 2);
    assert!(reading
        .features
        .iter()
        .all(|f| f.properties.origin_code == "E02006801"));

    let london: FeatureCollection = serde_json::from_str(&std::fs::read_to_string(
        output_dir.join("london-inflows-top5000.geojson"),
    )?)?;
    let dests: Vec<&str> = london
        .features
        .iter()
        .map(|f| f.properties.dest_code.as_str())
        .collect();
    assert_eq!(dests, vec!["E02000166", "E02000977", "E02000977", "E02000001"]);

    let manifest: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(output_dir.join("manifest.json"))?)?;
    assert_eq!(manifest["join"]["joined_flows"], 6);
    assert_eq!(manifest["artifacts"][2]["name"], "london-inflows-top5000");
    Ok(())
}

#[tokio::test]
async fn test_export_is_byte_identical_across_runs() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let first_dir = temp_dir.path().join("first");
    let second_dir = temp_dir.path().join("second");

    for dir in [&first_dir, &second_dir] {
        let source = write_inputs(temp_dir.path())?;
        ExportEngine::new(source, LocalStorage::new(dir), scenarios())
            .run()
            .await?;
    }

    for name in [
        "top1000-geral.geojson",
        "reading-outflows-top500.geojson",
        "london-inflows-top5000.geojson",
    ] {
        assert_eq!(
            std::fs::read(first_dir.join(name))?,
            std::fs::read(second_dir.join(name))?,
            "{} differs between runs",
            name
        );
    }
    Ok(())
}

#[tokio::test]
async fn test_duplicate_scenario_name_is_reported_not_overwritten() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let source = write_inputs(temp_dir.path())?;
    let output_dir = temp_dir.path().join("processed");

    let scenarios = vec![
        ScenarioSpec::new("reading", 500).with_filter("origin_code", "E02006801"),
        ScenarioSpec::new("reading", 1000),
    ];
    let summary = ExportEngine::new(source, LocalStorage::new(&output_dir), scenarios)
        .run()
        .await?;

    assert_eq!(summary.artifacts.len(), 1);
    assert_eq!(summary.artifacts[0].feature_count, 2);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].name, "reading");

    // 檔案內容是第一個宣告的 scenario
    let reading: FeatureCollection =
        serde_json::from_str(&std::fs::read_to_string(output_dir.join("reading.geojson"))?)?;
    assert_eq!(reading.features.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_missing_lookup_fails_before_export() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let flows = temp_dir.path().join("flows.csv");
    std::fs::write(&flows, FLOWS)?;
    let source = CsvFlowSource::new(flows, temp_dir.path().join("absent.csv"));
    let output_dir = temp_dir.path().join("processed");

    let result = ExportEngine::new(source, LocalStorage::new(&output_dir), scenarios())
        .run()
        .await;

    assert!(matches!(
        result,
        Err(flowmap_etl::FlowError::MissingInput { .. })
    ));
    assert!(!output_dir.exists());
    Ok(())
}

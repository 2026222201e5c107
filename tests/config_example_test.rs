use flowmap_etl::core::ConfigProvider;
use flowmap_etl::utils::validation::Validate;
use flowmap_etl::{RegionSpec, TomlConfig};
use std::path::Path;

#[test]
fn test_example_config_parses_and_validates() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("flowmap.example.toml");
    let config = TomlConfig::from_file(path).unwrap();

    assert!(config.validate().is_ok());
    assert_eq!(config.scenarios().len(), 4);
    assert_eq!(config.server.port, 5000);
    assert_eq!(
        config.scenarios()[2].dest_region,
        Some(RegionSpec::Preset("central-london".to_string()))
    );
    assert_eq!(
        config.scenarios()[3].dest_region,
        Some(RegionSpec::Keywords(vec![
            "Manchester".to_string(),
            "Salford".to_string(),
            "Trafford".to_string()
        ]))
    );
}

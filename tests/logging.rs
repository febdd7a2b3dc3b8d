use topicbus::{init, init_logging, LoggingSettings, Settings};

#[test]
fn test_bad_directive_is_an_error() {
    let settings = LoggingSettings {
        directives: vec!["topicbus_core=very-loud".to_string()],
        ..LoggingSettings::default()
    };
    assert!(init_logging(&settings).is_err());
}

#[test]
fn test_bad_level_is_an_error() {
    let settings = LoggingSettings {
        level: "shouty".to_string(),
        ..LoggingSettings::default()
    };
    assert!(init_logging(&settings).is_err());
}

#[test]
fn test_init_validates_settings_first() {
    let mut settings = Settings::new();
    settings.bus.tap_capacity = 0;
    assert!(init(&settings).is_err());
}

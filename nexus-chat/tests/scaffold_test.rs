// Checks on the shipped default configuration files.

use nexus_chat::config::SessionConfig;

/// Verify that defaults/nexus.toml is valid TOML with the expected sections.
#[test]
fn nexus_toml_is_valid() {
    let content =
        std::fs::read_to_string("defaults/nexus.toml").expect("defaults/nexus.toml should exist");
    let parsed: toml::Value = toml::from_str(&content).expect("defaults/nexus.toml is not valid TOML");
    for section in ["server", "store", "widget"] {
        assert!(parsed.get(section).is_some(), "missing [{section}]");
    }
    assert_eq!(parsed["widget"]["backend"].as_str(), Some("relay"));
}

/// Verify that defaults/session.toml.example parses as a session.
#[test]
fn session_example_is_valid() {
    let content = std::fs::read_to_string("defaults/session.toml.example")
        .expect("defaults/session.toml.example should exist");
    let session: SessionConfig =
        toml::from_str(&content).expect("session example should deserialize");
    assert!(session.user_id.is_some());
    assert!(session.email.is_some());
}

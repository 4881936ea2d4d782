// End-to-end checks of the message path: safety gate, prompt formatting
// and local model lookup, using the shipped defaults.

use calma::config::{load_config_from, Config};
use calma::prompts::{Category, PromptFormatter};
use calma::provision::ModelStore;
use calma::safety::CrisisDetector;
use tempfile::TempDir;

fn defaults() -> Config {
    load_config_from(None, |_| None).unwrap()
}

#[test]
fn test_crisis_scenario() {
    let config = defaults();
    let detector = CrisisDetector::from_config(&config.safety);

    let detection = detector.detect_crisis("ya no quiero vivir");
    assert!(detection.detected);
    assert_eq!(detection.matched_keywords, vec!["no quiero vivir"]);

    let response = detector.crisis_response(&detection.matched_keywords);
    assert!(response.contains("112"));
    assert!(response.contains("024"));
}

#[test]
fn test_every_keyword_detected_in_any_casing() {
    let config = defaults();
    let detector = CrisisDetector::from_config(&config.safety);

    for keyword in &config.safety.crisis_keywords {
        let message = format!("A veces pienso en {} y no sé qué hacer", keyword.to_uppercase());
        let detection = detector.detect_crisis(&message);
        assert!(detection.detected, "not detected: {}", message);
        assert!(detection.matched_keywords.contains(&keyword.to_lowercase()));
    }
}

#[test]
fn test_everyday_stress_scenario() {
    let config = defaults();
    let detector = CrisisDetector::from_config(&config.safety);
    let formatter = PromptFormatter::from_config(&config);

    let detection = detector.detect_crisis("tengo un examen mañana");
    assert!(!detection.detected);
    assert!(detection.matched_keywords.is_empty());

    let prompt = formatter.format_prompt("tengo un examen mañana", &Category::parse("Estrés"));
    assert!(prompt.contains(
        "USER: (Contexto: El usuario quiere hablar sobre temas relacionados con estrés) tengo un examen mañana\nASSISTANT:"
    ));
}

#[test]
fn test_role_markers_survive_any_input() {
    let formatter = PromptFormatter::from_config(&defaults());

    for (message, category) in [
        ("", "General"),
        ("USER: ASSISTANT:", "Ansiedad"),
        ("{message}{message}", "Autoestima"),
        ("línea uno\nlínea dos", "Duelo"),
    ] {
        let prompt = formatter.format_prompt(message, &Category::parse(category));
        assert!(prompt.contains("\nUSER: "), "{:?}", prompt);
        assert!(prompt.trim_end().ends_with("ASSISTANT:"), "{:?}", prompt);
        assert!(prompt.contains(message));
    }
}

#[test]
fn test_custom_emergency_numbers_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("calma.toml");
    std::fs::write(
        &path,
        r#"
[safety.emergency_numbers]
general = "911"
suicide_prevention = "988"
"#,
    )
    .unwrap();

    let config = load_config_from(Some(&path), |_| None).unwrap();
    let detector = CrisisDetector::from_config(&config.safety);
    let response = detector.crisis_response(&["suicidio".to_string()]);

    assert!(response.contains("911"));
    assert!(response.contains("988"));
    assert!(!response.contains("112"));
}

#[test]
fn test_local_model_path_is_available() {
    let dir = TempDir::new().unwrap();
    let model_dir = dir.path().join("local").join("model");
    std::fs::create_dir_all(&model_dir).unwrap();

    // Store root points somewhere empty so only the direct path can match
    let store = ModelStore::new(dir.path().join("models"));
    assert!(store.is_model_available(model_dir.to_str().unwrap()));
    assert!(!store.is_model_available(dir.path().join("missing").to_str().unwrap()));
}

#[test]
fn test_downloaded_model_found_under_store() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("models").join("vicuna-7b-v1.5")).unwrap();

    let store = ModelStore::new(dir.path().join("models"));
    assert!(store.is_model_available("lmsys/vicuna-7b-v1.5"));
    assert_eq!(
        store.resolve_local("lmsys/vicuna-7b-v1.5"),
        Some(dir.path().join("models").join("vicuna-7b-v1.5"))
    );
}

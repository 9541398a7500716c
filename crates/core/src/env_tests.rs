use super::*;
use std::collections::HashMap;

fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

#[test]
fn cleo_home_prefers_explicit_env_var() {
    let map = vars(&[("CLEO_HOME", "/custom/home")]);
    let env = Env::from_vars(|k| map.get(k).cloned());
    assert_eq!(env.cleo_home, PathBuf::from("/custom/home"));
}

#[test]
fn no_color_and_force_color_are_presence_flags() {
    let map = vars(&[("NO_COLOR", "")]);
    let env = Env::from_vars(|k| map.get(k).cloned());
    assert!(env.no_color);
    assert!(!env.force_color);
}

#[test]
fn session_id_and_root_default_to_none() {
    let env = Env::from_vars(|_| None);
    assert!(env.cleo_session_id.is_none());
    assert!(env.cleo_root.is_none());
}

use int8gemm::engine::{AnyEngine, EngineConfig, EngineKind};
use int8gemm::Error;

#[test]
fn json_config_defaults_missing_fields() {
    let cfg = EngineConfig::from_json(r#"{"kind": "std-thread"}"#).unwrap();
    assert_eq!(cfg, EngineConfig { kind: EngineKind::StdThread, threads: None });
    let cfg = EngineConfig::from_json("{}").unwrap();
    assert_eq!(cfg, EngineConfig::default());
    assert_eq!(cfg.kind, EngineKind::Sequential);
}

#[test]
fn json_config_round_trips_through_serde() {
    let cfg = EngineConfig { kind: EngineKind::Rayon, threads: Some(6) };
    let text = serde_json::to_string(&cfg).unwrap();
    assert_eq!(text, r#"{"kind":"rayon","threads":6}"#);
    assert_eq!(EngineConfig::from_json(&text).unwrap(), cfg);
}

#[test]
fn bad_json_is_a_config_error() {
    let err = EngineConfig::from_json(r#"{"kind": "openmp"}"#).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn env_overrides() {
    // Single test touches the environment so parallel tests cannot race on it.
    std::env::set_var(EngineConfig::ENV_ENGINE, "std-thread");
    std::env::set_var(EngineConfig::ENV_THREADS, "3");
    let cfg = EngineConfig::from_env().unwrap();
    assert_eq!(cfg, EngineConfig { kind: EngineKind::StdThread, threads: Some(3) });

    std::env::set_var(EngineConfig::ENV_THREADS, "0");
    assert!(matches!(EngineConfig::from_env(), Err(Error::InvalidThreads(_))));

    std::env::set_var(EngineConfig::ENV_ENGINE, "gpu");
    std::env::remove_var(EngineConfig::ENV_THREADS);
    assert!(matches!(EngineConfig::from_env(), Err(Error::UnknownEngine(_))));

    std::env::remove_var(EngineConfig::ENV_ENGINE);
    assert_eq!(EngineConfig::from_env().unwrap(), EngineConfig::default());
}

#[test]
fn any_engine_reports_its_shape() {
    let seq = AnyEngine::from_config(&EngineConfig::default()).unwrap();
    assert_eq!(seq.kind(), EngineKind::Sequential);
    assert_eq!(seq.threads(), 1);
    #[cfg(feature = "std-thread")]
    {
        let e = AnyEngine::from_config(&EngineConfig { kind: EngineKind::StdThread, threads: Some(5) }).unwrap();
        assert_eq!((e.kind(), e.threads()), (EngineKind::StdThread, 5));
    }
    #[cfg(feature = "rayon")]
    {
        let e = AnyEngine::from_config(&EngineConfig { kind: EngineKind::Rayon, threads: Some(2) }).unwrap();
        assert_eq!((e.kind(), e.threads()), (EngineKind::Rayon, 2));
    }
}

use crate::anchor_utils::read_source;

#[test]
fn test_binary_logs_to_stderr_and_prints_json_to_stdout() {
    let main = read_source("src/main.rs");
    assert!(
        main.contains("EnvFilter::try_from_default_env()")
            && main.contains(".with_writer(std::io::stderr)"),
        "tracing must honour RUST_LOG and stay off stdout"
    );
    assert!(
        main.contains("serde_json::to_string_pretty(&output)"),
        "command results are emitted as JSON on stdout"
    );
    let env_setup = main
        .find("harden_env_setup()")
        .expect("env setup call");
    let filter = main
        .find("try_from_default_env()")
        .expect("filter construction");
    assert!(env_setup < filter, ".env must be loaded before RUST_LOG is read");
}

use std::path::{Path, PathBuf};

fn write_minimal_env_template(path: &Path) -> std::io::Result<()> {
    use std::io::Write;
    let mut file = std::fs::File::create(path)?;
    writeln!(file, "# fhe-mailbox reconciliation engine configuration")?;
    writeln!(file)?;
    writeln!(file, "SEPOLIA_RPC_URL=\"https://sepolia.infura.io/v3/CHANGE_ME\"")?;
    writeln!(file, "CHAIN_ID=\"11155111\"")?;
    writeln!(file, "ADDRESSES_FILE=\"shared/addresses.json\"")?;
    writeln!(file, "LOG_WINDOW=\"1000\"")?;
    writeln!(file, "LOG_CHUNK=\"10\"")?;
    writeln!(file, "MAIL_DB_PATH=\"mail.db\"")?;
    writeln!(file)?;
    writeln!(file, "RUST_LOG=\"info,fhe_mailbox=info\"")?;
    Ok(())
}

/// What happened while preparing the environment. Emitted once logging is up.
#[derive(Debug, Default)]
pub struct EnvSetupReport {
    pub dotenv_path: Option<PathBuf>,
    pub dotenv_error: Option<String>,
    pub template_error: Option<String>,
    pub missing: Vec<&'static str>,
}

impl EnvSetupReport {
    pub fn emit(&self) {
        if let Some(path) = &self.dotenv_path {
            tracing::debug!("[ENV] loaded {}", path.display());
        }
        if let Some(err) = &self.dotenv_error {
            tracing::warn!("[ENV] failed to read .env: {err}");
        }
        if let Some(err) = &self.template_error {
            tracing::debug!("[ENV] could not write .env.example: {err}");
        }
        for key in &self.missing {
            tracing::warn!("[ENV] {key} is not set");
        }
    }
}

/// Load `.env` without clobbering variables already exported by the shell.
pub fn harden_env_setup() -> EnvSetupReport {
    let mut report = EnvSetupReport::default();

    let example = Path::new(".env.example");
    if !example.exists() {
        if let Err(e) = write_minimal_env_template(example) {
            report.template_error = Some(e.to_string());
        }
    }

    match dotenvy::dotenv() {
        Ok(path) => report.dotenv_path = Some(path),
        Err(e) if e.not_found() => {}
        Err(e) => report.dotenv_error = Some(e.to_string()),
    }

    if std::env::var("SEPOLIA_RPC_URL").is_err() && std::env::var("RPC_URL").is_err() {
        report.missing.push("SEPOLIA_RPC_URL (or RPC_URL)");
    }
    if std::env::var("CHAIN_ID").is_err() {
        report.missing.push("CHAIN_ID");
    }
    report
}

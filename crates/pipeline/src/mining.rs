//! Command lines for the external mining tools.

use kesi_core::config::{DatabaseConfig, MiningConfig};
use kesi_core::KnowledgeSource;

/// Issue-tracker miner: reads the tracker at the source URI and writes
/// into the ITS database.
pub fn its_command(
    mining: &MiningConfig,
    database: &DatabaseConfig,
    source: &KnowledgeSource,
) -> Vec<String> {
    let mut argv: Vec<String> = vec![
        mining.its_command.clone(),
        "-o".into(),
        "db".into(),
        "-b".into(),
        source.kind.backend().into(),
        "--db-user-out".into(),
        database.user.clone(),
        "--db-password-out".into(),
        database.password.clone(),
        "--db-hostname-out".into(),
        database.host.clone(),
        "--db-port-out".into(),
        database.port.to_string(),
        "--db-database-out".into(),
        database.its_database.clone(),
    ];
    if let Some(credentials) = &source.credentials {
        argv.extend([
            "--backend-user".into(),
            credentials.user.clone(),
            "--backend-password".into(),
            credentials.password.clone(),
        ]);
    }
    argv.extend(["-d".into(), "1".into(), "-u".into(), source.uri.clone()]);
    argv
}

/// Source-control miner with the metrics extension, over `target`
/// (a working-copy path or the repository URI).
pub fn scm_command(mining: &MiningConfig, database: &DatabaseConfig, target: &str) -> Vec<String> {
    vec![
        mining.scm_command.clone(),
        "-u".into(),
        database.user.clone(),
        "-p".into(),
        database.password.clone(),
        "-d".into(),
        database.scm_database.clone(),
        "-H".into(),
        database.host.clone(),
        "--extensions".into(),
        "Metrics".into(),
        "--metrics-all".into(),
        target.to_string(),
    ]
}

/// Render argv for logs with every password masked.
pub fn redacted(argv: &[String]) -> String {
    let mut out = Vec::with_capacity(argv.len());
    let mut mask_next = false;
    for arg in argv {
        if mask_next {
            out.push("***");
        } else {
            out.push(arg.as_str());
        }
        mask_next = matches!(arg.as_str(), "--db-password-out" | "--backend-password" | "-p");
    }
    out.join(" ")
}

use std::{env, env::VarError};

/// The server is configured entirely through environment variables, so any command-line
/// argument is treated as a request for help.
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Allow-list only. PGW_HASH_KEY and PGW_HASH_IV must never reach stdout.
    const DISPLAY_ENVS: [&str; 8] = [
        "RUST_LOG",
        "PGW_HOST",
        "PGW_PORT",
        "PGW_MERCHANT_ID",
        "PGW_VENDOR_BASE_URL",
        "PGW_PUBLIC_URL",
        "PGW_STORE_TTL",
        "PGW_EVENT_BUFFER_SIZE",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}

use std::io::{self, Write};
use std::path::PathBuf;

use circle::config::{Backend, Config, HostedConfig};
use circle::error::Result;

fn prompt(question: &str) -> Result<String> {
    print!("{question}");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn optional(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

pub fn run() -> Result<()> {
    let config_path = Config::config_path()?;

    if config_path.exists() {
        let answer = prompt(&format!(
            "Config file already exists at {}. Overwrite? [y/N] ",
            config_path.display()
        ))?;

        if !answer.eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    println!("Circle Configuration");
    println!("====================\n");

    let backend = prompt("Storage backend, local or hosted [local]: ")?;
    let backend = if backend.is_empty() {
        Backend::Local
    } else {
        Backend::parse(&backend)?
    };

    let mut config = Config {
        backend,
        ..Config::default()
    };

    match backend {
        Backend::Local => {
            let default_path = config.database_path()?;
            let path = prompt(&format!(
                "Database file [{}]: ",
                default_path.display()
            ))?;
            config.database_path = optional(path).map(PathBuf::from);
        }
        Backend::Hosted => {
            let url = prompt("Project URL (e.g., https://xyz.supabase.co): ")?;
            let api_key = prompt("API key: ")?;
            let schema = prompt("Schema [circle]: ")?;
            config.hosted = HostedConfig {
                url: optional(url),
                api_key: optional(api_key),
                schema: optional(schema),
            };
            config.hosted_credentials()?;
        }
    }

    let default_team = prompt("Default team key (e.g., ENG) [optional]: ")?;
    config.default_team = optional(default_team);

    config.save_to(&config_path)?;

    println!("\nConfig saved to {}", config_path.display());
    if backend == Backend::Local {
        println!("Run 'circle db seed' to load a demo workspace.");
    }

    Ok(())
}

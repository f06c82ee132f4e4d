//! Config command - view or modify configuration.

use anyhow::{bail, Result};
use meshtalk_core::{Config, PrivatePolicy};

pub async fn execute(key: Option<String>, value: Option<String>) -> Result<()> {
    let mut config = Config::load_with_env()?;

    match (key.as_deref(), value) {
        (None, None) => {
            println!("Current Configuration");
            println!("=====================");
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        (Some(key), None) => match key {
            "nickname" => println!("{}", config.nickname),
            "dedup_capacity" => println!("{}", config.dedup_capacity),
            "private_policy" => println!("{:?}", config.private_policy),
            "received_dir" => println!("{:?}", config.received_dir),
            "max_message_length" => println!("{}", config.max_message_length),
            _ => println!("Unknown config key: {}", key),
        },
        (Some(key), Some(value)) => {
            match key {
                "nickname" => config.nickname = value,
                "dedup_capacity" => config.dedup_capacity = value.parse()?,
                "private_policy" => {
                    config.private_policy = match value.as_str() {
                        "unread_only" => PrivatePolicy::UnreadOnly,
                        "mirror_to_global" => PrivatePolicy::MirrorToGlobal,
                        other => bail!(
                            "unknown private_policy {:?} (expected unread_only or mirror_to_global)",
                            other
                        ),
                    }
                }
                "received_dir" => config.received_dir = value.into(),
                "max_message_length" => config.max_message_length = value.parse()?,
                _ => {
                    println!("Cannot set config key: {}", key);
                    return Ok(());
                }
            }
            config.save()?;
            println!("Set {}", key);
        }
        (None, Some(_)) => {
            println!("Must specify a key to set a value");
        }
    }

    Ok(())
}

use clap::Subcommand;
use flagops_lib::config::redact;
use flagops_lib::Error;

use crate::GlobalOpts;

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print a value, e.g. `config get prod.base_url`
    Get { key: String },
    /// Set a value, creating the environment if needed
    Set { key: String, value: String },
    /// List configured environments
    List,
    /// Make an environment the default
    Use { name: String },
    /// Remove an environment
    Remove { name: String },
    /// Print the config file location
    Path,
}

pub fn run_config(opts: &GlobalOpts, action: ConfigAction) -> Result<(), Error> {
    let store = &opts.store;
    match action {
        ConfigAction::Get { key } => {
            let config = store.load()?;
            println!("{}", config.get(&key)?);
        }
        ConfigAction::Set { key, value } => {
            let mut config = store.load()?;
            config.set(&key, &value)?;
            store.save(&config)?;
            println!("✓ Set {}", key);
        }
        ConfigAction::List => {
            let config = store.load()?;
            if config.environments.is_empty() {
                println!("No environments configured in {}", store.path().display());
            }
            for (name, env) in &config.environments {
                let marker = if *name == config.default_env { "*" } else { " " };
                println!(
                    "{} {:<16} {:<40} {}",
                    marker,
                    name,
                    env.base_url,
                    redact(&env.api_key)
                );
            }
        }
        ConfigAction::Use { name } => {
            let mut config = store.load()?;
            config.set_default_env(&name)?;
            store.save(&config)?;
            println!("✓ Default environment is now {}", name);
        }
        ConfigAction::Remove { name } => {
            let mut config = store.load()?;
            config.remove_env(&name)?;
            store.save(&config)?;
            println!("✓ Removed {}", name);
        }
        ConfigAction::Path => println!("{}", store.path().display()),
    }
    Ok(())
}

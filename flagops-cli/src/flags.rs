use flagops_lib::merge::RawOverrides;
use flagops_lib::record::{check_rollout, parse_config, parse_variants};
use flagops_lib::{ops, Error, FlagRecord};

use crate::GlobalOpts;

#[derive(clap::Args, Debug)]
pub struct CreateFields {
    #[arg(short = 'd', long = "description")]
    description: Option<String>,

    /// Create the flag switched on
    #[arg(long)]
    enabled: bool,

    /// Percentage of traffic the flag applies to (0-100)
    #[arg(long, default_value_t = 0)]
    rollout: i64,

    /// Flag config as a JSON object
    #[arg(long, value_name = "JSON")]
    config: Option<String>,

    /// Variants as a JSON array of {name, weight, value}
    #[arg(long, value_name = "JSON")]
    variants: Option<String>,

    /// Targeting expression
    #[arg(long)]
    expression: Option<String>,
}

/// Every field is optional; only the ones given are changed.
#[derive(clap::Args, Debug)]
pub struct UpdateFields {
    #[arg(short = 'd', long = "description")]
    description: Option<String>,

    #[arg(long, value_name = "BOOL", action = clap::ArgAction::Set)]
    enabled: Option<bool>,

    #[arg(long)]
    rollout: Option<i64>,

    #[arg(long, value_name = "JSON")]
    config: Option<String>,

    #[arg(long, value_name = "JSON")]
    variants: Option<String>,

    #[arg(long)]
    expression: Option<String>,
}

impl From<UpdateFields> for RawOverrides {
    fn from(fields: UpdateFields) -> Self {
        RawOverrides {
            description: fields.description,
            enabled: fields.enabled,
            rollout: fields.rollout,
            config: fields.config,
            variants: fields.variants,
            expression: fields.expression,
        }
    }
}

fn print_record(record: &FlagRecord) -> Result<(), Error> {
    println!("{}", serde_json::to_string_pretty(record)?);
    Ok(())
}

pub fn run_list(opts: &GlobalOpts, json: bool) -> Result<(), Error> {
    let (conn, client) = opts.connect()?;
    let flags = ops::list_flags(&client, &conn.environment)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&flags)?);
        return Ok(());
    }

    if flags.is_empty() {
        println!("No flags in {}", conn.environment);
        return Ok(());
    }
    for flag in &flags {
        let state = if flag.enabled { "on" } else { "off" };
        if flag.description.is_empty() {
            println!("{:<32} {:<3} {:>3}%", flag.key, state, flag.rollout);
        } else {
            println!(
                "{:<32} {:<3} {:>3}%  {}",
                flag.key, state, flag.rollout, flag.description
            );
        }
    }
    Ok(())
}

pub fn run_get(opts: &GlobalOpts, key: &str) -> Result<(), Error> {
    let (conn, client) = opts.connect()?;
    let flag = ops::get_flag(&client, key, &conn.environment)?;
    print_record(&flag)
}

pub fn run_create(opts: &GlobalOpts, key: &str, fields: CreateFields) -> Result<(), Error> {
    let (conn, client) = opts.connect()?;

    let mut record = FlagRecord::new(key, &conn.environment);
    record.enabled = fields.enabled;
    record.rollout = check_rollout(fields.rollout)?;
    if let Some(description) = fields.description {
        record.description = description;
    }
    if let Some(config) = fields.config.as_deref() {
        record.config = parse_config(config)?;
    }
    if let Some(variants) = fields.variants.as_deref() {
        record.variants = parse_variants(variants)?;
    }
    if let Some(expression) = fields.expression {
        record.expression = expression;
    }

    ops::create_flag(&client, &record)?;
    println!("✓ Created {} in {}", key, conn.environment);
    Ok(())
}

pub fn run_update(opts: &GlobalOpts, key: &str, fields: UpdateFields) -> Result<(), Error> {
    let (conn, client) = opts.connect()?;
    let updated = ops::update_flag(&client, key, &conn.environment, fields.into())?;
    println!("✓ Updated {} in {}", key, conn.environment);
    print_record(&updated)
}

pub fn run_set_enabled(opts: &GlobalOpts, key: &str, enabled: bool) -> Result<(), Error> {
    let (conn, client) = opts.connect()?;
    ops::set_enabled(&client, key, &conn.environment, enabled)?;
    let verb = if enabled { "Enabled" } else { "Disabled" };
    println!("✓ {} {} in {}", verb, key, conn.environment);
    Ok(())
}

pub fn run_delete(opts: &GlobalOpts, key: &str) -> Result<(), Error> {
    let (conn, client) = opts.connect()?;
    ops::delete_flag(&client, key, &conn.environment)?;
    println!("✓ Deleted {} from {}", key, conn.environment);
    Ok(())
}

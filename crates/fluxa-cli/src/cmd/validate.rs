use crate::output::print_json;
use anyhow::Context;
use clap::Args;
use fluxa_core::config::Config;
use fluxa_core::envelope::load_actions;
use std::path::PathBuf;

#[derive(Args)]
pub struct ValidateArgs {
    /// Action file (envelope or bare array; comments allowed)
    file: PathBuf,

    /// Output findings as JSON
    #[arg(long, short = 'j')]
    json: bool,
}

pub fn run(config: &Config, args: ValidateArgs) -> anyhow::Result<()> {
    let value = load_actions(&args.file)
        .with_context(|| format!("failed to load {}", args.file.display()))?;
    let report = config.validator().validate(&value);
    let count = value.as_array().map_or(0, Vec::len);

    if args.json {
        print_json(&serde_json::json!({
            "file": args.file.display().to_string(),
            "actions": count,
            "valid": report.is_valid(),
            "findings": report.errors,
        }))?;
    } else if report.is_clean() {
        println!("{}: {count} action(s), no findings", args.file.display());
    } else {
        println!(
            "{}: {count} action(s), {} finding(s)",
            args.file.display(),
            report.errors.len()
        );
        for f in &report.errors {
            println!("  [{}] {}", f.severity(), f.message);
        }
    }

    let fatal = report.fatal().count();
    if fatal > 0 {
        anyhow::bail!("{fatal} fatal finding(s) in {}", args.file.display());
    }
    Ok(())
}

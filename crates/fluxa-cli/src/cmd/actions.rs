use anyhow::Context;
use clap::Args;
use fluxa_core::config::Config;
use fluxa_core::envelope::{format_output, load_action_array, write_output};
use std::path::PathBuf;

#[derive(Args)]
pub struct ActionsArgs {
    /// Action file, with or without the metadata envelope
    input: PathBuf,

    /// Where to write the bare action array
    #[arg(short, long)]
    output: PathBuf,
}

pub fn run(config: &Config, args: ActionsArgs) -> anyhow::Result<()> {
    let actions = load_action_array(&args.input)
        .with_context(|| format!("failed to load {}", args.input.display()))?;

    let text = format_output(&actions, config.output.indent)?;
    write_output(&args.output, &text)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    println!(
        "Wrote {} action(s) to {}",
        actions.len(),
        args.output.display()
    );
    Ok(())
}

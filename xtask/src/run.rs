use std::process::Command;

use anyhow::Context as _;

use clap::Args;

#[derive(Debug, Args)]
pub struct Options {
    #[arg(long)]
    pub release: bool,

    /// Joining the process connector requires CAP_NET_ADMIN
    #[arg(short, long, default_value = "sudo -E")]
    pub runner: String,

    #[arg(last = true)]
    pub run_args: Vec<String>,
}

fn build(opts: &Options) -> Result<(), anyhow::Error> {
    let mut args = vec!["build", "--package", "procsnoop"];
    if opts.release {
        args.push("--release")
    }
    let status = Command::new("cargo")
        .args(&args)
        .status()
        .context("failed to spawn cargo")?;
    if !status.success() {
        anyhow::bail!("`cargo {}` failed", args.join(" "));
    }
    Ok(())
}

pub fn run(opts: Options) -> Result<(), anyhow::Error> {
    build(&opts).context("Error while building userspace application")?;

    let profile = if opts.release { "release" } else { "debug" };
    let bin_path = format!("target/{profile}/procsnoop");

    let mut run_args: Vec<_> = opts.run_args.iter().map(String::as_str).collect();

    let mut args: Vec<_> = opts.runner.trim().split_terminator(' ').collect();
    args.push(bin_path.as_str());
    args.append(&mut run_args);

    let program = args.first().context("No first argument")?;
    let status = Command::new(program)
        .args(args.iter().skip(1))
        .status()
        .with_context(|| format!("failed to run `{program}`"))?;
    if !status.success() {
        anyhow::bail!("Failed to run `{}`", args.join(" "));
    }
    Ok(())
}

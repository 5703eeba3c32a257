use anyhow::Result;

use super::context::CliContext;

pub fn cmd_info(ctx: &CliContext) -> Result<()> {
    let config = ctx.config();
    let policy = &config.policy;

    println!("soulstore");
    println!("=========");
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!("Build Date: {}", env!("BUILD_DATE", "unknown"));
    println!("Git Commit: {}", env!("GIT_HASH", "unknown"));
    println!();

    println!("Configuration:");
    println!("- Config File: {}", ctx.config_path().display());
    println!("- Storage Root: {}", config.root.display());
    println!("- File Mode: {:o}", policy.file_mode);
    println!("- Directory Mode: {:o}", policy.dir_mode);
    println!("- Put Policy: {:?}", policy.put_policy);

    Ok(())
}

// src/bin/basis-gen.rs

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Parser;
use dialoguer::Input;

use basis::cli::ScaffoldArgs;
use basis::logging;
use basis::scaffold::{ScaffoldRequest, default_project_name, scaffold};

fn main() {
    if let Err(err) = run_main() {
        eprintln!("basis-gen error: {err:?}");
        std::process::exit(1);
    }
}

fn run_main() -> Result<()> {
    let args = ScaffoldArgs::parse();
    logging::init_logging(args.log_level)?;

    let template_root = match args.template {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    let default_name = args
        .name
        .clone()
        .or_else(|| args.dest.as_deref().and_then(default_project_name));

    let project_name = if args.yes {
        match default_name {
            Some(name) => name,
            None => bail!("a project name is required: pass --name or a destination"),
        }
    } else {
        let mut input = Input::<String>::new().with_prompt("Project name?");
        if let Some(name) = default_name {
            input = input.default(name);
        }
        input.interact_text()?
    };

    let default_dest = args
        .dest
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("./{project_name}")));

    let destination = if args.yes {
        default_dest
    } else {
        let answer: String = Input::new()
            .with_prompt("Project path?")
            .default(default_dest.to_string_lossy().into_owned())
            .interact_text()?;
        PathBuf::from(answer)
    };

    let report = scaffold(&ScaffoldRequest {
        template_root,
        destination,
        project_name: project_name.clone(),
    })?;

    println!(
        "created {project_name} at {} ({} files)",
        report.destination.display(),
        report.files_copied
    );
    for path in &report.skipped {
        println!("  skipped {path} (not a regular file)");
    }
    Ok(())
}

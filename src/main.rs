// SPDX-FileCopyrightText: 2026 Uthemer Contributors
// SPDX-License-Identifier: MIT

use uthemer::{
    config::Settings,
    installer::Installer,
    metadata::{self, ThemeDescriptor},
    path::default_settings_file,
    registry::Registry,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use inquire::Confirm;
use std::{ffi::OsStr, fs, path::PathBuf, process::exit};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(about, subcommand_help_heading = "Commands", version)]
struct Cli {
    /// Path to settings file.
    #[arg(short, long, value_name = "path", global = true)]
    pub settings: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn run(self) -> Result<()> {
        let settings = load_settings(self.settings)?;

        match self.command {
            Command::Install(opts) => run_install(settings, opts),
            Command::List => run_list(settings),
            Command::Info(opts) => run_info(opts),
            Command::Remove(opts) => run_remove(settings, opts),
            Command::Current => run_current(settings),
            Command::Packages => run_packages(settings),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Install a theme package.
    #[command(override_usage = "uthemer install [options] <package>")]
    Install(InstallOptions),

    /// List installed themes.
    #[command(override_usage = "uthemer list")]
    List,

    /// Show the metadata of a theme package.
    #[command(override_usage = "uthemer info <package>")]
    Info(InfoOptions),

    /// Remove installed themes.
    #[command(override_usage = "uthemer remove <theme_id>...")]
    Remove(RemoveOptions),

    /// Show the current theme.
    #[command(override_usage = "uthemer current")]
    Current,

    /// List theme package files found in the packages directory.
    #[command(override_usage = "uthemer packages")]
    Packages,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct InstallOptions {
    /// Path to the `.utheme` package file.
    #[arg(required = true, value_name = "package")]
    pub package: PathBuf,

    /// Install without asking for confirmation.
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct InfoOptions {
    /// Path to the `.utheme` package file.
    #[arg(required = true, value_name = "package")]
    pub package: PathBuf,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct RemoveOptions {
    /// Filesystem-safe identifiers of the themes to remove.
    #[arg(required = true, value_name = "theme_id")]
    pub theme_ids: Vec<String>,
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn run() -> Result<()> {
    Cli::parse().run()
}

fn load_settings(path: Option<PathBuf>) -> Result<Settings> {
    let path = match path {
        Some(path) => path,
        None => default_settings_file()?,
    };

    if path.exists() {
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("cannot read settings file {}", path.display()))?;
        Ok(raw.parse()?)
    } else {
        Ok(Settings::try_default()?)
    }
}

fn run_install(settings: Settings, opts: InstallOptions) -> Result<()> {
    let descriptor = metadata::read_package_metadata(&opts.package)?;
    let installer = Installer::new(settings);

    if installer.registry().is_installed(&descriptor.theme_id_path) {
        warn!(
            "{} is already installed and will be reinstalled",
            descriptor.theme_name
        );
    }

    if !opts.yes {
        let prompt = format!(
            "You will now install {} by {}. Continue?",
            descriptor.theme_name, descriptor.theme_author
        );
        if !Confirm::new(&prompt).with_default(true).prompt()? {
            info!("installation cancelled");
            return Ok(());
        }
    }

    let report = installer.install(&opts.package, &descriptor)?;

    for entry in &report.skipped {
        warn!("skipped entry {entry}");
    }
    if !report.recorded {
        warn!("installed, but the install record could not be saved");
    }
    if !report.activated {
        warn!("installed, but could not be set as the current theme");
    }
    info!(
        "successfully installed {} ({} resource(s) patched)",
        descriptor.theme_name, report.patched
    );

    Ok(())
}

fn run_list(settings: Settings) -> Result<()> {
    let registry = Registry::new(&settings.records_root, &settings.plugin_config);
    let current = registry.current_theme();
    let records = registry.list();

    if records.is_empty() {
        println!("no themes installed");
        return Ok(());
    }

    for record in records {
        let label = record.descriptor.display_label();
        let marker = if label == current { "*" } else { " " };
        println!(
            "{marker} {label}  v{} by {}",
            record.descriptor.theme_version, record.descriptor.theme_author
        );
    }

    Ok(())
}

fn run_info(opts: InfoOptions) -> Result<()> {
    let descriptor = metadata::read_package_metadata(&opts.package)?;
    print_descriptor(&descriptor);

    Ok(())
}

fn run_remove(settings: Settings, opts: RemoveOptions) -> Result<()> {
    let installer = Installer::new(settings);

    for theme_id in opts.theme_ids {
        if installer.uninstall(&theme_id) {
            info!("removed {theme_id}");
        } else {
            warn!("could not fully remove {theme_id}");
        }
    }

    Ok(())
}

fn run_current(settings: Settings) -> Result<()> {
    let registry = Registry::new(&settings.records_root, &settings.plugin_config);
    let current = registry.current_theme();

    if current.is_empty() {
        println!("no current theme set");
    } else {
        println!("{current}");
    }

    Ok(())
}

fn run_packages(settings: Settings) -> Result<()> {
    let entries = fs::read_dir(&settings.packages_dir).with_context(|| {
        format!(
            "cannot read packages directory {}",
            settings.packages_dir.display()
        )
    })?;

    let mut found = false;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension() == Some(OsStr::new("utheme")) {
            if let Some(name) = path.file_name() {
                println!("{}", name.to_string_lossy());
                found = true;
            }
        }
    }

    if !found {
        println!(
            "no theme packages found in {}",
            settings.packages_dir.display()
        );
    }

    Ok(())
}

fn print_descriptor(descriptor: &ThemeDescriptor) {
    println!("name:    {}", descriptor.theme_name);
    println!("author:  {}", descriptor.theme_author);
    println!("version: {}", descriptor.theme_version);
    println!("id:      {}", descriptor.theme_id);
    println!("key:     {}", descriptor.theme_id_path);
}

// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

fn build_cli() -> Command {
    Command::new("plugin-resolver")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Resolve plugin artifacts and their dependencies")
        .subcommand_required(true)
        .subcommand(
            Command::new("resolve")
                .about("Resolve the plugins of a configuration file")
                .arg(
                    Arg::new("config")
                        .short('c')
                        .long("config")
                        .required(true)
                        .value_name("FILE")
                        .help("Configuration file (TOML)"),
                )
                .arg(
                    Arg::new("settings")
                        .short('s')
                        .long("settings")
                        .value_name("FILE")
                        .help("Resolver settings file (default: ivysettings.xml in the usual places)"),
                )
                .arg(
                    Arg::new("offline")
                        .long("offline")
                        .action(ArgAction::SetTrue)
                        .help("Only use artifacts already in the local cache"),
                )
                .arg(
                    Arg::new("verbose")
                        .short('v')
                        .long("verbose")
                        .action(ArgAction::SetTrue)
                        .help("Report resolution progress"),
                ),
        )
        .subcommand(
            Command::new("files")
                .about("List the files selected by a file resource")
                .arg(Arg::new("path").required(true).help("Root file or directory"))
                .arg(
                    Arg::new("ext")
                        .long("ext")
                        .action(ArgAction::Append)
                        .help("File extensions to select (repeatable)"),
                )
                .arg(
                    Arg::new("include")
                        .long("include")
                        .action(ArgAction::Append)
                        .help("Include patterns (repeatable)"),
                )
                .arg(
                    Arg::new("exclude")
                        .long("exclude")
                        .action(ArgAction::Append)
                        .help("Exclude patterns (repeatable)"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("plugin-resolver.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}

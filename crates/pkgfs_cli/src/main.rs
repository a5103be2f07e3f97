/* 📖 # Why is the CLI minimal and hardcoded?

The CLI has no argument parsing or configuration options. It always reads
`pkgfs.toml` from the current directory and lists what every configured package
exposes, which is enough to check a configuration or a bundled binary.

Exit codes:
- 0: Success (every package listed, possibly empty)
- 1: Error (config not found or parsing failed)
*/

use std::env;
use std::process;

use pkgfs_base::fs::{RealSystem, System};
use pkgfs_base::tracing::init_tracing;
use pkgfs_engine::{AttachedBundle, Resources, load_config, walk_files};

fn main() {
    if let Err(e) = init_tracing() {
        eprintln!("Warning: {}", e);
    }

    let current_dir = env::current_dir().unwrap_or_else(|e| {
        eprintln!("Error: Failed to get current directory: {}", e);
        process::exit(1);
    });

    let bundle = AttachedBundle::detect();
    let system = RealSystem::new(current_dir.clone());

    let config = match load_config(&system, "pkgfs.toml") {
        Ok(config) => config,
        Err(e) => {
            if system.is_not_exist(&e) {
                eprintln!("Error: pkgfs.toml not found in {}", current_dir.display());
            } else {
                eprintln!("Error: Failed to load config from pkgfs.toml: {}", e);
            }
            process::exit(1);
        }
    };

    let resources = Resources::from_config(&config, &bundle, &current_dir);
    if bundle.is_attached() {
        println!("Serving {} packages from the attached bundle", resources.len());
    } else {
        println!("Serving {} packages from the source tree", resources.len());
    }

    for (import_path, system) in resources.iter() {
        println!("\n{}", import_path);
        match walk_files(&**system) {
            Ok(files) if files.is_empty() => println!("  (no files)"),
            Ok(files) => {
                for file in files {
                    println!("  {}", file);
                }
            }
            Err(e) => println!("  (unavailable: {})", e),
        }
    }
}

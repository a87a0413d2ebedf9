//! fieldstore-info Binary
//!
//! Prints the partition/layer hierarchy of one or more field files.

use std::path::{Path, PathBuf};

use clap::Parser;
use fieldstore::{FieldReader, LayerKind, Vec3};
use tracing_subscriber::{fmt, EnvFilter};

/// Inspect fieldstore files
#[derive(Parser, Debug)]
#[command(name = "fieldstore-info")]
#[command(about = "Print the partitions and layers stored in field files")]
#[command(version)]
struct Args {
    /// Files to inspect
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Also print file metadata
    #[arg(short, long)]
    metadata: bool,

    /// Also print group membership
    #[arg(short, long)]
    groups: bool,

    /// Dump the raw group tree and attribute keys
    #[arg(short, long)]
    raw: bool,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,fieldstore=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut failures = 0;
    for path in &args.files {
        if let Err(e) = print_file(path, &args) {
            tracing::error!("Failed to read {}: {}", path.display(), e);
            failures += 1;
        }
    }

    if failures > 0 {
        std::process::exit(1);
    }
}

fn print_file(path: &Path, args: &Args) -> fieldstore::Result<()> {
    let reader = FieldReader::open(path)?;
    let registry = reader.registry();

    println!("{}", path.display());
    for external in registry.partition_names() {
        println!("  partition {}", external);
        for int_name in registry.int_partitions_of(external) {
            let Some(partition) = registry.int_partition(int_name) else {
                continue;
            };
            println!("    {} ({})", int_name, partition.mapping.type_name());
            for kind in LayerKind::ALL {
                for layer in partition.layers(kind) {
                    println!("      {} {}", kind, layer.name());
                }
            }
        }
    }

    if args.metadata {
        println!("  metadata");
        for (key, value) in reader.metadata().iter() {
            println!("    {} = {}", key, value);
        }

        // Proxies skip the payload; the label type is not checked
        let scalars = reader.read_proxy_scalar_layers::<f32>("");
        let vectors = reader.read_proxy_vector_layers::<Vec3<f32>>("");
        let layers = scalars
            .iter()
            .map(|p| (&p.name, &p.attribute, p.stored_type(), p.metadata()))
            .chain(
                vectors
                    .iter()
                    .map(|p| (&p.name, &p.attribute, p.stored_type(), p.metadata())),
            );
        for (partition, layer, stored_type, metadata) in layers {
            if metadata.is_empty() {
                continue;
            }
            println!("    {}:{} ({})", partition, layer, stored_type);
            for (key, value) in metadata.iter() {
                println!("      {} = {}", key, value);
            }
        }
    }

    if args.groups {
        println!("  group membership");
        for (group, tokens) in reader.group_membership() {
            println!("    {}: {}", group, tokens);
        }
    }

    if args.raw {
        if let Some(archive) = reader.archive() {
            println!("  raw");
            for (depth, group) in archive.walk() {
                let name = archive.group_name(group).unwrap_or_default();
                let name = if name.is_empty() { "/" } else { name };
                println!(
                    "    {}{} [{}]",
                    "  ".repeat(depth),
                    name,
                    archive.attribute_keys(group).join(", ")
                );
            }
        }
    }

    Ok(())
}
